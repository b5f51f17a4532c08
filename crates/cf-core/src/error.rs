use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown calculation strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("Unknown field '{field}' for strategy {strategy}")]
    UnknownField {
        strategy: &'static str,
        field: String,
    },
}
