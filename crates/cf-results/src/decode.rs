//! Result decoder.
//!
//! `unpack_result` pulls the strategy's block out of a result document;
//! `repopulate` turns a parameter block back into form strings. Both walk
//! the registry, so neither knows about individual strategies.

use cf_core::{StrategyId, fields_for, format_number, format_number_list, result_key_for};
use cf_project::{FormValues, ParameterBlock, ParameterValue};
use serde::Deserialize;
use serde_json::Value;

use crate::types::ResultDocument;
use crate::{ResultsError, ResultsResult};

pub fn unpack_result(
    strategy: StrategyId,
    document: &ResultDocument,
) -> ResultsResult<ParameterBlock> {
    let mismatch = |reason: String| ResultsError::ResultShapeMismatch {
        strategy: strategy.to_string(),
        reason,
    };

    if document.calculation_strategy != strategy {
        return Err(mismatch(format!(
            "document was computed with {}",
            document.calculation_strategy
        )));
    }

    let key = result_key_for(strategy);
    match document.results.get(key) {
        Some(block @ Value::Object(_)) => {
            ParameterBlock::deserialize(block).map_err(|e| mismatch(format!("results.{key}: {e}")))
        }
        Some(_) => Err(mismatch(format!("results.{key} is not an object"))),
        None => Err(mismatch(format!("results.{key} is missing"))),
    }
}

/// Project registry fields present in `block` to display strings.
///
/// Fields absent from the block stay unset; no defaults are applied here.
pub fn repopulate(strategy: StrategyId, block: &ParameterBlock) -> FormValues {
    fields_for(strategy)
        .iter()
        .filter_map(|spec| block.get(spec.name).map(|v| (spec.name, display_value(v))))
        .collect()
}

pub fn display_value(value: &ParameterValue) -> String {
    match value {
        ParameterValue::Scalar(Some(n)) => n.as_f64().map(format_number).unwrap_or_default(),
        ParameterValue::Scalar(None) => String::new(),
        ParameterValue::List(_) => format_number_list(&value.as_list().unwrap_or_default()),
        ParameterValue::Other(Value::String(s)) => s.clone(),
        ParameterValue::Other(other) => other.to_string(),
    }
}
