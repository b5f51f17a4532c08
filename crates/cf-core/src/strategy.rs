use core::fmt;
use core::str::FromStr;

use crate::CoreError;

/// Condenser calculation method selected by the user.
///
/// The wire form is the snake_case name (`berman`, `metro_vickers`, `vku`).
/// Discriminants index [`crate::STRATEGY_TABLE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StrategyId {
    Berman = 0,
    MetroVickers = 1,
    Vku = 2,
}

impl StrategyId {
    pub const ALL: [StrategyId; 3] = [
        StrategyId::Berman,
        StrategyId::MetroVickers,
        StrategyId::Vku,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyId::Berman => "berman",
            StrategyId::MetroVickers => "metro_vickers",
            StrategyId::Vku => "vku",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| CoreError::UnknownStrategy {
                name: s.to_string(),
            })
    }
}
