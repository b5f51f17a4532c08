//! Strategy schema registry.
//!
//! One static table describes, for every calculation strategy, the parameter
//! fields the backend expects and the key its results are filed under. The
//! request builder and the result decoder read only this table.

use crate::{CoreError, CoreResult, StrategyId};

/// Shape of a single parameter field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// One number.
    Scalar,
    /// Comma separated numbers in the form, a JSON array on the wire.
    NumberList,
    /// Fixed value written by the builder; never read from the form.
    Constant,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<f64>,
}

impl FieldSpec {
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar,
            required: false,
            default: Some(default),
        }
    }

    pub const fn list(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::NumberList,
            required: true,
            default: None,
        }
    }

    pub const fn constant(name: &'static str, value: f64) -> Self {
        Self {
            name,
            kind: FieldKind::Constant,
            required: true,
            default: Some(value),
        }
    }
}

#[derive(Debug)]
pub struct StrategyEntry {
    pub id: StrategyId,
    pub label: &'static str,
    pub result_key: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Indexed by `StrategyId` discriminant.
pub static STRATEGY_TABLE: [StrategyEntry; 3] = [
    StrategyEntry {
        id: StrategyId::Berman,
        label: "Berman",
        result_key: "berman_results",
        fields: &[
            FieldSpec::list("mass_flow_steam_list"),
            FieldSpec::scalar("enthalpy_flow_path_1"),
            FieldSpec::list("mass_flow_cooling_water_list"),
            FieldSpec::list("temperature_cooling_water_1_list"),
            FieldSpec::list("coefficient_R_list"),
            FieldSpec::optional("mass_flow_air", 0.0),
            FieldSpec::constant("BAP", 1.0),
        ],
    },
    StrategyEntry {
        id: StrategyId::MetroVickers,
        label: "Metro-Vickers",
        result_key: "metro_vickers_results",
        fields: &[
            FieldSpec::scalar("mass_flow_cooling_water"),
            FieldSpec::scalar("temperature_cooling_water_1"),
            FieldSpec::scalar("coefficient_b"),
            FieldSpec::scalar("mass_flow_flow_path_1"),
            FieldSpec::scalar("degree_dryness_flow_path_1"),
        ],
    },
    StrategyEntry {
        id: StrategyId::Vku,
        label: "VKU",
        result_key: "vku_results",
        fields: &[
            FieldSpec::scalar("mass_flow_flow_path_1"),
            FieldSpec::scalar("degree_dryness_flow_path_1"),
            FieldSpec::optional("temperature_air", 20.0),
            FieldSpec::scalar("mass_flow_steam_nom"),
            FieldSpec::scalar("degree_dryness_steam_nom"),
        ],
    },
];

pub fn entry(strategy: StrategyId) -> &'static StrategyEntry {
    &STRATEGY_TABLE[strategy.index()]
}

/// Ordered parameter fields for a strategy.
pub fn fields_for(strategy: StrategyId) -> &'static [FieldSpec] {
    entry(strategy).fields
}

/// Same as [`fields_for`] but starting from a wire name.
pub fn fields_for_name(name: &str) -> CoreResult<&'static [FieldSpec]> {
    let strategy: StrategyId = name.parse()?;
    Ok(fields_for(strategy))
}

/// Key under `results` that carries this strategy's output block.
pub fn result_key_for(strategy: StrategyId) -> &'static str {
    entry(strategy).result_key
}

pub fn field_spec(strategy: StrategyId, field: &str) -> CoreResult<&'static FieldSpec> {
    fields_for(strategy)
        .iter()
        .find(|spec| spec.name == field)
        .ok_or_else(|| CoreError::UnknownField {
            strategy: strategy.as_str(),
            field: field.to_string(),
        })
}
