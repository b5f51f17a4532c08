//! Request builder: form values + strategy -> request document.
//!
//! Building never fails. Missing or malformed input produces empty lists,
//! defaults or `null`s; completeness is checked later by [`crate::validate`].

use cf_core::{FieldKind, FieldSpec, StrategyId, fields_for, parse_number_array, parse_scalar};

use crate::form::{
    FormValues, GEOMETRY_COMMIT_HASH, GEOMETRY_PATH, GEOMETRY_PROJECT_PATH,
    PARAMETERS_COMMIT_HASH, PARAMETERS_PATH, PARAMETERS_PROJECT_PATH, TARGET_PROJECT,
};
use crate::schema::{
    CalculationRequest, ParameterBlock, ParameterValue, RequestMeta, SCHEMA_VERSION,
    SourceReference,
};

pub fn build(form: &FormValues, strategy: StrategyId) -> CalculationRequest {
    let parameters_path = form.text(PARAMETERS_PATH);
    let parameters_path = if parameters_path.trim().is_empty() {
        None
    } else {
        Some(parameters_path.to_string())
    };

    CalculationRequest {
        schema_version: SCHEMA_VERSION.to_string(),
        meta: RequestMeta {
            target_project_path: form.text(TARGET_PROJECT).to_string(),
        },
        geometry_source: SourceReference::geometry(
            form.text(GEOMETRY_PROJECT_PATH),
            form.text(GEOMETRY_COMMIT_HASH),
            form.text(GEOMETRY_PATH),
        ),
        parameters_source: SourceReference::parameters(
            form.text(PARAMETERS_PROJECT_PATH),
            form.text(PARAMETERS_COMMIT_HASH),
            parameters_path,
        ),
        calculation_strategy: strategy,
        parameters: build_parameters(form, strategy),
    }
}

/// Parameter block in registry order.
pub fn build_parameters(form: &FormValues, strategy: StrategyId) -> ParameterBlock {
    fields_for(strategy)
        .iter()
        .map(|spec| (spec.name, build_field(spec, form.get(spec.name))))
        .collect()
}

fn build_field(spec: &FieldSpec, raw: Option<&str>) -> ParameterValue {
    match spec.kind {
        FieldKind::NumberList => ParameterValue::list(&parse_number_array(raw.unwrap_or(""))),
        FieldKind::Scalar => ParameterValue::scalar(raw.and_then(parse_scalar).or(spec.default)),
        FieldKind::Constant => ParameterValue::scalar(spec.default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> FormValues {
        [
            (TARGET_PROJECT, "turbines/k-300"),
            (GEOMETRY_PROJECT_PATH, "geometry/k-300"),
            (GEOMETRY_COMMIT_HASH, "a1b2c3"),
            (GEOMETRY_PATH, "condenser_geometry.json"),
            (PARAMETERS_PROJECT_PATH, "params/k-300"),
            (PARAMETERS_COMMIT_HASH, "d4e5f6"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn metro_vickers_has_exactly_five_keys() {
        let mut form = sources();
        form.set("mass_flow_cooling_water", "8000");
        form.set("temperature_cooling_water_1", "20");
        form.set("coefficient_b", "0.6");
        form.set("mass_flow_flow_path_1", "150.5");
        form.set("degree_dryness_flow_path_1", "0.92");

        let request = build(&form, StrategyId::MetroVickers);
        let keys: Vec<_> = request.parameters.keys().collect();
        assert_eq!(
            keys,
            vec![
                "mass_flow_cooling_water",
                "temperature_cooling_water_1",
                "coefficient_b",
                "mass_flow_flow_path_1",
                "degree_dryness_flow_path_1",
            ]
        );
        assert!(!request.parameters.contains_key("BAP"));
        assert!(
            request
                .parameters
                .iter()
                .all(|(_, v)| matches!(v, ParameterValue::Scalar(Some(_))))
        );
        assert_eq!(
            request
                .parameters
                .get("mass_flow_flow_path_1")
                .and_then(ParameterValue::as_f64),
            Some(150.5)
        );
    }

    #[test]
    fn berman_lists_are_lossy_and_constant_is_written() {
        let mut form = sources();
        form.set("mass_flow_steam_list", "100, 120, x, 140");
        form.set("enthalpy_flow_path_1", "2450");
        form.set("mass_flow_cooling_water_list", "8000,9000");
        form.set("temperature_cooling_water_1_list", "");
        form.set("coefficient_R_list", "0.00012");
        form.set("BAP", "7");

        let block = build_parameters(&form, StrategyId::Berman);
        assert_eq!(
            block.get("mass_flow_steam_list").and_then(ParameterValue::as_list),
            Some(vec![100.0, 120.0, 140.0])
        );
        assert_eq!(
            block
                .get("temperature_cooling_water_1_list")
                .and_then(ParameterValue::as_list),
            Some(vec![])
        );
        assert_eq!(block.get("BAP").and_then(ParameterValue::as_f64), Some(1.0));
        assert_eq!(
            block.get("mass_flow_air").and_then(ParameterValue::as_f64),
            Some(0.0)
        );
    }

    #[test]
    fn optional_scalar_defaults_and_required_scalar_nulls() {
        let mut form = sources();
        form.set("temperature_air", "  ");
        form.set("mass_flow_flow_path_1", "not a number");

        let block = build_parameters(&form, StrategyId::Vku);
        assert_eq!(
            block.get("temperature_air").and_then(ParameterValue::as_f64),
            Some(20.0)
        );
        assert!(block.get("mass_flow_flow_path_1").unwrap().is_null());
        assert!(block.get("mass_flow_steam_nom").unwrap().is_null());
        assert_eq!(block.len(), 5);
    }

    #[test]
    fn explicit_zero_is_kept() {
        let mut form = sources();
        form.set("temperature_air", "0");
        let block = build_parameters(&form, StrategyId::Vku);
        assert_eq!(
            block.get("temperature_air").and_then(ParameterValue::as_f64),
            Some(0.0)
        );
    }

    #[test]
    fn blank_parameters_path_becomes_null() {
        let mut form = sources();
        form.set(PARAMETERS_PATH, "");
        let request = build(&form, StrategyId::Vku);
        assert_eq!(request.parameters_source.path, None);
        assert_eq!(
            request.geometry_source.path.as_deref(),
            Some("condenser_geometry.json")
        );

        let json = serde_json::to_value(&request).unwrap();
        assert!(json["parameters_source"]["path"].is_null());
        assert_eq!(json["schema_version"], "1.2");
        assert_eq!(json["_meta"]["target_project_path"], "turbines/k-300");
        assert_eq!(json["geometry_source"]["type"], "reference");
        assert_eq!(
            json["geometry_source"]["source_info"]["commit_hash"],
            "a1b2c3"
        );
    }

    #[test]
    fn blank_geometry_path_stays_a_string() {
        let mut form = sources();
        form.remove(GEOMETRY_PATH);
        let request = build(&form, StrategyId::Vku);
        assert_eq!(request.geometry_source.path.as_deref(), Some(""));
    }
}
