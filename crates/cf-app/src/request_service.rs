//! Building, checking, exporting and importing calculation requests.

use std::path::Path;

use cf_core::{FieldKind, STRATEGY_TABLE, StrategyId, fields_for};
use cf_project::{
    CalculationRequest, FormValues, build, export_configuration, import_configuration,
    source_form_values, validate_request,
};
use cf_results::repopulate;
use tracing::info;

use crate::error::{AppError, AppResult};

/// Strategy listing for the CLI.
#[derive(Debug, Clone)]
pub struct StrategySummary {
    pub id: StrategyId,
    pub label: &'static str,
    pub result_key: &'static str,
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Clone)]
pub struct FieldSummary {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<f64>,
}

/// A request read back from disk, with the form it populates.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedConfiguration {
    pub strategy: StrategyId,
    pub form: FormValues,
    pub request: CalculationRequest,
}

pub fn list_strategies() -> Vec<StrategySummary> {
    STRATEGY_TABLE
        .iter()
        .map(|entry| StrategySummary {
            id: entry.id,
            label: entry.label,
            result_key: entry.result_key,
            fields: fields_for(entry.id)
                .iter()
                .map(|spec| FieldSummary {
                    name: spec.name,
                    kind: spec.kind,
                    required: spec.required,
                    default: spec.default,
                })
                .collect(),
        })
        .collect()
}

/// Load form values from a YAML file and build a request from them.
pub fn build_request_from_form(path: &Path, strategy: StrategyId) -> AppResult<CalculationRequest> {
    let form = cf_project::load_form_yaml(path)?;
    Ok(build(&form, strategy))
}

/// Build and validate in one step.
pub fn prepare_request(form: &FormValues, strategy: StrategyId) -> AppResult<CalculationRequest> {
    let request = build(form, strategy);
    validate_request(&request)?;
    Ok(request)
}

pub fn read_request(path: &Path) -> AppResult<CalculationRequest> {
    Ok(read_configuration(path)?.request)
}

/// Export a request as pretty JSON. Drafts are written too; submission is
/// where requests are validated.
pub fn write_request(path: &Path, request: &CalculationRequest) -> AppResult<()> {
    let text = export_configuration(request)?;
    std::fs::write(path, text).map_err(|source| AppError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), strategy = %request.calculation_strategy, "request exported");
    Ok(())
}

pub fn parse_configuration(text: &str) -> AppResult<ImportedConfiguration> {
    let request = import_configuration(text)?;
    let strategy = request.calculation_strategy;

    let mut form = source_form_values(&request);
    form.extend(repopulate(strategy, &request.parameters));

    Ok(ImportedConfiguration {
        strategy,
        form,
        request,
    })
}

pub fn read_configuration(path: &Path) -> AppResult<ImportedConfiguration> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_configuration(&text)
}
