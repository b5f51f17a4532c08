//! Pre-submission checks on a built request.
//!
//! Structural completeness only. Array cardinality, ranges and physical
//! plausibility belong to the calculation service.

use std::fmt;

use crate::schema::CalculationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    Geometry,
    Parameters,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRole::Geometry => f.write_str("Geometry"),
            SourceRole::Parameters => f.write_str("Parameters"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{role} source commit_hash is required")]
    MissingCommitHash { role: SourceRole },

    #[error("Parameters cannot be empty")]
    EmptyParameters,
}

/// Checks run in order and stop at the first failure.
pub fn validate_request(request: &CalculationRequest) -> Result<(), ValidationError> {
    if request.geometry_source.commit_hash().trim().is_empty() {
        return Err(ValidationError::MissingCommitHash {
            role: SourceRole::Geometry,
        });
    }

    if request.parameters_source.commit_hash().trim().is_empty() {
        return Err(ValidationError::MissingCommitHash {
            role: SourceRole::Parameters,
        });
    }

    if request.parameters.is_empty() {
        return Err(ValidationError::EmptyParameters);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParameterBlock, ParameterValue, RequestMeta, SourceReference};
    use cf_core::StrategyId;

    fn request(geometry_hash: &str, parameters_hash: &str) -> CalculationRequest {
        let parameters: ParameterBlock =
            [("mass_flow_flow_path_1", ParameterValue::scalar(Some(1.0)))]
                .into_iter()
                .collect();
        CalculationRequest {
            schema_version: "1.2".to_string(),
            meta: RequestMeta {
                target_project_path: "t".to_string(),
            },
            geometry_source: SourceReference::geometry("g", geometry_hash, "geom.json"),
            parameters_source: SourceReference::parameters("p", parameters_hash, None),
            calculation_strategy: StrategyId::Vku,
            parameters,
        }
    }

    #[test]
    fn complete_request_passes() {
        validate_request(&request("abc", "def")).unwrap();
    }

    #[test]
    fn geometry_hash_checked_first() {
        let err = validate_request(&request("", "")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingCommitHash {
                role: SourceRole::Geometry
            }
        );
        assert_eq!(err.to_string(), "Geometry source commit_hash is required");
    }

    #[test]
    fn whitespace_hash_is_missing() {
        let err = validate_request(&request("abc", "   ")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingCommitHash {
                role: SourceRole::Parameters
            }
        );
    }

    #[test]
    fn empty_parameters_rejected_last() {
        let mut req = request("abc", "def");
        req.parameters = ParameterBlock::new();
        assert_eq!(
            validate_request(&req).unwrap_err(),
            ValidationError::EmptyParameters
        );
    }
}
