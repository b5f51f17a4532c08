//! Content digest of a request, used to recognise repeat submissions.

use sha2::{Digest, Sha256};

use crate::schema::CalculationRequest;

pub fn request_digest(request: &CalculationRequest) -> String {
    let mut hasher = Sha256::new();

    let request_json = serde_json::to_string(request).unwrap_or_default();
    hasher.update(request_json.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;
    use crate::form::{FormValues, GEOMETRY_COMMIT_HASH};
    use cf_core::StrategyId;

    #[test]
    fn digest_stability() {
        let form: FormValues = [("mass_flow_flow_path_1", "120")].into_iter().collect();
        let a = build(&form, StrategyId::Vku);
        let b = build(&form, StrategyId::Vku);
        assert_eq!(request_digest(&a), request_digest(&b));
        assert_eq!(request_digest(&a).len(), 64);
    }

    #[test]
    fn digest_differs_for_different_inputs() {
        let mut form = FormValues::new();
        form.set(GEOMETRY_COMMIT_HASH, "a1");
        let a = build(&form, StrategyId::Vku);
        form.set(GEOMETRY_COMMIT_HASH, "a2");
        let b = build(&form, StrategyId::Vku);
        assert_ne!(request_digest(&a), request_digest(&b));
        assert_ne!(
            request_digest(&a),
            request_digest(&build(&FormValues::new(), StrategyId::MetroVickers))
        );
    }
}
