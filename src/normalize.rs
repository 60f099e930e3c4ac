//! Plan listing normalization.
//!
//! Converts the raw Bamboo-shaped listing payload into typed, deterministic
//! pipeline descriptors. Validation happens here at the ingestion boundary;
//! downstream stages only see the typed form.

use serde_json::Value;

use crate::model::PipelineDescriptor;

/// Normalize a raw plan listing into sorted pipeline descriptors.
///
/// Every record yields a descriptor even when fields are missing; malformed
/// input degrades to defaults, never an error. The output is sorted ascending
/// by key so repeated calls on identical input are order-stable.
pub fn normalize_plans(raw: &Value) -> Vec<PipelineDescriptor> {
    let plans = raw
        .pointer("/plans/plan")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut normalized: Vec<PipelineDescriptor> = plans.iter().map(descriptor_from_plan).collect();
    normalized.sort_by(|a, b| a.key.cmp(&b.key));
    normalized
}

fn descriptor_from_plan(plan: &Value) -> PipelineDescriptor {
    PipelineDescriptor {
        key: str_field(plan, "key", "UNKNOWN"),
        name: str_field(plan, "name", "Unknown Plan"),
        enabled: bool_field(plan, "enabled"),
        short_name: str_field(plan, "shortName", ""),
        project_key: str_field(plan, "projectKey", ""),
        project_name: str_field(plan, "projectName", ""),
        description: str_field(plan, "description", ""),
        is_active: bool_field(plan, "isActive"),
        is_building: bool_field(plan, "isBuilding"),
        average_build_time_seconds: plan
            .get("averageBuildTimeInSeconds")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        link: plan
            .pointer("/link/href")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        original: plan.clone(),
    }
}

fn str_field(plan: &Value, field: &str, default: &str) -> String {
    plan.get(field)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn bool_field(plan: &Value, field: &str) -> bool {
    plan.get(field).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::bamboo::get_bamboo_plans;
    use serde_json::json;

    #[test]
    fn test_normalize_sorts_ascending_by_key() {
        let raw = json!({
            "plans": {
                "plan": [
                    {"key": "PROJ-C", "name": "Third"},
                    {"key": "PROJ-A", "name": "First"},
                    {"key": "PROJ-B", "name": "Second"}
                ]
            }
        });
        let plans = normalize_plans(&raw);
        let keys: Vec<&str> = plans.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["PROJ-A", "PROJ-B", "PROJ-C"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = get_bamboo_plans();
        let first = normalize_plans(&raw);
        let second = normalize_plans(&raw);
        let first_keys: Vec<&String> = first.iter().map(|p| &p.key).collect();
        let second_keys: Vec<&String> = second.iter().map(|p| &p.key).collect();
        assert_eq!(first_keys, second_keys);
    }

    #[test]
    fn test_normalize_defaults_missing_fields() {
        let raw = json!({"plans": {"plan": [{}]}});
        let plans = normalize_plans(&raw);
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.key, "UNKNOWN");
        assert_eq!(plan.name, "Unknown Plan");
        assert!(!plan.enabled);
        assert_eq!(plan.average_build_time_seconds, 0);
        assert_eq!(plan.link, "");
    }

    #[test]
    fn test_normalize_preserves_original_record() {
        let raw = get_bamboo_plans();
        let plans = normalize_plans(&raw);
        for plan in &plans {
            assert_eq!(plan.original["key"], Value::String(plan.key.clone()));
        }
    }

    #[test]
    fn test_normalize_malformed_payload_is_empty() {
        assert!(normalize_plans(&json!("not an object")).is_empty());
        assert!(normalize_plans(&json!({"plans": {}})).is_empty());
        assert!(normalize_plans(&json!({"plans": {"plan": "oops"}})).is_empty());
    }

    #[test]
    fn test_normalize_mock_listing() {
        let plans = normalize_plans(&get_bamboo_plans());
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].key, "PROJ-PLAN1");
        assert!(plans[0].enabled);
        assert_eq!(plans[0].average_build_time_seconds, 420);
        assert!(!plans[1].enabled);
        assert!(plans[2].is_building);
    }
}
