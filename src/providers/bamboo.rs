//! Bamboo mock data source.
//!
//! Static payloads shaped like Bamboo's plan-listing and build-result REST
//! responses, for deterministic development and testing without a server.

use serde_json::{json, Value};

/// Bamboo-like plan listing with 3 predefined plans.
///
/// PROJ-PLAN1 is enabled with a successful latest build, PROJ-PLAN2 is
/// disabled with a failed build, PROJ-PLAN3 is enabled and currently
/// building.
pub fn get_bamboo_plans() -> Value {
    json!({
        "plans": {
            "size": 3,
            "start-index": 0,
            "max-result": 25,
            "plan": [
                {
                    "shortName": "PLAN1",
                    "shortKey": "PLAN1",
                    "type": "chain",
                    "enabled": true,
                    "link": {
                        "href": "https://bamboo.company.com/rest/api/latest/plan/PROJ-PLAN1",
                        "rel": "self"
                    },
                    "key": "PROJ-PLAN1",
                    "name": "Project Alpha - Build and Deploy",
                    "planKey": {
                        "key": "PROJ-PLAN1"
                    },
                    "projectKey": "PROJ",
                    "projectName": "Project Alpha",
                    "description": "Main build and deployment pipeline for Project Alpha",
                    "isActive": true,
                    "isBuilding": false,
                    "averageBuildTimeInSeconds": 420
                },
                {
                    "shortName": "PLAN2",
                    "shortKey": "PLAN2",
                    "type": "chain",
                    "enabled": false,
                    "link": {
                        "href": "https://bamboo.company.com/rest/api/latest/plan/PROJ-PLAN2",
                        "rel": "self"
                    },
                    "key": "PROJ-PLAN2",
                    "name": "Project Beta - Testing Pipeline",
                    "planKey": {
                        "key": "PROJ-PLAN2"
                    },
                    "projectKey": "PROJ",
                    "projectName": "Project Beta",
                    "description": "Automated testing pipeline for Project Beta components",
                    "isActive": false,
                    "isBuilding": false,
                    "averageBuildTimeInSeconds": 180
                },
                {
                    "shortName": "PLAN3",
                    "shortKey": "PLAN3",
                    "type": "chain",
                    "enabled": true,
                    "link": {
                        "href": "https://bamboo.company.com/rest/api/latest/plan/PROJ-PLAN3",
                        "rel": "self"
                    },
                    "key": "PROJ-PLAN3",
                    "name": "Project Gamma - Integration Tests",
                    "planKey": {
                        "key": "PROJ-PLAN3"
                    },
                    "projectKey": "PROJ",
                    "projectName": "Project Gamma",
                    "description": "End-to-end integration testing for Project Gamma services",
                    "isActive": true,
                    "isBuilding": true,
                    "averageBuildTimeInSeconds": 840
                }
            ]
        },
        "expand": "plans.plan",
        "link": {
            "href": "https://bamboo.company.com/rest/api/latest/plan",
            "rel": "self"
        }
    })
}

/// Bamboo-like latest build result for a plan key.
///
/// Unknown keys return an empty results envelope, never an error.
pub fn get_plan_results(plan_key: &str) -> Value {
    let result = match plan_key {
        "PROJ-PLAN1" => json!({
            "link": {
                "href": "https://bamboo.company.com/rest/api/latest/result/PROJ-PLAN1-123",
                "rel": "self"
            },
            "planName": "Project Alpha - Build and Deploy",
            "projectName": "Project Alpha",
            "buildResultKey": "PROJ-PLAN1-123",
            "lifeCycleState": "Finished",
            "id": 123,
            "buildNumber": 123,
            "state": "Successful",
            "buildState": "Successful",
            "buildRelativeTime": "2 hours ago",
            "buildTestSummary": "3 passed",
            "successfulTestCount": 3,
            "failedTestCount": 0,
            "finished": true,
            "successful": true,
            "buildReason": "Manual run by admin",
            "buildDurationInSeconds": 385,
            "buildDurationDescription": "6 minutes",
            "vcsRevisionKey": "abc123def456",
            "key": "PROJ-PLAN1-123"
        }),
        "PROJ-PLAN2" => json!({
            "link": {
                "href": "https://bamboo.company.com/rest/api/latest/result/PROJ-PLAN2-87",
                "rel": "self"
            },
            "planName": "Project Beta - Testing Pipeline",
            "projectName": "Project Beta",
            "buildResultKey": "PROJ-PLAN2-87",
            "lifeCycleState": "Finished",
            "id": 87,
            "buildNumber": 87,
            "state": "Failed",
            "buildState": "Failed",
            "buildRelativeTime": "1 day ago",
            "buildTestSummary": "2 passed, 1 failed",
            "successfulTestCount": 2,
            "failedTestCount": 1,
            "finished": true,
            "successful": false,
            "buildReason": "Code has been updated by developer",
            "buildDurationInSeconds": 145,
            "buildDurationDescription": "2 minutes",
            "vcsRevisionKey": "def456ghi789",
            "key": "PROJ-PLAN2-87"
        }),
        "PROJ-PLAN3" => json!({
            "link": {
                "href": "https://bamboo.company.com/rest/api/latest/result/PROJ-PLAN3-201",
                "rel": "self"
            },
            "planName": "Project Gamma - Integration Tests",
            "projectName": "Project Gamma",
            "buildResultKey": "PROJ-PLAN3-201",
            "lifeCycleState": "InProgress",
            "id": 201,
            "buildNumber": 201,
            "state": "Unknown",
            "buildState": "Unknown",
            "buildRelativeTime": "5 minutes ago",
            "buildTestSummary": "Running...",
            "successfulTestCount": 0,
            "failedTestCount": 0,
            "finished": false,
            "successful": false,
            "buildReason": "Scheduled trigger",
            "buildDurationInSeconds": 0,
            "buildDurationDescription": "Currently running",
            "vcsRevisionKey": "ghi789jkl012",
            "key": "PROJ-PLAN3-201"
        }),
        _ => return json!({"results": {"size": 0, "result": []}}),
    };

    json!({
        "results": {
            "size": 1,
            "start-index": 0,
            "max-result": 25,
            "result": [result]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_listing_has_three_plans() {
        let plans = get_bamboo_plans();
        let plan_list = plans["plans"]["plan"].as_array().unwrap();
        assert_eq!(plan_list.len(), 3);
        assert_eq!(plans["plans"]["size"], 3);
    }

    #[test]
    fn test_plan_listing_carries_nested_plan_keys() {
        let plans = get_bamboo_plans();
        for plan in plans["plans"]["plan"].as_array().unwrap() {
            assert_eq!(plan["planKey"]["key"], plan["key"]);
        }
    }

    #[test]
    fn test_plan_results_known_key() {
        let results = get_plan_results("PROJ-PLAN2");
        assert_eq!(results["results"]["size"], 1);
        assert_eq!(results["results"]["result"][0]["state"], "Failed");
    }

    #[test]
    fn test_plan_results_unknown_key_is_empty() {
        let results = get_plan_results("PROJ-MISSING");
        assert_eq!(results["results"]["size"], 0);
        assert_eq!(results["results"]["result"].as_array().unwrap().len(), 0);
    }
}
