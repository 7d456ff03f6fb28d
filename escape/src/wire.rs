//! JSON payloads exchanged with the progress store.
//!
//! Field names are camelCase on the wire. Both the HTTP client and the
//! server use these types, so they are the single definition of the contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::rubric::RUBRIC;
use crate::core::types::{Level, RuleCheck, TaskState, Verdict};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInitResponse {
    pub ok: bool,
    pub player_id: String,
}

/// Query string of `GET /api/progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub player_id: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub player_id: String,
    pub level: Level,
    pub tasks: TaskState,
    pub done: bool,
    /// Last manifest that passed validation (level 2 only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

/// Body of `POST /api/progress/update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub player_id: String,
    pub level: u8,
    pub task: String,
    pub completed: bool,
}

/// Body of `POST /api/level/2/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub player_id: String,
    pub manifest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub ok: bool,
    pub errors: Vec<String>,
    pub checks: BTreeMap<String, bool>,
}

impl From<&Verdict> for ValidateResponse {
    fn from(verdict: &Verdict) -> Self {
        Self {
            ok: verdict.ok,
            errors: verdict.errors.clone(),
            checks: verdict
                .checks
                .iter()
                .map(|check| (check.name.clone(), check.passed))
                .collect(),
        }
    }
}

impl From<ValidateResponse> for Verdict {
    /// Rebuild a verdict in rubric order. Rules missing from the response
    /// count as failed.
    fn from(response: ValidateResponse) -> Self {
        let checks = RUBRIC
            .iter()
            .map(|rule| RuleCheck {
                name: rule.name.to_string(),
                passed: response.checks.get(rule.name).copied().unwrap_or(false),
            })
            .collect();
        Verdict {
            ok: response.ok,
            checks,
            errors: response.errors,
        }
    }
}
