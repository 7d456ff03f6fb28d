//! Fixed rubric for the deployment manifest level.
//!
//! Every rule is evaluated on every submission, even after an earlier rule
//! fails, so a single check reports every remaining gap.

use crate::core::manifest::{Node, parse_manifest};
use crate::core::types::{RuleCheck, Verdict};

/// Manifest handed to players at the start of the level.
pub const STARTER_MANIFEST: &str = include_str!("../../manifests/starter.yaml");
/// A manifest that satisfies every rule.
pub const PASSING_MANIFEST: &str = include_str!("../../manifests/passing.yaml");

pub const REQUIRED_API_VERSION: &str = "apps/v1";
pub const REQUIRED_KIND: &str = "Deployment";
pub const MIN_REPLICAS: i64 = 2;

/// One named predicate over the manifest root.
pub struct Rule {
    pub name: &'static str,
    /// Checklist label shown to the player.
    pub label: &'static str,
    /// Error reported when the rule fails.
    pub error: &'static str,
    check: fn(Node<'_>) -> bool,
}

impl Rule {
    pub fn evaluate(&self, root: Node<'_>) -> bool {
        (self.check)(root)
    }
}

pub const RUBRIC: &[Rule] = &[
    Rule {
        name: "apiVersion",
        label: "apiVersion = apps/v1",
        error: "apiVersion must be apps/v1",
        check: |root| root.get("apiVersion").as_str() == Some(REQUIRED_API_VERSION),
    },
    Rule {
        name: "kindDeployment",
        label: "kind = Deployment",
        error: "kind must be Deployment",
        check: |root| root.get("kind").as_str() == Some(REQUIRED_KIND),
    },
    Rule {
        name: "metadataName",
        label: "metadata.name exists",
        error: "metadata.name is required",
        check: |root| root.path("metadata.name").is_filled(),
    },
    Rule {
        name: "replicas",
        label: "replicas >= 2",
        error: "spec.replicas must be >= 2",
        check: |root| {
            root.path("spec.replicas")
                .as_i64()
                .is_some_and(|replicas| replicas >= MIN_REPLICAS)
        },
    },
    Rule {
        name: "image",
        label: "containers[0].image exists",
        error: "containers[0].image is required",
        check: |root| first_container(root).get("image").is_filled(),
    },
    Rule {
        name: "probes",
        label: "readinessProbe + livenessProbe present",
        error: "readinessProbe and livenessProbe are required",
        check: |root| {
            let container = first_container(root);
            container.get("readinessProbe").is_filled()
                && container.get("livenessProbe").is_filled()
        },
    },
    Rule {
        name: "resources",
        label: "resources.requests + limits present",
        error: "resources.requests/limits (cpu,memory) are required",
        check: |root| {
            let resources = first_container(root).get("resources");
            ["requests", "limits"].iter().all(|section| {
                ["cpu", "memory"]
                    .iter()
                    .all(|key| resources.get(section).get(key).is_filled())
            })
        },
    },
];

fn first_container(root: Node<'_>) -> Node<'_> {
    root.path("spec.template.spec.containers").at(0)
}

/// Parse `text` and evaluate the full rubric.
pub fn check_manifest(text: &str) -> Verdict {
    let manifest = match parse_manifest(text) {
        Ok(manifest) => manifest,
        Err(err) => return unparseable(&err.to_string()),
    };

    let root = manifest.root();
    let checks: Vec<RuleCheck> = RUBRIC
        .iter()
        .map(|rule| RuleCheck {
            name: rule.name.to_string(),
            passed: rule.evaluate(root),
        })
        .collect();
    let errors = RUBRIC
        .iter()
        .zip(&checks)
        .filter(|(_, check)| !check.passed)
        .map(|(rule, _)| rule.error.to_string())
        .collect();
    let ok = checks.iter().all(|check| check.passed);

    Verdict { ok, checks, errors }
}

fn unparseable(detail: &str) -> Verdict {
    Verdict {
        ok: false,
        checks: all_checks(false),
        errors: vec![format!("document is not parseable: {detail}")],
    }
}

fn all_checks(passed: bool) -> Vec<RuleCheck> {
    RUBRIC
        .iter()
        .map(|rule| RuleCheck {
            name: rule.name.to_string(),
            passed,
        })
        .collect()
}

/// One line of the rendered checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub name: &'static str,
    pub label: &'static str,
    pub satisfied: bool,
}

/// Checklist state for display.
///
/// The latest verdict wins. Without one, a level the progress store already
/// reports as complete renders fully satisfied.
pub fn checklist(verdict: Option<&Verdict>, level_complete: bool) -> Vec<ChecklistItem> {
    RUBRIC
        .iter()
        .map(|rule| ChecklistItem {
            name: rule.name,
            label: rule.label,
            satisfied: match verdict {
                Some(verdict) => verdict.passed(rule.name),
                None => level_complete,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(verdict: &Verdict, rule: &str) -> bool {
        verdict
            .checks
            .iter()
            .find(|check| check.name == rule)
            .map(|check| check.passed)
            .expect("rule reported")
    }

    #[test]
    fn passing_manifest_satisfies_every_rule() {
        let verdict = check_manifest(PASSING_MANIFEST);
        assert!(verdict.ok);
        assert!(verdict.errors.is_empty());
        assert_eq!(verdict.checks.len(), RUBRIC.len());
        assert!(verdict.checks.iter().all(|check| check.passed));
    }

    #[test]
    fn starter_manifest_misses_replicas_probes_and_resources() {
        let verdict = check_manifest(STARTER_MANIFEST);
        assert!(!verdict.ok);
        assert!(check(&verdict, "apiVersion"));
        assert!(check(&verdict, "kindDeployment"));
        assert!(check(&verdict, "metadataName"));
        assert!(!check(&verdict, "replicas"));
        assert!(check(&verdict, "image"));
        assert!(!check(&verdict, "probes"));
        assert!(!check(&verdict, "resources"));
        assert_eq!(
            verdict.errors,
            vec![
                "spec.replicas must be >= 2",
                "readinessProbe and livenessProbe are required",
                "resources.requests/limits (cpu,memory) are required",
            ]
        );
    }

    #[test]
    fn checks_are_reported_in_declaration_order() {
        let verdict = check_manifest("kind: Service");
        let names: Vec<&str> = verdict.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "apiVersion",
                "kindDeployment",
                "metadataName",
                "replicas",
                "image",
                "probes",
                "resources"
            ]
        );
        assert_eq!(verdict.errors.len(), RUBRIC.len());
    }

    #[test]
    fn unparseable_document_reports_single_structural_error() {
        let verdict = check_manifest("apiVersion: [apps/v1");
        assert!(!verdict.ok);
        assert_eq!(verdict.errors.len(), 1);
        assert!(verdict.errors[0].starts_with("document is not parseable"));
        assert_eq!(verdict.checks.len(), RUBRIC.len());
        assert!(verdict.checks.iter().all(|check| !check.passed));
    }

    #[test]
    fn duplicate_keys_make_the_document_unparseable() {
        let text =
            PASSING_MANIFEST.replacen("  replicas: 2\n", "  replicas: 1\n  replicas: 2\n", 1);
        assert_ne!(text, PASSING_MANIFEST);
        let verdict = check_manifest(&text);
        assert!(!verdict.ok);
        assert_eq!(verdict.errors.len(), 1);
        assert!(verdict.errors[0].starts_with("document is not parseable"));
        assert!(verdict.errors[0].contains("duplicate"));
        assert!(verdict.checks.iter().all(|check| !check.passed));
    }

    #[test]
    fn missing_structures_fail_rules_without_parse_error() {
        let verdict = check_manifest("apiVersion: apps/v1\nkind: Deployment\n");
        assert!(check(&verdict, "apiVersion"));
        assert!(check(&verdict, "kindDeployment"));
        assert_eq!(verdict.errors.len(), 5);
        assert!(
            verdict
                .errors
                .iter()
                .all(|err| !err.starts_with("document is not parseable"))
        );
    }

    #[test]
    fn replicas_must_be_an_integer_at_least_two() {
        for (replicas, expected) in [
            ("1", false),
            ("2", true),
            ("5", true),
            ("\"3\"", false),
            ("2.5", false),
        ] {
            let text = PASSING_MANIFEST.replace("replicas: 2", &format!("replicas: {replicas}"));
            assert_eq!(check(&check_manifest(&text), "replicas"), expected, "replicas: {replicas}");
        }
    }

    #[test]
    fn resources_need_cpu_and_memory_in_both_sections() {
        let text = PASSING_MANIFEST.replace("              memory: \"256Mi\"\n", "");
        let verdict = check_manifest(&text);
        assert!(!check(&verdict, "resources"));
        assert_eq!(
            verdict.errors,
            vec!["resources.requests/limits (cpu,memory) are required"]
        );
    }

    #[test]
    fn empty_metadata_name_fails() {
        let text = PASSING_MANIFEST.replace("  name: web\nspec:", "  name: \"\"\nspec:");
        let verdict = check_manifest(&text);
        assert!(!check(&verdict, "metadataName"));
        assert!(check(&verdict, "image"));
    }

    #[test]
    fn checklist_follows_verdict_then_remote_completion() {
        let untouched = checklist(None, false);
        assert!(untouched.iter().all(|item| !item.satisfied));

        let remote_done = checklist(None, true);
        assert!(remote_done.iter().all(|item| item.satisfied));

        let verdict = check_manifest(STARTER_MANIFEST);
        let items = checklist(Some(&verdict), true);
        let replicas = items.iter().find(|item| item.name == "replicas").expect("replicas");
        assert!(!replicas.satisfied);
        assert_eq!(items[0].label, "apiVersion = apps/v1");
    }
}
