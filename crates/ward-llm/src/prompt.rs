//! Classifier ruleset as versioned configuration.
//!
//! The classification rules (clear/reset phrasing, identifier extraction
//! and normalization, membership handling, output contract) are data, not
//! code: rule changes must not require touching the state machine. A
//! compiled v1 default ships with the crate; deployments can override it
//! with a JSON file named in settings.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ward_core::ids::PatientId;

/// Errors that can occur while loading a ruleset file.
#[derive(Debug, Error)]
pub enum RulesError {
    /// Reading the ruleset file failed.
    #[error("failed to read ruleset file: {0}")]
    Io(#[from] std::io::Error),

    /// The ruleset file is not valid JSON or has the wrong shape.
    #[error("failed to parse ruleset: {0}")]
    Json(#[from] serde_json::Error),
}

/// One worked example shown to the classifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExample {
    /// Example user message.
    pub input: String,
    /// Expected action tag.
    pub action: String,
    /// Expected extracted identifier, if any.
    #[serde(default)]
    pub patient_id: Option<String>,
}

/// Versioned classification ruleset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierRules {
    /// Ruleset version tag.
    pub version: String,
    /// Numbered rules, rendered in order.
    pub rules: Vec<String>,
    /// Worked examples, rendered after the rules.
    pub examples: Vec<RuleExample>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            rules: vec![
                "If the user clearly asks to clear/reset/remove the patient context, \
                 answer action \"CLEAR\" with patient_id null."
                    .to_string(),
                "If the user mentions a patient identifier anywhere in the message, extract \
                 the most specific identifier (e.g. \"patient_4\", \"patient_123\"). If it is \
                 identical to prior_patient_id answer \"UNCHANGED\"; if it is in \
                 known_patient_ids and different answer \"SWITCH_EXISTING\"; if it is not in \
                 known_patient_ids answer \"ACTIVATE_NEW\"."
                    .to_string(),
                "Normalize variants like \"patient 6\" or \"patient id patient_6\" to \
                 \"patient_6\". Be tolerant of typos like \"patiend id\"."
                    .to_string(),
                "Ignore vague references without an identifier; answer \"NONE\".".to_string(),
            ],
            examples: vec![
                RuleExample {
                    input: "switch to patient id patient_5".to_string(),
                    action: "ACTIVATE_NEW".to_string(),
                    patient_id: Some("patient_5".to_string()),
                },
                RuleExample {
                    input: "switch to patient with patient id patient_4".to_string(),
                    action: "ACTIVATE_NEW".to_string(),
                    patient_id: Some("patient_4".to_string()),
                },
                RuleExample {
                    input: "switch to patient 6".to_string(),
                    action: "ACTIVATE_NEW".to_string(),
                    patient_id: Some("patient_6".to_string()),
                },
                RuleExample {
                    input: "clear patient context".to_string(),
                    action: "CLEAR".to_string(),
                    patient_id: None,
                },
            ],
        }
    }
}

impl ClassifierRules {
    /// Load a ruleset from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load a ruleset from an optional path, falling back to the compiled
    /// default on a missing path or load failure (with a warning).
    #[must_use]
    pub fn load_or_default(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(Path::new(path)) {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!(error = %e, path, "failed to load classifier ruleset, using default");
                Self::default()
            }
        }
    }

    /// Render the system prompt for one classification call.
    #[must_use]
    pub fn render_system_prompt(&self, prior: Option<&str>, known: &[PatientId]) -> String {
        let known_json = serde_json::to_string(known).unwrap_or_else(|_| "[]".to_string());
        let mut out = String::new();
        out.push_str("You manage patient context for a medical chat application.\n\n");
        out.push_str("Inputs:\n");
        out.push_str(&format!("- prior_patient_id: {}\n", prior.unwrap_or("null")));
        out.push_str(&format!("- known_patient_ids: {known_json}\n\n"));
        out.push_str(&format!("Rules (ruleset {}):\n", self.version));
        for (i, rule) in self.rules.iter().enumerate() {
            out.push_str(&format!("{}. {rule}\n", i + 1));
        }
        out.push_str(
            "\nOutput STRICT JSON ONLY. No extra text, no code fences:\n\
             {\n\
             \x20 \"action\": \"<ONE OF: NONE | CLEAR | ACTIVATE_NEW | SWITCH_EXISTING | UNCHANGED>\",\n\
             \x20 \"patient_id\": \"<extracted_id_or_null>\"\n\
             }\n",
        );
        if !self.examples.is_empty() {
            out.push_str("\nExamples:\n");
            for example in &self.examples {
                let patient_id = match &example.patient_id {
                    Some(id) => format!("\"{id}\""),
                    None => "null".to_string(),
                };
                out.push_str(&format!(
                    "- \"{}\" -> {{\"action\": \"{}\", \"patient_id\": {patient_id}}}\n",
                    example.input, example.action
                ));
            }
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ruleset_is_v1() {
        let rules = ClassifierRules::default();
        assert_eq!(rules.version, "v1");
        assert!(!rules.rules.is_empty());
        assert!(!rules.examples.is_empty());
    }

    #[test]
    fn render_includes_prior_and_known_ids() {
        let rules = ClassifierRules::default();
        let known = vec![PatientId::from("patient_5"), PatientId::from("patient_6")];
        let prompt = rules.render_system_prompt(Some("patient_5"), &known);
        assert!(prompt.contains("- prior_patient_id: patient_5"));
        assert!(prompt.contains(r#"["patient_5","patient_6"]"#));
        assert!(prompt.contains("ruleset v1"));
    }

    #[test]
    fn render_with_no_prior_shows_null() {
        let rules = ClassifierRules::default();
        let prompt = rules.render_system_prompt(None, &[]);
        assert!(prompt.contains("- prior_patient_id: null"));
        assert!(prompt.contains("- known_patient_ids: []"));
    }

    #[test]
    fn render_lists_action_contract_and_examples() {
        let rules = ClassifierRules::default();
        let prompt = rules.render_system_prompt(None, &[]);
        assert!(prompt.contains("NONE | CLEAR | ACTIVATE_NEW | SWITCH_EXISTING | UNCHANGED"));
        assert!(prompt.contains(r#""switch to patient 6" -> {"action": "ACTIVATE_NEW", "patient_id": "patient_6"}"#));
        assert!(prompt.contains(r#""clear patient context" -> {"action": "CLEAR", "patient_id": null}"#));
    }

    #[test]
    fn rules_render_numbered_in_order() {
        let rules = ClassifierRules {
            version: "v2".to_string(),
            rules: vec!["first".to_string(), "second".to_string()],
            examples: Vec::new(),
        };
        let prompt = rules.render_system_prompt(None, &[]);
        assert!(prompt.contains("1. first\n2. second"));
        assert!(!prompt.contains("Examples:"));
    }

    #[test]
    fn load_or_default_with_no_path_is_default() {
        let rules = ClassifierRules::load_or_default(None);
        assert_eq!(rules.version, "v1");
    }

    #[test]
    fn load_or_default_with_bad_path_falls_back() {
        let rules = ClassifierRules::load_or_default(Some("/nonexistent/rules.json"));
        assert_eq!(rules.version, "v1");
    }

    #[test]
    fn load_reads_ruleset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"version": "v2", "rules": ["only rule"], "examples": []}"#,
        )
        .unwrap();

        let rules = ClassifierRules::load(&path).unwrap();
        assert_eq!(rules.version, "v2");
        assert_eq!(rules.rules, vec!["only rule".to_string()]);

        let loaded = ClassifierRules::load_or_default(path.to_str());
        assert_eq!(loaded.version, "v2");
    }

    #[test]
    fn ruleset_deserializes_from_json() {
        let json = r#"{
            "version": "v2",
            "rules": ["only rule"],
            "examples": [{"input": "reset", "action": "CLEAR"}]
        }"#;
        let rules: ClassifierRules = serde_json::from_str(json).unwrap();
        assert_eq!(rules.version, "v2");
        assert_eq!(rules.examples[0].patient_id, None);
    }
}
