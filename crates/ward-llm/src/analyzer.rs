//! Context classification and summarization capabilities.
//!
//! A single deterministic LLM call decides the patient-context action for a
//! turn; a second call compresses transcript history into a short digest.
//! Both are exposed as capability traits so the context engine can be
//! constructed with fakes in tests.
//!
//! Failure policy: neither capability ever raises past this boundary. A
//! transport error, empty response, or malformed/invalid verdict degrades
//! to `(NONE, null, elapsed)`; a failed summary degrades to no digest.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use ward_core::ids::PatientId;
use ward_core::text::truncate_str;
use ward_settings::WardSettings;

use crate::prompt::ClassifierRules;
use crate::provider::{ChatCompletion, ChatRequest};

/// System prompt for the summarization call.
const SUMMARY_SYSTEM_PROMPT: &str = "Summarize the following chat in 3-6 crisp bullets. \
     Focus only on patient context (IDs, key requests, agent progress, next actions). \
     Avoid boilerplate. Keep it under ~80 words.";

// ─────────────────────────────────────────────────────────────────────────────
// Actions and classification outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Raw action tag produced by the classifier.
///
/// Distinct from the state machine's decision: the classifier proposes, the
/// state machine disposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Nothing context-relevant in the message (also the failure fallback).
    None,
    /// The user asked to clear the patient context.
    Clear,
    /// The message names a patient not seen before in this conversation.
    ActivateNew,
    /// The message names an already-known, non-active patient.
    SwitchExisting,
    /// The message names the currently active patient.
    Unchanged,
}

impl Action {
    /// Parse a wire action tag. Returns `None` for anything outside the
    /// closed set.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "NONE" => Some(Self::None),
            "CLEAR" => Some(Self::Clear),
            "ACTIVATE_NEW" => Some(Self::ActivateNew),
            "SWITCH_EXISTING" => Some(Self::SwitchExisting),
            "UNCHANGED" => Some(Self::Unchanged),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Clear => write!(f, "CLEAR"),
            Self::ActivateNew => write!(f, "ACTIVATE_NEW"),
            Self::SwitchExisting => write!(f, "SWITCH_EXISTING"),
            Self::Unchanged => write!(f, "UNCHANGED"),
        }
    }
}

/// Outcome of one classification call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Proposed action.
    pub action: Action,
    /// Candidate patient ID; populated only for `ACTIVATE_NEW`,
    /// `SWITCH_EXISTING`, and `UNCHANGED`.
    pub patient_id: Option<PatientId>,
    /// Wall-clock latency of the call.
    pub elapsed: Duration,
}

impl Classification {
    /// The degraded "no action" outcome.
    #[must_use]
    pub fn none(elapsed: Duration) -> Self {
        Self {
            action: Action::None,
            patient_id: None,
            elapsed,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability traits
// ─────────────────────────────────────────────────────────────────────────────

/// Decides the patient-context action for one user message.
///
/// Implementations must be infallible: every failure mode maps to
/// [`Classification::none`].
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one user message against the known context.
    async fn classify(
        &self,
        user_text: &str,
        prior_patient_id: Option<&PatientId>,
        known_patient_ids: &[PatientId],
    ) -> Classification;
}

/// Compresses transcript text into a short digest.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text` within `max_tokens`. `None` on any failure; a
    /// missing digest must not block context application.
    async fn summarize(&self, text: &str, max_tokens: u32) -> Option<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM-backed implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Limits for analyzer calls.
#[derive(Clone, Copy, Debug)]
pub struct AnalyzerLimits {
    /// Output token budget for one classification call.
    pub classify_max_tokens: u32,
    /// Byte cap applied to summarizer input.
    pub summary_input_cap: usize,
}

impl Default for AnalyzerLimits {
    fn default() -> Self {
        Self {
            classify_max_tokens: 200,
            summary_input_cap: 8000,
        }
    }
}

/// [`Classifier`] + [`Summarizer`] backed by a chat-completion provider.
pub struct LlmContextAnalyzer {
    model: Arc<dyn ChatCompletion>,
    rules: ClassifierRules,
    limits: AnalyzerLimits,
}

impl LlmContextAnalyzer {
    /// Create an analyzer with the default ruleset and limits.
    #[must_use]
    pub fn new(model: Arc<dyn ChatCompletion>) -> Self {
        Self {
            model,
            rules: ClassifierRules::default(),
            limits: AnalyzerLimits::default(),
        }
    }

    /// Create an analyzer with an explicit ruleset and limits.
    #[must_use]
    pub fn with_rules(
        model: Arc<dyn ChatCompletion>,
        rules: ClassifierRules,
        limits: AnalyzerLimits,
    ) -> Self {
        Self {
            model,
            rules,
            limits,
        }
    }

    /// Create an analyzer configured from settings (ruleset file override,
    /// token budgets, history cap).
    #[must_use]
    pub fn from_settings(model: Arc<dyn ChatCompletion>, settings: &WardSettings) -> Self {
        Self::with_rules(
            model,
            ClassifierRules::load_or_default(settings.llm.rules_path.as_deref()),
            AnalyzerLimits {
                classify_max_tokens: settings.llm.classify_max_tokens,
                summary_input_cap: settings.context.history_char_cap,
            },
        )
    }
}

#[async_trait]
impl Classifier for LlmContextAnalyzer {
    async fn classify(
        &self,
        user_text: &str,
        prior_patient_id: Option<&PatientId>,
        known_patient_ids: &[PatientId],
    ) -> Classification {
        let start = Instant::now();

        if user_text.is_empty() {
            debug!("empty input, skipping classifier call");
            return Classification::none(start.elapsed());
        }

        let system = self
            .rules
            .render_system_prompt(prior_patient_id.map(PatientId::as_str), known_patient_ids);
        let request = ChatRequest::deterministic(
            system,
            user_text,
            self.limits.classify_max_tokens,
        )
        .with_json_mode();

        let raw = match self.model.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    error = %e,
                    category = e.category(),
                    model = self.model.model(),
                    "context classification failed, degrading to NONE"
                );
                return Classification::none(start.elapsed());
            }
        };

        match parse_verdict(&raw) {
            Some((action, patient_id)) => {
                debug!(%action, ?patient_id, "classifier verdict");
                Classification {
                    action,
                    patient_id: patient_id.map(PatientId::from),
                    elapsed: start.elapsed(),
                }
            }
            None => {
                warn!(%raw, "malformed classifier output, degrading to NONE");
                Classification::none(start.elapsed())
            }
        }
    }
}

#[async_trait]
impl Summarizer for LlmContextAnalyzer {
    async fn summarize(&self, text: &str, max_tokens: u32) -> Option<String> {
        let capped = truncate_str(text, self.limits.summary_input_cap);
        let request = ChatRequest::deterministic(SUMMARY_SYSTEM_PROMPT, capped, max_tokens);

        match self.model.complete(&request).await {
            Ok(raw) => {
                let digest = raw.trim();
                if digest.is_empty() {
                    None
                } else {
                    Some(digest.to_owned())
                }
            }
            Err(e) => {
                warn!(error = %e, model = self.model.model(), "chat summarization failed");
                None
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Verdict parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Wire verdict: strict JSON with exactly two fields.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVerdict {
    action: String,
    #[serde(default)]
    patient_id: Option<Value>,
}

/// Parse a classifier response into `(action, candidate_id)`.
///
/// `None` means malformed output; the caller degrades exactly as for a
/// transport failure.
fn parse_verdict(raw: &str) -> Option<(Action, Option<String>)> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return None;
    }

    let verdict: RawVerdict = serde_json::from_str(body).ok()?;
    let action = Action::parse(verdict.action.trim().to_uppercase().as_str())?;
    let patient_id = verdict.patient_id.and_then(scalar_to_id);

    // Candidate ids accompany only the id-bearing actions.
    let patient_id = match action {
        Action::ActivateNew | Action::SwitchExisting | Action::Unchanged => patient_id,
        Action::None | Action::Clear => None,
    };
    Some((action, patient_id))
}

/// Coerce a JSON scalar to an identifier string; `null`, empty strings, and
/// non-scalar shapes are treated as absent.
fn scalar_to_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strip accidental Markdown code fences from a model response.
fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    if !s.starts_with("```") {
        return s;
    }
    let s = s.trim_matches('`');
    match s.split_once('\n') {
        Some((_, rest)) => rest.trim(),
        None => s.trim(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, ProviderResult};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted fake provider: pops one canned result per call and records
    /// the requests it receives.
    struct FakeModel {
        responses: Mutex<Vec<ProviderResult<String>>>,
        requests: Mutex<Vec<ChatRequest>>,
        calls: AtomicUsize,
    }

    impl FakeModel {
        fn new(responses: Vec<ProviderResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn reply(content: &str) -> Arc<Self> {
            Self::new(vec![Ok(content.to_owned())])
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> ChatRequest {
            self.requests.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatCompletion for FakeModel {
        fn model(&self) -> &str {
            "fake-model"
        }

        async fn complete(&self, request: &ChatRequest) -> ProviderResult<String> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(ProviderError::Other {
                    message: "no scripted response".into(),
                });
            }
            responses.remove(0)
        }
    }

    fn known(ids: &[&str]) -> Vec<PatientId> {
        ids.iter().map(|id| PatientId::from(*id)).collect()
    }

    fn analyzer(model: Arc<FakeModel>) -> LlmContextAnalyzer {
        LlmContextAnalyzer::new(model)
    }

    // ── classify: happy paths ─────────────────────────────────────────

    #[tokio::test]
    async fn classify_parses_valid_verdict() {
        let model = FakeModel::reply(r#"{"action": "ACTIVATE_NEW", "patient_id": "patient_5"}"#);
        let result = analyzer(model.clone())
            .classify("switch to patient id patient_5", None, &[])
            .await;
        assert_eq!(result.action, Action::ActivateNew);
        assert_eq!(result.patient_id, Some(PatientId::from("patient_5")));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn classify_sends_deterministic_json_request() {
        let model = FakeModel::reply(r#"{"action": "NONE", "patient_id": null}"#);
        let _ = analyzer(model.clone())
            .classify("hello", Some(&PatientId::from("patient_5")), &known(&["patient_5"]))
            .await;

        let request = model.last_request();
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.top_p, 0.0);
        assert_eq!(request.max_tokens, 200);
        assert!(request.json_mode);
        assert!(request.system.contains("prior_patient_id: patient_5"));
        assert!(request.system.contains(r#"["patient_5"]"#));
        assert_eq!(request.user, "hello");
    }

    #[tokio::test]
    async fn classify_tolerates_code_fences() {
        let model = FakeModel::reply(
            "```json\n{\"action\": \"SWITCH_EXISTING\", \"patient_id\": \"patient_6\"}\n```",
        );
        let result = analyzer(model)
            .classify("go back to patient 6", None, &known(&["patient_6"]))
            .await;
        assert_eq!(result.action, Action::SwitchExisting);
        assert_eq!(result.patient_id, Some(PatientId::from("patient_6")));
    }

    #[tokio::test]
    async fn classify_lowercase_action_is_normalized() {
        let model = FakeModel::reply(r#"{"action": " unchanged ", "patient_id": "patient_5"}"#);
        let result = analyzer(model).classify("patient_5 again", None, &[]).await;
        assert_eq!(result.action, Action::Unchanged);
    }

    #[tokio::test]
    async fn classify_coerces_numeric_id() {
        let model = FakeModel::reply(r#"{"action": "ACTIVATE_NEW", "patient_id": 6}"#);
        let result = analyzer(model).classify("patient 6", None, &[]).await;
        assert_eq!(result.patient_id, Some(PatientId::from("6")));
    }

    #[tokio::test]
    async fn classify_drops_id_for_clear() {
        let model = FakeModel::reply(r#"{"action": "CLEAR", "patient_id": "patient_5"}"#);
        let result = analyzer(model).classify("clear patient context", None, &[]).await;
        assert_eq!(result.action, Action::Clear);
        assert_eq!(result.patient_id, None);
    }

    // ── classify: short-circuit ───────────────────────────────────────

    #[tokio::test]
    async fn classify_empty_input_skips_provider_call() {
        let model = FakeModel::new(Vec::new());
        let result = analyzer(model.clone()).classify("", None, &[]).await;
        assert_eq!(result.action, Action::None);
        assert_eq!(result.patient_id, None);
        assert_eq!(model.call_count(), 0, "no provider call for empty input");
    }

    // ── classify: degradation ─────────────────────────────────────────

    #[tokio::test]
    async fn classify_degrades_on_transport_error() {
        let model = FakeModel::new(vec![Err(ProviderError::Api {
            status: 500,
            message: "overloaded".into(),
            retryable: true,
        })]);
        let result = analyzer(model).classify("switch to patient_5", None, &[]).await;
        assert_eq!(result.action, Action::None);
        assert_eq!(result.patient_id, None);
    }

    #[tokio::test]
    async fn classify_degrades_on_malformed_json() {
        let model = FakeModel::reply("definitely not json");
        let result = analyzer(model).classify("hello", None, &[]).await;
        assert_eq!(result.action, Action::None);
    }

    #[tokio::test]
    async fn classify_degrades_on_unknown_action_tag() {
        let model = FakeModel::reply(r#"{"action": "ESCALATE", "patient_id": null}"#);
        let result = analyzer(model).classify("hello", None, &[]).await;
        assert_eq!(result.action, Action::None);
    }

    #[tokio::test]
    async fn classify_degrades_on_extra_fields() {
        let model = FakeModel::reply(
            r#"{"action": "UNCHANGED", "patient_id": "patient_5", "confidence": 0.9}"#,
        );
        let result = analyzer(model).classify("hello", None, &[]).await;
        assert_eq!(result.action, Action::None);
    }

    #[tokio::test]
    async fn classify_treats_empty_string_id_as_absent() {
        let model = FakeModel::reply(r#"{"action": "ACTIVATE_NEW", "patient_id": "  "}"#);
        let result = analyzer(model).classify("a patient", None, &[]).await;
        assert_eq!(result.action, Action::ActivateNew);
        assert_eq!(result.patient_id, None);
    }

    // ── summarize ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn summarize_returns_trimmed_digest() {
        let model = FakeModel::reply("- patient_5 reviewed\n- labs pending\n");
        let digest = analyzer(model.clone()).summarize("user: hi", 200).await;
        assert_eq!(
            digest.as_deref(),
            Some("- patient_5 reviewed\n- labs pending")
        );
        let request = model.last_request();
        assert!(!request.json_mode);
        assert_eq!(request.max_tokens, 200);
    }

    #[tokio::test]
    async fn summarize_caps_input_length() {
        let model = FakeModel::reply("- digest");
        let long_text = "x".repeat(20_000);
        let _ = analyzer(model.clone()).summarize(&long_text, 200).await;
        assert_eq!(model.last_request().user.len(), 8000);
    }

    #[tokio::test]
    async fn summarize_returns_none_on_failure() {
        let model = FakeModel::new(vec![Err(ProviderError::EmptyResponse)]);
        let digest = analyzer(model).summarize("user: hi", 200).await;
        assert_eq!(digest, None);
    }

    // ── parsing helpers ───────────────────────────────────────────────

    #[test]
    fn strip_code_fences_passthrough() {
        assert_eq!(strip_code_fences(r#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(strip_code_fences("  {\"a\":1} \n"), "{\"a\":1}");
    }

    #[test]
    fn strip_code_fences_with_language_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strip_code_fences_without_newline() {
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn parse_verdict_null_id() {
        let (action, id) = parse_verdict(r#"{"action": "NONE", "patient_id": null}"#).unwrap();
        assert_eq!(action, Action::None);
        assert_eq!(id, None);
    }

    #[test]
    fn parse_verdict_missing_id_field() {
        let (action, id) = parse_verdict(r#"{"action": "CLEAR"}"#).unwrap();
        assert_eq!(action, Action::Clear);
        assert_eq!(id, None);
    }

    #[test]
    fn parse_verdict_rejects_non_scalar_id() {
        let (_, id) =
            parse_verdict(r#"{"action": "ACTIVATE_NEW", "patient_id": ["patient_5"]}"#).unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn parse_verdict_empty_body() {
        assert!(parse_verdict("").is_none());
        assert!(parse_verdict("   ").is_none());
    }

    #[test]
    fn action_parse_round_trips_display() {
        for action in [
            Action::None,
            Action::Clear,
            Action::ActivateNew,
            Action::SwitchExisting,
            Action::Unchanged,
        ] {
            assert_eq!(Action::parse(&action.to_string()), Some(action));
        }
        assert_eq!(Action::parse("RESET"), None);
    }

    #[test]
    fn from_settings_wires_limits() {
        let mut settings = WardSettings::default();
        settings.llm.classify_max_tokens = 150;
        settings.context.history_char_cap = 4000;

        let analyzer = LlmContextAnalyzer::from_settings(FakeModel::reply("{}"), &settings);
        assert_eq!(analyzer.limits.classify_max_tokens, 150);
        assert_eq!(analyzer.limits.summary_input_cap, 4000);
        assert_eq!(analyzer.rules.version, "v1");
    }

    #[test]
    fn action_serde_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&Action::ActivateNew).unwrap(),
            "\"ACTIVATE_NEW\""
        );
        let back: Action = serde_json::from_str("\"SWITCH_EXISTING\"").unwrap();
        assert_eq!(back, Action::SwitchExisting);
    }
}
