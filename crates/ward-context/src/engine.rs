//! Context state machine.
//!
//! [`ContextEngine::apply`] is the per-turn algorithm: ask the classifier
//! for an action, apply the transition to the conversation context, digest
//! the transcript, and hand everything to the synchronizer. The engine has
//! no state of its own; the caller owns the [`ConversationContext`] and is
//! responsible for persisting it after the call.
//!
//! Because every mutation happens on the in-memory context and persistence
//! is the caller's single commit point, a turn cancelled mid-call leaves
//! nothing partially committed.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use ward_core::ids::PatientId;
use ward_core::text::truncate_str;
use ward_llm::analyzer::{Action, Classifier, Summarizer};
use ward_settings::WardSettings;

use crate::constants::{
    DEFAULT_CHARS_PER_TOKEN, DEFAULT_HISTORY_CHAR_CAP, DEFAULT_SUMMARY_MAX_TOKENS,
    SUMMARY_UNAVAILABLE,
};
use crate::record::is_record;
use crate::sync::sync_record;
use crate::token_estimator::estimate_tokens;
use crate::types::{ConversationContext, Decision, PatientContext, Timing, TokenCounts};

// ─────────────────────────────────────────────────────────────────────────────
// Limits
// ─────────────────────────────────────────────────────────────────────────────

/// Caps and heuristics for one engine instance.
#[derive(Clone, Copy, Debug)]
pub struct EngineLimits {
    /// Byte cap on the concatenated history text sent to the summarizer.
    pub history_char_cap: usize,
    /// Output token budget for the summarization call.
    pub summary_max_tokens: u32,
    /// Bytes per token for the cheap token estimates.
    pub chars_per_token: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            history_char_cap: DEFAULT_HISTORY_CHAR_CAP,
            summary_max_tokens: DEFAULT_SUMMARY_MAX_TOKENS,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl EngineLimits {
    /// Build limits from settings.
    #[must_use]
    pub fn from_settings(settings: &WardSettings) -> Self {
        Self {
            history_char_cap: settings.context.history_char_cap,
            summary_max_tokens: settings.llm.summary_max_tokens,
            chars_per_token: settings.context.chars_per_token,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// The per-turn context state machine.
///
/// Classifier and summarizer are injected capabilities so the engine stays
/// testable with fakes and never reads ambient configuration.
pub struct ContextEngine {
    classifier: Arc<dyn Classifier>,
    summarizer: Arc<dyn Summarizer>,
    limits: EngineLimits,
}

impl ContextEngine {
    /// Create an engine with default limits.
    #[must_use]
    pub fn new(classifier: Arc<dyn Classifier>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self::with_limits(classifier, summarizer, EngineLimits::default())
    }

    /// Create an engine with explicit limits.
    #[must_use]
    pub fn with_limits(
        classifier: Arc<dyn Classifier>,
        summarizer: Arc<dyn Summarizer>,
        limits: EngineLimits,
    ) -> Self {
        Self {
            classifier,
            summarizer,
            limits,
        }
    }

    /// Decide and apply the context action for one turn.
    ///
    /// Infallible: classification and summarization failures degrade inside
    /// their capabilities, so the context is always left synchronized and a
    /// well-formed decision is always returned. The transcript digest covers
    /// the messages accumulated *before* this turn; the channel layer
    /// appends the current user message after this call returns.
    pub async fn apply(
        &self,
        user_text: &str,
        context: &mut ConversationContext,
    ) -> (Decision, Timing) {
        let start = Instant::now();

        let known = context.known_patient_ids();
        debug!(
            conversation_id = %context.conversation_id,
            active = ?context.active_patient_id,
            known = known.len(),
            "context turn start"
        );

        let classification = self
            .classifier
            .classify(user_text, context.active_patient_id.as_ref(), &known)
            .await;

        let decision = transition(
            classification.action,
            classification.patient_id.as_ref(),
            context,
        );

        let history = render_history(context, self.limits.history_char_cap);
        let chat_summary = if history.is_empty() {
            None
        } else {
            match self
                .summarizer
                .summarize(&history, self.limits.summary_max_tokens)
                .await
            {
                Some(digest) => Some(digest),
                None => Some(SUMMARY_UNAVAILABLE.to_owned()),
            }
        };

        let token_counts = TokenCounts {
            history_estimate: estimate_tokens(&history, self.limits.chars_per_token),
            summary_estimate: chat_summary
                .as_deref()
                .map_or(0, |digest| estimate_tokens(digest, self.limits.chars_per_token)),
        };

        let timing = Timing::from_durations(classification.elapsed, start.elapsed());
        sync_record(context, &timing, chat_summary.as_deref(), &token_counts);

        info!(
            conversation_id = %context.conversation_id,
            action = %classification.action,
            %decision,
            active = ?context.active_patient_id,
            "context turn complete"
        );
        (decision, timing)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transition table
// ─────────────────────────────────────────────────────────────────────────────

/// Apply one classifier action to the context. Pure with respect to the
/// arguments; evaluated in table order:
///
/// 1. `CLEAR` clears the active pointer, retains the registry.
/// 2. An id-bearing action without a candidate does nothing.
/// 3. A candidate equal to the current active patient is `UNCHANGED`
///    regardless of the action tag (same id always wins over the label).
/// 4. A known, different candidate switches the pointer; the registry is
///    not reordered.
/// 5. An unknown candidate gets a blank patient context appended and
///    becomes active.
/// 6. An explicit `UNCHANGED` is acknowledged without side effects, even
///    if the candidate differs from the stored id.
/// 7. Anything else (including the failure fallback `NONE`) does nothing.
pub(crate) fn transition(
    action: Action,
    candidate: Option<&PatientId>,
    context: &mut ConversationContext,
) -> Decision {
    match action {
        Action::Clear => {
            // Retain historical contexts for potential reuse
            context.active_patient_id = None;
            Decision::Clear
        }
        Action::ActivateNew | Action::SwitchExisting => match candidate {
            None => Decision::None,
            Some(patient_id) => activate(patient_id, context),
        },
        Action::Unchanged => Decision::Unchanged,
        Action::None => Decision::None,
    }
}

fn activate(patient_id: &PatientId, context: &mut ConversationContext) -> Decision {
    if Some(patient_id) == context.active_patient_id.as_ref() {
        return Decision::Unchanged;
    }
    if context.patients.contains_key(patient_id) {
        context.active_patient_id = Some(patient_id.clone());
        return Decision::SwitchExisting;
    }
    let _ = context.patients.insert(
        patient_id.clone(),
        PatientContext::new(patient_id.clone()),
    );
    context.active_patient_id = Some(patient_id.clone());
    Decision::NewBlank
}

/// Concatenate the substantive transcript as `role: text` lines, capped.
fn render_history(context: &ConversationContext, cap: usize) -> String {
    let lines: Vec<String> = context
        .transcript
        .messages()
        .iter()
        .filter(|message| !is_record(message))
        .map(|message| format!("{}: {}", message.role, message.text()))
        .collect();
    let joined = lines.join("\n");
    truncate_str(&joined, cap).to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
