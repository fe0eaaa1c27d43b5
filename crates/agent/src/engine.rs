//! Conversation Engine (C12, §4.12) — the orchestrator that wires C1-C11
//! into the per-turn pipeline and owns the `Responder` contract.
//!
//! Grounded on the teacher's `agent::processing::DomainAgent::process`
//! (staged pipeline with a `tracing` span per stage and `Result<_,
//! AgentError>` propagation) and `agent::response` (streaming accumulation
//! into a full text buffer). The `Responder` trait generalizes the
//! teacher's transport-agnostic event-channel split so both a WebSocket
//! and a voice transport can drive the same engine.

use crate::calendar;
use crate::circuit_breaker::{CircuitBreaker, CircuitCallError};
use crate::error::EngineError;
use crate::fallback;
use crate::memory::MemoryStore;
use crate::quota;

use once_cell::sync::Lazy;
use pregnancy_core::responder::ResponderError;
use pregnancy_core::{Conversation, ConversationId, FallbackEntry, Feature, Intent, Language, Responder, Role, Turn, UserId};
use pregnancy_llm::{LlmClient, LlmError, Message, PromptBuilder, PromptInput};
use pregnancy_persistence::Repository;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

/// Inbound request for one turn (§4.12): user id, optional conversation id,
/// the raw message, and a raw language code as received from the
/// transport (parsed internally via [`pregnancy_core::Language::parse`]).
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub user: UserId,
    pub conversation_id: Option<ConversationId>,
    pub message: String,
    pub language_code: String,
}

/// The subset of §6's nine engine knobs the orchestrator itself reads
/// directly; the rest (circuit threshold/cooldown, short-term window,
/// session-reset idle, rate-limit shape) are consumed by C3/C6/C7 at
/// construction time instead.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ai_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Timeout applied to each of step 12's four fan-out reads individually;
/// a read that exceeds it degrades to an empty default rather than
/// stalling the whole turn (§4.12 step 12, §9 "fan-out concurrency").
const FANOUT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Lightweight rule-based fact extraction (§4.12 step 18): "pregnant" plus
/// an N-week mention, N in [1, 42].
static PREGNANCY_WEEK_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})\s*weeks?").expect("valid pregnancy-week pattern"));

/// Failure modes of the circuit-protected LLM stage (§4.12 steps 14-16).
/// Kept internal to the engine: the circuit breaker is generic over the
/// error type it wraps, and none of these three needs to escape this
/// module except via the match in [`ConversationEngine::process`].
enum StageError {
    Llm(LlmError),
    Responder(ResponderError),
    Timeout,
}

impl From<LlmError> for StageError {
    fn from(err: LlmError) -> Self {
        StageError::Llm(err)
    }
}

impl From<ResponderError> for StageError {
    fn from(err: ResponderError) -> Self {
        StageError::Responder(err)
    }
}

/// Wires C1-C11 into the twenty-step per-turn pipeline (§4.12). Holds no
/// per-turn state itself — `repo`, `llm`, `memory`, and `circuit` are the
/// process-wide shared resources (§5, §9) a server binary constructs once
/// and hands to every connection.
pub struct ConversationEngine {
    repo: Arc<dyn Repository>,
    llm: Arc<LlmClient>,
    memory: Arc<MemoryStore>,
    circuit: Arc<CircuitBreaker>,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(
        repo: Arc<dyn Repository>,
        llm: Arc<LlmClient>,
        memory: Arc<MemoryStore>,
        circuit: Arc<CircuitBreaker>,
        config: EngineConfig,
    ) -> Self {
        Self { repo, llm, memory, circuit, config }
    }

    /// `process(context, request) -> (conversation_id, error)` (§4.12):
    /// the single entry point every transport drives a turn through.
    ///
    /// Quota/feature gating for the `chat` feature runs immediately after
    /// classification and before any persistence, matching §2's dataflow
    /// ordering ("classify -> quota -> small-talk shortcut?") literally
    /// rather than the abbreviated step list in §4.12, which omits an
    /// explicit quota step; see DESIGN.md for the full resolution.
    pub async fn process(
        &self,
        request: EngineRequest,
        responder: &dyn Responder,
    ) -> Result<ConversationId, EngineError> {
        let (language, language_code) = Language::parse(&request.language_code);

        // Step 1: ensure conversation.
        let conversation_id = self.ensure_conversation_id(&request, responder).await?;

        // Step 2: PII warning, content never logged.
        if pregnancy_text_processing::contains_pii(&request.message) {
            tracing::warn!(user = %request.user, conversation = %conversation_id, "turn contains PII; redacted before logging/LLM use");
        }

        // Step 3: classify.
        let classification = pregnancy_text_processing::classify(&request.message, language);
        let intent = classification.intent;
        tracing::debug!(user = %request.user, conversation = %conversation_id, intent = %intent, "classified turn");

        // Quota & Feature Gate (C5, §4.5, §7): feature-absent and
        // quota-denied are distinct user-visible errors.
        if !quota::has_feature(self.repo.as_ref(), &request.user, Feature::Chat).await {
            responder.send_error("Chat isn't included in your current plan.").await?;
            responder.send_done().await?;
            return Ok(conversation_id);
        }
        if !quota::check_quota(self.repo.as_ref(), &request.user, Feature::Chat).await {
            responder
                .send_error("You've reached your chat limit for this period. Please try again next period or upgrade your plan.")
                .await?;
            responder.send_done().await?;
            return Ok(conversation_id);
        }

        // Step 4: persist user turn. Fatal on failure (§7).
        let user_turn = self
            .repo
            .save_message(conversation_id, &request.user, Role::User, &request.message)
            .await?;

        // Step 5: append to short-term memory.
        self.memory.add(&request.user, user_turn.clone());

        // Step 6: small-talk shortcut.
        if intent == Intent::SmallTalk {
            let entry = fallback::for_intent(Intent::SmallTalk, language);
            self.emit_and_finish(&request, conversation_id, &entry, responder).await?;
            self.memory.reset_state(&request.user);
            return Ok(conversation_id);
        }

        // Step 7: idle reset of short-term memory.
        if self.memory.should_reset(&request.user) {
            self.memory.reset_short_term(&request.user);
        }

        // Step 8: symptom extraction for symptom reports and pregnancy
        // questions; persistence is best-effort.
        if matches!(intent, Intent::SymptomReport | Intent::PregnancyQuestion) {
            for symptom in pregnancy_text_processing::extract(&request.user, &request.message) {
                if let Err(e) = self.repo.save_symptom(symptom).await {
                    tracing::warn!(error = %e, user = %request.user, "failed to persist extracted symptom");
                }
            }
        }

        // Step 9: conversation-state FSM transition.
        self.memory.record_turn(&request.user, &request.message);

        // Step 10: calendar suggestion, sent before the LLM call starts.
        let decision = calendar::should_suggest(intent, &request.message);
        if decision.suggest {
            let suggestion = calendar::build_suggestion(intent, &request.message);
            responder.send_calendar_suggestion(&suggestion).await?;
        }

        // Step 11: circuit breaker pre-check.
        if self.circuit.is_open() {
            let entry = fallback::for_circuit_open(intent, language);
            self.emit_and_finish(&request, conversation_id, &entry, responder).await?;
            return Ok(conversation_id);
        }

        // Step 12: fan out four independent reads, joined before prompt
        // construction. Each degrades to an empty default on error/timeout
        // rather than failing the turn (§4.12 step 12).
        let (facts, symptoms, recent_turns, ai_name) = tokio::join!(
            self.load_facts(&request.user),
            self.load_symptoms(&request.user),
            async { self.memory.recent(&request.user) },
            self.load_ai_name(),
        );
        let filtered_recent: Vec<Turn> = recent_turns.into_iter().filter(|t| t.id != user_turn.id).collect();

        // Step 13: build the prompt.
        let sanitized = pregnancy_text_processing::sanitize_for_api(&request.message);
        let prompt_input = PromptInput {
            sanitized_message: &sanitized,
            language,
            language_code: &language_code,
            is_small_talk: false,
            recent_turns: &filtered_recent,
            facts: &facts,
            recent_symptoms: &symptoms,
            ai_name: &ai_name,
        };
        let messages = PromptBuilder::build(&prompt_input);

        // Steps 14-16: invoke the LLM through the circuit breaker under a
        // per-call deadline, streaming chunks to the responder as they
        // arrive (or sending the full text once for a blocking transport).
        let temperature = self.config.temperature;
        let max_tokens = self.config.max_tokens;
        let call_result = self
            .circuit
            .call(move || self.invoke_with_deadline(responder, messages, temperature, max_tokens))
            .await;

        let assistant_text = match call_result {
            Ok(text) => text,
            Err(CircuitCallError::Open) => {
                let entry = fallback::for_circuit_open(intent, language);
                self.emit_and_finish(&request, conversation_id, &entry, responder).await?;
                return Ok(conversation_id);
            }
            Err(CircuitCallError::Inner(StageError::Timeout)) => {
                let entry = fallback::for_timeout(intent, language);
                self.emit_and_finish(&request, conversation_id, &entry, responder).await?;
                return Ok(conversation_id);
            }
            Err(CircuitCallError::Inner(StageError::Llm(e))) => {
                tracing::warn!(error = %e, user = %request.user, "llm call failed");
                let entry = fallback::for_intent(intent, language);
                self.emit_and_finish(&request, conversation_id, &entry, responder).await?;
                return Ok(conversation_id);
            }
            Err(CircuitCallError::Inner(StageError::Responder(e))) => {
                return Err(EngineError::Responder(e));
            }
        };

        // Step 17: persist the assistant turn, logged and swallowed on
        // failure (§7).
        match self
            .repo
            .save_message(conversation_id, &request.user, Role::Assistant, &assistant_text)
            .await
        {
            Ok(turn) => self.memory.add(&request.user, turn),
            Err(e) => tracing::warn!(error = %e, user = %request.user, "failed to persist assistant turn"),
        }

        // Step 18: lightweight fact extraction.
        self.extract_pregnancy_week_fact(&request.user, &request.message).await;

        // Step 19: increment usage, best-effort.
        quota::increment_usage(self.repo.as_ref(), &request.user, Feature::Chat).await;

        // Step 20: done.
        responder.send_done().await?;
        Ok(conversation_id)
    }

    async fn ensure_conversation_id(
        &self,
        request: &EngineRequest,
        responder: &dyn Responder,
    ) -> Result<ConversationId, EngineError> {
        if let Some(id) = request.conversation_id {
            return Ok(id);
        }
        let title = Some(Conversation::auto_title(&request.message));
        let conversation = self.repo.create_conversation(&request.user, title).await?;
        responder.set_conversation_id(conversation.id).await?;
        Ok(conversation.id)
    }

    /// Emit a fallback/degraded-mode reply, persist it as the assistant
    /// turn (best effort), and finish the turn with `done` (§4.12 steps
    /// 6/11/15, §7, S4/S5).
    async fn emit_and_finish(
        &self,
        request: &EngineRequest,
        conversation_id: ConversationId,
        entry: &FallbackEntry,
        responder: &dyn Responder,
    ) -> Result<(), EngineError> {
        responder.send_message(&entry.content).await?;
        match self
            .repo
            .save_message(conversation_id, &request.user, Role::Assistant, &entry.content)
            .await
        {
            Ok(turn) => self.memory.add(&request.user, turn),
            Err(e) => tracing::warn!(error = %e, user = %request.user, "failed to persist fallback assistant turn"),
        }
        responder.send_done().await?;
        Ok(())
    }

    async fn load_facts(&self, user: &UserId) -> Vec<pregnancy_core::Fact> {
        match tokio::time::timeout(FANOUT_READ_TIMEOUT, self.repo.get_user_facts(user)).await {
            Ok(Ok(facts)) => facts,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, user = %user, "facts fan-out read failed; degrading to empty");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(user = %user, "facts fan-out read timed out; degrading to empty");
                Vec::new()
            }
        }
    }

    async fn load_symptoms(&self, user: &UserId) -> Vec<pregnancy_core::SymptomRecord> {
        match tokio::time::timeout(FANOUT_READ_TIMEOUT, self.repo.get_recent_symptoms(user, 10)).await {
            Ok(Ok(symptoms)) => symptoms,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, user = %user, "symptoms fan-out read failed; degrading to empty");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(user = %user, "symptoms fan-out read timed out; degrading to empty");
                Vec::new()
            }
        }
    }

    async fn load_ai_name(&self) -> String {
        let read = self.repo.get_system_setting(pregnancy_core::user::AI_NAME_SETTING_KEY);
        match tokio::time::timeout(FANOUT_READ_TIMEOUT, read).await {
            Ok(Ok(Some(setting))) => setting.value,
            Ok(Ok(None)) => String::new(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "ai_name fan-out read failed; degrading to empty");
                String::new()
            }
            Err(_) => {
                tracing::warn!("ai_name fan-out read timed out; degrading to empty");
                String::new()
            }
        }
    }

    /// Wraps the LLM stage with the per-call deadline (§4.12 step 14,
    /// §6 `ai_timeout`). Folded into the circuit-protected closure itself
    /// so a timeout counts as an LLM-dependency failure the same as a
    /// transport error (§4.7 does not explicitly separate the two; a
    /// stalled provider is as much a reason to open the breaker as a
    /// connection refusal).
    async fn invoke_with_deadline(
        &self,
        responder: &dyn Responder,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, StageError> {
        match tokio::time::timeout(self.config.ai_timeout, self.invoke_llm(responder, messages, temperature, max_tokens)).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout),
        }
    }

    /// Steps 14 and 16 combined: perform the request (streaming or
    /// blocking, by transport capability) and forward content to the
    /// responder as it becomes available, accumulating the full text for
    /// persistence.
    async fn invoke_llm(
        &self,
        responder: &dyn Responder,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, StageError> {
        if responder.supports_streaming() {
            let mut rx = self.llm.stream(messages, temperature, max_tokens).await?;
            let mut full = String::new();
            while let Some(item) = rx.recv().await {
                let chunk = item?;
                if !chunk.delta.is_empty() {
                    responder.send_message(&chunk.delta).await?;
                    full.push_str(&chunk.delta);
                }
                if chunk.done {
                    break;
                }
            }
            Ok(full)
        } else {
            let response = self.llm.complete(messages, temperature, max_tokens).await?;
            responder.send_message(&response.content).await?;
            Ok(response.content)
        }
    }

    /// Step 18: "<N> week" mention alongside "pregnant" upserts
    /// `pregnancy_week` at confidence 0.8, N in [1, 42] (§4.12, S2).
    async fn extract_pregnancy_week_fact(&self, user: &UserId, message: &str) {
        if !message.to_lowercase().contains("pregnant") {
            return;
        }
        let Some(captures) = PREGNANCY_WEEK_MENTION.captures(message) else {
            return;
        };
        let Ok(week) = captures[1].parse::<u32>() else {
            return;
        };
        if !(1..=42).contains(&week) {
            return;
        }
        if let Err(e) = self
            .repo
            .save_or_update_fact(user, pregnancy_core::fact::FACT_PREGNANCY_WEEK, &week.to_string(), 0.8)
            .await
        {
            tracing::warn!(error = %e, user = %user, "failed to upsert pregnancy_week fact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pregnancy_core::{CalendarSuggestion, PlanFeature, QuotaLimit, QuotaPeriod, Subscription, SubscriptionStatus};
    use pregnancy_persistence::InMemoryRepository;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Captures every frame a `Responder` call would have sent, for
    /// assertions (grounded on the teacher's test doubles for transport
    /// traits, e.g. `agent/tests` fakes implementing `ConversationContext`).
    #[derive(Default)]
    struct RecordingResponder {
        messages: Mutex<Vec<String>>,
        calendar: Mutex<Vec<CalendarSuggestion>>,
        errors: Mutex<Vec<String>>,
        done_count: Mutex<u32>,
        conversation_id: Mutex<Option<ConversationId>>,
        streaming: AtomicBool,
    }

    impl RecordingResponder {
        fn new(streaming: bool) -> Self {
            Self { streaming: AtomicBool::new(streaming), ..Default::default() }
        }
    }

    #[async_trait]
    impl Responder for RecordingResponder {
        async fn send_message(&self, chunk: &str) -> Result<(), ResponderError> {
            self.messages.lock().push(chunk.to_string());
            Ok(())
        }
        async fn send_calendar_suggestion(&self, suggestion: &CalendarSuggestion) -> Result<(), ResponderError> {
            self.calendar.lock().push(suggestion.clone());
            Ok(())
        }
        async fn send_error(&self, message: &str) -> Result<(), ResponderError> {
            self.errors.lock().push(message.to_string());
            Ok(())
        }
        async fn send_done(&self) -> Result<(), ResponderError> {
            *self.done_count.lock() += 1;
            Ok(())
        }
        async fn set_conversation_id(&self, id: ConversationId) -> Result<(), ResponderError> {
            *self.conversation_id.lock() = Some(id);
            Ok(())
        }
        fn supports_streaming(&self) -> bool {
            self.streaming.load(Ordering::SeqCst)
        }
    }

    fn repo_with_unlimited_chat_plan(user: &str) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.seed_subscription(Subscription {
            id: "sub1".to_string(),
            user: user.to_string(),
            plan: "unlimited".to_string(),
            status: SubscriptionStatus::Active,
            starts_at: chrono::Utc::now(),
            ends_at: None,
        });
        repo.seed_plan_feature(
            PlanFeature { feature: Feature::Chat, quota_limit: QuotaLimit::Unlimited, quota_period: QuotaPeriod::Monthly },
            "unlimited",
        );
        repo
    }

    fn engine(repo: Arc<dyn Repository>, llm: Arc<LlmClient>) -> ConversationEngine {
        ConversationEngine::new(
            repo,
            llm,
            Arc::new(MemoryStore::new(10, Duration::from_secs(3600))),
            Arc::new(CircuitBreaker::new(5, Duration::from_secs(300))),
            EngineConfig { ai_timeout: Duration::from_secs(5), temperature: 0.7, max_tokens: 200 },
        )
    }

    fn llm_client() -> Arc<LlmClient> {
        Arc::new(LlmClient::new("https://example.invalid", "test-key", "test-model").unwrap())
    }

    fn request(user: &str, message: &str) -> EngineRequest {
        EngineRequest {
            user: user.to_string(),
            conversation_id: None,
            message: message.to_string(),
            language_code: "en".to_string(),
        }
    }

    /// S1: new user, small talk — no LLM call, one canned reply, `done`,
    /// and the quota counter untouched (the call never reaches the
    /// increment step).
    #[tokio::test]
    async fn small_talk_short_circuits_without_llm_call() {
        let user = "u1";
        let repo: Arc<dyn Repository> = Arc::new(repo_with_unlimited_chat_plan(user));
        let eng = engine(repo.clone(), llm_client());
        let responder = RecordingResponder::new(true);

        let result = eng.process(request(user, "hello"), &responder).await;

        assert!(result.is_ok());
        assert_eq!(*responder.done_count.lock(), 1);
        assert_eq!(responder.messages.lock().len(), 1);
        assert!(responder.conversation_id.lock().is_some());
        assert!(responder.calendar.lock().is_empty());
    }

    /// Circuit-open pre-check (§4.12 step 11, S5): no LLM call, degraded
    /// reply drawn from the circuit-open catalogue, turn still completes.
    #[tokio::test]
    async fn open_circuit_short_circuits_with_fallback() {
        let user = "u1";
        let repo: Arc<dyn Repository> = Arc::new(repo_with_unlimited_chat_plan(user));
        let circuit = Arc::new(CircuitBreaker::new(1, Duration::from_secs(300)));
        // Force the breaker open before the turn starts.
        let _ = circuit.call(|| async { Err::<(), &str>("boom") }).await;
        assert!(circuit.is_open());

        let eng = ConversationEngine::new(
            repo,
            llm_client(),
            Arc::new(MemoryStore::new(10, Duration::from_secs(3600))),
            circuit,
            EngineConfig { ai_timeout: Duration::from_secs(5), temperature: 0.7, max_tokens: 200 },
        );
        let responder = RecordingResponder::new(true);

        let result = eng.process(request(user, "I have severe bleeding"), &responder).await;

        assert!(result.is_ok());
        assert_eq!(*responder.done_count.lock(), 1);
        assert_eq!(responder.messages.lock().len(), 1);
        // Calendar suggestion still fires before the short-circuited LLM branch.
        assert_eq!(responder.calendar.lock().len(), 1);
    }

    /// §7 "feature absent" / "quota denied": both deny before any turn is
    /// persisted and never reach the LLM.
    #[tokio::test]
    async fn quota_denied_emits_error_frame_without_llm_call() {
        let user = "u1";
        let repo = InMemoryRepository::new();
        repo.seed_subscription(Subscription {
            id: "sub1".to_string(),
            user: user.to_string(),
            plan: "free".to_string(),
            status: SubscriptionStatus::Active,
            starts_at: chrono::Utc::now(),
            ends_at: None,
        });
        repo.seed_plan_feature(
            PlanFeature { feature: Feature::Chat, quota_limit: QuotaLimit::Limited(0), quota_period: QuotaPeriod::Daily },
            "free",
        );
        let repo: Arc<dyn Repository> = Arc::new(repo);
        let eng = engine(repo, llm_client());
        let responder = RecordingResponder::new(true);

        let result = eng.process(request(user, "how big is my baby?"), &responder).await;

        assert!(result.is_ok());
        assert_eq!(responder.errors.lock().len(), 1);
        assert!(responder.messages.lock().is_empty());
        assert_eq!(*responder.done_count.lock(), 1);
    }

    /// No active subscription at all degrades to feature-absent, not a
    /// panic or an outer error (§4.5 "no active subscription -> feature
    /// absent").
    #[tokio::test]
    async fn no_subscription_is_feature_absent() {
        let user = "ghost";
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let eng = engine(repo, llm_client());
        let responder = RecordingResponder::new(true);

        let result = eng.process(request(user, "how big is my baby?"), &responder).await;

        assert!(result.is_ok());
        assert_eq!(responder.errors.lock().len(), 1);
        assert_eq!(*responder.done_count.lock(), 1);
    }
}
