//! The conversation state machine. One state per slot plus a terminal
//! `Complete` phase; each user turn is a single logical step: extract and
//! validate against the current slot, call the response generator, and
//! only then commit the staged answers and slot pointer.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::extract;
use crate::generate::{ResponseGenerator, fallback_for, system_prompt};
use crate::slot::{Answers, SlotKey};

/// How many prior messages are replayed to the generator for continuity.
pub const HISTORY_WINDOW: usize = 10;

pub const GREETING: &str = "Cześć! 👋 Widzę, że planujesz swoją emeryturę. Pomogę Ci szybko \
    wypełnić formularz - wystarczy, że odpowiesz na kilka pytań. Gotowy?";
pub const OPENING_QUESTION: &str = "Zacznijmy od podstaw - ile masz lat?";
pub const CLOSING_MESSAGE: &str =
    "Świetnie! Zebrałem wszystkie informacje. Przejdźmy do kalkulatora emerytury.";
pub const ALREADY_DONE_MESSAGE: &str =
    "Mamy już komplet informacji - wyniki znajdziesz w kalkulatorze emerytury.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Collecting(SlotKey),
    Complete,
}

/// Outcome of one user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// Waiting for the user's answer to this slot
    Collecting(SlotKey),
    /// All required slots were filled on this turn
    Completed,
    /// The conversation had already finished on an earlier turn
    AlreadyComplete,
}

#[derive(Debug, Clone)]
pub struct TurnResult {
    pub reply: String,
    pub status: TurnStatus,
    /// Whether this turn captured a value for the slot it was collecting
    pub slot_filled: bool,
}

/// Per-conversation state: the message log, the slot pointer, and the
/// answers collected so far. Created when a chat opens, discarded when it
/// closes; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub phase: Phase,
    pub answers: Answers,
    current_year: i32,
    dispatched: bool,
}

impl ConversationState {
    /// Fresh conversation, opening with the fixed greeting and the age
    /// question. `current_year` is captured once so defaulting and range
    /// checks stay consistent across the whole conversation.
    pub fn new(current_year: i32) -> Self {
        let mut state = Self {
            messages: Vec::new(),
            phase: Phase::Collecting(SlotKey::FIRST),
            answers: Answers::default(),
            current_year,
            dispatched: false,
        };
        state.push(Role::Assistant, GREETING);
        state.push(Role::Assistant, OPENING_QUESTION);
        state
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn current_slot(&self) -> Option<SlotKey> {
        match self.phase {
            Phase::Collecting(slot) => Some(slot),
            Phase::Complete => None,
        }
    }

    fn push(&mut self, role: Role, content: &str) {
        self.messages.push(ChatMessage {
            role,
            content: content.to_string(),
        });
    }

    /// The most recent messages, bounded by [`HISTORY_WINDOW`].
    pub fn history_window(&self) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(HISTORY_WINDOW);
        &self.messages[start..]
    }

    /// Process one user utterance. Answers and the slot pointer are staged
    /// and only committed after the generator call succeeds, so a failed
    /// remote call leaves the conversation exactly where it was (the
    /// utterance still lands in the log, followed by a fixed apology).
    pub async fn process_turn(
        &mut self,
        utterance: &str,
        generator: &dyn ResponseGenerator,
    ) -> TurnResult {
        let slot = match self.phase {
            Phase::Collecting(slot) => slot,
            Phase::Complete => {
                self.push(Role::User, utterance);
                self.push(Role::Assistant, ALREADY_DONE_MESSAGE);
                return TurnResult {
                    reply: ALREADY_DONE_MESSAGE.to_string(),
                    status: TurnStatus::AlreadyComplete,
                    slot_filled: false,
                };
            }
        };

        let mut staged = self.answers.clone();
        let filled = extract::extract(slot, utterance)
            .map(|value| slot.apply(&mut staged, value, self.current_year))
            .unwrap_or(false);
        let next_phase = if filled {
            match slot.next(&staged) {
                Some(next) => Phase::Collecting(next),
                None => Phase::Complete,
            }
        } else {
            Phase::Collecting(slot)
        };

        let prompt = system_prompt(slot, &staged, filled, self.current_year);
        let generated = generator
            .generate(&prompt, self.history_window(), utterance)
            .await;
        let reply = match generated {
            Ok(reply) => reply,
            Err(err) => {
                warn!(slot = ?slot, error = %err, "response generation failed");
                let apology = fallback_for(&err);
                self.push(Role::User, utterance);
                self.push(Role::Assistant, apology);
                return TurnResult {
                    reply: apology.to_string(),
                    status: TurnStatus::Collecting(slot),
                    slot_filled: false,
                };
            }
        };

        self.answers = staged;
        self.phase = next_phase;
        self.push(Role::User, utterance);
        self.push(Role::Assistant, &reply);

        match self.phase {
            Phase::Complete => {
                info!("intake conversation complete");
                self.push(Role::Assistant, CLOSING_MESSAGE);
                TurnResult {
                    reply: format!("{reply}\n\n{CLOSING_MESSAGE}"),
                    status: TurnStatus::Completed,
                    slot_filled: filled,
                }
            }
            Phase::Collecting(next) => {
                debug!(slot = ?next, filled, "awaiting next answer");
                TurnResult {
                    reply,
                    status: TurnStatus::Collecting(next),
                    slot_filled: filled,
                }
            }
        }
    }

    /// One-shot hand-off of the finished answers. Returns `Some` exactly
    /// once, after the conversation has completed; all later calls (and
    /// calls before completion) return `None`.
    pub fn take_completion(&mut self) -> Option<Answers> {
        if self.phase == Phase::Complete && !self.dispatched {
            self.dispatched = true;
            Some(self.answers.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{FALLBACK_REMOTE, GenerateError};
    use crate::slot::{Sex, ZipAnswer};
    use async_trait::async_trait;

    const YEAR: i32 = 2026;

    struct OkGenerator;

    #[async_trait]
    impl ResponseGenerator for OkGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            _history: &[ChatMessage],
            _utterance: &str,
        ) -> Result<String, GenerateError> {
            Ok("ok".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ResponseGenerator for FailingGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            _history: &[ChatMessage],
            _utterance: &str,
        ) -> Result<String, GenerateError> {
            Err(GenerateError::Remote("connection reset".to_string()))
        }
    }

    async fn run_to_completion(state: &mut ConversationState) {
        let generator = OkGenerator;
        for answer in [
            "mam 35 lat",
            "mężczyzna",
            "8000 zł",
            "od 2015",
            "nie",
            "tak, sugerowany",
        ] {
            state.process_turn(answer, &generator).await;
        }
    }

    #[tokio::test]
    async fn valid_age_advances_to_sex() {
        let mut state = ConversationState::new(YEAR);
        let result = state.process_turn("mam 35 lat", &OkGenerator).await;
        assert!(result.slot_filled);
        assert_eq!(result.status, TurnStatus::Collecting(SlotKey::Sex));
        assert_eq!(state.answers.age, Some(35));
    }

    #[tokio::test]
    async fn out_of_range_age_stays_on_age() {
        let mut state = ConversationState::new(YEAR);
        for bad in ["mam 17 lat", "101", "no pojęcia"] {
            let result = state.process_turn(bad, &OkGenerator).await;
            assert!(!result.slot_filled);
            assert_eq!(result.status, TurnStatus::Collecting(SlotKey::Age));
        }
        assert_eq!(state.answers.age, None);
    }

    #[tokio::test]
    async fn declining_sick_leave_jumps_to_retirement_year() {
        let mut state = ConversationState::new(YEAR);
        let generator = OkGenerator;
        for answer in ["35", "m", "8000", "2015"] {
            state.process_turn(answer, &generator).await;
        }
        let result = state.process_turn("nie", &generator).await;
        assert_eq!(
            result.status,
            TurnStatus::Collecting(SlotKey::RetirementYear)
        );
        assert_eq!(state.answers.avg_sick_days_per_year, Some(0));
    }

    #[tokio::test]
    async fn completes_without_zip_code_via_skip() {
        let mut state = ConversationState::new(YEAR);
        run_to_completion(&mut state).await;
        let result = state.process_turn("pomiń", &OkGenerator).await;
        assert_eq!(result.status, TurnStatus::Completed);
        assert_eq!(state.answers.zip_code, Some(ZipAnswer::Skipped));
        assert_eq!(state.answers.missing_required(), None);
        assert_eq!(state.answers.retirement_year, Some((YEAR - 35) + 65));
        // Closing acknowledgement is appended after the generated reply
        assert_eq!(
            state.messages.last().map(|m| m.content.as_str()),
            Some(CLOSING_MESSAGE)
        );
    }

    #[tokio::test]
    async fn completion_is_taken_exactly_once() {
        let mut state = ConversationState::new(YEAR);
        run_to_completion(&mut state).await;
        state.process_turn("00-001", &OkGenerator).await;
        assert!(state.take_completion().is_some());
        assert!(state.take_completion().is_none());

        // Further messages do not re-arm the dispatch
        let result = state.process_turn("halo?", &OkGenerator).await;
        assert_eq!(result.status, TurnStatus::AlreadyComplete);
        assert!(state.take_completion().is_none());
    }

    #[tokio::test]
    async fn take_completion_before_finishing_yields_nothing() {
        let mut state = ConversationState::new(YEAR);
        state.process_turn("35", &OkGenerator).await;
        assert!(state.take_completion().is_none());
    }

    #[tokio::test]
    async fn generator_failure_leaves_state_untouched() {
        let mut state = ConversationState::new(YEAR);
        state.process_turn("35", &OkGenerator).await;
        let before = state.answers.clone();

        let result = state.process_turn("kobieta", &FailingGenerator).await;
        assert_eq!(result.reply, FALLBACK_REMOTE);
        assert_eq!(result.status, TurnStatus::Collecting(SlotKey::Sex));
        assert!(!result.slot_filled);
        assert_eq!(state.answers, before);
        assert_eq!(state.answers.sex, None);
        assert_eq!(
            state.messages.last().map(|m| m.content.as_str()),
            Some(FALLBACK_REMOTE)
        );

        // The same answer goes through once the generator recovers
        let result = state.process_turn("kobieta", &OkGenerator).await;
        assert!(result.slot_filled);
        assert_eq!(state.answers.sex, Some(Sex::F));
    }

    #[tokio::test]
    async fn history_window_is_bounded() {
        let mut state = ConversationState::new(YEAR);
        for _ in 0..20 {
            state.process_turn("bez liczby", &OkGenerator).await;
        }
        assert_eq!(state.history_window().len(), HISTORY_WINDOW);
    }
}
