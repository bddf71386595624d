//! Conversational intake engine for the pension planner: a slot-filling
//! state machine over free-text Polish answers, plus the postal-code
//! voivodeship aggregation used by the reporting panel.
//!
//! The crate is UI-free. A caller feeds user utterances into
//! [`ConversationState::process_turn`] together with a
//! [`ResponseGenerator`] (the LLM seam); once every required slot is
//! filled, [`ConversationState::take_completion`] yields the answers
//! exactly once for hand-off through a [`CompletionSink`].

pub mod error;
pub mod extract;
pub mod generate;
pub mod record;
pub mod region;
pub mod slot;
pub mod state;

// Re-export commonly used types
pub use error::{IntakeError, Result};
pub use generate::{
    FALLBACK_NO_CREDENTIAL, FALLBACK_REMOTE, GenerateError, ResponseGenerator, system_prompt,
};
pub use record::{CompletionRecord, CompletionSink};
pub use region::{Voivodeship, VoivodeshipStat, voivodeship_stats};
pub use slot::{Answers, Sex, SlotKey, SlotValue, ZipAnswer, suggested_retirement_year};
pub use state::{
    ChatMessage, ConversationState, HISTORY_WINDOW, Phase, Role, TurnResult, TurnStatus,
};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedGenerator;

    #[async_trait]
    impl ResponseGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            system_prompt: &str,
            _history: &[ChatMessage],
            _utterance: &str,
        ) -> std::result::Result<String, GenerateError> {
            // Echo enough of the prompt to assert on suggested-year wiring
            Ok(system_prompt.to_string())
        }
    }

    #[tokio::test]
    async fn full_conversation_produces_a_complete_record() {
        let year = 2026;
        let mut state = ConversationState::new(year);
        let generator = ScriptedGenerator;

        let turns = [
            ("mam 40 lat", TurnStatus::Collecting(SlotKey::Sex)),
            ("kobieta", TurnStatus::Collecting(SlotKey::GrossSalary)),
            ("6 500 zł", TurnStatus::Collecting(SlotKey::StartYear)),
            ("2008", TurnStatus::Collecting(SlotKey::IncludeSickLeave)),
            ("tak", TurnStatus::Collecting(SlotKey::AvgSickDaysPerYear)),
            ("jakieś 12", TurnStatus::Collecting(SlotKey::RetirementYear)),
        ];
        for (utterance, expected) in turns {
            let result = state.process_turn(utterance, &generator).await;
            assert_eq!(result.status, expected, "after {utterance:?}");
        }

        // The retirement-year prompt must surface the suggested default
        let suggested = (year - 40) + 60;
        let result = state.process_turn("domyślny proszę", &generator).await;
        assert_eq!(result.status, TurnStatus::Collecting(SlotKey::ZipCode));
        assert_eq!(state.answers.retirement_year, Some(suggested));

        let result = state.process_turn("00-001", &generator).await;
        assert_eq!(result.status, TurnStatus::Completed);

        let answers = state.take_completion().expect("one-shot completion");
        let record = CompletionRecord::from_answers(&answers, Some(4200.0)).unwrap();
        assert_eq!(record.age, 40);
        assert_eq!(record.sex, Sex::F);
        assert_eq!(record.gross_salary, 6500);
        assert_eq!(record.start_year, 2008);
        assert!(record.include_sick_leave);
        assert_eq!(record.avg_sick_days_per_year, 12);
        assert_eq!(record.retirement_year, suggested);
        assert_eq!(record.zip_code.as_deref(), Some("00-001"));
        assert_eq!(record.expected_pension, Some(4200.0));
    }

    #[tokio::test]
    async fn suggested_year_is_surfaced_before_the_retirement_question() {
        let year = 2026;
        let mut state = ConversationState::new(year);
        let generator = ScriptedGenerator;
        for utterance in ["35", "m", "9000", "2012"] {
            state.process_turn(utterance, &generator).await;
        }
        // Declining sick leave: the generated reply (scripted to echo the
        // prompt) must already carry the suggested year
        let result = state.process_turn("nie", &generator).await;
        let suggested = ((year - 35) + 65).to_string();
        assert!(result.reply.contains(&suggested));
    }
}
