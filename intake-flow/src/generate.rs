//! The response-generation seam. The conversation engine builds a Polish
//! system prompt for the slot that was just answered (or needs re-asking)
//! and hands it, together with a bounded history window, to a
//! [`ResponseGenerator`] implementation. Generation failures never bubble
//! up; the engine substitutes a fixed fallback utterance instead.

use async_trait::async_trait;
use thiserror::Error;

use crate::slot::{Answers, SlotKey, suggested_retirement_year};
use crate::state::ChatMessage;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// No API credential was supplied for the remote text-generation call
    #[error("missing API credential")]
    MissingCredential,

    /// The remote call failed or timed out
    #[error("remote generation failed: {0}")]
    Remote(String),
}

/// Fixed apology shown when the remote generation call fails.
pub const FALLBACK_REMOTE: &str = "Przepraszam, wystąpił błąd. Spróbuj ponownie.";
/// Fixed message shown when no API credential is configured.
pub const FALLBACK_NO_CREDENTIAL: &str =
    "Przepraszam, brak klucza API. Skontaktuj się z administratorem.";

pub fn fallback_for(err: &GenerateError) -> &'static str {
    match err {
        GenerateError::MissingCredential => FALLBACK_NO_CREDENTIAL,
        GenerateError::Remote(_) => FALLBACK_REMOTE,
    }
}

/// Produces the assistant's next utterance from a system prompt, the last
/// few turns, and the user's latest message.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        utterance: &str,
    ) -> Result<String, GenerateError>;
}

const PERSONA: &str = "Jesteś przyjaznym asystentem emerytalnym, który pomaga ludziom zaplanować \
    przyszłość. Rozmawiasz naturalnie, po polsku, jak dobry znajomy - ciepło, z humorem, ale \
    profesjonalnie. Używaj emotikonów oszczędnie. Trzymaj odpowiedzi krótkie (max 2-3 zdania).";

/// System prompt for the turn that just processed `slot`. When `captured`
/// is false the extractor found no usable value and the prompt asks the
/// model to repeat the question for the same slot.
pub fn system_prompt(slot: SlotKey, answers: &Answers, captured: bool, current_year: i32) -> String {
    if !captured {
        return format!(
            "{PERSONA} Nie udało się odczytać odpowiedzi użytkownika. Uprzejmie i krótko zadaj \
             ponownie pytanie: {}",
            reask_question(slot, answers, current_year)
        );
    }

    match slot {
        SlotKey::Age => format!(
            "{PERSONA} Użytkownik podał swój wiek ({} lat). Potwierdź go w ludzki sposób i \
             naturalnie przejdź do pytania o płeć, np. \"Jesteś mężczyzną czy kobietą?\".",
            answers.age.unwrap_or_default()
        ),
        SlotKey::Sex => format!(
            "{PERSONA} Użytkownik podał płeć. Potwierdź krótko i od razu zapytaj o miesięczne \
             zarobki brutto w naturalny sposób, np. \"Ile zarabiasz miesięcznie brutto?\"."
        ),
        SlotKey::GrossSalary => format!(
            "{PERSONA} Użytkownik podał zarobki ({} zł). Możesz krótko zareagować. Zapytaj w \
             którym roku zaczął/zaczęła pracować, np. \"Od którego roku pracujesz?\".",
            answers.gross_salary.unwrap_or_default()
        ),
        SlotKey::StartYear => format!(
            "{PERSONA} Użytkownik podał rok rozpoczęcia pracy ({}). Możesz skomentować staż. \
             Zapytaj naturalnie czy chce uwzględnić dni chorobowe w obliczeniach (tak/nie).",
            answers.start_year.unwrap_or_default()
        ),
        SlotKey::IncludeSickLeave => {
            let suggested = suggested_retirement_year(answers, current_year);
            if answers.include_sick_leave == Some(true) {
                format!(
                    "{PERSONA} Użytkownik chce uwzględnić dni chorobowe. Zapytaj ile średnio dni \
                     chorobowych rocznie, np. \"Ile średnio dni chorobowych rocznie?\"."
                )
            } else {
                format!(
                    "{PERSONA} Użytkownik nie chce uwzględniać dni chorobowych. Potwierdź i \
                     zapytaj o rok emerytury KONIECZNIE podając sugerowany rok {suggested}, np. \
                     \"Okej, pomijamy. W którym roku planujesz emeryturę? (sugerowany: \
                     {suggested})\"."
                )
            }
        }
        SlotKey::AvgSickDaysPerYear => {
            let suggested = suggested_retirement_year(answers, current_year);
            format!(
                "{PERSONA} Użytkownik podał liczbę dni chorobowych ({}). Potwierdź krótko i \
                 zapytaj o planowany rok emerytury. MUSISZ podać sugerowany rok: {suggested}, np. \
                 \"A kiedy planujesz przejść na emeryturę? Sugeruję rok {suggested}\".",
                answers.avg_sick_days_per_year.unwrap_or_default()
            )
        }
        SlotKey::RetirementYear => format!(
            "{PERSONA} Użytkownik podał rok przejścia na emeryturę ({}). Zareaguj naturalnie na \
             to ile lat zostało. Zapytaj o kod pocztowy XX-XXX w swobodny sposób i daj wyraźnie \
             znać, że można go pominąć.",
            answers.retirement_year.unwrap_or_default()
        ),
        SlotKey::ZipCode => format!(
            "{PERSONA} To było ostatnie pytanie o kod pocztowy. Jeśli użytkownik pominął, \
             przyjmij to z gracją. Jeśli podał kod, potwierdź krótko i przyjaźnie, np. \"Super, \
             mamy wszystko!\"."
        ),
    }
}

fn reask_question(slot: SlotKey, answers: &Answers, current_year: i32) -> String {
    match slot {
        SlotKey::Age => "ile masz lat?".to_string(),
        SlotKey::Sex => "jesteś mężczyzną czy kobietą?".to_string(),
        SlotKey::GrossSalary => "ile zarabiasz miesięcznie brutto?".to_string(),
        SlotKey::StartYear => "w którym roku zacząłeś/zaczęłaś pracę?".to_string(),
        SlotKey::IncludeSickLeave => {
            "czy uwzględnić dni chorobowe w obliczeniach? (tak/nie)".to_string()
        }
        SlotKey::AvgSickDaysPerYear => "ile średnio dni chorobowych rocznie?".to_string(),
        SlotKey::RetirementYear => format!(
            "w którym roku planujesz emeryturę? (sugerowany: {})",
            suggested_retirement_year(answers, current_year)
        ),
        SlotKey::ZipCode => "jaki jest Twój kod pocztowy XX-XXX? (można pominąć)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Sex;

    const YEAR: i32 = 2026;

    fn answers_35_m() -> Answers {
        Answers {
            age: Some(35),
            sex: Some(Sex::M),
            ..Answers::default()
        }
    }

    #[test]
    fn sick_leave_declined_prompt_embeds_suggested_year() {
        let mut answers = answers_35_m();
        answers.include_sick_leave = Some(false);
        let prompt = system_prompt(SlotKey::IncludeSickLeave, &answers, true, YEAR);
        assert!(prompt.contains(&((YEAR - 35) + 65).to_string()));
    }

    #[test]
    fn sick_days_prompt_embeds_suggested_year() {
        let mut answers = answers_35_m();
        answers.sex = Some(Sex::F);
        answers.avg_sick_days_per_year = Some(10);
        let prompt = system_prompt(SlotKey::AvgSickDaysPerYear, &answers, true, YEAR);
        assert!(prompt.contains(&((YEAR - 35) + 60).to_string()));
    }

    #[test]
    fn failed_extraction_asks_the_same_question_again() {
        let prompt = system_prompt(SlotKey::Age, &Answers::default(), false, YEAR);
        assert!(prompt.contains("ile masz lat"));
        assert!(prompt.contains("ponownie"));
    }

    #[test]
    fn fallbacks_match_error_kind() {
        assert_eq!(
            fallback_for(&GenerateError::MissingCredential),
            FALLBACK_NO_CREDENTIAL
        );
        assert_eq!(
            fallback_for(&GenerateError::Remote("x".into())),
            FALLBACK_REMOTE
        );
    }
}
