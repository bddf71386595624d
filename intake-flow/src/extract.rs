//! Free-text extraction: turning a user utterance into a typed candidate
//! value for the slot currently being collected. Extraction answers "what
//! value did they mean"; range validation lives in [`crate::slot`].

use std::sync::LazyLock;

use regex::Regex;

use crate::slot::{Sex, SlotKey, SlotValue};

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}-?\d{3}").expect("valid zip pattern"));

/// Parse `utterance` as an answer for `slot`. Never panics; `None` means
/// no plausible value was found and the caller should re-ask.
pub fn extract(slot: SlotKey, utterance: &str) -> Option<SlotValue> {
    match slot {
        SlotKey::Age | SlotKey::GrossSalary | SlotKey::StartYear | SlotKey::AvgSickDaysPerYear => {
            first_number(utterance).map(SlotValue::Number)
        }
        SlotKey::Sex => extract_sex(utterance).map(SlotValue::Sex),
        SlotKey::IncludeSickLeave => extract_bool(utterance).map(SlotValue::Bool),
        SlotKey::RetirementYear => {
            if accepts_suggested(utterance) {
                Some(SlotValue::SuggestedYear)
            } else {
                first_number(utterance).map(SlotValue::Number)
            }
        }
        SlotKey::ZipCode => extract_zip(utterance),
    }
}

/// First run of ASCII digits after stripping whitespace, so "35 000" reads
/// as 35000 but "mam 35 lat, kod 00-001" reads as 35.
pub fn first_number(text: &str) -> Option<i64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let start = compact.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &compact[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

fn extract_sex(text: &str) -> Option<Sex> {
    let lower = text.to_lowercase();
    if lower.contains("mężczyzna") || lower.contains("mezczyzna") {
        return Some(Sex::M);
    }
    if lower.contains("kobieta") {
        return Some(Sex::F);
    }
    // Bare one-letter answers only; a lone "m" inside another word is not
    // an answer.
    match lower.trim() {
        "m" => Some(Sex::M),
        "k" => Some(Sex::F),
        _ => None,
    }
}

fn extract_bool(text: &str) -> Option<bool> {
    let lower = text.to_lowercase();
    if lower.contains("tak") || lower.contains("yes") || lower.contains("chc") {
        return Some(true);
    }
    if lower.contains("nie")
        || lower.contains("no")
        || lower.contains("pomiń")
        || lower.contains("pomin")
    {
        return Some(false);
    }
    None
}

/// Acceptance of the suggested retirement year instead of a literal one.
pub fn accepts_suggested(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("sugerowa")
        || lower.contains("sugeru")
        || lower.contains("tak")
        || lower.contains("domyśl")
}

fn extract_zip(text: &str) -> Option<SlotValue> {
    let lower = text.to_lowercase();
    if lower.contains("pomiń") || lower.contains("pomin") || lower.contains("nie") {
        return Some(SlotValue::ZipSkipped);
    }
    let matched = ZIP_RE.find(text)?;
    let digits: String = matched
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    Some(SlotValue::Zip(format!("{}-{}", &digits[..2], &digits[2..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_takes_first_digit_run_only() {
        assert_eq!(
            extract(SlotKey::Age, "mam 35 lat, kod 00-001"),
            Some(SlotValue::Number(35))
        );
    }

    #[test]
    fn number_joins_whitespace_separated_groups() {
        assert_eq!(first_number("zarabiam 12 500 brutto"), Some(12500));
    }

    #[test]
    fn number_absent_yields_none() {
        assert_eq!(extract(SlotKey::GrossSalary, "sporo"), None);
    }

    #[test]
    fn sex_full_words() {
        assert_eq!(
            extract(SlotKey::Sex, "jestem mężczyzną... mężczyzna"),
            Some(SlotValue::Sex(Sex::M))
        );
        assert_eq!(
            extract(SlotKey::Sex, "Kobieta"),
            Some(SlotValue::Sex(Sex::F))
        );
        assert_eq!(
            extract(SlotKey::Sex, "mezczyzna"),
            Some(SlotValue::Sex(Sex::M))
        );
    }

    #[test]
    fn sex_bare_letters() {
        assert_eq!(extract(SlotKey::Sex, " M "), Some(SlotValue::Sex(Sex::M)));
        assert_eq!(extract(SlotKey::Sex, "k"), Some(SlotValue::Sex(Sex::F)));
        assert_eq!(extract(SlotKey::Sex, "hmm"), None);
    }

    #[test]
    fn sick_leave_affirmative_and_negative_tokens() {
        assert_eq!(
            extract(SlotKey::IncludeSickLeave, "tak, chcę"),
            Some(SlotValue::Bool(true))
        );
        assert_eq!(
            extract(SlotKey::IncludeSickLeave, "pomiń to"),
            Some(SlotValue::Bool(false))
        );
        assert_eq!(
            extract(SlotKey::IncludeSickLeave, "Nie"),
            Some(SlotValue::Bool(false))
        );
        assert_eq!(extract(SlotKey::IncludeSickLeave, "hmm?"), None);
    }

    #[test]
    fn retirement_year_acceptance_beats_number() {
        assert_eq!(
            extract(SlotKey::RetirementYear, "tak, sugerowany 2056"),
            Some(SlotValue::SuggestedYear)
        );
        assert_eq!(
            extract(SlotKey::RetirementYear, "w 2060"),
            Some(SlotValue::Number(2060))
        );
    }

    #[test]
    fn zip_is_normalized_to_hyphenated_form() {
        assert_eq!(
            extract(SlotKey::ZipCode, "kod to 00123"),
            Some(SlotValue::Zip("00-123".to_string()))
        );
        assert_eq!(
            extract(SlotKey::ZipCode, "31-000 Kraków"),
            Some(SlotValue::Zip("31-000".to_string()))
        );
    }

    #[test]
    fn zip_can_be_declined() {
        assert_eq!(
            extract(SlotKey::ZipCode, "pomiń"),
            Some(SlotValue::ZipSkipped)
        );
        assert_eq!(
            extract(SlotKey::ZipCode, "nie podam"),
            Some(SlotValue::ZipSkipped)
        );
        assert_eq!(extract(SlotKey::ZipCode, "chwila"), None);
    }
}
