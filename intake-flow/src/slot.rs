use serde::{Deserialize, Serialize};

/// The closed set of fields the intake conversation collects, in the order
/// they are asked. The sequence is linear except for the sick-leave branch:
/// declining sick leave skips `AvgSickDaysPerYear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKey {
    Age,
    Sex,
    GrossSalary,
    StartYear,
    IncludeSickLeave,
    AvgSickDaysPerYear,
    RetirementYear,
    ZipCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    /// Statutory retirement age in Poland
    pub fn retirement_age(self) -> i32 {
        match self {
            Sex::M => 65,
            Sex::F => 60,
        }
    }
}

/// Typed candidate value produced by extraction, before range validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Number(i64),
    Sex(Sex),
    Bool(bool),
    Zip(String),
    /// User explicitly declined to give a zip code
    ZipSkipped,
    /// User accepted the suggested retirement year instead of naming one
    SuggestedYear,
}

/// Answer to the optional zip code slot. An explicit skip is recorded so
/// completion detection can tell "declined" apart from "not asked yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZipAnswer {
    Provided(String),
    Skipped,
}

/// Everything collected so far. All fields are required for completion
/// except `zip_code`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answers {
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub gross_salary: Option<u64>,
    pub start_year: Option<i32>,
    pub include_sick_leave: Option<bool>,
    pub avg_sick_days_per_year: Option<u32>,
    pub retirement_year: Option<i32>,
    pub zip_code: Option<ZipAnswer>,
}

impl Answers {
    /// The zip code, if one was provided (not skipped).
    pub fn zip(&self) -> Option<&str> {
        match &self.zip_code {
            Some(ZipAnswer::Provided(zip)) => Some(zip),
            _ => None,
        }
    }

    /// First required slot without a value, if any.
    pub fn missing_required(&self) -> Option<&'static str> {
        if self.age.is_none() {
            Some("age")
        } else if self.sex.is_none() {
            Some("sex")
        } else if self.gross_salary.is_none() {
            Some("grossSalary")
        } else if self.start_year.is_none() {
            Some("startYear")
        } else if self.include_sick_leave.is_none() {
            Some("includeSickLeave")
        } else if self.avg_sick_days_per_year.is_none() {
            Some("avgSickDaysPerYear")
        } else if self.retirement_year.is_none() {
            Some("retirementYear")
        } else {
            None
        }
    }
}

/// Default retirement year surfaced to the user: birth year plus the
/// statutory retirement age. Falls back to age 35 / male while those slots
/// are still unanswered, so the value is computable at any point.
pub fn suggested_retirement_year(answers: &Answers, current_year: i32) -> i32 {
    let age = answers.age.unwrap_or(35) as i32;
    let sex = answers.sex.unwrap_or(Sex::M);
    (current_year - age) + sex.retirement_age()
}

impl SlotKey {
    /// The slot a fresh conversation starts with.
    pub const FIRST: SlotKey = SlotKey::Age;

    pub fn required(self) -> bool {
        !matches!(self, SlotKey::ZipCode)
    }

    /// Transition table. `None` means the sequence is finished.
    pub fn next(self, answers: &Answers) -> Option<SlotKey> {
        match self {
            SlotKey::Age => Some(SlotKey::Sex),
            SlotKey::Sex => Some(SlotKey::GrossSalary),
            SlotKey::GrossSalary => Some(SlotKey::StartYear),
            SlotKey::StartYear => Some(SlotKey::IncludeSickLeave),
            SlotKey::IncludeSickLeave => {
                if answers.include_sick_leave == Some(true) {
                    Some(SlotKey::AvgSickDaysPerYear)
                } else {
                    Some(SlotKey::RetirementYear)
                }
            }
            SlotKey::AvgSickDaysPerYear => Some(SlotKey::RetirementYear),
            SlotKey::RetirementYear => Some(SlotKey::ZipCode),
            SlotKey::ZipCode => None,
        }
    }

    /// Validate an extracted value against this slot's range and merge it
    /// into `answers`. Returns false (and leaves `answers` untouched) when
    /// the value is out of range or of the wrong shape, which makes the
    /// conversation re-ask the same question.
    pub fn apply(self, answers: &mut Answers, value: SlotValue, current_year: i32) -> bool {
        match (self, value) {
            (SlotKey::Age, SlotValue::Number(n)) if (18..=100).contains(&n) => {
                answers.age = Some(n as u32);
                true
            }
            (SlotKey::Sex, SlotValue::Sex(sex)) => {
                answers.sex = Some(sex);
                true
            }
            (SlotKey::GrossSalary, SlotValue::Number(n)) if (0..=1_000_000).contains(&n) => {
                answers.gross_salary = Some(n as u64);
                true
            }
            (SlotKey::StartYear, SlotValue::Number(n))
                if n >= 1950 && n <= current_year as i64 =>
            {
                answers.start_year = Some(n as i32);
                true
            }
            (SlotKey::IncludeSickLeave, SlotValue::Bool(include)) => {
                answers.include_sick_leave = Some(include);
                if !include {
                    // Skipped slot still needs a value for the record
                    answers.avg_sick_days_per_year = Some(0);
                }
                true
            }
            (SlotKey::AvgSickDaysPerYear, SlotValue::Number(n)) if (0..=365).contains(&n) => {
                answers.avg_sick_days_per_year = Some(n as u32);
                true
            }
            (SlotKey::RetirementYear, SlotValue::SuggestedYear) => {
                answers.retirement_year = Some(suggested_retirement_year(answers, current_year));
                true
            }
            (SlotKey::RetirementYear, SlotValue::Number(n))
                if n >= current_year as i64 && n <= 2100 =>
            {
                answers.retirement_year = Some(n as i32);
                true
            }
            (SlotKey::ZipCode, SlotValue::Zip(zip)) => {
                answers.zip_code = Some(ZipAnswer::Provided(zip));
                true
            }
            (SlotKey::ZipCode, SlotValue::ZipSkipped) => {
                answers.zip_code = Some(ZipAnswer::Skipped);
                true
            }
            _ => false,
        }
    }
}
