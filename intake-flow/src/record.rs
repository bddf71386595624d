//! The finished-intake contract surface. Once a conversation completes,
//! its answers are frozen into a [`CompletionRecord`] and handed to a
//! [`CompletionSink`] exactly once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, Result};
use crate::slot::{Answers, Sex};

/// The assembled intake record. Field names follow the pension calculation
/// API body, so the record serializes straight into the `POST
/// /pension/calculate` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub age: u32,
    pub sex: Sex,
    pub gross_salary: u64,
    pub start_year: i32,
    pub include_sick_leave: bool,
    pub avg_sick_days_per_year: u32,
    pub retirement_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_pension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

impl CompletionRecord {
    /// Freeze completed answers into the hand-off record, merging any
    /// value the caller pre-seeded on an earlier screen. Errors name the
    /// first required slot that is still missing.
    pub fn from_answers(answers: &Answers, expected_pension: Option<f64>) -> Result<Self> {
        Ok(Self {
            age: answers.age.ok_or(IntakeError::MissingSlot("age"))?,
            sex: answers.sex.ok_or(IntakeError::MissingSlot("sex"))?,
            gross_salary: answers
                .gross_salary
                .ok_or(IntakeError::MissingSlot("grossSalary"))?,
            start_year: answers
                .start_year
                .ok_or(IntakeError::MissingSlot("startYear"))?,
            include_sick_leave: answers
                .include_sick_leave
                .ok_or(IntakeError::MissingSlot("includeSickLeave"))?,
            avg_sick_days_per_year: answers
                .avg_sick_days_per_year
                .ok_or(IntakeError::MissingSlot("avgSickDaysPerYear"))?,
            retirement_year: answers
                .retirement_year
                .ok_or(IntakeError::MissingSlot("retirementYear"))?,
            expected_pension,
            zip_code: answers.zip().map(str::to_string),
        })
    }
}

/// Downstream consumer of a finished record. The intake core's
/// responsibility ends at delivering a complete, validated record;
/// whatever the sink does with it (navigation, calculation submission) is
/// outside this crate.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn deliver(&self, record: CompletionRecord);
}
