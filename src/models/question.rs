use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [AnswerLetter::A, AnswerLetter::B, AnswerLetter::C, AnswerLetter::D];

    pub fn as_str(self) -> &'static str {
        match self {
            AnswerLetter::A => "A",
            AnswerLetter::B => "B",
            AnswerLetter::C => "C",
            AnswerLetter::D => "D",
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerLetter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AnswerLetter::A),
            "B" => Ok(AnswerLetter::B),
            "C" => Ok(AnswerLetter::C),
            "D" => Ok(AnswerLetter::D),
            other => Err(Error::InvalidInput(format!("Invalid answer letter: {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Accuracy {
    Correct,
    Incorrect,
}

impl Accuracy {
    /// Exact letter comparison; a missing extraction never counts as correct.
    pub fn judge(extracted: Option<AnswerLetter>, correct: AnswerLetter) -> Self {
        match extracted {
            Some(letter) if letter == correct => Accuracy::Correct,
            _ => Accuracy::Incorrect,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Accuracy::Correct => "Correct",
            Accuracy::Incorrect => "Incorrect",
        }
    }
}

impl FromStr for Accuracy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Correct" => Ok(Accuracy::Correct),
            "Incorrect" => Ok(Accuracy::Incorrect),
            other => Err(Error::Internal(format!("Unknown accuracy value: {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnswerOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

impl AnswerOptions {
    pub fn get(&self, letter: AnswerLetter) -> &str {
        match letter {
            AnswerLetter::A => &self.a,
            AnswerLetter::B => &self.b,
            AnswerLetter::C => &self.c,
            AnswerLetter::D => &self.d,
        }
    }

    pub fn labeled(&self) -> impl Iterator<Item = (AnswerLetter, &str)> {
        AnswerLetter::ALL.into_iter().map(move |l| (l, self.get(l)))
    }
}

/// One multiple-choice item together with the result of its last grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(rename = "_id")]
    pub id: i64,
    pub question: String,
    #[serde(flatten)]
    pub options: AnswerOptions,
    pub correct_answer: AnswerLetter,
    #[serde(default)]
    pub model_response: Option<String>,
    #[serde(default)]
    pub accuracy: Option<Accuracy>,
    #[serde(default)]
    pub response_time_ms: Option<i64>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
}

/// The derived fields written by a single grading attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingUpdate {
    pub model_response: String,
    pub accuracy: Accuracy,
    pub response_time_ms: i64,
    pub graded_at: DateTime<Utc>,
}

impl QuestionRecord {
    pub fn apply(&mut self, update: &GradingUpdate) {
        self.model_response = Some(update.model_response.clone());
        self.accuracy = Some(update.accuracy);
        self.response_time_ms = Some(update.response_time_ms);
        self.graded_at = Some(update.graded_at);
    }
}
