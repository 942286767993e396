use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Test {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSummary {
    pub id: i64,
    pub name: String,
    pub question_count: usize,
}

/// A single-correct-answer multiple choice question. `options` are in A..D order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub id: i64,
    pub test_id: i64,
    pub text: String,
    pub options: [String; 4],
    pub correct: AnswerLetter,
}

impl Question {
    /// Exact, case-insensitive letter match: "b" matches B, "BB" matches nothing.
    pub fn is_correct(&self, choice: &str) -> bool {
        choice.trim().to_uppercase() == self.correct.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub test_id: i64,
    pub text: String,
    pub options: [String; 4],
    pub correct: AnswerLetter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub label: String,
    pub url: String,
    /// `None` means the configured default capacity applies.
    pub capacity: Option<u32>,
    pub current_count: u32,
}

impl Group {
    pub fn effective_capacity(&self, default_capacity: u32) -> u32 {
        self.capacity.unwrap_or(default_capacity)
    }

    pub fn has_room(&self, default_capacity: u32) -> bool {
        self.current_count < self.effective_capacity(default_capacity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub label: String,
    pub url: String,
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub display_name: String,
    pub score: i64,
    pub last_group_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub id: i64,
    pub user_id: i64,
    pub score: u32,
    pub total: u32,
    pub group_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResult {
    pub user_id: i64,
    pub score: u32,
    pub total: u32,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [
        AnswerLetter::A,
        AnswerLetter::B,
        AnswerLetter::C,
        AnswerLetter::D,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_uppercase().as_str() {
            "A" => Some(AnswerLetter::A),
            "B" => Some(AnswerLetter::B),
            "C" => Some(AnswerLetter::C),
            "D" => Some(AnswerLetter::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
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

/// Coarse routing category a finisher is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingLetter {
    A,
    B,
}

impl RoutingLetter {
    pub fn for_percentage(percentage: f64, threshold: f64) -> Self {
        if percentage >= threshold {
            RoutingLetter::A
        } else {
            RoutingLetter::B
        }
    }

    /// Routes a finished quiz. An empty quiz always lands in B, whatever the threshold.
    pub fn for_score(score: u32, total: u32, threshold: f64) -> Self {
        if total == 0 {
            return RoutingLetter::B;
        }
        Self::for_percentage(score_percentage(score, total), threshold)
    }

    pub fn as_char(&self) -> char {
        match self {
            RoutingLetter::A => 'A',
            RoutingLetter::B => 'B',
        }
    }
}

impl fmt::Display for RoutingLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// `score / total * 100` rounded to two decimals; an empty quiz scores 0.
pub fn score_percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = f64::from(score) / f64::from(total) * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Splits a group label such as "A12" into its letter and numeric suffix.
pub fn parse_label(label: &str) -> Option<(char, u32)> {
    let mut chars = label.chars();
    let letter = chars.next().filter(|c| c.is_ascii_uppercase())?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|suffix| (letter, suffix))
}
