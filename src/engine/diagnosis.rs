//! Deterministic symptom-to-diagnosis matching.
//!
//! The engine is a pure function over the SET of submitted answers: an
//! ordered rule table is scanned from highest priority down and the first
//! matching rule names the diagnosis. No rule matching → the default label.
//! Submission order, duplicate answers, and answers to question ids no rule
//! mentions never change the outcome.

use serde::{Deserialize, Serialize};

/// Label returned when no rule matches
pub const DEFAULT_DIAGNOSIS: &str = "unspecified";

/// One answered question from the intake questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub value: String,
}

impl Answer {
    pub fn new(question_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            value: value.into(),
        }
    }
}

/// Condition a rule places on the submitted answers.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Every listed (question_id, value) pair must be present.
    AllOf(Vec<(String, String)>),
    /// At least one listed pair must be present.
    AnyOf(Vec<(String, String)>),
}

impl Predicate {
    fn matches(&self, answers: &[Answer]) -> bool {
        let has = |question_id: &str, value: &str| {
            answers
                .iter()
                .any(|a| a.question_id == question_id && a.value == value)
        };
        match self {
            Predicate::AllOf(pairs) => pairs.iter().all(|(q, v)| has(q, v)),
            Predicate::AnyOf(pairs) => pairs.iter().any(|(q, v)| has(q, v)),
        }
    }
}

/// One entry in the rule table.
#[derive(Debug, Clone)]
pub struct DiagnosisRule {
    pub label: String,
    pub priority: i32,
    pub predicate: Predicate,
}

impl DiagnosisRule {
    pub fn new(label: impl Into<String>, priority: i32, predicate: Predicate) -> Self {
        Self {
            label: label.into(),
            priority,
            predicate,
        }
    }
}

/// The rule table, kept sorted by descending priority. Sorting is stable,
/// so rules sharing a priority keep their declaration order.
#[derive(Debug, Clone)]
pub struct DiagnosisEngine {
    rules: Vec<DiagnosisRule>,
    default_label: String,
}

impl DiagnosisEngine {
    pub fn new(mut rules: Vec<DiagnosisRule>, default_label: impl Into<String>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            rules,
            default_label: default_label.into(),
        }
    }

    /// Engine with the built-in triage table.
    pub fn with_default_rules() -> Self {
        Self::new(default_rules(), DEFAULT_DIAGNOSIS)
    }

    /// Total: every answer sequence yields exactly one label.
    pub fn evaluate(&self, answers: &[Answer]) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(answers))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.default_label.as_str())
    }

    /// The table in evaluation order.
    pub fn rules(&self) -> &[DiagnosisRule] {
        &self.rules
    }
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(q, v)| (q.to_string(), v.to_string()))
        .collect()
}

/// Built-in triage table. More specific symptom sets carry higher priority
/// so they are tried before their subsets (pneumonia before flu).
fn default_rules() -> Vec<DiagnosisRule> {
    vec![
        DiagnosisRule::new(
            "pneumonia",
            90,
            Predicate::AllOf(pairs(&[
                ("fever", "yes"),
                ("cough", "yes"),
                ("shortness_of_breath", "yes"),
            ])),
        ),
        DiagnosisRule::new(
            "flu",
            80,
            Predicate::AllOf(pairs(&[("fever", "yes"), ("cough", "yes")])),
        ),
        DiagnosisRule::new(
            "angina",
            70,
            Predicate::AllOf(pairs(&[("fever", "yes"), ("sore_throat", "yes")])),
        ),
        DiagnosisRule::new(
            "common cold",
            60,
            Predicate::AllOf(pairs(&[("runny_nose", "yes"), ("sneezing", "yes")])),
        ),
        DiagnosisRule::new(
            "migraine",
            50,
            Predicate::AllOf(pairs(&[("headache", "yes"), ("nausea", "yes")])),
        ),
        DiagnosisRule::new(
            "gastritis",
            40,
            Predicate::AllOf(pairs(&[("stomach_pain", "yes")])),
        ),
        DiagnosisRule::new(
            "allergy",
            30,
            Predicate::AnyOf(pairs(&[("itchy_eyes", "yes"), ("rash", "yes")])),
        ),
    ]
}
