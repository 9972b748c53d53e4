//! Questionnaire submission pipeline: session check, input validation,
//! diagnosis, append-only persistence.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

use crate::auth::session::{SessionError, SessionManager};
use crate::db::{DbPool, FormRecord, User};
use crate::engine::diagnosis::{Answer, DiagnosisEngine};

/// Maximum length for patient and doctor names
pub const MAX_NAME_LENGTH: usize = 120;
/// Maximum length for a single answer value
pub const MAX_ANSWER_VALUE_LENGTH: usize = 200;

lazy_static! {
    /// Question ids are lowercase snake_case identifiers
    static ref QUESTION_ID_REGEX: Regex = Regex::new(r"^[a-z][a-z0-9_]{0,63}$").unwrap();
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("not authenticated")]
    Unauthenticated,
    /// Field-specific so a UI can point at the offending input.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    /// Transient; the caller may retry the same submission.
    #[error("form storage unavailable")]
    Storage(#[source] sqlx::Error),
}

impl From<SessionError> for IntakeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Invalid => IntakeError::Unauthenticated,
            SessionError::Storage(e) => IntakeError::Storage(e),
        }
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> IntakeError {
    IntakeError::Validation {
        field,
        message: message.into(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitFormRequest {
    pub patient_name: String,
    pub doctor_name: String,
    pub answers: Vec<Answer>,
}

/// Runs one questionnaire submission end to end and answers the scoped
/// form listings.
#[derive(Clone)]
pub struct IntakeService {
    db: DbPool,
    sessions: SessionManager,
    engine: DiagnosisEngine,
}

impl IntakeService {
    pub fn new(db: DbPool, sessions: SessionManager, engine: DiagnosisEngine) -> Self {
        Self {
            db,
            sessions,
            engine,
        }
    }

    /// Session first, then input shape, then diagnosis, then the insert.
    /// Nothing is written unless every earlier step passed.
    pub async fn submit(
        &self,
        token: &str,
        request: SubmitFormRequest,
    ) -> Result<FormRecord, IntakeError> {
        let user_id = self.sessions.validate(token).await?;

        validate_submission(&request)?;

        let diagnosis = self.engine.evaluate(&request.answers);

        FormRecord::insert(
            &self.db,
            request.patient_name.trim(),
            request.doctor_name.trim(),
            &request.answers,
            diagnosis,
            &user_id,
        )
        .await
        .map_err(|e| {
            error!("Failed to store intake form: {}", e);
            IntakeError::Storage(e)
        })
    }

    /// Doctors see forms addressed to their display name; everyone else
    /// sees only forms they submitted.
    pub async fn list_for(&self, token: &str) -> Result<Vec<FormRecord>, IntakeError> {
        let user_id = self.sessions.validate(token).await?;
        let user = User::find_by_id(&self.db, &user_id)
            .await
            .map_err(IntakeError::Storage)?
            .ok_or(IntakeError::Unauthenticated)?;

        let forms = if user.is_doctor {
            FormRecord::list_for_doctor(&self.db, &user.display_name).await
        } else {
            FormRecord::list_submitted_by(&self.db, &user.id).await
        };
        forms.map_err(IntakeError::Storage)
    }
}

fn validate_submission(request: &SubmitFormRequest) -> Result<(), IntakeError> {
    let patient = request.patient_name.trim();
    if patient.is_empty() {
        return Err(invalid("patient_name", "Patient name is required"));
    }
    if patient.len() > MAX_NAME_LENGTH {
        return Err(invalid(
            "patient_name",
            format!("Patient name must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }

    let doctor = request.doctor_name.trim();
    if doctor.is_empty() {
        return Err(invalid("doctor_name", "Doctor name is required"));
    }
    if doctor.len() > MAX_NAME_LENGTH {
        return Err(invalid(
            "doctor_name",
            format!("Doctor name must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }

    if request.answers.is_empty() {
        return Err(invalid("answers", "At least one answer is required"));
    }
    for answer in &request.answers {
        if !QUESTION_ID_REGEX.is_match(&answer.question_id) {
            return Err(invalid(
                "answers",
                format!("Malformed question id: {:?}", answer.question_id),
            ));
        }
        if answer.value.trim().is_empty() {
            return Err(invalid(
                "answers",
                format!("Empty value for question '{}'", answer.question_id),
            ));
        }
        if answer.value.len() > MAX_ANSWER_VALUE_LENGTH {
            return Err(invalid(
                "answers",
                format!(
                    "Value for question '{}' must be at most {} characters",
                    answer.question_id, MAX_ANSWER_VALUE_LENGTH
                ),
            ));
        }
    }

    Ok(())
}
