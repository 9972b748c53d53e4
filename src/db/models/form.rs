//! Intake form records. Append-only: the core inserts and lists, never
//! updates or deletes.

use serde::Serialize;
use sqlx::FromRow;

use crate::db::DbPool;
use crate::engine::diagnosis::Answer;

/// A stored questionnaire submission, including the computed diagnosis.
#[derive(Debug, Clone, Serialize)]
pub struct FormRecord {
    pub id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub answers: Vec<Answer>,
    pub diagnosis: String,
    pub submitted_by: String,
    pub created_at: String,
}

/// Row shape as persisted; answers stay raw JSON until decoded.
#[derive(Debug, FromRow)]
struct FormRow {
    id: String,
    patient_name: String,
    doctor_name: String,
    answers: String,
    diagnosis: String,
    submitted_by: String,
    created_at: String,
}

impl FormRow {
    fn decode(self) -> Result<FormRecord, sqlx::Error> {
        let answers =
            serde_json::from_str(&self.answers).map_err(|e| sqlx::Error::ColumnDecode {
                index: "answers".into(),
                source: Box::new(e),
            })?;
        Ok(FormRecord {
            id: self.id,
            patient_name: self.patient_name,
            doctor_name: self.doctor_name,
            answers,
            diagnosis: self.diagnosis,
            submitted_by: self.submitted_by,
            created_at: self.created_at,
        })
    }
}

impl FormRecord {
    pub async fn insert(
        pool: &DbPool,
        patient_name: &str,
        doctor_name: &str,
        answers: &[Answer],
        diagnosis: &str,
        submitted_by: &str,
    ) -> Result<FormRecord, sqlx::Error> {
        let answers_json =
            serde_json::to_string(answers).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let record = FormRecord {
            id: uuid::Uuid::new_v4().to_string(),
            patient_name: patient_name.to_string(),
            doctor_name: doctor_name.to_string(),
            answers: answers.to_vec(),
            diagnosis: diagnosis.to_string(),
            submitted_by: submitted_by.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        sqlx::query(
            "INSERT INTO forms (id, patient_name, doctor_name, answers, diagnosis, submitted_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.patient_name)
        .bind(&record.doctor_name)
        .bind(&answers_json)
        .bind(&record.diagnosis)
        .bind(&record.submitted_by)
        .bind(&record.created_at)
        .execute(pool)
        .await?;

        Ok(record)
    }

    /// Forms addressed to a doctor, newest first.
    pub async fn list_for_doctor(
        pool: &DbPool,
        doctor_name: &str,
    ) -> Result<Vec<FormRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, FormRow>(
            "SELECT * FROM forms WHERE doctor_name = ? ORDER BY created_at DESC",
        )
        .bind(doctor_name)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(FormRow::decode).collect()
    }

    /// Forms a user submitted, newest first.
    pub async fn list_submitted_by(
        pool: &DbPool,
        user_id: &str,
    ) -> Result<Vec<FormRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, FormRow>(
            "SELECT * FROM forms WHERE submitted_by = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(FormRow::decode).collect()
    }
}
