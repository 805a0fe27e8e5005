use sqlx::Row;

use careloop_core::domain::patient::PatientProfile;

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<PatientProfile, RepositoryError> {
    let nhs_number: String =
        row.try_get("nhs_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let age: i64 = row.try_get("age").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gender: String =
        row.try_get("gender").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let treatment: String =
        row.try_get("treatment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let date_of_treatment: String =
        row.try_get("date_of_treatment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let health_issue: String =
        row.try_get("health_issue").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let age = u8::try_from(age)
        .map_err(|_| RepositoryError::Decode(format!("age out of range: {age}")))?;

    Ok(PatientProfile { nhs_number, name, age, gender, treatment, date_of_treatment, health_issue })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_nhs_number(
        &self,
        nhs_number: &str,
    ) -> Result<Option<PatientProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT nhs_number, name, age, gender, treatment, date_of_treatment, health_issue
             FROM users WHERE nhs_number = ?",
        )
        .bind(nhs_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_profile(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, profile: PatientProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (nhs_number, name, age, gender, treatment, date_of_treatment, health_issue)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(nhs_number) DO UPDATE SET
                 name = excluded.name,
                 age = excluded.age,
                 gender = excluded.gender,
                 treatment = excluded.treatment,
                 date_of_treatment = excluded.date_of_treatment,
                 health_issue = excluded.health_issue",
        )
        .bind(&profile.nhs_number)
        .bind(&profile.name)
        .bind(i64::from(profile.age))
        .bind(&profile.gender)
        .bind(&profile.treatment)
        .bind(&profile.date_of_treatment)
        .bind(&profile.health_issue)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users").fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(count.max(0) as u64)
    }
}
