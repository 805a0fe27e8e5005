//! Sample patients for local development and demos.

use careloop_core::domain::patient::PatientProfile;

use crate::repositories::{RepositoryError, UserRepository};

pub fn sample_patients() -> Vec<PatientProfile> {
    vec![
        PatientProfile {
            nhs_number: "1234567890".to_string(),
            name: "Alex Morgan".to_string(),
            age: 30,
            gender: "Male".to_string(),
            treatment: "Outpatient".to_string(),
            date_of_treatment: "2024-04-10".to_string(),
            health_issue: "Hypertension".to_string(),
        },
        PatientProfile {
            nhs_number: "1234567891".to_string(),
            name: "Priya Shah".to_string(),
            age: 24,
            gender: "Female".to_string(),
            treatment: "Orthopaedics".to_string(),
            date_of_treatment: "2025-04-26".to_string(),
            health_issue: "Leg Fracture".to_string(),
        },
    ]
}

/// Seeds the sample patients if the users table is empty. Idempotent, so it
/// is safe to call on every startup.
pub async fn seed_sample_patients(repo: &dyn UserRepository) -> Result<usize, RepositoryError> {
    if repo.count().await? > 0 {
        return Ok(0);
    }

    let patients = sample_patients();
    let seeded = patients.len();
    for patient in patients {
        repo.save(patient).await?;
    }
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::seed_sample_patients;
    use crate::repositories::{SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlUserRepository::new(pool);

        assert_eq!(seed_sample_patients(&repo).await.expect("first seed"), 2);
        assert_eq!(seed_sample_patients(&repo).await.expect("second seed"), 0);

        let found = repo.find_by_nhs_number("1234567891").await.expect("find");
        assert_eq!(found.expect("exists").health_issue, "Leg Fracture");
    }
}
