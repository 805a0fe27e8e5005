use serde::{Deserialize, Serialize};

/// Registered patient looked up by NHS number on session init and by the
/// triage "view" action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub nhs_number: String,
    pub name: String,
    pub age: u8,
    pub gender: String,
    pub treatment: String,
    pub date_of_treatment: String,
    pub health_issue: String,
}
