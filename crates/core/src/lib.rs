pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flow;
pub mod insights;

pub use classify::{
    categorize, default_category_table, default_critical_table, default_issue_table, detect,
    KeywordTable, OTHER_CATEGORY,
};
pub use domain::conversation::ConversationState;
pub use domain::feedback::{FeedbackDraft, FeedbackId, FeedbackRecord};
pub use domain::notification::{NotificationKind, NotificationRecord};
pub use domain::patient::PatientProfile;
pub use errors::CoreError;
pub use flow::{FeedbackFlow, FlowAction, FlowEvent, FlowStage, StepOutcome};
pub use insights::{common_issues, trend_report, TrendReport};
