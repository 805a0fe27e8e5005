pub mod engine;
pub mod prompts;
pub mod states;

pub use engine::FeedbackFlow;
pub use states::{FlowAction, FlowEvent, FlowStage, StepOutcome};
