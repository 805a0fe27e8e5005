//! Conversation runtime for patient feedback collection.
//!
//! This crate sits between the websocket transport and the core flow
//! engine:
//! - **Sessions** (`session`) - one in-memory conversation per patient,
//!   serialized per NHS number
//! - **Service** (`service`) - drives the flow engine, persists finished
//!   feedback, and composes the saved confirmation with live insight data
//!
//! The flow engine itself is pure; everything here owns the side effects
//! (repository reads and writes) the engine asks for.

pub mod service;
pub mod session;

pub use service::{FeedbackService, SessionStart};
pub use session::{FeedbackSession, SessionStore};
