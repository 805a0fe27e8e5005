pub mod conversation;
pub mod feedback;
pub mod notification;
pub mod patient;
