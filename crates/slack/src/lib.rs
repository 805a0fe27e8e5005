//! Slack Integration - care team alert channel
//!
//! This crate provides the Slack side of careloop:
//! - **Block Kit** (`blocks`) - Rich message and modal builders
//! - **Notifier** (`notify`) - Web API client (`chat.postMessage`, `chat.update`, `views.open`)
//! - **Signature** (`signature`) - Request signing verification for the actions endpoint
//! - **Alerts** (`alerts`) - Critical feedback scan that posts interactive alerts
//! - **Triage** (`triage`) - Acknowledge / view / reject button handling
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Add the `chat:write` bot scope and install it to the alert channel
//! 3. Point the app's interactivity request URL at `/slack/actions`
//! 4. Set env vars: `CARELOOP_SLACK_BOT_TOKEN`, `CARELOOP_SLACK_SIGNING_SECRET`
//!
//! # Architecture
//!
//! ```text
//! Scheduler → AlertPipeline → Notifier → Slack channel
//!                                            ↓ button press
//! Slack → /slack/actions → signature check → TriageService → DB + chat.update
//! ```

pub mod alerts;
pub mod blocks;
pub mod notify;
pub mod signature;
pub mod triage;
