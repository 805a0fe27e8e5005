use serde::Serialize;

use careloop_core::domain::feedback::FeedbackRecord;
use careloop_core::domain::patient::PatientProfile;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    element_type: &'static str,
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            element_type: "button",
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlainTextInput {
    #[serde(rename = "type")]
    element_type: &'static str,
    pub action_id: String,
    pub multiline: bool,
}

impl PlainTextInput {
    pub fn new(action_id: impl Into<String>, multiline: bool) -> Self {
        Self { element_type: "plain_text_input", action_id: action_id.into(), multiline }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
    Input { block_id: String, label: TextObject, element: PlainTextInput },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    view_type: &'static str,
    pub callback_id: String,
    pub private_metadata: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub const ACTION_VIEW: &str = "alert.view.v1";
pub const ACTION_ACKNOWLEDGE: &str = "alert.acknowledge.v1";
pub const ACTION_REJECT: &str = "alert.reject.v1";
pub const REJECT_MODAL_CALLBACK: &str = "alert.reject_note.v1";
pub const REJECT_NOTE_BLOCK: &str = "alert.reject_note.block.v1";
pub const REJECT_NOTE_ACTION: &str = "alert.reject_note.text.v1";

/// Alert headline: first matched label, plus a count of the rest.
pub fn alert_headline(matched_labels: &[String]) -> String {
    match matched_labels {
        [] => "Critical feedback received".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{first} (+{} other critical issues)", rest.len()),
    }
}

fn feedback_summary(record: &FeedbackRecord) -> String {
    format!(
        "*Patient:* {} (NHS {})\n*Rating:* {}/5\n*Category:* {}\n*Comments:* {}",
        record.patient_name, record.nhs_number, record.rating, record.category, record.comments
    )
}

pub fn critical_alert_message(
    record: &FeedbackRecord,
    matched_labels: &[String],
) -> MessageTemplate {
    let headline = alert_headline(matched_labels);
    MessageBuilder::new(format!("Critical alert: {headline}"))
        .section("alert.headline.v1", |section| {
            section.mrkdwn(format!(":rotating_light: *Critical Alert*\n{headline}"));
        })
        .section("alert.summary.v1", |section| {
            section.mrkdwn(feedback_summary(record));
        })
        .actions("alert.actions.v1", |actions| {
            actions
                .button(ButtonElement::new(ACTION_VIEW, "View Details").value(record.id.0.clone()))
                .button(
                    ButtonElement::new(ACTION_ACKNOWLEDGE, "Acknowledge")
                        .style(ButtonStyle::Primary)
                        .value(record.id.0.clone()),
                )
                .button(
                    ButtonElement::new(ACTION_REJECT, "Reject")
                        .style(ButtonStyle::Danger)
                        .value(record.id.0.clone()),
                );
        })
        .context("alert.context.v1", |context| {
            context.plain(format!("Received {}", record.created_at.format("%Y-%m-%d %H:%M UTC")));
        })
        .build()
}

/// Terminal rendering after Acknowledge. No buttons remain, so the alert
/// cannot be actioned twice from the channel.
pub fn acknowledged_message(record: &FeedbackRecord, actor_name: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Alert acknowledged by {actor_name}"))
        .section("alert.summary.v1", |section| {
            section.mrkdwn(feedback_summary(record));
        })
        .context("alert.resolution.v1", |context| {
            context.mrkdwn(format!(":white_check_mark: Acknowledged by *{actor_name}*"));
        })
        .build()
}

/// Terminal rendering after Reject, carrying the reviewer's note.
pub fn rejected_message(record: &FeedbackRecord, actor_name: &str, note: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Alert rejected by {actor_name}"))
        .section("alert.summary.v1", |section| {
            section.mrkdwn(feedback_summary(record));
        })
        .context("alert.resolution.v1", |context| {
            context.mrkdwn(format!(":no_entry: Rejected by *{actor_name}*: {note}"));
        })
        .build()
}

/// Posted in-channel when a reviewer presses View Details.
pub fn patient_detail_message(
    profile: &PatientProfile,
    record: &FeedbackRecord,
) -> MessageTemplate {
    MessageBuilder::new(format!("Patient details for {}", profile.name))
        .section("alert.patient.v1", |section| {
            section.mrkdwn(format!(
                "*{}* (NHS {})\nAge {}, {}\nTreated for {} on {}",
                profile.name,
                profile.nhs_number,
                profile.age,
                profile.gender,
                profile.health_issue,
                profile.date_of_treatment
            ));
        })
        .section("alert.feedback.v1", |section| {
            section.mrkdwn(feedback_summary(record));
        })
        .build()
}

pub fn trend_summary_message(report: &str) -> MessageTemplate {
    MessageBuilder::new("Feedback trend summary")
        .section("trend.summary.v1", |section| {
            section.mrkdwn(report.to_owned());
        })
        .build()
}

/// Reject modal with a required note field. The caller's metadata (the
/// feedback id plus the source message) rides along in `private_metadata`
/// so the view submission can find its record and alert message.
pub fn reject_note_modal(private_metadata: &str) -> ModalView {
    ModalView {
        view_type: "modal",
        callback_id: REJECT_MODAL_CALLBACK.to_string(),
        private_metadata: private_metadata.to_string(),
        title: TextObject::plain("Reject Alert"),
        submit: TextObject::plain("Reject"),
        close: TextObject::plain("Cancel"),
        blocks: vec![Block::Input {
            block_id: REJECT_NOTE_BLOCK.to_string(),
            label: TextObject::plain("Why is this alert being rejected?"),
            element: PlainTextInput::new(REJECT_NOTE_ACTION, true),
        }],
    }
}
