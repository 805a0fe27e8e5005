//! Patient-facing reply text. Kept in one place so the flow engine stays
//! pure transition logic and the wording can be reviewed side by side.

use crate::domain::patient::PatientProfile;

pub fn initial_greeting(profile: &PatientProfile) -> String {
    format!(
        "Hello {}! I'm here to help collect your feedback about your recent healthcare \
         experience. How are you feeling about your {} treatment on {}?",
        profile.name, profile.health_issue, profile.date_of_treatment
    )
}

pub fn new_chat_greeting(name: &str) -> String {
    format!("Hi {name}! Let's start fresh. How was your recent healthcare experience?")
}

pub fn invite_feedback(name: &str) -> String {
    format!(
        "Hi {name}! I'd love to hear about your recent healthcare experience. \
         How did everything go?"
    )
}

pub fn rating_prompt(name: &str) -> String {
    format!(
        "Alright {name}, I'd like to collect your feedback. On a scale from 1 to 5, \
         how would you rate your experience?"
    )
}

pub fn comment_prompt(rating: u8) -> &'static str {
    if rating >= 4 {
        "Thank you for that rating! Could you share some specific details about what went \
         well during your experience? This helps us understand what we're doing right and \
         continue to provide excellent care."
    } else if rating == 3 {
        "Thank you for your rating. It sounds like your experience was okay but perhaps \
         there's room for improvement. Could you tell me more about what happened and what \
         we could do better?"
    } else {
        "I'm truly sorry to hear your experience was not satisfactory. Your feedback is \
         important. Could you please share more details about what went wrong? This will \
         help us address these issues directly."
    }
}

pub const INVALID_RATING: &str =
    "Please provide a valid numeric rating (1-5). Could you tell me more about your experience?";

pub const EMPTY_MESSAGE: &str = "I didn't receive any message. Could you please try again?";

pub fn saved_confirmation(name: &str, common_issues: &str) -> String {
    format!(
        "Thank you, {name}! Your feedback has been recorded and will help us improve our \
         care.\n\n{common_issues}"
    )
}

pub fn gratitude_reply(name: &str) -> String {
    format!(
        "You're welcome, {name}! Your feedback helps us improve our services. If you have \
         any other questions or concerns in the future, please don't hesitate to reach out."
    )
}

pub fn farewell_reply(name: &str) -> String {
    format!("Goodbye, {name}! Thank you for your time and feedback. Have a wonderful day!")
}

pub fn follow_up_reply(name: &str) -> String {
    format!(
        "Thank you for your engagement, {name}. Your feedback has been recorded. Is there \
         anything else you'd like to discuss about our healthcare services?"
    )
}
