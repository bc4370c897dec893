use teloxide::utils::html;

use crate::error::ValidationError;
use crate::quiz::fields::MAX_NAME_LEN;
use crate::quiz::{FlowKind, Prompt, Score, Step, Tier};
use crate::store::Quiz;

pub const GREETING: &str = "👋 Hi! I build friendship quizzes.\n\n\
Answer four questions about yourself, send the link to a friend and find out how well they know you!";

pub const ABOUT: &str = "ℹ️ <b>How it works</b>\n\n\
1. Create a quiz by answering questions about yourself\n\
2. Get a unique link\n\
3. Send the link to a friend\n\
4. Your friend answers the same questions about you\n\
5. See how well they know you!\n\n\
/cancel stops a quiz half way, /unsubscribe turns reminders off.";

pub const TAKE_HINT: &str = "To take a quiz you need a link from a friend.\n\n\
Ask them to send you the link to their friendship quiz!";

pub const NO_QUIZZES: &str = "You haven't created any quizzes yet.\nTap \"Create quiz\" to make your first one!";
pub const NOT_FOUND: &str = "❌ Quiz not found. The link may be wrong.";
pub const NO_FLOW: &str = "There is no quiz in progress. Use the menu to start one.";
pub const CANCELLED: &str = "Okay, forgot everything you answered so far.";
pub const CREATION_FAILED: &str = "❌ Could not save your quiz. Please try again.";
pub const STORE_FAILURE: &str = "⚠️ Something went wrong on our side. Please send that answer again in a moment.";
pub const TRY_AGAIN: &str = "⚠️ Something went wrong on our side. Please try again in a moment.";
pub const SUBMISSION_FAILED: &str = "❌ Could not save your answers. Please open the link again.";
pub const TEXT_ONLY: &str = "Please answer with text.";
pub const FOLLOW_UP: &str = "Want to make a friendship quiz of your own?";
pub const SUBSCRIBED: &str = "🔔 Reminders are on.";
pub const UNSUBSCRIBED: &str = "🔕 Reminders are off. /subscribe turns them back on.";

/// Only ask for the answer again when the session is still waiting for it.
pub fn store_failure(answer_pending: bool) -> &'static str {
    if answer_pending {
        STORE_FAILURE
    } else {
        TRY_AGAIN
    }
}

pub fn question(prompt: Prompt) -> String {
    let Some(number) = prompt.step.number() else {
        return NO_FLOW.to_string();
    };
    let body = match (prompt.kind, prompt.step) {
        (FlowKind::Authoring, Step::Name) => "What's your name?",
        (FlowKind::Authoring, Step::Height) => "📏 How tall are you?",
        (FlowKind::Authoring, Step::EyeColor) => "👁️ What colour are your eyes?",
        (FlowKind::Authoring, Step::Fear) => "😰 What are you most afraid of?",
        (FlowKind::Taking, Step::Name) => "What's your friend's name?",
        (FlowKind::Taking, Step::Height) => "📏 How tall is your friend?",
        (FlowKind::Taking, Step::EyeColor) => "👁️ What colour are your friend's eyes?",
        (FlowKind::Taking, Step::Fear) => "😰 What is your friend most afraid of?",
        (_, Step::Done) => return NO_FLOW.to_string(),
    };
    let intro = match (prompt.kind, prompt.step) {
        (FlowKind::Authoring, Step::Name) => "Great! Let's build your friendship quiz.\n\n",
        (FlowKind::Taking, Step::Name) => {
            "🎯 <b>Friendship quiz!</b>\n\nYour friend made this quiz to see how well you know them.\n\n"
        }
        _ => "",
    };
    format!(
        "{intro}<b>Question {number} of {}:</b>\n{body}",
        Step::QUESTIONS
    )
}

pub fn rejection(err: &ValidationError) -> String {
    match err {
        ValidationError::EmptyName | ValidationError::NameTooLong { .. } => {
            format!("Please send a proper name (up to {MAX_NAME_LEN} characters).")
        }
        ValidationError::NotAnOption { step: Step::Height, .. } => {
            "Please pick one of the height options.".to_string()
        }
        ValidationError::NotAnOption { step: Step::EyeColor, .. } => {
            "Please pick one of the eye colour options.".to_string()
        }
        ValidationError::NotAnOption { .. } => "Please pick one of the options.".to_string(),
        ValidationError::Finished => NO_FLOW.to_string(),
    }
}

pub fn quiz_created(link: &str) -> String {
    format!(
        "✅ <b>Your quiz is ready!</b>\n\n📎 <b>Your link:</b>\n{link}\n\n\
         Send it to a friend to see how well they know you! 👇"
    )
}

pub fn score(score: Score, owner_name: &str) -> String {
    let verdict = match score.tier() {
        Tier::Perfect => "🌟 Perfect! You know your friend inside out!",
        Tier::High => "👍 Nice! You know your friend well!",
        Tier::Medium => "😊 Not bad, but there's room to improve.",
        Tier::Low => "🤔 Looks like it's time to get to know your friend better!",
    };
    format!(
        "🎉 <b>Result for {}'s quiz!</b>\n\nYou got <b>{} of {}</b> right, that's <b>{}%</b>\n\n{verdict}",
        html::escape(owner_name),
        score.matches,
        Score::TOTAL,
        score.percentage,
    )
}

pub fn my_quizzes(quizzes: &[Quiz], link: impl Fn(&Quiz) -> String) -> String {
    let mut text = String::from("📋 <b>Your quizzes:</b>\n\n");
    for quiz in quizzes {
        text.push_str(&format!(
            "• <b>{}</b> ({})\n  Link: {}\n\n",
            html::escape(&quiz.answers.name),
            quiz.created_at.format("%Y-%m-%d"),
            link(quiz)
        ));
    }
    text
}
