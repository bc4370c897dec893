use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};

use crate::quiz::fields::{Choice, EyeColor, Fear, Height};
use crate::quiz::{FlowKind, Step};

pub const CREATE_QUIZ: &str = "Create quiz";
pub const TAKE_QUIZ: &str = "Take a quiz";
pub const MY_QUIZZES: &str = "My quizzes";
pub const ABOUT: &str = "About";

/// Callback data of the inline "create your own" button.
pub const BEGIN_AUTHORING: &str = "begin_authoring";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    CreateQuiz,
    TakeQuiz,
    MyQuizzes,
    About,
}

impl MenuItem {
    pub fn from_label(text: &str) -> Option<Self> {
        match text {
            CREATE_QUIZ => Some(MenuItem::CreateQuiz),
            TAKE_QUIZ => Some(MenuItem::TakeQuiz),
            MY_QUIZZES => Some(MenuItem::MyQuizzes),
            ABOUT => Some(MenuItem::About),
            _ => None,
        }
    }
}

pub fn main_menu() -> ReplyMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(CREATE_QUIZ)],
        vec![KeyboardButton::new(TAKE_QUIZ)],
        vec![KeyboardButton::new(MY_QUIZZES)],
        vec![KeyboardButton::new(ABOUT)],
    ])
    .into()
}

/// Button text shown for an option.
trait Labelled: Choice {
    fn label(self) -> &'static str;
}

impl Labelled for Height {
    fn label(self) -> &'static str {
        self.as_str()
    }
}

impl Labelled for EyeColor {
    fn label(self) -> &'static str {
        match self {
            EyeColor::Brown => "Brown",
            EyeColor::Blue => "Blue",
            EyeColor::Green => "Green",
            EyeColor::Grey => "Grey",
        }
    }
}

impl Labelled for Fear {
    fn label(self) -> &'static str {
        match self {
            Fear::Heights => "Heights",
            Fear::Darkness => "The dark",
            Fear::Spiders => "Spiders",
            Fear::Loneliness => "Being alone",
        }
    }
}

fn options<C: Labelled>() -> ReplyMarkup {
    KeyboardMarkup::new(
        C::ALL
            .iter()
            .map(|option| vec![KeyboardButton::new(option.label())]),
    )
    .into()
}

fn from_label<C: Labelled>(text: &str) -> Option<&'static str> {
    C::ALL
        .iter()
        .find(|option| option.label() == text)
        .map(|option| option.as_str())
}

/// Keyboard to show while waiting for `step`.
pub fn for_step(step: Step) -> ReplyMarkup {
    match step {
        Step::Height => options::<Height>(),
        Step::EyeColor => options::<EyeColor>(),
        Step::Fear => options::<Fear>(),
        Step::Name | Step::Done => KeyboardRemove::new().into(),
    }
}

/// Maps a pressed button back to its canonical value. Anything else is
/// passed through untouched so validation can judge it.
pub fn resolve(step: Step, text: &str) -> String {
    let canonical = match step {
        Step::Height => from_label::<Height>(text),
        Step::EyeColor => from_label::<EyeColor>(text),
        Step::Fear => from_label::<Fear>(text),
        Step::Name | Step::Done => None,
    };
    canonical.unwrap_or(text).to_string()
}

/// Inline offer to start `kind` right away. Taking needs a link from a
/// friend, so only authoring can be offered.
pub fn follow_up(kind: FlowKind) -> Option<ReplyMarkup> {
    match kind {
        FlowKind::Authoring => Some(
            InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "Create your own friendship quiz",
                BEGIN_AUTHORING,
            )]])
            .into(),
        ),
        FlowKind::Taking => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_to_canonical_values() {
        assert_eq!(resolve(Step::EyeColor, "Brown"), "brown");
        assert_eq!(resolve(Step::Fear, "Being alone"), "loneliness");
        assert_eq!(resolve(Step::Height, "200+"), "200+");
    }

    #[test]
    fn unknown_text_passes_through() {
        assert_eq!(resolve(Step::Fear, "clowns"), "clowns");
        assert_eq!(resolve(Step::Name, "Brown"), "Brown");
    }

    #[test]
    fn every_label_parses_after_resolving() {
        for color in EyeColor::ALL {
            let canonical = resolve(Step::EyeColor, color.label());
            assert_eq!(EyeColor::parse(&canonical), Ok(color));
        }
        for fear in Fear::ALL {
            let canonical = resolve(Step::Fear, fear.label());
            assert_eq!(Fear::parse(&canonical), Ok(fear));
        }
    }

    #[test]
    fn menu_labels_round_trip() {
        assert_eq!(MenuItem::from_label(CREATE_QUIZ), Some(MenuItem::CreateQuiz));
        assert_eq!(MenuItem::from_label(ABOUT), Some(MenuItem::About));
        assert_eq!(MenuItem::from_label("create quiz"), None);
    }
}
