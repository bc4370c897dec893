//! The four answers that make up a quiz and the rules for accepting them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::quiz::flow::Step;

pub const MAX_NAME_LEN: usize = 100;

/// A question with a fixed set of options.
///
/// Parsing is exact: the raw input has to be one of the canonical values.
/// Translating keyboard labels into those values is up to the transport.
pub trait Choice: Sized + Copy + 'static {
    const ALL: [Self; 4];
    const STEP: Step;

    fn as_str(&self) -> &'static str;

    fn parse(raw: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .iter()
            .copied()
            .find(|option| option.as_str() == raw)
            .ok_or_else(|| ValidationError::NotAnOption {
                step: Self::STEP,
                input: raw.to_string(),
            })
    }
}

macro_rules! choice {
    ($ty:ident, $step:expr, { $($variant:ident => $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $ty {
            $(#[serde(rename = $value)] $variant),+
        }

        impl Choice for $ty {
            const ALL: [Self; 4] = [$($ty::$variant),+];
            const STEP: Step = $step;

            fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $value),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                <$ty as Choice>::parse(raw)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice!(Height, Step::Height, {
    From140To159 => "140-159",
    From160To179 => "160-179",
    From180To199 => "180-199",
    Over200 => "200+",
});

choice!(EyeColor, Step::EyeColor, {
    Brown => "brown",
    Blue => "blue",
    Green => "green",
    Grey => "grey",
});

choice!(Fear, Step::Fear, {
    Heights => "heights",
    Darkness => "darkness",
    Spiders => "spiders",
    Loneliness => "loneliness",
});

/// Trims the name and checks it is 1 to 100 characters long.
pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyName);
    }
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    Ok(name.to_string())
}

/// A complete answer set, shared by quizzes and submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    pub name: String,
    pub height: Height,
    pub eye_color: EyeColor,
    pub fear: Fear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed() {
        assert_eq!(validate_name("  Ana \n").unwrap(), "Ana");
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(validate_name("   "), Err(ValidationError::EmptyName));
        assert_eq!(validate_name(""), Err(ValidationError::EmptyName));
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        let cyrillic = "Я".repeat(MAX_NAME_LEN);
        assert!(validate_name(&cyrillic).is_ok());

        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            validate_name(&long),
            Err(ValidationError::NameTooLong {
                len: 101,
                max: MAX_NAME_LEN
            })
        );
    }

    #[test]
    fn every_option_parses_back_to_itself() {
        for height in Height::ALL {
            assert_eq!(height.as_str().parse::<Height>(), Ok(height));
        }
        for color in EyeColor::ALL {
            assert_eq!(color.as_str().parse::<EyeColor>(), Ok(color));
        }
        for fear in Fear::ALL {
            assert_eq!(fear.as_str().parse::<Fear>(), Ok(fear));
        }
    }

    #[test]
    fn options_match_exactly() {
        assert!("Blue".parse::<EyeColor>().is_err());
        assert!(" blue".parse::<EyeColor>().is_err());
        assert_eq!(
            "maybe".parse::<Height>(),
            Err(ValidationError::NotAnOption {
                step: Step::Height,
                input: "maybe".into()
            })
        );
    }

    #[test]
    fn display_uses_canonical_values() {
        assert_eq!(Height::Over200.to_string(), "200+");
        assert_eq!(EyeColor::Grey.to_string(), "grey");
        assert_eq!(Fear::Loneliness.to_string(), "loneliness");
    }
}
