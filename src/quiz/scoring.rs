use crate::quiz::fields::Answers;

/// How close a submission came to the quiz it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub matches: u8,
    pub percentage: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Perfect,
    High,
    Medium,
    Low,
}

impl Score {
    pub const TOTAL: u8 = 4;

    fn from_matches(matches: u8) -> Self {
        Self {
            matches,
            percentage: (u32::from(matches) * 100 / u32::from(Self::TOTAL)) as u8,
        }
    }

    pub fn tier(&self) -> Tier {
        match self.percentage {
            100 => Tier::Perfect,
            75..=99 => Tier::High,
            50..=74 => Tier::Medium,
            _ => Tier::Low,
        }
    }
}

/// Counts the fields `submission` got right.
///
/// Names are compared trimmed and case-insensitively; the other three are
/// already canonical values and compared as is.
pub fn score(quiz: &Answers, submission: &Answers) -> Score {
    let same_name = quiz.name.trim().to_lowercase() == submission.name.trim().to_lowercase();
    let matches = [
        same_name,
        quiz.height == submission.height,
        quiz.eye_color == submission.eye_color,
        quiz.fear == submission.fear,
    ]
    .into_iter()
    .filter(|hit| *hit)
    .count() as u8;

    Score::from_matches(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fields::{Choice, EyeColor, Fear, Height};
    use proptest::prelude::*;

    fn answers(name: &str, height: &str, eye: &str, fear: &str) -> Answers {
        Answers {
            name: name.into(),
            height: Height::parse(height).unwrap(),
            eye_color: EyeColor::parse(eye).unwrap(),
            fear: Fear::parse(fear).unwrap(),
        }
    }

    #[test]
    fn friend_misses_only_height() {
        let quiz = answers("Ana", "160-179", "blue", "darkness");
        let guess = answers("Ana", "180-199", "blue", "darkness");
        assert_eq!(
            score(&quiz, &guess),
            Score {
                matches: 3,
                percentage: 75
            }
        );
    }

    #[test]
    fn name_ignores_case_and_surrounding_whitespace() {
        let quiz = answers("Ana", "200+", "grey", "spiders");
        let padded = answers("  Ana  ", "200+", "grey", "spiders");
        let lower = answers("ana", "200+", "grey", "spiders");
        assert_eq!(score(&quiz, &padded), score(&quiz, &lower));
        assert_eq!(score(&quiz, &lower).matches, 4);
    }

    #[test]
    fn nothing_in_common() {
        let quiz = answers("Ana", "140-159", "brown", "heights");
        let guess = answers("Bob", "200+", "green", "loneliness");
        assert_eq!(
            score(&quiz, &guess),
            Score {
                matches: 0,
                percentage: 0
            }
        );
    }

    #[test]
    fn tiers_start_at_their_lower_bound() {
        let tier = |matches| Score::from_matches(matches).tier();
        assert_eq!(tier(4), Tier::Perfect);
        assert_eq!(tier(3), Tier::High);
        assert_eq!(tier(2), Tier::Medium);
        assert_eq!(tier(1), Tier::Low);
        assert_eq!(tier(0), Tier::Low);
    }

    fn arbitrary_answers() -> impl Strategy<Value = Answers> {
        (
            "[A-Za-z ]{1,12}",
            0..4usize,
            0..4usize,
            0..4usize,
        )
            .prop_map(|(name, h, e, f)| Answers {
                name,
                height: Height::ALL[h],
                eye_color: EyeColor::ALL[e],
                fear: Fear::ALL[f],
            })
    }

    proptest! {
        #[test]
        fn percentage_is_a_quarter_per_match(quiz in arbitrary_answers(), guess in arbitrary_answers()) {
            let result = score(&quiz, &guess);
            let expected = u8::from(quiz.name.trim().to_lowercase() == guess.name.trim().to_lowercase())
                + u8::from(quiz.height == guess.height)
                + u8::from(quiz.eye_color == guess.eye_color)
                + u8::from(quiz.fear == guess.fear);
            prop_assert_eq!(result.matches, expected);
            prop_assert_eq!(u32::from(result.percentage), 25 * u32::from(result.matches));
        }

        #[test]
        fn a_quiz_matches_itself(quiz in arbitrary_answers()) {
            prop_assert_eq!(score(&quiz, &quiz).percentage, 100);
        }
    }
}
