use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ID_PREFIX: &str = "quiz_";
const SUFFIX_LEN: usize = 12;
// Telegram limits deep-link payloads to 64 characters from this alphabet.
const MAX_LEN: usize = 64;

/// Public identifier of a quiz, safe to embed in a deep link as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    /// Accepts `[A-Za-z0-9_-]{1,64}`, the characters a link parameter can
    /// carry without escaping.
    pub fn parse(raw: &str) -> Option<Self> {
        let url_safe = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if raw.is_empty() || raw.len() > MAX_LEN || !url_safe {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where new quiz ids come from.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> QuizId;
}

/// `quiz_` followed by 12 hex digits (48 random bits).
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> QuizId {
        let bits: u64 = rand::thread_rng().gen::<u64>() & ((1u64 << (SUFFIX_LEN * 4)) - 1);
        QuizId(format!("{ID_PREFIX}{bits:0width$x}", width = SUFFIX_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_ids_have_fixed_shape() {
        for _ in 0..100 {
            let id = RandomIds.next_id();
            let suffix = id.as_str().strip_prefix(ID_PREFIX).unwrap();
            assert_eq!(suffix.len(), SUFFIX_LEN);
            assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            assert_eq!(QuizId::parse(id.as_str()), Some(id));
        }
    }

    #[test]
    fn random_ids_do_not_repeat() {
        let ids: HashSet<_> = (0..1000).map(|_| RandomIds.next_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn parse_rejects_characters_that_need_escaping() {
        assert!(QuizId::parse("quiz_abc-DEF_09").is_some());
        assert!(QuizId::parse("").is_none());
        assert!(QuizId::parse("quiz abc").is_none());
        assert!(QuizId::parse("quiz?x=1").is_none());
        assert!(QuizId::parse("тест").is_none());
        assert!(QuizId::parse(&"a".repeat(65)).is_none());
    }
}
