pub mod fields;
pub mod flow;
pub mod ident;
pub mod router;
pub mod scoring;

pub use fields::Answers;
pub use flow::{FlowKind, Prompt, Session, Step};
pub use ident::QuizId;
pub use router::{Event, Outcome, SessionRouter};
pub use scoring::{Score, Tier};

use serde::{Deserialize, Serialize};

/// Telegram user id. In private chats it doubles as the chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
