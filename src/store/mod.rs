//! Persistence of users, quizzes and submissions.
//!
//! Quizzes and submissions are append-only: once written they are never
//! updated. Retakes add a new submission and the latest one wins.

#[cfg(test)]
mod memory;
mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::quiz::{Answers, QuizId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: QuizId,
    pub creator: UserId,
    pub answers: Answers,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub quiz_id: QuizId,
    pub responder: UserId,
    pub answers: Answers,
    pub submitted_at: DateTime<Utc>,
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Inserts the user or refreshes their display name. The subscription
    /// flag of an existing user is left alone.
    async fn create_user(&self, id: UserId, display_name: &str) -> Result<(), StoreError>;

    async fn set_subscribed(&self, id: UserId, subscribed: bool) -> Result<(), StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] if `id` is already taken.
    async fn create_quiz(
        &self,
        id: &QuizId,
        creator: UserId,
        answers: &Answers,
    ) -> Result<Quiz, StoreError>;

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StoreError>;

    /// Newest first.
    async fn list_quizzes_by_creator(&self, creator: UserId) -> Result<Vec<Quiz>, StoreError>;

    async fn append_submission(
        &self,
        quiz_id: &QuizId,
        responder: UserId,
        answers: &Answers,
    ) -> Result<Submission, StoreError>;

    async fn get_latest_submission(
        &self,
        quiz_id: &QuizId,
        responder: UserId,
    ) -> Result<Option<Submission>, StoreError>;

    async fn list_subscribed_user_ids(&self) -> Result<BTreeSet<UserId>, StoreError>;
}
