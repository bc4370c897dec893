use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{Quiz, QuizStore, Submission};
use crate::error::StoreError;
use crate::quiz::{Answers, QuizId, UserId};

struct User {
    id: UserId,
    display_name: String,
    subscribed: bool,
}

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    quizzes: Vec<Quiz>,
    submissions: Vec<Submission>,
}

/// Process-local store with the same semantics as [`super::SqliteStore`],
/// used to drive the router and broadcast tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn create_user(&self, id: UserId, display_name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables
            .users
            .entry(id)
            .and_modify(|user| user.display_name = display_name.to_string())
            .or_insert_with(|| User {
                id,
                display_name: display_name.to_string(),
                subscribed: true,
            });
        Ok(())
    }

    async fn set_subscribed(&self, id: UserId, subscribed: bool) -> Result<(), StoreError> {
        if let Some(user) = self.tables()?.users.get_mut(&id) {
            user.subscribed = subscribed;
        }
        Ok(())
    }

    async fn create_quiz(
        &self,
        id: &QuizId,
        creator: UserId,
        answers: &Answers,
    ) -> Result<Quiz, StoreError> {
        let mut tables = self.tables()?;
        if tables.quizzes.iter().any(|quiz| &quiz.id == id) {
            return Err(StoreError::DuplicateKey(id.clone()));
        }
        let quiz = Quiz {
            id: id.clone(),
            creator,
            answers: answers.clone(),
            created_at: Utc::now(),
        };
        tables.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StoreError> {
        Ok(self
            .tables()?
            .quizzes
            .iter()
            .find(|quiz| &quiz.id == id)
            .cloned())
    }

    async fn list_quizzes_by_creator(&self, creator: UserId) -> Result<Vec<Quiz>, StoreError> {
        // Insertion order is creation order, so reversing gives newest first
        // even when two quizzes share a timestamp.
        Ok(self
            .tables()?
            .quizzes
            .iter()
            .rev()
            .filter(|quiz| quiz.creator == creator)
            .cloned()
            .collect())
    }

    async fn append_submission(
        &self,
        quiz_id: &QuizId,
        responder: UserId,
        answers: &Answers,
    ) -> Result<Submission, StoreError> {
        let submission = Submission {
            quiz_id: quiz_id.clone(),
            responder,
            answers: answers.clone(),
            submitted_at: Utc::now(),
        };
        self.tables()?.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn get_latest_submission(
        &self,
        quiz_id: &QuizId,
        responder: UserId,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self
            .tables()?
            .submissions
            .iter()
            .rev()
            .find(|s| &s.quiz_id == quiz_id && s.responder == responder)
            .cloned())
    }

    async fn list_subscribed_user_ids(&self) -> Result<BTreeSet<UserId>, StoreError> {
        Ok(self
            .tables()?
            .users
            .values()
            .filter(|user| user.subscribed)
            .map(|user| user.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fields::{EyeColor, Fear, Height};

    fn ana() -> Answers {
        Answers {
            name: "Ana".into(),
            height: Height::From160To179,
            eye_color: EyeColor::Blue,
            fear: Fear::Darkness,
        }
    }

    fn id(raw: &str) -> QuizId {
        QuizId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn duplicate_ids_are_refused() {
        let store = MemoryStore::new();
        store.create_quiz(&id("quiz_a"), UserId(1), &ana()).await.unwrap();
        let err = store
            .create_quiz(&id("quiz_a"), UserId(2), &ana())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(taken) if taken == id("quiz_a")));
    }

    #[tokio::test]
    async fn reading_a_quiz_twice_gives_the_same_answers() {
        let store = MemoryStore::new();
        store.create_quiz(&id("quiz_a"), UserId(1), &ana()).await.unwrap();
        let first = store.get_quiz(&id("quiz_a")).await.unwrap().unwrap();
        let second = store.get_quiz(&id("quiz_a")).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.answers, ana());
    }

    #[tokio::test]
    async fn latest_submission_wins() {
        let store = MemoryStore::new();
        let quiz = id("quiz_a");
        store.append_submission(&quiz, UserId(7), &ana()).await.unwrap();
        let retake = Answers {
            fear: Fear::Spiders,
            ..ana()
        };
        store.append_submission(&quiz, UserId(7), &retake).await.unwrap();
        store.append_submission(&quiz, UserId(8), &ana()).await.unwrap();

        let latest = store
            .get_latest_submission(&quiz, UserId(7))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.answers, retake);
        assert!(store
            .get_latest_submission(&quiz, UserId(9))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn quizzes_are_listed_newest_first() {
        let store = MemoryStore::new();
        for raw in ["quiz_a", "quiz_b", "quiz_c"] {
            store.create_quiz(&id(raw), UserId(1), &ana()).await.unwrap();
        }
        store.create_quiz(&id("quiz_x"), UserId(2), &ana()).await.unwrap();

        let ids: Vec<_> = store
            .list_quizzes_by_creator(UserId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|quiz| quiz.id)
            .collect();
        assert_eq!(ids, vec![id("quiz_c"), id("quiz_b"), id("quiz_a")]);
    }

    #[tokio::test]
    async fn re_registering_keeps_the_subscription_flag() {
        let store = MemoryStore::new();
        store.create_user(UserId(1), "Ana").await.unwrap();
        store.create_user(UserId(2), "Bob").await.unwrap();
        store.set_subscribed(UserId(1), false).await.unwrap();
        store.create_user(UserId(1), "Ana K").await.unwrap();

        let subscribed = store.list_subscribed_user_ids().await.unwrap();
        assert_eq!(subscribed, BTreeSet::from([UserId(2)]));
        let tables = store.tables().unwrap();
        assert_eq!(tables.users[&UserId(1)].display_name, "Ana K");
    }
}
