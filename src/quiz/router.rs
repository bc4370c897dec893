//! Turns an inbound user event plus the user's current session into the next
//! session and an outcome for the transport to render.
//!
//! The router owns no per-user state. Callers load the session from their own
//! keyed storage, pass it in, and write back whatever comes out (`None` means
//! "clear it").

use std::sync::Arc;

use log::{error, info, warn};

use crate::error::{StoreError, ValidationError};
use crate::quiz::fields::Answers;
use crate::quiz::flow::{Flow, FlowKind, Prompt, Session, Transition};
use crate::quiz::ident::{IdSource, QuizId};
use crate::quiz::scoring::{score, Score};
use crate::quiz::UserId;
use crate::store::{Quiz, QuizStore};

pub const DEFAULT_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BeginAuthoring,
    BeginTaking { quiz_id: QuizId },
    /// Free text or a pressed option, already mapped to its canonical value.
    Answer(String),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Prompt(Prompt),
    ValidationRejected(ValidationError),
    QuizCreated(QuizId),
    ScoreReported { score: Score, owner_name: String },
    TargetNotFound,
    /// An answer arrived while no flow was running.
    ContextError,
    Cancelled,
    /// Every generated id collided, or the store refused the quiz outright.
    CreationFailed,
    /// The store refused the answers for a reason a retry will not fix.
    SubmissionFailed,
    /// The store timed out or is down. The event can be sent again.
    StoreFailure,
}

impl Outcome {
    /// The flow the transport should offer once this outcome is shown.
    pub fn follow_up(&self) -> Option<FlowKind> {
        match self {
            Outcome::ScoreReported { .. } => Some(FlowKind::Authoring),
            _ => None,
        }
    }
}

pub struct SessionRouter {
    store: Arc<dyn QuizStore>,
    ids: Box<dyn IdSource>,
    id_attempts: usize,
}

impl SessionRouter {
    #[cfg(test)]
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        use crate::quiz::ident::RandomIds;
        Self::with_ids(store, Box::new(RandomIds), DEFAULT_ID_ATTEMPTS)
    }

    pub fn with_ids(store: Arc<dyn QuizStore>, ids: Box<dyn IdSource>, id_attempts: usize) -> Self {
        Self {
            store,
            ids,
            id_attempts: id_attempts.max(1),
        }
    }

    pub async fn handle_event(
        &self,
        user: UserId,
        session: Option<Session>,
        event: Event,
    ) -> (Option<Session>, Outcome) {
        match event {
            Event::BeginAuthoring => {
                info!("user {user} started building a quiz");
                let session = Session::authoring();
                let prompt = session.prompt();
                (Some(session), Outcome::Prompt(prompt))
            }
            Event::BeginTaking { quiz_id } => self.begin_taking(user, quiz_id).await,
            Event::Cancel => (None, Outcome::Cancelled),
            Event::Answer(raw) => match session {
                None => (None, Outcome::ContextError),
                Some(session) => self.answer(user, session, &raw).await,
            },
        }
    }

    async fn begin_taking(&self, user: UserId, quiz_id: QuizId) -> (Option<Session>, Outcome) {
        match self.store.get_quiz(&quiz_id).await {
            Ok(Some(_)) => {
                info!("user {user} started quiz {quiz_id}");
                let session = Session::taking(quiz_id);
                let prompt = session.prompt();
                (Some(session), Outcome::Prompt(prompt))
            }
            Ok(None) => {
                warn!("user {user} asked for unknown quiz {quiz_id}");
                (None, Outcome::TargetNotFound)
            }
            Err(e) => {
                error!("looking up quiz {quiz_id} failed: {e}");
                (None, Outcome::StoreFailure)
            }
        }
    }

    async fn answer(&self, user: UserId, session: Session, raw: &str) -> (Option<Session>, Outcome) {
        match session.accept(raw) {
            Err(ValidationError::Finished) => (None, Outcome::ContextError),
            Err(rejection) => (Some(session), Outcome::ValidationRejected(rejection)),
            Ok(Transition::Continue(next)) => {
                let prompt = next.prompt();
                (Some(next), Outcome::Prompt(prompt))
            }
            Ok(Transition::Finished { flow, answers }) => {
                let outcome = match flow {
                    Flow::Authoring => self.finish_authoring(user, &answers).await,
                    Flow::Taking { quiz_id } => self.finish_taking(user, &quiz_id, &answers).await,
                };
                match outcome {
                    // Keep the session at its last step so re-sending the
                    // answer retries the whole finalization.
                    Outcome::StoreFailure => (Some(session), outcome),
                    _ => (None, outcome),
                }
            }
        }
    }

    async fn finish_authoring(&self, user: UserId, answers: &Answers) -> Outcome {
        match self.create_quiz(user, answers).await {
            Ok(quiz) => {
                info!("user {user} created quiz {}", quiz.id);
                Outcome::QuizCreated(quiz.id)
            }
            Err(e) if e.is_transient() => {
                error!("saving quiz for user {user} failed: {e}");
                Outcome::StoreFailure
            }
            Err(e) => {
                error!("giving up on a quiz for user {user}: {e}");
                Outcome::CreationFailed
            }
        }
    }

    /// Inserts under a fresh id, drawing a new one after each collision.
    async fn create_quiz(&self, user: UserId, answers: &Answers) -> Result<Quiz, StoreError> {
        let mut attempt = 1;
        loop {
            let id = self.ids.next_id();
            match self.store.create_quiz(&id, user, answers).await {
                Err(StoreError::DuplicateKey(taken)) if attempt < self.id_attempts => {
                    warn!("quiz id {taken} collided (attempt {attempt}/{})", self.id_attempts);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// The quiz is read before anything is written, so a failed read can be
    /// retried without leaving a submission behind.
    async fn finish_taking(&self, user: UserId, quiz_id: &QuizId, answers: &Answers) -> Outcome {
        let quiz = match self.store.get_quiz(quiz_id).await {
            Ok(Some(quiz)) => quiz,
            Ok(None) => {
                warn!("quiz {quiz_id} vanished while user {user} was answering it");
                return Outcome::TargetNotFound;
            }
            Err(e) => {
                error!("loading quiz {quiz_id} failed: {e}");
                return submission_failure(&e);
            }
        };
        let submission = match self.store.append_submission(quiz_id, user, answers).await {
            Ok(submission) => submission,
            Err(e) => {
                error!("saving answers of user {user} to {quiz_id} failed: {e}");
                return submission_failure(&e);
            }
        };

        let score = score(&quiz.answers, &submission.answers);
        info!(
            "user {user} scored {}/4 ({}%) on {quiz_id}",
            score.matches, score.percentage
        );
        Outcome::ScoreReported {
            score,
            owner_name: quiz.answers.name,
        }
    }

    pub async fn register_user(&self, user: UserId, display_name: &str) -> Result<(), StoreError> {
        self.store.create_user(user, display_name).await
    }

    pub async fn set_subscribed(&self, user: UserId, subscribed: bool) -> Result<(), StoreError> {
        info!("user {user} subscribed = {subscribed}");
        self.store.set_subscribed(user, subscribed).await
    }

    pub async fn quizzes_of(&self, creator: UserId) -> Result<Vec<Quiz>, StoreError> {
        self.store.list_quizzes_by_creator(creator).await
    }
}

fn submission_failure(err: &StoreError) -> Outcome {
    if err.is_transient() {
        Outcome::StoreFailure
    } else {
        Outcome::SubmissionFailed
    }
}
