use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Quiz, QuizStore, Submission};
use crate::error::StoreError;
use crate::quiz::fields::{Answers, Choice, EyeColor, Fear, Height};
use crate::quiz::{QuizId, UserId};

/// SQLite-backed store.
///
/// rusqlite is blocking, so every call runs on the blocking pool behind a
/// single connection mutex. A call that has not reached the connection
/// within `timeout` is abandoned and never touches the database afterwards.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl SqliteStore {
    /// Opens (or creates) the database file and its schema.
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, timeout)
    }

    #[cfg(test)]
    pub fn open_memory(timeout: Duration) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, timeout)
    }

    fn with_connection(conn: Connection, timeout: Duration) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let state = Arc::new(AtomicU8::new(PENDING));
        let claim = Arc::clone(&state);
        let timeout = self.timeout;
        let mut task = tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))?;
            if claim
                .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(StoreError::Timeout(timeout));
            }
            f(&conn)
        });
        let joined = match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                let abandoned = state
                    .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if abandoned {
                    return Err(StoreError::Timeout(timeout));
                }
                // Already on the connection: wait for what it wrote.
                task.await
            }
        };
        joined.unwrap_or_else(|join| Err(StoreError::Unavailable(join.to_string())))
    }
}

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const ABANDONED: u8 = 2;

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id      INTEGER PRIMARY KEY,
            display_name TEXT NOT NULL,
            subscribed   INTEGER NOT NULL DEFAULT 1,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS quizzes (
            quiz_id    TEXT PRIMARY KEY,
            creator_id INTEGER NOT NULL,
            name       TEXT NOT NULL,
            height     TEXT NOT NULL,
            eye_color  TEXT NOT NULL,
            fear       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS submissions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            quiz_id      TEXT NOT NULL,
            responder_id INTEGER NOT NULL,
            name         TEXT NOT NULL,
            height       TEXT NOT NULL,
            eye_color    TEXT NOT NULL,
            fear         TEXT NOT NULL,
            submitted_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_quizzes_creator ON quizzes(creator_id);
        CREATE INDEX IF NOT EXISTS idx_submissions_pair ON submissions(quiz_id, responder_id);",
    )
}

fn is_primary_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Columns as they come out of a `quizzes` or `submissions` row.
struct RawRecord {
    key: String,
    user: i64,
    name: String,
    height: String,
    eye_color: String,
    fear: String,
    at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            user: row.get(1)?,
            name: row.get(2)?,
            height: row.get(3)?,
            eye_color: row.get(4)?,
            fear: row.get(5)?,
            at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<(QuizId, UserId, Answers, DateTime<Utc>), StoreError> {
        let id = QuizId::parse(&self.key)
            .ok_or_else(|| StoreError::Corrupt(format!("quiz id {:?}", self.key)))?;
        let corrupt = |column: &str, value: &str| StoreError::Corrupt(format!("{column} {value:?}"));
        let answers = Answers {
            height: Height::parse(&self.height).map_err(|_| corrupt("height", &self.height))?,
            eye_color: EyeColor::parse(&self.eye_color)
                .map_err(|_| corrupt("eye_color", &self.eye_color))?,
            fear: Fear::parse(&self.fear).map_err(|_| corrupt("fear", &self.fear))?,
            name: self.name,
        };
        let at = DateTime::parse_from_rfc3339(&self.at)
            .map_err(|_| corrupt("timestamp", &self.at))?
            .with_timezone(&Utc);
        Ok((id, UserId(self.user as u64), answers, at))
    }

    fn into_quiz(self) -> Result<Quiz, StoreError> {
        let (id, creator, answers, created_at) = self.decode()?;
        Ok(Quiz {
            id,
            creator,
            answers,
            created_at,
        })
    }

    fn into_submission(self) -> Result<Submission, StoreError> {
        let (quiz_id, responder, answers, submitted_at) = self.decode()?;
        Ok(Submission {
            quiz_id,
            responder,
            answers,
            submitted_at,
        })
    }
}

const QUIZ_COLUMNS: &str = "quiz_id, creator_id, name, height, eye_color, fear, created_at";
const SUBMISSION_COLUMNS: &str =
    "quiz_id, responder_id, name, height, eye_color, fear, submitted_at";

#[async_trait]
impl QuizStore for SqliteStore {
    async fn create_user(&self, id: UserId, display_name: &str) -> Result<(), StoreError> {
        let display_name = display_name.to_string();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO users (user_id, display_name, subscribed, created_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name",
                params![id.0 as i64, display_name, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn set_subscribed(&self, id: UserId, subscribed: bool) -> Result<(), StoreError> {
        self.call(move |conn| {
            conn.execute(
                "UPDATE users SET subscribed = ?2 WHERE user_id = ?1",
                params![id.0 as i64, subscribed],
            )?;
            Ok(())
        })
        .await
    }

    async fn create_quiz(
        &self,
        id: &QuizId,
        creator: UserId,
        answers: &Answers,
    ) -> Result<Quiz, StoreError> {
        let quiz = Quiz {
            id: id.clone(),
            creator,
            answers: answers.clone(),
            created_at: Utc::now(),
        };
        self.call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO quizzes (quiz_id, creator_id, name, height, eye_color, fear, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    quiz.id.as_str(),
                    quiz.creator.0 as i64,
                    quiz.answers.name,
                    quiz.answers.height.as_str(),
                    quiz.answers.eye_color.as_str(),
                    quiz.answers.fear.as_str(),
                    quiz.created_at.to_rfc3339(),
                ],
            );
            match inserted {
                Ok(_) => Ok(quiz),
                Err(e) if is_primary_key_conflict(&e) => Err(StoreError::DuplicateKey(quiz.id)),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StoreError> {
        let id = id.clone();
        self.call(move |conn| {
            let raw = conn
                .query_row(
                    &format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE quiz_id = ?1"),
                    params![id.as_str()],
                    RawRecord::from_row,
                )
                .optional()?;
            raw.map(RawRecord::into_quiz).transpose()
        })
        .await
    }

    async fn list_quizzes_by_creator(&self, creator: UserId) -> Result<Vec<Quiz>, StoreError> {
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUIZ_COLUMNS} FROM quizzes
                 WHERE creator_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![creator.0 as i64], RawRecord::from_row)?;
            let mut quizzes = Vec::new();
            for row in rows {
                quizzes.push(row?.into_quiz()?);
            }
            Ok(quizzes)
        })
        .await
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
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO submissions
                    (quiz_id, responder_id, name, height, eye_color, fear, submitted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    submission.quiz_id.as_str(),
                    submission.responder.0 as i64,
                    submission.answers.name,
                    submission.answers.height.as_str(),
                    submission.answers.eye_color.as_str(),
                    submission.answers.fear.as_str(),
                    submission.submitted_at.to_rfc3339(),
                ],
            )?;
            Ok(submission)
        })
        .await
    }

    async fn get_latest_submission(
        &self,
        quiz_id: &QuizId,
        responder: UserId,
    ) -> Result<Option<Submission>, StoreError> {
        let quiz_id = quiz_id.clone();
        self.call(move |conn| {
            let raw = conn
                .query_row(
                    &format!(
                        "SELECT {SUBMISSION_COLUMNS} FROM submissions
                         WHERE quiz_id = ?1 AND responder_id = ?2
                         ORDER BY id DESC LIMIT 1"
                    ),
                    params![quiz_id.as_str(), responder.0 as i64],
                    RawRecord::from_row,
                )
                .optional()?;
            raw.map(RawRecord::into_submission).transpose()
        })
        .await
    }

    async fn list_subscribed_user_ids(&self) -> Result<BTreeSet<UserId>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM users WHERE subscribed = 1")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .map(|id| id.map(|id| UserId(id as u64)))
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(ids)
        })
        .await
    }
}
