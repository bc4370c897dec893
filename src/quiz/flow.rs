//! Per-user dialogue state for building or answering a quiz.
//!
//! Both flows walk the same four questions in the same order:
//! `Name -> Height -> EyeColor -> Fear -> Done`. A session only ever moves
//! forward, one step per accepted answer, and a rejected answer leaves it
//! exactly as it was.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::quiz::fields::{validate_name, Answers, Choice, EyeColor, Fear, Height};
use crate::quiz::ident::QuizId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Name,
    Height,
    EyeColor,
    Fear,
    Done,
}

impl Step {
    /// 1-based position shown to the user, `None` once the questions are over.
    pub fn number(self) -> Option<usize> {
        match self {
            Step::Name => Some(1),
            Step::Height => Some(2),
            Step::EyeColor => Some(3),
            Step::Fear => Some(4),
            Step::Done => None,
        }
    }

    pub const QUESTIONS: usize = 4;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flow {
    /// The user answers about themselves.
    Authoring,
    /// The user guesses the answers of someone else's quiz.
    Taking { quiz_id: QuizId },
}

impl Flow {
    pub fn kind(&self) -> FlowKind {
        match self {
            Flow::Authoring => FlowKind::Authoring,
            Flow::Taking { .. } => FlowKind::Taking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowKind {
    Authoring,
    Taking,
}

/// Answers collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub name: Option<String>,
    pub height: Option<Height>,
    pub eye_color: Option<EyeColor>,
    pub fear: Option<Fear>,
}

/// What the caller has to ask next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    pub kind: FlowKind,
    pub step: Step,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub flow: Flow,
    pub step: Step,
    pub draft: Draft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// More questions to go.
    Continue(Session),
    /// The last answer was accepted. The session is over and must be dropped.
    Finished { flow: Flow, answers: Answers },
}

impl Session {
    pub fn authoring() -> Self {
        Self::new(Flow::Authoring)
    }

    pub fn taking(quiz_id: QuizId) -> Self {
        Self::new(Flow::Taking { quiz_id })
    }

    fn new(flow: Flow) -> Self {
        Self {
            flow,
            step: Step::Name,
            draft: Draft::default(),
        }
    }

    pub fn prompt(&self) -> Prompt {
        Prompt {
            kind: self.flow.kind(),
            step: self.step,
        }
    }

    /// Validates `raw` against the current step and computes the next state.
    ///
    /// `self` is never touched; on error the caller keeps the session it had.
    pub fn accept(&self, raw: &str) -> Result<Transition, ValidationError> {
        let mut next = self.clone();
        match self.step {
            Step::Name => {
                next.draft.name = Some(validate_name(raw)?);
                next.step = Step::Height;
            }
            Step::Height => {
                next.draft.height = Some(Height::parse(raw)?);
                next.step = Step::EyeColor;
            }
            Step::EyeColor => {
                next.draft.eye_color = Some(EyeColor::parse(raw)?);
                next.step = Step::Fear;
            }
            Step::Fear => {
                let fear = Fear::parse(raw)?;
                return self.finish(fear);
            }
            Step::Done => return Err(ValidationError::Finished),
        }
        Ok(Transition::Continue(next))
    }

    fn finish(&self, fear: Fear) -> Result<Transition, ValidationError> {
        // Steps only advance after storing their value, so reaching Fear
        // implies the first three are filled in.
        match (&self.draft.name, self.draft.height, self.draft.eye_color) {
            (Some(name), Some(height), Some(eye_color)) => Ok(Transition::Finished {
                flow: self.flow.clone(),
                answers: Answers {
                    name: name.clone(),
                    height,
                    eye_color,
                    fear,
                },
            }),
            _ => Err(ValidationError::Finished),
        }
    }
}
