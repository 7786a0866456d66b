use thiserror::Error;

use super::{Language, QuizId, UserId};

/// Failures surfaced by the catalog lookups, the session state machine and the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz `{quiz}` is not defined for language `{lang}`")]
    NotFound { lang: Language, quiz: QuizId },

    #[error("user {0} has no active quiz session")]
    NoActiveSession(UserId),

    #[error("answer points {0} are not on the scale 0..=3")]
    InvalidPoints(u32),

    #[error("question index {index} is out of range for quiz `{quiz}` ({total} questions)")]
    IndexOutOfRange {
        quiz: QuizId,
        index: usize,
        total: usize,
    },

    #[error("score {total} of quiz `{quiz}` falls in no score band")]
    ScoringInconsistency { quiz: QuizId, total: u32 },

    #[error("at least one quiz must be selected")]
    EmptySelection,

    #[error("at most two quizzes can be queued, got {0}")]
    SelectionTooLong(usize),
}

impl QuizError {
    /// Internal invariant violations, as opposed to caller mistakes.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            QuizError::IndexOutOfRange { .. } | QuizError::ScoringInconsistency { .. }
        )
    }
}

/// Errors raised while loading and validating questionnaire data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog has no quizzes for language `{0}`")]
    MissingLanguage(Language),

    #[error("quiz `{quiz}` ({lang}) is listed twice")]
    DuplicateQuiz { lang: Language, quiz: QuizId },

    #[error("quiz `{quiz}` ({lang}) has no sections")]
    NoSections { lang: Language, quiz: QuizId },

    #[error("section `{section}` of quiz `{quiz}` ({lang}) has no prompts")]
    EmptySection {
        lang: Language,
        quiz: QuizId,
        section: String,
    },

    #[error("quiz `{quiz}` ({lang}) declares max score {declared}, its questions allow {expected}")]
    MaxScoreMismatch {
        lang: Language,
        quiz: QuizId,
        declared: u32,
        expected: u32,
    },

    #[error("score bands of quiz `{quiz}` ({lang}) do not partition 0..={max}: {reason}")]
    BandCoverage {
        lang: Language,
        quiz: QuizId,
        max: u32,
        reason: String,
    },

    #[error("language `{lang}` defines quizzes {found:?}, expected {expected:?}")]
    QuizSetMismatch {
        lang: Language,
        found: Vec<QuizId>,
        expected: Vec<QuizId>,
    },
}
