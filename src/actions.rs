use std::fmt;
use std::str::FromStr;

use teloxide::utils::command::BotCommands;
use thiserror::Error;

use crate::quiz::{Catalog, Language, QuizId};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "introduction and language choice.")]
    Start,
    #[command(description = "change language.")]
    Lang,
    #[command(description = "choose a questionnaire.")]
    Check,
    #[command(description = "show this text.")]
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizChoice {
    Single(QuizId),
    /// Every quiz of the catalog, in declaration order.
    All,
}

impl QuizChoice {
    pub fn quizzes(&self, catalog: &Catalog, lang: Language) -> Vec<QuizId> {
        match self {
            QuizChoice::Single(quiz) => vec![quiz.clone()],
            QuizChoice::All => catalog.quiz_ids(lang).into_iter().cloned().collect(),
        }
    }
}

/// What a pressed inline button asks for. Round-trips through callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PickLanguage(Language),
    StartQuiz(QuizChoice),
    Answer(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized callback data `{0}`")]
pub struct UnknownAction(pub String);

const ALL_QUIZZES: &str = "both";

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::PickLanguage(lang) => write!(f, "lang:{lang}"),
            Action::StartQuiz(QuizChoice::Single(quiz)) => write!(f, "start:{quiz}"),
            Action::StartQuiz(QuizChoice::All) => write!(f, "start:{ALL_QUIZZES}"),
            Action::Answer(points) => write!(f, "ans:{points}"),
        }
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownAction(data.to_string());
        let (kind, value) = data.split_once(':').ok_or_else(unknown)?;
        match kind {
            "lang" => value
                .parse()
                .map(Action::PickLanguage)
                .map_err(|_| unknown()),
            "start" if value == ALL_QUIZZES => Ok(Action::StartQuiz(QuizChoice::All)),
            "start" if !value.is_empty() => {
                Ok(Action::StartQuiz(QuizChoice::Single(QuizId::new(value))))
            }
            "ans" => value.parse().map(Action::Answer).map_err(|_| unknown()),
            _ => Err(unknown()),
        }
    }
}
