pub mod catalog;
pub mod error;
pub mod scoring;
pub mod session;

use std::fmt;
use std::str::FromStr;

pub use catalog::{Catalog, QuizDefinition};
pub use error::QuizError;
pub use scoring::{QuizScore, Snapshot};
pub use session::{AdvanceResult, CurrentQuestion, MemorySessionStore, QuizEngine};

/// Point values of the fixed answer scale, highest first.
pub const SCALE_POINTS: [u32; 4] = [3, 2, 1, 0];
pub const MAX_POINTS_PER_QUESTION: u32 = 3;

pub fn is_valid_points(points: u32) -> bool {
    SCALE_POINTS.contains(&points)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Zh];

    pub fn tag(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Picks a language from a Telegram client `language_code`.
    pub fn from_client_code(code: Option<&str>) -> Self {
        match code {
            Some(code) if code.to_lowercase().starts_with("zh") => Language::Zh,
            _ => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language tag `{0}`")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuizId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the person taking a quiz, independent of the chat transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_code_falls_back_to_english() {
        assert_eq!(Language::from_client_code(Some("zh-hans")), Language::Zh);
        assert_eq!(Language::from_client_code(Some("ZH")), Language::Zh);
        assert_eq!(Language::from_client_code(Some("uk")), Language::En);
        assert_eq!(Language::from_client_code(None), Language::En);
    }

    #[test]
    fn language_tags_parse_back() {
        for lang in Language::ALL {
            assert_eq!(lang.tag().parse::<Language>(), Ok(lang));
        }
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn only_scale_points_are_valid() {
        assert!((0..=3).all(is_valid_points));
        assert!(!is_valid_points(4));
    }
}
