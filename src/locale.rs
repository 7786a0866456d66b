use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;

use crate::quiz::{Catalog, Language, QuizId, SCALE_POINTS};

const EMBEDDED_STRINGS: &str = include_str!("../data/strings.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LocaleError {
    #[error("failed to read UI strings: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed UI strings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no UI strings for language `{0}`")]
    MissingLanguage(Language),

    #[error("answer scale for `{lang}` has points {found:?}, expected {expected:?}")]
    Scale {
        lang: Language,
        found: Vec<u32>,
        expected: Vec<u32>,
    },

    #[error("quiz buttons for `{lang}` cover {found:?}, expected {expected:?}")]
    QuizButtons {
        lang: Language,
        found: Vec<QuizId>,
        expected: Vec<QuizId>,
    },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ScaleOption {
    pub label: String,
    pub points: u32,
}

/// Every user-facing string for one language. A missing key fails at load time.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UiStrings {
    pub choose_lang: String,
    pub language_name: String,
    pub welcome: String,
    pub choose_quiz: String,
    pub quiz_buttons: HashMap<QuizId, String>,
    pub btn_both: String,
    pub start_next: String,
    pub session_expired: String,
    pub choose_one: String,
    pub section: String,
    pub result_word: String,
    pub assessment_word: String,
    pub score_word: String,
    pub help: String,
    pub cmd_again: String,
    pub snapshot_title: String,
    pub reflection_title: String,
    pub lang_set: String,
    pub scale: Vec<ScaleOption>,
}

pub struct Locale {
    tables: HashMap<Language, UiStrings>,
}

impl Locale {
    pub fn embedded(catalog: &Catalog) -> Result<Self, LocaleError> {
        Self::from_json(EMBEDDED_STRINGS, catalog)
    }

    pub fn from_path(path: impl AsRef<Path>, catalog: &Catalog) -> Result<Self, LocaleError> {
        Self::from_reader(BufReader::new(File::open(path)?), catalog)
    }

    pub fn from_reader(reader: impl Read, catalog: &Catalog) -> Result<Self, LocaleError> {
        Self::from_tables(serde_json::from_reader(reader)?, catalog)
    }

    pub fn from_json(json: &str, catalog: &Catalog) -> Result<Self, LocaleError> {
        Self::from_tables(serde_json::from_str(json)?, catalog)
    }

    pub fn from_tables(
        mut tables: HashMap<Language, UiStrings>,
        catalog: &Catalog,
    ) -> Result<Self, LocaleError> {
        let mut validated = HashMap::new();
        for lang in Language::ALL {
            let strings = tables
                .remove(&lang)
                .ok_or(LocaleError::MissingLanguage(lang))?;

            let points: Vec<u32> = strings.scale.iter().map(|o| o.points).collect();
            if points != SCALE_POINTS {
                return Err(LocaleError::Scale {
                    lang,
                    found: points,
                    expected: SCALE_POINTS.to_vec(),
                });
            }

            let mut expected: Vec<QuizId> = catalog.quiz_ids(lang).into_iter().cloned().collect();
            let mut found: Vec<QuizId> = strings.quiz_buttons.keys().cloned().collect();
            expected.sort();
            found.sort();
            if found != expected {
                return Err(LocaleError::QuizButtons {
                    lang,
                    found,
                    expected,
                });
            }

            validated.insert(lang, strings);
        }
        Ok(Self { tables: validated })
    }

    pub fn get(&self, lang: Language) -> &UiStrings {
        // Every language is present once `from_tables` succeeded.
        &self.tables[&lang]
    }

    /// The language picker prompt, shown in every language at once.
    pub fn language_prompt(&self) -> String {
        Language::ALL
            .iter()
            .map(|lang| self.get(*lang).choose_lang.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::embedded().unwrap()
    }

    fn embedded_tables() -> HashMap<Language, UiStrings> {
        serde_json::from_str(EMBEDDED_STRINGS).unwrap()
    }

    #[test]
    fn embedded_strings_load() {
        let locale = Locale::embedded(&catalog()).unwrap();
        assert_eq!(locale.get(Language::En).scale[0].label, "Always");
        assert_eq!(locale.get(Language::Zh).scale[3].label, "从不");
        assert_eq!(locale.get(Language::Zh).language_name, "中文");
        assert!(locale.language_prompt().contains(" / "));
    }

    #[test]
    fn missing_key_fails_at_load() {
        let mut value: serde_json::Value = serde_json::from_str(EMBEDDED_STRINGS).unwrap();
        value["zh"].as_object_mut().unwrap().remove("cmd_again");
        let err = Locale::from_json(&value.to_string(), &catalog()).err().unwrap();
        assert!(matches!(err, LocaleError::Json(_)));
    }

    #[test]
    fn scale_must_match_fixed_points() {
        let mut tables = embedded_tables();
        tables.get_mut(&Language::En).unwrap().scale[0].points = 4;
        let err = Locale::from_tables(tables, &catalog()).err().unwrap();
        assert!(matches!(err, LocaleError::Scale { lang: Language::En, .. }));
    }

    #[test]
    fn quiz_buttons_must_cover_catalog() {
        let mut tables = embedded_tables();
        tables
            .get_mut(&Language::Zh)
            .unwrap()
            .quiz_buttons
            .remove(&QuizId::from("pride"));
        let err = Locale::from_tables(tables, &catalog()).err().unwrap();
        assert!(matches!(err, LocaleError::QuizButtons { lang: Language::Zh, .. }));
    }

    #[test]
    fn every_language_is_required() {
        let mut tables = embedded_tables();
        tables.remove(&Language::En);
        let err = Locale::from_tables(tables, &catalog()).err().unwrap();
        assert!(matches!(err, LocaleError::MissingLanguage(Language::En)));
    }
}
