use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::error::CatalogError;
use super::{Language, QuizError, QuizId, MAX_POINTS_PER_QUESTION};

const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog.json");

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Section {
    pub name: String,
    pub items: Vec<String>,
}

/// Whether a high raw score reflects a worse trait (`Inverse`) or a better one (`Direct`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Inverse,
    Direct,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScoreBand {
    pub low: u32,
    pub high: u32,
    pub message: String,
}

impl ScoreBand {
    pub fn contains(&self, total: u32) -> bool {
        self.low <= total && total <= self.high
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuizDefinition {
    pub id: QuizId,
    pub title: String,
    pub polarity: Polarity,
    /// Name of the composite index this quiz contributes, e.g. "Humility index".
    pub index_label: String,
    pub max_score: u32,
    pub sections: Vec<Section>,
    pub bands: Vec<ScoreBand>,
    #[serde(default)]
    pub reflection: Vec<String>,
}

impl QuizDefinition {
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

/// One entry of a flattened quiz: the prompt and the section it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatQuestion {
    pub section: String,
    pub prompt: String,
}

/// Concatenates a quiz's sections into its delivery order.
pub fn flatten(definition: &QuizDefinition) -> Vec<FlatQuestion> {
    definition
        .sections
        .iter()
        .flat_map(|section| {
            section.items.iter().map(move |prompt| FlatQuestion {
                section: section.name.clone(),
                prompt: prompt.clone(),
            })
        })
        .collect()
}

struct CatalogEntry {
    definition: QuizDefinition,
    flat: Vec<FlatQuestion>,
}

/// Immutable questionnaire data for every supported language, with flattened
/// question lists computed once at load time.
pub struct Catalog {
    languages: HashMap<Language, Vec<CatalogEntry>>,
}

impl Catalog {
    /// Loads the questionnaires compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        Self::from_definitions(serde_json::from_reader(reader)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::from_definitions(serde_json::from_str(json)?)
    }

    pub fn from_definitions(
        mut definitions: HashMap<Language, Vec<QuizDefinition>>,
    ) -> Result<Self, CatalogError> {
        let mut languages = HashMap::new();
        let mut expected_ids: Option<Vec<QuizId>> = None;

        for lang in Language::ALL {
            let quizzes = definitions
                .remove(&lang)
                .filter(|quizzes| !quizzes.is_empty())
                .ok_or(CatalogError::MissingLanguage(lang))?;

            let ids: Vec<QuizId> = quizzes.iter().map(|q| q.id.clone()).collect();
            match &expected_ids {
                Some(expected) if expected != &ids => {
                    return Err(CatalogError::QuizSetMismatch {
                        lang,
                        found: ids,
                        expected: expected.clone(),
                    })
                }
                Some(_) => {}
                None => expected_ids = Some(ids),
            }

            let mut seen = HashSet::new();
            let mut entries = Vec::with_capacity(quizzes.len());
            for definition in quizzes {
                if !seen.insert(definition.id.clone()) {
                    return Err(CatalogError::DuplicateQuiz {
                        lang,
                        quiz: definition.id,
                    });
                }
                validate(lang, &definition)?;
                let flat = flatten(&definition);
                entries.push(CatalogEntry { definition, flat });
            }
            languages.insert(lang, entries);
        }

        Ok(Self { languages })
    }

    fn entry(&self, lang: Language, quiz: &QuizId) -> Result<&CatalogEntry, QuizError> {
        self.languages
            .get(&lang)
            .and_then(|entries| entries.iter().find(|e| &e.definition.id == quiz))
            .ok_or_else(|| QuizError::NotFound {
                lang,
                quiz: quiz.clone(),
            })
    }

    pub fn get_quiz(&self, lang: Language, quiz: &QuizId) -> Result<&QuizDefinition, QuizError> {
        self.entry(lang, quiz).map(|e| &e.definition)
    }

    pub fn flatten(&self, lang: Language, quiz: &QuizId) -> Result<&[FlatQuestion], QuizError> {
        self.entry(lang, quiz).map(|e| e.flat.as_slice())
    }

    pub fn total_questions(&self, lang: Language, quiz: &QuizId) -> Result<usize, QuizError> {
        self.flatten(lang, quiz).map(|flat| flat.len())
    }

    /// Quiz identifiers in declaration order. Identical for every language.
    pub fn quiz_ids(&self, lang: Language) -> Vec<&QuizId> {
        self.languages
            .get(&lang)
            .map(|entries| entries.iter().map(|e| &e.definition.id).collect())
            .unwrap_or_default()
    }
}

fn validate(lang: Language, quiz: &QuizDefinition) -> Result<(), CatalogError> {
    if quiz.sections.is_empty() {
        return Err(CatalogError::NoSections {
            lang,
            quiz: quiz.id.clone(),
        });
    }
    if let Some(section) = quiz.sections.iter().find(|s| s.items.is_empty()) {
        return Err(CatalogError::EmptySection {
            lang,
            quiz: quiz.id.clone(),
            section: section.name.clone(),
        });
    }

    let expected = quiz.question_count() as u32 * MAX_POINTS_PER_QUESTION;
    if quiz.max_score != expected {
        return Err(CatalogError::MaxScoreMismatch {
            lang,
            quiz: quiz.id.clone(),
            declared: quiz.max_score,
            expected,
        });
    }

    let coverage_error = |reason: String| CatalogError::BandCoverage {
        lang,
        quiz: quiz.id.clone(),
        max: quiz.max_score,
        reason,
    };
    let mut covered: Option<u32> = None;
    for band in &quiz.bands {
        let expected_low = match covered {
            None => 0,
            Some(high) => high.checked_add(1).ok_or_else(|| {
                coverage_error(format!(
                    "band {}..={} follows a band ending at {high}",
                    band.low, band.high
                ))
            })?,
        };
        if band.low != expected_low {
            return Err(coverage_error(format!(
                "band {}..={} should start at {expected_low}",
                band.low, band.high
            )));
        }
        if band.high < band.low {
            return Err(coverage_error(format!(
                "band {}..={} is inverted",
                band.low, band.high
            )));
        }
        covered = Some(band.high);
    }
    match covered {
        Some(high) if high == quiz.max_score => {}
        Some(high) => return Err(coverage_error(format!("bands end at {high}"))),
        None => return Err(coverage_error("no bands".to_string())),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(sections: &[usize], bands: &[(u32, u32)]) -> QuizDefinition {
        let sections: Vec<Section> = sections
            .iter()
            .enumerate()
            .map(|(s, &len)| Section {
                name: format!("section {s}"),
                items: (0..len).map(|i| format!("prompt {s}.{i}")).collect(),
            })
            .collect();
        let count: usize = sections.iter().map(|s| s.items.len()).sum();
        QuizDefinition {
            id: QuizId::from("sample"),
            title: "Sample".to_string(),
            polarity: Polarity::Direct,
            index_label: "Sample index".to_string(),
            max_score: count as u32 * 3,
            sections,
            bands: bands
                .iter()
                .map(|&(low, high)| ScoreBand {
                    low,
                    high,
                    message: format!("{low}-{high}"),
                })
                .collect(),
            reflection: vec![],
        }
    }

    fn single_language(quiz: QuizDefinition) -> HashMap<Language, Vec<QuizDefinition>> {
        Language::ALL
            .into_iter()
            .map(|lang| (lang, vec![quiz.clone()]))
            .collect()
    }

    #[test]
    fn embedded_catalog_is_consistent() {
        let catalog = Catalog::embedded().unwrap();
        for lang in Language::ALL {
            let ids = catalog.quiz_ids(lang);
            assert_eq!(ids, vec![&QuizId::from("pride"), &QuizId::from("repentance")]);
            for id in ids {
                let quiz = catalog.get_quiz(lang, id).unwrap();
                let flat = catalog.flatten(lang, id).unwrap();
                let section_total: usize = quiz.sections.iter().map(|s| s.items.len()).sum();
                assert_eq!(flat.len(), section_total);
                assert_eq!(quiz.max_score as usize, 3 * flat.len());
            }
        }
    }

    #[test]
    fn embedded_question_counts() {
        let catalog = Catalog::embedded().unwrap();
        for lang in Language::ALL {
            assert_eq!(catalog.total_questions(lang, &"pride".into()).unwrap(), 15);
            assert_eq!(catalog.total_questions(lang, &"repentance".into()).unwrap(), 18);
        }
    }

    #[test]
    fn flatten_keeps_section_then_item_order() {
        let quiz = definition(&[2, 1], &[(0, 9)]);
        let flat = flatten(&quiz);
        let order: Vec<(&str, &str)> = flat
            .iter()
            .map(|q| (q.section.as_str(), q.prompt.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("section 0", "prompt 0.0"),
                ("section 0", "prompt 0.1"),
                ("section 1", "prompt 1.0"),
            ]
        );
        assert_eq!(flatten(&quiz), flat);
    }

    #[test]
    fn unknown_quiz_is_not_found() {
        let catalog = Catalog::embedded().unwrap();
        let err = catalog.get_quiz(Language::En, &"gratitude".into()).unwrap_err();
        assert_eq!(
            err,
            QuizError::NotFound {
                lang: Language::En,
                quiz: "gratitude".into()
            }
        );
        assert!(catalog.total_questions(Language::Zh, &"gratitude".into()).is_err());
    }

    #[test]
    fn rejects_band_gap() {
        let quiz = definition(&[3], &[(0, 4), (6, 9)]);
        let err = Catalog::from_definitions(single_language(quiz)).err().unwrap();
        assert!(matches!(err, CatalogError::BandCoverage { .. }));
    }

    #[test]
    fn rejects_bands_short_of_max() {
        let quiz = definition(&[3], &[(0, 4), (5, 8)]);
        let err = Catalog::from_definitions(single_language(quiz)).err().unwrap();
        assert!(matches!(err, CatalogError::BandCoverage { .. }));
    }

    #[test]
    fn rejects_band_reaching_u32_max() {
        for bands in [&[(0, u32::MAX)][..], &[(0, u32::MAX), (0, 9)][..]] {
            let quiz = definition(&[3], bands);
            let err = Catalog::from_definitions(single_language(quiz)).err().unwrap();
            assert!(matches!(err, CatalogError::BandCoverage { max: 9, .. }));
        }
    }

    #[test]
    fn rejects_wrong_max_score() {
        let mut quiz = definition(&[3], &[(0, 10)]);
        quiz.max_score = 10;
        let err = Catalog::from_definitions(single_language(quiz)).err().unwrap();
        assert!(matches!(
            err,
            CatalogError::MaxScoreMismatch {
                declared: 10,
                expected: 9,
                ..
            }
        ));
    }

    #[test]
    fn rejects_empty_section() {
        let quiz = definition(&[2, 0], &[(0, 6)]);
        let err = Catalog::from_definitions(single_language(quiz)).err().unwrap();
        assert!(matches!(err, CatalogError::EmptySection { .. }));
    }

    #[test]
    fn rejects_missing_language() {
        let quiz = definition(&[1], &[(0, 3)]);
        let mut definitions = single_language(quiz);
        definitions.remove(&Language::Zh);
        let err = Catalog::from_definitions(definitions).err().unwrap();
        assert!(matches!(err, CatalogError::MissingLanguage(Language::Zh)));
    }

    #[test]
    fn rejects_diverging_quiz_sets() {
        let quiz = definition(&[1], &[(0, 3)]);
        let mut other = quiz.clone();
        other.id = QuizId::from("other");
        let mut definitions = single_language(quiz);
        definitions.insert(Language::Zh, vec![other]);
        let err = Catalog::from_definitions(definitions).err().unwrap();
        assert!(matches!(err, CatalogError::QuizSetMismatch { .. }));
    }
}
