use std::collections::HashMap;

use log::error;

use super::catalog::Polarity;
use super::{Catalog, Language, QuizError, QuizId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizScore {
    pub quiz: QuizId,
    pub total: u32,
    pub max: u32,
    /// `total / max` as a percentage, rounded half up.
    pub percentage: u32,
    pub band_message: String,
}

pub fn score(
    catalog: &Catalog,
    lang: Language,
    quiz: &QuizId,
    answered_points: &[u32],
) -> Result<QuizScore, QuizError> {
    let definition = catalog.get_quiz(lang, quiz)?;
    let total: u32 = answered_points.iter().sum();

    let band = definition
        .bands
        .iter()
        .find(|band| band.contains(total))
        .ok_or_else(|| {
            let err = QuizError::ScoringInconsistency {
                quiz: quiz.clone(),
                total,
            };
            error!("{err}");
            err
        })?;

    Ok(QuizScore {
        quiz: quiz.clone(),
        total,
        max: definition.max_score,
        percentage: Ratio::new(total, definition.max_score).percent(),
        band_message: band.message.clone(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizIndex {
    pub quiz: QuizId,
    pub label: String,
    pub value: u32,
}

/// Polarity-adjusted 0..=100 indices for every quiz with a result, plus the
/// overall index once more than one quiz was taken.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub indices: Vec<QuizIndex>,
    pub overall: Option<u32>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

pub fn composite_indices(
    catalog: &Catalog,
    lang: Language,
    results: &HashMap<QuizId, u32>,
) -> Result<Snapshot, QuizError> {
    for quiz in results.keys() {
        catalog.get_quiz(lang, quiz)?;
    }

    let mut snapshot = Snapshot::default();
    let mut normalized = Vec::new();
    for quiz in catalog.quiz_ids(lang) {
        let Some(&total) = results.get(quiz) else {
            continue;
        };
        let definition = catalog.get_quiz(lang, quiz)?;
        if total > definition.max_score {
            let err = QuizError::ScoringInconsistency {
                quiz: quiz.clone(),
                total,
            };
            error!("{err}");
            return Err(err);
        }

        let ratio = match definition.polarity {
            Polarity::Direct => Ratio::new(total, definition.max_score),
            Polarity::Inverse => Ratio::new(definition.max_score - total, definition.max_score),
        };
        snapshot.indices.push(QuizIndex {
            quiz: quiz.clone(),
            label: definition.index_label.clone(),
            value: ratio.percent(),
        });
        normalized.push(ratio);
    }

    if normalized.len() > 1 {
        snapshot.overall = Some(Ratio::mean(&normalized).percent());
    }

    Ok(snapshot)
}

/// Exact non-negative fraction, so percentages round on the true value
/// rather than on a float approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ratio {
    num: u64,
    den: u64,
}

impl Ratio {
    fn new(num: u32, den: u32) -> Self {
        Self {
            num: u64::from(num),
            den: u64::from(den.max(1)),
        }
    }

    fn mean(ratios: &[Ratio]) -> Ratio {
        let sum = ratios.iter().fold(Ratio { num: 0, den: 1 }, |acc, r| Ratio {
            num: acc.num * r.den + r.num * acc.den,
            den: acc.den * r.den,
        });
        Ratio {
            num: sum.num,
            den: sum.den * ratios.len().max(1) as u64,
        }
    }

    /// `round(num / den * 100)` with halves rounded up.
    fn percent(&self) -> u32 {
        ((200 * self.num + self.den) / (2 * self.den)) as u32
    }
}
