use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::actions::{Action, QuizChoice};
use crate::locale::{Locale, UiStrings};
use crate::quiz::{Catalog, CurrentQuestion, Language, QuizDefinition, QuizScore, Snapshot};

pub fn question_text(strings: &UiStrings, question: &CurrentQuestion) -> String {
    format!(
        "{}\n{}: {}\nQ{}/{}: {}\n\n{}",
        question.title,
        strings.section,
        question.section,
        question.number,
        question.total,
        question.prompt,
        strings.choose_one
    )
}

pub fn result_text(strings: &UiStrings, quiz: &QuizDefinition, score: &QuizScore) -> String {
    format!(
        "{} {}\n- {}: {} / {} ({}%)\n- {}: {}",
        quiz.title,
        strings.result_word,
        strings.score_word,
        score.total,
        score.max,
        score.percentage,
        strings.assessment_word,
        score.band_message
    )
}

pub fn reflection_text(strings: &UiStrings, quiz: &QuizDefinition) -> String {
    let prompts = quiz
        .reflection
        .iter()
        .map(|prompt| format!("- {prompt}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}", strings.reflection_title, prompts)
}

/// One line per index; empty when no quiz was scored.
pub fn snapshot_text(strings: &UiStrings, snapshot: &Snapshot) -> String {
    let mut lines: Vec<String> = snapshot
        .indices
        .iter()
        .map(|index| format!("{}: {}/100", index.label, index.value))
        .collect();
    if let Some(overall) = snapshot.overall {
        lines.push(format!("{}: {}/100", strings.snapshot_title, overall));
    }
    lines.join("\n")
}

pub fn scale_keyboard(strings: &UiStrings) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(strings.scale.iter().map(|option| {
        vec![InlineKeyboardButton::callback(
            format!("{} ({})", option.label, option.points),
            Action::Answer(option.points).to_string(),
        )]
    }))
}

pub fn language_keyboard(locale: &Locale) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![Language::ALL
        .iter()
        .map(|&lang| {
            InlineKeyboardButton::callback(
                locale.get(lang).language_name.clone(),
                Action::PickLanguage(lang).to_string(),
            )
        })
        .collect::<Vec<_>>()])
}

pub fn quiz_keyboard(strings: &UiStrings, catalog: &Catalog, lang: Language) -> InlineKeyboardMarkup {
    let singles = catalog
        .quiz_ids(lang)
        .into_iter()
        .map(|quiz| {
            let label = strings
                .quiz_buttons
                .get(quiz)
                .cloned()
                .unwrap_or_else(|| quiz.to_string());
            InlineKeyboardButton::callback(
                label,
                Action::StartQuiz(QuizChoice::Single(quiz.clone())).to_string(),
            )
        })
        .collect::<Vec<_>>();
    let all = vec![InlineKeyboardButton::callback(
        strings.btn_both.clone(),
        Action::StartQuiz(QuizChoice::All).to_string(),
    )];
    InlineKeyboardMarkup::new(vec![singles, all])
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::quiz::scoring::{composite_indices, score};
    use crate::quiz::QuizId;

    fn fixtures() -> (Catalog, Locale) {
        let catalog = Catalog::embedded().unwrap();
        let locale = Locale::embedded(&catalog).unwrap();
        (catalog, locale)
    }

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| match &button.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        other => panic!("unexpected button kind {other:?}"),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn question_shows_position_and_section() {
        let (_, locale) = fixtures();
        let question = CurrentQuestion {
            quiz: "pride".into(),
            title: "Self‑Examination: Am I Proud?".to_string(),
            section: "Attitude toward God".to_string(),
            prompt: "Prompt".to_string(),
            number: 3,
            total: 15,
        };
        assert_eq!(
            question_text(locale.get(Language::En), &question),
            "Self‑Examination: Am I Proud?\nSection: Attitude toward God\nQ3/15: Prompt\n\nChoose one:"
        );
    }

    #[test]
    fn result_lists_score_and_band() {
        let (catalog, locale) = fixtures();
        let pride = QuizId::from("pride");
        let quiz = catalog.get_quiz(Language::En, &pride).unwrap();
        let result = score(&catalog, Language::En, &pride, &[3, 3, 2]).unwrap();
        let text = result_text(locale.get(Language::En), quiz, &result);
        assert!(text.starts_with("Self‑Examination: Am I Proud? result\n"));
        assert!(text.contains("- Score: 8 / 45 (18%)"));
        assert!(text.ends_with(&quiz.bands[0].message));
    }

    #[test]
    fn reflection_lists_prompts() {
        let (catalog, locale) = fixtures();
        let quiz = catalog.get_quiz(Language::Zh, &"repentance".into()).unwrap();
        let text = reflection_text(locale.get(Language::Zh), quiz);
        assert!(text.starts_with("反思\n- "));
        assert_eq!(text.lines().count(), 1 + quiz.reflection.len());
    }

    #[test]
    fn snapshot_lines() {
        let (catalog, locale) = fixtures();
        let strings = locale.get(Language::En);
        let both = HashMap::from([(QuizId::from("pride"), 8), (QuizId::from("repentance"), 40)]);
        let snapshot = composite_indices(&catalog, Language::En, &both).unwrap();
        assert_eq!(
            snapshot_text(strings, &snapshot),
            "Humility index: 82/100\nRepentance index: 74/100\nSpiritual health snapshot: 78/100"
        );
        assert_eq!(snapshot_text(strings, &Snapshot::default()), "");
    }

    #[test]
    fn keyboards_carry_actions() {
        let (catalog, locale) = fixtures();
        let strings = locale.get(Language::En);
        assert_eq!(
            callback_data(&scale_keyboard(strings)),
            vec![vec!["ans:3"], vec!["ans:2"], vec!["ans:1"], vec!["ans:0"]]
        );
        assert_eq!(scale_keyboard(strings).inline_keyboard[0][0].text, "Always (3)");
        assert_eq!(
            callback_data(&quiz_keyboard(strings, &catalog, Language::En)),
            vec![vec!["start:pride", "start:repentance"], vec!["start:both"]]
        );
        assert_eq!(
            callback_data(&language_keyboard(&locale)),
            vec![vec!["lang:en", "lang:zh"]]
        );
    }
}
