use super::SignalAnalyzer;
use crate::models::{AnalysisResult, EmotionDetails, SignalDetails, SignalId};
use regex::Regex;
use std::sync::OnceLock;

const EVALUATIVE: &[&str] = &[
    "отличн", "ужасн", "прекрасн", "кошмарн", "великолепн", "отвратительн",
    "потрясающ", "безобразн", "замечательн", "омерзительн", "восхитительн",
    "идиот", "дурак", "гений", "молодец", "умница", "балбес", "тупица",
    "красота", "ужас", "кошмар", "прелесть", "гадость", "мерзость",
    "обожаю", "ненавижу", "терпеть не могу", "души не чаю",
    "amazing", "terrible", "wonderful", "horrible", "fantastic", "disgusting",
];

const HUMAN_SCORE_CAP: f64 = 0.40;

fn pronoun_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:по-моему|я|мне|меня|мой|моя|моё|мои|i|me|my|mine)\b")
            .expect("pronoun regex")
    })
}

/// Evaluative vocabulary, emotional punctuation and first-person voice.
pub struct EmotionAnalyzer;

impl SignalAnalyzer for EmotionAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::Emotion
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let lowered = text.to_lowercase();

        let evaluative_count = EVALUATIVE.iter().filter(|stem| lowered.contains(*stem)).count();
        let emotional_punctuation =
            text.matches('!').count() + text.matches('?').count() + text.matches("...").count();
        let personal_pronouns = pronoun_re().find_iter(text).count();

        let mut human_score = 0.0;
        if evaluative_count >= 3 {
            human_score += 0.20;
        } else if evaluative_count >= 1 {
            human_score += 0.10;
        }
        if emotional_punctuation >= 5 {
            human_score += 0.15;
        } else if emotional_punctuation >= 2 {
            human_score += 0.08;
        }
        if personal_pronouns >= 5 {
            human_score += 0.10;
        } else if personal_pronouns >= 2 {
            human_score += 0.05;
        }
        let human_score = f64::min(human_score, HUMAN_SCORE_CAP);

        AnalysisResult::new(
            0.5 - human_score,
            SignalDetails::Emotion(EmotionDetails {
                evaluative_count,
                emotional_punctuation,
                personal_pronouns,
                has_emotions: evaluative_count > 0 || emotional_punctuation > 2,
                human_score,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(text: &str) -> EmotionDetails {
        match EmotionAnalyzer.score(text).details {
            SignalDetails::Emotion(d) => d,
            _ => panic!("wrong details"),
        }
    }

    #[test]
    fn test_flat_text_has_no_emotion() {
        let d = details("Отчёт подготовлен в срок. Данные проверены.");
        assert!(!d.has_emotions);
        assert_eq!(d.human_score, 0.0);
        assert_eq!(EmotionAnalyzer.score("Отчёт подготовлен в срок.").score, 0.5);
    }

    #[test]
    fn test_emotional_text_lowers_score() {
        let d = details("Я обожаю эту машину! Мой друг говорит, что это ужас... Мне всё равно! Правда?");
        assert_eq!(d.evaluative_count, 2); // обожаю, ужас
        assert_eq!(d.emotional_punctuation, 4);
        assert_eq!(d.personal_pronouns, 3); // я, мой, мне
        assert!(d.has_emotions);
        assert!((d.human_score - 0.23).abs() < 1e-9);
    }

    #[test]
    fn test_human_score_is_capped() {
        let text = "I my me mine I! Amazing, terrible, wonderful! Horrible?! Fantastic!!";
        let r = EmotionAnalyzer.score(text);
        assert!((r.score - 0.10).abs() < 1e-9);
    }
}
