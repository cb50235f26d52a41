use super::SignalAnalyzer;
use crate::models::{AnalysisResult, DriftDetails, SignalDetails, SignalId, SignalInput};
use crate::services::text_processor::{sentences, words};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const STOPWORDS: &[&str] = &[
    "и", "в", "на", "с", "что", "как", "это", "но", "а", "the", "a", "is", "are", "was", "i",
    "you", "he", "she", "it", "we", "they", "this", "that",
];

fn slang_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)\b(?:блин|чёрт|бля|капец|жесть|короче|кароче|типа|ваще|чё|норм)\b",
            r"(?i)\b(?:damn|shit|fuck|dude|gonna|wanna|kinda)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("slang regex"))
        .collect()
    })
}

/// Topic continuity between adjacent sentences.
///
/// Real people wander off topic; a casual register that never loses the
/// thread is a sign of a model imitating casual speech.
pub struct DriftAnalyzer;

impl SignalAnalyzer for DriftAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::Drift
    }

    fn input(&self) -> SignalInput {
        SignalInput::Neutralized
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let sents = sentences(text, 9);
        if sents.len() < 4 {
            return AnalysisResult::not_applicable(SignalDetails::Drift(DriftDetails {
                continuity: 50.0,
                ..Default::default()
            }));
        }

        let slang_count: usize = slang_res().iter().map(|re| re.find_iter(text).count()).sum();
        let has_slang = slang_count >= 2;

        let topics: Vec<HashSet<String>> = sents
            .iter()
            .map(|s| {
                words(s, 4)
                    .filter(|w| !STOPWORDS.contains(&w.as_str()))
                    .collect()
            })
            .collect();

        let mut continuity = 0usize;
        let mut tangents = 0usize;
        for i in 1..topics.len() {
            let shares_prev = !topics[i].is_disjoint(&topics[i - 1]);
            if shares_prev {
                continuity += 1;
            }
            if i < topics.len() - 1
                && !shares_prev
                && topics[i].is_disjoint(&topics[i + 1])
                && !topics[i].is_empty()
            {
                tangents += 1;
            }
        }

        let ratio = continuity as f64 / (sents.len() - 1) as f64 * 100.0;
        let has_drift = tangents > 0;

        let score = if has_slang && ratio > 85.0 {
            0.85
        } else if has_slang && ratio > 70.0 {
            0.70
        } else if !has_slang && ratio > 90.0 {
            0.60
        } else if ratio > 80.0 {
            0.50
        } else if has_drift {
            0.20
        } else {
            0.35
        };

        AnalysisResult::new(
            score,
            SignalDetails::Drift(DriftDetails {
                slang_count,
                has_slang,
                continuity: ratio,
                tangents,
                has_drift,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(text: &str) -> DriftDetails {
        match DriftAnalyzer.score(text).details {
            SignalDetails::Drift(d) => d,
            _ => panic!("wrong details"),
        }
    }

    #[test]
    fn test_slang_with_unbroken_thread() {
        let text = "Короче, машина снова сломалась утром. Машина блин стояла весь день. \
                    Весь день машина ждала мастера. Мастера машина дождалась вечером.";
        let d = details(text);
        assert!(d.has_slang);
        assert_eq!(d.continuity, 100.0);
        assert_eq!(DriftAnalyzer.score(text).score, 0.85);
    }

    #[test]
    fn test_tangents_detected() {
        let text = "Вчера чинили старый трактор. Кошки любят спать на солнце. \
                    Бабушка варила варенье из вишни. Трактор потом завелся сразу.";
        let d = details(text);
        assert_eq!(d.tangents, 2);
        assert!(d.has_drift);
        assert_eq!(DriftAnalyzer.score(text).score, 0.20);
    }

    #[test]
    fn test_short_text_not_applicable() {
        let r = DriftAnalyzer.score("Первое предложение тут. Второе предложение там.");
        assert!(!r.applicable);
    }
}
