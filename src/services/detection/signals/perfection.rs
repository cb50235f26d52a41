use super::SignalAnalyzer;
use crate::models::{AnalysisResult, PerfectionDetails, SignalDetails, SignalId};
use crate::services::text_processor::{sentences, words};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// High-frequency words whose repetition says nothing about the author.
const COMMON_WORDS: &[&str] = &[
    "было", "быть", "этот", "который", "можно", "нужно", "очень", "более", "также", "have",
    "been", "this", "that", "with", "from", "they", "would", "could", "should", "there",
    "their", "about", "which", "when", "what", "were", "will", "your", "some", "them", "than",
    "then",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("perfection regex"))
        .collect()
}

fn spacing_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| compile(&[r"[ \t]{2,}", r",{2,}"]))
}

fn oddity_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        compile(&[
            // sentence continues in lowercase after an ellipsis or !/?
            r"\.{3}\s*[а-яёa-z]",
            r"[!?]\s*[а-яёa-z]",
            // line trails off on a dash
            r"(?m)—\s*$",
        ])
    })
}

fn correction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:то есть|в смысле|точнее|вернее|i mean|actually|wait|no)\b")
            .expect("correction regex")
    })
}

fn count_all(res: &[Regex], text: &str) -> usize {
    res.iter().map(|re| re.find_iter(text).count()).sum()
}

/// Counts the small flaws human writing carries. A sample with none is suspicious.
pub struct PerfectionAnalyzer;

impl SignalAnalyzer for PerfectionAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::Perfection
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for w in words(text, 4) {
            *counts.entry(w).or_insert(0) += 1;
        }
        let repetition_flaws = counts
            .iter()
            .filter(|(w, &c)| c >= 3 && w.chars().count() > 4 && !COMMON_WORDS.contains(&w.as_str()))
            .count();

        let spacing_flaws = count_all(spacing_res(), text);
        let punctuation_oddities = count_all(oddity_res(), text);
        let corrections = correction_re().find_iter(text).count();

        let total = repetition_flaws + spacing_flaws + punctuation_oddities + corrections;
        let sentence_count = sentences(text, 6).len();
        let density = if sentence_count > 0 {
            total as f64 / sentence_count as f64
        } else {
            0.0
        };
        let is_perfect = total == 0 && sentence_count >= 3;

        let score = if is_perfect && sentence_count >= 5 {
            0.95
        } else if is_perfect {
            0.85
        } else if density < 0.1 && sentence_count >= 5 {
            0.75
        } else if density < 0.2 {
            0.55
        } else if density < 0.3 {
            0.35
        } else {
            0.15
        };

        AnalysisResult::new(
            score,
            SignalDetails::Perfection(PerfectionDetails {
                repetition_flaws,
                spacing_flaws,
                punctuation_oddities,
                corrections,
                total,
                sentences: sentence_count,
                is_perfect,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(text: &str) -> PerfectionDetails {
        match PerfectionAnalyzer.score(text).details {
            SignalDetails::Perfection(d) => d,
            _ => panic!("wrong details"),
        }
    }

    #[test]
    fn test_clean_five_sentences_are_perfect() {
        let text = "The river bends gently around the northern hills. \
                    Farmers harvest golden wheat during late summer. \
                    Children gather near the village square each evening. \
                    Merchants travel along ancient trade routes. \
                    Travelers admire colorful lanterns above narrow streets.";
        let d = details(text);
        assert!(d.is_perfect);
        assert_eq!(d.sentences, 5);
        assert_eq!(PerfectionAnalyzer.score(text).score, 0.95);
    }

    #[test]
    fn test_flaws_are_counted() {
        let text = "Ну вот  значит... короче мы поехали. То есть не поехали,, а пошли! и всё —\nКонец истории.";
        let d = details(text);
        assert_eq!(d.spacing_flaws, 2);
        assert_eq!(d.punctuation_oddities, 3);
        assert_eq!(d.corrections, 1);
        assert!(!d.is_perfect);
        assert_eq!(PerfectionAnalyzer.score(text).score, 0.15);
    }

    #[test]
    fn test_repeated_content_word_is_a_flaw() {
        let d = details("Двигатель шумит. Двигатель греется. Двигатель глохнет на холостых.");
        assert_eq!(d.repetition_flaws, 1);
    }
}
