use super::SignalAnalyzer;
use crate::models::{AnalysisResult, ConnectorDetails, SignalDetails, SignalId};
use crate::services::text_processor::sentences;
use regex::Regex;
use std::sync::OnceLock;

/// Formulaic openers and closers in the exact position a template would put them.
const PERFECT_CLICHES: &[&str] = &[
    r"(?im)^тут такое дело",
    r"(?im)^ну,?\s*(?:ты\s+)?знаешь",
    r"(?im)^короче,?\s",
    r"(?im)^смотри,?\s",
    r"(?i)и в (?:этом|том|её|его) .{0,20}было",
    r"(?im),?\s*если честно[.,]?$",
    r"(?i),?\s*на самом деле",
    r"(?i),?\s*по большому счёту",
    r"(?i)типа того",
    r"(?i)вот и всё",
    r"(?i)вот такие дела",
    r"(?im)^here's the thing",
    r"(?im)^you know what",
    r"(?im),?\s*to be honest[.,]?$",
    r"(?i),?\s*at the end of the day",
];

/// The same clichés garbled the way people actually say them.
const IMPERFECT_VARIANTS: &[&str] = &[r"(?i)такое тут дело", r"(?i)знаешь,?\s*ну", r"(?i)честно если"];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("connector regex"))
        .collect()
}

fn perfect_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| compile(PERFECT_CLICHES))
}

fn imperfect_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| compile(IMPERFECT_VARIANTS))
}

pub struct ConnectorAnalyzer;

impl SignalAnalyzer for ConnectorAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::Connectors
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let perfect = perfect_res().iter().filter(|re| re.is_match(text)).count();
        let imperfect = imperfect_res().iter().filter(|re| re.is_match(text)).count();

        let sentence_count = sentences(text, 6).len();
        let density = if sentence_count > 0 {
            perfect as f64 / sentence_count as f64
        } else {
            0.0
        };

        let mut score = if density > 0.3 {
            0.90
        } else if density > 0.2 {
            0.75
        } else if density > 0.1 {
            0.55
        } else if perfect >= 3 {
            0.65
        } else if perfect >= 2 {
            0.45
        } else if perfect >= 1 {
            0.30
        } else {
            0.15
        };
        if imperfect > 0 {
            score *= 0.6;
        }

        AnalysisResult::new(
            score,
            SignalDetails::Connectors(ConnectorDetails {
                perfect,
                imperfect,
                density,
            }),
        )
    }
}
