use super::SignalAnalyzer;
use crate::models::{AnalysisResult, LexicalDetails, SignalDetails, SignalId};
use crate::services::text_processor::words;
use std::collections::HashSet;

const MIN_WORDS: usize = 20;
const RARE_WORD_CHARS: usize = 8;

/// Type-token ratio plus the share of long, unique words.
/// Rich vocabulary is a human trait, so the score falls as richness rises.
pub struct LexicalRichnessAnalyzer;

impl SignalAnalyzer for LexicalRichnessAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::LexicalRichness
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let tokens: Vec<String> = words(text, 3).collect();
        if tokens.len() < MIN_WORDS {
            return AnalysisResult::not_applicable(SignalDetails::LexicalRichness(LexicalDetails {
                ttr: 0.5,
                total_words: tokens.len(),
                ..Default::default()
            }));
        }

        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        let total = tokens.len() as f64;
        let ttr = unique.len() as f64 / total;
        let rare = unique
            .iter()
            .filter(|w| w.chars().count() >= RARE_WORD_CHARS)
            .count();
        let rare_ratio = rare as f64 / total;

        let (mut human_score, is_rich) = if ttr > 0.70 {
            (0.35, true)
        } else if ttr > 0.60 {
            (0.25, true)
        } else if ttr > 0.50 {
            (0.15, false)
        } else if ttr < 0.35 {
            (-0.15, false)
        } else {
            (0.0, false)
        };
        if rare_ratio > 0.15 {
            human_score += 0.10;
        }

        AnalysisResult::new(
            0.5 - human_score,
            SignalDetails::LexicalRichness(LexicalDetails {
                ttr,
                unique_words: unique.len(),
                total_words: tokens.len(),
                rare_ratio,
                is_rich,
                human_score,
            }),
        )
    }
}
