use super::SignalAnalyzer;
use crate::models::{AnalysisResult, PredictabilityDetails, SignalDetails, SignalId, SignalInput};
use crate::services::text_processor::words;
use std::collections::HashMap;

const MIN_WORDS: usize = 15;

const CANNED_SEQUENCES: &[&str] = &[
    "в первую очередь", "в конечном итоге", "на самом деле", "тем не менее",
    "следует отметить", "важно отметить", "таким образом", "it is important", "in order to",
    "as a result", "in conclusion",
];

/// Follower counts per word, in first-seen order.
fn follower_table(tokens: &[String]) -> HashMap<&str, Vec<(&str, usize)>> {
    let mut table: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
    for pair in tokens.windows(2) {
        let followers = table.entry(pair[0].as_str()).or_default();
        match followers.iter_mut().find(|(w, _)| *w == pair[1]) {
            Some((_, count)) => *count += 1,
            None => followers.push((pair[1].as_str(), 1)),
        }
    }
    table
}

/// First follower with the highest count.
fn dominant<'a>(followers: &[(&'a str, usize)]) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for &(w, c) in followers {
        if best.map_or(true, |(_, bc)| c > bc) {
            best = Some((w, c));
        }
    }
    best.map(|(w, _)| w)
}

/// Bigram predictability: how often each word is the most common follower of
/// the word before it, plus stock transition phrases.
pub struct PredictabilityAnalyzer;

impl SignalAnalyzer for PredictabilityAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::Predictability
    }

    fn input(&self) -> SignalInput {
        SignalInput::Neutralized
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let tokens: Vec<String> = words(text, 2).collect();
        if tokens.len() < MIN_WORDS {
            return AnalysisResult::not_applicable(SignalDetails::Predictability(
                PredictabilityDetails::default(),
            ));
        }

        let lowered = text.to_lowercase();
        let sequences = CANNED_SEQUENCES
            .iter()
            .filter(|s| lowered.contains(*s))
            .count();

        let table = follower_table(&tokens);
        let mut high = 0usize;
        let mut total = 0usize;
        for pair in tokens.windows(2) {
            let Some(followers) = table.get(pair[0].as_str()) else {
                continue;
            };
            if followers.len() > 1 {
                total += 1;
                if dominant(followers) == Some(pair[1].as_str()) {
                    high += 1;
                }
            }
        }

        let predictable_ratio = if total > 0 { high as f64 / total as f64 } else { 0.0 };
        let combined = (if sequences > 0 { 0.4 } else { 0.0 }) + predictable_ratio * 0.6;

        let score = if combined > 0.50 {
            0.95
        } else if combined > 0.35 {
            0.80
        } else if combined > 0.25 {
            0.65
        } else if combined > 0.15 {
            0.45
        } else {
            0.20
        };

        AnalysisResult::new(
            score,
            SignalDetails::Predictability(PredictabilityDetails {
                sequences,
                predictable_ratio,
                combined,
            }),
        )
    }
}
