use super::{cv_percent, mean_std, SignalAnalyzer};
use crate::models::{
    AnalysisResult, BurstinessDetails, RhythmDetails, SignalDetails, SignalId, SignalInput,
};
use crate::services::text_processor::sentences;

/// Sentence word-count dispersion. Humans alternate short and long sentences.
pub struct RhythmAnalyzer;

impl SignalAnalyzer for RhythmAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::Rhythm
    }

    fn input(&self) -> SignalInput {
        SignalInput::Neutralized
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let lengths: Vec<usize> = sentences(text, 4)
            .iter()
            .map(|s| s.split_whitespace().count())
            .collect();
        if lengths.len() < 4 {
            return AnalysisResult::not_applicable(SignalDetails::Rhythm(RhythmDetails {
                cv: 50.0,
                ..Default::default()
            }));
        }

        let as_f64: Vec<f64> = lengths.iter().map(|&l| l as f64).collect();
        let (avg, std) = mean_std(&as_f64);
        let cv = cv_percent(avg, std);

        let max_jump = lengths
            .windows(2)
            .map(|w| w[0].abs_diff(w[1]))
            .max()
            .unwrap_or(0);
        let has_extreme_variation =
            lengths.iter().any(|&l| l < 4) && lengths.iter().any(|&l| l > 15);
        let has_big_jump = max_jump as f64 > avg * 1.5;

        let (score, is_human_rhythm) = if cv > 60.0 && has_big_jump {
            (0.15, true)
        } else if cv > 50.0 || has_extreme_variation {
            (0.25, true)
        } else if cv > 40.0 {
            (0.40, false)
        } else if cv > 30.0 {
            (0.60, false)
        } else if cv > 20.0 {
            (0.80, false)
        } else {
            (0.90, false)
        };

        AnalysisResult::new(
            score,
            SignalDetails::Rhythm(RhythmDetails {
                cv,
                std,
                avg,
                max_jump,
                has_extreme_variation,
                has_big_jump,
                is_human_rhythm,
            }),
        )
    }
}

/// Dispersion of sentence complexity: words plus weighted commas and dashes.
pub struct BurstinessAnalyzer;

fn complexity(sentence: &str) -> f64 {
    let words = sentence.split_whitespace().count();
    let commas = sentence.matches(',').count();
    let dashes = sentence.matches('—').count();
    (words + commas * 2 + dashes * 3) as f64
}

impl SignalAnalyzer for BurstinessAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::Burstiness
    }

    fn input(&self) -> SignalInput {
        SignalInput::Neutralized
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let values: Vec<f64> = sentences(text, 4).into_iter().map(complexity).collect();
        if values.len() < 3 {
            return AnalysisResult::not_applicable(SignalDetails::Burstiness(BurstinessDetails {
                cv: 50.0,
                ..Default::default()
            }));
        }

        let (avg, std) = mean_std(&values);
        let cv = cv_percent(avg, std);
        let score = if cv < 20.0 {
            0.90
        } else if cv < 30.0 {
            0.70
        } else if cv < 40.0 {
            0.50
        } else if cv < 55.0 {
            0.30
        } else {
            0.15
        };

        AnalysisResult::new(
            score,
            SignalDetails::Burstiness(BurstinessDetails { cv, std, avg }),
        )
    }
}
