use super::SignalAnalyzer;
use crate::models::{AnalysisResult, DensityDetails, SignalDetails, SignalId};
use crate::services::text_processor::sentences;
use regex::Regex;
use std::sync::OnceLock;

fn specific_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // decimals
            r"\d+[.,]\d+",
            // measurements
            r"(?i)\d+\s*(?:(?:мм|см|км|кг|мл|градус\w*|бар|атм|psi|rpm|м|г|л)\b|°)",
            // electrical units
            r"(?i)\d+\s*(?:вольт\w*|ампер\w*|ватт\w*|квт|мгц|гц|вт|ом|в|а)\b",
            // part numbers and codes
            r"\b[A-Z]{2,}[0-9]+\b",
            // clock times
            r"\b\d{1,2}[.:]\d{2}\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("density regex"))
        .collect()
    })
}

/// Concrete facts per sentence. Dense, specific writing reads human.
pub struct InformationDensityAnalyzer;

impl SignalAnalyzer for InformationDensityAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::InformationDensity
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let sentence_count = sentences(text, 6).len();
        if sentence_count < 2 {
            return AnalysisResult::not_applicable(SignalDetails::InformationDensity(
                DensityDetails::default(),
            ));
        }

        let specific_count: usize = specific_patterns()
            .iter()
            .map(|re| re.find_iter(text).count())
            .sum();
        let density_per_sentence = specific_count as f64 / sentence_count as f64;

        let (score, is_high_density) = if density_per_sentence > 1.5 {
            (0.20, true)
        } else if density_per_sentence > 1.0 {
            (0.30, true)
        } else if density_per_sentence > 0.5 {
            (0.45, false)
        } else {
            (0.55, false)
        };

        AnalysisResult::new(
            score,
            SignalDetails::InformationDensity(DensityDetails {
                specific_count,
                density_per_sentence,
                is_high_density,
            }),
        )
    }
}
