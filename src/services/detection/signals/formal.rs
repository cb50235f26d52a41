use super::SignalAnalyzer;
use crate::models::{AnalysisResult, FormalDetails, SignalDetails, SignalId};
use regex::Regex;
use std::sync::OnceLock;

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s").expect("numbered list regex"))
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[А-ЯЁA-Z][а-яёa-z\s]{2,}:").expect("header regex"))
}

/// Numbered lists and `Header:` lines, typical of generated answers.
pub struct FormalStructureAnalyzer;

impl SignalAnalyzer for FormalStructureAnalyzer {
    fn id(&self) -> SignalId {
        SignalId::FormalStructure
    }

    fn score(&self, text: &str) -> AnalysisResult {
        let numbered = numbered_re().find_iter(text).count();
        let headers = header_re().find_iter(text).count();

        let mut score: f64 = 0.0;
        if numbered >= 5 {
            score += 0.50;
        } else if numbered >= 3 {
            score += 0.35;
        } else if numbered >= 1 {
            score += 0.15;
        }
        if headers >= 3 {
            score += 0.30;
        } else if headers >= 1 {
            score += 0.15;
        }

        AnalysisResult::new(
            score.min(1.0),
            SignalDetails::FormalStructure(FormalDetails { numbered, headers }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prose_has_no_markup() {
        assert_eq!(FormalStructureAnalyzer.score("Просто текст без списков.").score, 0.0);
    }

    #[test]
    fn test_list_with_headers() {
        let text = "Плюсы:\n1. Цена\n2. Надёжность\n3) Расход\nМинусы:\n1. Шум\nИтог: берите.";
        let r = FormalStructureAnalyzer.score(text);
        match r.details {
            SignalDetails::FormalStructure(d) => {
                assert_eq!(d.numbered, 4);
                assert_eq!(d.headers, 3);
            }
            _ => panic!("wrong details"),
        }
        assert!((r.score - 0.65).abs() < 1e-9);
    }
}
