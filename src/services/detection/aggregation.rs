// Aggregation Logic
// Merges per-chunk verdicts into one document verdict

use crate::models::{ChunkVerdict, DocumentMetrics, DocumentVerdict, Label, SignalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

const DEFAULT_EXPLANATION: &str = "Analysis complete";

/// Blending weights, label thresholds and evidence limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationPolicy {
    /// Weight of the local probability when an external verdict exists
    pub local_weight: f64,
    /// Local probability at which the floor engages
    pub floor_trigger: f64,
    /// Final is never below local * floor_ratio once the floor engages
    pub floor_ratio: f64,
    pub human_below: f64,
    pub ai_above: f64,
    pub evidence_cap: usize,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            local_weight: 0.90,
            floor_trigger: 0.30,
            floor_ratio: 0.95,
            human_below: 0.25,
            ai_above: 0.40,
            evidence_cap: 15,
        }
    }
}

impl AggregationPolicy {
    pub fn label_for(&self, probability: f64) -> Label {
        if probability < self.human_below {
            Label::Human
        } else if probability > self.ai_above {
            Label::Ai
        } else {
            Label::Mixed
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Aggregate chunk verdicts into the document verdict.
pub fn aggregate_chunks(chunks: Vec<ChunkVerdict>, policy: &AggregationPolicy) -> DocumentVerdict {
    let request_id = Uuid::new_v4();

    if chunks.is_empty() {
        return DocumentVerdict {
            request_id,
            ai_score: 50,
            label: Label::Mixed,
            confidence: 0.5,
            chunk_count: 0,
            evidence_phrases: Vec::new(),
            metrics: DocumentMetrics {
                lexical: 50.0,
                ..Default::default()
            },
            signal_scores: BTreeMap::new(),
            local_probability: 0.5,
            external_probability: None,
            final_probability: 0.5,
            external_fallback: None,
            explanation: DEFAULT_EXPLANATION.to_string(),
            chunk_verdicts: chunks,
        };
    }

    let local = mean(chunks.iter().map(|c| c.local_probability)).unwrap_or(0.5);
    let external = mean(
        chunks
            .iter()
            .filter_map(|c| c.external.as_ref())
            .map(|e| e.ai_probability),
    );
    let external_confidence = mean(
        chunks
            .iter()
            .filter_map(|c| c.external.as_ref())
            .map(|e| e.confidence),
    );

    // Without any external verdict the local weight renormalizes to 1.
    let mut combined = match external {
        Some(ext) => local * policy.local_weight + ext * (1.0 - policy.local_weight),
        None => local,
    };
    if local >= policy.floor_trigger {
        combined = combined.max(local * policy.floor_ratio);
    }
    let combined = combined.clamp(0.0, 1.0);

    let confidence = if local >= 0.50 {
        0.92
    } else if local >= 0.35 {
        0.78
    } else {
        external_confidence.unwrap_or(0.5)
    };

    let mut evidence_phrases: Vec<String> = Vec::new();
    for chunk in &chunks {
        let external_phrases = chunk
            .external
            .iter()
            .flat_map(|e| e.suspicious_phrases.iter());
        for phrase in chunk.evidence.iter().chain(external_phrases) {
            let phrase = phrase.trim();
            if !phrase.is_empty() && !evidence_phrases.iter().any(|p| p == phrase) {
                evidence_phrases.push(phrase.to_string());
            }
        }
    }
    evidence_phrases.truncate(policy.evidence_cap);

    let failed: Vec<&str> = chunks
        .iter()
        .filter_map(|c| c.external_error.as_deref())
        .collect();
    let external_fallback = failed.first().map(|cause| {
        format!(
            "neutral remote verdict substituted for {} of {} chunk(s): {}",
            failed.len(),
            chunks.len(),
            cause
        )
    });

    let explanation = chunks
        .iter()
        .filter_map(|c| c.external.as_ref())
        .map(|e| e.reasoning.trim())
        .find(|r| !r.is_empty())
        .unwrap_or(DEFAULT_EXPLANATION)
        .to_string();

    let metrics = DocumentMetrics {
        lexical: round1(100.0 - mean(chunks.iter().map(|c| c.metrics.burstiness_cv)).unwrap_or(50.0)),
        variation: round1(mean(chunks.iter().map(|c| c.metrics.sentence_std)).unwrap_or(0.0)),
        sentence_avg: round1(mean(chunks.iter().map(|c| c.metrics.sentence_avg)).unwrap_or(0.0)),
    };

    let mut sums: BTreeMap<SignalId, (f64, usize)> = BTreeMap::new();
    for chunk in &chunks {
        for (id, score) in &chunk.signal_scores {
            let entry = sums.entry(*id).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    let signal_scores = sums
        .into_iter()
        .map(|(id, (sum, n))| (id, (sum / n as f64 * 100.0).round().clamp(0.0, 100.0) as u8))
        .collect();

    DocumentVerdict {
        request_id,
        ai_score: (combined * 100.0).round().clamp(0.0, 100.0) as u8,
        label: policy.label_for(combined),
        confidence,
        chunk_count: chunks.len(),
        evidence_phrases,
        metrics,
        signal_scores,
        local_probability: local,
        external_probability: external,
        final_probability: combined,
        external_fallback,
        explanation,
        chunk_verdicts: chunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChunkMetrics, ChunkOffsets, ConfidenceLevel, DecidedBy, ExternalVerdict, MarkerHits,
    };

    fn chunk(id: usize, p: f64, evidence: &[&str]) -> ChunkVerdict {
        ChunkVerdict {
            chunk_id: id,
            offsets: ChunkOffsets { start: 0, end: 10 },
            local_probability: p,
            evidence: evidence.iter().map(|s| s.to_string()).collect(),
            decided_by: DecidedBy::Structural,
            local_confidence: ConfidenceLevel::Low,
            word_count: 10,
            metrics: ChunkMetrics {
                burstiness_cv: 20.0,
                sentence_std: 2.0,
                sentence_avg: 10.0,
                ttr: None,
            },
            signal_scores: BTreeMap::from([(SignalId::Perfection, p)]),
            markers: MarkerHits::default(),
            rules_fired: Vec::new(),
            external: None,
            external_error: None,
        }
    }

    fn external(p: f64, confidence: f64, phrases: &[&str], reasoning: &str) -> ExternalVerdict {
        ExternalVerdict {
            ai_probability: p,
            confidence,
            suspicious_phrases: phrases.iter().map(|s| s.to_string()).collect(),
            reasoning: reasoning.to_string(),
            ..ExternalVerdict::neutral()
        }
    }

    #[test]
    fn test_local_only_uses_full_local_weight() {
        let v = aggregate_chunks(vec![chunk(0, 0.20, &[]), chunk(1, 0.30, &[])], &AggregationPolicy::default());
        assert!((v.final_probability - 0.25).abs() < 1e-9);
        assert_eq!(v.ai_score, 25);
        assert_eq!(v.label, Label::Mixed);
        assert_eq!(v.confidence, 0.5);
        assert!(v.external_probability.is_none());
        assert_eq!(v.explanation, "Analysis complete");
        assert_eq!(v.chunk_count, 2);
    }

    #[test]
    fn test_external_blended_at_ten_percent() {
        let mut c = chunk(0, 0.10, &[]);
        c.external = Some(external(0.90, 0.7, &[], "Looks human overall"));
        let v = aggregate_chunks(vec![c], &AggregationPolicy::default());
        assert!((v.final_probability - 0.18).abs() < 1e-9);
        assert_eq!(v.label, Label::Human);
        assert_eq!(v.confidence, 0.7);
        assert_eq!(v.explanation, "Looks human overall");
        assert_eq!(v.external_probability, Some(0.90));
    }

    #[test]
    fn test_external_mean_only_over_chunks_with_verdicts() {
        let mut a = chunk(0, 0.20, &[]);
        a.external = Some(external(0.60, 0.5, &[], ""));
        let b = chunk(1, 0.20, &[]);
        let v = aggregate_chunks(vec![a, b], &AggregationPolicy::default());
        assert_eq!(v.external_probability, Some(0.60));
        assert!((v.final_probability - (0.20 * 0.9 + 0.60 * 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_substituted_neutral_verdict_is_reported() {
        let mut a = chunk(0, 0.20, &[]);
        a.external = Some(ExternalVerdict::neutral());
        a.external_error = Some("API key rejected".to_string());
        let mut b = chunk(1, 0.20, &[]);
        b.external = Some(external(0.10, 0.8, &[], ""));
        let v = aggregate_chunks(vec![a, b], &AggregationPolicy::default());
        assert_eq!(
            v.external_fallback.as_deref(),
            Some("neutral remote verdict substituted for 1 of 2 chunk(s): API key rejected")
        );

        let clean = aggregate_chunks(vec![chunk(0, 0.20, &[])], &AggregationPolicy::default());
        assert!(clean.external_fallback.is_none());
    }

    #[test]
    fn test_floor_keeps_strong_local_signal() {
        let mut c = chunk(0, 0.80, &[]);
        c.external = Some(external(0.0, 0.9, &[], ""));
        let v = aggregate_chunks(vec![c], &AggregationPolicy::default());
        assert!((v.final_probability - 0.76).abs() < 1e-9);
        assert_eq!(v.label, Label::Ai);
        assert_eq!(v.confidence, 0.92);
    }

    #[test]
    fn test_evidence_deduplicated_in_order_and_capped() {
        let a = chunk(0, 0.5, &["[AI] Perfect text", "2 template phrases"]);
        let mut b = chunk(1, 0.5, &["[AI] Perfect text", "1 hedging phrases"]);
        b.external = Some(external(0.5, 0.5, &["в заключение", "2 template phrases"], ""));
        let v = aggregate_chunks(vec![a, b], &AggregationPolicy::default());
        assert_eq!(
            v.evidence_phrases,
            vec!["[AI] Perfect text", "2 template phrases", "1 hedging phrases", "в заключение"]
        );

        let many: Vec<String> = (0..20).map(|i| format!("phrase {}", i)).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        let v = aggregate_chunks(vec![chunk(0, 0.5, &refs)], &AggregationPolicy::default());
        assert_eq!(v.evidence_phrases.len(), 15);
        assert_eq!(v.evidence_phrases[14], "phrase 14");
    }

    #[test]
    fn test_metrics_and_signal_means() {
        let v = aggregate_chunks(vec![chunk(0, 0.2, &[]), chunk(1, 0.4, &[])], &AggregationPolicy::default());
        assert_eq!(v.metrics.lexical, 80.0);
        assert_eq!(v.metrics.variation, 2.0);
        assert_eq!(v.signal_scores.get(&SignalId::Perfection), Some(&30));
    }

    #[test]
    fn test_label_thresholds() {
        let p = AggregationPolicy::default();
        assert_eq!(p.label_for(0.24), Label::Human);
        assert_eq!(p.label_for(0.25), Label::Mixed);
        assert_eq!(p.label_for(0.40), Label::Mixed);
        assert_eq!(p.label_for(0.41), Label::Ai);
    }

    #[test]
    fn test_empty_input_is_neutral() {
        let v = aggregate_chunks(Vec::new(), &AggregationPolicy::default());
        assert_eq!(v.ai_score, 50);
        assert_eq!(v.label, Label::Mixed);
        assert_eq!(v.chunk_count, 0);
    }
}
