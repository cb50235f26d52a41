// Detector
// Chunk -> markers -> (early exit | signals + fusion) -> optional remote verdict -> aggregate

use super::aggregation::aggregate_chunks;
use super::fusion::{early_exit, FusionOutcome, FusionPolicy};
use super::llm_classifier::ExternalClassifier;
use super::markers::MarkerSet;
use super::signals::{AnalyzerRegistry, SignalBoard};
use crate::error::DetectError;
use crate::models::{
    ChunkMetrics, ChunkOffsets, ChunkVerdict, ConfidenceLevel, DocumentVerdict, ExternalVerdict,
};
use crate::services::config_store::{AppConfig, DetectionConfig};
use crate::services::text_processor::{build_chunks, word_count, TextChunk};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Analysis engine. Immutable after construction and shareable across threads.
pub struct Detector {
    markers: Arc<MarkerSet>,
    registry: AnalyzerRegistry,
    policy: FusionPolicy,
    config: DetectionConfig,
    external_required: bool,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

impl Detector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            markers: MarkerSet::standard(),
            registry: AnalyzerRegistry::standard(),
            policy: FusionPolicy::new(config.scheme, config.weights.as_ref()),
            config,
            external_required: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.detection.clone()).require_external(config.external.required)
    }

    pub fn with_markers(mut self, markers: Arc<MarkerSet>) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_registry(mut self, registry: AnalyzerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// When set, a failing classifier aborts the analysis instead of being neutralized.
    pub fn require_external(mut self, required: bool) -> Self {
        self.external_required = required;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Local-only analysis.
    pub fn analyze(&self, text: &str) -> Result<DocumentVerdict, DetectError> {
        let chunks = self.prepare(text)?;
        let verdicts = chunks.iter().map(|c| self.analyze_chunk(c)).collect();
        Ok(self.finish(verdicts))
    }

    /// Analysis with an optional remote classifier consulted for every fused chunk.
    /// `progress(done, total)` runs after each chunk.
    pub async fn analyze_with<F>(
        &self,
        text: &str,
        classifier: Option<&dyn ExternalClassifier>,
        mut progress: F,
    ) -> Result<DocumentVerdict, DetectError>
    where
        F: FnMut(usize, usize),
    {
        let chunks = self.prepare(text)?;
        let total = chunks.len();
        let mut verdicts = Vec::with_capacity(total);

        for chunk in &chunks {
            let mut verdict = self.analyze_chunk(chunk);

            if let Some(classifier) = classifier {
                if !verdict.decided_by.is_early_exit() {
                    match classifier.classify(&chunk.text).await {
                        Ok(external) => verdict.external = Some(external.sanitized()),
                        Err(e) if self.external_required => {
                            return Err(DetectError::ExternalUnavailable(e));
                        }
                        Err(e) => {
                            warn!(
                                "[DETECTOR] {} unavailable for chunk {}, using neutral verdict: {}",
                                classifier.name(),
                                chunk.index,
                                e
                            );
                            verdict.external = Some(ExternalVerdict::neutral());
                            verdict.external_error = Some(e.to_string());
                        }
                    }
                }
            }

            verdicts.push(verdict);
            progress(verdicts.len(), total);
        }

        Ok(self.finish(verdicts))
    }

    fn prepare(&self, text: &str) -> Result<Vec<TextChunk>, DetectError> {
        let chars = text.trim().chars().count();
        if chars < self.config.min_text_chars {
            return Err(DetectError::InputTooShort {
                chars,
                min: self.config.min_text_chars,
            });
        }

        let chunks = build_chunks(text, self.config.max_chunk_size);
        info!(
            "[DETECTOR] Analyzing {} chars in {} chunk(s), scheme={}",
            chars,
            chunks.len(),
            self.policy.scheme
        );
        Ok(chunks)
    }

    fn finish(&self, verdicts: Vec<ChunkVerdict>) -> DocumentVerdict {
        let document = aggregate_chunks(verdicts, &self.config.aggregation);
        info!(
            "[DETECTOR] Verdict {} ai_score={} local={:.3} external={:?}",
            document.label.as_str(),
            document.ai_score,
            document.local_probability,
            document.external_probability
        );
        document
    }

    /// Local verdict for one chunk. Dictionary exits skip the analyzers entirely.
    pub fn analyze_chunk(&self, chunk: &TextChunk) -> ChunkVerdict {
        let markers = self.markers.match_markers(&chunk.text);
        let words = word_count(&chunk.text);

        let (outcome, metrics, signal_scores) = match early_exit(&markers) {
            Some(outcome) => (outcome, ChunkMetrics::default(), BTreeMap::new()),
            None => {
                let board = self.registry.run(&chunk.text);
                let outcome: FusionOutcome = self.policy.fuse(&markers, &board);
                (outcome, chunk_metrics(&board), board.scores())
            }
        };

        debug!(
            chunk = chunk.index,
            probability = outcome.probability,
            decided_by = ?outcome.decided_by,
            "chunk.decided"
        );

        ChunkVerdict {
            chunk_id: chunk.index,
            offsets: ChunkOffsets {
                start: chunk.start,
                end: chunk.end,
            },
            local_probability: outcome.probability,
            evidence: outcome.evidence,
            decided_by: outcome.decided_by,
            local_confidence: ConfidenceLevel::from_word_count(words),
            word_count: words,
            metrics,
            signal_scores,
            markers,
            rules_fired: outcome.rules_fired,
            external: None,
            external_error: None,
        }
    }
}

fn chunk_metrics(board: &SignalBoard) -> ChunkMetrics {
    let mut metrics = ChunkMetrics::default();
    if let Some(b) = board.burstiness() {
        metrics.burstiness_cv = b.cv;
        metrics.sentence_std = b.std;
        metrics.sentence_avg = b.avg;
    }
    metrics.ttr = board
        .lexical()
        .filter(|l| l.total_words > 0)
        .map(|l| l.ttr);
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecidedBy, Label, SignalId};
    use crate::services::providers::ProviderError;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STRONG_MARKER_TEXT: &str =
        "Врать не буду, движок троит, прокладку пробило — пришлось на соплях ставить заглушку.";

    const FLAWLESS_TEXT: &str = "The research team analyzed the climate data carefully. \
        This climate analysis revealed several important patterns. \
        These patterns suggest significant regional temperature changes. \
        Regional authorities should consider these temperature findings. \
        Such findings will guide future environmental policy decisions.";

    // Uniform 12-14 word sentences, no content word repeated, no flaws.
    const UNIFORM_FLAWLESS_TEXT: &str = "The morning train carried tired commuters across the wide river toward the busy city. \
        Local bakeries opened early and filled narrow streets with the smell of bread. \
        Students gathered inside the library to prepare for their final exams of spring. \
        Engineers inspected the old bridge and recorded every crack in careful detail today. \
        Farmers sold fresh apples and pumpkins at the square market near the town hall.";

    struct ScriptedClassifier {
        calls: AtomicUsize,
        reply: fn() -> Result<ExternalVerdict, ProviderError>,
    }

    impl ScriptedClassifier {
        fn new(reply: fn() -> Result<ExternalVerdict, ProviderError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExternalClassifier for ScriptedClassifier {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn classify(&self, _text: &str) -> Result<ExternalVerdict, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn confident_human() -> Result<ExternalVerdict, ProviderError> {
        Ok(ExternalVerdict {
            label: Label::Human,
            confidence: 0.9,
            ai_probability: 0.0,
            suspicious_phrases: Vec::new(),
            reasoning: "Natural flow".to_string(),
        })
    }

    fn rate_limited() -> Result<ExternalVerdict, ProviderError> {
        Err(ProviderError::RateLimited)
    }

    fn unauthorized() -> Result<ExternalVerdict, ProviderError> {
        Err(ProviderError::Unauthorized)
    }

    #[test]
    fn test_short_input_rejected() {
        let err = Detector::default().analyze("Слишком коротко.").unwrap_err();
        match err {
            DetectError::InputTooShort { chars, min } => {
                assert_eq!(chars, 16);
                assert_eq!(min, 50);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_strong_markers_decide_human() {
        let v = Detector::default().analyze(STRONG_MARKER_TEXT).unwrap();
        let chunk = &v.chunk_verdicts[0];
        assert_eq!(chunk.decided_by, DecidedBy::StrongMarkers);
        assert!(chunk.markers.strong_count >= 3);
        assert!(chunk.signal_scores.is_empty());
        assert!(chunk.evidence[0].starts_with("[HUMAN] "));
        assert_eq!(v.ai_score, 5);
        assert_eq!(v.label, Label::Human);
    }

    #[test]
    fn test_flawless_paragraph_is_ai() {
        let v = Detector::default().analyze(FLAWLESS_TEXT).unwrap();
        let chunk = &v.chunk_verdicts[0];
        assert_eq!(chunk.decided_by, DecidedBy::Structural);
        assert!(chunk.rules_fired.contains(&"flawless_sample".to_string()));
        assert!(chunk.local_probability >= 0.90, "got {}", chunk.local_probability);
        assert!(v.evidence_phrases.contains(&"[AI] Perfect text".to_string()));
        assert!(v.ai_score >= 90);
        assert_eq!(v.label, Label::Ai);
        assert_eq!(v.confidence, 0.92);
    }

    #[test]
    fn test_uniform_flawless_paragraph_keeps_floor_despite_tangents() {
        let v = Detector::default().analyze(UNIFORM_FLAWLESS_TEXT).unwrap();
        let chunk = &v.chunk_verdicts[0];
        assert_eq!(chunk.decided_by, DecidedBy::Structural);
        assert_eq!(chunk.rules_fired.last().map(String::as_str), Some("flawless_sample"));
        assert!(chunk.local_probability >= 0.90, "got {}", chunk.local_probability);
        assert!(v.ai_score >= 90);
        assert_eq!(v.label, Label::Ai);
    }

    #[test]
    fn test_six_thousand_chars_analyzed_as_two_chunks() {
        let sentence = format!("{}.", "а".repeat(58));
        let text = vec![sentence; 100].join(" ");
        let v = Detector::default().analyze(&text).unwrap();
        assert_eq!(v.chunk_count, 2);
        assert_eq!(v.chunk_verdicts.len(), 2);
        assert_eq!(v.chunk_verdicts[1].chunk_id, 1);
        assert!(v.chunk_verdicts[0].offsets.end <= v.chunk_verdicts[1].offsets.start);
    }

    #[test]
    fn test_local_analysis_is_idempotent() {
        let detector = Detector::default();
        let a = detector.analyze(FLAWLESS_TEXT).unwrap();
        let b = detector.analyze(FLAWLESS_TEXT).unwrap();
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.final_probability, b.final_probability);
        assert_eq!(a.chunk_verdicts, b.chunk_verdicts);
        assert_eq!(a.evidence_phrases, b.evidence_phrases);
    }

    #[test]
    fn test_small_chunks_cover_every_sentence() {
        let detector = Detector::new(DetectionConfig {
            max_chunk_size: 120,
            ..Default::default()
        });
        let v = detector.analyze(FLAWLESS_TEXT).unwrap();
        assert!(v.chunk_count >= 3);
        assert_eq!(v.chunk_verdicts.len(), v.chunk_count);
        for (i, c) in v.chunk_verdicts.iter().enumerate() {
            assert_eq!(c.chunk_id, i);
            assert!(c.offsets.end <= FLAWLESS_TEXT.len());
        }
        assert!(v.ai_score <= 100);
    }

    #[tokio::test]
    async fn test_classifier_skipped_for_short_text_and_early_exit() {
        let classifier = ScriptedClassifier::new(confident_human);
        let detector = Detector::default();

        assert!(detector
            .analyze_with("Коротко.", Some(&classifier), |_, _| {})
            .await
            .is_err());
        let v = detector
            .analyze_with(STRONG_MARKER_TEXT, Some(&classifier), |_, _| {})
            .await
            .unwrap();

        assert_eq!(classifier.calls(), 0);
        assert!(v.external_probability.is_none());
        assert_eq!(v.label, Label::Human);
    }

    #[tokio::test]
    async fn test_classifier_blended_with_floor() {
        let classifier = ScriptedClassifier::new(confident_human);
        let v = Detector::default()
            .analyze_with(FLAWLESS_TEXT, Some(&classifier), |_, _| {})
            .await
            .unwrap();

        assert_eq!(classifier.calls(), 1);
        assert_eq!(v.external_probability, Some(0.0));
        assert!((v.final_probability - v.local_probability * 0.95).abs() < 1e-9);
        assert_eq!(v.explanation, "Natural flow");
        assert_eq!(v.label, Label::Ai);
    }

    #[tokio::test]
    async fn test_failing_classifier_neutralized_unless_required() {
        let classifier = ScriptedClassifier::new(rate_limited);

        let v = Detector::default()
            .analyze_with(FLAWLESS_TEXT, Some(&classifier), |_, _| {})
            .await
            .unwrap();
        assert_eq!(v.external_probability, Some(0.5));
        assert_eq!(
            v.chunk_verdicts[0].external_error.as_deref(),
            Some("Rate limit exceeded")
        );
        assert!(v
            .external_fallback
            .as_deref()
            .is_some_and(|note| note.ends_with("Rate limit exceeded")));

        let err = Detector::default()
            .require_external(true)
            .analyze_with(FLAWLESS_TEXT, Some(&classifier), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::ExternalUnavailable(ProviderError::RateLimited)));
    }

    #[tokio::test]
    async fn test_rejected_key_named_in_fallback_note() {
        let classifier = ScriptedClassifier::new(unauthorized);
        let v = Detector::default()
            .analyze_with(FLAWLESS_TEXT, Some(&classifier), |_, _| {})
            .await
            .unwrap();
        assert_eq!(
            v.external_fallback.as_deref(),
            Some("neutral remote verdict substituted for 1 of 1 chunk(s): API key rejected")
        );
    }

    #[tokio::test]
    async fn test_progress_reported_per_chunk() {
        let detector = Detector::new(DetectionConfig {
            max_chunk_size: 120,
            ..Default::default()
        });
        let mut seen = Vec::new();
        let v = detector
            .analyze_with(FLAWLESS_TEXT, None, |done, total| seen.push((done, total)))
            .await
            .unwrap();

        let n = v.chunk_count;
        assert_eq!(seen.len(), n);
        assert_eq!(seen.last(), Some(&(n, n)));
        assert!(seen.iter().all(|&(_, total)| total == n));
    }

    const BRANDS: &[&str] = &["Toyota", "BMW", "Mazda", "Лада", "Honda"];

    fn car_story(brand: &str, year: u32, price: u32, km: u32, times: u32) -> String {
        format!(
            "В {} году я купил {} за {} руб. Машина прошла уже {} км без ремонта. \
             За это время машина ломалась всего {} раз. Потом машина снова поехала на дачу. \
             Дачу мы продали осенью, а машину оставили себе.",
            year, brand, price, km, times
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn structure_scores_ignore_facts(
            a in (0usize..5, 1990u32..2025, 1u32..100_000, 1u32..500_000, 1u32..1000),
            b in (0usize..5, 1990u32..2025, 1u32..100_000, 1u32..500_000, 1u32..1000),
        ) {
            let detector = Detector::default();
            let va = detector.analyze(&car_story(BRANDS[a.0], a.1, a.2, a.3, a.4)).unwrap();
            let vb = detector.analyze(&car_story(BRANDS[b.0], b.1, b.2, b.3, b.4)).unwrap();
            for id in [SignalId::Drift, SignalId::Predictability] {
                prop_assert_eq!(
                    va.chunk_verdicts[0].signal_scores.get(&id),
                    vb.chunk_verdicts[0].signal_scores.get(&id)
                );
            }
        }
    }
}
