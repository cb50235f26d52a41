// AIGard Data Models
// Shapes shared by the analyzers, the fusion policy and the display surface

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============ Signals ============

/// Identifier of a registered signal analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalId {
    LexicalRichness,
    Emotion,
    Rhythm,
    Burstiness,
    InformationDensity,
    Connectors,
    Drift,
    Perfection,
    Predictability,
    FormalStructure,
}

impl SignalId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalId::LexicalRichness => "lexical_richness",
            SignalId::Emotion => "emotion",
            SignalId::Rhythm => "rhythm",
            SignalId::Burstiness => "burstiness",
            SignalId::InformationDensity => "information_density",
            SignalId::Connectors => "connectors",
            SignalId::Drift => "drift",
            SignalId::Perfection => "perfection",
            SignalId::Predictability => "predictability",
            SignalId::FormalStructure => "formal_structure",
        }
    }
}

/// Which rendition of the text an analyzer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalInput {
    Raw,
    Neutralized,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexicalDetails {
    /// Type-token ratio in [0,1]
    pub ttr: f64,
    pub unique_words: usize,
    pub total_words: usize,
    /// Unique long words (8+ chars) per token
    pub rare_ratio: f64,
    pub is_rich: bool,
    pub human_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionDetails {
    pub evaluative_count: usize,
    pub emotional_punctuation: usize,
    pub personal_pronouns: usize,
    pub has_emotions: bool,
    pub human_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RhythmDetails {
    /// Coefficient of variation of sentence word counts, percent
    pub cv: f64,
    pub std: f64,
    pub avg: f64,
    pub max_jump: usize,
    pub has_extreme_variation: bool,
    pub has_big_jump: bool,
    pub is_human_rhythm: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurstinessDetails {
    /// Coefficient of variation of sentence complexity, percent
    pub cv: f64,
    pub std: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityDetails {
    pub specific_count: usize,
    pub density_per_sentence: f64,
    pub is_high_density: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorDetails {
    /// Template clichés found in their canonical position
    pub perfect: usize,
    /// Garbled variants of the same clichés
    pub imperfect: usize,
    pub density: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftDetails {
    pub slang_count: usize,
    pub has_slang: bool,
    /// Share of adjacent sentence pairs sharing a content word, percent
    pub continuity: f64,
    pub tangents: usize,
    pub has_drift: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfectionDetails {
    pub repetition_flaws: usize,
    pub spacing_flaws: usize,
    pub punctuation_oddities: usize,
    pub corrections: usize,
    pub total: usize,
    pub sentences: usize,
    pub is_perfect: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictabilityDetails {
    pub sequences: usize,
    pub predictable_ratio: f64,
    pub combined: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormalDetails {
    pub numbered: usize,
    pub headers: usize,
}

/// Diagnostic payload of one analyzer, tagged by signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SignalDetails {
    LexicalRichness(LexicalDetails),
    Emotion(EmotionDetails),
    Rhythm(RhythmDetails),
    Burstiness(BurstinessDetails),
    InformationDensity(DensityDetails),
    Connectors(ConnectorDetails),
    Drift(DriftDetails),
    Perfection(PerfectionDetails),
    Predictability(PredictabilityDetails),
    FormalStructure(FormalDetails),
}

impl SignalDetails {
    pub fn signal(&self) -> SignalId {
        match self {
            SignalDetails::LexicalRichness(_) => SignalId::LexicalRichness,
            SignalDetails::Emotion(_) => SignalId::Emotion,
            SignalDetails::Rhythm(_) => SignalId::Rhythm,
            SignalDetails::Burstiness(_) => SignalId::Burstiness,
            SignalDetails::InformationDensity(_) => SignalId::InformationDensity,
            SignalDetails::Connectors(_) => SignalId::Connectors,
            SignalDetails::Drift(_) => SignalId::Drift,
            SignalDetails::Perfection(_) => SignalId::Perfection,
            SignalDetails::Predictability(_) => SignalId::Predictability,
            SignalDetails::FormalStructure(_) => SignalId::FormalStructure,
        }
    }
}

/// Output of a single analyzer: a machine-likelihood score plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Probability in [0,1] that the text is machine-generated, for this signal only
    pub score: f64,
    /// False when the sample was below the analyzer's minimum size
    pub applicable: bool,
    pub details: SignalDetails,
}

impl AnalysisResult {
    pub fn new(score: f64, details: SignalDetails) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            applicable: true,
            details,
        }
    }

    /// Neutral 0.5 result for samples below the analyzer's minimum size.
    pub fn not_applicable(details: SignalDetails) -> Self {
        Self {
            score: 0.5,
            applicable: false,
            details,
        }
    }

    pub fn signal(&self) -> SignalId {
        self.details.signal()
    }
}

// ============ Dictionary Matches ============

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerHits {
    pub strong_count: usize,
    pub strong_found: Vec<String>,
    pub weak_count: usize,
    pub weak_found: Vec<String>,
}

// ============ Verdicts ============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Human,
    #[default]
    Mixed,
    Ai,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Human => "HUMAN",
            Label::Mixed => "MIXED",
            Label::Ai => "AI",
        }
    }
}

/// Verdict returned by the optional remote classifier.
/// Field names follow the wire format the classifier is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalVerdict {
    #[serde(default)]
    pub label: Label,
    #[serde(default = "neutral_probability")]
    pub confidence: f64,
    #[serde(default = "neutral_probability")]
    pub ai_probability: f64,
    #[serde(default)]
    pub suspicious_phrases: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

fn neutral_probability() -> f64 {
    0.5
}

impl Default for ExternalVerdict {
    fn default() -> Self {
        Self::neutral()
    }
}

impl ExternalVerdict {
    /// Stand-in used whenever the classifier is unavailable or replies with garbage.
    pub fn neutral() -> Self {
        Self {
            label: Label::Mixed,
            confidence: 0.5,
            ai_probability: 0.5,
            suspicious_phrases: Vec::new(),
            reasoning: String::new(),
        }
    }

    /// Clamp probabilities into [0,1]; non-finite values fall back to neutral.
    pub fn sanitized(mut self) -> Self {
        self.confidence = sanitize_unit(self.confidence);
        self.ai_probability = sanitize_unit(self.ai_probability);
        self
    }
}

fn sanitize_unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// How a chunk's local probability was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    StrongMarkers,
    WeakMarkers,
    Structural,
    Lexical,
}

impl DecidedBy {
    pub fn is_early_exit(&self) -> bool {
        matches!(self, DecidedBy::StrongMarkers | DecidedBy::WeakMarkers)
    }
}

/// Coarse trust in a local verdict, driven by sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_word_count(words: usize) -> Self {
        if words > 150 {
            ConfidenceLevel::High
        } else if words > 80 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOffsets {
    /// UTF-8 byte offset (0-based) into the analyzed text.
    pub start: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the analyzed text.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetrics {
    pub burstiness_cv: f64,
    pub sentence_std: f64,
    pub sentence_avg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttr: Option<f64>,
}

impl Default for ChunkMetrics {
    fn default() -> Self {
        // Early-exit chunks never run the structural analyzers.
        Self {
            burstiness_cv: 50.0,
            sentence_std: 0.0,
            sentence_avg: 0.0,
            ttr: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkVerdict {
    pub chunk_id: usize,
    pub offsets: ChunkOffsets,
    pub local_probability: f64,
    pub evidence: Vec<String>,
    pub decided_by: DecidedBy,
    pub local_confidence: ConfidenceLevel,
    pub word_count: usize,
    pub metrics: ChunkMetrics,
    pub signal_scores: BTreeMap<SignalId, f64>,
    pub markers: MarkerHits,
    #[serde(default)]
    pub rules_fired: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalVerdict>,
    /// Why the remote classifier failed when `external` is a substituted neutral verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_error: Option<String>,
}

// ============ Document Verdict ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetrics {
    /// 100 minus the mean burstiness CV, one decimal
    pub lexical: f64,
    /// Mean sentence-complexity standard deviation, one decimal
    pub variation: f64,
    pub sentence_avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVerdict {
    pub request_id: Uuid,
    /// Final blended probability scaled to 0..=100
    pub ai_score: u8,
    pub label: Label,
    pub confidence: f64,
    #[serde(rename = "chunks")]
    pub chunk_count: usize,
    pub evidence_phrases: Vec<String>,
    pub metrics: DocumentMetrics,
    /// Per-signal mean sub-scores in percent, over chunks that ran the signal
    pub signal_scores: BTreeMap<SignalId, u8>,
    pub local_probability: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_probability: Option<f64>,
    pub final_probability: f64,
    /// Set when a neutral verdict stood in for a failed remote classifier call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_fallback: Option<String>,
    pub explanation: String,
    pub chunk_verdicts: Vec<ChunkVerdict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_verdict_defaults_missing_fields_to_neutral() {
        let v: ExternalVerdict = serde_json::from_str(r#"{"label":"AI"}"#).unwrap();
        assert_eq!(v.label, Label::Ai);
        assert_eq!(v.ai_probability, 0.5);
        assert_eq!(v.confidence, 0.5);
        assert!(v.suspicious_phrases.is_empty());
    }

    #[test]
    fn test_external_verdict_sanitized_clamps() {
        let v = ExternalVerdict {
            ai_probability: 1.7,
            confidence: f64::NAN,
            ..ExternalVerdict::neutral()
        }
        .sanitized();
        assert_eq!(v.ai_probability, 1.0);
        assert_eq!(v.confidence, 0.5);
    }

    #[test]
    fn test_label_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Label::Human).unwrap(), "\"HUMAN\"");
        assert_eq!(serde_json::to_string(&Label::Ai).unwrap(), "\"AI\"");
    }

    #[test]
    fn test_missing_label_defaults_to_mixed() {
        assert_eq!(Label::default(), Label::Mixed);
        let v: ExternalVerdict = serde_json::from_str(r#"{"ai_probability":0.2}"#).unwrap();
        assert_eq!(v.label, Label::Mixed);
    }

    #[test]
    fn test_signal_details_tagged_serialization() {
        let r = AnalysisResult::new(
            0.9,
            SignalDetails::FormalStructure(FormalDetails { numbered: 3, headers: 1 }),
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["details"]["signal"], "formal_structure");
        assert_eq!(json["details"]["numbered"], 3);
        assert_eq!(r.signal(), SignalId::FormalStructure);
    }

    #[test]
    fn test_confidence_level_thresholds() {
        assert_eq!(ConfidenceLevel::from_word_count(10), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_word_count(81), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_word_count(151), ConfidenceLevel::High);
    }
}
