// Detection Module
// AI text detection core logic organized into specialized submodules:
// - markers: curated human-marker dictionary (strong/weak tiers)
// - neutralizer: masks facts before structure-sensitive scoring
// - signals: pluggable statistical/lexical analyzers
// - fusion: early exits and weighted fusion into one chunk probability
// - aggregation: merges chunk verdicts into the document verdict
// - llm_classifier: optional remote second opinion
// - detector: end-to-end pipeline

pub mod aggregation;
pub mod detector;
pub mod fusion;
pub mod llm_classifier;
pub mod markers;
pub mod neutralizer;
pub mod signals;

pub use aggregation::{aggregate_chunks, AggregationPolicy};
pub use detector::Detector;
pub use fusion::{early_exit, FusionOutcome, FusionPolicy, FusionScheme, FusionWeights, WeightOverrides};
pub use llm_classifier::{ExternalClassifier, MistralClassifier, NeutralClassifier};
pub use markers::{MarkerCategory, MarkerSet};
pub use neutralizer::neutralize;
pub use signals::{AnalyzerRegistry, SignalAnalyzer, SignalBoard};
