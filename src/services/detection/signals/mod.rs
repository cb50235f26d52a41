// Signal Analyzers
// Pluggable statistical/lexical analyzers sharing one scoring capability

mod connectors;
mod density;
mod drift;
mod emotion;
mod formal;
mod lexical;
mod perfection;
mod predictability;
mod rhythm;

pub use connectors::ConnectorAnalyzer;
pub use density::InformationDensityAnalyzer;
pub use drift::DriftAnalyzer;
pub use emotion::EmotionAnalyzer;
pub use formal::FormalStructureAnalyzer;
pub use lexical::LexicalRichnessAnalyzer;
pub use perfection::PerfectionAnalyzer;
pub use predictability::PredictabilityAnalyzer;
pub use rhythm::{BurstinessAnalyzer, RhythmAnalyzer};

use super::neutralizer::neutralize;
use crate::models::{
    AnalysisResult, BurstinessDetails, ConnectorDetails, DensityDetails, DriftDetails,
    EmotionDetails, FormalDetails, LexicalDetails, PerfectionDetails, PredictabilityDetails,
    RhythmDetails, SignalDetails, SignalId, SignalInput,
};
use std::collections::BTreeMap;
use tracing::debug;

/// One independent signal over a text sample.
pub trait SignalAnalyzer: Send + Sync {
    fn id(&self) -> SignalId;

    /// Structure-sensitive analyzers read the neutralized rendition.
    fn input(&self) -> SignalInput {
        SignalInput::Raw
    }

    fn score(&self, text: &str) -> AnalysisResult;
}

/// Ordered set of analyzers run for every fused chunk.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn SignalAnalyzer>>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl AnalyzerRegistry {
    pub fn empty() -> Self {
        Self { analyzers: Vec::new() }
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry
            .register(LexicalRichnessAnalyzer)
            .register(EmotionAnalyzer)
            .register(RhythmAnalyzer)
            .register(BurstinessAnalyzer)
            .register(InformationDensityAnalyzer)
            .register(ConnectorAnalyzer)
            .register(DriftAnalyzer)
            .register(PerfectionAnalyzer)
            .register(PredictabilityAnalyzer)
            .register(FormalStructureAnalyzer);
        registry
    }

    /// Add an analyzer; a later registration replaces an earlier one with the same id.
    pub fn register<A: SignalAnalyzer + 'static>(&mut self, analyzer: A) -> &mut Self {
        self.analyzers.retain(|a| a.id() != analyzer.id());
        self.analyzers.push(Box::new(analyzer));
        self
    }

    pub fn ids(&self) -> Vec<SignalId> {
        self.analyzers.iter().map(|a| a.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every analyzer; the text is neutralized at most once.
    pub fn run(&self, text: &str) -> SignalBoard {
        let needs_neutral = self
            .analyzers
            .iter()
            .any(|a| a.input() == SignalInput::Neutralized);
        let neutral = if needs_neutral { neutralize(text) } else { String::new() };

        let mut results = BTreeMap::new();
        for analyzer in &self.analyzers {
            let input = match analyzer.input() {
                SignalInput::Raw => text,
                SignalInput::Neutralized => neutral.as_str(),
            };
            let result = analyzer.score(input);
            debug!(
                signal = analyzer.id().as_str(),
                score = result.score,
                applicable = result.applicable,
                "signal.scored"
            );
            results.insert(analyzer.id(), result);
        }

        SignalBoard { results }
    }
}

/// Results of one registry run, keyed by signal.
#[derive(Debug, Clone, Default)]
pub struct SignalBoard {
    results: BTreeMap<SignalId, AnalysisResult>,
}

macro_rules! detail_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<&$ty> {
            match self.results.get(&SignalId::$variant).map(|r| &r.details) {
                Some(SignalDetails::$variant(d)) => Some(d),
                _ => None,
            }
        }
    };
}

impl SignalBoard {
    pub fn from_results(results: impl IntoIterator<Item = AnalysisResult>) -> Self {
        Self {
            results: results.into_iter().map(|r| (r.signal(), r)).collect(),
        }
    }

    pub fn get(&self, id: SignalId) -> Option<&AnalysisResult> {
        self.results.get(&id)
    }

    /// Score of a signal, 0.5 when the analyzer is not registered.
    pub fn score(&self, id: SignalId) -> f64 {
        self.results.get(&id).map(|r| r.score).unwrap_or(0.5)
    }

    pub fn scores(&self) -> BTreeMap<SignalId, f64> {
        self.results.iter().map(|(id, r)| (*id, r.score)).collect()
    }

    detail_accessor!(lexical, LexicalRichness, LexicalDetails);
    detail_accessor!(emotion, Emotion, EmotionDetails);
    detail_accessor!(rhythm, Rhythm, RhythmDetails);
    detail_accessor!(burstiness, Burstiness, BurstinessDetails);
    detail_accessor!(density, InformationDensity, DensityDetails);
    detail_accessor!(connectors, Connectors, ConnectorDetails);
    detail_accessor!(drift, Drift, DriftDetails);
    detail_accessor!(perfection, Perfection, PerfectionDetails);
    detail_accessor!(predictability, Predictability, PredictabilityDetails);
    detail_accessor!(formal, FormalStructure, FormalDetails);
}

/// Population mean and standard deviation; zeros for an empty slice.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Coefficient of variation in percent; zero when the mean is zero.
pub(crate) fn cv_percent(mean: f64, std: f64) -> f64 {
    if mean > 0.0 {
        std / mean * 100.0
    } else {
        0.0
    }
}
