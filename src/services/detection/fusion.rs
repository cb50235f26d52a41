// Fusion Policy
// Combines marker hits and signal scores into one local probability per chunk.
// Early exits, floors and dampeners are ordered rule tables evaluated top to bottom.

use super::signals::SignalBoard;
use crate::models::{DecidedBy, MarkerHits, SignalId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionScheme {
    /// Flaw, drift, connector and predictability signals
    #[default]
    Structural,
    /// Rhythm and density around a fixed base, minus human deductions
    Lexical,
}

impl FusionScheme {
    pub fn default_weights(&self) -> FusionWeights {
        match self {
            FusionScheme::Structural => FusionWeights::structural(),
            FusionScheme::Lexical => FusionWeights::lexical(),
        }
    }

    fn decided_by(&self) -> DecidedBy {
        match self {
            FusionScheme::Structural => DecidedBy::Structural,
            FusionScheme::Lexical => DecidedBy::Lexical,
        }
    }
}

impl fmt::Display for FusionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionScheme::Structural => write!(f, "structural"),
            FusionScheme::Lexical => write!(f, "lexical"),
        }
    }
}

impl FromStr for FusionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structural" => Ok(FusionScheme::Structural),
            "lexical" => Ok(FusionScheme::Lexical),
            other => Err(format!("unknown fusion scheme: {}", other)),
        }
    }
}

/// Linear weights over signal scores. `base` is a constant term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionWeights {
    pub perfection: f64,
    pub drift: f64,
    pub connectors: f64,
    pub predictability: f64,
    pub burstiness: f64,
    pub rhythm: f64,
    pub density: f64,
    pub base: f64,
    /// Multiplier on the formal-structure score added on top of the weighted sum
    pub formal_boost: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::structural()
    }
}

impl FusionWeights {
    pub fn structural() -> Self {
        Self {
            perfection: 0.30,
            drift: 0.25,
            connectors: 0.20,
            predictability: 0.15,
            burstiness: 0.10,
            rhythm: 0.0,
            density: 0.0,
            base: 0.0,
            formal_boost: 0.10,
        }
    }

    pub fn lexical() -> Self {
        Self {
            perfection: 0.0,
            drift: 0.0,
            connectors: 0.0,
            predictability: 0.0,
            burstiness: 0.0,
            rhythm: 0.35,
            density: 0.25,
            base: 0.40,
            formal_boost: 0.0,
        }
    }

    pub fn weighted_sum(&self, board: &SignalBoard) -> f64 {
        self.base
            + self.perfection * board.score(SignalId::Perfection)
            + self.drift * board.score(SignalId::Drift)
            + self.connectors * board.score(SignalId::Connectors)
            + self.predictability * board.score(SignalId::Predictability)
            + self.burstiness * board.score(SignalId::Burstiness)
            + self.rhythm * board.score(SignalId::Rhythm)
            + self.density * board.score(SignalId::InformationDensity)
    }
}

/// Partial weight override; unset fields keep the selected scheme's preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perfection: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectors: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burstiness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhythm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formal_boost: Option<f64>,
}

impl WeightOverrides {
    pub fn apply(&self, preset: FusionWeights) -> FusionWeights {
        FusionWeights {
            perfection: self.perfection.unwrap_or(preset.perfection),
            drift: self.drift.unwrap_or(preset.drift),
            connectors: self.connectors.unwrap_or(preset.connectors),
            predictability: self.predictability.unwrap_or(preset.predictability),
            burstiness: self.burstiness.unwrap_or(preset.burstiness),
            rhythm: self.rhythm.unwrap_or(preset.rhythm),
            density: self.density.unwrap_or(preset.density),
            base: self.base.unwrap_or(preset.base),
            formal_boost: self.formal_boost.unwrap_or(preset.formal_boost),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutcome {
    pub probability: f64,
    pub evidence: Vec<String>,
    pub decided_by: DecidedBy,
    pub rules_fired: Vec<String>,
}

// ============ Early Exits ============

struct ExitRule {
    decided_by: DecidedBy,
    probability: fn(&MarkerHits) -> Option<f64>,
    evidence: fn(&MarkerHits) -> String,
}

const EARLY_EXITS: &[ExitRule] = &[
    ExitRule {
        decided_by: DecidedBy::StrongMarkers,
        probability: strong_marker_probability,
        evidence: strong_marker_evidence,
    },
    ExitRule {
        decided_by: DecidedBy::WeakMarkers,
        probability: weak_marker_probability,
        evidence: weak_marker_evidence,
    },
];

fn strong_marker_probability(m: &MarkerHits) -> Option<f64> {
    match m.strong_count {
        0 => None,
        1 => Some(0.20),
        2 => Some(0.10),
        _ => Some(0.05),
    }
}

fn strong_marker_evidence(m: &MarkerHits) -> String {
    format!("[HUMAN] {}", first_three(&m.strong_found))
}

fn weak_marker_probability(m: &MarkerHits) -> Option<f64> {
    (m.weak_count >= 5).then_some(0.25)
}

fn weak_marker_evidence(m: &MarkerHits) -> String {
    format!("[MARKERS] {} phrases: {}", m.weak_count, first_three(&m.weak_found))
}

fn first_three(phrases: &[String]) -> String {
    phrases.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
}

/// First matching dictionary exit, if any. Structural analysis is skipped when one fires.
pub fn early_exit(markers: &MarkerHits) -> Option<FusionOutcome> {
    EARLY_EXITS.iter().find_map(|rule| {
        (rule.probability)(markers).map(|probability| FusionOutcome {
            probability,
            evidence: vec![(rule.evidence)(markers)],
            decided_by: rule.decided_by,
            rules_fired: Vec::new(),
        })
    })
}

// ============ Fusion Rules ============

struct FusionContext<'a> {
    markers: &'a MarkerHits,
    board: &'a SignalBoard,
    weights: &'a FusionWeights,
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    Floor(f64),
    Scale(f64),
    ScaleCapped(f64, f64),
    Add(f64),
    FormalBoost,
}

struct Rule {
    name: &'static str,
    when: fn(&FusionContext) -> bool,
    effect: Effect,
}

impl Rule {
    fn apply(&self, p: f64, ctx: &FusionContext) -> f64 {
        match self.effect {
            Effect::Floor(floor) => p.max(floor),
            Effect::Scale(factor) => p * factor,
            Effect::ScaleCapped(factor, cap) => (p * factor).min(cap),
            Effect::Add(delta) => p + delta,
            Effect::FormalBoost => {
                let formal = ctx
                    .board
                    .get(SignalId::FormalStructure)
                    .map_or(0.0, |r| r.score);
                p + ctx.weights.formal_boost * formal
            }
        }
    }
}

const STRUCTURAL_RULES: &[Rule] = &[
    Rule { name: "formal_markup", when: has_formal_markup, effect: Effect::FormalBoost },
    Rule { name: "casual_but_coherent", when: slang_with_continuity, effect: Effect::Floor(0.85) },
    Rule { name: "template_heavy", when: template_heavy, effect: Effect::Floor(0.80) },
    Rule { name: "signal_agreement", when: three_signals_agree, effect: Effect::Floor(0.92) },
    Rule { name: "signal_pair", when: two_signals_agree, effect: Effect::ScaleCapped(1.15, 1.0) },
    Rule { name: "topic_wandering", when: wanders_off_topic, effect: Effect::Scale(0.75) },
    Rule { name: "garbled_connectors", when: has_imperfect_connectors, effect: Effect::Scale(0.80) },
    Rule { name: "visible_flaws", when: has_visible_flaws, effect: Effect::Scale(0.70) },
];

const LEXICAL_RULES: &[Rule] = &[
    Rule { name: "rich_vocabulary", when: has_rich_vocabulary, effect: Effect::Add(-0.12) },
    Rule { name: "emotional_voice", when: has_emotions, effect: Effect::Add(-0.08) },
    Rule { name: "human_rhythm", when: has_human_rhythm, effect: Effect::Add(-0.10) },
    Rule { name: "fact_dense", when: is_fact_dense, effect: Effect::Add(-0.08) },
];

/// Evaluated after every dampener so a flawless sample always keeps its floor.
const STRUCTURAL_CLOSING_RULES: &[Rule] = &[
    Rule { name: "flawless_sample", when: is_flawless, effect: Effect::Floor(0.90) },
];

const HEDGING_RULES: &[Rule] = &[
    Rule { name: "many_hedges", when: many_hedges, effect: Effect::Scale(0.85) },
    Rule { name: "some_hedges", when: some_hedges, effect: Effect::Scale(0.92) },
];

fn has_formal_markup(c: &FusionContext) -> bool {
    c.board.formal().is_some_and(|f| f.numbered > 0 || f.headers > 0)
}

fn is_flawless(c: &FusionContext) -> bool {
    c.board.perfection().is_some_and(|p| p.is_perfect)
}

fn slang_with_continuity(c: &FusionContext) -> bool {
    c.board.drift().is_some_and(|d| d.has_slang && d.continuity > 85.0)
}

fn template_heavy(c: &FusionContext) -> bool {
    c.board.connectors().is_some_and(|d| d.perfect >= 4)
}

/// High-confidence thresholds of the four structural signals.
fn agreeing_signals(board: &SignalBoard) -> usize {
    [
        board.score(SignalId::Perfection) > 0.75,
        board.score(SignalId::Drift) > 0.70,
        board.score(SignalId::Connectors) > 0.65,
        board.score(SignalId::Predictability) > 0.60,
    ]
    .iter()
    .filter(|hit| **hit)
    .count()
}

fn three_signals_agree(c: &FusionContext) -> bool {
    agreeing_signals(c.board) >= 3
}

fn two_signals_agree(c: &FusionContext) -> bool {
    agreeing_signals(c.board) == 2
}

fn wanders_off_topic(c: &FusionContext) -> bool {
    c.board.drift().is_some_and(|d| d.has_drift && d.tangents >= 2)
}

fn has_imperfect_connectors(c: &FusionContext) -> bool {
    c.board.connectors().is_some_and(|d| d.imperfect > 0)
}

fn has_visible_flaws(c: &FusionContext) -> bool {
    c.board.perfection().is_some_and(|p| p.total >= 3)
}

fn has_rich_vocabulary(c: &FusionContext) -> bool {
    c.board.lexical().is_some_and(|l| l.is_rich)
}

fn has_emotions(c: &FusionContext) -> bool {
    c.board.emotion().is_some_and(|e| e.has_emotions)
}

fn has_human_rhythm(c: &FusionContext) -> bool {
    c.board.rhythm().is_some_and(|r| r.is_human_rhythm)
}

fn is_fact_dense(c: &FusionContext) -> bool {
    c.board.density().is_some_and(|d| d.is_high_density)
}

fn many_hedges(c: &FusionContext) -> bool {
    c.markers.weak_count >= 3
}

fn some_hedges(c: &FusionContext) -> bool {
    (1..3).contains(&c.markers.weak_count)
}

// ============ Policy ============

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FusionPolicy {
    pub scheme: FusionScheme,
    pub weights: FusionWeights,
}

impl FusionPolicy {
    /// The scheme's preset weights with any overridden fields replaced.
    pub fn new(scheme: FusionScheme, overrides: Option<&WeightOverrides>) -> Self {
        let preset = scheme.default_weights();
        Self {
            scheme,
            weights: overrides.map_or(preset, |o| o.apply(preset)),
        }
    }

    pub fn fuse(&self, markers: &MarkerHits, board: &SignalBoard) -> FusionOutcome {
        let ctx = FusionContext {
            markers,
            board,
            weights: &self.weights,
        };
        let (scheme_rules, closing_rules): (&[Rule], &[Rule]) = match self.scheme {
            FusionScheme::Structural => (STRUCTURAL_RULES, STRUCTURAL_CLOSING_RULES),
            FusionScheme::Lexical => (LEXICAL_RULES, &[]),
        };

        let mut p = self.weights.weighted_sum(board);
        let mut rules_fired = Vec::new();
        for rule in scheme_rules.iter().chain(HEDGING_RULES).chain(closing_rules) {
            if (rule.when)(&ctx) {
                p = rule.apply(p, &ctx);
                rules_fired.push(rule.name.to_string());
            }
        }

        let probability = match self.scheme {
            FusionScheme::Structural => p.clamp(0.01, 0.95),
            FusionScheme::Lexical => (p.clamp(0.0, 1.0) * 100.0).round() / 100.0,
        };

        let mut evidence = match self.scheme {
            FusionScheme::Structural => structural_evidence(board),
            FusionScheme::Lexical => lexical_evidence(board),
        };
        if markers.weak_count > 0 {
            evidence.push(format!("{} hedging phrases", markers.weak_count));
        }

        FusionOutcome {
            probability,
            evidence,
            decided_by: self.scheme.decided_by(),
            rules_fired,
        }
    }
}

fn structural_evidence(board: &SignalBoard) -> Vec<String> {
    let mut out = Vec::new();
    let perfection = board.perfection();
    let drift = board.drift();
    let connectors = board.connectors();

    if perfection.is_some_and(|p| p.is_perfect) {
        out.push("[AI] Perfect text".to_string());
    }
    if drift.is_some_and(|d| d.has_slang && d.continuity > 80.0) {
        out.push("Slang with perfect logic".to_string());
    }
    if let Some(c) = connectors {
        if c.perfect > 0 {
            out.push(format!("{} template phrases", c.perfect));
        }
        if c.imperfect > 0 {
            out.push(format!("{} natural phrases", c.imperfect));
        }
    }
    if let Some(d) = drift.filter(|d| d.has_drift) {
        out.push(format!("{} topic shifts", d.tangents));
    }
    if let Some(p) = perfection {
        if p.total > 0 {
            out.push(format!("{} imperfections", p.total));
        }
        if p.corrections > 0 {
            out.push("Self-corrections".to_string());
        }
    }
    if let Some(b) = board.burstiness().filter(|b| b.cv < 30.0) {
        out.push(format!("Uniform structure CV={}%", b.cv.round()));
    }
    out
}

fn lexical_evidence(board: &SignalBoard) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(l) = board.lexical().filter(|l| l.is_rich) {
        out.push(format!("Rich vocabulary (TTR={}%)", (l.ttr * 100.0).round()));
    }
    if board.emotion().is_some_and(|e| e.has_emotions) {
        out.push("Emotional markers".to_string());
    }
    if let Some(r) = board.rhythm().filter(|r| r.is_human_rhythm) {
        out.push(format!("Variable rhythm (CV={}%)", r.cv.round()));
    }
    if board.density().is_some_and(|d| d.is_high_density) {
        out.push("High fact density".to_string());
    }
    out
}
