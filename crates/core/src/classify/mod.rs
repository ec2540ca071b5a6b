//! Score classification shared by every dashboard panel.
//!
//! A [`ThresholdRegistry`] maps each [`MetricKind`] to an ordered rule table;
//! the [`Classifier`] turns a raw value into a [`Classification`] through it.
//! Panels never carry their own thresholds.

pub mod registry;

pub use registry::{Band, NumericRules, RuleSet, TagRules, ThresholdRegistry, ThresholdRule};

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Risk,
    Investor,
    Esg,
    Survival,
    SeverityTag,
    Compliance,
    Benchmark,
    NetPosition,
}

impl MetricKind {
    pub const ALL: [MetricKind; 8] = [
        MetricKind::Risk,
        MetricKind::Investor,
        MetricKind::Esg,
        MetricKind::Survival,
        MetricKind::SeverityTag,
        MetricKind::Compliance,
        MetricKind::Benchmark,
        MetricKind::NetPosition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Risk => "risk",
            MetricKind::Investor => "investor",
            MetricKind::Esg => "esg",
            MetricKind::Survival => "survival",
            MetricKind::SeverityTag => "severityTag",
            MetricKind::Compliance => "compliance",
            MetricKind::Benchmark => "benchmark",
            MetricKind::NetPosition => "netPosition",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered severity tiers; `Info` is the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Level {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Green,
    Teal,
    Yellow,
    Orange,
    Red,
    Blue,
}

/// Derived per render; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub label: &'static str,
    pub level: Level,
    pub color: ColorToken,
}

/// A registry lookup that cannot be satisfied. Always a programming defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    Unregistered(MetricKind),
    Duplicate(MetricKind),
    UnorderedThresholds(MetricKind),
    ShapeMismatch {
        kind: MetricKind,
        expected: &'static str,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::Unregistered(kind) => {
                write!(f, "no threshold rules registered for metric kind {kind}")
            }
            ConfigurationError::Duplicate(kind) => {
                write!(f, "metric kind {kind} registered more than once")
            }
            ConfigurationError::UnorderedThresholds(kind) => {
                write!(f, "thresholds for metric kind {kind} are not strictly descending")
            }
            ConfigurationError::ShapeMismatch { kind, expected } => {
                write!(f, "metric kind {kind} expects {expected}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue<'a> {
    Score(f64),
    Tag(&'a str),
}

impl From<f64> for MetricValue<'_> {
    fn from(value: f64) -> Self {
        MetricValue::Score(value)
    }
}

impl<'a> From<&'a str> for MetricValue<'a> {
    fn from(value: &'a str) -> Self {
        MetricValue::Tag(value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    registry: &'static ThresholdRegistry,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ThresholdRegistry::builtin())
    }
}

impl Classifier {
    pub fn new(registry: &'static ThresholdRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'static ThresholdRegistry {
        self.registry
    }

    pub fn classify<'a>(
        &self,
        kind: MetricKind,
        value: impl Into<MetricValue<'a>>,
    ) -> Result<Classification, ConfigurationError> {
        let classification = match value.into() {
            MetricValue::Score(score) => self.registry.numeric(kind)?.classify(score),
            MetricValue::Tag(tag) => self.registry.tagged(kind)?.classify(tag),
        };
        Ok(classification)
    }
}
