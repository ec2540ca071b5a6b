use crate::classify::ColorToken::{Blue, Green, Orange, Red, Teal, Yellow};
use crate::classify::{Classification, ColorToken, ConfigurationError, Level, MetricKind};

/// Presentation attached to one tier of a threshold table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub label: &'static str,
    pub level: Level,
    pub color: ColorToken,
}

impl Band {
    pub const fn new(label: &'static str, level: Level, color: ColorToken) -> Self {
        Self {
            label,
            level,
            color,
        }
    }

    pub fn classification(&self) -> Classification {
        Classification {
            label: self.label,
            level: self.level,
            color: self.color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRule {
    pub min_inclusive: f64,
    pub band: Band,
}

impl ThresholdRule {
    pub const fn at_least(
        min_inclusive: f64,
        label: &'static str,
        level: Level,
        color: ColorToken,
    ) -> Self {
        Self {
            min_inclusive,
            band: Band::new(label, level, color),
        }
    }
}

/// Numeric tiers, highest bound first. `floor` has an implicit lower bound of
/// negative infinity, so every input lands in exactly one tier.
#[derive(Debug, Clone, Copy)]
pub struct NumericRules {
    tiers: &'static [ThresholdRule],
    floor: Band,
}

impl NumericRules {
    pub const fn new(tiers: &'static [ThresholdRule], floor: Band) -> Self {
        Self { tiers, floor }
    }

    /// Full ordered rule sequence including the floor tier.
    pub fn rules(&self) -> impl Iterator<Item = ThresholdRule> + '_ {
        self.tiers.iter().copied().chain(std::iter::once(ThresholdRule {
            min_inclusive: f64::NEG_INFINITY,
            band: self.floor,
        }))
    }

    pub fn classify(&self, value: f64) -> Classification {
        // Non-finite input sits below every threshold.
        if !value.is_finite() {
            return self.floor.classification();
        }
        self.tiers
            .iter()
            .find(|rule| rule.min_inclusive <= value)
            .map(|rule| rule.band)
            .unwrap_or(self.floor)
            .classification()
    }

    fn is_descending(&self) -> bool {
        self.tiers
            .windows(2)
            .all(|pair| pair[0].min_inclusive > pair[1].min_inclusive)
    }
}

/// Exact tag lookup with an unconditional fallback.
#[derive(Debug, Clone, Copy)]
pub struct TagRules {
    tags: &'static [(&'static str, Band)],
    fallback: Band,
}

impl TagRules {
    pub const fn new(tags: &'static [(&'static str, Band)], fallback: Band) -> Self {
        Self { tags, fallback }
    }

    pub fn tags(&self) -> impl Iterator<Item = (&'static str, Band)> + '_ {
        self.tags.iter().copied()
    }

    pub fn classify(&self, tag: &str) -> Classification {
        self.tags
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|(_, band)| *band)
            .unwrap_or(self.fallback)
            .classification()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RuleSet {
    Numeric(NumericRules),
    Tagged(TagRules),
}

#[derive(Debug)]
pub struct ThresholdRegistry {
    entries: &'static [(MetricKind, RuleSet)],
}

impl ThresholdRegistry {
    pub const fn new(entries: &'static [(MetricKind, RuleSet)]) -> Self {
        Self { entries }
    }

    pub fn builtin() -> &'static ThresholdRegistry {
        &BUILTIN
    }

    pub fn rules_for(&self, kind: MetricKind) -> Result<&RuleSet, ConfigurationError> {
        self.entries
            .iter()
            .find(|(registered, _)| *registered == kind)
            .map(|(_, rules)| rules)
            .ok_or(ConfigurationError::Unregistered(kind))
    }

    pub fn numeric(&self, kind: MetricKind) -> Result<NumericRules, ConfigurationError> {
        match self.rules_for(kind)? {
            RuleSet::Numeric(rules) => Ok(*rules),
            RuleSet::Tagged(_) => Err(ConfigurationError::ShapeMismatch {
                kind,
                expected: "numeric thresholds",
            }),
        }
    }

    pub fn tagged(&self, kind: MetricKind) -> Result<TagRules, ConfigurationError> {
        match self.rules_for(kind)? {
            RuleSet::Tagged(rules) => Ok(*rules),
            RuleSet::Numeric(_) => Err(ConfigurationError::ShapeMismatch {
                kind,
                expected: "severity tags",
            }),
        }
    }

    /// Checks every numeric table is strictly descending and no kind is
    /// registered twice.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (idx, (kind, rules)) in self.entries.iter().enumerate() {
            if self.entries[..idx].iter().any(|(seen, _)| seen == kind) {
                return Err(ConfigurationError::Duplicate(*kind));
            }
            if let RuleSet::Numeric(numeric) = rules {
                if !numeric.is_descending() {
                    return Err(ConfigurationError::UnorderedThresholds(*kind));
                }
            }
        }
        Ok(())
    }
}

static BUILTIN: ThresholdRegistry = ThresholdRegistry::new(&[
    (
        MetricKind::Risk,
        RuleSet::Numeric(NumericRules::new(
            &[
                ThresholdRule::at_least(750.0, "Stable", Level::Low, Green),
                ThresholdRule::at_least(600.0, "Watch", Level::Medium, Orange),
            ],
            Band::new("High Risk", Level::High, Red),
        )),
    ),
    (
        MetricKind::Investor,
        RuleSet::Numeric(NumericRules::new(
            &[
                ThresholdRule::at_least(80.0, "Highly Investment Ready", Level::Low, Green),
                ThresholdRule::at_least(60.0, "Investment Ready", Level::Low, Teal),
                ThresholdRule::at_least(40.0, "Growth Potential", Level::Medium, Orange),
            ],
            Band::new("Not Investment Ready", Level::High, Red),
        )),
    ),
    (
        MetricKind::Esg,
        RuleSet::Numeric(NumericRules::new(
            &[
                ThresholdRule::at_least(80.0, "Sustainable Leader", Level::Low, Green),
                ThresholdRule::at_least(65.0, "Responsible", Level::Low, Teal),
                ThresholdRule::at_least(50.0, "Moderate", Level::Medium, Orange),
            ],
            Band::new("Needs Improvement", Level::High, Red),
        )),
    ),
    (
        MetricKind::Survival,
        RuleSet::Numeric(NumericRules::new(
            &[
                ThresholdRule::at_least(70.0, "Resilient", Level::Low, Green),
                ThresholdRule::at_least(50.0, "Vulnerable", Level::Medium, Orange),
            ],
            Band::new("Distressed", Level::Critical, Red),
        )),
    ),
    (
        MetricKind::SeverityTag,
        RuleSet::Tagged(TagRules::new(
            &[
                ("Critical", Band::new("Critical", Level::Critical, Red)),
                ("High", Band::new("High", Level::High, Orange)),
                ("Medium", Band::new("Medium", Level::Medium, Yellow)),
                ("Low", Band::new("Low", Level::Low, Green)),
            ],
            Band::new("Informational", Level::Info, Blue),
        )),
    ),
    (
        MetricKind::Compliance,
        RuleSet::Numeric(NumericRules::new(
            &[
                ThresholdRule::at_least(80.0, "Compliant", Level::Low, Green),
                ThresholdRule::at_least(60.0, "Needs Review", Level::Medium, Orange),
            ],
            Band::new("Non-Compliant", Level::High, Red),
        )),
    ),
    (
        MetricKind::Benchmark,
        RuleSet::Numeric(NumericRules::new(
            &[
                ThresholdRule::at_least(75.0, "Top Quartile", Level::Low, Green),
                ThresholdRule::at_least(50.0, "Above Median", Level::Low, Teal),
                ThresholdRule::at_least(25.0, "Below Median", Level::Medium, Orange),
            ],
            Band::new("Bottom Quartile", Level::High, Red),
        )),
    ),
    (
        MetricKind::NetPosition,
        RuleSet::Numeric(NumericRules::new(
            &[ThresholdRule::at_least(0.0, "Positive", Level::Low, Green)],
            Band::new("Negative", Level::High, Red),
        )),
    ),
]);
