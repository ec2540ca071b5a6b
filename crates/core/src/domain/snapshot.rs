use serde::{Deserialize, Serialize};

/// One completed analysis for a business, after normalization.
///
/// Every score defaults to `0` and every collection to empty; consumers only
/// ever branch on "zero/empty", never on "missing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub industry: String,
    pub risk: ScoredCategory,
    pub investor: ScoredCategory,
    pub esg: EsgScore,
    pub survival_score: f64,
    pub cashflow: Cashflow,
    pub working_capital: WorkingCapital,
    pub compliance: Compliance,
    pub benchmarking: Benchmarking,
    pub forecast: Forecast,
    pub product_recommendations: ProductRecommendations,
    pub warnings: Vec<Alert>,
    pub fraud_flags: Vec<Alert>,
    pub ai_summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredCategory {
    pub score: f64,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EsgScore {
    pub score: f64,
    pub category: String,
    pub breakdown: Option<EsgBreakdown>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EsgBreakdown {
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cashflow {
    pub net_cash_flow: f64,
    pub liquidity_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingCapital {
    pub working_capital: f64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    pub compliance_score: f64,
    pub issues: Vec<Alert>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Benchmarking {
    pub industry_percentile: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub next_revenue_forecast: Option<f64>,
    pub next_expense_forecast: Option<f64>,
    pub revenue_forecast: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecommendation {
    pub product: String,
    pub reason: String,
    pub fit: Option<String>,
}

/// The service has shipped two incompatible shapes: a single
/// `{recommendedProduct, reason}` object and a list of `{name, reason}`.
/// Both are kept distinct until product settles on one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum ProductRecommendations {
    Single { recommendation: ProductRecommendation },
    List { items: Vec<ProductRecommendation> },
}

impl Default for ProductRecommendations {
    fn default() -> Self {
        ProductRecommendations::List { items: Vec::new() }
    }
}

impl ProductRecommendations {
    pub fn is_empty(&self) -> bool {
        matches!(self, ProductRecommendations::List { items } if items.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
    /// Anything outside the four known values.
    Unrecognized,
}

impl AlertSeverity {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Critical" => AlertSeverity::Critical,
            "High" => AlertSeverity::High,
            "Medium" => AlertSeverity::Medium,
            "Low" => AlertSeverity::Low,
            _ => AlertSeverity::Unrecognized,
        }
    }

    /// Tag used for `severityTag` classification.
    pub fn as_tag(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "Critical",
            AlertSeverity::High => "High",
            AlertSeverity::Medium => "Medium",
            AlertSeverity::Low => "Low",
            AlertSeverity::Unrecognized => "Unrecognized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: AlertSeverity,
    pub message: String,
}
