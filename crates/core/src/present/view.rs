use crate::classify::Classification;
use crate::domain::snapshot::EsgBreakdown;
use serde::Serialize;

pub const ALL_CLEAR_MESSAGE: &str = "No issues detected";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardViewModel {
    pub risk: ScoreCard,
    pub investor: ScoreCard,
    pub esg: EsgCard,
    pub survival: ScoreCard,
    pub cashflow: CashflowCard,
    pub working_capital: WorkingCapitalCard,
    pub compliance: ComplianceCard,
    pub benchmarking: BenchmarkCard,
    pub forecast_series: ForecastSeries,
    pub product_recommendation: ProductRecommendationView,
    pub warnings: AlertPanel,
    pub fraud_flags: AlertPanel,
    pub ai_summary: SummaryView,
}

/// A score with its gauge range and pre-computed classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub title: &'static str,
    pub value: f64,
    pub max: f64,
    /// Category text as reported by the service, shown alongside the label.
    pub reported_category: Option<String>,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsgCard {
    pub score: ScoreCard,
    pub breakdown: Option<EsgBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowCard {
    pub net_cash_flow: f64,
    pub liquidity_status: Option<String>,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingCapitalCard {
    pub working_capital: f64,
    pub status: Option<String>,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceCard {
    pub score: ScoreCard,
    pub issues: AlertPanel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkCard {
    pub industry: Option<String>,
    pub percentile: ScoreCard,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSeries {
    pub next_revenue: Option<f64>,
    pub next_expense: Option<f64>,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationItem {
    pub product: String,
    pub reason: String,
    pub fit: Option<String>,
}

/// Mirrors the two wire shapes; renderers must handle both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum ProductRecommendationView {
    Single { item: RecommendationItem },
    List { items: Vec<RecommendationItem> },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub title: String,
    pub body: String,
    pub classification: Classification,
}

/// `AllClear` is an explicit positive state, distinct from "not loaded".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AlertPanel {
    AllClear { message: &'static str },
    Alerts { items: Vec<AlertView> },
}

impl AlertPanel {
    pub fn is_all_clear(&self) -> bool {
        matches!(self, AlertPanel::AllClear { .. })
    }

    pub fn items(&self) -> &[AlertView] {
        match self {
            AlertPanel::AllClear { .. } => &[],
            AlertPanel::Alerts { items } => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub lines: Vec<String>,
}
