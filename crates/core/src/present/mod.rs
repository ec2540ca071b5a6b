//! Snapshot to per-panel view models.

pub mod view;

pub use view::*;

use crate::classify::{
    Classification, Classifier, ColorToken, ConfigurationError, Level, MetricKind, MetricValue,
};
use crate::domain::snapshot::{
    Alert, AnalysisSnapshot, ProductRecommendation, ProductRecommendations, ScoredCategory,
};
use crate::storage::SnapshotStore;
use serde::Serialize;

const RISK_SCALE_MAX: f64 = 900.0;
const PERCENT_SCALE_MAX: f64 = 100.0;

const NUMERIC_PANELS: [MetricKind; 7] = [
    MetricKind::Risk,
    MetricKind::Investor,
    MetricKind::Esg,
    MetricKind::Survival,
    MetricKind::Compliance,
    MetricKind::Benchmark,
    MetricKind::NetPosition,
];

/// Shown only if the registry changed shape after construction.
const UNCLASSIFIED: Classification = Classification {
    label: "Unclassified",
    level: Level::Info,
    color: ColorToken::Blue,
};

/// Builds [`DashboardViewModel`]s. Every panel's rule table is checked at
/// construction, so [`ResultPresenter::present`] itself cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct ResultPresenter {
    classifier: Classifier,
}

impl ResultPresenter {
    pub fn new(classifier: &Classifier) -> Result<Self, ConfigurationError> {
        let checked = Self::check(classifier);
        if let Err(err) = &checked {
            tracing::error!(error = %err, "threshold registry is missing a panel's rules");
        }
        checked.map(|()| Self {
            classifier: *classifier,
        })
    }

    fn check(classifier: &Classifier) -> Result<(), ConfigurationError> {
        classifier.registry().validate()?;
        for kind in NUMERIC_PANELS {
            classifier.classify(kind, 0.0)?;
        }
        classifier.classify(MetricKind::SeverityTag, "")?;
        Ok(())
    }

    fn classify<'a>(&self, kind: MetricKind, value: impl Into<MetricValue<'a>>) -> Classification {
        self.classifier.classify(kind, value).unwrap_or_else(|err| {
            tracing::error!(error = %err, "classification failed after registry check");
            UNCLASSIFIED
        })
    }

    pub fn present(&self, snapshot: &AnalysisSnapshot) -> DashboardViewModel {
        DashboardViewModel {
            risk: self.scored_card("Credit Risk", &snapshot.risk, RISK_SCALE_MAX, MetricKind::Risk),
            investor: self.scored_card(
                "Investor Readiness",
                &snapshot.investor,
                PERCENT_SCALE_MAX,
                MetricKind::Investor,
            ),
            esg: EsgCard {
                score: ScoreCard {
                    title: "ESG",
                    value: snapshot.esg.score,
                    max: PERCENT_SCALE_MAX,
                    reported_category: non_empty(&snapshot.esg.category),
                    classification: self.classify(MetricKind::Esg, snapshot.esg.score),
                },
                breakdown: snapshot.esg.breakdown,
            },
            survival: ScoreCard {
                title: "Survival",
                value: snapshot.survival_score,
                max: PERCENT_SCALE_MAX,
                reported_category: None,
                classification: self.classify(MetricKind::Survival, snapshot.survival_score),
            },
            cashflow: CashflowCard {
                net_cash_flow: snapshot.cashflow.net_cash_flow,
                liquidity_status: snapshot.cashflow.liquidity_status.clone(),
                classification: self.classify(MetricKind::NetPosition, snapshot.cashflow.net_cash_flow),
            },
            working_capital: WorkingCapitalCard {
                working_capital: snapshot.working_capital.working_capital,
                status: snapshot.working_capital.status.clone(),
                classification: self.classify(
                    MetricKind::NetPosition,
                    snapshot.working_capital.working_capital,
                ),
            },
            compliance: ComplianceCard {
                score: ScoreCard {
                    title: "Compliance",
                    value: snapshot.compliance.compliance_score,
                    max: PERCENT_SCALE_MAX,
                    reported_category: None,
                    classification: self.classify(MetricKind::Compliance, snapshot.compliance.compliance_score),
                },
                issues: self.alert_panel(&snapshot.compliance.issues),
            },
            benchmarking: BenchmarkCard {
                industry: non_empty(&snapshot.industry),
                percentile: ScoreCard {
                    title: "Industry Percentile",
                    value: snapshot.benchmarking.industry_percentile,
                    max: PERCENT_SCALE_MAX,
                    reported_category: None,
                    classification: self.classify(
                        MetricKind::Benchmark,
                        snapshot.benchmarking.industry_percentile,
                    ),
                },
            },
            forecast_series: ForecastSeries {
                next_revenue: snapshot.forecast.next_revenue_forecast,
                next_expense: snapshot.forecast.next_expense_forecast,
                points: snapshot
                    .forecast
                    .revenue_forecast
                    .iter()
                    .map(|p| SeriesPoint {
                        x: p.period.clone(),
                        y: p.value,
                    })
                    .collect(),
            },
            product_recommendation: recommendation_view(&snapshot.product_recommendations),
            warnings: self.alert_panel(&snapshot.warnings),
            fraud_flags: self.alert_panel(&snapshot.fraud_flags),
            ai_summary: summary_view(&snapshot.ai_summary),
        }
    }

    fn alert_panel(&self, alerts: &[Alert]) -> AlertPanel {
        if alerts.is_empty() {
            return AlertPanel::AllClear {
                message: ALL_CLEAR_MESSAGE,
            };
        }
        AlertPanel::Alerts {
            items: alerts
                .iter()
                .map(|alert| AlertView {
                    title: alert.kind.clone(),
                    body: alert.message.clone(),
                    classification: self.classify(MetricKind::SeverityTag, alert.severity.as_tag()),
                })
                .collect(),
        }
    }

    fn scored_card(
        &self,
        title: &'static str,
        scored: &ScoredCategory,
        max: f64,
        kind: MetricKind,
    ) -> ScoreCard {
        ScoreCard {
            title,
            value: scored.score,
            max,
            reported_category: non_empty(&scored.category),
            classification: self.classify(kind, scored.score),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn recommendation_item(rec: &ProductRecommendation) -> RecommendationItem {
    RecommendationItem {
        product: rec.product.clone(),
        reason: rec.reason.clone(),
        fit: rec.fit.clone(),
    }
}

fn recommendation_view(recs: &ProductRecommendations) -> ProductRecommendationView {
    match recs {
        ProductRecommendations::Single { recommendation } => ProductRecommendationView::Single {
            item: recommendation_item(recommendation),
        },
        ProductRecommendations::List { items } if items.is_empty() => {
            ProductRecommendationView::Empty
        }
        ProductRecommendations::List { items } => ProductRecommendationView::List {
            items: items.iter().map(recommendation_item).collect(),
        },
    }
}

/// One line per non-blank narrative line, with list markers stripped.
fn summary_view(text: &str) -> SummaryView {
    SummaryView {
        lines: text
            .lines()
            .map(|line| {
                let line = line.trim();
                line.strip_prefix("- ")
                    .or_else(|| line.strip_prefix("* "))
                    .unwrap_or(line)
                    .trim()
                    .to_string()
            })
            .filter(|line| !line.is_empty())
            .collect(),
    }
}

/// What the results view should show for the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "camelCase")]
pub enum ResultsPage {
    /// No analysis has completed in this session.
    RedirectToUpload,
    Dashboard { dashboard: Box<DashboardViewModel> },
}

impl ResultsPage {
    pub fn load(store: &SnapshotStore, presenter: &ResultPresenter) -> Self {
        match store.latest() {
            Some(snapshot) => ResultsPage::Dashboard {
                dashboard: Box::new(presenter.present(&snapshot)),
            },
            None => ResultsPage::RedirectToUpload,
        }
    }
}
