//! Conversion of the raw `/analyze` payload into an [`AnalysisSnapshot`].
//!
//! This is the only place externally sourced data is read. It never fails:
//! missing sections default, non-numeric scores become `0`, non-array
//! collections become empty. Both the camelCase names used by the dashboard
//! and the snake_case names the service actually sends are accepted.

use crate::domain::snapshot::{
    Alert, AlertSeverity, AnalysisSnapshot, Benchmarking, Cashflow, Compliance, EsgBreakdown,
    EsgScore, Forecast, ForecastPoint, ProductRecommendation, ProductRecommendations,
    ScoredCategory, WorkingCapital,
};
use serde_json::Value;

const PERCENTILE_FALLBACK_KEYS: [&str; 3] = [
    "gross_margin_percentile",
    "debt_ratio_percentile",
    "working_capital_percentile",
];

pub fn normalize(raw: &Value) -> AnalysisSnapshot {
    let snapshot = AnalysisSnapshot {
        industry: text(field(raw, &["industry"])),
        risk: scored(field(raw, &["risk"]), &["score", "risk_score"]),
        investor: scored(field(raw, &["investor"]), &["score", "investor_score"]),
        esg: esg(field(raw, &["esg"])),
        survival_score: number(field(raw, &["survivalScore", "survival_score"])),
        cashflow: cashflow(field(raw, &["cashflow", "cashFlow", "cash_flow"])),
        working_capital: working_capital(field(raw, &["workingCapital", "working_capital"])),
        compliance: compliance(field(raw, &["compliance"])),
        benchmarking: benchmarking(field(raw, &["benchmarking"])),
        forecast: forecast(field(raw, &["forecast"])),
        product_recommendations: product_recommendations(field(
            raw,
            &["productRecommendations", "product_recommendations"],
        )),
        warnings: alerts(field(raw, &["warnings"])),
        fraud_flags: alerts(field(raw, &["fraudFlags", "fraud_flags"])),
        ai_summary: text(field(raw, &["aiSummary", "ai_summary"])),
    };

    tracing::debug!(
        risk_score = snapshot.risk.score,
        warnings = snapshot.warnings.len(),
        fraud_flags = snapshot.fraud_flags.len(),
        "normalized analysis payload"
    );
    snapshot
}

/// First non-null value under any of `keys`.
fn field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = obj.as_object()?;
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !v.is_null())
}

fn opt_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn number(value: Option<&Value>) -> f64 {
    opt_number(value).unwrap_or(0.0)
}

fn opt_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> String {
    opt_text(value).unwrap_or_default()
}

fn array(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn scored(section: Option<&Value>, score_keys: &[&str]) -> ScoredCategory {
    let Some(section) = section else {
        return ScoredCategory::default();
    };
    ScoredCategory {
        score: number(field(section, score_keys)),
        category: text(field(section, &["category"])),
    }
}

fn esg(section: Option<&Value>) -> EsgScore {
    let Some(section) = section else {
        return EsgScore::default();
    };
    let breakdown = field(section, &["breakdown"])
        .filter(|b| b.is_object())
        .map(|b| EsgBreakdown {
            environmental: number(field(b, &["environmental"])),
            social: number(field(b, &["social"])),
            governance: number(field(b, &["governance"])),
        });
    EsgScore {
        score: number(field(section, &["score", "esg_score"])),
        category: text(field(section, &["category"])),
        breakdown,
    }
}

fn cashflow(section: Option<&Value>) -> Cashflow {
    let Some(section) = section else {
        return Cashflow::default();
    };
    Cashflow {
        net_cash_flow: number(field(section, &["netCashFlow", "net_cash_flow"])),
        liquidity_status: opt_text(field(section, &["liquidityStatus", "liquidity_status"])),
    }
}

fn working_capital(section: Option<&Value>) -> WorkingCapital {
    let Some(section) = section else {
        return WorkingCapital::default();
    };
    WorkingCapital {
        working_capital: number(field(section, &["workingCapital", "working_capital"])),
        status: opt_text(field(section, &["status"])),
    }
}

fn compliance(section: Option<&Value>) -> Compliance {
    let Some(section) = section else {
        return Compliance::default();
    };
    Compliance {
        compliance_score: number(field(section, &["complianceScore", "compliance_score"])),
        issues: alerts(field(section, &["issues"])),
    }
}

fn benchmarking(section: Option<&Value>) -> Benchmarking {
    let Some(section) = section else {
        return Benchmarking::default();
    };
    if let Some(p) = opt_number(field(section, &["industryPercentile", "industry_percentile"])) {
        return Benchmarking {
            industry_percentile: p,
        };
    }

    // The service reports per-metric percentiles; average whichever are present.
    let parts: Vec<f64> = PERCENTILE_FALLBACK_KEYS
        .iter()
        .filter_map(|key| opt_number(field(section, &[*key])))
        .collect();
    // Scale before summing so huge finite inputs cannot overflow to infinity.
    let n = parts.len() as f64;
    let industry_percentile = parts.iter().map(|p| p / n).sum::<f64>();
    Benchmarking {
        industry_percentile,
    }
}

fn forecast(section: Option<&Value>) -> Forecast {
    let Some(section) = section else {
        return Forecast::default();
    };
    Forecast {
        next_revenue_forecast: opt_number(field(
            section,
            &["nextRevenueForecast", "next_revenue_forecast"],
        )),
        next_expense_forecast: opt_number(field(
            section,
            &["nextExpenseForecast", "next_expense_forecast"],
        )),
        revenue_forecast: forecast_points(field(section, &["revenueForecast", "revenue_forecast"])),
    }
}

/// Accepts `{future: [{period, value}]}` or a bare list of numbers.
fn forecast_points(value: Option<&Value>) -> Vec<ForecastPoint> {
    let points = match value {
        Some(Value::Array(_)) => array(value),
        Some(series @ Value::Object(_)) => array(field(series, &["future"])),
        _ => &[],
    };

    points
        .iter()
        .enumerate()
        .filter_map(|(idx, point)| match point {
            Value::Object(_) => Some(ForecastPoint {
                period: opt_text(field(point, &["period", "date", "label"]))
                    .unwrap_or_else(|| synthetic_period(idx)),
                value: number(field(point, &["value"])),
            }),
            Value::Number(_) | Value::String(_) => Some(ForecastPoint {
                period: synthetic_period(idx),
                value: number(Some(point)),
            }),
            _ => None,
        })
        .collect()
}

fn synthetic_period(idx: usize) -> String {
    format!("M+{}", idx + 1)
}

fn product_recommendations(value: Option<&Value>) -> ProductRecommendations {
    match value {
        Some(Value::Array(items)) => ProductRecommendations::List {
            items: items.iter().filter_map(recommendation).collect(),
        },
        Some(obj @ Value::Object(_)) => {
            if let Some(Value::Array(items)) = field(obj, &["suggested_products", "suggestedProducts"]) {
                ProductRecommendations::List {
                    items: items.iter().filter_map(recommendation).collect(),
                }
            } else if let Some(single) = recommendation(obj) {
                ProductRecommendations::Single {
                    recommendation: single,
                }
            } else {
                ProductRecommendations::default()
            }
        }
        _ => ProductRecommendations::default(),
    }
}

fn recommendation(value: &Value) -> Option<ProductRecommendation> {
    let product = opt_text(field(value, &["recommendedProduct", "name", "product"]))?;
    Some(ProductRecommendation {
        product,
        reason: text(field(value, &["reason", "rationale"])),
        fit: opt_text(field(value, &["fit"])),
    })
}

fn alerts(value: Option<&Value>) -> Vec<Alert> {
    array(value)
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| {
            let raw_severity = text(field(entry, &["severity"]));
            let severity = AlertSeverity::parse(&raw_severity);
            if severity == AlertSeverity::Unrecognized {
                tracing::debug!(severity = %raw_severity, "unrecognized alert severity");
            }
            Alert {
                kind: text(field(entry, &["type", "issue_type", "flag_type"])),
                severity,
                message: text(field(entry, &["message", "description"])),
            }
        })
        .collect()
}
