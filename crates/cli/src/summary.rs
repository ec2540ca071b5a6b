use fhat_core::present::{
    AlertPanel, DashboardViewModel, ProductRecommendationView, RecommendationItem, ScoreCard,
};
use std::fmt::Write;

/// Plain-text rendering of a dashboard, one panel per block.
pub fn render(vm: &DashboardViewModel) -> String {
    let mut out = String::new();

    for card in [&vm.risk, &vm.investor, &vm.esg.score, &vm.survival] {
        score_line(&mut out, card);
    }
    if let Some(b) = &vm.esg.breakdown {
        let _ = writeln!(
            out,
            "  E {:.0} / S {:.0} / G {:.0}",
            b.environmental, b.social, b.governance
        );
    }
    score_line(&mut out, &vm.compliance.score);
    score_line(&mut out, &vm.benchmarking.percentile);
    if let Some(industry) = &vm.benchmarking.industry {
        let _ = writeln!(out, "  industry: {industry}");
    }

    let _ = writeln!(
        out,
        "Net cash flow: {:.2} [{}]",
        vm.cashflow.net_cash_flow, vm.cashflow.classification.label
    );
    let _ = writeln!(
        out,
        "Working capital: {:.2} [{}]",
        vm.working_capital.working_capital, vm.working_capital.classification.label
    );

    let forecast = &vm.forecast_series;
    if let Some(next) = forecast.next_revenue {
        let _ = writeln!(out, "Next revenue forecast: {next:.2}");
    }
    if let Some(next) = forecast.next_expense {
        let _ = writeln!(out, "Next expense forecast: {next:.2}");
    }
    for point in &forecast.points {
        let _ = writeln!(out, "  {}: {:.2}", point.x, point.y);
    }

    out.push_str("\nProducts\n");
    match &vm.product_recommendation {
        ProductRecommendationView::Single { item } => recommendation_line(&mut out, item),
        ProductRecommendationView::List { items } => {
            items.iter().for_each(|item| recommendation_line(&mut out, item))
        }
        ProductRecommendationView::Empty => out.push_str("  none\n"),
    }

    alert_block(&mut out, "Warnings", &vm.warnings);
    alert_block(&mut out, "Fraud flags", &vm.fraud_flags);
    alert_block(&mut out, "Compliance issues", &vm.compliance.issues);

    if !vm.ai_summary.lines.is_empty() {
        out.push_str("\nSummary\n");
        for line in &vm.ai_summary.lines {
            let _ = writeln!(out, "  {line}");
        }
    }
    out
}

fn score_line(out: &mut String, card: &ScoreCard) {
    let _ = write!(
        out,
        "{}: {:.0}/{:.0} [{}]",
        card.title, card.value, card.max, card.classification.label
    );
    if let Some(category) = &card.reported_category {
        let _ = write!(out, " ({category})");
    }
    out.push('\n');
}

fn recommendation_line(out: &mut String, item: &RecommendationItem) {
    let _ = write!(out, "  {}", item.product);
    if let Some(fit) = &item.fit {
        let _ = write!(out, " [{fit} fit]");
    }
    if !item.reason.is_empty() {
        let _ = write!(out, ": {}", item.reason);
    }
    out.push('\n');
}

fn alert_block(out: &mut String, heading: &str, panel: &AlertPanel) {
    let _ = writeln!(out, "\n{heading}");
    match panel {
        AlertPanel::AllClear { message } => {
            let _ = writeln!(out, "  {message}");
        }
        AlertPanel::Alerts { items } => {
            for alert in items {
                let _ = writeln!(
                    out,
                    "  [{}] {}: {}",
                    alert.classification.label, alert.title, alert.body
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhat_core::classify::Classifier;
    use fhat_core::domain::normalize;
    use fhat_core::present::ResultPresenter;
    use serde_json::json;

    fn render_raw(raw: serde_json::Value) -> String {
        let presenter = ResultPresenter::new(&Classifier::default()).unwrap();
        render(&presenter.present(&normalize(&raw)))
    }

    #[test]
    fn empty_panels_read_as_all_clear() {
        let text = render_raw(json!({"risk": {"score": 820, "category": "Low Risk"}}));

        assert!(text.contains("Credit Risk: 820/900 [Stable] (Low Risk)"));
        assert!(text.contains("Warnings\n  No issues detected"));
        assert!(text.contains("Fraud flags\n  No issues detected"));
        assert!(text.contains("Products\n  none"));
    }

    #[test]
    fn alerts_and_recommendations_are_listed() {
        let text = render_raw(json!({
            "warnings": [{"type": "Liquidity", "severity": "Critical", "message": "Cash reserves below 1 month"}],
            "productRecommendations": [{"name": "Working Capital Loan", "reason": "Seasonal gap"}],
        }));

        assert!(text.contains("Working Capital Loan: Seasonal gap"));
        assert!(text.contains(": Cash reserves below 1 month"));
        assert!(text.contains("Liquidity"));
    }
}
