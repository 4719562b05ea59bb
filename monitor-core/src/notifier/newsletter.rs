// notifier/newsletter.rs
// ====
// Daily newsletter: self-contained HTML from the latest analysis
// ====

use super::NotifyError;
use crate::collectors::CurveShape;
use chrono::{DateTime, Utc};
use monitor_common::analysis::{
    DominantFactor, FedAnalysis, MarketAnalysis, ReleaseAnalysis, RiskEnvironment, Severity,
};
use monitor_common::data::MarketSnapshot;
use std::fmt::Write;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 1000px; margin: 0 auto; padding: 20px; }
        .section { margin: 30px 0; padding: 20px; background-color: #fff; border-radius: 5px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        .highlight { background-color: #f8f9fa; padding: 15px; border-left: 4px solid #007bff; margin: 10px 0; }
        h1, h2, h3 { color: #2c3e50; }
        table { border-collapse: collapse; width: 100%; }
        td, th { padding: 4px 8px; border-bottom: 1px solid #eee; text-align: left; }
        .up { color: #1e8449; }
        .down { color: #c0392b; }
        .footer { margin-top: 30px; color: #666; font-size: 0.8em; text-align: center; }
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct Newsletter {
    pub subject: String,
    pub html: String,
    pub generated_at: DateTime<Utc>,
}

/// What goes into one issue. Insignificant releases and Fed items are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewsletterInput<'a> {
    pub analysis: Option<&'a MarketAnalysis>,
    pub snapshot: Option<&'a MarketSnapshot>,
    pub releases: &'a [ReleaseAnalysis],
    pub fed: &'a [FedAnalysis],
}

#[derive(Debug, Default)]
pub struct NewsletterComposer;

impl NewsletterComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn subject(now: DateTime<Utc>) -> String {
        format!("Market Monitor Daily Update - {}", now.format("%Y-%m-%d"))
    }

    pub fn compose(&self, input: NewsletterInput<'_>, now: DateTime<Utc>) -> Result<Newsletter, NotifyError> {
        let releases: Vec<&ReleaseAnalysis> =
            input.releases.iter().filter(|r| r.is_significant()).collect();
        let fed: Vec<&FedAnalysis> = input.fed.iter().filter(|f| f.is_significant()).collect();

        if input.analysis.is_none() && releases.is_empty() && fed.is_empty() {
            return Err(NotifyError::Empty("no analysis available".to_string()));
        }

        let mut body = String::new();
        writeln!(body, "<h1>{}</h1>", escape(&headline(input.analysis)))?;
        write_summary(&mut body, input.analysis, releases.len(), fed.len())?;

        if let Some(snapshot) = input.snapshot {
            write_market_moves(&mut body, snapshot)?;
        }
        if let Some(analysis) = input.analysis {
            write_regime(&mut body, analysis, input.snapshot)?;
            write_anomalies(&mut body, analysis)?;
            write_risk(&mut body, analysis)?;
        }
        if !releases.is_empty() {
            write_releases(&mut body, &releases)?;
        }
        if !fed.is_empty() {
            write_fed(&mut body, &fed)?;
        }
        write_takeaways(&mut body, input.analysis, &releases, &fed)?;

        Ok(Newsletter {
            subject: Self::subject(now),
            html: wrap(&body, now),
            generated_at: now,
        })
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn title_case(label: &str) -> String {
    label
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn headline(analysis: Option<&MarketAnalysis>) -> String {
    let Some(analysis) = analysis else {
        return "Macro Calendar Update".to_string();
    };
    let tone = match analysis.regime.risk_environment {
        RiskEnvironment::RiskOn => "Risk-On Tone",
        RiskEnvironment::RiskOff => "Risk-Off Tone",
        RiskEnvironment::Neutral => "Balanced Markets",
        RiskEnvironment::Unknown => "Market Update",
    };
    match analysis.high_severity().count() {
        0 => format!("{} with {} Volatility", tone, title_case(analysis.regime.volatility_regime.as_str())),
        n => format!("{} as {} High-Severity Moves Stand Out", tone, n),
    }
}

fn write_summary(
    out: &mut String,
    analysis: Option<&MarketAnalysis>,
    releases: usize,
    fed: usize,
) -> std::fmt::Result {
    writeln!(out, "<div class=\"highlight\"><strong>Executive summary.</strong> ")?;
    if let Some(a) = analysis {
        write!(
            out,
            "Risk environment is <strong>{}</strong>, volatility <strong>{}</strong>, liquidity <strong>{}</strong> \
             and correlation <strong>{}</strong>. {} anomalies flagged ({} high). ",
            a.regime.risk_environment,
            a.regime.volatility_regime,
            a.regime.liquidity_conditions,
            a.regime.correlation_regime,
            a.anomalies.len(),
            a.high_severity().count()
        )?;
    }
    writeln!(
        out,
        "{} significant economic releases and {} notable Fed communications.</div>",
        releases, fed
    )
}

fn write_market_moves(out: &mut String, snapshot: &MarketSnapshot) -> std::fmt::Result {
    writeln!(out, "<h2>Key Market Movements</h2>")?;
    writeln!(out, "<table><tr><th>Class</th><th>Asset</th><th>Last</th><th>Change</th></tr>")?;
    for (class, name, point) in snapshot.iter_assets() {
        let direction = if point.change_pct >= 0.0 { "up" } else { "down" };
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td class=\"{}\">{:+.2}%</td></tr>",
            class,
            escape(name),
            point.price,
            direction,
            point.change_pct
        )?;
    }
    writeln!(out, "</table>")
}

fn write_regime(
    out: &mut String,
    analysis: &MarketAnalysis,
    snapshot: Option<&MarketSnapshot>,
) -> std::fmt::Result {
    let regime = &analysis.regime;
    writeln!(out, "<h2>Market Regime Analysis</h2><ul>")?;
    writeln!(out, "<li>Risk environment: {}</li>", title_case(regime.risk_environment.as_str()))?;
    writeln!(out, "<li>Volatility regime: {}</li>", title_case(regime.volatility_regime.as_str()))?;
    writeln!(out, "<li>Liquidity conditions: {}</li>", title_case(regime.liquidity_conditions.as_str()))?;
    writeln!(out, "<li>Correlation regime: {}</li>", title_case(regime.correlation_regime.as_str()))?;

    let curve = snapshot
        .and_then(|s| s.bonds.as_ref())
        .and_then(|b| b.spreads.get("2s10s"));
    if let Some(twos_tens) = curve {
        writeln!(
            out,
            "<li>Yield curve: {} (2s10s {:+.2})</li>",
            title_case(CurveShape::from_spread(*twos_tens).as_str()),
            twos_tens
        )?;
    }
    writeln!(out, "</ul>")?;

    writeln!(out, "<h3>Dominant factors</h3><ul>")?;
    for factor in &regime.dominant_factors {
        writeln!(out, "<li>{}</li>", escape(factor.description()))?;
    }
    writeln!(out, "</ul>")?;

    if !regime.degradations.is_empty() {
        writeln!(out, "<p><em>Partial read:</em></p><ul>")?;
        for d in &regime.degradations {
            writeln!(out, "<li>{}: {}</li>", escape(&d.component), escape(&d.reason.to_string()))?;
        }
        writeln!(out, "</ul>")?;
    }
    Ok(())
}

fn write_anomalies(out: &mut String, analysis: &MarketAnalysis) -> std::fmt::Result {
    if analysis.anomalies.is_empty() {
        return Ok(());
    }
    writeln!(out, "<h2>Anomalies</h2>")?;
    for severity in [Severity::High, Severity::Medium] {
        let matching: Vec<_> = analysis
            .anomalies
            .iter()
            .filter(|a| a.severity == severity)
            .collect();
        if matching.is_empty() {
            continue;
        }
        writeln!(out, "<h3>{} severity</h3><ul>", title_case(severity.as_str()))?;
        for anomaly in matching {
            writeln!(out, "<li>{}</li>", escape(&anomaly.describe()))?;
        }
        writeln!(out, "</ul>")?;
    }
    Ok(())
}

fn write_risk(out: &mut String, analysis: &MarketAnalysis) -> std::fmt::Result {
    let risk = &analysis.risk_metrics;
    let leading = &analysis.leading_indicators;
    let optional = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));

    writeln!(out, "<h2>Risk Metrics</h2><table>")?;
    writeln!(out, "<tr><td>VIX percentile</td><td>{:.0}%</td></tr>", risk.volatility_percentile * 100.0)?;
    writeln!(out, "<tr><td>Cross-asset correlation</td><td>{:.2}</td></tr>", risk.cross_asset_correlation)?;
    writeln!(out, "<tr><td>Risk dispersion</td><td>{:.2}</td></tr>", risk.risk_dispersion)?;
    writeln!(out, "<tr><td>Tail risk (5th pct return)</td><td>{:.2}%</td></tr>", risk.tail_risk * 100.0)?;
    writeln!(out, "<tr><td>Rate volatility</td><td>{}</td></tr>", optional(risk.rate_volatility))?;
    writeln!(out, "<tr><td>Currency volatility</td><td>{}</td></tr>", optional(risk.currency_volatility))?;
    writeln!(out, "<tr><td>HY credit spread</td><td>{}</td></tr>", optional(leading.credit_spreads.high_yield))?;
    writeln!(out, "<tr><td>Sentiment (0 fearful, 1 calm)</td><td>{:.2}</td></tr>", leading.sentiment)?;
    writeln!(out, "</table>")
}

fn write_releases(out: &mut String, releases: &[&ReleaseAnalysis]) -> std::fmt::Result {
    writeln!(out, "<h2>Economic Impact</h2>")?;
    writeln!(
        out,
        "<table><tr><th>Release</th><th>Period</th><th>Actual</th><th>Previous</th><th>Expected</th><th>Impact</th><th>Trend</th></tr>"
    )?;
    for r in releases {
        let or_na = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{}", v));
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&r.name),
            r.observation_date.format("%Y-%m"),
            r.value,
            or_na(r.previous),
            or_na(r.expected),
            r.impact.as_str(),
            title_case(r.trend.as_str())
        )?;
    }
    writeln!(out, "</table>")
}

fn write_fed(out: &mut String, fed: &[&FedAnalysis]) -> std::fmt::Result {
    writeln!(out, "<h2>Fed Implications</h2><ul>")?;
    for f in fed {
        let themes: Vec<&str> = f.themes.iter().map(|t| t.as_str()).collect();
        writeln!(
            out,
            "<li><strong>{}</strong>: <a href=\"{}\">{}</a> ({}, score {:+.2}, {}){}</li>",
            escape(&f.speaker),
            escape(&f.url),
            escape(&f.title),
            f.policy_bias.as_str(),
            f.hawkish_score,
            f.shift.as_str(),
            if themes.is_empty() {
                String::new()
            } else {
                format!(" Key themes: {}", escape(&themes.join(", ")))
            }
        )?;
    }
    writeln!(out, "</ul>")
}

fn write_takeaways(
    out: &mut String,
    analysis: Option<&MarketAnalysis>,
    releases: &[&ReleaseAnalysis],
    fed: &[&FedAnalysis],
) -> std::fmt::Result {
    writeln!(out, "<h2>Key Takeaways</h2><ul>")?;
    if let Some(a) = analysis {
        let factors: Vec<&DominantFactor> = a
            .regime
            .dominant_factors
            .iter()
            .filter(|f| **f != DominantFactor::NoDominantFactor)
            .collect();
        if factors.is_empty() {
            writeln!(out, "<li>No single macro driver stands out.</li>")?;
        } else {
            for f in factors {
                writeln!(out, "<li>{}.</li>", escape(f.description()))?;
            }
        }
        if let Some(top) = a.high_severity().next() {
            writeln!(out, "<li>Watch: {}.</li>", escape(&top.describe()))?;
        }
    }
    for r in releases {
        writeln!(out, "<li>{} came in at {} ({}).</li>", escape(&r.name), r.value, r.impact.as_str())?;
    }
    if let Some(f) = fed.first() {
        writeln!(out, "<li>Fed tone led by {}: {}.</li>", escape(&f.speaker), f.policy_bias.as_str())?;
    }
    writeln!(out, "</ul>")
}

fn wrap(body: &str, now: DateTime<Utc>) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>{}</style>\n</head>\n<body>\n\
         <div class=\"section\">\n{}</div>\n\
         <div class=\"footer\"><p>Generated by Market Monitor at {}</p></div>\n</body>\n</html>\n",
        STYLE,
        body,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}
