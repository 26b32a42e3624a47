//! Vertical card display for assessments, cumulative scores and convergence.
//!
//! Each card is a header followed by labelled sections; sections with no
//! rows are skipped.

use std::fmt::Display;

use arrow::record_batch::RecordBatch;
use govwatch_ai::EnhancedAssessment;
use govwatch_core::convergence::InfrastructureAssessment;
use govwatch_core::{CumulativeScores, DocumentClass, RuleSet, Tier};

const MAX_LIST_ITEMS: usize = 10;

type Rows = Vec<(String, String)>;

fn row(rows: &mut Rows, label: &str, value: impl Display) {
    rows.push((label.to_string(), value.to_string()));
}

fn print_section(header: &str, rows: &Rows) {
    if rows.is_empty() {
        return;
    }
    println!("{header}");
    for (label, value) in rows {
        println!("  {:<26} {}", label, value);
    }
    println!();
}

fn print_list(header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{header}");
    for item in items.iter().take(MAX_LIST_ITEMS) {
        println!("  - {item}");
    }
    if items.len() > MAX_LIST_ITEMS {
        println!("  ... and {} more", items.len() - MAX_LIST_ITEMS);
    }
    println!();
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

// ── Public API ──

pub fn print_assessment_card(a: &EnhancedAssessment) {
    println!("=== {} : {} ===", a.category, a.final_status);
    println!("{}", a.keyword.reason);
    println!();

    let mut status = Rows::new();
    row(&mut status, "keyword_status", a.keyword.status);
    if let Some(ai) = &a.ai {
        row(&mut status, "ai_status", format!("{} ({:.2}, {})", ai.status, ai.confidence, ai.provider));
    }
    row(&mut status, "final_status", a.final_status);
    if let Some(r) = &a.reconciliation {
        row(&mut status, "reconciliation", r.outcome);
        row(&mut status, "flagged_for_review", yes_no(r.flagged_for_review));
        row(&mut status, "reconcile_reason", &r.reason);
    }
    print_section("Status", &status);

    let f = &a.coverage;
    let mut confidence = Rows::new();
    row(&mut confidence, "confidence", format!("{:.2}", a.confidence));
    row(&mut confidence, "source_diversity", format!("{:.2}", f.source_diversity));
    row(&mut confidence, "authority", format!("{:.2}", f.authority));
    row(&mut confidence, "evidence_coverage", format!("{:.2}", f.evidence_coverage));
    row(&mut confidence, "keyword_density", format!("{:.2}", f.keyword_density));
    row(&mut confidence, "ai_agreement", format!("{:.2}", f.ai_agreement));
    print_section("Data Coverage", &confidence);

    if let Some(d) = &a.keyword.detail {
        let mut detail = Rows::new();
        if let Some(tier) = d.dominant_tier {
            row(&mut detail, "dominant_tier", tier);
        }
        row(
            &mut detail,
            "counts (c/d/w)",
            format!("{}/{}/{}", d.counts.capture, d.counts.drift, d.counts.warning),
        );
        row(&mut detail, "suppressed", d.suppressed);
        row(&mut detail, "items_scanned", d.items_scanned);
        row(&mut detail, "authority_weight", d.authority_weight);
        row(&mut detail, "pattern_multiplier", d.pattern_multiplier);
        row(&mut detail, "severity", format!("{:.2}", d.severity));
        print_section("Keyword Detail", &detail);
    }

    let texts = |ev: &[govwatch_ai::Evidence]| -> Vec<String> {
        ev.iter().map(|e| format!("[{:?}] {}", e.origin, e.text)).collect()
    };
    print_list("Evidence For", &texts(&a.evidence_for));
    print_list("Evidence Against", &texts(&a.evidence_against));
    print_list("How We Could Be Wrong", &a.counter_evidence);

    if let Some(anomalies) = &a.trend_anomalies {
        let lines: Vec<String> = anomalies
            .iter()
            .map(|t| format!("{} score {:.2} (z {:+.2})", t.week_of, t.score, t.z_score))
            .collect();
        print_list("Trend Anomalies", &lines);
    }
}

pub fn print_cumulative_card(c: &CumulativeScores) {
    println!("=== {} ===", c.category);
    let mut rows = Rows::new();
    if let Some(week) = c.as_of_week {
        row(&mut rows, "as_of_week", week);
    }
    row(&mut rows, "week_count", c.week_count);
    row(&mut rows, "running_sum", format!("{:.2}", c.running_sum));
    row(&mut rows, "running_average", format!("{:.2}", c.running_average));
    row(&mut rows, "current_week_score", format!("{:.2}", c.current_week_score));
    match c.high_water_week {
        Some(week) => row(&mut rows, "high_water_mark", format!("{:.2} ({week})", c.high_water_mark)),
        None => row(&mut rows, "high_water_mark", "-"),
    }
    row(
        &mut rows,
        "decay_weighted_score",
        format!("{:.2} (half-life {} wk)", c.decay_weighted_score, c.half_life_weeks),
    );
    print_section("Cumulative", &rows);
}

pub fn print_convergence_card(a: &InfrastructureAssessment) {
    println!("=== convergence : {} ===", a.level);
    let mut summary = Rows::new();
    row(&mut summary, "active_themes", a.active_theme_count);
    row(&mut summary, "convergence_score", format!("{:.2}", a.convergence_score));
    row(&mut summary, "assessed_at", a.assessed_at.format("%Y-%m-%d %H:%M:%S UTC"));
    print_section("Summary", &summary);

    for theme in &a.themes {
        let mut rows = Rows::new();
        row(&mut rows, "active", yes_no(theme.active));
        row(&mut rows, "intensity", format!("{} (threshold {})", theme.match_count, theme.threshold));
        if !theme.categories_involved.is_empty() {
            row(&mut rows, "categories", theme.categories_involved.join(", "));
        }
        if theme.suppressed > 0 {
            row(&mut rows, "suppressed", theme.suppressed);
        }
        print_section(&format!("{} ({})", theme.label, theme.theme_id), &rows);
        let matches: Vec<String> = theme
            .matches
            .iter()
            .map(|m| format!("{} [{}]", m.keyword, m.category))
            .collect();
        print_list("  Matches", &matches);
    }
}

pub fn print_classifications(rows: &[(String, DocumentClass)]) {
    for (title, class) in rows {
        println!("  {:<26} {}", class.as_str(), title);
    }
}

pub fn print_rules_summary(rules: &RuleSet, only: Option<&str>) {
    let config = rules.config();
    println!("=== rules v{} ===", config.version);
    println!();

    for (key, category) in &config.categories {
        if only.is_some_and(|o| o != key) {
            continue;
        }
        let mut rows = Rows::new();
        if let Some(label) = &category.label {
            row(&mut rows, "label", label);
        }
        for tier in Tier::DESCENDING {
            let keywords = category.keywords.for_tier(tier);
            if only.is_some() {
                row(&mut rows, tier.as_str(), keywords.join(", "));
            } else {
                row(&mut rows, tier.as_str(), format!("{} keywords", keywords.len()));
            }
        }
        row(&mut rows, "suppression_rules", category.suppression.len());
        let v = category.volume_thresholds;
        row(
            &mut rows,
            "thresholds (c/d/w)",
            format!("{}/{}/{}", v.capture, v.drift, v.warning_escalation),
        );
        if let Some(outage) = &category.site_outage {
            row(&mut rows, "site_outage", format!("{} -> {}", outage.source, outage.status));
        }
        print_section(key, &rows);
    }

    if only.is_none() {
        let mut rows = Rows::new();
        for theme in rules.themes() {
            row(
                &mut rows,
                &theme.id,
                format!("{} keywords, threshold {}", theme.keywords.len(), theme.threshold),
            );
        }
        row(
            &mut rows,
            "entrenchment_threshold",
            config.convergence.entrenchment_threshold,
        );
        print_section("Convergence Themes", &rows);
        print_list("Negation Patterns", &config.negation_patterns);
    }
}

/// Print batches as an ASCII table.
pub fn print_batches(batches: &[RecordBatch]) -> anyhow::Result<()> {
    arrow::util::pretty::print_batches(batches)?;
    Ok(())
}
