//! Report rendering.
//!
//! Turns a merged view plus its classification into a Markdown report, a JSON
//! document, or a short terminal summary.

use crate::analysis::classifier::Classification;
use crate::models::{FetchStatus, MergedView, Variant};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Width of the longest activity-hour bar.
const HISTOGRAM_WIDTH: usize = 30;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(view: &MergedView, classification: &Classification) -> String {
    let mut output = String::new();

    output.push_str(&format!("# DevPulse Report: {}\n\n", view.username));
    output.push_str(&generate_metadata_section(view));
    output.push_str(&generate_wellbeing_section(view, classification));
    output.push_str(&generate_metrics_section(view, classification));
    output.push_str(&generate_patterns_section(view));
    output.push_str(&generate_activity_section(view));
    output.push_str(&generate_recommendations_section(view));
    output.push_str(&generate_trends_section(view));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(view: &MergedView) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str(&format!("- **User:** `{}`\n", view.username));
    section.push_str(&format!("- **Analysis Date:** {}\n", view.analysis_date));
    section.push_str(&format!("- **Total Commits:** {}\n", view.total_commits));
    section.push_str(&format!(
        "- **Repositories:** {}\n",
        view.total_repositories
    ));
    section.push_str(&format!(
        "- **Commits per Repository:** {:.1}\n",
        view.average_commits_per_repo
    ));
    if view.sources.report != FetchStatus::Loaded {
        section.push_str(&format!(
            "- *Usage report {}; totals shown as defaults.*\n",
            source_note(view.sources.report)
        ));
    }
    section.push('\n');

    section
}

fn generate_wellbeing_section(view: &MergedView, classification: &Classification) -> String {
    let mut section = String::new();
    let wellbeing = classification.wellbeing;

    section.push_str("## Well-being\n\n");
    section.push_str(&format!(
        "{} **{}** ({:.1}/10)\n\n",
        wellbeing.variant.emoji(),
        wellbeing.label,
        view.recommendation_score
    ));
    section.push_str(&format!("> {}\n\n", view.advice));
    section.push_str(&format!("- **Trend:** {}\n", view.trend));
    section.push_str(&format!(
        "- **Work-life Balance:** {:.1}\n",
        view.work_life_balance
    ));
    section.push_str(&format!(
        "- **Productivity Score:** {:.1}\n",
        view.productivity_score
    ));
    section.push_str(&format!(
        "- **Project Diversity:** {:.1}\n",
        view.project_diversity
    ));
    if !view.suspect_words.is_empty() {
        section.push_str(&format!(
            "- **Stress Words in Commits:** {}\n",
            view.suspect_words.join(", ")
        ));
    }
    section.push('\n');

    section
}

fn generate_metrics_section(view: &MergedView, classification: &Classification) -> String {
    let rows: [(&str, String, Variant); 5] = [
        (
            "Commits per Day",
            format!("{:.1}", view.average_commits_per_day),
            classification.commit_volume,
        ),
        (
            "Consecutive Days",
            view.consecutive_days.to_string(),
            classification.streak,
        ),
        (
            "Late-night Commits",
            view.late_night_commits.to_string(),
            classification.late_night,
        ),
        (
            "Weekend Commits",
            format!("{:.1}%", view.weekend_commit_ratio),
            classification.weekend,
        ),
        (
            "Idle Days",
            view.idle_days.to_string(),
            classification.idle,
        ),
    ];

    let mut section = String::new();
    section.push_str("## Metrics\n\n");
    section.push_str("| Metric | Value | Status |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for (name, value, variant) in rows {
        section.push_str(&format!(
            "| {} | {} | {} {} |\n",
            name,
            value,
            variant.emoji(),
            variant
        ));
    }
    section.push('\n');

    section
}

fn generate_patterns_section(view: &MergedView) -> String {
    let patterns = &view.commit_patterns;
    let frequency = &view.commit_frequency;
    let mut section = String::new();

    section.push_str("## Commit Patterns\n\n");
    section.push_str("| Morning | Afternoon | Evening | Night |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.1}% | {:.1}% | {:.1}% | {:.1}% |\n\n",
        patterns.morning, patterns.afternoon, patterns.evening, patterns.night
    ));

    section.push_str("| Daily | Weekly | Monthly |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.1} | {:.1} | {:.1} |\n\n",
        frequency.daily, frequency.weekly, frequency.monthly
    ));

    section
}

fn generate_activity_section(view: &MergedView) -> String {
    if view.activity_hours.is_empty() {
        return String::new();
    }

    let max = view.activity_hours.values().copied().max().unwrap_or(0);
    let mut section = String::new();

    section.push_str("## Activity by Hour\n\n```\n");
    for (hour, count) in &view.activity_hours {
        section.push_str(&format!(
            "{:>5} | {} {}\n",
            hour,
            activity_bar(*count, max),
            count
        ));
    }
    section.push_str("```\n\n");

    section
}

/// Bar scaled so the busiest hour spans the full width.
fn activity_bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count as f64 / max as f64 * HISTOGRAM_WIDTH as f64).round() as usize;
    "█".repeat(width)
}

fn generate_recommendations_section(view: &MergedView) -> String {
    let mut section = String::new();
    section.push_str("## Recommendations\n\n");

    if view.sources.recommendations != FetchStatus::Loaded {
        section.push_str(&format!(
            "*Recommendations {}.*\n\n",
            source_note(view.sources.recommendations)
        ));
        return section;
    }

    let recommendations = &view.recommendations;
    section.push_str(&format!(
        "*Health level: {:?} | Score: {:.1}*\n\n",
        recommendations.health_level, recommendations.score
    ));
    if recommendations.items.is_empty() {
        section.push_str("No recommendations at this time.\n\n");
        return section;
    }
    for (i, item) in recommendations.items.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, item));
    }
    section.push('\n');

    section
}

fn generate_trends_section(view: &MergedView) -> String {
    let mut section = String::new();
    section.push_str("## Trends\n\n");

    if view.sources.trends != FetchStatus::Loaded {
        section.push_str(&format!("*Trends {}.*\n\n", source_note(view.sources.trends)));
        return section;
    }

    let trends = &view.trends;
    section.push_str(&format!("- **Activity Level:** {:?}\n", trends.activity_level));
    section.push_str(&format!("- **Weekly:** {}\n", join_series(&trends.weekly)));
    section.push_str(&format!("- **Monthly:** {}\n\n", join_series(&trends.monthly)));

    section
}

fn join_series(values: &[f64]) -> String {
    if values.is_empty() {
        return "-".to_string();
    }
    values
        .iter()
        .map(|v| format!("{:.1}", v))
        .collect::<Vec<_>>()
        .join(" → ")
}

fn source_note(status: FetchStatus) -> &'static str {
    match status {
        FetchStatus::Loading => "still loading",
        FetchStatus::Errored => "unavailable",
        FetchStatus::Loaded => "loaded",
    }
}

fn generate_footer() -> String {
    "---\n\n*Report generated by DevPulse*\n".to_string()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    view: &'a MergedView,
    classification: &'a Classification,
}

/// Generate a JSON report.
pub fn generate_json_report(view: &MergedView, classification: &Classification) -> Result<String> {
    let report = JsonReport {
        generated_at: Utc::now(),
        view,
        classification,
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// Short multi-line summary for the terminal.
pub fn terminal_summary(view: &MergedView, classification: &Classification) -> String {
    let wellbeing = classification.wellbeing;
    let mut lines = vec![
        format!(
            "   {} Well-being: {} ({:.1}/10), trend {}",
            wellbeing.variant.emoji(),
            wellbeing.label,
            view.recommendation_score,
            view.trend
        ),
        format!(
            "   {} Commits/day: {:.1} | {} Streak: {} days",
            classification.commit_volume.emoji(),
            view.average_commits_per_day,
            classification.streak.emoji(),
            view.consecutive_days
        ),
        format!(
            "   {} Late-night: {} | {} Weekend: {:.1}% | {} Idle: {} days",
            classification.late_night.emoji(),
            view.late_night_commits,
            classification.weekend.emoji(),
            view.weekend_commit_ratio,
            classification.idle.emoji(),
            view.idle_days
        ),
        format!(
            "   Total commits: {} across {} repositories",
            view.total_commits, view.total_repositories
        ),
    ];
    lines.push(format!("   💡 {}", view.advice));
    lines.join("\n")
}
