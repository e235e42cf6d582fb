//! Default substitution and view-state derivation.
//!
//! This is the only place wire optionals are resolved. Everything built here
//! carries concrete values, so nothing downstream needs a fallback.

use crate::error::ApiError;
use crate::models::{
    AnalysisResult, CommitFrequency, CommitPatterns, FetchStatus, MergedView,
    RecommendationReport, Recommendations, SourceStatus, TrendReport, TrendSeries, UsageReport,
};
use serde::Serialize;

/// Placeholder for a missing trend label.
pub const DEFAULT_TREND: &str = "indeterminate";

/// Placeholder for missing advice text.
pub const DEFAULT_ADVICE: &str = "Analysis in progress...";

/// Placeholder for a missing report timestamp.
pub const DEFAULT_ANALYSIS_DATE: &str = "not available";

/// Lifecycle of a single fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchSlot<T> {
    Pending,
    Success(T),
    Failure(ApiError),
}

impl<T> Default for FetchSlot<T> {
    fn default() -> Self {
        FetchSlot::Pending
    }
}

impl<T> From<Result<T, ApiError>> for FetchSlot<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => FetchSlot::Success(value),
            Err(error) => FetchSlot::Failure(error),
        }
    }
}

impl<T> FetchSlot<T> {
    pub fn status(&self) -> FetchStatus {
        match self {
            FetchSlot::Pending => FetchStatus::Loading,
            FetchSlot::Success(_) => FetchStatus::Loaded,
            FetchSlot::Failure(_) => FetchStatus::Errored,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FetchSlot::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Raw outcome of every fetch of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSlots {
    pub analysis: FetchSlot<AnalysisResult>,
    pub report: FetchSlot<UsageReport>,
    pub recommendations: FetchSlot<RecommendationReport>,
    pub trends: FetchSlot<TrendReport>,
}

impl FetchSlots {
    pub fn sources(&self) -> SourceStatus {
        SourceStatus {
            analysis: self.analysis.status(),
            report: self.report.status(),
            recommendations: self.recommendations.status(),
            trends: self.trends.status(),
        }
    }
}

/// Overall status of the active query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// What the aggregator publishes for the active query.
///
/// A `MergedView` only exists once the analysis fetch has succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading { username: String },
    Ready(MergedView),
    Error { username: String, error: ApiError },
}

impl ViewState {
    pub fn status(&self) -> ViewStatus {
        match self {
            ViewState::Idle => ViewStatus::Idle,
            ViewState::Loading { .. } => ViewStatus::Loading,
            ViewState::Ready(_) => ViewStatus::Ready,
            ViewState::Error { .. } => ViewStatus::Error,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            ViewState::Idle => None,
            ViewState::Loading { username } | ViewState::Error { username, .. } => {
                Some(username.as_str())
            }
            ViewState::Ready(view) => Some(view.username.as_str()),
        }
    }

    pub fn view(&self) -> Option<&MergedView> {
        match self {
            ViewState::Ready(view) => Some(view),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ViewState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The primary fetch has settled either way.
    pub fn is_settled(&self) -> bool {
        matches!(self, ViewState::Ready(_) | ViewState::Error { .. })
    }

    /// Nothing more will change for this query.
    pub fn is_complete(&self) -> bool {
        match self {
            ViewState::Ready(view) => view.sources.all_settled(),
            ViewState::Error { .. } => true,
            _ => false,
        }
    }
}

/// Derive the published state from the current slots.
pub fn merge(username: &str, slots: &FetchSlots) -> ViewState {
    match &slots.analysis {
        FetchSlot::Pending => ViewState::Loading {
            username: username.to_string(),
        },
        FetchSlot::Failure(error) => ViewState::Error {
            username: username.to_string(),
            error: error.clone(),
        },
        FetchSlot::Success(analysis) => ViewState::Ready(merge_view(username, analysis, slots)),
    }
}

/// Build the fully-defaulted view from a successful analysis and whatever the
/// secondary fetches produced so far.
pub fn merge_view(username: &str, analysis: &AnalysisResult, slots: &FetchSlots) -> MergedView {
    let report = slots.report.value();

    MergedView {
        username: username.to_string(),

        average_commits_per_day: analysis.average_commits_per_day.unwrap_or(0.0),
        late_night_commits: analysis.late_night_commits.unwrap_or(0),
        weekend_commit_ratio: analysis.weekend_commit_ratio.unwrap_or(0.0),
        consecutive_days: analysis.consecutive_days.unwrap_or(0),
        idle_days: analysis.idle_days.unwrap_or(0),
        suspect_words: analysis.suspect_words.clone().unwrap_or_default(),
        trend: analysis
            .trend
            .clone()
            .unwrap_or_else(|| DEFAULT_TREND.to_string()),
        recommendation_score: analysis.recommendation_score.unwrap_or(0.0),
        advice: analysis
            .advice
            .clone()
            .unwrap_or_else(|| DEFAULT_ADVICE.to_string()),
        commit_frequency: analysis
            .commit_frequency
            .as_ref()
            .map(|f| CommitFrequency {
                daily: f.daily.unwrap_or(0.0),
                weekly: f.weekly.unwrap_or(0.0),
                monthly: f.monthly.unwrap_or(0.0),
            })
            .unwrap_or_default(),
        work_life_balance: analysis.work_life_balance.unwrap_or(0.0),
        productivity_score: analysis.productivity_score.unwrap_or(0.0),
        commit_patterns: analysis
            .commit_patterns
            .as_ref()
            .map(|p| CommitPatterns {
                morning: p.morning.unwrap_or(0.0),
                afternoon: p.afternoon.unwrap_or(0.0),
                evening: p.evening.unwrap_or(0.0),
                night: p.night.unwrap_or(0.0),
            })
            .unwrap_or_default(),
        activity_hours: analysis.activity_hours.clone().unwrap_or_default(),
        project_diversity: analysis.project_diversity.unwrap_or(0.0),

        total_commits: report.and_then(|r| r.total_commits).unwrap_or(0),
        total_repositories: report.and_then(|r| r.total_repositories).unwrap_or(0),
        average_commits_per_repo: report
            .and_then(|r| r.average_commits_per_repo)
            .unwrap_or(0.0),
        analysis_date: report
            .and_then(|r| r.analysis_date.clone())
            .unwrap_or_else(|| DEFAULT_ANALYSIS_DATE.to_string()),

        recommendations: slots
            .recommendations
            .value()
            .map(|r| Recommendations {
                items: r.recommendations.clone().unwrap_or_default(),
                score: r.score.unwrap_or(0.0),
                health_level: r.health_level.unwrap_or_default(),
            })
            .unwrap_or_default(),
        trends: slots
            .trends
            .value()
            .map(|t| TrendSeries {
                weekly: t.weekly_trend.clone().unwrap_or_default(),
                monthly: t.monthly_trend.clone().unwrap_or_default(),
                activity_level: t.activity_level.unwrap_or_default(),
            })
            .unwrap_or_default(),

        sources: slots.sources(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classifier::{Classification, ATTENTION};
    use crate::models::{ActivityLevel, HealthLevel, Variant, WireCommitFrequency};
    use std::collections::BTreeMap;

    fn full_analysis() -> AnalysisResult {
        AnalysisResult {
            username: Some("octocat".to_string()),
            average_commits_per_day: Some(2.0),
            late_night_commits: Some(25),
            weekend_commit_ratio: Some(12.0),
            consecutive_days: Some(12),
            idle_days: Some(1),
            suspect_words: Some(vec!["exhausted".to_string()]),
            trend: Some("stable".to_string()),
            recommendation_score: Some(6.0),
            advice: Some("Take breaks".to_string()),
            activity_hours: Some(BTreeMap::from([("23:00".to_string(), 9)])),
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn test_absent_fields_default_to_zero() {
        let slots = FetchSlots {
            analysis: FetchSlot::Success(AnalysisResult::default()),
            report: FetchSlot::Success(UsageReport::default()),
            ..FetchSlots::default()
        };

        let state = merge("octocat", &slots);
        let view = state.view().expect("analysis succeeded");

        assert_eq!(view.average_commits_per_day, 0.0);
        assert_eq!(view.late_night_commits, 0);
        assert_eq!(view.weekend_commit_ratio, 0.0);
        assert_eq!(view.consecutive_days, 0);
        assert_eq!(view.idle_days, 0);
        assert!(view.suspect_words.is_empty());
        assert!(view.activity_hours.is_empty());
        assert_eq!(view.commit_frequency, CommitFrequency::default());
        assert_eq!(view.commit_patterns, CommitPatterns::default());
        assert_eq!(view.total_commits, 0);
        assert_eq!(view.total_repositories, 0);
        assert_eq!(view.average_commits_per_repo, 0.0);
        assert_eq!(view.trend, DEFAULT_TREND);
        assert_eq!(view.advice, DEFAULT_ADVICE);
        assert_eq!(view.analysis_date, DEFAULT_ANALYSIS_DATE);
    }

    #[test]
    fn test_partial_nested_objects_default_per_field() {
        let analysis = AnalysisResult {
            commit_frequency: Some(WireCommitFrequency {
                daily: Some(1.5),
                weekly: None,
                monthly: Some(45.0),
            }),
            ..AnalysisResult::default()
        };
        let view = merge_view("octocat", &analysis, &FetchSlots::default());

        assert_eq!(view.commit_frequency.daily, 1.5);
        assert_eq!(view.commit_frequency.weekly, 0.0);
        assert_eq!(view.commit_frequency.monthly, 45.0);
    }

    #[test]
    fn test_failed_report_keeps_view_ready() {
        let slots = FetchSlots {
            analysis: FetchSlot::Success(full_analysis()),
            report: FetchSlot::Failure(ApiError::Http {
                status: 500,
                body: String::new(),
            }),
            ..FetchSlots::default()
        };

        let state = merge("octocat", &slots);
        assert_eq!(state.status(), ViewStatus::Ready);

        let view = state.view().unwrap();
        assert_eq!(view.total_commits, 0);
        assert_eq!(view.total_repositories, 0);
        assert_eq!(view.consecutive_days, 12);
        assert_eq!(view.trend, "stable");
        assert_eq!(view.suspect_words, vec!["exhausted".to_string()]);
        assert_eq!(view.sources.report, FetchStatus::Errored);
        assert_eq!(view.sources.trends, FetchStatus::Loading);
        assert!(state.is_settled());
        assert!(!state.is_complete());
    }

    #[test]
    fn test_primary_states() {
        let pending = merge("alice", &FetchSlots::default());
        assert_eq!(pending.status(), ViewStatus::Loading);
        assert_eq!(pending.username(), Some("alice"));
        assert!(pending.view().is_none());

        let slots = FetchSlots {
            analysis: FetchSlot::Failure(ApiError::NotFound {
                body: String::new(),
            }),
            report: FetchSlot::Success(UsageReport {
                total_commits: Some(10),
                ..UsageReport::default()
            }),
            ..FetchSlots::default()
        };
        let failed = merge("ghost-user", &slots);
        assert_eq!(failed.status(), ViewStatus::Error);
        assert!(failed.view().is_none());
        assert!(failed.error().unwrap().is_not_found());
        assert!(failed.is_complete());
    }

    #[test]
    fn test_enrichments_merge_when_loaded() {
        let slots = FetchSlots {
            analysis: FetchSlot::Success(full_analysis()),
            report: FetchSlot::Success(UsageReport {
                total_commits: Some(300),
                total_repositories: Some(12),
                average_commits_per_repo: Some(25.0),
                analysis_date: Some("2024-05-01T10:00:00".to_string()),
                ..UsageReport::default()
            }),
            recommendations: FetchSlot::Success(RecommendationReport {
                recommendations: Some(vec!["Sleep more".to_string()]),
                score: Some(5.5),
                health_level: Some(HealthLevel::Warning),
                ..RecommendationReport::default()
            }),
            trends: FetchSlot::Success(TrendReport {
                weekly_trend: Some(vec![1.0, 2.0]),
                activity_level: Some(ActivityLevel::High),
                ..TrendReport::default()
            }),
        };

        let state = merge("octocat", &slots);
        let view = state.view().unwrap();
        assert_eq!(view.total_commits, 300);
        assert_eq!(view.analysis_date, "2024-05-01T10:00:00");
        assert_eq!(view.recommendations.items, vec!["Sleep more".to_string()]);
        assert_eq!(view.recommendations.health_level, HealthLevel::Warning);
        assert_eq!(view.trends.weekly, vec![1.0, 2.0]);
        assert!(view.trends.monthly.is_empty());
        assert_eq!(view.trends.activity_level, ActivityLevel::High);
        assert!(state.is_complete());
    }

    #[test]
    fn test_classification_of_merged_view() {
        let slots = FetchSlots {
            analysis: FetchSlot::Success(full_analysis()),
            ..FetchSlots::default()
        };
        let state = merge("octocat", &slots);
        let classes = Classification::of(state.view().unwrap());

        assert_eq!(classes.commit_volume, Variant::Warning);
        assert_eq!(classes.streak, Variant::Success);
        assert_eq!(classes.late_night, Variant::Danger);
        assert_eq!(classes.weekend, Variant::Default);
        assert_eq!(classes.idle, Variant::Default);
        assert_eq!(classes.wellbeing, ATTENTION);
        assert_eq!(classes.worst(), Variant::Danger);
    }
}
