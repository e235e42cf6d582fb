//! Data models for the DevPulse client.
//!
//! Wire types mirror the backend's JSON and keep every field optional, since
//! the backend omits or nulls fields freely. `MergedView` is the opposite: the
//! fully-defaulted record everything downstream of the aggregator reads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Qualitative severity derived from a numeric metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Neutral, nothing to flag.
    Default,
    Success,
    Warning,
    Danger,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Default => write!(f, "default"),
            Variant::Success => write!(f, "success"),
            Variant::Warning => write!(f, "warning"),
            Variant::Danger => write!(f, "danger"),
        }
    }
}

impl Variant {
    /// Returns an emoji representation of the variant.
    pub fn emoji(&self) -> &'static str {
        match self {
            Variant::Default => "⚪",
            Variant::Success => "🟢",
            Variant::Warning => "🟡",
            Variant::Danger => "🔴",
        }
    }

    /// Severity rank used for `--fail-on` comparisons.
    pub fn rank(&self) -> u8 {
        match self {
            Variant::Default | Variant::Success => 0,
            Variant::Warning => 1,
            Variant::Danger => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Commit-frequency breakdown as sent by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireCommitFrequency {
    pub daily: Option<f64>,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
}

/// Time-of-day distribution (percent of commits) as sent by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireCommitPatterns {
    pub morning: Option<f64>,
    pub afternoon: Option<f64>,
    pub evening: Option<f64>,
    pub night: Option<f64>,
}

/// `GET /api/analyze/{username}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisResult {
    pub username: Option<String>,
    pub average_commits_per_day: Option<f64>,
    pub late_night_commits: Option<u64>,
    pub weekend_commit_ratio: Option<f64>,
    pub consecutive_days: Option<u64>,
    pub idle_days: Option<u64>,
    pub suspect_words: Option<Vec<String>>,
    pub trend: Option<String>,
    pub recommendation_score: Option<f64>,
    pub advice: Option<String>,
    pub commit_frequency: Option<WireCommitFrequency>,
    pub work_life_balance: Option<f64>,
    pub productivity_score: Option<f64>,
    pub commit_patterns: Option<WireCommitPatterns>,
    pub activity_hours: Option<BTreeMap<String, u64>>,
    pub project_diversity: Option<f64>,
}

/// `GET /api/report/{username}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsageReport {
    pub username: Option<String>,
    pub total_commits: Option<u64>,
    pub total_repositories: Option<u64>,
    pub average_commits_per_repo: Option<f64>,
    pub analysis_date: Option<String>,
}

/// Activity level reported by the trends endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Health level reported by the recommendations endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Good,
    Warning,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

/// `GET /api/trends/{username}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrendReport {
    pub username: Option<String>,
    pub weekly_trend: Option<Vec<f64>>,
    pub monthly_trend: Option<Vec<f64>>,
    pub activity_level: Option<ActivityLevel>,
}

/// `GET /api/recommendations/{username}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationReport {
    pub username: Option<String>,
    pub recommendations: Option<Vec<String>>,
    pub score: Option<f64>,
    pub health_level: Option<HealthLevel>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Authenticated user as returned by `/auth/*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Response of `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

/// `GET /github/profile`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubProfile {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub public_repos: u64,
    pub followers: u64,
    pub following: u64,
}

/// One entry of `GET /github/repos`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub stargazers_count: u64,
    pub language: Option<String>,
}

// ---------------------------------------------------------------------------
// Merged view
// ---------------------------------------------------------------------------

/// Lifecycle of one fetch inside a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Loading,
    Loaded,
    Errored,
}

impl FetchStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, FetchStatus::Loading)
    }
}

/// Per-source status carried by a `MergedView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub analysis: FetchStatus,
    pub report: FetchStatus,
    pub recommendations: FetchStatus,
    pub trends: FetchStatus,
}

impl SourceStatus {
    /// True once every fetch has either loaded or errored.
    pub fn all_settled(&self) -> bool {
        self.analysis.is_settled()
            && self.report.is_settled()
            && self.recommendations.is_settled()
            && self.trends.is_settled()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CommitFrequency {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
}

/// Percent of commits per part of the day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CommitPatterns {
    pub morning: f64,
    pub afternoon: f64,
    pub evening: f64,
    pub night: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
    pub items: Vec<String>,
    pub score: f64,
    pub health_level: HealthLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub weekly: Vec<f64>,
    pub monthly: Vec<f64>,
    pub activity_level: ActivityLevel,
}

/// The merged, fully-defaulted result of every fetch for one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedView {
    pub username: String,

    // Analysis
    pub average_commits_per_day: f64,
    pub late_night_commits: u64,
    pub weekend_commit_ratio: f64,
    pub consecutive_days: u64,
    pub idle_days: u64,
    pub suspect_words: Vec<String>,
    pub trend: String,
    pub recommendation_score: f64,
    pub advice: String,
    pub commit_frequency: CommitFrequency,
    pub work_life_balance: f64,
    pub productivity_score: f64,
    pub commit_patterns: CommitPatterns,
    pub activity_hours: BTreeMap<String, u64>,
    pub project_diversity: f64,

    // Usage report
    pub total_commits: u64,
    pub total_repositories: u64,
    pub average_commits_per_repo: f64,
    pub analysis_date: String,

    // Enrichments
    pub recommendations: Recommendations,
    pub trends: TrendSeries,

    pub sources: SourceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_result_accepts_sparse_payload() {
        let raw = r#"{"username":"octocat","averageCommitsPerDay":2.5,"trend":null}"#;
        let parsed: AnalysisResult = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.username.as_deref(), Some("octocat"));
        assert_eq!(parsed.average_commits_per_day, Some(2.5));
        assert_eq!(parsed.trend, None);
        assert_eq!(parsed.late_night_commits, None);
        assert_eq!(parsed.activity_hours, None);
    }

    #[test]
    fn test_analysis_result_full_payload() {
        let raw = r#"{
            "username": "octocat",
            "averageCommitsPerDay": 3.2,
            "lateNightCommits": 4,
            "weekendCommitRatio": 12.5,
            "consecutiveDays": 11,
            "idleDays": 1,
            "suspectWords": ["tired"],
            "trend": "positive",
            "recommendationScore": 8,
            "advice": "Keep going",
            "commitFrequency": {"daily": 3.2, "weekly": 24.0, "monthly": 96},
            "workLifeBalance": 80.0,
            "productivityScore": 70.5,
            "commitPatterns": {"morning": 25.0, "afternoon": 50.0, "evening": 20.0, "night": 5.0},
            "activityHours": {"09:00": 4, "10:00": 7},
            "projectDiversity": 3
        }"#;
        let parsed: AnalysisResult = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.consecutive_days, Some(11));
        assert_eq!(parsed.recommendation_score, Some(8.0));
        assert_eq!(
            parsed.commit_frequency.and_then(|f| f.monthly),
            Some(96.0)
        );
        assert_eq!(
            parsed.activity_hours.and_then(|h| h.get("10:00").copied()),
            Some(7)
        );
    }

    #[test]
    fn test_unknown_levels_fall_back() {
        let trend: TrendReport =
            serde_json::from_str(r#"{"activityLevel":"extreme"}"#).unwrap();
        assert_eq!(trend.activity_level, Some(ActivityLevel::Unknown));

        let recs: RecommendationReport =
            serde_json::from_str(r#"{"healthLevel":"warning","score":4}"#).unwrap();
        assert_eq!(recs.health_level, Some(HealthLevel::Warning));
        assert_eq!(recs.score, Some(4.0));
    }

    #[test]
    fn test_variant_rank_ordering() {
        assert!(Variant::Danger.rank() > Variant::Warning.rank());
        assert!(Variant::Warning.rank() > Variant::Success.rank());
        assert_eq!(Variant::Default.rank(), Variant::Success.rank());
        assert_eq!(Variant::Warning.to_string(), "warning");
    }

    #[test]
    fn test_github_profile_nullable_fields() {
        let raw = r#"{"login":"octocat","name":null,"bio":null,"public_repos":8}"#;
        let profile: GitHubProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.login, "octocat");
        assert_eq!(profile.name, None);
        assert_eq!(profile.public_repos, 8);
        assert_eq!(profile.followers, 0);
    }
}
