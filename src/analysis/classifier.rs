//! Threshold classification of merged metrics.
//!
//! Every rule is an ordered boundary table: the first bound the value
//! satisfies wins, otherwise the table's fallback applies. Bounds are fixed
//! and boundary-inclusive exactly as written (`AtLeast` is `>=`, `Above` is
//! `>`). A NaN satisfies no bound and lands on the fallback.

use crate::models::{MergedView, Variant};
use serde::Serialize;

/// One comparison against a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    AtLeast(f64),
    Above(f64),
}

impl Bound {
    fn admits(self, value: f64) -> bool {
        match self {
            Bound::AtLeast(threshold) => value >= threshold,
            Bound::Above(threshold) => value > threshold,
        }
    }
}

/// Ordered rules plus the outcome when none match.
#[derive(Debug)]
pub struct Thresholds<T: 'static> {
    pub rules: &'static [(Bound, T)],
    pub otherwise: T,
}

impl<T: Copy> Thresholds<T> {
    pub fn classify(&self, value: f64) -> T {
        self.rules
            .iter()
            .find(|(bound, _)| bound.admits(value))
            .map(|(_, outcome)| *outcome)
            .unwrap_or(self.otherwise)
    }
}

pub const COMMIT_VOLUME: Thresholds<Variant> = Thresholds {
    rules: &[
        (Bound::AtLeast(3.0), Variant::Success),
        (Bound::AtLeast(1.0), Variant::Warning),
    ],
    otherwise: Variant::Danger,
};

pub const STREAK: Thresholds<Variant> = Thresholds {
    rules: &[
        (Bound::AtLeast(10.0), Variant::Success),
        (Bound::AtLeast(5.0), Variant::Warning),
    ],
    otherwise: Variant::Danger,
};

pub const LATE_NIGHT: Thresholds<Variant> = Thresholds {
    rules: &[(Bound::Above(20.0), Variant::Danger)],
    otherwise: Variant::Default,
};

pub const WEEKEND: Thresholds<Variant> = Thresholds {
    rules: &[(Bound::Above(30.0), Variant::Warning)],
    otherwise: Variant::Default,
};

pub const IDLE: Thresholds<Variant> = Thresholds {
    rules: &[(Bound::Above(7.0), Variant::Warning)],
    otherwise: Variant::Default,
};

/// Well-being label shown next to the recommendation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WellbeingLabel {
    pub label: &'static str,
    pub variant: Variant,
}

pub const EXCELLENT: WellbeingLabel = WellbeingLabel {
    label: "Excellent",
    variant: Variant::Success,
};

pub const ATTENTION: WellbeingLabel = WellbeingLabel {
    label: "Attention",
    variant: Variant::Warning,
};

pub const CRITICAL: WellbeingLabel = WellbeingLabel {
    label: "Critical",
    variant: Variant::Danger,
};

pub const WELLBEING: Thresholds<WellbeingLabel> = Thresholds {
    rules: &[(Bound::AtLeast(7.0), EXCELLENT), (Bound::AtLeast(5.0), ATTENTION)],
    otherwise: CRITICAL,
};

pub fn commit_volume_variant(avg_commits_per_day: f64) -> Variant {
    COMMIT_VOLUME.classify(avg_commits_per_day)
}

pub fn streak_variant(consecutive_days: u64) -> Variant {
    STREAK.classify(consecutive_days as f64)
}

pub fn late_night_variant(late_night_commits: u64) -> Variant {
    LATE_NIGHT.classify(late_night_commits as f64)
}

pub fn weekend_variant(weekend_ratio_percent: f64) -> Variant {
    WEEKEND.classify(weekend_ratio_percent)
}

pub fn idle_variant(idle_days: u64) -> Variant {
    IDLE.classify(idle_days as f64)
}

/// Label for a 0-10 well-being score.
pub fn wellbeing_label(score: f64) -> WellbeingLabel {
    WELLBEING.classify(score)
}

/// Every variant the metric cards need, derived from one merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub commit_volume: Variant,
    pub streak: Variant,
    pub late_night: Variant,
    pub weekend: Variant,
    pub idle: Variant,
    pub wellbeing: WellbeingLabel,
}

impl Classification {
    pub fn of(view: &MergedView) -> Self {
        Self {
            commit_volume: commit_volume_variant(view.average_commits_per_day),
            streak: streak_variant(view.consecutive_days),
            late_night: late_night_variant(view.late_night_commits),
            weekend: weekend_variant(view.weekend_commit_ratio),
            idle: idle_variant(view.idle_days),
            wellbeing: wellbeing_label(view.recommendation_score),
        }
    }

    /// Most severe variant across all metrics.
    pub fn worst(&self) -> Variant {
        [
            self.commit_volume,
            self.streak,
            self.late_night,
            self.weekend,
            self.idle,
            self.wellbeing.variant,
        ]
        .into_iter()
        .max_by_key(|v| v.rank())
        .unwrap_or(Variant::Default)
    }
}
