//! Common Types and Constants
//!
//! Shared data structures used by the difficulty engine and the practice ranker.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Lowest difficulty level
pub const MIN_LEVEL: i32 = 1;

/// Highest difficulty level
pub const MAX_LEVEL: i32 = 10;

/// Weighted accuracy above which difficulty goes up
pub const INCREASE_THRESHOLD: f64 = 0.85;

/// Weighted accuracy below which difficulty goes down
pub const DECREASE_THRESHOLD: f64 = 0.60;

/// Sessions required before any increase is allowed (warm-up)
pub const MIN_SESSIONS_BEFORE_INCREASE: usize = 3;

/// Number of trailing samples inspected for streak overrides
pub const STREAK_WINDOW: usize = 3;

/// Every sample in the streak window below this forces a two-level drop
pub const STREAK_LOW: f64 = 0.50;

/// Every sample in the streak window above this forces a two-level rise
pub const STREAK_HIGH: f64 = 0.90;

/// Samples needed before a trend is reported
pub const MIN_TREND_SAMPLES: usize = 5;

/// Half-to-half mean difference treated as a real trend
pub const TREND_DELTA: f64 = 0.10;

/// Declining trend clamp applies below this weighted accuracy
pub const DECLINE_CLAMP_ACCURACY: f64 = 0.70;

/// Improving trend nudge applies above this weighted accuracy
pub const IMPROVE_NUDGE_ACCURACY: f64 = 0.75;

/// Severity used when none is known
pub const NEUTRAL_SEVERITY: i32 = 3;

/// Completed sessions fed to the engine when a session starts
pub const SESSION_START_HISTORY: usize = 5;

/// Completed sessions fed to the ranker
pub const RECOMMENDATION_HISTORY: usize = 10;

// ==================== Deficit Areas ====================

/// Cognitive sub-skill targeted by a game
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficitArea {
    PhonologicalAwareness,
    RapidNaming,
    WorkingMemory,
    VisualProcessing,
    ReadingFluency,
    Comprehension,
}

impl DeficitArea {
    pub const ALL: [DeficitArea; 6] = [
        DeficitArea::PhonologicalAwareness,
        DeficitArea::RapidNaming,
        DeficitArea::WorkingMemory,
        DeficitArea::VisualProcessing,
        DeficitArea::ReadingFluency,
        DeficitArea::Comprehension,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PhonologicalAwareness => "phonological_awareness",
            Self::RapidNaming => "rapid_naming",
            Self::WorkingMemory => "working_memory",
            Self::VisualProcessing => "visual_processing",
            Self::ReadingFluency => "reading_fluency",
            Self::Comprehension => "comprehension",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|area| area.as_str() == value)
    }

    /// Title-cased label, e.g. "Reading Fluency"
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PhonologicalAwareness => "Phonological Awareness",
            Self::RapidNaming => "Rapid Naming",
            Self::WorkingMemory => "Working Memory",
            Self::VisualProcessing => "Visual Processing",
            Self::ReadingFluency => "Reading Fluency",
            Self::Comprehension => "Comprehension",
        }
    }
}

impl std::fmt::Display for DeficitArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Engine Types ====================

/// Direction of performance over an accuracy history
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

/// Sizing of one exercise session, derived from its difficulty level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParameters {
    /// Number of items to generate, 10..=30
    pub item_count: i32,
    /// Per-item time budget
    pub time_limit_seconds: i32,
    pub hints_available: i32,
    /// Wrong options shown next to the right one, at most 3
    pub distractor_count: i32,
}

// ==================== Ranking Types ====================

/// Practice history for one deficit area, as handed to the ranker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaHistory {
    pub area: String,
    /// Assessed severity 1..=5
    pub severity: i32,
    /// Completed-session accuracies, oldest first
    pub accuracies: Vec<f64>,
}

impl AreaHistory {
    pub fn new(area: impl Into<String>, severity: i32, accuracies: Vec<f64>) -> Self {
        Self {
            area: area.into(),
            severity,
            accuracies,
        }
    }
}

/// One ranked deficit area
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaRecommendation {
    pub area: String,
    pub severity: i32,
    /// Higher means practise sooner, never below 1
    pub priority: i32,
    pub sessions_completed: usize,
    /// Plain mean of the history, rounded to 2 places
    pub avg_accuracy: f64,
    pub trend: Trend,
}

/// Dashboard view of where an area stands and where the engine would take it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyPreview {
    pub area: String,
    pub current_level: i32,
    pub recommended_level: i32,
    pub recent_accuracy: Option<f64>,
    pub trend: Trend,
    pub sessions_completed: usize,
}

/// Round half away from zero to the given number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
