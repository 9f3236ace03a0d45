//! Dyslexia profile tables: subtype priorities, game preferences and
//! severity exclusions.

use eyeradar_algo::DeficitArea;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DyslexiaType {
    Phonological,
    Surface,
    RapidNaming,
    Visual,
    DoubleDeficit,
    Mixed,
    Unspecified,
}

impl DyslexiaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phonological => "phonological",
            Self::Surface => "surface",
            Self::RapidNaming => "rapid_naming",
            Self::Visual => "visual",
            Self::DoubleDeficit => "double_deficit",
            Self::Mixed => "mixed",
            Self::Unspecified => "unspecified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(Value::String(value.to_string())).ok()
    }

    /// Deficit-area weights in ranking order
    pub fn area_priorities(&self) -> [(DeficitArea, f64); 6] {
        use DeficitArea::*;
        match self {
            Self::Phonological => [
                (PhonologicalAwareness, 1.0),
                (ReadingFluency, 0.7),
                (Comprehension, 0.5),
                (RapidNaming, 0.4),
                (WorkingMemory, 0.3),
                (VisualProcessing, 0.2),
            ],
            Self::Surface => [
                (VisualProcessing, 0.9),
                (ReadingFluency, 0.8),
                (Comprehension, 0.6),
                (PhonologicalAwareness, 0.4),
                (WorkingMemory, 0.3),
                (RapidNaming, 0.3),
            ],
            Self::RapidNaming => [
                (RapidNaming, 1.0),
                (ReadingFluency, 0.8),
                (VisualProcessing, 0.5),
                (PhonologicalAwareness, 0.4),
                (WorkingMemory, 0.4),
                (Comprehension, 0.3),
            ],
            Self::Visual => [
                (VisualProcessing, 1.0),
                (ReadingFluency, 0.6),
                (RapidNaming, 0.5),
                (PhonologicalAwareness, 0.3),
                (WorkingMemory, 0.3),
                (Comprehension, 0.4),
            ],
            Self::DoubleDeficit => [
                (PhonologicalAwareness, 1.0),
                (RapidNaming, 1.0),
                (ReadingFluency, 0.8),
                (WorkingMemory, 0.6),
                (VisualProcessing, 0.5),
                (Comprehension, 0.5),
            ],
            Self::Mixed => [
                (PhonologicalAwareness, 0.7),
                (RapidNaming, 0.7),
                (ReadingFluency, 0.7),
                (WorkingMemory, 0.7),
                (VisualProcessing, 0.7),
                (Comprehension, 0.7),
            ],
            Self::Unspecified => [
                (PhonologicalAwareness, 0.5),
                (RapidNaming, 0.5),
                (ReadingFluency, 0.5),
                (WorkingMemory, 0.5),
                (VisualProcessing, 0.5),
                (Comprehension, 0.5),
            ],
        }
    }

    fn game_preferences(&self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Phonological => &[
                ("sound_safari", 1.0),
                ("phoneme_blender", 1.0),
                ("rhyme_time_race", 0.95),
                ("syllable_stomper", 0.9),
                ("sound_swap", 0.9),
                ("repeated_reader", 0.7),
                ("phrase_flash", 0.6),
                ("letter_detective", 0.4),
                ("memory_matrix", 0.3),
            ],
            Self::Surface => &[
                ("letter_detective", 1.0),
                ("pattern_matcher", 0.95),
                ("mirror_image", 0.95),
                ("visual_closure", 0.9),
                ("tracking_trail", 0.85),
                ("sight_word_sprint", 0.9),
                ("flash_card_frenzy", 0.85),
                ("phrase_flash", 0.7),
                ("word_ladder", 0.6),
            ],
            Self::RapidNaming => &[
                ("speed_namer", 1.0),
                ("flash_card_frenzy", 0.95),
                ("object_blitz", 0.95),
                ("letter_stream", 0.9),
                ("sight_word_sprint", 0.85),
                ("phrase_flash", 0.8),
                ("repeated_reader", 0.7),
            ],
            Self::Visual => &[
                ("tracking_trail", 1.0),
                ("letter_detective", 0.95),
                ("pattern_matcher", 0.95),
                ("visual_closure", 0.9),
                ("mirror_image", 0.85),
            ],
            Self::DoubleDeficit => &[
                ("sound_safari", 0.95),
                ("phoneme_blender", 0.95),
                ("rhyme_time_race", 0.9),
                ("speed_namer", 0.95),
                ("flash_card_frenzy", 0.9),
                ("object_blitz", 0.85),
                ("sight_word_sprint", 0.9),
                ("repeated_reader", 0.85),
            ],
            Self::Mixed => &[
                ("sound_safari", 0.8),
                ("letter_detective", 0.8),
                ("speed_namer", 0.8),
                ("memory_matrix", 0.8),
                ("phrase_flash", 0.8),
                ("question_quest", 0.8),
            ],
            Self::Unspecified => &[],
        }
    }

    /// Suitability of a game for this subtype; unlisted games score 0.5
    pub fn game_preference(&self, game_id: &str) -> f64 {
        self.game_preferences()
            .iter()
            .find(|(id, _)| *id == game_id)
            .map_or(0.5, |(_, score)| *score)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Mild,
    Moderate,
    Severe,
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mild" => Some(Self::Mild),
            "moderate" => Some(Self::Moderate),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }

    pub fn excluded_games(&self) -> &'static [&'static str] {
        match self {
            Self::Mild => &[],
            Self::Moderate => &["dual_task_challenge"],
            Self::Severe => &["dual_task_challenge", "backward_spell", "inference_detective"],
        }
    }

    pub fn excludes(&self, game_id: &str) -> bool {
        self.excluded_games().contains(&game_id)
    }

    /// Games per adventure world
    pub fn max_games_per_world(&self) -> usize {
        match self {
            Self::Severe => 3,
            Self::Moderate => 4,
            Self::Mild => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Preschool,
    EarlyElementary,
    LateElementary,
    Secondary,
}

impl AgeGroup {
    pub fn for_age(age: i64) -> Self {
        match age {
            ..=6 => Self::Preschool,
            7..=9 => Self::EarlyElementary,
            10..=12 => Self::LateElementary,
            _ => Self::Secondary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preschool => "preschool",
            Self::EarlyElementary => "early_elementary",
            Self::LateElementary => "late_elementary",
            Self::Secondary => "secondary",
        }
    }
}

const DIAGNOSTIC_SEVERITY_KEYS: [(DeficitArea, &str); 6] = [
    (DeficitArea::PhonologicalAwareness, "phonological_severity"),
    (DeficitArea::RapidNaming, "rapid_naming_severity"),
    (DeficitArea::WorkingMemory, "working_memory_severity"),
    (DeficitArea::VisualProcessing, "visual_processing_severity"),
    (DeficitArea::ReadingFluency, "reading_fluency_severity"),
    (DeficitArea::Comprehension, "comprehension_severity"),
];

/// Clinician-entered diagnostic profile, read leniently from the stored JSON
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub dyslexia_type: DyslexiaType,
    pub severity_level: SeverityLevel,
    area_severity: [i64; 6],
    pub has_adhd: bool,
    pub has_dyscalculia: bool,
    pub has_dysgraphia: bool,
    pub notes: Option<String>,
}

impl Default for Diagnostic {
    fn default() -> Self {
        Self {
            dyslexia_type: DyslexiaType::Unspecified,
            severity_level: SeverityLevel::Moderate,
            area_severity: [3; 6],
            has_adhd: false,
            has_dyscalculia: false,
            has_dysgraphia: false,
            notes: None,
        }
    }
}

impl Diagnostic {
    /// Unknown enum values and missing or non-numeric fields fall back to
    /// their defaults.
    pub fn from_json(value: &serde_json::Map<String, Value>) -> Self {
        let mut diag = Self::default();
        if let Some(kind) = value
            .get("dyslexia_type")
            .and_then(Value::as_str)
            .and_then(DyslexiaType::parse)
        {
            diag.dyslexia_type = kind;
        }
        if let Some(level) = value
            .get("severity_level")
            .and_then(Value::as_str)
            .and_then(SeverityLevel::parse)
        {
            diag.severity_level = level;
        }
        for (slot, (_, key)) in diag.area_severity.iter_mut().zip(DIAGNOSTIC_SEVERITY_KEYS) {
            if let Some(sev) = value.get(key).and_then(Value::as_i64) {
                *slot = sev;
            }
        }
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        diag.has_adhd = flag("has_adhd");
        diag.has_dyscalculia = flag("has_dyscalculia");
        diag.has_dysgraphia = flag("has_dysgraphia");
        diag.notes = value
            .get("notes")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        diag
    }

    pub fn area_severity(&self, area: DeficitArea) -> i64 {
        DIAGNOSTIC_SEVERITY_KEYS
            .iter()
            .position(|(a, _)| *a == area)
            .map_or(3, |idx| self.area_severity[idx])
    }

    pub fn severity_key(area: DeficitArea) -> &'static str {
        DIAGNOSTIC_SEVERITY_KEYS
            .iter()
            .find(|(a, _)| *a == area)
            .map_or("", |(_, key)| key)
    }
}

/// Checks a diagnostic payload before it is stored on a student
pub fn validate_diagnostic(value: &serde_json::Map<String, Value>) -> Result<(), String> {
    if let Some(kind) = value.get("dyslexia_type") {
        if kind.as_str().and_then(DyslexiaType::parse).is_none() {
            return Err(format!("invalid dyslexia_type: {kind}"));
        }
    }
    if let Some(level) = value.get("severity_level") {
        if level.as_str().and_then(SeverityLevel::parse).is_none() {
            return Err(format!("invalid severity_level: {level}"));
        }
    }
    for (_, key) in DIAGNOSTIC_SEVERITY_KEYS {
        if let Some(raw) = value.get(key) {
            match raw.as_i64() {
                Some(sev) if (1..=5).contains(&sev) => {}
                _ => return Err(format!("{key} must be an integer between 1 and 5")),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_diagnostic_defaults() {
        let diag = Diagnostic::from_json(&serde_json::Map::new());
        assert_eq!(diag.dyslexia_type, DyslexiaType::Unspecified);
        assert_eq!(diag.severity_level, SeverityLevel::Moderate);
        assert_eq!(diag.area_severity(DeficitArea::Comprehension), 3);
    }

    #[test]
    fn test_diagnostic_reads_fields() {
        let diag = Diagnostic::from_json(&map(json!({
            "dyslexia_type": "double_deficit",
            "severity_level": "severe",
            "rapid_naming_severity": 5,
            "has_adhd": true,
            "notes": "prefers audio"
        })));
        assert_eq!(diag.dyslexia_type, DyslexiaType::DoubleDeficit);
        assert_eq!(diag.severity_level, SeverityLevel::Severe);
        assert_eq!(diag.area_severity(DeficitArea::RapidNaming), 5);
        assert_eq!(diag.area_severity(DeficitArea::WorkingMemory), 3);
        assert!(diag.has_adhd);
        assert_eq!(diag.notes.as_deref(), Some("prefers audio"));
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let diag = Diagnostic::from_json(&map(json!({"dyslexia_type": "nonsense"})));
        assert_eq!(diag.dyslexia_type, DyslexiaType::Unspecified);
    }

    #[test]
    fn test_validate_diagnostic_rejects_out_of_range() {
        assert!(validate_diagnostic(&map(json!({"phonological_severity": 6}))).is_err());
        assert!(validate_diagnostic(&map(json!({"severity_level": "extreme"}))).is_err());
        assert!(validate_diagnostic(&map(json!({"dyslexia_type": "visual", "comprehension_severity": 1}))).is_ok());
    }

    #[test]
    fn test_game_preference_default() {
        assert_eq!(DyslexiaType::Phonological.game_preference("sound_safari"), 1.0);
        assert_eq!(DyslexiaType::Phonological.game_preference("ran_grid"), 0.5);
        assert_eq!(DyslexiaType::Unspecified.game_preference("sound_safari"), 0.5);
    }

    #[test]
    fn test_severity_exclusions() {
        assert!(SeverityLevel::Mild.excluded_games().is_empty());
        assert!(SeverityLevel::Moderate.excludes("dual_task_challenge"));
        assert!(SeverityLevel::Severe.excludes("backward_spell"));
        assert!(!SeverityLevel::Severe.excludes("sound_safari"));
    }

    #[test]
    fn test_age_groups() {
        assert_eq!(AgeGroup::for_age(5), AgeGroup::Preschool);
        assert_eq!(AgeGroup::for_age(9), AgeGroup::EarlyElementary);
        assert_eq!(AgeGroup::for_age(12), AgeGroup::LateElementary);
        assert_eq!(AgeGroup::for_age(15), AgeGroup::Secondary);
    }
}
