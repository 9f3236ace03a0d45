//! Adventure maps: per-student worlds of games, one world per deficit area.
//!
//! Suggestions come from the LLM when one is ready and from the rule-based
//! builder otherwise. Any failure on the LLM path falls back to the rules.

use std::collections::BTreeMap;

use eyeradar_algo::DeficitArea;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::now_iso;
use crate::db::operations::{self, AdventureMap, AdventureThemeConfig, AdventureWorld, Student};
use crate::services::games::{self, GameDefinition, GameType};
use crate::services::llm_provider::{JsonRequest, LlmProvider, ModelTier};
use crate::services::profiles::{AgeGroup, Diagnostic, DyslexiaType, SeverityLevel};
use crate::services::ServiceError;

pub const DEFAULT_TITLE: &str = "My Adventure";
const DEFAULT_AGE: i64 = 8;
const MAX_WORLDS: usize = 6;
const MIN_WORLDS: usize = 2;
const AREA_SCORE_THRESHOLD: f64 = 0.5;
const WORLD_SEVERITY_THRESHOLD: i64 = 2;

const INTEREST_THEMES: [(&str, &str, &str); 13] = [
    ("dinosaurs", "warm", "prehistoric"),
    ("space", "cosmic", "space"),
    ("animals", "nature", "wildlife"),
    ("music", "vibrant", "musical"),
    ("sports", "energetic", "athletic"),
    ("art", "rainbow", "creative"),
    ("nature", "forest", "nature"),
    ("ocean", "aquatic", "underwater"),
    ("robots", "tech", "futuristic"),
    ("fairy tales", "magical", "fantasy"),
    ("cooking", "warm", "culinary"),
    ("cars", "energetic", "racing"),
    ("superheroes", "vibrant", "heroic"),
];

pub fn world_name(area: DeficitArea) -> &'static str {
    match area {
        DeficitArea::PhonologicalAwareness => "Sound Kingdom",
        DeficitArea::RapidNaming => "Speed Valley",
        DeficitArea::WorkingMemory => "Memory Mountains",
        DeficitArea::VisualProcessing => "Vision Forest",
        DeficitArea::ReadingFluency => "Fluency River",
        DeficitArea::Comprehension => "Story Castle",
    }
}

pub fn world_color(area: DeficitArea) -> &'static str {
    match area {
        DeficitArea::PhonologicalAwareness => "#6366f1",
        DeficitArea::RapidNaming => "#f59e0b",
        DeficitArea::WorkingMemory => "#8b5cf6",
        DeficitArea::VisualProcessing => "#10b981",
        DeficitArea::ReadingFluency => "#3b82f6",
        DeficitArea::Comprehension => "#ef4444",
    }
}

// ========== Requests / responses ==========

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdventure {
    pub student_id: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default = "default_title")]
    pub title: String,
    pub worlds: Vec<AdventureWorld>,
    #[serde(default)]
    pub theme_config: AdventureThemeConfig,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAdventure {
    pub title: Option<String>,
    pub worlds: Option<Vec<AdventureWorld>>,
    pub theme_config: Option<AdventureThemeConfig>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestRequest {
    pub student_id: String,
    #[serde(default)]
    pub dyslexia_type: Option<String>,
    #[serde(default)]
    pub severity_level: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Ai,
    Rules,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdventureSuggestion {
    pub suggested_worlds: Vec<AdventureWorld>,
    pub reasoning: Vec<String>,
    pub theme_config: AdventureThemeConfig,
    pub source: SuggestionSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaGame {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub game_type: GameType,
    pub age_range_min: i64,
    pub age_range_max: i64,
    pub icon: &'static str,
}

/// Inputs of a suggestion after request overrides are applied
#[derive(Debug, Clone)]
pub struct SuggestProfile {
    pub age: i64,
    pub dyslexia_type: DyslexiaType,
    pub severity: SeverityLevel,
    pub diagnostic: Diagnostic,
    pub interests: Vec<String>,
}

impl SuggestProfile {
    pub fn resolve(student: &Student, request: &SuggestRequest) -> Result<Self, ServiceError> {
        let diagnostic = Diagnostic::from_json(&student.diagnostic);
        let dyslexia_type = match request.dyslexia_type.as_deref() {
            Some(raw) => DyslexiaType::parse(raw)
                .ok_or_else(|| ServiceError::BadRequest(format!("Invalid dyslexia type: {raw}")))?,
            None => diagnostic.dyslexia_type,
        };
        let severity = match request.severity_level.as_deref() {
            Some(raw) => SeverityLevel::parse(raw)
                .ok_or_else(|| ServiceError::BadRequest(format!("Invalid severity level: {raw}")))?,
            None => diagnostic.severity_level,
        };
        let age = request
            .age
            .filter(|age| *age > 0)
            .unwrap_or(if student.age > 0 { student.age } else { DEFAULT_AGE });

        Ok(Self {
            age,
            dyslexia_type,
            severity,
            diagnostic,
            interests: student.interests.clone(),
        })
    }
}

// ========== Rule-based builder ==========

/// Theme from the first interest that matches a known keyword. The primary
/// interest is always the student's first one.
pub fn theme_for_interests(interests: &[String]) -> AdventureThemeConfig {
    let Some(first) = interests.first() else {
        return AdventureThemeConfig::default();
    };
    let primary = first.to_lowercase();

    let matched = interests.iter().find_map(|interest| {
        let lowered = interest.to_lowercase();
        INTEREST_THEMES
            .iter()
            .find(|(keyword, _, _)| lowered.contains(keyword))
    });

    let (palette, style) = matched.map_or(("default", "nature"), |(_, palette, style)| (*palette, *style));
    AdventureThemeConfig {
        primary_interest: primary,
        color_palette: palette.to_string(),
        decoration_style: style.to_string(),
    }
}

/// Deficit areas that get a world, strongest need first
pub fn select_areas(dyslexia_type: DyslexiaType, diagnostic: &Diagnostic) -> Vec<DeficitArea> {
    let mut scored: Vec<(DeficitArea, f64)> = dyslexia_type
        .area_priorities()
        .into_iter()
        .map(|(area, weight)| (area, weight + diagnostic.area_severity(area) as f64 / 5.0 * 0.4))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut selected = Vec::new();
    for (area, score) in scored {
        let filling_minimum = selected.len() < MIN_WORLDS;
        if (score >= AREA_SCORE_THRESHOLD || filling_minimum)
            && (diagnostic.area_severity(area) >= WORLD_SEVERITY_THRESHOLD || filling_minimum)
        {
            selected.push(area);
        }
    }
    selected.truncate(MAX_WORLDS);
    selected
}

/// Age-appropriate games for a world, best fit for the subtype first
pub fn world_games(area: DeficitArea, profile: &SuggestProfile) -> Vec<&'static GameDefinition> {
    let mut candidates: Vec<&'static GameDefinition> = games::games_by_area(area)
        .into_iter()
        .filter(|g| g.suits_age(profile.age) && !profile.severity.excludes(g.id))
        .collect();
    candidates.sort_by(|a, b| {
        let pa = profile.dyslexia_type.game_preference(a.id);
        let pb = profile.dyslexia_type.game_preference(b.id);
        pb.total_cmp(&pa)
    });
    candidates.truncate(profile.severity.max_games_per_world());
    candidates
}

pub fn suggest_rule_based(profile: &SuggestProfile) -> AdventureSuggestion {
    let areas = select_areas(profile.dyslexia_type, &profile.diagnostic);
    let mut reasoning = vec![format!(
        "Selected {} worlds based on {} dyslexia profile ({} severity)",
        areas.len(),
        profile.dyslexia_type.as_str(),
        profile.severity.as_str()
    )];

    let mut worlds = Vec::with_capacity(areas.len());
    for (idx, area) in areas.iter().enumerate() {
        let picked = world_games(*area, profile);
        if picked.is_empty() {
            reasoning.push(format!(
                "Skipped {}: no age-appropriate games for age {}",
                world_name(*area),
                profile.age
            ));
            continue;
        }

        let world = AdventureWorld {
            deficit_area: area.as_str().to_string(),
            world_number: idx as i64 + 1,
            world_name: world_name(*area).to_string(),
            color: world_color(*area).to_string(),
            game_ids: picked.iter().map(|g| g.id.to_string()).collect(),
        };
        reasoning.push(format!(
            "World {} ({}): {} exercises selected [{}]",
            idx + 1,
            world.world_name,
            picked.len(),
            picked.iter().map(|g| g.name).collect::<Vec<_>>().join(", ")
        ));
        worlds.push(world);
    }

    if !profile.interests.is_empty() {
        let shown: Vec<&str> = profile.interests.iter().take(3).map(String::as_str).collect();
        reasoning.push(format!("Theme personalized for interests: {}", shown.join(", ")));
    }

    AdventureSuggestion {
        suggested_worlds: worlds,
        reasoning,
        theme_config: theme_for_interests(&profile.interests),
        source: SuggestionSource::Rules,
    }
}

pub fn games_for_area(area: DeficitArea, age: i64, severity: Option<SeverityLevel>) -> Vec<AreaGame> {
    let severity = severity.unwrap_or(SeverityLevel::Moderate);
    games::games_by_area(area)
        .into_iter()
        .filter(|g| g.suits_age(age) && !severity.excludes(g.id))
        .map(|g| AreaGame {
            id: g.id,
            name: g.name,
            description: g.description,
            game_type: g.game_type,
            age_range_min: g.age_range_min,
            age_range_max: g.age_range_max,
            icon: g.icon,
        })
        .collect()
}

// ========== LLM builder ==========

const ADVENTURE_SYSTEM_PROMPT: &str = "You are an educational psychologist and dyslexia intervention specialist \
designing evidence-based, personalized practice programs for children with dyslexia.

Subtype priorities:
- phonological: phonological_awareness first, then reading_fluency, then working_memory
- surface: reading_fluency, rapid_naming, then phonological_awareness
- rapid_naming: rapid_naming, phonological_awareness, then reading_fluency
- visual: visual_processing, working_memory, then reading_fluency
- double_deficit: phonological_awareness and rapid_naming equally, then reading_fluency
- mixed: balanced across phonological_awareness, rapid_naming, reading_fluency, working_memory
- unspecified: foundational phonological work plus fluency and comprehension

World and game counts by severity:
- mild: 5-6 worlds, 5 games per world
- moderate: 4-5 worlds, 4 games per world
- severe: 2-3 worlds, 3 games per world

Sequencing:
1. Start with the most foundational area (phonological before fluency before comprehension).
2. Include working_memory and visual_processing when their severity is 3/5 or higher.
3. With ADHD, prefer fewer, more focused worlds and shorter games.
4. With dysgraphia, avoid text-input games such as backward_spell and word_ladder.
5. Ages 4-7 get sound-based, visual and kinesthetic games only.
6. Never repeat the same mechanic within a world.
7. Use only game ids from the provided catalog.

Eye-tracking signals:
- Words per minute below 60 (ages 8-10) or 80 (ages 11+) makes reading_fluency critical.
- Fixation duration above 250 ms points to visual_processing and working_memory.
- Regression rate above 15% points to phonological decoding and comprehension.
- Overall severity 4-5 means 2-3 worlds with at most 3 games each.

Match the theme to the student's main interest.";

#[derive(Debug, Deserialize)]
struct AiAdventure {
    #[serde(default)]
    worlds: Vec<AiWorld>,
    #[serde(default)]
    reasoning: Vec<String>,
    #[serde(default)]
    theme_config: AiTheme,
}

#[derive(Debug, Deserialize)]
struct AiWorld {
    deficit_area: String,
    world_number: i64,
    world_name: String,
    color: String,
    game_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AiTheme {
    primary_interest: Option<String>,
    color_palette: Option<String>,
    decoration_style: Option<String>,
}

fn game_catalog_text(age: i64) -> String {
    let mut by_area: BTreeMap<&'static str, Vec<&'static GameDefinition>> = BTreeMap::new();
    for game in games::all_games().iter().filter(|g| g.suits_age(age)) {
        by_area.entry(game.deficit_area.as_str()).or_default().push(game);
    }

    let mut text = String::new();
    for (area, list) in by_area {
        text.push_str(&format!(
            "\n{} ({} games available for age {age}):\n",
            area.to_uppercase().replace('_', " "),
            list.len()
        ));
        for g in list {
            text.push_str(&format!(
                "  [{}] {} - {} | Mechanic: {}\n",
                g.id, g.name, g.description, g.mechanics
            ));
        }
    }
    text
}

fn adventure_prompt(student: &Student, profile: &SuggestProfile) -> String {
    let diag = &profile.diagnostic;
    let per_area: Vec<String> = DeficitArea::ALL
        .iter()
        .map(|area| {
            let value = student
                .diagnostic
                .get(Diagnostic::severity_key(*area))
                .map_or_else(|| "not set".to_string(), |v| v.to_string());
            format!("  {}: {value}/5", area.as_str())
        })
        .collect();

    let assessment = match &student.assessment {
        Some(a) => format!(
            "EyeRadar eye-tracking assessment:\n  Overall severity: {}/5\n  Words per minute: {}\n  \
             Fixation duration: {} ms (norm ~200 ms)\n  Fixations per line: {}\n  \
             Regression rate: {} (norm <0.10)\n  Per-area deficit scores:\n{}",
            a.overall_severity,
            a.reading_metrics.words_per_minute,
            a.reading_metrics.fixation_duration_ms,
            a.reading_metrics.fixation_count_per_line,
            a.reading_metrics.regression_rate,
            serde_json::to_string_pretty(&a.deficits).unwrap_or_default()
        ),
        None => "(No EyeRadar assessment data, use the diagnostic profile only)".to_string(),
    };

    let worlds_meta: Vec<String> = DeficitArea::ALL
        .iter()
        .map(|area| {
            format!(
                "{} -> world_name: \"{}\", color: \"{}\"",
                area.as_str(),
                world_name(*area),
                world_color(*area)
            )
        })
        .collect();

    let interests = if profile.interests.is_empty() {
        "None specified".to_string()
    } else {
        profile.interests.join(", ")
    };

    format!(
        r##"Design a personalized adventure map for this student.

STUDENT PROFILE
Name: {name} | Age: {age} ({age_group}) | Grade: {grade} | Language: {language}
Interests: {interests}
Dyslexia type: {kind} | Overall severity: {severity}
Co-occurring: ADHD={adhd}, Dyscalculia={dyscalculia}, Dysgraphia={dysgraphia}
Specialist notes: {notes}

PER-AREA SEVERITY (1=mild, 5=severe):
{per_area}

{assessment}

AVAILABLE GAMES FOR AGE {age}:
{catalog}

WORLD METADATA (use these exact values):
{worlds_meta}

THEME OPTIONS:
color_palette: "warm"|"cosmic"|"nature"|"vibrant"|"energetic"|"rainbow"|"forest"|"aquatic"|"tech"|"magical"|"default"
decoration_style: "prehistoric"|"space"|"wildlife"|"musical"|"athletic"|"creative"|"nature"|"underwater"|"futuristic"|"fantasy"|"culinary"|"racing"|"heroic"|"default"

Respond ONLY with JSON of this shape:
{{
  "worlds": [
    {{"deficit_area": "phonological_awareness", "world_number": 1, "world_name": "Sound Kingdom", "color": "#6366f1", "game_ids": ["sound_safari"]}}
  ],
  "reasoning": ["Profile analysis: ...", "World 1 (Sound Kingdom): ..."],
  "theme_config": {{"primary_interest": "ocean", "color_palette": "aquatic", "decoration_style": "underwater"}}
}}"##,
        name = student.name,
        age = profile.age,
        age_group = AgeGroup::for_age(profile.age).as_str(),
        grade = student.grade,
        language = student.language,
        kind = profile.dyslexia_type.as_str(),
        severity = profile.severity.as_str(),
        adhd = diag.has_adhd,
        dyscalculia = diag.has_dyscalculia,
        dysgraphia = diag.has_dysgraphia,
        notes = diag.notes.as_deref().unwrap_or("None"),
        per_area = per_area.join("\n"),
        catalog = game_catalog_text(profile.age),
        worlds_meta = worlds_meta.join("\n"),
    )
}

/// Turns the model's answer into a suggestion. Unknown areas and game ids
/// are dropped; `None` when nothing usable remains.
fn parse_ai_adventure(raw: Value, student: &Student, interests: &[String]) -> Option<AdventureSuggestion> {
    let parsed: AiAdventure = match serde_json::from_value(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "LLM adventure response has an unexpected shape");
            return None;
        }
    };

    let worlds: Vec<AdventureWorld> = parsed
        .worlds
        .into_iter()
        .filter(|w| DeficitArea::parse(&w.deficit_area).is_some())
        .map(|w| AdventureWorld {
            deficit_area: w.deficit_area,
            world_number: w.world_number,
            world_name: w.world_name,
            color: w.color,
            game_ids: w
                .game_ids
                .into_iter()
                .filter(|id| games::get_game(id).is_some())
                .collect(),
        })
        .collect();
    if worlds.is_empty() {
        warn!("LLM returned no usable worlds");
        return None;
    }

    let default_theme = AdventureThemeConfig::default();
    let theme_config = AdventureThemeConfig {
        primary_interest: parsed
            .theme_config
            .primary_interest
            .unwrap_or_else(|| interests.first().map(|i| i.to_lowercase()).unwrap_or_default()),
        color_palette: parsed.theme_config.color_palette.unwrap_or(default_theme.color_palette),
        decoration_style: parsed
            .theme_config
            .decoration_style
            .unwrap_or(default_theme.decoration_style),
    };

    let reasoning = if parsed.reasoning.is_empty() {
        vec![format!("AI generated adventure map for {}", student.name)]
    } else {
        parsed.reasoning
    };

    Some(AdventureSuggestion {
        suggested_worlds: worlds,
        reasoning,
        theme_config,
        source: SuggestionSource::Ai,
    })
}

pub async fn suggest_ai(llm: &LlmProvider, student: &Student, profile: &SuggestProfile) -> Option<AdventureSuggestion> {
    if !llm.is_ready() {
        return None;
    }
    let prompt = adventure_prompt(student, profile);
    let raw = match llm
        .complete_json(JsonRequest {
            tier: ModelTier::Adventure,
            system: Some(ADVENTURE_SYSTEM_PROMPT),
            prompt: &prompt,
            temperature: 0.35,
            max_tokens: 3500,
        })
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, student_id = %student.id, "LLM adventure suggestion failed");
            return None;
        }
    };

    let suggestion = parse_ai_adventure(raw, student, &profile.interests)?;
    info!(
        student_id = %student.id,
        worlds = suggestion.suggested_worlds.len(),
        "LLM generated adventure map"
    );
    Some(suggestion)
}

pub async fn suggest(
    pool: &SqlitePool,
    llm: &LlmProvider,
    request: &SuggestRequest,
) -> Result<AdventureSuggestion, ServiceError> {
    let student = operations::get_student(pool, &request.student_id)
        .await?
        .ok_or(ServiceError::NotFound("Student not found"))?;
    let profile = SuggestProfile::resolve(&student, request)?;

    if let Some(suggestion) = suggest_ai(llm, &student, &profile).await {
        return Ok(suggestion);
    }
    Ok(suggest_rule_based(&profile))
}

// ========== Persistence ==========

pub async fn create(pool: &SqlitePool, request: CreateAdventure) -> Result<AdventureMap, ServiceError> {
    if operations::get_student(pool, &request.student_id).await?.is_none() {
        return Err(ServiceError::NotFound("Student not found"));
    }

    let now = now_iso();
    let map = AdventureMap {
        id: Uuid::new_v4().to_string(),
        student_id: request.student_id,
        created_by: request.created_by,
        title: request.title,
        worlds: request.worlds,
        theme_config: request.theme_config,
        status: "active".to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    operations::create_adventure(pool, &map).await?;
    info!(adventure_id = %map.id, student_id = %map.student_id, worlds = map.worlds.len(), "adventure created");
    Ok(map)
}

pub async fn update(pool: &SqlitePool, adventure_id: &str, request: UpdateAdventure) -> Result<AdventureMap, ServiceError> {
    let mut map = operations::get_adventure(pool, adventure_id)
        .await?
        .ok_or(ServiceError::NotFound("Adventure not found"))?;

    if let Some(title) = request.title {
        map.title = title;
    }
    if let Some(worlds) = request.worlds {
        map.worlds = worlds;
    }
    if let Some(theme) = request.theme_config {
        map.theme_config = theme;
    }
    if let Some(status) = request.status {
        map.status = status;
    }
    map.updated_at = now_iso();

    operations::update_adventure(pool, &map).await?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(kind: DyslexiaType, severity: SeverityLevel, age: i64, diag: serde_json::Value) -> SuggestProfile {
        let map = diag.as_object().cloned().unwrap_or_default();
        SuggestProfile {
            age,
            dyslexia_type: kind,
            severity,
            diagnostic: Diagnostic::from_json(&map),
            interests: vec![],
        }
    }

    #[test]
    fn test_theme_matches_secondary_interest() {
        let theme = theme_for_interests(&["Reading".to_string(), "Deep Ocean".to_string()]);
        assert_eq!(theme.primary_interest, "reading");
        assert_eq!(theme.color_palette, "aquatic");
        assert_eq!(theme.decoration_style, "underwater");

        let none = theme_for_interests(&[]);
        assert_eq!(none, AdventureThemeConfig::default());

        let unmatched = theme_for_interests(&["Chess".to_string()]);
        assert_eq!(unmatched.primary_interest, "chess");
        assert_eq!(unmatched.color_palette, "default");
    }

    #[test]
    fn test_select_areas_keeps_minimum_two() {
        let diag = json!({
            "phonological_severity": 1,
            "rapid_naming_severity": 1,
            "working_memory_severity": 1,
            "visual_processing_severity": 1,
            "reading_fluency_severity": 1,
            "comprehension_severity": 1
        });
        let p = profile(DyslexiaType::Phonological, SeverityLevel::Mild, 8, diag);
        let areas = select_areas(p.dyslexia_type, &p.diagnostic);
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0], DeficitArea::PhonologicalAwareness);
    }

    #[test]
    fn test_rule_based_respects_severity_cap_and_exclusions() {
        let p = profile(DyslexiaType::Mixed, SeverityLevel::Severe, 12, json!({}));
        let suggestion = suggest_rule_based(&p);
        assert_eq!(suggestion.source, SuggestionSource::Rules);
        assert!(!suggestion.suggested_worlds.is_empty());
        assert!(suggestion.suggested_worlds.len() <= MAX_WORLDS);
        for world in &suggestion.suggested_worlds {
            assert!(world.game_ids.len() <= 3);
            for id in &world.game_ids {
                assert!(!SeverityLevel::Severe.excludes(id));
                let game = games::get_game(id).unwrap();
                assert!(game.suits_age(12));
                assert_eq!(game.deficit_area.as_str(), world.deficit_area);
            }
        }
        assert!(suggestion.reasoning[0].starts_with("Selected "));
    }

    #[test]
    fn test_world_numbers_follow_selection_order() {
        let p = profile(DyslexiaType::Unspecified, SeverityLevel::Mild, 9, json!({}));
        let suggestion = suggest_rule_based(&p);
        for (i, world) in suggestion.suggested_worlds.iter().enumerate() {
            assert!(world.world_number >= i as i64 + 1);
            let area = DeficitArea::parse(&world.deficit_area).unwrap();
            assert_eq!(world.world_name, world_name(area));
            assert_eq!(world.color, world_color(area));
        }
    }

    #[test]
    fn test_games_for_area_filters() {
        let all = games_for_area(DeficitArea::WorkingMemory, 12, Some(SeverityLevel::Mild));
        let severe = games_for_area(DeficitArea::WorkingMemory, 12, Some(SeverityLevel::Severe));
        assert!(severe.len() <= all.len());
        assert!(severe.iter().all(|g| g.id != "dual_task_challenge" && g.id != "backward_spell"));
        assert!(all.iter().all(|g| g.age_range_min <= 12 && 12 <= g.age_range_max));
    }

    #[test]
    fn test_parse_ai_adventure_drops_unknown_ids() {
        let student = Student::new("s1".into(), "Mia".into(), 9, 3, now_iso());
        let raw = json!({
            "worlds": [
                {"deficit_area": "phonological_awareness", "world_number": 1, "world_name": "Sound Kingdom",
                 "color": "#6366f1", "game_ids": ["sound_safari", "made_up_game"]},
                {"deficit_area": "juggling", "world_number": 2, "world_name": "X", "color": "#000", "game_ids": []}
            ],
            "theme_config": {"color_palette": "aquatic"}
        });
        let suggestion = parse_ai_adventure(raw, &student, &["Ocean".to_string()]).unwrap();
        assert_eq!(suggestion.source, SuggestionSource::Ai);
        assert_eq!(suggestion.suggested_worlds.len(), 1);
        assert_eq!(suggestion.suggested_worlds[0].game_ids, vec!["sound_safari".to_string()]);
        assert_eq!(suggestion.theme_config.primary_interest, "ocean");
        assert_eq!(suggestion.theme_config.decoration_style, "nature");
        assert_eq!(suggestion.reasoning, vec!["AI generated adventure map for Mia".to_string()]);

        assert!(parse_ai_adventure(json!({"worlds": []}), &student, &[]).is_none());
        assert!(parse_ai_adventure(json!({"worlds": "nope"}), &student, &[]).is_none());
    }

    #[test]
    fn test_prompt_mentions_catalog_and_unset_severity() {
        let student = Student::new("s1".into(), "Mia".into(), 9, 3, now_iso());
        let p = profile(DyslexiaType::Visual, SeverityLevel::Moderate, 7, json!({}));
        let prompt = adventure_prompt(&student, &p);
        assert!(prompt.contains("phonological_awareness: not set/5"));
        assert!(prompt.contains("[sound_safari]"));
        assert!(prompt.contains("Dyslexia type: visual"));
        assert!(prompt.contains("Age: 7 (early_elementary)"));
        assert!(prompt.contains(r##""color": "#6366f1""##));
        assert!(prompt.trim_end().ends_with('}'));
    }
}
