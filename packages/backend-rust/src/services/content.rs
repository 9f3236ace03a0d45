//! Exercise item generation: word-bank templates, optionally fed by an
//! LLM-generated word bank.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::db::operations::ExerciseItem;
use crate::services::llm_provider::{JsonRequest, LlmProvider, ModelTier};

const SIMPLE_WORDS: &[&str] = &[
    "cat", "dog", "sun", "hat", "bed", "cup", "red", "big", "run", "fun", "map", "top", "pig", "net",
    "box", "fox", "hen", "jam", "log", "nut",
];

const MEDIUM_WORDS: &[&str] = &[
    "tree", "jump", "star", "fish", "bird", "frog", "lamp", "milk", "nest", "ring", "ship", "wind",
    "cake", "game", "home", "lake", "moon", "rain", "snow", "wolf",
];

const HARD_WORDS: &[&str] = &[
    "bridge", "castle", "dragon", "forest", "garden", "island", "jungle", "kitten", "monkey",
    "planet", "rabbit", "stream", "turtle", "winter", "basket", "butter", "candle", "dinner",
    "finger", "hammer",
];

const ADVANCED_WORDS: &[&str] = &[
    "adventure", "beautiful", "celebrate", "dangerous", "elephant", "furniture", "generous",
    "happiness", "important", "knowledge", "landscape", "mountain", "necessary", "operation",
    "passenger", "question", "remember", "strength", "together", "umbrella",
];

const SIGHT_WORDS: &[&str] = &[
    "the", "and", "was", "for", "are", "but", "not", "you", "all", "can", "her", "one", "our", "out",
    "day", "had", "has", "his", "how", "its", "may", "new", "now", "old", "see", "way", "who", "did",
    "get", "let", "say", "she", "too", "use", "man", "boy", "own", "any", "big",
];

const RHYME_PAIRS: &[(&str, &str)] = &[
    ("cat", "hat"),
    ("dog", "log"),
    ("sun", "fun"),
    ("bed", "red"),
    ("map", "cap"),
    ("pig", "wig"),
    ("net", "pet"),
    ("fox", "box"),
    ("cake", "lake"),
    ("moon", "spoon"),
    ("rain", "train"),
    ("star", "car"),
    ("tree", "bee"),
    ("fish", "dish"),
    ("ring", "king"),
    ("boat", "coat"),
    ("light", "night"),
    ("bear", "chair"),
    ("house", "mouse"),
    ("snake", "cake"),
];

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
const MIN_AI_WORDS: usize = 4;
const AI_WORD_BANK_SIZE: usize = 20;

const SYSTEM_LIGHT: &str = "You are a helpful assistant that generates short educational content for \
children. Always respond in valid JSON only, no markdown, no extra text.";

/// Built-in word bank for a difficulty level
pub fn word_bank(difficulty: i32) -> &'static [&'static str] {
    match difficulty {
        ..=2 => SIMPLE_WORDS,
        3..=4 => MEDIUM_WORDS,
        5..=7 => HARD_WORDS,
        _ => ADVANCED_WORDS,
    }
}

/// A supplier of words for the word-based templates
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn word_bank(&self, difficulty: i32, count: usize) -> Option<Vec<String>>;
}

pub struct TemplateWordBank;

#[async_trait]
impl ContentSource for TemplateWordBank {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn word_bank(&self, difficulty: i32, _count: usize) -> Option<Vec<String>> {
        Some(word_bank(difficulty).iter().map(|w| w.to_string()).collect())
    }
}

/// Asks the configured LLM for an age-appropriate word list
pub struct LlmWordBank {
    llm: LlmProvider,
}

impl LlmWordBank {
    pub fn new(llm: LlmProvider) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentSource for LlmWordBank {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn word_bank(&self, difficulty: i32, count: usize) -> Option<Vec<String>> {
        if !self.llm.is_ready() {
            return None;
        }
        let prompt = word_bank_prompt(difficulty, count);
        let request = JsonRequest {
            tier: ModelTier::Light,
            system: Some(SYSTEM_LIGHT),
            prompt: &prompt,
            temperature: 0.7,
            max_tokens: 300,
        };
        match self.llm.complete_json(request).await {
            Ok(value) => parse_word_list(&value),
            Err(e) => {
                warn!(error = %e, "AI word bank failed, using templates");
                None
            }
        }
    }
}

fn word_bank_prompt(difficulty: i32, count: usize) -> String {
    let age = match difficulty {
        ..=3 => "6-8",
        4..=6 => "8-11",
        _ => "11-13",
    };
    format!(
        "Generate a list of {count} English words suitable for a child aged {age} \
         (reading difficulty {difficulty}/10).\n\
         Shorter words for lower difficulty, longer for higher.\n\n\
         Respond with a JSON object holding an array of strings:\n\
         {{\"words\": [\"word1\", \"word2\", ...]}}"
    )
}

/// Accepts either a bare array or `{"words": [...]}`; keeps single
/// lowercase alphabetic words only.
fn parse_word_list(value: &Value) -> Option<Vec<String>> {
    let list = value.as_array().or_else(|| value.get("words")?.as_array())?;
    let mut words: Vec<String> = Vec::with_capacity(list.len());
    for item in list {
        let word = item.as_str()?.trim().to_lowercase();
        if !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic()) && !words.contains(&word) {
            words.push(word);
        }
    }
    (words.len() >= MIN_AI_WORDS).then_some(words)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    SoundSafari,
    RhymeTime,
    SpeedNamer,
    SightWordSprint,
    LetterCount,
}

impl Template {
    pub fn for_game(game_id: &str) -> Self {
        match game_id {
            "sound_safari" => Self::SoundSafari,
            "rhyme_time_race" => Self::RhymeTime,
            "speed_namer" => Self::SpeedNamer,
            "sight_word_sprint" => Self::SightWordSprint,
            _ => Self::LetterCount,
        }
    }

    fn uses_word_bank(&self) -> bool {
        matches!(self, Self::SoundSafari | Self::LetterCount)
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        difficulty: i32,
        count: usize,
        words: &[String],
        rng: &mut R,
    ) -> Vec<ExerciseItem> {
        match self {
            Self::SoundSafari => sound_safari(difficulty, count, words, rng),
            Self::RhymeTime => rhyme_time(difficulty, count, rng),
            Self::SpeedNamer => speed_namer(difficulty, count, rng),
            Self::SightWordSprint => sight_word_sprint(difficulty, count, rng),
            Self::LetterCount => letter_count(count, words, rng),
        }
    }
}

#[derive(Clone)]
pub struct ContentGenerator {
    sources: Vec<Arc<dyn ContentSource>>,
}

impl ContentGenerator {
    pub fn new(llm: LlmProvider) -> Self {
        Self {
            sources: vec![Arc::new(LlmWordBank::new(llm)), Arc::new(TemplateWordBank)],
        }
    }

    pub fn templates_only() -> Self {
        Self {
            sources: vec![Arc::new(TemplateWordBank)],
        }
    }

    pub async fn generate_items(&self, game_id: &str, difficulty: i32, count: usize) -> Vec<ExerciseItem> {
        let template = Template::for_game(game_id);

        let mut words: Vec<String> = Vec::new();
        let mut from_llm = false;
        if template.uses_word_bank() {
            for source in &self.sources {
                if let Some(bank) = source.word_bank(difficulty, AI_WORD_BANK_SIZE).await {
                    from_llm = source.name() != "template";
                    words = bank;
                    break;
                }
            }
        }
        if words.is_empty() {
            words = word_bank(difficulty).iter().map(|w| w.to_string()).collect();
        }

        let mut items = template.build(difficulty, count, &words, &mut rand::rng());
        if from_llm {
            debug!(game_id, count = items.len(), "items built from AI word bank");
            for item in &mut items {
                item.extra_data.insert("ai_generated".to_string(), Value::Bool(true));
            }
        }
        items
    }
}

fn item(
    index: usize,
    question: String,
    options: Vec<String>,
    correct_answer: String,
    hint: Option<String>,
    item_type: &str,
    extra_data: Map<String, Value>,
) -> ExerciseItem {
    ExerciseItem {
        index: index as i64,
        question,
        options,
        correct_answer,
        hint,
        item_type: item_type.to_string(),
        extra_data,
    }
}

fn extra(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn sound_safari<R: Rng + ?Sized>(difficulty: i32, count: usize, words: &[String], rng: &mut R) -> Vec<ExerciseItem> {
    let positions: &[&str] = if difficulty <= 3 {
        &["beginning", "ending"]
    } else {
        &["beginning", "middle", "ending"]
    };

    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let Some(word) = words.choose(rng) else { break };
        let position = positions.choose(rng).copied().unwrap_or("beginning");
        let chars: Vec<char> = word.chars().collect();
        let sound = match position {
            "ending" => chars.last(),
            "middle" if chars.len() > 2 => chars.get(chars.len() / 2),
            _ => chars.first(),
        }
        .copied()
        .unwrap_or_default();

        let others: Vec<&String> = words.iter().filter(|w| *w != word).collect();
        let mut options: Vec<String> = others.choose_multiple(rng, 3).map(|w| w.to_string()).collect();
        options.push(word.clone());
        options.shuffle(rng);

        items.push(item(
            i,
            format!("Which word has the sound '{sound}' at the {position}?"),
            options,
            word.clone(),
            Some(format!("The sound '{sound}' is at the {position} of the word.")),
            "multiple_choice",
            Map::new(),
        ));
    }
    items
}

fn rhyme_time<R: Rng + ?Sized>(difficulty: i32, count: usize, rng: &mut R) -> Vec<ExerciseItem> {
    let pair_count = (5 + difficulty.max(0) as usize * 2).min(RHYME_PAIRS.len());
    let pairs = &RHYME_PAIRS[..pair_count];
    let time_limit = (10 - difficulty).max(3);
    let bank = word_bank(difficulty);

    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let Some(&(word, rhyme)) = pairs.choose(rng) else { break };

        let mut pool: Vec<&str> = pairs.iter().map(|(_, b)| *b).filter(|b| *b != rhyme).collect();
        pool.extend(bank.choose_multiple(rng, 2).copied());
        pool.retain(|w| *w != rhyme && *w != word);
        pool.sort_unstable();
        pool.dedup();

        let mut options: Vec<String> = pool.choose_multiple(rng, 3).map(|w| w.to_string()).collect();
        options.push(rhyme.to_string());
        options.shuffle(rng);

        items.push(item(
            i,
            format!("Which word rhymes with '{word}'?"),
            options,
            rhyme.to_string(),
            Some(format!("Think about the ending sound of '{word}'.")),
            "speed_round",
            extra(json!({"time_limit_seconds": time_limit, "target_word": word})),
        ));
    }
    items
}

fn speed_namer<R: Rng + ?Sized>(difficulty: i32, count: usize, rng: &mut R) -> Vec<ExerciseItem> {
    let letters: Vec<String> = LETTERS.chars().map(|c| c.to_ascii_uppercase().to_string()).collect();
    let numbers: Vec<String> = (1..=20).map(|n| n.to_string()).collect();
    let colors: Vec<String> = ["red", "blue", "green", "yellow", "orange", "purple", "pink", "brown"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let sequences = [("letters", letters), ("numbers", numbers), ("colors", colors)];

    let time_limit = (8 - difficulty).max(2);
    let Some((category, pool)) = sequences.choose(rng) else {
        return Vec::new();
    };

    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let Some(target) = pool.choose(rng) else { break };
        let others: Vec<&String> = pool.iter().filter(|x| *x != target).collect();
        let mut options: Vec<String> = others.choose_multiple(rng, 3).map(|x| x.to_string()).collect();
        options.push(target.clone());
        options.shuffle(rng);

        items.push(item(
            i,
            format!("Quickly identify: {target}"),
            options,
            target.clone(),
            None,
            "speed_round",
            extra(json!({
                "time_limit_seconds": time_limit,
                "display_item": target,
                "category": category,
            })),
        ));
    }
    items
}

/// Same word with one letter replaced by a different letter
fn misspell<R: Rng + ?Sized>(word: &str, rng: &mut R) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    if chars.len() < 2 {
        return format!("{word}{word}");
    }
    let idx = rng.random_range(0..chars.len());
    let current = chars[idx];
    let replacements: Vec<char> = LETTERS.chars().filter(|c| *c != current).collect();
    if let Some(c) = replacements.choose(rng) {
        chars[idx] = *c;
    }
    chars.into_iter().collect()
}

fn sight_word_sprint<R: Rng + ?Sized>(difficulty: i32, count: usize, rng: &mut R) -> Vec<ExerciseItem> {
    let word_count = (10 + difficulty.max(0) as usize * 3).min(SIGHT_WORDS.len());
    let words = &SIGHT_WORDS[..word_count];
    let time_limit = (6 - difficulty / 2).max(2);

    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let Some(&word) = words.choose(rng) else { break };

        let mut options = vec![word.to_string()];
        let mut attempts = 0;
        while options.len() < 4 && attempts < 20 {
            let candidate = misspell(word, rng);
            if !options.contains(&candidate) {
                options.push(candidate);
            }
            attempts += 1;
        }
        options.shuffle(rng);

        items.push(item(
            i,
            "Which is the correct spelling?".to_string(),
            options,
            word.to_string(),
            None,
            "speed_round",
            extra(json!({"time_limit_seconds": time_limit, "display_item": word})),
        ));
    }
    items
}

fn letter_count<R: Rng + ?Sized>(count: usize, words: &[String], rng: &mut R) -> Vec<ExerciseItem> {
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let Some(word) = words.choose(rng) else { break };
        let len = word.chars().count();
        items.push(item(
            i,
            format!("How many letters are in the word '{word}'?"),
            vec![
                len.saturating_sub(1).to_string(),
                len.to_string(),
                (len + 1).to_string(),
                (len + 2).to_string(),
            ],
            len.to_string(),
            None,
            "multiple_choice",
            Map::new(),
        ));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bank(difficulty: i32) -> Vec<String> {
        word_bank(difficulty).iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_word_bank_tiers() {
        assert_eq!(word_bank(1), SIMPLE_WORDS);
        assert_eq!(word_bank(4), MEDIUM_WORDS);
        assert_eq!(word_bank(7), HARD_WORDS);
        assert_eq!(word_bank(10), ADVANCED_WORDS);
    }

    #[test]
    fn test_every_item_contains_its_answer() {
        let mut rng = StdRng::seed_from_u64(7);
        for template in [
            Template::SoundSafari,
            Template::RhymeTime,
            Template::SpeedNamer,
            Template::SightWordSprint,
            Template::LetterCount,
        ] {
            for difficulty in [1, 5, 10] {
                let items = template.build(difficulty, 12, &bank(difficulty), &mut rng);
                assert_eq!(items.len(), 12);
                for (i, it) in items.iter().enumerate() {
                    assert_eq!(it.index, i as i64);
                    assert!(it.options.contains(&it.correct_answer), "{template:?} {it:?}");
                    assert_eq!(it.options.len(), 4, "{template:?} {it:?}");
                }
            }
        }
    }

    #[test]
    fn test_sight_word_distractors_are_misspellings() {
        let mut rng = StdRng::seed_from_u64(3);
        for it in sight_word_sprint(2, 20, &mut rng) {
            let wrong: Vec<_> = it.options.iter().filter(|o| **o != it.correct_answer).collect();
            assert_eq!(wrong.len(), 3);
            for w in wrong {
                assert_eq!(w.len(), it.correct_answer.len());
            }
        }
    }

    #[test]
    fn test_rhyme_time_extra_data() {
        let mut rng = StdRng::seed_from_u64(11);
        let items = rhyme_time(2, 3, &mut rng);
        for it in items {
            assert_eq!(it.item_type, "speed_round");
            assert_eq!(it.extra_data["time_limit_seconds"], 8);
            assert!(it.question.contains(it.extra_data["target_word"].as_str().unwrap()));
        }
    }

    #[test]
    fn test_parse_word_list() {
        let words = parse_word_list(&json!({"words": ["Apple", "tree", "tree", "rocket", "moon"]})).unwrap();
        assert_eq!(words, vec!["apple", "tree", "rocket", "moon"]);
        assert!(parse_word_list(&json!(["one", "two"])).is_none());
        assert!(parse_word_list(&json!({"other": 1})).is_none());
    }

    #[tokio::test]
    async fn test_generator_falls_back_to_templates() {
        let generator = ContentGenerator::templates_only();
        let items = generator.generate_items("unknown_game", 3, 10).await;
        assert_eq!(items.len(), 10);
        assert!(items.iter().all(|i| i.question.starts_with("How many letters")));
        assert!(items.iter().all(|i| !i.extra_data.contains_key("ai_generated")));
    }
}
