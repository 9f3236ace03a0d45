//! Exercise game catalog.

use eyeradar_algo::DeficitArea;
use serde::Serialize;

/// How the frontend renders a game
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    MultipleChoice,
    GridMemory,
    SequenceTap,
    TextInput,
    Sorting,
    SpeedRound,
    WordBuilding,
    TimedReading,
    SpotTarget,
    FillBlank,
    Tracking,
    PatternMatch,
    DualTask,
    YesNo,
    VoiceInput,
    ImageMatch,
    GridNaming,
    SoundMatching,
    WordSoundMatch,
    RapidNaming,
    MemoryRecall,
    ReadAloud,
    WordImageMatch,
    CastleBoss,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub deficit_area: DeficitArea,
    pub game_type: GameType,
    pub age_range_min: i64,
    pub age_range_max: i64,
    pub mechanics: &'static str,
    pub instructions: &'static str,
    pub icon: &'static str,
    pub difficulty_levels: i64,
}

impl GameDefinition {
    pub fn suits_age(&self, age: i64) -> bool {
        self.age_range_min <= age && age <= self.age_range_max
    }
}

static GAMES: &[GameDefinition] = &[
    GameDefinition {
        id: "sound_safari",
        name: "Sound Safari",
        description: "Identify beginning, ending, or middle sounds in words. Match sounds to fun animals and objects!",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::MultipleChoice,
        age_range_min: 4,
        age_range_max: 8,
        mechanics: "Match sounds to animals/objects",
        instructions: "Listen to the target sound, then pick the word that contains that sound in the correct position.",
        icon: "🦁",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "rhyme_time_race",
        name: "Rhyme Time Race",
        description: "Match rhyming word pairs before the timer runs out! Build phonological connections through fun speed challenges.",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::SpeedRound,
        age_range_min: 5,
        age_range_max: 10,
        mechanics: "Speed matching with visual cards",
        instructions: "Find the word that rhymes with the target word as fast as you can! Beat the clock!",
        icon: "⏰",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "syllable_stomper",
        name: "Syllable Stomper",
        description: "Count syllables in words using rhythm-based activities. Tap along to learn word patterns!",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::SequenceTap,
        age_range_min: 4,
        age_range_max: 9,
        mechanics: "Kinesthetic input, rhythm-based",
        instructions: "Look at the word and tap the correct number of beats (syllables). Tap the buttons in rhythm!",
        icon: "🥁",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "phoneme_blender",
        name: "Phoneme Blender",
        description: "Blend individual sounds together to build complete words. Master the building blocks of reading!",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::WordBuilding,
        age_range_min: 6,
        age_range_max: 12,
        mechanics: "Drag sounds to build words",
        instructions: "See the individual sounds. Tap them in the right order to blend them into a word!",
        icon: "🧩",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "sound_swap",
        name: "Sound Swap",
        description: "Replace sounds in words to create new words. A fun phoneme manipulation puzzle!",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::WordBuilding,
        age_range_min: 7,
        age_range_max: 13,
        mechanics: "Manipulation puzzles",
        instructions: "Change the specified sound in the word to make a new word. Tap the letters to swap!",
        icon: "🔄",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "sound_matching",
        name: "Sound Matching",
        description: "Listen to two words and decide if they rhyme or share the same ending sound. Train your ear for phonological patterns!",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::SoundMatching,
        age_range_min: 4,
        age_range_max: 10,
        mechanics: "Binary auditory discrimination with TTS",
        instructions: "Listen to the two words. Do they sound the same at the end? Click Yes or No!",
        icon: "👂",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "word_sound_match",
        name: "Word-to-Sound Matching",
        description: "Find the word that sounds like the target! Pick the matching sound from three choices to sharpen phonological skills.",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::WordSoundMatch,
        age_range_min: 5,
        age_range_max: 11,
        mechanics: "Auditory matching with TTS and choices",
        instructions: "Look at the word on top and listen to it. Which of the three words below sounds the same? Tap to choose!",
        icon: "🔊",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "speed_namer",
        name: "Speed Namer",
        description: "Rapidly name sequences of letters, numbers, and colors to build automaticity.",
        deficit_area: DeficitArea::RapidNaming,
        game_type: GameType::SpeedRound,
        age_range_min: 6,
        age_range_max: 14,
        mechanics: "Timed naming with voice or tap",
        instructions: "Name each item as fast as you can! Select the correct answer before time runs out!",
        icon: "⚡",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "flash_card_frenzy",
        name: "Flash Card Frenzy",
        description: "Quick recognition of high-frequency words with progressively increasing speed.",
        deficit_area: DeficitArea::RapidNaming,
        game_type: GameType::SpeedRound,
        age_range_min: 7,
        age_range_max: 14,
        mechanics: "Progressive speed increase",
        instructions: "Read the word shown and quickly select its meaning. Speed increases as you go!",
        icon: "🃏",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "object_blitz",
        name: "Object Blitz",
        description: "Name common objects as fast as possible to strengthen visual-verbal connections.",
        deficit_area: DeficitArea::RapidNaming,
        game_type: GameType::SpeedRound,
        age_range_min: 5,
        age_range_max: 10,
        mechanics: "Visual recognition speed",
        instructions: "Look at the picture description and quickly select its name. Beat the clock!",
        icon: "🎯",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "letter_stream",
        name: "Letter Stream",
        description: "Identify target letters in a flowing stream of characters. Train your visual attention and naming speed!",
        deficit_area: DeficitArea::RapidNaming,
        game_type: GameType::SpotTarget,
        age_range_min: 6,
        age_range_max: 12,
        mechanics: "Visual attention + naming",
        instructions: "Watch the stream of letters and tap the target letter when you see it!",
        icon: "🌊",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "ran_grid",
        name: "RAN Grid Challenge",
        description: "Name a grid of images as fast and accurately as possible! Animals, colors, and objects test your rapid naming speed.",
        deficit_area: DeficitArea::RapidNaming,
        game_type: GameType::RapidNaming,
        age_range_min: 5,
        age_range_max: 12,
        mechanics: "Grid-based rapid naming with voice recording",
        instructions: "Press the microphone, then name every image in the grid from left to right, top to bottom, as fast as you can!",
        icon: "🐾",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "memory_matrix",
        name: "Memory Matrix",
        description: "Remember and recreate visual patterns on a grid. Strengthen your visual working memory!",
        deficit_area: DeficitArea::WorkingMemory,
        game_type: GameType::GridMemory,
        age_range_min: 6,
        age_range_max: 14,
        mechanics: "Grid-based visual memory",
        instructions: "Watch the pattern light up on the grid, then tap the squares to recreate it from memory!",
        icon: "🔲",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "sequence_keeper",
        name: "Sequence Keeper",
        description: "Remember and repeat sequences of items. Build your sequential memory skills!",
        deficit_area: DeficitArea::WorkingMemory,
        game_type: GameType::SequenceTap,
        age_range_min: 5,
        age_range_max: 12,
        mechanics: "Auditory/visual sequences",
        instructions: "Watch the sequence appear, then tap the numbers in the same order to repeat it!",
        icon: "🔢",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "backward_spell",
        name: "Backward Spell",
        description: "Spell words backwards to exercise verbal working memory. A brain-bending challenge!",
        deficit_area: DeficitArea::WorkingMemory,
        game_type: GameType::TextInput,
        age_range_min: 8,
        age_range_max: 14,
        mechanics: "Verbal working memory",
        instructions: "Read the word, then type it backwards. Think carefully!",
        icon: "🔙",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "story_recall",
        name: "Story Recall",
        description: "Remember details from short passages. Practice comprehension and memory together!",
        deficit_area: DeficitArea::WorkingMemory,
        game_type: GameType::TimedReading,
        age_range_min: 7,
        age_range_max: 14,
        mechanics: "Comprehension + memory",
        instructions: "Read the short story carefully. It will disappear! Then answer questions from memory.",
        icon: "📖",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "dual_task_challenge",
        name: "Dual Task Challenge",
        description: "Process information while remembering other details. Train your central executive function!",
        deficit_area: DeficitArea::WorkingMemory,
        game_type: GameType::DualTask,
        age_range_min: 9,
        age_range_max: 14,
        mechanics: "Central executive training",
        instructions: "Remember the word shown, then solve the math problem. You'll be asked about both!",
        icon: "🧠",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "memory_recall",
        name: "Memory Recall",
        description: "After playing exercises you'll see images. Can you remember which ones appeared earlier? Test your visual memory!",
        deficit_area: DeficitArea::WorkingMemory,
        game_type: GameType::MemoryRecall,
        age_range_min: 5,
        age_range_max: 12,
        mechanics: "Image recognition memory",
        instructions: "You'll see a grid of images. Some were shown to you before, some are new. Pick the ones you remember seeing (or the new ones, depending on the challenge)!",
        icon: "🧩",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "letter_detective",
        name: "Letter Detective",
        description: "Find hidden letters among visual distractors. Sharpen your visual discrimination!",
        deficit_area: DeficitArea::VisualProcessing,
        game_type: GameType::SpotTarget,
        age_range_min: 5,
        age_range_max: 10,
        mechanics: "Visual discrimination",
        instructions: "Find and tap the target letter hidden in the grid of letters!",
        icon: "🔍",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "tracking_trail",
        name: "Tracking Trail",
        description: "Follow moving targets along a path. Exercise your eye tracking skills!",
        deficit_area: DeficitArea::VisualProcessing,
        game_type: GameType::Tracking,
        age_range_min: 6,
        age_range_max: 12,
        mechanics: "Eye tracking exercises",
        instructions: "Follow the trail of directions and remember where you end up!",
        icon: "👁️",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "pattern_matcher",
        name: "Pattern Matcher",
        description: "Match visual patterns quickly and accurately. Build visual memory and discrimination!",
        deficit_area: DeficitArea::VisualProcessing,
        game_type: GameType::PatternMatch,
        age_range_min: 5,
        age_range_max: 12,
        mechanics: "Visual memory + discrimination",
        instructions: "Study the pattern shown, then pick the exact match from the options. Look carefully for differences!",
        icon: "🎨",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "mirror_image",
        name: "Mirror Image",
        description: "Identify reversed or rotated letters. Master letter orientation to avoid common reversals!",
        deficit_area: DeficitArea::VisualProcessing,
        game_type: GameType::SpotTarget,
        age_range_min: 6,
        age_range_max: 10,
        mechanics: "Orientation training",
        instructions: "Look at the letters shown. Tap the one that is written correctly (not mirrored)!",
        icon: "🪞",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "visual_closure",
        name: "Visual Closure",
        description: "Complete partial images and words. Strengthen your visual completion skills!",
        deficit_area: DeficitArea::VisualProcessing,
        game_type: GameType::FillBlank,
        age_range_min: 7,
        age_range_max: 12,
        mechanics: "Gestalt completion",
        instructions: "Look at the partial word with missing letters and figure out the complete word!",
        icon: "✨",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "phrase_flash",
        name: "Phrase Flash",
        description: "Read phrases quickly before they disappear! Build reading speed and confidence!",
        deficit_area: DeficitArea::ReadingFluency,
        game_type: GameType::TimedReading,
        age_range_min: 7,
        age_range_max: 14,
        mechanics: "Timed phrase reading",
        instructions: "A phrase will flash on screen briefly. Read it and then answer the question about it!",
        icon: "💨",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "word_ladder",
        name: "Word Ladder",
        description: "Build word chains by changing one letter at a time. Practice decoding and fluency!",
        deficit_area: DeficitArea::ReadingFluency,
        game_type: GameType::WordBuilding,
        age_range_min: 8,
        age_range_max: 14,
        mechanics: "Decoding + fluency",
        instructions: "Change one letter in the word to make a new word. Build a chain from start to finish!",
        icon: "🪜",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "repeated_reader",
        name: "Repeated Reader",
        description: "Practice reading passages multiple times for fluency gains. Track your improvement!",
        deficit_area: DeficitArea::ReadingFluency,
        game_type: GameType::TimedReading,
        age_range_min: 6,
        age_range_max: 14,
        mechanics: "Repeated reading protocol",
        instructions: "Read the passage, then answer comprehension questions. Try to improve your speed!",
        icon: "🔁",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "sight_word_sprint",
        name: "Sight Word Sprint",
        description: "Rapid recognition of high-frequency sight words. Build automatic word recognition!",
        deficit_area: DeficitArea::ReadingFluency,
        game_type: GameType::SpeedRound,
        age_range_min: 6,
        age_range_max: 12,
        mechanics: "Automaticity building",
        instructions: "Spot the correctly spelled sight word as fast as you can! Speed matters!",
        icon: "🏃",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "prosody_practice",
        name: "Prosody Practice",
        description: "Read with expression and rhythm. Learn to make reading sound natural and engaging!",
        deficit_area: DeficitArea::ReadingFluency,
        game_type: GameType::MultipleChoice,
        age_range_min: 8,
        age_range_max: 14,
        mechanics: "Audio modeling + practice",
        instructions: "Read the sentence with the correct expression based on the punctuation and meaning.",
        icon: "🎵",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "decoding_read_aloud",
        name: "Decoding Challenge",
        description: "Read words and pseudo-words aloud to practice decoding skills! Includes made-up words to test letter-sound knowledge.",
        deficit_area: DeficitArea::ReadingFluency,
        game_type: GameType::ReadAloud,
        age_range_min: 5,
        age_range_max: 12,
        mechanics: "Voice-based decoding practice with STT",
        instructions: "A word appears on screen. Press the microphone button, say the word out loud, then click to move on. Some words are made up, so try your best to sound them out!",
        icon: "🎤",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "question_quest",
        name: "Question Quest",
        description: "Answer questions about reading passages. Build your comprehension skills step by step!",
        deficit_area: DeficitArea::Comprehension,
        game_type: GameType::MultipleChoice,
        age_range_min: 7,
        age_range_max: 14,
        mechanics: "Multiple choice + free response",
        instructions: "Read the passage carefully, then answer the questions that follow.",
        icon: "❓",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "main_idea_hunter",
        name: "Main Idea Hunter",
        description: "Identify the central theme of passages. Learn to see the big picture in what you read!",
        deficit_area: DeficitArea::Comprehension,
        game_type: GameType::MultipleChoice,
        age_range_min: 8,
        age_range_max: 14,
        mechanics: "Summarization training",
        instructions: "Read the passage and identify the main idea from the options given.",
        icon: "🎯",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "inference_detective",
        name: "Inference Detective",
        description: "Draw conclusions from text clues. Become a master at reading between the lines!",
        deficit_area: DeficitArea::Comprehension,
        game_type: GameType::MultipleChoice,
        age_range_min: 9,
        age_range_max: 14,
        mechanics: "Critical thinking",
        instructions: "Read the passage and use clues from the text to answer what isn't directly stated.",
        icon: "🕵️",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "vocabulary_builder",
        name: "Vocabulary Builder",
        description: "Learn new words in context. Use clues from the sentence to figure out word meanings!",
        deficit_area: DeficitArea::Comprehension,
        game_type: GameType::FillBlank,
        age_range_min: 7,
        age_range_max: 14,
        mechanics: "Contextual vocabulary",
        instructions: "Read the sentence and use context clues to determine the meaning of the highlighted word.",
        icon: "📚",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "story_sequencer",
        name: "Story Sequencer",
        description: "Put story events in the correct order. Master narrative comprehension!",
        deficit_area: DeficitArea::Comprehension,
        game_type: GameType::Sorting,
        age_range_min: 6,
        age_range_max: 12,
        mechanics: "Narrative comprehension",
        instructions: "Read the story events and arrange them in the correct order by tapping them first to last.",
        icon: "📋",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "word_image_match",
        name: "Word-Image Match",
        description: "Match words to their pictures and pictures to their words! Build vocabulary and reading comprehension through visual connections.",
        deficit_area: DeficitArea::Comprehension,
        game_type: GameType::WordImageMatch,
        age_range_min: 4,
        age_range_max: 10,
        mechanics: "Bidirectional word-image association",
        instructions: "See the word? Pick the matching picture! See the picture? Pick the matching word! Connect what you read with what you see.",
        icon: "🖼️",
        difficulty_levels: 10,
    },
    GameDefinition {
        id: "castle_challenge",
        name: "Castle Boss Challenge",
        description: "Battle fearsome castle bosses! Defeat three bosses and answer questions between each fight. A reward level that tests your skills!",
        deficit_area: DeficitArea::PhonologicalAwareness,
        game_type: GameType::CastleBoss,
        age_range_min: 5,
        age_range_max: 14,
        mechanics: "Side-scrolling boss fight with quiz questions",
        instructions: "Use arrow keys to move and jump. Press X to shoot spells at the boss. Defeat the boss, then answer a question to advance!",
        icon: "🏰",
        difficulty_levels: 10,
    },
];

pub fn all_games() -> &'static [GameDefinition] {
    GAMES
}

pub fn get_game(game_id: &str) -> Option<&'static GameDefinition> {
    GAMES.iter().find(|g| g.id == game_id)
}

pub fn games_by_area(area: DeficitArea) -> Vec<&'static GameDefinition> {
    GAMES.iter().filter(|g| g.deficit_area == area).collect()
}

/// Games whose age range covers `age`, optionally limited to some areas
pub fn games_for_student(age: i64, areas: Option<&[DeficitArea]>) -> Vec<&'static GameDefinition> {
    GAMES
        .iter()
        .filter(|g| g.suits_age(age))
        .filter(|g| areas.map_or(true, |list| list.contains(&g.deficit_area)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<_> = all_games().iter().map(|g| g.id).collect();
        assert_eq!(ids.len(), all_games().len());
        assert_eq!(all_games().len(), 36);
    }

    #[test]
    fn test_every_area_has_games() {
        for area in DeficitArea::ALL {
            assert!(!games_by_area(area).is_empty(), "no games for {area}");
        }
    }

    #[test]
    fn test_age_ranges_are_ordered() {
        for game in all_games() {
            assert!(game.age_range_min <= game.age_range_max, "{}", game.id);
        }
    }

    #[test]
    fn test_games_for_student_filters_age_and_area() {
        let games = games_for_student(5, Some(&[DeficitArea::PhonologicalAwareness]));
        assert!(games.iter().any(|g| g.id == "sound_safari"));
        assert!(games
            .iter()
            .all(|g| g.suits_age(5) && g.deficit_area == DeficitArea::PhonologicalAwareness));
    }

    #[test]
    fn test_game_type_serializes_snake_case() {
        let game = get_game("castle_challenge").unwrap();
        let json = serde_json::to_value(game).unwrap();
        assert_eq!(json["game_type"], "castle_boss");
        assert_eq!(json["deficit_area"], "phonological_awareness");
    }
}
