//! # eyeradar-algo - adaptive practice algorithms
//!
//! Pure Rust algorithms behind the EyeRadar exercise service:
//!
//! - **Difficulty engine** - next level (1-10) from age, severity and recent accuracy
//! - **Session sizing** - item count, time limits, hints and distractors per level
//! - **Practice ranking** - which deficit area to practise next
//!
//! ## Module layout
//!
//! - [`difficulty`] - cold start, weighted accuracy, trend, streak overrides
//! - [`recommend`] - area prioritisation and difficulty preview
//! - [`sanitize`] - input guards for values read from storage
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use eyeradar_algo::{compute_difficulty, session_parameters};
//!
//! // eight-year-old, neutral severity, no history yet
//! let level = compute_difficulty(8, 3, 1, &[]);
//! assert_eq!(level, 3);
//!
//! let params = session_parameters(level);
//! assert_eq!(params.item_count, 14);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod difficulty;
pub mod recommend;
pub mod sanitize;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use difficulty::{
    analyze_trend, base_level_for_age, compute_difficulty, session_parameters,
    severity_adjustment, weighted_accuracy,
};

pub use recommend::{area_priority, difficulty_preview, prioritize_areas};
