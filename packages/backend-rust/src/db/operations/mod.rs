pub mod adventures;
pub mod sessions;
pub mod stats;
pub mod students;

pub use adventures::*;
pub use sessions::*;
pub use stats::*;
pub use students::*;
