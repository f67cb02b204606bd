//! Edit history: the single source of truth for the displayed artifact.

pub mod store;
pub mod types;

pub use store::EditHistory;
pub use types::HistoryEntry;
