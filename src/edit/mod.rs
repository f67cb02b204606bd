//! Edit orchestration: the tagged edit variants and the session that
//! serializes them onto the history.

pub mod action;
pub mod session;

pub use action::{apply_action, EditAction};
pub use session::{EditStatus, EditorSession};
