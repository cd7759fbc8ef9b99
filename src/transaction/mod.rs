// ============================================================================
// Commit Support
// ============================================================================
//
// A session commit applies its staged operations straight to storage and
// records each one in an undo log; on failure the log is replayed
// backwards so the batch has no effect.
//
// ============================================================================

pub mod change;

pub use change::{Change, UndoLog};
