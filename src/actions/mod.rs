//! File actions for confirmed duplicate groups.
//!
//! The cleanup module relocates or deletes the redundant members of each
//! group, always preserving the first-discovered file.

pub mod cleanup;

pub use cleanup::{
    relocate_duplicates, remove_duplicates, unique_destination, CleanupOutcome,
};
