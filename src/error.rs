use nvram_driver::NvramError;
use thiserror::Error;

/// Everything that can go wrong talking to this store.
///
/// There is deliberately no `NotStarted` variant: a [`crate::Store`] only exists
/// once `init` has succeeded, so "not started" is a type-system fact rather than
/// a runtime error here.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("key does not exist")]
    NotExist,

    #[error("NVRAM driver error: {0}")]
    Medium(#[from] NvramError),

    #[error("directory is full, no space for a new key")]
    NoSpace,

    #[error("offset {offset} + entry size {entry_size} exceeds medium size {medium_size}")]
    WrongOffset {
        offset: u32,
        entry_size: u32,
        medium_size: u32,
    },

    #[error("invalid geometry: size={size} reserved={reserved} max_entries={max_entries}")]
    InvalidGeometry {
        size: u32,
        reserved: u32,
        max_entries: usize,
    },

    #[error("refusing to store a (key, value) pair indistinguishable from an erased block")]
    ReservedValue,
}
