//! Compile-time geometry and type configuration, mirroring the way `disk_driver`
//! centralizes disk geometry constants in `DiskConst`.
//!
//! Swap `Key`/`Value`/`Offset` here (and keep `ENTRY_SIZE`/`MAX_ENTRIES` in sync
//! with your target's RAM budget) to retune the store for a different device.

/// Record key. Any value in range is a legal key.
pub type Key = u16;

/// Record value.
pub type Value = i32;

/// Byte offset into the medium.
pub type Offset = u32;

/// Width of one on-medium record: key bytes followed by value bytes.
pub const ENTRY_SIZE: usize = std::mem::size_of::<Key>() + std::mem::size_of::<Value>();

/// Maximum number of distinct keys the in-RAM directory can track.
pub const MAX_ENTRIES: usize = 20;

/// Bytes of metadata header at the start of each area.
pub const METADATA_SIZE: u32 = 2;

/// Value of an erased NVRAM byte.
pub const ERASED_BYTE: u8 = 0xFF;

/// Flag value marking that an erase of the *other* area has started.
pub const ERASE_STARTED: u8 = 0xE2;

/// Flag value marking that an erase of the *other* area has finished.
pub const ERASE_FINISHED: u8 = 0x3E;

/// The `(key, value)` pair whose encoding is bit-for-bit indistinguishable from
/// an erased block; rejected by the façade rather than silently corrupting the
/// directory. See `CoreError::ReservedValue`.
pub const RESERVED_KEY: Key = Key::MAX;
pub const RESERVED_VALUE: Value = -1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_size_matches_default_widths() {
        assert_eq!(ENTRY_SIZE, 6);
    }

    #[test]
    fn reserved_pair_encodes_to_all_erased_bytes() {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[..2].copy_from_slice(&RESERVED_KEY.to_le_bytes());
        buf[2..].copy_from_slice(&RESERVED_VALUE.to_le_bytes());
        assert!(buf.iter().all(|&b| b == ERASED_BYTE));
    }
}
