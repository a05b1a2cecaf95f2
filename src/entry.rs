//! Entry Codec: serializes/deserializes a `(Key, Value)` record to/from a
//! fixed-width byte block, and recognizes a fully-erased block.
//!
//! Records are encoded explicitly with `to_le_bytes`/`from_le_bytes` rather
//! than transmuted from a `#[repr(C)]` struct, so the on-medium layout never
//! depends on host byte order.

use nvram_driver::NvramDriver;

use crate::config::{ERASED_BYTE, ENTRY_SIZE};
use crate::error::CoreError;
use crate::{Key, Offset, Value};

/// Returns true iff every byte in `buf` is the erased-byte value. Doubles as the
/// "no record here" test, eliminating a separate presence bitmap.
pub fn is_block_erased(buf: &[u8]) -> bool {
    buf.iter().all(|&b| b == ERASED_BYTE)
}

fn check_bounds(offset: Offset, medium_size: u32) -> Result<(), CoreError> {
    if offset as u64 + ENTRY_SIZE as u64 > medium_size as u64 {
        return Err(CoreError::WrongOffset {
            offset,
            entry_size: ENTRY_SIZE as u32,
            medium_size,
        });
    }
    Ok(())
}

/// Reads the entry at `offset`. `Err(CoreError::NotExist)` means the slot is a
/// fully-erased block, not a driver failure.
pub fn read_entry<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    offset: Offset,
) -> Result<(Key, Value), CoreError> {
    check_bounds(offset, nvram.size())?;

    let mut block = [0u8; ENTRY_SIZE];
    nvram.read(&mut block, offset)?;

    if is_block_erased(&block) {
        return Err(CoreError::NotExist);
    }

    let key = Key::from_le_bytes(block[0..std::mem::size_of::<Key>()].try_into().unwrap());
    let value = Value::from_le_bytes(
        block[std::mem::size_of::<Key>()..ENTRY_SIZE]
            .try_into()
            .unwrap(),
    );
    Ok((key, value))
}

/// Writes `(key, value)` at `offset`. The caller must ensure `offset` is
/// pre-erased; the driver is free to reject the write otherwise.
pub fn write_entry<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    offset: Offset,
    key: Key,
    value: Value,
) -> Result<(), CoreError> {
    check_bounds(offset, nvram.size())?;

    let mut block = [0u8; ENTRY_SIZE];
    block[0..std::mem::size_of::<Key>()].copy_from_slice(&key.to_le_bytes());
    block[std::mem::size_of::<Key>()..ENTRY_SIZE].copy_from_slice(&value.to_le_bytes());

    nvram.write(&block, offset)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvram_driver::MemoryNvram;

    #[test]
    fn erased_block_detection() {
        assert!(is_block_erased(&[0xFF; 6]));
        assert!(!is_block_erased(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]));
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut nvram = MemoryNvram::new(64, 32);
        write_entry(&mut nvram, 2, 10, -500).unwrap();
        let (k, v) = read_entry(&mut nvram, 2).unwrap();
        assert_eq!((k, v), (10, -500));
    }

    #[test]
    fn unwritten_slot_reads_as_not_exist() {
        let mut nvram = MemoryNvram::new(64, 32);
        assert!(matches!(read_entry(&mut nvram, 0), Err(CoreError::NotExist)));
    }

    #[test]
    fn offset_past_medium_end_is_wrong_offset() {
        let mut nvram = MemoryNvram::new(8, 4);
        assert!(matches!(
            read_entry(&mut nvram, 7),
            Err(CoreError::WrongOffset { .. })
        ));
    }
}
