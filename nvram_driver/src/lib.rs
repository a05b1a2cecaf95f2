//! Host-side abstraction over a byte-erasable NVRAM medium.
//!
//! The core wear-leveling store never touches real flash/EEPROM directly; it is
//! generic over [`NvramDriver`]. This crate supplies that trait plus a handful of
//! reference implementations ([`MemoryNvram`], [`FileNvram`], [`FaultInjectingNvram`])
//! so the core is testable and demoable before real hardware is wired up.

use thiserror::Error;

pub mod fault;
pub mod file;
pub mod memory;

pub use fault::FaultInjectingNvram;
pub use file::FileNvram;
pub use memory::MemoryNvram;

/// Value of an erased NVRAM byte.
pub const ERASED_BYTE: u8 = 0xFF;

#[derive(Debug, Error)]
pub enum NvramError {
    #[error("read out of range: start {start} len {len} exceeds medium size {size}")]
    ReadOutOfRange { start: u32, len: u32, size: u32 },
    #[error("write out of range: start {start} len {len} exceeds medium size {size}")]
    WriteOutOfRange { start: u32, len: u32, size: u32 },
    #[error("write target was not pre-erased at offset {offset}")]
    NotPreErased { offset: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability set the core depends on to read, write, and erase NVRAM.
///
/// Read/write addresses are logical, starting from 0 at the beginning of the
/// medium. `erase_main`/`erase_reserve` must erase exactly the main/reserved byte
/// ranges implied by `size()`/`reserved()` and nothing else.
pub trait NvramDriver {
    fn read(&mut self, dst: &mut [u8], start: u32) -> Result<(), NvramError>;
    fn write(&mut self, src: &[u8], start: u32) -> Result<(), NvramError>;
    fn erase_main(&mut self) -> Result<(), NvramError>;
    fn erase_reserve(&mut self) -> Result<(), NvramError>;
    fn size(&self) -> u32;
    fn reserved(&self) -> u32;
}

/// Test-only escape hatch for simulating hardware state that a well-behaved
/// writer could never produce through [`NvramDriver::write`] alone (torn writes,
/// bit rot, a header frozen mid-compaction). Implemented by the in-memory and
/// file-backed drivers; [`FaultInjectingNvram`] uses it to drive the
/// crash-recovery matrix.
pub trait RawInspect: NvramDriver {
    fn poke(&mut self, start: u32, bytes: &[u8]);
    fn peek(&self, start: u32, len: usize) -> Vec<u8>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_tester<N: NvramDriver>(driver: &mut N) {
        assert!(driver.size() > 0);
        assert!(driver.reserved() < driver.size());
        let mut buf = vec![ERASED_BYTE; driver.size() as usize];
        driver.read(&mut buf, 0).unwrap();
        assert!(buf.iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn memory_driver_starts_erased() {
        let mut driver = MemoryNvram::new(512, 256);
        driver_tester(&mut driver);
    }
}
