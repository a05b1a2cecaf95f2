use crate::{NvramDriver, NvramError, RawInspect, ERASED_BYTE};

/// A `Vec<u8>`-backed NVRAM medium, fully erased on construction.
///
/// Used for fast in-process tests and as the default backing for the demo CLI's
/// `--in-memory` mode.
pub struct MemoryNvram {
    data: Vec<u8>,
    reserved: u32,
}

impl MemoryNvram {
    pub fn new(size: u32, reserved: u32) -> Self {
        Self {
            data: vec![ERASED_BYTE; size as usize],
            reserved,
        }
    }

    /// Direct access for tests that need to corrupt bytes or inspect raw state.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn main_range(&self) -> std::ops::Range<usize> {
        0..(self.data.len() - self.reserved as usize)
    }

    fn reserve_range(&self) -> std::ops::Range<usize> {
        (self.data.len() - self.reserved as usize)..self.data.len()
    }
}

impl NvramDriver for MemoryNvram {
    fn read(&mut self, dst: &mut [u8], start: u32) -> Result<(), NvramError> {
        let start = start as usize;
        let end = start + dst.len();
        if end > self.data.len() {
            return Err(NvramError::ReadOutOfRange {
                start: start as u32,
                len: dst.len() as u32,
                size: self.data.len() as u32,
            });
        }
        dst.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write(&mut self, src: &[u8], start: u32) -> Result<(), NvramError> {
        let start_us = start as usize;
        let end = start_us + src.len();
        if end > self.data.len() {
            return Err(NvramError::WriteOutOfRange {
                start,
                len: src.len() as u32,
                size: self.data.len() as u32,
            });
        }
        if cfg!(debug_assertions) {
            for (i, &b) in self.data[start_us..end].iter().enumerate() {
                if b != ERASED_BYTE {
                    return Err(NvramError::NotPreErased {
                        offset: start + i as u32,
                    });
                }
            }
        }
        self.data[start_us..end].copy_from_slice(src);
        Ok(())
    }

    fn erase_main(&mut self) -> Result<(), NvramError> {
        let range = self.main_range();
        self.data[range].fill(ERASED_BYTE);
        Ok(())
    }

    fn erase_reserve(&mut self) -> Result<(), NvramError> {
        let range = self.reserve_range();
        self.data[range].fill(ERASED_BYTE);
        Ok(())
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn reserved(&self) -> u32 {
        self.reserved
    }
}

impl RawInspect for MemoryNvram {
    fn poke(&mut self, start: u32, bytes: &[u8]) {
        let start = start as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn peek(&self, start: u32, len: usize) -> Vec<u8> {
        let start = start as usize;
        self.data[start..start + len].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut driver = MemoryNvram::new(64, 32);
        let payload = [1, 2, 3, 4];
        driver.write(&payload, 2).unwrap();
        let mut buf = [0u8; 4];
        driver.read(&mut buf, 2).unwrap();
        assert_eq!(buf, payload);
    }

    #[test]
    fn write_past_end_is_rejected() {
        let mut driver = MemoryNvram::new(8, 4);
        assert!(driver.write(&[1, 2, 3], 7).is_err());
    }

    #[test]
    fn erase_main_only_touches_main_range() {
        let mut driver = MemoryNvram::new(8, 4);
        driver.write(&[1, 2, 3, 4], 0).unwrap();
        driver.write(&[9, 9, 9, 9], 4).unwrap();
        driver.erase_main().unwrap();
        assert_eq!(&driver.raw()[0..4], &[ERASED_BYTE; 4]);
        assert_eq!(&driver.raw()[4..8], &[9, 9, 9, 9]);
    }

    #[test]
    fn rewriting_without_erase_is_rejected_in_debug() {
        let mut driver = MemoryNvram::new(8, 4);
        driver.write(&[1, 2, 3, 4], 0).unwrap();
        let result = driver.write(&[5, 6, 7, 8], 0);
        if cfg!(debug_assertions) {
            assert!(result.is_err());
        }
    }
}
