use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{NvramDriver, NvramError, RawInspect, ERASED_BYTE};

/// A file-backed NVRAM medium, for the demo CLI and for tests that need
/// persistence across process boundaries.
///
/// A freshly-created backing file is erased (all `0xFF`) to mimic a blank medium.
pub struct FileNvram {
    file: File,
    size: u32,
    reserved: u32,
}

impl FileNvram {
    /// Open (creating if absent) a backing file of exactly `size` bytes.
    pub fn open<P: AsRef<Path>>(path: P, size: u32, reserved: u32) -> Result<Self, NvramError> {
        let existed = path.as_ref().exists();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        if !existed {
            file.set_len(size as u64)?;
            file.write_all(&vec![ERASED_BYTE; size as usize])?;
            file.flush()?;
        }

        Ok(Self {
            file,
            size,
            reserved,
        })
    }

    fn main_range(&self) -> std::ops::Range<u64> {
        0..(self.size - self.reserved) as u64
    }

    fn reserve_range(&self) -> std::ops::Range<u64> {
        (self.size - self.reserved) as u64..self.size as u64
    }

    fn fill_range(&mut self, range: std::ops::Range<u64>) -> Result<(), NvramError> {
        let len = (range.end - range.start) as usize;
        self.file.seek(SeekFrom::Start(range.start))?;
        self.file.write_all(&vec![ERASED_BYTE; len])?;
        self.file.flush()?;
        Ok(())
    }
}

impl NvramDriver for FileNvram {
    fn read(&mut self, dst: &mut [u8], start: u32) -> Result<(), NvramError> {
        let end = start as u64 + dst.len() as u64;
        if end > self.size as u64 {
            return Err(NvramError::ReadOutOfRange {
                start,
                len: dst.len() as u32,
                size: self.size,
            });
        }
        self.file.seek(SeekFrom::Start(start as u64))?;
        self.file.read_exact(dst)?;
        Ok(())
    }

    fn write(&mut self, src: &[u8], start: u32) -> Result<(), NvramError> {
        let end = start as u64 + src.len() as u64;
        if end > self.size as u64 {
            return Err(NvramError::WriteOutOfRange {
                start,
                len: src.len() as u32,
                size: self.size,
            });
        }
        if cfg!(debug_assertions) {
            let mut existing = vec![0u8; src.len()];
            self.file.seek(SeekFrom::Start(start as u64))?;
            self.file.read_exact(&mut existing)?;
            if existing.iter().any(|&b| b != ERASED_BYTE) {
                return Err(NvramError::NotPreErased { offset: start });
            }
        }
        self.file.seek(SeekFrom::Start(start as u64))?;
        self.file.write_all(src)?;
        self.file.flush()?;
        Ok(())
    }

    fn erase_main(&mut self) -> Result<(), NvramError> {
        let range = self.main_range();
        self.fill_range(range)
    }

    fn erase_reserve(&mut self) -> Result<(), NvramError> {
        let range = self.reserve_range();
        self.fill_range(range)
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn reserved(&self) -> u32 {
        self.reserved
    }
}

impl RawInspect for FileNvram {
    fn poke(&mut self, start: u32, bytes: &[u8]) {
        self.file.seek(SeekFrom::Start(start as u64)).unwrap();
        self.file.write_all(bytes).unwrap();
        self.file.flush().unwrap();
    }

    fn peek(&self, start: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        let mut file = self.file.try_clone().expect("clone file handle");
        file.seek(SeekFrom::Start(start as u64)).unwrap();
        file.read_exact(&mut buf).unwrap();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_file_is_erased() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nvram.bin");
        let mut driver = FileNvram::open(&path, 64, 32).unwrap();
        let mut buf = [0u8; 64];
        driver.read(&mut buf, 0).unwrap();
        assert!(buf.iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn reopening_preserves_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nvram.bin");
        {
            let mut driver = FileNvram::open(&path, 64, 32).unwrap();
            driver.write(&[1, 2, 3, 4], 0).unwrap();
        }
        let mut reopened = FileNvram::open(&path, 64, 32).unwrap();
        let mut buf = [0u8; 4];
        reopened.read(&mut buf, 0).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }
}
