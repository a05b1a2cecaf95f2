use crate::{NvramDriver, NvramError, RawInspect};

/// Wraps another driver and exposes hooks for corrupting bytes or freezing a
/// header mid-compaction, transparently passing through everything else.
///
/// Plain `NvramDriver` calls pass straight through to the inner driver; the
/// corruption helpers are only available when the inner driver also implements
/// [`RawInspect`].
pub struct FaultInjectingNvram<N> {
    inner: N,
}

impl<N: NvramDriver> FaultInjectingNvram<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> N {
        self.inner
    }
}

impl<N: NvramDriver> NvramDriver for FaultInjectingNvram<N> {
    fn read(&mut self, dst: &mut [u8], start: u32) -> Result<(), NvramError> {
        self.inner.read(dst, start)
    }

    fn write(&mut self, src: &[u8], start: u32) -> Result<(), NvramError> {
        self.inner.write(src, start)
    }

    fn erase_main(&mut self) -> Result<(), NvramError> {
        self.inner.erase_main()
    }

    fn erase_reserve(&mut self) -> Result<(), NvramError> {
        self.inner.erase_reserve()
    }

    fn size(&self) -> u32 {
        self.inner.size()
    }

    fn reserved(&self) -> u32 {
        self.inner.reserved()
    }
}

impl<N: RawInspect> FaultInjectingNvram<N> {
    fn main_start(&self) -> u32 {
        0
    }

    fn reserve_start(&self) -> u32 {
        self.inner.size() - self.inner.reserved()
    }

    /// Overwrites the whole main area with the given byte pattern (simulating a
    /// torn write or bit rot, not a clean erase).
    pub fn corrupt_main(&mut self, pattern: impl Fn(usize) -> u8) {
        let len = (self.reserve_start() - self.main_start()) as usize;
        let bytes: Vec<u8> = (0..len).map(pattern).collect();
        self.inner.poke(self.main_start(), &bytes);
    }

    /// Overwrites the whole reserved area with the given byte pattern.
    pub fn corrupt_reserve(&mut self, pattern: impl Fn(usize) -> u8) {
        let len = self.inner.reserved() as usize;
        let bytes: Vec<u8> = (0..len).map(pattern).collect();
        self.inner.poke(self.reserve_start(), &bytes);
    }

    /// Forces the main area's 2-byte metadata header to an arbitrary pattern,
    /// independent of erase state, to simulate a crash frozen mid-transition.
    pub fn stamp_main_header(&mut self, started: u8, finished: u8) {
        self.inner.poke(self.main_start(), &[started, finished]);
    }

    /// Forces the reserved area's 2-byte metadata header to an arbitrary pattern.
    pub fn stamp_reserve_header(&mut self, started: u8, finished: u8) {
        self.inner.poke(self.reserve_start(), &[started, finished]);
    }

    pub fn main_bytes(&self) -> Vec<u8> {
        self.inner.peek(self.main_start(), (self.reserve_start() - self.main_start()) as usize)
    }

    pub fn reserve_bytes(&self) -> Vec<u8> {
        self.inner.peek(self.reserve_start(), self.inner.reserved() as usize)
    }
}
