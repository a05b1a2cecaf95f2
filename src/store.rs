//! Public API façade: the single type applications hold onto.
//!
//! Owns a driver plus the in-RAM directory and exposes `get`/`set`-shaped
//! operations instead of raw block access. A `Store<N>` only exists once cold
//! boot has succeeded, so "not started" is a construction failure rather than
//! a runtime state applications have to check for.

use log::warn;

use nvram_driver::NvramDriver;

use crate::config::{ENTRY_SIZE, MAX_ENTRIES, RESERVED_KEY, RESERVED_VALUE};
use crate::directory::Directory;
use crate::entry::{read_entry, write_entry};
use crate::error::CoreError;
use crate::layout::area_end;
use crate::recovery::{cold_boot, restart_map};
use crate::{Key, Offset, Value};

/// An initialized wear-leveling key/value store over an [`NvramDriver`] medium.
pub struct Store<N> {
    nvram: N,
    directory: Directory,
    next_block: Offset,
}

impl<N: NvramDriver> Store<N> {
    /// Validates geometry, runs cold boot (classification + whatever recovery
    /// it implies), and returns a ready-to-use store.
    pub fn init(mut nvram: N) -> Result<Self, CoreError> {
        let size = nvram.size();
        let reserved = nvram.reserved();
        let metadata = crate::config::METADATA_SIZE;
        let invalid_geometry = || CoreError::InvalidGeometry {
            size,
            reserved,
            max_entries: MAX_ENTRIES,
        };
        if reserved >= size || reserved <= metadata || size - reserved <= metadata {
            return Err(invalid_geometry());
        }

        let main_capacity = (size - reserved - metadata) as usize / ENTRY_SIZE;
        let reserved_capacity = (reserved - metadata) as usize / ENTRY_SIZE;
        if main_capacity <= MAX_ENTRIES || reserved_capacity <= MAX_ENTRIES || main_capacity < reserved_capacity {
            return Err(invalid_geometry());
        }

        let mut directory = Directory::new();
        let next_block = cold_boot(&mut nvram, &mut directory)?;

        Ok(Self {
            nvram,
            directory,
            next_block,
        })
    }

    /// Looks up the current value for `key`.
    pub fn get(&mut self, key: Key) -> Result<Value, CoreError> {
        let offset = self.directory.get(key).ok_or(CoreError::NotExist)?;
        let (_, value) = read_entry(&mut self.nvram, offset)?;
        Ok(value)
    }

    /// Sets `key` to `value`, compacting first if main has no room.
    pub fn set(&mut self, key: Key, value: Value) -> Result<(), CoreError> {
        if key == RESERVED_KEY && value == RESERVED_VALUE {
            return Err(CoreError::ReservedValue);
        }

        if self.directory.get(key).is_none() && self.directory.free_count() == 0 {
            return Err(CoreError::NoSpace);
        }

        let offset = self.allocate_block()?;
        let previous_offset = self.directory.get(key);

        self.directory
            .update(key, offset)
            .expect("capacity was checked before allocating");

        match write_entry(&mut self.nvram, offset, key, value) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Roll back the optimistic directory update: a pre-existing
                // key goes back to its old, still-valid offset; a brand-new
                // key is dropped entirely rather than left pointing at an
                // unwritten slot.
                match previous_offset {
                    Some(prev) => {
                        self.directory.update(key, prev).expect("row already present");
                    }
                    None => self.directory.remove(key),
                }
                warn!("write_entry failed at offset {offset}: {e}");
                Err(e)
            }
        }
    }

    fn allocate_block(&mut self) -> Result<Offset, CoreError> {
        if self.next_block + ENTRY_SIZE as Offset > area_end(&self.nvram, crate::layout::Area::Main) {
            self.next_block = restart_map(&mut self.nvram, &mut self.directory)?;
        }
        let offset = self.next_block;
        self.next_block += ENTRY_SIZE as Offset;
        Ok(offset)
    }

    pub fn used_entries(&self) -> usize {
        self.directory.used_count()
    }

    pub fn free_entries(&self) -> usize {
        self.directory.free_count()
    }

    pub fn main_capacity(&self) -> usize {
        let main_len = area_end(&self.nvram, crate::layout::Area::Main) - crate::config::METADATA_SIZE;
        main_len as usize / ENTRY_SIZE
    }

    pub fn into_inner(self) -> N {
        self.nvram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvram_driver::MemoryNvram;

    fn small_store() -> Store<MemoryNvram> {
        Store::init(MemoryNvram::new(512, 256)).unwrap()
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut store = small_store();
        store.set(1, 100).unwrap();
        assert_eq!(store.get(1).unwrap(), 100);
    }

    #[test]
    fn last_write_for_a_key_wins() {
        let mut store = small_store();
        store.set(1, 100).unwrap();
        store.set(1, 200).unwrap();
        assert_eq!(store.get(1).unwrap(), 200);
        assert_eq!(store.used_entries(), 1);
    }

    #[test]
    fn missing_key_is_not_exist() {
        let mut store = small_store();
        assert!(matches!(store.get(42), Err(CoreError::NotExist)));
    }

    #[test]
    fn reserved_sentinel_pair_is_rejected() {
        let mut store = small_store();
        assert!(matches!(
            store.set(RESERVED_KEY, RESERVED_VALUE),
            Err(CoreError::ReservedValue)
        ));
    }

    #[test]
    fn invalid_geometry_is_rejected_at_init() {
        let result = Store::init(MemoryNvram::new(8, 8));
        assert!(matches!(result, Err(CoreError::InvalidGeometry { .. })));
    }

    #[test]
    fn capacity_below_max_entries_is_rejected_at_init() {
        // Structurally fine (reserved < size, both areas fit their header) but
        // each area only holds 5-10 records, well under MAX_ENTRIES.
        let result = Store::init(MemoryNvram::new(64, 32));
        assert!(matches!(result, Err(CoreError::InvalidGeometry { .. })));
    }

    #[test]
    fn reserved_area_larger_than_main_is_rejected_at_init() {
        // main holds 25 records, reserved holds 33 - reserved can't absorb a
        // full compaction of main.
        let result = Store::init(MemoryNvram::new(352, 200));
        assert!(matches!(result, Err(CoreError::InvalidGeometry { .. })));
    }

    #[test]
    fn wraps_main_and_compacts_transparently() {
        let mut store = small_store();
        let main_slots = store.main_capacity();
        let rounds = main_slots as i32 * 4; // multiple of 4 so each key's last write is `rounds - 4 + k`
        for i in 0..rounds {
            store.set((i % 4) as Key, i).unwrap();
        }
        assert_eq!(store.used_entries(), 4);
        for k in 0..4 {
            let expected = rounds - 4 + k;
            assert_eq!(store.get(k as Key).unwrap(), expected);
        }
    }

    #[test]
    fn new_key_write_failure_leaves_no_dangling_row() {
        use nvram_driver::FaultInjectingNvram;

        let mut store = Store::init(FaultInjectingNvram::new(MemoryNvram::new(512, 256))).unwrap();
        // Corrupt the slot `set` is about to allocate so the pre-erased
        // invariant trips and `write_entry` fails.
        let next = store.next_block;
        store.nvram.corrupt_main(|i| if i as Offset == next { 0x00 } else { 0xFF });

        assert!(store.set(1, 100).is_err());
        assert!(matches!(store.get(1), Err(CoreError::NotExist)));
        assert_eq!(store.used_entries(), 0);
    }

    #[test]
    fn existing_key_write_failure_keeps_old_value_reachable() {
        use nvram_driver::FaultInjectingNvram;

        let mut store = Store::init(FaultInjectingNvram::new(MemoryNvram::new(512, 256))).unwrap();
        store.set(1, 100).unwrap();

        let next = store.next_block;
        store.nvram.corrupt_main(|i| if i as Offset == next { 0x00 } else { 0xFF });

        assert!(store.set(1, 200).is_err());
        assert_eq!(store.get(1).unwrap(), 100);
        assert_eq!(store.used_entries(), 1);
    }

    #[test]
    fn persists_across_reinit_on_same_medium() {
        let mut store = small_store();
        store.set(5, 555).unwrap();
        let nvram = store.into_inner();

        let mut store2 = Store::init(nvram).unwrap();
        assert_eq!(store2.get(5).unwrap(), 555);
    }
}
