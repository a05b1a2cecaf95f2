//! Cold-boot classification and the compaction state machine.
//!
//! This is the hard part of the whole crate: the
//! medium carries just enough metadata to let recovery identify, from the pair
//! of headers and the erased/non-erased state of each area, exactly which half
//! of a compaction (if any) was interrupted by power loss, and to re-drive it.

use log::{debug, info, warn};
use nvram_driver::NvramDriver;

use crate::config::{ENTRY_SIZE, ERASE_FINISHED, ERASE_STARTED, METADATA_SIZE};
use crate::directory::Directory;
use crate::entry::{is_block_erased, read_entry, write_entry};
use crate::error::CoreError;
use crate::layout::{
    area_base, area_end, first_record_offset, read_header, write_finished_flag,
    write_started_flag, Area, MetadataHeader,
};
use crate::Offset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    Blank,
    Clean,
    MainEraseInterrupted,
    ReserveEraseInterrupted,
}

fn classify<N: NvramDriver + ?Sized>(nvram: &mut N) -> Result<BootState, CoreError> {
    let main_header = read_header(nvram, Area::Main)?;
    let reserve_header = read_header(nvram, Area::Reserved)?;

    // Cross-reference: reserve_header (stored in the reserved area) records
    // main's erase progress; main_header (stored in the main area) records
    // reserved's erase progress.
    let main_physically_clean = is_block_erased(&main_region_sample(nvram)?);
    let reserve_physically_clean = is_block_erased(&reserve_region_sample(nvram)?);

    // Steady state: reserved was cleanly erased after the last compaction (or
    // this is first use), and no main erase is mid-flight.
    if main_header.is_finished() && reserve_header.is_clean() && reserve_physically_clean {
        return Ok(BootState::Clean);
    }

    if (reserve_header.is_started() || reserve_header.is_finished()) && !main_physically_clean {
        return Ok(BootState::MainEraseInterrupted);
    }

    if (main_header.is_finished() && !reserve_physically_clean)
        || (main_header.is_started() && !main_header.is_finished())
    {
        return Ok(BootState::ReserveEraseInterrupted);
    }

    Ok(BootState::Blank)
}

/// A cheap physical-cleanliness probe: the header bytes themselves plus the
/// first record slot. A genuinely erased area is all `0xFF` throughout; after
/// any write or corruption at least one of these will differ.
fn main_region_sample<N: NvramDriver + ?Sized>(nvram: &mut N) -> Result<Vec<u8>, CoreError> {
    let base = area_base(nvram, Area::Main);
    let end = area_end(nvram, Area::Main);
    let len = (end - base).min(METADATA_SIZE + ENTRY_SIZE as u32) as usize;
    let mut buf = vec![0u8; len];
    nvram.read(&mut buf, base)?;
    Ok(buf)
}

fn reserve_region_sample<N: NvramDriver + ?Sized>(nvram: &mut N) -> Result<Vec<u8>, CoreError> {
    let base = area_base(nvram, Area::Reserved);
    let end = area_end(nvram, Area::Reserved);
    let len = (end - base).min(METADATA_SIZE + ENTRY_SIZE as u32) as usize;
    let mut buf = vec![0u8; len];
    nvram.read(&mut buf, base)?;
    Ok(buf)
}

/// Scans main from its first record slot forward, stopping at the first
/// erased slot, feeding every live record into `directory` in ascending-offset
/// order (so the directory's first-match-wins lookup ends up pointing at the
/// tail-most record for each key). Returns the offset the scan stopped at,
/// which becomes `next_block`.
pub fn rebuild_from_main<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    directory: &mut Directory,
) -> Result<Offset, CoreError> {
    directory.reset();

    let mut offset = first_record_offset(nvram, Area::Main);
    let end = area_end(nvram, Area::Main);

    while offset + ENTRY_SIZE as u32 <= end {
        match read_entry(nvram, offset) {
            Ok((key, _value)) => {
                directory.update(key, offset)?;
                offset += ENTRY_SIZE as u32;
            }
            Err(CoreError::NotExist) => break,
            Err(e) => return Err(e),
        }
    }

    Ok(offset)
}

/// Sets the *other* area's header started flag, erases `area`, then sets the
/// other area's header finished flag. This pair of writes is the transactional
/// record that a compaction half completed.
fn prepare_area<N: NvramDriver + ?Sized>(nvram: &mut N, area: Area) -> Result<(), CoreError> {
    let other = match area {
        Area::Main => Area::Reserved,
        Area::Reserved => Area::Main,
    };

    write_started_flag(nvram, other)?;
    match area {
        Area::Main => nvram.erase_main()?,
        Area::Reserved => nvram.erase_reserve()?,
    }
    write_finished_flag(nvram, other)?;
    Ok(())
}

/// Copies every live record (visited in directory insertion order) from main
/// into reserved, starting just past reserved's header.
fn transfer_main_to_reserve<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    directory: &Directory,
) -> Result<(), CoreError> {
    let mut dest = first_record_offset(nvram, Area::Reserved);
    let mut i = 0;
    while let Some((key, offset)) = directory.get_by_index(i) {
        let (_, value) = read_entry(nvram, offset)?;
        write_entry(nvram, dest, key, value)?;
        dest += ENTRY_SIZE as u32;
        i += 1;
    }
    Ok(())
}

/// Scans reserved forward from its first record slot, writing each record back
/// into main starting at main's first record slot, updating `directory` and
/// returning the stopping offset (the new `next_block`).
fn transfer_reserve_to_main<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    directory: &mut Directory,
) -> Result<Offset, CoreError> {
    let mut src = first_record_offset(nvram, Area::Reserved);
    let reserve_end = area_end(nvram, Area::Reserved);
    let mut dest = first_record_offset(nvram, Area::Main);

    while src + ENTRY_SIZE as u32 <= reserve_end {
        match read_entry(nvram, src) {
            Ok((key, value)) => {
                write_entry(nvram, dest, key, value)?;
                directory.update(key, dest)?;
                dest += ENTRY_SIZE as u32;
                src += ENTRY_SIZE as u32;
            }
            Err(CoreError::NotExist) => break,
            Err(e) => return Err(e),
        }
    }

    Ok(dest)
}

/// Reclaims main's space by copying the live set out to reserved, erasing
/// main, copying the live set back in (defragmented), then re-erasing
/// reserved. Invoked by the allocator when main is exhausted.
pub fn restart_map<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    directory: &mut Directory,
) -> Result<Offset, CoreError> {
    info!("main area exhausted, starting compaction");
    transfer_main_to_reserve(nvram, directory)?;
    prepare_area(nvram, Area::Main)?;
    let next_block = transfer_reserve_to_main(nvram, directory)?;
    prepare_area(nvram, Area::Reserved)?;
    info!("compaction complete, next_block = {next_block}");
    Ok(next_block)
}

fn recover_after_interrupted_main_erase<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    directory: &mut Directory,
) -> Result<Offset, CoreError> {
    warn!("recovering from an interrupted main-area erase");
    nvram.erase_main()?;
    let next_block = transfer_reserve_to_main(nvram, directory)?;
    prepare_area(nvram, Area::Reserved)?;
    Ok(next_block)
}

fn recover_after_interrupted_reserve_erase<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    directory: &mut Directory,
) -> Result<Offset, CoreError> {
    warn!("recovering from an interrupted reserved-area erase");
    nvram.erase_reserve()?;
    rebuild_from_main(nvram, directory)
}

fn prepare_for_first_use<N: NvramDriver + ?Sized>(nvram: &mut N) -> Result<Offset, CoreError> {
    info!("blank medium, preparing for first use");
    nvram.erase_main()?;
    nvram.erase_reserve()?;
    let header = MetadataHeader {
        started: ERASE_STARTED,
        finished: ERASE_FINISHED,
    };
    crate::layout::write_header(nvram, Area::Main, header)?;
    Ok(first_record_offset(nvram, Area::Main))
}

/// Inspects both metadata headers, classifies the medium, and drives whichever
/// recovery action (if any) is required. Returns the `next_block` cursor the
/// allocator should resume from.
pub fn cold_boot<N: NvramDriver + ?Sized>(
    nvram: &mut N,
    directory: &mut Directory,
) -> Result<Offset, CoreError> {
    directory.reset();

    let state = classify(nvram)?;
    debug!("boot classification: {state:?}");

    match state {
        BootState::Clean => rebuild_from_main(nvram, directory),
        BootState::Blank => prepare_for_first_use(nvram),
        BootState::MainEraseInterrupted => recover_after_interrupted_main_erase(nvram, directory),
        BootState::ReserveEraseInterrupted => {
            recover_after_interrupted_reserve_erase(nvram, directory)
        }
    }
}
