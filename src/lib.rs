//! A micro wear-leveling key/value store for byte-erasable NVRAM (flash,
//! EEPROM) devices.
//!
//! Records are fixed-width `(key, value)` pairs appended to a log in a main
//! area; when main fills, the live set is compacted through a reserved area.
//! The medium is accessed only through [`nvram_driver::NvramDriver`], so the
//! store itself never assumes anything about the underlying hardware beyond
//! "bytes read back as written, erase resets a range to `0xFF`".
//!
//! ```no_run
//! use nvram_driver::MemoryNvram;
//! use wearkv::Store;
//!
//! let mut store = Store::init(MemoryNvram::new(4096, 1024))?;
//! store.set(7, 42)?;
//! assert_eq!(store.get(7)?, 42);
//! # Ok::<(), wearkv::CoreError>(())
//! ```

pub mod config;
pub mod directory;
pub mod entry;
pub mod error;
pub mod layout;
pub mod recovery;
pub mod store;

pub use config::{Key, Offset, Value};
pub use error::CoreError;
pub use store::Store;
