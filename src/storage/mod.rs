//! Storage Module
//!
//! On-disk files of one data directory.
//!
//! ## Responsibilities
//! - Data files: append, validated scan, positioned reads, archival
//! - Hint files: index snapshots written by merge, replayed at open
//! - Directory lock: one owning process per data directory
//! - Naming conventions for everything above
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── active.db          current writable log (header + records)
//!   ├── archive.<id>.db    sealed, read-only logs
//!   ├── hint.<id>.db       optional index snapshot for archive.<id>.db
//!   ├── merge.<id>.db      merge output before it is sealed
//!   └── lock.pid           owning process id, as text
//! ```

mod data_file;
mod hint_file;
pub mod layout;
mod lock;

pub use data_file::{DataFile, DataFileScan};
pub use hint_file::{HintFile, HintScan};
pub use layout::FileKind;
pub use lock::DirLock;
