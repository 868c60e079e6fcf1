//! Error types for SRR parsing and editing.
//!
//! This module provides the [`SrrError`] type which covers every failure an
//! entry point can report. Anomalies that still allow a best-effort result
//! (checksum mismatches, odd packers, duplicate names) are not errors: they
//! are collected as warnings on the [`Inventory`](crate::Inventory).
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Format | [`NotSrr`], [`MissingSrrHeader`] | Data is not an SRR file |
//! | Naming | [`IllegalName`], [`NameExists`], [`NameNotFound`] | Bad mutation target |
//! | Editing | [`ReorderMismatch`], [`SizeMismatch`], [`DuplicateOsoHash`], [`OsoHashNotFound`] | Rejected or failed rewrite |
//! | I/O | [`Lock`], [`Io`] | Platform failures |
//!
//! ## Example
//!
//! ```rust,ignore
//! use srr_stream::{SrrError, SrrFile};
//!
//! match SrrFile::new("release.srr").delete("release.nfo") {
//!     Ok(()) => println!("removed"),
//!     Err(SrrError::NameNotFound(name)) => eprintln!("{name} is not stored"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```
//!
//! [`NotSrr`]: SrrError::NotSrr
//! [`MissingSrrHeader`]: SrrError::MissingSrrHeader
//! [`IllegalName`]: SrrError::IllegalName
//! [`NameExists`]: SrrError::NameExists
//! [`NameNotFound`]: SrrError::NameNotFound
//! [`ReorderMismatch`]: SrrError::ReorderMismatch
//! [`SizeMismatch`]: SrrError::SizeMismatch
//! [`DuplicateOsoHash`]: SrrError::DuplicateOsoHash
//! [`OsoHashNotFound`]: SrrError::OsoHashNotFound
//! [`Lock`]: SrrError::Lock
//! [`Io`]: SrrError::Io

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for SRR operations.
#[derive(Debug, Error)]
pub enum SrrError {
    /// An unrecognized block was found outside of any RAR volume.
    ///
    /// The walker treats this as proof that the data is not an SRR file at
    /// all (for example a RAR volume that still carries its payload).
    #[error("not an SRR file: unknown block outside a RAR volume at offset {offset}")]
    NotSrr {
        /// Offset of the offending block.
        offset: u64,
    },

    /// The file does not start with an SRR header block, so there is no
    /// place to insert stored files.
    #[error("SRR header block missing at the start of the file")]
    MissingSrrHeader,

    /// The requested stored file name breaks the naming rules.
    ///
    /// See [`check_file_name`](crate::check_file_name).
    #[error("illegal stored file name: {0:?}")]
    IllegalName(String),

    /// A stored file with this exact path already exists.
    #[error("a stored file named {0:?} already exists")]
    NameExists(String),

    /// No stored file with this exact path exists.
    #[error("no stored file named {0:?}")]
    NameNotFound(String),

    /// The names handed to a reorder are not a permutation of the stored
    /// files, or the stored files contain duplicates.
    #[error("stored file order rejected: {0}")]
    ReorderMismatch(String),

    /// A rewrite would not produce the number of bytes it promised.
    #[error("rewrite size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Size the result must have.
        expected: u64,
        /// Size the result would have had.
        actual: u64,
    },

    /// The exact OSO hash block is already present.
    #[error("OSO hash block already present")]
    DuplicateOsoHash,

    /// The OSO hash block to remove is not present.
    #[error("OSO hash block not found")]
    OsoHashNotFound,

    /// The advisory lock on the SRR file could not be taken.
    #[error("could not lock {}: {source}", path.display())]
    Lock {
        /// The file that was being locked.
        path: PathBuf,
        /// The platform error.
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SrrError>;
