//! Errors from the block-store layer, entirely outside the `no_std` core
//! and free to use `Result`/`?` the ordinary way.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoError {
    DiskFull,
    NotFound,
    TooManyOpenFiles,
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoError::DiskFull => write!(f, "ramdisk is full"),
            DemoError::NotFound => write!(f, "file not found"),
            DemoError::TooManyOpenFiles => write!(f, "too many open files"),
        }
    }
}

impl std::error::Error for DemoError {}
