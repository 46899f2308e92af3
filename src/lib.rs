//! A single-volume flat filesystem over fixed 4096-byte blocks: one
//! superblock, a 16-bit allocation table, one flat directory of up to 128
//! files, and a data region of chained blocks.
//!
//! [`FlatFs`] is the session type: mount (or format) a [`block_device::BlockDevice`],
//! work with files through descriptors, unmount to persist the metadata.
pub mod block_device;
pub mod cli_interface;
pub mod error;
mod fs;
pub mod mkfs;
pub mod utils;

pub use error::{FsError, Result};
pub use fs::{FileInfo, FlatFs, FsInfo, FAT_EOC, FD_LIMIT, FILENAME_LEN, FILE_MAX_COUNT};
