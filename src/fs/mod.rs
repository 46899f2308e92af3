//! The volume session and its on-disk structures.

mod descriptor;
mod directory;
mod fat;
mod fs_layout;
mod superblock;

pub use directory::FileInfo;
pub use fs_layout::{FlatFs, FsInfo};

/// Magic value identifying the volume format in block 0.
pub const SIGNATURE: [u8; 8] = *b"ECS150FS";
/// Raw allocation-table value marking the last block of a chain. Distinct
/// from "free" (0) and from every valid block index.
pub const FAT_EOC: u16 = 0xFFFF;
/// Width of the directory name field, NUL terminator included.
pub const FILENAME_LEN: usize = 16;
/// Directory capacity in files.
pub const FILE_MAX_COUNT: usize = 128;
/// Open-descriptor pool size.
pub const FD_LIMIT: usize = 32;
