//! The error surface of the whole crate.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FsError>;

/// Every way a volume operation can fail. Callers get one of these instead
/// of a sentinel return value; nothing here is a panic.
#[derive(Debug, Error)]
pub enum FsError {
    /// The image file could not be opened or created.
    #[error("cannot open image file")]
    DeviceOpen(#[source] io::Error),
    /// The image length is not a whole number of blocks.
    #[error("image length {0} is not a whole number of blocks")]
    MisalignedImage(u64),
    /// Block 0 does not carry the expected signature.
    #[error("bad superblock signature")]
    BadSignature,
    /// The superblock and the device disagree about the volume size.
    #[error("superblock records {recorded} blocks but the device has {actual}")]
    BlockCountMismatch { recorded: u16, actual: usize },
    /// The recorded region indices do not describe a valid layout.
    #[error("superblock layout is inconsistent")]
    BadLayout,
    /// The requested volume cannot hold a single data block.
    #[error("{got} blocks is too small for a volume, need at least {min}")]
    ImageTooSmall { min: usize, got: usize },
    /// The requested volume exceeds the on-disk block-count field.
    #[error("{0} blocks does not fit the on-disk block-count field")]
    ImageTooLarge(usize),

    /// Every directory slot is occupied.
    #[error("directory is full")]
    DirectoryFull,

    /// A create was attempted with an empty name.
    #[error("file name is empty")]
    EmptyName,
    /// The name does not fit the fixed name field with its terminator.
    #[error("file name {0:?} does not fit the name field")]
    NameTooLong(String),
    /// A file with that name already exists.
    #[error("file {0:?} already exists")]
    AlreadyExists(String),
    /// No file with that name exists.
    #[error("no such file {0:?}")]
    NotFound(String),

    /// The handle is out of range or not currently open.
    #[error("descriptor {0} is not open")]
    BadDescriptor(usize),
    /// The descriptor pool is exhausted.
    #[error("all {0} descriptors are in use")]
    DescriptorsExhausted(usize),

    /// A seek landed past the end of the file.
    #[error("seek to {offset} past end of file (size {size})")]
    SeekPastEnd { offset: usize, size: usize },

    /// A block index fell outside the device.
    #[error("block {0} is out of range for the device")]
    BlockOutOfRange(usize),
    /// An allocation-table chain is cyclic, truncated, or points at a free
    /// entry. The volume needs repair; no operation retries past this.
    #[error("allocation chain is corrupted at block {0}")]
    CorruptChain(u16),

    #[error("on-disk structure failed to decode")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("on-disk structure failed to encode")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("device I/O failed")]
    Io(#[from] io::Error),
}
