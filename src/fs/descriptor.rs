use super::FD_LIMIT;
use crate::error::{FsError, Result};

/// An open file: the directory slot it targets and an independent byte
/// cursor. Descriptors are plain in-memory values, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    pub entry: usize,
    pub offset: usize,
}

/// Bounded pool of open descriptors. A vacant slot is `None`; the handle a
/// caller holds is the slot index.
#[derive(Debug)]
pub struct DescriptorTable {
    slots: [Option<FileDescriptor>; FD_LIMIT],
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self {
            slots: [None; FD_LIMIT],
        }
    }

    /// Bind the lowest vacant slot to directory slot `entry`, cursor at 0.
    pub fn open(&mut self, entry: usize) -> Result<usize> {
        let fd = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::DescriptorsExhausted(FD_LIMIT))?;
        self.slots[fd] = Some(FileDescriptor { entry, offset: 0 });
        Ok(fd)
    }

    /// Release `fd` back to the pool.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.slots
            .get_mut(fd)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(FsError::BadDescriptor(fd))
    }

    pub fn get(&self, fd: usize) -> Result<FileDescriptor> {
        self.slots
            .get(fd)
            .copied()
            .flatten()
            .ok_or(FsError::BadDescriptor(fd))
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut FileDescriptor> {
        self.slots
            .get_mut(fd)
            .and_then(Option::as_mut)
            .ok_or(FsError::BadDescriptor(fd))
    }
}
