use serde::{Deserialize, Serialize};

use super::{FAT_EOC, FILENAME_LEN, FILE_MAX_COUNT};
use crate::block_device::{BlockDevice, BLOCK_SIZE};
use crate::error::{FsError, Result};
use crate::utils::traits::DiskEncode;

/// On-disk width of one directory slot.
const ENTRY_SIZE: usize = 32;

/// One fixed-width directory slot: NUL-padded name, byte size, head of the
/// block chain. An empty name marks a free slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: [u8; FILENAME_LEN],
    size: u32,
    head: u16,
    padding: [u8; 10],
}

impl DiskEncode for DirEntry {}

impl Default for DirEntry {
    /// A free slot. The head is the end-of-chain sentinel, never 0 — 0 is a
    /// real block index.
    fn default() -> Self {
        Self {
            name: [0; FILENAME_LEN],
            size: 0,
            head: FAT_EOC,
            padding: [0; 10],
        }
    }
}

impl DirEntry {
    /// A fresh zero-size file. `name` must already be validated.
    fn new(name: &str) -> Self {
        let mut field = [0u8; FILENAME_LEN];
        field[..name.len()].copy_from_slice(name.as_bytes());
        Self {
            name: field,
            ..Self::default()
        }
    }

    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(FILENAME_LEN);
        std::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw head pointer; [`FAT_EOC`] when the file owns no blocks.
    pub fn head(&self) -> u16 {
        self.head
    }

    pub(crate) fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    pub(crate) fn set_head(&mut self, head: u16) {
        self.head = head;
    }
}

/// A directory listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    /// File size in bytes.
    pub size: u32,
    /// First block of the file's chain, `None` for a file with no data yet.
    pub head: Option<u16>,
}

/// The flat directory: [`FILE_MAX_COUNT`] fixed slots filling exactly one
/// block.
#[derive(Debug)]
pub struct Directory {
    entries: Vec<DirEntry>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            entries: vec![DirEntry::default(); FILE_MAX_COUNT],
        }
    }

    pub fn load(device: &dyn BlockDevice, block: u16) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(block.into(), &mut buf)?;
        let entries = buf
            .chunks_exact(ENTRY_SIZE)
            .take(FILE_MAX_COUNT)
            .map(DirEntry::decode_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn store(&self, device: &mut dyn BlockDevice, block: u16) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        for (slot, entry) in buf.chunks_exact_mut(ENTRY_SIZE).zip(&self.entries) {
            entry.encode_into(slot)?;
        }
        device.write_block(block.into(), &buf)
    }

    /// A candidate name must be non-empty and fit the field with its
    /// terminator; an interior NUL would truncate on decode.
    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(FsError::EmptyName);
        }
        if name.len() >= FILENAME_LEN || name.as_bytes().contains(&0) {
            return Err(FsError::NameTooLong(name.to_owned()));
        }
        Ok(())
    }

    /// Slot index of the occupied entry named `name`.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| !entry.is_free() && entry.name() == name)
    }

    pub fn entry(&self, index: usize) -> &DirEntry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut DirEntry {
        &mut self.entries[index]
    }

    /// Claim the first free slot for a new zero-size file named `name`.
    pub fn create(&mut self, name: &str) -> Result<usize> {
        Self::check_name(name)?;
        if self.position_of(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_owned()));
        }
        let index = self
            .entries
            .iter()
            .position(DirEntry::is_free)
            .ok_or(FsError::DirectoryFull)?;
        self.entries[index] = DirEntry::new(name);
        Ok(index)
    }

    /// Reset slot `index` to free.
    pub fn clear(&mut self, index: usize) {
        self.entries[index] = DirEntry::default();
    }

    pub fn free_slots(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_free()).count()
    }

    /// Occupied slots in slot order. Each call restarts from the top.
    pub fn iter(&self) -> impl Iterator<Item = FileInfo> + '_ {
        self.entries
            .iter()
            .filter(|entry| !entry.is_free())
            .map(|entry| FileInfo {
                name: entry.name().to_owned(),
                size: entry.size,
                head: (entry.head != FAT_EOC).then_some(entry.head),
            })
    }
}
