//! The mounted-volume session: what the filesystem looks like in memory.
//!
//! Metadata (superblock, allocation table, directory, descriptor pool) lives
//! here between mount and unmount; only payload blocks are written through
//! to the device immediately.

use std::fmt;
use std::path::Path;

use log::{debug, info};

use super::descriptor::DescriptorTable;
use super::directory::{Directory, FileInfo};
use super::fat::{ChainPos, Fat, FatEntry};
use super::superblock::SuperBlock;
use super::{FAT_EOC, FILE_MAX_COUNT};
use crate::block_device::{BlockDevice, ImageFile, BLOCK_SIZE};
use crate::error::{FsError, Result};

/// Statistics reported by [`FlatFs::info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsInfo {
    pub total_blocks: u16,
    pub fat_blocks: u8,
    pub root_index: u16,
    pub data_start: u16,
    pub data_count: u16,
    pub free_data_blocks: usize,
    pub free_directory_slots: usize,
}

impl fmt::Display for FsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total_blk_count={}", self.total_blocks)?;
        writeln!(f, "fat_blk_count={}", self.fat_blocks)?;
        writeln!(f, "rdir_blk={}", self.root_index)?;
        writeln!(f, "data_blk={}", self.data_start)?;
        writeln!(f, "data_blk_count={}", self.data_count)?;
        writeln!(f, "fat_free_ratio={}/{}", self.free_data_blocks, self.data_count)?;
        write!(
            f,
            "rdir_free_ratio={}/{}",
            self.free_directory_slots, FILE_MAX_COUNT
        )
    }
}

/// A mounted volume. One value owns the device and every piece of in-memory
/// metadata, so "one volume per session" holds by construction and
/// independent sessions can coexist in one process.
///
/// Dropping the value without [`unmount`](Self::unmount) discards metadata
/// changes made since mount; committed payload blocks stay.
pub struct FlatFs {
    device: Box<dyn BlockDevice>,
    superblock: SuperBlock,
    fat: Fat,
    directory: Directory,
    descriptors: DescriptorTable,
}

impl FlatFs {
    /// Mount the volume on `device`: read and validate the superblock, then
    /// load the allocation table and the directory. A failed mount leaves no
    /// session behind.
    pub fn mount(device: Box<dyn BlockDevice>) -> Result<Self> {
        let superblock = SuperBlock::load(device.as_ref())?;
        superblock.validate(device.block_count())?;
        let fat = Fat::load(
            device.as_ref(),
            superblock.fat_blocks.into(),
            superblock.data_count.into(),
        )?;
        let directory = Directory::load(device.as_ref(), superblock.root_index)?;
        info!(
            "mounted volume: {} blocks, {} in the data region",
            superblock.total_blocks, superblock.data_count
        );
        Ok(Self {
            device,
            superblock,
            fat,
            directory,
            descriptors: DescriptorTable::new(),
        })
    }

    /// Mount the volume stored in the image file at `path`.
    pub fn mount_image<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::mount(Box::new(ImageFile::open(path)?))
    }

    /// Lay a fresh, empty filesystem on `device` and mount it.
    pub fn format(mut device: Box<dyn BlockDevice>) -> Result<Self> {
        let blocks = device.block_count();
        // superblock + allocation table + directory + one data block
        let min = 4;
        if blocks < min {
            return Err(FsError::ImageTooSmall { min, got: blocks });
        }
        if blocks > usize::from(u16::MAX) {
            return Err(FsError::ImageTooLarge(blocks));
        }

        let superblock = SuperBlock::new(blocks as u16);
        let fat = Fat::new(superblock.data_count.into());
        let directory = Directory::new();
        superblock.store(device.as_mut())?;
        fat.store(device.as_mut(), superblock.fat_blocks.into())?;
        directory.store(device.as_mut(), superblock.root_index)?;
        device.flush()?;
        info!("formatted volume: {blocks} blocks");
        Ok(Self {
            device,
            superblock,
            fat,
            directory,
            descriptors: DescriptorTable::new(),
        })
    }

    /// Write the superblock, allocation table, and directory back, flush the
    /// device, and release the session.
    pub fn unmount(mut self) -> Result<()> {
        self.superblock.store(self.device.as_mut())?;
        self.fat
            .store(self.device.as_mut(), self.superblock.fat_blocks.into())?;
        self.directory
            .store(self.device.as_mut(), self.superblock.root_index)?;
        self.device.flush()?;
        info!("unmounted volume");
        Ok(())
    }

    /// Volume statistics. Pure read, no mutation.
    pub fn info(&self) -> FsInfo {
        FsInfo {
            total_blocks: self.superblock.total_blocks,
            fat_blocks: self.superblock.fat_blocks,
            root_index: self.superblock.root_index,
            data_start: self.superblock.data_start,
            data_count: self.superblock.data_count,
            free_data_blocks: self.fat.free_count(),
            free_directory_slots: self.directory.free_slots(),
        }
    }

    /// Create an empty file named `name`.
    pub fn create(&mut self, name: &str) -> Result<()> {
        let index = self.directory.create(name)?;
        debug!("created {name:?} in slot {index}");
        Ok(())
    }

    /// Delete `name`, returning every block it owned to the free pool.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let index = self
            .directory
            .position_of(name)
            .ok_or_else(|| FsError::NotFound(name.to_owned()))?;
        let head = self.directory.entry(index).head();
        if head != FAT_EOC {
            self.fat.release(head)?;
        }
        self.directory.clear(index);
        debug!("deleted {name:?}");
        Ok(())
    }

    /// Directory listing in slot order. Lazy and restartable: each call
    /// walks the table from the top.
    pub fn list(&self) -> impl Iterator<Item = FileInfo> + '_ {
        self.directory.iter()
    }

    /// The block chain backing `name`, in order.
    pub fn chain_of(&self, name: &str) -> Result<Vec<u16>> {
        let index = self
            .directory
            .position_of(name)
            .ok_or_else(|| FsError::NotFound(name.to_owned()))?;
        self.fat.chain_blocks(self.directory.entry(index).head())
    }

    /// Open `name`, returning a descriptor handle with its cursor at 0.
    pub fn open(&mut self, name: &str) -> Result<usize> {
        let entry = self
            .directory
            .position_of(name)
            .ok_or_else(|| FsError::NotFound(name.to_owned()))?;
        let fd = self.descriptors.open(entry)?;
        debug!("opened {name:?} as fd {fd}");
        Ok(fd)
    }

    /// Release the descriptor behind `fd`.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.descriptors.close(fd)
    }

    /// Current size of the file behind `fd`, in bytes.
    pub fn stat(&self, fd: usize) -> Result<u32> {
        let descriptor = self.descriptors.get(fd)?;
        Ok(self.directory.entry(descriptor.entry).size())
    }

    /// Move the cursor of `fd`. Seeking to exactly the file size is valid
    /// and positions at end-of-file; anything past that is rejected, which
    /// is what rules out sparse files.
    pub fn seek(&mut self, fd: usize, offset: usize) -> Result<()> {
        let descriptor = self.descriptors.get(fd)?;
        let size = self.directory.entry(descriptor.entry).size() as usize;
        if offset > size {
            return Err(FsError::SeekPastEnd { offset, size });
        }
        self.descriptors.get_mut(fd)?.offset = offset;
        Ok(())
    }

    /// Write `data` at the cursor of `fd`, growing the file and its chain as
    /// needed. Returns the bytes actually committed: fewer than requested
    /// only when the data region fills up mid-write, 0 when not even the
    /// first block could be allocated.
    pub fn write(&mut self, fd: usize, data: &[u8]) -> Result<usize> {
        let descriptor = self.descriptors.get(fd)?;
        if data.is_empty() {
            return Ok(0);
        }

        let entry = descriptor.entry;
        let start = descriptor.offset;
        let mut current = match self.block_for_write(entry, start)? {
            Some(block) => block,
            None => return Ok(0),
        };

        let mut bounce = [0u8; BLOCK_SIZE];
        let mut pos = start;
        let mut written = 0;
        while written < data.len() {
            let in_block = pos % BLOCK_SIZE;
            let len = (BLOCK_SIZE - in_block).min(data.len() - written);
            let device_index = self.data_block_index(current);
            self.device.read_block(device_index, &mut bounce)?;
            bounce[in_block..in_block + len].copy_from_slice(&data[written..written + len]);
            self.device.write_block(device_index, &bounce)?;
            pos += len;
            written += len;

            if written < data.len() {
                // the next byte sits on a block boundary: follow the chain,
                // growing it when the current block is the tail
                current = match self.fat.get(current)? {
                    FatEntry::Next(next) => next,
                    FatEntry::EndOfChain => match self.allocate_block(entry, Some(current))? {
                        Some(block) => block,
                        // device full: stop at the last committed byte
                        None => break,
                    },
                    FatEntry::Free => return Err(FsError::CorruptChain(current)),
                };
            }
        }

        let end = (start + written) as u32;
        let dir_entry = self.directory.entry_mut(entry);
        if end > dir_entry.size() {
            dir_entry.set_size(end);
        }
        self.descriptors.get_mut(fd)?.offset = pos;
        debug!("fd {fd}: wrote {written} bytes at offset {start}");
        Ok(written)
    }

    /// Read up to `len` bytes at the cursor of `fd`. Short counts mark
    /// end-of-file; a file with no blocks yet reads as empty.
    pub fn read(&mut self, fd: usize, len: usize) -> Result<Vec<u8>> {
        let descriptor = self.descriptors.get(fd)?;
        let entry = self.directory.entry(descriptor.entry);
        let size = entry.size() as usize;
        let head = entry.head();

        let start = descriptor.offset;
        let len = len.min(size.saturating_sub(start));
        if len == 0 {
            return Ok(Vec::new());
        }
        let mut current = match self.fat.walk(head, start / BLOCK_SIZE)? {
            ChainPos::Block(block) => block,
            ChainPos::End(_) => return Ok(Vec::new()),
        };

        let mut out = vec![0u8; len];
        let mut bounce = [0u8; BLOCK_SIZE];
        let mut pos = start;
        let mut copied = 0;
        while copied < len {
            let in_block = pos % BLOCK_SIZE;
            let n = (BLOCK_SIZE - in_block).min(len - copied);
            self.device
                .read_block(self.data_block_index(current), &mut bounce)?;
            out[copied..copied + n].copy_from_slice(&bounce[in_block..in_block + n]);
            pos += n;
            copied += n;

            if copied < len {
                current = match self.fat.get(current)? {
                    FatEntry::Next(next) => next,
                    // the recorded size promised more data than the chain holds
                    _ => return Err(FsError::CorruptChain(current)),
                };
            }
        }
        self.descriptors.get_mut(fd)?.offset = pos;
        debug!("fd {fd}: read {copied} bytes at offset {start}");
        Ok(out)
    }
}

impl FlatFs {
    /// Device index of data block `block`.
    fn data_block_index(&self, block: u16) -> usize {
        usize::from(self.superblock.data_start) + usize::from(block)
    }

    /// Claim a free block and append it to the chain of directory slot
    /// `entry`: linked after `tail` if the file has one, installed as the
    /// head otherwise. `None` when the data region is full.
    fn allocate_block(&mut self, entry: usize, tail: Option<u16>) -> Result<Option<u16>> {
        let Some(block) = self.fat.allocate() else {
            debug!("allocation failed: no free data blocks");
            return Ok(None);
        };
        match tail {
            Some(tail) => self.fat.link(tail, block)?,
            None => self.directory.entry_mut(entry).set_head(block),
        }
        Ok(Some(block))
    }

    /// Data block holding byte `offset` of the file in slot `entry`,
    /// allocating the next chain link when the cursor sits just past the
    /// tail. `None` means the device is full.
    fn block_for_write(&mut self, entry: usize, offset: usize) -> Result<Option<u16>> {
        let head = self.directory.entry(entry).head();
        match self.fat.walk(head, offset / BLOCK_SIZE)? {
            ChainPos::Block(block) => Ok(Some(block)),
            ChainPos::End(tail) => self.allocate_block(entry, tail),
        }
    }
}
