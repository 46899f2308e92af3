use log::trace;

use super::FAT_EOC;
use crate::block_device::{BlockDevice, BLOCK_SIZE};
use crate::error::{FsError, Result};
use crate::utils::fs_size_calculator::fat_entries_per_block;

/// One allocation-table entry. The raw 16-bit form exists only on disk;
/// everywhere else the entry is this tagged value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    /// The data block is unallocated.
    Free,
    /// The data block is the last link of its chain.
    EndOfChain,
    /// The data block is followed by this one.
    Next(u16),
}

impl FatEntry {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::Free,
            FAT_EOC => Self::EndOfChain,
            next => Self::Next(next),
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            Self::Free => 0,
            Self::EndOfChain => FAT_EOC,
            Self::Next(next) => next,
        }
    }
}

/// Outcome of walking a chain a fixed number of links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPos {
    /// The block at the requested position.
    Block(u16),
    /// The chain ended first; the last existing link, if any.
    End(Option<u16>),
}

/// The in-memory allocation table: one entry per data block. Entry 0 is a
/// permanent guard so that 0 never doubles as a block index.
#[derive(Debug)]
pub struct Fat {
    entries: Vec<FatEntry>,
}

impl Fat {
    /// A fresh table for `data_count` data blocks, everything free except
    /// the guard.
    pub fn new(data_count: usize) -> Self {
        let mut entries = vec![FatEntry::Free; data_count];
        if let Some(guard) = entries.first_mut() {
            *guard = FatEntry::EndOfChain;
        }
        Self { entries }
    }

    /// Read the table from its blocks, starting at block 1.
    pub fn load(device: &dyn BlockDevice, fat_blocks: usize, data_count: usize) -> Result<Self> {
        let mut entries = Vec::with_capacity(data_count);
        let mut buf = [0u8; BLOCK_SIZE];
        'blocks: for block in 0..fat_blocks {
            device.read_block(1 + block, &mut buf)?;
            for pair in buf.chunks_exact(2) {
                if entries.len() == data_count {
                    break 'blocks;
                }
                entries.push(FatEntry::from_raw(u16::from_le_bytes([pair[0], pair[1]])));
            }
        }
        Ok(Self { entries })
    }

    /// Write the table back to its blocks. Slack entries past `data_count`
    /// are written as zero.
    pub fn store(&self, device: &mut dyn BlockDevice, fat_blocks: usize) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        for block in 0..fat_blocks {
            buf.fill(0);
            let start = (block * fat_entries_per_block()).min(self.entries.len());
            for (slot, entry) in buf.chunks_exact_mut(2).zip(&self.entries[start..]) {
                slot.copy_from_slice(&entry.to_raw().to_le_bytes());
            }
            device.write_block(1 + block, &buf)?;
        }
        Ok(())
    }

    pub fn get(&self, index: u16) -> Result<FatEntry> {
        self.entries
            .get(usize::from(index))
            .copied()
            .ok_or(FsError::CorruptChain(index))
    }

    fn set(&mut self, index: u16, entry: FatEntry) {
        self.entries[usize::from(index)] = entry;
    }

    /// Unallocated entries. The guard is allocated from birth, so an empty
    /// volume reports one less than its data-block count.
    pub fn free_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| **entry == FatEntry::Free)
            .count()
    }

    /// First-fit allocation: claim the first free entry past the guard and
    /// mark it terminal. `None` when the data region is full.
    pub fn allocate(&mut self) -> Option<u16> {
        let index = self
            .entries
            .iter()
            .skip(1)
            .position(|entry| *entry == FatEntry::Free)?
            + 1;
        self.entries[index] = FatEntry::EndOfChain;
        trace!("allocated data block {index}");
        Some(index as u16)
    }

    /// Append `block` after `tail`, which must currently terminate a chain.
    pub fn link(&mut self, tail: u16, block: u16) -> Result<()> {
        match self.get(tail)? {
            FatEntry::EndOfChain => {
                self.set(tail, FatEntry::Next(block));
                Ok(())
            }
            _ => Err(FsError::CorruptChain(tail)),
        }
    }

    /// Follow `steps` links from `head`. `head` may be the raw end-of-chain
    /// sentinel, meaning the file owns no blocks yet.
    pub fn walk(&self, head: u16, steps: usize) -> Result<ChainPos> {
        if head == FAT_EOC {
            return Ok(ChainPos::End(None));
        }
        let mut current = head;
        for _ in 0..steps {
            match self.get(current)? {
                FatEntry::Next(next) => current = next,
                FatEntry::EndOfChain => return Ok(ChainPos::End(Some(current))),
                FatEntry::Free => return Err(FsError::CorruptChain(current)),
            }
        }
        Ok(ChainPos::Block(current))
    }

    /// Collect the whole chain rooted at `head`, in order. A chain longer
    /// than the table can only be a cycle and is reported as corruption.
    pub fn chain_blocks(&self, head: u16) -> Result<Vec<u16>> {
        let mut blocks = Vec::new();
        let mut current = head;
        while current != FAT_EOC {
            if blocks.len() == self.entries.len() {
                return Err(FsError::CorruptChain(current));
            }
            blocks.push(current);
            current = match self.get(current)? {
                FatEntry::Next(next) => next,
                FatEntry::EndOfChain => FAT_EOC,
                FatEntry::Free => return Err(FsError::CorruptChain(current)),
            };
        }
        Ok(blocks)
    }

    /// Return every link of the chain rooted at `head` to the free pool.
    pub fn release(&mut self, head: u16) -> Result<()> {
        for block in self.chain_blocks(head)? {
            self.set(block, FatEntry::Free);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::MemDisk;

    #[test]
    fn raw_round_trip() {
        assert_eq!(FatEntry::from_raw(0), FatEntry::Free);
        assert_eq!(FatEntry::from_raw(FAT_EOC), FatEntry::EndOfChain);
        assert_eq!(FatEntry::from_raw(17), FatEntry::Next(17));
        for entry in [FatEntry::Free, FatEntry::EndOfChain, FatEntry::Next(9)] {
            assert_eq!(FatEntry::from_raw(entry.to_raw()), entry);
        }
    }

    #[test]
    fn guard_is_never_free() {
        let fat = Fat::new(16);
        assert_eq!(fat.get(0).unwrap(), FatEntry::EndOfChain);
        assert_eq!(fat.free_count(), 15);
    }

    #[test]
    fn allocation_is_first_fit_past_the_guard() {
        let mut fat = Fat::new(8);
        assert_eq!(fat.allocate(), Some(1));
        assert_eq!(fat.allocate(), Some(2));
        fat.release(1).unwrap();
        assert_eq!(fat.allocate(), Some(1));
    }

    #[test]
    fn allocation_fails_when_full() {
        let mut fat = Fat::new(3);
        assert_eq!(fat.allocate(), Some(1));
        assert_eq!(fat.allocate(), Some(2));
        assert_eq!(fat.allocate(), None);
    }

    #[test]
    fn link_and_walk_a_chain() {
        let mut fat = Fat::new(16);
        let a = fat.allocate().unwrap();
        let b = fat.allocate().unwrap();
        let c = fat.allocate().unwrap();
        fat.link(a, b).unwrap();
        fat.link(b, c).unwrap();

        assert_eq!(fat.walk(a, 0).unwrap(), ChainPos::Block(a));
        assert_eq!(fat.walk(a, 2).unwrap(), ChainPos::Block(c));
        assert_eq!(fat.walk(a, 3).unwrap(), ChainPos::End(Some(c)));
        assert_eq!(fat.walk(FAT_EOC, 0).unwrap(), ChainPos::End(None));
        assert_eq!(fat.chain_blocks(a).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn linking_past_a_non_terminal_block_is_corruption() {
        let mut fat = Fat::new(16);
        let a = fat.allocate().unwrap();
        let b = fat.allocate().unwrap();
        fat.link(a, b).unwrap();
        assert!(matches!(fat.link(a, 5), Err(FsError::CorruptChain(_))));
    }

    #[test]
    fn release_returns_every_link() {
        let mut fat = Fat::new(16);
        let a = fat.allocate().unwrap();
        let b = fat.allocate().unwrap();
        fat.link(a, b).unwrap();
        assert_eq!(fat.free_count(), 13);

        fat.release(a).unwrap();
        assert_eq!(fat.free_count(), 15);
        // releasing an empty chain is a no-op
        fat.release(FAT_EOC).unwrap();
        assert_eq!(fat.free_count(), 15);
    }

    #[test]
    fn cycles_are_detected() {
        let mut fat = Fat::new(8);
        let a = fat.allocate().unwrap();
        let b = fat.allocate().unwrap();
        fat.set(a, FatEntry::Next(b));
        fat.set(b, FatEntry::Next(a));
        assert!(matches!(fat.chain_blocks(a), Err(FsError::CorruptChain(_))));
        assert!(matches!(fat.release(a), Err(FsError::CorruptChain(_))));
    }

    #[test]
    fn store_load_round_trip() {
        let mut disk = MemDisk::new(64);
        let mut fat = Fat::new(61);
        let a = fat.allocate().unwrap();
        let b = fat.allocate().unwrap();
        fat.link(a, b).unwrap();

        fat.store(&mut disk, 1).unwrap();
        let loaded = Fat::load(&disk, 1, 61).unwrap();
        assert_eq!(loaded.get(0).unwrap(), FatEntry::EndOfChain);
        assert_eq!(loaded.get(a).unwrap(), FatEntry::Next(b));
        assert_eq!(loaded.get(b).unwrap(), FatEntry::EndOfChain);
        assert_eq!(loaded.free_count(), fat.free_count());
    }
}
