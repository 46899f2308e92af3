use serde::{Deserialize, Serialize};

use super::SIGNATURE;
use crate::block_device::{BlockDevice, BLOCK_SIZE};
use crate::error::{FsError, Result};
use crate::utils::fs_size_calculator;
use crate::utils::traits::DiskEncode;

/// Block 0 of every volume: identifies the format and locates the other
/// regions. The remainder of the block past the encoded fields is zero
/// padding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    signature: [u8; 8],
    /// Blocks in the whole volume, metadata included.
    pub total_blocks: u16,
    /// Index of the directory block.
    pub root_index: u16,
    /// First block of the data region.
    pub data_start: u16,
    /// Blocks in the data region.
    pub data_count: u16,
    /// Blocks occupied by the allocation table.
    pub fat_blocks: u8,
}

impl DiskEncode for SuperBlock {}

impl SuperBlock {
    /// Encoded width of the fields on disk.
    pub const ENCODED_LEN: usize = 17;

    /// Lay out a fresh volume of `total_blocks` blocks.
    pub fn new(total_blocks: u16) -> Self {
        let fat_blocks = fs_size_calculator::fat_blocks_needed(total_blocks.into()) as u8;
        let root_index = 1 + u16::from(fat_blocks);
        let data_start = root_index + 1;
        Self {
            signature: SIGNATURE,
            total_blocks,
            root_index,
            data_start,
            data_count: total_blocks - data_start,
            fat_blocks,
        }
    }

    pub fn load(device: &dyn BlockDevice) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(0, &mut buf)?;
        Self::decode_from(&buf)
    }

    pub fn store(&self, device: &mut dyn BlockDevice) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.encode_into(&mut buf)?;
        device.write_block(0, &buf)
    }

    /// Reject volumes this engine cannot have written: wrong signature, a
    /// size disagreeing with the device, or region indices that do not
    /// describe the documented layout.
    pub fn validate(&self, device_blocks: usize) -> Result<()> {
        if self.signature != SIGNATURE {
            return Err(FsError::BadSignature);
        }
        if usize::from(self.total_blocks) != device_blocks {
            return Err(FsError::BlockCountMismatch {
                recorded: self.total_blocks,
                actual: device_blocks,
            });
        }
        let fat_capacity =
            usize::from(self.fat_blocks) * fs_size_calculator::fat_entries_per_block();
        let consistent = self.fat_blocks >= 1
            && self.root_index == 1 + u16::from(self.fat_blocks)
            && self.data_start == self.root_index + 1
            && self.total_blocks.checked_sub(self.data_start) == Some(self.data_count)
            && self.data_count >= 1
            && usize::from(self.data_count) <= fat_capacity;
        if !consistent {
            return Err(FsError::BadLayout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_device::MemDisk;

    #[test]
    fn encodes_to_the_documented_width() {
        let superblock = SuperBlock::new(64);
        let mut buf = [0u8; BLOCK_SIZE];
        let written = superblock.encode_into(&mut buf).unwrap();
        assert_eq!(written, SuperBlock::ENCODED_LEN);
        assert_eq!(&buf[..8], b"ECS150FS");
        // total_blocks is little-endian right after the signature
        assert_eq!(buf[8..10], 64u16.to_le_bytes());
    }

    #[test]
    fn store_load_round_trip() {
        let mut disk = MemDisk::new(64);
        let superblock = SuperBlock::new(64);
        superblock.store(&mut disk).unwrap();
        let loaded = SuperBlock::load(&disk).unwrap();
        assert_eq!(loaded, superblock);
        loaded.validate(64).unwrap();
    }

    #[test]
    fn fresh_layout_is_consistent() {
        let superblock = SuperBlock::new(8192);
        assert_eq!(superblock.fat_blocks, 4);
        assert_eq!(superblock.root_index, 5);
        assert_eq!(superblock.data_start, 6);
        assert_eq!(superblock.data_count, 8186);
        superblock.validate(8192).unwrap();
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut superblock = SuperBlock::new(64);
        superblock.signature = *b"NOTAFSXX";
        assert!(matches!(
            superblock.validate(64),
            Err(FsError::BadSignature)
        ));
    }

    #[test]
    fn rejects_block_count_mismatch() {
        let superblock = SuperBlock::new(64);
        assert!(matches!(
            superblock.validate(32),
            Err(FsError::BlockCountMismatch {
                recorded: 64,
                actual: 32
            })
        ));
    }

    #[test]
    fn rejects_inconsistent_layout() {
        let mut superblock = SuperBlock::new(64);
        superblock.data_start = 9;
        assert!(matches!(superblock.validate(64), Err(FsError::BadLayout)));
    }
}
