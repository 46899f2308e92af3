//! This module contains functions to calculate the geometry of the on-disk
//! layout: superblock, allocation table, directory, data region.

use crate::block_device::BLOCK_SIZE;

/// Allocation-table entries that fit one block.
pub const fn fat_entries_per_block() -> usize {
    BLOCK_SIZE / 2
}

/// Smallest allocation-table block count whose capacity covers the data
/// region of a `total_blocks` volume.
///
/// Every extra table block shrinks the data region by one, so the two are
/// solved together.
/// # Example
/// ```
/// use flatfs::utils::fs_size_calculator::fat_blocks_needed;
/// assert_eq!(fat_blocks_needed(64), 1);
/// assert_eq!(fat_blocks_needed(8192), 4);
/// ```
pub fn fat_blocks_needed(total_blocks: usize) -> usize {
    let mut fat_blocks = 1;
    loop {
        let data_blocks = total_blocks.saturating_sub(2 + fat_blocks);
        if fat_blocks * fat_entries_per_block() >= data_blocks {
            return fat_blocks;
        }
        fat_blocks += 1;
    }
}

/// Data blocks available in a `total_blocks` volume after the superblock,
/// allocation table, and directory take their share.
pub fn data_blocks(total_blocks: usize) -> usize {
    total_blocks.saturating_sub(2 + fat_blocks_needed(total_blocks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_table_block_covers_small_volumes() {
        // 2048 entries per block covers everything up to 2051 total blocks
        assert_eq!(fat_blocks_needed(4), 1);
        assert_eq!(fat_blocks_needed(2051), 1);
        assert_eq!(fat_blocks_needed(2052), 2);
    }

    #[test]
    fn data_region_accounts_for_metadata() {
        assert_eq!(data_blocks(64), 61);
        assert_eq!(data_blocks(2052), 2048);
        assert_eq!(data_blocks(8192), 8186);
    }

    #[test]
    fn largest_volume_fits_the_table() {
        let total = usize::from(u16::MAX);
        let fat_blocks = fat_blocks_needed(total);
        assert!(fat_blocks * fat_entries_per_block() >= data_blocks(total));
    }
}
