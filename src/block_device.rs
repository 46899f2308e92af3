//! Block devices: fixed-size block storage addressed by integer index.
//!
//! The engine talks to storage only through [`BlockDevice`]. [`ImageFile`]
//! is the production device over a memory-mapped disk image; [`MemDisk`] is
//! a volatile device for tests and experiments.

use std::fs::OpenOptions;
use std::ops::Range;
use std::path::Path;

use log::debug;
use memmap2::MmapMut;

use crate::error::{FsError, Result};

/// Fixed block size of every volume, in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Synchronous fixed-block storage. Calls either complete or fail; there is
/// no retry and no partial block transfer.
pub trait BlockDevice {
    /// Number of blocks the device holds.
    fn block_count(&self) -> usize;

    /// Read block `index` into `buf`, which must be [`BLOCK_SIZE`] long.
    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()>;

    /// Write `buf`, which must be [`BLOCK_SIZE`] long, to block `index`.
    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()>;

    /// Persist outstanding writes to the backing store.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

fn block_range(index: usize, block_count: usize) -> Result<Range<usize>> {
    if index >= block_count {
        return Err(FsError::BlockOutOfRange(index));
    }
    let start = index * BLOCK_SIZE;
    Ok(start..start + BLOCK_SIZE)
}

/// A disk image on the host filesystem, accessed through a writable memory
/// map.
#[derive(Debug)]
pub struct ImageFile {
    map: MmapMut,
    blocks: usize,
}

impl ImageFile {
    /// Open an existing image for reading and writing. The image length must
    /// be a whole number of blocks.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(FsError::DeviceOpen)?;
        let len = file.metadata().map_err(FsError::DeviceOpen)?.len();
        if len == 0 || len % BLOCK_SIZE as u64 != 0 {
            return Err(FsError::MisalignedImage(len));
        }
        let map = unsafe { MmapMut::map_mut(&file).map_err(FsError::DeviceOpen)? };
        let blocks = (len / BLOCK_SIZE as u64) as usize;
        debug!("opened image {path:?}: {blocks} blocks");
        Ok(Self { map, blocks })
    }
}

impl BlockDevice for ImageFile {
    fn block_count(&self) -> usize {
        self.blocks
    }

    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), BLOCK_SIZE);
        let range = block_range(index, self.blocks)?;
        buf.copy_from_slice(&self.map[range]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), BLOCK_SIZE);
        let range = block_range(index, self.blocks)?;
        self.map[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.map.flush()?)
    }
}

/// A volatile in-memory device. Contents vanish with the value, which makes
/// it the device of choice for tests.
#[derive(Debug, Clone)]
pub struct MemDisk {
    data: Vec<u8>,
}

impl MemDisk {
    pub fn new(blocks: usize) -> Self {
        Self {
            data: vec![0; blocks * BLOCK_SIZE],
        }
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> usize {
        self.data.len() / BLOCK_SIZE
    }

    fn read_block(&self, index: usize, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), BLOCK_SIZE);
        let range = block_range(index, self.block_count())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), BLOCK_SIZE);
        let range = block_range(index, self.block_count())?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_disk_round_trip() {
        let mut disk = MemDisk::new(4);
        assert_eq!(disk.block_count(), 4);

        let block = [0xabu8; BLOCK_SIZE];
        disk.write_block(2, &block).unwrap();

        let mut back = [0u8; BLOCK_SIZE];
        disk.read_block(2, &mut back).unwrap();
        assert_eq!(back, block);

        disk.read_block(0, &mut back).unwrap();
        assert_eq!(back, [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn mem_disk_rejects_out_of_range() {
        let mut disk = MemDisk::new(2);
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(matches!(
            disk.read_block(2, &mut buf),
            Err(FsError::BlockOutOfRange(2))
        ));
        assert!(matches!(
            disk.write_block(7, &buf),
            Err(FsError::BlockOutOfRange(7))
        ));
    }

    #[test]
    fn image_file_round_trip() {
        let path = std::env::temp_dir().join("flatfs_image_file_round_trip.img");
        if path.exists() {
            std::fs::remove_file(&path).unwrap();
        }
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(3 * BLOCK_SIZE as u64).unwrap();
        drop(file);

        let mut image = ImageFile::open(&path).unwrap();
        assert_eq!(image.block_count(), 3);
        let block = [7u8; BLOCK_SIZE];
        image.write_block(1, &block).unwrap();
        image.flush().unwrap();
        drop(image);

        let image = ImageFile::open(&path).unwrap();
        let mut back = [0u8; BLOCK_SIZE];
        image.read_block(1, &mut back).unwrap();
        assert_eq!(back, block);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn image_file_rejects_misaligned_length() {
        let path = std::env::temp_dir().join("flatfs_image_file_misaligned.img");
        if path.exists() {
            std::fs::remove_file(&path).unwrap();
        }
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(BLOCK_SIZE as u64 + 100).unwrap();
        drop(file);

        assert!(matches!(
            ImageFile::open(&path),
            Err(FsError::MisalignedImage(_))
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
