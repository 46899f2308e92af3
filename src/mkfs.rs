//! Create a new volume image on the host filesystem.
use std::fs::OpenOptions;
use std::path::Path;

use byte_unit::Byte;
use log::info;

use crate::block_device::{ImageFile, BLOCK_SIZE};
use crate::error::{FsError, Result};
use crate::fs::FlatFs;

/// Create the image file at `image_file_path`, sized to `block_count`
/// blocks, and format it as an empty volume. The path must not exist yet.
///
/// # Params
/// - `image_file_path`: where the image file is created
/// - `block_count`: total volume size in blocks, metadata included
pub fn mkfs<P>(image_file_path: P, block_count: usize) -> Result<()>
where
    P: AsRef<Path>,
{
    let path = image_file_path.as_ref();
    let len = block_count as u64 * BLOCK_SIZE as u64;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(FsError::DeviceOpen)?;
    // regions past the metadata stay zero via `set_len`
    file.set_len(len)?;
    drop(file);

    let fs = FlatFs::format(Box::new(ImageFile::open(path)?))?;
    fs.unmount()?;
    info!(
        "created image {path:?}: {block_count} blocks, {}",
        Byte::from_bytes(len as u128).get_appropriate_unit(true)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::str::FromStr;

    #[test]
    fn test_mkfs() {
        let tmp_file = PathBuf::from_str("/tmp/flatfs_mkfs.img").unwrap();
        if tmp_file.exists() {
            std::fs::remove_file(&tmp_file).unwrap();
        }

        mkfs(&tmp_file, 64).unwrap();
        assert_eq!(
            std::fs::metadata(&tmp_file).unwrap().len(),
            64 * BLOCK_SIZE as u64
        );

        // the new image mounts and reports an empty volume
        let fs = FlatFs::mount_image(&tmp_file).unwrap();
        let info = fs.info();
        assert_eq!(info.total_blocks, 64);
        assert_eq!(info.data_count, 61);
        assert_eq!(fs.list().count(), 0);

        std::fs::remove_file(&tmp_file).unwrap()
    }

    #[test]
    fn test_mkfs_refuses_to_clobber() {
        let tmp_file = PathBuf::from_str("/tmp/flatfs_mkfs_clobber.img").unwrap();
        if tmp_file.exists() {
            std::fs::remove_file(&tmp_file).unwrap();
        }

        mkfs(&tmp_file, 16).unwrap();
        assert!(matches!(
            mkfs(&tmp_file, 16),
            Err(FsError::DeviceOpen(_))
        ));

        std::fs::remove_file(&tmp_file).unwrap()
    }
}
