use clap::Parser;
use flatfs::cli_interface::FlatFsCli;
use flatfs::{FlatFs, FAT_EOC};

/// a CLI interface to create a volume image, print its statistics,
/// or list the files it holds.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = FlatFsCli::parse();
    match args {
        FlatFsCli::Mkfs(args) => {
            // create a new volume image
            flatfs::mkfs::mkfs(args.image_file_path, args.block_count)?;
        }
        FlatFsCli::Info(args) => {
            let fs = FlatFs::mount_image(args.image_file_path)?;
            println!("FS Info:");
            println!("{}", fs.info());
            fs.unmount()?;
        }
        FlatFsCli::Ls(args) => {
            let fs = FlatFs::mount_image(args.image_file_path)?;
            println!("FS Ls:");
            for file in fs.list() {
                println!(
                    "file: {}, size: {}, data_blk: {}",
                    file.name,
                    file.size,
                    file.head.unwrap_or(FAT_EOC)
                );
            }
            fs.unmount()?;
        }
    }
    Ok(())
}
