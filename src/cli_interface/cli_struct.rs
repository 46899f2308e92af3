use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum FlatFsCli {
    /// create a new volume image
    Mkfs(MkfsArgs),
    /// print volume statistics
    Info(ImageArgs),
    /// list the files on a volume
    Ls(ImageArgs),
}

/// make a new volume subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new volume image")]
pub struct MkfsArgs {
    /// the path of the volume image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the size of the volume in blocks
    #[clap(short, long)]
    pub block_count: usize,
}

/// subcommands operating on an existing image
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version)]
pub struct ImageArgs {
    /// the path of the volume image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

/// test the `FlatFsCli` struct
/// test `mkfs` subcommand
#[cfg(test)]
mod mkfs_parse_args_tests {
    use super::*;
    /// test short parameter form
    #[test]
    fn test_short_parameter_form() {
        let args = FlatFsCli::parse_from(["flatfs", "mkfs", "-p", "test.img", "-b", "4096"]);
        assert_eq!(
            args,
            FlatFsCli::Mkfs(MkfsArgs {
                image_file_path: "test.img".to_string(),
                block_count: 4096,
            })
        );
    }
    /// test long parameter form
    #[test]
    fn test_long_parameter_form() {
        let image_file_path_name = concat!("--", "image-file-path");
        let args = FlatFsCli::parse_from([
            "flatfs",
            "mkfs",
            image_file_path_name,
            "test.img",
            "--block-count",
            "4096",
        ]);
        assert_eq!(
            args,
            FlatFsCli::Mkfs(MkfsArgs {
                image_file_path: "test.img".to_string(),
                block_count: 4096,
            })
        );
    }
}
