use std::path::PathBuf;

use clap::Parser;

/// Interactive viewer for the tableau.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration; the built-in installation is used when omitted
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides `asset_root` from the configuration
    #[arg(short = 'r', long = "assets", value_name = "DIR")]
    pub asset_root: Option<PathBuf>,

    /// Start the choreography as soon as everything has loaded
    #[arg(short = 'a', long = "autoplay")]
    pub autoplay: bool,

    /// Quit after this many frames
    #[arg(long = "frames", value_name = "N")]
    pub frames: Option<u64>,

    #[arg(long = "width", default_value_t = 1280)]
    pub width: u32,

    #[arg(long = "height", default_value_t = 720)]
    pub height: u32,

    /// Verbosity: -v info, -vv debug, -vvv trace (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
