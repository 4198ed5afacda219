use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tdl_core::CleanupPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "torrent-downloader",
    author,
    version,
    about = "Downloads a torrent file or magnet link into a directory",
    long_about = None
)]
pub struct Args {
    /// Directory the torrent contents are written to
    pub download_dir: PathBuf,

    /// Path to a .torrent file or a magnet link
    pub source: String,

    /// Directory for the log file (defaults to the download directory)
    pub log_dir: Option<PathBuf>,

    /// Seconds between progress reports
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,

    /// How files are judged incomplete when the download is interrupted
    #[arg(long, value_enum, default_value_t = CleanupMode::PerFile)]
    pub cleanup: CleanupMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CleanupMode {
    /// Compare each file's length with the bytes completed across the torrent
    Aggregate,
    /// Compare each file's length with its own completed bytes
    PerFile,
}

impl From<CleanupMode> for CleanupPolicy {
    fn from(mode: CleanupMode) -> Self {
        match mode {
            CleanupMode::Aggregate => Self::Aggregate,
            CleanupMode::PerFile => Self::PerFile,
        }
    }
}
