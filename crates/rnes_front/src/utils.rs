use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(clap::Parser, Debug)]
#[clap(version, about)]
pub struct MainArgs {
    /// An iNES ROM to load at startup.
    pub rom: Option<PathBuf>,
    /// Stop emulation as soon as the startup ROM has loaded.
    #[clap(short, long)]
    pub start_paused: bool,
    /// Use this config file instead of the one in the platform's config directory.
    #[clap(short, long)]
    pub config: Option<PathBuf>,
    /// Overrides the log level from the config.
    #[clap(short, long)]
    pub log_level: Option<LevelFilter>,
}

pub fn parse_main_args() -> MainArgs {
    MainArgs::parse()
}
