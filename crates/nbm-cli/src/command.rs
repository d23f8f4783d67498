use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::color::Color;

pub const CONFIG_ENV: &str = "NBM_CONFIG";
pub const STORE_ENV: &str = "NBM_STORE";

pub type CommandResult = color_eyre::eyre::Result<String>;

#[derive(Parser, Clone)]
#[command(name = "NB Music session", version, about = "Bootstrap and inspect the NB Music playback session", long_about = None, disable_version_flag = true)]
pub struct Cli {
    // Optional as a workaround for https://github.com/clap-rs/clap/issues/3572
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short = 'c', long, global = true, value_enum, default_value_t = Color::Auto)]
    pub color: Color,

    #[arg(
        long,
        global = true,
        env = CONFIG_ENV,
        help = "JSON session configuration. Defaults to the built-in platform settings."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = STORE_ENV,
        help = "Credential store file. Defaults to nbm/session.json in the user config directory."
    )]
    pub store: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Navigation timeout in seconds, overriding the configuration."
    )]
    pub timeout: Option<u64>,

    // Lowercase short flag to match the desktop client
    #[arg(short = 'v', long, action = clap::builder::ArgAction::Version)]
    pub version: (),
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    #[command(
        long_about = "Resolve the session credential from the store, or acquire one with a headless browser, and install the request interceptor."
    )]
    Bootstrap,

    #[command(long_about = "Bootstrap the session, then GET a URL through the request pipeline.")]
    Fetch {
        #[arg(help = "URL to request")]
        url: String,
    },

    #[command(long_about = "Show whether a credential is cached.")]
    Status,

    #[command(long_about = "Remove the cached credential. The next bootstrap acquires a new one.")]
    Clear,
}
