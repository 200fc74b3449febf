use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "parley")]
#[command(about = "Parley dialogue script checker and line-mode player")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Check(CheckArgs),
    Play(PlayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
    #[arg(long = "label")]
    pub(crate) label: Option<String>,
}
