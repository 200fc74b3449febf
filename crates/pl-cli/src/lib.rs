use std::ffi::OsString;
use std::sync::Once;

use clap::Parser;
use pl_api::{compile_script_from_json, create_dialogue_from_json, CreateDialogueFromJsonOptions};
use pl_core::{ParleyError, TracingSink};

mod cli_args;
mod error_map;
mod line_play;
mod source_loader;

pub(crate) use cli_args::{CheckArgs, Cli, Mode, PlayArgs};
pub(crate) use error_map::{emit_error, map_cli_script_path, map_cli_script_read, map_play_io};
pub(crate) use line_play::run_play_line_mode;
#[cfg(test)]
pub(crate) use line_play::{handle_play_command, run_play_line_mode_with_io, PlayCommandAction};
pub(crate) use source_loader::load_script_file;
#[cfg(test)]
pub(crate) use source_loader::resolve_script_path;

/// Filter for stderr logging, `warn` when unset.
pub const LOG_ENV: &str = "PARLEY_LOG";

static TRACING_INIT: Once = Once::new();

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_tracing();
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(filter)
            .try_init();
    });
}

fn run(cli: Cli) -> Result<i32, ParleyError> {
    match cli.command {
        Mode::Check(args) => run_check(args),
        Mode::Play(args) => run_play(args),
    }
}

fn run_check(args: CheckArgs) -> Result<i32, ParleyError> {
    let loaded = load_script_file(&args.script)?;
    let script = compile_script_from_json(&loaded.json, &TracingSink)?;

    println!("RESULT:OK");
    println!("SCRIPT:{}", loaded.path.display());
    println!("NODES:{}", script.nodes.len());
    println!("HEADER_NODES:{}", script.header_nodes.len());
    println!("LABELS:{}", script.labels.len());
    println!(
        "SPEAKERS_JSON:{}",
        serde_json::to_string(script.speakers()).unwrap_or_else(|_| "[]".to_string())
    );
    Ok(0)
}

fn run_play(args: PlayArgs) -> Result<i32, ParleyError> {
    let loaded = load_script_file(&args.script)?;
    tracing::debug!(script = %loaded.path.display(), label = ?args.label, "play");
    let mut options = CreateDialogueFromJsonOptions::new(loaded.json);
    options.start_label = args.label.clone();
    let mut dialogue = create_dialogue_from_json(options)?;
    run_play_line_mode(&mut dialogue, args.label.as_deref())
}
