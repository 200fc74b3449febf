use std::fmt::Display;
use std::io::{self, BufRead, Write};

use pl_core::ParleyError;
use pl_runtime::Dialogue;

use crate::map_play_io;

const HELP: &str = "commands: :help :vars :restart :quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayCommandAction {
    NotHandled,
    Continue,
    RefreshStep,
    Quit,
}

pub(crate) fn run_play_line_mode(
    dialogue: &mut Dialogue,
    restart_label: Option<&str>,
) -> Result<i32, ParleyError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(dialogue, restart_label, &mut reader, &mut writer)
}

pub(crate) fn run_play_line_mode_with_io(
    dialogue: &mut Dialogue,
    restart_label: Option<&str>,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ParleyError> {
    emit_line(writer, "Parley")?;
    emit_line(writer, HELP)?;

    let mut rendered_line = None;
    loop {
        if dialogue.is_ended() {
            emit_line(writer, "")?;
            emit_line(writer, "[END]")?;
            return Ok(0);
        }
        render_step(dialogue, &mut rendered_line, writer)?;

        loop {
            let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                emit_line(writer, "")?;
                emit_line(writer, "bye")?;
                return Ok(0);
            };
            match handle_play_command(raw.trim(), dialogue, restart_label, writer)? {
                PlayCommandAction::Continue => continue,
                PlayCommandAction::RefreshStep => break,
                PlayCommandAction::Quit => return Ok(0),
                PlayCommandAction::NotHandled => {}
            }

            if !dialogue.is_awaiting_choice() {
                dialogue.continue_dialogue();
                break;
            }
            match raw.trim().parse::<usize>() {
                Ok(index) if index < dialogue.number_of_choices() => {
                    dialogue.choose(index);
                    break;
                }
                _ => emit_line(writer, format!("invalid choice: {}", raw))?,
            }
        }
    }
}

/// Prints the current line unless `rendered_line` says it is already on screen,
/// then the choices.
fn render_step(
    dialogue: &Dialogue,
    rendered_line: &mut Option<usize>,
    writer: &mut dyn Write,
) -> Result<(), ParleyError> {
    let line = Some(dialogue.lines_shown());
    if *rendered_line != line && !dialogue.current_text().is_empty() {
        emit_line(writer, "")?;
        emit_line(
            writer,
            format!("{}: {}", dialogue.current_speaker(), dialogue.current_text()),
        )?;
    }
    *rendered_line = line;
    if dialogue.is_awaiting_choice() {
        for (index, choice) in dialogue.choices().iter().enumerate() {
            emit_line(writer, format!("  [{}] {}", index, choice.text))?;
        }
    } else {
        emit_line(writer, "  (enter to continue)")?;
    }
    Ok(())
}

pub(crate) fn handle_play_command(
    raw: &str,
    dialogue: &mut Dialogue,
    restart_label: Option<&str>,
    writer: &mut dyn Write,
) -> Result<PlayCommandAction, ParleyError> {
    match raw {
        ":help" => {
            emit_line(writer, HELP)?;
            Ok(PlayCommandAction::Continue)
        }
        ":vars" => {
            if dialogue.variables().is_empty() {
                emit_line(writer, "(no variables)")?;
            }
            for (name, value) in dialogue.variables() {
                emit_line(writer, format!("{} = {}", name, value))?;
            }
            Ok(PlayCommandAction::Continue)
        }
        ":restart" => {
            dialogue.restart(false, restart_label);
            emit_line(writer, "restarted")?;
            Ok(PlayCommandAction::RefreshStep)
        }
        ":quit" => {
            emit_line(writer, "bye")?;
            Ok(PlayCommandAction::Quit)
        }
        _ => Ok(PlayCommandAction::NotHandled),
    }
}

/// `None` once the reader is exhausted.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, ParleyError> {
    write!(writer, "{}", prefix).map_err(map_play_io)?;
    writer.flush().map_err(map_play_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_play_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

fn emit_line(writer: &mut dyn Write, line: impl Display) -> Result<(), ParleyError> {
    writeln!(writer, "{}", line).map_err(map_play_io)
}
