use pl_core::ParleyError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> ParleyError {
    ParleyError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: ParleyError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}

pub(crate) fn map_play_io(error: std::io::Error) -> ParleyError {
    map_error("CLI_PLAY_IO", error)
}

pub(crate) fn map_cli_script_path(error: std::io::Error) -> ParleyError {
    map_error("CLI_SCRIPT_PATH", error)
}

pub(crate) fn map_cli_script_read(error: std::io::Error) -> ParleyError {
    map_error("CLI_SCRIPT_READ", error)
}
