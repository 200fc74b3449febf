use std::fs;
use std::path::PathBuf;

use pl_core::ParleyError;

use crate::{map_cli_script_path, map_cli_script_read};

#[derive(Debug, Clone)]
pub(crate) struct LoadedScript {
    pub(crate) path: PathBuf,
    pub(crate) json: String,
}

pub(crate) fn load_script_file(script: &str) -> Result<LoadedScript, ParleyError> {
    let path = resolve_script_path(script)?;
    let json = fs::read_to_string(&path).map_err(map_cli_script_read)?;
    Ok(LoadedScript { path, json })
}

pub(crate) fn resolve_script_path(script: &str) -> Result<PathBuf, ParleyError> {
    let path = PathBuf::from(script);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_script_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(ParleyError::new(
            "CLI_SCRIPT_NOT_FOUND",
            format!("script does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_file() {
        return Err(ParleyError::new(
            "CLI_SCRIPT_NOT_FILE",
            format!("script is not a file: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}
