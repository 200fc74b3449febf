use std::sync::Arc;

use pl_compiler::{compile_script, ScriptSource};
use pl_core::{DiagnosticSink, ParleyError, Script, TracingSink};
use pl_runtime::{Dialogue, DialogueOptions, DEFAULT_MAX_STEPS};

#[derive(Clone)]
pub struct CreateDialogueFromJsonOptions {
    pub script_json: String,
    pub start_label: Option<String>,
    pub sink: Option<Arc<dyn DiagnosticSink>>,
    pub max_steps: Option<usize>,
}

impl CreateDialogueFromJsonOptions {
    pub fn new(script_json: impl Into<String>) -> Self {
        Self {
            script_json: script_json.into(),
            start_label: None,
            sink: None,
            max_steps: None,
        }
    }
}

pub fn parse_script_source(script_json: &str) -> Result<ScriptSource, ParleyError> {
    serde_json::from_str(script_json).map_err(|error| {
        ParleyError::new(
            "API_SCRIPT_JSON",
            format!("Script document is not valid JSON: {}.", error),
        )
    })
}

pub fn compile_script_from_json(
    script_json: &str,
    sink: &dyn DiagnosticSink,
) -> Result<Script, ParleyError> {
    let source = parse_script_source(script_json)?;
    compile_script(&source, sink)
}

/// Compile `options.script_json` and return a dialogue that has already been
/// started, at `start_label` when one is given.
pub fn create_dialogue_from_json(
    options: CreateDialogueFromJsonOptions,
) -> Result<Dialogue, ParleyError> {
    let sink: Arc<dyn DiagnosticSink> = options.sink.unwrap_or_else(|| Arc::new(TracingSink));
    let script = compile_script_from_json(&options.script_json, sink.as_ref())?;

    if let Some(label) = &options.start_label {
        if script.node_by_label(label).is_none() {
            return Err(ParleyError::new(
                "API_START_LABEL_NOT_FOUND",
                format!("Start label \"{}\" is not defined.", label),
            ));
        }
    }

    let mut dialogue = Dialogue::new(
        Arc::new(script),
        DialogueOptions {
            sink: Some(sink),
            max_steps: options.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
        },
    );
    match options.start_label.as_deref() {
        // A fresh environment, entered directly at the label.
        Some(label) => {
            dialogue.restart(false, Some(label));
        }
        None => dialogue.start(),
    }
    Ok(dialogue)
}
