use std::collections::BTreeMap;
use std::sync::Arc;

use pl_core::{DiagnosticSink, NodeIndex, Script, Value};

mod choices;
mod lifecycle;
mod step;
mod variables;


/// Upper bound on nodes visited by one command before traversal gives up.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

#[derive(Clone)]
pub struct DialogueOptions {
    /// Where logged faults go. `None` uses `TracingSink`.
    pub sink: Option<Arc<dyn DiagnosticSink>>,
    pub max_steps: usize,
}

impl Default for DialogueOptions {
    fn default() -> Self {
        Self {
            sink: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    NotStarted,
    /// Waiting for `continue_dialogue` or `choose`.
    Running,
    Ended,
}

/// One entry of the visible choice list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceEntry {
    pub text: String,
    pub target: Option<NodeIndex>,
}

/// One running conversation over a shared, read-only `Script`.
///
/// The dialogue owns its variable environment; the graph is only ever read, so
/// the same `Arc<Script>` can back any number of dialogues.
pub struct Dialogue {
    script: Arc<Script>,
    sink: Arc<dyn DiagnosticSink>,
    max_steps: usize,

    variables: BTreeMap<String, Value>,
    state: DialogueState,
    current_speech: Option<NodeIndex>,
    lines_shown: usize,
    choices: Vec<ChoiceEntry>,
    /// The choice list came from a Choice node rather than the implicit
    /// continue of a plain text line.
    awaiting_choice: bool,
}
