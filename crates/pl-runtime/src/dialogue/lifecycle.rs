use std::collections::BTreeMap;
use std::sync::Arc;

use pl_core::{Diagnostic, ParleyError, Script, ScriptNode, TracingSink};

use super::{ChoiceEntry, Dialogue, DialogueOptions, DialogueState};

impl Dialogue {
    pub fn new(script: Arc<Script>, options: DialogueOptions) -> Self {
        Self {
            script,
            sink: options.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            max_steps: options.max_steps.max(1),
            variables: BTreeMap::new(),
            state: DialogueState::NotStarted,
            current_speech: None,
            lines_shown: 0,
            choices: Vec::new(),
            awaiting_choice: false,
        }
    }

    /// Run the header against a fresh environment and move to the first line.
    pub fn start(&mut self) {
        tracing::debug!(nodes = self.script.nodes.len(), "dialogue start");
        self.reset_environment();
        self.current_speech = None;
        self.clear_step();
        self.state = DialogueState::Running;
        self.advance_from(self.script.first_node());
    }

    /// Jump back to the entry node, or to `label` when given.
    ///
    /// With `keep_variables` the environment survives and the header is not
    /// run again. Returns `false` and leaves the dialogue untouched when the
    /// label is unknown.
    pub fn restart(&mut self, keep_variables: bool, label: Option<&str>) -> bool {
        let target = match label {
            Some(label) => match self.script.node_by_label(label) {
                Some(index) => Some(index),
                None => {
                    self.report(Diagnostic::error(ParleyError::new(
                        "RUNTIME_LABEL_UNKNOWN",
                        format!("Cannot restart at unknown label \"{}\".", label),
                    )));
                    return false;
                }
            },
            None => self.script.first_node(),
        };

        tracing::debug!(keep_variables, label = label.unwrap_or(""), "dialogue restart");
        if !keep_variables || self.state == DialogueState::NotStarted {
            self.reset_environment();
        }
        self.current_speech = None;
        self.clear_step();
        self.state = DialogueState::Running;
        self.advance_from(target);
        true
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state == DialogueState::Ended
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    /// Speaker of the line on screen, empty before start and after the end.
    pub fn current_speaker(&self) -> &str {
        match self.current_speech.and_then(|index| self.script.node(index)) {
            Some(ScriptNode::Text { speaker, .. }) => speaker,
            _ => "",
        }
    }

    pub fn current_text(&self) -> &str {
        match self.current_speech.and_then(|index| self.script.node(index)) {
            Some(ScriptNode::Text { text, .. }) => text,
            _ => "",
        }
    }

    /// Number of lines that have become current so far, across restarts. A
    /// command that only replaces the choice list leaves it unchanged.
    pub fn lines_shown(&self) -> usize {
        self.lines_shown
    }

    pub fn number_of_choices(&self) -> usize {
        self.choices.len()
    }

    /// Text of visible choice `index`. The implicit continue of a plain line has
    /// empty text.
    pub fn choice_text(&self, index: usize) -> &str {
        match self.choices.get(index) {
            Some(choice) => &choice.text,
            None => {
                self.report(Diagnostic::error(choice_index_error(index, self.choices.len())));
                ""
            }
        }
    }

    pub fn choices(&self) -> &[ChoiceEntry] {
        &self.choices
    }

    /// Whether the current step shows a real choice list, which `continue_dialogue`
    /// cannot skip.
    pub fn is_awaiting_choice(&self) -> bool {
        self.awaiting_choice
    }

    fn reset_environment(&mut self) {
        self.variables.clear();
        self.run_header();
    }

    pub(super) fn clear_step(&mut self) {
        self.choices.clear();
        self.awaiting_choice = false;
    }

    pub(super) fn finish(&mut self) {
        tracing::debug!("dialogue ended");
        self.state = DialogueState::Ended;
        self.current_speech = None;
        self.clear_step();
    }

    pub(super) fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }
}

pub(super) fn choice_index_error(index: usize, available: usize) -> ParleyError {
    ParleyError::new(
        "RUNTIME_CHOICE_INDEX",
        format!(
            "Choice index \"{}\" is out of range ({} available).",
            index, available
        ),
    )
}
