use std::sync::Arc;

use pl_core::{Diagnostic, NodeIndex, ParleyError, ScriptNode};

use super::lifecycle::choice_index_error;
use super::step::{context, node_missing};
use super::{ChoiceEntry, Dialogue, DialogueState};

impl Dialogue {
    /// Advance past the current line. Only valid when the line has no real
    /// choice list; returns `false` once the dialogue has ended.
    pub fn continue_dialogue(&mut self) -> bool {
        if !self.ensure_running("continue") {
            return false;
        }
        if self.awaiting_choice {
            self.report(Diagnostic::error(ParleyError::new(
                "RUNTIME_CHOICE_PENDING",
                format!(
                    "Cannot continue while {} choice(s) are waiting; call choose.",
                    self.choices.len()
                ),
            )));
            return false;
        }
        self.take(0)
    }

    /// Follow visible choice `index`. Returns `false` for an out-of-range
    /// index, and when the choice leads to the end of the dialogue.
    pub fn choose(&mut self, index: usize) -> bool {
        if !self.ensure_running("choose") {
            return false;
        }
        if index >= self.choices.len() {
            self.report(Diagnostic::error(choice_index_error(
                index,
                self.choices.len(),
            )));
            return false;
        }
        self.take(index)
    }

    fn take(&mut self, index: usize) -> bool {
        let target = self.choices.get(index).and_then(|choice| choice.target);
        tracing::debug!(index, ?target, "take choice");
        self.clear_step();
        self.advance_from(target);
        !self.is_ended()
    }

    fn ensure_running(&self, command: &str) -> bool {
        if self.state == DialogueState::Running {
            return true;
        }
        self.report(Diagnostic::error(ParleyError::new(
            "RUNTIME_NOT_RUNNING",
            format!("Cannot {} a dialogue in state {:?}.", command, self.state),
        )));
        false
    }

    /// A plain line exposes one unnamed choice leading to its follow-on.
    pub(super) fn offer_continue(&mut self, node: &ScriptNode) {
        let target = self.follow(node);
        self.awaiting_choice = false;
        self.choices = vec![ChoiceEntry {
            text: String::new(),
            target,
        }];
    }

    /// For a line flagged as leading to choices: run the set nodes between
    /// the line and its Choice node, then present that node's options.
    pub(super) fn resolve_linked_choices(&mut self, speech: NodeIndex) {
        let script = Arc::clone(&self.script);
        let Some(speech_node) = script.node(speech) else {
            return;
        };
        let mut next = self.follow(speech_node);
        for _ in 0..self.max_steps {
            let Some(index) = next else {
                break;
            };
            let Some(node) = script.node(index) else {
                self.report(Diagnostic::error(node_missing("nodes", index)));
                break;
            };
            match node {
                ScriptNode::Choice { .. } => {
                    self.present_choices(index);
                    return;
                }
                ScriptNode::SetVariable {
                    name, expression, ..
                } => {
                    self.run_set(name, expression, &context("nodes", index));
                    next = self.follow(node);
                }
                ScriptNode::Text { .. } | ScriptNode::Select { .. } => break,
            }
        }
        // The link flag was stale; treat the line as a plain one.
        self.choices = vec![ChoiceEntry {
            text: String::new(),
            target: next,
        }];
        self.awaiting_choice = false;
    }

    /// Evaluate the guards of Choice node `index` against the live environment
    /// and publish the options that pass. No visible option ends the dialogue.
    pub(super) fn present_choices(&mut self, index: NodeIndex) {
        let script = Arc::clone(&self.script);
        let Some(ScriptNode::Choice { edges }) = script.node(index) else {
            self.report(Diagnostic::error(node_missing("nodes", index)));
            self.finish();
            return;
        };
        let node_context = context("nodes", index);
        let visible = edges
            .iter()
            .filter(|edge| self.guard_passes(edge, &node_context))
            .map(|edge| ChoiceEntry {
                text: edge.text.clone(),
                target: edge.target,
            })
            .collect::<Vec<_>>();

        if visible.is_empty() {
            self.report(
                Diagnostic::warning(ParleyError::new(
                    "RUNTIME_NO_CHOICES",
                    format!(
                        "No option of {} is available; dialogue ends.",
                        node_context
                    ),
                ))
                .with_context(node_context),
            );
            self.finish();
            return;
        }
        tracing::trace!(index, visible = visible.len(), "choices resolved");
        self.choices = visible;
        self.awaiting_choice = true;
    }
}
