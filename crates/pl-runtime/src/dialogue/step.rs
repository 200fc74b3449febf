use std::sync::Arc;

use pl_core::{Diagnostic, Edge, Expression, NodeIndex, ParleyError, ScriptNode, Value};

use super::{Dialogue, DialogueState};
use crate::eval::evaluate_expression;

impl Dialogue {
    /// Walk from `target` until a line or a choice list is ready, running set
    /// and select nodes on the way. `None` ends the dialogue.
    pub(super) fn advance_from(&mut self, target: Option<NodeIndex>) {
        let script = Arc::clone(&self.script);
        let mut next = target;
        for _ in 0..self.max_steps {
            let Some(index) = next else {
                self.finish();
                return;
            };
            let Some(node) = script.node(index) else {
                self.report(Diagnostic::error(node_missing("nodes", index)));
                self.finish();
                return;
            };
            tracing::trace!(index, kind = ?node.kind(), "visit node");
            match node {
                ScriptNode::Text { has_choices, .. } => {
                    self.state = DialogueState::Running;
                    self.current_speech = Some(index);
                    self.lines_shown += 1;
                    if *has_choices {
                        self.resolve_linked_choices(index);
                    } else {
                        self.offer_continue(node);
                    }
                    return;
                }
                ScriptNode::Choice { .. } => {
                    self.state = DialogueState::Running;
                    self.present_choices(index);
                    return;
                }
                ScriptNode::SetVariable {
                    name, expression, ..
                } => {
                    self.run_set(name, expression, &context("nodes", index));
                    next = self.follow(node);
                }
                ScriptNode::Select { edges } => {
                    next = self.select(edges, &context("nodes", index));
                }
            }
        }
        self.report(Diagnostic::error(step_limit(self.max_steps)));
        self.finish();
    }

    /// Header nodes only initialise the environment: set and select nodes run,
    /// anything visible stops the walk.
    pub(super) fn run_header(&mut self) {
        let script = Arc::clone(&self.script);
        let mut next = script.first_header_node();
        for _ in 0..self.max_steps {
            let Some(index) = next else {
                return;
            };
            let Some(node) = script.header_node(index) else {
                self.report(Diagnostic::error(node_missing("header", index)));
                return;
            };
            match node {
                ScriptNode::SetVariable {
                    name, expression, ..
                } => {
                    self.run_set(name, expression, &context("header", index));
                    next = self.follow(node);
                }
                ScriptNode::Select { edges } => {
                    next = self.select(edges, &context("header", index));
                }
                ScriptNode::Text { .. } | ScriptNode::Choice { .. } => {
                    self.report(
                        Diagnostic::error(ParleyError::new(
                            "RUNTIME_HEADER_NODE",
                            format!(
                                "{:?} node in the header cannot be shown; header stopped.",
                                node.kind()
                            ),
                        ))
                        .with_context(context("header", index)),
                    );
                    return;
                }
            }
        }
        self.report(Diagnostic::error(step_limit(self.max_steps)));
    }

    pub(super) fn run_set(&mut self, name: &str, expression: &Expression, context: &str) {
        if !expression.is_valid() {
            self.report(invalid_expression(expression, context));
            return;
        }
        let value = self.evaluate(expression);
        if value.is_invalid() {
            self.report(
                Diagnostic::warning(ParleyError::new(
                    "RUNTIME_SET_INVALID",
                    format!(
                        "Variable \"{}\" left unchanged: \"{}\" has no value.",
                        name,
                        expression.source()
                    ),
                ))
                .with_context(context),
            );
            return;
        }
        tracing::trace!(variable = name, %value, "set variable");
        self.variables.insert(name.to_string(), value);
    }

    /// First edge whose guard holds, an unguarded edge always holds. No match
    /// ends the path.
    fn select(&self, edges: &[Edge], context: &str) -> Option<NodeIndex> {
        for edge in edges {
            if self.guard_passes(edge, context) {
                return edge.target;
            }
        }
        tracing::debug!(context, "select matched no branch");
        None
    }

    /// An invalid guard hides its edge and is logged.
    pub(super) fn guard_passes(&self, edge: &Edge, context: &str) -> bool {
        let Some(condition) = &edge.condition else {
            return true;
        };
        if !condition.is_valid() {
            self.report(invalid_expression(condition, context));
            return false;
        }
        self.evaluate(condition).is_truthy()
    }

    /// The single follow-on of a sequential node. Ambiguous edges are logged
    /// and treated as the end of the path.
    pub(super) fn follow(&self, node: &ScriptNode) -> Option<NodeIndex> {
        match node.single_next() {
            Ok(next) => next,
            Err(error) => {
                self.report(Diagnostic::error(error));
                None
            }
        }
    }

    pub(super) fn evaluate(&self, expression: &Expression) -> Value {
        evaluate_expression(expression, &self.variables, self.sink.as_ref())
    }
}

pub(super) fn context(arena: &str, index: NodeIndex) -> String {
    format!("{}[{}]", arena, index)
}

fn invalid_expression(expression: &Expression, context: &str) -> Diagnostic {
    Diagnostic::error(ParleyError::new(
        "RUNTIME_EXPRESSION_INVALID",
        format!(
            "Expression \"{}\" failed to parse and is skipped.",
            expression.source()
        ),
    ))
    .with_context(context)
}

pub(super) fn node_missing(arena: &str, index: NodeIndex) -> ParleyError {
    ParleyError::new(
        "SCRIPT_NODE_MISSING",
        format!("Edge points at {}[{}], which does not exist.", arena, index),
    )
}

fn step_limit(max_steps: usize) -> ParleyError {
    ParleyError::new(
        "RUNTIME_STEP_LIMIT",
        format!(
            "Traversal visited {} nodes without reaching a line or choice.",
            max_steps
        ),
    )
}
