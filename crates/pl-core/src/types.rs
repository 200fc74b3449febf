use std::collections::BTreeMap;

use crate::error::ParleyError;
use crate::expression::Expression;

/// Position of a node inside its arena (`Script::nodes` or `Script::header_nodes`).
pub type NodeIndex = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// `None` ends the dialogue when followed.
    pub target: Option<NodeIndex>,
    /// Display text when the edge is a choice option, empty otherwise.
    pub text: String,
    pub condition: Option<Expression>,
}

impl Edge {
    pub fn to(target: NodeIndex) -> Self {
        Self {
            target: Some(target),
            text: String::new(),
            condition: None,
        }
    }

    pub fn end() -> Self {
        Self {
            target: None,
            text: String::new(),
            condition: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Text,
    Choice,
    SetVariable,
    Select,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptNode {
    Text {
        speaker: String,
        text: String,
        /// Set by [`Script::link`] when the node leads, through SetVariable
        /// nodes only, to a Choice node.
        has_choices: bool,
        edges: Vec<Edge>,
    },
    Choice {
        edges: Vec<Edge>,
    },
    SetVariable {
        name: String,
        expression: Expression,
        edges: Vec<Edge>,
    },
    Select {
        edges: Vec<Edge>,
    },
}

impl ScriptNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Text { .. } => NodeKind::Text,
            Self::Choice { .. } => NodeKind::Choice,
            Self::SetVariable { .. } => NodeKind::SetVariable,
            Self::Select { .. } => NodeKind::Select,
        }
    }

    pub fn edges(&self) -> &[Edge] {
        match self {
            Self::Text { edges, .. }
            | Self::Choice { edges }
            | Self::SetVariable { edges, .. }
            | Self::Select { edges } => edges,
        }
    }

    /// The only follow-on node of a non-branching node. Having no edge ends the
    /// path; having more than one is a script construction fault.
    pub fn single_next(&self) -> Result<Option<NodeIndex>, ParleyError> {
        match self.edges() {
            [] => Ok(None),
            [edge] => Ok(edge.target),
            edges => Err(ParleyError::new(
                "SCRIPT_AMBIGUOUS_NEXT",
                format!(
                    "{:?} node has {} outgoing edges; expected at most one.",
                    self.kind(),
                    edges.len()
                ),
            )),
        }
    }
}

/// A finished, linked script graph. Read-only once handed to a dialogue and
/// safe to share between any number of them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    /// Declaration order; index 0 is the entry point.
    pub nodes: Vec<ScriptNode>,
    /// Environment initialisation, run from index 0 before the first line.
    pub header_nodes: Vec<ScriptNode>,
    pub labels: BTreeMap<String, NodeIndex>,
    pub header_labels: BTreeMap<String, NodeIndex>,
    pub speakers: Vec<String>,
}

impl Script {
    pub fn node(&self, index: NodeIndex) -> Option<&ScriptNode> {
        self.nodes.get(index)
    }

    pub fn header_node(&self, index: NodeIndex) -> Option<&ScriptNode> {
        self.header_nodes.get(index)
    }

    pub fn first_node(&self) -> Option<NodeIndex> {
        (!self.nodes.is_empty()).then_some(0)
    }

    pub fn first_header_node(&self) -> Option<NodeIndex> {
        (!self.header_nodes.is_empty()).then_some(0)
    }

    pub fn node_by_label(&self, label: &str) -> Option<NodeIndex> {
        self.labels
            .get(label)
            .copied()
            .filter(|index| *index < self.nodes.len())
    }

    pub fn next_node(&self, index: NodeIndex) -> Result<Option<NodeIndex>, ParleyError> {
        match self.node(index) {
            Some(node) => node.single_next(),
            None => Err(node_missing(index)),
        }
    }

    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    /// One-time post-import pass: flags every Text node whose follow-on chain,
    /// skipping SetVariable nodes, reaches a Choice node.
    pub fn link(&mut self) {
        let flags = (0..self.nodes.len())
            .map(|index| self.leads_to_choice(index))
            .collect::<Vec<_>>();
        for (node, flag) in self.nodes.iter_mut().zip(flags) {
            if let ScriptNode::Text { has_choices, .. } = node {
                *has_choices = flag;
            }
        }
    }

    fn leads_to_choice(&self, index: NodeIndex) -> bool {
        let Some(ScriptNode::Text { .. }) = self.node(index) else {
            return false;
        };
        let mut next = self.next_node(index).ok().flatten();
        // A SetVariable cycle would never reach a choice.
        let mut remaining = self.nodes.len();
        while let Some(current) = next {
            if remaining == 0 {
                return false;
            }
            remaining -= 1;
            match self.node(current) {
                Some(ScriptNode::SetVariable { .. }) => {
                    next = self.next_node(current).ok().flatten();
                }
                Some(ScriptNode::Choice { .. }) => return true,
                _ => return false,
            }
        }
        false
    }
}

fn node_missing(index: NodeIndex) -> ParleyError {
    ParleyError::new(
        "SCRIPT_NODE_MISSING",
        format!("Node {} does not exist.", index),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str, edges: Vec<Edge>) -> ScriptNode {
        ScriptNode::Text {
            speaker: "NPC".to_string(),
            text: text.to_string(),
            has_choices: false,
            edges,
        }
    }

    fn set(name: &str, edges: Vec<Edge>) -> ScriptNode {
        ScriptNode::SetVariable {
            name: name.to_string(),
            expression: Expression::invalid("unused"),
            edges,
        }
    }

    fn has_choices(script: &Script, index: NodeIndex) -> bool {
        matches!(
            script.node(index),
            Some(ScriptNode::Text {
                has_choices: true,
                ..
            })
        )
    }

    #[test]
    fn link_skips_set_nodes_between_text_and_choice() {
        let mut script = Script {
            nodes: vec![
                text("a", vec![Edge::to(1)]),
                set("x", vec![Edge::to(2)]),
                set("y", vec![Edge::to(3)]),
                ScriptNode::Choice {
                    edges: vec![Edge::to(4).with_text("pick")],
                },
                text("b", vec![Edge::to(5)]),
                text("c", vec![]),
            ],
            ..Script::default()
        };
        script.link();
        assert!(has_choices(&script, 0));
        assert!(!has_choices(&script, 4));
        assert!(!has_choices(&script, 5));
    }

    #[test]
    fn link_does_not_look_through_select_nodes() {
        let mut script = Script {
            nodes: vec![
                text("a", vec![Edge::to(1)]),
                ScriptNode::Select {
                    edges: vec![Edge::to(2)],
                },
                ScriptNode::Choice {
                    edges: vec![Edge::to(0).with_text("again")],
                },
            ],
            ..Script::default()
        };
        script.link();
        assert!(!has_choices(&script, 0));
    }

    #[test]
    fn link_terminates_on_set_variable_cycles() {
        let mut script = Script {
            nodes: vec![
                text("a", vec![Edge::to(1)]),
                set("x", vec![Edge::to(2)]),
                set("y", vec![Edge::to(1)]),
            ],
            ..Script::default()
        };
        script.link();
        assert!(!has_choices(&script, 0));
    }

    #[test]
    fn next_node_rejects_multiple_edges() {
        let script = Script {
            nodes: vec![text("a", vec![Edge::to(0), Edge::to(0)])],
            ..Script::default()
        };
        let error = script.next_node(0).expect_err("ambiguous edges");
        assert_eq!(error.code, "SCRIPT_AMBIGUOUS_NEXT");
        assert_eq!(
            script.next_node(9).expect_err("missing").code,
            "SCRIPT_NODE_MISSING"
        );
    }

    #[test]
    fn labels_outside_the_arena_do_not_resolve() {
        let mut script = Script {
            nodes: vec![text("a", vec![])],
            ..Script::default()
        };
        script.labels.insert("start".to_string(), 0);
        script.labels.insert("broken".to_string(), 7);
        assert_eq!(script.node_by_label("start"), Some(0));
        assert_eq!(script.node_by_label("broken"), None);
        assert_eq!(script.node_by_label("nope"), None);
    }
}
