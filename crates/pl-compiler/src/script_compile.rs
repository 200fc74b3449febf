use std::collections::BTreeMap;

use pl_core::{DiagnosticSink, Edge, Expression, NodeIndex, ParleyError, Script, ScriptNode};

use crate::expression_parse::parse_expression;
use crate::source::{NodeBody, NodeSource, ScriptSource, END_LABEL};

/// Build a linked `Script` from its authoring description. Expression parse
/// problems are reported to `sink` individually and then fail the compile.
pub fn compile_script(
    source: &ScriptSource,
    sink: &dyn DiagnosticSink,
) -> Result<Script, ParleyError> {
    let labels = collect_labels(&source.nodes, "nodes")?;
    let header_labels = collect_labels(&source.header, "header")?;

    let mut invalid = Vec::new();
    let nodes = ArenaCompiler::new("nodes", &labels, source.nodes.len(), sink)
        .compile(&source.nodes, &mut invalid)?;
    let header_nodes = ArenaCompiler::new("header", &header_labels, source.header.len(), sink)
        .compile(&source.header, &mut invalid)?;

    for (index, node) in header_nodes.iter().enumerate() {
        if matches!(node, ScriptNode::Text { .. } | ScriptNode::Choice { .. }) {
            return Err(ParleyError::new(
                "COMPILE_HEADER_NODE",
                format!(
                    "header[{}] is a {:?} node; the header may only set variables and select.",
                    index,
                    node.kind()
                ),
            ));
        }
    }

    if !invalid.is_empty() {
        return Err(ParleyError::new(
            "COMPILE_EXPRESSION_INVALID",
            format!(
                "{} expression(s) failed to parse: {}.",
                invalid.len(),
                invalid.join(", ")
            ),
        ));
    }

    let mut speakers: Vec<String> = Vec::new();
    for node in &nodes {
        if let ScriptNode::Text { speaker, .. } = node {
            if !speakers.contains(speaker) {
                speakers.push(speaker.clone());
            }
        }
    }

    let mut script = Script {
        nodes,
        header_nodes,
        labels,
        header_labels,
        speakers,
    };
    script.link();
    Ok(script)
}

fn collect_labels(
    nodes: &[NodeSource],
    arena: &str,
) -> Result<BTreeMap<String, NodeIndex>, ParleyError> {
    let mut labels = BTreeMap::new();
    for (index, node) in nodes.iter().enumerate() {
        let Some(label) = &node.label else {
            continue;
        };
        if label == END_LABEL {
            return Err(ParleyError::new(
                "COMPILE_LABEL_RESERVED",
                format!("{}[{}] uses the reserved label \"{}\".", arena, index, END_LABEL),
            ));
        }
        if labels.insert(label.clone(), index).is_some() {
            return Err(ParleyError::new(
                "COMPILE_LABEL_DUPLICATE",
                format!("{}[{}] redefines label \"{}\".", arena, index, label),
            ));
        }
    }
    Ok(labels)
}

struct ArenaCompiler<'a> {
    arena: &'static str,
    labels: &'a BTreeMap<String, NodeIndex>,
    len: usize,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> ArenaCompiler<'a> {
    fn new(
        arena: &'static str,
        labels: &'a BTreeMap<String, NodeIndex>,
        len: usize,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            arena,
            labels,
            len,
            sink,
        }
    }

    fn compile(
        &self,
        nodes: &[NodeSource],
        invalid: &mut Vec<String>,
    ) -> Result<Vec<ScriptNode>, ParleyError> {
        nodes
            .iter()
            .enumerate()
            .map(|(index, node)| self.compile_node(index, &node.body, invalid))
            .collect()
    }

    fn compile_node(
        &self,
        index: NodeIndex,
        body: &NodeBody,
        invalid: &mut Vec<String>,
    ) -> Result<ScriptNode, ParleyError> {
        match body {
            NodeBody::Text {
                speaker,
                text,
                goto,
            } => Ok(ScriptNode::Text {
                speaker: speaker.clone(),
                text: text.clone(),
                has_choices: false,
                edges: vec![self.follow_on(index, goto.as_deref())?],
            }),
            NodeBody::Set {
                name,
                expression,
                goto,
            } => {
                let context = format!("{}[{}] set {}", self.arena, index, name);
                Ok(ScriptNode::SetVariable {
                    name: name.clone(),
                    expression: self.expression(expression, &context, invalid),
                    edges: vec![self.follow_on(index, goto.as_deref())?],
                })
            }
            NodeBody::Choice { options } => {
                if options.is_empty() {
                    return Err(ParleyError::new(
                        "COMPILE_CHOICE_EMPTY",
                        format!("{}[{}] is a choice without options.", self.arena, index),
                    ));
                }
                let mut edges = Vec::with_capacity(options.len());
                for (position, option) in options.iter().enumerate() {
                    let mut edge = Edge {
                        target: self.resolve(&option.goto, index)?,
                        text: option.text.clone(),
                        condition: None,
                    };
                    if let Some(when) = &option.when {
                        let context = format!("{}[{}] option {}", self.arena, index, position);
                        edge = edge.with_condition(self.expression(when, &context, invalid));
                    }
                    edges.push(edge);
                }
                Ok(ScriptNode::Choice { edges })
            }
            NodeBody::Select { branches } => {
                let mut edges = Vec::with_capacity(branches.len() + 1);
                for (position, branch) in branches.iter().enumerate() {
                    let mut edge = Edge {
                        target: self.resolve(&branch.goto, index)?,
                        text: String::new(),
                        condition: None,
                    };
                    if let Some(when) = &branch.when {
                        let context = format!("{}[{}] branch {}", self.arena, index, position);
                        edge = edge.with_condition(self.expression(when, &context, invalid));
                    }
                    edges.push(edge);
                }
                if edges.iter().all(Edge::is_conditional) {
                    edges.push(Edge {
                        target: self.sequential(index),
                        text: String::new(),
                        condition: None,
                    });
                }
                Ok(ScriptNode::Select { edges })
            }
        }
    }

    fn follow_on(&self, index: NodeIndex, goto: Option<&str>) -> Result<Edge, ParleyError> {
        let target = match goto {
            Some(label) => self.resolve(label, index)?,
            None => self.sequential(index),
        };
        Ok(Edge {
            target,
            text: String::new(),
            condition: None,
        })
    }

    fn sequential(&self, index: NodeIndex) -> Option<NodeIndex> {
        (index + 1 < self.len).then_some(index + 1)
    }

    fn resolve(&self, label: &str, index: NodeIndex) -> Result<Option<NodeIndex>, ParleyError> {
        if label == END_LABEL {
            return Ok(None);
        }
        self.labels.get(label).copied().map(Some).ok_or_else(|| {
            ParleyError::new(
                "COMPILE_LABEL_UNKNOWN",
                format!(
                    "{}[{}] jumps to undefined label \"{}\".",
                    self.arena, index, label
                ),
            )
        })
    }

    fn expression(&self, source: &str, context: &str, invalid: &mut Vec<String>) -> Expression {
        let expression = parse_expression(source, context, self.sink);
        if !expression.is_valid() {
            invalid.push(context.to_string());
        }
        expression
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BranchSource, OptionSource};
    use pl_core::CollectingSink;

    fn compile(source: &ScriptSource) -> Result<Script, ParleyError> {
        compile_script(source, &CollectingSink::new())
    }

    #[test]
    fn sequential_nodes_fall_through_and_last_node_ends() {
        let source = ScriptSource {
            nodes: vec![
                NodeSource::text("Player", "Hello"),
                NodeSource::set("SomeInt", "99"),
                NodeSource::text("NPC", "Wotcha"),
            ],
            ..ScriptSource::default()
        };
        let script = compile(&source).expect("compile should pass");
        assert_eq!(script.next_node(0), Ok(Some(1)));
        assert_eq!(script.next_node(1), Ok(Some(2)));
        assert_eq!(script.next_node(2), Ok(None));
        assert_eq!(script.speakers(), ["Player".to_string(), "NPC".to_string()]);
    }

    #[test]
    fn gotos_resolve_labels_and_end() {
        let source = ScriptSource {
            nodes: vec![
                NodeSource::text("NPC", "Hi").goto("later"),
                NodeSource::text("NPC", "skipped").goto("end"),
                NodeSource::text("NPC", "Later").labelled("later"),
            ],
            ..ScriptSource::default()
        };
        let script = compile(&source).expect("compile should pass");
        assert_eq!(script.next_node(0), Ok(Some(2)));
        assert_eq!(script.next_node(1), Ok(None));
        assert_eq!(script.node_by_label("later"), Some(2));
    }

    #[test]
    fn text_before_choice_is_linked() {
        let source = ScriptSource {
            nodes: vec![
                NodeSource::text("NPC", "Pick"),
                NodeSource::set("Mood", "masculine"),
                NodeSource::choice(vec![
                    OptionSource::new("A", "a"),
                    OptionSource::new("B", "end").when("{x} > 1"),
                ]),
                NodeSource::text("NPC", "Alpha").labelled("a"),
            ],
            ..ScriptSource::default()
        };
        let script = compile(&source).expect("compile should pass");
        assert!(matches!(
            script.node(0),
            Some(ScriptNode::Text {
                has_choices: true,
                ..
            })
        ));
        let Some(ScriptNode::Choice { edges }) = script.node(2) else {
            panic!("node 2 should be a choice");
        };
        assert_eq!(edges[0].target, Some(3));
        assert_eq!(edges[0].text, "A");
        assert_eq!(edges[1].target, None);
        assert!(edges[1].condition.as_ref().is_some_and(Expression::is_valid));
    }

    #[test]
    fn select_without_else_falls_through() {
        let source = ScriptSource {
            nodes: vec![
                NodeSource::select(vec![BranchSource::new(Some("{x} == 1"), "one")]),
                NodeSource::text("NPC", "Other"),
                NodeSource::text("NPC", "One").labelled("one"),
            ],
            ..ScriptSource::default()
        };
        let script = compile(&source).expect("compile should pass");
        let Some(ScriptNode::Select { edges }) = script.node(0) else {
            panic!("node 0 should be a select");
        };
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].target, Some(2));
        assert_eq!(edges[1].target, Some(1));
        assert!(!edges[1].is_conditional());
    }

    #[test]
    fn header_labels_are_separate_from_node_labels() {
        let source = ScriptSource {
            header: vec![
                NodeSource::set("a", "1").goto("skip"),
                NodeSource::set("b", "2"),
                NodeSource::set("c", "3").labelled("skip"),
            ],
            nodes: vec![NodeSource::text("NPC", "Hi").labelled("skip")],
        };
        let script = compile(&source).expect("compile should pass");
        assert_eq!(script.header_labels.get("skip"), Some(&2));
        assert_eq!(script.labels.get("skip"), Some(&0));
        assert_eq!(script.header_nodes[0].single_next(), Ok(Some(2)));
    }

    #[test]
    fn header_rejects_visible_nodes() {
        let source = ScriptSource {
            header: vec![NodeSource::text("NPC", "too early")],
            nodes: vec![],
        };
        assert_eq!(
            compile(&source).expect_err("header text").code,
            "COMPILE_HEADER_NODE"
        );
    }

    #[test]
    fn label_errors_are_compile_errors() {
        let unknown = ScriptSource {
            nodes: vec![NodeSource::text("NPC", "Hi").goto("nowhere")],
            ..ScriptSource::default()
        };
        assert_eq!(
            compile(&unknown).expect_err("unknown").code,
            "COMPILE_LABEL_UNKNOWN"
        );

        let duplicate = ScriptSource {
            nodes: vec![
                NodeSource::text("NPC", "a").labelled("x"),
                NodeSource::text("NPC", "b").labelled("x"),
            ],
            ..ScriptSource::default()
        };
        assert_eq!(
            compile(&duplicate).expect_err("duplicate").code,
            "COMPILE_LABEL_DUPLICATE"
        );

        let reserved = ScriptSource {
            nodes: vec![NodeSource::text("NPC", "a").labelled("end")],
            ..ScriptSource::default()
        };
        assert_eq!(
            compile(&reserved).expect_err("reserved").code,
            "COMPILE_LABEL_RESERVED"
        );
    }

    #[test]
    fn invalid_expressions_are_reported_then_fail_compile() {
        let sink = CollectingSink::new();
        let source = ScriptSource {
            nodes: vec![
                NodeSource::set("x", "(1 + 2"),
                NodeSource::choice(vec![OptionSource::new("A", "end").when("1 +")]),
            ],
            ..ScriptSource::default()
        };
        let error = compile_script(&source, &sink).expect_err("compile should fail");
        assert_eq!(error.code, "COMPILE_EXPRESSION_INVALID");
        assert!(error.message.contains("nodes[0] set x"));
        assert!(error.message.contains("nodes[1] option 0"));
        assert!(sink.contains("EXPR_MISMATCHED_PARENS"));
        assert!(sink.contains("EXPR_MISSING_OPERAND"));
    }

    #[test]
    fn empty_choice_is_rejected() {
        let source = ScriptSource {
            nodes: vec![NodeSource::choice(vec![])],
            ..ScriptSource::default()
        };
        assert_eq!(
            compile(&source).expect_err("empty choice").code,
            "COMPILE_CHOICE_EMPTY"
        );
    }
}
