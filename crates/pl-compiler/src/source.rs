use serde::{Deserialize, Serialize};

/// Label that ends the dialogue when used as a jump target.
pub const END_LABEL: &str = "end";

/// Authoring-side description of a script: expressions are still source text
/// and jumps are by label. `compile_script` turns it into a linked `Script`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSource {
    #[serde(default)]
    pub header: Vec<NodeSource>,
    #[serde(default)]
    pub nodes: Vec<NodeSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub body: NodeBody,
}

/// Nodes without an explicit `goto` fall through to the next node in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeBody {
    Text {
        speaker: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        goto: Option<String>,
    },
    Set {
        name: String,
        expression: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        goto: Option<String>,
    },
    Choice {
        options: Vec<OptionSource>,
    },
    Select {
        branches: Vec<BranchSource>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSource {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    pub goto: String,
}

/// A branch without `when` is the else-branch. A select without one falls
/// through to the next node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    pub goto: String,
}

impl NodeSource {
    pub fn text(speaker: &str, text: &str) -> Self {
        Self::unlabelled(NodeBody::Text {
            speaker: speaker.to_string(),
            text: text.to_string(),
            goto: None,
        })
    }

    pub fn set(name: &str, expression: &str) -> Self {
        Self::unlabelled(NodeBody::Set {
            name: name.to_string(),
            expression: expression.to_string(),
            goto: None,
        })
    }

    pub fn choice(options: Vec<OptionSource>) -> Self {
        Self::unlabelled(NodeBody::Choice { options })
    }

    pub fn select(branches: Vec<BranchSource>) -> Self {
        Self::unlabelled(NodeBody::Select { branches })
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Replace the fall-through of a text or set node with a jump.
    pub fn goto(mut self, target: &str) -> Self {
        match &mut self.body {
            NodeBody::Text { goto, .. } | NodeBody::Set { goto, .. } => {
                *goto = Some(target.to_string());
            }
            NodeBody::Choice { .. } | NodeBody::Select { .. } => {}
        }
        self
    }

    fn unlabelled(body: NodeBody) -> Self {
        Self { label: None, body }
    }
}

impl OptionSource {
    pub fn new(text: &str, goto: &str) -> Self {
        Self {
            text: text.to_string(),
            when: None,
            goto: goto.to_string(),
        }
    }

    pub fn when(mut self, condition: &str) -> Self {
        self.when = Some(condition.to_string());
        self
    }
}

impl BranchSource {
    pub fn new(when: Option<&str>, goto: &str) -> Self {
        Self {
            when: when.map(str::to_string),
            goto: goto.to_string(),
        }
    }
}
