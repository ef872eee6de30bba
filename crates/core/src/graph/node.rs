//! Typed filter-graph IR.
//!
//! The compiler builds an ordered list of [`FilterNode`]s and only turns it
//! into program text at the very end. Rewrites such as terminal renaming or
//! subtitle injection operate on nodes, never on the serialized string.

use std::fmt;

use super::label::{Label, LabelKind};

/// Stream type of an engine input pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// An input pad of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pad {
    /// A stream of one of the declared inputs, e.g. `[2:v]`.
    Stream { input: usize, kind: StreamKind },
    /// The output of another node.
    Label(Label),
}

impl Pad {
    pub fn video(input: usize) -> Self {
        Pad::Stream {
            input,
            kind: StreamKind::Video,
        }
    }

    pub fn audio(input: usize) -> Self {
        Pad::Stream {
            input,
            kind: StreamKind::Audio,
        }
    }

    pub fn label(&self) -> Option<&Label> {
        match self {
            Pad::Label(label) => Some(label),
            Pad::Stream { .. } => None,
        }
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pad::Stream { input, kind } => {
                let kind = match kind {
                    StreamKind::Video => 'v',
                    StreamKind::Audio => 'a',
                };
                write!(f, "[{}:{}]", input, kind)
            }
            Pad::Label(label) => write!(f, "{}", label),
        }
    }
}

/// What a node does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scale,
    KenBurns,
    Overlay,
    DrawText,
    Subtitles,
    PassThrough,
    AudioMix,
}

/// One step of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub kind: NodeKind,
    pub inputs: Vec<Pad>,
    /// Filter chain text, without pads.
    pub filter: String,
    pub output: Label,
}

impl FilterNode {
    pub fn new(kind: NodeKind, inputs: Vec<Pad>, filter: impl Into<String>, output: Label) -> Self {
        Self {
            kind,
            inputs,
            filter: filter.into(),
            output,
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{}", pad)?;
        }
        write!(f, "{}{}", self.filter, self.output)
    }
}

/// Ordered list of nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: FilterNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [FilterNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the node producing `label`.
    pub fn producer_of(&self, label: &Label) -> Option<usize> {
        self.nodes.iter().position(|n| &n.output == label)
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn find(&self, kind: NodeKind) -> Option<usize> {
        self.nodes.iter().position(|n| n.kind == kind)
    }

    /// Renames a produced label and every reference to it.
    ///
    /// Returns false if no node produces `from`.
    pub fn rename_output(&mut self, from: &Label, to: &Label) -> bool {
        let Some(index) = self.producer_of(from) else {
            return false;
        };
        self.nodes[index].output = to.clone();
        for node in &mut self.nodes {
            for pad in &mut node.inputs {
                if pad.label() == Some(from) {
                    *pad = Pad::Label(to.clone());
                }
            }
        }
        true
    }

    /// Highest ordinal among produced labels of `kind`.
    pub fn highest_ordinal(&self, kind: LabelKind) -> Option<u32> {
        self.nodes
            .iter()
            .filter_map(|n| n.output.parse())
            .filter(|(k, _)| *k == kind)
            .map(|(_, n)| n)
            .max()
    }

    /// Serializes to program text: nodes joined by `;`.
    pub fn to_program(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_program())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> FilterGraph {
        let mut graph = FilterGraph::new();
        graph.push(FilterNode::new(
            NodeKind::Scale,
            vec![Pad::video(1)],
            "scale=640:360",
            Label::new("img0"),
        ));
        graph.push(FilterNode::new(
            NodeKind::Overlay,
            vec![Pad::video(0), Pad::Label(Label::new("img0"))],
            "overlay=0:0",
            Label::new("ov0"),
        ));
        graph
    }

    #[test]
    fn test_program_text() {
        assert_eq!(
            graph().to_program(),
            "[1:v]scale=640:360[img0];[0:v][img0]overlay=0:0[ov0]"
        );
    }

    #[test]
    fn test_rename_updates_references() {
        let mut graph = graph();
        assert!(graph.rename_output(&Label::new("img0"), &Label::new("img9")));
        assert_eq!(
            graph.to_program(),
            "[1:v]scale=640:360[img9];[0:v][img9]overlay=0:0[ov0]"
        );
        assert!(!graph.rename_output(&Label::new("missing"), &Label::new("x")));
    }

    #[test]
    fn test_highest_ordinal() {
        let mut graph = graph();
        graph.push(FilterNode::new(
            NodeKind::Overlay,
            vec![Pad::Label(Label::new("ov0"))],
            "null",
            Label::new("ov4"),
        ));
        assert_eq!(graph.highest_ordinal(LabelKind::Overlay), Some(4));
        assert_eq!(graph.highest_ordinal(LabelKind::Text), None);
        assert_eq!(graph.count(NodeKind::Overlay), 2);
    }
}
