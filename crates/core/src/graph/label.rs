//! Graph labels and their allocator.

use std::collections::HashMap;
use std::fmt;

use super::node::FilterGraph;

/// Terminal video label mapped to the output.
pub const VIDEO_OUT: &str = "outv";
/// Terminal audio label mapped to the output.
pub const AUDIO_OUT: &str = "outa";

/// Name of a node's output pin, unique within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn video_out() -> Self {
        Self::new(VIDEO_OUT)
    }

    pub fn audio_out() -> Self {
        Self::new(AUDIO_OUT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_terminal(&self) -> bool {
        self.0 == VIDEO_OUT || self.0 == AUDIO_OUT
    }

    /// Splits an allocated label back into its kind and ordinal.
    pub fn parse(&self) -> Option<(LabelKind, u32)> {
        // Longest prefixes first so "presub" is never read as something shorter.
        let mut kinds = LabelKind::ALL;
        kinds.sort_by_key(|k| std::cmp::Reverse(k.prefix().len()));
        kinds.iter().find_map(|kind| {
            let rest = self.0.strip_prefix(kind.prefix())?;
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            rest.parse().ok().map(|n| (*kind, n))
        })
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Kinds of intermediate labels, each with its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    ScaledImage,
    Overlay,
    Text,
    KenBurns,
    PreSubtitle,
}

impl LabelKind {
    pub const ALL: [LabelKind; 5] = [
        LabelKind::ScaledImage,
        LabelKind::Overlay,
        LabelKind::Text,
        LabelKind::KenBurns,
        LabelKind::PreSubtitle,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            LabelKind::ScaledImage => "img",
            LabelKind::Overlay => "ov",
            LabelKind::Text => "txt",
            LabelKind::KenBurns => "kb",
            LabelKind::PreSubtitle => "presub",
        }
    }
}

/// Hands out unique labels for a single graph.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: HashMap<LabelKind, u32>,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator that continues after every label already in
    /// `graph`, so rewriting an existing graph never reuses a name.
    pub fn resume(graph: &FilterGraph) -> Self {
        let next = LabelKind::ALL
            .iter()
            .filter_map(|kind| graph.highest_ordinal(*kind).map(|n| (*kind, n + 1)))
            .collect();
        Self { next }
    }

    pub fn next(&mut self, kind: LabelKind) -> Label {
        let counter = self.next.entry(kind).or_insert(0);
        let label = Label::new(format!("{}{}", kind.prefix(), counter));
        *counter += 1;
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_counts_per_kind() {
        let mut labels = LabelAllocator::new();
        assert_eq!(labels.next(LabelKind::ScaledImage).as_str(), "img0");
        assert_eq!(labels.next(LabelKind::ScaledImage).as_str(), "img1");
        assert_eq!(labels.next(LabelKind::Overlay).as_str(), "ov0");
        assert_eq!(labels.next(LabelKind::PreSubtitle).as_str(), "presub0");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Label::new("presub3").parse(),
            Some((LabelKind::PreSubtitle, 3))
        );
        assert_eq!(Label::new("kb12").parse(), Some((LabelKind::KenBurns, 12)));
        assert_eq!(Label::new("outv").parse(), None);
        assert_eq!(Label::new("txt").parse(), None);
        assert_eq!(Label::new("txtx1").parse(), None);
    }

    #[test]
    fn test_display_is_bracketed() {
        assert_eq!(Label::video_out().to_string(), "[outv]");
        assert!(Label::audio_out().is_terminal());
    }
}
