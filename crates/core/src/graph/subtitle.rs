//! Subtitle burn-in pass.

use tracing::debug;

use super::compiler::escape_filter_value;
use super::label::{Label, LabelAllocator, LabelKind};
use super::node::{FilterGraph, FilterNode, NodeKind, Pad};
use crate::scene::{SubtitlePosition, SubtitleSpec};

/// Burns subtitles into the terminal video of `graph`.
///
/// The node currently producing the terminal label is renamed to a fresh
/// pre-subtitle label and a subtitle node re-establishes the terminal. The
/// fresh label is numbered after the highest one already present, so the
/// pass can run on graphs it has rewritten before. If a subtitle node is
/// already present only its filter is replaced.
pub fn inject_subtitles(graph: &mut FilterGraph, spec: &SubtitleSpec, path: &str) {
    let filter = subtitle_filter(spec, path);

    if let Some(index) = graph.find(NodeKind::Subtitles) {
        debug!("Subtitle node already present, updating it");
        graph.nodes_mut()[index].filter = filter;
        return;
    }

    let terminal = Label::video_out();
    let interim = LabelAllocator::resume(graph).next(LabelKind::PreSubtitle);
    let input = if graph.rename_output(&terminal, &interim) {
        Pad::Label(interim)
    } else {
        // No terminal yet: burn onto the background stream.
        Pad::video(0)
    };

    graph.push(FilterNode::new(
        NodeKind::Subtitles,
        vec![input],
        filter,
        terminal,
    ));
}

fn subtitle_filter(spec: &SubtitleSpec, path: &str) -> String {
    format!(
        "subtitles=filename='{}':force_style='{}'",
        escape_filter_value(path),
        force_style(spec)
    )
}

/// ASS style overrides for the subtitle node.
pub fn force_style(spec: &SubtitleSpec) -> String {
    let alignment = match spec.position {
        SubtitlePosition::Bottom => 2,
        SubtitlePosition::Center => 5,
        SubtitlePosition::Top => 8,
    };
    let mut style = vec![
        format!("FontSize={}", spec.font_size),
        format!("PrimaryColour={}", ass_colour(&spec.color)),
        format!("Alignment={}", alignment),
    ];

    let transparent = spec.background.trim().eq_ignore_ascii_case("transparent");
    if transparent {
        style.push("BorderStyle=1".to_string());
        style.push(format!("Outline={}", if spec.outline { 2 } else { 0 }));
    } else {
        // Opaque box; the outline colour fills it.
        style.push("BorderStyle=3".to_string());
        style.push(format!("OutlineColour={}", ass_colour(&spec.background)));
        style.push(format!("BackColour={}", ass_colour(&spec.background)));
        style.push("Outline=1".to_string());
    }
    style.push("Shadow=0".to_string());
    style.join(",")
}

/// Converts `#RRGGBB` to ASS `&H00BBGGRR`.
///
/// Anything unparseable becomes opaque white.
pub fn ass_colour(color: &str) -> String {
    let hex = color.trim().trim_start_matches('#').trim_start_matches("0x");
    let valid = hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit());
    if !valid {
        return "&H00FFFFFF".to_string();
    }
    let (r, g, b) = (&hex[0..2], &hex[2..4], &hex[4..6]);
    format!("&H00{}{}{}", b, g, r).to_uppercase()
}
