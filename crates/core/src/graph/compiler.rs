//! Scene to filter-graph compilation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::config::RenderConfig;
use super::label::{Label, LabelAllocator, LabelKind};
use super::node::{FilterGraph, FilterNode, NodeKind, Pad};
use super::subtitle::inject_subtitles;
use crate::keyframe::{format_number, Curve, Property};
use crate::scene::{
    AudioRole, Background, CompositionRequest, ImageClip, KenBurnsDefaults, SubtitleSource,
    TextCue,
};

/// Upper bound of the Ken-Burns zoom factor.
const MAX_ZOOM: f64 = 1.5;

/// Pan expressions as (x, y), centred first.
const PAN_PRESETS: [(&str, &str); 5] = [
    ("iw/2-(iw/zoom/2)", "ih/2-(ih/zoom/2)"),
    ("0", "0"),
    ("iw-iw/zoom", "0"),
    ("0", "ih-ih/zoom"),
    ("iw-iw/zoom", "ih-ih/zoom"),
];

/// An input declaration, in engine input order.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// A generated source such as a solid colour.
    Lavfi { spec: String },
    /// A still image repeated for `duration` seconds.
    LoopedImage { path: String, duration: f64 },
    /// A single still frame, expanded by a zoom/pan node.
    StillImage { path: String },
    /// An audio file, optionally looped forever.
    Audio { path: String, looped: bool },
}

/// Output of [`GraphCompiler::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub graph: FilterGraph,
    pub inputs: Vec<InputSource>,
    /// Hard output duration in seconds.
    pub duration: f64,
}

impl CompiledProgram {
    /// The serialized graph program.
    pub fn program(&self) -> String {
        self.graph.to_program()
    }

    pub fn video_label(&self) -> Label {
        Label::video_out()
    }

    /// The audio terminal, if anything was mixed.
    pub fn audio_label(&self) -> Option<Label> {
        let label = Label::audio_out();
        self.graph.producer_of(&label).map(|_| label)
    }
}

/// Resolved zoom/pan parameters for one clip.
#[derive(Debug, Clone)]
struct KenBurns {
    zoom_rate: f64,
    pan_x: String,
    pan_y: String,
    prescale_width: u32,
}

/// Compiles composition requests into filter graphs.
///
/// The compiler is total: ineligible clips and cues are skipped, never
/// reported. A fresh label allocator is used per call.
pub struct GraphCompiler {
    config: RenderConfig,
    rng: StdRng,
}

impl GraphCompiler {
    /// Creates a compiler seeded from the config, or from entropy if unseeded.
    pub fn new(config: RenderConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Creates a compiler drawing pan choices from `rng`.
    pub fn with_rng(config: RenderConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn compile(&mut self, request: &CompositionRequest) -> CompiledProgram {
        let mut graph = FilterGraph::new();
        let mut inputs = Vec::new();
        let mut labels = LabelAllocator::new();

        let mut current = self.background(request, &mut graph, &mut inputs, &mut labels);

        let mut image_count = 0;
        for (index, clip) in request.images.iter().enumerate() {
            if image_count >= self.config.max_image_inputs {
                warn!(
                    index,
                    max = self.config.max_image_inputs,
                    "Image input limit reached, skipping remaining clips"
                );
                break;
            }
            if !clip_is_eligible(clip) {
                debug!(index, "Skipping ineligible image clip");
                continue;
            }
            image_count += 1;
            current = self.image(
                request,
                clip,
                current,
                &mut graph,
                &mut inputs,
                &mut labels,
            );
        }

        for (index, cue) in request.texts.iter().enumerate() {
            if !cue_is_eligible(cue) {
                debug!(index, "Skipping empty or mistimed text cue");
                continue;
            }
            current = self.text(cue, current, &mut graph, &mut labels);
        }

        // Terminal video.
        let terminal = Label::video_out();
        let renamed = match &current {
            Pad::Label(label) => graph.rename_output(label, &terminal),
            Pad::Stream { .. } => false,
        };
        if !renamed {
            graph.push(FilterNode::new(
                NodeKind::PassThrough,
                vec![current],
                "null",
                terminal,
            ));
        }

        self.audio(request, &mut graph, &mut inputs);

        if let Some(spec) = &request.subtitles {
            match &spec.source {
                SubtitleSource::File(source) => match source.as_input() {
                    Some(path) => inject_subtitles(&mut graph, spec, &path),
                    None => warn!("Subtitle file has no usable location, skipping subtitles"),
                },
                SubtitleSource::Inline(_) => {
                    warn!("Inline subtitles were not staged to a file, skipping subtitles")
                }
            }
        }

        debug!(
            nodes = graph.len(),
            inputs = inputs.len(),
            "Compiled filter graph"
        );

        CompiledProgram {
            graph,
            inputs,
            duration: request.duration,
        }
    }

    fn background(
        &self,
        request: &CompositionRequest,
        graph: &mut FilterGraph,
        inputs: &mut Vec<InputSource>,
        labels: &mut LabelAllocator,
    ) -> Pad {
        let (width, height) = (request.width, request.height);
        let color = match &request.background {
            Background::Image { source } => match source.as_input() {
                Some(path) => {
                    inputs.push(InputSource::LoopedImage {
                        path,
                        duration: request.duration,
                    });
                    let label = labels.next(LabelKind::ScaledImage);
                    graph.push(FilterNode::new(
                        NodeKind::Scale,
                        vec![Pad::video(0)],
                        fill_crop(width, height),
                        label.clone(),
                    ));
                    return Pad::Label(label);
                }
                None => {
                    warn!("Background image has no usable location, using black");
                    "black"
                }
            },
            Background::Color { color } => color.as_str(),
        };

        inputs.push(InputSource::Lavfi {
            spec: format!(
                "color=c={}:s={}x{}:r={}:d={}",
                color,
                width,
                height,
                self.config.fps,
                format_number(request.duration)
            ),
        });
        Pad::video(0)
    }

    fn image(
        &mut self,
        request: &CompositionRequest,
        clip: &ImageClip,
        current: Pad,
        graph: &mut FilterGraph,
        inputs: &mut Vec<InputSource>,
        labels: &mut LabelAllocator,
    ) -> Pad {
        // Eligibility guarantees a location.
        let path = clip.source.as_input().unwrap_or_default();
        let input = inputs.len();
        let (x, y, width, height) = match clip.rect {
            Some(rect) => (rect.x, rect.y, rect.width, rect.height),
            None => (0, 0, request.width, request.height),
        };

        let scaled = match self.ken_burns(clip, request.ken_burns.as_ref()) {
            Some(kb) => {
                inputs.push(InputSource::StillImage { path });
                let frames = ((clip.length * self.config.fps as f64).round() as u64).max(1);
                let label = labels.next(LabelKind::KenBurns);
                graph.push(FilterNode::new(
                    NodeKind::KenBurns,
                    vec![Pad::video(input)],
                    format!(
                        "scale={}:-2,zoompan=z='min(zoom+{},{})':x='{}':y='{}':d={}:s={}x{}:fps={},setpts=PTS-STARTPTS+{}/TB",
                        kb.prescale_width,
                        format_number(kb.zoom_rate),
                        format_number(MAX_ZOOM),
                        kb.pan_x,
                        kb.pan_y,
                        frames,
                        width,
                        height,
                        self.config.fps,
                        format_number(clip.start)
                    ),
                    label.clone(),
                ));
                label
            }
            None => {
                inputs.push(InputSource::LoopedImage {
                    path,
                    duration: clip.end(),
                });
                let covers = clip
                    .rect
                    .map_or(true, |r| r.covers(request.width, request.height));
                let filter = if covers {
                    fill_crop(width, height)
                } else {
                    format!("scale={}:{},setsar=1", width, height)
                };
                let label = labels.next(LabelKind::ScaledImage);
                graph.push(FilterNode::new(
                    NodeKind::Scale,
                    vec![Pad::video(input)],
                    filter,
                    label.clone(),
                ));
                label
            }
        };

        let output = labels.next(LabelKind::Overlay);
        graph.push(FilterNode::new(
            NodeKind::Overlay,
            vec![current, Pad::Label(scaled)],
            format!(
                "overlay={}:{}:enable='gte(t,{})*lt(t,{})'",
                x,
                y,
                format_number(clip.start),
                format_number(clip.end())
            ),
            output.clone(),
        ));
        Pad::Label(output)
    }

    fn ken_burns(
        &mut self,
        clip: &ImageClip,
        defaults: Option<&KenBurnsDefaults>,
    ) -> Option<KenBurns> {
        let randomize = defaults.is_some_and(|d| d.randomize_pan);
        let default_prescale = defaults.map_or(3840, |d| d.prescale_width);

        let (zoom_rate, pan_x, pan_y, prescale) = match (&clip.ken_burns, defaults) {
            (Some(spec), _) if spec.enabled => (
                spec.zoom_rate,
                spec.pan_x.clone(),
                spec.pan_y.clone(),
                spec.prescale_width.unwrap_or(default_prescale),
            ),
            (Some(_), _) => return None,
            (None, Some(d)) if d.enabled => (d.zoom_rate, None, None, d.prescale_width),
            (None, _) => return None,
        };

        let preset = if randomize {
            PAN_PRESETS[self.rng.gen_range(0..PAN_PRESETS.len())]
        } else {
            PAN_PRESETS[0]
        };

        Some(KenBurns {
            zoom_rate,
            pan_x: pan_x.unwrap_or_else(|| preset.0.to_string()),
            pan_y: pan_y.unwrap_or_else(|| preset.1.to_string()),
            prescale_width: prescale,
        })
    }

    fn text(
        &self,
        cue: &TextCue,
        current: Pad,
        graph: &mut FilterGraph,
        labels: &mut LabelAllocator,
    ) -> Pad {
        let mut options = vec![format!("text='{}'", escape_text(&cue.text))];
        if let Some(font) = &cue.font_file {
            options.push(format!(
                "fontfile='{}'",
                escape_filter_value(&font.to_string_lossy())
            ));
        }

        if cue.keyframes.is_empty() {
            options.push(format!("fontsize={}", cue.font_size));
            options.push(format!("fontcolor={}", cue.color));
            options.push(format!(
                "x={}",
                cue.x.map_or("(w-text_w)/2".to_string(), format_number)
            ));
            options.push(format!(
                "y={}",
                cue.y.map_or("(h-text_h)/2".to_string(), format_number)
            ));
        } else {
            // Keyframe times count from the cue start.
            let var = format!("(t-{})", format_number(cue.start));
            let curve = |p| Curve::from_keyframes(&cue.keyframes, p);

            let scale = curve(Property::Scale);
            match scale {
                Curve::Constant(s) => options.push(format!(
                    "fontsize={}",
                    format_number((cue.font_size as f64 * s).round())
                )),
                _ => options.push(format!(
                    "fontsize='{}*{}'",
                    cue.font_size,
                    scale.to_expression(&var)
                )),
            }
            options.push(format!("fontcolor={}", cue.color));
            options.push(format!("x='{}'", curve(Property::X).to_expression(&var)));
            options.push(format!("y='{}'", curve(Property::Y).to_expression(&var)));
            let opacity = curve(Property::Opacity);
            if opacity != Curve::Constant(1.0) {
                options.push(format!("alpha='{}'", opacity.to_expression(&var)));
            }
        }

        if let Some(box_color) = &cue.box_color {
            options.push(format!("box=1:boxcolor={}:boxborderw=10", box_color));
        }
        options.push(format!(
            "enable='between(t,{},{})'",
            format_number(cue.start),
            format_number(cue.end)
        ));

        let output = labels.next(LabelKind::Text);
        graph.push(FilterNode::new(
            NodeKind::DrawText,
            vec![current],
            format!("drawtext={}", options.join(":")),
            output.clone(),
        ));
        Pad::Label(output)
    }

    fn audio(
        &self,
        request: &CompositionRequest,
        graph: &mut FilterGraph,
        inputs: &mut Vec<InputSource>,
    ) {
        let mut pads = Vec::new();
        let mut weights = Vec::new();
        for (index, track) in request.audio.iter().enumerate() {
            let Some(path) = track.source.as_input() else {
                debug!(index, "Skipping audio track without a location");
                continue;
            };
            pads.push(Pad::audio(inputs.len()));
            weights.push(format_number(track.effective_volume()));
            inputs.push(InputSource::Audio {
                path,
                looped: track.role == AudioRole::Music,
            });
        }

        if pads.is_empty() {
            return;
        }

        // A single track still goes through amix.
        let filter = format!(
            "amix=inputs={}:duration=longest:dropout_transition=0:weights='{}':normalize=0",
            pads.len(),
            weights.join(" ")
        );
        graph.push(FilterNode::new(
            NodeKind::AudioMix,
            pads,
            filter,
            Label::audio_out(),
        ));
    }
}

fn clip_is_eligible(clip: &ImageClip) -> bool {
    clip.source.as_input().is_some()
        && clip.start.is_finite()
        && clip.length.is_finite()
        && clip.start >= 0.0
        && clip.length > 0.0
        && clip.rect.map_or(true, |r| r.width > 0 && r.height > 0)
}

fn cue_is_eligible(cue: &TextCue) -> bool {
    !cue.text.trim().is_empty()
        && cue.start.is_finite()
        && cue.end.is_finite()
        && cue.start >= 0.0
        && cue.end > cue.start
}

fn fill_crop(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1",
        w = width,
        h = height
    )
}

/// Escapes text for a single-quoted drawtext value.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('\'', "'\\''")
}

/// Escapes a path or value placed inside a single-quoted filter option.
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}
