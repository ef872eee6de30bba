//! Piecewise-linear keyframe interpolation.
//!
//! A keyframe sequence is turned into a [`Curve`] per animated property. The
//! curve can be sampled directly or serialized into an expression the engine
//! evaluates once per output frame.

use crate::scene::Keyframe;

/// A scalar property carried by a [`Keyframe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    X,
    Y,
    Opacity,
    Scale,
}

impl Property {
    /// Value used when there are no keyframes at all.
    pub fn neutral(&self) -> f64 {
        match self {
            Property::X | Property::Y => 0.0,
            Property::Opacity | Property::Scale => 1.0,
        }
    }

    fn read(&self, keyframe: &Keyframe) -> f64 {
        match self {
            Property::X => keyframe.x,
            Property::Y => keyframe.y,
            Property::Opacity => keyframe.opacity,
            Property::Scale => keyframe.scale,
        }
    }
}

/// One linear piece between two keyframes with distinct times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub from: f64,
    pub to: f64,
}

impl Segment {
    fn delta(&self) -> f64 {
        self.to - self.from
    }

    fn span(&self) -> f64 {
        self.end - self.start
    }

    // Same operation order as the emitted expression.
    fn at(&self, t: f64) -> f64 {
        self.from + self.delta() * (t - self.start) / self.span()
    }
}

/// An interpolated property over time.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    Constant(f64),
    Piecewise {
        /// Value held before the first keyframe.
        before: f64,
        /// Contiguous segments in time order.
        segments: Vec<Segment>,
        /// Value held after the last keyframe.
        after: f64,
    },
}

impl Curve {
    /// Builds the curve for `property` from keyframes in any order.
    ///
    /// Keyframes sharing a time produce a step: the later one in the input
    /// wins from that instant on.
    pub fn from_keyframes(keyframes: &[Keyframe], property: Property) -> Self {
        let mut sorted: Vec<(f64, f64)> = keyframes
            .iter()
            .map(|k| (k.time, property.read(k)))
            .collect();
        // Stable, so equal times keep their input order.
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (first, last) = match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Curve::Constant(property.neutral()),
        };

        let segments: Vec<Segment> = sorted
            .windows(2)
            .filter(|pair| pair[0].0 != pair[1].0)
            .map(|pair| Segment {
                start: pair[0].0,
                end: pair[1].0,
                from: pair[0].1,
                to: pair[1].1,
            })
            .collect();

        if segments.is_empty() {
            return Curve::Constant(last.1);
        }
        if sorted.iter().all(|(_, v)| *v == first.1) {
            return Curve::Constant(first.1);
        }

        Curve::Piecewise {
            before: first.1,
            segments,
            after: last.1,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Curve::Constant(_))
    }

    /// Evaluates the curve at time `t`.
    pub fn sample(&self, t: f64) -> f64 {
        match self {
            Curve::Constant(v) => *v,
            Curve::Piecewise {
                before,
                segments,
                after,
            } => {
                let Some(first) = segments.first() else {
                    return *after;
                };
                if t < first.start {
                    return *before;
                }
                segments
                    .iter()
                    .find(|s| t < s.end)
                    .map(|s| s.at(t))
                    .unwrap_or(*after)
            }
        }
    }

    /// Serializes the curve into an engine expression over `var`.
    ///
    /// `var` is pasted verbatim, so compound variables such as `(t-2)` must
    /// already be parenthesized.
    pub fn to_expression(&self, var: &str) -> String {
        match self {
            Curve::Constant(v) => format_number(*v),
            Curve::Piecewise {
                before,
                segments,
                after,
            } => {
                let mut expr = format_number(*after);
                for segment in segments.iter().rev() {
                    expr = format!(
                        "if(lt({var},{end}),{from}+{delta}*({var}-{start})/{span},{expr})",
                        end = format_number(segment.end),
                        from = format_number(segment.from),
                        delta = format_number(segment.delta()),
                        start = format_number(segment.start),
                        span = format_number(segment.span()),
                    );
                }
                match segments.first() {
                    Some(first) => format!(
                        "if(lt({var},{}),{},{expr})",
                        format_number(first.start),
                        format_number(*before)
                    ),
                    None => expr,
                }
            }
        }
    }
}

/// Formats a number for an engine expression.
///
/// Shortest representation that parses back to the same value, never in
/// exponent form. Negatives are parenthesized so they can follow any
/// operator.
pub fn format_number(value: f64) -> String {
    let s = if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    };
    if s.starts_with('-') {
        format!("({})", s)
    } else {
        s
    }
}
