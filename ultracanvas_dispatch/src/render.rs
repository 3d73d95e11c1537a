// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing surface contract and a recording implementation.
//!
//! The coordinator paints each window through a [`RenderContext`]. Before an element's
//! `render` runs, the context's transform is translated to the element's origin, so elements
//! draw in local coordinates. Containers with
//! [`ElementFlags::CLIP_TO_BOUNDS`](ultracanvas_tree::ElementFlags::CLIP_TO_BOUNDS) push a
//! clip around their children.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};
use ultracanvas_event::WindowId;
use ultracanvas_tree::ElementId;

use crate::error::RenderError;

/// An RGBA color, 8 bits per channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// A color with alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Font selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    /// Family name.
    pub family: String,
    /// Size in pixels.
    pub size: f64,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: String::from("sans-serif"),
            size: 12.0,
        }
    }
}

/// Where image data comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// An image file on disk.
    File(&'a Path),
    /// Encoded image bytes.
    Memory(&'a [u8]),
}

/// A drawing surface for one window.
///
/// Units are pixels. The current transform maps drawing coordinates to window coordinates;
/// [`RenderContext::push_transform`] composes onto it and [`RenderContext::pop_transform`]
/// restores the previous one.
pub trait RenderContext {
    /// A frame of `size` is about to be drawn.
    fn begin_frame(&mut self, _size: Size) {}

    /// The frame is complete.
    fn end_frame(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Save the current transform and compose `transform` onto it.
    fn push_transform(&mut self, transform: Affine);

    /// Restore the transform saved by the matching [`RenderContext::push_transform`].
    fn pop_transform(&mut self);

    /// Compose `transform` onto the current transform without saving it.
    fn concat(&mut self, transform: Affine);

    /// Translate the current transform.
    fn translate(&mut self, offset: Vec2) {
        self.concat(Affine::translate(offset));
    }

    /// Scale the current transform.
    fn scale(&mut self, factor: f64) {
        self.concat(Affine::scale(factor));
    }

    /// Rotate the current transform by `radians`.
    fn rotate(&mut self, radians: f64) {
        self.concat(Affine::rotate(radians));
    }

    /// Intersect the clip with `rect` (in current coordinates) until the matching pop.
    fn push_clip(&mut self, rect: Rect);

    /// Restore the clip saved by the matching [`RenderContext::push_clip`].
    fn pop_clip(&mut self);

    /// Color used by fills and text.
    fn set_fill_color(&mut self, color: Color);

    /// Color used by strokes.
    fn set_stroke_color(&mut self, color: Color);

    /// Stroke width.
    fn set_stroke_width(&mut self, width: f64);

    /// Global alpha multiplied into every draw.
    fn set_alpha(&mut self, alpha: f32);

    /// Font used by text drawing and measurement.
    fn set_font(&mut self, font: &Font);

    /// Fill a rectangle.
    fn fill_rect(&mut self, rect: Rect);

    /// Stroke a rectangle outline.
    fn stroke_rect(&mut self, rect: Rect);

    /// Fill a path.
    fn fill_path(&mut self, path: &BezPath);

    /// Stroke a path.
    fn stroke_path(&mut self, path: &BezPath);

    /// Draw text with its baseline origin at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point);

    /// Size `text` would occupy in the current font.
    fn measure_text(&mut self, text: &str) -> Size;

    /// Draw an image scaled into `dest`.
    fn draw_image(&mut self, source: ImageSource<'_>, dest: Rect) -> Result<(), RenderError>;
}

/// What an element needs to know while painting.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderInfo {
    /// The window being painted.
    pub window: WindowId,
    /// The element being painted.
    pub element: ElementId,
    /// The element's size; it paints into `(0, 0)..size`.
    pub size: Size,
    /// The element holds keyboard focus.
    pub focused: bool,
    /// The pointer is over the element.
    pub hovered: bool,
    /// The element is disabled.
    pub disabled: bool,
}

impl RenderInfo {
    /// The element's bounds in its own coordinates.
    pub fn local_bounds(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.size)
    }
}

/// One recorded drawing operation. Geometry is in window coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// A frame started.
    BeginFrame(Size),
    /// A frame ended.
    EndFrame,
    /// Clip pushed.
    PushClip(Rect),
    /// Clip popped.
    PopClip,
    /// Rectangle filled.
    FillRect {
        /// Filled area.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Rectangle stroked.
    StrokeRect {
        /// Outline.
        rect: Rect,
        /// Stroke color.
        color: Color,
        /// Stroke width before transformation.
        width: f64,
    },
    /// Path filled.
    FillPath(BezPath),
    /// Path stroked.
    StrokePath(BezPath),
    /// Text drawn.
    Text {
        /// The text.
        text: String,
        /// Baseline origin.
        origin: Point,
    },
    /// Image drawn.
    Image {
        /// File path, when drawn from a file.
        path: Option<PathBuf>,
        /// Destination.
        dest: Rect,
    },
}

#[derive(Clone, Debug)]
struct Paint {
    fill: Color,
    stroke: Color,
    stroke_width: f64,
    alpha: f32,
    font: Font,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            stroke: Color::BLACK,
            stroke_width: 1.0,
            alpha: 1.0,
            font: Font::default(),
        }
    }
}

/// A [`RenderContext`] that records operations instead of drawing.
///
/// Clones share one log, so a test can keep a handle while the window owns the context.
/// Text is measured as `0.6 * font size` per character.
#[derive(Clone, Debug)]
pub struct RecordingContext {
    ops: Rc<RefCell<Vec<DrawOp>>>,
    transform: Affine,
    transforms: Vec<Affine>,
    clips: usize,
    paint: Paint,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self {
            ops: Rc::default(),
            transform: Affine::IDENTITY,
            transforms: Vec::new(),
            clips: 0,
            paint: Paint::default(),
        }
    }
}

impl RecordingContext {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.borrow().clone()
    }

    /// Operations of the most recent frame.
    pub fn last_frame(&self) -> Vec<DrawOp> {
        let ops = self.ops.borrow();
        let start = ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::BeginFrame(_)))
            .unwrap_or(0);
        ops[start..].to_vec()
    }

    /// Texts drawn in the most recent frame, in order.
    pub fn last_frame_texts(&self) -> Vec<String> {
        self.last_frame()
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Number of frames begun.
    pub fn frames(&self) -> usize {
        self.ops
            .borrow()
            .iter()
            .filter(|op| matches!(op, DrawOp::BeginFrame(_)))
            .count()
    }

    /// Drop the log.
    pub fn clear(&self) {
        self.ops.borrow_mut().clear();
    }

    fn record(&self, op: DrawOp) {
        self.ops.borrow_mut().push(op);
    }

    fn with_alpha(&self, color: Color) -> Color {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "alpha is clamped to 0..=255 before the cast"
        )]
        let a = (f32::from(color.a) * self.paint.alpha.clamp(0.0, 1.0)).round() as u8;
        Color { a, ..color }
    }
}

impl RenderContext for RecordingContext {
    fn begin_frame(&mut self, size: Size) {
        self.transform = Affine::IDENTITY;
        self.transforms.clear();
        self.clips = 0;
        self.paint = Paint::default();
        self.record(DrawOp::BeginFrame(size));
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let balanced = self.transforms.is_empty() && self.clips == 0;
        self.record(DrawOp::EndFrame);
        if balanced {
            Ok(())
        } else {
            Err(RenderError::Backend(String::from(
                "unbalanced transform or clip stack at end of frame",
            )))
        }
    }

    fn push_transform(&mut self, transform: Affine) {
        self.transforms.push(self.transform);
        self.transform *= transform;
    }

    fn pop_transform(&mut self) {
        if let Some(previous) = self.transforms.pop() {
            self.transform = previous;
        }
    }

    fn concat(&mut self, transform: Affine) {
        self.transform *= transform;
    }

    fn push_clip(&mut self, rect: Rect) {
        self.clips += 1;
        self.record(DrawOp::PushClip(self.transform.transform_rect_bbox(rect)));
    }

    fn pop_clip(&mut self) {
        if self.clips > 0 {
            self.clips -= 1;
            self.record(DrawOp::PopClip);
        }
    }

    fn set_fill_color(&mut self, color: Color) {
        self.paint.fill = color;
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.paint.stroke = color;
    }

    fn set_stroke_width(&mut self, width: f64) {
        self.paint.stroke_width = width.max(0.0);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.paint.alpha = alpha;
    }

    fn set_font(&mut self, font: &Font) {
        self.paint.font = font.clone();
    }

    fn fill_rect(&mut self, rect: Rect) {
        let color = self.with_alpha(self.paint.fill);
        self.record(DrawOp::FillRect {
            rect: self.transform.transform_rect_bbox(rect),
            color,
        });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let color = self.with_alpha(self.paint.stroke);
        self.record(DrawOp::StrokeRect {
            rect: self.transform.transform_rect_bbox(rect),
            color,
            width: self.paint.stroke_width,
        });
    }

    fn fill_path(&mut self, path: &BezPath) {
        self.record(DrawOp::FillPath(self.transform * path.clone()));
    }

    fn stroke_path(&mut self, path: &BezPath) {
        self.record(DrawOp::StrokePath(self.transform * path.clone()));
    }

    fn draw_text(&mut self, text: &str, origin: Point) {
        self.record(DrawOp::Text {
            text: String::from(text),
            origin: self.transform * origin,
        });
    }

    fn measure_text(&mut self, text: &str) -> Size {
        #[allow(
            clippy::cast_precision_loss,
            reason = "character counts stay far below 2^52"
        )]
        let chars = text.chars().count() as f64;
        let size = self.paint.font.size;
        Size::new(chars * size * 0.6, size)
    }

    fn draw_image(&mut self, source: ImageSource<'_>, dest: Rect) -> Result<(), RenderError> {
        let path = match source {
            ImageSource::File(path) => Some(path.to_path_buf()),
            ImageSource::Memory([]) => {
                return Err(RenderError::Image(String::from("empty image buffer")));
            }
            ImageSource::Memory(_) => None,
        };
        self.record(DrawOp::Image {
            path,
            dest: self.transform.transform_rect_bbox(dest),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_is_recorded_in_window_coordinates() {
        let mut cx = RecordingContext::new();
        let log = cx.clone();
        cx.begin_frame(Size::new(100.0, 100.0));
        cx.push_transform(Affine::translate((10.0, 20.0)));
        cx.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        cx.push_transform(Affine::translate((1.0, 1.0)));
        cx.draw_text("hi", Point::ZERO);
        cx.pop_transform();
        cx.pop_transform();
        cx.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(cx.end_frame(), Ok(()));

        assert_eq!(
            log.last_frame(),
            [
                DrawOp::BeginFrame(Size::new(100.0, 100.0)),
                DrawOp::FillRect {
                    rect: Rect::new(10.0, 20.0, 15.0, 25.0),
                    color: Color::BLACK,
                },
                DrawOp::Text {
                    text: String::from("hi"),
                    origin: Point::new(11.0, 21.0),
                },
                DrawOp::FillRect {
                    rect: Rect::new(0.0, 0.0, 1.0, 1.0),
                    color: Color::BLACK,
                },
                DrawOp::EndFrame,
            ]
        );
    }

    #[test]
    fn unbalanced_frames_are_reported() {
        let mut cx = RecordingContext::new();
        cx.begin_frame(Size::new(10.0, 10.0));
        cx.push_clip(Rect::new(0.0, 0.0, 5.0, 5.0));
        assert!(cx.end_frame().is_err(), "an open clip is an error");

        cx.begin_frame(Size::new(10.0, 10.0));
        assert!(cx.end_frame().is_ok(), "a new frame starts balanced");
        assert_eq!(cx.frames(), 2);
    }

    #[test]
    fn alpha_scales_fills_and_empty_images_fail() {
        let mut cx = RecordingContext::new();
        cx.begin_frame(Size::new(10.0, 10.0));
        cx.set_alpha(0.5);
        cx.set_fill_color(Color::WHITE);
        cx.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(matches!(
            cx.last_frame()[1],
            DrawOp::FillRect { color: Color { a: 128, .. }, .. }
        ));
        assert!(
            cx.draw_image(ImageSource::Memory(&[]), Rect::ZERO).is_err(),
            "nothing to decode"
        );
        assert_eq!(cx.measure_text("abc"), Size::new(3.0 * 12.0 * 0.6, 12.0));
    }
}
