// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-window paint pass.

use std::panic::{self, AssertUnwindSafe};

use hashbrown::HashMap;
use kurbo::{Affine, Point, Rect};
use ultracanvas_event::WindowId;
use ultracanvas_tree::{ElementFlags, ElementId, Tree};

use super::route::is_enabled;
use crate::ElementRef;
use crate::element::Element;
use crate::render::{Color, RenderContext, RenderInfo};
use crate::tooltip::Tooltip;
use crate::window::Window;

const TOOLTIP_PADDING: f64 = 4.0;
const TOOLTIP_BACKGROUND: Color = Color::rgb(255, 255, 225);

/// Paint one window: the root subtree, open popups above it, then the tooltip.
pub(crate) fn paint_window(window: &mut Window, hovered: Option<ElementRef>, tooltip: Option<&Tooltip>) {
    let id = window.id;
    let size = window.size();
    let root = window.tree.root();
    let popups: Vec<ElementId> = window
        .popups
        .iter()
        .filter(|p| !p.dismissed)
        .map(|p| p.root)
        .collect();

    let mut painter = Painter {
        window: id,
        tree: &window.tree,
        elements: &mut window.elements,
        context: window.context.as_mut(),
        focused: window.focus.focused(),
        hovered: hovered.filter(|h| h.window == id).map(|h| h.element),
    };
    painter.context.begin_frame(size);
    painter.subtree(root);
    for popup in popups {
        painter.subtree(popup);
    }
    if let Some(tooltip) = tooltip.filter(|t| t.target.window == id) {
        painter.tooltip(tooltip);
    }
    if let Err(error) = painter.context.end_frame() {
        tracing::error!(window = id.0, %error, "frame submission failed");
    }
}

struct Painter<'a> {
    window: WindowId,
    tree: &'a Tree,
    elements: &'a mut HashMap<ElementId, Box<dyn Element>>,
    context: &'a mut dyn RenderContext,
    focused: Option<ElementId>,
    hovered: Option<ElementId>,
}

impl Painter<'_> {
    fn subtree(&mut self, id: ElementId) {
        let tree = self.tree;
        let Some(local) = tree.local(id) else {
            return;
        };
        if !local.flags.contains(ElementFlags::VISIBLE) {
            return;
        }
        let size = local.bounds.size();
        let clip = local.flags.contains(ElementFlags::CLIP_TO_BOUNDS);

        self.context
            .push_transform(Affine::translate(local.bounds.origin().to_vec2()));
        if let Some(element) = self.elements.get_mut(&id) {
            let info = RenderInfo {
                window: self.window,
                element: id,
                size,
                focused: self.focused == Some(id),
                hovered: self.hovered == Some(id),
                disabled: !is_enabled(tree, id),
            };
            let context = &mut *self.context;
            match panic::catch_unwind(AssertUnwindSafe(|| element.render(context, &info))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => tracing::error!(
                    window = self.window.0,
                    element = local.identifier.as_str(),
                    %error,
                    "element failed to render"
                ),
                Err(_) => tracing::error!(
                    window = self.window.0,
                    element = local.identifier.as_str(),
                    "element panicked while rendering"
                ),
            }
        }
        if clip {
            self.context
                .push_clip(Rect::from_origin_size(Point::ZERO, size));
        }
        for child in tree.paint_order(id) {
            self.subtree(child);
        }
        if clip {
            self.context.pop_clip();
        }
        self.context.pop_transform();
    }

    fn tooltip(&mut self, tooltip: &Tooltip) {
        let cx = &mut *self.context;
        let text = cx.measure_text(&tooltip.text);
        let frame = Rect::new(
            0.0,
            0.0,
            text.width + 2.0 * TOOLTIP_PADDING,
            text.height + 2.0 * TOOLTIP_PADDING,
        );
        cx.push_transform(Affine::translate(tooltip.position.to_vec2()));
        cx.set_fill_color(TOOLTIP_BACKGROUND);
        cx.fill_rect(frame);
        cx.set_stroke_color(Color::BLACK);
        cx.set_stroke_width(1.0);
        cx.stroke_rect(frame);
        cx.set_fill_color(Color::BLACK);
        cx.draw_text(
            &tooltip.text,
            Point::new(TOOLTIP_PADDING, TOOLTIP_PADDING + text.height),
        );
        cx.pop_transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use ultracanvas_native::NativeHandle;
    use ultracanvas_tree::LocalElement;

    use crate::element::EventCx;
    use crate::error::RenderError;
    use crate::render::{DrawOp, RecordingContext};
    use ultracanvas_event::UIEvent;

    struct Label(&'static str);

    impl Element for Label {
        fn receive(&mut self, _: &UIEvent, _: &mut EventCx<'_>) -> bool {
            false
        }

        fn render(&mut self, context: &mut dyn RenderContext, info: &RenderInfo) -> Result<(), RenderError> {
            context.fill_rect(info.local_bounds());
            context.draw_text(self.0, Point::ZERO);
            Ok(())
        }
    }

    #[test]
    fn elements_paint_in_window_space_with_clipping() {
        let mut window = Window::new(WindowId(1), NativeHandle(1), Size::new(200.0, 100.0), "w");
        let recording = RecordingContext::new();
        window.set_render_context(recording.clone());
        let root = window.root();
        let panel = window
            .tree
            .insert(
                root,
                LocalElement::container("panel", Rect::new(10.0, 10.0, 110.0, 60.0)).clipped(),
            )
            .unwrap();
        let label = window
            .tree
            .insert(panel, LocalElement::leaf("label", Rect::new(5.0, 5.0, 45.0, 25.0)))
            .unwrap();
        window.elements.insert(label, Box::new(Label("hello")));

        paint_window(&mut window, None, None);

        let ops = recording.last_frame();
        assert!(ops.contains(&DrawOp::PushClip(Rect::new(10.0, 10.0, 110.0, 60.0))));
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::FillRect { rect, .. } if *rect == Rect::new(15.0, 15.0, 55.0, 35.0)
        )));
        assert_eq!(recording.last_frame_texts(), ["hello"]);
    }

    #[test]
    fn hidden_subtrees_and_dismissed_popups_are_skipped() {
        let mut window = Window::new(WindowId(1), NativeHandle(1), Size::new(200.0, 100.0), "w");
        let recording = RecordingContext::new();
        window.set_render_context(recording.clone());
        let root = window.root();
        let hidden = window
            .tree
            .insert(root, LocalElement::leaf("hidden", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        window.elements.insert(hidden, Box::new(Label("hidden")));
        window.set_visible(hidden, false);
        let menu = window
            .tree
            .insert_detached(LocalElement::leaf("menu", Rect::new(50.0, 50.0, 90.0, 90.0)));
        window.elements.insert(menu, Box::new(Label("menu")));
        window.popups.push(crate::window::Popup {
            root: menu,
            owner: None,
            dismissed: false,
        });

        paint_window(&mut window, None, None);
        assert_eq!(recording.last_frame_texts(), ["menu"]);

        window.mark_dismissed(menu);
        paint_window(&mut window, None, None);
        assert!(recording.last_frame_texts().is_empty());
    }
}
