// src/ui/layouts/linear.rs
//! Row/column layout with leading, centered and trailing child groups.

use super::{Gravity, Orientation, Placement};
use crate::canvas::Canvas;
use crate::ui::elements::{ElementError, ElementId, ElementKind, ElementResult, UiTree};
use crate::ui::geometry::Size;

/// Lays children out along one axis in three groups.
///
/// Leading children sit flush against the start, trailing children flush
/// against the end, and centered children in the middle of whatever gap is
/// left. Leading and trailing children are measured first, so they get first
/// claim on space. Every child is placed on the cross axis by one shared
/// [`Gravity`].
///
/// # Examples
/// ```ignore
/// let row = tree.add_linear(Orientation::Horizontal);
/// tree.push(row, back_label, Placement::Leading)?;
/// tree.push(row, title, Placement::Center)?;
/// tree.push(row, clock, Placement::Trailing)?;
/// ```
#[derive(Debug, Clone)]
pub struct LinearLayout {
    orientation: Orientation,
    gravity: Gravity,
    groups: [Vec<ElementId>; 3],
    /// Main-axis extent of each group from the last measure.
    totals: [u32; 3],
}

impl LinearLayout {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            gravity: Gravity::Center,
            groups: Default::default(),
            totals: [0; 3],
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn gravity(&self) -> Gravity {
        self.gravity
    }

    /// Set the cross-axis gravity applied to every child.
    pub fn set_gravity(&mut self, gravity: Gravity) {
        self.gravity = gravity;
    }

    pub fn children(&self, placement: Placement) -> &[ElementId] {
        &self.groups[placement.index()]
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Window and axis data shared by every child of one render call.
struct Track {
    orientation: Orientation,
    gravity: Gravity,
    x: i32,
    y: i32,
    max_main: u32,
    max_cross: u32,
}

impl UiTree {
    pub fn linear(&self, id: ElementId) -> Option<&LinearLayout> {
        match self.kind(id) {
            Some(ElementKind::Linear(layout)) => Some(layout),
            _ => None,
        }
    }

    pub fn linear_mut(&mut self, id: ElementId) -> Option<&mut LinearLayout> {
        match self.kind_mut(id) {
            Some(ElementKind::Linear(layout)) => Some(layout),
            _ => None,
        }
    }

    fn linear_checked_mut(&mut self, id: ElementId) -> ElementResult<&mut LinearLayout> {
        if self.linear(id).is_none() {
            return Err(self.wrong_kind(id, "linear layout"));
        }
        self.linear_mut(id).ok_or(ElementError::Unknown(id))
    }

    /// Append `child` to one of the layout's groups.
    pub fn push(&mut self, layout: ElementId, child: ElementId, placement: Placement) -> ElementResult<()> {
        self.linear_checked_mut(layout)?;
        self.attach(layout, child)?;
        self.linear_checked_mut(layout)?.groups[placement.index()].push(child);
        Ok(())
    }

    /// Append a spacer of `len` pixels along the layout's main axis.
    pub fn push_space(&mut self, layout: ElementId, len: u32, placement: Placement) -> ElementResult<ElementId> {
        let orientation = self.linear_checked_mut(layout)?.orientation;
        let (w, h) = orientation.join(len, 0);
        let spacer = self.add_spacer(w, h);
        self.push(layout, spacer, placement)?;
        Ok(spacer)
    }

    /// Detach every child of the layout.
    pub fn clear_linear(&mut self, layout: ElementId) -> ElementResult<()> {
        let target = self.linear_checked_mut(layout)?;
        let groups = std::mem::take(&mut target.groups);
        target.totals = [0; 3];
        for child in groups.iter().flatten() {
            self.detach(*child);
        }
        Ok(())
    }

    pub(crate) fn measure_linear(&mut self, id: ElementId, max_w: u32, max_h: u32) -> Size {
        let Some(layout) = self.linear_mut(id) else {
            return Size::ZERO;
        };
        let orientation = layout.orientation;
        // Children never reach back to this node, so the groups can be lent out.
        let groups = std::mem::take(&mut layout.groups);

        let (max_main, max_cross) = orientation.split(max_w, max_h);
        let mut remaining = max_main;
        let mut cross = 0;
        let mut totals = [0u32; 3];
        for placement in Placement::MEASURE_ORDER {
            for &child in &groups[placement.index()] {
                let (cw, ch) = orientation.join(remaining, max_cross);
                let size = self.measure(child, cw, ch);
                let (child_main, child_cross) = orientation.split(size.width, size.height);
                totals[placement.index()] = totals[placement.index()].saturating_add(child_main);
                remaining = remaining.saturating_sub(child_main);
                cross = cross.max(child_cross);
            }
        }

        if let Some(layout) = self.linear_mut(id) {
            layout.groups = groups;
            layout.totals = totals;
        }

        let main = totals
            .iter()
            .fold(0u32, |sum, t| sum.saturating_add(*t))
            .min(max_main);
        let (w, h) = orientation.join(main, cross.min(max_cross));
        Size::new(w, h)
    }

    pub(crate) fn render_linear(&self, layout: &LinearLayout, x: i32, y: i32, w: u32, h: u32, canvas: &mut Canvas) {
        let (max_main, max_cross) = layout.orientation.split(w, h);
        let track = Track {
            orientation: layout.orientation,
            gravity: layout.gravity,
            x,
            y,
            max_main,
            max_cross,
        };

        let [lead, center, trail] = layout.totals;
        let gap = max_main.saturating_sub(lead.saturating_add(center).saturating_add(trail));
        let starts = [
            0,
            lead.saturating_add(gap / 2),
            max_main.saturating_sub(trail),
        ];

        for placement in [Placement::Leading, Placement::Center, Placement::Trailing] {
            let mut offset = starts[placement.index()];
            for &child in layout.children(placement) {
                let used = self.render_track_child(&track, child, offset, canvas);
                offset = offset.saturating_add(used);
            }
        }
    }

    /// Render one child at `offset` along the main axis; returns the main-axis length used.
    fn render_track_child(&self, track: &Track, child: ElementId, offset: u32, canvas: &mut Canvas) -> u32 {
        let size = self.measured_size(child);
        let (child_main, child_cross) = track.orientation.split(size.width, size.height);
        let main_len = child_main.min(track.max_main.saturating_sub(offset));
        let cross_len = child_cross.min(track.max_cross);
        if main_len == 0 || cross_len == 0 {
            return main_len;
        }
        let cross_offset = track.gravity.offset(track.max_cross - cross_len);
        let (dx, dy) = track.orientation.join(offset, cross_offset);
        let (cw, ch) = track.orientation.join(main_len, cross_len);
        self.render(
            child,
            track.x.saturating_add(dx as i32),
            track.y.saturating_add(dy as i32),
            cw,
            ch,
            canvas,
        );
        main_len
    }
}
