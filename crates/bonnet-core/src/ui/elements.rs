// src/ui/elements.rs
//! Element arena: the retained UI tree a screen builds and the render loop draws.
//!
//! Nodes live in a flat `Vec` owned by [`UiTree`] and refer to each other by
//! [`ElementId`]. Containers store child ids, never references, so a screen
//! can keep ids to the elements it wants to mutate later (a menu, a progress
//! bar) while the tree itself stays the single owner of every node.
//!
//! # Two-pass layout
//!
//! 1. **`measure(id, max_w, max_h)`**: computes and caches the node's size,
//!    always within the given maximum. Containers measure their children here.
//! 2. **`render(id, x, y, w, h, canvas)`**: draws the node inside the window,
//!    reading the sizes cached by the last measure.
//!
//! Hidden nodes measure to zero and draw nothing.

use thiserror::Error;

use crate::canvas::Canvas;
use crate::ui::components::{Leaf, Menu, ProgressBar, Spacer, Text};
use crate::ui::font::FontStyle;
use crate::ui::geometry::Size;
use crate::ui::i18n::LocalizedStr;
use crate::ui::layouts::{LinearLayout, Orientation, TableLayout};

/// Handle to a node in a [`UiTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

/// Errors raised while assembling a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("element {0:?} does not exist in this tree")]
    Unknown(ElementId),

    #[error("element {0:?} already has a parent")]
    AlreadyAttached(ElementId),

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCycle { parent: ElementId, child: ElementId },

    #[error("element {id:?} is not a {expected}")]
    WrongKind { id: ElementId, expected: &'static str },
}

pub type ElementResult<T> = Result<T, ElementError>;

/// The element variants.
#[derive(Debug)]
pub enum ElementKind {
    Text(Text),
    Spacer(Spacer),
    ProgressBar(ProgressBar),
    Linear(LinearLayout),
    Table(TableLayout),
    Menu(Menu),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text(_) => "text",
            ElementKind::Spacer(_) => "spacer",
            ElementKind::ProgressBar(_) => "progress bar",
            ElementKind::Linear(_) => "linear layout",
            ElementKind::Table(_) => "table layout",
            ElementKind::Menu(_) => "menu",
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    hidden: bool,
    size: Size,
    parent: Option<ElementId>,
    pub(crate) kind: ElementKind,
}

/// Arena-backed element tree with an optional root.
#[derive(Debug, Default)]
pub struct UiTree {
    nodes: Vec<Node>,
    root: Option<ElementId>,
}

impl UiTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId(self.nodes.len());
        self.nodes.push(Node {
            hidden: false,
            size: Size::ZERO,
            parent: None,
            kind,
        });
        id
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn add_text(&mut self, style: FontStyle, text: impl Into<LocalizedStr>) -> ElementId {
        self.insert(ElementKind::Text(Text::new(style, text)))
    }

    pub fn add_spacer(&mut self, width: u32, height: u32) -> ElementId {
        self.insert(ElementKind::Spacer(Spacer::new(width, height)))
    }

    pub fn add_progress_bar(&mut self, width: u32, height: u32) -> ElementId {
        self.insert(ElementKind::ProgressBar(ProgressBar::new(width, height)))
    }

    pub fn add_linear(&mut self, orientation: Orientation) -> ElementId {
        self.insert(ElementKind::Linear(LinearLayout::new(orientation)))
    }

    pub fn add_table(&mut self) -> ElementId {
        self.insert(ElementKind::Table(TableLayout::new()))
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Make `id` the node drawn for the whole screen. The root may not have a parent.
    pub fn set_root(&mut self, id: ElementId) -> ElementResult<()> {
        let node = self.nodes.get(id.0).ok_or(ElementError::Unknown(id))?;
        if node.parent.is_some() {
            return Err(ElementError::AlreadyAttached(id));
        }
        self.root = Some(id);
        Ok(())
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn kind(&self, id: ElementId) -> Option<&ElementKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub(crate) fn kind_mut(&mut self, id: ElementId) -> Option<&mut ElementKind> {
        self.nodes.get_mut(id.0).map(|n| &mut n.kind)
    }

    /// Link `child` under `parent`, refusing shared children and cycles.
    pub(crate) fn attach(&mut self, parent: ElementId, child: ElementId) -> ElementResult<()> {
        if self.nodes.get(parent.0).is_none() {
            return Err(ElementError::Unknown(parent));
        }
        if self.nodes.get(child.0).is_none() {
            return Err(ElementError::Unknown(child));
        }
        // Cycles first, so attaching a node under itself always reports one.
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(ElementError::WouldCycle { parent, child });
            }
            cursor = self.parent(ancestor);
        }
        if self.nodes[child.0].parent.is_some() || self.root == Some(child) {
            return Err(ElementError::AlreadyAttached(child));
        }
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Unlink `child` from its parent. The node stays in the arena.
    pub(crate) fn detach(&mut self, child: ElementId) {
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = None;
        }
    }

    pub(crate) fn wrong_kind(&self, id: ElementId, expected: &'static str) -> ElementError {
        if self.nodes.get(id.0).is_some() {
            ElementError::WrongKind { id, expected }
        } else {
            ElementError::Unknown(id)
        }
    }

    // -----------------------------------------------------------------------
    // Per-node state
    // -----------------------------------------------------------------------

    pub fn is_hidden(&self, id: ElementId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.hidden)
    }

    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) -> ElementResult<()> {
        let node = self.nodes.get_mut(id.0).ok_or(ElementError::Unknown(id))?;
        node.hidden = hidden;
        Ok(())
    }

    /// Size cached by the last [`measure`](Self::measure) of `id`.
    pub fn measured_size(&self, id: ElementId) -> Size {
        self.nodes.get(id.0).map_or(Size::ZERO, |n| n.size)
    }

    pub fn text(&self, id: ElementId) -> Option<&Text> {
        match self.kind(id) {
            Some(ElementKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: ElementId) -> Option<&mut Text> {
        match self.kind_mut(id) {
            Some(ElementKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn progress_bar(&self, id: ElementId) -> Option<&ProgressBar> {
        match self.kind(id) {
            Some(ElementKind::ProgressBar(bar)) => Some(bar),
            _ => None,
        }
    }

    pub fn progress_bar_mut(&mut self, id: ElementId) -> Option<&mut ProgressBar> {
        match self.kind_mut(id) {
            Some(ElementKind::ProgressBar(bar)) => Some(bar),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Measure / render dispatch
    // -----------------------------------------------------------------------

    /// Measure `id` against `max_w x max_h` and cache the result on the node.
    pub fn measure(&mut self, id: ElementId, max_w: u32, max_h: u32) -> Size {
        let Some(node) = self.nodes.get(id.0) else {
            return Size::ZERO;
        };
        let size = if node.hidden {
            Size::ZERO
        } else {
            match &node.kind {
                ElementKind::Text(text) => text.measure(max_w, max_h),
                ElementKind::Spacer(spacer) => spacer.measure(max_w, max_h),
                ElementKind::ProgressBar(bar) => bar.measure(max_w, max_h),
                ElementKind::Linear(_) => self.measure_linear(id, max_w, max_h),
                ElementKind::Table(_) => self.measure_table(id, max_w, max_h),
                ElementKind::Menu(menu) => {
                    let layout = menu.layout();
                    self.measure(layout, max_w, max_h)
                }
            }
        };
        let size = size.min(Size::new(max_w, max_h));
        self.nodes[id.0].size = size;
        size
    }

    /// Draw `id` inside the `w x h` window at `(x, y)`.
    pub fn render(&self, id: ElementId, x: i32, y: i32, w: u32, h: u32, canvas: &mut Canvas) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        if node.hidden || w == 0 || h == 0 {
            return;
        }
        match &node.kind {
            ElementKind::Text(text) => text.render(x, y, w, h, canvas),
            ElementKind::Spacer(spacer) => spacer.render(x, y, w, h, canvas),
            ElementKind::ProgressBar(bar) => bar.render(x, y, w, h, canvas),
            ElementKind::Linear(layout) => self.render_linear(layout, x, y, w, h, canvas),
            ElementKind::Table(table) => self.render_table(table, x, y, w, h, canvas),
            ElementKind::Menu(menu) => self.render(menu.layout(), x, y, w, h, canvas),
        }
    }

    /// Measure the root against the whole canvas and draw it there.
    ///
    /// Returns false when the tree has no root.
    pub fn measure_and_render(&mut self, canvas: &mut Canvas) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let (w, h) = (canvas.width(), canvas.height());
        self.measure(root, w, h);
        self.render(root, 0, 0, w, h, canvas);
        true
    }
}
