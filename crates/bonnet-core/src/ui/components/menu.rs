// src/ui/components/menu.rs
//! Selectable list of text items.
//!
//! A menu owns a linear layout of [`Text`](super::Text) nodes (with optional
//! spacers between them) and a selection cursor. Exactly the selected item
//! carries the menu's highlight style; every other item has none.

use crate::ui::elements::{ElementId, ElementKind, UiTree};
use crate::ui::font::{FontStyle, Highlight};
use crate::ui::i18n::LocalizedStr;
use crate::ui::layouts::{Orientation, Placement};

/// Menu state stored in the arena.
#[derive(Debug, Clone)]
pub struct Menu {
    layout: ElementId,
    items: Vec<ElementId>,
    style: FontStyle,
    spacing: u32,
    highlight: Highlight,
    selected: Option<usize>,
}

impl Menu {
    /// The linear layout node holding the items.
    pub fn layout(&self) -> ElementId {
        self.layout
    }

    pub fn items(&self) -> &[ElementId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn highlight(&self) -> Highlight {
        self.highlight
    }
}

impl UiTree {
    /// Build a menu of `items` drawn with `style`, `spacing` pixels apart.
    ///
    /// The first item is selected and highlighted with [`Highlight::Block`].
    pub fn add_menu<I, S>(&mut self, style: FontStyle, spacing: u32, orientation: Orientation, items: I) -> ElementId
    where
        I: IntoIterator<Item = S>,
        S: Into<LocalizedStr>,
    {
        let layout = self.add_linear(orientation);
        let menu = self.insert(ElementKind::Menu(Menu {
            layout,
            items: Vec::new(),
            style: style.with_highlight(Highlight::None),
            spacing,
            highlight: Highlight::Block,
            selected: None,
        }));
        // Both nodes were just created, so the link cannot fail.
        let _ = self.attach(menu, layout);

        let mut view = MenuMut { tree: self, id: menu };
        for item in items {
            view.push_item(item);
        }
        menu
    }

    pub fn menu(&self, id: ElementId) -> Option<&Menu> {
        match self.kind(id) {
            Some(ElementKind::Menu(menu)) => Some(menu),
            _ => None,
        }
    }

    /// Mutable view for driving the menu's selection and items.
    pub fn menu_mut(&mut self, id: ElementId) -> Option<MenuMut<'_>> {
        self.menu(id)?;
        Some(MenuMut { tree: self, id })
    }
}

/// Borrowed handle that can update a menu and the text nodes it owns.
pub struct MenuMut<'a> {
    tree: &'a mut UiTree,
    id: ElementId,
}

impl MenuMut<'_> {
    fn data(&self) -> Option<&Menu> {
        self.tree.menu(self.id)
    }

    fn data_mut(&mut self) -> Option<&mut Menu> {
        match self.tree.kind_mut(self.id) {
            Some(ElementKind::Menu(menu)) => Some(menu),
            _ => None,
        }
    }

    fn set_item_highlight(&mut self, item: ElementId, highlight: Highlight) {
        if let Some(text) = self.tree.text_mut(item) {
            text.set_highlight(highlight);
        }
    }

    pub fn len(&self) -> usize {
        self.data().map_or(0, Menu::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.data().and_then(Menu::selected_index)
    }

    /// Move the selection. An index past the end clears the selection.
    pub fn set_selected_index(&mut self, index: Option<usize>) {
        let Some(menu) = self.data() else {
            return;
        };
        let previous = menu.selected.and_then(|i| menu.items.get(i).copied());
        let index = index.filter(|i| *i < menu.items.len());
        let next = index.and_then(|i| menu.items.get(i).copied());
        let highlight = menu.highlight;

        if let Some(previous) = previous {
            self.set_item_highlight(previous, Highlight::None);
        }
        if let Some(next) = next {
            self.set_item_highlight(next, highlight);
        }
        if let Some(menu) = self.data_mut() {
            menu.selected = index;
        }
    }

    /// Select the next item, stopping at the last. With nothing selected, selects the last item.
    pub fn increment_selection(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let next = match self.selected_index() {
            None => len - 1,
            Some(i) => (i + 1).min(len - 1),
        };
        self.set_selected_index(Some(next));
    }

    /// Select the previous item, stopping at the first. With nothing selected, selects the first item.
    pub fn decrement_selection(&mut self) {
        if self.is_empty() {
            return;
        }
        let next = match self.selected_index() {
            None => 0,
            Some(i) => i.saturating_sub(1),
        };
        self.set_selected_index(Some(next));
    }

    pub fn unset_selection(&mut self) {
        self.set_selected_index(None);
    }

    /// Label of the selected item.
    pub fn selected_item(&self) -> Option<LocalizedStr> {
        let menu = self.data()?;
        let item = menu.items.get(menu.selected?)?;
        self.tree.text(*item).map(|text| text.text().clone())
    }

    /// Select the first item whose label equals `label`. Returns false if none matches.
    pub fn set_selected_item(&mut self, label: &LocalizedStr) -> bool {
        let Some(menu) = self.data() else {
            return false;
        };
        let found = menu
            .items
            .iter()
            .position(|item| self.tree.text(*item).is_some_and(|t| t.text() == label));
        if let Some(index) = found {
            self.set_selected_index(Some(index));
        }
        found.is_some()
    }

    /// Append an item. The first item added becomes selected.
    pub fn push_item(&mut self, label: impl Into<LocalizedStr>) -> Option<ElementId> {
        let menu = self.data()?;
        let (layout, spacing, style, count) =
            (menu.layout, menu.spacing, menu.style.clone(), menu.items.len());

        if count > 0 && spacing > 0 {
            self.tree.push_space(layout, spacing, Placement::Center).ok()?;
        }
        let text = self.tree.add_text(style, label);
        self.tree.push(layout, text, Placement::Center).ok()?;
        self.data_mut()?.items.push(text);
        if count == 0 {
            self.set_selected_index(Some(0));
        }
        Some(text)
    }

    /// Remove every item and clear the selection.
    pub fn clear(&mut self) {
        let Some(menu) = self.data_mut() else {
            return;
        };
        menu.items.clear();
        menu.selected = None;
        let layout = menu.layout;
        let _ = self.tree.clear_linear(layout);
    }

    /// Change the highlight style, re-applying it to the current selection.
    pub fn set_highlight(&mut self, highlight: Highlight) {
        let Some(menu) = self.data_mut() else {
            return;
        };
        menu.highlight = highlight;
        let selected = menu.selected.and_then(|i| menu.items.get(i).copied());
        if let Some(item) = selected {
            self.set_item_highlight(item, highlight);
        }
    }
}
