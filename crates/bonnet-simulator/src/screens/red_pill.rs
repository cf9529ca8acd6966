use std::time::Duration;

use bonnet_core::ui::{Button, FontStyle, LocalizedStr, Orientation, Placement, TextSize, UiTree};
use bonnet_core::{Screen, ScreenContext};

use super::strings;

/// How long the red pill message stays up before returning to the menu.
const RETURN_AFTER: Duration = Duration::from_secs(8);

/// A single centered line of text.
pub(super) fn message_tree(text: LocalizedStr, size: TextSize) -> UiTree {
    let mut tree = UiTree::new();
    let column = tree.add_linear(Orientation::Vertical);
    let message = tree.add_text(FontStyle::sized(size), text);
    // Fresh ids in a fresh tree.
    let _ = tree.push(column, message, Placement::Center);
    let _ = tree.set_root(column);
    tree
}

#[derive(Default)]
pub struct RedPillScreen;

impl Screen for RedPillScreen {
    fn name(&self) -> &str {
        "red-pill"
    }

    fn open(&mut self, ctx: &mut ScreenContext<'_>) {
        ctx.set_ui(message_tree(strings::took_red_pill(), TextSize::Large));
        ctx.handle().wait_then_go_to_parent(RETURN_AFTER);
    }

    fn on_button_down(&mut self, ctx: &mut ScreenContext<'_>, button: Button) {
        if button == Button::B {
            ctx.set_ui(message_tree(strings::real_world(), TextSize::Small));
        }
    }
}
