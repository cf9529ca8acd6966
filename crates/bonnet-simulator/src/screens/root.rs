//! Root menu: pick a pill with Left/Right, confirm with B.

use bonnet_core::ui::{Button, ElementId, ElementResult, FontStyle, Orientation, Placement, TextSize, UiTree};
use bonnet_core::{Screen, ScreenContext};
use log::{debug, error};

use super::strings;
use super::{BluePillScreen, RedPillScreen};

#[derive(Default)]
pub struct RootScreen {
    menu: Option<ElementId>,
}

impl RootScreen {
    fn build(&mut self) -> ElementResult<UiTree> {
        let mut tree = UiTree::new();
        let column = tree.add_linear(Orientation::Vertical);
        let title = tree.add_text(FontStyle::sized(TextSize::Small), strings::choose_wisely());
        let menu = tree.add_menu(
            FontStyle::sized(TextSize::Medium),
            6,
            Orientation::Horizontal,
            [strings::red_pill(), strings::blue_pill()],
        );
        tree.push(column, title, Placement::Leading)?;
        tree.push(column, menu, Placement::Center)?;
        tree.set_root(column)?;
        self.menu = Some(menu);
        Ok(tree)
    }
}

impl Screen for RootScreen {
    fn name(&self) -> &str {
        "root"
    }

    fn open(&mut self, ctx: &mut ScreenContext<'_>) {
        match self.build() {
            Ok(tree) => ctx.set_ui(tree),
            Err(err) => error!("Failed to build root screen: {err}"),
        }
    }

    fn on_button_down(&mut self, ctx: &mut ScreenContext<'_>, button: Button) {
        let Some(menu) = self.menu else {
            return;
        };
        match button {
            Button::Left | Button::Up => {
                if let Some(mut ui) = ctx.ui_mut()
                    && let Some(mut view) = ui.menu_mut(menu)
                {
                    view.decrement_selection();
                }
            }
            Button::Right | Button::Down => {
                if let Some(mut ui) = ctx.ui_mut()
                    && let Some(mut view) = ui.menu_mut(menu)
                {
                    view.increment_selection();
                }
            }
            Button::B => {
                let selected = ctx
                    .ui()
                    .and_then(|ui| ui.menu(menu).and_then(|menu| menu.selected_index()));
                debug!("Menu confirmed at {selected:?}");
                match selected {
                    // Red: stay in wonderland, back returns here.
                    Some(0) => {
                        let next = ctx.create_child(RedPillScreen::default());
                        ctx.set_current_screen(next);
                    }
                    // Blue: no parent, so there is no way back.
                    Some(1) => {
                        let next = ctx.create_screen(BluePillScreen::default());
                        ctx.set_current_screen(next);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
