use std::time::Duration;

use bonnet_core::ui::{Button, ElementId, ElementResult, FontStyle, Orientation, Placement, TextSize, UiTree};
use bonnet_core::{BoxError, Screen, ScreenContext};
use log::{debug, error, warn};

use super::{RootScreen, strings};

const STEPS: u32 = 16;
const STEP_DELAY: Duration = Duration::from_millis(250);
const WAKE_UP_AFTER: Duration = Duration::from_secs(2);

#[derive(Default)]
pub struct BluePillScreen {
    label: Option<ElementId>,
}

impl BluePillScreen {
    /// Returns the tree with its label and progress bar ids.
    fn build(&mut self) -> ElementResult<(UiTree, ElementId, ElementId)> {
        let mut tree = UiTree::new();
        let column = tree.add_linear(Orientation::Vertical);
        let label = tree.add_text(FontStyle::sized(TextSize::Medium), strings::took_blue_pill());
        let bar = tree.add_progress_bar(100, 8);
        tree.push(column, label, Placement::Center)?;
        tree.push_space(column, 4, Placement::Center)?;
        tree.push(column, bar, Placement::Center)?;
        tree.set_root(column)?;
        self.label = Some(label);
        Ok((tree, label, bar))
    }
}

impl Screen for BluePillScreen {
    fn name(&self) -> &str {
        "blue-pill"
    }

    fn open(&mut self, ctx: &mut ScreenContext<'_>) {
        let (tree, label, bar) = match self.build() {
            Ok(built) => built,
            Err(err) => {
                error!("Failed to build blue pill screen: {err}");
                return;
            }
        };
        ctx.set_ui(tree);

        let handle = ctx.handle().clone();
        let fill = ctx.executor().submit(move |token| -> Result<(), BoxError> {
            for step in 1..=STEPS {
                token.sleep(STEP_DELAY)?;
                handle.update_ui(|tree| {
                    if let Some(bar) = tree.progress_bar_mut(bar) {
                        bar.set_progress(step, STEPS);
                    }
                })?;
            }
            Ok(())
        });
        let done = ctx.handle().clone();
        fill.then(move |(), _| {
            done.update_ui(|tree| {
                if let Some(text) = tree.text_mut(label) {
                    text.set_text(strings::back_to_normal());
                }
            })?;
            Ok(())
        })
        .on_exception(|err| warn!("Blue pill progress failed: {err}"))
        .on_cancel(|| debug!("Blue pill progress cancelled"));

        // Queued behind the fill on the same executor.
        let next_root = ctx.create_screen(RootScreen::default());
        ctx.handle().wait_then_set_current_screen(WAKE_UP_AFTER, next_root);
    }

    fn accepts_back(&self) -> bool {
        true
    }

    fn on_button_down(&mut self, ctx: &mut ScreenContext<'_>, button: Button) {
        let Some(label) = self.label else {
            return;
        };
        let text = match button {
            Button::A => strings::no_going_back(),
            _ => strings::back_to_normal(),
        };
        if let Some(mut ui) = ctx.ui_mut()
            && let Some(label) = ui.text_mut(label)
        {
            label.set_text(text);
        }
    }
}
