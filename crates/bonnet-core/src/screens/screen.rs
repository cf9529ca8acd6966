// src/screens/screen.rs
//! The [`Screen`] trait and the handles screens are driven through.
//!
//! A screen is a lifecycle unit: it owns one element tree and one task
//! executor, and is opened once when it becomes current and closed once when
//! it is superseded. The [`ScreenManager`](super::ScreenManager) calls the
//! hooks in this order:
//!
//! 1. **`open`**: once, before the screen is published as current. Build and
//!    install the initial tree with [`ScreenContext::set_ui`].
//! 2. **`on_button_down`**: for every press routed to the screen.
//! 3. **`close`**: once, when navigating away. Pending tasks on the screen's
//!    executor are cancelled right after.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::warn;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use super::manager::ManagerShared;
use crate::tasks::{ExecutorRegistry, Interrupted, TaskExecutor, TaskResult};
use crate::ui::{Button, UiTree};

// ---------------------------------------------------------------------------
// Screen trait
// ---------------------------------------------------------------------------

/// Behaviour of one screen.
///
/// Hooks run on whichever thread triggered them (a button source, a task
/// worker) while the manager's screen locks are held, so they should return
/// promptly. Long work belongs on [`ScreenContext::executor`].
pub trait Screen: Send + 'static {
    /// Name used in logs and executor thread names.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("screen")
    }

    fn open(&mut self, ctx: &mut ScreenContext<'_>);

    fn close(&mut self, _ctx: &mut ScreenContext<'_>) {}

    /// Whether the back button should reach [`on_button_down`](Self::on_button_down)
    /// instead of navigating to the parent screen.
    fn accepts_back(&self) -> bool {
        false
    }

    fn on_button_down(&mut self, _ctx: &mut ScreenContext<'_>, _button: Button) {}
}

// ---------------------------------------------------------------------------
// Screen slot and handle
// ---------------------------------------------------------------------------

/// Navigation requested from inside a hook, performed once the hook returns.
#[derive(Clone)]
pub(crate) enum Navigation {
    To(ScreenHandle),
    Parent,
}

impl Navigation {
    pub(crate) fn target(self, from: &ScreenHandle) -> Option<ScreenHandle> {
        match self {
            Navigation::To(target) => Some(target),
            Navigation::Parent => from.parent().cloned(),
        }
    }
}

struct ScreenState {
    /// Taken out while a hook runs.
    behavior: Option<Box<dyn Screen>>,
    ui: Option<UiTree>,
}

pub(crate) struct ScreenSlot {
    id: u64,
    name: String,
    parent: Option<ScreenHandle>,
    executor: TaskExecutor,
    registry: ExecutorRegistry,
    state: Mutex<ScreenState>,
    manager: Weak<ManagerShared>,
}

static NEXT_SCREEN_ID: AtomicU64 = AtomicU64::new(1);

/// Shared, thread-safe handle to a screen.
///
/// Handles compare equal when they refer to the same screen instance. Tasks
/// capture clones to update the screen's tree or navigate after a delay.
#[derive(Clone)]
pub struct ScreenHandle {
    slot: Arc<ScreenSlot>,
}

impl PartialEq for ScreenHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Eq for ScreenHandle {}

impl fmt::Debug for ScreenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenHandle")
            .field("id", &self.slot.id)
            .field("name", &self.slot.name)
            .finish()
    }
}

impl ScreenHandle {
    pub(crate) fn create(
        manager: Weak<ManagerShared>,
        registry: &ExecutorRegistry,
        parent: Option<ScreenHandle>,
        behavior: Box<dyn Screen>,
    ) -> Self {
        let id = NEXT_SCREEN_ID.fetch_add(1, Ordering::Relaxed);
        let name = behavior.name().to_string();
        let executor = TaskExecutor::with_registry(registry, format!("screen-{name}"));
        Self {
            slot: Arc::new(ScreenSlot {
                id,
                name,
                parent,
                executor,
                registry: registry.clone(),
                state: Mutex::new(ScreenState {
                    behavior: Some(behavior),
                    ui: None,
                }),
                manager,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.slot.id
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn parent(&self) -> Option<&ScreenHandle> {
        self.slot.parent.as_ref()
    }

    /// The screen's own executor. Its pending work is cancelled on close.
    pub fn executor(&self) -> &TaskExecutor {
        &self.slot.executor
    }

    pub fn is_current(&self) -> bool {
        self.slot
            .manager
            .upgrade()
            .is_some_and(|manager| manager.is_current(self))
    }

    pub fn has_ui(&self) -> bool {
        self.slot.state.lock().ui.is_some()
    }

    pub fn repaint(&self) {
        if let Some(manager) = self.slot.manager.upgrade() {
            manager.request_repaint();
        }
    }

    /// Replace the element tree; repaints only if this screen is current.
    ///
    /// From a task thread, gives up with [`Interrupted`] if the task is
    /// cancelled while waiting for the screen locks.
    pub fn set_ui(&self, tree: UiTree) -> Result<(), Interrupted> {
        match self.slot.manager.upgrade() {
            Some(manager) => {
                let _locks = manager.lock_screens()?;
                self.store_ui(tree);
                Ok(())
            }
            None => {
                self.slot.state.lock().ui = Some(tree);
                Ok(())
            }
        }
    }

    /// Mutate the installed tree in place and repaint if current.
    ///
    /// Returns `Ok(None)` when the screen has no tree yet.
    pub fn update_ui<R>(&self, f: impl FnOnce(&mut UiTree) -> R) -> Result<Option<R>, Interrupted> {
        let manager = self.slot.manager.upgrade();
        let _locks = match &manager {
            Some(manager) => Some(manager.lock_screens()?),
            None => None,
        };
        let result = self.slot.state.lock().ui.as_mut().map(f);
        if result.is_some() && self.is_current() {
            self.repaint();
        }
        Ok(result)
    }

    /// Navigate to `target` after `delay`, unless this screen stopped being
    /// current in the meantime. Cancel the result to abort the wait.
    pub fn wait_then_set_current_screen(&self, delay: Duration, target: ScreenHandle) -> TaskResult<()> {
        let from = self.clone();
        self.slot.executor.submit_after_delay(delay, move |_| {
            from.navigate_if_current(Navigation::To(target))?;
            Ok(())
        })
    }

    /// Navigate to the parent after `delay`, unless this screen stopped being
    /// current in the meantime.
    pub fn wait_then_go_to_parent(&self, delay: Duration) -> TaskResult<()> {
        let from = self.clone();
        self.slot.executor.submit_after_delay(delay, move |_| {
            from.navigate_if_current(Navigation::Parent)?;
            Ok(())
        })
    }

    fn navigate_if_current(&self, navigation: Navigation) -> Result<(), Interrupted> {
        match self.slot.manager.upgrade() {
            Some(manager) => manager.navigate_from(self, navigation),
            None => Ok(()),
        }
    }

    /// Install `tree`. Caller holds the screen locks.
    pub(crate) fn store_ui(&self, tree: UiTree) {
        self.slot.state.lock().ui = Some(tree);
        if self.is_current() {
            self.repaint();
        }
    }

    pub(crate) fn accepts_back(&self) -> bool {
        self.slot
            .state
            .lock()
            .behavior
            .as_ref()
            .is_some_and(|behavior| behavior.accepts_back())
    }

    /// Run `f` against the installed tree. Caller holds the screen locks.
    pub(crate) fn with_ui<R>(&self, f: impl FnOnce(&mut UiTree) -> R) -> Option<R> {
        self.slot.state.lock().ui.as_mut().map(f)
    }

    /// Run a hook with a fresh context and return the navigation it requested.
    /// Caller holds the screen locks.
    pub(crate) fn dispatch<F>(&self, hook: F) -> Option<Navigation>
    where
        F: FnOnce(&mut dyn Screen, &mut ScreenContext<'_>),
    {
        let Some(mut behavior) = self.slot.state.lock().behavior.take() else {
            warn!("Screen `{}` re-entered while a hook was running", self.slot.name);
            return None;
        };
        let mut ctx = ScreenContext {
            handle: self,
            navigation: None,
        };
        hook(&mut *behavior, &mut ctx);
        self.slot.state.lock().behavior = Some(behavior);
        ctx.navigation
    }
}

// ---------------------------------------------------------------------------
// Screen context
// ---------------------------------------------------------------------------

/// What a hook may do to its own screen.
///
/// Navigation requested here is deferred until the hook returns; the last
/// request wins.
///
/// The guards from [`ui`](Self::ui) and [`ui_mut`](Self::ui_mut) lock the
/// screen's state and borrow the context mutably, so the tree can't be
/// replaced through the context while one is held. A cloned
/// [`ScreenHandle`] is not covered: drop the guard before using it.
pub struct ScreenContext<'a> {
    handle: &'a ScreenHandle,
    navigation: Option<Navigation>,
}

impl<'a> ScreenContext<'a> {
    pub fn handle(&self) -> &ScreenHandle {
        self.handle
    }

    pub fn executor(&self) -> &'a TaskExecutor {
        self.handle.executor()
    }

    pub fn is_current(&self) -> bool {
        self.handle.is_current()
    }

    /// Install a new tree. Repaints only if the screen is already current;
    /// during `open` the manager repaints once the screen is published.
    pub fn set_ui(&mut self, tree: UiTree) {
        self.handle.store_ui(tree);
    }

    pub fn ui(&mut self) -> Option<MappedMutexGuard<'_, UiTree>> {
        MutexGuard::try_map(self.handle.slot.state.lock(), |state| state.ui.as_mut()).ok()
    }

    pub fn ui_mut(&mut self) -> Option<MappedMutexGuard<'_, UiTree>> {
        MutexGuard::try_map(self.handle.slot.state.lock(), |state| state.ui.as_mut()).ok()
    }

    pub fn repaint(&self) {
        self.handle.repaint();
    }

    /// A new top-level screen sharing this screen's manager.
    pub fn create_screen(&self, screen: impl Screen) -> ScreenHandle {
        ScreenHandle::create(
            self.handle.slot.manager.clone(),
            &self.handle.slot.registry,
            None,
            Box::new(screen),
        )
    }

    /// A new screen whose parent is this one.
    pub fn create_child(&self, screen: impl Screen) -> ScreenHandle {
        ScreenHandle::create(
            self.handle.slot.manager.clone(),
            &self.handle.slot.registry,
            Some(self.handle.clone()),
            Box::new(screen),
        )
    }

    pub fn set_current_screen(&mut self, target: ScreenHandle) {
        self.navigation = Some(Navigation::To(target));
    }

    pub fn go_to_parent(&mut self) {
        self.navigation = Some(Navigation::Parent);
    }
}
