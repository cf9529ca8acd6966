// src/screens/manager.rs
//! Screen switching, button routing and the render loop.
//!
//! The manager owns the one "current screen" slot. Screen switches, tree
//! replacement and render passes all take the same two locks in the same
//! order (switch lock, then UI lock), so a pass never sees a half-switched
//! screen and a tree is never mutated mid-render.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, error, info, trace, warn};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use thiserror::Error;

use super::repaint::RepaintSignal;
use super::screen::{Navigation, Screen, ScreenHandle};
use crate::canvas::{Canvas, CanvasPool};
use crate::config::{ConfigError, RuntimeConfig};
use crate::display::{DisplayTransport, FrameSink, SendOutcome};
use crate::tasks::{BoxError, CancelToken, ExecutorRegistry, Interrupted, TaskExecutor, TaskResult, lock_interruptibly};
use crate::ui::{Button, ButtonEvent, i18n};

/// Navigations requested from `open` followed in one switch.
const MAX_OPEN_REDIRECTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("the screen runtime is already running")]
    AlreadyStarted,
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

#[derive(Default)]
struct FrameStats {
    rendered: AtomicU64,
    transmitted: AtomicU64,
    unchanged: AtomicU64,
    failed: AtomicU64,
}

impl FrameStats {
    fn record(&self, outcome: SendOutcome) {
        let counter = match outcome {
            SendOutcome::Transmitted => &self.transmitted,
            SendOutcome::Unchanged => &self.unchanged,
            SendOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Both screen locks, switch lock outermost.
pub(crate) struct ScreenLocks<'a> {
    _ui: ReentrantMutexGuard<'a, ()>,
    current: ReentrantMutexGuard<'a, RefCell<Option<ScreenHandle>>>,
}

impl ScreenLocks<'_> {
    fn current(&self) -> Option<ScreenHandle> {
        self.current.borrow().clone()
    }
}

pub(crate) struct ManagerShared {
    config: RuntimeConfig,
    registry: ExecutorRegistry,
    /// Switch lock.
    current: ReentrantMutex<RefCell<Option<ScreenHandle>>>,
    /// Mirrors `current` so "is this screen current" never waits on the lock.
    current_id: AtomicU64,
    ui_lock: ReentrantMutex<()>,
    repaint: Arc<RepaintSignal>,
    pool: Arc<CanvasPool>,
    stats: Arc<FrameStats>,
    started: AtomicBool,
    runtime: Mutex<Vec<TaskExecutor>>,
}

impl ManagerShared {
    pub(crate) fn lock_screens(&self) -> Result<ScreenLocks<'_>, Interrupted> {
        let current = lock_interruptibly(&self.current)?;
        let ui = lock_interruptibly(&self.ui_lock)?;
        Ok(ScreenLocks { _ui: ui, current })
    }

    pub(crate) fn is_current(&self, handle: &ScreenHandle) -> bool {
        self.current_id.load(Ordering::SeqCst) == handle.id()
    }

    pub(crate) fn request_repaint(&self) {
        self.repaint.request();
    }

    fn set_current_screen(&self, next: ScreenHandle) -> Result<(), Interrupted> {
        let locks = self.lock_screens()?;
        self.switch_to(&locks, next);
        Ok(())
    }

    /// Perform `navigation` on behalf of `from`, only if `from` is current.
    pub(crate) fn navigate_from(&self, from: &ScreenHandle, navigation: Navigation) -> Result<(), Interrupted> {
        let locks = self.lock_screens()?;
        if locks.current().as_ref() != Some(from) {
            debug!("Screen `{}` is no longer current; navigation dropped", from.name());
            return Ok(());
        }
        if let Some(target) = navigation.target(from) {
            self.switch_to(&locks, target);
        }
        Ok(())
    }

    fn go_to_parent(&self) -> Result<(), Interrupted> {
        let locks = self.lock_screens()?;
        if let Some(parent) = locks.current().and_then(|current| current.parent().cloned()) {
            self.switch_to(&locks, parent);
        }
        Ok(())
    }

    /// Close the current screen and open `next`, following any navigation
    /// `next.open` requests. Caller holds both locks.
    fn switch_to(&self, locks: &ScreenLocks<'_>, next: ScreenHandle) {
        let mut next = next;
        for _ in 0..=MAX_OPEN_REDIRECTS {
            let old = locks.current();
            if old.as_ref() == Some(&next) {
                return;
            }

            if let Some(old) = &old {
                debug!("Closing screen `{}`", old.name());
                if old.dispatch(|screen, ctx| screen.close(ctx)).is_some() {
                    warn!("Navigation requested while closing `{}` ignored", old.name());
                }
                old.executor().cancel_all_pending();
            }

            debug!("Opening screen `{}`", next.name());
            let requested = next.dispatch(|screen, ctx| screen.open(ctx));
            *locks.current.borrow_mut() = Some(next.clone());
            self.current_id.store(next.id(), Ordering::SeqCst);
            self.repaint.request();

            match requested.and_then(|navigation| navigation.target(&next)) {
                Some(target) => next = target,
                None => return,
            }
        }
        warn!(
            "Screens kept redirecting from `open`; stopped before `{}` after {MAX_OPEN_REDIRECTS} hops",
            next.name()
        );
    }

    fn on_button(&self, button: Button, is_down: bool) -> Result<(), Interrupted> {
        if !is_down {
            return Ok(());
        }

        if self.config.buttons.language == Some(button) {
            let language = i18n::cycle_language(self.config.language_count);
            debug!("Language switched to {language}");
            self.repaint.request();
            return Ok(());
        }

        let locks = self.lock_screens()?;
        let Some(current) = locks.current() else {
            return Ok(());
        };
        if button == self.config.buttons.back && !current.accepts_back() {
            if let Some(parent) = current.parent().cloned() {
                self.switch_to(&locks, parent);
            }
        } else {
            let requested = current.dispatch(|screen, ctx| screen.on_button_down(ctx, button));
            if let Some(target) = requested.and_then(|navigation| navigation.target(&current)) {
                self.switch_to(&locks, target);
            }
        }
        self.repaint.request();
        Ok(())
    }

    /// One render pass into `canvas`. False when there is no current screen.
    fn render_into(&self, canvas: &mut Canvas) -> Result<bool, Interrupted> {
        let locks = self.lock_screens()?;
        let Some(current) = locks.current() else {
            return Ok(false);
        };
        canvas.clear();
        current.with_ui(|tree| tree.measure_and_render(canvas));
        self.stats.rendered.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }
}

impl Drop for ManagerShared {
    fn drop(&mut self) {
        self.registry.shutdown_all();
    }
}

fn render_loop(
    manager: Weak<ManagerShared>,
    repaint: Arc<RepaintSignal>,
    display: TaskExecutor,
    sink: Arc<Mutex<FrameSink>>,
    token: &CancelToken,
) -> Result<(), BoxError> {
    // One frame on the display at a time; requests made while it is being
    // sent collapse into the next pass.
    let mut in_flight: Option<TaskResult<()>> = None;
    loop {
        if let Some(previous) = in_flight.take() {
            let _ = previous.get();
            token.check()?;
        }
        let coalesced = repaint.acquire_all(token)?;
        let Some(shared) = manager.upgrade() else {
            return Ok(());
        };
        trace!("Render pass for {coalesced} repaint request(s)");

        let mut canvas = shared.pool.acquire();
        if !shared.render_into(&mut canvas)? {
            shared.pool.release(canvas);
            continue;
        }
        if let Some(ink) = canvas.ink_bounds() {
            trace!("Ink bounds {ink:?}");
        }

        let pool = shared.pool.clone();
        let stats = shared.stats.clone();
        let sink = sink.clone();
        drop(shared);
        in_flight = Some(display.submit(move |_| {
            let outcome = sink.lock().send(&canvas);
            pool.release(canvas);
            stats.record(outcome);
            Ok(())
        }));
    }
}

/// Owner of the current screen and the render loop.
///
/// Clones share one runtime. Dropping the last clone shuts down every
/// executor the manager created.
#[derive(Clone)]
pub struct ScreenManager {
    shared: Arc<ManagerShared>,
}

impl ScreenManager {
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = ExecutorRegistry::with_shutdown_grace(config.shutdown_grace());
        let pool = CanvasPool::new(config.display.width, config.display.height);
        Ok(Self {
            shared: Arc::new(ManagerShared {
                config,
                registry,
                current: ReentrantMutex::new(RefCell::new(None)),
                current_id: AtomicU64::new(0),
                ui_lock: ReentrantMutex::new(()),
                repaint: Arc::new(RepaintSignal::new()),
                pool: Arc::new(pool),
                stats: Arc::new(FrameStats::default()),
                started: AtomicBool::new(false),
                runtime: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Registry holding every executor this manager and its screens use.
    pub fn registry(&self) -> &ExecutorRegistry {
        &self.shared.registry
    }

    /// Wrap `screen` in a handle. With a parent, the back button (and
    /// `go_to_parent`) returns there.
    pub fn create_screen(&self, parent: Option<&ScreenHandle>, screen: impl Screen) -> ScreenHandle {
        ScreenHandle::create(
            Arc::downgrade(&self.shared),
            &self.shared.registry,
            parent.cloned(),
            Box::new(screen),
        )
    }

    /// Start the render loop and the display hand-off, then open `root`.
    pub fn start(&self, root: ScreenHandle, transport: impl DisplayTransport + 'static) -> Result<(), RuntimeError> {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyStarted);
        }

        let render = TaskExecutor::with_registry(&self.shared.registry, "render");
        let display = TaskExecutor::with_registry(&self.shared.registry, "display");
        let sink = Arc::new(Mutex::new(FrameSink::new(
            Box::new(transport),
            self.shared.config.skip_unchanged_frames,
        )));

        let manager = Arc::downgrade(&self.shared);
        let repaint = self.shared.repaint.clone();
        let loop_display = display.clone();
        render
            .submit(move |token| render_loop(manager, repaint, loop_display, sink, token))
            .on_exception(|err| error!("Render loop stopped: {err}"));
        self.shared.runtime.lock().extend([render, display]);

        info!(
            "Screen runtime started ({}x{})",
            self.shared.config.display.width, self.shared.config.display.height
        );
        self.set_current_screen(root)?;
        Ok(())
    }

    /// Close the current screen (cancelling its pending tasks) and open `next`.
    ///
    /// No-op if `next` is already current.
    pub fn set_current_screen(&self, next: ScreenHandle) -> Result<(), Interrupted> {
        self.shared.set_current_screen(next)
    }

    /// Switch to the current screen's parent. No-op at a root screen.
    pub fn go_to_parent(&self) -> Result<(), Interrupted> {
        self.shared.go_to_parent()
    }

    pub fn current_screen(&self) -> Option<ScreenHandle> {
        lock_interruptibly(&self.shared.current)
            .ok()
            .and_then(|current| current.borrow().clone())
    }

    /// Route a button edge. Releases are ignored; every press repaints.
    pub fn on_button(&self, button: Button, is_down: bool) -> Result<(), Interrupted> {
        self.shared.on_button(button, is_down)
    }

    pub fn on_button_event(&self, event: ButtonEvent) -> Result<(), Interrupted> {
        self.on_button(event.button, event.pressed)
    }

    pub fn request_repaint(&self) {
        self.shared.request_repaint();
    }

    /// Render the current screen into `canvas` without transmitting it.
    pub fn render_into(&self, canvas: &mut Canvas) -> Result<bool, Interrupted> {
        self.shared.render_into(canvas)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.shared.stats.rendered.load(Ordering::Relaxed)
    }

    pub fn frames_transmitted(&self) -> u64 {
        self.shared.stats.transmitted.load(Ordering::Relaxed)
    }

    pub fn frames_skipped(&self) -> u64 {
        self.shared.stats.unchanged.load(Ordering::Relaxed)
    }

    pub fn frames_failed(&self) -> u64 {
        self.shared.stats.failed.load(Ordering::Relaxed)
    }

    /// Cancel all screen work and stop the render loop.
    pub fn shutdown(&self) {
        info!("Screen runtime shutting down");
        self.shared.registry.shutdown_all();
        self.shared.runtime.lock().clear();
    }
}

impl std::fmt::Debug for ScreenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenManager")
            .field("current", &self.current_screen())
            .field("frames_rendered", &self.frames_rendered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MemoryTransport;
    use crate::screens::ScreenContext;
    use crate::ui::UiTree;
    use std::thread;
    use std::time::{Duration, Instant};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Probe {
        label: &'static str,
        log: Log,
        accepts_back: bool,
    }

    impl Probe {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                log: log.clone(),
                accepts_back: false,
            }
        }

        fn accepting_back(mut self) -> Self {
            self.accepts_back = true;
            self
        }
    }

    impl Screen for Probe {
        fn name(&self) -> &str {
            self.label
        }

        fn open(&mut self, ctx: &mut ScreenContext<'_>) {
            self.log.lock().push(format!("open {}", self.label));
            let mut tree = UiTree::new();
            let spacer = tree.add_spacer(4, 4);
            tree.set_root(spacer).unwrap();
            ctx.set_ui(tree);
        }

        fn close(&mut self, _ctx: &mut ScreenContext<'_>) {
            self.log.lock().push(format!("close {}", self.label));
        }

        fn accepts_back(&self) -> bool {
            self.accepts_back
        }

        fn on_button_down(&mut self, _ctx: &mut ScreenContext<'_>, button: Button) {
            self.log.lock().push(format!("{} {:?}", self.label, button));
        }
    }

    struct Navigator {
        log: Log,
    }

    impl Screen for Navigator {
        fn name(&self) -> &str {
            "navigator"
        }

        fn open(&mut self, ctx: &mut ScreenContext<'_>) {
            ctx.set_ui(UiTree::new());
        }

        fn on_button_down(&mut self, ctx: &mut ScreenContext<'_>, button: Button) {
            if button == Button::B {
                let child = ctx.create_child(Probe::new("child", &self.log));
                ctx.set_current_screen(child);
            }
        }
    }

    struct Redirect {
        target: ScreenHandle,
    }

    impl Screen for Redirect {
        fn open(&mut self, ctx: &mut ScreenContext<'_>) {
            ctx.set_current_screen(self.target.clone());
        }
    }

    /// Redirects from `open` to whatever `target` holds at the time.
    struct Bounce {
        label: &'static str,
        target: Arc<Mutex<Option<ScreenHandle>>>,
        log: Log,
    }

    impl Screen for Bounce {
        fn name(&self) -> &str {
            self.label
        }

        fn open(&mut self, ctx: &mut ScreenContext<'_>) {
            self.log.lock().push(format!("open {}", self.label));
            if let Some(target) = self.target.lock().clone() {
                ctx.set_current_screen(target);
            }
        }
    }

    /// Reads its tree on B, then replaces it with a larger one.
    struct Rebuilder {
        sizes: Log,
    }

    impl Screen for Rebuilder {
        fn open(&mut self, ctx: &mut ScreenContext<'_>) {
            ctx.set_ui(UiTree::new());
        }

        fn on_button_down(&mut self, ctx: &mut ScreenContext<'_>, button: Button) {
            if button != Button::B {
                return;
            }
            let len = ctx.ui().map(|tree| tree.len());
            let mut tree = UiTree::new();
            let spacer = tree.add_spacer(2, 2);
            let _ = tree.set_root(spacer);
            ctx.set_ui(tree);
            let has_ui = ctx.handle().has_ui();
            self.sizes.lock().push(format!("{len:?} {has_ui}"));
        }
    }

    fn manager() -> ScreenManager {
        ScreenManager::new(RuntimeConfig::default()).unwrap()
    }

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.display.height = 10;
        assert!(matches!(
            ScreenManager::new(config),
            Err(ConfigError::UnalignedHeight(10))
        ));
    }

    #[test]
    fn test_switch_closes_old_then_opens_new() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let next = manager.create_screen(None, Probe::new("next", &log));

        manager.set_current_screen(root.clone()).unwrap();
        manager.set_current_screen(next.clone()).unwrap();
        manager.set_current_screen(next.clone()).unwrap();

        assert_eq!(*log.lock(), ["open root", "close root", "open next"]);
        assert_eq!(manager.current_screen(), Some(next.clone()));
        assert!(next.is_current());
        assert!(!root.is_current());
    }

    #[test]
    fn test_close_cancels_pending_tasks() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let next = manager.create_screen(None, Probe::new("next", &log));
        manager.set_current_screen(root.clone()).unwrap();

        let running = root.executor().submit(|token| {
            token.sleep(Duration::from_secs(30))?;
            Ok(())
        });
        let queued = root.executor().submit(|_| Ok(()));
        manager.set_current_screen(next).unwrap();

        assert!(running.is_cancelled());
        assert!(queued.is_cancelled());
        assert_eq!(root.executor().pending_count(), 0);
    }

    #[test]
    fn test_back_button_goes_to_parent() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let child = manager.create_screen(Some(&root), Probe::new("child", &log));
        manager.set_current_screen(child.clone()).unwrap();

        manager.on_button(Button::A, true).unwrap();
        assert_eq!(manager.current_screen(), Some(root.clone()));

        // At the root, back has nowhere to go and is not delivered.
        manager.on_button(Button::A, true).unwrap();
        assert_eq!(manager.current_screen(), Some(root));
        assert!(!log.lock().iter().any(|entry| entry.ends_with(" A")));
    }

    #[test]
    fn test_back_delivered_when_accepted() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let child = manager.create_screen(Some(&root), Probe::new("child", &log).accepting_back());
        manager.set_current_screen(child.clone()).unwrap();

        manager.on_button(Button::A, true).unwrap();
        assert_eq!(manager.current_screen(), Some(child));
        assert_eq!(log.lock().last().map(String::as_str), Some("child A"));
    }

    #[test]
    fn test_releases_are_ignored() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.set_current_screen(root).unwrap();
        manager.on_button(Button::B, false).unwrap();
        manager.on_button_event(ButtonEvent::press(Button::B)).unwrap();
        assert_eq!(*log.lock(), ["open root", "root B"]);
    }

    #[test]
    fn test_language_button_is_intercepted() {
        let mut config = RuntimeConfig::default();
        config.language_count = 1;
        let manager = ScreenManager::new(config).unwrap();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.set_current_screen(root).unwrap();
        manager.shared.repaint.acquire_all(&CancelToken::new()).unwrap();

        manager.on_button(Button::C, true).unwrap();
        assert_eq!(*log.lock(), ["open root"]);
        assert_eq!(manager.shared.repaint.pending(), 1);
    }

    #[test]
    fn test_every_press_repaints() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.set_current_screen(root).unwrap();
        manager.shared.repaint.acquire_all(&CancelToken::new()).unwrap();
        manager.on_button(Button::Down, true).unwrap();
        assert_eq!(manager.shared.repaint.pending(), 1);
    }

    #[test]
    fn test_set_ui_repaints_only_when_current() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let other = manager.create_screen(None, Probe::new("other", &log));
        manager.set_current_screen(root.clone()).unwrap();
        manager.shared.repaint.acquire_all(&CancelToken::new()).unwrap();

        other.set_ui(UiTree::new()).unwrap();
        assert!(other.has_ui());
        assert_eq!(manager.shared.repaint.pending(), 0);

        root.set_ui(UiTree::new()).unwrap();
        assert_eq!(manager.shared.repaint.pending(), 1);
    }

    #[test]
    fn test_update_ui_from_task() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.set_current_screen(root.clone()).unwrap();

        let handle = root.clone();
        let result = root.executor().submit(move |_| {
            let len = handle.update_ui(|tree| {
                tree.add_spacer(1, 1);
                tree.len()
            })?;
            Ok(len)
        });
        assert_eq!(result.get().unwrap(), Some(2));
    }

    #[test]
    fn test_delayed_navigation_when_still_current() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let target = manager.create_screen(None, Probe::new("target", &log));
        manager.set_current_screen(root.clone()).unwrap();

        let waiting = root.wait_then_set_current_screen(Duration::from_millis(20), target.clone());
        let _ = waiting.get();
        assert_eq!(manager.current_screen(), Some(target));
        assert_eq!(*log.lock(), ["open root", "close root", "open target"]);
    }

    #[test]
    fn test_delayed_navigation_from_stale_screen_does_nothing() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let stale = manager.create_screen(Some(&root), Probe::new("stale", &log));
        let target = manager.create_screen(None, Probe::new("target", &log));
        manager.set_current_screen(root.clone()).unwrap();

        let waiting = stale.wait_then_set_current_screen(Duration::from_millis(10), target);
        assert!(waiting.get().is_ok());
        assert!(stale.wait_then_go_to_parent(Duration::from_millis(10)).get().is_ok());
        assert_eq!(manager.current_screen(), Some(root));
    }

    #[test]
    fn test_delayed_navigation_cancelled_by_switch() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        let late = manager.create_screen(None, Probe::new("late", &log));
        let pressed = manager.create_screen(None, Probe::new("pressed", &log));
        manager.set_current_screen(root.clone()).unwrap();

        let waiting = root.wait_then_set_current_screen(Duration::from_secs(30), late);
        manager.set_current_screen(pressed.clone()).unwrap();

        assert!(waiting.is_cancelled());
        assert_eq!(manager.current_screen(), Some(pressed));
    }

    #[test]
    fn test_hook_navigation_is_deferred() {
        let manager = manager();
        let log = log();
        let navigator = manager.create_screen(None, Navigator { log: log.clone() });
        manager.set_current_screen(navigator.clone()).unwrap();

        manager.on_button(Button::B, true).unwrap();
        let current = manager.current_screen().unwrap();
        assert_eq!(current.name(), "child");
        assert_eq!(current.parent(), Some(&navigator));

        manager.on_button(Button::A, true).unwrap();
        assert_eq!(manager.current_screen(), Some(navigator));
    }

    #[test]
    fn test_open_can_redirect() {
        let manager = manager();
        let log = log();
        let target = manager.create_screen(None, Probe::new("target", &log));
        let redirect = manager.create_screen(None, Redirect { target: target.clone() });
        manager.set_current_screen(redirect).unwrap();
        assert_eq!(manager.current_screen(), Some(target));
    }

    #[test]
    fn test_open_redirect_loop_is_cut_short() {
        let manager = manager();
        let log = log();
        let to_b = Arc::new(Mutex::new(None));
        let to_a = Arc::new(Mutex::new(None));
        let a = manager.create_screen(None, Bounce { label: "a", target: to_b.clone(), log: log.clone() });
        let b = manager.create_screen(None, Bounce { label: "b", target: to_a.clone(), log: log.clone() });
        *to_b.lock() = Some(b.clone());
        *to_a.lock() = Some(a.clone());

        manager.set_current_screen(a.clone()).unwrap();
        assert_eq!(log.lock().len(), MAX_OPEN_REDIRECTS + 1);
        let current = manager.current_screen().unwrap();
        assert!(current == a || current == b);
    }

    #[test]
    fn test_hook_replaces_tree_after_reading_it() {
        let manager = manager();
        let sizes = log();
        let screen = manager.create_screen(None, Rebuilder { sizes: sizes.clone() });
        manager.set_current_screen(screen.clone()).unwrap();
        manager.on_button(Button::B, true).unwrap();
        manager.on_button(Button::B, true).unwrap();
        assert_eq!(*sizes.lock(), ["Some(0) true", "Some(1) true"]);
        assert_eq!(screen.update_ui(|tree| tree.len()), Ok(Some(1)));
    }

    #[test]
    fn test_render_into_needs_a_screen() {
        let manager = manager();
        let mut canvas = Canvas::new(128, 64);
        assert_eq!(manager.render_into(&mut canvas), Ok(false));

        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.set_current_screen(root).unwrap();
        assert_eq!(manager.render_into(&mut canvas), Ok(true));
        assert_eq!(manager.frames_rendered(), 1);
    }

    #[test]
    fn test_concurrent_switches_never_interleave() {
        let manager = manager();
        let log = log();
        let labels = ["s0", "s1", "s2", "s3"];
        let screens: Vec<_> = labels
            .iter()
            .map(|&label| manager.create_screen(None, Probe::new(label, &log)))
            .collect();

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let manager = manager.clone();
                let screens = screens.clone();
                thread::spawn(move || {
                    for round in 0..25 {
                        let next = screens[(worker + round) % screens.len()].clone();
                        manager.set_current_screen(next).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut open: Option<String> = None;
        for entry in log.lock().iter() {
            let (event, label) = entry.split_once(' ').unwrap();
            match event {
                "open" => {
                    assert!(open.is_none(), "{label} opened while {open:?} still open");
                    open = Some(label.to_string());
                }
                "close" => {
                    assert_eq!(open.as_deref(), Some(label));
                    open = None;
                }
                other => panic!("unexpected entry {other}"),
            }
        }
        let current = manager.current_screen().unwrap();
        assert_eq!(open.as_deref(), Some(current.name()));
    }

    #[test]
    fn test_start_twice_fails() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.start(root.clone(), MemoryTransport::new()).unwrap();
        assert_eq!(
            manager.start(root, MemoryTransport::new()),
            Err(RuntimeError::AlreadyStarted)
        );
        manager.shutdown();
    }

    #[test]
    fn test_render_loop_transmits_frames() {
        let manager = manager();
        let log = log();
        let transport = MemoryTransport::new();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.start(root, transport.clone()).unwrap();

        assert!(wait_until(|| transport.frame_count() >= 1));
        let frame = transport.last_frame().unwrap();
        assert_eq!(frame.len(), manager.config().display.frame_len());
        manager.shutdown();
        assert!(manager.registry().is_shut_down());
    }

    #[test]
    fn test_requests_during_a_pass_coalesce() {
        let manager = manager();
        let log = log();
        let transport = MemoryTransport::new();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.start(root, transport.clone()).unwrap();
        assert!(wait_until(|| manager.frames_rendered() >= 1));
        thread::sleep(Duration::from_millis(100));
        let base = manager.frames_rendered();

        // Hold the screen locks so the next pass stalls mid-flight.
        let locks = manager.shared.lock_screens().unwrap();
        manager.request_repaint();
        assert!(wait_until(|| manager.shared.repaint.pending() == 0));
        for _ in 0..5 {
            manager.request_repaint();
        }
        drop(locks);

        assert!(wait_until(|| manager.frames_rendered() == base + 2));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(manager.frames_rendered(), base + 2);
        assert!(wait_until(|| manager.frames_transmitted() == base + 2));
        manager.shutdown();
    }

    struct SlowTransport {
        delay: Duration,
        sent: Arc<AtomicU64>,
    }

    impl DisplayTransport for SlowTransport {
        fn transmit(&mut self, _frame: &[u8]) -> std::io::Result<()> {
            thread::sleep(self.delay);
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_slow_display_does_not_build_a_backlog() {
        let manager = manager();
        let log = log();
        let sent = Arc::new(AtomicU64::new(0));
        let transport = SlowTransport {
            delay: Duration::from_millis(50),
            sent: sent.clone(),
        };
        let root = manager.create_screen(None, Probe::new("root", &log));
        let started = Instant::now();
        manager.start(root, transport).unwrap();

        for _ in 0..40 {
            manager.on_button(Button::Down, true).unwrap();
            assert!(manager.frames_rendered() <= manager.frames_transmitted() + 2);
            thread::sleep(Duration::from_millis(5));
        }

        // The display catches up within a couple of transmissions.
        assert!(wait_until(|| manager.frames_transmitted() == manager.frames_rendered()));
        let rendered = manager.frames_rendered();
        // Every pass waits out a full transmission before the next one.
        let bound = started.elapsed().as_millis() as u64 / 50 + 1;
        assert!(rendered <= bound, "{rendered} passes, at most {bound} expected");
        assert_eq!(sent.load(Ordering::SeqCst), manager.frames_transmitted());
        thread::sleep(Duration::from_millis(150));
        assert_eq!(manager.frames_rendered(), rendered);
        manager.shutdown();
    }

    #[test]
    fn test_shutdown_stops_screen_work() {
        let manager = manager();
        let log = log();
        let root = manager.create_screen(None, Probe::new("root", &log));
        manager.start(root.clone(), MemoryTransport::new()).unwrap();
        let sleeping = root.executor().submit(|token| {
            token.sleep(Duration::from_secs(30))?;
            Ok(())
        });

        manager.shutdown();
        assert!(sleeping.is_cancelled());
        assert!(root.executor().is_shut_down());
        assert!(matches!(
            root.executor().submit(|_| Ok(())).get(),
            Err(crate::tasks::TaskError::Rejected(_))
        ));
    }
}
