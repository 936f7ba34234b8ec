//! Desktop - the window manager, taskbar and app host wired together.
//!
//! Every operation runs against the window manager, then the notifications it
//! queued are dispatched in order: taskbar first, then the app host, then any
//! registered lifecycle hooks. Dispatched events are kept for the owner to
//! collect with `take_events`.

use shared_types::{
    ContentHandle, DesktopSnapshot, NotificationLevel, PanelKind, Viewport, WindowEntity,
    WindowEvent,
};

use crate::apps::{AppHost, AppId, ContentInit};
use crate::config::DesktopConfig;
use crate::error::{AppError, DesktopError};
use crate::taskbar::{ContextAction, TaskbarController};
use crate::window_manager::{
    InteractionKind, MountContainer, PointerPhase, PointerSample, PointerSource, WindowManager,
    WindowOptions,
};

/// Hooks an embedding can register to observe window lifecycle
pub trait WindowLifecycle: Send {
    fn on_window_focus(&mut self, window_id: &str) {
        let _ = window_id;
    }

    fn on_window_close(&mut self, window_id: &str) {
        let _ = window_id;
    }

    /// Every notification, including the two above
    fn on_event(&mut self, event: &WindowEvent) {
        let _ = event;
    }
}

/// Result of asking for an app
#[derive(Debug, Clone, PartialEq)]
pub enum AppLaunch {
    /// A new window was created; its content init is pending
    Created(WindowEntity),
    /// The app already had a window, which was brought forward
    Existing(String),
    /// The app is not registered
    Unavailable,
}

pub struct Desktop {
    wm: WindowManager,
    taskbar: TaskbarController,
    apps: AppHost,
    hooks: Vec<Box<dyn WindowLifecycle>>,
    dispatched: Vec<WindowEvent>,
}

impl std::fmt::Debug for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desktop")
            .field("wm", &self.wm)
            .field("taskbar", &self.taskbar)
            .field("apps", &self.apps)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl Desktop {
    pub fn new(
        config: &DesktopConfig,
        container: Box<dyn MountContainer>,
        apps: AppHost,
    ) -> Result<Self, DesktopError> {
        let wm = WindowManager::new(config, container)?;
        Ok(Self {
            wm,
            taskbar: TaskbarController::new(&config.quick_launch),
            apps,
            hooks: Vec::new(),
            dispatched: Vec::new(),
        })
    }

    pub fn window_manager(&self) -> &WindowManager {
        &self.wm
    }

    pub fn taskbar(&self) -> &TaskbarController {
        &self.taskbar
    }

    pub fn apps(&self) -> &AppHost {
        &self.apps
    }

    pub fn subscribe(&mut self, hook: Box<dyn WindowLifecycle>) {
        self.hooks.push(hook);
    }

    /// Events dispatched since the last call
    pub fn take_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.dispatched)
    }

    // ========================================================================
    // Applications
    // ========================================================================

    /// Bring up `app_id`: an existing window of the app is restored or
    /// focused; otherwise a new window is created and its content init
    /// returned for the caller to run.
    pub fn open_app(&mut self, app_id: AppId) -> (AppLaunch, Option<ContentInit>) {
        let existing = self
            .wm
            .find_by_app(app_id.as_ref())
            .map(|w| (w.id.clone(), w.is_minimized()));
        if let Some((window_id, minimized)) = existing {
            tracing::debug!(app_id = %app_id, window_id = %window_id, "App already open");
            if minimized {
                self.wm.restore_window(&window_id);
            } else {
                self.wm.focus_window(&window_id);
            }
            self.dispatch();
            return (AppLaunch::Existing(window_id), None);
        }

        let viewport = self.wm.viewport();
        let Some(options) = self.apps.window_options(app_id, viewport) else {
            tracing::warn!(app_id = %app_id, "App is not registered");
            self.notify_launch_failed();
            return (AppLaunch::Unavailable, None);
        };
        let name = self
            .apps
            .manifest(app_id)
            .map_or_else(|| options.title.clone(), |manifest| manifest.name.clone());

        let window = self.wm.create_window(options);
        self.taskbar.hide_panel(PanelKind::StartMenu);
        let init = self
            .apps
            .start_init(app_id, window.content.clone(), viewport);
        self.dispatch();

        tracing::info!(app_id = %app_id, window_id = %window.id, "App launched");
        self.taskbar.notify(
            name.as_str(),
            format!("{name} has been summoned from ethereal realm."),
            NotificationLevel::Success,
        );
        (AppLaunch::Created(window), init)
    }

    /// `open_app` for an app named by string
    pub fn open_app_named(
        &mut self,
        name: &str,
    ) -> Result<(AppLaunch, Option<ContentInit>), DesktopError> {
        let Ok(app_id) = name.parse::<AppId>() else {
            tracing::warn!(app = name, "Unknown app requested");
            self.notify_launch_failed();
            return Err(DesktopError::UnknownApp(name.to_string()));
        };
        Ok(self.open_app(app_id))
    }

    fn notify_launch_failed(&mut self) {
        self.taskbar.notify(
            "Error",
            "The ancient magic failed to summon this application.",
            NotificationLevel::Error,
        );
    }

    /// Deliver a finished content init. Returns whether content was written.
    pub fn content_ready(
        &mut self,
        handle: &ContentHandle,
        result: Result<String, AppError>,
    ) -> bool {
        let Some(content) = self.apps.complete_init(handle, result) else {
            return false;
        };
        let written = self.wm.write_content(handle, &content);
        if !written {
            tracing::debug!(window_id = %handle.window_id, "Content region gone; discarding");
        }
        self.dispatch();
        written
    }

    // ========================================================================
    // Window Operations
    // ========================================================================

    pub fn create_window(&mut self, options: WindowOptions) -> WindowEntity {
        let window = self.wm.create_window(options);
        self.dispatch();
        window
    }

    pub fn focus_window(&mut self, window_id: &str) {
        self.wm.focus_window(window_id);
        self.dispatch();
    }

    pub fn minimize_window(&mut self, window_id: &str) {
        self.wm.minimize_window(window_id);
        self.dispatch();
    }

    pub fn maximize_window(&mut self, window_id: &str) {
        self.wm.maximize_window(window_id);
        self.dispatch();
    }

    pub fn restore_from_maximize(&mut self, window_id: &str) {
        self.wm.restore_from_maximize(window_id);
        self.dispatch();
    }

    pub fn restore_window(&mut self, window_id: &str) {
        self.wm.restore_window(window_id);
        self.dispatch();
    }

    pub fn begin_close(&mut self, window_id: &str) -> Option<u64> {
        let generation = self.wm.begin_close(window_id);
        self.dispatch();
        generation
    }

    pub fn finish_close(&mut self, window_id: &str, generation: u64) -> bool {
        let closed = self.wm.finish_close(window_id, generation);
        self.dispatch();
        closed
    }

    /// Close without a transition
    pub fn close_window(&mut self, window_id: &str) {
        self.wm.close_window(window_id);
        self.dispatch();
    }

    pub fn begin_close_all(&mut self) -> Vec<(String, u64)> {
        let closing = self.wm.begin_close_all();
        self.dispatch();
        closing
    }

    pub fn close_all_windows(&mut self) {
        self.wm.close_all_windows();
        self.dispatch();
    }

    pub fn minimize_all_windows(&mut self) {
        self.wm.minimize_all_windows();
        self.dispatch();
    }

    pub fn switch_window(&mut self) {
        self.wm.switch_window();
        self.dispatch();
    }

    pub fn handle_pointer(
        &mut self,
        phase: PointerPhase,
        sample: PointerSample,
        target: Option<(&str, InteractionKind)>,
    ) {
        self.wm.handle_pointer(phase, sample, target);
        self.dispatch();
    }

    pub fn begin_drag(&mut self, window_id: &str, sample: PointerSample) {
        self.wm.begin_drag(window_id, sample);
        self.dispatch();
    }

    pub fn begin_resize(&mut self, window_id: &str, sample: PointerSample) {
        self.wm.begin_resize(window_id, sample);
        self.dispatch();
    }

    pub fn pointer_move(&mut self, sample: PointerSample) {
        self.wm.pointer_move(sample);
    }

    pub fn pointer_up(&mut self, source: PointerSource) {
        self.wm.pointer_up(source);
        self.dispatch();
    }

    pub fn pointer_cancel(&mut self, source: PointerSource) {
        self.wm.pointer_cancel(source);
        self.dispatch();
    }

    pub fn handle_viewport_resize(&mut self, viewport: Viewport) {
        self.wm.handle_viewport_resize(viewport);
        self.dispatch();
    }

    // ========================================================================
    // Taskbar
    // ========================================================================

    pub fn taskbar_click(&mut self, window_id: &str) {
        self.taskbar.click(window_id, &mut self.wm);
        self.dispatch();
    }

    pub fn context_menu(&self, window_id: &str) -> Vec<ContextAction> {
        self.taskbar.context_menu(window_id, &self.wm)
    }

    /// Apply a context-menu choice. Close starts the closing transition and
    /// returns its generation.
    pub fn apply_context_action(&mut self, action: ContextAction, window_id: &str) -> Option<u64> {
        let generation = match action {
            ContextAction::Close => self.wm.begin_close(window_id),
            _ => {
                self.taskbar.apply(action, window_id, &mut self.wm);
                None
            }
        };
        self.dispatch();
        generation
    }

    pub fn toggle_panel(&mut self, panel: PanelKind) {
        self.taskbar.toggle_panel(panel);
    }

    pub fn show_panel(&mut self, panel: PanelKind) {
        self.taskbar.show_panel(panel);
    }

    pub fn hide_panel(&mut self, panel: PanelKind) {
        self.taskbar.hide_panel(panel);
    }

    pub fn hide_all_panels(&mut self) {
        self.taskbar.hide_all_panels();
    }

    pub fn escape(&mut self) {
        self.taskbar.escape();
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.taskbar.set_notifications_enabled(enabled);
    }

    pub fn clear_notifications(&mut self) {
        self.taskbar.clear_notifications();
    }

    pub fn add_quick_launch(&mut self, app_id: AppId) {
        self.taskbar.add_quick_launch(app_id);
    }

    pub fn remove_quick_launch(&mut self, app_id: AppId) {
        self.taskbar.remove_quick_launch(app_id);
    }

    // ========================================================================
    // Whole Desktop
    // ========================================================================

    /// Close everything closable at once and hide all panels
    pub fn shutdown(&mut self) {
        tracing::info!(windows = self.wm.window_count(), "Desktop shutting down");
        self.wm.close_all_windows();
        self.taskbar.hide_all_panels();
        self.dispatch();
    }

    pub fn snapshot(&self) -> DesktopSnapshot {
        DesktopSnapshot {
            windows: self.wm.get_all_windows(),
            active_window: self.wm.active_window().map(ToString::to_string),
            indicators: self.taskbar.indicators().to_vec(),
            panels: self.taskbar.panels(),
            notifications: self.taskbar.notifications().cloned().collect(),
            notifications_enabled: self.taskbar.notifications_enabled(),
            quick_launch: self
                .taskbar
                .quick_launch()
                .iter()
                .map(|id| id.to_string())
                .collect(),
            viewport: self.wm.viewport(),
        }
    }

    fn dispatch(&mut self) {
        for event in self.wm.drain_events() {
            self.taskbar.on_event(&event, &self.wm, &self.apps);
            self.apps.on_event(&event);

            for hook in &mut self.hooks {
                match &event {
                    WindowEvent::Focused { window_id } => hook.on_window_focus(window_id),
                    WindowEvent::Closed { window_id } => hook.on_window_close(window_id),
                    _ => {}
                }
                hook.on_event(&event);
            }

            self.dispatched.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window_manager::MemoryContainer;
    use shared_types::IndicatorStatus;
    use std::sync::{Arc, Mutex};

    fn desktop() -> Desktop {
        Desktop::new(
            &DesktopConfig::immediate(),
            Box::new(MemoryContainer::new()),
            AppHost::with_builtin(),
        )
        .unwrap()
    }

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl WindowLifecycle for Recorder {
        fn on_window_focus(&mut self, window_id: &str) {
            self.calls.lock().unwrap().push(format!("focus:{window_id}"));
        }

        fn on_window_close(&mut self, window_id: &str) {
            self.calls.lock().unwrap().push(format!("close:{window_id}"));
        }
    }

    fn created(launch: AppLaunch) -> WindowEntity {
        match launch {
            AppLaunch::Created(window) => window,
            other => panic!("expected a new window, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_open_redirects_to_existing() {
        let mut desktop = desktop();
        let (launch, init) = desktop.open_app(AppId::OuijaGpt);
        let window = created(launch);
        assert!(init.is_some());

        desktop.open_app(AppId::Timber);
        let (again, init) = desktop.open_app(AppId::OuijaGpt);

        assert_eq!(again, AppLaunch::Existing(window.id.clone()));
        assert!(init.is_none());
        assert_eq!(desktop.window_manager().window_count(), 2);
        assert_eq!(desktop.window_manager().active_window(), Some(window.id.as_str()));
    }

    #[test]
    fn test_open_restores_minimized_app_window() {
        let mut desktop = desktop();
        let window = created(desktop.open_app(AppId::Abacus).0);
        desktop.minimize_window(&window.id);

        desktop.open_app(AppId::Abacus);
        let w = desktop.window_manager().get_window(&window.id).unwrap();
        assert!(!w.is_minimized());
        assert_eq!(desktop.window_manager().active_window(), Some(window.id.as_str()));
    }

    #[test]
    fn test_open_unregistered_or_unknown_app() {
        let mut desktop = Desktop::new(
            &DesktopConfig::immediate(),
            Box::new(MemoryContainer::new()),
            AppHost::new(),
        )
        .unwrap();
        let (launch, init) = desktop.open_app(AppId::Timber);
        assert_eq!(launch, AppLaunch::Unavailable);
        assert!(init.is_none());

        let err = desktop.open_app_named("minesweeper").unwrap_err();
        assert_eq!(err, DesktopError::UnknownApp("minesweeper".to_string()));
        assert_eq!(desktop.window_manager().window_count(), 0);
    }

    #[test]
    fn test_launches_are_announced() {
        let mut desktop = desktop();
        desktop.open_app(AppId::Timber);
        desktop.open_app(AppId::Timber);
        let _ = desktop.open_app_named("minesweeper");

        let snapshot = desktop.snapshot();
        let feed: Vec<_> = snapshot
            .notifications
            .iter()
            .map(|n| (n.title.as_str(), n.level))
            .collect();
        assert_eq!(
            feed,
            vec![
                ("Timber", NotificationLevel::Success),
                ("Error", NotificationLevel::Error),
            ]
        );
        assert_eq!(
            snapshot.notifications[0].message,
            "Timber has been summoned from ethereal realm."
        );

        desktop.set_notifications_enabled(false);
        desktop.open_app(AppId::Abacus);
        let snapshot = desktop.snapshot();
        assert!(!snapshot.notifications_enabled);
        assert_eq!(snapshot.notifications.len(), 3);
    }

    #[test]
    fn test_escape_leaves_tray_panels_open() {
        let mut desktop = desktop();
        desktop.show_panel(PanelKind::StartMenu);
        desktop.show_panel(PanelKind::Notifications);

        desktop.escape();
        let panels = desktop.taskbar().panels();
        assert!(!panels.start_menu);
        assert!(panels.notifications);
    }

    #[test]
    fn test_open_hides_start_menu() {
        let mut desktop = desktop();
        desktop.toggle_panel(PanelKind::StartMenu);
        desktop.show_panel(PanelKind::Network);

        desktop.open_app_named("scrolldit").unwrap();
        let panels = desktop.taskbar().panels();
        assert!(!panels.start_menu);
        assert!(panels.network);
    }

    #[test]
    fn test_content_ready_writes_current_window_only() {
        let mut desktop = desktop();
        let window = created(desktop.open_app(AppId::Laudify).0);

        assert!(desktop.content_ready(&window.content, Ok("<p>songs</p>".to_string())));
        assert_eq!(
            desktop.window_manager().read_content(&window.id).as_deref(),
            Some("<p>songs</p>")
        );
        assert!(desktop
            .take_events()
            .contains(&WindowEvent::ContentMounted {
                window_id: window.id.clone()
            }));

        // A result that arrives after the window closed is dropped
        let other = created(desktop.open_app(AppId::Timber).0);
        desktop.close_window(&other.id);
        assert!(!desktop.content_ready(&other.content, Ok("late".to_string())));
    }

    #[test]
    fn test_failed_init_keeps_placeholder() {
        let mut desktop = desktop();
        let window = created(desktop.open_app(AppId::Wraiths).0);
        let written = desktop.content_ready(
            &window.content,
            Err(AppError::InitFailed("spirits unavailable".to_string())),
        );
        assert!(!written);
        assert_eq!(
            desktop.window_manager().read_content(&window.id).as_deref(),
            Some(crate::apps::LOADING_CONTENT)
        );
    }

    #[test]
    fn test_hooks_receive_focus_and_close() {
        let mut desktop = desktop();
        let recorder = Recorder::default();
        desktop.subscribe(Box::new(recorder.clone()));

        let a = created(desktop.open_app(AppId::Timber).0);
        let b = created(desktop.open_app(AppId::Abacus).0);
        desktop.close_window(&b.id);

        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                format!("focus:{}", a.id),
                format!("focus:{}", b.id),
                format!("close:{}", b.id),
                format!("focus:{}", a.id),
            ]
        );
    }

    #[test]
    fn test_context_close_runs_transition() {
        let mut desktop = desktop();
        let window = created(desktop.open_app(AppId::Timber).0);

        let generation = desktop
            .apply_context_action(ContextAction::Close, &window.id)
            .unwrap();
        assert!(desktop.window_manager().get_window(&window.id).unwrap().closing);
        assert!(desktop.taskbar().indicator(&window.id).is_some());

        assert!(desktop.finish_close(&window.id, generation));
        assert!(desktop.taskbar().indicator(&window.id).is_none());
        assert!(!desktop.apps().has_pending_init(&window.id));
    }

    #[test]
    fn test_taskbar_click_and_snapshot() {
        let mut desktop = desktop();
        let a = created(desktop.open_app(AppId::Timber).0);
        let b = created(desktop.open_app(AppId::Laudify).0);
        desktop.minimize_window(&a.id);

        desktop.taskbar_click(&a.id);
        let snapshot = desktop.snapshot();
        assert_eq!(snapshot.active_window.as_deref(), Some(a.id.as_str()));
        assert_eq!(snapshot.windows.last().unwrap().id, a.id);
        assert_eq!(snapshot.quick_launch, vec!["scrolldit", "ouijagpt"]);

        let status = |id: &str| {
            snapshot
                .indicators
                .iter()
                .find(|i| i.window_id == id)
                .unwrap()
                .status
        };
        assert_eq!(status(&a.id), IndicatorStatus::Active);
        assert_eq!(status(&b.id), IndicatorStatus::Normal);
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let mut desktop = desktop();
        desktop.open_app(AppId::Timber);
        desktop.open_app(AppId::Abacus);
        desktop.toggle_panel(PanelKind::Notifications);

        desktop.shutdown();
        assert_eq!(desktop.window_manager().window_count(), 0);
        assert!(desktop.taskbar().indicators().is_empty());
        assert_eq!(desktop.taskbar().panels(), Default::default());
        assert_eq!(desktop.window_manager().active_window(), None);
    }
}
