//! TaskbarController - indicators, context menus, panels, notifications and
//! quick launch.
//!
//! The taskbar holds no window state of its own. Indicator status is
//! re-derived from the window manager on every lifecycle notification, and
//! every action is forwarded to the window manager.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use shared_types::{
    IndicatorStatus, Notification, NotificationLevel, PanelKind, PanelState, TaskbarIndicator,
    WindowEntity, WindowEvent,
};

use crate::apps::{AppHost, AppId, GENERIC_ICON};
use crate::window_manager::WindowManager;

/// Entry of an indicator's context menu
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextAction {
    Restore,
    Minimize,
    Maximize,
    RestoreDown,
    Close,
}

impl ContextAction {
    pub fn label(&self) -> &'static str {
        match self {
            ContextAction::Restore => "Restore",
            ContextAction::Minimize => "Minimize",
            ContextAction::Maximize => "Maximize",
            ContextAction::RestoreDown => "Restore Down",
            ContextAction::Close => "Close",
        }
    }
}

/// Notifications kept in the tray; older ones are dropped
const NOTIFICATION_HISTORY: usize = 50;

#[derive(Debug)]
pub struct TaskbarController {
    indicators: Vec<TaskbarIndicator>,
    panels: PanelState,
    notifications: VecDeque<Notification>,
    notifications_enabled: bool,
    quick_launch: Vec<AppId>,
}

impl TaskbarController {
    pub fn new(quick_launch: &[AppId]) -> Self {
        let mut taskbar = Self {
            indicators: Vec::new(),
            panels: PanelState::default(),
            notifications: VecDeque::new(),
            notifications_enabled: true,
            quick_launch: Vec::new(),
        };
        for app_id in quick_launch {
            taskbar.add_quick_launch(*app_id);
        }
        taskbar
    }

    // ========================================================================
    // Indicators
    // ========================================================================

    /// Mirror a lifecycle notification
    pub fn on_event(&mut self, event: &WindowEvent, wm: &WindowManager, apps: &AppHost) {
        match event {
            WindowEvent::Opened { window } => {
                if self.indicator(&window.id).is_none() {
                    self.indicators.push(new_indicator(window, apps));
                }
            }
            WindowEvent::Closed { window_id } => {
                self.indicators.retain(|i| &i.window_id != window_id);
            }
            _ => {}
        }
        self.sync(wm);
    }

    /// Re-derive every indicator's status from the window manager
    pub fn sync(&mut self, wm: &WindowManager) {
        let active = wm.active_window();
        for indicator in &mut self.indicators {
            if let Some(window) = wm.get_window(&indicator.window_id) {
                indicator.status = indicator_status(window, active);
            }
        }
    }

    pub fn indicators(&self) -> &[TaskbarIndicator] {
        &self.indicators
    }

    pub fn indicator(&self, window_id: &str) -> Option<&TaskbarIndicator> {
        self.indicators.iter().find(|i| i.window_id == window_id)
    }

    /// Minimized windows are restored, everything else is focused
    pub fn click(&self, window_id: &str, wm: &mut WindowManager) {
        match wm.get_window(window_id) {
            Some(window) if window.is_minimized() => wm.restore_window(window_id),
            Some(_) => wm.focus_window(window_id),
            None => tracing::debug!(window_id, "Taskbar click on unknown window"),
        }
    }

    pub fn context_menu(&self, window_id: &str, wm: &WindowManager) -> Vec<ContextAction> {
        let Some(window) = wm.get_window(window_id) else {
            return Vec::new();
        };

        let mut actions = Vec::with_capacity(3);
        if window.is_minimized() {
            actions.push(ContextAction::Restore);
        } else if window.flags.minimizable {
            actions.push(ContextAction::Minimize);
        }
        if window.flags.maximizable {
            actions.push(if window.is_maximized() {
                ContextAction::RestoreDown
            } else {
                ContextAction::Maximize
            });
        }
        actions.push(ContextAction::Close);
        actions
    }

    /// Carry out a context-menu choice. Close here is immediate; the desktop
    /// shell runs it through the closing transition instead.
    pub fn apply(&self, action: ContextAction, window_id: &str, wm: &mut WindowManager) {
        tracing::debug!(window_id, action = action.label(), "Taskbar context action");
        match action {
            ContextAction::Restore => wm.restore_window(window_id),
            ContextAction::Minimize => wm.minimize_window(window_id),
            ContextAction::Maximize => {
                if !wm.get_window(window_id).is_some_and(|w| w.is_maximized()) {
                    wm.maximize_window(window_id);
                }
            }
            ContextAction::RestoreDown => wm.restore_from_maximize(window_id),
            ContextAction::Close => wm.close_window(window_id),
        }
    }

    // ========================================================================
    // Panels
    // ========================================================================

    pub fn panels(&self) -> PanelState {
        self.panels
    }

    pub fn is_open(&self, panel: PanelKind) -> bool {
        *self.panel_flag(panel)
    }

    pub fn toggle_panel(&mut self, panel: PanelKind) {
        let flag = self.panel_flag_mut(panel);
        *flag = !*flag;
    }

    pub fn show_panel(&mut self, panel: PanelKind) {
        *self.panel_flag_mut(panel) = true;
    }

    pub fn hide_panel(&mut self, panel: PanelKind) {
        *self.panel_flag_mut(panel) = false;
    }

    /// Close every panel (click outside the panels)
    pub fn hide_all_panels(&mut self) {
        self.panels = PanelState::default();
    }

    /// Escape only dismisses the start menu
    pub fn escape(&mut self) {
        self.panels.start_menu = false;
    }

    fn panel_flag(&self, panel: PanelKind) -> &bool {
        match panel {
            PanelKind::StartMenu => &self.panels.start_menu,
            PanelKind::Notifications => &self.panels.notifications,
            PanelKind::Network => &self.panels.network,
        }
    }

    fn panel_flag_mut(&mut self, panel: PanelKind) -> &mut bool {
        match panel {
            PanelKind::StartMenu => &mut self.panels.start_menu,
            PanelKind::Notifications => &mut self.panels.notifications,
            PanelKind::Network => &mut self.panels.network,
        }
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Record a notification. Returns false when notifications are off.
    pub fn notify(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        level: NotificationLevel,
    ) -> bool {
        if !self.notifications_enabled {
            return false;
        }
        let notification = Notification {
            title: title.into(),
            message: message.into(),
            level,
            timestamp: chrono::Utc::now(),
        };
        tracing::debug!(title = %notification.title, level = ?level, "Notification");

        if self.notifications.len() == NOTIFICATION_HISTORY {
            self.notifications.pop_front();
        }
        self.notifications.push_back(notification);
        true
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// Turn the feed on or off. The change itself is announced, the
    /// disable notice being the last one recorded.
    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        if enabled {
            self.notifications_enabled = true;
            self.notify(
                "Notifications",
                "Notifications have been enabled. You will receive alerts from the ethereal realm.",
                NotificationLevel::Success,
            );
        } else {
            self.notify(
                "Notifications",
                "Notifications shall not pass. You will no longer receive alerts from the ethereal realm.",
                NotificationLevel::Warning,
            );
            self.notifications_enabled = false;
        }
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    // ========================================================================
    // Quick Launch
    // ========================================================================

    pub fn quick_launch(&self) -> &[AppId] {
        &self.quick_launch
    }

    pub fn add_quick_launch(&mut self, app_id: AppId) {
        if !self.quick_launch.contains(&app_id) {
            self.quick_launch.push(app_id);
        }
    }

    pub fn remove_quick_launch(&mut self, app_id: AppId) {
        self.quick_launch.retain(|id| *id != app_id);
    }
}

fn new_indicator(window: &WindowEntity, apps: &AppHost) -> TaskbarIndicator {
    let manifest = window
        .app_id
        .as_deref()
        .and_then(|id| id.parse::<AppId>().ok())
        .and_then(|id| apps.manifest(id));

    let (name, icon) = match manifest {
        Some(m) => (m.name.clone(), m.icon.clone()),
        None => (window.title.clone(), GENERIC_ICON.to_string()),
    };

    TaskbarIndicator {
        window_id: window.id.clone(),
        name,
        icon,
        status: IndicatorStatus::Normal,
    }
}

fn indicator_status(window: &WindowEntity, active: Option<&str>) -> IndicatorStatus {
    if active == Some(window.id.as_str()) {
        IndicatorStatus::Active
    } else if window.is_minimized() {
        IndicatorStatus::Minimized
    } else if window.is_maximized() {
        IndicatorStatus::Maximized
    } else {
        IndicatorStatus::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DesktopConfig;
    use crate::window_manager::{MemoryContainer, WindowOptions};

    struct Fixture {
        wm: WindowManager,
        apps: AppHost,
        taskbar: TaskbarController,
    }

    impl Fixture {
        fn new() -> Self {
            let config = DesktopConfig::immediate();
            Self {
                wm: WindowManager::new(&config, Box::new(MemoryContainer::new())).unwrap(),
                apps: AppHost::with_builtin(),
                taskbar: TaskbarController::new(&config.quick_launch),
            }
        }

        fn flush(&mut self) {
            for event in self.wm.drain_events() {
                self.taskbar.on_event(&event, &self.wm, &self.apps);
            }
        }

        fn open(&mut self, id: &str) {
            self.wm
                .create_window(WindowOptions::new(id, id).size(400, 300).position(0, 0));
            self.flush();
        }

        fn status(&self, id: &str) -> IndicatorStatus {
            self.taskbar.indicator(id).unwrap().status
        }
    }

    #[test]
    fn test_indicators_follow_lifecycle() {
        let mut f = Fixture::new();
        f.open("a");
        f.open("b");
        assert_eq!(f.taskbar.indicators().len(), 2);
        assert_eq!(f.status("b"), IndicatorStatus::Active);
        assert_eq!(f.status("a"), IndicatorStatus::Normal);

        f.wm.minimize_window("b");
        f.flush();
        assert_eq!(f.status("b"), IndicatorStatus::Minimized);
        assert_eq!(f.status("a"), IndicatorStatus::Active);

        f.wm.maximize_window("a");
        f.wm.create_window(WindowOptions::new("c", "c").position(0, 0));
        f.flush();
        assert_eq!(f.status("a"), IndicatorStatus::Maximized);

        f.wm.close_window("a");
        f.flush();
        assert!(f.taskbar.indicator("a").is_none());
        assert_eq!(f.taskbar.indicators().len(), 2);
    }

    #[test]
    fn test_indicator_metadata_from_manifest() {
        let mut f = Fixture::new();
        f.wm.create_window(
            WindowOptions::new("window-laudify-1", "Laudify - Mystical Music Player")
                .app("laudify")
                .position(0, 0),
        );
        f.open("plain");

        let app = f.taskbar.indicator("window-laudify-1").unwrap();
        assert_eq!((app.name.as_str(), app.icon.as_str()), ("Laudify", "laudify-icon"));
        let plain = f.taskbar.indicator("plain").unwrap();
        assert_eq!((plain.name.as_str(), plain.icon.as_str()), ("plain", GENERIC_ICON));
    }

    #[test]
    fn test_click_restores_or_focuses() {
        let mut f = Fixture::new();
        f.open("a");
        f.open("b");

        f.taskbar.click("a", &mut f.wm);
        assert_eq!(f.wm.active_window(), Some("a"));

        f.wm.minimize_window("a");
        f.taskbar.click("a", &mut f.wm);
        assert!(!f.wm.get_window("a").unwrap().is_minimized());
        assert_eq!(f.wm.active_window(), Some("a"));

        f.taskbar.click("ghost", &mut f.wm);
    }

    #[test]
    fn test_context_menu_entries() {
        let mut f = Fixture::new();
        f.open("a");
        assert_eq!(
            f.taskbar.context_menu("a", &f.wm),
            vec![
                ContextAction::Minimize,
                ContextAction::Maximize,
                ContextAction::Close
            ]
        );

        f.wm.maximize_window("a");
        assert_eq!(
            f.taskbar.context_menu("a", &f.wm)[1],
            ContextAction::RestoreDown
        );

        f.wm.minimize_window("a");
        assert_eq!(f.taskbar.context_menu("a", &f.wm)[0], ContextAction::Restore);
        assert!(f.taskbar.context_menu("ghost", &f.wm).is_empty());
    }

    #[test]
    fn test_apply_forwards_to_window_manager() {
        let mut f = Fixture::new();
        f.open("a");

        f.taskbar.apply(ContextAction::Maximize, "a", &mut f.wm);
        f.taskbar.apply(ContextAction::Maximize, "a", &mut f.wm);
        assert!(f.wm.get_window("a").unwrap().is_maximized());

        f.taskbar.apply(ContextAction::RestoreDown, "a", &mut f.wm);
        assert!(!f.wm.get_window("a").unwrap().is_maximized());

        f.taskbar.apply(ContextAction::Minimize, "a", &mut f.wm);
        assert!(f.wm.get_window("a").unwrap().is_minimized());
        f.taskbar.apply(ContextAction::Restore, "a", &mut f.wm);
        assert!(!f.wm.get_window("a").unwrap().is_minimized());

        f.taskbar.apply(ContextAction::Close, "a", &mut f.wm);
        f.flush();
        assert!(f.wm.get_window("a").is_none());
        assert!(f.taskbar.indicators().is_empty());
    }

    #[test]
    fn test_panels_toggle_independently() {
        let mut taskbar = TaskbarController::new(&[]);
        taskbar.toggle_panel(PanelKind::StartMenu);
        taskbar.show_panel(PanelKind::Network);
        assert!(taskbar.is_open(PanelKind::StartMenu));
        assert!(!taskbar.is_open(PanelKind::Notifications));
        assert!(taskbar.is_open(PanelKind::Network));

        taskbar.toggle_panel(PanelKind::StartMenu);
        assert!(!taskbar.is_open(PanelKind::StartMenu));
        assert!(taskbar.is_open(PanelKind::Network));

        taskbar.show_panel(PanelKind::Notifications);
        taskbar.hide_all_panels();
        assert_eq!(taskbar.panels(), PanelState::default());
    }

    #[test]
    fn test_escape_only_closes_start_menu() {
        let mut taskbar = TaskbarController::new(&[]);
        taskbar.show_panel(PanelKind::StartMenu);
        taskbar.show_panel(PanelKind::Notifications);
        taskbar.show_panel(PanelKind::Network);

        taskbar.escape();
        assert!(!taskbar.is_open(PanelKind::StartMenu));
        assert!(taskbar.is_open(PanelKind::Notifications));
        assert!(taskbar.is_open(PanelKind::Network));
    }

    #[test]
    fn test_notifications_respect_enabled_flag() {
        let mut taskbar = TaskbarController::new(&[]);
        assert!(taskbar.notifications_enabled());
        assert!(taskbar.notify("Timber", "summoned", NotificationLevel::Success));

        taskbar.set_notifications_enabled(false);
        assert!(!taskbar.notify("Abacus", "summoned", NotificationLevel::Success));
        let levels: Vec<_> = taskbar.notifications().map(|n| n.level).collect();
        assert_eq!(
            levels,
            vec![NotificationLevel::Success, NotificationLevel::Warning]
        );

        taskbar.set_notifications_enabled(true);
        assert_eq!(taskbar.notifications().count(), 3);
        taskbar.clear_notifications();
        assert_eq!(taskbar.notifications().count(), 0);
    }

    #[test]
    fn test_notification_history_is_bounded() {
        let mut taskbar = TaskbarController::new(&[]);
        for i in 0..NOTIFICATION_HISTORY + 5 {
            taskbar.notify(format!("n{i}"), "", NotificationLevel::Info);
        }
        assert_eq!(taskbar.notifications().count(), NOTIFICATION_HISTORY);
        assert_eq!(taskbar.notifications().next().unwrap().title, "n5");
    }

    #[test]
    fn test_quick_launch_is_deduplicated() {
        let mut taskbar = TaskbarController::new(&[AppId::Scrolldit, AppId::Scrolldit]);
        taskbar.add_quick_launch(AppId::Abacus);
        taskbar.add_quick_launch(AppId::Abacus);
        assert_eq!(taskbar.quick_launch(), &[AppId::Scrolldit, AppId::Abacus]);

        taskbar.remove_quick_launch(AppId::Scrolldit);
        assert_eq!(taskbar.quick_launch(), &[AppId::Abacus]);
    }
}
