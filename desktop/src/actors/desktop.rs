//! DesktopActor - serializes every desktop operation through one mailbox.
//!
//! The actor owns a `Desktop`. Each message runs to completion before the
//! next is taken, which is the single-threaded model the window manager
//! assumes. Work that has to wait (the closing transition, app content
//! init) runs on spawned tasks and re-enters the mailbox as `FinishClose`
//! and `ContentReady`, where the window's generation is checked again.
//!
//! Every dispatched lifecycle notification is broadcast to subscribers as a
//! sequenced `EventEnvelope`.

use std::time::Duration;

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use shared_types::{
    ContentHandle, DesktopSnapshot, EventEnvelope, PanelKind, Viewport, WindowEntity,
};
use tokio::sync::mpsc;

use crate::apps::{AppHost, AppId, ContentInit};
use crate::config::DesktopConfig;
use crate::error::AppError;
use crate::shell::{AppLaunch, Desktop};
use crate::taskbar::ContextAction;
use crate::window_manager::{
    InteractionKind, MountContainer, PointerPhase, PointerSample, WindowOptions,
};

/// Actor that owns the desktop
#[derive(Debug, Default)]
pub struct DesktopActor;

/// Arguments for spawning DesktopActor
pub struct DesktopArguments {
    pub config: DesktopConfig,
    pub container: Box<dyn MountContainer>,
    pub apps: AppHost,
}

/// State for DesktopActor
pub struct DesktopState {
    desktop: Desktop,
    subscribers: Vec<mpsc::UnboundedSender<EventEnvelope>>,
    last_seq: u64,
    close_transition: Duration,
    content_init_delay: Duration,
}

// ============================================================================
// Messages
// ============================================================================

/// Messages handled by DesktopActor
#[derive(Debug)]
pub enum DesktopActorMsg {
    /// Open an app, or bring its existing window forward
    OpenApp {
        app_id: AppId,
        reply: RpcReplyPort<AppLaunch>,
    },
    /// Open a window that does not belong to a registered app
    CreateWindow {
        options: WindowOptions,
        reply: RpcReplyPort<WindowEntity>,
    },
    FocusWindow {
        window_id: String,
        reply: RpcReplyPort<()>,
    },
    MinimizeWindow {
        window_id: String,
        reply: RpcReplyPort<()>,
    },
    /// Toggle maximize
    MaximizeWindow {
        window_id: String,
        reply: RpcReplyPort<()>,
    },
    RestoreWindow {
        window_id: String,
        reply: RpcReplyPort<()>,
    },
    /// Start the closing transition
    CloseWindow {
        window_id: String,
        reply: RpcReplyPort<()>,
    },
    CloseAllWindows {
        reply: RpcReplyPort<()>,
    },
    MinimizeAllWindows {
        reply: RpcReplyPort<()>,
    },
    /// Alt+Tab
    SwitchWindow {
        reply: RpcReplyPort<()>,
    },
    /// Raw pointer input. `target` names the window region hit on `Down`.
    Pointer {
        phase: PointerPhase,
        sample: PointerSample,
        target: Option<(String, InteractionKind)>,
    },
    ViewportResized {
        viewport: Viewport,
        reply: RpcReplyPort<()>,
    },
    TaskbarClick {
        window_id: String,
        reply: RpcReplyPort<()>,
    },
    GetContextMenu {
        window_id: String,
        reply: RpcReplyPort<Vec<ContextAction>>,
    },
    ApplyContextAction {
        window_id: String,
        action: ContextAction,
        reply: RpcReplyPort<()>,
    },
    TogglePanel {
        panel: PanelKind,
        reply: RpcReplyPort<()>,
    },
    /// Click outside the panels: close every panel
    HideAllPanels {
        reply: RpcReplyPort<()>,
    },
    /// Escape: close the start menu
    Escape {
        reply: RpcReplyPort<()>,
    },
    SetNotificationsEnabled {
        enabled: bool,
        reply: RpcReplyPort<()>,
    },
    ClearNotifications {
        reply: RpcReplyPort<()>,
    },
    AddQuickLaunch {
        app_id: AppId,
        reply: RpcReplyPort<()>,
    },
    RemoveQuickLaunch {
        app_id: AppId,
        reply: RpcReplyPort<()>,
    },
    GetWindow {
        window_id: String,
        reply: RpcReplyPort<Option<WindowEntity>>,
    },
    ReadContent {
        window_id: String,
        reply: RpcReplyPort<Option<String>>,
    },
    GetSnapshot {
        reply: RpcReplyPort<DesktopSnapshot>,
    },
    /// Receive every lifecycle notification from now on
    Subscribe {
        sender: mpsc::UnboundedSender<EventEnvelope>,
        reply: RpcReplyPort<()>,
    },
    /// Close every window immediately and hide all panels
    Shutdown {
        reply: RpcReplyPort<()>,
    },
    /// Content init finished (internal)
    ContentReady {
        handle: ContentHandle,
        result: Result<String, AppError>,
    },
    /// Closing transition elapsed (internal)
    FinishClose { window_id: String, generation: u64 },
}

// ============================================================================
// Actor Implementation
// ============================================================================

#[async_trait]
impl Actor for DesktopActor {
    type Msg = DesktopActorMsg;
    type State = DesktopState;
    type Arguments = DesktopArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            viewport_width = args.config.viewport.width,
            viewport_height = args.config.viewport.height,
            "DesktopActor starting"
        );

        let desktop = Desktop::new(&args.config, args.container, args.apps)?;

        Ok(DesktopState {
            desktop,
            subscribers: Vec::new(),
            last_seq: 0,
            close_transition: args.config.close_transition,
            content_init_delay: args.config.content_init_delay,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DesktopActorMsg::OpenApp { app_id, reply } => {
                let (launch, init) = state.desktop.open_app(app_id);
                if let Some(init) = init {
                    self.spawn_content_init(&myself, init, state.content_init_delay);
                }
                let _ = reply.send(launch);
            }
            DesktopActorMsg::CreateWindow { options, reply } => {
                let window = state.desktop.create_window(options);
                let _ = reply.send(window);
            }
            DesktopActorMsg::FocusWindow { window_id, reply } => {
                state.desktop.focus_window(&window_id);
                let _ = reply.send(());
            }
            DesktopActorMsg::MinimizeWindow { window_id, reply } => {
                state.desktop.minimize_window(&window_id);
                let _ = reply.send(());
            }
            DesktopActorMsg::MaximizeWindow { window_id, reply } => {
                state.desktop.maximize_window(&window_id);
                let _ = reply.send(());
            }
            DesktopActorMsg::RestoreWindow { window_id, reply } => {
                state.desktop.restore_window(&window_id);
                let _ = reply.send(());
            }
            DesktopActorMsg::CloseWindow { window_id, reply } => {
                if let Some(generation) = state.desktop.begin_close(&window_id) {
                    self.schedule_close(&myself, window_id, generation, state);
                }
                let _ = reply.send(());
            }
            DesktopActorMsg::CloseAllWindows { reply } => {
                for (window_id, generation) in state.desktop.begin_close_all() {
                    self.schedule_close(&myself, window_id, generation, state);
                }
                let _ = reply.send(());
            }
            DesktopActorMsg::MinimizeAllWindows { reply } => {
                state.desktop.minimize_all_windows();
                let _ = reply.send(());
            }
            DesktopActorMsg::SwitchWindow { reply } => {
                state.desktop.switch_window();
                let _ = reply.send(());
            }
            DesktopActorMsg::Pointer {
                phase,
                sample,
                target,
            } => {
                let target = target.as_ref().map(|(id, kind)| (id.as_str(), *kind));
                state.desktop.handle_pointer(phase, sample, target);
            }
            DesktopActorMsg::ViewportResized { viewport, reply } => {
                state.desktop.handle_viewport_resize(viewport);
                let _ = reply.send(());
            }
            DesktopActorMsg::TaskbarClick { window_id, reply } => {
                state.desktop.taskbar_click(&window_id);
                let _ = reply.send(());
            }
            DesktopActorMsg::GetContextMenu { window_id, reply } => {
                let _ = reply.send(state.desktop.context_menu(&window_id));
            }
            DesktopActorMsg::ApplyContextAction {
                window_id,
                action,
                reply,
            } => {
                if let Some(generation) = state.desktop.apply_context_action(action, &window_id) {
                    self.schedule_close(&myself, window_id, generation, state);
                }
                let _ = reply.send(());
            }
            DesktopActorMsg::TogglePanel { panel, reply } => {
                state.desktop.toggle_panel(panel);
                let _ = reply.send(());
            }
            DesktopActorMsg::HideAllPanels { reply } => {
                state.desktop.hide_all_panels();
                let _ = reply.send(());
            }
            DesktopActorMsg::Escape { reply } => {
                state.desktop.escape();
                let _ = reply.send(());
            }
            DesktopActorMsg::SetNotificationsEnabled { enabled, reply } => {
                tracing::info!(enabled, "Notifications toggled");
                state.desktop.set_notifications_enabled(enabled);
                let _ = reply.send(());
            }
            DesktopActorMsg::ClearNotifications { reply } => {
                state.desktop.clear_notifications();
                let _ = reply.send(());
            }
            DesktopActorMsg::AddQuickLaunch { app_id, reply } => {
                state.desktop.add_quick_launch(app_id);
                let _ = reply.send(());
            }
            DesktopActorMsg::RemoveQuickLaunch { app_id, reply } => {
                state.desktop.remove_quick_launch(app_id);
                let _ = reply.send(());
            }
            DesktopActorMsg::GetWindow { window_id, reply } => {
                let window = state.desktop.window_manager().get_window(&window_id).cloned();
                let _ = reply.send(window);
            }
            DesktopActorMsg::ReadContent { window_id, reply } => {
                let _ = reply.send(state.desktop.window_manager().read_content(&window_id));
            }
            DesktopActorMsg::GetSnapshot { reply } => {
                let _ = reply.send(state.desktop.snapshot());
            }
            DesktopActorMsg::Subscribe { sender, reply } => {
                state.subscribers.push(sender);
                tracing::debug!(subscribers = state.subscribers.len(), "Event subscriber added");
                let _ = reply.send(());
            }
            DesktopActorMsg::Shutdown { reply } => {
                state.desktop.shutdown();
                let _ = reply.send(());
            }
            DesktopActorMsg::ContentReady { handle, result } => {
                state.desktop.content_ready(&handle, result);
            }
            DesktopActorMsg::FinishClose {
                window_id,
                generation,
            } => {
                state.desktop.finish_close(&window_id, generation);
            }
        }

        self.broadcast(state);
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(actor_id = %myself.get_id(), "DesktopActor stopped");
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl DesktopActor {
    /// Finish a close after the transition, or right away when there is none
    fn schedule_close(
        &self,
        myself: &ActorRef<DesktopActorMsg>,
        window_id: String,
        generation: u64,
        state: &mut DesktopState,
    ) {
        let delay = state.close_transition;
        if delay.is_zero() {
            state.desktop.finish_close(&window_id, generation);
            return;
        }

        let myself = myself.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = myself.cast(DesktopActorMsg::FinishClose {
                window_id,
                generation,
            });
        });
    }

    fn spawn_content_init(
        &self,
        myself: &ActorRef<DesktopActorMsg>,
        init: ContentInit,
        delay: Duration,
    ) {
        let myself = myself.clone();
        tokio::spawn(async move {
            let handle = init.handle.clone();
            if let Some(result) = init.run(delay).await {
                let _ = myself.cast(DesktopActorMsg::ContentReady { handle, result });
            }
        });
    }

    fn broadcast(&self, state: &mut DesktopState) {
        let events = state.desktop.take_events();
        if events.is_empty() {
            return;
        }

        for event in events {
            state.last_seq += 1;
            let envelope = EventEnvelope {
                seq: state.last_seq,
                timestamp: chrono::Utc::now(),
                event,
            };
            tracing::trace!(seq = envelope.seq, kind = envelope.event.kind(), "Broadcasting event");
            state
                .subscribers
                .retain(|subscriber| subscriber.send(envelope.clone()).is_ok());
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Convenience function to open an app
pub async fn open_app(
    desktop: &ActorRef<DesktopActorMsg>,
    app_id: AppId,
) -> Result<AppLaunch, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::OpenApp { app_id, reply })
}

/// Convenience function to create a plain window
pub async fn create_window(
    desktop: &ActorRef<DesktopActorMsg>,
    options: WindowOptions,
) -> Result<WindowEntity, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::CreateWindow {
        options,
        reply
    })
}

/// Convenience function to focus a window
pub async fn focus_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::FocusWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to minimize a window
pub async fn minimize_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::MinimizeWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to toggle maximize
pub async fn maximize_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::MaximizeWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to restore a window
pub async fn restore_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::RestoreWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to close a window
pub async fn close_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::CloseWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to close every window
pub async fn close_all_windows(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::CloseAllWindows { reply })
}

/// Convenience function to minimize every window
pub async fn minimize_all_windows(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::MinimizeAllWindows {
        reply
    })
}

/// Convenience function to cycle the active window
pub async fn switch_window(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::SwitchWindow { reply })
}

/// Convenience function to forward pointer input
pub fn pointer(
    desktop: &ActorRef<DesktopActorMsg>,
    phase: PointerPhase,
    sample: PointerSample,
    target: Option<(String, InteractionKind)>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    desktop
        .cast(DesktopActorMsg::Pointer {
            phase,
            sample,
            target,
        })
        .map_err(ractor::RactorErr::from)
}

/// Convenience function to report a new viewport size
pub async fn resize_viewport(
    desktop: &ActorRef<DesktopActorMsg>,
    viewport: Viewport,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::ViewportResized {
        viewport,
        reply
    })
}

/// Convenience function to click a taskbar indicator
pub async fn taskbar_click(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::TaskbarClick {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to get an indicator's context menu
pub async fn context_menu(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<Vec<ContextAction>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::GetContextMenu {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to apply a context-menu choice
pub async fn apply_context_action(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
    action: ContextAction,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::ApplyContextAction {
        window_id: window_id.into(),
        action,
        reply,
    })
}

/// Convenience function to toggle a taskbar panel
pub async fn toggle_panel(
    desktop: &ActorRef<DesktopActorMsg>,
    panel: PanelKind,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::TogglePanel { panel, reply })
}

/// Convenience function to close every panel
pub async fn hide_all_panels(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::HideAllPanels { reply })
}

/// Convenience function for the Escape key
pub async fn escape(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::Escape { reply })
}

/// Convenience function to switch the notification feed on or off
pub async fn set_notifications_enabled(
    desktop: &ActorRef<DesktopActorMsg>,
    enabled: bool,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::SetNotificationsEnabled {
        enabled,
        reply
    })
}

/// Convenience function to empty the notification tray
pub async fn clear_notifications(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::ClearNotifications { reply })
}

/// Convenience function to pin an app to quick launch
pub async fn add_quick_launch(
    desktop: &ActorRef<DesktopActorMsg>,
    app_id: AppId,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::AddQuickLaunch {
        app_id,
        reply
    })
}

/// Convenience function to unpin an app from quick launch
pub async fn remove_quick_launch(
    desktop: &ActorRef<DesktopActorMsg>,
    app_id: AppId,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::RemoveQuickLaunch {
        app_id,
        reply
    })
}

/// Convenience function to get one window
pub async fn get_window(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<Option<WindowEntity>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::GetWindow {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to read a window's content region
pub async fn read_content(
    desktop: &ActorRef<DesktopActorMsg>,
    window_id: impl Into<String>,
) -> Result<Option<String>, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::ReadContent {
        window_id: window_id.into(),
        reply,
    })
}

/// Convenience function to get desktop state
pub async fn get_snapshot(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<DesktopSnapshot, ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::GetSnapshot { reply })
}

/// Convenience function to subscribe to lifecycle events
pub async fn subscribe(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<mpsc::UnboundedReceiver<EventEnvelope>, ractor::RactorErr<DesktopActorMsg>> {
    let (sender, receiver) = mpsc::unbounded_channel();
    ractor::call!(desktop, |reply| DesktopActorMsg::Subscribe { sender, reply })?;
    Ok(receiver)
}

/// Convenience function to shut the desktop down
pub async fn shutdown(
    desktop: &ActorRef<DesktopActorMsg>,
) -> Result<(), ractor::RactorErr<DesktopActorMsg>> {
    ractor::call!(desktop, |reply| DesktopActorMsg::Shutdown { reply })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{builtin, AppContent, InitContext};
    use crate::window_manager::MemoryContainer;
    use shared_types::WindowEvent;
    use std::sync::Arc;

    async fn spawn_desktop(config: DesktopConfig, apps: AppHost) -> ActorRef<DesktopActorMsg> {
        let (desktop, _handle) = Actor::spawn(
            None,
            DesktopActor,
            DesktopArguments {
                config,
                container: Box::new(MemoryContainer::new()),
                apps,
            },
        )
        .await
        .unwrap();
        desktop
    }

    async fn wait_for(
        events: &mut mpsc::UnboundedReceiver<EventEnvelope>,
        matches: impl Fn(&WindowEvent) -> bool,
    ) -> EventEnvelope {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let envelope = events.recv().await.unwrap();
                if matches(&envelope.event) {
                    return envelope;
                }
            }
        })
        .await
        .unwrap()
    }

    fn window_of(launch: AppLaunch) -> WindowEntity {
        match launch {
            AppLaunch::Created(window) => window,
            other => panic!("expected a new window, got {other:?}"),
        }
    }

    /// Content that never finishes on its own
    struct StalledContent;

    #[async_trait]
    impl AppContent for StalledContent {
        async fn init(&self, _ctx: InitContext) -> Result<String, AppError> {
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    // ============================================================================
    // Test 1: Opening an app mounts its content
    // ============================================================================

    #[tokio::test]
    async fn test_open_app_mounts_content() {
        let desktop = spawn_desktop(DesktopConfig::immediate(), AppHost::with_builtin()).await;
        let mut events = subscribe(&desktop).await.unwrap();

        let window = window_of(open_app(&desktop, AppId::Timber).await.unwrap());
        assert!(window.id.starts_with("window-timber-"));
        assert_eq!((window.geometry.width, window.geometry.height), (800, 600));

        let id = window.id.clone();
        wait_for(&mut events, |e| {
            *e == WindowEvent::ContentMounted {
                window_id: id.clone(),
            }
        })
        .await;

        let content = read_content(&desktop, &window.id).await.unwrap().unwrap();
        assert!(content.contains("app-timber"));

        desktop.stop(None);
    }

    // ============================================================================
    // Test 2: Events are sequenced
    // ============================================================================

    #[tokio::test]
    async fn test_events_are_sequenced() {
        let desktop = spawn_desktop(DesktopConfig::immediate(), AppHost::with_builtin()).await;
        let mut events = subscribe(&desktop).await.unwrap();

        let window = create_window(
            &desktop,
            WindowOptions::new("notes", "Notes").position(10, 10),
        )
        .await
        .unwrap();
        minimize_window(&desktop, &window.id).await.unwrap();

        let opened = events.recv().await.unwrap();
        let focused = events.recv().await.unwrap();
        let minimized = events.recv().await.unwrap();
        assert!(matches!(opened.event, WindowEvent::Opened { .. }));
        assert!(matches!(focused.event, WindowEvent::Focused { .. }));
        assert!(matches!(minimized.event, WindowEvent::Minimized { .. }));
        assert!(opened.seq < focused.seq && focused.seq < minimized.seq);

        desktop.stop(None);
    }

    // ============================================================================
    // Test 3: Close runs a transition
    // ============================================================================

    #[tokio::test]
    async fn test_close_transition() {
        let config = DesktopConfig {
            close_transition: Duration::from_millis(50),
            ..DesktopConfig::immediate()
        };
        let desktop = spawn_desktop(config, AppHost::with_builtin()).await;
        let mut events = subscribe(&desktop).await.unwrap();

        let window = window_of(open_app(&desktop, AppId::Abacus).await.unwrap());
        close_window(&desktop, &window.id).await.unwrap();

        let closing = get_window(&desktop, &window.id).await.unwrap().unwrap();
        assert!(closing.closing);

        let id = window.id.clone();
        wait_for(&mut events, |e| {
            *e == WindowEvent::Closed {
                window_id: id.clone(),
            }
        })
        .await;
        assert!(get_window(&desktop, &window.id).await.unwrap().is_none());

        let snapshot = get_snapshot(&desktop).await.unwrap();
        assert!(snapshot.indicators.is_empty());
        assert_eq!(snapshot.active_window, None);

        desktop.stop(None);
    }

    // ============================================================================
    // Test 4: Late content init after close is discarded
    // ============================================================================

    #[tokio::test]
    async fn test_close_cancels_pending_init() {
        let mut apps = AppHost::new();
        apps.register(
            AppId::Wraiths,
            builtin::manifest(AppId::Wraiths),
            Arc::new(StalledContent),
        );
        let desktop = spawn_desktop(DesktopConfig::immediate(), apps).await;

        let window = window_of(open_app(&desktop, AppId::Wraiths).await.unwrap());
        close_window(&desktop, &window.id).await.unwrap();

        assert!(read_content(&desktop, &window.id).await.unwrap().is_none());
        let snapshot = get_snapshot(&desktop).await.unwrap();
        assert!(snapshot.windows.is_empty());

        desktop.stop(None);
    }

    // ============================================================================
    // Test 5: Taskbar routing through the actor
    // ============================================================================

    #[tokio::test]
    async fn test_taskbar_routing() {
        let desktop = spawn_desktop(DesktopConfig::immediate(), AppHost::with_builtin()).await;

        let a = window_of(open_app(&desktop, AppId::Scrolldit).await.unwrap());
        let b = window_of(open_app(&desktop, AppId::Laudify).await.unwrap());

        minimize_window(&desktop, &b.id).await.unwrap();
        assert_eq!(
            context_menu(&desktop, &b.id).await.unwrap()[0],
            ContextAction::Restore
        );

        taskbar_click(&desktop, &b.id).await.unwrap();
        let snapshot = get_snapshot(&desktop).await.unwrap();
        assert_eq!(snapshot.active_window.as_deref(), Some(b.id.as_str()));

        apply_context_action(&desktop, &a.id, ContextAction::Maximize)
            .await
            .unwrap();
        let maxed = get_window(&desktop, &a.id).await.unwrap().unwrap();
        assert!(maxed.is_maximized());

        apply_context_action(&desktop, &a.id, ContextAction::Close)
            .await
            .unwrap();
        assert!(get_window(&desktop, &a.id).await.unwrap().is_none());

        toggle_panel(&desktop, PanelKind::Network).await.unwrap();
        toggle_panel(&desktop, PanelKind::StartMenu).await.unwrap();
        escape(&desktop).await.unwrap();
        let panels = get_snapshot(&desktop).await.unwrap().panels;
        assert!(panels.network && !panels.start_menu);
        hide_all_panels(&desktop).await.unwrap();
        assert!(!get_snapshot(&desktop).await.unwrap().panels.network);

        set_notifications_enabled(&desktop, false).await.unwrap();
        clear_notifications(&desktop).await.unwrap();
        let snapshot = get_snapshot(&desktop).await.unwrap();
        assert!(!snapshot.notifications_enabled);
        assert!(snapshot.notifications.is_empty());

        desktop.stop(None);
    }

    // ============================================================================
    // Test 6: Pointer drag through the mailbox
    // ============================================================================

    #[tokio::test]
    async fn test_pointer_drag() {
        let config = DesktopConfig {
            viewport: Viewport::new(1000, 800),
            ..DesktopConfig::immediate()
        };
        let desktop = spawn_desktop(config, AppHost::with_builtin()).await;
        let window = create_window(
            &desktop,
            WindowOptions::new("w", "W").size(400, 300).position(100, 100),
        )
        .await
        .unwrap();

        pointer(
            &desktop,
            PointerPhase::Down,
            PointerSample::mouse(150, 110),
            Some((window.id.clone(), InteractionKind::Drag)),
        )
        .unwrap();
        pointer(&desktop, PointerPhase::Move, PointerSample::mouse(5000, 110), None).unwrap();
        pointer(&desktop, PointerPhase::Up, PointerSample::mouse(5000, 110), None).unwrap();

        // Calls are queued behind the casts above
        let moved = get_window(&desktop, "w").await.unwrap().unwrap();
        assert_eq!(moved.geometry.x, 600);

        desktop.stop(None);
    }

    #[tokio::test]
    async fn test_spawn_fails_without_container() {
        let result = Actor::spawn(
            None,
            DesktopActor,
            DesktopArguments {
                config: DesktopConfig::immediate(),
                container: Box::new(MemoryContainer::detached()),
                apps: AppHost::with_builtin(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
