//! Application host registry.
//!
//! Maps application ids to their manifest and a content capability, decides
//! window dimensions for the current viewport, and tracks the content init
//! job of every app window so late results can be discarded.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{AppManifest, ContentHandle, Viewport, WindowEvent};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::window_manager::WindowOptions;

/// Markup shown in an app window until its content init completes
pub const LOADING_CONTENT: &str = r#"<div class="spinner"></div>"#;

/// Icon used for windows that do not belong to a registered app
pub const GENERIC_ICON: &str = "window-icon";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppId {
    Scrolldit,
    OuijaGpt,
    Timber,
    Wraiths,
    Abacus,
    Laudify,
}

/// What an app's content init gets to work with
#[derive(Debug, Clone)]
pub struct InitContext {
    pub app_id: AppId,
    pub window_id: String,
    pub region_id: String,
    pub viewport: Viewport,
}

/// Content capability of an application
#[async_trait]
pub trait AppContent: Send + Sync {
    /// Produce the window's content. The result is written into the
    /// window's content region if the window is still the one it was
    /// started for.
    async fn init(&self, ctx: InitContext) -> Result<String, AppError>;

    /// Release per-window resources. Called once when the window closes.
    fn cleanup(&self, window_id: &str) {
        let _ = window_id;
    }
}

struct Registration {
    manifest: AppManifest,
    content: Arc<dyn AppContent>,
}

/// Window and floor size for an app at the current viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: i32,
    pub height: i32,
    pub min_width: i32,
    pub min_height: i32,
}

/// A content init ready to run. Produced when an app window is created.
pub struct ContentInit {
    pub handle: ContentHandle,
    pub ctx: InitContext,
    content: Arc<dyn AppContent>,
    cancel: CancellationToken,
}

impl fmt::Debug for ContentInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentInit")
            .field("handle", &self.handle)
            .field("app_id", &self.ctx.app_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ContentInit {
    /// Wait `delay`, then run the app's init. Returns `None` if the window
    /// closed first.
    pub async fn run(self, delay: Duration) -> Option<Result<String, AppError>> {
        let cancel = self.cancel.clone();
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(window_id = %self.handle.window_id, "Content init cancelled");
                None
            }
            result = async {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                self.content.init(self.ctx.clone()).await
            } => Some(result),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct PendingInit {
    generation: u64,
    cancel: CancellationToken,
}

/// Registry of applications plus per-window content bookkeeping
#[derive(Default)]
pub struct AppHost {
    registry: HashMap<AppId, Registration>,
    pending: HashMap<String, PendingInit>,
    /// Open app windows, for cleanup on close
    windows: HashMap<String, AppId>,
}

impl fmt::Debug for AppHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppHost")
            .field("apps", &self.registry.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .field("windows", &self.windows)
            .finish()
    }
}

impl AppHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with every built-in app registered
    pub fn with_builtin() -> Self {
        let mut host = Self::new();
        for app_id in AppId::iter() {
            host.register(app_id, builtin::manifest(app_id), Arc::new(builtin::StaticContent));
        }
        host
    }

    pub fn register(&mut self, app_id: AppId, manifest: AppManifest, content: Arc<dyn AppContent>) {
        tracing::debug!(app_id = %app_id, "Registering app");
        self.registry
            .insert(app_id, Registration { manifest, content });
    }

    pub fn is_registered(&self, app_id: AppId) -> bool {
        self.registry.contains_key(&app_id)
    }

    pub fn manifest(&self, app_id: AppId) -> Option<&AppManifest> {
        self.registry.get(&app_id).map(|r| &r.manifest)
    }

    /// Manifests of all registered apps, in start menu order
    pub fn manifests(&self) -> Vec<AppManifest> {
        AppId::iter()
            .filter_map(|id| self.manifest(id).cloned())
            .collect()
    }

    /// Options for a fresh window of `app_id`, sized for `viewport`
    pub fn window_options(&self, app_id: AppId, viewport: Viewport) -> Option<WindowOptions> {
        let manifest = self.manifest(app_id)?;
        let dims = responsive_dimensions(manifest, viewport);

        let mut options = WindowOptions::new(new_window_id(app_id), manifest.title.clone())
            .size(dims.width, dims.height)
            .min_size(dims.min_width, dims.min_height)
            .max_size(manifest.max_width, manifest.max_height)
            .content(LOADING_CONTENT)
            .app(app_id.as_ref())
            .logo(manifest.icon.clone());
        options.flags.resizable = manifest.resizable;
        Some(options)
    }

    /// Register the content init for a newly created app window
    pub fn start_init(
        &mut self,
        app_id: AppId,
        handle: ContentHandle,
        viewport: Viewport,
    ) -> Option<ContentInit> {
        let content = self.registry.get(&app_id)?.content.clone();
        let cancel = CancellationToken::new();

        if let Some(previous) = self.pending.insert(
            handle.window_id.clone(),
            PendingInit {
                generation: handle.generation,
                cancel: cancel.clone(),
            },
        ) {
            previous.cancel.cancel();
        }
        self.windows.insert(handle.window_id.clone(), app_id);

        Some(ContentInit {
            ctx: InitContext {
                app_id,
                window_id: handle.window_id.clone(),
                region_id: handle.region_id.clone(),
                viewport,
            },
            handle,
            content,
            cancel,
        })
    }

    /// Accept an init result. Returns the content to write, or `None` when
    /// the job was cancelled, superseded, or failed.
    pub fn complete_init(
        &mut self,
        handle: &ContentHandle,
        result: Result<String, AppError>,
    ) -> Option<String> {
        let current = self
            .pending
            .get(&handle.window_id)
            .is_some_and(|p| p.generation == handle.generation);
        if !current {
            tracing::debug!(
                window_id = %handle.window_id,
                generation = handle.generation,
                "Discarding stale content init result"
            );
            return None;
        }
        self.pending.remove(&handle.window_id);

        match result {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(window_id = %handle.window_id, error = %e, "App content init failed");
                None
            }
        }
    }

    pub fn has_pending_init(&self, window_id: &str) -> bool {
        self.pending.contains_key(window_id)
    }

    /// React to a window lifecycle notification
    pub fn on_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::Closed { window_id } = event {
            self.window_closed(window_id);
        }
    }

    fn window_closed(&mut self, window_id: &str) {
        if let Some(pending) = self.pending.remove(window_id) {
            pending.cancel.cancel();
        }
        let Some(app_id) = self.windows.remove(window_id) else {
            return;
        };
        if let Some(registration) = self.registry.get(&app_id) {
            tracing::debug!(app_id = %app_id, window_id, "Cleaning up app");
            registration.content.cleanup(window_id);
        }
    }
}

/// Generated window id: `window-<app>-<ulid>`
pub fn new_window_id(app_id: AppId) -> String {
    format!("window-{}-{}", app_id, ulid::Ulid::new().to_string().to_lowercase())
}

/// Shrink an app's size and floor on narrow viewports. Tablets (<= 768 px
/// wide) and phones (<= 480 px) cap each value at a fraction of the viewport.
pub fn responsive_dimensions(manifest: &AppManifest, viewport: Viewport) -> Dimensions {
    let mut dims = Dimensions {
        width: manifest.default_width,
        height: manifest.default_height,
        min_width: manifest.min_width,
        min_height: manifest.min_height,
    };

    let scale = |value: i32, extent: i32, factor: f64| value.min((f64::from(extent) * factor) as i32);

    if viewport.width <= 768 {
        dims.width = scale(dims.width, viewport.width, 0.8);
        dims.height = scale(dims.height, viewport.height, 0.7);
        dims.min_width = scale(dims.min_width, viewport.width, 0.6);
        dims.min_height = scale(dims.min_height, viewport.height, 0.5);
    }
    if viewport.width <= 480 {
        dims.width = scale(dims.width, viewport.width, 0.95);
        dims.height = scale(dims.height, viewport.height, 0.8);
        dims.min_width = scale(dims.min_width, viewport.width, 0.8);
        dims.min_height = scale(dims.min_height, viewport.height, 0.6);
    }

    dims
}
