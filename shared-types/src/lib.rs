//! Shared types between the desktop core and its front-ends
//!
//! These types are used by both:
//! - the window manager / taskbar core (native Rust)
//! - web front-ends rendering the desktop (via the generated TypeScript)
//!
//! Serializable with serde for JSON snapshots and lifecycle event streams

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Geometry
// ============================================================================

/// On-screen rectangle of a window, in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Size of the area windows live in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Floor and optional ceiling on a window's size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct SizeConstraints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
}

impl SizeConstraints {
    /// Clamp a width into `[min_width, max_width]`. The floor wins if the
    /// ceiling is below it.
    pub fn clamp_width(&self, width: i32) -> i32 {
        let capped = match self.max_width {
            Some(max) => width.min(max),
            None => width,
        };
        capped.max(self.min_width)
    }

    pub fn clamp_height(&self, height: i32) -> i32 {
        let capped = match self.max_height {
            Some(max) => height.min(max),
            None => height,
        };
        capped.max(self.min_height)
    }
}

// ============================================================================
// Window Entity
// ============================================================================

/// Which controls and interactions a window allows; fixed at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct WindowFlags {
    pub resizable: bool,
    pub closable: bool,
    pub minimizable: bool,
    pub maximizable: bool,
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self {
            resizable: true,
            closable: true,
            minimizable: true,
            maximizable: true,
        }
    }
}

/// Display state of a window. Exactly one applies at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum WindowStatus {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// What a window returns to when it leaves Minimized or Maximized.
///
/// `pre_minimize` remembers the status the window was minimized from, so a
/// window minimized while maximized comes back maximized. `pre_maximize`
/// keeps the normal geometry for as long as the window stays maximized,
/// including while it is minimized on top of that.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct SavedGeometry {
    pub pre_minimize: Option<WindowStatus>,
    pub pre_maximize: Option<Geometry>,
}

/// Opaque mount point an application renders into
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct ContentHandle {
    pub window_id: String,
    pub region_id: String,
    /// Unique per created window, so a handle issued to a closed window never
    /// matches a later window that reuses its id
    pub generation: u64,
}

/// Authoritative record of one open window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct WindowEntity {
    pub id: String,
    pub title: String,
    pub geometry: Geometry,
    pub constraints: SizeConstraints,
    pub flags: WindowFlags,
    pub z_index: u32,
    pub status: WindowStatus,
    pub saved: SavedGeometry,
    pub app_id: Option<String>, // "abacus", "laudify", ... or none for raw windows
    pub logo: Option<String>,   // css icon class shown in the title bar
    pub content: ContentHandle,
    pub closing: bool,
}

impl WindowEntity {
    pub fn is_minimized(&self) -> bool {
        self.status == WindowStatus::Minimized
    }

    pub fn is_maximized(&self) -> bool {
        self.status == WindowStatus::Maximized
    }

    /// Rendered and eligible for focus
    pub fn is_visible(&self) -> bool {
        !self.is_minimized() && !self.closing
    }
}

// ============================================================================
// Taskbar
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum IndicatorStatus {
    Active,
    Minimized,
    Maximized,
    Normal,
}

/// Taskbar entry mirroring one open window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct TaskbarIndicator {
    pub window_id: String,
    pub name: String,
    pub icon: String,
    pub status: IndicatorStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum PanelKind {
    StartMenu,
    Notifications,
    Network,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct PanelState {
    pub start_menu: bool,
    pub notifications: bool,
    pub network: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Desktop toast, kept in the notification tray
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Applications
// ============================================================================

/// Display metadata and default window shape for an application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct AppManifest {
    pub id: String,
    pub name: String,
    pub icon: String, // css icon class
    pub title: String,
    pub default_width: i32,
    pub default_height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
    pub resizable: bool,
}

// ============================================================================
// Lifecycle Events
// ============================================================================

/// Notification emitted by the window manager after a state change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub enum WindowEvent {
    Opened { window: WindowEntity },
    Focused { window_id: String },
    /// The last visible window went away; nothing is active
    ActiveCleared,
    Minimized { window_id: String },
    Restored { window_id: String, status: WindowStatus },
    MaximizeToggled { window_id: String, maximized: bool },
    Moved { window_id: String, x: i32, y: i32 },
    Resized { window_id: String, width: i32, height: i32 },
    /// Close transition started
    Closing { window_id: String },
    Closed { window_id: String },
    ContentMounted { window_id: String },
}

impl WindowEvent {
    /// Window the event is about, if any
    pub fn window_id(&self) -> Option<&str> {
        match self {
            WindowEvent::Opened { window } => Some(&window.id),
            WindowEvent::ActiveCleared => None,
            WindowEvent::Focused { window_id }
            | WindowEvent::Minimized { window_id }
            | WindowEvent::Restored { window_id, .. }
            | WindowEvent::MaximizeToggled { window_id, .. }
            | WindowEvent::Moved { window_id, .. }
            | WindowEvent::Resized { window_id, .. }
            | WindowEvent::Closing { window_id }
            | WindowEvent::Closed { window_id }
            | WindowEvent::ContentMounted { window_id } => Some(window_id),
        }
    }

    /// Dotted name used in logs, e.g. "window.focused"
    pub fn kind(&self) -> &'static str {
        match self {
            WindowEvent::Opened { .. } => EVENT_WINDOW_OPENED,
            WindowEvent::Focused { .. } => EVENT_WINDOW_FOCUSED,
            WindowEvent::ActiveCleared => EVENT_WINDOW_ACTIVE_CLEARED,
            WindowEvent::Minimized { .. } => EVENT_WINDOW_MINIMIZED,
            WindowEvent::Restored { .. } => EVENT_WINDOW_RESTORED,
            WindowEvent::MaximizeToggled { .. } => EVENT_WINDOW_MAXIMIZE_TOGGLED,
            WindowEvent::Moved { .. } => EVENT_WINDOW_MOVED,
            WindowEvent::Resized { .. } => EVENT_WINDOW_RESIZED,
            WindowEvent::Closing { .. } => EVENT_WINDOW_CLOSING,
            WindowEvent::Closed { .. } => EVENT_WINDOW_CLOSED,
            WindowEvent::ContentMounted { .. } => EVENT_WINDOW_CONTENT_MOUNTED,
        }
    }
}

/// Event as delivered to subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct EventEnvelope {
    /// Per-desktop sequence number (strictly increasing)
    pub seq: u64,

    /// When the event was published
    pub timestamp: DateTime<Utc>,

    pub event: WindowEvent,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Full desktop state - all windows, taskbar and panels
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/desktop.ts")]
pub struct DesktopSnapshot {
    /// Ordered back to front
    pub windows: Vec<WindowEntity>,
    pub active_window: Option<String>,
    pub indicators: Vec<TaskbarIndicator>,
    pub panels: PanelState,
    /// Oldest first
    pub notifications: Vec<Notification>,
    pub notifications_enabled: bool,
    pub quick_launch: Vec<String>,
    pub viewport: Viewport,
}

// ============================================================================
// Constants
// ============================================================================

/// Event types
pub const EVENT_WINDOW_OPENED: &str = "window.opened";
pub const EVENT_WINDOW_FOCUSED: &str = "window.focused";
pub const EVENT_WINDOW_ACTIVE_CLEARED: &str = "window.active_cleared";
pub const EVENT_WINDOW_MINIMIZED: &str = "window.minimized";
pub const EVENT_WINDOW_RESTORED: &str = "window.restored";
pub const EVENT_WINDOW_MAXIMIZE_TOGGLED: &str = "window.maximize_toggled";
pub const EVENT_WINDOW_MOVED: &str = "window.moved";
pub const EVENT_WINDOW_RESIZED: &str = "window.resized";
pub const EVENT_WINDOW_CLOSING: &str = "window.closing";
pub const EVENT_WINDOW_CLOSED: &str = "window.closed";
pub const EVENT_WINDOW_CONTENT_MOUNTED: &str = "window.content_mounted";

// ============================================================================
// Tests
// ============================================================================
