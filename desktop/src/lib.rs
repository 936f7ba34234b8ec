//! Desktop window manager, taskbar and application host.
//!
//! `window_manager` is the synchronous core. `shell::Desktop` wires it to the
//! taskbar and the app host, and `actors::DesktopActor` serializes access to
//! a `Desktop` and runs its timed work.

pub mod actors;
pub mod apps;
pub mod config;
pub mod error;
pub mod shell;
pub mod taskbar;
pub mod window_manager;

pub use apps::{AppContent, AppHost, AppId};
pub use config::DesktopConfig;
pub use error::{AppError, DesktopError};
pub use shell::{AppLaunch, Desktop, WindowLifecycle};
pub use taskbar::{ContextAction, TaskbarController};
pub use window_manager::{MemoryContainer, MountContainer, WindowManager, WindowOptions};
