//! Built-in applications shipped with the desktop.

use async_trait::async_trait;
use shared_types::AppManifest;

use super::{AppContent, AppId, InitContext};
use crate::error::AppError;

/// Manifest for a built-in app
pub fn manifest(app_id: AppId) -> AppManifest {
    let (name, title, size, min, max, resizable) = match app_id {
        AppId::Scrolldit => (
            "Scrolldit",
            "Scrolldit - Scrollers of Doom",
            (900, 700),
            (700, 600),
            None,
            true,
        ),
        AppId::OuijaGpt => ("OuijaGPT", "OuijaGPT", (700, 500), (500, 400), None, true),
        AppId::Timber => (
            "Timber",
            "Timber - Where Dark Souls Meet",
            (800, 600),
            (600, 500),
            None,
            true,
        ),
        AppId::Wraiths => (
            "WraithsApp",
            "WraithsApp - Spirit Communications",
            (900, 700),
            (700, 600),
            None,
            true,
        ),
        AppId::Abacus => (
            "Abacus",
            "Abacus - Mystical Calculator",
            (400, 550),
            (400, 550),
            Some((400, 550)),
            false,
        ),
        AppId::Laudify => (
            "Laudify",
            "Laudify - Mystical Music Player",
            (900, 600),
            (700, 500),
            None,
            true,
        ),
    };

    AppManifest {
        id: app_id.to_string(),
        name: name.to_string(),
        icon: format!("{app_id}-icon"),
        title: title.to_string(),
        default_width: size.0,
        default_height: size.1,
        min_width: min.0,
        min_height: min.1,
        max_width: max.map(|(w, _)| w),
        max_height: max.map(|(_, h)| h),
        resizable,
    }
}

/// Content provider for the built-in apps: renders a root element the app's
/// front end attaches to
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticContent;

#[async_trait]
impl AppContent for StaticContent {
    async fn init(&self, ctx: InitContext) -> Result<String, AppError> {
        Ok(format!(
            r#"<div class="app-root app-{}" data-window="{}"></div>"#,
            ctx.app_id, ctx.window_id
        ))
    }
}
