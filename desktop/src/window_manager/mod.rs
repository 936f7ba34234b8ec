//! WindowManager - owns every open window and the rules that move them.
//!
//! All operations are synchronous and run to completion. Operations that
//! target an unknown id, or that a window's flags or state forbid, are silent
//! no-ops: UI events routinely race with window closure, and a burst of them
//! must never take the desktop down.
//!
//! State changes are reported as `WindowEvent`s queued on the manager; the
//! owner drains them after each call and routes them to the taskbar and the
//! app host.

pub mod interaction;
pub mod mount;

use std::collections::HashMap;

use rand::Rng;
use shared_types::{
    ContentHandle, Geometry, SavedGeometry, SizeConstraints, Viewport, WindowEntity, WindowEvent,
    WindowFlags, WindowStatus,
};

use crate::config::DesktopConfig;
use crate::error::DesktopError;

pub use interaction::{
    InteractionKind, InteractionSession, PointerPhase, PointerSample, PointerSource,
};
pub use mount::{MemoryContainer, MountContainer};

use interaction::clamp_axis;

/// Options for `create_window`. Unset sizes fall back to the configured
/// defaults; unset positions are chosen pseudo-randomly.
#[derive(Debug, Clone, Default)]
pub struct WindowOptions {
    pub id: String,
    pub title: String,
    /// Initial markup for the content region
    pub content: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub min_width: Option<i32>,
    pub min_height: Option<i32>,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub flags: WindowFlags,
    pub app_id: Option<String>,
    /// Icon class for the title bar
    pub logo: Option<String>,
}

impl WindowOptions {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn size(mut self, width: i32, height: i32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn min_size(mut self, min_width: i32, min_height: i32) -> Self {
        self.min_width = Some(min_width);
        self.min_height = Some(min_height);
        self
    }

    pub fn max_size(mut self, max_width: Option<i32>, max_height: Option<i32>) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn position(mut self, x: i32, y: i32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.flags.resizable = resizable;
        self
    }

    pub fn closable(mut self, closable: bool) -> Self {
        self.flags.closable = closable;
        self
    }

    pub fn minimizable(mut self, minimizable: bool) -> Self {
        self.flags.minimizable = minimizable;
        self
    }

    pub fn maximizable(mut self, maximizable: bool) -> Self {
        self.flags.maximizable = maximizable;
        self
    }
}

/// Owner of all window entities
pub struct WindowManager {
    windows: HashMap<String, WindowEntity>,
    active_window: Option<String>,
    viewport: Viewport,
    taskbar_height: i32,
    next_z_index: u32,
    z_index_base: u32,
    z_index_ceiling: u32,
    next_generation: u64,
    default_size: (i32, i32),
    default_min_size: (i32, i32),
    interaction: Option<InteractionSession>,
    container: Box<dyn MountContainer>,
    pending: Vec<WindowEvent>,
}

impl std::fmt::Debug for WindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager")
            .field("windows", &self.windows.len())
            .field("active_window", &self.active_window)
            .field("viewport", &self.viewport)
            .field("next_z_index", &self.next_z_index)
            .field("interaction", &self.interaction)
            .finish()
    }
}

impl WindowManager {
    /// Build a manager over `container`. A missing container is the one
    /// fatal condition and is only checked here.
    pub fn new(
        config: &DesktopConfig,
        container: Box<dyn MountContainer>,
    ) -> Result<Self, DesktopError> {
        if !container.is_attached() {
            return Err(DesktopError::ContainerMissing);
        }

        Ok(Self {
            windows: HashMap::new(),
            active_window: None,
            viewport: config.viewport,
            taskbar_height: config.taskbar_height,
            next_z_index: config.z_index_base,
            z_index_base: config.z_index_base,
            z_index_ceiling: config.z_index_ceiling,
            next_generation: 0,
            default_size: (config.default_width, config.default_height),
            default_min_size: (config.default_min_width, config.default_min_height),
            interaction: None,
            container,
            pending: Vec::new(),
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create and activate a window. If `options.id` is already open the
    /// call focuses that window instead and returns it unchanged.
    pub fn create_window(&mut self, options: WindowOptions) -> WindowEntity {
        if let Some(existing) = self.windows.get(&options.id).cloned() {
            tracing::debug!(window_id = %existing.id, "Window already open; focusing instead");
            self.focus_window(&existing.id);
            return self.windows.get(&existing.id).cloned().unwrap_or(existing);
        }

        let constraints = SizeConstraints {
            min_width: options.min_width.unwrap_or(self.default_min_size.0),
            min_height: options.min_height.unwrap_or(self.default_min_size.1),
            max_width: options.max_width,
            max_height: options.max_height,
        };
        let width = constraints.clamp_width(options.width.unwrap_or(self.default_size.0));
        let height = constraints.clamp_height(options.height.unwrap_or(self.default_size.1));
        let x = options
            .x
            .unwrap_or_else(|| random_offset(self.viewport.width, width, 100));
        let y = options
            .y
            .unwrap_or_else(|| random_offset(self.viewport.height, height, 150));

        self.next_generation += 1;
        let content = ContentHandle {
            window_id: options.id.clone(),
            region_id: format!("{}-content", options.id),
            generation: self.next_generation,
        };
        let z_index = self.next_z();

        let window = WindowEntity {
            id: options.id.clone(),
            title: options.title,
            geometry: Geometry::new(x, y, width, height),
            constraints,
            flags: options.flags,
            z_index,
            status: WindowStatus::Normal,
            saved: SavedGeometry::default(),
            app_id: options.app_id,
            logo: options.logo,
            content,
            closing: false,
        };

        self.container.mount(&window.content, &options.content);
        self.windows.insert(window.id.clone(), window.clone());

        tracing::info!(
            window_id = %window.id,
            app_id = ?window.app_id,
            z_index = window.z_index,
            "Window opened"
        );

        self.emit(WindowEvent::Opened {
            window: window.clone(),
        });
        self.active_window = Some(window.id.clone());
        self.emit(WindowEvent::Focused {
            window_id: window.id.clone(),
        });

        window
    }

    /// Bring a window to the front and make it active.
    ///
    /// Minimized windows are not focusable; callers restore them instead.
    pub fn focus_window(&mut self, window_id: &str) {
        match self.windows.get(window_id) {
            Some(window) if window.is_visible() => {}
            Some(_) => {
                tracing::debug!(window_id, "Ignoring focus of hidden or closing window");
                return;
            }
            None => {
                tracing::debug!(window_id, "Ignoring focus of unknown window");
                return;
            }
        }

        let z_index = self.next_z();
        if let Some(window) = self.windows.get_mut(window_id) {
            window.z_index = z_index;
        }
        self.active_window = Some(window_id.to_string());
        self.emit(WindowEvent::Focused {
            window_id: window_id.to_string(),
        });
    }

    pub fn minimize_window(&mut self, window_id: &str) {
        let Some(window) = self.windows.get_mut(window_id) else {
            tracing::debug!(window_id, "Ignoring minimize of unknown window");
            return;
        };
        if !window.flags.minimizable || window.closing || window.is_minimized() {
            tracing::debug!(window_id, status = ?window.status, "Minimize not allowed");
            return;
        }

        window.saved.pre_minimize = Some(window.status);
        window.status = WindowStatus::Minimized;
        let z_index = window.z_index;

        self.drop_interaction_on(window_id);
        self.emit(WindowEvent::Minimized {
            window_id: window_id.to_string(),
        });

        if self.active_window.as_deref() == Some(window_id) {
            self.focus_successor(window_id, z_index);
        }
    }

    /// Toggle maximize: Normal windows fill the viewport, Maximized windows
    /// return to their saved geometry.
    pub fn maximize_window(&mut self, window_id: &str) {
        match self.windows.get(window_id).map(|w| w.status) {
            Some(WindowStatus::Normal) => self.maximize(window_id),
            Some(WindowStatus::Maximized) => self.restore_from_maximize(window_id),
            Some(WindowStatus::Minimized) => {
                tracing::debug!(window_id, "Ignoring maximize of minimized window");
            }
            None => tracing::debug!(window_id, "Ignoring maximize of unknown window"),
        }
    }

    fn maximize(&mut self, window_id: &str) {
        let full = self.maximized_geometry();
        let Some(window) = self.windows.get_mut(window_id) else {
            return;
        };
        if !window.flags.maximizable || window.closing {
            tracing::debug!(window_id, "Maximize not allowed");
            return;
        }

        window.saved.pre_maximize = Some(window.geometry);
        window.geometry = full;
        window.status = WindowStatus::Maximized;

        self.drop_interaction_on(window_id);
        self.emit(WindowEvent::MaximizeToggled {
            window_id: window_id.to_string(),
            maximized: true,
        });
    }

    /// Leave Maximized and reapply the geometry captured when maximizing
    pub fn restore_from_maximize(&mut self, window_id: &str) {
        let Some(window) = self.windows.get_mut(window_id) else {
            tracing::debug!(window_id, "Ignoring restore of unknown window");
            return;
        };
        if !window.is_maximized() || window.closing {
            return;
        }

        if let Some(saved) = window.saved.pre_maximize.take() {
            window.geometry = saved;
        }
        window.status = WindowStatus::Normal;

        self.emit(WindowEvent::MaximizeToggled {
            window_id: window_id.to_string(),
            maximized: false,
        });
    }

    /// Reveal a minimized window in the state it was minimized from, then
    /// focus it. On a window that is not minimized this only focuses.
    pub fn restore_window(&mut self, window_id: &str) {
        let full = self.maximized_geometry();
        let Some(window) = self.windows.get_mut(window_id) else {
            tracing::debug!(window_id, "Ignoring restore of unknown window");
            return;
        };
        if window.closing {
            return;
        }

        if window.is_minimized() {
            let target = window.saved.pre_minimize.take().unwrap_or_default();
            window.status = target;
            if target == WindowStatus::Maximized {
                // The viewport may have changed while hidden
                window.geometry = full;
            }
            self.emit(WindowEvent::Restored {
                window_id: window_id.to_string(),
                status: target,
            });
        }

        self.focus_window(window_id);
    }

    /// Start the closing transition. Returns the window's generation, which
    /// `finish_close` must be called with.
    pub fn begin_close(&mut self, window_id: &str) -> Option<u64> {
        let Some(window) = self.windows.get_mut(window_id) else {
            tracing::debug!(window_id, "Ignoring close of unknown window");
            return None;
        };
        if !window.flags.closable || window.closing {
            tracing::debug!(window_id, "Close not allowed");
            return None;
        }

        window.closing = true;
        let generation = window.content.generation;

        self.drop_interaction_on(window_id);
        self.emit(WindowEvent::Closing {
            window_id: window_id.to_string(),
        });
        Some(generation)
    }

    /// Discard a closing window. Returns false when the window is gone or a
    /// different window now holds the id.
    pub fn finish_close(&mut self, window_id: &str, generation: u64) -> bool {
        match self.windows.get(window_id) {
            Some(window) if window.closing && window.content.generation == generation => {}
            _ => {
                tracing::debug!(window_id, generation, "Stale close completion ignored");
                return false;
            }
        }

        let Some(window) = self.windows.remove(window_id) else {
            return false;
        };
        self.container.unmount(window_id);
        self.drop_interaction_on(window_id);

        tracing::info!(window_id, "Window closed");
        self.emit(WindowEvent::Closed {
            window_id: window_id.to_string(),
        });

        if self.active_window.as_deref() == Some(window_id) {
            self.focus_successor(window_id, window.z_index);
        }
        true
    }

    /// Close without a transition
    pub fn close_window(&mut self, window_id: &str) {
        if let Some(generation) = self.begin_close(window_id) {
            self.finish_close(window_id, generation);
        }
    }

    /// Start closing every closable window, front to back
    pub fn begin_close_all(&mut self) -> Vec<(String, u64)> {
        self.ids_by_z_desc()
            .into_iter()
            .filter_map(|id| self.begin_close(&id).map(|generation| (id, generation)))
            .collect()
    }

    pub fn close_all_windows(&mut self) {
        for (id, generation) in self.begin_close_all() {
            self.finish_close(&id, generation);
        }
    }

    pub fn minimize_all_windows(&mut self) {
        for id in self.ids_by_z_desc() {
            self.minimize_window(&id);
        }
    }

    /// Bring the visible window lowest in the stack to the front. Repeated
    /// calls rotate through every visible window.
    pub fn switch_window(&mut self) {
        let mut visible: Vec<(u32, String)> = self
            .windows
            .values()
            .filter(|w| w.is_visible())
            .map(|w| (w.z_index, w.id.clone()))
            .collect();
        if visible.len() <= 1 {
            return;
        }
        visible.sort();
        let (_, bottom) = visible.swap_remove(0);
        self.focus_window(&bottom);
    }

    // ========================================================================
    // Pointer Interaction
    // ========================================================================

    /// Start dragging a window by its title region. Also focuses it.
    pub fn begin_drag(&mut self, window_id: &str, sample: PointerSample) {
        self.end_interaction();
        let Some(window) = self.windows.get(window_id) else {
            return;
        };
        if !window.is_visible() || window.is_maximized() {
            tracing::debug!(window_id, "Drag not allowed");
            return;
        }

        self.focus_window(window_id);
        if let Some(window) = self.windows.get(window_id) {
            self.interaction = Some(InteractionSession::drag(window, sample));
        }
    }

    /// Start resizing a window from its resize handle. Also focuses it.
    pub fn begin_resize(&mut self, window_id: &str, sample: PointerSample) {
        self.end_interaction();
        let Some(window) = self.windows.get(window_id) else {
            return;
        };
        if !window.flags.resizable || !window.is_visible() || window.is_maximized() {
            tracing::debug!(window_id, "Resize not allowed");
            return;
        }

        self.focus_window(window_id);
        if let Some(window) = self.windows.get(window_id) {
            self.interaction = Some(InteractionSession::resize(window, sample));
        }
    }

    pub fn pointer_move(&mut self, sample: PointerSample) {
        let Some(session) = self.interaction.as_mut() else {
            return;
        };
        if session.source != sample.source {
            return;
        }

        let window = self
            .windows
            .get(&session.window_id)
            .filter(|w| session_still_valid(w, session));
        match window {
            Some(window) => {
                session.apply(sample, self.viewport, &window.constraints);
            }
            None => {
                tracing::debug!(window_id = %session.window_id, "Window gone mid-interaction");
                self.interaction = None;
            }
        }
    }

    /// End the session and persist its geometry
    pub fn pointer_up(&mut self, source: PointerSource) {
        if self
            .interaction
            .as_ref()
            .is_some_and(|session| session.source == source)
        {
            self.end_interaction();
        }
    }

    /// Lost pointer capture: same as a pointer-up at the last known position
    pub fn pointer_cancel(&mut self, source: PointerSource) {
        self.pointer_up(source);
    }

    /// Route a raw pointer event. `target` is only consulted on `Down`.
    pub fn handle_pointer(
        &mut self,
        phase: PointerPhase,
        sample: PointerSample,
        target: Option<(&str, InteractionKind)>,
    ) {
        match phase {
            PointerPhase::Down => match target {
                Some((window_id, InteractionKind::Drag)) => self.begin_drag(window_id, sample),
                Some((window_id, InteractionKind::Resize)) => {
                    self.begin_resize(window_id, sample)
                }
                None => {}
            },
            PointerPhase::Move => self.pointer_move(sample),
            PointerPhase::Up => self.pointer_up(sample.source),
            PointerPhase::Cancel => self.pointer_cancel(sample.source),
        }
    }

    fn end_interaction(&mut self) {
        let Some(session) = self.interaction.take() else {
            return;
        };
        let Some(window) = self
            .windows
            .get_mut(&session.window_id)
            .filter(|w| session_still_valid(w, &session))
        else {
            return;
        };

        window.geometry = session.preview;
        let event = match session.kind {
            InteractionKind::Drag => WindowEvent::Moved {
                window_id: session.window_id.clone(),
                x: session.preview.x,
                y: session.preview.y,
            },
            InteractionKind::Resize => WindowEvent::Resized {
                window_id: session.window_id.clone(),
                width: session.preview.width,
                height: session.preview.height,
            },
        };
        if session.changed() {
            self.emit(event);
        }
    }

    fn drop_interaction_on(&mut self, window_id: &str) {
        if self
            .interaction
            .as_ref()
            .is_some_and(|session| session.window_id == window_id)
        {
            self.interaction = None;
        }
    }

    // ========================================================================
    // Environment
    // ========================================================================

    /// React to a new viewport size: maximized windows refit, the rest are
    /// pulled back inside the area above the taskbar.
    pub fn handle_viewport_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let full = self.maximized_geometry();
        let usable_height = viewport.height - self.taskbar_height;
        let mut events = Vec::new();

        for window in self.windows.values_mut() {
            match window.status {
                WindowStatus::Maximized => {
                    if window.geometry != full {
                        window.geometry = full;
                        events.push(WindowEvent::Resized {
                            window_id: window.id.clone(),
                            width: full.width,
                            height: full.height,
                        });
                    }
                }
                WindowStatus::Normal | WindowStatus::Minimized => {
                    let x = clamp_axis(window.geometry.x, window.geometry.width, viewport.width);
                    let y = clamp_axis(window.geometry.y, window.geometry.height, usable_height);
                    if (x, y) != (window.geometry.x, window.geometry.y) {
                        window.geometry.x = x;
                        window.geometry.y = y;
                        events.push(WindowEvent::Moved {
                            window_id: window.id.clone(),
                            x,
                            y,
                        });
                    }
                }
            }
        }

        // An in-flight drag or resize commits its preview on pointer-up
        if let Some(session) = self.interaction.as_mut() {
            session.reclamp(viewport.width, usable_height);
        }

        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            reclamped = events.len(),
            "Viewport resized"
        );
        for event in events {
            self.emit(event);
        }
    }

    /// Write application content into a window's region. Fails when the
    /// window is gone or the handle belongs to an earlier window with the
    /// same id.
    pub fn write_content(&mut self, handle: &ContentHandle, content: &str) -> bool {
        let current = self
            .windows
            .get(&handle.window_id)
            .is_some_and(|w| w.content == *handle);
        if !current || !self.container.write(handle, content) {
            return false;
        }
        self.emit(WindowEvent::ContentMounted {
            window_id: handle.window_id.clone(),
        });
        true
    }

    pub fn read_content(&self, window_id: &str) -> Option<String> {
        self.windows
            .contains_key(window_id)
            .then(|| self.container.read(window_id))
            .flatten()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_window(&self, window_id: &str) -> Option<&WindowEntity> {
        self.windows.get(window_id)
    }

    /// All windows, back to front
    pub fn get_all_windows(&self) -> Vec<WindowEntity> {
        let mut windows: Vec<_> = self.windows.values().cloned().collect();
        windows.sort_by_key(|w| w.z_index);
        windows
    }

    /// Non-minimized windows, back to front
    pub fn get_visible_windows(&self) -> Vec<WindowEntity> {
        let mut windows: Vec<_> = self
            .windows
            .values()
            .filter(|w| w.is_visible())
            .cloned()
            .collect();
        windows.sort_by_key(|w| w.z_index);
        windows
    }

    pub fn find_by_app(&self, app_id: &str) -> Option<&WindowEntity> {
        self.windows
            .values()
            .filter(|w| w.app_id.as_deref() == Some(app_id) && !w.closing)
            .max_by_key(|w| w.z_index)
    }

    pub fn active_window(&self) -> Option<&str> {
        self.active_window.as_deref()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn interaction(&self) -> Option<&InteractionSession> {
        self.interaction.as_ref()
    }

    /// Where a window is drawn right now: the live preview while it is being
    /// dragged or resized, its committed geometry otherwise
    pub fn display_geometry(&self, window_id: &str) -> Option<Geometry> {
        if let Some(session) = self
            .interaction
            .as_ref()
            .filter(|session| session.window_id == window_id)
        {
            return Some(session.preview);
        }
        self.windows.get(window_id).map(|w| w.geometry)
    }

    /// Take the notifications queued since the last drain
    pub fn drain_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.pending)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn emit(&mut self, event: WindowEvent) {
        self.pending.push(event);
    }

    fn maximized_geometry(&self) -> Geometry {
        Geometry::new(
            0,
            0,
            self.viewport.width,
            (self.viewport.height - self.taskbar_height).max(0),
        )
    }

    /// Get next z-index and increment counter, compacting first when the
    /// counter reaches its ceiling
    fn next_z(&mut self) -> u32 {
        if self.next_z_index >= self.z_index_ceiling {
            self.compact_z_order();
        }
        let z = self.next_z_index;
        self.next_z_index = self.next_z_index.saturating_add(1);
        z
    }

    /// Renumber all windows from the base, keeping their relative order
    fn compact_z_order(&mut self) {
        let mut order: Vec<(u32, String)> = self
            .windows
            .values()
            .map(|w| (w.z_index, w.id.clone()))
            .collect();
        order.sort();

        let mut z = self.z_index_base;
        for (_, id) in &order {
            if let Some(window) = self.windows.get_mut(id) {
                window.z_index = z;
            }
            z += 1;
        }
        self.next_z_index = z;

        tracing::debug!(windows = order.len(), next_z_index = z, "Compacted z-order");
    }

    fn ids_by_z_desc(&self) -> Vec<String> {
        let mut order: Vec<(u32, String)> = self
            .windows
            .values()
            .map(|w| (w.z_index, w.id.clone()))
            .collect();
        order.sort_by(|a, b| b.cmp(a));
        order.into_iter().map(|(_, id)| id).collect()
    }

    /// Activate the visible window that follows the departing one in
    /// descending z-order, wrapping around to the top. Clears the active
    /// window if nothing is visible.
    fn focus_successor(&mut self, departing_id: &str, departing_z: u32) {
        let candidates: Vec<(u32, &str)> = self
            .windows
            .values()
            .filter(|w| w.id != departing_id && w.is_visible())
            .map(|w| (w.z_index, w.id.as_str()))
            .collect();

        let next = candidates
            .iter()
            .filter(|(z, _)| *z < departing_z)
            .max()
            .or_else(|| candidates.iter().max())
            .map(|(_, id)| id.to_string());

        match next {
            Some(next) => self.focus_window(&next),
            None => {
                self.active_window = None;
                self.emit(WindowEvent::ActiveCleared);
            }
        }
    }
}

fn session_still_valid(window: &WindowEntity, session: &InteractionSession) -> bool {
    window.content.generation == session.generation && window.is_visible() && !window.is_maximized()
}

/// Pseudo-random offset that keeps a window off the edges: `[50, 50 + room)`
/// where room is what is left of the extent after the window and `margin`.
fn random_offset(extent: i32, size: i32, margin: i32) -> i32 {
    let room = extent - size - margin;
    if room <= 0 {
        return 0;
    }
    50 + rand::rng().random_range(0..room)
}

// ============================================================================
// Tests
// ============================================================================
