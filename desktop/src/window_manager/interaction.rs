//! Pointer-driven drag and resize sessions.
//!
//! A session is opened on pointer-down, fed every pointer-move, and committed
//! on pointer-up or pointer-cancel. Geometry changes live in `preview` until
//! the commit; the window entity only sees the final rectangle.

use serde::{Deserialize, Serialize};
use shared_types::{Geometry, SizeConstraints, Viewport, WindowEntity};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// One pointer position report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointerSample {
    pub source: PointerSource,
    pub x: i32,
    pub y: i32,
}

impl PointerSample {
    pub fn mouse(x: i32, y: i32) -> Self {
        Self {
            source: PointerSource::Mouse,
            x,
            y,
        }
    }

    pub fn touch(x: i32, y: i32) -> Self {
        Self {
            source: PointerSource::Touch,
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Drag,
    Resize,
}

/// In-flight drag or resize of one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionSession {
    pub window_id: String,
    /// Generation of the window the session was opened on
    pub generation: u64,
    pub kind: InteractionKind,
    pub source: PointerSource,
    pub start_pointer: (i32, i32),
    pub last_pointer: (i32, i32),
    pub start_geometry: Geometry,
    pub preview: Geometry,
}

impl InteractionSession {
    pub fn drag(window: &WindowEntity, sample: PointerSample) -> Self {
        Self::open(window, sample, InteractionKind::Drag)
    }

    pub fn resize(window: &WindowEntity, sample: PointerSample) -> Self {
        Self::open(window, sample, InteractionKind::Resize)
    }

    fn open(window: &WindowEntity, sample: PointerSample, kind: InteractionKind) -> Self {
        Self {
            window_id: window.id.clone(),
            generation: window.content.generation,
            kind,
            source: sample.source,
            start_pointer: (sample.x, sample.y),
            last_pointer: (sample.x, sample.y),
            start_geometry: window.geometry,
            preview: window.geometry,
        }
    }

    /// Feed one pointer-move sample and return the updated preview.
    ///
    /// Drags move by the delta from the previous sample and stay inside the
    /// viewport. Resizes use the delta from the starting sample and respect
    /// the window's size constraints.
    pub fn apply(
        &mut self,
        sample: PointerSample,
        viewport: Viewport,
        constraints: &SizeConstraints,
    ) -> Geometry {
        match self.kind {
            InteractionKind::Drag => {
                let dx = sample.x - self.last_pointer.0;
                let dy = sample.y - self.last_pointer.1;
                self.preview.x = clamp_axis(self.preview.x + dx, self.preview.width, viewport.width);
                self.preview.y =
                    clamp_axis(self.preview.y + dy, self.preview.height, viewport.height);
            }
            InteractionKind::Resize => {
                let width = self.start_geometry.width + (sample.x - self.start_pointer.0);
                let height = self.start_geometry.height + (sample.y - self.start_pointer.1);
                self.preview.width = constraints.clamp_width(width);
                self.preview.height = constraints.clamp_height(height);
            }
        }
        self.last_pointer = (sample.x, sample.y);
        self.preview
    }

    /// Pull the preview back inside a resized area.
    pub fn reclamp(&mut self, width: i32, height: i32) {
        self.preview.x = clamp_axis(self.preview.x, self.preview.width, width);
        self.preview.y = clamp_axis(self.preview.y, self.preview.height, height);
    }

    pub fn changed(&self) -> bool {
        self.preview != self.start_geometry
    }
}

/// Clamp a position so `[pos, pos + size]` stays within `[0, extent]`. When
/// the window is larger than the extent it is pinned to 0.
pub(crate) fn clamp_axis(pos: i32, size: i32, extent: i32) -> i32 {
    pos.min(extent - size).max(0)
}
