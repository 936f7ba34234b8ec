//! Mount container - where window bodies and their content regions live.
//!
//! The environment provides the real container (a DOM node, a GPU surface,
//! ...). `MemoryContainer` keeps content as strings and is what headless runs
//! and tests use.

use std::collections::HashMap;

use shared_types::ContentHandle;

/// Container the window manager mounts windows into
pub trait MountContainer: Send {
    /// Whether the container exists at all. Checked once at startup.
    fn is_attached(&self) -> bool;

    /// Create the window body and its content region with initial content
    fn mount(&mut self, handle: &ContentHandle, initial: &str);

    /// Replace a region's content. Returns false when the region no longer
    /// exists or belongs to a different generation.
    fn write(&mut self, handle: &ContentHandle, content: &str) -> bool;

    /// Remove a window body and its region
    fn unmount(&mut self, window_id: &str);

    fn contains(&self, handle: &ContentHandle) -> bool;

    fn read(&self, window_id: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
struct Region {
    region_id: String,
    generation: u64,
    content: String,
}

/// In-memory container
#[derive(Debug, Default)]
pub struct MemoryContainer {
    regions: HashMap<String, Region>,
    detached: bool,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A container that reports itself missing
    pub fn detached() -> Self {
        Self {
            regions: HashMap::new(),
            detached: true,
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn region(&self, handle: &ContentHandle) -> Option<&Region> {
        self.regions
            .get(&handle.window_id)
            .filter(|r| r.generation == handle.generation && r.region_id == handle.region_id)
    }
}

impl MountContainer for MemoryContainer {
    fn is_attached(&self) -> bool {
        !self.detached
    }

    fn mount(&mut self, handle: &ContentHandle, initial: &str) {
        self.regions.insert(
            handle.window_id.clone(),
            Region {
                region_id: handle.region_id.clone(),
                generation: handle.generation,
                content: initial.to_string(),
            },
        );
    }

    fn write(&mut self, handle: &ContentHandle, content: &str) -> bool {
        if self.region(handle).is_none() {
            return false;
        }
        match self.regions.get_mut(&handle.window_id) {
            Some(region) => {
                region.content = content.to_string();
                true
            }
            None => false,
        }
    }

    fn unmount(&mut self, window_id: &str) {
        self.regions.remove(window_id);
    }

    fn contains(&self, handle: &ContentHandle) -> bool {
        self.region(handle).is_some()
    }

    fn read(&self, window_id: &str) -> Option<String> {
        self.regions.get(window_id).map(|r| r.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str, generation: u64) -> ContentHandle {
        ContentHandle {
            window_id: id.to_string(),
            region_id: format!("{id}-content"),
            generation,
        }
    }

    #[test]
    fn test_write_requires_matching_generation() {
        let mut container = MemoryContainer::new();
        container.mount(&handle("w1", 1), "loading");

        assert!(!container.write(&handle("w1", 2), "stale"));
        assert_eq!(container.read("w1").as_deref(), Some("loading"));

        assert!(container.write(&handle("w1", 1), "ready"));
        assert_eq!(container.read("w1").as_deref(), Some("ready"));
    }

    #[test]
    fn test_unmount_removes_region() {
        let mut container = MemoryContainer::new();
        container.mount(&handle("w1", 1), "");
        container.unmount("w1");

        assert!(container.is_empty());
        assert!(!container.contains(&handle("w1", 1)));
        assert!(!container.write(&handle("w1", 1), "late"));
    }

    #[test]
    fn test_detached_container_reports_missing() {
        assert!(!MemoryContainer::detached().is_attached());
        assert!(MemoryContainer::new().is_attached());
    }
}
