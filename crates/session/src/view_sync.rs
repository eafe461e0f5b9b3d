use foundation::CameraPose;
use tracing::trace;

/// A map renderer that can be moved to a pose.
pub trait BaseMap {
    /// Moves the camera immediately, without any transition.
    fn jump_to(&mut self, pose: CameraPose);
}

/// Mirrors overlay camera changes onto the base map.
///
/// One-directional: the base map never drives the overlay.
#[derive(Debug)]
pub struct ViewSync<B: BaseMap> {
    base_map: B,
    synced: u64,
}

impl<B: BaseMap> ViewSync<B> {
    pub fn new(base_map: B) -> Self {
        Self {
            base_map,
            synced: 0,
        }
    }

    pub fn on_view_state_change(&mut self, pose: CameraPose) {
        self.synced = self.synced.wrapping_add(1);
        trace!(
            lon = pose.longitude,
            lat = pose.latitude,
            zoom = pose.zoom,
            "syncing base map"
        );
        self.base_map.jump_to(pose);
    }

    pub fn synced_count(&self) -> u64 {
        self.synced
    }

    pub fn base_map(&self) -> &B {
        &self.base_map
    }

    pub fn base_map_mut(&mut self) -> &mut B {
        &mut self.base_map
    }
}
