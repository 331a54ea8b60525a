use uuid::Uuid;

/// Lifecycle state of a source or a layer.
///
/// A component starts as `Unregistered`, becomes `Registered` when it is added to the engine
/// (which only happens after the map has loaded), and ends as `Disposed` when it is unmounted or
/// its map is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationState {
    /// Mounted, but not added to the engine yet.
    Unregistered,
    /// Added to the engine.
    Registered,
    /// Unmounted.
    Disposed,
}

/// Generates an id that is unique within the process, e.g. `layer-5f0c...`.
pub(crate) fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}
