//! Errors reported by the layer toolkit and the watchface lifecycle

/// Failure of a toolkit or lifecycle operation.
///
/// Any of these during window load is fatal: the watchface cannot run
/// without its fonts and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No free slot left for a window, layer, font or bitmap
    Exhausted,
    /// The handle does not refer to a live object
    StaleHandle,
    /// A font or bitmap is still referenced by a live layer
    ResourceInUse,
    /// The window's root layer still has children attached
    WindowNotEmpty,
    /// The window is still on the window stack
    WindowOnStack,
    /// The layer is already attached to a parent
    AlreadyAttached,
    /// The operation does not apply to this kind of layer
    WrongLayerKind,
    /// The window handlers already ran `load` without a matching `unload`
    AlreadyLoaded,
    /// The window handlers have not run `load` yet
    NotLoaded,
}
