// ABOUTME: Sealed trait pattern for runtime capability traits.
// ABOUTME: Only runtimes defined in this crate can implement the gateway.

/// Supertrait of every capability trait.
///
/// New gateway methods can be added without breaking downstream code because
/// nothing outside the crate can implement `Sealed`.
pub trait Sealed {}
