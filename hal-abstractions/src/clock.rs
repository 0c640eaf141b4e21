//! Monotonic time source

/// Millisecond tick counter that never goes backwards
///
/// Boards back this with their monotonic timer. The count starts at
/// (or near) zero at reset; callers compare instants with wrapping
/// subtraction so the width of the underlying timer does not matter.
pub trait Monotonic {
    /// Milliseconds since boot
    fn now_ms(&self) -> u64;
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
