//! Stack growth for the evaluator's native recursion.
//!
//! Script evaluation recurses through commands and procedures; the
//! configured call and eval depth limits decide when that stops, so the
//! host stack is grown on demand instead of overflowing first.

/// Runs `f`, growing the stack first if less than the red zone remains.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
