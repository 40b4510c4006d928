//! Scope-guarded discard.
//!
//! [`Local`] is the idiomatic expression of `discard_local`: a burrow that
//! should be destroyed automatically if it is never given a parent before
//! the end of the current scope, but left alone if it is (the reference
//! graph, not the guard, then owns its lifetime).

use core::ptr::NonNull;

use crate::raw;

/// Owns a payload pointer and discards it on drop, unless [`Local::into_raw`]
/// has released it first.
pub struct Local {
    payload: Option<NonNull<u8>>,
}

impl Local {
    /// Wrap `payload` in a scope guard that will `discard` it on drop.
    ///
    /// # Safety
    ///
    /// `payload` must have been returned by `allocate`/`resize` and not yet
    /// freed.
    #[must_use]
    pub unsafe fn new(payload: NonNull<u8>) -> Self {
        Self {
            payload: Some(payload),
        }
    }

    /// Release the guarded payload without discarding it, returning it to
    /// the caller.
    #[must_use]
    pub fn into_raw(mut self) -> NonNull<u8> {
        self.payload.take().expect("burrow: Local payload already taken")
    }
}

impl Drop for Local {
    fn drop(&mut self) {
        if let Some(payload) = self.payload.take() {
            unsafe {
                raw::discard(payload);
            }
        }
    }
}

/// Discard `*slot` if it holds a payload, then clear `*slot`.
///
/// This takes a `&mut Option<NonNull<u8>>` rather than a bare pointer so
/// the slot itself is always left in a well-defined, empty state
/// afterward — a safety improvement over a literal pointer-in/pointer-out
/// translation, which would leave the caller's variable holding a
/// dangling pointer unless it remembered to null it out itself.
pub fn discard_local(slot: &mut Option<NonNull<u8>>) {
    if let Some(payload) = slot.take() {
        unsafe {
            raw::discard(payload);
        }
    }
}
