//! A safe, generic facade over the raw allocator for the common case of a
//! single concrete payload type.
//!
//! `Handle<T>` owns one burrow sized and aligned for a `T`. It does not
//! implement [`Drop`]: per spec, a burrow's lifetime is governed entirely
//! by the reference graph, not by Rust's ownership/scope rules, so a
//! `Handle` that is simply let go of without calling `free`/`discard`
//! leaks, exactly as a raw payload pointer would. [`crate::local::Local`]
//! is the scope-guard type for callers who want `discard_local` semantics.

use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use crate::header::Destructor;
use crate::raw;

/// An owned, type-tagged burrow holding a `T`.
pub struct Handle<T> {
    payload: NonNull<u8>,
    marker: PhantomData<T>,
}

unsafe fn drop_shim<T>(payload: NonNull<u8>) -> i32 {
    unsafe {
        payload.cast::<T>().as_ptr().drop_in_place();
        0
    }
}

impl<T> Handle<T> {
    /// Allocate a new, rootless burrow holding `value`.
    ///
    /// Returns `None` if the underlying storage allocator reports
    /// failure, in which case `value` is returned back to the caller
    /// undropped.
    pub fn new(value: T) -> Result<Self, T> {
        Self::new_with_parent(None, value)
    }

    /// Allocate a new burrow holding `value` as a child of `parent`, attached
    /// as part of the allocation.
    ///
    /// Returns `None` on allocator failure, same as [`Handle::new`].
    pub fn new_child<P>(parent: &Handle<P>, value: T) -> Result<Self, T> {
        Self::new_with_parent(Some(parent.payload), value)
    }

    fn new_with_parent(parent: Option<NonNull<u8>>, value: T) -> Result<Self, T> {
        unsafe {
            let Some(payload) = raw::allocate(parent, mem::size_of::<T>()) else {
                return Err(value);
            };
            payload.cast::<T>().as_ptr().write(value);
            raw::set_destructor(payload, Some(drop_shim::<T> as Destructor));
            Ok(Self {
                payload,
                marker: PhantomData,
            })
        }
    }

    /// Borrow the payload.
    #[must_use]
    pub fn get(&self) -> &T {
        unsafe { self.payload.cast::<T>().as_ref() }
    }

    /// Mutably borrow the payload.
    #[must_use]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { self.payload.cast::<T>().as_mut() }
    }

    /// The raw payload pointer backing this handle, for interop with the
    /// raw API (e.g. to `ref_`/`unref` against a handle obtained from
    /// elsewhere).
    #[must_use]
    pub fn payload(&self) -> NonNull<u8> {
        self.payload
    }

    /// Add a reference edge from this burrow to `child`.
    pub fn ref_to<C>(&self, child: &Handle<C>) {
        unsafe {
            raw::ref_(self.payload, child.payload);
        }
    }

    /// Remove the reference edge from this burrow to `child`.
    pub fn unref_from<C>(&self, child: &Handle<C>) {
        unsafe {
            raw::unref(self.payload, child.payload);
        }
    }

    /// True if this burrow currently has at least one parent.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        unsafe { raw::has_parent(self.payload, None) }
    }

    /// True if this burrow currently has `parent` specifically as a parent.
    #[must_use]
    pub fn has_parent_in<P>(&self, parent: &Handle<P>) -> bool {
        unsafe { raw::has_parent(self.payload, Some(parent.payload)) }
    }

    /// Unconditionally destroy this burrow, running `T`'s destructor and
    /// cascading to every child left without a remaining parent.
    ///
    /// The raw API's destructor result code is discarded here: `T`'s drop
    /// glue has no notion of a meaningful return value, unlike the untyped
    /// destructor contract the raw API exposes.
    pub fn free(self) {
        let payload = self.payload;
        mem::forget(self);
        unsafe {
            raw::free(payload);
        }
    }

    /// Destroy this burrow only if it currently has no parents.
    pub fn discard(self) {
        let payload = self.payload;
        mem::forget(self);
        unsafe {
            raw::discard(payload);
        }
    }
}
