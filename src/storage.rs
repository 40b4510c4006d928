//! Pluggable raw byte storage.
//!
//! Three function-pointer slots back every allocation in this crate:
//! `alloc`, `realloc`, and `free`. They default to the platform's byte
//! allocator (`alloc::alloc`'s global allocator) and may be replaced
//! wholesale with [`set_allocator`].
//!
//! These slots are process-wide configuration, not per-call state: per
//! spec, they are meant to be set once, before the first allocation, and
//! never mutated afterward. Replacing them while burrows already exist is
//! undefined, and nothing here synchronizes concurrent access to them —
//! consistent with the rest of this crate, which is not thread-safe.

use alloc::alloc::{alloc, dealloc, realloc, Layout};
use core::cell::UnsafeCell;
use core::mem;
use core::ptr;

use crate::header::Header;

/// Acquire a block of at least `size` bytes, or return null on failure.
pub type RawAlloc = unsafe fn(size: usize) -> *mut u8;

/// Resize the block at `ptr` (previously of `old_size` bytes) to at least
/// `new_size` bytes, preserving its leading `min(old_size, new_size)`
/// bytes, or return null on failure without freeing `ptr`.
///
/// Unlike C's `realloc`, the old size must be supplied: Rust's allocator
/// API requires a `Layout` (size and alignment) to deallocate or resize a
/// block, whereas C's allocator tracks a block's size internally. Every
/// caller in this crate already has the old size in the burrow's header,
/// so this is a zero-cost adaptation of the contract, not a behavior
/// change.
pub type RawRealloc = unsafe fn(ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8;

/// Release the block at `ptr`, which was `size` bytes.
pub type RawFree = unsafe fn(ptr: *mut u8, size: usize);

struct Slots {
    alloc: RawAlloc,
    realloc: RawRealloc,
    free: RawFree,
}

// The slots are plain function pointers guarded by no lock, matching the
// "process-wide configuration, no synchronization" contract. Wrapping them
// in `UnsafeCell` and asserting `Sync` is sound under that contract: callers
// are required not to mutate this cell concurrently with readers.
struct SlotsCell(UnsafeCell<Slots>);

// SAFETY: access is documented as the caller's responsibility; this crate
// is itself `!Send`/`!Sync` everywhere it matters (raw pointers), so the
// only way to race this cell is to call `set_allocator` from a second
// thread while burrows are live on a first, which the contract forbids.
unsafe impl Sync for SlotsCell {}

static SLOTS: SlotsCell = SlotsCell(UnsafeCell::new(Slots {
    alloc: default_alloc,
    realloc: default_realloc,
    free: default_free,
}));

fn block_layout(size: usize) -> Layout {
    // SAFETY: `align_of::<Header>()` is a power of two by construction, and
    // `size` is bounded by allocations this crate already performed or is
    // about to attempt, which never overflow `isize` in practice on
    // supported targets.
    Layout::from_size_align(size, mem::align_of::<Header>())
        .expect("burrow: block size overflows address space")
}

unsafe fn default_alloc(size: usize) -> *mut u8 {
    unsafe { alloc(block_layout(size)) }
}

unsafe fn default_realloc(ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
    unsafe { realloc(ptr, block_layout(old_size), new_size) }
}

unsafe fn default_free(ptr: *mut u8, size: usize) {
    unsafe { dealloc(ptr, block_layout(size)) }
}

/// Replace all three storage slots at once.
///
/// # Safety
///
/// The replacement functions must implement the contracts of [`RawAlloc`],
/// [`RawRealloc`], and [`RawFree`] exactly, and this function must be
/// called before any burrow is allocated (or after every burrow allocated
/// under the previous slots has been freed) — mixing allocations and frees
/// across different slot configurations is undefined, as is calling this
/// function from more than one thread or while another thread holds live
/// burrows.
pub unsafe fn set_allocator(alloc: RawAlloc, realloc: RawRealloc, free: RawFree) {
    unsafe {
        *SLOTS.0.get() = Slots {
            alloc,
            realloc,
            free,
        };
    }
}

pub(crate) unsafe fn call_alloc(size: usize) -> *mut u8 {
    unsafe { ((*SLOTS.0.get()).alloc)(size) }
}

pub(crate) unsafe fn call_realloc(ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
    unsafe { ((*SLOTS.0.get()).realloc)(ptr, old_size, new_size) }
}

pub(crate) unsafe fn call_free(ptr: *mut u8, size: usize) {
    unsafe { ((*SLOTS.0.get()).free)(ptr, size) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alloc_round_trips() {
        unsafe {
            let ptr = call_alloc(64);
            assert!(!ptr.is_null());
            ptr::write_bytes(ptr, 0xAB, 64);
            let ptr = call_realloc(ptr, 64, 128);
            assert!(!ptr.is_null());
            call_free(ptr, 128);
        }
    }
}
