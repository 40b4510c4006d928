//! The raw, untyped allocator API.
//!
//! Every operation here takes and returns `NonNull<u8>` payload pointers,
//! exactly as a C allocator would. [`crate::handle::Handle`] builds a
//! safe, generic facade on top of it for the common case of a single
//! concrete payload type.

use core::ptr::NonNull;

use crate::edge::Edge;
use crate::error::fatal;
use crate::header::{Destructor, Header, State};
use crate::list::Node;
use crate::storage;

/// Allocate a new burrow of `size` payload bytes with no children and no
/// destructor. If `parent` is `Some`, attaches one edge from that parent to
/// the new burrow as part of this call; otherwise the burrow is born
/// rootless.
///
/// Returns `None` if the underlying storage allocator reports failure, in
/// which case no edge is attached and `parent` is left untouched. Passing
/// `size = 0` is permitted; the returned payload pointer is valid for
/// zero-length reads/writes, mirroring the existing-but-empty allocation
/// `malloc(0)` is permitted to return.
///
/// # Safety
///
/// `parent`, if `Some`, must have been returned by `allocate`/`resize` and
/// not yet freed.
#[must_use]
pub unsafe fn allocate(parent: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    unsafe {
        let block_size = Header::SIZE.checked_add(size)?;
        let block = storage::call_alloc(block_size);
        let block = NonNull::new(block)?;
        let header = Header::init(block, size);
        debug!("burrow: allocated {size} byte burrow at {header:p}");
        if let Some(parent) = parent {
            Edge::attach(Header::of(parent), header);
        }
        Some(Header::payload(header))
    }
}

/// Resize `payload`'s burrow to `new_size` payload bytes, preserving its
/// graph edges and destructor. If `payload` is `None`, this is equivalent to
/// `allocate(parent, new_size)`; in that case `parent` is consulted, and is
/// otherwise ignored.
///
/// Returns `None` (leaving the original allocation, if any, untouched) if
/// the underlying storage allocator reports failure. On success, returns
/// the (possibly relocated) payload pointer; every edge endpoint and the
/// destructor slot are preserved across the move.
///
/// # Safety
///
/// `payload`, if `Some`, must have been returned by `allocate`/`resize` and
/// not yet freed. `parent`, if `Some`, must have been returned by
/// `allocate`/`resize` and not yet freed.
#[must_use]
pub unsafe fn resize(
    payload: Option<NonNull<u8>>,
    parent: Option<NonNull<u8>>,
    new_size: usize,
) -> Option<NonNull<u8>> {
    unsafe {
        let Some(payload) = payload else {
            return allocate(parent, new_size);
        };
        let header = Header::of(payload);
        let old_size = (*header.as_ptr()).capacity.get();
        let old_block_size = Header::SIZE + old_size;
        let new_block_size = Header::SIZE.checked_add(new_size)?;

        // Capture both ends of each list before the move: the entries
        // themselves do not move and their mutual links stay valid, but the
        // two links that point back at the head's old address (the first
        // entry's `prev` and the last entry's `next`) must be repaired
        // without ever dereferencing that now-possibly-invalid address.
        let parents_head = Header::parents_head(header);
        let parents_ends = list_ends(parents_head);
        let children_head = Header::children_head(header);
        let children_ends = list_ends(children_head);

        let new_block = storage::call_realloc(
            header.as_ptr().cast::<u8>(),
            old_block_size,
            new_block_size,
        );
        let new_block = NonNull::new(new_block)?;
        let new_header: NonNull<Header> = new_block.cast();

        (*new_header.as_ptr()).capacity.set(new_size);
        Node::relink_head(Header::parents_head(new_header), parents_ends.0, parents_ends.1);
        Node::relink_head(Header::children_head(new_header), children_ends.0, children_ends.1);
        retarget_parents(new_header);
        retarget_children(new_header);

        debug!("burrow: resized burrow to {new_size} bytes at {new_header:p}");
        Some(Header::payload(new_header))
    }
}

unsafe fn list_ends(head: NonNull<Node>) -> (Option<NonNull<Node>>, Option<NonNull<Node>>) {
    unsafe {
        if Node::is_empty_head(head) {
            (None, None)
        } else {
            (Some(Node::next(head)), Some(Node::prev(head)))
        }
    }
}

/// After a header moves, every edge in its `parents` list still points to
/// this header as `child` with the header's *old* address; repoint each to
/// the new one.
unsafe fn retarget_parents(header: NonNull<Header>) {
    unsafe {
        let head = Header::parents_head(header);
        Node::for_each_safe(head, |entry| {
            let edge = Edge::from_parents_entry(entry);
            Edge::set_child(edge, header);
        });
    }
}

unsafe fn retarget_children(header: NonNull<Header>) {
    unsafe {
        let head = Header::children_head(header);
        Node::for_each_safe(head, |entry| {
            let edge = Edge::from_children_entry(entry);
            Edge::set_parent(edge, header);
        });
    }
}

/// Free `payload`'s burrow unconditionally: detach it from every parent,
/// run its destructor if set, then cascade-destroy every child left
/// without a remaining parent.
///
/// Returns the destructor's result code, or `0` if no destructor was set.
///
/// # Safety
///
/// `payload` must have been returned by `allocate`/`resize` and not yet
/// freed, and must not currently be in the middle of being destroyed.
pub unsafe fn free(payload: NonNull<u8>) -> i32 {
    unsafe { destroy(Header::of(payload)) }
}

/// The five-step destruction protocol, shared by `free`, `discard`, and
/// cascades from a parent's destruction:
///
/// 1. Detach every parent edge pointing at this burrow (without cascading:
///    the parents are not destroyed by this).
/// 2. Run the destructor, if set.
/// 3. Detach every child edge, cascading: a child destroyed here only if
///    this was its last parent.
/// 4. Release the header/payload block.
/// 5. Return the destructor's result.
///
/// # Safety
///
/// `header` must point to a live, initialized header not already being
/// destroyed.
pub(crate) unsafe fn destroy(header: NonNull<Header>) -> i32 {
    unsafe {
        let state = (*header.as_ptr()).state.get();
        debug_assert_eq!(
            state,
            State::Live,
            "burrow: re-entrant destruction of a burrow already being destroyed"
        );
        if state != State::Live {
            fatal("re-entrant destruction");
        }
        (*header.as_ptr()).state.set(State::Destroying);

        trace!("burrow: destroying burrow at {header:p}");

        let parents_head = Header::parents_head(header);
        Node::for_each_safe(parents_head, |entry| {
            let edge = Edge::from_parents_entry(entry);
            Edge::detach(edge, false);
        });

        let result = match (*header.as_ptr()).destructor.get() {
            Some(destructor) => destructor(Header::payload(header)),
            None => 0,
        };

        let children_head = Header::children_head(header);
        Node::for_each_safe(children_head, |entry| {
            let edge = Edge::from_children_entry(entry);
            Edge::detach(edge, true);
        });

        let size = Header::SIZE + (*header.as_ptr()).capacity.get();
        storage::call_free(header.as_ptr().cast::<u8>(), size);

        result
    }
}

/// Destroy `payload`'s burrow only if it currently has no parents;
/// otherwise a no-op.
///
/// # Safety
///
/// `payload` must have been returned by `allocate`/`resize` and not yet
/// freed.
pub unsafe fn discard(payload: NonNull<u8>) -> i32 {
    unsafe {
        let header = Header::of(payload);
        if Header::any_parent(header) {
            0
        } else {
            destroy(header)
        }
    }
}

/// Add a reference edge from `parent` to `child`.
///
/// # Safety
///
/// `parent` and `child` must have been returned by `allocate`/`resize` and
/// not yet freed, and must be distinct payloads.
pub unsafe fn ref_(parent: NonNull<u8>, child: NonNull<u8>) {
    unsafe {
        let parent = Header::of(parent);
        let child = Header::of(child);
        Edge::attach(parent, child);
    }
}

/// Remove the reference edge from `parent` to `child`. If this was the
/// child's last parent, the child is destroyed.
///
/// It is a fatal policy violation to `unref` a pair with no matching edge:
/// callers are expected to track which `ref_` calls they have made, the
/// same discipline C's original manual reference counting required.
///
/// # Safety
///
/// `parent` and `child` must have been returned by `allocate`/`resize` and
/// not yet freed.
pub unsafe fn unref(parent: NonNull<u8>, child: NonNull<u8>) {
    unsafe {
        let parent_header = Header::of(parent);
        let child_header = Header::of(child);
        match Edge::find(parent_header, child_header) {
            Some(edge) => Edge::detach(edge, true),
            None => fatal("unref with no matching edge"),
        }
    }
}

/// If `parent` is `Some`, true iff at least one edge exists from that
/// specific parent to `payload`'s burrow. If `parent` is `None`, true iff
/// the burrow has any parent at all.
///
/// # Safety
///
/// `payload` must have been returned by `allocate`/`resize` and not yet
/// freed. `parent`, if `Some`, must have been returned by `allocate`/`resize`
/// and not yet freed.
#[must_use]
pub unsafe fn has_parent(payload: NonNull<u8>, parent: Option<NonNull<u8>>) -> bool {
    unsafe {
        let header = Header::of(payload);
        match parent {
            Some(parent) => Edge::find(Header::of(parent), header).is_some(),
            None => Header::any_parent(header),
        }
    }
}

/// Set (or clear, with `None`) the destructor invoked when `payload`'s
/// burrow is destroyed.
///
/// # Safety
///
/// `payload` must have been returned by `allocate`/`resize` and not yet
/// freed.
pub unsafe fn set_destructor(payload: NonNull<u8>, destructor: Option<Destructor>) {
    unsafe {
        let header = Header::of(payload);
        (*header.as_ptr()).destructor.set(destructor);
    }
}

/// The usable payload capacity of `payload`'s burrow, as last set by
/// `allocate`/`resize`.
///
/// # Safety
///
/// `payload` must have been returned by `allocate`/`resize` and not yet
/// freed.
#[must_use]
pub unsafe fn size_of(payload: NonNull<u8>) -> usize {
    unsafe { (*Header::of(payload).as_ptr()).capacity.get() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    unsafe fn counting_destructor(_payload: NonNull<u8>) -> i32 {
        DROPS.fetch_add(1, Ordering::SeqCst);
        0
    }

    #[test]
    fn rootless_burrow_allocates_and_frees() {
        unsafe {
            let payload = allocate(None, 16).unwrap();
            assert_eq!(size_of(payload), 16);
            assert!(!has_parent(payload, None));
            assert_eq!(free(payload), 0);
        }
    }

    #[test]
    fn allocate_with_parent_attaches_one_edge() {
        unsafe {
            let parent = allocate(None, 8).unwrap();
            let child = allocate(Some(parent), 4).unwrap();

            assert!(has_parent(child, None));
            assert!(has_parent(child, Some(parent)));

            free(parent);
        }
    }

    #[test]
    fn discard_is_a_no_op_while_a_parent_remains() {
        unsafe {
            DROPS.store(0, Ordering::SeqCst);
            let parent = allocate(None, 8).unwrap();
            let child = allocate(None, 8).unwrap();
            set_destructor(child, Some(counting_destructor as Destructor));
            ref_(parent, child);

            discard(child);
            assert_eq!(DROPS.load(Ordering::SeqCst), 0);

            free(parent);
            assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn freeing_last_parent_cascades_to_child() {
        unsafe {
            DROPS.store(0, Ordering::SeqCst);
            let parent = allocate(None, 8).unwrap();
            let child = allocate(None, 8).unwrap();
            set_destructor(child, Some(counting_destructor as Destructor));
            ref_(parent, child);

            free(parent);
            assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn child_survives_while_second_parent_remains() {
        unsafe {
            DROPS.store(0, Ordering::SeqCst);
            let first = allocate(None, 8).unwrap();
            let second = allocate(None, 8).unwrap();
            let child = allocate(None, 8).unwrap();
            set_destructor(child, Some(counting_destructor as Destructor));
            ref_(first, child);
            ref_(second, child);

            free(first);
            assert_eq!(DROPS.load(Ordering::SeqCst), 0);
            assert!(has_parent(child, None));
            assert!(has_parent(child, Some(second)));
            assert!(!has_parent(child, Some(first)));

            free(second);
            assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn reference_cycle_is_broken_by_explicit_unref() {
        unsafe {
            DROPS.store(0, Ordering::SeqCst);
            let a = allocate(None, 8).unwrap();
            let b = allocate(None, 8).unwrap();
            set_destructor(a, Some(counting_destructor as Destructor));
            set_destructor(b, Some(counting_destructor as Destructor));

            // `a` and `b` reference each other; neither is reachable from a
            // root, but nothing is destroyed until the cycle is explicitly
            // broken.
            ref_(a, b);
            ref_(b, a);

            discard(a);
            discard(b);
            assert_eq!(DROPS.load(Ordering::SeqCst), 0);

            unref(a, b);
            unref(b, a);
            assert_eq!(DROPS.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn resize_preserves_edges_and_destructor() {
        unsafe {
            DROPS.store(0, Ordering::SeqCst);
            let parent = allocate(None, 8).unwrap();
            let child = allocate(None, 8).unwrap();
            set_destructor(child, Some(counting_destructor as Destructor));
            ref_(parent, child);

            let grown = resize(Some(parent), None, 4096).unwrap();
            assert!(has_parent(child, Some(grown)));

            free(grown);
            assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn resize_with_no_payload_behaves_like_allocate() {
        unsafe {
            let parent = allocate(None, 8).unwrap();
            let child = resize(None, Some(parent), 4).unwrap();

            assert!(has_parent(child, Some(parent)));

            free(parent);
        }
    }

    #[test]
    fn set_destructor_can_be_cleared() {
        unsafe {
            let payload = allocate(None, 8).unwrap();
            set_destructor(payload, Some(counting_destructor as Destructor));
            set_destructor(payload, None);
            DROPS.store(0, Ordering::SeqCst);
            free(payload);
            assert_eq!(DROPS.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn zero_size_allocation_round_trips() {
        unsafe {
            let payload = allocate(None, 0).unwrap();
            assert_eq!(size_of(payload), 0);
            free(payload);
        }
    }

    #[test]
    fn deep_chain_cascades_without_overflow() {
        unsafe {
            let root = allocate(None, 8).unwrap();
            let mut current = root;
            for _ in 0..10_000 {
                let next = allocate(None, 8).unwrap();
                ref_(current, next);
                current = next;
            }
            free(root);
        }
    }
}
