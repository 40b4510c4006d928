//! Parent→child reference edges.
//!
//! An [`Edge`] is allocated for every `ref`/`new_child` relationship between
//! two burrows. It is a member of two intrusive lists at once: the parent's
//! `children` list and the child's `parents` list. Edges are allocated and
//! freed through the plain global allocator, bypassing the pluggable
//! storage slots in [`crate::storage`] — the original this crate is
//! modeled on allocates its edge bookkeeping the same way, reserving the
//! pluggable slots for payload-carrying allocations only.

use alloc::alloc::{alloc, dealloc, Layout};
use core::cell::Cell;
use core::mem::offset_of;
use core::ptr::NonNull;

use crate::error::fatal;
use crate::header::Header;
use crate::list::Node;
use crate::raw;

#[repr(C)]
pub(crate) struct Edge {
    /// Link in the parent's `children` list.
    children_entry: Node,
    /// Link in the child's `parents` list.
    parents_entry: Node,
    parent: Cell<NonNull<Header>>,
    child: Cell<NonNull<Header>>,
}

fn edge_layout() -> Layout {
    Layout::new::<Edge>()
}

impl Edge {
    /// Allocate a new edge from `parent` to `child` and link it into both
    /// of their lists.
    ///
    /// Edge allocation failure is a fatal policy violation, not a
    /// recoverable outcome: unlike a payload allocation, there is no
    /// sensible way to report "the reference graph could not be extended"
    /// back through `ref`'s `bool` return without leaving the two objects
    /// only half-linked, so this aborts the process rather than return
    /// such a state to the caller.
    ///
    /// # Safety
    ///
    /// `parent` and `child` must point to live, initialized headers.
    pub(crate) unsafe fn attach(parent: NonNull<Header>, child: NonNull<Header>) -> NonNull<Edge> {
        unsafe {
            let layout = edge_layout();
            let raw = alloc(layout);
            let Some(ptr) = NonNull::new(raw).map(NonNull::cast::<Edge>) else {
                fatal("edge allocation failed");
            };

            Node::init(NonNull::new_unchecked(
                core::ptr::addr_of_mut!((*ptr.as_ptr()).children_entry),
            ));
            Node::init(NonNull::new_unchecked(
                core::ptr::addr_of_mut!((*ptr.as_ptr()).parents_entry),
            ));
            core::ptr::write(core::ptr::addr_of_mut!((*ptr.as_ptr()).parent), Cell::new(parent));
            core::ptr::write(core::ptr::addr_of_mut!((*ptr.as_ptr()).child), Cell::new(child));

            Node::insert_after(Header::children_head(parent), Self::children_entry(ptr));
            Node::insert_after(Header::parents_head(child), Self::parents_entry(ptr));

            trace!("burrow: attached edge {parent:p} -> {child:p}");
            ptr
        }
    }

    /// Detach `edge` from both lists it belongs to and free it. If this was
    /// the child's last remaining parent and `cascade` is set, the child is
    /// destroyed.
    ///
    /// # Safety
    ///
    /// `edge` must be a live, attached edge not already detached.
    pub(crate) unsafe fn detach(edge: NonNull<Edge>, cascade: bool) {
        unsafe {
            let child = (*edge.as_ptr()).child.get();
            Node::unlink(Self::children_entry(edge));
            Node::unlink(Self::parents_entry(edge));
            dealloc(edge.as_ptr().cast::<u8>(), edge_layout());

            if cascade && !Header::any_parent(child) {
                raw::destroy(child);
            }
        }
    }

    /// Find the edge from `parent` to `child`, if one exists.
    ///
    /// # Safety
    ///
    /// `parent` and `child` must point to live, initialized headers.
    pub(crate) unsafe fn find(parent: NonNull<Header>, child: NonNull<Header>) -> Option<NonNull<Edge>> {
        unsafe {
            let mut found = None;
            let head = Header::children_head(parent);
            let mut cursor = Node::next(head);
            while cursor != head {
                let edge = Self::from_children_entry(cursor);
                if (*edge.as_ptr()).child.get() == child {
                    found = Some(edge);
                    break;
                }
                cursor = Node::next(cursor);
            }
            found
        }
    }

    /// Recover the edge owning `entry`, given `entry` is its `children_entry`
    /// field.
    ///
    /// # Safety
    /// `entry` must be the `children_entry` field of a live `Edge`.
    pub(crate) unsafe fn from_children_entry(entry: NonNull<Node>) -> NonNull<Edge> {
        unsafe {
            NonNull::new_unchecked(
                (entry.as_ptr().cast::<u8>()).sub(offset_of!(Edge, children_entry)).cast(),
            )
        }
    }

    /// Recover the edge owning `entry`, given `entry` is its `parents_entry`
    /// field.
    ///
    /// # Safety
    /// `entry` must be the `parents_entry` field of a live `Edge`.
    pub(crate) unsafe fn from_parents_entry(entry: NonNull<Node>) -> NonNull<Edge> {
        unsafe {
            NonNull::new_unchecked(
                (entry.as_ptr().cast::<u8>()).sub(offset_of!(Edge, parents_entry)).cast(),
            )
        }
    }

    #[inline]
    unsafe fn children_entry(edge: NonNull<Edge>) -> NonNull<Node> {
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*edge.as_ptr()).children_entry)) }
    }

    #[inline]
    pub(crate) unsafe fn parents_entry(edge: NonNull<Edge>) -> NonNull<Node> {
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*edge.as_ptr()).parents_entry)) }
    }

    #[inline]
    pub(crate) unsafe fn parent(edge: NonNull<Edge>) -> NonNull<Header> {
        unsafe { (*edge.as_ptr()).parent.get() }
    }

    /// Repoint `edge`'s `parent` field, used after the parent header moves
    /// during a resize.
    ///
    /// # Safety
    /// `edge` must be a live edge and `new_parent` a live header.
    pub(crate) unsafe fn set_parent(edge: NonNull<Edge>, new_parent: NonNull<Header>) {
        unsafe { (*edge.as_ptr()).parent.set(new_parent) }
    }

    /// Repoint `edge`'s `child` field, used after the child header moves
    /// during a resize.
    ///
    /// # Safety
    /// `edge` must be a live edge and `new_child` a live header.
    pub(crate) unsafe fn set_child(edge: NonNull<Edge>, new_child: NonNull<Header>) {
        unsafe { (*edge.as_ptr()).child.set(new_child) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw;

    unsafe fn header_of(size: usize) -> NonNull<Header> {
        unsafe { Header::of(raw::allocate(None, size).unwrap()) }
    }

    #[test]
    fn attach_links_both_lists_and_find_locates_it() {
        unsafe {
            let parent = header_of(8);
            let child = header_of(8);
            assert!(Edge::find(parent, child).is_none());

            let edge = Edge::attach(parent, child);
            assert!(!Node::is_empty_head(Header::children_head(parent)));
            assert!(Header::any_parent(child));
            assert_eq!(Edge::find(parent, child), Some(edge));

            Edge::detach(edge, true);
            assert!(Node::is_empty_head(Header::children_head(parent)));

            raw::free(Header::payload(parent));
        }
    }

    #[test]
    fn detach_cascades_when_last_parent_removed() {
        unsafe {
            let parent = header_of(8);
            let child = header_of(8);
            let edge = Edge::attach(parent, child);

            // Cascade discards `child`'s storage; only `parent` remains to
            // be freed directly.
            Edge::detach(edge, true);
            raw::free(Header::payload(parent));
        }
    }
}
