//! `Handle` can be used to build trees and graphs whose nodes free
//! themselves once nothing outside the structure, and nothing else inside
//! it, still references them.
//!
//! # A Tree of Directory Entries
//!
//! The following builds a small directory tree. Each `Dir` owns its
//! entries as children; freeing the root cascades through every
//! descendant without the caller needing to walk the tree itself.
//!
//! ```rust
//! use std::cell::RefCell;
//!
//! use burrow::Handle;
//!
//! struct Dir {
//!     name: &'static str,
//!     visited: RefCell<bool>,
//! }
//!
//! impl Drop for Dir {
//!     fn drop(&mut self) {
//!         *self.visited.borrow_mut() = true;
//!     }
//! }
//!
//! let root = Handle::new(Dir {
//!     name: "/",
//!     visited: RefCell::new(false),
//! })
//! .ok()
//! .unwrap();
//!
//! let etc = Handle::new_child(
//!     &root,
//!     Dir {
//!         name: "/etc",
//!         visited: RefCell::new(false),
//!     },
//! )
//! .ok()
//! .unwrap();
//!
//! assert!(etc.has_parent());
//! assert_eq!(root.get().name, "/");
//!
//! // Dropping the root cascades to every child whose only parent was this
//! // tree.
//! root.free();
//! ```
