#![no_std]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![doc(html_root_url = "https://docs.rs/burrow/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A multi-reference hierarchical object allocator.
//!
//! `burrow` models a directed graph of objects ("burrows") linked by
//! parent → child reference edges. An object is destroyed the moment its
//! last parent reference is dropped, and destruction cascades: every
//! child left without a remaining parent is destroyed in turn. This is
//! manual, deterministic memory management, not a tracing garbage
//! collector — nothing here ever runs in the background, and nothing is
//! destroyed until a caller explicitly removes the reference that was
//! keeping it alive.
//!
//! Two layers are exposed:
//!
//! - [`raw`] is the literal, untyped allocator API: every operation takes
//!   and returns `NonNull<u8>` payload pointers, mirroring a C allocator.
//! - [`Handle`] is a safe, generic facade over a single concrete payload
//!   type, built on top of `raw`.
//!
//! ```rust
//! use burrow::Handle;
//!
//! let parent = Handle::new(String::from("root")).ok().unwrap();
//! let child = Handle::new_child(&parent, String::from("leaf")).ok().unwrap();
//! assert!(child.has_parent());
//!
//! // Freeing the parent cascades to the child, since this was its only
//! // parent.
//! parent.free();
//! ```
//!
//! This crate is `#![no_std]` with an optional `std` feature (enabled by
//! default) that gates `std::error::Error` impls and process-abort
//! behavior on fatal policy violations. `burrow` is not thread-safe by
//! design: every type here is `!Send`/`!Sync`, and every raw entry point
//! is `unsafe`.

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[macro_use]
extern crate log;

#[doc = include_str!("doc/implementing_owned_trees.rs")]
mod implementing_owned_trees {}

mod edge;
mod error;
mod handle;
mod header;
mod list;
mod local;
pub mod raw;
mod storage;

pub use error::FatalError;
pub use handle::Handle;
pub use header::Destructor;
pub use local::{discard_local, Local};
pub use storage::{set_allocator, RawAlloc, RawFree, RawRealloc};
