//! # Reference-Counted Resource Handles
//!
//! Strong and weak handles to heap resources, with a packed dual reference
//! counter and type-erased deletion semantics.
//!
//! ## Design goals
//!
//! The handle model was designed to meet a strict set of requirements:
//!
//! __Compact__
//! One 32-bit status word per resource holds both reference counts; "no
//! handle of any kind remains" is a single comparison against zero.
//!
//! __Type-erased__
//! The deletion semantics of a resource, scalar drop versus element-wise
//! array drop, are fixed when the resource is attached; no later call site
//! needs the static payload type to release it correctly.
//!
//! __Checked__
//! Reference count overflow is a recoverable error on the `try_` surface,
//! never a silent wraparound; count underflow is a panic.
//!
//! __Intrusive__
//! A payload can embed its own control block, so self-referential
//! structures hand out handles to themselves without allocating a block
//! per handle chain.
//!
//! __Bare alloc__
//! No dependence on the standard library; operable anywhere a global
//! allocator exists.
//!
//! ## Terminology
//!
//! - _Resource_: a heap allocation whose lifetime the library manages.
//! - _Control block_: the pairing of one packed reference counter and one
//!   type-erased resource descriptor; the unit of lifetime management.
//! - _Strong handle_: an owning reference; the payload dies with the last
//!   strong handle.
//! - _Weak handle_: a non-owning reference; keeps the control block alive,
//!   observes the payload's death, upgrades to a strong handle while the
//!   payload lives.
//! - _Anchor_: the embedded control-block storage of an intrusive payload.
//! - _Adoption_: transferring ownership of a boxed intrusive payload to the
//!   handle system, bootstrapping its embedded control block.
//!
//! ## Components
//!
//! - __[`Strong`]__: an owning, strongly counted, dereferenceable handle.
//! - __[`Weak`]__: a non-owning, weakly counted, upgradeable handle.
//! - __[`Block`]__: a control block; one packed counter, one descriptor.
//! - __[`Resource`]__: the type-erased descriptor interface.
//! - __[`ScalarDesc`]__: descriptor of a single value; scalar drop.
//! - __[`ArrayDesc`]__: descriptor of an array; element-wise drop.
//! - __[`Anchor`]__: embedded control-block storage for intrusive payloads.
//! - __[`Intrusive`]__: the trait a payload implements to embed an anchor.
//! - __[`Upcast`]__: marks a payload as viewable as another type at the
//!   same address, for count-preserving handle conversion.
//!
//! [`Strong`]: handle::Strong
//! [`Weak`]: handle::Weak
//! [`Block`]: block::Block
//! [`Resource`]: resource::Resource
//! [`ScalarDesc`]: resource::ScalarDesc
//! [`ArrayDesc`]: resource::ArrayDesc
//! [`Anchor`]: anchor::Anchor
//! [`Intrusive`]: anchor::Intrusive
//! [`Upcast`]: handle::Upcast

#![no_std]

extern crate alloc;

pub mod anchor;
pub mod block;
pub mod handle;
pub mod resource;

pub use crate::anchor::{Anchor, Intrusive};
pub use crate::block::{Block, HandleError, STRONG_COUNT_MAX, WEAK_COUNT_MAX};
pub use crate::handle::{Strong, Upcast, Weak};
pub use crate::resource::{ArrayDesc, Resource, ScalarDesc};
