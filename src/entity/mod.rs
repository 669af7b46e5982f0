//! Newtype wrappers around integers ("entities") which represent indices into
//! the arrays of a method body, along with type-safe collections keyed by
//! them.
//!
//! - [`PrimaryMap<K, V>`] holds the main definition of an entity and allocates
//!   new entity references with `push`.
//! - [`SecondaryMap<K, V>`] associates secondary information with entities
//!   allocated elsewhere.
//! - [`EntitySet<T>`] is a bit-vector set of entities.
//!
//! The design of these types is based on the `cranelift-entity` crate.

#[macro_use]
pub mod base;
pub mod map;
pub mod set;

pub use base::EntityRef;
pub use map::{Iter, Keys, PrimaryMap, SecondaryMap};
pub use set::EntitySet;
