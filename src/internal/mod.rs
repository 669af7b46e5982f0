//! Internal implementation details of the pass that are not part of the
//! public API.

pub(crate) mod analysis;
pub(crate) mod env;
pub(crate) mod fixpoint;
pub(crate) mod rewrite;
pub(crate) mod value_table;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

/// Hash map with a fast non-cryptographic hasher for the hot per-method maps.
pub(crate) type FxHashMap<K, V> = HashMap<K, V, FxBuildHasher>;
