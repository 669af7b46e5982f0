//! The abstract environment tracked at every program point.

use core::hash::Hash;

use super::fixpoint::Lattice;
use super::value_table::ValueId;
use super::FxHashMap;
use crate::method::{Inst, Reg};

/// The lattice element of the analysis: two definition maps (split by
/// barrier sensitivity, so a barrier can drop one wholesale) and the
/// register-to-value map.
///
/// Each map stores only concrete bindings; an absent key is an unknown (top)
/// binding, which carries no information. The whole environment additionally
/// has a distinguished bottom, the state of code not yet known to be
/// reachable, which absorbs writes and is the identity of the join.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct CseEnvironment {
    is_bottom: bool,

    /// Earliest known defining instruction of each barrier-sensitive value.
    def_barrier_sensitive: FxHashMap<ValueId, Inst>,

    /// Earliest known defining instruction of each barrier-insensitive value.
    def_insensitive: FxHashMap<ValueId, Inst>,

    /// The value currently held by each register.
    refs: FxHashMap<Reg, ValueId>,
}

impl CseEnvironment {
    /// The environment with no information: every register and every value
    /// unbound.
    pub(crate) fn top() -> Self {
        Self {
            is_bottom: false,
            def_barrier_sensitive: FxHashMap::default(),
            def_insensitive: FxHashMap::default(),
            refs: FxHashMap::default(),
        }
    }

    fn def_map(&self, barrier_sensitive: bool) -> &FxHashMap<ValueId, Inst> {
        if barrier_sensitive {
            &self.def_barrier_sensitive
        } else {
            &self.def_insensitive
        }
    }

    /// The earliest known definition of `value`, selected from the map
    /// matching its barrier sensitivity.
    pub(crate) fn get_def(&self, barrier_sensitive: bool, value: ValueId) -> Option<Inst> {
        self.def_map(barrier_sensitive).get(&value).copied()
    }

    /// Records `inst` as the earliest definition of `value`.
    pub(crate) fn set_def(&mut self, barrier_sensitive: bool, value: ValueId, inst: Inst) {
        if self.is_bottom {
            return;
        }
        let map = if barrier_sensitive {
            &mut self.def_barrier_sensitive
        } else {
            &mut self.def_insensitive
        };
        map.insert(value, inst);
    }

    /// The value currently bound to `reg`, if known.
    pub(crate) fn get_ref(&self, reg: Reg) -> Option<ValueId> {
        self.refs.get(&reg).copied()
    }

    /// Binds `reg` to `value`; `None` resets the binding to unknown.
    pub(crate) fn set_ref(&mut self, reg: Reg, value: Option<ValueId>) {
        if self.is_bottom {
            return;
        }
        match value {
            Some(value) => {
                self.refs.insert(reg, value);
            }
            None => {
                self.refs.remove(&reg);
            }
        }
    }

    /// Binds a destination register, invalidating the upper half of the pair
    /// if the destination is wide.
    pub(crate) fn set_dest(&mut self, dest: Reg, wide: bool, value: Option<ValueId>) {
        self.set_ref(dest, value);
        if wide {
            self.set_ref(dest.pair_high(), None);
        }
    }

    /// Drops every barrier-sensitive definition. Called when a barrier makes
    /// earlier heap reads unreusable.
    pub(crate) fn clear_barrier_sensitive_defs(&mut self) {
        self.def_barrier_sensitive.clear();
    }

    /// Resets every register bound to a barrier-sensitive value to unknown.
    /// Bindings to barrier-insensitive values survive.
    pub(crate) fn havoc_barrier_sensitive_refs(&mut self) {
        self.refs.retain(|_, value| !value.is_barrier_sensitive());
    }
}

/// Intersects `dst` with `src`, keeping only bindings present and equal on
/// both sides. Returns whether `dst` changed.
fn intersect<K: Copy + Eq + Hash, V: Eq>(dst: &mut FxHashMap<K, V>, src: &FxHashMap<K, V>) -> bool {
    let len = dst.len();
    dst.retain(|key, value| src.get(key) == Some(value));
    dst.len() != len
}

impl Lattice for CseEnvironment {
    fn bottom() -> Self {
        Self {
            is_bottom: true,
            def_barrier_sensitive: FxHashMap::default(),
            def_insensitive: FxHashMap::default(),
            refs: FxHashMap::default(),
        }
    }

    fn join_with(&mut self, other: &Self) -> bool {
        if other.is_bottom {
            return false;
        }
        if self.is_bottom {
            *self = other.clone();
            return true;
        }
        // Pointwise flat-lattice join: equal bindings survive, conflicting or
        // one-sided bindings go to top.
        let mut changed = intersect(
            &mut self.def_barrier_sensitive,
            &other.def_barrier_sensitive,
        );
        changed |= intersect(&mut self.def_insensitive, &other.def_insensitive);
        changed |= intersect(&mut self.refs, &other.refs);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::value_table::{IRValue, Payload, ValueTable};
    use crate::opcode::Opcode;
    use smallvec::smallvec;

    fn ids() -> (ValueId, ValueId) {
        let mut table = ValueTable::new();
        let a = table.intern(IRValue {
            opcode: Opcode::Const,
            srcs: smallvec![],
            payload: Payload::Literal(1),
        });
        let b = table.intern(IRValue {
            opcode: Opcode::Const,
            srcs: smallvec![],
            payload: Payload::Literal(2),
        });
        (a, b)
    }

    #[test]
    fn join_keeps_agreeing_bindings_and_drops_conflicts() {
        let (a, b) = ids();
        let mut left = CseEnvironment::top();
        left.set_ref(Reg::new(0), Some(a));
        left.set_ref(Reg::new(1), Some(a));
        left.set_def(false, a, Inst::new(0));

        let mut right = CseEnvironment::top();
        right.set_ref(Reg::new(0), Some(a));
        right.set_ref(Reg::new(1), Some(b));
        right.set_def(false, a, Inst::new(3));

        assert!(left.join_with(&right));
        assert_eq!(left.get_ref(Reg::new(0)), Some(a));
        assert_eq!(left.get_ref(Reg::new(1)), None);
        assert_eq!(left.get_def(false, a), None);

        // Joining again with the same state is a no-op.
        assert!(!left.join_with(&left.clone()));
    }

    #[test]
    fn bottom_is_the_join_identity_and_absorbs_writes() {
        let (a, _) = ids();
        let mut state = CseEnvironment::bottom();
        state.set_ref(Reg::new(0), Some(a));
        state.set_def(true, a, Inst::new(0));
        assert_eq!(state.get_ref(Reg::new(0)), None);
        assert_eq!(state.get_def(true, a), None);

        let mut reached = CseEnvironment::top();
        reached.set_ref(Reg::new(2), Some(a));
        assert!(state.join_with(&reached));
        assert_eq!(state.get_ref(Reg::new(2)), Some(a));
        assert!(!reached.join_with(&CseEnvironment::bottom()));
    }

    #[test]
    fn havoc_spares_insensitive_bindings() {
        let mut table = ValueTable::new();
        let pure = table.intern(IRValue {
            opcode: Opcode::Const,
            srcs: smallvec![],
            payload: Payload::Literal(1),
        });
        let load = table.intern(IRValue {
            opcode: Opcode::Sget,
            srcs: smallvec![],
            payload: Payload::Field(crate::method::FieldRef::new(0)),
        });

        let mut state = CseEnvironment::top();
        state.set_ref(Reg::new(0), Some(pure));
        state.set_ref(Reg::new(1), Some(load));
        state.set_def(false, pure, Inst::new(0));
        state.set_def(true, load, Inst::new(1));

        state.clear_barrier_sensitive_defs();
        state.havoc_barrier_sensitive_refs();

        assert_eq!(state.get_ref(Reg::new(0)), Some(pure));
        assert_eq!(state.get_ref(Reg::new(1)), None);
        assert_eq!(state.get_def(false, pure), Some(Inst::new(0)));
        assert_eq!(state.get_def(true, load), None);
    }
}
