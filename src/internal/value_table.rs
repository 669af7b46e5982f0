//! Structural values and the interner which assigns them their ids.
//!
//! A value describes a computation the way an instruction does (an opcode,
//! operands, static payload), but it has no identity of its own, and its
//! operands are other *values* rather than registers. Two instructions that
//! build equal values are guaranteed to compute the same result, which is
//! exactly the property the rest of the pass trades on.

use core::fmt;

use smallvec::SmallVec;

use super::FxHashMap;
use crate::method::{DataRef, FieldRef, Inst, MethodRef, Reg, StringRef, TypeRef};
use crate::opcode::Opcode;

/// The static operand of a value, as a tagged union.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum Payload {
    /// No static operand.
    None,
    /// A 64-bit literal.
    Literal(i64),
    /// A type reference.
    Type(TypeRef),
    /// A field reference.
    Field(FieldRef),
    /// A method reference.
    Method(MethodRef),
    /// A string reference.
    String(StringRef),
    /// An opaque data blob.
    Data(DataRef),
    /// The identity of one specific instruction. A positional payload makes
    /// the value as unique as the instruction itself, so that instructions
    /// which must remain at their position (move-exception, allocations,
    /// barriers, ...) never unify across positions.
    Positional(Inst),
}

/// A structural description of a computation.
///
/// For commutative opcodes the source list is sorted before interning, so
/// operand order does not defeat sharing.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct IRValue {
    pub opcode: Opcode,
    pub srcs: SmallVec<[ValueId; 4]>,
    pub payload: Payload,
}

impl IRValue {
    /// The value of register `reg` as it was immediately before `at`
    /// executes.
    ///
    /// Pre-state values recover tracking for registers whose binding was lost
    /// to a join or a barrier. The single source slot holds the raw register
    /// number rather than a value id; this cannot be confused with an
    /// ordinary value since no other value carries the `PreStateSrc` opcode.
    /// The positional payload keeps pre-state values minted at different
    /// instructions distinct, so registers that were havoced at different
    /// points never spuriously unify.
    pub(crate) fn pre_state_src(reg: Reg, at: Inst) -> Self {
        Self {
            opcode: Opcode::PreStateSrc,
            srcs: SmallVec::from_slice(&[ValueId::from_raw(reg.number())]),
            payload: Payload::Positional(at),
        }
    }
}

/// The id assigned to an interned value.
///
/// The two low bits carry flags that are hot-path checks for the analysis;
/// the remaining bits are the interning index, so ids are allocated in
/// multiples of 4.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub(crate) struct ValueId(u32);

impl ValueId {
    /// Set iff the value is a pre-state placeholder.
    const IS_PRE_STATE_SRC: u32 = 0x1;

    /// Set iff the value transitively depends on the heap.
    const IS_BARRIER_SENSITIVE: u32 = 0x2;

    /// The unit of the index part of an id.
    const BASE: u32 = 0x4;

    fn from_index(index: usize, flags: u32) -> Self {
        let id = (index as u64) * u64::from(Self::BASE);
        assert!(id <= u64::from(u32::MAX), "out of value ids");
        Self(id as u32 | flags)
    }

    /// Reinterprets an arbitrary integer as an id. Only used for the register
    /// slot of pre-state values.
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Whether this id names a pre-state placeholder.
    #[inline]
    pub(crate) fn is_pre_state_src(self) -> bool {
        self.0 & Self::IS_PRE_STATE_SRC != 0
    }

    /// Whether the value behind this id depends, transitively, on the heap.
    #[inline]
    pub(crate) fn is_barrier_sensitive(self) -> bool {
        self.0 & Self::IS_BARRIER_SENSITIVE != 0
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value{}", self.0 / Self::BASE)?;
        if self.is_pre_state_src() {
            f.write_str("p")?;
        }
        if self.is_barrier_sensitive() {
            f.write_str("h")?;
        }
        Ok(())
    }
}

/// The interner. Insert-only: an id, once assigned, is stable for the rest of
/// the method's analysis, which is what makes sharing the table across
/// fixpoint iterations sound.
pub(crate) struct ValueTable {
    values: FxHashMap<IRValue, ValueId>,
}

impl ValueTable {
    pub(crate) fn new() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }

    /// Returns the id of `value`, assigning a fresh one on first observation.
    ///
    /// A fresh id's index equals the pre-insertion size of the table. Its
    /// flags are derived from the value: heap reads are barrier-sensitive,
    /// pre-state placeholders are marked as such, and any other value
    /// inherits barrier sensitivity from its sources.
    pub(crate) fn intern(&mut self, value: IRValue) -> ValueId {
        if let Some(&id) = self.values.get(&value) {
            return id;
        }
        let mut flags = 0;
        if value.opcode == Opcode::PreStateSrc {
            flags |= ValueId::IS_PRE_STATE_SRC;
        } else if value.opcode.is_heap_read() {
            flags |= ValueId::IS_BARRIER_SENSITIVE;
        } else if value.srcs.iter().any(|src| src.is_barrier_sensitive()) {
            flags |= ValueId::IS_BARRIER_SENSITIVE;
        }
        let id = ValueId::from_index(self.values.len(), flags);
        self.values.insert(value, id);
        id
    }
}
