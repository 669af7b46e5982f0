//! The value-numbering abstract interpretation: the per-instruction transfer
//! function, the memory-barrier model, and the redundancy collector that
//! enumerates forwarding opportunities once the fixpoint is reached.

use alloc::vec::Vec;

use smallvec::SmallVec;

use super::env::CseEnvironment;
use super::fixpoint::{self, Transfer};
use super::value_table::{IRValue, Payload, ValueId, ValueTable};
use crate::entity::SecondaryMap;
use crate::method::{Block, FieldSearch, Inst, Method, Reg};
use crate::opcode::Opcode;

/// A pair of instructions computing the same value: the result of `earlier`
/// can replace the result of `later`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Forward {
    pub earlier: Inst,
    pub later: Inst,
}

/// Whether `inst` is a memory barrier: an instruction after which previously
/// read heap values may no longer be reused.
///
/// Monitor instructions, every write to the heap (field stores, array stores,
/// fill-array-data) and every invoke are barriers unconditionally. A field
/// access that does not resolve, or resolves to a volatile field, is also a
/// barrier; an ordinary resolved field read is not.
pub(crate) fn induces_barrier<M: Method>(func: &M, inst: Inst) -> bool {
    let opcode = func.inst_opcode(inst);
    if opcode.is_monitor()
        || opcode.is_invoke()
        || opcode.is_aput()
        || opcode.is_iput()
        || opcode.is_sput()
        || opcode == Opcode::FillArrayData
    {
        return true;
    }
    if let Some(field) = func.inst_field(inst) {
        let search = if opcode.is_sfield_op() {
            FieldSearch::Static
        } else {
            FieldSearch::Instance
        };
        return match func.resolve_field(field, search) {
            Some(field) => func.is_volatile(field),
            None => true,
        };
    }
    false
}

/// Whether the value of `inst` must be pinned to the instruction's own
/// identity. Parameter loads, move-exception and allocations produce a
/// distinct result at every execution even though they look structurally
/// identical, and barriers must not be reordered; a positional payload keeps
/// all of these from unifying across positions.
fn is_positional<M: Method>(func: &M, inst: Inst, opcode: Opcode) -> bool {
    if opcode.is_load_param()
        || matches!(
            opcode,
            Opcode::MoveException
                | Opcode::NewInstance
                | Opcode::NewArray
                | Opcode::FilledNewArray
        )
    {
        true
    } else {
        induces_barrier(func, inst)
    }
}

/// The analyzer: owns the value interner for the duration of one method and
/// implements the transfer function over [`CseEnvironment`].
pub(crate) struct CseAnalyzer {
    values: ValueTable,
}

impl CseAnalyzer {
    pub(crate) fn new() -> Self {
        Self {
            values: ValueTable::new(),
        }
    }

    /// Runs the forward dataflow analysis to its fixpoint.
    ///
    /// The initial state at the method entry is top (every register unbound),
    /// which forces the first use of each parameter register to mint a
    /// pre-state placeholder.
    pub(crate) fn run<M: Method>(&mut self, func: &M) -> SecondaryMap<Block, CseEnvironment> {
        fixpoint::solve(func, self, CseEnvironment::top())
    }

    /// Walks every block from its stabilized entry state, re-applying the
    /// transfer function to see the state after each instruction, and
    /// collects the instructions whose value already has an earlier
    /// definition.
    pub(crate) fn collect_forwards<M: Method>(
        &mut self,
        func: &M,
        entry_states: &SecondaryMap<Block, CseEnvironment>,
    ) -> Vec<Forward> {
        let mut forwards = Vec::new();
        for block in func.blocks() {
            let mut state = entry_states[block].clone();
            for &inst in func.block_insts(block) {
                self.analyze_inst(func, inst, &mut state);

                let opcode = func.inst_opcode(inst);
                if opcode.is_move() || opcode.is_const() {
                    continue;
                }
                let Some(dest) = func.inst_dest(inst) else {
                    continue;
                };
                let Some(value) = state.get_ref(dest) else {
                    continue;
                };
                assert!(
                    !value.is_pre_state_src(),
                    "pre-state value bound to a freshly written destination"
                );
                let Some(earlier) = state.get_def(value.is_barrier_sensitive(), value) else {
                    continue;
                };
                if earlier == inst {
                    continue;
                }
                // Parameters are live in their registers for the whole
                // method; copying them around would gain nothing.
                if func.inst_opcode(earlier).is_load_param() {
                    continue;
                }
                forwards.push(Forward {
                    earlier,
                    later: inst,
                });
            }
        }
        forwards
    }

    /// The transfer function: interprets `inst` over `state`.
    fn analyze_inst<M: Method>(&mut self, func: &M, inst: Inst, state: &mut CseEnvironment) {
        let opcode = func.inst_opcode(inst);
        match opcode {
            op if op.is_move() => {
                let value = state.get_ref(func.inst_srcs(inst)[0]);
                state.set_dest(
                    func.inst_dest(inst).unwrap(),
                    func.inst_dest_is_wide(inst),
                    value,
                );
            }
            op if op.is_move_result_any() => {
                let value = state.get_ref(Reg::RESULT);
                if let Some(value) = value {
                    // The producing instruction deliberately did not record
                    // itself as the definition; the move-result is where the
                    // value becomes addressable.
                    if state.get_def(value.is_barrier_sensitive(), value).is_none() {
                        state.set_def(value.is_barrier_sensitive(), value, inst);
                    }
                }
                state.set_dest(
                    func.inst_dest(inst).unwrap(),
                    func.inst_dest_is_wide(inst),
                    value,
                );
            }
            _ => {
                if let Some(dest) = func.inst_dest(inst) {
                    let value = self.value_of(func, inst, state);
                    let id = self.values.intern(value);
                    if state.get_def(id.is_barrier_sensitive(), id).is_none() {
                        state.set_def(id.is_barrier_sensitive(), id, inst);
                    }
                    state.set_dest(dest, func.inst_dest_is_wide(inst), Some(id));
                } else if func.inst_has_move_result(inst) {
                    let value = self.value_of(func, inst, state);
                    let id = self.values.intern(value);
                    state.set_ref(Reg::RESULT, Some(id));
                }
            }
        }

        if induces_barrier(func, inst) {
            state.clear_barrier_sensitive_defs();
            state.havoc_barrier_sensitive_refs();
        }
    }

    /// Builds the structural value computed by `inst` in `state`, minting
    /// pre-state placeholders for source registers whose binding is unknown.
    fn value_of<M: Method>(
        &mut self,
        func: &M,
        inst: Inst,
        state: &mut CseEnvironment,
    ) -> IRValue {
        let opcode = func.inst_opcode(inst);
        debug_assert!(opcode != Opcode::PreStateSrc);

        // Pre-state placeholders minted for this instruction, deduplicated
        // per register so that a register used twice yields one id.
        let mut minted: SmallVec<[(Reg, ValueId); 2]> = SmallVec::new();
        let mut srcs: SmallVec<[ValueId; 4]> = SmallVec::new();
        for &reg in func.inst_srcs(inst) {
            let id = match state.get_ref(reg) {
                Some(id) => id,
                None => match minted.iter().find(|&&(minted_reg, _)| minted_reg == reg) {
                    Some(&(_, id)) => id,
                    None => {
                        let id = self.values.intern(IRValue::pre_state_src(reg, inst));
                        minted.push((reg, id));
                        id
                    }
                },
            };
            srcs.push(id);
        }
        // Re-establish tracking of the havoced registers themselves.
        for &(reg, id) in &minted {
            state.set_ref(reg, Some(id));
        }

        if opcode.is_commutative() {
            srcs.sort_unstable();
        }

        let payload = if is_positional(func, inst, opcode) {
            Payload::Positional(inst)
        } else if let Some(literal) = func.inst_literal(inst) {
            Payload::Literal(literal)
        } else if let Some(ty) = func.inst_type(inst) {
            Payload::Type(ty)
        } else if let Some(field) = func.inst_field(inst) {
            Payload::Field(field)
        } else if let Some(method) = func.inst_method(inst) {
            Payload::Method(method)
        } else if let Some(string) = func.inst_string(inst) {
            Payload::String(string)
        } else if let Some(data) = func.inst_data(inst) {
            Payload::Data(data)
        } else {
            Payload::None
        };

        IRValue {
            opcode,
            srcs,
            payload,
        }
    }
}

impl<M: Method> Transfer<M> for CseAnalyzer {
    type State = CseEnvironment;

    fn apply(&mut self, func: &M, inst: Inst, state: &mut Self::State) {
        self.analyze_inst(func, inst, state);
    }
}
