//! The rewrite planner: turns the forwarding list into inserted moves.

use alloc::vec::Vec;

use super::analysis::Forward;
use super::FxHashMap;
use crate::debug_utils::DisplayMethod;
use crate::method::{Inst, Method, MethodSignature, Reg, RegType};
use crate::opcode::Opcode;
use crate::Stats;

/// Applies the forwardings to the method body.
///
/// For each distinct earlier definition a scratch register is allocated and a
/// move into it is inserted right after the definition; each later redundant
/// instruction is followed by a move from the scratch register into its
/// destination. The redundant instructions themselves are left in place;
/// copy-propagation and dead-code elimination are expected to clean up both
/// them and most of the inserted moves.
///
/// Returns whether the method was changed.
pub(crate) fn apply_patch<M: Method>(
    func: &mut M,
    forwards: &[Forward],
    signature: &MethodSignature,
    stats: &mut Stats,
) -> bool {
    if forwards.is_empty() {
        return false;
    }

    trace!("before cse patch:\n{}", DisplayMethod(&*func));

    // Allocate one scratch register per distinct earlier instruction. The
    // copy opcode follows the inferred type of the captured destination:
    // references must use object moves, wide primitives need a register pair.
    let mut temps: FxHashMap<Inst, (Opcode, Reg)> = FxHashMap::default();
    let mut captures: Vec<Inst> = Vec::new();
    for forward in forwards {
        if temps.contains_key(&forward.earlier) {
            continue;
        }
        let ty = func
            .inferred_dest_type(forward.earlier, signature)
            .expect("no inferred type at the destination of a forwarded definition");
        let (move_opcode, temp) = if ty == RegType::Reference {
            (Opcode::MoveObject, func.allocate_temp())
        } else if func.inst_dest_is_wide(forward.earlier) {
            (Opcode::MoveWide, func.allocate_wide_temp())
        } else {
            (Opcode::Move, func.allocate_temp())
        };
        temps.insert(forward.earlier, (move_opcode, temp));
        captures.push(forward.earlier);
    }

    // Insert the moves that use the forwarded value.
    for forward in forwards {
        let (move_opcode, temp) = temps[&forward.earlier];
        let dest = func
            .inst_dest(forward.later)
            .expect("forwarded instruction has no destination");
        func.insert_move_after(forward.later, move_opcode, dest, temp);
        trace!(
            "forwarding {} to {} via {temp}",
            forward.earlier,
            forward.later
        );
    }

    // Insert the moves that capture the forwarded value.
    for &earlier in &captures {
        let (move_opcode, temp) = temps[&earlier];
        let src = func
            .inst_dest(earlier)
            .expect("forwarding definition has no destination");
        func.insert_move_after(earlier, move_opcode, temp, src);
    }

    trace!("after cse patch:\n{}", DisplayMethod(&*func));

    stats.instructions_eliminated += forwards.len() as u64;
    stats.results_captured += captures.len() as u64;
    true
}
