//! A generic monotone forward dataflow solver.
//!
//! The engine is polymorphic over the lattice element and the transfer
//! function: the caller supplies both through the [`Lattice`] and
//! [`Transfer`] traits and receives the stabilized state at the entry of
//! every block. Termination follows from the usual argument: the join only
//! moves states up a lattice of finite height, and a block is only revisited
//! when the state at its entry actually moved.

use alloc::collections::VecDeque;

use crate::entity::{EntitySet, SecondaryMap};
use crate::method::{Block, Inst, Method};

/// A join-semilattice element.
pub(crate) trait Lattice: Clone {
    /// The least element: the state of code not known to be reachable.
    fn bottom() -> Self;

    /// Joins `other` into `self`. Returns whether `self` changed.
    ///
    /// Must be monotone: joining can only lose information, never invent it.
    fn join_with(&mut self, other: &Self) -> bool;
}

/// The abstract interpretation of single instructions.
///
/// The transfer function may carry mutable state of its own (the value
/// interner does); such state must only grow in ways that cannot affect
/// monotonicity of the analysis.
pub(crate) trait Transfer<M: Method> {
    /// The lattice the analysis runs on.
    type State: Lattice;

    /// Interprets one instruction, updating the state in place.
    fn apply(&mut self, func: &M, inst: Inst, state: &mut Self::State);
}

/// Runs the analysis to a fixed point and returns the state at the entry of
/// each block. `entry_state` seeds the entry block; all other blocks start at
/// bottom.
pub(crate) fn solve<M, T>(
    func: &M,
    transfer: &mut T,
    entry_state: T::State,
) -> SecondaryMap<Block, T::State>
where
    M: Method,
    T: Transfer<M>,
{
    let mut entry_states = SecondaryMap::new();
    entry_states.clear_and_resize_with(func.num_blocks(), T::State::bottom);
    if func.num_blocks() == 0 {
        return entry_states;
    }
    entry_states[Block::ENTRY_BLOCK] = entry_state;

    let mut worklist = VecDeque::new();
    let mut queued = EntitySet::new();
    queued.clear_and_resize(func.num_blocks());
    worklist.push_back(Block::ENTRY_BLOCK);
    queued.insert(Block::ENTRY_BLOCK);

    while let Some(block) = worklist.pop_front() {
        queued.remove(block);

        let mut state = entry_states[block].clone();
        for &inst in func.block_insts(block) {
            transfer.apply(func, inst, &mut state);
        }

        for &succ in func.block_succs(block) {
            if entry_states[succ].join_with(&state) && queued.insert(succ) {
                worklist.push_back(succ);
            }
        }
    }

    entry_states
}
