//! Utility functions and types for debugging the pass.
//!
//! These are not needed for normal compilation, but are useful during
//! development of both the pass itself and of client implementations of the
//! [`Method`] trait: a structural validator for method bodies, a
//! pretty-printer, and [`GenericMethod`], an in-memory IR that implements
//! [`Method`].

use core::fmt;

use crate::entity::EntitySet;
use crate::method::{Block, Inst, Method, Reg};
use crate::opcode::Opcode;

mod generic_method;

pub use generic_method::{inst, GenericMethod, InstBuilder};

/// Adapter to display the body of any [`Method`] in a human-readable form.
pub struct DisplayMethod<'a, M>(pub &'a M);

impl<M: Method> fmt::Display for DisplayMethod<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.0;
        for block in func.blocks() {
            write!(f, "{block}:")?;
            let preds = func.block_preds(block);
            if !preds.is_empty() {
                write!(f, " ; preds:")?;
                for pred in preds {
                    write!(f, " {pred}")?;
                }
            }
            writeln!(f)?;
            for &inst in func.block_insts(block) {
                write!(f, "  {inst}: ")?;
                if let Some(dest) = func.inst_dest(inst) {
                    write!(f, "{dest} = ")?;
                }
                write!(f, "{}", func.inst_opcode(inst))?;
                let mut first = true;
                for &src in func.inst_srcs(inst) {
                    write!(f, "{} {src}", if first { "" } else { "," })?;
                    first = false;
                }
                if let Some(literal) = func.inst_literal(inst) {
                    write!(f, "{} #{literal}", if first { "" } else { "," })?;
                } else if let Some(ty) = func.inst_type(inst) {
                    write!(f, "{} {ty}", if first { "" } else { "," })?;
                } else if let Some(field) = func.inst_field(inst) {
                    write!(f, "{} {field}", if first { "" } else { "," })?;
                } else if let Some(method) = func.inst_method(inst) {
                    write!(f, "{} {method}", if first { "" } else { "," })?;
                } else if let Some(string) = func.inst_string(inst) {
                    write!(f, "{} {string}", if first { "" } else { "," })?;
                } else if let Some(data) = func.inst_data(inst) {
                    write!(f, "{} {data}", if first { "" } else { "," })?;
                }
                writeln!(f)?;
            }
            let succs = func.block_succs(block);
            if !succs.is_empty() {
                write!(f, "  ->")?;
                for succ in succs {
                    write!(f, " {succ}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Error returned by [`validate_method`] for malformed method bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodError {
    /// The entry block has predecessors.
    EntryBlockHasPreds,

    /// A successor edge has no matching predecessor edge, or vice versa.
    InconsistentEdge {
        /// Source of the edge.
        from: Block,
        /// Target of the edge.
        to: Block,
    },

    /// An instruction appears in more than one block position.
    DuplicateInst(Inst),

    /// An instruction uses an opcode reserved for internal use.
    ReservedOpcode(Inst),

    /// An instruction names [`Reg::RESULT`] explicitly.
    ResultRegister(Inst),

    /// A move-family instruction has the wrong number of operands.
    BadMoveShape(Inst),
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryBlockHasPreds => write!(f, "entry block has predecessors"),
            Self::InconsistentEdge { from, to } => {
                write!(f, "edge {from} -> {to} is not recorded on both ends")
            }
            Self::DuplicateInst(inst) => write!(f, "{inst} appears in more than one position"),
            Self::ReservedOpcode(inst) => write!(f, "{inst} uses a reserved opcode"),
            Self::ResultRegister(inst) => {
                write!(f, "{inst} names the implicit result register explicitly")
            }
            Self::BadMoveShape(inst) => write!(f, "{inst} has a malformed move shape"),
        }
    }
}

/// Checks basic structural invariants of a method body.
///
/// This does not catch every way a [`Method`] implementation can be wrong,
/// but it catches the ones that would make the pass misbehave silently. It is
/// relatively expensive and intended for use in tests and during development.
pub fn validate_method(func: &impl Method) -> Result<(), MethodError> {
    if !func.block_preds(Block::ENTRY_BLOCK).is_empty() {
        return Err(MethodError::EntryBlockHasPreds);
    }

    for block in func.blocks() {
        for &succ in func.block_succs(block) {
            if !func.block_preds(succ).contains(&block) {
                return Err(MethodError::InconsistentEdge {
                    from: block,
                    to: succ,
                });
            }
        }
        for &pred in func.block_preds(block) {
            if !func.block_succs(pred).contains(&block) {
                return Err(MethodError::InconsistentEdge {
                    from: pred,
                    to: block,
                });
            }
        }
    }

    let mut seen = EntitySet::new();
    seen.clear_and_resize(func.num_insts());
    for block in func.blocks() {
        for &inst in func.block_insts(block) {
            if !seen.insert(inst) {
                return Err(MethodError::DuplicateInst(inst));
            }

            let opcode = func.inst_opcode(inst);
            if opcode == Opcode::PreStateSrc {
                return Err(MethodError::ReservedOpcode(inst));
            }
            if func.inst_dest(inst) == Some(Reg::RESULT)
                || func.inst_srcs(inst).contains(&Reg::RESULT)
            {
                return Err(MethodError::ResultRegister(inst));
            }
            if opcode.is_move() && (func.inst_dest(inst).is_none() || func.inst_srcs(inst).len() != 1)
            {
                return Err(MethodError::BadMoveShape(inst));
            }
            if opcode.is_move_result_any()
                && (func.inst_dest(inst).is_none() || !func.inst_srcs(inst).is_empty())
            {
                return Err(MethodError::BadMoveShape(inst));
            }
        }
    }

    Ok(())
}
