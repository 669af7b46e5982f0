//! The [`Method`] trait which describes the method body being optimized.
//!
//! The pass does not own an IR of its own: it reads the client's
//! control-flow graph and instructions through this trait and, when patching,
//! mutates them through a narrow set of methods. This keeps the pass
//! embeddable in an existing compiler without any conversion step.
//!
//! # Control flow graph and instructions
//!
//! The method body is a set of basic blocks, each holding a sequence of
//! instructions in program order, connected by successor/predecessor edges
//! which must be consistent with each other. Block 0 is the entry block and
//! may not have any predecessors.
//!
//! Both blocks and instructions are named by indices in contiguous index
//! spaces: [`Block`] and [`Inst`]. An `Inst` is the *stable identity* of an
//! instruction: it never moves or changes meaning, even as instructions are
//! inserted during patching, and it is used by the pass as a hash-map key and
//! as the anchor for insertions.
//!
//! # Instructions
//!
//! An instruction is described by its [`Opcode`], an optional destination
//! register (with a wideness flag for 64-bit primitives, which occupy a
//! register pair), a list of source registers, and at most one static
//! payload: a literal, a type/field/method/string reference, or an opaque
//! data blob. Instructions whose result is delivered through the implicit
//! [`Reg::RESULT`] slot (invokes, filled-new-array, and the
//! potentially-throwing instructions followed by a move-result-pseudo) have
//! no destination of their own and must report a move-result follower via
//! [`Method::inst_has_move_result`].
//!
//! # Resolution and type inference
//!
//! The pass needs two escape hatches into the wider program: field
//! resolution with volatility (to decide whether a field access is a memory
//! barrier) and type inference (to pick the width of the copies it inserts).
//! Both are deliberately left on the client side of this trait; a field that
//! fails to resolve is treated conservatively by the pass.

use alloc::vec::Vec;
use core::fmt;

use crate::entity::Keys;
use crate::opcode::Opcode;

entity_def! {
    /// An opaque reference to a basic block of the method.
    pub entity Block(u32, "block");

    /// The stable identity of an instruction in the method.
    ///
    /// Identities are assigned contiguously; instructions inserted by the
    /// patch are appended to the index space rather than renumbering existing
    /// instructions.
    pub entity Inst(u32, "inst");

    /// A reference to a type known to the client.
    pub entity TypeRef(u32, "type");

    /// A reference to a field as named by an instruction, prior to
    /// resolution.
    pub entity FieldRef(u32, "field");

    /// A reference to a method known to the client.
    pub entity MethodRef(u32, "method");

    /// A reference to an interned string.
    pub entity StringRef(u32, "string");

    /// A reference to an opaque data payload (e.g. the table of a
    /// fill-array-data).
    pub entity DataRef(u32, "data");

    /// A field definition produced by successful resolution of a
    /// [`FieldRef`].
    pub entity FieldId(u32, "field_def");
}

impl Block {
    /// The entry block is always block 0.
    pub const ENTRY_BLOCK: Block = Block(0);
}

/// A virtual register of the method.
///
/// Registers are non-negative integers. 64-bit primitives occupy the pair
/// `(r, r + 1)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Reg(u32);

impl Reg {
    /// The implicit slot holding the outcome of an invoke-class instruction
    /// until a subsequent move-result consumes it.
    ///
    /// `RESULT` never appears as the source or destination of an actual
    /// instruction.
    pub const RESULT: Reg = Reg(u32::MAX);

    /// Creates a register from its number.
    #[inline]
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the register number.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    /// Returns the upper half of the register pair starting at this register.
    #[inline]
    #[must_use]
    pub const fn pair_high(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::RESULT {
            f.write_str("result")
        } else {
            write!(f, "v{}", self.0)
        }
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Which pool a field reference is resolved against, determined by the opcode
/// family of the access.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FieldSearch {
    /// Resolution for sget/sput.
    Static,
    /// Resolution for iget/iput.
    Instance,
}

/// Coarse classification of the runtime type held in a register, as produced
/// by the client's type inference.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RegType {
    /// An object reference.
    Reference,
    /// A 32-bit primitive.
    Scalar,
    /// A 64-bit primitive occupying a register pair.
    Wide,
}

/// The parts of a method's signature that type inference needs: they seed the
/// types of the load-param instructions in the entry block.
#[derive(Clone, Debug)]
pub struct MethodSignature {
    /// Whether the method is static. Non-static methods receive the receiver
    /// object as their first parameter.
    pub is_static: bool,
    /// The type declaring the method.
    pub declaring_type: TypeRef,
    /// The argument types, in order.
    pub arg_types: Vec<TypeRef>,
}

/// A trait defined by the client to provide access to its IR / CFG
/// representation.
///
/// See the [module-level documentation] for more details.
///
/// [module-level documentation]: self
pub trait Method {
    // -------------
    // CFG traversal
    // -------------

    /// How many blocks are there?
    fn num_blocks(&self) -> usize;

    /// Iterator over all the [`Block`]s in this method.
    #[inline]
    fn blocks(&self) -> Keys<Block> {
        Keys::with_len(self.num_blocks())
    }

    /// How many instruction identities have been allocated?
    ///
    /// This is an upper bound on instruction indices, not a count of live
    /// instructions.
    fn num_insts(&self) -> usize;

    /// The instructions of `block` in program order.
    fn block_insts(&self, block: Block) -> &[Inst];

    /// Get CFG successors for a given block.
    fn block_succs(&self, block: Block) -> &[Block];

    /// Get CFG predecessors for a given block.
    fn block_preds(&self, block: Block) -> &[Block];

    // -----------------
    // Instruction reads
    // -----------------

    /// The opcode of an instruction.
    fn inst_opcode(&self, inst: Inst) -> Opcode;

    /// The destination register of an instruction, if it has one.
    fn inst_dest(&self, inst: Inst) -> Option<Reg>;

    /// Whether the destination holds a 64-bit primitive and therefore
    /// occupies a register pair.
    fn inst_dest_is_wide(&self, inst: Inst) -> bool;

    /// The source registers of an instruction. Wide sources are named by the
    /// low register of their pair.
    fn inst_srcs(&self, inst: Inst) -> &[Reg];

    /// Whether the instruction delivers its result through [`Reg::RESULT`],
    /// to be consumed by a following move-result or move-result-pseudo.
    fn inst_has_move_result(&self, inst: Inst) -> bool;

    /// The literal payload of a const or literal-arithmetic instruction.
    fn inst_literal(&self, inst: Inst) -> Option<i64>;

    /// The type payload of e.g. a check-cast, new-instance or const-class.
    fn inst_type(&self, inst: Inst) -> Option<TypeRef>;

    /// The field payload of a field access.
    fn inst_field(&self, inst: Inst) -> Option<FieldRef>;

    /// The method payload of an invoke.
    fn inst_method(&self, inst: Inst) -> Option<MethodRef>;

    /// The string payload of a const-string.
    fn inst_string(&self, inst: Inst) -> Option<StringRef>;

    /// The opaque data payload of a fill-array-data.
    fn inst_data(&self, inst: Inst) -> Option<DataRef>;

    // -------------------------
    // Resolution and inference
    // -------------------------

    /// Resolves a field reference against the given pool. `None` means the
    /// field could not be resolved; the pass treats accesses to such fields
    /// conservatively.
    fn resolve_field(&self, field: FieldRef, search: FieldSearch) -> Option<FieldId>;

    /// Whether a resolved field is volatile.
    fn is_volatile(&self, field: FieldId) -> bool;

    /// The inferred type of the destination register immediately after
    /// `inst` executes.
    ///
    /// Only queried for instructions that define a forwarded value. `None`
    /// (an unknown type) at such an instruction indicates a bug in the
    /// client's type inference and aborts the pass.
    fn inferred_dest_type(&self, inst: Inst, signature: &MethodSignature) -> Option<RegType>;

    // --------
    // Patching
    // --------

    /// Allocates a fresh register not used anywhere in the method.
    fn allocate_temp(&mut self) -> Reg;

    /// Allocates a fresh register pair not used anywhere in the method,
    /// returning the low register.
    fn allocate_wide_temp(&mut self) -> Reg;

    /// Inserts `dest := opcode src` immediately after `anchor`, which must be
    /// a non-terminator instruction, and returns the identity of the new
    /// instruction.
    fn insert_move_after(&mut self, anchor: Inst, opcode: Opcode, dest: Reg, src: Reg) -> Inst;
}
