//! Generic implementation of a [`Method`] which can be used for testing the
//! pass.

use alloc::vec;
use alloc::vec::Vec;

use crate::entity::PrimaryMap;
use crate::method::{
    Block, DataRef, FieldId, FieldRef, FieldSearch, Inst, Method, MethodRef, MethodSignature, Reg,
    RegType, StringRef, TypeRef,
};
use crate::opcode::Opcode;

#[derive(Clone)]
struct BlockData {
    insts: Vec<Inst>,
    preds: Vec<Block>,
    succs: Vec<Block>,
}

#[derive(Clone)]
struct InstData {
    opcode: Opcode,
    dest: Option<Reg>,
    dest_is_wide: bool,
    srcs: Vec<Reg>,
    literal: Option<i64>,
    type_ref: Option<TypeRef>,
    field: Option<FieldRef>,
    method: Option<MethodRef>,
    string: Option<StringRef>,
    data: Option<DataRef>,
    block: Block,
}

impl InstData {
    fn with_opcode(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            dest_is_wide: false,
            srcs: Vec::new(),
            literal: None,
            type_ref: None,
            field: None,
            method: None,
            string: None,
            data: None,
            block: Block::ENTRY_BLOCK,
        }
    }
}

/// Builder for one instruction of a [`GenericMethod`].
///
/// Created with [`inst`]; finished by passing it to
/// [`GenericMethod::push_inst`].
pub struct InstBuilder {
    data: InstData,
}

/// Starts building an instruction with the given opcode.
#[must_use]
pub fn inst(opcode: Opcode) -> InstBuilder {
    InstBuilder {
        data: InstData::with_opcode(opcode),
    }
}

impl InstBuilder {
    /// Sets the destination register.
    #[must_use]
    pub fn dest(mut self, reg: Reg) -> Self {
        self.data.dest = Some(reg);
        self
    }

    /// Sets the destination register pair, with `reg` as the low register.
    #[must_use]
    pub fn wide_dest(mut self, reg: Reg) -> Self {
        self.data.dest = Some(reg);
        self.data.dest_is_wide = true;
        self
    }

    /// Sets the source registers.
    #[must_use]
    pub fn srcs(mut self, regs: impl IntoIterator<Item = Reg>) -> Self {
        self.data.srcs = regs.into_iter().collect();
        self
    }

    /// Sets the literal payload.
    #[must_use]
    pub fn literal(mut self, literal: i64) -> Self {
        self.data.literal = Some(literal);
        self
    }

    /// Sets the type payload.
    #[must_use]
    pub fn type_ref(mut self, ty: TypeRef) -> Self {
        self.data.type_ref = Some(ty);
        self
    }

    /// Sets the field payload.
    #[must_use]
    pub fn field(mut self, field: FieldRef) -> Self {
        self.data.field = Some(field);
        self
    }

    /// Sets the method payload.
    #[must_use]
    pub fn method_ref(mut self, method: MethodRef) -> Self {
        self.data.method = Some(method);
        self
    }

    /// Sets the string payload.
    #[must_use]
    pub fn string(mut self, string: StringRef) -> Self {
        self.data.string = Some(string);
        self
    }

    /// Sets the data payload.
    #[must_use]
    pub fn data(mut self, data: DataRef) -> Self {
        self.data.data = Some(data);
        self
    }
}

/// A self-contained in-memory implementation of [`Method`].
///
/// Intended for tests and for experimenting with the pass; a real client
/// would implement [`Method`] directly on its own IR. Field resolution is
/// backed by a single registered pool (the static/instance distinction is
/// ignored), and type inference is a coarse stand-in derived from the opcode
/// and the wideness flag alone.
pub struct GenericMethod {
    blocks: PrimaryMap<Block, BlockData>,
    insts: PrimaryMap<Inst, InstData>,
    field_refs: PrimaryMap<FieldRef, Option<FieldId>>,
    field_volatile: PrimaryMap<FieldId, bool>,
    num_regs: u32,
}

impl GenericMethod {
    /// Creates an empty method with no blocks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: PrimaryMap::new(),
            insts: PrimaryMap::new(),
            field_refs: PrimaryMap::new(),
            field_volatile: PrimaryMap::new(),
            num_regs: 0,
        }
    }

    /// Appends an empty block. The first block created is the entry block.
    pub fn create_block(&mut self) -> Block {
        self.blocks.push(BlockData {
            insts: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        })
    }

    /// Records a control-flow edge on both of its ends.
    pub fn add_edge(&mut self, from: Block, to: Block) {
        self.blocks[from].succs.push(to);
        self.blocks[to].preds.push(from);
    }

    /// Appends an instruction to `block`.
    pub fn push_inst(&mut self, block: Block, builder: InstBuilder) -> Inst {
        let mut data = builder.data;
        data.block = block;
        self.note_regs(&data);
        let inst = self.insts.push(data);
        self.blocks[block].insts.push(inst);
        inst
    }

    /// Registers a resolvable field and returns a reference to it.
    pub fn add_field(&mut self, is_volatile: bool) -> FieldRef {
        let field = self.field_volatile.push(is_volatile);
        self.field_refs.push(Some(field))
    }

    /// Registers a field reference that fails to resolve.
    pub fn add_unresolved_field(&mut self) -> FieldRef {
        self.field_refs.push(None)
    }

    /// A signature for a static method with no arguments, good enough for the
    /// stand-in type inference.
    #[must_use]
    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            is_static: true,
            declaring_type: TypeRef::new(0),
            arg_types: Vec::new(),
        }
    }

    fn note_regs(&mut self, data: &InstData) {
        if let Some(dest) = data.dest {
            let width = if data.dest_is_wide { 2 } else { 1 };
            self.num_regs = self.num_regs.max(dest.number() + width);
        }
        for src in &data.srcs {
            self.num_regs = self.num_regs.max(src.number() + 1);
        }
    }
}

impl Default for GenericMethod {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the stand-in type inference considers the destination of this
/// opcode to be an object reference.
fn dest_is_reference(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::MoveObject
            | Opcode::MoveResultObject
            | Opcode::MoveResultPseudoObject
            | Opcode::LoadParamObject
            | Opcode::MoveException
            | Opcode::ConstString
            | Opcode::ConstClass
            | Opcode::CheckCast
            | Opcode::NewInstance
            | Opcode::NewArray
            | Opcode::FilledNewArray
            | Opcode::AgetObject
            | Opcode::IgetObject
            | Opcode::SgetObject
    )
}

impl Method for GenericMethod {
    fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn num_insts(&self) -> usize {
        self.insts.len()
    }

    fn block_insts(&self, block: Block) -> &[Inst] {
        &self.blocks[block].insts
    }

    fn block_succs(&self, block: Block) -> &[Block] {
        &self.blocks[block].succs
    }

    fn block_preds(&self, block: Block) -> &[Block] {
        &self.blocks[block].preds
    }

    fn inst_opcode(&self, inst: Inst) -> Opcode {
        self.insts[inst].opcode
    }

    fn inst_dest(&self, inst: Inst) -> Option<Reg> {
        self.insts[inst].dest
    }

    fn inst_dest_is_wide(&self, inst: Inst) -> bool {
        self.insts[inst].dest_is_wide
    }

    fn inst_srcs(&self, inst: Inst) -> &[Reg] {
        &self.insts[inst].srcs
    }

    fn inst_has_move_result(&self, inst: Inst) -> bool {
        let data = &self.insts[inst];
        if data.dest.is_some() {
            return false;
        }
        if data.opcode.is_invoke() || data.opcode == Opcode::FilledNewArray {
            return true;
        }
        // A potentially-throwing instruction built without a destination is
        // followed by a move-result-pseudo.
        let block_insts = &self.blocks[data.block].insts;
        let pos = block_insts.iter().position(|&i| i == inst).unwrap();
        block_insts
            .get(pos + 1)
            .is_some_and(|&next| self.insts[next].opcode.is_move_result_pseudo())
    }

    fn inst_literal(&self, inst: Inst) -> Option<i64> {
        self.insts[inst].literal
    }

    fn inst_type(&self, inst: Inst) -> Option<TypeRef> {
        self.insts[inst].type_ref
    }

    fn inst_field(&self, inst: Inst) -> Option<FieldRef> {
        self.insts[inst].field
    }

    fn inst_method(&self, inst: Inst) -> Option<MethodRef> {
        self.insts[inst].method
    }

    fn inst_string(&self, inst: Inst) -> Option<StringRef> {
        self.insts[inst].string
    }

    fn inst_data(&self, inst: Inst) -> Option<DataRef> {
        self.insts[inst].data
    }

    fn resolve_field(&self, field: FieldRef, _search: FieldSearch) -> Option<FieldId> {
        self.field_refs[field]
    }

    fn is_volatile(&self, field: FieldId) -> bool {
        self.field_volatile[field]
    }

    fn inferred_dest_type(&self, inst: Inst, _signature: &MethodSignature) -> Option<RegType> {
        let data = &self.insts[inst];
        data.dest?;
        Some(if dest_is_reference(data.opcode) {
            RegType::Reference
        } else if data.dest_is_wide {
            RegType::Wide
        } else {
            RegType::Scalar
        })
    }

    fn allocate_temp(&mut self) -> Reg {
        let reg = Reg::new(self.num_regs);
        self.num_regs += 1;
        reg
    }

    fn allocate_wide_temp(&mut self) -> Reg {
        let reg = Reg::new(self.num_regs);
        self.num_regs += 2;
        reg
    }

    fn insert_move_after(&mut self, anchor: Inst, opcode: Opcode, dest: Reg, src: Reg) -> Inst {
        let block = self.insts[anchor].block;
        let mut data = InstData::with_opcode(opcode);
        data.dest = Some(dest);
        data.dest_is_wide = opcode == Opcode::MoveWide;
        data.srcs = vec![src];
        data.block = block;
        self.note_regs(&data);
        let inst = self.insts.push(data);

        let block_insts = &mut self.blocks[block].insts;
        let pos = block_insts
            .iter()
            .position(|&i| i == anchor)
            .expect("anchor is not in its block");
        block_insts.insert(pos + 1, inst);
        inst
    }
}
