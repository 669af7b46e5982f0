//! End-to-end tests of the analysis and the patch on small method bodies.

use alloc::format;
use alloc::vec::Vec;

use crate::debug_utils::{inst, validate_method, DisplayMethod, GenericMethod};
use crate::method::{Block, Method, MethodRef, Reg, TypeRef};
use crate::opcode::Opcode;
use crate::{CommonSubexprElimination, Stats};

const V0: Reg = Reg::new(0);
const V1: Reg = Reg::new(1);
const V2: Reg = Reg::new(2);
const V3: Reg = Reg::new(3);

/// Runs the pass on `method`, validating the body before and after.
fn run_cse(method: &mut GenericMethod) -> (bool, Stats) {
    validate_method(method).unwrap();
    let signature = method.signature();
    let mut cse = CommonSubexprElimination::new(method);
    let changed = cse.patch(method, &signature);
    validate_method(method).unwrap();
    (changed, cse.stats())
}

/// The (opcode, dest, srcs) triples of a block, in program order.
fn block_shape(method: &GenericMethod, block: Block) -> Vec<(Opcode, Option<Reg>, Vec<Reg>)> {
    method
        .block_insts(block)
        .iter()
        .map(|&i| {
            (
                method.inst_opcode(i),
                method.inst_dest(i),
                method.inst_srcs(i).to_vec(),
            )
        })
        .collect()
}

#[test]
fn pure_arithmetic_is_forwarded() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::AddInt).dest(V3).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.results_captured, 1);
    assert_eq!(stats.instructions_eliminated, 1);

    // The earlier result is captured in a scratch register right after its
    // definition, and the later destination is overwritten from it.
    let temp = Reg::new(4);
    assert_eq!(
        block_shape(&m, b0),
        [
            (Opcode::AddInt, Some(V2), [V0, V1].to_vec()),
            (Opcode::Move, Some(temp), [V2].to_vec()),
            (Opcode::AddInt, Some(V3), [V0, V1].to_vec()),
            (Opcode::Move, Some(V3), [temp].to_vec()),
            (Opcode::ReturnVoid, None, Vec::new()),
        ]
    );
}

#[test]
fn commutative_operands_are_canonicalized() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::AddInt).dest(V3).srcs([V1, V0]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.results_captured, 1);
    assert_eq!(stats.instructions_eliminated, 1);
}

#[test]
fn non_commutative_operands_are_not_swapped() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::SubInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::SubInt).dest(V3).srcs([V1, V0]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

#[test]
fn same_top_register_used_twice_mints_one_placeholder() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::MulInt).dest(V2).srcs([V0, V0]));
    m.push_inst(b0, inst(Opcode::MulInt).dest(V3).srcs([V0, V0]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.instructions_eliminated, 1);
}

#[test]
fn parameters_are_never_captured() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let lp0 = m.push_inst(b0, inst(Opcode::LoadParam).dest(V0));
    let lp1 = m.push_inst(b0, inst(Opcode::LoadParam).dest(V1));
    let add = m.push_inst(b0, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::AddInt).dest(V3).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.results_captured, 1);
    assert_eq!(stats.instructions_eliminated, 1);

    // The capture goes after the first add, never after a load-param.
    let insts = m.block_insts(b0);
    assert_eq!(insts[0], lp0);
    assert_eq!(insts[1], lp1);
    assert_eq!(insts[2], add);
    assert!(m.inst_opcode(insts[3]).is_move());
}

#[test]
fn moves_are_not_forwarded() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::LoadParam).dest(V0));
    m.push_inst(b0, inst(Opcode::Move).dest(V1).srcs([V0]));
    m.push_inst(b0, inst(Opcode::Move).dest(V2).srcs([V0]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

#[test]
fn heap_read_without_intervening_write_is_forwarded() {
    let mut m = GenericMethod::new();
    let field = m.add_field(false);
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::Iget).dest(V1).srcs([V0]).field(field));
    m.push_inst(b0, inst(Opcode::Iget).dest(V2).srcs([V0]).field(field));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.instructions_eliminated, 1);
}

#[test]
fn heap_read_across_a_store_is_not_forwarded() {
    let mut m = GenericMethod::new();
    let field = m.add_field(false);
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::Iget).dest(V1).srcs([V0]).field(field));
    m.push_inst(b0, inst(Opcode::Iput).srcs([V3, V0]).field(field));
    m.push_inst(b0, inst(Opcode::Iget).dest(V2).srcs([V0]).field(field));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

#[test]
fn heap_read_across_an_invoke_is_not_forwarded() {
    let mut m = GenericMethod::new();
    let field = m.add_field(false);
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::Sget).dest(V0).field(field));
    m.push_inst(
        b0,
        inst(Opcode::InvokeStatic).method_ref(MethodRef::new(0)),
    );
    m.push_inst(b0, inst(Opcode::Sget).dest(V1).field(field));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

#[test]
fn volatile_reads_are_not_forwarded() {
    let mut m = GenericMethod::new();
    let field = m.add_field(true);
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::Sget).dest(V0).field(field));
    m.push_inst(b0, inst(Opcode::Sget).dest(V1).field(field));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

#[test]
fn unresolved_field_reads_are_not_forwarded() {
    let mut m = GenericMethod::new();
    let field = m.add_unresolved_field();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::Iget).dest(V1).srcs([V0]).field(field));
    m.push_inst(b0, inst(Opcode::Iget).dest(V2).srcs([V0]).field(field));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

#[test]
fn identical_invokes_are_not_unified() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let callee = MethodRef::new(3);
    m.push_inst(b0, inst(Opcode::InvokeStatic).method_ref(callee));
    m.push_inst(b0, inst(Opcode::MoveResult).dest(V0));
    m.push_inst(b0, inst(Opcode::InvokeStatic).method_ref(callee));
    m.push_inst(b0, inst(Opcode::MoveResult).dest(V1));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

#[test]
fn check_cast_forwards_through_move_result_pseudo() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let ty = TypeRef::new(7);
    m.push_inst(b0, inst(Opcode::LoadParamObject).dest(V0));
    m.push_inst(b0, inst(Opcode::CheckCast).srcs([V0]).type_ref(ty));
    let pseudo1 = m.push_inst(b0, inst(Opcode::MoveResultPseudoObject).dest(V1));
    m.push_inst(b0, inst(Opcode::CheckCast).srcs([V0]).type_ref(ty));
    m.push_inst(b0, inst(Opcode::MoveResultPseudoObject).dest(V2));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.results_captured, 1);
    assert_eq!(stats.instructions_eliminated, 1);

    // The first move-result-pseudo is the captured definition, and the copies
    // use object moves since the value is a reference.
    let insts = m.block_insts(b0);
    assert_eq!(insts[2], pseudo1);
    assert_eq!(m.inst_opcode(insts[3]), Opcode::MoveObject);
    assert_eq!(m.inst_srcs(insts[3]), [V1]);
    assert_eq!(m.inst_opcode(insts[6]), Opcode::MoveObject);
    assert_eq!(m.inst_dest(insts[6]), Some(V2));
}

#[test]
fn wide_results_are_captured_in_a_register_pair() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let (v4, v6) = (Reg::new(4), Reg::new(6));
    m.push_inst(b0, inst(Opcode::AddLong).wide_dest(v4).srcs([V0, V2]));
    m.push_inst(b0, inst(Opcode::AddLong).wide_dest(v6).srcs([V0, V2]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.instructions_eliminated, 1);

    // The scratch register is a fresh pair past v6/v7.
    let temp = Reg::new(8);
    assert_eq!(
        block_shape(&m, b0),
        [
            (Opcode::AddLong, Some(v4), [V0, V2].to_vec()),
            (Opcode::MoveWide, Some(temp), [v4].to_vec()),
            (Opcode::AddLong, Some(v6), [V0, V2].to_vec()),
            (Opcode::MoveWide, Some(v6), [temp].to_vec()),
            (Opcode::ReturnVoid, None, Vec::new()),
        ]
    );
}

#[test]
fn object_results_are_captured_with_object_moves() {
    let mut m = GenericMethod::new();
    let field = m.add_field(false);
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::LoadParamObject).dest(V0));
    m.push_inst(
        b0,
        inst(Opcode::IgetObject).dest(V1).srcs([V0]).field(field),
    );
    m.push_inst(
        b0,
        inst(Opcode::IgetObject).dest(V2).srcs([V0]).field(field),
    );
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.instructions_eliminated, 1);
    let insts = m.block_insts(b0);
    assert_eq!(m.inst_opcode(insts[2]), Opcode::MoveObject);
    assert_eq!(m.inst_opcode(insts[4]), Opcode::MoveObject);
}

/// A diamond where the value is computed before the branch and recomputed
/// after the join: the definition survives on both paths and the recompute is
/// forwarded.
#[test]
fn diamond_forwards_a_value_computed_before_the_branch() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let b1 = m.create_block();
    let b2 = m.create_block();
    let b3 = m.create_block();
    m.add_edge(b0, b1);
    m.add_edge(b0, b2);
    m.add_edge(b1, b3);
    m.add_edge(b2, b3);

    let early = m.push_inst(b0, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::IfEqz).srcs([V2]));
    m.push_inst(b1, inst(Opcode::Goto));
    m.push_inst(b2, inst(Opcode::Goto));
    let late = m.push_inst(b3, inst(Opcode::AddInt).dest(V3).srcs([V0, V1]));
    m.push_inst(b3, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.results_captured, 1);
    assert_eq!(stats.instructions_eliminated, 1);

    // Capture right after the early definition, use right after the late one.
    assert_eq!(m.block_insts(b0)[0], early);
    assert!(m.inst_opcode(m.block_insts(b0)[1]).is_move());
    assert_eq!(m.block_insts(b3)[0], late);
    assert!(m.inst_opcode(m.block_insts(b3)[1]).is_move());
}

/// Two arms of a diamond computing the same expression independently do not
/// unify: each arm's pre-state placeholders are anchored at its own
/// instruction, so the definitions conflict at the join.
#[test]
fn diamond_arms_do_not_unify() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let b1 = m.create_block();
    let b2 = m.create_block();
    let b3 = m.create_block();
    m.add_edge(b0, b1);
    m.add_edge(b0, b2);
    m.add_edge(b1, b3);
    m.add_edge(b2, b3);

    m.push_inst(b0, inst(Opcode::IfEqz).srcs([V0]));
    m.push_inst(b1, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b2, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b3, inst(Opcode::AddInt).dest(V3).srcs([V0, V1]));
    m.push_inst(b3, inst(Opcode::ReturnVoid));

    let (changed, _) = run_cse(&mut m);
    assert!(!changed);
}

/// After a join reset a register to unknown, the first use re-establishes
/// tracking through a pre-state placeholder and later recomputations forward
/// to it.
#[test]
fn pre_state_placeholders_recover_after_a_join() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let b1 = m.create_block();
    let b2 = m.create_block();
    let b3 = m.create_block();
    m.add_edge(b0, b1);
    m.add_edge(b0, b2);
    m.add_edge(b1, b3);
    m.add_edge(b2, b3);

    m.push_inst(b0, inst(Opcode::IfEqz).srcs([Reg::new(9)]));
    m.push_inst(b1, inst(Opcode::Const).dest(V0).literal(1));
    m.push_inst(b2, inst(Opcode::Const).dest(V0).literal(2));
    let first = m.push_inst(b3, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b3, inst(Opcode::AddInt).dest(V3).srcs([V0, V1]));
    m.push_inst(b3, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.results_captured, 1);
    assert_eq!(stats.instructions_eliminated, 1);
    assert_eq!(m.block_insts(b3)[0], first);
    assert!(m.inst_opcode(m.block_insts(b3)[1]).is_move());
}

/// A loop body recomputing a value defined before the loop forwards to the
/// pre-loop definition, and the solver terminates on the back edge.
#[test]
fn loop_carried_value_is_forwarded() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    let b1 = m.create_block();
    let b2 = m.create_block();
    m.add_edge(b0, b1);
    m.add_edge(b1, b1);
    m.add_edge(b1, b2);

    let early = m.push_inst(b0, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b1, inst(Opcode::AddInt).dest(V3).srcs([V0, V1]));
    m.push_inst(b1, inst(Opcode::IfEqz).srcs([V3]));
    m.push_inst(b2, inst(Opcode::ReturnVoid));

    let (changed, stats) = run_cse(&mut m);
    assert!(changed);
    assert_eq!(stats.results_captured, 1);
    assert_eq!(stats.instructions_eliminated, 1);
    assert_eq!(m.block_insts(b0)[0], early);
    assert!(m.inst_opcode(m.block_insts(b0)[1]).is_move());
}

#[test]
fn patch_without_forwardings_changes_nothing() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let before = m.num_insts();
    let (changed, stats) = run_cse(&mut m);
    assert!(!changed);
    assert_eq!(m.num_insts(), before);
    assert_eq!(stats, Stats::default());
}

#[test]
fn stats_merge_is_commutative_accumulation() {
    let mut a = Stats {
        results_captured: 1,
        instructions_eliminated: 2,
    };
    let b = Stats {
        results_captured: 3,
        instructions_eliminated: 4,
    };
    let mut c = b;
    a.merge(b);
    c.merge(Stats {
        results_captured: 1,
        instructions_eliminated: 2,
    });
    assert_eq!(a, c);
    assert_eq!(a.results_captured, 4);
    assert_eq!(a.instructions_eliminated, 6);
    assert_eq!(format!("{a}"), "results_captured: 4, instructions_eliminated: 6");
}

#[test]
fn display_renders_the_method_body() {
    let mut m = GenericMethod::new();
    let b0 = m.create_block();
    m.push_inst(b0, inst(Opcode::Const).dest(V0).literal(7));
    m.push_inst(b0, inst(Opcode::AddInt).dest(V2).srcs([V0, V1]));
    m.push_inst(b0, inst(Opcode::ReturnVoid));

    let rendered = format!("{}", DisplayMethod(&m));
    assert!(rendered.contains("block0:"));
    assert!(rendered.contains("v0 = const #7"));
    assert!(rendered.contains("v2 = add-int v0, v1"));
}
