use inkwell::context::Context;
use inkwell::values::InstructionOpcode;
use pretty_assertions::assert_eq;
use strata_diagnostic::ErrorCode;
use strata_ir::Loc;
use strata_llir::SimpleCx;
use strata_types::Idx;

use crate::test_helpers::Fixture;
use crate::{ArrayLowerer, ArrayValue};

fn local(cx: &mut ArrayLowerer<'_, '_, '_>, ty: Idx) -> ArrayValue {
    let mem = cx.mem_type(ty);
    let ptr = cx.builder().alloca(mem, "a");
    ArrayValue::Addressable { ty, ptr }
}

#[test]
fn same_element_size_keeps_the_length() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let uints = fx.pool.dyn_array(Idx::UINT);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, ints);
    let cast = cx.cast_array(a, uints, Loc::DUMMY);

    assert!(matches!(cast, Ok(ArrayValue::DecomposedSlice { ty, .. }) if ty == uints));
    assert!(fx.callees().is_empty());
}

#[test]
fn different_element_size_rescales_at_run_time() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let shorts = fx.pool.dyn_array(Idx::SHORT);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, ints);
    assert!(cx.cast_array(a, shorts, Loc::DUMMY).is_ok());

    assert_eq!(fx.callees(), vec!["strata_array_cast_len"]);
}

#[test]
fn fixed_source_length_is_folded() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let four = fx.pool.fixed_array(Idx::INT, 4);
    let shorts = fx.pool.dyn_array(Idx::SHORT);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, four);
    let Ok(ArrayValue::DecomposedSlice { len, .. }) = cx.cast_array(a, shorts, Loc::DUMMY) else {
        panic!("expected a slice");
    };

    assert_eq!(cx.builder().as_const_int(len), Some(8));
    assert!(fx.callees().is_empty());
}

#[test]
fn misaligned_fixed_source_is_rejected() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let file = fx.arena.add_file("cast.st");
    let three = fx.pool.fixed_array(Idx::BYTE, 3);
    let ints = fx.pool.dyn_array(Idx::INT);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, three);
    assert!(cx.cast_array(a, ints, Loc::new(file, 7)).is_err());

    let diags = fx.diagnostics.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, ErrorCode::E4004);
    assert_eq!(
        diags[0].message,
        "cannot cast `byte[3]` to `int[]` since sizes don't line up"
    );
    assert_eq!(diags[0].labels[0].message, "3 bytes is not a multiple of 4");
    assert_eq!(diags[0].primary_loc(), Some(Loc::new(file, 7)));
}

#[test]
fn non_array_operand_is_rejected() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let mut cx = fx.lowerer();
    let x = local(&mut cx, Idx::INT);
    assert!(cx.cast_array(x, ints, Loc::DUMMY).is_err());

    assert_eq!(fx.diagnostics.diagnostics()[0].code, ErrorCode::E4003);
}

#[test]
fn dynamic_to_fixed_checks_the_last_element() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let bytes = fx.pool.dyn_array(Idx::UBYTE);
    let pair = fx.pool.fixed_array(Idx::INT, 2);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, bytes);
    let cast = cx.cast_array(a, pair, Loc::DUMMY);

    assert!(matches!(cast, Ok(ArrayValue::Addressable { ty, .. }) if ty == pair));
    assert_eq!(fx.block_names(), vec!["entry", "bounds.ok", "bounds.fail"]);
    // Index 7 of the byte array must exist for 8 bytes to be read.
    assert!(fx.ir().contains("icmp ult i64 7, "), "{}", fx.ir());
}

#[test]
fn zero_length_fixed_target_skips_the_check() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let empty = fx.pool.fixed_array(Idx::INT, 0);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, ints);
    assert!(cx.cast_array(a, empty, Loc::DUMMY).is_ok());

    assert_eq!(fx.block_names(), vec!["entry"]);
}

#[test]
fn zero_size_fixed_target_elements_skip_the_check() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let nothing = fx.pool.fixed_array(Idx::INT, 0);
    let nothings = fx.pool.dyn_array(nothing);
    let two_nothings = fx.pool.fixed_array(nothing, 2);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, nothings);
    let cast = cx.cast_array(a, two_nothings, Loc::DUMMY);

    assert!(matches!(cast, Ok(ArrayValue::Addressable { ty, .. }) if ty == two_nothings));
    assert_eq!(fx.block_names(), vec!["entry"]);
    assert_eq!(fx.count_insts(InstructionOpcode::ICmp), 0);
}

#[test]
fn truth_value_tests_the_pointer() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let mut cx = fx.lowerer();
    let a = local(&mut cx, ints);
    let cast = cx.cast_array(a, Idx::BOOL, Loc::DUMMY);

    assert!(matches!(cast, Ok(ArrayValue::Materialized { ty: Idx::BOOL, .. })));
    let preds: Vec<_> = fx
        .insts()
        .into_iter()
        .filter_map(|inst| inst.get_icmp_predicate())
        .collect();
    assert_eq!(preds, vec![inkwell::IntPredicate::NE]);
}
