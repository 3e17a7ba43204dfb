use inkwell::context::Context;
use pretty_assertions::assert_eq;
use strata_llir::SimpleCx;
use strata_types::{Idx, RecordDef};

use crate::test_helpers::Fixture;

fn render(fx: &mut Fixture<'_, '_>, ty: Idx) -> String {
    let mut cx = fx.lowerer();
    let lowered = cx.mem_type(ty);
    cx.builder().display_type(lowered)
}

#[test]
fn dynamic_arrays_are_length_pointer_pairs() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let nested = fx.pool.dyn_array(ints);
    assert_eq!(render(&mut fx, ints), "{ i64, i32* }");
    assert_eq!(render(&mut fx, nested), "{ i64, { i64, i32* }* }");
}

#[test]
fn bool_storage_is_a_byte() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let flags = fx.pool.fixed_array(Idx::BOOL, 4);
    assert_eq!(render(&mut fx, flags), "[4 x i8]");

    let mut cx = fx.lowerer();
    let value = cx.value_type(Idx::BOOL);
    let mem = cx.mem_type(Idx::BOOL);
    assert_eq!(cx.builder().display_type(value), "i1");
    assert_eq!(cx.builder().display_type(mem), "i8");
}

#[test]
fn vectors_and_characters() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let vec4 = fx.pool.vector(Idx::FLOAT, 4);
    let wstr = fx.pool.dyn_array(Idx::WCHAR);
    assert_eq!(render(&mut fx, vec4), "<4 x float>");
    assert_eq!(render(&mut fx, wstr), "{ i64, i16* }");
}

#[test]
fn self_referential_records_terminate() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let node = fx.pool.declare_record("Node", strata_types::RecordKind::Struct);
    let next = fx.pool.pointer(node);
    let children = fx.pool.dyn_array(node);
    fx.pool.define_record(
        node,
        RecordDef::new_struct("Node")
            .field("value", Idx::INT)
            .field("next", next)
            .field("children", children),
    );
    assert_eq!(render(&mut fx, node), "%Node");

    let mut cx = fx.lowerer();
    let lowered = cx.mem_type(node);
    let b = cx.builder();
    let fields: Vec<String> = b
        .struct_field_types(lowered)
        .into_iter()
        .map(|f| b.display_type(f))
        .collect();
    assert_eq!(fields, vec!["i32", "%Node*", "{ i64, %Node* }"]);
}

#[test]
fn union_layout_matches_the_pool() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let bytes = fx.pool.fixed_array(Idx::UBYTE, 12);
    let u = fx.pool.record(
        RecordDef::new_union("U")
            .field("small", Idx::BYTE)
            .field("wide", Idx::LONG)
            .field("raw", bytes),
    );
    let size = fx.pool.size_of(u);
    let align = fx.pool.align_of(u);

    let mut cx = fx.lowerer();
    assert_eq!(cx.union_main_member(u), Some(1));
    let lowered = cx.mem_type(u);
    let b = cx.builder();
    let fields: Vec<String> = b
        .struct_field_types(lowered)
        .into_iter()
        .map(|f| b.display_type(f))
        .collect();
    assert_eq!(fields, vec!["i64", "[8 x i8]"]);
    assert_eq!(b.size_of(lowered), size);
    assert_eq!(b.align_of(lowered), align);
}

#[test]
fn record_layout_matches_the_pool() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let s = fx.pool.record(
        RecordDef::new_struct("S")
            .field("a", Idx::BYTE)
            .field("b", Idx::INT)
            .field("c", Idx::SHORT)
            .field("d", Idx::DOUBLE),
    );
    let empty = fx.pool.record(RecordDef::new_struct("Empty"));
    let offsets = fx.pool.record_layout(s).offsets.clone();
    let size = fx.pool.size_of(s);

    let mut cx = fx.lowerer();
    let lowered = cx.mem_type(s);
    let lowered_empty = cx.mem_type(empty);
    let b = cx.builder();
    let ir_offsets: Vec<u64> = (0..4).map(|i| b.field_offset(lowered, i)).collect();
    assert_eq!(ir_offsets, offsets);
    assert_eq!(b.size_of(lowered), size);
    assert_eq!(b.size_of(lowered_empty), 1);
}
