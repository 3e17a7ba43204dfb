use inkwell::context::Context;
use pretty_assertions::assert_eq;
use strata_llir::SimpleCx;
use strata_types::{Idx, RecordDef, RecordKind};

use crate::test_helpers::Fixture;

#[test]
fn dynamic_array_descriptor_chains_to_its_element() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let desc = fx.lowerer().type_desc(ints);

    assert!(fx.builder.is_const(desc));
    let module = scx.print_to_string();
    assert!(
        module.contains("@\"strata.typeinfo.int[]\" = private unnamed_addr constant"),
        "{module}"
    );
    // size, align, kind DynArray, flags ZERO_INIT, no dimension, element.
    let slice = concat!(
        "{ i64 16, i64 8, i32 5, i32 1, i64 0, ",
        "%strata.TypeInfo* @strata.typeinfo.int,"
    );
    assert!(module.contains(slice), "{module}");
    let int = "{ i64 4, i64 4, i32 1, i32 1, i64 0, %strata.TypeInfo* null,";
    assert!(module.contains(int), "{module}");
}

#[test]
fn descriptors_are_created_once_per_type() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints = fx.pool.dyn_array(Idx::INT);
    let four = fx.pool.fixed_array(Idx::INT, 4);
    let mut cx = fx.lowerer();
    let first = cx.type_desc(ints);
    let second = cx.type_desc(ints);
    cx.type_desc(four);

    assert_eq!(first, second);
    let module = scx.print_to_string();
    assert_eq!(module.matches("@strata.typeinfo.int = ").count(), 1);
    let fixed = "i32 6, i32 1, i64 4, %strata.TypeInfo* @strata.typeinfo.int,";
    assert!(module.contains(fixed), "{module}");
}

#[test]
fn recursive_struct_descriptor_terminates() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let node = fx.pool.declare_record("Node", RecordKind::Struct);
    let children = fx.pool.dyn_array(node);
    fx.pool.define_record(
        node,
        RecordDef::new_struct("Node")
            .field("children", children)
            .field("value", Idx::INT),
    );
    fx.lowerer().type_desc(node);
    fx.builder.ret_void();

    let module = scx.print_to_string();
    assert_eq!(module.matches("@strata.typeinfo.Node = ").count(), 1);
    assert_eq!(module.matches("@\"strata.typeinfo.Node[]\" = ").count(), 1);
    let children = "%strata.FieldInfo { i64 0, %strata.TypeInfo* @\"strata.typeinfo.Node[]\" }";
    let value = "%strata.FieldInfo { i64 16, %strata.TypeInfo* @strata.typeinfo.int }";
    assert!(module.contains(children), "{module}");
    assert!(module.contains(value), "{module}");
    assert_eq!(scx.verify(), Ok(()));
}

#[test]
fn record_hooks_are_referenced_by_address() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let counted = fx.pool.record(
        RecordDef::new_struct("Counted")
            .field("n", Idx::INT)
            .with_postblit()
            .with_destructor(),
    );
    fx.lowerer().type_desc(counted);
    fx.builder.ret_void();

    let module = scx.print_to_string();
    assert!(module.contains("declare void @Counted.__postblit(i8*)"), "{module}");
    assert!(module.contains("declare void @Counted.__dtor(i8*)"), "{module}");
    // kind Struct, flags ZERO_INIT | NEEDS_POSTBLIT | NEEDS_DESTROY.
    assert!(module.contains("i32 7, i32 7, i64 0,"), "{module}");
    let hooks = "void (i8*)* @Counted.__postblit, void (i8*)* @Counted.__dtor }";
    assert!(module.contains(hooks), "{module}");
    assert_eq!(scx.verify(), Ok(()));
}

#[test]
fn unions_carry_no_fields() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let u = fx.pool.record(
        RecordDef::new_union("U")
            .field("small", Idx::BYTE)
            .field("wide", Idx::LONG),
    );
    fx.lowerer().type_desc(u);

    let module = scx.print_to_string();
    assert!(!module.contains("@strata.fields"), "{module}");
    let no_fields = concat!(
        "i32 8, i32 1, i64 0, %strata.TypeInfo* null, i8* null, ",
        "%strata.FieldInfo* null, i64 0,"
    );
    assert!(module.contains(no_fields), "{module}");
}

#[test]
fn non_zero_defaults_carry_their_bytes() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let chars = fx.pool.dyn_array(Idx::CHAR);
    fx.lowerer().type_desc(chars);

    let module = scx.print_to_string();
    assert!(
        module.contains("@strata.init = private unnamed_addr constant [1 x i8] c\"\\FF\""),
        "{module}"
    );
}
