use inkwell::context::Context;
use strata_llir::SimpleCx;
use strata_types::Idx;

use crate::test_helpers::Fixture;
use crate::ArrayValue;

/// A `{ len, ptr }` pair claiming a fixed array type.
fn pair_of(fx: &mut Fixture<'_, '_>, ty: Idx) -> ArrayValue {
    let len = fx.builder.const_i64(4);
    let i32 = fx.builder.i32_type();
    let i32_ptr = fx.builder.ptr_type(i32);
    let ptr = fx.builder.const_null(i32_ptr);
    ArrayValue::DecomposedSlice { ty, len, ptr }
}

#[test]
#[should_panic(expected = "internal error")]
fn length_of_a_null_fixed_array_is_a_compiler_bug() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints4 = fx.pool.fixed_array(Idx::INT, 4);
    fx.lowerer().array_len(ArrayValue::Null { ty: ints4 });
}

#[test]
#[should_panic(expected = "internal error")]
fn pointer_of_a_null_fixed_array_is_a_compiler_bug() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints4 = fx.pool.fixed_array(Idx::INT, 4);
    fx.lowerer().array_ptr(ArrayValue::Null { ty: ints4 });
}

#[test]
#[should_panic(expected = "internal error")]
fn length_of_a_fixed_array_pair_is_a_compiler_bug() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints4 = fx.pool.fixed_array(Idx::INT, 4);
    let pair = pair_of(&mut fx, ints4);
    fx.lowerer().array_len(pair);
}

#[test]
#[should_panic(expected = "internal error")]
fn pointer_of_a_fixed_array_pair_is_a_compiler_bug() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "test");
    let mut fx = Fixture::new(&scx);
    let ints4 = fx.pool.fixed_array(Idx::INT, 4);
    let pair = pair_of(&mut fx, ints4);
    fx.lowerer().array_ptr(pair);
}
