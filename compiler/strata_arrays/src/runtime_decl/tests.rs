use inkwell::context::Context;
use pretty_assertions::assert_eq;
use rustc_hash::FxHashSet;
use strata_llir::{IrBuilder, SimpleCx};

use super::RuntimeFn;

#[test]
fn symbols_are_unique_and_prefixed() {
    let mut seen = FxHashSet::default();
    for rt in RuntimeFn::ALL {
        assert!(rt.symbol().starts_with("strata_array_"), "{rt:?}");
        assert!(seen.insert(rt.symbol()), "duplicate symbol {}", rt.symbol());
    }
}

#[test]
fn only_bounds_failure_is_noreturn() {
    let noreturn: Vec<_> = RuntimeFn::ALL
        .into_iter()
        .filter(|rt| rt.is_no_return())
        .collect();
    assert_eq!(noreturn, vec![RuntimeFn::BoundsFail]);
}

#[test]
fn signatures_render_in_ir_syntax() {
    let ctx = Context::create();
    let scx = SimpleCx::new(&ctx, "rt");
    let mut b = IrBuilder::new(&scx);
    let render = |b: &mut IrBuilder<'_, '_>, rt: RuntimeFn| {
        let (params, ret) = rt.signature(b);
        let params: Vec<String> = params.iter().map(|&p| b.display_type(p)).collect();
        format!("{} ({})", b.display_type(ret), params.join(", "))
    };
    assert_eq!(
        render(&mut b, RuntimeFn::AppendCap),
        "{ i64, i8* } (i8*, { i64, i8* }*, i64)"
    );
    assert_eq!(
        render(&mut b, RuntimeFn::SetAssign),
        "void (i8*, i8*, i32, i8*)"
    );
    assert_eq!(render(&mut b, RuntimeFn::CastLen), "i64 (i64, i64, i64)");
    assert_eq!(
        render(&mut b, RuntimeFn::BoundsFail),
        "void ({ i64, i8* }, i32)"
    );
    drop(b);
}
