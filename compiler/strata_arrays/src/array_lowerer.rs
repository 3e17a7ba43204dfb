//! The array lowering context.
//!
//! `ArrayLowerer` is the explicitly passed code-generation context: the IR
//! builder with its insertion point, the type pool, the expression arena,
//! the diagnostic sink and the per-module caches (runtime declarations,
//! lowered types, hook obligations, local slots, file-name constants).
//!
//! Operations are implemented in the `lower_*.rs` files as further
//! `impl ArrayLowerer` blocks.

use rustc_hash::FxHashMap;
use strata_diagnostic::{Diagnostic, DiagnosticQueue, ErrorGuaranteed};
use strata_ir::{ExprArena, FileId, VarId};
use strata_llir::{FunctionId, GlobalId, IrBuilder, TyId, ValueId};
use strata_types::{Idx, Pool};

use crate::lower_assign::Obligation;
use crate::type_info::TypeInfoTypes;
use crate::{LoweringConfig, RuntimeFn};

/// Lowers array operations of one function body into IR.
///
/// The builder must be positioned inside a defined function; every
/// operation emits at the current insertion point and leaves it at the
/// point where the surrounding code continues.
pub struct ArrayLowerer<'a, 'scx, 'ctx> {
    /// Instruction builder over the module under construction.
    pub(crate) builder: &'a mut IrBuilder<'scx, 'ctx>,
    /// Type pool. Mutable because comparisons intern the common
    /// dynamic array type of their operands.
    pub(crate) pool: &'a mut Pool,
    /// Typed expressions handed over by the front end.
    pub(crate) arena: &'a ExprArena,
    pub(crate) diagnostics: &'a mut DiagnosticQueue,
    pub(crate) config: LoweringConfig,
    /// Runtime entry points declared in this module.
    runtime: FxHashMap<RuntimeFn, FunctionId>,
    /// Source type -> IR memory type.
    pub(crate) mem_types: FxHashMap<Idx, TyId>,
    /// Element type -> hook obligation, computed once per type.
    pub(crate) obligations: FxHashMap<Idx, Obligation>,
    /// Stack slots of locals, created on first use.
    locals: FxHashMap<VarId, ValueId>,
    /// File-name constants passed to the bounds-failure entry.
    pub(crate) file_names: FxHashMap<FileId, ValueId>,
    /// `%strata.TypeInfo` globals, one per source type.
    pub(crate) type_infos: FxHashMap<Idx, GlobalId>,
    pub(crate) type_info_types: Option<TypeInfoTypes>,
}

impl<'a, 'scx, 'ctx> ArrayLowerer<'a, 'scx, 'ctx> {
    pub fn new(
        builder: &'a mut IrBuilder<'scx, 'ctx>,
        pool: &'a mut Pool,
        arena: &'a ExprArena,
        diagnostics: &'a mut DiagnosticQueue,
        config: LoweringConfig,
    ) -> Self {
        Self {
            builder,
            pool,
            arena,
            diagnostics,
            config,
            runtime: FxHashMap::default(),
            mem_types: FxHashMap::default(),
            obligations: FxHashMap::default(),
            locals: FxHashMap::default(),
            file_names: FxHashMap::default(),
            type_infos: FxHashMap::default(),
            type_info_types: None,
        }
    }

    pub fn config(&self) -> LoweringConfig {
        self.config
    }

    /// The builder, for the surrounding code generator to emit around
    /// array operations.
    pub fn builder(&mut self) -> &mut IrBuilder<'scx, 'ctx> {
        self.builder
    }

    pub fn pool(&self) -> &Pool {
        self.pool
    }

    pub fn arena(&self) -> &'a ExprArena {
        self.arena
    }

    // -----------------------------------------------------------------------
    // Locals
    // -----------------------------------------------------------------------

    /// Use `slot` as the storage of a local variable.
    pub fn bind_local(&mut self, var: VarId, slot: ValueId) {
        let expected = self.mem_type(self.arena.local(var).ty);
        debug_assert_eq!(
            self.builder.pointee_of(slot),
            expected,
            "slot of `{}` has the wrong type",
            self.arena.local(var).name
        );
        self.locals.insert(var, slot);
    }

    /// Storage of a local variable; a fresh stack slot on first use.
    pub fn local_slot(&mut self, var: VarId) -> ValueId {
        if let Some(&slot) = self.locals.get(&var) {
            return slot;
        }
        let arena = self.arena;
        let local = arena.local(var);
        let ty = self.mem_type(local.ty);
        let slot = self.builder.alloca(ty, &local.name);
        self.locals.insert(var, slot);
        slot
    }

    // -----------------------------------------------------------------------
    // Runtime support
    // -----------------------------------------------------------------------

    /// Declaration of a runtime entry point, created on first use.
    pub fn runtime_fn(&mut self, rt: RuntimeFn) -> FunctionId {
        if let Some(&id) = self.runtime.get(&rt) {
            return id;
        }
        let (params, ret) = rt.signature(self.builder);
        let id = self.builder.declare_function(rt.symbol(), &params, ret);
        if rt.is_no_return() {
            self.builder.set_no_return(id);
        }
        self.runtime.insert(rt, id);
        id
    }

    /// Call a runtime entry point; `None` for the `void` ones.
    pub(crate) fn call_runtime(
        &mut self,
        rt: RuntimeFn,
        args: &[ValueId],
        name: &str,
    ) -> Option<ValueId> {
        let callee = self.runtime_fn(rt);
        tracing::trace!(symbol = rt.symbol(), "runtime call");
        self.builder.call(callee, args, name)
    }

    /// Call a runtime entry point that returns a value.
    pub(crate) fn call_runtime_value(
        &mut self,
        rt: RuntimeFn,
        args: &[ValueId],
        name: &str,
    ) -> ValueId {
        match self.call_runtime(rt, args, name) {
            Some(v) => v,
            None => panic!("internal error: `{}` returns no value", rt.symbol()),
        }
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub(crate) fn emit_error(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        tracing::debug!(code = %diag.code, "array lowering error");
        self.diagnostics.emit_error(diag)
    }
}
