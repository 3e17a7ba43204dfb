//! Shared fixtures for unit tests.

use inkwell::values::{AnyValue, InstructionOpcode, InstructionValue};
use strata_diagnostic::DiagnosticQueue;
use strata_ir::ExprArena;
use strata_llir::{FunctionId, IrBuilder, SimpleCx};
use strata_types::Pool;

use crate::{ArrayLowerer, LoweringConfig};

/// Everything an `ArrayLowerer` borrows, with the builder positioned in
/// the entry block of a `void test_fn()`.
pub(crate) struct Fixture<'scx, 'ctx> {
    pub builder: IrBuilder<'scx, 'ctx>,
    pub pool: Pool,
    pub arena: ExprArena,
    pub diagnostics: DiagnosticQueue,
    pub config: LoweringConfig,
    func: FunctionId,
}

impl<'scx, 'ctx> Fixture<'scx, 'ctx> {
    pub fn new(scx: &'scx SimpleCx<'ctx>) -> Self {
        let mut builder = IrBuilder::new(scx);
        let void = builder.void_type();
        let func = builder.define_function("test_fn", &[], void);
        Fixture {
            builder,
            pool: Pool::new(),
            arena: ExprArena::new(),
            diagnostics: DiagnosticQueue::new(),
            config: LoweringConfig::default(),
            func,
        }
    }

    pub fn lowerer(&mut self) -> ArrayLowerer<'_, 'scx, 'ctx> {
        ArrayLowerer::new(
            &mut self.builder,
            &mut self.pool,
            &self.arena,
            &mut self.diagnostics,
            self.config,
        )
    }

    /// Textual IR of the test function.
    pub fn ir(&self) -> String {
        self.builder
            .get_function_value(self.func)
            .print_to_string()
            .to_string()
    }

    /// Instructions of the test function, in layout order.
    pub fn insts(&self) -> Vec<InstructionValue<'ctx>> {
        let mut out = Vec::new();
        let mut block = self.builder.get_function_value(self.func).get_first_basic_block();
        while let Some(bb) = block {
            let mut inst = bb.get_first_instruction();
            while let Some(i) = inst {
                out.push(i);
                inst = i.get_next_instruction();
            }
            block = bb.get_next_basic_block();
        }
        out
    }

    pub fn count_insts(&self, op: InstructionOpcode) -> usize {
        self.insts()
            .into_iter()
            .filter(|i| i.get_opcode() == op)
            .count()
    }

    /// Symbols called by the test function, in layout order, without
    /// LLVM intrinsics.
    pub fn callees(&self) -> Vec<String> {
        self.ir()
            .lines()
            .filter(|line| line.contains(" call "))
            .filter_map(|line| {
                let start = line.find('@')? + 1;
                let len = line[start..].find('(')?;
                Some(line[start..start + len].to_owned())
            })
            .filter(|name| !name.starts_with("llvm."))
            .collect()
    }

    /// Block names of the test function, in layout order.
    pub fn block_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut block = self.builder.get_function_value(self.func).get_first_basic_block();
        while let Some(bb) = block {
            names.push(bb.get_name().to_string_lossy().into_owned());
            block = bb.get_next_basic_block();
        }
        names
    }
}
