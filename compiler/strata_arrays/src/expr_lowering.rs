//! The seam between array lowering and general expression lowering.
//!
//! Array operations evaluate their operands (appended elements,
//! concatenation operands, literal elements) through [`ExprLowering`], so
//! the surrounding code generator keeps control of expression evaluation
//! and of side-effect order.

use strata_diagnostic::ErrorGuaranteed;
use strata_ir::{BinaryOp, ExprId, ExprKind};
use strata_llir::ValueId;
use strata_types::{Idx, RecordKind, Tag};

use crate::{ArrayLowerer, ArrayValue};

/// Expression evaluation on behalf of array lowering.
///
/// Implementations emit through `cx` and must leave its insertion point
/// where evaluation continues.
pub trait ExprLowering {
    /// Evaluate `expr` at the current insertion point.
    fn lower_expr(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        expr: ExprId,
    ) -> Result<ArrayValue, ErrorGuaranteed>;

    /// Try to construct the value of `expr` directly in the storage at
    /// `dst`. Returns `false` if nothing was emitted and the caller should
    /// evaluate and copy instead.
    fn construct_in_place(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        dst: ValueId,
        expr: ExprId,
    ) -> Result<bool, ErrorGuaranteed>;

    /// The IR constant of a constant expression.
    fn const_expr(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        expr: ExprId,
    ) -> Result<ValueId, ErrorGuaranteed> {
        cx.to_const_elem(expr)
    }
}

/// [`ExprLowering`] for the expressions of `strata_ir`.
///
/// Calls go to external functions declared by symbol name; arithmetic is
/// 64-bit integer only.
#[derive(Copy, Clone, Debug, Default)]
pub struct BasicExprLowering;

impl ExprLowering for BasicExprLowering {
    fn lower_expr(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        expr: ExprId,
    ) -> Result<ArrayValue, ErrorGuaranteed> {
        let arena = cx.arena();
        let e = arena.get(expr);
        let ty = e.ty;
        match &e.kind {
            ExprKind::Bool(b) => {
                let value = cx.builder().const_bool(*b);
                Ok(ArrayValue::Constant { ty, value })
            }
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Char(_) | ExprKind::Str(_) => {
                let value = cx.to_const_elem(expr)?;
                Ok(ArrayValue::Constant { ty, value })
            }
            ExprKind::Null => {
                if cx.pool().tag(ty) == Tag::DynArray {
                    return Ok(ArrayValue::Null { ty });
                }
                let value = cx.to_const_elem(expr)?;
                Ok(ArrayValue::Constant { ty, value })
            }
            ExprKind::ArrayLiteral { elements, .. } => {
                if cx.pool().tag(ty) != Tag::DynArray {
                    let mem = cx.mem_type(ty);
                    let slot = cx.builder().alloca(mem, ".arrayliteral");
                    cx.materialize_literal(self, expr, slot)?;
                    return Ok(ArrayValue::Addressable { ty, ptr: slot });
                }
                if elements.is_empty() {
                    return Ok(ArrayValue::Null { ty });
                }
                let len = cx.builder().const_i64(elements.len() as u64);
                let array = cx.new_dyn_array(ty, len, false);
                let ptr = cx.array_ptr(array);
                cx.materialize_literal(self, expr, ptr)?;
                Ok(array)
            }
            ExprKind::StructLiteral { .. } => {
                let mem = cx.mem_type(ty);
                let slot = cx.builder().alloca(mem, ".structliteral");
                self.construct_in_place(cx, slot, expr)?;
                Ok(ArrayValue::Addressable { ty, ptr: slot })
            }
            ExprKind::Var(var) => {
                let ptr = cx.local_slot(*var);
                Ok(ArrayValue::Addressable { ty, ptr })
            }
            ExprKind::AddressOf(inner) => {
                let target = self.lower_expr(cx, *inner)?;
                let addr = cx.make_lvalue(target, ".tmp");
                let ptr_ty = cx.mem_type(ty);
                let value = cx.builder().bitcast(addr, ptr_ty, "");
                Ok(ArrayValue::Materialized { ty, value })
            }
            ExprKind::Cat { lhs, rhs } => cx.concat(self, ty, *lhs, *rhs),
            ExprKind::Call { func, args } => self.lower_call(cx, ty, func, args),
            ExprKind::Index { array, index } => {
                let array = self.lower_expr(cx, *array)?;
                let index = self.lower_expr(cx, *index)?;
                let index = cx.rvalue(index);
                let i64 = cx.builder().i64_type();
                let index = if cx.builder().type_of(index) == i64 {
                    index
                } else {
                    cx.builder().zext(index, i64, "")
                };
                Ok(cx.index_element(array, index, e.loc))
            }
            ExprKind::Length(array) => {
                let array = self.lower_expr(cx, *array)?;
                let value = cx.array_len(array);
                Ok(ArrayValue::Materialized { ty, value })
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(cx, *lhs)?;
                let lhs = cx.rvalue(lhs);
                let rhs = self.lower_expr(cx, *rhs)?;
                let rhs = cx.rvalue(rhs);
                let builder = cx.builder();
                let value = match op {
                    BinaryOp::Add => builder.add(lhs, rhs, ""),
                    BinaryOp::Sub => builder.sub(lhs, rhs, ""),
                    BinaryOp::Mul => builder.mul(lhs, rhs, ""),
                };
                Ok(ArrayValue::Materialized { ty, value })
            }
        }
    }

    fn construct_in_place(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        dst: ValueId,
        expr: ExprId,
    ) -> Result<bool, ErrorGuaranteed> {
        let arena = cx.arena();
        let e = arena.get(expr);
        match &e.kind {
            ExprKind::ArrayLiteral { .. } if cx.pool().tag(e.ty) != Tag::DynArray => {
                cx.materialize_literal(self, expr, dst)?;
                Ok(true)
            }
            ExprKind::StructLiteral { fields } => {
                if cx.is_const_literal(expr) {
                    let value = self.const_expr(cx, expr)?;
                    let value_ty = cx.builder().type_of(value);
                    let ptr_ty = cx.builder().ptr_type(value_ty);
                    let dst = cx.builder().bitcast(dst, ptr_ty, "");
                    cx.builder().store(value, dst);
                } else {
                    self.record_fields_into(cx, e.ty, fields, dst)?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl BasicExprLowering {
    fn lower_call(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        ty: Idx,
        func: &str,
        args: &[ExprId],
    ) -> Result<ArrayValue, ErrorGuaranteed> {
        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            let value = self.lower_expr(cx, arg)?;
            values.push(cx.rvalue(value));
        }
        let params: Vec<_> = values.iter().map(|&v| cx.builder().type_of(v)).collect();
        let ret = if cx.pool().tag(ty) == Tag::Void {
            cx.builder().void_type()
        } else {
            cx.value_type(ty)
        };
        let callee = cx.builder().declare_function(func, &params, ret);
        match cx.builder().call(callee, &values, "") {
            Some(value) => Ok(ArrayValue::Materialized { ty, value }),
            None => {
                let i8 = cx.builder().i8_type();
                let value = cx.builder().const_undef(i8);
                Ok(ArrayValue::Constant { ty, value })
            }
        }
    }

    /// Store a non-constant record literal field by field.
    fn record_fields_into(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        ty: Idx,
        fields: &[Option<ExprId>],
        dst: ValueId,
    ) -> Result<(), ErrorGuaranteed> {
        let def = cx.pool().record_def(ty).clone();
        if def.kind == RecordKind::Union {
            let active = fields
                .iter()
                .enumerate()
                .find_map(|(i, f)| f.map(|f| (i, f)));
            if let Some((i, init)) = active {
                let field_ty = def.fields[i].ty;
                let mem = cx.mem_type(field_ty);
                let ptr_ty = cx.builder().ptr_type(mem);
                let ptr = cx.builder().bitcast(dst, ptr_ty, "");
                self.init_field(cx, field_ty, ptr, init)?;
            } else {
                let value = cx.default_init_const(ty);
                let value_ty = cx.builder().type_of(value);
                let ptr_ty = cx.builder().ptr_type(value_ty);
                let ptr = cx.builder().bitcast(dst, ptr_ty, "");
                cx.builder().store(value, ptr);
            }
            return Ok(());
        }
        for (i, field) in def.fields.iter().enumerate() {
            #[expect(clippy::cast_possible_truncation, reason = "field counts fit in u32")]
            let ptr = cx.builder().struct_gep(dst, i as u32, "");
            match fields.get(i).copied().flatten() {
                Some(init) => self.init_field(cx, field.ty, ptr, init)?,
                None => {
                    let value = cx.field_default(field);
                    let value_ty = cx.builder().type_of(value);
                    let ptr_ty = cx.builder().ptr_type(value_ty);
                    let ptr = cx.builder().bitcast(ptr, ptr_ty, "");
                    cx.builder().store(value, ptr);
                }
            }
        }
        Ok(())
    }

    fn init_field(
        &mut self,
        cx: &mut ArrayLowerer<'_, '_, '_>,
        ty: Idx,
        ptr: ValueId,
        init: ExprId,
    ) -> Result<(), ErrorGuaranteed> {
        if !self.construct_in_place(cx, ptr, init)? {
            let value = self.lower_expr(cx, init)?;
            cx.blit(ArrayValue::Addressable { ty, ptr }, value);
        }
        Ok(())
    }
}
