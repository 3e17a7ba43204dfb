//! Constant literals and static initializers.
//!
//! Array literals whose elements are all constants are folded into one IR
//! constant and either stored inline or copied from a read-only global.
//! Other literals are stored element by element. Sparse initializers of
//! static data become constants with missing slots defaulted.

use strata_diagnostic::{Diagnostic, ErrorCode, ErrorGuaranteed};
use strata_ir::{ArrayInitializer, ExprId, ExprKind, Initializer, Loc};
use strata_llir::ValueId;
use strata_stack::ensure_sufficient_stack;
use strata_types::{FieldDef, Idx, RecordKind, ScalarLit, Tag};

use super::array_lowerer::ArrayLowerer;
use crate::{ArrayValue, ExprLowering};

/// Produces the constant of one literal element.
type ElemConst<'f, 'a, 'scx, 'ctx> =
    dyn FnMut(&mut ArrayLowerer<'a, 'scx, 'ctx>, ExprId) -> Result<ValueId, ErrorGuaranteed>
        + 'f;

impl<'a, 'scx, 'ctx> ArrayLowerer<'a, 'scx, 'ctx> {
    // -----------------------------------------------------------------------
    // Constness
    // -----------------------------------------------------------------------

    /// True if `expr` folds to an IR constant: scalar and string literals,
    /// `null`, and array or record literals built from those.
    ///
    /// A record that captures its enclosing scope is never constant, nor is
    /// the address of a variable.
    pub fn is_const_literal(&self, expr: ExprId) -> bool {
        ensure_sufficient_stack(|| {
            let e = self.arena.get(expr);
            match &e.kind {
                ExprKind::Int(_)
                | ExprKind::Float(_)
                | ExprKind::Bool(_)
                | ExprKind::Char(_)
                | ExprKind::Null
                | ExprKind::Str(_) => true,
                ExprKind::ArrayLiteral { elements, basis } => elements
                    .iter()
                    .all(|el| el.or(*basis).is_some_and(|el| self.is_const_literal(el))),
                ExprKind::StructLiteral { fields } => {
                    !self.pool.is_nested(e.ty)
                        && fields.iter().flatten().all(|&f| self.is_const_literal(f))
                }
                _ => false,
            }
        })
    }

    // -----------------------------------------------------------------------
    // Element constants
    // -----------------------------------------------------------------------

    /// The IR constant of a constant expression, in its memory type.
    ///
    /// Array literals of dynamic type are placed in a global and referred
    /// to by a constant `{ length, pointer }`. A union literal takes the
    /// layout of its active member followed by padding.
    pub fn to_const_elem(&mut self, expr: ExprId) -> Result<ValueId, ErrorGuaranteed> {
        ensure_sufficient_stack(|| self.const_elem(expr))
    }

    fn const_elem(&mut self, expr: ExprId) -> Result<ValueId, ErrorGuaranteed> {
        let arena = self.arena;
        let e = arena.get(expr);
        let ty = e.ty;
        match &e.kind {
            ExprKind::Int(v) => Ok(self.scalar_const(ty, ScalarLit::Int(*v))),
            ExprKind::Float(v) => Ok(self.scalar_const(ty, ScalarLit::Float(*v))),
            ExprKind::Bool(v) => Ok(self.scalar_const(ty, ScalarLit::Bool(*v))),
            ExprKind::Char(v) => Ok(self.scalar_const(ty, ScalarLit::Char(*v))),
            ExprKind::Null => {
                let mem = self.mem_type(ty);
                if self.pool.tag(ty) == Tag::Pointer {
                    Ok(self.builder.const_null(mem))
                } else {
                    Ok(self.builder.const_zero(mem))
                }
            }
            ExprKind::Str(s) => Ok(self.string_const(ty, s)),
            ExprKind::ArrayLiteral { elements, .. } => {
                let constant = self.literal_to_const(expr, &mut |cx, el| cx.to_const_elem(el))?;
                match self.pool.tag(ty) {
                    Tag::FixedArray | Tag::Vector => Ok(constant),
                    _ => {
                        let global = self.builder.add_global(".constarray", constant, false);
                        let addr = self.builder.global_addr(global);
                        Ok(self.decay_global(ty, addr, elements.len() as u64))
                    }
                }
            }
            ExprKind::StructLiteral { fields } => self.record_const(ty, fields),
            _ => {
                let message = format!(
                    "expression of type `{}` is not a constant",
                    self.pool.display(ty)
                );
                Err(self.emit_error(
                    Diagnostic::error(ErrorCode::E9001)
                        .with_message(message)
                        .with_label(e.loc, "expected a constant"),
                ))
            }
        }
    }

    /// A scalar literal stored as a value of `ty`.
    fn scalar_const(&mut self, ty: Idx, lit: ScalarLit) -> ValueId {
        let tag = self.pool.tag(ty);
        let mem = self.mem_type(ty);
        let bits = lit.to_bits(tag);
        if tag.is_floating() {
            self.builder.const_float_bits(mem, bits)
        } else {
            self.builder.const_int(mem, bits)
        }
    }

    /// A string literal as a fixed array of code units, or as a slice of a
    /// zero-terminated global.
    fn string_const(&mut self, ty: Idx, s: &str) -> ValueId {
        let elem = self.pool.elem(ty);
        let mut units: Vec<u64> = match self.pool.tag(elem) {
            Tag::WChar => s.encode_utf16().map(u64::from).collect(),
            Tag::DChar => s.chars().map(|c| u64::from(u32::from(c))).collect(),
            _ => s.bytes().map(u64::from).collect(),
        };
        if self.pool.tag(ty) == Tag::FixedArray {
            #[expect(clippy::cast_possible_truncation, reason = "fixed dims are host-sized")]
            let dim = self.pool.dim(ty).unwrap_or(0) as usize;
            units.resize(dim, 0);
            return self.code_units_const(elem, &units);
        }
        let len = units.len() as u64;
        units.push(0);
        let init = self.code_units_const(elem, &units);
        let global = self.builder.add_global(".str", init, true);
        self.builder.set_unnamed_addr(global);
        let addr = self.builder.global_addr(global);
        self.decay_global(ty, addr, len)
    }

    fn code_units_const(&mut self, elem: Idx, units: &[u64]) -> ValueId {
        let elem_mem = self.mem_type(elem);
        if self.builder.size_of(elem_mem) == 1 {
            #[expect(clippy::cast_possible_truncation, reason = "UTF-8 code units are bytes")]
            let bytes: Vec<u8> = units.iter().map(|&u| u as u8).collect();
            return self.builder.const_bytes(&bytes);
        }
        let elems: Vec<ValueId> = units
            .iter()
            .map(|&u| self.builder.const_int(elem_mem, u))
            .collect();
        self.builder.const_array(elem_mem, &elems)
    }

    /// The address of a global holding `len` elements, as a constant of
    /// the pointer or dynamic array type `ty`.
    fn decay_global(&mut self, ty: Idx, addr: ValueId, len: u64) -> ValueId {
        if self.pool.tag(ty) == Tag::Pointer {
            let ptr_ty = self.mem_type(ty);
            return self.builder.const_bitcast(addr, ptr_ty);
        }
        let elem_ptr = self.elem_ptr_type(ty);
        let ptr = self.builder.const_bitcast(addr, elem_ptr);
        let len = self.builder.const_i64(len);
        self.const_slice(len, ptr, Some(ty))
    }

    /// A constant `{ len, ptr }` of the dynamic array type `ty`, or of an
    /// anonymous struct type without one.
    pub fn const_slice(&mut self, len: ValueId, ptr: ValueId, ty: Option<Idx>) -> ValueId {
        match ty {
            Some(ty) => {
                let mem = self.mem_type(ty);
                self.builder.const_named_struct(mem, &[len, ptr])
            }
            None => self.builder.const_struct(&[len, ptr], false),
        }
    }

    fn record_const(
        &mut self,
        ty: Idx,
        fields: &[Option<ExprId>],
    ) -> Result<ValueId, ErrorGuaranteed> {
        let def = self.pool.record_def(ty).clone();
        if def.kind == RecordKind::Union {
            let active = fields
                .iter()
                .enumerate()
                .find_map(|(i, f)| f.map(|f| (i, f)));
            let Some((index, member)) = active else {
                return Ok(self.default_init_const(ty));
            };
            let value = self.to_const_elem(member)?;
            return Ok(self.union_const(ty, index, value));
        }
        let mut members = Vec::with_capacity(def.fields.len());
        for (i, field) in def.fields.iter().enumerate() {
            let value = match fields.get(i).copied().flatten() {
                Some(f) => self.to_const_elem(f)?,
                None => self.field_default(field),
            };
            members.push(value);
        }
        Ok(self.struct_const(ty, members))
    }

    /// A struct constant of the record's named type, or an anonymous one
    /// when a member (a union with another active member) differs from the
    /// declared field type.
    fn struct_const(&mut self, ty: Idx, mut members: Vec<ValueId>) -> ValueId {
        let mem = self.mem_type(ty);
        if members.is_empty() {
            members.push(self.builder.const_i8(0));
        }
        let fields = self.builder.struct_field_types(mem);
        let same = fields.len() == members.len()
            && fields
                .iter()
                .zip(&members)
                .all(|(&field, &m)| self.builder.type_of(m) == field);
        if same {
            self.builder.const_named_struct(mem, &members)
        } else {
            self.builder.const_struct(&members, false)
        }
    }

    /// A union constant with member `index` active.
    fn union_const(&mut self, ty: Idx, index: usize, value: ValueId) -> ValueId {
        let mem = self.mem_type(ty);
        let size = self.pool.size_of(ty);
        let value_ty = self.builder.type_of(value);
        let value_size = self.builder.size_of(value_ty);
        let pad = size.saturating_sub(value_size);
        let mut members = vec![value];
        if self.union_main_member(ty) == Some(index) {
            if pad > 0 {
                let pad_ty = self.builder.member_type(mem, 1);
                members.push(self.builder.const_zero(pad_ty));
            }
            return self.builder.const_named_struct(mem, &members);
        }
        if pad > 0 {
            let i8 = self.builder.i8_type();
            let pad_ty = self.builder.array_type(i8, pad);
            members.push(self.builder.const_zero(pad_ty));
        }
        self.builder.const_struct(&members, false)
    }

    /// A field's declared default, or its type's.
    pub(crate) fn field_default(&mut self, field: &FieldDef) -> ValueId {
        match field.default {
            Some(lit) => self.scalar_const(field.ty, lit),
            None => self.default_init_const(field.ty),
        }
    }

    // -----------------------------------------------------------------------
    // Defaults
    // -----------------------------------------------------------------------

    /// The default value of `ty` as an IR constant.
    ///
    /// Integers, pointers and dynamic arrays are zero, floats a quiet NaN,
    /// character types their invalid code unit. Records take their field
    /// defaults, fixed arrays repeat the element default.
    pub fn default_init_const(&mut self, ty: Idx) -> ValueId {
        ensure_sufficient_stack(|| self.default_const(ty))
    }

    fn default_const(&mut self, ty: Idx) -> ValueId {
        let mem = self.mem_type(ty);
        let tag = self.pool.tag(ty);
        match tag {
            Tag::Float32 => self.builder.const_float_bits(mem, 0x7FC0_0000),
            Tag::Float64 => self.builder.const_float_bits(mem, 0x7FF8_0000_0000_0000),
            Tag::Char => self.builder.const_int(mem, 0xFF),
            Tag::WChar | Tag::DChar => self.builder.const_int(mem, 0xFFFF),
            Tag::Pointer => self.builder.const_null(mem),
            _ if self.pool.is_zero_init(ty) => self.builder.const_zero(mem),
            Tag::FixedArray | Tag::Vector => {
                let elem = self.pool.elem(ty);
                let value = self.default_init_const(elem);
                let value_ty = self.builder.type_of(value);
                #[expect(clippy::cast_possible_truncation, reason = "fixed dims are host-sized")]
                let elems = vec![value; self.pool.dim(ty).unwrap_or(0) as usize];
                if tag == Tag::Vector {
                    self.builder.const_vector(&elems)
                } else {
                    self.builder.const_array(value_ty, &elems)
                }
            }
            Tag::Struct => {
                let def = self.pool.record_def(ty).clone();
                let members = def.fields.iter().map(|f| self.field_default(f)).collect();
                self.struct_const(ty, members)
            }
            Tag::Union => {
                let def = self.pool.record_def(ty).clone();
                match def.fields.first() {
                    Some(first) => {
                        let value = self.field_default(first);
                        self.union_const(ty, 0, value)
                    }
                    None => self.builder.const_zero(mem),
                }
            }
            _ => self.builder.const_zero(mem),
        }
    }

    // -----------------------------------------------------------------------
    // Array literals
    // -----------------------------------------------------------------------

    /// Fold a constant array literal into one IR constant.
    ///
    /// Elements of equal IR type give an array (or vector) constant. If
    /// they differ, which happens for unions with different active members,
    /// the result is a packed struct of the same bytes. An empty literal
    /// gives `[0 x T]`.
    pub fn build_constant(
        &mut self,
        ex: &mut dyn ExprLowering,
        literal: ExprId,
    ) -> Result<ValueId, ErrorGuaranteed> {
        self.literal_to_const(literal, &mut |cx, el| ex.const_expr(cx, el))
    }

    fn literal_to_const(
        &mut self,
        literal: ExprId,
        elem_const: &mut ElemConst<'_, 'a, 'scx, 'ctx>,
    ) -> Result<ValueId, ErrorGuaranteed> {
        let arena = self.arena;
        let e = arena.get(literal);
        let ExprKind::ArrayLiteral { elements, basis } = &e.kind else {
            panic!("internal error: {:?} is not an array literal", e.kind);
        };

        let mut values = Vec::with_capacity(elements.len());
        let mut elem_ty = None;
        let mut mixed = false;
        for el in elements {
            let value = elem_const(self, literal_elem(*el, *basis))?;
            let value_ty = self.builder.type_of(value);
            match elem_ty {
                None => elem_ty = Some(value_ty),
                Some(first) => mixed |= first != value_ty,
            }
            values.push(value);
        }

        if mixed {
            tracing::trace!("element constants differ in type, packing");
            return Ok(self.builder.const_struct(&values, true));
        }
        let elem_ty = match elem_ty {
            Some(t) => t,
            None => self.mem_type(self.pool.elem(e.ty)),
        };
        if self.pool.tag(e.ty) == Tag::Vector {
            Ok(self.builder.const_vector(&values))
        } else {
            Ok(self.builder.const_array(elem_ty, &values))
        }
    }

    /// Write the elements of an array literal to the storage at `dst`.
    ///
    /// Constant literals up to the configured inline limit are one store;
    /// longer ones are copied from a read-only global. Otherwise each
    /// element is constructed in place or blitted into its slot, in order.
    pub fn materialize_literal(
        &mut self,
        ex: &mut dyn ExprLowering,
        literal: ExprId,
        dst: ValueId,
    ) -> Result<(), ErrorGuaranteed> {
        let arena = self.arena;
        let e = arena.get(literal);
        let ExprKind::ArrayLiteral { elements, basis } = &e.kind else {
            panic!("internal error: {:?} is not an array literal", e.kind);
        };
        let count = elements.len();
        tracing::debug!(ty = %self.pool.display(e.ty), count, "array literal");
        // A zero-length destination may be a null pointer.
        if count == 0 {
            return Ok(());
        }

        if self.is_const_literal(literal) {
            let constant = self.build_constant(ex, literal)?;
            let const_ty = self.builder.type_of(constant);
            if count <= self.config.literal_inline_limit {
                tracing::trace!("constant literal stored inline");
                let ptr_ty = self.builder.ptr_type(const_ty);
                let dst = self.builder.bitcast(dst, ptr_ty, "");
                self.builder.store(constant, dst);
            } else {
                tracing::trace!("constant literal copied from a global");
                let global = self.builder.add_global(".arrayliteral", constant, true);
                self.builder.set_unnamed_addr(global);
                let src = self.builder.global_addr(global);
                let i8_ptr = self.builder.i8_ptr_type();
                let dst = self.builder.bitcast(dst, i8_ptr, "");
                let src = self.builder.bitcast(src, i8_ptr, "");
                let bytes = self.builder.size_of(const_ty);
                let size = self.builder.const_i64(bytes);
                self.builder.memcpy(dst, src, size);
            }
            return Ok(());
        }

        tracing::trace!("literal stored element by element");
        let elem_ptr = self.elem_ptr_type(e.ty);
        let base = self.builder.bitcast(dst, elem_ptr, "");
        for (i, el) in elements.iter().enumerate() {
            let el = literal_elem(*el, *basis);
            let index = self.builder.const_i64(i as u64);
            let slot = self.builder.gep(base, index, "");
            let el_ty = arena.ty(el);
            let el_mem = self.mem_type(el_ty);
            let el_ptr = self.builder.ptr_type(el_mem);
            let slot = self.builder.bitcast(slot, el_ptr, "");
            if !ex.construct_in_place(self, slot, el)? {
                let value = ex.lower_expr(self, el)?;
                self.blit(ArrayValue::Addressable { ty: el_ty, ptr: slot }, value);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Static initializers
    // -----------------------------------------------------------------------

    /// The constant for a sparse array initializer of static data.
    ///
    /// Entries without an index follow the previous entry. Unnamed slots
    /// share one default element constant. Fixed arrays and vectors yield
    /// the constant itself; dynamic arrays and pointers refer to a
    /// writable global holding it.
    ///
    /// Too many entries, or an index past the end, is an error. Duplicate
    /// indices are all reported before failing.
    pub fn const_array_initializer(
        &mut self,
        ex: &mut dyn ExprLowering,
        init: &ArrayInitializer,
        target: Idx,
    ) -> Result<ValueId, ErrorGuaranteed> {
        ensure_sufficient_stack(|| self.array_initializer(ex, init, target))
    }

    fn array_initializer(
        &mut self,
        ex: &mut dyn ExprLowering,
        init: &ArrayInitializer,
        target: Idx,
    ) -> Result<ValueId, ErrorGuaranteed> {
        tracing::debug!(
            ty = %self.pool.display(target),
            entries = init.entries.len(),
            "constant array initializer"
        );
        let tag = self.pool.tag(target);
        // Trailing defaulted entries of fixed arrays are not listed.
        let len = match tag {
            Tag::FixedArray | Tag::Vector => self.pool.dim(target).unwrap_or(0),
            _ => init.dim,
        };
        let entry_count = init.entries.len() as u64;
        if entry_count > len || init.dim > len {
            return Err(self.too_many_initializers(init.loc, entry_count.max(init.dim), len));
        }

        let elem = self.pool.elem(target);
        let elem_mem = self.mem_type(elem);
        let mut mismatch = false;
        #[expect(clippy::cast_possible_truncation, reason = "static array lengths fit the host")]
        let mut slots: Vec<Option<ValueId>> = vec![None; len as usize];
        let mut duplicate = None;
        let mut next = 0;
        for entry in &init.entries {
            let index = entry.index.unwrap_or(next);
            if index >= len {
                return Err(self.too_many_initializers(entry.loc, index + 1, len));
            }
            #[expect(clippy::cast_possible_truncation, reason = "index < len")]
            let slot = index as usize;
            if slots[slot].is_some() {
                duplicate = Some(self.emit_error(
                    Diagnostic::error(ErrorCode::E4002)
                        .with_message(format!("duplicate initialization for index {index}"))
                        .with_label(entry.loc, "initialized again here"),
                ));
            }
            let value = match &entry.value {
                Initializer::Expr(expr) => ex.const_expr(self, *expr)?,
                Initializer::Array(nested) => self.const_array_initializer(ex, nested, elem)?,
            };
            mismatch |= self.builder.type_of(value) != elem_mem;
            slots[slot] = Some(value);
            next = index + 1;
        }
        if let Some(guar) = duplicate {
            return Err(guar);
        }

        let mut default = None;
        let mut elems = Vec::with_capacity(slots.len());
        for slot in slots {
            let value = match (slot, default) {
                (Some(value), _) | (None, Some(value)) => value,
                (None, None) => {
                    let value = self.default_init_const(elem);
                    mismatch |= self.builder.type_of(value) != elem_mem;
                    default = Some(value);
                    value
                }
            };
            elems.push(value);
        }

        let constant = if mismatch {
            self.builder.const_struct(&elems, false)
        } else if tag == Tag::Vector {
            self.builder.const_vector(&elems)
        } else {
            self.builder.const_array(elem_mem, &elems)
        };
        if matches!(tag, Tag::FixedArray | Tag::Vector) {
            return Ok(constant);
        }
        // Writable: a dynamic array initialized from it may be mutated.
        let global = self.builder.add_global(".constarray", constant, false);
        let addr = self.builder.global_addr(global);
        Ok(self.decay_global(target, addr, len))
    }

    fn too_many_initializers(&mut self, loc: Loc, count: u64, len: u64) -> ErrorGuaranteed {
        self.emit_error(
            Diagnostic::error(ErrorCode::E4001)
                .with_message(format!("too many initializers, {count}, for array[{len}]"))
                .with_label(loc, "initializer out of range"),
        )
    }
}

/// The expression of a literal element; omitted elements use the shared
/// `basis`.
fn literal_elem(el: Option<ExprId>, basis: Option<ExprId>) -> ExprId {
    match el.or(basis) {
        Some(el) => el,
        None => panic!("internal error: array literal element without a value"),
    }
}
