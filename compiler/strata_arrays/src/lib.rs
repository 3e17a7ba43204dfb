//! Array lowering for the Strata backend.
//!
//! Translates the language's array value semantics into low-level IR and
//! calls into the `strata_array_*` runtime library: dynamic arrays
//! (`{ length, pointer }` headers), fixed-size arrays, vectors and
//! pointer decay.
//!
//! # Architecture
//!
//! ```text
//! ArrayLowerer
//!   ├── lower_values.rs  : length/pointer extraction, rvalues, lvalues
//!   ├── lower_types.rs   : source type → IR storage type
//!   ├── lower_assign.rs  : blit / construct / assign, scalar broadcast
//!   ├── lower_growth.rs  : append, concatenation, character append
//!   ├── lower_compare.rs : equality, ordering, identity
//!   ├── lower_cast.rs    : representation casts, length rescaling
//!   ├── lower_bounds.rs  : index checks and element access
//!   ├── lower_literals.rs: constant literals and static initializers
//!   ├── lower_alloc.rs   : allocation, resizing, header stores
//!   └── type_info.rs     : run-time type descriptors
//! ```
//!
//! Operands are described by [`ArrayValue`], a closed set of the ways an
//! array can be known while generating code. Sub-expressions are evaluated
//! through the [`ExprLowering`] seam; [`BasicExprLowering`] handles the
//! expression set of `strata_ir`.
//!
//! # Debugging
//!
//! - `RUST_LOG=strata_arrays=debug` logs one line per engine operation.
//! - `RUST_LOG=strata_arrays=trace` also logs fast/slow path decisions.

mod array_lowerer;
mod config;
mod expr_lowering;
mod lower_alloc;
mod lower_assign;
mod lower_bounds;
mod lower_cast;
mod lower_compare;
mod lower_growth;
mod lower_literals;
mod lower_types;
mod lower_values;
mod runtime_decl;
mod type_info;
mod value;

#[cfg(test)]
mod test_helpers;

pub use array_lowerer::ArrayLowerer;
pub use config::{BoundsCheckMode, LoweringConfig};
pub use expr_lowering::{BasicExprLowering, ExprLowering};
pub use lower_assign::{AssignMode, Obligation};
pub use lower_compare::{CmpOp, EqOp};
pub use runtime_decl::RuntimeFn;
pub use value::ArrayValue;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set; safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
