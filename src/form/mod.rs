//! Argument forms for contract function calls.
//!
//! A form holds one value tree per function input, shaped by the input's ABI type. Leaves
//! are edited by path, arrays grow and shrink on request, and the finished tree converts
//! to `DynSolValue` call arguments or renders as an equivalent `cast` command.

mod convert;
mod error;
mod path;
mod render;
mod schema;
mod tree;
mod value;

pub use error::FormError;
pub use path::{ParamPath, PathKey};
pub use render::CommandContext;
pub use schema::{FunctionDescriptor, Mutability};
pub use tree::ArgumentForm;
pub use value::{ScalarValue, ValueNode};
