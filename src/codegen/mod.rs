//! # Code Generation
//!
//! Python code generation for block programs.

mod block_handlers;
mod context;
mod names;
mod options;
mod precedence;
mod python_codegen;

pub use block_handlers::{format_number, quote, Generated};
pub use context::{DefinitionKind, GenerationContext};
pub use names::{legalize, NameTable, PYTHON_KEYWORDS};
pub use options::CodegenOptions;
pub use precedence::{needs_parens, Binding, Order};
pub use python_codegen::PythonCodeGenerator;
