//! # AlgoBlocks Graph Compiler (ABGC)
//!
//! Compiler core for a visual, block-based programming environment. Users
//! assemble programs from typed blocks; ABGC keeps the block graph, checks
//! every edit against its structural rules and turns the graph into Python 3
//! source text.
//!
//! ABGC provides:
//! - A fixed catalog of block kinds with typed slots
//! - A program graph whose edits are atomic and observable
//! - A Python code generator with precedence-aware parenthesisation
//! - A JSON snapshot format compatible with saved workspaces and templates
//! - A regeneration driver and a sans-I/O contract for the analysis service
//!
//! ## Quick Start
//!
//! ```rust
//! use abgc::{compile_graph, BlockKind, FieldValue, ProgramGraph};
//!
//! let mut graph = ProgramGraph::new();
//! let print = graph.add_block(BlockKind::TextPrint)?;
//! let text = graph.add_block(BlockKind::Text)?;
//! graph.set_field(&text, "TEXT", FieldValue::Text("hello".into()))?;
//! graph.attach_input(&print, "TEXT", &text)?;
//!
//! assert_eq!(compile_graph(&graph), "print('hello')\n");
//! # Ok::<(), abgc::StructuralError>(())
//! ```
//!
//! ## Architecture
//!
//! ABGC follows a multi-phase compilation pipeline:
//!
//! 1. **Invariant Check** - Validate the graph (degraded graphs still compile)
//! 2. **Name Resolution** - Map variables and procedures to legal Python identifiers
//! 3. **Code Generation** - Render top-level chains, then procedure definitions
//! 4. **Assembly** - Imports, helper functions and definitions, then main code

pub mod catalog;
pub mod codegen;
pub mod collaborator;
pub mod compiler;
pub mod driver;
pub mod error;
pub mod graph;
pub mod serialization;

// Re-export the main compilation API
pub use compiler::{compile_graph, compile_graph_with_options, compile_json, compile_snapshot};

pub use catalog::{
    BlockKind, Connection, FieldShape, Mutation, SlotKind, SlotShape, ValueType, Variadic, MAX_ITEMS,
};
pub use codegen::CodegenOptions;
pub use error::{CollaboratorError, Result, SerializationError, StructuralError};
pub use graph::{
    Attachment, BlockId, BlockInstance, FieldValue, ParentLink, Position, Procedure, ProcedureId,
    ProgramGraph, SubscriptionId, Variable, VariableId,
};
pub use serialization::{restore, snapshot, PersistedForm};

pub use collaborator::{
    AnalysisLine, AnalysisResponse, Collaborator, CollaboratorDispatcher, CollaboratorRequest,
    CollaboratorStatus, CodeRequest, Endpoint, ExecutionResponse, ResultBoard,
};
pub use driver::{Generation, GenerationSink, RegenerationDriver};
