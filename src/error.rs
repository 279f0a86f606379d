//! # Error Types
//!
//! Failures the compiler core can report. Code generation itself has no error
//! type: incomplete graphs degrade to placeholders instead of failing.

use crate::catalog::{Connection, ValueType, MAX_ITEMS};
use crate::graph::{BlockId, ProcedureId, VariableId};
use thiserror::Error;

/// A graph mutation was rejected. The graph is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Variable not found: {0}")]
    VariableNotFound(VariableId),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(ProcedureId),

    #[error("Id already in use: {0}")]
    DuplicateId(String),

    #[error("Block {block} has no slot named '{slot}'")]
    UnknownSlot { block: BlockId, slot: String },

    #[error("Slot '{slot}' on block {block} is not a {expected}")]
    SlotKindMismatch {
        block: BlockId,
        slot: String,
        expected: &'static str,
    },

    #[error("Target slot '{slot}' on block {block} is already occupied")]
    SlotOccupied { block: BlockId, slot: String },

    #[error("Block {0} already has a next block")]
    NextOccupied(BlockId),

    #[error("Attaching {child} below {parent} would create a cycle")]
    WouldCreateCycle { parent: BlockId, child: BlockId },

    #[error("Block {block} is a {found:?} block, expected {expected:?}")]
    ConnectionMismatch {
        block: BlockId,
        expected: Connection,
        found: Connection,
    },

    #[error("Slot type mismatch on {block}.{slot}: expected {expected:?}, got {found:?}")]
    TypeMismatch {
        block: BlockId,
        slot: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Invalid value for {block}.{slot}: {reason}")]
    InvalidFieldValue {
        block: BlockId,
        slot: String,
        reason: String,
    },

    #[error("Block {0} is not attached to a parent")]
    NotAttached(BlockId),

    #[error("Block {0} is not a top-level root")]
    NotARoot(BlockId),

    #[error("Block {0} does not have a variable shape")]
    NotVariadic(BlockId),

    #[error("Block {block} cannot grow {items} slots (limit {limit})", limit = MAX_ITEMS)]
    TooManyItems { block: BlockId, items: usize },

    #[error("{0} parameters exceed the limit of {limit}", limit = MAX_ITEMS)]
    TooManyParameters(usize),

    #[error("Procedure definitions must be created through add_procedure")]
    DefinitionWithoutProcedure,

    #[error("Variable {0} appears twice in a parameter list")]
    DuplicateParameter(VariableId),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Name already taken: {0}")]
    NameTaken(String),

    #[error("Variable {0} is still referenced")]
    VariableInUse(VariableId),

    #[error("Procedure {0} is still called")]
    ProcedureInUse(ProcedureId),

    #[error("Graph invariant violated: {0}")]
    Invariant(String),
}

/// A persisted form could not be loaded. The current graph is untouched.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown block type: {0}")]
    UnknownBlockKind(String),

    #[error("Field {block}.{field} has a malformed value")]
    MalformedField { block: String, field: String },

    #[error("Invalid snapshot: {0}")]
    Structure(#[from] StructuralError),
}

/// The remote analysis/execution service failed or could not be reached.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Collaborator unreachable: {0}")]
    Unreachable(String),

    #[error("Collaborator reported failure: {0}")]
    Failed(String),

    #[error("Malformed collaborator response: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T, E = StructuralError> = std::result::Result<T, E>;
