//! # Program Graph
//!
//! The user's assembled program: block instances, their field values and the
//! links between them (value inputs, statement bodies and `next` chains),
//! plus the variable and procedure tables those blocks refer to.
//!
//! Every mutation either succeeds completely or returns a
//! [`StructuralError`](crate::error::StructuralError) and leaves the graph
//! untouched. Successful mutations notify subscribers synchronously; the
//! notification carries no payload, subscribers re-read the graph they are
//! handed.

mod mutation;
mod validate;

use crate::catalog::{BlockKind, FieldShape, Mutation, SlotKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Stable block identity, preserved across save/load
    BlockId
);
string_id!(
    /// Stable variable identity; the user-facing name can change
    VariableId
);
string_id!(
    /// Stable procedure identity
    ProcedureId
);

/// Canvas position of a top-level block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Current value of a field slot
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// Selected dropdown option
    Choice(String),
    Variable(VariableId),
    Procedure(ProcedureId),
    /// Unbound variable/procedure reference
    Empty,
}

impl FieldValue {
    pub(crate) fn default_for(shape: &FieldShape) -> Self {
        match shape {
            FieldShape::Text(text) => FieldValue::Text(text.to_string()),
            FieldShape::Number(value) => FieldValue::Number(*value),
            FieldShape::Dropdown(options) => options
                .first()
                .map(|option| FieldValue::Choice(option.to_string()))
                .unwrap_or(FieldValue::Empty),
            FieldShape::Variable | FieldShape::Procedure => FieldValue::Empty,
        }
    }
}

/// Where a block hangs off its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Input(String),
    Body(String),
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: BlockId,
    pub attachment: Attachment,
}

/// A live node in the program graph
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    id: BlockId,
    kind: BlockKind,
    position: Option<Position>,
    mutation: Mutation,
    fields: BTreeMap<String, FieldValue>,
    inputs: BTreeMap<String, Option<BlockId>>,
    bodies: BTreeMap<String, Option<BlockId>>,
    next: Option<BlockId>,
    parent: Option<ParentLink>,
}

impl BlockInstance {
    /// Builds an unattached instance with every declared slot present and empty
    pub(crate) fn new(id: BlockId, kind: BlockKind, mutation: Mutation) -> Self {
        let mut block = BlockInstance {
            id,
            kind,
            position: None,
            mutation,
            fields: BTreeMap::new(),
            inputs: BTreeMap::new(),
            bodies: BTreeMap::new(),
            next: None,
            parent: None,
        };
        for slot in kind.slots(&mutation) {
            block.add_slot(slot.name.into_owned(), slot.kind);
        }
        block
    }

    fn add_slot(&mut self, name: String, kind: SlotKind) {
        match kind {
            SlotKind::Field(shape) => {
                self.fields.insert(name, FieldValue::default_for(&shape));
            }
            SlotKind::Input(_) => {
                self.inputs.insert(name, None);
            }
            SlotKind::Body => {
                self.bodies.insert(name, None);
            }
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn mutation(&self) -> Mutation {
        self.mutation
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Block plugged into a value input, if any
    pub fn input(&self, name: &str) -> Option<&BlockId> {
        self.inputs.get(name).and_then(Option::as_ref)
    }

    pub fn inputs(&self) -> impl Iterator<Item = (&str, Option<&BlockId>)> {
        self.inputs.iter().map(|(name, child)| (name.as_str(), child.as_ref()))
    }

    /// Head of the chain inside a statement body, if any
    pub fn body(&self, name: &str) -> Option<&BlockId> {
        self.bodies.get(name).and_then(Option::as_ref)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (&str, Option<&BlockId>)> {
        self.bodies.iter().map(|(name, child)| (name.as_str(), child.as_ref()))
    }

    pub fn next(&self) -> Option<&BlockId> {
        self.next.as_ref()
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Variable bound in a field, if that field holds one
    pub fn variable(&self, name: &str) -> Option<&VariableId> {
        match self.fields.get(name) {
            Some(FieldValue::Variable(id)) => Some(id),
            _ => None,
        }
    }

    /// Procedure bound in a field, if that field holds one
    pub fn procedure(&self, name: &str) -> Option<&ProcedureId> {
        match self.fields.get(name) {
            Some(FieldValue::Procedure(id)) => Some(id),
            _ => None,
        }
    }

    /// Selected dropdown option, if the field holds one
    pub fn choice(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Choice(option)) => Some(option),
            _ => None,
        }
    }

    /// Every directly linked child: inputs, bodies, then `next`
    pub fn children(&self) -> impl Iterator<Item = &BlockId> {
        self.inputs
            .values()
            .chain(self.bodies.values())
            .chain(std::iter::once(&self.next))
            .filter_map(Option::as_ref)
    }

    fn slot_mut(&mut self, attachment: &Attachment) -> Option<&mut Option<BlockId>> {
        match attachment {
            Attachment::Input(name) => self.inputs.get_mut(name),
            Attachment::Body(name) => self.bodies.get_mut(name),
            Attachment::Next => Some(&mut self.next),
        }
    }

    /// Rebuilds the slot set for a new mutation and returns the children whose
    /// slots disappeared
    pub(crate) fn reshape(&mut self, mutation: Mutation) -> Vec<BlockId> {
        let mut fields = std::mem::take(&mut self.fields);
        let mut inputs = std::mem::take(&mut self.inputs);
        let mut bodies = std::mem::take(&mut self.bodies);
        self.mutation = mutation;

        for slot in self.kind.slots(&mutation) {
            let name = slot.name.into_owned();
            match slot.kind {
                SlotKind::Field(shape) => {
                    let value = fields
                        .remove(&name)
                        .unwrap_or_else(|| FieldValue::default_for(&shape));
                    self.fields.insert(name, value);
                }
                SlotKind::Input(_) => {
                    let child = inputs.remove(&name).flatten();
                    self.inputs.insert(name, child);
                }
                SlotKind::Body => {
                    let child = bodies.remove(&name).flatten();
                    self.bodies.insert(name, child);
                }
            }
        }

        inputs
            .into_values()
            .chain(bodies.into_values())
            .flatten()
            .collect()
    }
}

/// A user variable: stable id, mutable display name
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
}

/// A user-defined procedure signature and the block defining it
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub id: ProcedureId,
    pub name: String,
    pub params: Vec<VariableId>,
    pub returns: bool,
    pub definition: BlockId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GraphState {
    blocks: HashMap<BlockId, BlockInstance>,
    roots: Vec<BlockId>,
    variables: Vec<Variable>,
    procedures: Vec<Procedure>,
}

/// Handle returned by [`ProgramGraph::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&ProgramGraph)>;

/// The mutable program owned by one editing session
pub struct ProgramGraph {
    state: GraphState,
    observers: Vec<(SubscriptionId, Observer)>,
    batch_depth: usize,
    serial: u64,
    next_subscription: u64,
}

impl Default for ProgramGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProgramGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramGraph")
            .field("blocks", &self.state.blocks.len())
            .field("roots", &self.state.roots)
            .field("variables", &self.state.variables)
            .field("procedures", &self.state.procedures)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Structural equality: same blocks, links, roots, names. Observers are ignored.
impl PartialEq for ProgramGraph {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self {
            state: GraphState::default(),
            observers: Vec::new(),
            batch_depth: 0,
            serial: 0,
            next_subscription: 0,
        }
    }

    // ----- queries -----

    /// Top-level chain heads in declared order
    pub fn roots(&self) -> &[BlockId] {
        &self.state.roots
    }

    pub fn block(&self, id: &BlockId) -> Option<&BlockInstance> {
        self.state.blocks.get(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BlockInstance> {
        self.state.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.state.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.blocks.is_empty()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.state.variables
    }

    pub fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.state.variable(id)
    }

    pub fn variable_name(&self, id: &VariableId) -> Option<&str> {
        self.variable(id).map(|variable| variable.name.as_str())
    }

    /// Case-insensitive lookup, matching how names are kept unique
    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.state
            .variables
            .iter()
            .find(|variable| same_name(&variable.name, name))
    }

    pub fn procedures(&self) -> &[Procedure] {
        &self.state.procedures
    }

    pub fn procedure(&self, id: &ProcedureId) -> Option<&Procedure> {
        self.state.procedure(id)
    }

    pub fn procedure_name(&self, id: &ProcedureId) -> Option<&str> {
        self.procedure(id).map(|procedure| procedure.name.as_str())
    }

    /// Checks every structural invariant
    pub fn validate(&self) -> crate::error::Result<()> {
        self.state.validate()
    }

    // ----- notification -----

    /// Registers an observer called after every successful mutation
    pub fn subscribe(&mut self, observer: impl FnMut(&ProgramGraph) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    fn notify(&mut self) {
        if self.batch_depth > 0 {
            return;
        }
        // Observers only get a shared borrow, so none can be added mid-loop
        let mut observers = std::mem::take(&mut self.observers);
        for (_, observer) in observers.iter_mut() {
            observer(&*self);
        }
        self.observers = observers;
    }

    fn changed(&mut self) {
        debug_assert!(
            self.state.validate().is_ok(),
            "mutation broke a graph invariant: {:?}",
            self.state.validate()
        );
        self.notify();
    }

    /// Runs several mutations as one change.
    ///
    /// Notifications are held back until the outermost batch exits, then
    /// exactly one is sent if the graph differs from its state on entry. An
    /// `Err` from `f` restores that state.
    pub fn batch<T, E>(
        &mut self,
        f: impl FnOnce(&mut ProgramGraph) -> Result<T, E>,
    ) -> Result<T, E> {
        let before = self.state.clone();
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;

        match result {
            Ok(value) => {
                if self.batch_depth == 0 && self.state != before {
                    tracing::debug!("[GRAPH] Batch complete, notifying {} observers", self.observers.len());
                    self.notify();
                }
                Ok(value)
            }
            Err(e) => {
                tracing::debug!("[GRAPH] Batch failed, rolling back");
                self.state = before;
                Err(e)
            }
        }
    }

    /// Swaps in another graph's contents wholesale, keeping this graph's observers
    pub fn replace(&mut self, other: ProgramGraph) {
        self.state = other.state;
        self.serial = self.serial.max(other.serial);
        self.changed();
    }

    fn fresh_id(&mut self, prefix: &str, taken: impl Fn(&GraphState, &str) -> bool) -> String {
        loop {
            self.serial += 1;
            let candidate = format!("{}{}", prefix, self.serial);
            if !taken(&self.state, &candidate) {
                return candidate;
            }
        }
    }

    fn fresh_block_id(&mut self) -> BlockId {
        BlockId(self.fresh_id("b", |state, id| state.blocks.contains_key(&BlockId::from(id))))
    }

    fn fresh_variable_id(&mut self) -> VariableId {
        VariableId(self.fresh_id("v", |state, id| state.variable(&VariableId::from(id)).is_some()))
    }

    fn fresh_procedure_id(&mut self) -> ProcedureId {
        ProcedureId(self.fresh_id("p", |state, id| state.procedure(&ProcedureId::from(id)).is_some()))
    }
}

impl GraphState {
    fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.variables.iter().find(|variable| &variable.id == id)
    }

    fn procedure(&self, id: &ProcedureId) -> Option<&Procedure> {
        self.procedures.iter().find(|procedure| &procedure.id == id)
    }
}

/// Case-folded form under which variable and procedure names must be unique
pub(crate) fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    fold_name(a) == fold_name(b)
}
