//! # Snapshot Serialization
//!
//! Converts a [`ProgramGraph`] to and from its persisted form: a JSON tree in
//! the Blockly workspace layout, keyed by block id.
//!
//! ```json
//! {
//!   "blocks": { "languageVersion": 0, "blocks": [
//!     { "type": "controls_for", "id": "b1", "x": 10, "y": 20,
//!       "fields": { "VAR": { "id": "v1" } },
//!       "inputs": { "TO": { "block": { "type": "math_number", "id": "b2", "fields": { "NUM": 5 } } } } }
//!   ] },
//!   "variables": [ { "name": "i", "id": "v1" } ]
//! }
//! ```
//!
//! Loading is forward-compatible: unknown keys are ignored and unknown
//! fields or slots are skipped with a warning. Anything that would leave the
//! graph inconsistent aborts the load.

use crate::catalog::{BlockKind, FieldShape, Mutation, SlotKind, Variadic, MAX_ITEMS};
use crate::error::SerializationError;
use crate::graph::{
    same_name, Attachment, BlockId, BlockInstance, FieldValue, Position, ProcedureId,
    ProgramGraph, VariableId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

/// Serialized program: block tree plus the variable and procedure tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedForm {
    #[serde(default)]
    pub blocks: PersistedWorkspace,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<PersistedVariable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procedures: Vec<PersistedProcedure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedWorkspace {
    #[serde(rename = "languageVersion", default)]
    pub language_version: u32,
    /// Top-level chains in root order
    #[serde(default)]
    pub blocks: Vec<PersistedBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    /// Value inputs and statement bodies alike
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, PersistedConnection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PersistedConnection>,
    #[serde(rename = "extraState", default, skip_serializing_if = "Option::is_none")]
    pub extra_state: Option<ExtraState>,
}

/// A connected child. Shadow blocks load as ordinary blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedConnection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<PersistedBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Box<PersistedBlock>>,
}

impl PersistedConnection {
    fn of(block: PersistedBlock) -> Self {
        Self {
            block: Some(Box::new(block)),
            shadow: None,
        }
    }

    fn child(&self) -> Option<&PersistedBlock> {
        self.block.as_deref().or(self.shadow.as_deref())
    }
}

/// Variable shape of a block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraState {
    #[serde(rename = "itemCount", default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    #[serde(rename = "elseIfCount", default, skip_serializing_if = "Option::is_none")]
    pub else_if_count: Option<usize>,
    #[serde(rename = "hasElse", default, skip_serializing_if = "Option::is_none")]
    pub has_else: Option<bool>,
    /// Procedure name on Blockly-native call blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parameters on Blockly-native definition blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<PersistedParam>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedParam {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedVariable {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedProcedure {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub returns: bool,
}

impl PersistedForm {
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ----- snapshot -----

/// Serializes the whole graph
pub fn snapshot(graph: &ProgramGraph) -> PersistedForm {
    let blocks = graph
        .roots()
        .iter()
        .filter_map(|root| graph.block(root))
        .map(|block| persist_block(graph, block))
        .collect::<Vec<_>>();
    tracing::debug!("[SNAPSHOT] Saved {} blocks in {} chains", graph.len(), blocks.len());

    PersistedForm {
        blocks: PersistedWorkspace {
            language_version: 0,
            blocks,
        },
        variables: graph
            .variables()
            .iter()
            .map(|variable| PersistedVariable {
                name: variable.name.clone(),
                id: variable.id.to_string(),
            })
            .collect(),
        procedures: graph
            .procedures()
            .iter()
            .map(|procedure| PersistedProcedure {
                id: procedure.id.to_string(),
                name: procedure.name.clone(),
                params: procedure.params.iter().map(ToString::to_string).collect(),
                returns: procedure.returns,
            })
            .collect(),
    }
}

fn persist_block(graph: &ProgramGraph, block: &BlockInstance) -> PersistedBlock {
    let mut fields = BTreeMap::new();
    for (name, value) in block.fields() {
        let json = match value {
            FieldValue::Text(text) => json!(text),
            FieldValue::Number(number) if number.is_finite() => json!(number),
            FieldValue::Number(number) => json!(non_finite_label(*number)),
            FieldValue::Choice(option) => json!(option),
            FieldValue::Variable(id) => json!({ "id": id }),
            FieldValue::Procedure(id) => json!({ "id": id }),
            FieldValue::Empty => continue,
        };
        fields.insert(name.to_string(), json);
    }

    let mut inputs = BTreeMap::new();
    let slots = block.inputs().chain(block.bodies());
    for (name, child) in slots {
        if let Some(child) = child.and_then(|id| graph.block(id)) {
            inputs.insert(
                name.to_string(),
                PersistedConnection::of(persist_block(graph, child)),
            );
        }
    }

    let next = block
        .next()
        .and_then(|id| graph.block(id))
        .map(|child| PersistedConnection::of(persist_block(graph, child)));

    let mutation = block.mutation();
    let extra_state = match block.kind().variadic() {
        Some(Variadic::Items) => Some(ExtraState {
            item_count: Some(mutation.items),
            ..ExtraState::default()
        }),
        Some(Variadic::Branches) if mutation.items > 0 || mutation.has_else => Some(ExtraState {
            else_if_count: Some(mutation.items).filter(|count| *count > 0),
            has_else: Some(true).filter(|_| mutation.has_else),
            ..ExtraState::default()
        }),
        _ => None,
    };

    PersistedBlock {
        kind: block.kind().id().to_string(),
        id: block.id().to_string(),
        x: block.position().map(|position| position.x),
        y: block.position().map(|position| position.y),
        fields,
        inputs,
        next,
        extra_state,
    }
}

fn non_finite_label(number: f64) -> &'static str {
    if number.is_nan() {
        "NaN"
    } else if number > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

// ----- restore -----

/// A block ready to be applied to the graph
struct PlannedBlock {
    id: BlockId,
    kind: BlockKind,
    mutation: Mutation,
    position: Option<Position>,
    fields: Vec<(String, FieldValue)>,
    children: Vec<(Attachment, BlockId)>,
}

/// Rebuilds a graph from its persisted form.
///
/// The result satisfies every structural invariant; any violation in the
/// input is reported instead.
pub fn restore(form: &PersistedForm) -> Result<ProgramGraph, SerializationError> {
    tracing::info!("[SNAPSHOT] Restoring {} top-level chains", form.blocks.blocks.len());
    let mut graph = ProgramGraph::new();
    graph.batch(|g| restore_into(g, form))?;
    tracing::info!(
        "[SNAPSHOT] Restored {} blocks, {} variables, {} procedures",
        graph.len(),
        graph.variables().len(),
        graph.procedures().len()
    );
    Ok(graph)
}

fn restore_into(graph: &mut ProgramGraph, form: &PersistedForm) -> Result<(), SerializationError> {
    for variable in &form.variables {
        graph.create_variable_with_id(VariableId::new(variable.id.as_str()), &variable.name)?;
    }
    declare_procedures(graph, form)?;

    let mut planned = Vec::new();
    for top in &form.blocks.blocks {
        plan_block(graph, top, &mut planned)?;
    }

    for block in &planned {
        if !block.kind.is_definition() {
            graph.add_block_with_id(block.id.clone(), block.kind)?;
        }
    }
    for block in &planned {
        match block.kind.variadic() {
            Some(Variadic::Items) => graph.set_item_count(&block.id, block.mutation.items)?,
            Some(Variadic::Branches) => {
                graph.set_item_count(&block.id, block.mutation.items)?;
                graph.set_has_else(&block.id, block.mutation.has_else)?;
            }
            _ => {}
        }
    }
    for block in &planned {
        for (name, value) in &block.fields {
            graph.set_field(&block.id, name, value.clone())?;
        }
    }
    for block in &planned {
        for (attachment, child) in &block.children {
            match attachment {
                Attachment::Input(slot) => graph.attach_input(&block.id, slot, child)?,
                Attachment::Body(slot) => graph.attach_body(&block.id, slot, child)?,
                Attachment::Next => graph.attach_next(&block.id, child)?,
            }
        }
        if let Some(position) = block.position {
            graph.set_position(&block.id, position)?;
        }
    }

    for (index, top) in form.blocks.blocks.iter().enumerate() {
        graph.reorder_root(&BlockId::new(top.id.as_str()), index)?;
    }
    if graph.roots().len() != form.blocks.blocks.len() {
        tracing::warn!(
            "[SNAPSHOT] {} blocks ended up unattached",
            graph.roots().len() - form.blocks.blocks.len()
        );
    }
    Ok(())
}

/// Declares every procedure whose definition block appears in the form:
/// listed procedures first, in list order, then Blockly-native definitions
fn declare_procedures(graph: &mut ProgramGraph, form: &PersistedForm) -> Result<(), SerializationError> {
    let mut definitions = Vec::new();
    for top in &form.blocks.blocks {
        collect_definitions(top, &mut definitions);
    }

    let mut bound: HashMap<&str, &PersistedBlock> = HashMap::new();
    let mut native = Vec::new();
    for definition in definitions {
        match definition.fields.get("NAME") {
            Some(Value::Object(object)) => match object.get("id").and_then(Value::as_str) {
                Some(id) => {
                    if bound.insert(id, definition).is_some() {
                        return Err(SerializationError::Structure(
                            crate::error::StructuralError::DuplicateId(id.to_string()),
                        ));
                    }
                }
                None => return Err(malformed(definition, "NAME")),
            },
            Some(Value::String(_)) => native.push(definition),
            _ => return Err(malformed(definition, "NAME")),
        }
    }

    for procedure in &form.procedures {
        let definition = match bound.remove(procedure.id.as_str()) {
            Some(definition) => definition,
            None => {
                tracing::warn!("[SNAPSHOT] Procedure '{}' has no definition block, skipped", procedure.name);
                continue;
            }
        };
        let returns = definition.kind == BlockKind::ProceduresDefReturn.id();
        if returns != procedure.returns {
            tracing::warn!("[SNAPSHOT] Procedure '{}' return flag follows its definition block", procedure.name);
        }
        let params = procedure
            .params
            .iter()
            .map(|id| VariableId::new(id.as_str()))
            .collect();
        graph.add_procedure_with_ids(
            ProcedureId::new(procedure.id.as_str()),
            BlockId::new(definition.id.as_str()),
            &procedure.name,
            params,
            returns,
        )?;
    }
    if let Some(id) = bound.keys().next() {
        return Err(SerializationError::Structure(
            crate::error::StructuralError::ProcedureNotFound(ProcedureId::new(*id)),
        ));
    }

    for definition in native {
        let name = definition
            .fields
            .get("NAME")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let mut params = Vec::new();
        let declared = definition
            .extra_state
            .as_ref()
            .and_then(|state| state.params.as_ref());
        if declared.map_or(0, Vec::len) > MAX_ITEMS {
            return Err(malformed(definition, "params"));
        }
        for param in declared.into_iter().flatten() {
            params.push(resolve_param(graph, param)?);
        }
        let returns = definition.kind == BlockKind::ProceduresDefReturn.id();
        let id = ProcedureId::new(format!("{}_procedure", definition.id));
        graph.add_procedure_with_ids(
            id,
            BlockId::new(definition.id.as_str()),
            name,
            params,
            returns,
        )?;
    }
    Ok(())
}

fn collect_definitions<'f>(block: &'f PersistedBlock, out: &mut Vec<&'f PersistedBlock>) {
    if block.kind == BlockKind::ProceduresDefNoReturn.id()
        || block.kind == BlockKind::ProceduresDefReturn.id()
    {
        out.push(block);
    }
    let children = block
        .inputs
        .values()
        .chain(block.next.iter())
        .filter_map(PersistedConnection::child);
    for child in children {
        collect_definitions(child, out);
    }
}

/// Finds a Blockly-native parameter's variable by id, then by name, creating
/// it when neither matches
fn resolve_param(graph: &mut ProgramGraph, param: &PersistedParam) -> Result<VariableId, SerializationError> {
    if let Some(id) = &param.id {
        let id = VariableId::new(id.as_str());
        if graph.variable(&id).is_some() {
            return Ok(id);
        }
    }
    if let Some(variable) = graph.variable_by_name(&param.name) {
        return Ok(variable.id.clone());
    }
    let id = match &param.id {
        Some(id) => {
            let id = VariableId::new(id.as_str());
            graph.create_variable_with_id(id.clone(), &param.name)?;
            id
        }
        None => graph.create_variable(&param.name)?,
    };
    Ok(id)
}

/// Flattens one persisted block (and everything below it) into `out`
fn plan_block<'f>(
    graph: &ProgramGraph,
    source: &'f PersistedBlock,
    out: &mut Vec<PlannedBlock>,
) -> Result<BlockId, SerializationError> {
    let kind = BlockKind::from_id(&source.kind)
        .ok_or_else(|| SerializationError::UnknownBlockKind(source.kind.clone()))?;
    let id = BlockId::new(source.id.as_str());

    let mut fields = Vec::new();
    let mut procedure_arity = None;
    let native_call_name;
    let mut named_fields: Vec<(&str, &Value)> = source
        .fields
        .iter()
        .map(|(name, value)| (name.as_str(), value))
        .collect();
    let call_name = source.extra_state.as_ref().and_then(|state| state.name.as_ref());
    if kind.is_call() && !source.fields.contains_key("NAME") {
        if let Some(name) = call_name {
            native_call_name = Value::String(name.clone());
            named_fields.push(("NAME", &native_call_name));
        }
    }

    for (name, json) in named_fields {
        let shape = match kind.fixed_slots().iter().find(|slot| slot.name == name) {
            Some(slot) => match slot.kind {
                SlotKind::Field(shape) => shape,
                _ => {
                    tracing::warn!("[SNAPSHOT] {}.{} is not a field, ignored", source.id, name);
                    continue;
                }
            },
            None => {
                tracing::warn!("[SNAPSHOT] Unknown field {}.{} ignored", source.id, name);
                continue;
            }
        };
        if kind.is_definition() && shape == FieldShape::Procedure {
            continue;
        }
        let value = field_value(graph, source, name, &shape, json)?;
        if let FieldValue::Procedure(procedure) = &value {
            procedure_arity = graph.procedure(procedure).map(|p| p.params.len());
        }
        fields.push((name.to_string(), value));
    }

    let state = source.extra_state.clone().unwrap_or_default();
    let mutation = match kind.variadic() {
        Some(Variadic::Items) => Mutation {
            items: state.item_count.unwrap_or(kind.default_mutation().items),
            has_else: false,
        },
        Some(Variadic::Branches) => Mutation {
            items: state.else_if_count.unwrap_or(0),
            has_else: state.has_else.unwrap_or(false),
        },
        Some(Variadic::Arguments) => Mutation {
            items: procedure_arity.unwrap_or(0),
            has_else: false,
        },
        None => Mutation::default(),
    };
    if mutation.items > MAX_ITEMS {
        let key = match kind.variadic() {
            Some(Variadic::Branches) => "elseIfCount",
            _ => "itemCount",
        };
        return Err(malformed(source, key));
    }

    let index = out.len();
    out.push(PlannedBlock {
        id: id.clone(),
        kind,
        mutation,
        position: match (source.x, source.y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            _ => None,
        },
        fields,
        children: Vec::new(),
    });

    let mut children = Vec::new();
    for (name, connection) in &source.inputs {
        let attachment = match kind.slot(&mutation, name) {
            Some(SlotKind::Input(_)) => Attachment::Input(name.clone()),
            Some(SlotKind::Body) => Attachment::Body(name.clone()),
            Some(SlotKind::Field(_)) | None => {
                tracing::warn!("[SNAPSHOT] Unknown slot {}.{} ignored", source.id, name);
                continue;
            }
        };
        if let Some(child) = connection.child() {
            children.push((attachment, plan_block(graph, child, out)?));
        }
    }
    if let Some(child) = source.next.as_ref().and_then(PersistedConnection::child) {
        children.push((Attachment::Next, plan_block(graph, child, out)?));
    }
    out[index].children = children;

    Ok(id)
}

fn field_value(
    graph: &ProgramGraph,
    block: &PersistedBlock,
    name: &str,
    shape: &FieldShape,
    json: &Value,
) -> Result<FieldValue, SerializationError> {
    let value = match (shape, json) {
        (FieldShape::Text(_), Value::String(text)) => FieldValue::Text(text.clone()),
        (FieldShape::Text(_), Value::Number(number)) => FieldValue::Text(number.to_string()),
        (FieldShape::Number(_), Value::Number(number)) => {
            FieldValue::Number(number.as_f64().ok_or_else(|| malformed(block, name))?)
        }
        (FieldShape::Number(_), Value::String(text)) => FieldValue::Number(
            text.trim()
                .parse::<f64>()
                .map_err(|_| malformed(block, name))?,
        ),
        (FieldShape::Dropdown(_), Value::String(option)) => FieldValue::Choice(option.clone()),
        (FieldShape::Variable, Value::Object(object)) => {
            let id = object
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(block, name))?;
            FieldValue::Variable(VariableId::new(id))
        }
        (FieldShape::Variable, Value::String(variable)) => match graph.variable_by_name(variable) {
            Some(variable) => FieldValue::Variable(variable.id.clone()),
            None => return Err(malformed(block, name)),
        },
        (FieldShape::Procedure, Value::Object(object)) => {
            let id = object
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(block, name))?;
            FieldValue::Procedure(ProcedureId::new(id))
        }
        (FieldShape::Procedure, Value::String(procedure)) => {
            let found = graph
                .procedures()
                .iter()
                .find(|p| same_name(&p.name, procedure));
            match found {
                Some(procedure) => FieldValue::Procedure(procedure.id.clone()),
                None => return Err(malformed(block, name)),
            }
        }
        (FieldShape::Variable | FieldShape::Procedure, Value::Null) => FieldValue::Empty,
        _ => return Err(malformed(block, name)),
    };
    Ok(value)
}

fn malformed(block: &PersistedBlock, field: &str) -> SerializationError {
    SerializationError::MalformedField {
        block: block.id.clone(),
        field: field.to_string(),
    }
}

impl ProgramGraph {
    /// Replaces the whole graph with a restored snapshot, firing one
    /// notification. On error the current graph is left as it was.
    pub fn load_snapshot(&mut self, form: &PersistedForm) -> Result<(), SerializationError> {
        let restored = restore(form)?;
        self.replace(restored);
        Ok(())
    }

    /// [`load_snapshot`](Self::load_snapshot) from JSON text
    pub fn load_json(&mut self, json: &str) -> Result<(), SerializationError> {
        let form = PersistedForm::from_json(json)?;
        self.load_snapshot(&form)
    }

    pub fn to_snapshot(&self) -> PersistedForm {
        snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_snapshot() {
        let form = snapshot(&ProgramGraph::new());
        assert_eq!(form.to_json().unwrap(), r#"{"blocks":{"languageVersion":0,"blocks":[]}}"#);
    }

    #[test]
    fn test_unknown_block_kind_is_rejected() {
        let json = r#"{"blocks":{"blocks":[{"type":"turtle_forward","id":"a"}]}}"#;
        let err = PersistedForm::from_json(json).and_then(|form| restore(&form)).unwrap_err();
        assert!(matches!(err, SerializationError::UnknownBlockKind(kind) if kind == "turtle_forward"));
    }

    #[test]
    fn test_duplicate_block_id_is_rejected() {
        let json = r#"{"blocks":{"blocks":[
            {"type":"text_print","id":"a"},
            {"type":"text_print","id":"a"}
        ]}}"#;
        let err = PersistedForm::from_json(json).and_then(|form| restore(&form)).unwrap_err();
        assert!(matches!(err, SerializationError::Structure(_)));
    }

    #[test]
    fn test_dangling_variable_is_rejected() {
        let json = r#"{"blocks":{"blocks":[
            {"type":"variables_get","id":"a","fields":{"VAR":{"id":"nope"}}}
        ]}}"#;
        let err = PersistedForm::from_json(json).and_then(|form| restore(&form)).unwrap_err();
        assert!(matches!(err, SerializationError::Structure(_)));
    }

    #[test]
    fn test_unknown_field_and_slot_are_skipped() {
        let json = r#"{"blocks":{"blocks":[
            {"type":"text_print","id":"a","fields":{"COLOUR":"red"},
             "inputs":{"EXTRA":{"block":{"type":"text","id":"b"}}}}
        ]}}"#;
        let graph = restore(&PersistedForm::from_json(json).unwrap()).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.block(&BlockId::from("b")).is_none());
    }

    #[test]
    fn test_oversized_item_count_is_rejected() {
        let mut graph = ProgramGraph::new();
        graph.add_block(BlockKind::TextPrint).unwrap();
        let before = graph.to_snapshot();

        let json = r#"{"blocks":{"blocks":[
            {"type":"lists_create_with","id":"a","extraState":{"itemCount":3000000}}
        ]}}"#;
        let err = graph.load_json(json).unwrap_err();
        assert!(matches!(err, SerializationError::MalformedField { ref field, .. } if field == "itemCount"));

        let json = r#"{"blocks":{"blocks":[
            {"type":"controls_if","id":"b","extraState":{"elseIfCount":5000}}
        ]}}"#;
        let err = graph.load_json(json).unwrap_err();
        assert!(matches!(err, SerializationError::MalformedField { ref field, .. } if field == "elseIfCount"));
        assert_eq!(graph.to_snapshot(), before);
    }

    #[test]
    fn test_non_finite_numbers_survive() {
        let mut graph = ProgramGraph::new();
        let number = graph.add_block(BlockKind::MathNumber).unwrap();
        graph
            .set_field(&number, "NUM", FieldValue::Number(f64::NEG_INFINITY))
            .unwrap();

        let json = snapshot(&graph).to_json().unwrap();
        assert!(json.contains(r#""NUM":"-Infinity""#));
        let restored = restore(&PersistedForm::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored, graph);
    }
}
