//! Structural mutations.
//!
//! Each public operation checks everything it needs before touching the
//! state, so a returned error always means nothing changed.

use super::{
    same_name, Attachment, BlockId, BlockInstance, FieldValue, GraphState, ParentLink, Position,
    Procedure, ProcedureId, ProgramGraph, Variable, VariableId,
};
use crate::catalog::{BlockKind, Connection, FieldShape, Mutation, SlotKind, Variadic, MAX_ITEMS};
use crate::error::{Result, StructuralError};

impl ProgramGraph {
    /// Adds a new, empty top-level block
    pub fn add_block(&mut self, kind: BlockKind) -> Result<BlockId> {
        if kind.is_definition() {
            return Err(StructuralError::DefinitionWithoutProcedure);
        }
        let id = self.fresh_block_id();
        self.state.insert_root(BlockInstance::new(id.clone(), kind, kind.default_mutation()));
        tracing::debug!("[GRAPH] Added {} block {}", kind, id);
        self.changed();
        Ok(id)
    }

    /// Adds a new top-level block under a caller-chosen id
    pub fn add_block_with_id(&mut self, id: BlockId, kind: BlockKind) -> Result<()> {
        if kind.is_definition() {
            return Err(StructuralError::DefinitionWithoutProcedure);
        }
        if self.state.blocks.contains_key(&id) {
            return Err(StructuralError::DuplicateId(id.to_string()));
        }
        self.state.insert_root(BlockInstance::new(id, kind, kind.default_mutation()));
        self.changed();
        Ok(())
    }

    pub fn set_field(&mut self, block: &BlockId, slot: &str, value: FieldValue) -> Result<()> {
        self.state.set_field(block, slot, value)?;
        self.changed();
        Ok(())
    }

    /// Plugs `child` into the value input `slot` of `parent`, moving it if it
    /// is attached elsewhere
    pub fn attach_input(&mut self, parent: &BlockId, slot: &str, child: &BlockId) -> Result<()> {
        self.state.attach(parent, Attachment::Input(slot.to_string()), child)?;
        self.changed();
        Ok(())
    }

    /// Places the chain starting at `child` inside the statement body `slot`
    pub fn attach_body(&mut self, parent: &BlockId, slot: &str, child: &BlockId) -> Result<()> {
        self.state.attach(parent, Attachment::Body(slot.to_string()), child)?;
        self.changed();
        Ok(())
    }

    /// Links `child` as the statement following `prev`
    pub fn attach_next(&mut self, prev: &BlockId, child: &BlockId) -> Result<()> {
        self.state.attach(prev, Attachment::Next, child)?;
        self.changed();
        Ok(())
    }

    /// Unplugs a block (and everything below it) into a new top-level root
    pub fn detach(&mut self, block: &BlockId) -> Result<()> {
        let instance = self.state.get(block)?;
        if instance.parent.is_none() {
            return Err(StructuralError::NotAttached(block.clone()));
        }
        self.state.unlink(block);
        self.state.roots.push(block.clone());
        self.changed();
        Ok(())
    }

    /// Moves a top-level root to `index` in the declared order
    pub fn reorder_root(&mut self, block: &BlockId, index: usize) -> Result<()> {
        self.state.get(block)?;
        let current = self
            .state
            .roots
            .iter()
            .position(|root| root == block)
            .ok_or_else(|| StructuralError::NotARoot(block.clone()))?;
        let root = self.state.roots.remove(current);
        let index = index.min(self.state.roots.len());
        self.state.roots.insert(index, root);
        self.changed();
        Ok(())
    }

    pub fn set_position(&mut self, block: &BlockId, position: Position) -> Result<()> {
        self.state.get_mut(block)?.position = Some(position);
        self.changed();
        Ok(())
    }

    /// Resizes `ADDn` items, or the else-if branches of `controls_if`.
    /// Blocks sitting in removed slots become top-level roots.
    pub fn set_item_count(&mut self, block: &BlockId, items: usize) -> Result<()> {
        let instance = self.state.get(block)?;
        match instance.kind.variadic() {
            Some(Variadic::Items) | Some(Variadic::Branches) => {}
            _ => return Err(StructuralError::NotVariadic(block.clone())),
        }
        if items > MAX_ITEMS {
            return Err(StructuralError::TooManyItems {
                block: block.clone(),
                items,
            });
        }
        let mutation = Mutation {
            items,
            ..instance.mutation
        };
        self.state.reshape(block, mutation);
        self.changed();
        Ok(())
    }

    /// Adds or removes the `ELSE` body of a `controls_if` block
    pub fn set_has_else(&mut self, block: &BlockId, has_else: bool) -> Result<()> {
        let instance = self.state.get(block)?;
        if instance.kind.variadic() != Some(Variadic::Branches) {
            return Err(StructuralError::NotVariadic(block.clone()));
        }
        let mutation = Mutation {
            has_else,
            ..instance.mutation
        };
        self.state.reshape(block, mutation);
        self.changed();
        Ok(())
    }

    /// Deletes a block together with its inputs, bodies and the statements
    /// after it. Deleting a definition removes its procedure.
    pub fn delete_subtree(&mut self, block: &BlockId) -> Result<()> {
        let instance = self.state.get(block)?;
        if instance.kind.is_definition() {
            let procedure = instance
                .procedure("NAME")
                .cloned()
                .ok_or_else(|| StructuralError::Invariant(format!("definition {} is unbound", block)))?;
            return self.remove_procedure(&procedure);
        }
        let removed = self.state.remove_subtree(block);
        tracing::debug!("[GRAPH] Deleted {} blocks under {}", removed, block);
        self.changed();
        Ok(())
    }

    /// Empties the workspace
    pub fn clear(&mut self) {
        self.state = GraphState::default();
        self.changed();
    }

    // ----- variables -----

    pub fn create_variable(&mut self, name: &str) -> Result<VariableId> {
        let name = self.state.check_variable_name(name, None)?;
        let id = self.fresh_variable_id();
        self.state.variables.push(Variable {
            id: id.clone(),
            name,
        });
        self.changed();
        Ok(id)
    }

    pub fn create_variable_with_id(&mut self, id: VariableId, name: &str) -> Result<()> {
        if self.state.variable(&id).is_some() {
            return Err(StructuralError::DuplicateId(id.to_string()));
        }
        let name = self.state.check_variable_name(name, None)?;
        self.state.variables.push(Variable { id, name });
        self.changed();
        Ok(())
    }

    /// Renames a variable; blocks refer to it by id and need no update
    pub fn rename_variable(&mut self, id: &VariableId, name: &str) -> Result<()> {
        if self.state.variable(id).is_none() {
            return Err(StructuralError::VariableNotFound(id.clone()));
        }
        let name = self.state.check_variable_name(name, Some(id))?;
        if let Some(variable) = self.state.variables.iter_mut().find(|v| &v.id == id) {
            variable.name = name;
        }
        self.changed();
        Ok(())
    }

    /// Removes a variable nothing refers to any more
    pub fn delete_variable(&mut self, id: &VariableId) -> Result<()> {
        if self.state.variable(id).is_none() {
            return Err(StructuralError::VariableNotFound(id.clone()));
        }
        let in_fields = self
            .state
            .blocks
            .values()
            .any(|block| block.fields.values().any(|value| value == &FieldValue::Variable(id.clone())));
        let in_params = self
            .state
            .procedures
            .iter()
            .any(|procedure| procedure.params.contains(id));
        if in_fields || in_params {
            return Err(StructuralError::VariableInUse(id.clone()));
        }
        self.state.variables.retain(|variable| &variable.id != id);
        self.changed();
        Ok(())
    }

    // ----- procedures -----

    /// Declares a procedure and creates its definition block as a new root
    pub fn add_procedure(
        &mut self,
        name: &str,
        params: Vec<VariableId>,
        returns: bool,
    ) -> Result<(ProcedureId, BlockId)> {
        self.state.check_procedure_name(name, None)?;
        self.state.check_params(&params)?;
        let procedure = self.fresh_procedure_id();
        let definition = self.fresh_block_id();
        self.state
            .insert_procedure(procedure.clone(), definition.clone(), name, params, returns);
        tracing::debug!("[GRAPH] Added procedure {} ({})", name, procedure);
        self.changed();
        Ok((procedure, definition))
    }

    /// Declares a procedure under caller-chosen procedure and definition ids
    pub fn add_procedure_with_ids(
        &mut self,
        procedure: ProcedureId,
        definition: BlockId,
        name: &str,
        params: Vec<VariableId>,
        returns: bool,
    ) -> Result<()> {
        if self.state.procedure(&procedure).is_some() {
            return Err(StructuralError::DuplicateId(procedure.to_string()));
        }
        if self.state.blocks.contains_key(&definition) {
            return Err(StructuralError::DuplicateId(definition.to_string()));
        }
        self.state.check_procedure_name(name, None)?;
        self.state.check_params(&params)?;
        self.state
            .insert_procedure(procedure, definition, name, params, returns);
        self.changed();
        Ok(())
    }

    pub fn rename_procedure(&mut self, id: &ProcedureId, name: &str) -> Result<()> {
        if self.state.procedure(id).is_none() {
            return Err(StructuralError::ProcedureNotFound(id.clone()));
        }
        let name = self.state.check_procedure_name(name, Some(id))?;
        if let Some(procedure) = self.state.procedures.iter_mut().find(|p| &p.id == id) {
            procedure.name = name;
        }
        self.changed();
        Ok(())
    }

    /// Replaces a procedure's parameter list; every call site is resized to match
    pub fn set_procedure_params(&mut self, id: &ProcedureId, params: Vec<VariableId>) -> Result<()> {
        if self.state.procedure(id).is_none() {
            return Err(StructuralError::ProcedureNotFound(id.clone()));
        }
        self.state.check_params(&params)?;
        let arity = params.len();
        if let Some(procedure) = self.state.procedures.iter_mut().find(|p| &p.id == id) {
            procedure.params = params;
        }
        for call in self.state.callers(id) {
            self.state.reshape(&call, Mutation { items: arity, has_else: false });
        }
        self.changed();
        Ok(())
    }

    /// Removes a procedure and its definition block; fails while it is still called
    pub fn remove_procedure(&mut self, id: &ProcedureId) -> Result<()> {
        let definition = self
            .state
            .procedure(id)
            .map(|procedure| procedure.definition.clone())
            .ok_or_else(|| StructuralError::ProcedureNotFound(id.clone()))?;
        if !self.state.callers(id).is_empty() {
            return Err(StructuralError::ProcedureInUse(id.clone()));
        }
        self.state.remove_subtree(&definition);
        self.state.procedures.retain(|procedure| &procedure.id != id);
        self.changed();
        Ok(())
    }
}

impl GraphState {
    pub(super) fn get(&self, id: &BlockId) -> Result<&BlockInstance> {
        self.blocks
            .get(id)
            .ok_or_else(|| StructuralError::BlockNotFound(id.clone()))
    }

    pub(super) fn get_mut(&mut self, id: &BlockId) -> Result<&mut BlockInstance> {
        self.blocks
            .get_mut(id)
            .ok_or_else(|| StructuralError::BlockNotFound(id.clone()))
    }

    fn insert_root(&mut self, block: BlockInstance) {
        self.roots.push(block.id.clone());
        self.blocks.insert(block.id.clone(), block);
    }

    fn insert_procedure(
        &mut self,
        procedure: ProcedureId,
        definition: BlockId,
        name: &str,
        params: Vec<VariableId>,
        returns: bool,
    ) {
        let kind = if returns {
            BlockKind::ProceduresDefReturn
        } else {
            BlockKind::ProceduresDefNoReturn
        };
        let mut block = BlockInstance::new(definition.clone(), kind, Mutation::default());
        block
            .fields
            .insert("NAME".to_string(), FieldValue::Procedure(procedure.clone()));
        self.insert_root(block);
        self.procedures.push(Procedure {
            id: procedure,
            name: name.trim().to_string(),
            params,
            returns,
            definition,
        });
    }

    /// True when `ancestor` is `node` or lies on the path from `node` up to its root
    fn is_ancestor_or_self(&self, ancestor: &BlockId, node: &BlockId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self
                .blocks
                .get(id)
                .and_then(|block| block.parent.as_ref())
                .map(|link| &link.parent);
        }
        false
    }

    /// Clears whatever currently holds `id` (a parent slot or the root list)
    fn unlink(&mut self, id: &BlockId) {
        let link = self.blocks.get_mut(id).and_then(|block| block.parent.take());
        match link {
            Some(ParentLink { parent, attachment }) => {
                if let Some(slot) = self
                    .blocks
                    .get_mut(&parent)
                    .and_then(|parent| parent.slot_mut(&attachment))
                {
                    *slot = None;
                }
            }
            None => self.roots.retain(|root| root != id),
        }
    }

    fn attach(&mut self, parent: &BlockId, attachment: Attachment, child: &BlockId) -> Result<()> {
        let parent_block = self.get(parent)?;
        let child_block = self.get(child)?;

        let (required, check) = match &attachment {
            Attachment::Input(slot) => {
                let check = match parent_block.kind.slot(&parent_block.mutation, slot) {
                    Some(SlotKind::Input(check)) => check,
                    Some(_) => {
                        return Err(StructuralError::SlotKindMismatch {
                            block: parent.clone(),
                            slot: slot.clone(),
                            expected: SlotKind::Input(None).describe(),
                        })
                    }
                    None => {
                        return Err(StructuralError::UnknownSlot {
                            block: parent.clone(),
                            slot: slot.clone(),
                        })
                    }
                };
                if parent_block.input(slot).is_some() {
                    return Err(StructuralError::SlotOccupied {
                        block: parent.clone(),
                        slot: slot.clone(),
                    });
                }
                (Connection::Expression, check)
            }
            Attachment::Body(slot) => {
                match parent_block.kind.slot(&parent_block.mutation, slot) {
                    Some(SlotKind::Body) => {}
                    Some(_) => {
                        return Err(StructuralError::SlotKindMismatch {
                            block: parent.clone(),
                            slot: slot.clone(),
                            expected: SlotKind::Body.describe(),
                        })
                    }
                    None => {
                        return Err(StructuralError::UnknownSlot {
                            block: parent.clone(),
                            slot: slot.clone(),
                        })
                    }
                }
                if parent_block.body(slot).is_some() {
                    return Err(StructuralError::SlotOccupied {
                        block: parent.clone(),
                        slot: slot.clone(),
                    });
                }
                (Connection::Statement, None)
            }
            Attachment::Next => {
                if parent_block.kind.connection() != Connection::Statement {
                    return Err(StructuralError::ConnectionMismatch {
                        block: parent.clone(),
                        expected: Connection::Statement,
                        found: parent_block.kind.connection(),
                    });
                }
                if parent_block.next.is_some() {
                    return Err(StructuralError::NextOccupied(parent.clone()));
                }
                (Connection::Statement, None)
            }
        };

        if child_block.kind.connection() != required {
            return Err(StructuralError::ConnectionMismatch {
                block: child.clone(),
                expected: required,
                found: child_block.kind.connection(),
            });
        }
        if let (Some(expected), Some(found)) = (check, child_block.kind.output()) {
            if expected != found {
                let slot = match &attachment {
                    Attachment::Input(slot) => slot.clone(),
                    _ => String::new(),
                };
                return Err(StructuralError::TypeMismatch {
                    block: parent.clone(),
                    slot,
                    expected,
                    found,
                });
            }
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(StructuralError::WouldCreateCycle {
                parent: parent.clone(),
                child: child.clone(),
            });
        }

        self.unlink(child);
        if let Some(slot) = self
            .blocks
            .get_mut(parent)
            .and_then(|block| block.slot_mut(&attachment))
        {
            *slot = Some(child.clone());
        }
        if let Some(block) = self.blocks.get_mut(child) {
            block.parent = Some(ParentLink {
                parent: parent.clone(),
                attachment,
            });
        }
        tracing::debug!("[GRAPH] Attached {} below {}", child, parent);
        Ok(())
    }

    fn set_field(&mut self, id: &BlockId, slot: &str, value: FieldValue) -> Result<()> {
        let block = self.get(id)?;
        let shape = match block.kind.slot(&block.mutation, slot) {
            Some(SlotKind::Field(shape)) => shape,
            Some(_) => {
                return Err(StructuralError::SlotKindMismatch {
                    block: id.clone(),
                    slot: slot.to_string(),
                    expected: "field",
                })
            }
            None => {
                return Err(StructuralError::UnknownSlot {
                    block: id.clone(),
                    slot: slot.to_string(),
                })
            }
        };
        let invalid = |reason: &str| StructuralError::InvalidFieldValue {
            block: id.clone(),
            slot: slot.to_string(),
            reason: reason.to_string(),
        };

        match (&shape, &value) {
            (FieldShape::Text(_), FieldValue::Text(_)) => {}
            (FieldShape::Number(_), FieldValue::Number(_)) => {}
            (FieldShape::Dropdown(options), FieldValue::Choice(option)) => {
                if !options.contains(&option.as_str()) {
                    return Err(invalid(&format!("'{}' is not one of {:?}", option, options)));
                }
            }
            (FieldShape::Variable, FieldValue::Variable(variable)) => {
                if self.variable(variable).is_none() {
                    return Err(StructuralError::VariableNotFound(variable.clone()));
                }
            }
            (FieldShape::Variable, FieldValue::Empty) => {}
            (FieldShape::Procedure, _) if block.kind.is_definition() => {
                return Err(invalid("a definition stays bound to its procedure"));
            }
            (FieldShape::Procedure, FieldValue::Procedure(procedure)) => {
                let signature = self
                    .procedure(procedure)
                    .ok_or_else(|| StructuralError::ProcedureNotFound(procedure.clone()))?;
                let wants_value = block.kind == BlockKind::ProceduresCallReturn;
                if signature.returns != wants_value {
                    return Err(invalid("call kind does not match whether the procedure returns"));
                }
            }
            (FieldShape::Procedure, FieldValue::Empty) => {}
            _ => return Err(invalid(&format!("{:?} does not fit a {:?} field", value, shape))),
        }

        let arity = match &value {
            FieldValue::Procedure(procedure) => self.procedure(procedure).map(|p| p.params.len()),
            FieldValue::Empty if shape == FieldShape::Procedure => Some(0),
            _ => None,
        };
        self.get_mut(id)?.fields.insert(slot.to_string(), value);
        if let Some(items) = arity {
            self.reshape(id, Mutation { items, has_else: false });
        }
        Ok(())
    }

    /// Applies a new mutation; children of vanished slots become roots
    fn reshape(&mut self, id: &BlockId, mutation: Mutation) {
        let displaced = match self.blocks.get_mut(id) {
            Some(block) => block.reshape(mutation),
            None => return,
        };
        for child in displaced {
            if let Some(block) = self.blocks.get_mut(&child) {
                block.parent = None;
            }
            tracing::debug!("[GRAPH] {} lost its slot on {}, now a root", child, id);
            self.roots.push(child);
        }
    }

    /// Removes `id`, its inputs, bodies and following chain; returns how many blocks went
    fn remove_subtree(&mut self, id: &BlockId) -> usize {
        self.unlink(id);
        let mut pending = vec![id.clone()];
        let mut removed = 0;
        while let Some(current) = pending.pop() {
            if let Some(block) = self.blocks.remove(&current) {
                pending.extend(block.children().cloned());
                removed += 1;
            }
        }
        removed
    }

    /// Call blocks bound to `procedure`
    fn callers(&self, procedure: &ProcedureId) -> Vec<BlockId> {
        self.blocks
            .values()
            .filter(|block| block.kind.is_call() && block.procedure("NAME") == Some(procedure))
            .map(|block| block.id.clone())
            .collect()
    }

    fn check_variable_name(&self, name: &str, renaming: Option<&VariableId>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StructuralError::EmptyName);
        }
        let taken = self
            .variables
            .iter()
            .any(|v| Some(&v.id) != renaming && same_name(&v.name, name));
        if taken {
            return Err(StructuralError::NameTaken(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn check_procedure_name(&self, name: &str, renaming: Option<&ProcedureId>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StructuralError::EmptyName);
        }
        let taken = self
            .procedures
            .iter()
            .any(|p| Some(&p.id) != renaming && same_name(&p.name, name));
        if taken {
            return Err(StructuralError::NameTaken(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn check_params(&self, params: &[VariableId]) -> Result<()> {
        if params.len() > MAX_ITEMS {
            return Err(StructuralError::TooManyParameters(params.len()));
        }
        for (i, param) in params.iter().enumerate() {
            if self.variable(param).is_none() {
                return Err(StructuralError::VariableNotFound(param.clone()));
            }
            if params[..i].contains(param) {
                return Err(StructuralError::DuplicateParameter(param.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn number(graph: &mut ProgramGraph, value: f64) -> BlockId {
        let id = graph.add_block(BlockKind::MathNumber).unwrap();
        graph.set_field(&id, "NUM", FieldValue::Number(value)).unwrap();
        id
    }

    #[test]
    fn test_attach_input_moves_block_out_of_roots() {
        let mut graph = ProgramGraph::new();
        let sum = graph.add_block(BlockKind::MathArithmetic).unwrap();
        let one = number(&mut graph, 1.0);

        graph.attach_input(&sum, "A", &one).unwrap();

        assert_eq!(graph.roots(), &[sum.clone()]);
        assert_eq!(graph.block(&sum).unwrap().input("A"), Some(&one));
        let link = graph.block(&one).unwrap().parent().unwrap();
        assert_eq!(link.parent, sum);
        assert_eq!(link.attachment, Attachment::Input("A".to_string()));
    }

    #[test]
    fn test_occupied_slot_is_rejected() {
        let mut graph = ProgramGraph::new();
        let sum = graph.add_block(BlockKind::MathArithmetic).unwrap();
        let one = number(&mut graph, 1.0);
        let two = number(&mut graph, 2.0);
        graph.attach_input(&sum, "A", &one).unwrap();

        let err = graph.attach_input(&sum, "A", &two).unwrap_err();
        assert!(matches!(err, StructuralError::SlotOccupied { .. }));
        assert_eq!(graph.block(&sum).unwrap().input("A"), Some(&one));
    }

    #[test]
    fn test_cycle_is_rejected_and_graph_unchanged() {
        let mut graph = ProgramGraph::new();
        let outer = graph.add_block(BlockKind::MathArithmetic).unwrap();
        let inner = graph.add_block(BlockKind::MathArithmetic).unwrap();
        graph.attach_input(&outer, "A", &inner).unwrap();
        let before = graph.state.clone();

        let err = graph.attach_input(&inner, "B", &outer).unwrap_err();
        assert!(matches!(err, StructuralError::WouldCreateCycle { .. }));
        assert_eq!(graph.state, before);

        let err = graph.attach_input(&outer, "B", &outer).unwrap_err();
        assert!(matches!(err, StructuralError::WouldCreateCycle { .. }));
    }

    #[test]
    fn test_statement_chain_cycle_is_rejected() {
        let mut graph = ProgramGraph::new();
        let first = graph.add_block(BlockKind::TextPrint).unwrap();
        let second = graph.add_block(BlockKind::TextPrint).unwrap();
        graph.attach_next(&first, &second).unwrap();

        let err = graph.attach_next(&second, &first).unwrap_err();
        assert!(matches!(err, StructuralError::WouldCreateCycle { .. }));
        graph.validate().unwrap();
    }

    #[test]
    fn test_connection_kinds_are_enforced() {
        let mut graph = ProgramGraph::new();
        let print = graph.add_block(BlockKind::TextPrint).unwrap();
        let other = graph.add_block(BlockKind::TextPrint).unwrap();
        let value = number(&mut graph, 3.0);

        let err = graph.attach_input(&print, "TEXT", &other).unwrap_err();
        assert!(matches!(err, StructuralError::ConnectionMismatch { .. }));
        let err = graph.attach_next(&print, &value).unwrap_err();
        assert!(matches!(err, StructuralError::ConnectionMismatch { .. }));
    }

    #[test]
    fn test_slot_type_mismatch() {
        let mut graph = ProgramGraph::new();
        let sum = graph.add_block(BlockKind::MathArithmetic).unwrap();
        let text = graph.add_block(BlockKind::Text).unwrap();

        let err = graph.attach_input(&sum, "A", &text).unwrap_err();
        assert!(matches!(
            err,
            StructuralError::TypeMismatch {
                expected: crate::catalog::ValueType::Number,
                found: crate::catalog::ValueType::String,
                ..
            }
        ));
    }

    #[test]
    fn test_dropdown_value_is_checked() {
        let mut graph = ProgramGraph::new();
        let sum = graph.add_block(BlockKind::MathArithmetic).unwrap();
        graph
            .set_field(&sum, "OP", FieldValue::Choice("MULTIPLY".into()))
            .unwrap();
        let err = graph
            .set_field(&sum, "OP", FieldValue::Choice("XOR".into()))
            .unwrap_err();
        assert!(matches!(err, StructuralError::InvalidFieldValue { .. }));
        assert_eq!(graph.block(&sum).unwrap().choice("OP"), Some("MULTIPLY"));
    }

    #[test]
    fn test_delete_subtree_removes_children_and_following_chain() {
        let mut graph = ProgramGraph::new();
        let print = graph.add_block(BlockKind::TextPrint).unwrap();
        let value = number(&mut graph, 3.0);
        let after = graph.add_block(BlockKind::TextPrint).unwrap();
        let keep = graph.add_block(BlockKind::CommentBlock).unwrap();
        graph.attach_input(&print, "TEXT", &value).unwrap();
        graph.attach_next(&print, &after).unwrap();

        graph.delete_subtree(&print).unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.roots(), &[keep]);
    }

    #[test]
    fn test_delete_nested_block_clears_parent_slot() {
        let mut graph = ProgramGraph::new();
        let sum = graph.add_block(BlockKind::MathArithmetic).unwrap();
        let one = number(&mut graph, 1.0);
        graph.attach_input(&sum, "B", &one).unwrap();

        graph.delete_subtree(&one).unwrap();
        assert_eq!(graph.block(&sum).unwrap().input("B"), None);
        graph.validate().unwrap();
    }

    #[test]
    fn test_detach_makes_root() {
        let mut graph = ProgramGraph::new();
        let first = graph.add_block(BlockKind::TextPrint).unwrap();
        let second = graph.add_block(BlockKind::TextPrint).unwrap();
        graph.attach_next(&first, &second).unwrap();

        graph.detach(&second).unwrap();
        assert_eq!(graph.roots(), &[first.clone(), second.clone()]);
        assert!(matches!(
            graph.detach(&second),
            Err(StructuralError::NotAttached(_))
        ));
    }

    #[test]
    fn test_shrinking_items_displaces_children() {
        let mut graph = ProgramGraph::new();
        let list = graph.add_block(BlockKind::ListsCreateWith).unwrap();
        let last = number(&mut graph, 9.0);
        graph.attach_input(&list, "ADD2", &last).unwrap();

        graph.set_item_count(&list, 1).unwrap();

        let block = graph.block(&list).unwrap();
        assert_eq!(block.inputs().count(), 1);
        assert!(graph.roots().contains(&last));
        graph.validate().unwrap();
    }

    #[test]
    fn test_variable_names_are_unique_and_renamable() {
        let mut graph = ProgramGraph::new();
        let i = graph.create_variable("i").unwrap();
        assert!(matches!(
            graph.create_variable("I"),
            Err(StructuralError::NameTaken(_))
        ));
        assert!(matches!(graph.create_variable("  "), Err(StructuralError::EmptyName)));

        graph.rename_variable(&i, "index").unwrap();
        assert_eq!(graph.variable_name(&i), Some("index"));
    }

    #[test]
    fn test_non_ascii_names_fold_case_like_validation() {
        let mut graph = ProgramGraph::new();
        let upper = graph.create_variable("Ärger").unwrap();
        assert!(matches!(
            graph.create_variable("ärger"),
            Err(StructuralError::NameTaken(_))
        ));
        graph.create_variable("Élan").unwrap();
        assert!(matches!(
            graph.rename_variable(&upper, "ÉLAN"),
            Err(StructuralError::NameTaken(_))
        ));
        graph.add_procedure("Größe", vec![], false).unwrap();
        assert!(matches!(
            graph.add_procedure("größe", vec![], false),
            Err(StructuralError::NameTaken(_))
        ));
        graph.validate().unwrap();
        assert_eq!(graph.variable_by_name("élan").map(|v| v.name.as_str()), Some("Élan"));
    }

    #[test]
    fn test_item_count_is_capped() {
        let mut graph = ProgramGraph::new();
        let list = graph.add_block(BlockKind::ListsCreateWith).unwrap();
        graph.set_item_count(&list, MAX_ITEMS).unwrap();

        let err = graph.set_item_count(&list, MAX_ITEMS + 1).unwrap_err();
        assert!(matches!(err, StructuralError::TooManyItems { items, .. } if items == MAX_ITEMS + 1));
        assert_eq!(graph.block(&list).unwrap().mutation().items, MAX_ITEMS);
    }

    #[test]
    fn test_referenced_variable_cannot_be_deleted() {
        let mut graph = ProgramGraph::new();
        let x = graph.create_variable("x").unwrap();
        let get = graph.add_block(BlockKind::VariablesGet).unwrap();
        graph.set_field(&get, "VAR", FieldValue::Variable(x.clone())).unwrap();

        assert!(matches!(
            graph.delete_variable(&x),
            Err(StructuralError::VariableInUse(_))
        ));
        graph.delete_subtree(&get).unwrap();
        graph.delete_variable(&x).unwrap();
        assert!(graph.variables().is_empty());
    }

    #[test]
    fn test_call_arity_follows_procedure() {
        let mut graph = ProgramGraph::new();
        let a = graph.create_variable("a").unwrap();
        let b = graph.create_variable("b").unwrap();
        let (procedure, _) = graph.add_procedure("work", vec![a.clone()], false).unwrap();
        let call = graph.add_block(BlockKind::ProceduresCallNoReturn).unwrap();

        graph
            .set_field(&call, "NAME", FieldValue::Procedure(procedure.clone()))
            .unwrap();
        assert_eq!(graph.block(&call).unwrap().inputs().count(), 1);

        graph.set_procedure_params(&procedure, vec![a, b]).unwrap();
        let names: Vec<_> = graph.block(&call).unwrap().inputs().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["ARG0", "ARG1"]);

        assert!(matches!(
            graph.remove_procedure(&procedure),
            Err(StructuralError::ProcedureInUse(_))
        ));
    }

    #[test]
    fn test_call_kind_must_match_return() {
        let mut graph = ProgramGraph::new();
        let (procedure, _) = graph.add_procedure("compute", vec![], true).unwrap();
        let call = graph.add_block(BlockKind::ProceduresCallNoReturn).unwrap();
        let err = graph
            .set_field(&call, "NAME", FieldValue::Procedure(procedure))
            .unwrap_err();
        assert!(matches!(err, StructuralError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_deleting_definition_removes_procedure() {
        let mut graph = ProgramGraph::new();
        let (procedure, definition) = graph.add_procedure("f", vec![], false).unwrap();
        let body = graph.add_block(BlockKind::TextPrint).unwrap();
        graph.attach_body(&definition, "STACK", &body).unwrap();

        graph.delete_subtree(&definition).unwrap();
        assert!(graph.procedure(&procedure).is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_every_mutation_notifies_once() {
        let mut graph = ProgramGraph::new();
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        graph.subscribe(move |_| seen.set(seen.get() + 1));

        let print = graph.add_block(BlockKind::TextPrint).unwrap();
        let text = graph.add_block(BlockKind::Text).unwrap();
        graph.attach_input(&print, "TEXT", &text).unwrap();
        assert_eq!(count.get(), 3);

        let _ = graph.attach_input(&print, "TEXT", &text);
        assert_eq!(count.get(), 3, "failed mutation must not notify");
    }

    #[test]
    fn test_batch_notifies_once_and_rolls_back_on_error() {
        let mut graph = ProgramGraph::new();
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        graph.subscribe(move |_| seen.set(seen.get() + 1));

        graph
            .batch(|g| {
                let a = g.add_block(BlockKind::TextPrint)?;
                let b = g.add_block(BlockKind::TextPrint)?;
                g.attach_next(&a, &b)
            })
            .unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(graph.len(), 2);

        let result = graph.batch(|g| {
            g.add_block(BlockKind::CommentBlock)?;
            g.detach(&BlockId::from("missing"))
        });
        assert!(result.is_err());
        assert_eq!(count.get(), 1);
        assert_eq!(graph.len(), 2);
    }
}
