use super::{fold_name, Attachment, BlockId, BlockInstance, FieldValue, GraphState};
use crate::catalog::{BlockKind, Connection, SlotKind};
use crate::error::{Result, StructuralError};
use std::collections::HashSet;

fn broken(message: String) -> StructuralError {
    StructuralError::Invariant(message)
}

impl GraphState {
    /// Checks every structural invariant of the graph
    pub(crate) fn validate(&self) -> Result<()> {
        self.validate_roots()?;
        for block in self.blocks.values() {
            self.validate_shape(block)?;
            self.validate_links(block)?;
            self.validate_references(block)?;
        }
        self.validate_acyclic()?;
        self.validate_names()?;
        self.validate_procedures()
    }

    fn validate_roots(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for root in &self.roots {
            let block = self
                .blocks
                .get(root)
                .ok_or_else(|| broken(format!("root {} does not exist", root)))?;
            if block.parent.is_some() {
                return Err(broken(format!("root {} has a parent", root)));
            }
            if !seen.insert(root) {
                return Err(broken(format!("root {} listed twice", root)));
            }
        }
        for block in self.blocks.values() {
            if block.parent.is_none() && !seen.contains(&block.id) {
                return Err(broken(format!("unattached block {} is not a root", block.id)));
            }
        }
        Ok(())
    }

    fn validate_shape(&self, block: &BlockInstance) -> Result<()> {
        let expected = block.kind.slots(&block.mutation);
        let declared = block.fields.len() + block.inputs.len() + block.bodies.len();
        if declared != expected.len() {
            return Err(broken(format!("{} has {} slots, expected {}", block.id, declared, expected.len())));
        }
        for slot in &expected {
            let present = match slot.kind {
                SlotKind::Field(_) => block.fields.contains_key(&*slot.name),
                SlotKind::Input(_) => block.inputs.contains_key(&*slot.name),
                SlotKind::Body => block.bodies.contains_key(&*slot.name),
            };
            if !present {
                return Err(broken(format!("{} is missing slot {}", block.id, slot.name)));
            }
        }
        Ok(())
    }

    /// Parent links and child slots must mirror each other
    fn validate_links(&self, block: &BlockInstance) -> Result<()> {
        let links = block
            .inputs
            .iter()
            .map(|(name, child)| (Attachment::Input(name.clone()), child))
            .chain(
                block
                    .bodies
                    .iter()
                    .map(|(name, child)| (Attachment::Body(name.clone()), child)),
            )
            .chain(std::iter::once((Attachment::Next, &block.next)));

        for (attachment, child) in links {
            let child_id = match child {
                Some(id) => id,
                None => continue,
            };
            let child = self
                .blocks
                .get(child_id)
                .ok_or_else(|| broken(format!("{} links to missing block {}", block.id, child_id)))?;
            let back = child.parent.as_ref();
            if back.map(|link| (&link.parent, &link.attachment)) != Some((&block.id, &attachment)) {
                return Err(broken(format!("{} does not point back to {}", child_id, block.id)));
            }

            let required = match attachment {
                Attachment::Input(ref slot) => {
                    if let (Some(SlotKind::Input(Some(expected))), Some(found)) =
                        (block.kind.slot(&block.mutation, slot), child.kind.output())
                    {
                        if expected != found {
                            return Err(StructuralError::TypeMismatch {
                                block: block.id.clone(),
                                slot: slot.clone(),
                                expected,
                                found,
                            });
                        }
                    }
                    Connection::Expression
                }
                Attachment::Body(_) | Attachment::Next => Connection::Statement,
            };
            if child.kind.connection() != required {
                return Err(StructuralError::ConnectionMismatch {
                    block: child.id.clone(),
                    expected: required,
                    found: child.kind.connection(),
                });
            }
        }

        if block.next.is_some() && block.kind.connection() != Connection::Statement {
            return Err(broken(format!("{} cannot have a next block", block.id)));
        }
        if let Some(link) = &block.parent {
            let parent = self
                .blocks
                .get(&link.parent)
                .ok_or_else(|| broken(format!("{} has missing parent {}", block.id, link.parent)))?;
            let holds = match &link.attachment {
                Attachment::Input(name) => parent.input(name),
                Attachment::Body(name) => parent.body(name),
                Attachment::Next => parent.next(),
            };
            if holds != Some(&block.id) {
                return Err(broken(format!("{} is not held by its parent {}", block.id, link.parent)));
            }
        }
        Ok(())
    }

    fn validate_references(&self, block: &BlockInstance) -> Result<()> {
        for value in block.fields.values() {
            match value {
                FieldValue::Variable(id) if self.variable(id).is_none() => {
                    return Err(StructuralError::VariableNotFound(id.clone()));
                }
                FieldValue::Procedure(id) if self.procedure(id).is_none() => {
                    return Err(StructuralError::ProcedureNotFound(id.clone()));
                }
                _ => {}
            }
        }

        if block.kind.is_call() {
            if let Some(procedure) = block.procedure("NAME").and_then(|id| self.procedure(id)) {
                if procedure.params.len() != block.mutation.items {
                    return Err(broken(format!(
                        "call {} passes {} arguments to {} which takes {}",
                        block.id,
                        block.mutation.items,
                        procedure.name,
                        procedure.params.len()
                    )));
                }
                if procedure.returns != (block.kind == BlockKind::ProceduresCallReturn) {
                    return Err(broken(format!("call {} does not match {}", block.id, procedure.name)));
                }
            }
        }

        if block.kind.is_definition() {
            let bound = block
                .procedure("NAME")
                .and_then(|id| self.procedure(id))
                .filter(|procedure| procedure.definition == block.id);
            if bound.is_none() {
                return Err(broken(format!("definition {} is not bound to its procedure", block.id)));
            }
            if block.parent.is_some() {
                return Err(broken(format!("definition {} is nested", block.id)));
            }
        }
        Ok(())
    }

    /// Walking up parent links must always reach a root
    fn validate_acyclic(&self) -> Result<()> {
        let limit = self.blocks.len();
        for block in self.blocks.values() {
            let mut current: &BlockId = &block.id;
            let mut steps = 0;
            while let Some(link) = self.blocks.get(current).and_then(|b| b.parent.as_ref()) {
                steps += 1;
                if steps > limit {
                    return Err(StructuralError::WouldCreateCycle {
                        parent: link.parent.clone(),
                        child: block.id.clone(),
                    });
                }
                current = &link.parent;
            }
        }
        Ok(())
    }

    fn validate_names(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for variable in &self.variables {
            if !ids.insert(variable.id.as_str()) {
                return Err(StructuralError::DuplicateId(variable.id.to_string()));
            }
            if variable.name.trim().is_empty() {
                return Err(StructuralError::EmptyName);
            }
            if !names.insert(fold_name(&variable.name)) {
                return Err(StructuralError::NameTaken(variable.name.clone()));
            }
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for procedure in &self.procedures {
            if !ids.insert(procedure.id.as_str()) {
                return Err(StructuralError::DuplicateId(procedure.id.to_string()));
            }
            if procedure.name.trim().is_empty() {
                return Err(StructuralError::EmptyName);
            }
            if !names.insert(fold_name(&procedure.name)) {
                return Err(StructuralError::NameTaken(procedure.name.clone()));
            }
        }
        Ok(())
    }

    fn validate_procedures(&self) -> Result<()> {
        for procedure in &self.procedures {
            let definition = self
                .blocks
                .get(&procedure.definition)
                .ok_or_else(|| broken(format!("procedure {} has no definition", procedure.name)))?;
            let kind = if procedure.returns {
                BlockKind::ProceduresDefReturn
            } else {
                BlockKind::ProceduresDefNoReturn
            };
            if definition.kind != kind || definition.procedure("NAME") != Some(&procedure.id) {
                return Err(broken(format!("definition of {} does not match it", procedure.name)));
            }
            let mut seen = HashSet::new();
            for param in &procedure.params {
                if self.variable(param).is_none() {
                    return Err(StructuralError::VariableNotFound(param.clone()));
                }
                if !seen.insert(param) {
                    return Err(StructuralError::DuplicateParameter(param.clone()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ParentLink, ProgramGraph};

    #[test]
    fn test_empty_graph_is_valid() {
        assert!(ProgramGraph::new().validate().is_ok());
    }

    #[test]
    fn test_dangling_root_is_reported() {
        let mut state = GraphState::default();
        state.roots.push(BlockId::from("ghost"));
        assert!(matches!(state.validate(), Err(StructuralError::Invariant(_))));
    }

    #[test]
    fn test_one_sided_link_is_reported() {
        let mut graph = ProgramGraph::new();
        let print = graph.add_block(BlockKind::TextPrint).unwrap();
        let text = graph.add_block(BlockKind::Text).unwrap();

        let mut state = graph.state.clone();
        if let Some(block) = state.blocks.get_mut(&text) {
            block.parent = Some(ParentLink {
                parent: print.clone(),
                attachment: Attachment::Input("TEXT".to_string()),
            });
        }
        state.roots.retain(|root| root != &text);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_statement_in_value_input_is_reported() {
        let mut graph = ProgramGraph::new();
        let print = graph.add_block(BlockKind::TextPrint).unwrap();
        let inner = graph.add_block(BlockKind::TextPrint).unwrap();

        let mut state = graph.state.clone();
        state.roots.retain(|root| root != &inner);
        if let Some(block) = state.blocks.get_mut(&print) {
            block.inputs.insert("TEXT".to_string(), Some(inner.clone()));
        }
        if let Some(block) = state.blocks.get_mut(&inner) {
            block.parent = Some(ParentLink {
                parent: print.clone(),
                attachment: Attachment::Input("TEXT".to_string()),
            });
        }
        assert!(matches!(
            state.validate(),
            Err(StructuralError::ConnectionMismatch { .. })
        ));
    }
}
