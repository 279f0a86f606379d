//! # Python Code Generator
//!
//! Walks a [`ProgramGraph`] and produces Python 3 source text.
//!
//! Generation is total: any graph that satisfies its structural invariants
//! produces well-formed text. Missing inputs are filled with neutral
//! placeholders and empty bodies with `pass`.

use super::block_handlers::{reserved_names, Generated};
use super::context::{DefinitionKind, GenerationContext};
use super::names::NameTable;
use super::options::CodegenOptions;
use super::precedence::{needs_parens, Binding, Order};
use crate::catalog::BlockKind;
use crate::graph::{BlockId, BlockInstance, FieldValue, ProgramGraph};
use std::collections::HashSet;

/// Python code generator for one generation pass
pub struct PythonCodeGenerator<'a> {
    graph: &'a ProgramGraph,
    options: &'a CodegenOptions,
    pub(super) names: NameTable,
    pub(super) context: GenerationContext,
    visited: HashSet<BlockId>,
    /// Loops enclosing the block being rendered
    pub(super) loop_depth: usize,
}

impl<'a> PythonCodeGenerator<'a> {
    pub fn new(graph: &'a ProgramGraph, options: &'a CodegenOptions) -> Self {
        let mut reserved: Vec<&'static str> = Vec::new();
        for block in graph.blocks() {
            for &name in reserved_names(block) {
                if !reserved.contains(&name) {
                    reserved.push(name);
                }
            }
        }
        let names = NameTable::build(graph, reserved);

        Self {
            graph,
            options,
            names,
            context: GenerationContext::new(),
            visited: HashSet::new(),
            loop_depth: 0,
        }
    }

    /// Generate the complete program
    pub fn generate_program(mut self) -> String {
        self.declare_variables();

        // Pass A: everything except procedure definitions, in root order
        let graph = self.graph;
        let mut chains = Vec::new();
        for root in graph.roots() {
            let is_definition = graph
                .block(root)
                .map(|block| block.kind().is_definition())
                .unwrap_or(false);
            if is_definition {
                continue;
            }
            let (code, _) = self.chain_to_code(Some(root));
            if !code.is_empty() {
                chains.push(code);
            }
        }
        tracing::debug!("[CODEGEN] Rendered {} top-level chains", chains.len());

        // Pass B: procedure definitions
        for procedure in graph.procedures() {
            if let Some(definition) = graph.block(&procedure.definition) {
                self.generate_definition(definition);
            }
        }

        self.context.assemble(&chains.join("\n"))
    }

    /// Mirrors the `x = None` declarations a Blockly workspace records; they
    /// are never emitted, since every variable is assigned before use
    fn declare_variables(&mut self) {
        let graph = self.graph;
        let declarations: Vec<String> = graph
            .variables()
            .iter()
            .filter_map(|variable| self.names.variable(&variable.id))
            .map(|name| format!("{} = None", name))
            .collect();
        if !declarations.is_empty() {
            self.context
                .add_definition("variables", DefinitionKind::Other, declarations.join("\n"));
        }
    }

    fn generate_definition(&mut self, block: &BlockInstance) {
        let graph = self.graph;
        let procedure = block.procedure("NAME").and_then(|id| graph.procedure(id));
        let procedure = match procedure {
            Some(procedure) => procedure,
            None => {
                tracing::warn!("[CODEGEN] Definition {} is not bound to a procedure", block.id());
                return;
            }
        };
        let name = self
            .names
            .procedure(&procedure.id)
            .unwrap_or("unnamed")
            .to_string();
        let params: Vec<String> = procedure
            .params
            .iter()
            .map(|param| self.names.variable(param).unwrap_or("_").to_string())
            .collect();

        // A loop outside the definition does not enclose its body
        let outer_depth = std::mem::replace(&mut self.loop_depth, 0);
        let (body, has_statements) = self.chain_to_code(block.body("STACK"));
        let mut code = format!("def {}({}):\n", name, params.join(", "));
        code.push_str(&self.indent_lines(&body));

        let return_value = if block.kind() == BlockKind::ProceduresDefReturn {
            self.value_to_code(block, "RETURN", Order::None, Binding::Loose)
        } else {
            None
        };
        self.loop_depth = outer_depth;
        match return_value {
            Some(value) => {
                code.push_str(&format!("{}return {}\n", self.options.indent, value));
            }
            None if !has_statements => {
                code.push_str(&format!("{}pass\n", self.options.indent));
            }
            None => {}
        }

        tracing::debug!("[CODEGEN] Defined procedure {}", name);
        self.context.add_definition(
            &format!("%procedure%{}", procedure.id),
            DefinitionKind::Function,
            code,
        );
    }

    /// Render one block by its generation rule
    fn render_block(&mut self, id: &BlockId) -> Generated {
        // Structural invariants rule out cycles; this only guards against
        // rendering a block twice in one pass
        if !self.visited.insert(id.clone()) {
            tracing::warn!("[CODEGEN] Block {} reached twice, skipping", id);
            return Generated::Nothing;
        }
        let graph = self.graph;
        match graph.block(id) {
            Some(block) => self.generate_block(block),
            None => {
                tracing::warn!("[CODEGEN] Dangling block reference {}", id);
                Generated::Nothing
            }
        }
    }

    /// Renders the expression plugged into `slot`, parenthesised for a
    /// position of strength `order`. `None` when the slot is empty.
    pub(super) fn value_to_code(
        &mut self,
        block: &BlockInstance,
        slot: &str,
        order: Order,
        binding: Binding,
    ) -> Option<String> {
        let child = block.input(slot)?;
        match self.render_block(child) {
            Generated::Expr(code, inner) => {
                if needs_parens(inner, order, binding) {
                    Some(format!("({})", code))
                } else {
                    Some(code)
                }
            }
            Generated::Stmt(_) | Generated::Nothing => {
                tracing::warn!("[CODEGEN] Input {}.{} does not hold an expression", block.id(), slot);
                None
            }
        }
    }

    /// Like [`value_to_code`](Self::value_to_code) with a placeholder for an empty slot
    pub(super) fn value_or(
        &mut self,
        block: &BlockInstance,
        slot: &str,
        order: Order,
        binding: Binding,
        placeholder: &str,
    ) -> String {
        self.value_to_code(block, slot, order, binding)
            .unwrap_or_else(|| placeholder.to_string())
    }

    /// Indented statement body of `slot`; `pass` when it holds no statements
    pub(super) fn statement_to_code(&mut self, block: &BlockInstance, slot: &str) -> String {
        let (code, has_statements) = self.chain_to_code(block.body(slot));
        let mut body = self.indent_lines(&code);
        if !has_statements {
            body.push_str(&format!("{}pass\n", self.options.indent));
        }
        body
    }

    /// [`statement_to_code`](Self::statement_to_code) for the body of a loop
    pub(super) fn loop_body_to_code(&mut self, block: &BlockInstance, slot: &str) -> String {
        self.loop_depth += 1;
        let body = self.statement_to_code(block, slot);
        self.loop_depth -= 1;
        body
    }

    /// Renders a statement chain by following `next` links. The flag is
    /// false when nothing but comments was produced.
    fn chain_to_code(&mut self, head: Option<&BlockId>) -> (String, bool) {
        let graph = self.graph;
        let mut code = String::new();
        let mut has_statements = false;
        let mut current = head;

        while let Some(id) = current {
            let block = match graph.block(id) {
                Some(block) => block,
                None => break,
            };
            match self.render_block(id) {
                Generated::Stmt(text) => {
                    if !text.is_empty() && block.kind() != BlockKind::CommentBlock {
                        has_statements = true;
                    }
                    code.push_str(&text);
                }
                Generated::Expr(text, _) => {
                    // Naked value left on the canvas
                    code.push_str(&text);
                    code.push('\n');
                    has_statements = true;
                }
                Generated::Nothing => {}
            }
            current = block.next();
        }
        (code, has_statements)
    }

    fn indent_lines(&self, code: &str) -> String {
        let mut indented = String::new();
        for line in code.lines() {
            if line.trim().is_empty() {
                indented.push('\n');
            } else {
                indented.push_str(&format!("{}{}\n", self.options.indent, line));
            }
        }
        indented
    }

    /// Identifier bound in a variable field; `None` when unbound
    pub(super) fn variable_name(&self, block: &BlockInstance, field: &str) -> Option<String> {
        match block.field(field) {
            Some(FieldValue::Variable(id)) => self.names.variable(id).map(str::to_string),
            _ => None,
        }
    }

    /// Identifier bound in a procedure field; `None` when unbound
    pub(super) fn procedure_name(&self, block: &BlockInstance, field: &str) -> Option<String> {
        match block.field(field) {
            Some(FieldValue::Procedure(id)) => self.names.procedure(id).map(str::to_string),
            _ => None,
        }
    }

    /// Registers a helper function once per pass and returns its name
    pub(super) fn provide_function(
        &mut self,
        key: &str,
        build: impl FnOnce(&str, &str) -> String,
    ) -> String {
        let definition_key = format!("%helper%{}", key);
        if let Some(name) = self.names.helper_name(key) {
            return name;
        }
        let name = self.names.helper(key);
        self.names.remember_helper(key, &name);
        let code = build(&name, &self.options.indent);
        self.context
            .add_definition(&definition_key, DefinitionKind::Function, code);
        name
    }
}
