//! # Generation Context
//!
//! Bookkeeping for a single pass: hoisted imports and definitions. A fresh
//! context is created for every pass so nothing leaks between runs.

/// What a hoisted definition is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    /// A `def` block: procedures and helper functions
    Function,
    /// Any other top-level declaration; recorded but not emitted
    Other,
}

#[derive(Debug, Clone)]
struct Definition {
    key: String,
    kind: DefinitionKind,
    text: String,
}

#[derive(Debug, Default)]
pub struct GenerationContext {
    imports: Vec<String>,
    definitions: Vec<Definition>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an import line; repeats are ignored
    pub fn add_import(&mut self, line: &str) {
        if !self.imports.iter().any(|existing| existing == line) {
            tracing::debug!("[CODEGEN] Hoisting import: {}", line);
            self.imports.push(line.to_string());
        }
    }

    /// Records a definition under `key`. Returns false if the key, or a
    /// definition with identical text, was already recorded.
    pub fn add_definition(&mut self, key: &str, kind: DefinitionKind, text: String) -> bool {
        let duplicate = self
            .definitions
            .iter()
            .any(|existing| existing.key == key || existing.text == text);
        if duplicate {
            return false;
        }
        self.definitions.push(Definition {
            key: key.to_string(),
            kind,
            text,
        });
        true
    }

    pub fn has_definition(&self, key: &str) -> bool {
        self.definitions.iter().any(|existing| existing.key == key)
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Function definitions in the order they were first recorded
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .filter(|definition| definition.kind == DefinitionKind::Function)
            .map(|definition| definition.text.as_str())
    }

    /// Joins imports, function definitions and the main text, separated by
    /// blank lines. Empty sections are left out; a program with nothing in
    /// it becomes `pass`.
    pub fn assemble(&self, main: &str) -> String {
        let mut sections: Vec<String> = Vec::new();

        if !self.imports.is_empty() {
            let mut imports = String::new();
            for line in &self.imports {
                imports.push_str(line);
                imports.push('\n');
            }
            sections.push(imports);
        }

        let functions: Vec<String> = self.functions().map(ensure_newline).collect();
        if !functions.is_empty() {
            sections.push(functions.join("\n"));
        }

        if !main.trim().is_empty() {
            sections.push(ensure_newline(main));
        }

        if sections.is_empty() {
            return "pass\n".to_string();
        }
        sections.join("\n")
    }
}

fn ensure_newline(text: &str) -> String {
    let trimmed = text.trim_end_matches('\n');
    format!("{}\n", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_assembles_pass() {
        assert_eq!(GenerationContext::new().assemble(""), "pass\n");
    }

    #[test]
    fn test_imports_deduplicated_in_first_order() {
        let mut context = GenerationContext::new();
        context.add_import("import random");
        context.add_import("import math");
        context.add_import("import random");
        assert_eq!(context.imports(), &["import random", "import math"]);
    }

    #[test]
    fn test_other_definitions_are_dropped() {
        let mut context = GenerationContext::new();
        context.add_definition("variables", DefinitionKind::Other, "x = None".to_string());
        context.add_definition("f", DefinitionKind::Function, "def f():\n  pass\n".to_string());
        assert!(context.has_definition("variables"));

        let code = context.assemble("f()\n");
        assert_eq!(code, "def f():\n  pass\n\nf()\n");
    }

    #[test]
    fn test_sections_are_separated_by_blank_lines() {
        let mut context = GenerationContext::new();
        context.add_import("import math");
        context.add_definition("a", DefinitionKind::Function, "def a():\n  pass\n".to_string());
        context.add_definition("b", DefinitionKind::Function, "def b():\n  pass\n".to_string());
        assert!(!context.add_definition("c", DefinitionKind::Function, "def b():\n  pass\n".to_string()));

        let code = context.assemble("a()\n");
        assert_eq!(
            code,
            "import math\n\ndef a():\n  pass\n\ndef b():\n  pass\n\na()\n"
        );
    }
}
