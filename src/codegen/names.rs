//! # Name Resolution
//!
//! Maps user-facing variable and procedure names onto legal, distinct Python
//! identifiers. The table is rebuilt every pass, so renames show up in the
//! next generation without touching any block.

use crate::graph::{ProcedureId, ProgramGraph, VariableId};
use std::collections::{HashMap, HashSet};

/// Python 3 keywords; never usable as identifiers
pub const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

#[derive(Debug, Clone, Default)]
pub struct NameTable {
    taken: HashSet<String>,
    variables: HashMap<VariableId, String>,
    procedures: HashMap<ProcedureId, String>,
    helpers: HashMap<String, String>,
}

impl NameTable {
    /// Reserves keywords plus `reserved`, then names every variable and
    /// procedure of `graph` in declaration order
    pub fn build<'r>(graph: &ProgramGraph, reserved: impl IntoIterator<Item = &'r str>) -> Self {
        let mut table = NameTable::default();
        table.taken.extend(PYTHON_KEYWORDS.iter().map(|word| word.to_string()));
        table.taken.extend(reserved.into_iter().map(str::to_string));

        for variable in graph.variables() {
            let name = table.distinct(&legalize(&variable.name));
            tracing::debug!("[CODEGEN] Variable '{}' -> {}", variable.name, name);
            table.variables.insert(variable.id.clone(), name);
        }
        for procedure in graph.procedures() {
            let name = table.distinct(&legalize(&procedure.name));
            tracing::debug!("[CODEGEN] Procedure '{}' -> {}", procedure.name, name);
            table.procedures.insert(procedure.id.clone(), name);
        }
        table
    }

    pub fn variable(&self, id: &VariableId) -> Option<&str> {
        self.variables.get(id).map(String::as_str)
    }

    pub fn procedure(&self, id: &ProcedureId) -> Option<&str> {
        self.procedures.get(id).map(String::as_str)
    }

    /// Claims a fresh identifier based on `base` (`count`, `count2`, ...)
    pub fn helper(&mut self, base: &str) -> String {
        self.distinct(&legalize(base))
    }

    /// Name previously given to the helper function `key` in this pass
    pub fn helper_name(&self, key: &str) -> Option<String> {
        self.helpers.get(key).cloned()
    }

    pub fn remember_helper(&mut self, key: &str, name: &str) {
        self.helpers.insert(key.to_string(), name.to_string());
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    fn distinct(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut suffix = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{}{}", base, suffix);
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Turns arbitrary text into a syntactically legal identifier
pub fn legalize(name: &str) -> String {
    let mut legal: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if legal.is_empty() {
        legal.push_str("unnamed");
    }
    if legal.starts_with(|c: char| c.is_ascii_digit()) {
        legal.insert_str(0, "my_");
    }
    legal
}
