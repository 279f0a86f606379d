//! # Block Program Compiler
//!
//! Main entry points for compiling block programs to Python source.

use crate::codegen::{CodegenOptions, PythonCodeGenerator};
use crate::error::SerializationError;
use crate::graph::ProgramGraph;
use crate::serialization::{restore, PersistedForm};

/// Compile a program graph to Python source code
///
/// This is the main entry point for the compiler. Generation is total: an
/// empty graph yields `pass\n`, and empty slots are filled with neutral
/// placeholders instead of failing.
///
/// # Arguments
///
/// * `graph` - The program graph to compile
///
/// # Returns
///
/// The generated Python source code
///
/// # Examples
///
/// ```rust
/// use abgc::{compile_graph, BlockKind, ProgramGraph};
///
/// let mut graph = ProgramGraph::new();
/// graph.add_block(BlockKind::TextPrint).unwrap();
/// assert_eq!(compile_graph(&graph), "print('')\n");
/// ```
pub fn compile_graph(graph: &ProgramGraph) -> String {
    compile_graph_with_options(graph, &CodegenOptions::default())
}

/// Compile a program graph with explicit generator settings
///
/// # Arguments
///
/// * `graph` - The program graph to compile
/// * `options` - Generator settings such as the indentation unit
///
/// # Returns
///
/// The generated Python source code
pub fn compile_graph_with_options(graph: &ProgramGraph, options: &CodegenOptions) -> String {
    tracing::info!("[ABGC] Starting compilation");
    tracing::info!(
        "[ABGC] Graph: {} blocks, {} roots, {} variables, {} procedures",
        graph.len(),
        graph.roots().len(),
        graph.variables().len(),
        graph.procedures().len()
    );

    // Phase 1: Check invariants. Generation proceeds regardless.
    tracing::info!("[ABGC] Phase 1: Checking graph invariants...");
    if let Err(e) = graph.validate() {
        tracing::warn!("[ABGC] Graph violates an invariant, output may be degraded: {}", e);
    }

    // Phase 2: Resolve names
    tracing::info!("[ABGC] Phase 2: Resolving names...");
    let generator = PythonCodeGenerator::new(graph, options);

    // Phase 3: Generate code
    tracing::info!("[ABGC] Phase 3: Generating Python code...");
    let code = generator.generate_program();

    tracing::info!("[ABGC] Code generation complete ({} bytes)", code.len());
    code
}

/// Compile a persisted snapshot without keeping the restored graph
///
/// # Arguments
///
/// * `form` - A snapshot produced by [`snapshot`](crate::serialization::snapshot)
///   or loaded from a template
/// * `options` - Generator settings
///
/// # Returns
///
/// * `Ok(String)` - The generated Python source code
/// * `Err(SerializationError)` - The snapshot could not be restored
pub fn compile_snapshot(
    form: &PersistedForm,
    options: &CodegenOptions,
) -> Result<String, SerializationError> {
    let graph = restore(form)?;
    Ok(compile_graph_with_options(&graph, options))
}

/// Compile a snapshot given as JSON text, with default settings
pub fn compile_json(json: &str) -> Result<String, SerializationError> {
    let form = PersistedForm::from_json(json)?;
    compile_snapshot(&form, &CodegenOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BlockKind;
    use crate::graph::FieldValue;

    #[test]
    fn test_empty_graph_compiles_to_pass() {
        assert_eq!(compile_graph(&ProgramGraph::new()), "pass\n");
    }

    #[test]
    fn test_indent_follows_options() {
        let mut graph = ProgramGraph::new();
        let repeat = graph.add_block(BlockKind::ControlsRepeatExt).unwrap();
        let times = graph.add_block(BlockKind::MathNumber).unwrap();
        graph.set_field(&times, "NUM", FieldValue::Number(3.0)).unwrap();
        graph.attach_input(&repeat, "TIMES", &times).unwrap();

        let code = compile_graph_with_options(&graph, &CodegenOptions::with_indent_width(4));
        assert_eq!(code, "for count in range(3):\n    pass\n");
    }

    #[test]
    fn test_compile_json_rejects_bad_input() {
        assert!(compile_json("{").is_err());
    }
}
