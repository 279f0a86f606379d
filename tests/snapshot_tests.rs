//! Save/load tests against the persisted JSON form.

use abgc::{compile_graph, compile_json, restore, snapshot, BlockKind, FieldValue, PersistedForm, ProgramGraph};
use std::cell::Cell;
use std::rc::Rc;

const TEMPLATE: &str = include_str!("fixtures/sum_template.json");

const TEMPLATE_SOURCE: &str = "def double(n):\n  return n * 2\n\n\
                               total = 0\n\
                               for i in range(1, 5):\n  total += i\n\
                               print(total)\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_template_with_shadows_and_unknown_keys_loads() {
    init_tracing();
    let mut graph = ProgramGraph::new();
    graph.load_json(TEMPLATE).unwrap();

    assert_eq!(graph.roots().len(), 2);
    assert_eq!(graph.variables().len(), 3);
    assert_eq!(graph.procedures().len(), 1);
    assert_eq!(graph.procedures()[0].name, "double");
    assert!(graph.validate().is_ok());
    assert_eq!(compile_graph(&graph), TEMPLATE_SOURCE);
}

#[test]
fn test_compile_json_matches_loaded_graph() {
    init_tracing();
    assert_eq!(compile_json(TEMPLATE).unwrap(), TEMPLATE_SOURCE);
}

#[test]
fn test_round_trip_preserves_graph_and_output() {
    init_tracing();
    let original = restore(&PersistedForm::from_json(TEMPLATE).unwrap()).unwrap();

    let saved = snapshot(&original).to_json_pretty().unwrap();
    let reloaded = restore(&PersistedForm::from_json(&saved).unwrap()).unwrap();

    assert_eq!(reloaded, original);
    assert_eq!(compile_graph(&reloaded), compile_graph(&original));
    assert_eq!(snapshot(&reloaded), snapshot(&original));
}

#[test]
fn test_round_trip_of_edited_graph() {
    init_tracing();
    let mut graph = ProgramGraph::new();
    let items = graph.create_variable("items").unwrap();
    let (_, definition) = graph.add_procedure("show all", vec![items.clone()], false).unwrap();

    let each = graph.add_block(BlockKind::ControlsForEach).unwrap();
    graph.set_field(&each, "VAR", FieldValue::Variable(items.clone())).unwrap();
    let branch = graph.add_block(BlockKind::ControlsIf).unwrap();
    graph.set_item_count(&branch, 1).unwrap();
    graph.set_has_else(&branch, true).unwrap();
    graph.attach_body(&each, "DO", &branch).unwrap();
    graph.attach_body(&definition, "STACK", &each).unwrap();

    let join = graph.add_block(BlockKind::TextJoin).unwrap();
    graph.set_item_count(&join, 3).unwrap();
    let note = graph.add_block(BlockKind::CommentBlock).unwrap();
    graph.set_field(&note, "TEXT", FieldValue::Text("it's \"quoted\"".into())).unwrap();

    let form = PersistedForm::from_json(&graph.to_snapshot().to_json().unwrap()).unwrap();
    let reloaded = restore(&form).unwrap();

    assert_eq!(reloaded, graph);
    assert_eq!(compile_graph(&reloaded), compile_graph(&graph));
}

#[test]
fn test_failed_load_leaves_graph_intact() {
    init_tracing();
    let mut graph = ProgramGraph::new();
    graph.load_json(TEMPLATE).unwrap();
    let before = graph.to_snapshot();

    let broken = r#"{"blocks":{"blocks":[
        {"type":"text_print","id":"p","inputs":{"TEXT":{"block":{"type":"turtle_forward","id":"t"}}}}
    ]}}"#;
    assert!(graph.load_json(broken).is_err());
    assert!(graph.load_json("{ not json").is_err());

    assert_eq!(graph.to_snapshot(), before);
    assert_eq!(compile_graph(&graph), TEMPLATE_SOURCE);
}

#[test]
fn test_load_notifies_once() {
    init_tracing();
    let count = Rc::new(Cell::new(0));
    let seen = count.clone();
    let mut graph = ProgramGraph::new();
    graph.subscribe(move |_| seen.set(seen.get() + 1));

    graph.load_json(TEMPLATE).unwrap();
    assert_eq!(count.get(), 1);

    assert!(graph.load_json(r#"{"blocks":{"blocks":[{"type":"nope","id":"x"}]}}"#).is_err());
    assert_eq!(count.get(), 1);
}
