//! Regeneration driver and collaborator dispatch, wired together the way an
//! editor host would.

use abgc::{
    AnalysisResponse, BlockKind, CodegenOptions, Collaborator, CollaboratorDispatcher,
    CollaboratorError, CollaboratorRequest, CollaboratorStatus, Endpoint, FieldValue, Generation,
    ProgramGraph, RegenerationDriver, ResultBoard, StructuralError,
};
use std::cell::RefCell;
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn recording_driver(graph: &mut ProgramGraph) -> (RegenerationDriver, Rc<RefCell<Vec<Generation>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let driver = RegenerationDriver::attach(graph, CodegenOptions::default(), move |g: Generation| {
        sink.borrow_mut().push(g)
    });
    (driver, seen)
}

#[derive(Clone, Default)]
struct Outbox(Rc<RefCell<Vec<CollaboratorRequest>>>);

impl Collaborator for Outbox {
    fn send(&mut self, request: CollaboratorRequest) {
        self.0.borrow_mut().push(request);
    }
}

#[test]
fn test_sequence_increases_with_every_change() {
    init_tracing();
    let mut graph = ProgramGraph::new();
    let (driver, seen) = recording_driver(&mut graph);

    let print = graph.add_block(BlockKind::TextPrint).unwrap();
    let text = graph.add_block(BlockKind::Text).unwrap();
    graph.set_field(&text, "TEXT", FieldValue::Text("hi".into())).unwrap();
    graph.attach_input(&print, "TEXT", &text).unwrap();

    let seen = seen.borrow();
    let sequences: Vec<u64> = seen.iter().map(|g| g.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
    assert_eq!(seen[3].source, "print('hi')\n");
    assert_eq!(seen[3].snapshot, graph.to_snapshot());
    assert_eq!(driver.sequence(), 4);
}

#[test]
fn test_rejected_edit_does_not_regenerate() {
    init_tracing();
    let mut graph = ProgramGraph::new();
    let (_driver, seen) = recording_driver(&mut graph);

    let sum = graph.add_block(BlockKind::MathArithmetic).unwrap();
    let text = graph.add_block(BlockKind::Text).unwrap();
    let err = graph.attach_input(&sum, "A", &text).unwrap_err();

    assert!(matches!(err, StructuralError::TypeMismatch { .. }));
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn test_batch_produces_one_generation() {
    init_tracing();
    let mut graph = ProgramGraph::new();
    let (_driver, seen) = recording_driver(&mut graph);

    graph
        .batch(|g| {
            let i = g.create_variable("i")?;
            let set = g.add_block(BlockKind::VariablesSet)?;
            g.set_field(&set, "VAR", FieldValue::Variable(i))?;
            let value = g.add_block(BlockKind::MathNumber)?;
            g.set_field(&value, "NUM", FieldValue::Number(3.0))?;
            g.attach_input(&set, "VALUE", &value)
        })
        .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].source, "i = 3\n");
}

#[test]
fn test_failed_batch_rolls_back_silently() {
    init_tracing();
    let mut graph = ProgramGraph::new();
    let (_driver, seen) = recording_driver(&mut graph);

    let result = graph.batch(|g| {
        let sum = g.add_block(BlockKind::MathArithmetic)?;
        let text = g.add_block(BlockKind::Text)?;
        g.attach_input(&sum, "A", &text)
    });

    assert!(result.is_err());
    assert!(graph.is_empty());
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_dispatcher_drops_superseded_analysis() {
    init_tracing();
    let outbox = Outbox::default();
    let board = Rc::new(RefCell::new(ResultBoard::new()));
    let mut graph = ProgramGraph::new();
    let _driver = RegenerationDriver::attach(
        &mut graph,
        CodegenOptions::default(),
        CollaboratorDispatcher::new(outbox.clone(), board.clone()),
    );

    graph.add_block(BlockKind::TextPrint).unwrap();
    graph.add_block(BlockKind::LogicNull).unwrap();

    let sent = outbox.0.borrow().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|request| request.endpoint == Endpoint::Analyze));
    assert_eq!(sent[1].body.code, "print('')\n\nNone\n");

    // The newer answer arrives first; the older one must not overwrite it
    let newer = AnalysisResponse::from_json(r#"{"status":"success","total":"O(1)","lines":[]}"#).unwrap();
    let older = AnalysisResponse::from_json(r#"{"status":"success","total":"O(n)","lines":[]}"#).unwrap();
    assert!(board.borrow_mut().complete_analysis(sent[1].sequence, Ok(newer)));
    assert!(!board.borrow_mut().complete_analysis(sent[0].sequence, Ok(older)));

    let board = board.borrow();
    assert_eq!(board.analysis_status(), CollaboratorStatus::Ready);
    assert_eq!(board.total(), "O(1)");
}

#[test]
fn test_unreachable_service_reports_offline() {
    init_tracing();
    let outbox = Outbox::default();
    let board = Rc::new(RefCell::new(ResultBoard::new()));
    let mut graph = ProgramGraph::new();
    let _driver = RegenerationDriver::attach(
        &mut graph,
        CodegenOptions::default(),
        CollaboratorDispatcher::new(outbox.clone(), board.clone()),
    );

    graph.add_block(BlockKind::TextPrint).unwrap();
    let request = outbox.0.borrow()[0].clone();
    board.borrow_mut().complete_analysis(
        request.sequence,
        Err(CollaboratorError::Unreachable("connection refused".into())),
    );

    assert_eq!(board.borrow().total(), "Offline");
    assert_eq!(board.borrow().analysis_status().to_string(), "Offline");
}
