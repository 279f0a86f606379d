//! # Collaborator Contract
//!
//! Message types for the remote analysis and execution service, and the
//! bookkeeping that keeps its answers in step with generation passes.
//!
//! The core performs no I/O. A [`CollaboratorDispatcher`] turns each
//! [`Generation`] into a [`CollaboratorRequest`] and hands it to a
//! [`Collaborator`] transport implemented by the host. Responses are fed back
//! into the shared [`ResultBoard`], which only accepts the answer for the
//! latest request of each endpoint.

use crate::driver::{Generation, GenerationSink};
use crate::error::CollaboratorError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Request body for both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

/// Complexity annotation for one source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisLine {
    #[serde(rename = "lineOfCode")]
    pub line_of_code: String,
    pub complexity: String,
    #[serde(default, alias = "indentLevel")]
    pub indent: u32,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub lines: Vec<AnalysisLine>,
}

impl AnalysisResponse {
    pub fn from_json(json: &str) -> Result<Self, CollaboratorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub status: String,
    #[serde(default)]
    pub output: String,
}

impl ExecutionResponse {
    pub fn from_json(json: &str) -> Result<Self, CollaboratorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Analyze,
    Run,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Analyze => "/analyze",
            Endpoint::Run => "/run",
        }
    }
}

/// A request waiting to be sent by the host transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorRequest {
    pub sequence: u64,
    pub endpoint: Endpoint,
    pub body: CodeRequest,
}

impl CollaboratorRequest {
    /// JSON body to POST to [`Endpoint::path`]
    pub fn to_json(&self) -> Result<String, CollaboratorError> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

/// Host-side transport. Implementations deliver the outcome back through
/// [`ResultBoard::complete_analysis`] or [`ResultBoard::complete_run`].
pub trait Collaborator {
    fn send(&mut self, request: CollaboratorRequest);
}

/// User-visible state of one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorStatus {
    Idle,
    Pending,
    Ready,
    Offline,
    CodeError,
}

impl CollaboratorStatus {
    pub fn label(self) -> &'static str {
        match self {
            CollaboratorStatus::Idle => "Idle",
            CollaboratorStatus::Pending => "Pending",
            CollaboratorStatus::Ready => "Ready",
            CollaboratorStatus::Offline => "Offline",
            CollaboratorStatus::CodeError => "Code Error",
        }
    }
}

impl fmt::Display for CollaboratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Latest accepted analysis and execution results
#[derive(Debug, Clone)]
pub struct ResultBoard {
    next_sequence: u64,
    latest_analysis: Option<u64>,
    latest_run: Option<u64>,
    analysis_status: CollaboratorStatus,
    run_status: CollaboratorStatus,
    analysis: Option<AnalysisResponse>,
    output: Option<String>,
}

impl Default for ResultBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultBoard {
    pub fn new() -> Self {
        Self {
            next_sequence: 0,
            latest_analysis: None,
            latest_run: None,
            analysis_status: CollaboratorStatus::Idle,
            run_status: CollaboratorStatus::Idle,
            analysis: None,
            output: None,
        }
    }

    /// Records a new outstanding request. Any earlier request to the same
    /// endpoint becomes stale.
    ///
    /// Sequences from the driver are used as-is; they must not go backwards.
    pub fn issue(&mut self, endpoint: Endpoint, code: &str, sequence: u64) -> CollaboratorRequest {
        self.next_sequence = self.next_sequence.max(sequence);
        match endpoint {
            Endpoint::Analyze => {
                self.latest_analysis = Some(sequence);
                self.analysis_status = CollaboratorStatus::Pending;
            }
            Endpoint::Run => {
                self.latest_run = Some(sequence);
                self.run_status = CollaboratorStatus::Pending;
            }
        }
        tracing::debug!("[COLLAB] Issued {} #{}", endpoint.path(), sequence);
        CollaboratorRequest {
            sequence,
            endpoint,
            body: CodeRequest {
                code: code.to_string(),
            },
        }
    }

    /// Issues a run request numbered after everything issued so far
    pub fn issue_run(&mut self, code: &str) -> CollaboratorRequest {
        let sequence = self.next_sequence + 1;
        self.issue(Endpoint::Run, code, sequence)
    }

    /// Applies an analysis outcome. Returns false when the response is stale
    /// and was dropped.
    pub fn complete_analysis(
        &mut self,
        sequence: u64,
        outcome: Result<AnalysisResponse, CollaboratorError>,
    ) -> bool {
        if self.latest_analysis != Some(sequence) {
            tracing::debug!("[COLLAB] Dropped stale analysis #{}", sequence);
            return false;
        }
        match outcome {
            Ok(response) if response.is_success() => {
                self.analysis_status = CollaboratorStatus::Ready;
                self.analysis = Some(response);
            }
            Ok(_) => {
                // Last good analysis stays on display
                self.analysis_status = CollaboratorStatus::CodeError;
            }
            Err(e) => {
                tracing::warn!("[COLLAB] Analysis #{} failed: {}", sequence, e);
                self.analysis_status = status_for(&e);
                if self.analysis_status == CollaboratorStatus::Offline {
                    self.analysis = None;
                }
            }
        }
        true
    }

    /// Applies an execution outcome. Returns false when the response is stale
    /// and was dropped.
    pub fn complete_run(
        &mut self,
        sequence: u64,
        outcome: Result<ExecutionResponse, CollaboratorError>,
    ) -> bool {
        if self.latest_run != Some(sequence) {
            tracing::debug!("[COLLAB] Dropped stale run #{}", sequence);
            return false;
        }
        match outcome {
            Ok(response) if response.is_success() => {
                self.run_status = CollaboratorStatus::Ready;
                self.output = Some(response.output);
            }
            Ok(response) => {
                self.run_status = CollaboratorStatus::CodeError;
                self.output = Some(response.output);
            }
            Err(e) => {
                tracing::warn!("[COLLAB] Run #{} failed: {}", sequence, e);
                self.run_status = status_for(&e);
            }
        }
        true
    }

    pub fn analysis_status(&self) -> CollaboratorStatus {
        self.analysis_status
    }

    pub fn run_status(&self) -> CollaboratorStatus {
        self.run_status
    }

    pub fn analysis(&self) -> Option<&AnalysisResponse> {
        self.analysis.as_ref()
    }

    /// Headline complexity, or the status label when no analysis is usable
    pub fn total(&self) -> &str {
        match (self.analysis_status, &self.analysis) {
            (CollaboratorStatus::Offline, _) | (_, None) => self.analysis_status.label(),
            (_, Some(analysis)) => analysis.total.as_str(),
        }
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

fn status_for(error: &CollaboratorError) -> CollaboratorStatus {
    match error {
        CollaboratorError::Unreachable(_) => CollaboratorStatus::Offline,
        CollaboratorError::Failed(_) | CollaboratorError::Malformed(_) => CollaboratorStatus::CodeError,
    }
}

/// Sends an analysis request for every generation pass
pub struct CollaboratorDispatcher<C: Collaborator> {
    transport: C,
    board: Rc<RefCell<ResultBoard>>,
}

impl<C: Collaborator> CollaboratorDispatcher<C> {
    pub fn new(transport: C, board: Rc<RefCell<ResultBoard>>) -> Self {
        Self { transport, board }
    }

    pub fn board(&self) -> Rc<RefCell<ResultBoard>> {
        self.board.clone()
    }
}

impl<C: Collaborator> GenerationSink for CollaboratorDispatcher<C> {
    fn accept(&mut self, generation: Generation) {
        let request = self
            .board
            .borrow_mut()
            .issue(Endpoint::Analyze, &generation.source, generation.sequence);
        self.transport.send(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(total: &str) -> AnalysisResponse {
        AnalysisResponse {
            status: "success".to_string(),
            total: total.to_string(),
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_stale_analysis_is_dropped() {
        let mut board = ResultBoard::new();
        board.issue(Endpoint::Analyze, "x = 1\n", 1);
        board.issue(Endpoint::Analyze, "x = 2\n", 2);

        assert!(board.complete_analysis(2, Ok(success("O(n)"))));
        assert!(!board.complete_analysis(1, Ok(success("O(1)"))));
        assert_eq!(board.total(), "O(n)");
        assert_eq!(board.analysis_status(), CollaboratorStatus::Ready);
    }

    #[test]
    fn test_unreachable_reports_offline() {
        let mut board = ResultBoard::new();
        board.issue(Endpoint::Analyze, "pass\n", 1);
        board.complete_analysis(1, Err(CollaboratorError::Unreachable("refused".into())));

        assert_eq!(board.analysis_status(), CollaboratorStatus::Offline);
        assert_eq!(board.total(), "Offline");
        assert!(board.analysis().is_none());
    }

    #[test]
    fn test_code_error_keeps_last_good_analysis() {
        let mut board = ResultBoard::new();
        board.issue(Endpoint::Analyze, "pass\n", 1);
        board.complete_analysis(1, Ok(success("O(n^2)")));
        board.issue(Endpoint::Analyze, "for\n", 2);

        let failed = AnalysisResponse::from_json(r#"{"status":"error","total":"Error","lines":[]}"#).unwrap();
        board.complete_analysis(2, Ok(failed));

        assert_eq!(board.analysis_status().label(), "Code Error");
        assert_eq!(board.total(), "O(n^2)");
    }

    #[test]
    fn test_analysis_response_parses_wire_shape() {
        let json = r##"{"status":"success","total":"O(n)","lines":[
            {"lineOfCode":"for i in range(5):","complexity":"O(n)","indent":0,"color":"#e67e22","extra":1}
        ]}"##;
        let response = AnalysisResponse::from_json(json).unwrap();
        assert!(response.is_success());
        assert_eq!(response.lines[0].line_of_code, "for i in range(5):");
        assert_eq!(response.lines[0].color, "#e67e22");

        assert!(matches!(
            AnalysisResponse::from_json("not json"),
            Err(CollaboratorError::Malformed(_))
        ));
    }

    #[test]
    fn test_run_requests_follow_analysis_sequence() {
        let mut board = ResultBoard::new();
        board.issue(Endpoint::Analyze, "print(1)\n", 4);
        let run = board.issue_run("print(1)\n");
        assert_eq!(run.sequence, 5);
        assert_eq!(run.endpoint.path(), "/run");
        assert_eq!(run.to_json().unwrap(), r#"{"code":"print(1)\n"}"#);

        let response = ExecutionResponse::from_json(r#"{"status":"success","output":"1\n"}"#).unwrap();
        assert!(board.complete_run(5, Ok(response)));
        assert_eq!(board.output(), Some("1\n"));
        assert_eq!(board.run_status(), CollaboratorStatus::Ready);
    }

    #[test]
    fn test_dispatcher_issues_one_request_per_generation() {
        struct Recorder(Rc<RefCell<Vec<CollaboratorRequest>>>);
        impl Collaborator for Recorder {
            fn send(&mut self, request: CollaboratorRequest) {
                self.0.borrow_mut().push(request);
            }
        }

        let sent = Rc::new(RefCell::new(Vec::new()));
        let board = Rc::new(RefCell::new(ResultBoard::new()));
        let mut dispatcher = CollaboratorDispatcher::new(Recorder(sent.clone()), board.clone());

        for sequence in 1..=2 {
            dispatcher.accept(Generation {
                sequence,
                snapshot: Default::default(),
                source: "pass\n".to_string(),
            });
        }

        assert_eq!(sent.borrow().len(), 2);
        assert_eq!(sent.borrow()[1].sequence, 2);
        assert_eq!(board.borrow().analysis_status(), CollaboratorStatus::Pending);
        assert!(!board.borrow_mut().complete_analysis(1, Ok(success("O(1)"))));
    }
}
