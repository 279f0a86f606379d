//! # Regeneration Driver
//!
//! Keeps generated source in step with the graph. After every structural
//! change the driver runs one full generation pass and one snapshot, numbers
//! the pair and hands it to a [`GenerationSink`].

use crate::codegen::CodegenOptions;
use crate::compiler::compile_graph_with_options;
use crate::graph::{ProgramGraph, SubscriptionId};
use crate::serialization::{snapshot, PersistedForm};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Output of one generation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Strictly increasing pass number, starting at 1
    pub sequence: u64,
    pub snapshot: PersistedForm,
    pub source: String,
}

/// Consumer of generation passes
pub trait GenerationSink {
    fn accept(&mut self, generation: Generation);
}

impl<F> GenerationSink for F
where
    F: FnMut(Generation),
{
    fn accept(&mut self, generation: Generation) {
        self(generation)
    }
}

type Pass = Rc<RefCell<dyn FnMut(&ProgramGraph)>>;

/// Subscription that regenerates on every graph change
pub struct RegenerationDriver {
    subscription: SubscriptionId,
    sequence: Rc<Cell<u64>>,
    pass: Pass,
}

impl RegenerationDriver {
    /// Subscribes to `graph`; `sink` receives one [`Generation`] per change
    pub fn attach(
        graph: &mut ProgramGraph,
        options: CodegenOptions,
        sink: impl GenerationSink + 'static,
    ) -> Self {
        let sequence = Rc::new(Cell::new(0));
        let counter = sequence.clone();
        let mut sink = sink;

        let pass: Pass = Rc::new(RefCell::new(move |graph: &ProgramGraph| {
            let number = counter.get() + 1;
            counter.set(number);
            tracing::debug!("[DRIVER] Generation pass {}", number);

            let source = compile_graph_with_options(graph, &options);
            let snapshot = snapshot(graph);
            sink.accept(Generation {
                sequence: number,
                snapshot,
                source,
            });
        }));

        let observer = pass.clone();
        let subscription = graph.subscribe(move |graph| {
            // A sink that mutates the graph would re-enter; the pass is skipped
            match observer.try_borrow_mut() {
                Ok(mut run) => (&mut *run)(graph),
                Err(_) => tracing::warn!("[DRIVER] Re-entrant change ignored"),
            }
        });
        tracing::info!("[DRIVER] Attached regeneration driver");

        Self {
            subscription,
            sequence,
            pass,
        }
    }

    /// Runs a pass without a change, e.g. to render the initial graph
    pub fn regenerate(&self, graph: &ProgramGraph) {
        match self.pass.try_borrow_mut() {
            Ok(mut run) => (&mut *run)(graph),
            Err(_) => tracing::warn!("[DRIVER] Pass already running"),
        }
    }

    /// Number of the most recent pass, 0 before the first
    pub fn sequence(&self) -> u64 {
        self.sequence.get()
    }

    /// Stops regenerating
    pub fn detach(self, graph: &mut ProgramGraph) -> bool {
        tracing::info!("[DRIVER] Detached after {} passes", self.sequence.get());
        graph.unsubscribe(self.subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BlockKind;

    #[test]
    fn test_each_change_produces_numbered_generation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut graph = ProgramGraph::new();
        let driver = RegenerationDriver::attach(&mut graph, CodegenOptions::default(), move |g: Generation| {
            sink.borrow_mut().push(g)
        });

        graph.add_block(BlockKind::TextPrint).unwrap();
        graph.add_block(BlockKind::LogicNull).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].sequence, 1);
        assert_eq!(seen[1].sequence, 2);
        assert_eq!(seen[1].source, "print('')\n\nNone\n");
        assert_eq!(driver.sequence(), 2);
    }

    #[test]
    fn test_regenerate_and_detach() {
        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        let mut graph = ProgramGraph::new();
        let driver = RegenerationDriver::attach(&mut graph, CodegenOptions::default(), move |_: Generation| {
            sink.set(sink.get() + 1)
        });

        driver.regenerate(&graph);
        assert_eq!(count.get(), 1);

        assert!(driver.detach(&mut graph));
        graph.add_block(BlockKind::TextPrint).unwrap();
        assert_eq!(count.get(), 1);
    }
}
