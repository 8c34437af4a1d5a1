use rdf_federation_common::DFResult;
use rdf_federation_logical::join_order::{GreedyJoinOrder, JoinOrderStrategy};
use rdf_federation_logical::plan::{OpRef, SourceFragment};
use rdf_federation_logical::{FragmentId, FragmentSet, JoinGraph};
use rdf_federation_model::{NamedNode, NamedNodePattern, TermPattern, TriplePattern, Variable};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn variable(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

pub fn triple(subject: &str, predicate: &str, object: &str) -> TriplePattern {
    TriplePattern {
        subject: TermPattern::Variable(variable(subject)),
        predicate: NamedNodePattern::NamedNode(NamedNode::new_unchecked(format!(
            "http://example.com/{predicate}"
        ))),
        object: TermPattern::Variable(variable(object)),
    }
}

/// Creates a fragment of `source` that binds all variables of `triples`.
pub fn fragment(source: &str, triples: &[TriplePattern]) -> OpRef {
    let fragment = SourceFragment::builder(source)
        .triples(triples.iter().cloned())
        .build()
        .unwrap();
    Arc::new(fragment.into())
}

/// Creates a fragment of `source` that can only be evaluated once `input` is bound.
pub fn lookup(source: &str, triple: TriplePattern, input: &str) -> OpRef {
    let fragment = SourceFragment::builder(source)
        .triple(triple)
        .required_input(variable(input))
        .build()
        .unwrap();
    Arc::new(fragment.into())
}

pub fn set_of(graph: &JoinGraph, ids: &[FragmentId]) -> FragmentSet {
    graph.universe().set_of(ids.iter().copied())
}

/// A [GreedyJoinOrder] that counts how often it has been asked for a plan.
#[derive(Debug, Default)]
pub struct CountingStrategy {
    inner: GreedyJoinOrder,
    calls: AtomicUsize,
}

impl CountingStrategy {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl JoinOrderStrategy for CountingStrategy {
    fn name(&self) -> &str {
        "counting"
    }

    fn plan(&self, graph: &JoinGraph, subset: &FragmentSet) -> DFResult<Option<OpRef>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.plan(graph, subset)
    }
}
