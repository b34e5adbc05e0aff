//! 发生网视图：前缀到无环 Petri 网的只读投影，带截断标注与 DOT 输出。
use std::fmt::Write as _;

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::unfolding::engine::{OrderingRelation, Unfolding};
use crate::unfolding::node::{BpNode, ConditionId, EventId};

/// Node payload of the projected occurrence net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccNode {
    /// One place per condition, labelled by the originating place.
    Place {
        label: String,
        condition: ConditionId,
    },
    /// One transition per event, labelled by the originating transition.
    Transition { label: String, event: EventId },
}

impl OccNode {
    pub fn label(&self) -> &str {
        match self {
            OccNode::Place { label, .. } | OccNode::Transition { label, .. } => label,
        }
    }
}

/// Read-only projection of a prefix as an acyclic Petri net.
///
/// Holds bidirectional maps between prefix nodes and graph nodes; the
/// underlying prefix must outlive the view.
pub struct OccurrenceNet<'u, 'n> {
    unfolding: &'u Unfolding<'n>,
    graph: DiGraph<OccNode, ()>,
    c2n: FxHashMap<ConditionId, NodeIndex>,
    e2n: FxHashMap<EventId, NodeIndex>,
}

impl<'u, 'n> OccurrenceNet<'u, 'n> {
    pub(crate) fn new(unfolding: &'u Unfolding<'n>) -> Self {
        let mut graph = DiGraph::new();
        let mut c2n = FxHashMap::default();
        let mut e2n = FxHashMap::default();

        for event in unfolding.events() {
            let transition = unfolding.event(event).transition;
            let label = unfolding.net().transition(transition).name.clone();
            let node = graph.add_node(OccNode::Transition { label, event });
            e2n.insert(event, node);
        }
        for condition in unfolding.conditions() {
            let place = unfolding.condition(condition).place;
            let label = unfolding.net().place(place).name.clone();
            let node = graph.add_node(OccNode::Place { label, condition });
            c2n.insert(condition, node);
        }

        // flow: pre-condition -> event -> post-condition
        for event in unfolding.events() {
            for condition in unfolding.event(event).pre_conditions.iter() {
                graph.add_edge(c2n[&condition], e2n[&event], ());
            }
        }
        for condition in unfolding.conditions() {
            if let Some(event) = unfolding.condition(condition).pre_event {
                graph.add_edge(e2n[&event], c2n[&condition], ());
            }
        }

        Self {
            unfolding,
            graph,
            c2n,
            e2n,
        }
    }

    pub fn unfolding(&self) -> &'u Unfolding<'n> {
        self.unfolding
    }

    pub fn graph(&self) -> &DiGraph<OccNode, ()> {
        &self.graph
    }

    pub fn node_of_condition(&self, condition: ConditionId) -> NodeIndex {
        self.c2n[&condition]
    }

    pub fn node_of_event(&self, event: EventId) -> NodeIndex {
        self.e2n[&event]
    }

    pub fn condition_of_node(&self, node: NodeIndex) -> Option<ConditionId> {
        match self.graph.node_weight(node)? {
            OccNode::Place { condition, .. } => Some(*condition),
            OccNode::Transition { .. } => None,
        }
    }

    pub fn event_of_node(&self, node: NodeIndex) -> Option<EventId> {
        match self.graph.node_weight(node)? {
            OccNode::Transition { event, .. } => Some(*event),
            OccNode::Place { .. } => None,
        }
    }

    fn bp_node(&self, node: NodeIndex) -> Option<BpNode> {
        match self.graph.node_weight(node)? {
            OccNode::Place { condition, .. } => Some(BpNode::Condition(*condition)),
            OccNode::Transition { event, .. } => Some(BpNode::Event(*event)),
        }
    }

    /// Relation between two view nodes; `None` for nodes foreign to the view.
    pub fn ordering_relation(
        &self,
        n1: NodeIndex,
        n2: NodeIndex,
    ) -> Option<OrderingRelation> {
        let bp1 = self.bp_node(n1)?;
        let bp2 = self.bp_node(n2)?;
        Some(self.unfolding.ordering_relation(bp1, bp2))
    }

    pub fn is_cutoff(&self, node: NodeIndex) -> bool {
        self.event_of_node(node)
            .is_some_and(|event| self.unfolding.is_cutoff(event))
    }

    pub fn cutoff_nodes(&self) -> Vec<NodeIndex> {
        self.unfolding
            .cutoff_events()
            .map(|event| self.e2n[&event])
            .collect()
    }

    /// View-level corresponding transition of a cutoff transition.
    pub fn corresponding_event(&self, node: NodeIndex) -> Option<NodeIndex> {
        let event = self.event_of_node(node)?;
        let corresponding = self.unfolding.corresponding_event(event)?;
        Some(self.e2n[&corresponding])
    }

    /// DOT 渲染：条件为圆、事件为方，截断事件橙色填充，并以橙色边指向
    /// 其对应事件。
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph G {{");
        let _ = writeln!(
            &mut dot,
            "graph [fontname=\"Helvetica\" fontsize=10 nodesep=0.35 ranksep=\"0.25 equally\"];"
        );
        let _ = writeln!(
            &mut dot,
            "node [fontname=\"Helvetica\" fontsize=10 fixedsize style=filled penwidth=\"2\"];"
        );
        let _ = writeln!(
            &mut dot,
            "edge [fontname=\"Helvetica\" fontsize=10 arrowhead=normal color=black];"
        );
        let _ = writeln!(&mut dot);
        let _ = writeln!(&mut dot, "node [shape=circle];");

        for node in self.graph.node_indices() {
            if let OccNode::Place { label, .. } = &self.graph[node] {
                let _ = writeln!(
                    &mut dot,
                    "\tn{}[label=\"{}\" width=\".3\" height=\".3\" fillcolor=white];",
                    node.index(),
                    label
                );
            }
        }

        let _ = writeln!(&mut dot);
        let _ = writeln!(&mut dot, "node [shape=box];");

        for node in self.graph.node_indices() {
            if let OccNode::Transition { label, .. } = &self.graph[node] {
                let fillcolor = if self.is_cutoff(node) { "orange" } else { "white" };
                let _ = writeln!(
                    &mut dot,
                    "\tn{}[label=\"{}\" width=\".3\" height=\".3\" fillcolor={}];",
                    node.index(),
                    label,
                    fillcolor
                );
            }
        }

        let _ = writeln!(&mut dot);
        for edge in self.graph.edge_indices() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                let _ = writeln!(&mut dot, "\tn{}->n{};", source.index(), target.index());
            }
        }

        let _ = writeln!(
            &mut dot,
            "\tedge [fontname=\"Helvetica\" fontsize=8 arrowhead=normal color=orange style=dashed];"
        );
        for cutoff in self.cutoff_nodes() {
            if let Some(corresponding) = self.corresponding_event(cutoff) {
                let _ = writeln!(
                    &mut dot,
                    "\tn{}->n{};",
                    cutoff.index(),
                    corresponding.index()
                );
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }
}
