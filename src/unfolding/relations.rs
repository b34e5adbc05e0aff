//! 行为关系：因果映射与并发 / 冲突缓存。
//!
//! 对任意两个节点，恰有 `causal`、`inverse-causal`、`concurrent`、`conflict`
//! 之一成立；节点与自身并发，绝不与自身冲突。CO/notCO 与 EX/notEX 四个缓存
//! 按读取记忆（memoize on read），插入总是双向的。
use std::cell::RefCell;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::unfolding::coset::Coset;
use crate::unfolding::node::{BpNode, Condition, ConditionId, Event, EventId};
use crate::net::index_vec::IndexVec;

type NodeSetMap = FxHashMap<BpNode, FxHashSet<BpNode>>;

#[derive(Default)]
struct RelationCache {
    co: NodeSetMap,
    not_co: NodeSetMap,
    ex: NodeSetMap,
    not_ex: NodeSetMap,
}

/// Causality map plus the four memoizing relation caches.
///
/// Queries take `&self` and mutate the caches through a `RefCell`; a fully
/// built prefix must therefore not be queried from several threads without
/// external synchronization.
pub(crate) struct RelationStore {
    /// Strict causal predecessors per node.
    ca: NodeSetMap,
    cache: RefCell<RelationCache>,
}

/// Symmetric insertion: both directions are indexed.
fn index(map: &mut NodeSetMap, n1: BpNode, n2: BpNode) {
    map.entry(n1).or_default().insert(n2);
    map.entry(n2).or_default().insert(n1);
}

fn contains(map: &NodeSetMap, n1: BpNode, n2: BpNode) -> bool {
    map.get(&n1).is_some_and(|set| set.contains(&n2))
}

impl RelationStore {
    pub fn new() -> Self {
        Self {
            ca: FxHashMap::default(),
            cache: RefCell::new(RelationCache::default()),
        }
    }

    /// 新增条件时维护因果映射：preds(c) = preds(e) ∪ {e}。
    pub fn record_condition(&mut self, condition: ConditionId, pre_event: Option<EventId>) {
        let mut preds = FxHashSet::default();
        if let Some(event) = pre_event {
            if let Some(event_preds) = self.ca.get(&BpNode::Event(event)) {
                preds.extend(event_preds.iter().copied());
            }
            preds.insert(BpNode::Event(event));
        }
        self.ca.insert(BpNode::Condition(condition), preds);
    }

    /// 新增事件时维护因果映射：preds(e) = ⋃ preds(c) ∪ pre-conditions(e)。
    pub fn record_event(&mut self, event: EventId, preset: &Coset) {
        let mut preds = FxHashSet::default();
        for condition in preset.iter() {
            if let Some(cond_preds) = self.ca.get(&BpNode::Condition(condition)) {
                preds.extend(cond_preds.iter().copied());
            }
            preds.insert(BpNode::Condition(condition));
        }
        self.ca.insert(BpNode::Event(event), preds);
    }

    pub fn predecessors(&self, node: BpNode) -> Option<&FxHashSet<BpNode>> {
        self.ca.get(&node)
    }

    /// 割纳入时的主动播种：割内条件两两并发；它们的前事件在无因果关系时
    /// 亦并发；条件与他者前事件在无因果关系时亦并发。
    pub fn seed_cut(&mut self, cut: &Coset, conditions: &IndexVec<ConditionId, Condition>) {
        let Self { ca, cache } = self;
        let cache = cache.get_mut();
        for c1 in cut.iter() {
            let e1 = conditions[c1].pre_event;
            for c2 in cut.iter() {
                index(&mut cache.co, BpNode::Condition(c1), BpNode::Condition(c2));

                let e2 = conditions[c2].pre_event;
                if let (Some(e1), Some(e2)) = (e1, e2) {
                    if !contains(ca, BpNode::Event(e2), BpNode::Event(e1))
                        && !contains(ca, BpNode::Event(e1), BpNode::Event(e2))
                    {
                        index(&mut cache.co, BpNode::Event(e1), BpNode::Event(e2));
                    }
                }
                if c1 != c2 {
                    if let Some(e1) = e1 {
                        if !contains(ca, BpNode::Condition(c2), BpNode::Event(e1))
                            && !contains(ca, BpNode::Event(e1), BpNode::Condition(c2))
                        {
                            index(&mut cache.co, BpNode::Condition(c2), BpNode::Event(e1));
                        }
                    }
                }
            }
        }
    }

    /// `n1 < n2`？已记录的节点直接查因果映射，未记录的按前集现场重算。
    pub fn are_causal(
        &self,
        conditions: &IndexVec<ConditionId, Condition>,
        events: &IndexVec<EventId, Event>,
        n1: BpNode,
        n2: BpNode,
    ) -> bool {
        if let Some(preds) = self.ca.get(&n2) {
            return preds.contains(&n1);
        }
        match n2 {
            BpNode::Event(e) => {
                let preset = &events[e].pre_conditions;
                if let BpNode::Condition(c) = n1 {
                    if preset.contains(c) {
                        return true;
                    }
                }
                preset
                    .iter()
                    .any(|c| contains(&self.ca, BpNode::Condition(c), n1))
            }
            BpNode::Condition(c) => match conditions[c].pre_event {
                Some(pre) => {
                    BpNode::Event(pre) == n1 || contains(&self.ca, BpNode::Event(pre), n1)
                }
                None => false,
            },
        }
    }

    pub fn are_concurrent(
        &self,
        conditions: &IndexVec<ConditionId, Condition>,
        events: &IndexVec<EventId, Event>,
        n1: BpNode,
        n2: BpNode,
    ) -> bool {
        {
            let cache = self.cache.borrow();
            if contains(&cache.co, n1, n2) {
                return true;
            }
            if contains(&cache.not_co, n1, n2) {
                return false;
            }
        }

        let result = !self.are_causal(conditions, events, n1, n2)
            && !self.are_causal(conditions, events, n2, n1)
            && !self.are_in_conflict(events, n1, n2);

        let mut cache = self.cache.borrow_mut();
        if result {
            index(&mut cache.co, n1, n2);
        } else {
            index(&mut cache.not_co, n1, n2);
        }
        result
    }

    /// 冲突成立当且仅当两个节点的事件前驱（含自身）中存在前集相交的
    /// 不同事件对。
    pub fn are_in_conflict(
        &self,
        events: &IndexVec<EventId, Event>,
        n1: BpNode,
        n2: BpNode,
    ) -> bool {
        {
            let cache = self.cache.borrow();
            if contains(&cache.ex, n1, n2) {
                return true;
            }
            if contains(&cache.not_ex, n1, n2) {
                return false;
            }
        }

        if n1 == n2 {
            index(&mut self.cache.borrow_mut().not_ex, n1, n2);
            return false;
        }

        let h1 = self.event_ancestry(n1);
        let h2 = self.event_ancestry(n2);
        for &e1 in &h1 {
            for &e2 in &h2 {
                if e1 == e2 {
                    continue;
                }
                if events[e1]
                    .pre_conditions
                    .overlaps(&events[e2].pre_conditions)
                {
                    index(&mut self.cache.borrow_mut().ex, n1, n2);
                    return true;
                }
            }
        }

        index(&mut self.cache.borrow_mut().not_ex, n1, n2);
        false
    }

    /// Event predecessors of a node, including the node itself when it is an
    /// event.
    fn event_ancestry(&self, node: BpNode) -> Vec<EventId> {
        let mut result: Vec<EventId> = self
            .ca
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|pred| pred.as_event())
            .collect();
        if let BpNode::Event(e) = node {
            result.push(e);
        }
        result
    }
}
