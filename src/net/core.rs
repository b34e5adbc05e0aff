//! 运行时: 网系统查询接口、发生语义与可达图构造。
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::net::ids::{Idx, PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::IndexVec;
use crate::net::structure::{Marking, Place, Transition, Weight};

#[derive(Debug, Error)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {0:?} is not enabled under the supplied marking")]
    NotEnabled(TransitionId),
}

#[derive(Debug, Clone)]
pub struct ReachabilityEdge {
    pub source: usize,
    pub transition: TransitionId,
    pub target: usize,
}

/// 可达图：标识为节点，发射为边；`truncated` 表示按状态上限截断。
#[derive(Debug, Clone)]
pub struct ReachabilityGraph {
    pub markings: Vec<Marking>,
    pub edges: Vec<ReachabilityEdge>,
    pub deadlocks: Vec<usize>,
    pub truncated: bool,
}

impl ReachabilityGraph {
    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.iter().any(|known| known == marking)
    }
}

/// 网系统：库所、迁移与 `Pre`/`Post` 关联矩阵，初始标识由库所 token 给出。
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Net {
    pub places: IndexVec<PlaceId, Place>,
    pub transitions: IndexVec<TransitionId, Transition>,
    pub pre: Incidence<u64>,
    pub post: Incidence<u64>,
}

impl Net {
    pub fn empty() -> Self {
        Self {
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            pre: Incidence::new(0, 0, 0u64),
            post: Incidence::new(0, 0, 0u64),
        }
    }

    pub fn add_place(&mut self, place: Place) -> PlaceId {
        let place_id = self.places.push(place);
        self.pre.push_place_with_default(0);
        self.post.push_place_with_default(0);
        place_id
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        let transition_id = self.transitions.push(transition);
        self.pre.push_transition_with_default(0);
        self.post.push_transition_with_default(0);
        transition_id
    }

    pub fn set_input_weight(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.pre.set(place, transition, weight);
    }

    pub fn set_output_weight(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.post.set(place, transition, weight);
    }

    pub fn add_input_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        if weight > 0 {
            *self.pre.get_mut(place, transition) += weight;
        }
    }

    pub fn add_output_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        if weight > 0 {
            *self.post.get_mut(place, transition) += weight;
        }
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn place_ids(&self) -> impl Iterator<Item = PlaceId> {
        self.places.indices()
    }

    pub fn transition_ids(&self) -> impl Iterator<Item = TransitionId> {
        self.transitions.indices()
    }

    pub fn place(&self, place: PlaceId) -> &Place {
        &self.places[place]
    }

    pub fn transition(&self, transition: TransitionId) -> &Transition {
        &self.transitions[transition]
    }

    pub fn initial_marking(&self) -> Marking {
        let tokens: Vec<Weight> = self.places.iter().map(|place| place.tokens).collect();
        Marking(tokens.into())
    }

    pub fn incidence(&self) -> (&Incidence<u64>, &Incidence<u64>) {
        (&self.pre, &self.post)
    }

    /// 迁移的前集：与其存在输入弧的库所，按 id 升序。
    pub fn preset(&self, transition: TransitionId) -> SmallVec<[PlaceId; 4]> {
        self.pre
            .rows()
            .iter_enumerated()
            .filter(|(_, row)| row[transition.index()] > 0)
            .map(|(place, _)| place)
            .collect()
    }

    /// 迁移的后集：与其存在输出弧的库所，按 id 升序。
    pub fn postset(&self, transition: TransitionId) -> SmallVec<[PlaceId; 4]> {
        self.post
            .rows()
            .iter_enumerated()
            .filter(|(_, row)| row[transition.index()] > 0)
            .map(|(place, _)| place)
            .collect()
    }

    /// Transitions whose preset meets any of the given places, ascending.
    pub fn postset_transitions(&self, places: &[PlaceId]) -> Vec<TransitionId> {
        self.transition_ids()
            .filter(|t| places.iter().any(|p| *self.pre.get(*p, *t) > 0))
            .collect()
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transition_ids()
            .filter(|t| self.enables(marking, *t))
            .collect()
    }

    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, FireError> {
        if transition.index() >= self.transitions_len() {
            Err(FireError::OutOfBounds(transition))
        } else if !self.enables(marking, transition) {
            Err(FireError::NotEnabled(transition))
        } else {
            Ok(self.successor(marking, transition))
        }
    }

    /// 深度优先展开标识空间；`limit` 为状态数上限，超出即截断。
    pub fn reachability_graph(&self, limit: Option<usize>) -> ReachabilityGraph {
        let cap = limit.unwrap_or(usize::MAX);
        let mut graph = ReachabilityGraph {
            markings: vec![self.initial_marking()],
            edges: Vec::new(),
            deadlocks: Vec::new(),
            truncated: false,
        };
        let mut known: FxHashMap<Marking, usize> = FxHashMap::default();
        known.insert(self.initial_marking(), 0);
        let mut worklist = vec![0usize];

        while let Some(state) = worklist.pop() {
            let marking = graph.markings[state].clone();
            let mut dead = true;
            for transition in self.transition_ids() {
                if !self.enables(&marking, transition) {
                    continue;
                }
                dead = false;
                let next = self.successor(&marking, transition);
                let target = if let Some(&idx) = known.get(&next) {
                    idx
                } else if graph.markings.len() >= cap {
                    graph.truncated = true;
                    continue;
                } else {
                    let idx = graph.markings.len();
                    known.insert(next.clone(), idx);
                    graph.markings.push(next);
                    worklist.push(idx);
                    idx
                };
                graph.edges.push(ReachabilityEdge {
                    source: state,
                    transition,
                    target,
                });
            }
            if dead {
                graph.deadlocks.push(state);
            }
        }
        graph
    }

    fn enables(&self, marking: &Marking, transition: TransitionId) -> bool {
        transition.index() < self.transitions_len()
            && self
                .place_ids()
                .all(|place| marking.tokens(place) >= *self.pre.get(place, transition))
    }

    /// Marking after firing; caller guarantees enablement.
    fn successor(&self, marking: &Marking, transition: TransitionId) -> Marking {
        let mut next = marking.clone();
        for place in self.place_ids() {
            let tokens = next.tokens_mut(place);
            *tokens = *tokens - *self.pre.get(place, transition)
                + *self.post.get(place, transition);
        }
        next
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_place_and_transition_updates_incidence() {
        let mut net = Net::empty();
        let p = net.add_place(Place::with_tokens("p", 1));
        let t = net.add_transition(Transition::new("t"));

        net.set_input_weight(p, t, 1);
        net.set_output_weight(p, t, 1);

        assert_eq!(net.places_len(), 1);
        assert_eq!(net.transitions_len(), 1);
        assert_eq!(*net.pre.get(p, t), 1);
        assert_eq!(*net.post.get(p, t), 1);
    }

    #[test]
    fn preset_postset_queries() {
        let mut net = Net::empty();
        let a = net.add_place(Place::with_tokens("a", 1));
        let b = net.add_place(Place::new("b"));
        let t = net.add_transition(Transition::new("t"));

        net.set_input_weight(a, t, 1);
        net.set_output_weight(b, t, 1);

        assert_eq!(net.preset(t).to_vec(), vec![a]);
        assert_eq!(net.postset(t).to_vec(), vec![b]);
        assert_eq!(net.postset_transitions(&[a]), vec![t]);
        assert!(net.postset_transitions(&[b]).is_empty());
    }

    #[test]
    fn reachability_graph_builds_states() {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::with_tokens("p0", 1));
        let p1 = net.add_place(Place::new("p1"));
        let t0 = net.add_transition(Transition::new("t0"));

        net.set_input_weight(p0, t0, 1);
        net.set_output_weight(p1, t0, 1);

        let graph = net.reachability_graph(None);
        assert_eq!(graph.markings.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.deadlocks.len(), 1);
        assert!(!graph.truncated);
    }

    #[test]
    fn fire_requires_enablement() {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new("p0"));
        let t0 = net.add_transition(Transition::new("t0"));
        net.set_input_weight(p0, t0, 1);

        let marking = net.initial_marking();
        assert!(matches!(
            net.fire_transition(&marking, t0),
            Err(FireError::NotEnabled(_))
        ));
    }
}
