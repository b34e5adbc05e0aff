//! 完全有限前缀展开引擎。
//!
//! 两种构造变体：
//!
//! * 通用变体（Esparza/Römer/Vogler 的改进 McMillan 算法）：显式维护割集
//!   以支持多 token 库所，以 `c2cut` 索引枚举可能扩展；
//! * 安全网变体（Khomenko 的优化）：不枚举割，纳入事件后仅对受影响迁移
//!   按需通过并发关系递归覆盖其前集。
//!
//! 两者共享截断判定：事件 `e` 为截断当且仅当存在事件 `f` 使
//! `marking(lc(e)) = marking(lc(f))` 且 `lc(f)` 在适当序下严格更小。
use log::{debug, trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::net::core::Net;
use crate::net::ids::{Idx, PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::structure::{Marking, Weight};
use crate::unfolding::configuration::LocalConfiguration;
use crate::unfolding::coset::{Coset, Cut};
use crate::unfolding::node::{BpNode, Condition, ConditionId, CutId, Event, EventId};
use crate::unfolding::occurrence_net::OccurrenceNet;
use crate::unfolding::relations::RelationStore;
use crate::unfolding::setup::{Termination, UnfoldingSetup};

/// A possible extension: a transition whose preset is covered by a co-set of
/// existing conditions, not yet realized by an admitted event.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Candidate {
    pub transition: TransitionId,
    pub preset: Coset,
}

/// The four behavioral relations between prefix nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingRelation {
    Causal,
    InverseCausal,
    Concurrent,
    Conflict,
}

/// Complete finite prefix of the unfolding of a net system.
///
/// Owns every condition, event and cut for its lifetime; nodes are addressed
/// by arena ids and never removed. Relation queries memoize on read, so a
/// prefix must not be queried concurrently without external synchronization.
pub struct Unfolding<'n> {
    net: &'n Net,
    setup: UnfoldingSetup,

    conditions: IndexVec<ConditionId, Condition>,
    events: IndexVec<EventId, Event>,
    cuts: IndexVec<CutId, Cut>,

    // structural interning: (place, pre-event) and (transition, preset)
    cond_index: FxHashMap<(PlaceId, Option<EventId>), ConditionId>,
    event_index: FxHashMap<(TransitionId, Coset), EventId>,

    p2cs: FxHashMap<PlaceId, Vec<ConditionId>>,
    t2es: FxHashMap<TransitionId, Vec<EventId>>,
    c2cut: FxHashMap<ConditionId, Vec<CutId>>,

    relations: RelationStore,

    // derived per admitted event, assigned once at admission
    configurations: IndexVec<EventId, LocalConfiguration>,
    markings: IndexVec<EventId, Marking>,

    cutoff2corr: FxHashMap<EventId, EventId>,
    termination: Termination,
}

impl<'n> Unfolding<'n> {
    /// Construct the complete finite prefix of `net` under `setup`.
    ///
    /// Construction is infallible; the run outcome is reported by
    /// [`Unfolding::termination`].
    pub fn build(net: &'n Net, setup: UnfoldingSetup) -> Self {
        let mut unfolding = Self {
            net,
            setup,
            conditions: IndexVec::new(),
            events: IndexVec::new(),
            cuts: IndexVec::new(),
            cond_index: FxHashMap::default(),
            event_index: FxHashMap::default(),
            p2cs: FxHashMap::default(),
            t2es: FxHashMap::default(),
            c2cut: FxHashMap::default(),
            relations: RelationStore::new(),
            configurations: IndexVec::new(),
            markings: IndexVec::new(),
            cutoff2corr: FxHashMap::default(),
            termination: Termination::Complete,
        };

        if net.places_len() == 0
            || net.transitions_len() == 0
            || net.initial_marking().is_blank()
        {
            debug!("refusing to unfold: empty net or blank initial marking");
            unfolding.termination = Termination::InvalidInput;
            return unfolding;
        }

        if unfolding.setup.safe_optimization {
            unfolding.construct_safe();
        } else {
            unfolding.construct();
        }
        unfolding
    }

    /// 通用构造（Esparza/Römer/Vogler）。
    fn construct(&mut self) {
        if !self.admit_initial_cut() {
            return;
        }

        let mut pe = self.possible_extensions_a();
        while !pe.is_empty() {
            if self.events.len() >= self.setup.max_events {
                self.termination = Termination::EventLimitReached;
                return;
            }
            let idx = self.minimal_candidate(&pe);

            // 历史与截断事件相交的候选不再扩展前缀
            if self.history_hits_cutoff(&pe[idx]) {
                trace!("dropping candidate past a cutoff: {:?}", pe[idx]);
                pe.swap_remove(idx);
                continue;
            }

            let candidate = pe[idx].clone();
            let event = match self.add_event(&candidate) {
                Some(event) => event,
                None => return, // bound violated, termination already set
            };
            if let Some(corresponding) = self.check_cutoff(event) {
                debug!("cutoff {:?} corresponds to {:?}", event, corresponding);
                self.cutoff2corr.insert(event, corresponding);
            }

            pe = self.possible_extensions_a();
        }
    }

    /// 安全网构造（Khomenko）。
    fn construct_safe(&mut self) {
        if !self.admit_initial_cut() {
            return;
        }

        let mut pe = self.possible_extensions_a();
        let mut queued: FxHashSet<Candidate> = pe.iter().cloned().collect();
        while !pe.is_empty() {
            if self.events.len() >= self.setup.max_events {
                self.termination = Termination::EventLimitReached;
                return;
            }
            let idx = self.minimal_candidate(&pe);
            let candidate = pe.swap_remove(idx);
            queued.remove(&candidate);

            let event = self.add_event_safe(&candidate);
            if let Some(corresponding) = self.check_cutoff(event) {
                debug!("cutoff {:?} corresponds to {:?}", event, corresponding);
                self.cutoff2corr.insert(event, corresponding);
            } else {
                for candidate in self.update_possible_extensions(event) {
                    if queued.insert(candidate.clone()) {
                        pe.push(candidate);
                    }
                }
            }
        }
    }

    /// 为初始标识的每个 token 建立初始条件并纳入初始割。
    fn admit_initial_cut(&mut self) -> bool {
        let initial_marking = self.net.initial_marking();
        let mut initial = Cut::new();
        for (place, tokens) in initial_marking.iter() {
            for _ in 0..*tokens {
                // 结构同一性 (place, ∅) 使同库所的多个初始 token 坍缩为
                // 一个条件，与原始实现的集合语义一致
                let condition = self.add_condition(place, None);
                initial.insert(condition);
            }
        }
        self.add_cut(initial)
    }

    /*************************************************************************
     * Possible extensions
     *************************************************************************/

    /// 通用变体的可能扩展枚举：对每个迁移取其前集首库所，遍历包含该库所
    /// 的割，在割内寻找覆盖整个前集的共集。
    fn possible_extensions_a(&self) -> Vec<Candidate> {
        let mut result = Vec::new();
        let mut seen: FxHashSet<Candidate> = FxHashSet::default();

        for transition in self.net.transition_ids() {
            let preset = self.net.preset(transition);
            let Some(&first) = preset.first() else {
                // 无前集的迁移在任何标识下均可发射，展开对其无定义
                trace!("skipping source transition {:?}", transition);
                continue;
            };
            for cut in self.cuts_with_place(first) {
                let Some(coset) = self.coset_covering(cut, &preset) else {
                    continue;
                };
                if self
                    .event_index
                    .contains_key(&(transition, coset.clone()))
                {
                    continue;
                }
                let candidate = Candidate {
                    transition,
                    preset: coset,
                };
                if seen.insert(candidate.clone()) {
                    result.push(candidate);
                }
            }
        }

        for candidate in self
            .setup
            .hooks
            .extra_possible_extensions(self, &result)
        {
            if seen.insert(candidate.clone()) {
                result.push(candidate);
            }
        }
        result
    }

    /// 安全网变体：事件 `e` 纳入后，仅 `postsetTransitions(postset(t)) ∖
    /// postsetTransitions(preset(t) ∖ postset(t))` 中的迁移可能获得新的
    /// 使能；对每个这样的迁移递归覆盖其前集。
    fn update_possible_extensions(&self, event: EventId) -> Vec<Candidate> {
        let transition = self.events[event].transition;
        let postset = self.net.postset(transition);
        let mut affected = self.net.postset_transitions(&postset);
        let lost: Vec<PlaceId> = self
            .net
            .preset(transition)
            .into_iter()
            .filter(|place| !postset.contains(place))
            .collect();
        let lost_transitions: FxHashSet<TransitionId> =
            self.net.postset_transitions(&lost).into_iter().collect();
        affected.retain(|t| !lost_transitions.contains(t));

        let mut result = Vec::new();
        if affected.is_empty() {
            return result;
        }

        let concurrent = self.concurrent_conditions(event);
        for t in affected {
            let pre_t = self.net.preset(t);
            let mut preset = Coset::new();
            for condition in self.events[event].post_conditions.iter() {
                if pre_t.contains(&self.conditions[condition].place) {
                    preset.insert(condition);
                }
            }
            self.cover(&concurrent, t, &pre_t, preset, &mut result);
        }
        result
    }

    /// 递归覆盖：为前集中每个尚未覆盖的库所，从与已选前缀并发的条件中
    /// 逐一选择，并将候选集与所选条件的并发集求交后递归。
    fn cover(
        &self,
        concurrent: &[ConditionId],
        transition: TransitionId,
        pre_t: &[PlaceId],
        preset: Coset,
        out: &mut Vec<Candidate>,
    ) {
        if preset.len() == pre_t.len() {
            out.push(Candidate {
                transition,
                preset,
            });
            return;
        }

        let covered: FxHashSet<PlaceId> = preset
            .iter()
            .map(|condition| self.conditions[condition].place)
            .collect();
        let place = pre_t
            .iter()
            .copied()
            .find(|place| !covered.contains(place))
            .expect("incomplete cover must leave an uncovered place");

        for &chosen in concurrent {
            if self.conditions[chosen].place != place {
                continue;
            }
            let narrowed: Vec<ConditionId> = concurrent
                .iter()
                .copied()
                .filter(|&other| {
                    self.relations.are_concurrent(
                        &self.conditions,
                        &self.events,
                        BpNode::Condition(chosen),
                        BpNode::Condition(other),
                    )
                })
                .collect();
            let mut extended = preset.clone();
            extended.insert(chosen);
            self.cover(&narrowed, transition, pre_t, extended, out);
        }
    }

    /// Conditions concurrent with the given event, in arena order.
    fn concurrent_conditions(&self, event: EventId) -> Vec<ConditionId> {
        self.conditions
            .indices()
            .filter(|&condition| {
                self.relations.are_concurrent(
                    &self.conditions,
                    &self.events,
                    BpNode::Event(event),
                    BpNode::Condition(condition),
                )
            })
            .collect()
    }

    /*************************************************************************
     * Admission
     *************************************************************************/

    fn add_condition(&mut self, place: PlaceId, pre_event: Option<EventId>) -> ConditionId {
        if let Some(&existing) = self.cond_index.get(&(place, pre_event)) {
            return existing;
        }
        let condition = self.conditions.push(Condition::new(place, pre_event));
        self.cond_index.insert((place, pre_event), condition);
        self.relations.record_condition(condition, pre_event);
        self.p2cs.entry(place).or_default().push(condition);
        condition
    }

    /// Shared part of event admission: insert the event, maintain causality
    /// and the indexes, materialize its post-conditions, record its local
    /// configuration and reached marking.
    fn admit_event(&mut self, candidate: &Candidate) -> EventId {
        debug_assert!(
            !self
                .event_index
                .contains_key(&(candidate.transition, candidate.preset.clone())),
            "duplicate event admission: {:?}",
            candidate
        );

        let event = self
            .events
            .push(Event::new(candidate.transition, candidate.preset.clone()));
        self.event_index
            .insert((candidate.transition, candidate.preset.clone()), event);
        self.relations.record_event(event, &candidate.preset);
        self.t2es
            .entry(candidate.transition)
            .or_default()
            .push(event);
        for condition in candidate.preset.iter() {
            self.conditions[condition].post_events.insert(event);
        }

        let mut post = Coset::new();
        for place in self.net.postset(candidate.transition) {
            let condition = self.add_condition(place, Some(event));
            post.insert(condition);
        }
        self.events[event].post_conditions = post;

        let configuration = self.admitted_configuration(event);
        let marking = self.marking_of(&configuration.events);
        self.configurations.push(configuration);
        self.markings.push(marking);
        debug_assert_eq!(self.configurations.len(), self.events.len());

        trace!(
            "admitted event {:?} for transition {:?}",
            event,
            candidate.transition
        );
        event
    }

    /// 通用变体纳入：另需以事件推进所有覆盖其前集的割。
    /// Returns `None` when a derived cut violates the bound.
    fn add_event(&mut self, candidate: &Candidate) -> Option<EventId> {
        let event = self.admit_event(candidate);
        let post = self.events[event].post_conditions.clone();

        let anchor = candidate
            .preset
            .first()
            .expect("event preset must not be empty");
        let covering: Vec<CutId> = self
            .c2cut
            .get(&anchor)
            .map(|cuts| {
                cuts.iter()
                    .copied()
                    .filter(|&cut| self.cuts[cut].contains_all(&candidate.preset))
                    .collect()
            })
            .unwrap_or_default();

        for cut in covering {
            let mut derived = self.cuts[cut].clone();
            for condition in candidate.preset.iter() {
                derived.remove(condition);
            }
            for condition in post.iter() {
                derived.insert(condition);
            }
            if !self.add_cut(derived) {
                return None;
            }
        }
        Some(event)
    }

    /// 安全网变体纳入：不推进割。
    fn add_event_safe(&mut self, candidate: &Candidate) -> EventId {
        self.admit_event(candidate)
    }

    /// 纳入一个割：先播种并发关系，再做每库所重数检查并建立索引。
    /// Returns `false` and terminates the run on a bound violation.
    fn add_cut(&mut self, cut: Cut) -> bool {
        self.relations.seed_cut(&cut, &self.conditions);

        let mut per_place: FxHashMap<PlaceId, Weight> = FxHashMap::default();
        for condition in cut.iter() {
            let place = self.conditions[condition].place;
            let count = per_place.entry(place).or_insert(0);
            *count += 1;
            if *count > self.setup.max_bound {
                warn!(
                    "cut multiplicity for place {:?} exceeds bound {}; terminating",
                    place, self.setup.max_bound
                );
                self.termination = Termination::BoundExceeded(place);
                return false;
            }
        }

        let members: SmallVec<[ConditionId; 4]> = cut.iter().collect();
        let id = self.cuts.push(cut);
        for condition in members {
            self.c2cut.entry(condition).or_default().push(id);
        }
        true
    }

    /*************************************************************************
     * Cutoff detection
     *************************************************************************/

    /// 截断检查：按纳入顺序扫描既有事件，返回第一个到达相同标识且局部
    /// 配置更小的事件（经扩展点确认）。
    fn check_cutoff(&self, event: EventId) -> Option<EventId> {
        let configuration = &self.configurations[event];
        let marking = &self.markings[event];

        for other in self.events.indices() {
            if other == event {
                continue;
            }
            if self.markings[other] == *marking
                && self
                    .setup
                    .order
                    .is_smaller(&self.configurations[other], configuration)
            {
                return self.setup.hooks.confirm_cutoff(self, event, other);
            }
        }
        None
    }

    /// `true` iff the candidate's history contains a cutoff event.
    fn history_hits_cutoff(&self, candidate: &Candidate) -> bool {
        candidate.preset.iter().any(|condition| {
            match self.conditions[condition].pre_event {
                Some(event) => self.configurations[event]
                    .events
                    .iter()
                    .any(|member| self.cutoff2corr.contains_key(member)),
                None => false,
            }
        })
    }

    /*************************************************************************
     * Configurations and markings
     *************************************************************************/

    fn minimal_candidate(&self, pe: &[Candidate]) -> usize {
        let configurations: Vec<LocalConfiguration> = pe
            .iter()
            .map(|candidate| self.candidate_configuration(candidate))
            .collect();
        self.setup.order.minimal_index(&configurations)
    }

    /// Local configuration of a not-yet-admitted candidate: the histories of
    /// its preset plus its own transition.
    fn candidate_configuration(&self, candidate: &Candidate) -> LocalConfiguration {
        let mut events = FxHashSet::default();
        for condition in candidate.preset.iter() {
            if let Some(event) = self.conditions[condition].pre_event {
                events.extend(self.configurations[event].events.iter().copied());
            }
        }
        let mut transitions: Vec<TransitionId> = events
            .iter()
            .map(|&event| self.events[event].transition)
            .collect();
        transitions.push(candidate.transition);
        LocalConfiguration::from_parts(events, transitions)
    }

    /// Local configuration of an admitted event: its causal predecessor
    /// events plus itself.
    fn admitted_configuration(&self, event: EventId) -> LocalConfiguration {
        let mut events: FxHashSet<EventId> = self
            .relations
            .predecessors(BpNode::Event(event))
            .into_iter()
            .flatten()
            .filter_map(|node| node.as_event())
            .collect();
        events.insert(event);
        let transitions: Vec<TransitionId> = events
            .iter()
            .map(|&member| self.events[member].transition)
            .collect();
        LocalConfiguration::from_parts(events, transitions)
    }

    /// 配置到达的标识：M₀ 加配置事件集的净效应。
    fn marking_of(&self, events: &FxHashSet<EventId>) -> Marking {
        let mut deltas = vec![0i64; self.net.places_len()];
        for &event in events {
            let transition = self.events[event].transition;
            for place in self.net.preset(transition) {
                deltas[place.index()] -= 1;
            }
            for place in self.net.postset(transition) {
                deltas[place.index()] += 1;
            }
        }

        let mut marking = self.net.initial_marking();
        for (idx, delta) in deltas.iter().enumerate() {
            let place = PlaceId::from_usize(idx);
            let tokens = marking.tokens(place) as i64 + delta;
            assert!(
                tokens >= 0,
                "configuration net effect drove place {:?} negative",
                place
            );
            *marking.tokens_mut(place) = tokens as u64;
        }
        marking
    }

    /*************************************************************************
     * Cut helpers
     *************************************************************************/

    /// Cuts containing a condition of the given place, ascending by cut id.
    fn cuts_with_place(&self, place: PlaceId) -> Vec<CutId> {
        let mut result = Vec::new();
        let mut seen = FxHashSet::default();
        if let Some(conditions) = self.p2cs.get(&place) {
            for condition in conditions {
                if let Some(cuts) = self.c2cut.get(condition) {
                    for &cut in cuts {
                        if seen.insert(cut) {
                            result.push(cut);
                        }
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Pick one condition per preset place out of the cut; `None` if some
    /// place has no occurrence in the cut.
    fn coset_covering(&self, cut: CutId, places: &[PlaceId]) -> Option<Coset> {
        let cut = &self.cuts[cut];
        let mut result = Coset::new();
        for &place in places {
            let condition = cut
                .iter()
                .find(|&condition| self.conditions[condition].place == place)?;
            result.insert(condition);
        }
        Some(result)
    }

    /*************************************************************************
     * Public interface
     *************************************************************************/

    pub fn net(&self) -> &'n Net {
        self.net
    }

    pub fn setup(&self) -> &UnfoldingSetup {
        &self.setup
    }

    /// Outcome of the construction run.
    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Complete
    }

    pub fn num_conditions(&self) -> usize {
        self.conditions.len()
    }

    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    pub fn conditions(&self) -> impl Iterator<Item = ConditionId> {
        self.conditions.indices()
    }

    pub fn events(&self) -> impl Iterator<Item = EventId> {
        self.events.indices()
    }

    pub fn condition(&self, condition: ConditionId) -> &Condition {
        &self.conditions[condition]
    }

    pub fn event(&self, event: EventId) -> &Event {
        &self.events[event]
    }

    /// Conditions that are occurrences of the given place.
    pub fn conditions_of_place(&self, place: PlaceId) -> &[ConditionId] {
        self.p2cs.get(&place).map_or(&[], Vec::as_slice)
    }

    /// Events that are occurrences of the given transition.
    pub fn events_of_transition(&self, transition: TransitionId) -> &[EventId] {
        self.t2es.get(&transition).map_or(&[], Vec::as_slice)
    }

    /// Cuts tracked by the general variant (the safe variant only records the
    /// initial cut).
    pub fn cuts(&self) -> impl Iterator<Item = &Cut> {
        self.cuts.iter()
    }

    pub fn local_configuration(&self, event: EventId) -> &LocalConfiguration {
        &self.configurations[event]
    }

    /// Marking reached by the local configuration of the event.
    pub fn reached_marking(&self, event: EventId) -> &Marking {
        &self.markings[event]
    }

    pub fn are_causal(&self, n1: impl Into<BpNode>, n2: impl Into<BpNode>) -> bool {
        self.relations
            .are_causal(&self.conditions, &self.events, n1.into(), n2.into())
    }

    pub fn are_inverse_causal(&self, n1: impl Into<BpNode>, n2: impl Into<BpNode>) -> bool {
        self.are_causal(n2.into(), n1.into())
    }

    pub fn are_concurrent(&self, n1: impl Into<BpNode>, n2: impl Into<BpNode>) -> bool {
        self.relations
            .are_concurrent(&self.conditions, &self.events, n1.into(), n2.into())
    }

    pub fn are_in_conflict(&self, n1: impl Into<BpNode>, n2: impl Into<BpNode>) -> bool {
        self.relations
            .are_in_conflict(&self.events, n1.into(), n2.into())
    }

    /// The unique relation holding between two nodes.
    pub fn ordering_relation(
        &self,
        n1: impl Into<BpNode>,
        n2: impl Into<BpNode>,
    ) -> OrderingRelation {
        let (n1, n2) = (n1.into(), n2.into());
        if self.are_causal(n1, n2) {
            OrderingRelation::Causal
        } else if self.are_inverse_causal(n1, n2) {
            OrderingRelation::InverseCausal
        } else if self.are_in_conflict(n1, n2) {
            OrderingRelation::Conflict
        } else {
            OrderingRelation::Concurrent
        }
    }

    pub fn cutoff_events(&self) -> impl Iterator<Item = EventId> + '_ {
        self.events
            .indices()
            .filter(|event| self.cutoff2corr.contains_key(event))
    }

    pub fn is_cutoff(&self, event: EventId) -> bool {
        self.cutoff2corr.contains_key(&event)
    }

    /// Corresponding event of a cutoff; `None` if the event is no cutoff.
    pub fn corresponding_event(&self, event: EventId) -> Option<EventId> {
        self.cutoff2corr.get(&event).copied()
    }

    /// Read-only occurrence-net projection of this prefix.
    pub fn occurrence_net(&self) -> OccurrenceNet<'_, 'n> {
        OccurrenceNet::new(self)
    }
}
