//! 分支过程节点：条件（库所的 token 发生）与事件（迁移的发射发生）。
use rustc_hash::FxHashSet;

use crate::net::ids::{define_id, PlaceId, TransitionId};
use crate::unfolding::coset::Coset;

define_id!(ConditionId);
define_id!(EventId);
define_id!(CutId);

/// A node of the branching process, addressed by arena index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BpNode {
    Condition(ConditionId),
    Event(EventId),
}

impl BpNode {
    pub fn as_condition(self) -> Option<ConditionId> {
        match self {
            BpNode::Condition(c) => Some(c),
            BpNode::Event(_) => None,
        }
    }

    pub fn as_event(self) -> Option<EventId> {
        match self {
            BpNode::Event(e) => Some(e),
            BpNode::Condition(_) => None,
        }
    }
}

impl From<ConditionId> for BpNode {
    fn from(condition: ConditionId) -> Self {
        BpNode::Condition(condition)
    }
}

impl From<EventId> for BpNode {
    fn from(event: EventId) -> Self {
        BpNode::Event(event)
    }
}

/// 条件：结构同一性为 `(place, pre_event)`；后继事件集随前缀增长。
#[derive(Clone, Debug)]
pub struct Condition {
    pub place: PlaceId,
    pub pre_event: Option<EventId>,
    pub post_events: FxHashSet<EventId>,
}

impl Condition {
    pub(crate) fn new(place: PlaceId, pre_event: Option<EventId>) -> Self {
        Self {
            place,
            pre_event,
            post_events: FxHashSet::default(),
        }
    }

    /// `true` iff the condition stems from the initial marking.
    pub fn is_initial(&self) -> bool {
        self.pre_event.is_none()
    }
}

/// 事件：结构同一性为 `(transition, pre_conditions)`；
/// 后置条件在纳入前缀时一次性赋值，之后不再变更。
#[derive(Clone, Debug)]
pub struct Event {
    pub transition: TransitionId,
    pub pre_conditions: Coset,
    pub post_conditions: Coset,
}

impl Event {
    pub(crate) fn new(transition: TransitionId, pre_conditions: Coset) -> Self {
        Self {
            transition,
            pre_conditions,
            post_conditions: Coset::new(),
        }
    }
}
