//! P/T 网系统的完全有限前缀展开库。
//!
//! [`net`] 提供网系统本身（库所、迁移、关联矩阵、发生语义与可达图）；
//! [`unfolding`] 在其上构造分支过程的完全有限前缀，维护因果/并发/冲突
//! 关系并导出发生网视图。入口见 [`unfolding::Unfolding::build`]。

pub mod net;
pub mod unfolding;

pub use net::{Marking, Net, Place, PlaceId, Transition, TransitionId};
pub use unfolding::{
    AdequateOrder, BpNode, Candidate, ConditionId, EsparzaRomerVoglerOrder, EventId,
    LocalConfiguration, McMillanOrder, OccurrenceNet, OrderingRelation, Termination, Unfolding,
    UnfoldingHooks, UnfoldingSetup,
};
