//! 展开配置项、终止状态与扩展点。
use std::fmt;

use crate::net::ids::PlaceId;
use crate::net::structure::Weight;
use crate::unfolding::engine::{Candidate, Unfolding};
use crate::unfolding::node::EventId;
use crate::unfolding::order::{AdequateOrder, EsparzaRomerVoglerOrder};

/// Outcome of a construction run, carried by the returned prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No possible extensions remain; the prefix is complete.
    Complete,
    /// The event cap was reached while extensions were still pending.
    EventLimitReached,
    /// Admitting a cut would have exceeded the per-place bound; the prefix
    /// stands as built and stays queryable.
    BoundExceeded(PlaceId),
    /// The net was empty or carried no initial marking; the prefix is empty.
    InvalidInput,
}

/// Extension points of the engine. Defaults change nothing.
pub trait UnfoldingHooks {
    /// Additional possible extensions, merged into each enumeration round.
    fn extra_possible_extensions(
        &self,
        unfolding: &Unfolding<'_>,
        current: &[Candidate],
    ) -> Vec<Candidate> {
        let _ = (unfolding, current);
        Vec::new()
    }

    /// Confirm, veto (`None`) or replace the correspondence found for a
    /// cutoff event.
    fn confirm_cutoff(
        &self,
        unfolding: &Unfolding<'_>,
        cutoff: EventId,
        corresponding: EventId,
    ) -> Option<EventId> {
        let _ = (unfolding, cutoff);
        Some(corresponding)
    }
}

/// Hook implementation that keeps every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl UnfoldingHooks for NoHooks {}

/// 展开设置：事件上限、割内每库所重数上限、安全网优化开关与适当序。
pub struct UnfoldingSetup {
    /// Absolute cap on events in the prefix; construction stops with what is
    /// built once reached.
    pub max_events: usize,
    /// Per-place multiplicity cap inside any cut; a violation terminates the
    /// run.
    pub max_bound: Weight,
    /// Select the on-demand co-set construction for safe (1-bounded) systems.
    pub safe_optimization: bool,
    pub order: Box<dyn AdequateOrder>,
    pub hooks: Box<dyn UnfoldingHooks>,
}

impl Default for UnfoldingSetup {
    fn default() -> Self {
        Self {
            max_events: usize::MAX,
            max_bound: 1,
            safe_optimization: false,
            order: Box::new(EsparzaRomerVoglerOrder),
            hooks: Box::new(NoHooks),
        }
    }
}

impl fmt::Debug for UnfoldingSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnfoldingSetup")
            .field("max_events", &self.max_events)
            .field("max_bound", &self.max_bound)
            .field("safe_optimization", &self.safe_optimization)
            .field("order", &self.order)
            .finish()
    }
}

impl UnfoldingSetup {
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn with_max_bound(mut self, max_bound: Weight) -> Self {
        self.max_bound = max_bound;
        self
    }

    pub fn with_safe_optimization(mut self, enabled: bool) -> Self {
        self.safe_optimization = enabled;
        self
    }

    pub fn with_order(mut self, order: Box<dyn AdequateOrder>) -> Self {
        self.order = order;
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn UnfoldingHooks>) -> Self {
        self.hooks = hooks;
        self
    }
}
