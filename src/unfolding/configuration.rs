//! 局部配置：包含给定事件且对因果前驱封闭的最小事件集。
use rustc_hash::FxHashSet;

use crate::net::ids::TransitionId;
use crate::unfolding::node::EventId;

/// Local configuration of an admitted event or of a candidate extension.
///
/// `events` holds the admitted members; for a candidate the not-yet-admitted
/// event itself is absent from `events` but its transition is counted in
/// `parikh`, so `size()` is the configuration size in both cases.
#[derive(Clone, Debug)]
pub struct LocalConfiguration {
    pub events: FxHashSet<EventId>,
    /// Transition multiset, sorted under the transition order.
    pub parikh: Vec<TransitionId>,
}

impl LocalConfiguration {
    pub(crate) fn from_parts(
        events: FxHashSet<EventId>,
        mut transitions: Vec<TransitionId>,
    ) -> Self {
        transitions.sort_unstable();
        Self {
            events,
            parikh: transitions,
        }
    }

    pub fn size(&self) -> usize {
        self.parikh.len()
    }

    pub fn contains(&self, event: EventId) -> bool {
        self.events.contains(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ids::Idx;

    #[test]
    fn parikh_vector_is_sorted() {
        let t = |raw| TransitionId::from_usize(raw);
        let lc = LocalConfiguration::from_parts(FxHashSet::default(), vec![t(2), t(0), t(2)]);
        assert_eq!(lc.parikh, vec![t(0), t(2), t(2)]);
        assert_eq!(lc.size(), 3);
    }
}
