//! 适当序（adequate order）：局部配置上的严格良基偏序，
//! 用于选取下一个扩展并判定截断事件。
use std::fmt;

use crate::unfolding::configuration::LocalConfiguration;

/// Strict well-founded order over local configurations.
///
/// Implementations must refine set inclusion: `lc ⊊ lc'` implies
/// `is_smaller(lc, lc')`. Totality on configurations with equal reached
/// marking is not required.
pub trait AdequateOrder: fmt::Debug {
    /// `true` iff `lc1` is strictly smaller than `lc2`.
    fn is_smaller(&self, lc1: &LocalConfiguration, lc2: &LocalConfiguration) -> bool;

    /// Index of one order-minimal element of a nonempty slice.
    fn minimal_index(&self, configurations: &[LocalConfiguration]) -> usize {
        debug_assert!(!configurations.is_empty());
        let mut min = 0;
        for idx in 1..configurations.len() {
            if self.is_smaller(&configurations[idx], &configurations[min]) {
                min = idx;
            }
        }
        min
    }
}

/// McMillan's original order: strictly fewer events.
#[derive(Debug, Clone, Copy, Default)]
pub struct McMillanOrder;

impl AdequateOrder for McMillanOrder {
    fn is_smaller(&self, lc1: &LocalConfiguration, lc2: &LocalConfiguration) -> bool {
        lc1.size() < lc2.size()
    }
}

/// Esparza–Römer–Vogler order: size first, then the sorted Parikh vectors
/// compared lexicographically under the transition order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsparzaRomerVoglerOrder;

impl AdequateOrder for EsparzaRomerVoglerOrder {
    fn is_smaller(&self, lc1: &LocalConfiguration, lc2: &LocalConfiguration) -> bool {
        if lc1.size() != lc2.size() {
            return lc1.size() < lc2.size();
        }
        lc1.parikh < lc2.parikh
    }
}
