//! # 完全有限前缀展开（complete prefix unfolding）
//!
//! 给定带初始标识的 P/T 网系统，构造其分支过程的完全有限前缀：
//! 事件表示迁移发生，条件表示 token 发生，截断事件保证前缀有限而仍覆盖
//! 原网的全部可达标识。实现的技术来源：
//!
//! * Javier Esparza, Stefan Römer, Walter Vogler: An Improvement of
//!   McMillan's Unfolding Algorithm. FMSD 20(3):285-310 (2002).
//! * Victor Khomenko: Model Checking Based on Prefixes of Petri Net
//!   Unfoldings. PhD Thesis (2003).
//!
//! 前缀构造完成后可查询四种行为关系（因果、逆因果、并发、冲突）、截断
//! 事件及其对应事件，并可投影为发生网（含 DOT 渲染）。
//!
//! ## 示例
//!
//! ```rust
//! use pt_unfolding::net::{Net, Place, Transition};
//! use pt_unfolding::unfolding::{Unfolding, UnfoldingSetup};
//!
//! // a -> T -> b
//! let mut net = Net::empty();
//! let a = net.add_place(Place::with_tokens("a", 1));
//! let b = net.add_place(Place::new("b"));
//! let t = net.add_transition(Transition::new("T"));
//! net.set_input_weight(a, t, 1);
//! net.set_output_weight(b, t, 1);
//!
//! let unfolding = Unfolding::build(&net, UnfoldingSetup::default());
//! assert!(unfolding.is_complete());
//! assert_eq!(unfolding.num_events(), 1);
//! assert_eq!(unfolding.num_conditions(), 2);
//! ```

pub mod configuration;
pub mod coset;
pub mod engine;
pub mod node;
pub mod occurrence_net;
pub mod order;
mod relations;
pub mod setup;

pub use configuration::LocalConfiguration;
pub use coset::{Coset, Cut};
pub use engine::{Candidate, OrderingRelation, Unfolding};
pub use node::{BpNode, Condition, ConditionId, CutId, Event, EventId};
pub use occurrence_net::{OccNode, OccurrenceNet};
pub use order::{AdequateOrder, EsparzaRomerVoglerOrder, McMillanOrder};
pub use setup::{NoHooks, Termination, UnfoldingHooks, UnfoldingSetup};
