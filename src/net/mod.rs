//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设离散库所集合 `P` 与迁移集合 `T`，基数分别为 `|P|` 与 `|T|`。
//! 定义输入/输出映射 `Pre, Post ∈ ℕ^{|P|×|T|}`。对任意标识 `M ∈ ℕ^{|P|}`：
//!
//! * 迁移 `t ∈ T` **可激发** 当且仅当 `∀p ∈ P: M[p] ≥ Pre[p, t]`；
//! * 迁移 **发射** 后标识满足 `M' = M - Pre[:, t] + Post[:, t]`。
//!
//! 提供的核心 API 支持：
//! * 前集/后集查询（[`Net::preset`]、[`Net::postset`]、
//!   [`Net::postset_transitions`]），即展开引擎消费的网系统契约；
//! * 可激发集计算与单步发射；
//! * 可达图构造（测试中用于验证割对应可达标识）；
//! * JSON/RON 序列化（[`io`]）。
//!
//! ## 示例
//!
//! ```rust
//! use pt_unfolding::net::{Net, Place, Transition};
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::with_tokens("p0", 1));
//! let p1 = net.add_place(Place::new("p1"));
//! let t0 = net.add_transition(Transition::new("t0"));
//!
//! net.set_input_weight(p0, t0, 1);
//! net.set_output_weight(p1, t0, 1);
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(&marking), vec![t0]);
//! let next = net.fire_transition(&marking, t0).unwrap();
//! assert_eq!(next.tokens(p0), 0);
//! assert_eq!(next.tokens(p1), 1);
//! ```

pub mod core;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use self::core::{FireError, Net, ReachabilityEdge, ReachabilityGraph};
pub use ids::{Idx, PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::IndexVec;
pub use structure::{Marking, Place, Transition, Weight};
