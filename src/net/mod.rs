//! # 令牌流网络核心定义（Place/Transition Net）
//!
//! 网络由两类节点组成：库所（place，持有整数 token）与变迁（transition，
//! 无状态，发生时搬运 token）。每个节点保存按插入顺序排列的出弧
//! `(目标, 权重)`，同一对节点之间允许并行弧。
//!
//! 设 `Pre[p, t]` 为库所 `p` 指向变迁 `t` 的所有弧权重之和，
//! `Post[p, t]` 为 `t` 指向 `p` 的弧权重之和。对任意标识 `M`：
//!
//! * 变迁 `t` **可发生** 当且仅当 `∀p: M[p] ≥ Pre[p, t]`；
//! * 发生后 `M'[p] = M[p] - Pre[p, t] + Post[p, t]`。
//!
//! 提供的核心 API 支持：
//! * 带检查的网络构造与文本转储；
//! * 可发生判定、原地发生、纯函数式后继标识、同步宏步；
//! * JSON/RON 网络描述。
//!
//! ## 示例
//!
//! ```rust
//! use pna::net::*;
//!
//! let mut net = Network::new();
//! net.add_place("p0", 1).unwrap();
//! net.add_place("p1", 0).unwrap();
//! net.add_transition("t0").unwrap();
//!
//! net.add_arc("p0", "t0", 1).unwrap();
//! net.add_arc("t0", "p1", 1).unwrap();
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(), vec![NodeId::from("t0")]);
//! let next = net.compute_next_marking(&marking, "t0");
//! assert_eq!(next.tokens("p0"), 0);
//! assert_eq!(next.tokens("p1"), 1);
//! ```

pub mod core;
pub mod firing;
pub mod ids;
pub mod incidence;
pub mod io;
pub mod structure;

pub use self::core::{NetError, Network};
pub use firing::{FireError, SimulationTrace};
pub use ids::{NodeId, NodeKind};
pub use incidence::{Incidence, TransitionColumn};
pub use io::{IoError, NetDescription};
pub use structure::{Arc, Marking, Node, OutArc, Tokens, Weight};
