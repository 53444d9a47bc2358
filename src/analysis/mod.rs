//! 网络分析：验证关卡、可达图探索、行为分析与静态结构分析。
pub mod behavior;
pub mod reachability;
pub mod structure;
pub mod validate;

pub use behavior::{
    Analyzer, BoundednessResult, ConservationResult, LivenessResult, TransitionInvariantResult,
    has_transition_invariant, is_bounded, is_conservative, is_deadlock, is_live,
};
pub use reachability::{ExploreEvent, Exploration, Explorer, Outcome, ReachabilityGraph};
pub use structure::{node_reachable, reachable_places, strongly_connected_components};
pub use validate::{VerifyError, verify};
