//! 分析报告：验证关卡结果、结构事实与各行为分析结论的汇总。
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::analysis::behavior::{
    Analyzer, BoundednessResult, ConservationResult, LivenessResult, TransitionInvariantResult,
};
use crate::analysis::reachability::{ReachabilityGraph, ReachabilityStats};
use crate::analysis::structure::strongly_connected_components;
use crate::analysis::validate::{StructureReport, VerifyError, verify};
use crate::config::AnalysisConfig;
use crate::net::io::{IoError, write_json};
use crate::net::{Marking, Network, NodeId, SimulationTrace, Tokens};
use crate::options::AnalysisKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub steps: Vec<Vec<NodeId>>,
    pub final_marking: Marking,
    pub deadlocked: bool,
}

impl From<SimulationTrace> for SimulationSummary {
    fn from(trace: SimulationTrace) -> Self {
        Self {
            final_marking: trace.network.initial_marking(),
            steps: trace.steps,
            deadlocked: trace.deadlocked,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub tool_name: String,
    pub initial_place: String,
    pub initial_tokens: Tokens,
    pub structure: StructureReport,
    /// Set when the network was refused before any behavioural analysis.
    pub verification: Option<VerifyError>,
    pub deadlock: Option<bool>,
    pub boundedness: Option<BoundednessResult>,
    pub transition_invariant: Option<TransitionInvariantResult>,
    pub conservation: Option<ConservationResult>,
    pub liveness: Option<LivenessResult>,
    pub reachability: Option<ReachabilityStats>,
    pub components: Option<Vec<Vec<NodeId>>>,
    pub simulation: Option<SimulationSummary>,
    pub analysis_time: Duration,
}

impl AnalysisReport {
    pub fn new(net: &Network, initial_place: &str, initial_tokens: Tokens) -> Self {
        Self {
            tool_name: String::from("pn"),
            initial_place: initial_place.to_string(),
            initial_tokens,
            structure: StructureReport::of(net),
            verification: None,
            deadlock: None,
            boundedness: None,
            transition_invariant: None,
            conservation: None,
            liveness: None,
            reachability: None,
            components: None,
            simulation: None,
            analysis_time: Duration::default(),
        }
    }

    /// The network passed the gate and no analysis found a defect.
    pub fn is_clean(&self) -> bool {
        self.verification.is_none()
            && self.deadlock != Some(true)
            && self.boundedness.as_ref().is_none_or(|r| r.is_bounded())
            && self.conservation.as_ref().is_none_or(|r| r.is_conservative())
            && self.liveness.as_ref().is_none_or(|r| r.is_live())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_json(path, self)
    }
}

/// Runs the verification gate, then every analysis.
pub fn analyze_all(
    net: &Network,
    initial_place: &str,
    initial_tokens: Tokens,
    config: &AnalysisConfig,
) -> AnalysisReport {
    analyze(net, AnalysisKind::All, initial_place, initial_tokens, config)
}

/// Runs the analyses selected by `kind`. Structural facts are always
/// collected; behavioural analyses only run on a network that passes
/// [`verify`].
pub fn analyze(
    net: &Network,
    kind: AnalysisKind,
    initial_place: &str,
    initial_tokens: Tokens,
    config: &AnalysisConfig,
) -> AnalysisReport {
    let start = Instant::now();
    let mut report = AnalysisReport::new(net, initial_place, initial_tokens);

    if matches!(kind, AnalysisKind::All | AnalysisKind::Structure) {
        report.components = Some(strongly_connected_components(net));
    }
    if kind == AnalysisKind::Structure {
        report.analysis_time = start.elapsed();
        return report;
    }

    if let Err(err) = verify(net, initial_place, initial_tokens) {
        log::warn!("network refused: {err}");
        report.verification = Some(err);
        report.analysis_time = start.elapsed();
        return report;
    }

    let analyzer = Analyzer::new(net).with_state_limit(Some(config.state_limit));
    let all = kind == AnalysisKind::All;
    if all || kind == AnalysisKind::Deadlock {
        report.deadlock = Some(analyzer.is_deadlock());
    }
    if all || kind == AnalysisKind::Bounded {
        report.boundedness = Some(analyzer.boundedness(config.max_tokens));
    }
    if all || kind == AnalysisKind::TransitionInvariant {
        report.transition_invariant = Some(analyzer.transition_invariant());
    }
    if all || kind == AnalysisKind::Conservative {
        report.conservation = Some(analyzer.conservation());
    }
    if all || kind == AnalysisKind::Live {
        report.liveness = Some(analyzer.liveness());
    }
    if all {
        let graph = ReachabilityGraph::build(net, Some(config.state_limit));
        report.reachability = Some(graph.stats());
    }
    if kind == AnalysisKind::Simulate {
        report.simulation = Some(net.run(config.simulation_steps).into());
    }

    report.analysis_time = start.elapsed();
    log::debug!("analysis finished in {:?}", report.analysis_time);
    report
}

fn yes_no(value: bool) -> &'static str {
    if value { "是" } else { "否" }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "网络分析报告")?;
        writeln!(f, "分析工具: {}", self.tool_name)?;
        writeln!(f, "分析时间: {:?}", self.analysis_time)?;
        writeln!(
            f,
            "初始库所: {} ({} tokens)",
            self.initial_place, self.initial_tokens
        )?;

        let s = &self.structure;
        writeln!(f, "\n结构信息:")?;
        writeln!(
            f,
            "库所数: {}, 变迁数: {}, 弧数: {}",
            s.places, s.transitions, s.arcs
        )?;
        writeln!(
            f,
            "二分: {}, 连通: {}, 简单: {}",
            yes_no(s.bipartite),
            yes_no(s.connected),
            yes_no(s.simple)
        )?;
        writeln!(f, "源点: [{}]", s.sources.iter().join(", "))?;
        writeln!(f, "汇点: [{}]", s.sinks.iter().join(", "))?;
        if let Some(components) = &self.components {
            let cyclic = components.iter().filter(|c| c.len() > 1).count();
            writeln!(
                f,
                "强连通分量: {} (含环 {})",
                components.len(),
                cyclic
            )?;
            for component in components.iter().filter(|c| c.len() > 1) {
                writeln!(f, "  {{{}}}", component.iter().join(", "))?;
            }
        }

        if let Some(err) = &self.verification {
            writeln!(f, "\n验证失败: {}", err)?;
            return Ok(());
        }

        if let Some(deadlock) = self.deadlock {
            writeln!(f, "\n当前标识死锁: {}", yes_no(deadlock))?;
        }
        if let Some(result) = &self.boundedness {
            writeln!(f, "有界性: {}", result)?;
        }
        if let Some(result) = &self.transition_invariant {
            writeln!(f, "T-不变量: {}", result)?;
        }
        if let Some(result) = &self.conservation {
            writeln!(f, "守恒性: {}", result)?;
        }
        if let Some(result) = &self.liveness {
            writeln!(f, "活性: {}", result)?;
        }
        if let Some(stats) = &self.reachability {
            writeln!(f, "\n状态空间信息:")?;
            writeln!(f, "可达状态数: {}", stats.state_count)?;
            writeln!(f, "总转换数: {}", stats.edge_count)?;
            writeln!(f, "死锁状态数: {}", stats.deadlock_count)?;
            if stats.truncated {
                writeln!(f, "(已达到状态上限，结果不完整)")?;
            }
        }
        if let Some(simulation) = &self.simulation {
            writeln!(f, "\n模拟: {} 步", simulation.steps.len())?;
            for (i, fired) in simulation.steps.iter().enumerate() {
                writeln!(f, "  #{}: {}", i + 1, fired.iter().join(", "))?;
            }
            writeln!(f, "最终标识: {}", simulation.final_marking)?;
            if simulation.deadlocked {
                writeln!(f, "模拟以死锁结束")?;
            }
        }

        Ok(())
    }
}
