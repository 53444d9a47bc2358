use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use log::debug;

use pna::analysis::reachability::ReachabilityGraph;
use pna::config::AnalysisConfig;
use pna::net::io::read_description;
use pna::options::Options;
use pna::report::analyze;

fn main() -> ExitCode {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    // PN_FLAGS first so explicit arguments win
    let mut args = shellwords::split(&std::env::var("PN_FLAGS").unwrap_or_default())
        .map_err(|err| anyhow!("PN_FLAGS: {err}"))?;
    args.extend(std::env::args().skip(1));
    debug!("pn arguments {:?}", args);

    let options = match Options::parse_from_args(&args) {
        Ok(options) => options,
        Err(err) => {
            // clap renders usage, --help and --version through its error
            eprintln!("{err}");
            return Ok(ExitCode::from(2));
        }
    };
    debug!("pn options {:?}", options);

    let mut config = AnalysisConfig::load_from_file(&options.config)?;
    if let Some(limit) = options.state_limit {
        config.state_limit = limit;
    }
    if let Some(max_tokens) = options.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(steps) = options.steps {
        config.simulation_steps = steps;
    }

    let description = read_description(&options.net)
        .with_context(|| format!("Failed to read network: {:?}", options.net))?;
    let net = description
        .into_network()
        .with_context(|| format!("Invalid network: {:?}", options.net))?;

    let initial_place = options
        .initial_place
        .clone()
        .or_else(|| description.initial_place.as_ref().map(|id| id.to_string()))
        .or_else(|| net.places().next().map(|(id, _)| id.to_string()))
        .unwrap_or_default();
    let initial_tokens = options
        .initial_tokens
        .or_else(|| net.tokens(&initial_place))
        .unwrap_or(0);

    let report = analyze(&net, options.kind, &initial_place, initial_tokens, &config);

    if let Some(path) = &options.dot {
        ReachabilityGraph::build(&net, Some(config.state_limit))
            .write_dot(path)
            .with_context(|| format!("Failed to write dot file: {:?}", path))?;
    }

    match &options.output {
        Some(path) => {
            report
                .save_to_file(path)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
            log::info!("report written to {:?}", path);
        }
        None => print!("{report}"),
    }

    Ok(if report.verification.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
