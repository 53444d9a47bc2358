//! Parsing Options.
//! `--net {file}` names the network description; `--kind {kind}` or `-k`
//! picks the analysis, `all` by default.

use clap::{Arg, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;

use crate::net::Tokens;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnalysisKind {
    All,
    Deadlock,
    Bounded,
    TransitionInvariant,
    Conservative,
    Live,
    Structure,
    Simulate,
}

fn make_options_parser() -> clap::Command {
    Command::new("pn")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Analyses place/transition networks")
        .arg(
            Arg::new("net")
                .short('n')
                .long("net")
                .value_name("FILE")
                .help("Network description (.json or .ron)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("kind")
                .short('k')
                .long("kind")
                .help("The analysis kind")
                .default_value("all")
                .value_parser([
                    "all",
                    "deadlock",
                    "bounded",
                    "t-invariant",
                    "conservative",
                    "live",
                    "structure",
                    "simulate",
                ]),
        )
        .arg(
            Arg::new("initial-place")
                .long("initial-place")
                .value_name("ID")
                .help("Designated initial place, defaults to the one in the description"),
        )
        .arg(
            Arg::new("initial-tokens")
                .long("initial-tokens")
                .value_name("N")
                .help("Designated initial token count, defaults to the place's count")
                .value_parser(value_parser!(Tokens)),
        )
        .arg(
            Arg::new("max-tokens")
                .long("max-tokens")
                .value_name("N")
                .help("Bound checked by the boundedness analysis")
                .value_parser(value_parser!(Tokens)),
        )
        .arg(
            Arg::new("state-limit")
                .long("state-limit")
                .value_name("N")
                .help("Maximum markings visited by one exploration")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("steps")
                .long("steps")
                .value_name("N")
                .help("Macro-steps for simulation")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .default_value("pn.toml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the report as JSON instead of printing it")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the reachability graph in Graphviz format")
                .value_parser(value_parser!(PathBuf)),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub net: PathBuf,
    pub kind: AnalysisKind,
    pub initial_place: Option<String>,
    pub initial_tokens: Option<Tokens>,
    /// Overrides of the configuration file.
    pub max_tokens: Option<Tokens>,
    pub state_limit: Option<usize>,
    pub steps: Option<usize>,
    pub config: PathBuf,
    pub output: Option<PathBuf>,
    pub dot: Option<PathBuf>,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        let kind = match matches.get_one::<String>("kind").map(String::as_str) {
            Some("all") => AnalysisKind::All,
            Some("deadlock") => AnalysisKind::Deadlock,
            Some("bounded") => AnalysisKind::Bounded,
            Some("t-invariant") => AnalysisKind::TransitionInvariant,
            Some("conservative") => AnalysisKind::Conservative,
            Some("live") => AnalysisKind::Live,
            Some("structure") => AnalysisKind::Structure,
            Some("simulate") => AnalysisKind::Simulate,
            _ => return Err("UnsupportedAnalysisKind")?,
        };

        let Some(net) = matches.get_one::<PathBuf>("net").cloned() else {
            return Err("MissingNetwork")?;
        };
        let config = matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("pn.toml"));

        Ok(Options {
            net,
            kind,
            initial_place: matches.get_one::<String>("initial-place").cloned(),
            initial_tokens: matches.get_one::<Tokens>("initial-tokens").copied(),
            max_tokens: matches.get_one::<Tokens>("max-tokens").copied(),
            state_limit: matches.get_one::<usize>("state-limit").copied(),
            steps: matches.get_one::<usize>("steps").copied(),
            config,
            output: matches.get_one::<PathBuf>("output").cloned(),
            dot: matches.get_one::<PathBuf>("dot").cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::parse_from_str("--net nets/canonical.json").unwrap();
        assert_eq!(options.net, PathBuf::from("nets/canonical.json"));
        assert_eq!(options.kind, AnalysisKind::All);
        assert_eq!(options.config, PathBuf::from("pn.toml"));
        assert!(options.output.is_none());
        assert!(options.state_limit.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let options = Options::parse_from_str(
            "-n net.ron -k t-invariant --initial-place E1 --initial-tokens 5 \
             --max-tokens 7 --state-limit 300 -o 'out dir/report.json'",
        )
        .unwrap();
        assert_eq!(options.kind, AnalysisKind::TransitionInvariant);
        assert_eq!(options.initial_place.as_deref(), Some("E1"));
        assert_eq!(options.initial_tokens, Some(5));
        assert_eq!(options.max_tokens, Some(7));
        assert_eq!(options.state_limit, Some(300));
        assert_eq!(options.output, Some(PathBuf::from("out dir/report.json")));
    }

    #[test]
    fn test_parse_from_str_err() {
        let options = Options::parse_from_str("--net a.json -k unknown");
        assert!(options.is_err());
    }

    #[test]
    fn test_parse_from_args_err() {
        let options = Options::parse_from_args(&[
            "-k".to_owned(),
            "live".to_owned(),
            "--state-limit".to_owned(),
            "many".to_owned(),
        ]);
        assert!(options.is_err());
    }
}
