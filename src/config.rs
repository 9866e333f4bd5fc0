use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_RUNS: u32 = 20;
pub const DEFAULT_START: u32 = 0;
pub const DEFAULT_NPROCS: u32 = 8;
pub const DEFAULT_VERBOSITY: u32 = 0;
pub const DEFAULT_TOPOLOGY_TYPE: &str = "rocketfuel";
pub const DEFAULT_MESSAGE_FILE: &str = "done_sims.email";

const DEFAULT_TOPOLOGIES: &[&str] = &["3356"];

const DEFAULT_HEURISTICS: &[&str] = &["rand", "ortho", "newreg", "close", "far", "angle", "dist"];

const DEFAULT_FAIL_PROBS: &[&str] = &["0.1", "0.2", "0.3", "0.4", "0.5"];

// Quick-test profile: one short run on a small US topology.
const TEST_TOPOLOGY: &str = "3356";
const TEST_DISASTER: &str = "2,2";
const TEST_FAIL_PROB: &str = "0.5";

/// Disaster locations used when no override is given. The values carry
/// their quoting into the rendered command verbatim.
fn default_disaster(topology: &str) -> Option<&'static str> {
    match topology {
        "1755" => Some("\"Amsterdam,_Netherlands-London,_UnitedKingdom-Paris,_France\""),
        "3967" => Some("\"Herndon,_VA-Irvine,_CA-Santa_Clara,_CA\""),
        "6461" => Some("\"San_Jose,_CA-Los_Angeles,_CA-New_York,_NY\""),
        "3356" => Some("\"New_York,_NY-Los_Angeles,_CA-Miami,_FL\""),
        "2914" => Some("\"New_York,_NY-Irvine,_CA\""),
        "1239" => Some("\"New_York,_NY-Dallas,_TX-Washington,_DC\""),
        _ => None,
    }
}

/// Parallel run launcher for the Geocron ns-3 simulator.
#[derive(Debug, Parser)]
#[command(name = "geocron-runner")]
#[command(about = "Builds geocron simulation command lines and runs them as parallel ns-3 instances")]
pub struct Cli {
    /// AS topologies to simulate
    #[arg(long = "as", value_name = "ID", num_args = 1..)]
    pub topologies: Option<Vec<String>>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How to read/generate the topology (currently only rocketfuel)
    #[arg(long, visible_alias = "topo", value_name = "TYPE")]
    pub topology_type: Option<String>,

    /// Disaster locations applied to ALL selected topologies
    #[arg(long, value_name = "CITY", num_args = 0..)]
    pub disasters: Option<Vec<String>>,

    /// Failure probabilities to sweep
    #[arg(short, long, value_name = "PROB", num_args = 0..)]
    pub fprobs: Option<Vec<String>>,

    /// Heuristics to run
    #[arg(long, value_name = "NAME", num_args = 0..)]
    pub heuristics: Option<Vec<String>>,

    /// Number of runs for each set of parameters
    #[arg(short, long, value_name = "N")]
    pub runs: Option<u32>,

    /// Number of parallel simulator instances (1 if flag given without a value)
    #[arg(short, long, value_name = "N", num_args = 0..=1, default_missing_value = "1")]
    pub nprocs: Option<u32>,

    /// Unique ID to start runs on; useful when splitting runs across hosts
    #[arg(short, long, value_name = "ID")]
    pub start: Option<u32>,

    /// Configure the build in optimized mode (reserved)
    #[arg(short, long)]
    pub optimized: bool,

    /// Run the simulator through gdb
    #[arg(short, long)]
    pub debug: bool,

    /// Run with the PyViz visualizer
    #[arg(long)]
    pub visualize: bool,

    /// Verbose printing level
    #[arg(short, long, value_name = "LEVEL")]
    pub verbose: Option<Option<u32>>,

    /// Simulator logging components to enable for the spawned instances
    #[arg(short, long, value_name = "COMPONENT", num_args = 1..)]
    pub log: Option<Vec<String>>,

    /// Print the first generated command and exit without spawning anything
    #[arg(short = 'c', long)]
    pub show_cmd: bool,

    /// Collapse defaults to a single short run in a single process
    #[arg(short, long)]
    pub test: bool,

    /// Skip the completion notification email
    #[arg(long)]
    pub no_email: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub simulation: SimulationSection,

    #[serde(default)]
    pub execution: ExecutionSection,

    #[serde(default)]
    pub notify: NotifySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub topologies: Option<Vec<String>>,
    pub topology_type: Option<String>,
    pub disasters: Option<Vec<String>>,
    pub fail_probs: Option<Vec<String>>,
    pub heuristics: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub runs: Option<u32>,
    pub processes: Option<u32>,
    pub start_id: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    pub email: Option<String>,
    pub message_file: Option<String>,
}

/// Resolved configuration after merging built-in defaults, the TOML file
/// and CLI overrides.
pub struct AppConfig {
    pub topologies: Vec<String>,
    pub topology_type: String,
    /// One disaster-location spec per selected topology. Resolution
    /// guarantees an entry for every element of `topologies`.
    pub disasters: HashMap<String, String>,
    pub fail_probs: Vec<String>,
    pub heuristics: Vec<String>,
    pub runs: u32,
    pub nprocs: u32,
    pub start_id: u32,
    pub verbosity: u32,
    pub log_components: Vec<String>,
    pub notify_email: Option<String>,
    pub message_file: String,
    pub optimized: bool,
    pub debug: bool,
    pub visualize: bool,
    pub test_mode: bool,
    pub show_cmd: bool,
    pub no_email: bool,
}

impl AppConfig {
    /// Build the final config: defaults -> config file -> CLI overrides.
    ///
    /// Values stay `None` until the very end so the test-mode profile can
    /// tell "still at the default" apart from "explicitly set to the
    /// default value".
    pub fn resolve(cli: &Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let file_cfg = if let Some(path) = &cli.config {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read config file {}: {}", path.display(), e))?;
            toml::from_str::<FileConfig>(&contents)
                .map_err(|e| format!("failed to parse config file: {}", e))?
        } else {
            FileConfig::default()
        };

        // CLI wins over the file; either counts as explicitly set.
        let mut topologies = cli.topologies.clone().or(file_cfg.simulation.topologies);
        let mut disasters = cli.disasters.clone().or(file_cfg.simulation.disasters);
        let mut fail_probs = cli.fprobs.clone().or(file_cfg.simulation.fail_probs);
        let mut heuristics = cli.heuristics.clone().or(file_cfg.simulation.heuristics);
        let topology_type = cli.topology_type.clone().or(file_cfg.simulation.topology_type);
        let mut runs = cli.runs.or(file_cfg.execution.runs);
        let mut nprocs = cli.nprocs.or(file_cfg.execution.processes);
        let start_id = cli.start.or(file_cfg.execution.start_id);
        let mut no_email = cli.no_email;

        // Quick-test profile: collapse whatever is still at its default
        // to a single short run, never an explicitly supplied value.
        if cli.test {
            no_email = true;
            if runs.is_none() {
                runs = Some(1);
            }
            if nprocs.is_none() {
                nprocs = Some(1);
            }
            if heuristics.is_none() {
                heuristics = Some(vec![DEFAULT_HEURISTICS[0].to_string()]);
            }
            if topologies.is_none() {
                topologies = Some(vec![TEST_TOPOLOGY.to_string()]);
                if disasters.is_none() {
                    disasters = Some(vec![TEST_DISASTER.to_string()]);
                }
            }
            if fail_probs.is_none() {
                fail_probs = Some(vec![TEST_FAIL_PROB.to_string()]);
            }
        }

        let topologies = topologies
            .unwrap_or_else(|| DEFAULT_TOPOLOGIES.iter().map(|s| s.to_string()).collect());
        let heuristics = heuristics
            .unwrap_or_else(|| DEFAULT_HEURISTICS.iter().map(|s| s.to_string()).collect());
        let fail_probs = fail_probs
            .unwrap_or_else(|| DEFAULT_FAIL_PROBS.iter().map(|s| s.to_string()).collect());
        let runs = runs.unwrap_or(DEFAULT_RUNS);
        let nprocs = nprocs.unwrap_or(DEFAULT_NPROCS);
        let start_id = start_id.unwrap_or(DEFAULT_START);
        let verbosity = cli.verbose.flatten().unwrap_or(DEFAULT_VERBOSITY);

        if runs == 0 {
            return Err("--runs must be at least 1".into());
        }
        if nprocs == 0 {
            return Err("--nprocs must be at least 1".into());
        }
        if topologies.is_empty() {
            return Err("at least one topology must be selected".into());
        }

        let disasters = resolve_disasters(&topologies, disasters.as_deref())?;

        Ok(Self {
            topologies,
            topology_type: topology_type.unwrap_or_else(|| DEFAULT_TOPOLOGY_TYPE.to_string()),
            disasters,
            fail_probs,
            heuristics,
            runs,
            nprocs,
            start_id,
            verbosity,
            log_components: cli.log.clone().unwrap_or_default(),
            notify_email: file_cfg.notify.email,
            message_file: file_cfg
                .notify
                .message_file
                .unwrap_or_else(|| DEFAULT_MESSAGE_FILE.to_string()),
            optimized: cli.optimized,
            debug: cli.debug,
            visualize: cli.visualize,
            test_mode: cli.test,
            show_cmd: cli.show_cmd,
            no_email,
        })
    }
}

/// An explicit override is joined and applied to every topology alike;
/// otherwise each topology uses its fixed default locations.
fn resolve_disasters(
    topologies: &[String],
    overrides: Option<&[String]>,
) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let mut map = HashMap::with_capacity(topologies.len());
    for topology in topologies {
        let spec = match overrides {
            Some(list) => format!("\"{}\"", list.join("-")),
            None => default_disaster(topology)
                .ok_or_else(|| {
                    format!(
                        "no default disaster locations for topology {}; pass --disasters",
                        topology
                    )
                })?
                .to_string(),
        };
        map.insert(topology.clone(), spec);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(args: &[&str]) -> Result<AppConfig, Box<dyn std::error::Error>> {
        let mut argv = vec!["geocron-runner"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;
        AppConfig::resolve(&cli)
    }

    #[test]
    fn defaults_applied_when_nothing_is_given() {
        let cfg = resolve(&[]).unwrap();
        assert_eq!(cfg.topologies, vec!["3356"]);
        assert_eq!(cfg.topology_type, "rocketfuel");
        assert_eq!(cfg.runs, 20);
        assert_eq!(cfg.nprocs, 8);
        assert_eq!(cfg.start_id, 0);
        assert_eq!(cfg.verbosity, 0);
        assert_eq!(cfg.heuristics.len(), 7);
        assert_eq!(cfg.fail_probs.len(), 5);
        assert_eq!(
            cfg.disasters["3356"],
            "\"New_York,_NY-Los_Angeles,_CA-Miami,_FL\""
        );
        assert!(!cfg.no_email);
    }

    #[test]
    fn test_mode_collapses_defaults() {
        let cfg = resolve(&["--test"]).unwrap();
        assert_eq!(cfg.runs, 1);
        assert_eq!(cfg.nprocs, 1);
        assert_eq!(cfg.heuristics, vec!["rand"]);
        assert_eq!(cfg.topologies, vec!["3356"]);
        assert_eq!(cfg.fail_probs, vec!["0.5"]);
        assert_eq!(cfg.disasters["3356"], "\"2,2\"");
        assert!(cfg.no_email);
        assert!(cfg.test_mode);
    }

    #[test]
    fn test_mode_preserves_explicit_values() {
        let cfg = resolve(&["--test", "--runs", "7", "--heuristics", "far", "close"]).unwrap();
        assert_eq!(cfg.runs, 7);
        assert_eq!(cfg.heuristics, vec!["far", "close"]);
        // untouched options still collapse
        assert_eq!(cfg.nprocs, 1);
        assert_eq!(cfg.fail_probs, vec!["0.5"]);
    }

    #[test]
    fn explicit_value_equal_to_default_is_still_explicit() {
        let cfg = resolve(&["--test", "--runs", "20"]).unwrap();
        assert_eq!(cfg.runs, 20);
    }

    #[test]
    fn test_mode_keeps_default_disasters_for_explicit_topologies() {
        let cfg = resolve(&["--test", "--as", "1755"]).unwrap();
        assert_eq!(cfg.topologies, vec!["1755"]);
        assert_eq!(
            cfg.disasters["1755"],
            "\"Amsterdam,_Netherlands-London,_UnitedKingdom-Paris,_France\""
        );
    }

    #[test]
    fn disaster_override_applies_to_all_topologies() {
        let cfg = resolve(&[
            "--as",
            "3356",
            "1755",
            "--disasters",
            "Reno,_NV",
            "Boston,_MA",
        ])
        .unwrap();
        assert_eq!(cfg.disasters["3356"], "\"Reno,_NV-Boston,_MA\"");
        assert_eq!(cfg.disasters["1755"], "\"Reno,_NV-Boston,_MA\"");
    }

    #[test]
    fn unknown_topology_without_override_is_rejected() {
        assert!(resolve(&["--as", "9999"]).is_err());
        assert!(resolve(&["--as", "9999", "--disasters", "Lisbon,_Portugal"]).is_ok());
    }

    #[test]
    fn out_of_range_counts_are_rejected() {
        assert!(resolve(&["--runs", "0"]).is_err());
        assert!(resolve(&["--nprocs", "0"]).is_err());
    }

    #[test]
    fn nprocs_flag_without_value_means_one() {
        let cfg = resolve(&["--nprocs"]).unwrap();
        assert_eq!(cfg.nprocs, 1);
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(resolve(&[]).unwrap().verbosity, 0);
        assert_eq!(resolve(&["--verbose"]).unwrap().verbosity, 0);
        assert_eq!(resolve(&["--verbose", "2"]).unwrap().verbosity, 2);
    }

    #[test]
    fn file_values_merge_under_cli_overrides() {
        let path = std::env::temp_dir().join(format!(
            "geocron-runner-test-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
[simulation]
topologies = ["1239"]

[execution]
runs = 4
processes = 2

[notify]
email = "ops@example.net"
"#,
        )
        .unwrap();

        let cfg = resolve(&["--config", path.to_str().unwrap(), "--runs", "6"]).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.topologies, vec!["1239"]);
        assert_eq!(cfg.runs, 6); // CLI wins over the file
        assert_eq!(cfg.nprocs, 2);
        assert_eq!(cfg.notify_email.as_deref(), Some("ops@example.net"));
        assert_eq!(cfg.message_file, "done_sims.email");
    }

    #[test]
    fn file_values_count_as_explicit_for_test_mode() {
        let path = std::env::temp_dir().join(format!(
            "geocron-runner-test-explicit-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[execution]\nruns = 12\n").unwrap();

        let cfg = resolve(&["--config", path.to_str().unwrap(), "--test"]).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.runs, 12);
        assert_eq!(cfg.nprocs, 1);
    }
}
