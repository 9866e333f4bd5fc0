use crate::config::AppConfig;
use crate::partition::{self, WorkAssignment};

const PROGRAM: &str = "geocron-example";
const LATENCIES_FILE: &str = "rocketfuel/weights/all_latencies.intra";
const LOCATIONS_FILE: &str = "rocketfuel/city_locations.txt";
const CONTACT_ATTEMPTS: u32 = 20;
const CONTACT_TIMEOUT: &str = "0.5";

/// Render the waf invocation for one worker. Everything between the
/// single quotes is the simulator's argument template; waf substitutes
/// the program path for the literal `%s`.
pub fn render(cfg: &AppConfig, work: &WorkAssignment) -> String {
    let mut cmd = format!("./waf --run {} --command-template='", PROGRAM);
    if cfg.debug {
        cmd.push_str("gdb --args ");
    }
    cmd.push_str("%s ");

    cmd.push_str(&format!(
        "--ns3::GeocronExperiment::TopologyType={} ",
        cfg.topology_type
    ));
    cmd.push_str(&format!("--disaster={} ", cfg.disasters[&work.topology]));

    // The file selector is the worker index, not a topology path, so
    // concurrent workers of one topology write to distinct locations.
    cmd.push_str(&format!("--file={} ", work.worker_index));

    cmd.push_str(&format!("--fail_prob=\"{}\" ", cfg.fail_probs.join("-")));
    cmd.push_str(&format!("--runs={} ", work.run_count));
    cmd.push_str(&format!("--start_run={} ", work.start_run_id));
    cmd.push_str(&format!("--heuristic=\"{}\" ", cfg.heuristics.join("-")));

    cmd.push_str(&format!("--latencies={} ", LATENCIES_FILE));
    cmd.push_str(&format!("--locations={} ", LOCATIONS_FILE));
    cmd.push_str(&format!(
        "--contact_attempts={} --timeout={}",
        CONTACT_ATTEMPTS, CONTACT_TIMEOUT
    ));

    if cfg.verbosity > 0 {
        cmd.push_str(&format!(" --verbose={}", cfg.verbosity));
    }
    cmd.push('\'');

    if cfg.visualize {
        cmd.push_str(" --visualize");
    }
    cmd
}

/// One command string per worker, topology order then worker order.
pub fn commands(cfg: &AppConfig) -> impl Iterator<Item = String> + '_ {
    partition::assignments(cfg).map(move |work| render(cfg, &work))
}
