use crate::config::AppConfig;

/// One simulator process worth of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkAssignment {
    pub topology: String,
    pub worker_index: u32,
    pub run_count: u32,
    pub start_run_id: u32,
}

/// Split `total` into `parts` ordered shares. Every share gets
/// `total / parts`; the first `total % parts` shares get one extra, so
/// the shares always sum to `total`.
pub fn fair_shares(total: u32, parts: u32) -> Vec<u32> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let extra = total % parts;
    (0..parts)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// True when there are fewer processes than topologies. Debug runs skip
/// the warning this feeds.
pub fn underprovisioned(cfg: &AppConfig) -> bool {
    !cfg.debug && (cfg.nprocs as usize) < cfg.topologies.len()
}

fn worker_assignments(
    topology: &str,
    workers: u32,
    runs: u32,
    start_id: u32,
) -> Vec<WorkAssignment> {
    let mut out = Vec::with_capacity(workers as usize);
    let mut next_start = start_id;
    for (i, run_count) in fair_shares(runs, workers).into_iter().enumerate() {
        out.push(WorkAssignment {
            topology: topology.to_string(),
            worker_index: i as u32,
            run_count,
            start_run_id: next_start,
        });
        next_start += run_count;
    }
    out
}

/// Assign processes to topologies and runs to processes, in topology
/// order then worker-index order. A topology that comes away with zero
/// processes yields nothing. Pure: identical configs always produce the
/// identical sequence.
pub fn assignments(cfg: &AppConfig) -> impl Iterator<Item = WorkAssignment> + '_ {
    let shares = fair_shares(cfg.nprocs, cfg.topologies.len() as u32);
    cfg.topologies
        .iter()
        .zip(shares)
        .flat_map(move |(topology, workers)| {
            worker_assignments(topology, workers, cfg.runs, cfg.start_id)
        })
}
