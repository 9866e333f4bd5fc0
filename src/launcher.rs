use std::io;
use std::process::{Child, Command};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::command;
use crate::config::AppConfig;
use crate::partition;

const BUILD_COMMAND: &str = "./waf build";
const LOG_ENV_VAR: &str = "NS_LOG";
const MAIL_COMMAND: &str = "ssmtp";
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Spawn `cmd` through the shell. The simulator logging components are
/// scoped to that one child instead of the whole launcher environment.
fn spawn_shell(cmd: &str, log_env: Option<&str>) -> io::Result<Child> {
    let mut shell = Command::new("sh");
    shell.arg("-c").arg(cmd);
    if let Some(components) = log_env {
        shell.env(LOG_ENV_VAR, components);
    }
    shell.spawn()
}

pub fn run(cfg: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.show_cmd {
        if let Some(cmd) = command::commands(cfg).next() {
            println!("{}", cmd);
        }
        return Ok(());
    }

    if cfg.verbosity > 0 {
        println!("Starting geocron simulation batch");
        println!("Topologies: {}", cfg.topologies.join(" "));
        if cfg.test_mode {
            println!("Test profile: collapsed to a single short run");
        }
    }

    if cfg.optimized {
        // TODO: reconfigure waf in optimized mode before building
        eprintln!("note: --optimized is not wired up yet");
    }

    let log_env = if cfg.log_components.is_empty() {
        None
    } else {
        Some(cfg.log_components.join(":"))
    };

    // Build once up front when several instances are about to need it.
    if cfg.nprocs > 1 {
        let status = spawn_shell(BUILD_COMMAND, log_env.as_deref())?.wait()?;
        if !status.success() {
            return Err("simulator build failed; no instances were started".into());
        }
    }

    if partition::underprovisioned(cfg) {
        eprintln!(
            "WARNING: more topologies selected than processes to run; \
             some topologies will not get a process"
        );
    } else if cfg.verbosity > 0 {
        println!(
            "Running {} processes for each of {} topologies",
            cfg.nprocs / cfg.topologies.len() as u32,
            cfg.topologies.len()
        );
    }

    let children: Arc<Mutex<Vec<Child>>> = Arc::new(Mutex::new(Vec::new()));

    {
        let children = Arc::clone(&children);
        ctrlc::set_handler(move || {
            let mut held = children.lock().unwrap();
            for child in held.iter_mut() {
                let _ = child.kill();
            }
            std::process::exit(1);
        })?;
    }

    for cmd in command::commands(cfg) {
        if cfg.verbosity > 0 {
            println!("{}", cmd);
        }
        let child = spawn_shell(&cmd, log_env.as_deref())?;
        children.lock().unwrap().push(child);
    }

    wait_for_all(&children)?;

    if !cfg.no_email {
        notify(cfg);
    }
    Ok(())
}

/// Children stay in the shared list for the whole wait so the interrupt
/// handler can still reach every one of them.
fn wait_for_all(children: &Mutex<Vec<Child>>) -> io::Result<()> {
    loop {
        let mut running = false;
        {
            let mut held = children.lock().unwrap();
            for child in held.iter_mut() {
                if child.try_wait()?.is_none() {
                    running = true;
                }
            }
        }
        if !running {
            return Ok(());
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn notify(cfg: &AppConfig) {
    let Some(recipient) = &cfg.notify_email else {
        return;
    };
    let cmd = format!("{} {} < {}", MAIL_COMMAND, recipient, cfg.message_file);
    match spawn_shell(&cmd, None) {
        Ok(mut child) => {
            let _ = child.wait();
        }
        Err(e) => eprintln!("failed to send completion email: {}", e),
    }
}
