use std::{path::Path, process::Stdio};

use anyhow::{anyhow, bail, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

/// Terminates every other process running the executable at `name`. Returns how many were
/// stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Failed to get own pid {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            // SIGTERM lets the daemon flush its state. Windows has no equivalent, there the
            // process is terminated.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Stops running daemons and starts a new one for `dir`. The daemon detaches itself.
pub fn restart_server(daemon: &Path, dir: &Path) -> Result<()> {
    kill_previous_servers(daemon)?;
    let mut command = std::process::Command::new(daemon);
    command.arg("--dir").arg(dir);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    info!("Spawning {daemon:?}");
    // Returns quickly: the daemon detaches itself (fork on unix, a detached copy on Windows)
    // and the launched process exits.
    let status = command.status()?;
    if !status.success() {
        bail!("Daemon failed to start: {status}");
    }
    Ok(())
}
