//! Best-effort termination of running application instances.
//!
//! A previous build of the app may still be running from `dist/`, holding
//! files the cleanup stage needs to delete. Instances are matched by display
//! name and signalled; finding nothing, or failing to signal, is not an error.

use std::ffi::OsStr;
use std::path::Path;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, Signal, System, UpdateKind};

/// Signals running processes belonging to an application.
pub trait ProcessTerminator: Send + Sync {
    /// Signals every process that belongs to `app_name` and returns how many
    /// were signalled. Never fails.
    fn terminate(&self, app_name: &str) -> usize;
}

/// Enumerates the host process table through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoTerminator;

impl ProcessTerminator for SysinfoTerminator {
    fn terminate(&self, app_name: &str) -> usize {
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let own_pid = sysinfo::get_current_pid().ok();
        let bundle_dir = format!("{app_name}.app");
        let mut signalled = 0;

        for (pid, process) in sys.processes() {
            if Some(*pid) == own_pid {
                continue;
            }
            if !belongs_to_app(process.name(), process.exe(), app_name, &bundle_dir) {
                continue;
            }

            // SIGTERM where supported, SIGKILL otherwise
            let delivered = process
                .kill_with(Signal::Term)
                .unwrap_or_else(|| process.kill());

            if delivered {
                log::info!("Signalled running instance {} (pid {})", app_name, pid);
                signalled += 1;
            } else {
                log::warn!("Could not signal {} (pid {}), continuing", app_name, pid);
            }
        }

        signalled
    }
}

/// Does nothing. Used when termination is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTerminator;

impl ProcessTerminator for NoopTerminator {
    fn terminate(&self, _app_name: &str) -> usize {
        0
    }
}

/// A process belongs to the app if its name is the display name or its
/// executable lives inside `<name>.app`.
fn belongs_to_app(name: &OsStr, exe: Option<&Path>, app_name: &str, bundle_dir: &str) -> bool {
    name == OsStr::new(app_name)
        || exe.is_some_and(|path| {
            path.components()
                .any(|component| component.as_os_str() == OsStr::new(bundle_dir))
        })
}

/// Runs the terminate stage.
pub fn terminate_stale_instances(app_name: &str, terminator: &dyn ProcessTerminator) -> usize {
    log::info!("Terminating stale instances of {}", app_name);
    let count = terminator.terminate(app_name);
    if count == 0 {
        log::debug!("No running instance of {} found", app_name);
    }
    count
}
