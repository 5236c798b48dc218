//! Process inspection helpers.

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System};

/// Whether an OS process with `pid` still exists. Zombies count as gone.
pub fn is_process_alive(pid: u32) -> bool {
    let mut sys = System::new();
    let sys_pid = Pid::from(pid as usize);
    sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new());
    sys.process(sys_pid)
        .map(|process| !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
        .unwrap_or(false)
}
