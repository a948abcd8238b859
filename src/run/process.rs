use crate::error::LaunchError;

/// Whether `pid` names a live process. A process we may not signal still
/// counts as alive; an exited but unreaped one does not.
#[cfg(unix)]
#[must_use]
pub fn is_alive(pid: u32) -> bool {
    let Some(raw) = to_pid(pid) else {
        return false;
    };
    // Safety: signal 0 only performs the existence and permission check.
    let rc = unsafe { libc::kill(raw, 0) };
    if rc == 0 {
        return !is_zombie(pid);
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// A detached worker's new parent may never reap it.
#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            stat.rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

#[cfg(all(unix, not(target_os = "linux")))]
const fn is_zombie(_pid: u32) -> bool {
    false
}

/// Whether [`is_alive`] can tell a dead pid from a live one here.
pub const CAN_PROBE_PIDS: bool = cfg!(unix);

/// Without pid probes every pid is assumed alive; check [`CAN_PROBE_PIDS`]
/// before polling on it.
#[cfg(not(unix))]
#[must_use]
pub const fn is_alive(_pid: u32) -> bool {
    true
}

/// Send SIGTERM to `pid`. Returns false when the process is already gone.
///
/// # Errors
///
/// Returns `LaunchError::Signal` when the kernel refuses the signal, or
/// `LaunchError::SignalsUnsupported` off unix.
#[cfg(unix)]
pub fn send_terminate(pid: u32) -> Result<bool, LaunchError> {
    let Some(raw) = to_pid(pid) else {
        return Ok(false);
    };
    // Safety: plain kill(2) on a single positive pid, no memory is shared.
    let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
    if rc == 0 {
        return Ok(true);
    }
    let source = std::io::Error::last_os_error();
    if source.raw_os_error() == Some(libc::ESRCH) {
        return Ok(false);
    }
    Err(LaunchError::Signal { pid, source })
}

#[cfg(not(unix))]
pub const fn send_terminate(_pid: u32) -> Result<bool, LaunchError> {
    Err(LaunchError::SignalsUnsupported)
}

/// Non-positive pids address process groups in kill(2); never produce one.
#[cfg(unix)]
fn to_pid(pid: u32) -> Option<libc::pid_t> {
    libc::pid_t::try_from(pid).ok().filter(|raw| *raw > 0)
}
