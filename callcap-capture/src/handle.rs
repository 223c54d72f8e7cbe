//! One tcpdump invocation.

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::launcher::{CaptureProcess, CaptureRequest};
use crate::CaptureError;

/// Owns a background capture process writing one pcap file.
///
/// The process is put in its own process group so a terminal interrupt
/// reaches the daemon only; the daemon stops its captures itself.
#[derive(Debug)]
pub struct CaptureHandle {
    name: String,
    program: PathBuf,
    request: CaptureRequest,
    debug: bool,
    grace: Duration,
    child: Option<Child>,
}

impl CaptureHandle {
    pub fn new(program: PathBuf, request: CaptureRequest, debug: bool) -> Self {
        Self {
            name: request.name(),
            program,
            request,
            debug,
            grace: Duration::ZERO,
            child: None,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(&self.request.interface)
            .arg("-n")
            .arg("-U")
            .arg("-w")
            .arg(&self.request.output)
            .arg(self.request.filter())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);
        cmd
    }

    /// Spawn the capture and check it is still alive after the grace period.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.child.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let mut cmd = self.command();
        if self.debug {
            debug!("Launching capture: {:?}", cmd);
        }

        let mut child = cmd.spawn().map_err(|source| CaptureError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if !self.grace.is_zero() {
            std::thread::sleep(self.grace);
        }
        match child.try_wait() {
            Ok(Some(status)) => return Err(CaptureError::ExitedEarly(status)),
            Ok(None) => {}
            Err(e) => warn!("Could not poll capture {}: {}", self.name, e),
        }

        self.child = Some(child);
        Ok(())
    }
}

impl CaptureProcess for CaptureHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!("Capture {} already exited ({})", self.name, status);
            return;
        }

        // SIGTERM lets tcpdump flush the pcap file.
        let terminated = i32::try_from(child.id())
            .map(|pid| kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok())
            .unwrap_or(false);
        if !terminated {
            if let Err(e) = child.kill() {
                warn!("Failed to kill capture {}: {}", self.name, e);
            }
        }

        if let Ok(None) = child.try_wait() {
            let name = self.name.clone();
            std::thread::spawn(move || {
                if let Err(e) = child.wait() {
                    warn!("Failed to reap capture {}: {}", name, e);
                }
            });
        }
    }

    fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::Protocol;

    fn handle(program: &str, output: PathBuf) -> CaptureHandle {
        CaptureHandle::new(
            PathBuf::from(program),
            CaptureRequest {
                protocol: Protocol::Udp,
                interface: "lo".into(),
                output,
                port: 30000,
            },
            true,
        )
    }

    #[test]
    fn stop_before_start_is_noop() {
        let mut h = handle("tcpdump", PathBuf::from("x.pcap"));
        h.stop();
        h.stop();
        assert!(!h.is_running());
    }

    /// A stand-in for tcpdump that ignores its arguments and stays alive.
    fn fake_tcpdump(dir: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-tcpdump");
        std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn start_then_stop_twice() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_tcpdump(dir.path());
        let mut h = handle(program.to_str().unwrap(), dir.path().join("a.pcap"));

        // A concurrently forking test can briefly hold the script open (ETXTBSY).
        let mut attempts = 0;
        loop {
            match h.start() {
                Ok(()) => break,
                Err(CaptureError::Spawn { source, .. })
                    if source.raw_os_error() == Some(26) && attempts < 10 =>
                {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => panic!("start failed: {e}"),
            }
        }

        assert!(h.is_running());
        assert_eq!(h.name(), "a.pcap");
        assert!(matches!(h.start(), Err(CaptureError::AlreadyRunning)));
        h.stop();
        assert!(!h.is_running());
        h.stop();
    }

    #[test]
    fn immediate_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut h =
            handle("false", dir.path().join("b.pcap")).with_grace(Duration::from_millis(200));
        assert!(matches!(h.start(), Err(CaptureError::ExitedEarly(_))));
        assert!(!h.is_running());
    }
}
