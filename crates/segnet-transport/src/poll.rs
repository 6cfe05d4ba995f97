//! Readiness multiplexing.
//!
//! The server loop depends on this trait rather than on a particular
//! syscall, so tests can drive it with scripted readiness and the syscall
//! backend stays swappable.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Wait until one or more descriptors are readable.
pub trait Readiness {
    /// Block until at least one of `fds` is readable (or errored or hung
    /// up), returning the ready subset. An empty return means the wait
    /// timed out.
    fn wait_readable(&mut self, fds: &[RawFd]) -> io::Result<Vec<RawFd>>;
}

/// `poll(2)`-backed readiness.
#[derive(Debug, Default)]
pub struct PollReadiness {
    timeout: Option<Duration>,
}

impl PollReadiness {
    /// Wait indefinitely.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Wake up after `timeout` even with nothing ready, so the caller can
    /// check its shutdown flag.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl Readiness for PollReadiness {
    fn wait_readable(&mut self, fds: &[RawFd]) -> io::Result<Vec<RawFd>> {
        let mut pollfds: Vec<libc::pollfd> = fds
            .iter()
            .map(|&fd| libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        let timeout_ms = match self.timeout {
            Some(t) => t.as_millis().min(i32::MAX as u128) as i32,
            None => -1,
        };

        loop {
            // SAFETY: pollfds is a valid, initialized slice for the whole
            // call and the length matches.
            let rc = unsafe {
                libc::poll(
                    pollfds.as_mut_ptr(),
                    pollfds.len() as libc::nfds_t,
                    timeout_ms,
                )
            };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            let ready = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
            return Ok(pollfds
                .iter()
                .filter(|p| p.revents & ready != 0)
                .map(|p| p.fd)
                .collect());
        }
    }
}
