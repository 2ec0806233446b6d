//! The debugging control interface the tracer drives.

use std::os::unix::io::AsRawFd;

use libc::c_long;
use log::{debug, info, trace};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::ptrace;
use nix::sys::signal::{kill, SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::arch::{Arch, Native};
use crate::error::{Error, Request, Result};

/// Unit of memory transferred by `PTRACE_PEEKDATA`/`PTRACE_POKEDATA`.
pub type Word = c_long;

/// Why a wait on the tracee returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Stopped by SIGTRAP, possibly one of ours.
    Trap,
    /// Stopped by any other signal, which should be passed on.
    Signal(Signal),
    Exited(i32),
    Killed(Signal),
    /// SIGINT or SIGTERM reached the tracer.
    Interrupted,
}

pub trait Tracee {
    type Arch: Arch;

    fn pid(&self) -> Pid;

    /// Blocks until the tracee changes state.
    fn wait(&mut self) -> Result<Stop>;

    fn cont(&mut self, signal: Option<Signal>) -> Result<()>;

    fn read_word(&mut self, address: u64) -> Result<Word>;

    fn write_word(&mut self, address: u64, word: Word) -> Result<()>;

    fn regs(&mut self) -> Result<<Self::Arch as Arch>::Regs>;

    fn set_regs(&mut self, regs: <Self::Arch as Arch>::Regs) -> Result<()>;

    /// Asks a running tracee to stop so it can be modified.
    fn stop(&mut self) -> Result<()>;

    fn detach(&mut self) -> Result<()>;
}

/// Upper bound on one idle wait for a signal, in milliseconds.
const SIGNAL_POLL_MS: libc::c_int = 100;

/// Signals the tracer reads from its signal descriptor instead of handling.
fn watched_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set.add(Signal::SIGCHLD);
    set
}

/// Blocks SIGINT, SIGTERM and SIGCHLD in the calling thread.
///
/// They stay pending until a [`PtraceTracee`] on this thread reads them, so
/// an interrupt is never lost between two waits. Called by
/// [`PtraceTracee::attach`]; call it earlier to also catch interrupts that
/// arrive before the attach.
pub fn block_interrupts() -> nix::Result<()> {
    watched_signals().thread_block()
}

/// A process controlled through `ptrace(2)`.
pub struct PtraceTracee {
    pid: Pid,
    signals: SignalFd,
}

impl PtraceTracee {
    /// Attaches to `pid` and waits for the attach stop.
    ///
    /// Must be used from the thread that attached.
    pub fn attach(pid: Pid) -> Result<Self> {
        block_interrupts().map_err(|source| Error::Attach { pid, source })?;
        let flags = SfdFlags::SFD_CLOEXEC | SfdFlags::SFD_NONBLOCK;
        let signals = SignalFd::with_flags(&watched_signals(), flags)
            .map_err(|source| Error::Attach { pid, source })?;
        ptrace::attach(pid).map_err(|source| Error::Attach { pid, source })?;
        info!("Attached to {}", pid);
        loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::Stopped(_, signal)) => {
                    debug!("Attach stop: pid {}, signal {}", pid, signal);
                    return Ok(PtraceTracee { pid, signals });
                }
                Ok(WaitStatus::Exited(_, code)) => {
                    return Err(Error::AttachLost {
                        pid,
                        reason: format!("exited with {}", code),
                    })
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    return Err(Error::AttachLost {
                        pid,
                        reason: format!("killed by {}", signal),
                    })
                }
                Ok(status) => debug!("Ignoring {:?} while attaching", status),
                Err(Errno::EINTR) => continue,
                Err(source) => return Err(Error::Attach { pid, source }),
            }
        }
    }

    /// Waits for a watched signal, at most [`SIGNAL_POLL_MS`]. Returns `true`
    /// once an interrupt is pending.
    ///
    /// SIGCHLD only shortens the wait: in a multi-threaded process another
    /// thread may take it, so the caller polls the tracee again either way.
    fn poll_interrupt(&mut self) -> Result<bool> {
        let mut fds = [PollFd::new(self.signals.as_raw_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, SIGNAL_POLL_MS) {
            Ok(_) | Err(Errno::EINTR) => {}
            Err(source) => return Err(Error::control(Request::Wait)(source)),
        }
        while let Some(info) = self
            .signals
            .read_signal()
            .map_err(Error::control(Request::Wait))?
        {
            trace!("Tracer got signal {}", info.ssi_signo);
            if info.ssi_signo != libc::SIGCHLD as u32 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn address(address: u64) -> ptrace::AddressType {
        address as usize as ptrace::AddressType
    }
}

impl Tracee for PtraceTracee {
    type Arch = Native;

    fn pid(&self) -> Pid {
        self.pid
    }

    fn wait(&mut self) -> Result<Stop> {
        loop {
            trace!("Tracer waiting");
            let status = match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {
                    if self.poll_interrupt()? {
                        return Ok(Stop::Interrupted);
                    }
                    continue;
                }
                Ok(status) => status,
                Err(Errno::EINTR) => continue,
                Err(source) => {
                    return Err(Error::Control {
                        request: Request::Wait,
                        source,
                    })
                }
            };
            match status {
                WaitStatus::Stopped(_, Signal::SIGTRAP) => return Ok(Stop::Trap),
                WaitStatus::Stopped(pid, signal) => {
                    debug!("Stopped: pid {}, signal {}", pid, signal);
                    return Ok(Stop::Signal(signal));
                }
                WaitStatus::Exited(pid, code) => {
                    debug!("Exited: pid {}, ret {}", pid, code);
                    return Ok(Stop::Exited(code));
                }
                WaitStatus::Signaled(pid, signal, dumped) => {
                    debug!("Signaled: pid {}, signal {}, dumped {}", pid, signal, dumped);
                    return Ok(Stop::Killed(signal));
                }
                other => debug!("Ignoring wait status {:?}", other),
            }
        }
    }

    fn cont(&mut self, signal: Option<Signal>) -> Result<()> {
        trace!("Continuing PID {}", self.pid);
        ptrace::cont(self.pid, signal).map_err(Error::control(Request::Continue))
    }

    fn read_word(&mut self, address: u64) -> Result<Word> {
        ptrace::read(self.pid, Self::address(address)).map_err(Error::control(Request::PeekData))
    }

    fn write_word(&mut self, address: u64, word: Word) -> Result<()> {
        unsafe { ptrace::write(self.pid, Self::address(address), word as ptrace::AddressType) }
            .map_err(Error::control(Request::PokeData))
    }

    fn regs(&mut self) -> Result<<Native as Arch>::Regs> {
        ptrace::getregs(self.pid).map_err(Error::control(Request::GetRegs))
    }

    fn set_regs(&mut self, regs: <Native as Arch>::Regs) -> Result<()> {
        ptrace::setregs(self.pid, regs).map_err(Error::control(Request::SetRegs))
    }

    fn stop(&mut self) -> Result<()> {
        kill(self.pid, Signal::SIGSTOP).map_err(Error::control(Request::Stop))
    }

    fn detach(&mut self) -> Result<()> {
        ptrace::detach(self.pid, None).map_err(Error::control(Request::Detach))?;
        info!("Detached from {}", self.pid);
        Ok(())
    }
}
