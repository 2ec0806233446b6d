//! The breakpoint tracer: install a trap at every function entry, then keep
//! the tracee running and take each trap out the first time it fires.

use std::collections::HashSet;
use std::fmt;
use std::io::Write;

use log::{debug, info, trace, warn};
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::arch::Arch;
use crate::breakpoint::Breakpoint;
use crate::elf::SymbolRecord;
use crate::error::Result;
use crate::ptrace::{PtraceTracee, Stop, Tracee};

/// How a tracing session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited(i32),
    Killed(Signal),
    /// The tracer was interrupted and let the process go.
    Detached,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Exited(code) => write!(f, "process exited with status {}", code),
            Outcome::Killed(signal) => write!(f, "process killed by {}", signal),
            Outcome::Detached => f.write_str("detached from process"),
        }
    }
}

pub struct Tracer<T: Tracee, W: Write> {
    tracee: T,
    breakpoints: Vec<Breakpoint>,
    /// Addresses in `breakpoints`, for the duplicate check on install.
    installed: HashSet<u64>,
    out: W,
}

impl<T: Tracee, W: Write> Tracer<T, W> {
    /// Takes over an attached tracee. Trace lines are written to `out`.
    pub fn new(tracee: T, out: W) -> Self {
        Tracer {
            tracee,
            breakpoints: Vec::new(),
            installed: HashSet::new(),
            out,
        }
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn tracee(&self) -> &T {
        &self.tracee
    }

    /// Installs a breakpoint per record, in record order.
    ///
    /// Records sharing an address with an installed breakpoint are skipped,
    /// since a second install would save the trap as the original code.
    pub fn install(&mut self, records: &[SymbolRecord]) -> Result<()> {
        self.breakpoints.reserve(records.len());
        self.installed.reserve(records.len());
        for record in records {
            if self.installed.contains(&record.address) {
                debug!(
                    "{} shares {:#x} with an installed breakpoint, skipping",
                    record.name, record.address
                );
                continue;
            }
            writeln!(
                self.out,
                "setting breakpoint on {:#x} ({})",
                record.address, record.name
            )?;
            let bp = Breakpoint::install(&mut self.tracee, record)?;
            self.installed.insert(bp.address());
            self.breakpoints.push(bp);
        }
        info!(
            "Installed {} breakpoints in {}",
            self.breakpoints.len(),
            self.tracee.pid()
        );
        Ok(())
    }

    /// Removes the breakpoint that caused the current SIGTRAP stop, if any.
    ///
    /// Returns the index of the breakpoint taken out, `None` when the trap
    /// did not come from an armed breakpoint.
    pub fn handle_trap(&mut self) -> Result<Option<usize>> {
        let mut regs = self.tracee.regs()?;
        let ip = <T::Arch as Arch>::instruction_pointer(&regs);
        let index = match self.breakpoints.iter().position(|bp| {
            bp.is_armed() && <T::Arch as Arch>::trap_return_address(bp.address()) == ip
        }) {
            Some(index) => index,
            None => {
                debug!("Trap at {:#x} is not ours", ip);
                return Ok(None);
            }
        };

        let bp = &mut self.breakpoints[index];
        writeln!(
            self.out,
            "removing breakpoint on {:#x} ({})",
            bp.address(),
            bp.name()
        )?;
        bp.remove(&mut self.tracee)?;
        // resume at the original first instruction
        <T::Arch as Arch>::set_instruction_pointer(&mut regs, bp.address());
        self.tracee.set_regs(regs)?;
        Ok(Some(index))
    }

    /// Resumes the tracee and services its stops until it goes away or the
    /// tracer is interrupted.
    pub fn run(&mut self) -> Result<Outcome> {
        let mut pending = None;
        loop {
            self.tracee.cont(pending.take())?;
            match self.tracee.wait()? {
                Stop::Trap => {
                    self.handle_trap()?;
                }
                Stop::Signal(signal) => {
                    trace!("Passing {} on to {}", signal, self.tracee.pid());
                    pending = Some(signal);
                }
                Stop::Exited(code) => return Ok(Outcome::Exited(code)),
                Stop::Killed(signal) => return Ok(Outcome::Killed(signal)),
                Stop::Interrupted => return self.interrupt(),
            }
        }
    }

    /// Brings the running tracee to a stop, then restores it and detaches.
    fn interrupt(&mut self) -> Result<Outcome> {
        info!("Interrupted, releasing {}", self.tracee.pid());
        self.tracee.stop()?;
        loop {
            match self.tracee.wait()? {
                Stop::Signal(Signal::SIGSTOP) => break,
                Stop::Trap => {
                    self.handle_trap()?;
                    self.tracee.cont(None)?;
                }
                Stop::Signal(signal) => self.tracee.cont(Some(signal))?,
                Stop::Exited(code) => return Ok(Outcome::Exited(code)),
                Stop::Killed(signal) => return Ok(Outcome::Killed(signal)),
                Stop::Interrupted => {}
            }
        }
        self.release()?;
        Ok(Outcome::Detached)
    }

    /// Removes every armed breakpoint and detaches. The tracee must be stopped.
    ///
    /// Keeps going past failures and reports the first one.
    pub fn release(&mut self) -> Result<()> {
        let mut first_error = None;
        for bp in self.breakpoints.iter_mut().filter(|bp| bp.is_armed()) {
            if let Err(e) = bp.remove(&mut self.tracee) {
                warn!("Could not remove breakpoint on {:#x}: {}", bp.address(), e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.tracee.detach() {
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Installs `records` and runs until the end of the session.
    ///
    /// On failure the tracee is released before the error is returned, so
    /// no trap is left behind in a process that keeps running.
    pub fn session(&mut self, records: &[SymbolRecord]) -> Result<Outcome> {
        let result = self.install(records).and_then(|()| self.run());
        if result.is_err() {
            if let Err(e) = self.release() {
                warn!("Could not release {}: {}", self.tracee.pid(), e);
            }
        }
        result
    }
}

/// Attaches to `pid` and traces the functions in `records`, reporting to `out`.
pub fn trace<W: Write>(pid: Pid, records: &[SymbolRecord], out: W) -> Result<Outcome> {
    let tracee = PtraceTracee::attach(pid)?;
    Tracer::new(tracee, out).session(records)
}
