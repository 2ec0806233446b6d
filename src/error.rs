use std::io;
use std::path::PathBuf;

use nix::unistd::Pid;
use thiserror::Error;

/// Debugging control requests issued against the tracee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    Continue,
    Wait,
    PeekData,
    PokeData,
    GetRegs,
    SetRegs,
    Stop,
    Detach,
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Request::Continue => "PTRACE_CONT",
            Request::Wait => "waitpid",
            Request::PeekData => "PTRACE_PEEKDATA",
            Request::PokeData => "PTRACE_POKEDATA",
            Request::GetRegs => "PTRACE_GETREGS",
            Request::SetRegs => "PTRACE_SETREGS",
            Request::Stop => "kill(SIGSTOP)",
            Request::Detach => "PTRACE_DETACH",
        })
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open executable image {}", .path.display())]
    ImageAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed image: {what}")]
    MalformedImage {
        what: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("no symbols to trace")]
    NoSymbols,

    #[error("cannot attach to process {pid}")]
    Attach {
        pid: Pid,
        #[source]
        source: nix::Error,
    },

    #[error("process {pid} went away while attaching ({reason})")]
    AttachLost { pid: Pid, reason: String },

    #[error("{request} failed")]
    Control {
        request: Request,
        #[source]
        source: nix::Error,
    },

    #[error("address {0:#x} does not fit the target pointer width")]
    AddressOutOfRange(u64),

    #[error("no mapping of the executable found for process {pid}")]
    NoMapping { pid: Pid },

    #[error("cannot read memory maps of process {pid}")]
    Maps {
        pid: Pid,
        #[source]
        source: io::Error,
    },

    #[error("cannot write trace output")]
    Output(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        Error::MalformedImage {
            what: what.into(),
            source: None,
        }
    }

    pub(crate) fn control(request: Request) -> impl FnOnce(nix::Error) -> Self {
        move |source| Error::Control { request, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
