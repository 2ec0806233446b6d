pub use arch::{Arch, Native};
pub use breakpoint::Breakpoint;
pub use elf::{inspect, resolve, Class, Image, ObjectKind, SymbolRecord, CODE_SECTION};
pub use error::{Error, Request, Result};
pub use process::{executable_path, load_bias, resolve_process};
pub use ptrace::{block_interrupts, PtraceTracee, Stop, Tracee, Word};
pub use tracer::{trace, Outcome, Tracer};

mod arch;
mod breakpoint;
mod elf;
mod error;
mod process;
mod ptrace;
mod tracer;
