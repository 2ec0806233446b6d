extern crate fntrace;

use std::borrow::Borrow;
use std::error::Error;
use std::io;
use std::process;

use log::{error, info};
use nix::unistd::Pid;
use structopt::StructOpt;

use fntrace::{block_interrupts, resolve_process, trace, Outcome};

#[derive(StructOpt)]
/// Report the local functions of a running process as they get executed.
struct Cli {
    /// PID of the process to attach to
    pid: u32,
}

fn run(args: Cli) -> Result<Outcome, Box<dyn Error>> {
    let pid = Pid::from_raw(args.pid as i32);
    block_interrupts()?;
    let records = resolve_process(pid)?;
    let stdout = io::stdout();
    let outcome = trace(pid, &records, stdout.lock())?;
    Ok(outcome)
}

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "x86")))]
fn main() {
    env_logger::init();
    let args = match Cli::from_args_safe() {
        Ok(args) => args,
        Err(e)
            if e.kind == clap::ErrorKind::HelpDisplayed
                || e.kind == clap::ErrorKind::VersionDisplayed =>
        {
            e.exit()
        }
        Err(e) => {
            println!("{}", e.message);
            process::exit(1);
        }
    };
    match run(args) {
        Ok(outcome) => info!("Tracing finished: {}", outcome),
        Err(top_e) => {
            error!("{}", top_e.to_string());
            let mut e: &dyn Error = top_e.borrow();
            while let Some(source) = e.source() {
                error!("Caused by: {}", source.to_string());
                e = source;
            }
            process::exit(1);
        }
    }
}
