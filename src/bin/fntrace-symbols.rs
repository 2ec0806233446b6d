extern crate fntrace;

use std::borrow::Borrow;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use log::error;
use structopt::StructOpt;

use fntrace::{inspect, CODE_SECTION};

#[derive(StructOpt)]
/// Print the functions fntrace would put a breakpoint on.
struct Cli {
    /// Executable image to read the symbol table from
    #[structopt(parse(from_os_str))]
    input: PathBuf,
}

fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let f = File::open(&args.input).map_err(|source| fntrace::Error::ImageAccess {
        path: args.input.clone(),
        source,
    })?;
    let image = inspect(&mut BufReader::new(f))?;
    println!(
        "{:?} {:?}, {} functions in {}",
        image.class,
        image.kind,
        image.symbols.len(),
        CODE_SECTION
    );
    println!("<ADDR> <NAME>");
    for symbol in &image.symbols {
        println!("{:#x} {}", symbol.address, symbol.name);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Cli::from_args();
    if let Err(top_e) = run(args) {
        error!("{}", top_e.to_string());
        let mut e: &dyn Error = top_e.borrow();
        while let Some(source) = e.source() {
            error!("Caused by: {}", source.to_string());
            e = source;
        }
        process::exit(1);
    }
}
