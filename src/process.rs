//! Locating and resolving the executable of a live process.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{debug, info};
use nix::unistd::Pid;
use proc_maps::get_process_maps;

use crate::elf::{inspect, ObjectKind, SymbolRecord};
use crate::error::{Error, Result};

pub fn executable_path(pid: Pid) -> PathBuf {
    PathBuf::from(format!("/proc/{}/exe", pid))
}

/// Start of the lowest mapping backed by `executable`.
fn lowest_start<'a, I>(mappings: I, executable: &str) -> Option<u64>
where
    I: IntoIterator<Item = (Option<&'a str>, usize)>,
{
    mappings
        .into_iter()
        .filter(|(name, _)| *name == Some(executable))
        .map(|(_, start)| start as u64)
        .min()
}

/// Address the executable of `pid` was loaded at.
///
/// Position-independent executables are assumed to be linked at 0, so this
/// is also the bias to add to their symbol values.
pub fn load_bias(pid: Pid, executable: &Path) -> Result<u64> {
    let maps = get_process_maps(pid.as_raw()).map_err(|source| Error::Maps { pid, source })?;
    let name = executable.to_string_lossy();
    let mappings = maps
        .iter()
        .map(|map| (map.filename().as_ref().map(String::as_str), map.start()));
    lowest_start(mappings, &name).ok_or(Error::NoMapping { pid })
}

/// Resolves the functions to trace in `pid`, at their runtime addresses.
pub fn resolve_process(pid: Pid) -> Result<Vec<SymbolRecord>> {
    let path = executable_path(pid);
    let mut file = File::open(&path).map_err(|source| Error::ImageAccess {
        path: path.clone(),
        source,
    })?;
    let image = inspect(&mut file)?;
    if image.symbols.is_empty() {
        return Err(Error::NoSymbols);
    }
    info!("Resolved {} functions of {}", image.symbols.len(), pid);

    if image.kind != ObjectKind::PositionIndependent {
        return Ok(image.symbols);
    }
    let target = fs::read_link(&path).map_err(|source| Error::ImageAccess { path, source })?;
    let bias = load_bias(pid, &target)?;
    debug!("{} is loaded at {:#x}", target.display(), bias);
    Ok(image.symbols.iter().map(|s| s.rebased(bias)).collect())
}
