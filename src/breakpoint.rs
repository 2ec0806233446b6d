//! Software breakpoints at function entries.
//!
//! The trap is patched into the word read back from the tracee, so only the
//! trap-width bytes at the breakpoint address ever change. Two breakpoints
//! that share a word can be installed and removed in any order.

use std::mem::size_of;

use crate::arch::Arch;
use crate::elf::SymbolRecord;
use crate::error::{Error, Result};
use crate::ptrace::{Tracee, Word};

/// An installed trap and what is needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    name: String,
    address: u64,
    original_bytes: Box<[u8]>,
    armed: bool,
}

impl Breakpoint {
    /// Saves the code at the record's address and writes the trap over it.
    pub fn install<T: Tracee>(tracee: &mut T, record: &SymbolRecord) -> Result<Self> {
        let trap = <T::Arch as Arch>::TRAP;
        debug_assert!(trap.len() <= size_of::<Word>());
        if !<T::Arch as Arch>::fits(record.address) {
            return Err(Error::AddressOutOfRange(record.address));
        }
        let word = tracee.read_word(record.address)?;
        let (patched, original_bytes) = splice(word, trap);
        tracee.write_word(record.address, patched)?;
        Ok(Breakpoint {
            name: record.name.clone(),
            address: record.address,
            original_bytes,
            armed: true,
        })
    }

    /// Puts the original code back. Does nothing once disarmed.
    pub fn remove<T: Tracee>(&mut self, tracee: &mut T) -> Result<()> {
        if !self.armed {
            return Ok(());
        }
        let word = tracee.read_word(self.address)?;
        let (restored, _) = splice(word, &self.original_bytes);
        tracee.write_word(self.address, restored)?;
        self.armed = false;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original_bytes
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Overwrites the leading bytes of `word` (in memory order) with `bytes`.
/// Returns the patched word and the bytes it replaced.
fn splice(word: Word, bytes: &[u8]) -> (Word, Box<[u8]>) {
    let mut raw = word.to_ne_bytes();
    let replaced = raw[..bytes.len()].to_vec().into_boxed_slice();
    raw[..bytes.len()].copy_from_slice(bytes);
    (Word::from_ne_bytes(raw), replaced)
}
