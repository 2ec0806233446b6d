//! Target architecture details the tracer core depends on.
//!
//! The tracer never names a register or an opcode directly: it asks the
//! [`Arch`] of its tracee for the trap encoding and for access to the
//! instruction pointer inside a register set.

pub trait Arch {
    /// Register set as returned by `PTRACE_GETREGS`.
    type Regs;

    /// Bytes written over a function entry to make it raise SIGTRAP.
    const TRAP: &'static [u8];

    /// Width of a code address in bytes.
    const POINTER_WIDTH: usize;

    fn instruction_pointer(regs: &Self::Regs) -> u64;

    fn set_instruction_pointer(regs: &mut Self::Regs, address: u64);

    /// Instruction pointer reported once the trap installed at `address` fired.
    fn trap_return_address(address: u64) -> u64 {
        address.wrapping_add(Self::TRAP.len() as u64)
    }

    fn fits(address: u64) -> bool {
        Self::POINTER_WIDTH >= 8 || address >> (Self::POINTER_WIDTH * 8) == 0
    }
}

#[cfg(target_arch = "x86_64")]
pub struct X86_64;

#[cfg(target_arch = "x86_64")]
impl Arch for X86_64 {
    type Regs = libc::user_regs_struct;

    // int3
    const TRAP: &'static [u8] = &[0xcc];
    const POINTER_WIDTH: usize = 8;

    fn instruction_pointer(regs: &Self::Regs) -> u64 {
        regs.rip
    }

    fn set_instruction_pointer(regs: &mut Self::Regs, address: u64) {
        regs.rip = address;
    }
}

#[cfg(target_arch = "x86")]
pub struct X86;

#[cfg(target_arch = "x86")]
impl Arch for X86 {
    type Regs = libc::user_regs_struct;

    // int3
    const TRAP: &'static [u8] = &[0xcc];
    const POINTER_WIDTH: usize = 4;

    fn instruction_pointer(regs: &Self::Regs) -> u64 {
        u64::from(regs.eip as u32)
    }

    fn set_instruction_pointer(regs: &mut Self::Regs, address: u64) {
        regs.eip = address as u32 as libc::c_long;
    }
}

#[cfg(target_arch = "x86_64")]
pub type Native = X86_64;

#[cfg(target_arch = "x86")]
pub type Native = X86;
