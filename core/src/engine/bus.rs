//! The external memory-bus hook: lets a compiled CPU-shaped netlist
//! talk to a host-owned memory model without bit-banging a serial protocol.

/// Implemented by the host. Invoked synchronously on the stepping thread;
/// must not call back into the owning [`crate::engine::Simulator`], and must
/// tolerate being called more than once per cycle (multi-access instructions).
///
/// Either method may report failure with a human-readable reason; `Simulator`
/// turns that into a [`crate::error::SimError::BusCallbackFailure`] that
/// fails the in-progress `step` without silently swallowing the host's
/// report.
pub trait MemoryBus {
    fn read(&mut self, addr: u16) -> Result<u8, String>;
    fn write(&mut self, addr: u16, data: u8) -> Result<(), String>;
}

/// A flat byte array, useful for fixtures and tests.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    bytes: Vec<u8>,
}

impl FlatMemory {
    pub fn new(size: usize) -> FlatMemory {
        FlatMemory { bytes: vec![0; size] }
    }

    pub fn with_program(size: usize, program: &[u8], origin: u16) -> FlatMemory {
        let mut mem = FlatMemory::new(size);
        let start = origin as usize;
        mem.bytes[start..start + program.len()].copy_from_slice(program);
        mem
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl MemoryBus for FlatMemory {
    fn read(&mut self, addr: u16) -> Result<u8, String> {
        Ok(self.bytes.get(addr as usize).copied().unwrap_or(0))
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), String> {
        if let Some(slot) = self.bytes.get_mut(addr as usize) {
            *slot = data;
        }
        Ok(())
    }
}
