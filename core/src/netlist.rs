//! The flat, single-bit netlist that every simulation engine consumes.
//!
//! A [`Netlist`] is the hand-off point between the lowering pass
//! ([`crate::flatten`]) and the engines in [`crate::engine`]. It is
//! immutable after construction and carries only the six primitive
//! gate operators plus single-bit DFFs — no module boundaries, no
//! multi-bit values.

use std::collections::HashMap;
use std::io::{self, Read};

use sha2::{Digest, Sha256};

use crate::error::{Result, SimError};

/// Dense id for a single-bit wire in a flattened design. Also the primary
/// key engines use to index their wire-value vectors.
pub type WireId = u32;

/// No second input operand (unary gates).
pub const NO_INPUT: WireId = u32::MAX;

/// The six primitive combinational operators a [`Gate`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatePrim {
    And2 = 0,
    Or2 = 1,
    Xor2 = 2,
    Not1 = 3,
    Buf1 = 4,
    ConstBit = 5,
}

impl GatePrim {
    pub fn is_unary(self) -> bool {
        matches!(self, GatePrim::Not1 | GatePrim::Buf1 | GatePrim::ConstBit)
    }

    fn from_tag(tag: u8) -> Result<GatePrim> {
        Ok(match tag {
            0 => GatePrim::And2,
            1 => GatePrim::Or2,
            2 => GatePrim::Xor2,
            3 => GatePrim::Not1,
            4 => GatePrim::Buf1,
            5 => GatePrim::ConstBit,
            other => {
                return Err(SimError::Serialization(format!("unknown gate tag {other}")));
            }
        })
    }
}

/// One single-bit gate: `out = op(in_a [, in_b])`. `ConstBit` ignores both
/// inputs and always drives `in_a` as its literal value (0 or 1).
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    pub op: GatePrim,
    pub in_a: WireId,
    pub in_b: WireId,
    pub out: WireId,
}

/// One single-bit D flip-flop. `reset`/`enable` of [`NO_INPUT`] mean absent.
#[derive(Debug, Clone, Copy)]
pub struct DffBit {
    pub d: WireId,
    pub q: WireId,
    pub clk: WireId,
    pub reset: WireId,
    pub reset_value: u8,
    pub enable: WireId,
    pub async_reset: bool,
}

/// Evaluates one gate's output given a wire-value slice (0/1 per byte).
/// The single piece of logic the interpreter, and the correctness tests for
/// the JIT/AOT-generated code, must agree on bit-for-bit.
#[inline]
pub fn eval_gate(op: GatePrim, in_a: WireId, in_b: WireId, wires: &[u8]) -> u8 {
    match op {
        GatePrim::And2 => wires[in_a as usize] & wires[in_b as usize],
        GatePrim::Or2 => wires[in_a as usize] | wires[in_b as usize],
        GatePrim::Xor2 => wires[in_a as usize] ^ wires[in_b as usize],
        GatePrim::Not1 => 1 - wires[in_a as usize],
        GatePrim::Buf1 => wires[in_a as usize],
        GatePrim::ConstBit => in_a as u8,
    }
}

/// A named, widthed module port: an ordered list of per-bit wire ids,
/// LSB first.
#[derive(Debug, Clone)]
pub struct PortBits {
    pub name: String,
    pub wires: Vec<WireId>,
}

/// The flat gate-and-DFF graph produced by [`crate::flatten::flatten`] and
/// consumed by every [`crate::engine`] backend.
#[derive(Debug, Clone)]
pub struct Netlist {
    pub wire_count: u32,
    pub inputs: Vec<PortBits>,
    pub outputs: Vec<PortBits>,
    pub gates: Vec<Gate>,
    pub dffs: Vec<DffBit>,
}

impl Netlist {
    /// Total number of module-input wire bits, in port-declaration order.
    pub fn input_wire(&self, name: &str, bit: usize) -> Option<WireId> {
        self.inputs.iter().find(|p| p.name == name).and_then(|p| p.wires.get(bit).copied())
    }

    pub fn output_wire(&self, name: &str, bit: usize) -> Option<WireId> {
        self.outputs.iter().find(|p| p.name == name).and_then(|p| p.wires.get(bit).copied())
    }

    pub fn port_width(ports: &[PortBits], name: &str) -> Option<usize> {
        ports.iter().find(|p| p.name == name).map(|p| p.wires.len())
    }

    /// True when the distinguished memory-bus ports are all present:
    /// `clk`/`rst`/`mem_data_in` driven into the design, and
    /// `mem_addr`/`mem_data_out`/`mem_read_en`/`mem_write_en` driven out of it.
    pub fn has_memory_bus(&self) -> bool {
        const REQUIRED_INPUTS: [&str; 3] = ["clk", "rst", "mem_data_in"];
        const REQUIRED_OUTPUTS: [&str; 4] = ["mem_addr", "mem_data_out", "mem_read_en", "mem_write_en"];
        let has_input = |name: &str| self.inputs.iter().any(|p| p.name == name);
        let has_output = |name: &str| self.outputs.iter().any(|p| p.name == name);
        REQUIRED_INPUTS.iter().all(|n| has_input(n)) && REQUIRED_OUTPUTS.iter().all(|n| has_output(n))
    }

    /// Canonical binary encoding: magic, version, wire count, port
    /// tables, gate table, DFF table, all little-endian.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"NETL");
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&self.wire_count.to_le_bytes());

        write_ports(&mut buf, &self.inputs);
        write_ports(&mut buf, &self.outputs);

        buf.extend_from_slice(&(self.gates.len() as u32).to_le_bytes());
        for g in &self.gates {
            buf.push(g.op as u8);
            buf.extend_from_slice(&g.in_a.to_le_bytes());
            buf.extend_from_slice(&g.in_b.to_le_bytes());
            buf.extend_from_slice(&g.out.to_le_bytes());
        }

        buf.extend_from_slice(&(self.dffs.len() as u32).to_le_bytes());
        for d in &self.dffs {
            buf.extend_from_slice(&d.d.to_le_bytes());
            buf.extend_from_slice(&d.q.to_le_bytes());
            buf.extend_from_slice(&d.clk.to_le_bytes());
            buf.extend_from_slice(&d.reset.to_le_bytes());
            buf.push(d.reset_value);
            buf.extend_from_slice(&d.enable.to_le_bytes());
            buf.push(d.async_reset as u8);
        }

        buf
    }

    /// Inverse of [`Netlist::serialize`]. Rejects truncated or malformed
    /// byte-streams with [`SimError::Serialization`].
    pub fn parse(bytes: &[u8]) -> Result<Netlist> {
        let mut cur = io::Cursor::new(bytes);

        let mut magic = [0u8; 4];
        read_exact(&mut cur, &mut magic)?;
        if &magic != b"NETL" {
            return Err(SimError::Serialization("bad magic".to_string()));
        }

        let version = read_u32(&mut cur)?;
        if version != 1 {
            return Err(SimError::Serialization(format!("unsupported version {version}")));
        }

        let wire_count = read_u32(&mut cur)?;
        let inputs = read_ports(&mut cur)?;
        let outputs = read_ports(&mut cur)?;

        let gate_count = read_u32(&mut cur)?;
        let mut gates = Vec::with_capacity(gate_count as usize);
        for _ in 0..gate_count {
            let mut tag = [0u8; 1];
            read_exact(&mut cur, &mut tag)?;
            let in_a = read_u32(&mut cur)?;
            let in_b = read_u32(&mut cur)?;
            let out = read_u32(&mut cur)?;
            gates.push(Gate { op: GatePrim::from_tag(tag[0])?, in_a, in_b, out });
        }

        let dff_count = read_u32(&mut cur)?;
        let mut dffs = Vec::with_capacity(dff_count as usize);
        for _ in 0..dff_count {
            let d = read_u32(&mut cur)?;
            let q = read_u32(&mut cur)?;
            let clk = read_u32(&mut cur)?;
            let reset = read_u32(&mut cur)?;
            let mut rv = [0u8; 1];
            read_exact(&mut cur, &mut rv)?;
            let enable = read_u32(&mut cur)?;
            let mut flags = [0u8; 1];
            read_exact(&mut cur, &mut flags)?;
            dffs.push(DffBit {
                d,
                q,
                clk,
                reset,
                reset_value: rv[0],
                enable,
                async_reset: flags[0] & 1 != 0,
            });
        }

        Ok(Netlist { wire_count, inputs, outputs, gates, dffs })
    }

    /// SHA-256 of the canonical serialization; the AOT cache key.
    pub fn content_hash(&self) -> String {
        let bytes = self.serialize();
        let digest = Sha256::digest(bytes);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Writes one `(name-length-prefixed UTF-8 name, wire-id)` entry per
/// individual bit-blasted wire, per §4.2/§6 — each entry names the wire
/// `port[i]` (LSB = 0), not the whole port, so the on-disk format has no
/// field beyond what §6 documents.
fn write_ports(buf: &mut Vec<u8>, ports: &[PortBits]) {
    let total_wires: u32 = ports.iter().map(|p| p.wires.len() as u32).sum();
    buf.extend_from_slice(&total_wires.to_le_bytes());
    for port in ports {
        for (i, w) in port.wires.iter().enumerate() {
            let bit_name = format!("{}[{i}]", port.name);
            let name_bytes = bit_name.as_bytes();
            buf.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(name_bytes);
            buf.extend_from_slice(&w.to_le_bytes());
        }
    }
}

/// Inverse of [`write_ports`]: reads individual `port[i]` wire entries and
/// regroups them back into [`PortBits`] by their shared base name, in the
/// order each base name was first seen.
fn read_ports(cur: &mut io::Cursor<&[u8]>) -> Result<Vec<PortBits>> {
    let count = read_u32(cur)?;
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, Vec<WireId>> = HashMap::new();
    for _ in 0..count {
        let name_len = read_u32(cur)? as usize;
        let mut name_bytes = vec![0u8; name_len];
        read_exact(cur, &mut name_bytes)?;
        let bit_name = String::from_utf8(name_bytes)
            .map_err(|e| SimError::Serialization(format!("non-UTF-8 port name: {e}")))?;
        let wire = read_u32(cur)?;
        let base = bit_base_name(&bit_name)?;
        if !by_name.contains_key(&base) {
            order.push(base.clone());
        }
        by_name.entry(base).or_default().push(wire);
    }
    Ok(order
        .into_iter()
        .map(|name| {
            let wires = by_name.remove(&name).unwrap_or_default();
            PortBits { name, wires }
        })
        .collect())
}

/// Strips the trailing `[i]` bit index off a serialized wire entry name,
/// returning the port's base name.
fn bit_base_name(entry: &str) -> Result<String> {
    if !entry.ends_with(']') {
        return Err(SimError::Serialization(format!("malformed bit-blasted port name `{entry}`")));
    }
    let open = entry
        .rfind('[')
        .ok_or_else(|| SimError::Serialization(format!("malformed bit-blasted port name `{entry}`")))?;
    Ok(entry[..open].to_string())
}

fn read_u32(cur: &mut io::Cursor<&[u8]>) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact(cur, &mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_exact(cur: &mut io::Cursor<&[u8]>, buf: &mut [u8]) -> Result<()> {
    cur.read_exact(buf).map_err(|_| SimError::Serialization("unexpected end of input".to_string()))
}

/// A canonical byte-for-byte record of a flattened port's per-bit names,
/// kept here rather than in `serialize` so that callers who only need the
/// wire lookup (not the whole byte stream) can use it directly.
pub fn port_index(ports: &[PortBits]) -> HashMap<&str, &PortBits> {
    ports.iter().map(|p| (p.name.as_str(), p)).collect()
}
