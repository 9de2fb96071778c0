//! The lowering pass: [`Module`] (behavioral/structural IR) → [`Netlist`]
//! (flat, single-bit gate-and-DFF IR).
//!
//! Three concerns, all performed together in one recursive walk:
//! instance inlining (namespaced by dotted instance path), operator
//! lowering (each [`GateOp`] reduces to a fixed combinational gate pattern),
//! and bit-blasting (every multi-bit net becomes an array of single-bit
//! wires). The output is handed straight to [`crate::schedule::build_schedule`]
//! by callers that need an ordered netlist, but `flatten` itself only
//! produces the graph — scheduling is a separate step.

mod ops;

use std::collections::{HashMap, HashSet};

use crate::error::{Result, SimError};
use crate::ir::{Direction, Driver, Expr, GateOp, Module, NetId, Registry};
use crate::netlist::{DffBit, Gate, GatePrim, Netlist, PortBits, WireId, NO_INPUT};

/// Accumulates gates and DFFs as they're produced; owns the dense wire
/// allocator shared across the whole flattened design.
#[derive(Default)]
struct Builder {
    wire_count: u32,
    gates: Vec<Gate>,
    dffs: Vec<DffBit>,
}

impl Builder {
    fn new_wire(&mut self) -> WireId {
        let id = self.wire_count;
        self.wire_count += 1;
        id
    }

    fn gate2(&mut self, op: GatePrim, a: WireId, b: WireId) -> WireId {
        let out = self.new_wire();
        self.gates.push(Gate { op, in_a: a, in_b: b, out });
        out
    }

    fn gate1(&mut self, op: GatePrim, a: WireId) -> WireId {
        let out = self.new_wire();
        self.gates.push(Gate { op, in_a: a, in_b: NO_INPUT, out });
        out
    }

    fn const_bit(&mut self, bit: u8) -> WireId {
        let out = self.new_wire();
        self.gates.push(Gate { op: GatePrim::ConstBit, in_a: bit as u32, in_b: NO_INPUT, out });
        out
    }
}

/// The per-instantiation elaboration context: which [`Module`] we're
/// inlining, its dotted instance path (for diagnostics), and the bit-vector
/// already resolved for each of its nets.
struct Scope<'m> {
    module: &'m Module,
    path: String,
    net_bits: HashMap<NetId, Vec<WireId>>,
    resolving: HashSet<NetId>,
}

struct Flattener<'r> {
    registry: &'r Registry,
    builder: Builder,
    instance_cache: HashMap<(String, usize), HashMap<String, Vec<WireId>>>,
}

/// Lowers `top_name` (looked up in `registry`) into a flat [`Netlist`].
pub fn flatten(registry: &Registry, top_name: &str) -> Result<Netlist> {
    let top = registry
        .get(top_name)
        .ok_or_else(|| SimError::UnknownOperator { module: top_name.to_string(), op: "<undeclared module>".to_string() })?;

    check_hierarchy_acyclic(registry, top_name)?;

    let mut flattener = Flattener { registry, builder: Builder::default(), instance_cache: HashMap::new() };

    let mut input_bits: HashMap<String, Vec<WireId>> = HashMap::new();
    for port in top.ports.iter().filter(|p| p.direction != Direction::Out) {
        let wires: Vec<WireId> = (0..port.width.bits()).map(|_| flattener.builder.new_wire()).collect();
        input_bits.insert(port.name.clone(), wires);
    }

    let mut scope = Scope { module: top, path: String::new(), net_bits: HashMap::new(), resolving: HashSet::new() };
    for port in top.ports.iter().filter(|p| p.direction != Direction::Out) {
        let net = top
            .net_named(&port.name)
            .ok_or_else(|| SimError::UndrivenNet { module: top.name.clone(), net: port.name.clone() })?;
        scope.net_bits.insert(net.id, input_bits[&port.name].clone());
    }

    let mut outputs = Vec::new();
    for port in top.ports.iter().filter(|p| p.direction != Direction::In) {
        let net = top
            .net_named(&port.name)
            .ok_or_else(|| SimError::UndrivenNet { module: top.name.clone(), net: port.name.clone() })?;
        let bits = flattener.bits_of(&mut scope, net.id)?;
        outputs.push(PortBits { name: port.name.clone(), wires: bits });
    }

    let inputs = top
        .ports
        .iter()
        .filter(|p| p.direction != Direction::Out)
        .map(|p| PortBits { name: p.name.clone(), wires: input_bits[&p.name].clone() })
        .collect();

    Ok(Netlist {
        wire_count: flattener.builder.wire_count,
        inputs,
        outputs,
        gates: flattener.builder.gates,
        dffs: flattener.builder.dffs,
    })
}

fn check_hierarchy_acyclic(registry: &Registry, start: &str) -> Result<()> {
    fn visit(registry: &Registry, name: &str, stack: &mut Vec<String>, done: &mut HashSet<String>) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if stack.iter().any(|s| s == name) {
            return Err(SimError::CyclicHierarchy { module: name.to_string() });
        }
        let Some(module) = registry.get(name) else {
            return Err(SimError::UnknownOperator { module: name.to_string(), op: "<undeclared module>".to_string() });
        };
        stack.push(name.to_string());
        for inst in &module.instances {
            visit(registry, &inst.module, stack, done)?;
        }
        stack.pop();
        done.insert(name.to_string());
        Ok(())
    }

    visit(registry, start, &mut Vec::new(), &mut HashSet::new())
}

impl<'r> Flattener<'r> {
    fn bits_of(&mut self, scope: &mut Scope<'_>, net_id: NetId) -> Result<Vec<WireId>> {
        if let Some(bits) = scope.net_bits.get(&net_id) {
            return Ok(bits.clone());
        }
        if !scope.resolving.insert(net_id) {
            return Err(SimError::CyclicCombinational { module: scope.module.name.clone() });
        }

        let net = scope
            .module
            .nets
            .iter()
            .find(|n| n.id == net_id)
            .unwrap_or_else(|| panic!("net {net_id} not declared in module `{}`", scope.module.name))
            .clone();

        let drivers = scope.module.drivers_of(net_id);
        let bits = match drivers.len() {
            0 => Err(SimError::UndrivenNet { module: scope.module.name.clone(), net: net.name.clone() }),
            1 => self.resolve_driver(scope, net_id, &drivers[0]),
            _ => Err(SimError::MultiplyDriven { module: scope.module.name.clone(), net: net.name.clone() }),
        }?;

        if bits.len() as u32 != net.width.bits() {
            return Err(SimError::WidthMismatch {
                module: scope.module.name.clone(),
                detail: format!("net `{}` declared {} bits, driver produced {}", net.name, net.width.bits(), bits.len()),
            });
        }

        scope.resolving.remove(&net_id);
        scope.net_bits.insert(net_id, bits.clone());
        Ok(bits)
    }

    fn resolve_driver(&mut self, scope: &mut Scope<'_>, net_id: NetId, driver: &Driver<'_>) -> Result<Vec<WireId>> {
        match driver {
            Driver::Input => unreachable!("net {net_id} is a module input; pre-seeded by the caller"),
            Driver::Assign(expr) => {
                let expr = (*expr).clone();
                self.lower_expr(scope, &expr)
            }
            Driver::Dff(idx) => self.resolve_dff(scope, *idx),
            Driver::InstanceOutput(inst_idx, port_name) => {
                self.resolve_instance_output(scope, *inst_idx, port_name)
            }
        }
    }

    fn resolve_dff(&mut self, scope: &mut Scope<'_>, idx: usize) -> Result<Vec<WireId>> {
        let dff = scope.module.dffs[idx].clone();
        let d_bits = self.bits_of(scope, dff.data)?;
        let clk_bits = self.bits_of(scope, dff.clock)?;
        let reset_bit = match dff.reset {
            Some(n) => Some(self.bits_of(scope, n)?[0]),
            None => None,
        };
        let enable_bit = match dff.enable {
            Some(n) => Some(self.bits_of(scope, n)?[0]),
            None => None,
        };

        let width = d_bits.len();
        let mut q_bits = Vec::with_capacity(width);
        for (i, &d) in d_bits.iter().enumerate() {
            let q = self.builder.new_wire();
            let reset_value_bit = dff.reset_value.map(|c| ((c.value >> i) & 1) as u8).unwrap_or(0);
            self.builder.dffs.push(DffBit {
                d,
                q,
                clk: clk_bits[0],
                reset: reset_bit.unwrap_or(NO_INPUT),
                reset_value: reset_value_bit,
                enable: enable_bit.unwrap_or(NO_INPUT),
                async_reset: dff.reset.is_some(),
            });
            q_bits.push(q);
        }
        Ok(q_bits)
    }

    fn resolve_instance_output(&mut self, scope: &mut Scope<'_>, inst_idx: usize, port_name: &str) -> Result<Vec<WireId>> {
        let key = (scope.path.clone(), inst_idx);
        if let Some(cached) = self.instance_cache.get(&key) {
            if let Some(bits) = cached.get(port_name) {
                return Ok(bits.clone());
            }
        }

        let inst = scope.module.instances[inst_idx].clone();
        let sub = self
            .registry
            .get(&inst.module)
            .ok_or_else(|| SimError::UnknownOperator { module: scope.module.name.clone(), op: inst.module.clone() })?
            .clone();

        let mut sub_input_bits = HashMap::new();
        for port in sub.ports.iter().filter(|p| p.direction != Direction::Out) {
            let bound = inst.inputs.get(&port.name).ok_or_else(|| SimError::WidthMismatch {
                module: scope.module.name.clone(),
                detail: format!("instance `{}` leaves input port `{}` unbound", inst.name, port.name),
            })?;
            let bits = self.lower_expr(scope, bound)?;
            if bits.len() as u32 != port.width.bits() {
                return Err(SimError::WidthMismatch {
                    module: scope.module.name.clone(),
                    detail: format!(
                        "instance `{}` port `{}` expects {} bits, binding produced {}",
                        inst.name,
                        port.name,
                        port.width.bits(),
                        bits.len()
                    ),
                });
            }
            sub_input_bits.insert(port.name.clone(), bits);
        }

        let new_path = if scope.path.is_empty() { inst.name.clone() } else { format!("{}.{}", scope.path, inst.name) };
        let mut sub_scope = Scope { module: &sub, path: new_path, net_bits: HashMap::new(), resolving: HashSet::new() };
        for port in sub.ports.iter().filter(|p| p.direction != Direction::Out) {
            let net = sub.net_named(&port.name).unwrap();
            sub_scope.net_bits.insert(net.id, sub_input_bits[&port.name].clone());
        }

        let mut outputs_map = HashMap::new();
        for port in sub.ports.iter().filter(|p| p.direction != Direction::In) {
            let net = sub.net_named(&port.name).unwrap();
            let bits = self.bits_of(&mut sub_scope, net.id)?;
            outputs_map.insert(port.name.clone(), bits);
        }

        let result = outputs_map.get(port_name).cloned().ok_or_else(|| SimError::UnknownOperator {
            module: scope.module.name.clone(),
            op: format!("{}.{}", inst.module, port_name),
        });
        self.instance_cache.insert(key, outputs_map);
        result
    }

    fn lower_expr(&mut self, scope: &mut Scope<'_>, expr: &Expr) -> Result<Vec<WireId>> {
        match expr {
            Expr::Net(id) => self.bits_of(scope, *id),
            Expr::Const(c) => {
                Ok((0..c.width.bits()).map(|i| self.builder.const_bit(((c.value >> i) & 1) as u8)).collect())
            }
            Expr::Op(op, operands) => self.lower_op(scope, *op, operands),
        }
    }

    fn lower_op(&mut self, scope: &mut Scope<'_>, op: GateOp, operands: &[Expr]) -> Result<Vec<WireId>> {
        match op {
            GateOp::And => self.lower_binary(scope, operands, GatePrim::And2),
            GateOp::Or => self.lower_binary(scope, operands, GatePrim::Or2),
            GateOp::Xor => self.lower_binary(scope, operands, GatePrim::Xor2),
            GateOp::Not => self.lower_unary(scope, operands, GatePrim::Not1),
            GateOp::Buf => self.lower_unary(scope, operands, GatePrim::Buf1),
            GateOp::Mux(k) => ops::lower_mux(self, scope, k, operands),
            GateOp::Add => ops::lower_add(self, scope, operands),
            GateOp::Sub => ops::lower_sub(self, scope, operands),
            GateOp::Eq => ops::lower_eq(self, scope, operands),
            GateOp::Lt => ops::lower_lt(self, scope, operands, true),
            GateOp::Ltu => ops::lower_lt(self, scope, operands, false),
            GateOp::Shl => ops::lower_shift(self, scope, operands, ops::ShiftKind::Left),
            GateOp::Shr => ops::lower_shift(self, scope, operands, ops::ShiftKind::LogicalRight),
            GateOp::Shra => ops::lower_shift(self, scope, operands, ops::ShiftKind::ArithRight),
            GateOp::Concat => ops::lower_concat(self, scope, operands),
            GateOp::Slice(hi, lo) => ops::lower_slice(self, scope, operands, hi, lo),
            GateOp::Extend(signed, target_width) => ops::lower_extend(self, scope, operands, signed, target_width),
        }
    }

    fn lower_binary(&mut self, scope: &mut Scope<'_>, operands: &[Expr], prim: GatePrim) -> Result<Vec<WireId>> {
        let a = self.lower_expr(scope, &operands[0])?;
        let b = self.lower_expr(scope, &operands[1])?;
        if a.len() != b.len() {
            return Err(SimError::WidthMismatch {
                module: scope.module.name.clone(),
                detail: format!("binary operator operand widths disagree: {} vs {}", a.len(), b.len()),
            });
        }
        Ok(a.iter().zip(&b).map(|(&x, &y)| self.builder.gate2(prim, x, y)).collect())
    }

    fn lower_unary(&mut self, scope: &mut Scope<'_>, operands: &[Expr], prim: GatePrim) -> Result<Vec<WireId>> {
        let a = self.lower_expr(scope, &operands[0])?;
        Ok(a.iter().map(|&x| self.builder.gate1(prim, x)).collect())
    }
}
