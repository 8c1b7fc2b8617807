//! Main bytecode dispatch loop.

use crate::arith::{self, ArithOp};
use crate::callinfo::{CallFrame, Place, Slot};
use crate::coerce::{self, intval};
use crate::compare;
use crate::error::{Result, VmError};
use crate::iter::LoopIter;
use crate::vm::Vm;
use quill_bytecode::OpCode;
use quill_core::heap::HeapIdx;
use quill_core::string::Str;
use quill_core::table::Table;
use quill_core::value::{Range, Value};
use std::rc::Rc;
use tracing::trace;

/// Execute the dispatch loop, returning when the frame count drops to
/// `entry_depth`.
pub(crate) fn execute(vm: &mut Vm, entry_depth: usize) -> Result<()> {
    'frames: loop {
        let Some(frame) = vm.frames.last() else {
            return Ok(());
        };
        let proto = Rc::clone(&vm.protos[frame.proto]);
        let fp = frame.fp;
        let iter_base = frame.iter_base;
        let mut pc = frame.pc;
        let code = &proto.bytes[..];
        let frame_locals = proto.num_locals.max(proto.arity as usize);

        loop {
            let at = pc;
            let Some(&byte) = code.get(at) else {
                // Fell off the end.
                if finish_call(vm, Value::Null, entry_depth) {
                    return Ok(());
                }
                continue 'frames;
            };
            let op = OpCode::from_u8(byte)
                .ok_or_else(|| VmError::corrupt(at, format!("invalid opcode byte {byte:#04x}")))?;
            let operand = read_operand(code, at, op)?;
            pc = at + op.width();

            match op {
                OpCode::Nop => {}

                OpCode::Pop => {
                    vm.stack.pop();
                }

                OpCode::Dup => {
                    let top = vm.stack.last().cloned().ok_or_else(|| underflow(at))?;
                    vm.stack.push(top);
                }

                OpCode::Null => push(vm, Value::Null),

                OpCode::Const | OpCode::Const0 | OpCode::Const1 | OpCode::Const2 => {
                    let k = short_index(op, operand);
                    let value = proto
                        .constants
                        .get(k)
                        .cloned()
                        .ok_or_else(|| VmError::corrupt(at, format!("missing constant {k}")))?;
                    push(vm, value);
                }

                // ---- Locations ----
                OpCode::Local | OpCode::Local0 | OpCode::Local1 | OpCode::Local2 => {
                    let n = short_index(op, operand);
                    let index = local_index(fp, n, frame_locals, at)?;
                    let value = match vm.stack.get(index) {
                        Some(Slot::Value(v)) => v.clone(),
                        _ => return Err(VmError::corrupt(at, "local slot does not hold a value")),
                    };
                    push(vm, value);
                }

                OpCode::LocalA | OpCode::LocalA0 | OpCode::LocalA1 | OpCode::LocalA2 => {
                    let n = short_index(op, operand);
                    let index = local_index(fp, n, frame_locals, at)?;
                    vm.stack.push(Slot::Place(Place::Local(index)));
                }

                OpCode::Global => {
                    let name = global_name(&proto.constants, operand, at)?;
                    let value = vm.globals.lookup(&name).cloned().unwrap_or_default();
                    push(vm, value);
                }

                OpCode::GlobalA => {
                    let name = global_name(&proto.constants, operand, at)?;
                    vm.stack.push(Slot::Place(Place::Global(name)));
                }

                // ---- Tables ----
                OpCode::Array => {
                    let items = take_values(vm, operand, at)?;
                    let mut table = Table::with_array(items.len());
                    for (i, v) in items.into_iter().enumerate() {
                        table.insert_forced(i, v);
                    }
                    let t = vm.heap.alloc_table(table);
                    push(vm, Value::Table(t));
                }

                OpCode::Map => {
                    let items = take_values(vm, operand * 2, at)?;
                    let mut table = Table::new();
                    let mut items = items.into_iter();
                    while let (Some(k), Some(v)) = (items.next(), items.next()) {
                        table.insert(&k, v);
                    }
                    let t = vm.heap.alloc_table(table);
                    push(vm, Value::Table(t));
                }

                OpCode::Idx => {
                    let key = vm.pop_value();
                    let receiver = match vm.stack.pop() {
                        Some(Slot::Place(place)) => match vm.read_place(&place) {
                            Value::Null => Value::Table(vivify(vm, &place, at)?),
                            v => v,
                        },
                        Some(Slot::Value(v)) => v,
                        None => return Err(underflow(at)),
                    };
                    let value = index_value(vm, &receiver, &key);
                    push(vm, value);
                }

                OpCode::IdxA => {
                    let key = vm.pop_value();
                    let table = match vm.stack.pop() {
                        Some(Slot::Place(place)) => match vm.read_place(&place) {
                            Value::Table(t) => t,
                            Value::Null => vivify(vm, &place, at)?,
                            other => return Err(VmError::NotAssignable(other.type_name())),
                        },
                        Some(Slot::Value(Value::Table(t))) => t,
                        Some(Slot::Value(other)) => {
                            return Err(VmError::NotAssignable(other.type_name()))
                        }
                        None => return Err(underflow(at)),
                    };
                    vm.stack.push(Slot::Place(Place::Element { table, key }));
                }

                // ---- Assignment ----
                OpCode::Assign => {
                    let value = vm.pop_value();
                    let place = pop_place(vm, at)?;
                    *vm.place_mut(&place, at)? = value.clone();
                    push(vm, value);
                }

                OpCode::AddAssign
                | OpCode::SubAssign
                | OpCode::MulAssign
                | OpCode::DivAssign
                | OpCode::ModAssign
                | OpCode::PowAssign
                | OpCode::BitAndAssign
                | OpCode::BitOrAssign
                | OpCode::BitXorAssign
                | OpCode::ShlAssign
                | OpCode::ShrAssign
                | OpCode::CatAssign => {
                    let rhs = vm.pop_value();
                    let place = pop_place(vm, at)?;
                    let target = vm.place_mut(&place, at)?;
                    let result = match arith_op(op) {
                        Some(aop) => arith::arith(aop, target, &rhs),
                        None => arith::concat(&[target.clone(), rhs]),
                    };
                    *target = result.clone();
                    push(vm, result);
                }

                OpCode::PreInc | OpCode::PreDec | OpCode::PostInc | OpCode::PostDec => {
                    let delta = if matches!(op, OpCode::PreInc | OpCode::PostInc) {
                        1
                    } else {
                        -1
                    };
                    let place = pop_place(vm, at)?;
                    let target = vm.place_mut(&place, at)?;
                    let old = arith::number_value(target);
                    let new = arith::step(&old, delta);
                    *target = new.clone();
                    let result = if matches!(op, OpCode::PreInc | OpCode::PreDec) {
                        new
                    } else {
                        old
                    };
                    push(vm, result);
                }

                // ---- Arithmetic ----
                OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Mod
                | OpCode::Pow
                | OpCode::BitAnd
                | OpCode::BitOr
                | OpCode::BitXor
                | OpCode::Shl
                | OpCode::Shr => {
                    let b = vm.pop_value();
                    let a = vm.pop_value();
                    let aop = arith_op(op)
                        .ok_or_else(|| VmError::corrupt(at, format!("{op} is not arithmetic")))?;
                    push(vm, arith::arith(aop, &a, &b));
                }

                OpCode::Neg => {
                    let v = vm.pop_value();
                    push(vm, arith::negate(&v));
                }

                OpCode::Num => {
                    let v = vm.pop_value();
                    push(vm, arith::to_numeric(&v));
                }

                OpCode::BitNot => {
                    let v = vm.pop_value();
                    push(vm, arith::bit_not(&v));
                }

                OpCode::Not => {
                    let v = vm.pop_value();
                    let falsy = !coerce::truthy(&v, &vm.heap);
                    push(vm, Value::Int(falsy as i64));
                }

                OpCode::Len => {
                    let v = vm.pop_value();
                    let n = coerce::length(&v, &vm.heap);
                    push(vm, Value::Int(n));
                }

                // ---- Comparison ----
                OpCode::Eq | OpCode::Ne | OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge => {
                    let b = vm.pop_value();
                    let a = vm.pop_value();
                    let result = match op {
                        OpCode::Eq => compare::values_equal(&a, &b),
                        OpCode::Ne => !compare::values_equal(&a, &b),
                        OpCode::Lt => compare::less_than(&a, &b),
                        OpCode::Le => compare::less_equal(&a, &b),
                        OpCode::Gt => compare::less_than(&b, &a),
                        _ => compare::less_equal(&b, &a),
                    };
                    push(vm, Value::Int(result as i64));
                }

                OpCode::Match | OpCode::NotMatch => {
                    let pattern = vm.pop_value();
                    let subject = vm.pop_value();
                    let matched = regex_match(vm, &subject, &pattern)?;
                    let result = matched == (op == OpCode::Match);
                    push(vm, Value::Int(result as i64));
                }

                // ---- Strings and ranges ----
                OpCode::Cat => {
                    let b = vm.pop_value();
                    let a = vm.pop_value();
                    push(vm, arith::concat(&[a, b]));
                }

                OpCode::CatN => {
                    let parts = take_values(vm, operand, at)?;
                    push(vm, arith::concat(&parts));
                }

                OpCode::Range => {
                    let to = vm.pop_value();
                    let from = vm.pop_value();
                    push(vm, Value::Range(Range::new(intval(&from), intval(&to), 1)));
                }

                OpCode::RangeStep => {
                    let step = vm.pop_value();
                    let to = vm.pop_value();
                    let from = vm.pop_value();
                    let range = Range::new(intval(&from), intval(&to), intval(&step));
                    push(vm, Value::Range(range));
                }

                // ---- Control ----
                OpCode::Jmp => pc = operand,

                OpCode::Jz | OpCode::Jnz => {
                    let v = vm.pop_value();
                    if coerce::truthy(&v, &vm.heap) == (op == OpCode::Jnz) {
                        pc = operand;
                    }
                }

                OpCode::JzKeep | OpCode::JnzKeep => {
                    let top = match vm.stack.last() {
                        Some(Slot::Value(v)) => v.clone(),
                        Some(Slot::Place(p)) => vm.read_place(p),
                        None => return Err(underflow(at)),
                    };
                    if coerce::truthy(&top, &vm.heap) == (op == OpCode::JnzKeep) {
                        pc = operand;
                    } else {
                        vm.stack.pop();
                    }
                }

                // ---- Calls ----
                OpCode::Call => {
                    let callee_fp = vm
                        .stack
                        .len()
                        .checked_sub(operand)
                        .filter(|&f| f > fp + frame_locals)
                        .ok_or_else(|| underflow(at))?;
                    if let Some(frame) = vm.frames.last_mut() {
                        frame.pc = pc;
                    }
                    if begin_call(vm, callee_fp, operand)? {
                        continue 'frames;
                    }
                }

                OpCode::Ret | OpCode::Ret0 => {
                    let value = if op == OpCode::Ret {
                        vm.pop_value()
                    } else {
                        Value::Null
                    };
                    if finish_call(vm, value, entry_depth) {
                        return Ok(());
                    }
                    continue 'frames;
                }

                // ---- Iteration ----
                OpCode::IterValue | OpCode::IterKeyValue => {
                    let with_key = op == OpCode::IterKeyValue;
                    let slot = local_index(fp, operand + with_key as usize, frame_locals, at)?
                        - with_key as usize;
                    let subject = vm.pop_value();
                    let it = LoopIter::new(&subject, &vm.heap, slot, with_key);
                    vm.iters.push(it);
                }

                OpCode::IterNext => {
                    if vm.iters.len() <= iter_base {
                        return Err(VmError::corrupt(at, "no active loop"));
                    }
                    let Some(it) = vm.iters.last_mut() else {
                        return Err(VmError::corrupt(at, "no active loop"));
                    };
                    match it.advance(&vm.heap) {
                        Some((key, value)) => {
                            let (slot, with_key) = (it.slot, it.with_key);
                            if with_key {
                                set_local(vm, slot, key, at)?;
                                set_local(vm, slot + 1, value, at)?;
                            } else {
                                set_local(vm, slot, value, at)?;
                            }
                        }
                        None => pc = operand,
                    }
                }

                OpCode::IterPop => {
                    if vm.iters.len() <= iter_base {
                        return Err(VmError::corrupt(at, "no active loop"));
                    }
                    vm.iters.pop();
                }
            }
        }
    }
}

/// Start a call of the value at `fp - 1` with `argc` arguments above it.
///
/// Returns `true` when a script frame was pushed and still has to run.
/// Natives run to completion here and leave their result at `fp - 1`.
pub(crate) fn begin_call(vm: &mut Vm, fp: usize, argc: usize) -> Result<bool> {
    // Callee and arguments are passed by value.
    for i in fp - 1..vm.stack.len() {
        if let Slot::Place(place) = &vm.stack[i] {
            let value = vm.read_place(place);
            vm.stack[i] = Slot::Value(value);
        }
    }
    let callee = match vm.stack.get(fp - 1) {
        Some(Slot::Value(v)) => v.clone(),
        _ => Value::Null,
    };
    let depth_limit = vm.config.max_call_depth;
    if vm.frames.len() + vm.native_depth >= depth_limit
        && matches!(callee, Value::Function(_) | Value::Native(_))
    {
        return Err(VmError::StackOverflow(depth_limit));
    }

    match callee {
        Value::Function(f) => {
            let (proto_idx, arity) = vm.function_info(f);
            let arity = arity as usize;
            let num_locals = vm.protos[proto_idx].num_locals;
            vm.stack.truncate(fp + argc.min(arity));
            vm.stack.resize(fp + arity.max(num_locals), Slot::default());
            trace!(
                function = %vm.protos[proto_idx].name,
                fp,
                argc,
                depth = vm.frames.len() + 1,
                "call"
            );
            vm.frames.push(CallFrame {
                proto: proto_idx,
                pc: 0,
                fp,
                iter_base: vm.iters.len(),
            });
            Ok(true)
        }
        Value::Native(id) => {
            let func = vm
                .natives
                .get(id.0 as usize)
                .map(|n| n.func)
                .ok_or(VmError::NotCallable("native"))?;
            trace!(native = id.0, fp, argc, "call native");
            vm.native_depth += 1;
            let result = func(vm, fp, argc);
            vm.native_depth -= 1;
            let produced = result?;
            vm.stack.truncate(fp);
            if produced == 0 {
                vm.set_result(fp, Value::Null);
            }
            Ok(false)
        }
        other => Err(VmError::NotCallable(other.type_name())),
    }
}

/// Pop the current frame, leaving `value` where its callee was. Returns
/// `true` once the frame count is back at `entry_depth`.
fn finish_call(vm: &mut Vm, value: Value, entry_depth: usize) -> bool {
    if let Some(frame) = vm.frames.pop() {
        vm.iters.truncate(frame.iter_base);
        vm.stack.truncate(frame.fp);
        vm.set_result(frame.fp, value);
        trace!(depth = vm.frames.len(), "return");
    }
    vm.frames.len() <= entry_depth
}

fn read_operand(code: &[u8], at: usize, op: OpCode) -> Result<usize> {
    let operand = match op.operand_bytes() {
        0 => Some(0),
        1 => code.get(at + 1).map(|&b| b as usize),
        _ => code
            .get(at + 1..at + 3)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize),
    };
    operand.ok_or_else(|| VmError::corrupt(at, format!("truncated operand for {op}")))
}

/// Operand of an indexed opcode, or the index baked into a shorthand.
fn short_index(op: OpCode, operand: usize) -> usize {
    match op {
        OpCode::Const0 | OpCode::Local0 | OpCode::LocalA0 => 0,
        OpCode::Const1 | OpCode::Local1 | OpCode::LocalA1 => 1,
        OpCode::Const2 | OpCode::Local2 | OpCode::LocalA2 => 2,
        _ => operand,
    }
}

fn arith_op(op: OpCode) -> Option<ArithOp> {
    Some(match op {
        OpCode::Add | OpCode::AddAssign => ArithOp::Add,
        OpCode::Sub | OpCode::SubAssign => ArithOp::Sub,
        OpCode::Mul | OpCode::MulAssign => ArithOp::Mul,
        OpCode::Div | OpCode::DivAssign => ArithOp::Div,
        OpCode::Mod | OpCode::ModAssign => ArithOp::Mod,
        OpCode::Pow | OpCode::PowAssign => ArithOp::Pow,
        OpCode::BitAnd | OpCode::BitAndAssign => ArithOp::BitAnd,
        OpCode::BitOr | OpCode::BitOrAssign => ArithOp::BitOr,
        OpCode::BitXor | OpCode::BitXorAssign => ArithOp::BitXor,
        OpCode::Shl | OpCode::ShlAssign => ArithOp::Shl,
        OpCode::Shr | OpCode::ShrAssign => ArithOp::Shr,
        _ => return None,
    })
}

fn push(vm: &mut Vm, value: Value) {
    vm.stack.push(Slot::Value(value));
}

fn underflow(at: usize) -> VmError {
    VmError::corrupt(at, "operand stack underflow")
}

fn local_index(fp: usize, n: usize, frame_locals: usize, at: usize) -> Result<usize> {
    if n < frame_locals {
        Ok(fp + n)
    } else {
        Err(VmError::corrupt(
            at,
            format!("local {n} outside frame of {frame_locals} locals"),
        ))
    }
}

fn set_local(vm: &mut Vm, index: usize, value: Value, at: usize) -> Result<()> {
    let slot = vm
        .stack
        .get_mut(index)
        .ok_or_else(|| VmError::corrupt(at, "loop variable outside the stack"))?;
    *slot = Slot::Value(value);
    Ok(())
}

fn global_name(constants: &[Value], k: usize, at: usize) -> Result<Rc<Str>> {
    match constants.get(k) {
        Some(Value::Str(s)) => Ok(Rc::clone(s)),
        _ => Err(VmError::corrupt(at, format!("constant {k} is not a global name"))),
    }
}

fn pop_place(vm: &mut Vm, at: usize) -> Result<Place> {
    match vm.stack.pop() {
        Some(Slot::Place(place)) => Ok(place),
        Some(Slot::Value(v)) => Err(VmError::NotAssignable(v.type_name())),
        None => Err(underflow(at)),
    }
}

/// Pop the top `n` slots as values, oldest first.
fn take_values(vm: &mut Vm, n: usize, at: usize) -> Result<Vec<Value>> {
    let start = vm.stack.len().checked_sub(n).ok_or_else(|| underflow(at))?;
    let slots = vm.stack.split_off(start);
    Ok(slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Value(v) => v,
            Slot::Place(p) => vm.read_place(&p),
        })
        .collect())
}

/// Store a fresh table into a `Null` place.
fn vivify(vm: &mut Vm, place: &Place, at: usize) -> Result<HeapIdx<Table>> {
    let t = vm.heap.alloc_table(Table::new());
    *vm.place_mut(place, at)? = Value::Table(t);
    Ok(t)
}

fn index_value(vm: &Vm, receiver: &Value, key: &Value) -> Value {
    match receiver {
        Value::Table(t) => vm.heap.table(*t).get(key),
        Value::Str(s) => index_text(s.as_bytes(), key),
        Value::Int(_) | Value::Float(_) => index_text(&receiver.to_bytes(), key),
        _ => Value::Null,
    }
}

/// Index into text: a range selects a substring, a number selects one byte.
/// Negative positions count from the end.
fn index_text(bytes: &[u8], key: &Value) -> Value {
    match key {
        Value::Range(r) => Value::str(substring(bytes, *r)),
        Value::Int(_) | Value::Float(_) | Value::Str(_) => {
            let n = bytes.len() as i64;
            let mut i = intval(key);
            if i < 0 {
                i = i.saturating_add(n);
            }
            if (0..n).contains(&i) {
                Value::str(vec![bytes[i as usize]])
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

/// Bytes at the positions of `r` that fall inside `bytes`. Endpoints are
/// resolved from the end when negative; positions outside are skipped while
/// keeping the step alignment.
fn substring(bytes: &[u8], r: Range) -> Vec<u8> {
    let n = bytes.len() as i128;
    let resolve = |i: i64| {
        let i = i as i128;
        if i < 0 {
            i + n
        } else {
            i
        }
    };
    let (mut i, to, step) = (resolve(r.from), resolve(r.to), r.step as i128);
    let mut out = Vec::new();
    if n == 0 || step == 0 {
        return out;
    }
    if step > 0 {
        if i < 0 {
            i += (-i + step - 1) / step * step;
        }
        let end = to.min(n - 1);
        while i <= end {
            out.push(bytes[i as usize]);
            i += step;
        }
    } else {
        let s = -step;
        if i > n - 1 {
            i -= (i - (n - 1) + s - 1) / s * s;
        }
        let end = to.max(0);
        while i >= end {
            out.push(bytes[i as usize]);
            i -= s;
        }
    }
    out
}

fn regex_match(vm: &mut Vm, subject: &Value, pattern: &Value) -> Result<bool> {
    let subject = subject.to_bytes();
    let pattern = pattern.to_bytes();
    Ok(vm.services.regex.is_match(&pattern, &subject)?)
}
