//! Random numbers: `rand` and `seed`.

use crate::ret;
use quill_core::value::Value;
use quill_vm::coerce::intval;
use quill_vm::error::Result;
use quill_vm::Vm;

pub fn register(vm: &mut Vm) {
    vm.register_native("rand", native_rand);
    vm.register_native("seed", native_seed);
}

/// `rand()` is a float in `[0, 1)`, `rand(n)` an integer in `[0, n)` and
/// `rand(lo, hi)` an integer in `[lo, hi]`. Empty intervals give `lo`.
fn native_rand(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let v = match argc {
        0 => Value::Float(vm.services_mut().random.next_f64()),
        _ => {
            let (lo, hi) = if argc == 1 {
                (0, intval(&vm.arg(fp, argc, 0)).saturating_sub(1))
            } else {
                (intval(&vm.arg(fp, argc, 0)), intval(&vm.arg(fp, argc, 1)))
            };
            Value::Int(pick(vm, lo, hi))
        }
    };
    ret(vm, fp, v)
}

fn pick(vm: &mut Vm, lo: i64, hi: i64) -> i64 {
    if hi <= lo {
        return lo;
    }
    let span = hi.abs_diff(lo).wrapping_add(1);
    let r = vm.services_mut().random.next_u64();
    // span is zero only for the full i64 range
    let offset = if span == 0 { r } else { r % span };
    lo.wrapping_add(offset as i64)
}

/// `seed(n)` restarts the sequence; the same seed replays the same numbers.
fn native_seed(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let seed = intval(&vm.arg(fp, argc, 0)) as u64;
    vm.services_mut().random.reseed(seed);
    Ok(0)
}
