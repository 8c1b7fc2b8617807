//! VM state.

use crate::callinfo::{CallFrame, Place, Slot};
use crate::config::VmConfig;
use crate::dispatch;
use crate::error::{Result, VmError};
use crate::iter::LoopIter;
use crate::services::Services;
use quill_bytecode::{Code, Constant};
use quill_core::hash::HashTable;
use quill_core::heap::{Function, Heap, HeapIdx};
use quill_core::string::Str;
use quill_core::value::{NativeId, Value};
use std::rc::Rc;
use tracing::debug;

/// Native calling convention: `(vm, fp, argc) -> result count`.
///
/// Arguments sit at `fp..fp + argc`. A native that produces a value writes it
/// to `fp - 1` (see [`Vm::set_result`]) and returns `Ok(1)`; returning
/// `Ok(0)` leaves `Null` as the call's value.
pub type NativeFn = fn(&mut Vm, usize, usize) -> Result<usize>;

pub(crate) struct Native {
    pub name: Rc<Str>,
    pub func: NativeFn,
}

/// A loaded function body with its constants resolved to values.
pub(crate) struct Prototype {
    pub name: Rc<Str>,
    pub arity: u8,
    pub bytes: Box<[u8]>,
    pub constants: Box<[Value]>,
    pub num_locals: usize,
}

/// The Quill virtual machine.
pub struct Vm {
    /// Operand stack: callee, arguments and locals of every active frame,
    /// followed by temporaries.
    pub(crate) stack: Vec<Slot>,
    pub(crate) frames: Vec<CallFrame>,
    /// Active loop iterators, innermost last.
    pub(crate) iters: Vec<LoopIter>,
    pub(crate) protos: Vec<Rc<Prototype>>,
    pub(crate) natives: Vec<Native>,
    /// Natives currently executing; counts toward the call depth limit.
    pub(crate) native_depth: usize,
    pub(crate) globals: HashTable,
    pub(crate) heap: Heap,
    pub(crate) services: Services,
    pub(crate) config: VmConfig,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Vm {
            stack: Vec::with_capacity(config.initial_stack),
            frames: Vec::new(),
            iters: Vec::new(),
            protos: Vec::new(),
            natives: Vec::new(),
            native_depth: 0,
            globals: HashTable::new(),
            heap: Heap::new(),
            services: Services::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Load a script and return it as a callable function value.
    ///
    /// Loaded prototypes and functions live as long as the VM, so hosts that
    /// `eval` in a loop should expect the arena to grow with every call.
    pub fn load(&mut self, code: Code) -> Value {
        let proto = self.load_proto("main", 0, code);
        let name = Rc::clone(&self.protos[proto].name);
        let f = self.heap.alloc_function(Function {
            name,
            proto,
            arity: 0,
        });
        debug!(
            function = f.index(),
            prototypes = self.protos.len(),
            "loaded code"
        );
        Value::Function(f)
    }

    fn load_proto(&mut self, name: &str, arity: u8, code: Code) -> usize {
        let (bytes, constants, functions, num_locals) = code.into_parts();
        let nested: Vec<Value> = functions
            .into_iter()
            .map(|f| {
                let proto = self.load_proto(&f.name, f.arity, f.code);
                let func = self.heap.alloc_function(Function {
                    name: Rc::clone(&self.protos[proto].name),
                    proto,
                    arity: f.arity,
                });
                Value::Function(func)
            })
            .collect();
        let constants = constants
            .into_iter()
            .map(|k| match k {
                Constant::Null => Value::Null,
                Constant::Int(i) => Value::Int(i),
                Constant::Float(f) => Value::Float(f),
                Constant::Str(s) => Value::Str(s),
                Constant::Regex(s) => Value::Regex(s),
                Constant::Function(i) => nested.get(i).cloned().unwrap_or_default(),
            })
            .collect();
        self.protos.push(Rc::new(Prototype {
            name: Rc::new(Str::from(name)),
            arity,
            bytes: bytes.into_boxed_slice(),
            constants,
            num_locals,
        }));
        self.protos.len() - 1
    }

    /// Load and run a script, returning the value of its top-level `Ret`.
    pub fn eval(&mut self, code: Code) -> Result<Value> {
        let main = self.load(code);
        self.call_value(&main, &[])
    }

    /// Call a function or native with `args`. Re-entrant: natives may use it
    /// to call back into script code.
    ///
    /// On error the stack, frames and iterators are cut back to where they
    /// were on entry, so the VM stays usable.
    pub fn call_value(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        let saved = (
            self.stack.len(),
            self.frames.len(),
            self.iters.len(),
            self.native_depth,
        );
        let result = self.call_inner(callee, args);
        if let Err(err) = &result {
            if saved.1 == 0 && saved.3 == 0 {
                debug!(error = %err, "script error");
            }
            self.stack.truncate(saved.0);
            self.frames.truncate(saved.1);
            self.iters.truncate(saved.2);
            self.native_depth = saved.3;
        }
        result
    }

    fn call_inner(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        let fp = self.stack.len() + 1;
        self.stack.push(Slot::Value(callee.clone()));
        self.stack
            .extend(args.iter().cloned().map(Slot::Value));
        let depth = self.frames.len();
        if dispatch::begin_call(self, fp, args.len())? {
            dispatch::execute(self, depth)?;
        }
        Ok(self.pop_value())
    }

    /// Bind a native function to a global name.
    pub fn register_native(&mut self, name: &str, func: NativeFn) -> NativeId {
        let id = NativeId(self.natives.len() as u32);
        let name = Rc::new(Str::from(name));
        self.natives.push(Native {
            name: Rc::clone(&name),
            func,
        });
        self.globals.insert(&name, Value::Native(id));
        debug!(name = %name, id = id.0, "registered native");
        id
    }

    pub fn native_name(&self, id: NativeId) -> Option<&Rc<Str>> {
        self.natives.get(id.0 as usize).map(|n| &n.name)
    }

    /// Argument `i` of a native call, `Null` when not supplied.
    pub fn arg(&self, fp: usize, argc: usize, i: usize) -> Value {
        if i >= argc {
            return Value::Null;
        }
        match self.stack.get(fp + i) {
            Some(Slot::Value(v)) => v.clone(),
            Some(Slot::Place(p)) => self.read_place(p),
            None => Value::Null,
        }
    }

    /// All arguments of a native call.
    pub fn args(&self, fp: usize, argc: usize) -> Vec<Value> {
        (0..argc).map(|i| self.arg(fp, argc, i)).collect()
    }

    /// Store a native's result at `fp - 1`.
    pub fn set_result(&mut self, fp: usize, value: Value) {
        if let Some(slot) = fp.checked_sub(1).and_then(|i| self.stack.get_mut(i)) {
            *slot = Slot::Value(value);
        }
    }

    pub fn global(&self, name: &str) -> Value {
        self.globals
            .lookup(&Str::from(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(&Rc::new(Str::from(name)), value);
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    /// Operand stack height. Zero whenever no call is in progress.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn pop_value(&mut self) -> Value {
        match self.stack.pop() {
            Some(Slot::Value(v)) => v,
            Some(Slot::Place(p)) => self.read_place(&p),
            None => Value::Null,
        }
    }

    pub(crate) fn read_place(&self, place: &Place) -> Value {
        match place {
            Place::Local(i) => match self.stack.get(*i) {
                Some(Slot::Value(v)) => v.clone(),
                _ => Value::Null,
            },
            Place::Global(name) => self.globals.lookup(name).cloned().unwrap_or_default(),
            Place::Element { table, key } => self.heap.table(*table).get(key),
        }
    }

    /// Writable reference to the value behind `place`, created as `Null`
    /// when absent.
    pub(crate) fn place_mut(&mut self, place: &Place, pc: usize) -> Result<&mut Value> {
        match place {
            Place::Local(i) => match self.stack.get_mut(*i) {
                Some(Slot::Value(v)) => Ok(v),
                _ => Err(VmError::corrupt(pc, "local slot does not hold a value")),
            },
            Place::Global(name) => Ok(self.globals.entry(name)),
            Place::Element { table, key } => Ok(self.heap.table_mut(*table).entry(key)),
        }
    }

    pub(crate) fn function_info(&self, f: HeapIdx<Function>) -> (usize, u8) {
        let func = self.heap.function(f);
        (func.proto, func.arity)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
