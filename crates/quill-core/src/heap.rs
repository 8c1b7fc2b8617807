//! Arena heap with typed indices.
//!
//! Tables and script functions are allocated here and never freed
//! individually; the whole arena is released when the heap drops.

use crate::string::Str;
use crate::table::Table;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A typed index into an arena in the `Heap`.
pub struct HeapIdx<T>(u32, PhantomData<T>);

impl<T> Clone for HeapIdx<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for HeapIdx<T> {}

impl<T> PartialEq for HeapIdx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T> Eq for HeapIdx<T> {}

impl<T> std::hash::Hash for HeapIdx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> fmt::Debug for HeapIdx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl<T> HeapIdx<T> {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A script function: a prototype loaded into the VM plus its arity.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Rc<Str>,
    /// Index of the prototype in the VM's prototype store.
    pub proto: usize,
    pub arity: u8,
}

/// Arena storage for heap objects.
#[derive(Default)]
pub struct Heap {
    tables: Vec<Table>,
    functions: Vec<Function>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    pub fn alloc_table(&mut self, table: Table) -> HeapIdx<Table> {
        let idx = self.tables.len() as u32;
        self.tables.push(table);
        HeapIdx(idx, PhantomData)
    }

    pub fn table(&self, idx: HeapIdx<Table>) -> &Table {
        &self.tables[idx.0 as usize]
    }

    pub fn table_mut(&mut self, idx: HeapIdx<Table>) -> &mut Table {
        &mut self.tables[idx.0 as usize]
    }

    pub fn alloc_function(&mut self, function: Function) -> HeapIdx<Function> {
        let idx = self.functions.len() as u32;
        self.functions.push(function);
        HeapIdx(idx, PhantomData)
    }

    pub fn function(&self, idx: HeapIdx<Function>) -> &Function {
        &self.functions[idx.0 as usize]
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}
