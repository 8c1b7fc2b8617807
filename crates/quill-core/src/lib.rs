//! Quill core types: values, strings, tables and the object heap.

pub mod hash;
pub mod heap;
pub mod number;
pub mod string;
pub mod table;
pub mod value;
