//! Request-side vocabulary shared by the search pipeline: filter inputs,
//! pagination arguments, the opaque cursor codec, and input tokenization.

pub mod cursor;
pub mod filters;
pub mod tokenize;
