//! Command implementations for the `monomaker` binary.

pub mod convert;
