//! Shared glue for the SAGE worker binaries

pub mod common;
