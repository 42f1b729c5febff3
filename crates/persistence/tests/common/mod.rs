//! Test infrastructure for the persistence components.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
