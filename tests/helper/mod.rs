#![allow(dead_code)]

pub mod registry;

pub use registry::{FakeRegistry, test_config};
