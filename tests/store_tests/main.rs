//! Store tests: the in-memory and file-backed KeyValueStore implementations

mod file_tests;
mod memory_tests;
