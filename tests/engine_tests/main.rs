//! Engine tests: save, load, delete, query and relationship maintenance
//! across every column type

mod field_type_tests;
mod fixtures;
