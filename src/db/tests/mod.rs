//! Shared database repository test infrastructure
//!
//! Each repository has a test module containing shared test functions that
//! take a test context of `&dyn XxxRepo`, plus SQLite setup using in-memory
//! databases.

mod users;
