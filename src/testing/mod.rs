//! Shared test doubles
//!
//! Compiled into the library so integration tests and doctests can use
//! the same mocks as the unit tests.

pub mod mocks;

pub use mocks::MockProvider;
