// Library root: re-exports all modules so integration tests and the binary
// can access the crate's public API.

pub mod config;
pub mod draft;
pub mod lottery;
pub mod persistence;
pub mod service;
pub mod stats;

#[cfg(test)]
mod test_support;
