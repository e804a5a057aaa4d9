#![doc = include_str!("RUSTDOC.md")]

pub mod bus;
pub mod cache;
pub mod config;
pub mod logger;
pub mod page;
pub mod permission;
pub mod platform;
pub mod push;
pub mod util;
pub mod worker;

#[cfg(test)]
pub mod test_support;
