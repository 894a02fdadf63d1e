//! CLI command handlers

pub mod wallet;
pub mod withdraw;
