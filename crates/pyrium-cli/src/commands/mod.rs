//! CLI command implementations.

pub mod info;
pub mod inspect;
pub mod run;
