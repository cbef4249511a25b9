//! CLI command implementations.

pub(crate) mod fetch;
pub(crate) mod symbols;
pub(crate) mod watch;
