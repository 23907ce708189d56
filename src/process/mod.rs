//! External process execution
//!
//! Package manager invocations go through the [`Executable`] trait so the
//! build pipeline can be exercised against a scripted fake in tests.

mod executable;
#[cfg(test)]
pub(crate) mod fake;

pub use executable::{CommandExecutable, Executable, Execution};
