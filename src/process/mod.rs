//! Live Windows processes as inspection targets
//!
//! Attaching (finding the PID, acquiring privileges) happens elsewhere; this
//! module only turns an opened process into [`ForeignMemory`].
//!
//! [`ForeignMemory`]: crate::memory::ForeignMemory

pub mod handle;

pub use handle::{ProcessAccess, ProcessHandle};
