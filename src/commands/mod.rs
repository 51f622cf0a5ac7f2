//! One-shot command line commands.
//!
//! Each command runs to completion and exits; none of them needs the
//! single instance lock.

pub mod devices;
pub mod reload;
pub mod simulate;
