//! Background work queue
//!
//! Holds asynchronous AI work items through their status lifecycle and
//! processes them one at a time when the host asks.

mod core;
mod dispatch;
mod recovery;

pub use self::core::{ProcessReport, WorkQueue};
pub use dispatch::framing;
pub use recovery::{INTERRUPTED_REASON, RecoveryStats};
