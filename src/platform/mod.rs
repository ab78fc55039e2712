//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (injectable clock)
//! - Screen-to-world input mapping
//! - Storage (see `persistence::storage`)

pub mod input;
pub mod time;

pub use input::{LinearProjector, ScreenProjector};
pub use time::{Clock, ManualClock, SystemClock, epoch_day};
