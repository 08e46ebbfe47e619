//! Render submission and completion polling.
//!
//! - `RenderClient`: RPITIT port to the remote render service
//! - `Poller`: waits on a pending job until a terminal outcome

pub mod client;
pub mod poller;

pub use client::{JobStatusSource, RenderClient};
pub use poller::{BoundedPoller, PollOutcome, PollProgress, Poller, ProgressObserver};
