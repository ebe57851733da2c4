//! Test helpers shared across permit crates.

pub mod container;
pub mod host;
pub mod sink;

pub use container::{FakeContainer, FakeScope};
pub use host::RecordingHost;
pub use sink::RecordingSink;
