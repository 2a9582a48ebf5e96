pub mod monitor;
pub mod redundancy;
pub mod registry;
pub mod ss_link;

pub use registry::{ServerRecord, ServerRegistry};
