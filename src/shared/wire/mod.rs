pub mod frames;
pub mod types;

pub use frames::{FileMetadata, JoinRecord};
pub use types::{Operation, Status};
