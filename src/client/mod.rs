// Client module
pub mod coordinator;

pub use coordinator::{CoordinatorClient, CoordinatorResponse};
