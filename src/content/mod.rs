//! Content service access: entry model, client trait and its implementations.

pub mod client;
pub mod management;
pub mod memory;
pub mod model;

pub use client::ContentClient;
pub use management::ManagementClient;
pub use memory::{MemoryClient, UpdateFailure};
pub use model::{ContentType, Entry, FieldSchema, FieldValue, Link};
