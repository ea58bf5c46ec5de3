//! Event bus ports and the in-memory bus.

mod in_memory;
mod publisher;
mod subscriber;

pub use in_memory::InMemoryBus;
pub use publisher::{PublishError, Publisher};
pub use subscriber::{EventHandler, Subscriber};
