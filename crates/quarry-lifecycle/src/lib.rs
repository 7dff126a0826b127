mod error;
mod events;
mod manager;

pub use error::LifecycleError;
pub use events::{EventSink, NullEventSink};
pub use manager::{ImportOutcome, LifecycleManager};
