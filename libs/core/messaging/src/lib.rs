//! Topic-based event broker abstractions.
//!
//! Three seams cover what services need from a broker:
//! - [`TopicManager`]: make sure a topic exists (idempotent, race tolerant)
//! - [`EventPublisher`]: send a JSON event and learn whether it was confirmed
//! - [`EventSubscriber`]: consume a topic through a durable consumer with
//!   explicit acknowledgement
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐        ┌──────────────────────────────┐
//! │  Your Service   │        │           Backends           │
//! │                 │        │                              │
//! │ ensure_topic ───│───────▶│  JetStreamBroker (feature    │
//! │ publish      ───│───────▶│  `nats`)                     │
//! │ subscribe    ───│───────▶│  InMemoryBroker (tests)      │
//! └─────────────────┘        └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use messaging::{EventSubscriber, InMemoryBroker, TopicManager, TopicSpec};
//!
//! let broker = InMemoryBroker::new();
//! broker.ensure_topic(&TopicSpec::new("purchases")).await?;
//! let mut deliveries = broker.subscribe::<Purchase>("purchases").await?;
//! while let Some(delivery) = deliveries.next().await {
//!     let delivery = delivery?;
//!     handle(&delivery.payload).await?;
//!     delivery.ack().await?;
//! }
//! ```

mod error;
mod memory;
mod publisher;
mod subscriber;
mod topic;

#[cfg(feature = "nats")]
pub mod nats;

pub use error::BrokerError;
pub use memory::InMemoryBroker;
pub use publisher::{EventPublisher, PublishOutcome};
pub use subscriber::{Delivery, EventSubscriber, Subscription};
pub use topic::{stream_name_for, TopicManager, TopicSpec};
