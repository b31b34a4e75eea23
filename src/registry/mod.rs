//! Stream registry: the process-wide name table
//!
//! The registry maps stream names to [`Stream`](crate::stream::Stream)s and
//! owns the [`Handlers`] table every producer binding dials through. It is an
//! explicit object: build one at startup, share it as `Arc<StreamRegistry>`,
//! call [`StreamRegistry::shutdown`] on exit.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<StreamRegistry>
//!                   ┌───────────────────────────┐
//!                   │ streams: name ─► Arc<Stream>
//!                   │ pending: name ─► [source] │
//!                   │ handlers: scheme ─► factory
//!                   └─────────────┬─────────────┘
//!                                 │ get / get_or_patch
//!                                 ▼
//!                          Arc<Stream> ──► ProducerBinding ──► Producer
//!                                 │
//!                                 └──► consumers
//! ```
//!
//! Each stream has its own lock; the registry lock only guards the table, so
//! lookups never wait on a stream that is negotiating or dialling.

pub mod config;
pub mod error;
pub mod handlers;
pub mod store;

pub use config::{RegistryConfig, SourceSpec, Sources, StreamsConfig};
pub use error::RegistryError;
pub use handlers::{scheme, Handlers};
pub use store::StreamRegistry;
