//! `tessera-sequencer` — from pending transactions to computed blocks.
//!
//! ```text
//! Mempool ─► UnprovenBlockProducer ─► UnprovenBlockQueue
//!                                          │
//!              BaseLayer ◄─ BlockProducer ◄┘ (trace, prove, merge)
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod mempool;
pub mod storage;
pub mod base_layer;
pub mod events;
pub mod unproven;
pub mod producer;
pub mod trigger;
pub mod telemetry;
pub mod node;

pub use base_layer::{BaseLayer, NoopBaseLayer};
pub use config::SequencerConfig;
pub use error::{SequencerError, SequencerResult};
pub use events::{EventBus, ProducerEvent};
pub use mempool::{Mempool, PrivateMempool};
pub use node::Sequencer;
pub use producer::BlockProducer;
pub use storage::{BlockStorage, InMemoryBlockStorage, UnprovenBlockQueue};
pub use telemetry::init_tracing;
pub use trigger::BlockTrigger;
pub use unproven::UnprovenBlockProducer;
