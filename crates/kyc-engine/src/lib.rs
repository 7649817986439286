//! # kyc-engine: Transactional KYC Tier Engine
//!
//! Wraps the pure state machine from `kyc-state` with everything needed to
//! run it in a service: per-user serialization of writes, durable commits
//! with rollback, and best-effort side effects.
//!
//! ## Modules
//!
//! - **Engine** (`engine.rs`): account registry and every caller-facing
//!   operation.
//! - **Persistence** (`persistence.rs`): the gateway trait, an in-memory
//!   gateway, and a JSON-file gateway.
//! - **Notify** (`notify.rs`): tier event dispatch.
//! - **Review** (`review.rs`): hand-off of submissions to reviewers.
//! - **Config** (`config.rs`): environment-driven settings and policy loading.
//! - **Error** (`error.rs`): `EngineError` and its flat `ErrorKind`.
//!
//! ## Crate Policy
//!
//! - The engine performs no I/O of its own; all of it goes through the
//!   injected collaborators.
//! - Collaborator traits are `Send + Sync` and object-safe so they can be
//!   shared as `Arc<dyn Trait>`.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod review;

pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, ErrorKind};
pub use notify::{
    LogDispatcher, Notification, NotificationDispatcher, NotifyError, RecordingDispatcher,
    TierEvent,
};
pub use persistence::{InMemoryGateway, JsonFileGateway, PersistenceError, PersistenceGateway};
pub use review::{
    InMemoryReviewQueue, LogReviewQueue, ReviewQueue, ReviewQueueError, ReviewRequest,
};
