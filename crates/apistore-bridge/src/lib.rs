//! Asynchronous command/response correlation for the apistore document model.
//!
//! This crate provides:
//! - A request correlator routing replies to their callers by id
//! - Worker and remote transports
//! - A command bus turning named events into point-to-point calls
//! - A relay re-dispatching change notifications on the bus
//! - Typed store bindings and facade

pub mod bindings;
pub mod bus;
pub mod client;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod model;
pub mod relay;
pub mod store;
pub mod transport;

pub use bindings::{ChangeSink, NoopSink, StoreBindings};
pub use bus::{CommandBus, CommandDetail, CommandFuture, Dispatch, ListenerId, WeakCommandBus};
pub use client::StoreClient;
pub use connection::{Connection, ConnectionOptions, DEFAULT_CHANGE_CAPACITY, DEFAULT_REQUEST_TIMEOUT};
pub use correlator::{Correlator, FailAllOutcome, PendingReply};
pub use error::{BridgeError, BridgeResult};
pub use model::{
    ApiInit, ApiProperty, CustomDomainPropertyInit, CustomPropertyField, DocumentationInit,
    DocumentationProperty, EndPointInit, EndPointProperty, OperationInit, OperationProperty,
    ServerProperty,
};
pub use relay::ChangeRelay;
pub use store::ApiStore;
pub use transport::{
    EngineWorker, Fault, FaultHandler, MessageHandler, ModelEngine, Notifier, RemoteTransport,
    Transport, WorkerChannel, WorkerSpawner, WorkerTransport,
};
