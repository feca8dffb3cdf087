//! Everything needed to use the store over one transport.

use crate::bindings::{ChangeSink, NoopSink, StoreBindings};
use crate::bus::CommandBus;
use crate::connection::{Connection, ConnectionOptions};
use crate::error::BridgeResult;
use crate::relay::ChangeRelay;
use crate::store::ApiStore;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::info;

/// A connection, bus, bindings and relay assembled around one transport.
pub struct StoreClient {
    connection: Arc<Connection>,
    bus: CommandBus,
    bindings: StoreBindings,
    relay: ChangeRelay,
    store: ApiStore,
}

impl StoreClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_options(transport, ConnectionOptions::default(), Arc::new(NoopSink))
    }

    pub fn with_options(
        transport: Arc<dyn Transport>,
        options: ConnectionOptions,
        sink: Arc<dyn ChangeSink>,
    ) -> Self {
        let connection = Arc::new(Connection::with_options(transport, options));
        let bus = CommandBus::new();
        let bindings = StoreBindings::attach(&bus, connection.clone(), sink);
        let relay = ChangeRelay::new(connection.clone(), bus.clone());
        let store = ApiStore::new(bus.clone());

        Self {
            connection,
            bus,
            bindings,
            relay,
            store,
        }
    }

    pub fn store(&self) -> &ApiStore {
        &self.store
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn relay(&self) -> &ChangeRelay {
        &self.relay
    }

    /// Start relaying change notifications onto the bus.
    pub async fn watch_changes(&self) -> BridgeResult<()> {
        self.relay.start().await
    }

    /// Stop relaying, unbind the store commands and close the transport.
    pub async fn shutdown(mut self) {
        self.relay.stop();
        self.bindings.detach();
        self.connection.close().await;
        info!("Store client shut down");
    }
}
