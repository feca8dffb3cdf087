//! Local command bus.
//!
//! Dispatching a command runs every listener bound to its name. A listener
//! answers by attaching a result future to the [`CommandDetail`]; the first
//! one to do so wins and the dispatcher awaits it. With no answer the
//! dispatch resolves to [`Dispatch::NoHandler`].

use crate::error::{BridgeError, BridgeResult};
use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Boxed result a listener attaches to a command.
pub type CommandFuture = BoxFuture<'static, BridgeResult<Value>>;

/// A bus listener.
pub type Listener = Arc<dyn Fn(&mut CommandDetail) + Send + Sync>;

/// Handle returned by [`CommandBus::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The command as listeners see it.
pub struct CommandDetail {
    name: String,
    args: Vec<Value>,
    result: Option<CommandFuture>,
}

impl CommandDetail {
    fn new(name: &str, args: Vec<Value>) -> Self {
        Self {
            name: name.to_string(),
            args,
            result: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut Vec<Value> {
        &mut self.args
    }

    /// Decode argument `index`.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> BridgeResult<T> {
        let value = self.args.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            BridgeError::InvalidArguments(format!("{} argument {}: {}", self.name, index, e))
        })
    }

    /// Attach the command's result. Returns false if another listener got there first.
    pub fn set_result<F>(&mut self, result: F) -> bool
    where
        F: Future<Output = BridgeResult<Value>> + Send + 'static,
    {
        if self.result.is_some() {
            debug!(command = %self.name, "Result already attached, ignoring");
            return false;
        }
        self.result = Some(result.boxed());
        true
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }
}

/// Outcome of [`CommandBus::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Handled(Value),
    NoHandler,
}

struct BusInner {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

/// Named-event bus turning broadcast listeners into point-to-point calls.
#[derive(Clone)]
pub struct CommandBus {
    inner: Arc<BusInner>,
}

/// Non-owning handle to a [`CommandBus`].
#[derive(Clone)]
pub struct WeakCommandBus {
    inner: Weak<BusInner>,
}

impl WeakCommandBus {
    pub fn upgrade(&self) -> Option<CommandBus> {
        self.inner.upgrade().map(|inner| CommandBus { inner })
    }
}

impl CommandBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakCommandBus {
        WeakCommandBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Bind `listener` to `name`.
    pub fn on<F>(&self, name: &str, listener: F) -> ListenerId
    where
        F: Fn(&mut CommandDetail) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .write()
            .entry(name.to_string())
            .or_default()
            .push((id, Arc::new(listener)));
        trace!(event = %name, listener = id.0, "Listener added");
        id
    }

    /// Unbind a listener. Returns false if it was not bound to `name`.
    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let Some(bound) = listeners.get_mut(name) else {
            return false;
        };

        let before = bound.len();
        bound.retain(|(listener_id, _)| *listener_id != id);
        let removed = bound.len() != before;
        if bound.is_empty() {
            listeners.remove(name);
        }
        removed
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(name)
            .map_or(0, |bound| bound.len())
    }

    /// Copy of the listeners bound to `name`, in registration order.
    fn snapshot(&self, name: &str) -> Vec<Listener> {
        self.inner
            .listeners
            .read()
            .get(name)
            .map(|bound| bound.iter().map(|(_, listener)| listener.clone()).collect())
            .unwrap_or_default()
    }

    /// Run the listeners for `name` and return the future of the attached result.
    ///
    /// Listeners run synchronously before this returns. Listeners added or
    /// removed while they run take effect from the next dispatch.
    pub fn dispatch(&self, name: &str, args: Vec<Value>) -> BoxFuture<'static, BridgeResult<Dispatch>> {
        let mut detail = CommandDetail::new(name, args);
        for listener in self.snapshot(name) {
            listener(&mut detail);
        }

        match detail.result {
            Some(result) => async move { result.await.map(Dispatch::Handled) }.boxed(),
            None => {
                debug!(command = %name, "No listener answered");
                future::ready(Ok(Dispatch::NoHandler)).boxed()
            }
        }
    }

    /// Fire-and-forget event. Returns how many listeners ran.
    pub fn emit(&self, name: &str, payload: Value) -> usize {
        let listeners = self.snapshot(name);
        let mut detail = CommandDetail::new(name, vec![payload]);
        for listener in &listeners {
            listener(&mut detail);
        }
        if detail.has_result() {
            debug!(event = %name, "Event listener attached a result, dropping it");
        }
        listeners.len()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}
