//! Route tables: message id and path to handler descriptor.
//!
//! Tables are read on every inbound frame and written rarely (startup,
//! scene-code hot reload), so each one is an `Arc`-snapshot behind an
//! `RwLock`: readers clone the current snapshot, writers build a new map
//! and swap the pointer. In-flight reads never observe a half-updated
//! table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use scenegate_core::error::{Result, SceneGateError};
use scenegate_core::message::{packet_parser, DecodePacket, PacketParser};

use crate::handler::{
    build_tcp, HttpHandlerFactory, RpcHandlerFactory, TcpHandler, TcpHandlerFactory,
};
use crate::scene::DEFAULT_EXECUTOR;

/// Registered binding from a TCP message id to its message type, handler
/// factory, and target executor. Immutable once constructed.
pub struct TcpHandlerDescriptor {
    pub msg_id: i32,
    pub message_name: &'static str,
    /// Byte-deserialization entry point, cached at registration.
    pub parser: PacketParser,
    pub factory: TcpHandlerFactory,
    pub executor: String,
}

impl TcpHandlerDescriptor {
    /// Typed constructor: message type `M`, handler type `H`.
    pub fn new<M, H>(msg_id: i32, executor: impl Into<String>) -> Self
    where
        M: DecodePacket,
        H: TcpHandler + Default + 'static,
    {
        Self {
            msg_id,
            message_name: M::NAME,
            parser: packet_parser::<M>(),
            factory: build_tcp::<H>,
            executor: executor.into(),
        }
    }
}

/// Registered binding from an HTTP/RPC path to its handler factory.
pub struct PathHandlerDescriptor<F> {
    pub path: String,
    pub factory: F,
}

impl<F> PathHandlerDescriptor<F> {
    pub fn new(path: impl Into<String>, factory: F) -> Self {
        Self {
            path: path.into(),
            factory,
        }
    }
}

pub type HttpDescriptor = PathHandlerDescriptor<HttpHandlerFactory>;
pub type RpcDescriptor = PathHandlerDescriptor<RpcHandlerFactory>;

/// Candidate handed over by the hot-reload loader for every newly loaded
/// handler type. Candidates without routing metadata are ignored with a
/// warning.
pub struct HandlerCandidate {
    /// Handler type name, for diagnostics.
    pub name: &'static str,
    pub route: Option<HandlerRoute>,
}

/// Routing metadata a candidate may carry.
pub enum HandlerRoute {
    Tcp {
        msg_id: i32,
        message_name: &'static str,
        /// `None` when the message type exposes no byte parser; such
        /// routes are rejected at registration.
        parser: Option<PacketParser>,
        factory: TcpHandlerFactory,
        /// Target executor; defaults to the generic I/O executor.
        executor: Option<String>,
    },
    Http {
        path: String,
        factory: HttpHandlerFactory,
    },
    Rpc {
        path: String,
        factory: RpcHandlerFactory,
    },
}

/// Wholesale replacement set for [`HandlerRegistry::reload`].
#[derive(Default)]
pub struct HandlerSet {
    pub tcp: Vec<TcpHandlerDescriptor>,
    pub http: Vec<HttpDescriptor>,
    pub rpc: Vec<RpcDescriptor>,
}

impl HandlerSet {
    pub fn is_empty(&self) -> bool {
        self.tcp.is_empty() && self.http.is_empty() && self.rpc.is_empty()
    }
}

/// Live route tables, keyed by message id (TCP) and path (HTTP/RPC).
#[derive(Default)]
pub struct HandlerRegistry {
    tcp: RwLock<Arc<HashMap<i32, Arc<TcpHandlerDescriptor>>>>,
    http: RwLock<Arc<HashMap<String, Arc<HttpDescriptor>>>>,
    rpc: RwLock<Arc<HashMap<String, Arc<RpcDescriptor>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a TCP route. Id 0 is reserved for failed identity
    /// resolution and is never registrable.
    pub fn register_tcp(&self, descriptor: TcpHandlerDescriptor) -> Result<()> {
        if descriptor.msg_id == 0 {
            return Err(SceneGateError::InvalidMessageId(0));
        }
        tracing::trace!(
            msg_id = descriptor.msg_id,
            message = descriptor.message_name,
            executor = %descriptor.executor,
            "tcp handler registered"
        );
        swap_insert(&self.tcp, descriptor.msg_id, Arc::new(descriptor));
        Ok(())
    }

    pub fn register_http(&self, descriptor: HttpDescriptor) {
        tracing::trace!(path = %descriptor.path, "http handler registered");
        swap_insert(&self.http, descriptor.path.clone(), Arc::new(descriptor));
    }

    pub fn register_rpc(&self, descriptor: RpcDescriptor) {
        tracing::trace!(path = %descriptor.path, "rpc handler registered");
        swap_insert(&self.rpc, descriptor.path.clone(), Arc::new(descriptor));
    }

    /// Loader contract: inspect a candidate's routing metadata and register
    /// it. Metadata-less candidates are ignored with a warning.
    pub fn load_handler(&self, candidate: HandlerCandidate) -> Result<()> {
        let Some(route) = candidate.route else {
            tracing::warn!(handler = candidate.name, "candidate carries no routing metadata");
            return Ok(());
        };
        match route {
            HandlerRoute::Tcp {
                msg_id,
                message_name,
                parser,
                factory,
                executor,
            } => {
                let parser = parser
                    .ok_or_else(|| SceneGateError::NoParserAvailable(message_name.to_string()))?;
                self.register_tcp(TcpHandlerDescriptor {
                    msg_id,
                    message_name,
                    parser,
                    factory,
                    executor: executor.unwrap_or_else(|| DEFAULT_EXECUTOR.to_string()),
                })
            }
            HandlerRoute::Http { path, factory } => {
                self.register_http(PathHandlerDescriptor::new(path, factory));
                Ok(())
            }
            HandlerRoute::Rpc { path, factory } => {
                self.register_rpc(PathHandlerDescriptor::new(path, factory));
                Ok(())
            }
        }
    }

    pub fn tcp_descriptor(&self, msg_id: i32) -> Option<Arc<TcpHandlerDescriptor>> {
        snapshot(&self.tcp).get(&msg_id).cloned()
    }

    /// Path lookup; anything from the first `?` on is ignored.
    pub fn http_descriptor(&self, path: &str) -> Option<Arc<HttpDescriptor>> {
        snapshot(&self.http).get(normalize_path(path)).cloned()
    }

    pub fn rpc_descriptor(&self, path: &str) -> Option<Arc<RpcDescriptor>> {
        snapshot(&self.rpc).get(normalize_path(path)).cloned()
    }

    pub fn is_tcp_registered(&self, msg_id: i32) -> bool {
        snapshot(&self.tcp).contains_key(&msg_id)
    }

    /// All registered TCP message ids, for diagnostics.
    pub fn tcp_message_ids(&self) -> Vec<i32> {
        snapshot(&self.tcp).keys().copied().collect()
    }

    /// Atomically swap in a rebuilt route set, e.g. after a handler-code
    /// hot reload. An entirely empty set is a no-op so a failed reload can
    /// never blank the tables; a partial set only replaces the tables it
    /// populates.
    pub fn reload(&self, set: HandlerSet) {
        if set.is_empty() {
            tracing::warn!("reload produced no handlers; previous routes retained");
            return;
        }

        if !set.tcp.is_empty() {
            let mut table = HashMap::with_capacity(set.tcp.len());
            for d in set.tcp {
                if d.msg_id == 0 {
                    tracing::warn!(message = d.message_name, "reload skipped message id 0");
                    continue;
                }
                table.insert(d.msg_id, Arc::new(d));
            }
            swap_table(&self.tcp, table);
        }
        if !set.http.is_empty() {
            let table = set
                .http
                .into_iter()
                .map(|d| (d.path.clone(), Arc::new(d)))
                .collect();
            swap_table(&self.http, table);
        }
        if !set.rpc.is_empty() {
            let table = set
                .rpc
                .into_iter()
                .map(|d| (d.path.clone(), Arc::new(d)))
                .collect();
            swap_table(&self.rpc, table);
        }
        tracing::info!("handler routes reloaded");
    }
}

fn normalize_path(path: &str) -> &str {
    match path.find('?') {
        Some(i) => &path[..i],
        None => path,
    }
}

fn snapshot<K, V>(lock: &RwLock<Arc<HashMap<K, V>>>) -> Arc<HashMap<K, V>> {
    match lock.read() {
        Ok(guard) => Arc::clone(&guard),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

fn swap_insert<K, V>(lock: &RwLock<Arc<HashMap<K, V>>>, key: K, value: V)
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    let mut guard = match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let mut table = HashMap::clone(&guard);
    table.insert(key, value);
    *guard = Arc::new(table);
}

fn swap_table<K, V>(lock: &RwLock<Arc<HashMap<K, V>>>, table: HashMap<K, V>) {
    let mut guard = match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Arc::new(table);
}
