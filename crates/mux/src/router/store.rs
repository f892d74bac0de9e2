use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ConcurrencyMode;
use crate::error::RouteError;
use crate::group::Group;
use crate::handler::RequestHandler;
use crate::method::Method;
use crate::trie::{PathTrie, TrieOptions};

pub type SharedHandler = Arc<dyn RequestHandler>;
pub type HandlerTrie = PathTrie<SharedHandler>;

/// Anything routes can be written into.
pub trait RouteSink {
    /// # Errors
    ///
    /// Returns the [`RouteError`] of the trie insertion.
    fn add_route(&mut self, method: Method, pattern: &str, handler: SharedHandler) -> Result<(), RouteError>;
}

/// The trie owned by a [`Router`](crate::Router), guarded according to its
/// [`ConcurrencyMode`].
pub struct TrieStore {
    kind: StoreKind,
}

enum StoreKind {
    Static(HandlerTrie),
    Shared(Arc<RwLock<HandlerTrie>>),
}

impl TrieStore {
    pub(crate) fn new(mode: ConcurrencyMode, options: TrieOptions) -> Self {
        let trie = PathTrie::new(options);
        let kind = match mode {
            ConcurrencyMode::Static => StoreKind::Static(trie),
            ConcurrencyMode::MutableWhileServing => StoreKind::Shared(Arc::new(RwLock::new(trie))),
        };
        Self { kind }
    }

    /// Runs `f` with the trie, under the read lock in shared mode.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&HandlerTrie) -> R) -> R {
        match &self.kind {
            StoreKind::Static(trie) => f(trie),
            StoreKind::Shared(trie) => f(&trie.read().unwrap_or_else(PoisonError::into_inner)),
        }
    }

    pub(crate) fn shared(&self) -> Option<&Arc<RwLock<HandlerTrie>>> {
        match &self.kind {
            StoreKind::Static(_) => None,
            StoreKind::Shared(trie) => Some(trie),
        }
    }
}

impl RouteSink for TrieStore {
    fn add_route(&mut self, method: Method, pattern: &str, handler: SharedHandler) -> Result<(), RouteError> {
        match &mut self.kind {
            StoreKind::Static(trie) => trie.insert(method, pattern, handler),
            StoreKind::Shared(trie) => trie.write().unwrap_or_else(PoisonError::into_inner).insert(method, pattern, handler),
        }
    }
}

impl fmt::Debug for TrieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.kind {
            StoreKind::Static(_) => ConcurrencyMode::Static,
            StoreKind::Shared(_) => ConcurrencyMode::MutableWhileServing,
        };
        f.debug_struct("TrieStore").field("mode", &mode).finish_non_exhaustive()
    }
}

/// Adds routes to a router that is already serving.
///
/// Obtained from [`Router::registrar`](crate::Router::registrar) in
/// `MutableWhileServing` mode. Every registration takes the write lock;
/// requests in flight keep the handler they resolved.
#[derive(Clone)]
pub struct Registrar {
    trie: Arc<RwLock<HandlerTrie>>,
    prefix: &'static str,
}

impl Registrar {
    pub(crate) fn new(trie: Arc<RwLock<HandlerTrie>>, prefix: &'static str) -> Self {
        Self { trie, prefix }
    }

    /// The root group, with the same prefix as the router's own.
    pub fn routes(&mut self) -> Group<'_, Self> {
        let prefix = self.prefix;
        Group::new(self, prefix)
    }
}

impl RouteSink for Registrar {
    fn add_route(&mut self, method: Method, pattern: &str, handler: SharedHandler) -> Result<(), RouteError> {
        self.trie.write().unwrap_or_else(PoisonError::into_inner).insert(method, pattern, handler)
    }
}

impl fmt::Debug for Registrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registrar").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}
