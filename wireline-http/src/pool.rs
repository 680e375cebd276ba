//! Domain-keyed connection pool state.
//!
//! Each (host, port, tls) tuple maps to one [`DomainNode`] holding the
//! domain's connection count, idle-connection FIFO, and pending-request
//! FIFO. Nodes are created on first use and removed deterministically
//! when both counts reach zero.

use std::collections::{HashMap, VecDeque};

use h1_proto::Request;

use crate::conn::ConnId;
use crate::handler::ResponseHandler;

/// Identity of a connection target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainKey {
    /// Host name or address literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Whether the transport is TLS.
    pub tls: bool,
}

impl DomainKey {
    /// Create a key from its parts.
    pub fn new(host: &str, port: u16, tls: bool) -> Self {
        Self {
            host: host.to_string(),
            port,
            tls,
        }
    }
}

/// A request waiting for a free connection.
pub(crate) struct PendingTask {
    pub request: Request,
    pub handler: Box<dyn ResponseHandler>,
}

/// Per-domain connection bookkeeping.
pub(crate) struct DomainNode {
    /// Connections available for reuse, oldest first.
    pub idle: VecDeque<ConnId>,
    /// Requests waiting for a connection, submission order.
    pub pending: VecDeque<PendingTask>,
    /// Every open connection owned by this domain, idle or busy.
    pub active: usize,
}

impl DomainNode {
    fn new() -> Self {
        Self {
            idle: VecDeque::new(),
            pending: VecDeque::new(),
            active: 0,
        }
    }
}

/// The keyed collection of domain nodes.
pub(crate) struct Pool {
    nodes: HashMap<DomainKey, DomainNode>,
}

impl Pool {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// The node for `key`, created on first use.
    pub fn node_mut(&mut self, key: &DomainKey) -> &mut DomainNode {
        self.nodes
            .entry(key.clone())
            .or_insert_with(DomainNode::new)
    }

    /// The node for `key`, if it exists.
    pub fn get_mut(&mut self, key: &DomainKey) -> Option<&mut DomainNode> {
        self.nodes.get_mut(key)
    }

    /// Remove the node when it owns no connections and has no queued
    /// work. Returns true if it was removed.
    pub fn remove_if_drained(&mut self, key: &DomainKey) -> bool {
        if let Some(node) = self.nodes.get(key)
            && node.active == 0
            && node.pending.is_empty()
        {
            self.nodes.remove(key);
            return true;
        }
        false
    }

    /// True when no domain nodes remain.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_created_on_first_use() {
        let mut pool = Pool::new();
        let key = DomainKey::new("example.com", 80, false);
        assert!(pool.get_mut(&key).is_none());
        pool.node_mut(&key).active = 1;
        assert_eq!(pool.get_mut(&key).map(|n| n.active), Some(1));
    }

    #[test]
    fn keys_distinguish_port_and_tls() {
        let mut pool = Pool::new();
        pool.node_mut(&DomainKey::new("h", 80, false)).active = 1;
        pool.node_mut(&DomainKey::new("h", 443, true)).active = 2;
        assert_eq!(
            pool.get_mut(&DomainKey::new("h", 80, false)).map(|n| n.active),
            Some(1)
        );
        assert_eq!(
            pool.get_mut(&DomainKey::new("h", 443, true)).map(|n| n.active),
            Some(2)
        );
        assert!(pool.get_mut(&DomainKey::new("h", 80, true)).is_none());
    }

    #[test]
    fn drained_node_is_removed() {
        let mut pool = Pool::new();
        let key = DomainKey::new("h", 80, false);
        let node = pool.node_mut(&key);
        node.active = 1;
        assert!(!pool.remove_if_drained(&key));
        pool.node_mut(&key).active = 0;
        assert!(pool.remove_if_drained(&key));
        assert!(pool.is_empty());
    }
}
