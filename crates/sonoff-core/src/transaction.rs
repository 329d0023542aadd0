//! Per-call transaction scoping
//!
//! A cluster handle never carries mutable request state. Every read, write or
//! command opens a [`TransactionScope`] that holds the cluster's lock for the
//! duration of the exchange and stamps the manufacturer code by value onto the
//! frames it builds, so concurrent callers cannot observe each other's code.

use crate::cluster::ClusterSchema;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use zcl_protocol::{ClusterAddress, GlobalCommand, SendOptions, ZclFrame, ZclRequest};

/// Addressed cluster instance on one device
#[derive(Debug, Clone)]
pub struct ClusterHandle {
    address: ClusterAddress,
    schema: &'static ClusterSchema,
    lock: Arc<Mutex<()>>,
}

impl ClusterHandle {
    #[must_use]
    pub fn new(nwk_address: u16, endpoint: u8, schema: &'static ClusterSchema) -> Self {
        Self {
            address: ClusterAddress {
                nwk_address,
                endpoint,
                cluster_id: schema.id,
            },
            schema,
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn address(&self) -> ClusterAddress {
        self.address
    }

    #[must_use]
    pub fn schema(&self) -> &'static ClusterSchema {
        self.schema
    }

    /// Wait for exclusive access and open a transaction
    pub async fn begin(&self, sequence: u8) -> TransactionScope<'_> {
        let guard = self.lock.lock().await;
        TransactionScope {
            _guard: guard,
            transaction: Transaction {
                address: self.address,
                manufacturer_code: self.schema.manufacturer_code,
                sequence,
            },
        }
    }
}

/// Exclusive access to a cluster for one exchange
pub struct TransactionScope<'a> {
    _guard: MutexGuard<'a, ()>,
    transaction: Transaction,
}

impl std::ops::Deref for TransactionScope<'_> {
    type Target = Transaction;

    fn deref(&self) -> &Transaction {
        &self.transaction
    }
}

/// Header context of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub address: ClusterAddress,
    pub manufacturer_code: Option<u16>,
    pub sequence: u8,
}

impl Transaction {
    /// Global command frame carrying this transaction's manufacturer code
    #[must_use]
    pub fn global(&self, command: GlobalCommand, payload: Vec<u8>) -> ZclFrame {
        ZclFrame::global(self.manufacturer_code, self.sequence, command, payload)
    }

    /// Cluster-specific command frame carrying this transaction's manufacturer code
    #[must_use]
    pub fn command(&self, command_id: u8, payload: Vec<u8>) -> ZclFrame {
        ZclFrame::cluster_command(self.manufacturer_code, self.sequence, command_id, payload)
    }

    #[must_use]
    pub fn request(&self, frame: ZclFrame, options: SendOptions) -> ZclRequest {
        let frame = frame.with_disable_default_response(!options.expect_default_response);
        ZclRequest {
            target: self.address,
            frame,
            options,
        }
    }
}
