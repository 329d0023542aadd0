//! Driver registry for many devices

use crate::config::DriverConfig;
use crate::device::{format_ieee, ZigbeeDevice};
use crate::driver::{Handled, SonoffDevice};
use crate::error::DriverError;
use crate::events::DeviceEvent;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use zcl_protocol::{InboundFrame, ZclTransport};

/// Drivers keyed by IEEE address, sharing one transport and event channel
pub struct DeviceRegistry {
    transport: Arc<dyn ZclTransport>,
    config: DriverConfig,
    /// Drivers (keyed by IEEE address)
    devices: DashMap<[u8; 8], Arc<SonoffDevice>>,
    event_tx: broadcast::Sender<DeviceEvent>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new(transport: Arc<dyn ZclTransport>, config: DriverConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            transport,
            config,
            devices: DashMap::new(),
            event_tx,
        }
    }

    /// Subscribe to events from all devices
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_tx.subscribe()
    }

    /// Create and register a driver, replacing any previous one for the address
    pub fn add(&self, info: ZigbeeDevice) -> Arc<SonoffDevice> {
        let ieee_address = info.ieee_address;
        let driver = Arc::new(SonoffDevice::new(
            info,
            Arc::clone(&self.transport),
            &self.config,
            self.event_tx.clone(),
        ));
        if let Some(previous) = self.devices.insert(ieee_address, Arc::clone(&driver)) {
            previous.teardown();
            tracing::info!("Replaced driver for {}", format_ieee(&ieee_address));
        }
        driver
    }

    #[must_use]
    pub fn get(&self, ieee_address: &[u8; 8]) -> Option<Arc<SonoffDevice>> {
        self.devices.get(ieee_address).map(|d| Arc::clone(d.value()))
    }

    /// Remove a driver, cancelling its background work
    pub fn remove(&self, ieee_address: &[u8; 8]) -> Option<Arc<SonoffDevice>> {
        let (_, driver) = self.devices.remove(ieee_address)?;
        driver.teardown();
        tracing::info!("Removed {}", driver.info().display_name());
        Some(driver)
    }

    /// Find a driver by network short address
    #[must_use]
    pub fn find_by_nwk(&self, nwk_address: u16) -> Option<Arc<SonoffDevice>> {
        self.devices
            .iter()
            .find(|entry| entry.value().info().nwk_address == nwk_address)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Route a received frame to the driver of its source device
    pub fn handle_frame(&self, inbound: &InboundFrame) -> Result<Handled, DriverError> {
        let nwk_address = inbound.source.nwk_address;
        let driver = self
            .find_by_nwk(nwk_address)
            .ok_or_else(|| DriverError::DeviceNotFound(format!("{nwk_address:#06x}")))?;
        driver.handle_frame(inbound)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
