//! Per-device driver
//!
//! One [`SonoffDevice`] serves one relay. Its behavior is selected by the
//! device's [`DeviceVariant`] rather than by subclassing: the variant decides
//! which settings are mirrored, whether inching is offered and whether bound
//! toggles are turned into button presses.

use crate::attributes::{translate_records, AttributeClient};
use crate::bound::{BoundCommandRouter, BoundDisposition};
use crate::cluster::{id, ClusterKind, CMD_PROTOCOL_DATA};
use crate::config::DriverConfig;
use crate::device::{DeviceVariant, ReportingIntervals, ZigbeeDevice};
use crate::dispatch::{classify, Disposition};
use crate::error::DriverError;
use crate::events::{DeviceEvent, DeviceEventKind};
use crate::inching::{InchingMode, InchingRequest, ResponseOutcome, StatusResponse, INCHING_SETTINGS};
use crate::transaction::ClusterHandle;
use crate::translate::Settings;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use zcl_protocol::{
    parse_report_attributes, GlobalCommand, InboundFrame, ReadAttributesResponse, Status,
    ZclFrame, ZclTransport,
};

const POWER_ON_BEHAVIOR: &str = "power_on_behavior";

/// How an inbound frame was handled
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// Write attributes response on the Sonoff cluster, consumed
    Acknowledged,
    /// Inching status reported
    StatusResponse(ResponseOutcome),
    /// Bound toggle turned into a button press
    ButtonPressed { count: u64 },
    /// Bound on/off command that is not interpreted
    Unhandled { command: u8 },
    /// Attribute report translated into settings
    AttributesReported(Settings),
    /// Default response to an earlier request
    DefaultResponse { command: u8, status: Status },
}

/// Driver for one relay
pub struct SonoffDevice {
    info: ZigbeeDevice,
    variant: DeviceVariant,
    client: AttributeClient,
    on_off: Option<ClusterHandle>,
    sonoff: Option<ClusterHandle>,
    router: BoundCommandRouter,
    verify_delay: Duration,
    event_tx: broadcast::Sender<DeviceEvent>,
    verify_task: Mutex<Option<JoinHandle<()>>>,
}

impl SonoffDevice {
    /// Create a driver for `info`, publishing events on `event_tx`.
    ///
    /// Cluster handles are taken from the configured endpoint; a cluster the
    /// endpoint does not serve stays unavailable for the driver's lifetime.
    pub fn new(
        info: ZigbeeDevice,
        transport: Arc<dyn ZclTransport>,
        config: &DriverConfig,
        event_tx: broadcast::Sender<DeviceEvent>,
    ) -> Self {
        let variant = info.variant();
        let endpoint = info.endpoint(config.endpoint);
        let handle = |kind: ClusterKind| {
            endpoint
                .filter(|ep| ep.has_server_cluster(kind.schema().id))
                .map(|ep| ClusterHandle::new(info.nwk_address, ep.id, kind.schema()))
        };
        let on_off = handle(ClusterKind::OnOff);
        let sonoff = handle(ClusterKind::Sonoff);

        tracing::info!(
            "{} ({}) as {:?}: on/off={} sonoff={}",
            info.display_name(),
            info.ieee_address_string(),
            variant,
            on_off.is_some(),
            sonoff.is_some()
        );

        Self {
            client: AttributeClient::new(transport, config.request_timeout()),
            variant,
            on_off,
            sonoff,
            router: BoundCommandRouter::new(),
            verify_delay: config.verify_delay(),
            event_tx,
            verify_task: Mutex::new(None),
            info,
        }
    }

    #[must_use]
    pub fn info(&self) -> &ZigbeeDevice {
        &self.info
    }

    #[must_use]
    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    /// Subscribe to this driver's events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_tx.subscribe()
    }

    fn cluster(&self, kind: ClusterKind) -> Result<&ClusterHandle, DriverError> {
        let handle = match kind {
            ClusterKind::OnOff => self.on_off.as_ref(),
            ClusterKind::Sonoff => self.sonoff.as_ref(),
        };
        handle.ok_or(DriverError::ClusterUnavailable(kind.schema().name))
    }

    fn publish(&self, kind: DeviceEventKind) {
        tracing::debug!("{}: {}", self.info.display_name(), kind);
        let _ = self.event_tx.send(DeviceEvent {
            ieee_address: self.info.ieee_address,
            kind,
        });
    }

    /// Read attributes and hand their settings values to `handler`
    pub async fn read_attributes<F>(
        &self,
        kind: ClusterKind,
        names: &[&str],
        handler: F,
    ) -> Result<(), DriverError>
    where
        F: FnOnce(Settings),
    {
        self.client
            .read_attributes(self.cluster(kind)?, names, handler)
            .await
    }

    /// Write the known keys of `settings` (restricted to `filter`) in one batch
    pub async fn write_attributes(
        &self,
        kind: ClusterKind,
        settings: &Settings,
        filter: Option<&[&str]>,
    ) -> Result<Vec<String>, DriverError> {
        self.client
            .write_attributes(self.cluster(kind)?, settings, filter)
            .await
    }

    /// Read the settings the variant mirrors and publish them.
    ///
    /// A failing read is logged and its settings are left out.
    pub async fn check_attributes(&self) -> Settings {
        let mut merged = Settings::new();

        if self.variant.supports_power_on_behavior() {
            let result = self
                .read_attributes(ClusterKind::OnOff, &[POWER_ON_BEHAVIOR], |values| {
                    merged.extend(values.clone());
                    self.publish(DeviceEventKind::SettingsRead {
                        cluster: ClusterKind::OnOff.schema().name,
                        values,
                    });
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Failed to read power-on behavior: {}", e);
            }
        }

        let names = self.variant.settings_attributes();
        if !names.is_empty() {
            let result = self
                .read_attributes(ClusterKind::Sonoff, names, |values| {
                    tracing::info!("Read Sonoff settings: {:?}", values);
                    merged.extend(values.clone());
                    self.publish(DeviceEventKind::SettingsRead {
                        cluster: ClusterKind::Sonoff.schema().name,
                        values,
                    });
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Failed to read Sonoff settings: {}", e);
            }
        }

        merged
    }

    /// Read current settings, configure on/off reporting, then apply the
    /// stored inching configuration if one exists
    pub async fn init(&self, settings: &Settings) -> Settings {
        let values = self.check_attributes().await;

        if let Some(reporting) = self.variant.on_off_reporting() {
            if let Err(e) = self.configure_on_off_reporting(reporting).await {
                tracing::error!("Failed to configure attribute reporting: {}", e);
            }
        }

        if self.variant.supports_inching() && settings.contains_key("inching_enabled") {
            match self.send_inching_settings(settings).await {
                Ok(()) => tracing::info!("Initial inching settings applied"),
                Err(e) => tracing::error!("Failed to apply initial inching settings: {}", e),
            }
        }

        values
    }

    async fn configure_on_off_reporting(
        &self,
        reporting: ReportingIntervals,
    ) -> Result<(), DriverError> {
        self.client
            .configure_reporting(
                self.cluster(ClusterKind::OnOff)?,
                "onOff",
                reporting.min_interval,
                reporting.max_interval,
                reporting.min_change,
            )
            .await
    }

    /// Push changed settings to the device
    pub async fn apply_settings(
        &self,
        settings: &Settings,
        changed: &[&str],
    ) -> Result<(), DriverError> {
        tracing::info!("{}: settings changed: {:?}", self.info.display_name(), changed);

        if changed.contains(&POWER_ON_BEHAVIOR) && !self.variant.supports_power_on_behavior() {
            tracing::warn!(
                "{}: {:?} has no power-on behavior, ignoring change",
                self.info.display_name(),
                self.variant
            );
        } else if changed.contains(&POWER_ON_BEHAVIOR) {
            self.write_attributes(ClusterKind::OnOff, settings, Some(&[POWER_ON_BEHAVIOR]))
                .await?;
            tracing::info!("Power-on behavior updated");
            self.schedule_verify();
        }

        let sonoff_keys: Vec<&str> = changed
            .iter()
            .copied()
            .filter(|key| self.variant.settings_attributes().contains(key))
            .collect();
        if !sonoff_keys.is_empty() {
            self.write_attributes(ClusterKind::Sonoff, settings, Some(&sonoff_keys))
                .await?;
        }

        if changed.iter().any(|key| INCHING_SETTINGS.contains(key)) {
            self.send_inching_settings(settings).await?;
            tracing::info!("Inching settings updated");
        }

        Ok(())
    }

    /// Send an inching command. Its outcome arrives later as a status event.
    pub async fn send_inching(
        &self,
        enabled: bool,
        time: f64,
        mode: InchingMode,
    ) -> Result<(), DriverError> {
        let request = InchingRequest::new(enabled, time, mode)?;
        self.send_inching_request(&request).await
    }

    /// Send the inching command described by `inching_*` settings
    pub async fn send_inching_settings(&self, settings: &Settings) -> Result<(), DriverError> {
        let request = InchingRequest::from_settings(settings)?;
        self.send_inching_request(&request).await
    }

    async fn send_inching_request(&self, request: &InchingRequest) -> Result<(), DriverError> {
        let sonoff = self.cluster(ClusterKind::Sonoff)?;
        let command = request.command();
        tracing::info!(
            "Sending inching: enabled={} mode={} time={}s payload={}",
            request.enabled(),
            request.mode(),
            request.time(),
            hex::encode(command.payload.as_bytes())
        );
        self.client
            .send_command(
                sonoff,
                CMD_PROTOCOL_DATA,
                command.payload.as_bytes().to_vec(),
                command.options,
            )
            .await?;
        Ok(())
    }

    /// Read back power-on behavior after a delay, replacing any pending check
    fn schedule_verify(&self) {
        let Ok(on_off) = self.cluster(ClusterKind::OnOff).cloned() else {
            return;
        };
        let client = self.client.clone();
        let delay = self.verify_delay;
        let event_tx = self.event_tx.clone();
        let ieee_address = self.info.ieee_address;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match client.read(&on_off, &[POWER_ON_BEHAVIOR]).await {
                Ok(values) => {
                    if let Some(value) = values.get(POWER_ON_BEHAVIOR) {
                        tracing::info!("Power-on behavior verification: {}", value);
                        let _ = event_tx.send(DeviceEvent {
                            ieee_address,
                            kind: DeviceEventKind::PowerOnBehaviorVerified(value.clone()),
                        });
                    }
                }
                Err(e) => tracing::error!("Failed to verify power-on behavior: {}", e),
            }
        });

        let previous = self
            .verify_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Cancel pending background work
    pub fn teardown(&self) {
        let pending = self
            .verify_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = pending {
            handle.abort();
            tracing::debug!("{}: cancelled power-on verification", self.info.display_name());
        }
    }

    /// Handle a frame received from this device
    pub fn handle_frame(&self, inbound: &InboundFrame) -> Result<Handled, DriverError> {
        let frame = &inbound.frame;
        match inbound.source.cluster_id {
            id::SONOFF => match classify(frame) {
                Disposition::Acknowledged => Ok(Handled::Acknowledged),
                Disposition::StatusResponse(response) => Ok(self.on_status_response(response)),
                Disposition::Forward => self.handle_generic(ClusterKind::Sonoff, frame),
            },
            id::ON_OFF if frame.is_cluster_specific() && !frame.is_from_server() => {
                if !self.variant.supports_detach() {
                    return Err(DriverError::UnknownCommand {
                        cluster: id::ON_OFF,
                        command: frame.command_id(),
                    });
                }
                match self.router.route(frame) {
                    BoundDisposition::ButtonPressed { count } => {
                        self.publish(DeviceEventKind::ButtonPressed { count });
                        Ok(Handled::ButtonPressed { count })
                    }
                    BoundDisposition::Unhandled { command } => Ok(Handled::Unhandled { command }),
                }
            }
            cluster_id => match ClusterKind::from_cluster_id(cluster_id) {
                Some(kind) => self.handle_generic(kind, frame),
                None => Err(DriverError::UnknownCommand {
                    cluster: cluster_id,
                    command: frame.command_id(),
                }),
            },
        }
    }

    fn on_status_response(&self, response: StatusResponse) -> Handled {
        let outcome = response.outcome();
        match outcome {
            ResponseOutcome::Success => tracing::info!("Inching command executed"),
            ResponseOutcome::Rejected => tracing::warn!(
                "Inching rejected by firmware (needs detach_mode off and a compatible switch_mode)"
            ),
            ResponseOutcome::Failed { code } => {
                tracing::error!("Inching failed with status {:?}", code);
            }
            ResponseOutcome::UnknownType(kind) => {
                tracing::info!("Unknown protocol data response type {:#04x}", kind);
            }
            ResponseOutcome::NoData => tracing::info!("Protocol data response without data"),
        }
        self.publish(DeviceEventKind::StatusResponse { response, outcome });
        Handled::StatusResponse(outcome)
    }

    /// Global commands the stack has no dedicated handler for
    fn handle_generic(&self, kind: ClusterKind, frame: &ZclFrame) -> Result<Handled, DriverError> {
        let schema = kind.schema();
        match frame.global_command() {
            Some(GlobalCommand::ReportAttributes) => {
                let response = ReadAttributesResponse {
                    values: parse_report_attributes(frame.payload())?,
                    failures: Vec::new(),
                };
                let values = translate_records(schema, &response);
                self.publish(DeviceEventKind::AttributesReported {
                    cluster: schema.name,
                    values: values.clone(),
                });
                Ok(Handled::AttributesReported(values))
            }
            Some(GlobalCommand::DefaultResponse) if frame.payload().len() >= 2 => {
                let command = frame.payload()[0];
                let status = Status::from_byte(frame.payload()[1]);
                if status == Status::Success {
                    tracing::debug!("{} default response to {:#04x}: success", schema.name, command);
                } else {
                    tracing::warn!("{} default response to {:#04x}: {:?}", schema.name, command, status);
                }
                Ok(Handled::DefaultResponse { command, status })
            }
            _ => {
                tracing::warn!(
                    "Unhandled command {:#04x} on {} from {}",
                    frame.command_id(),
                    schema.name,
                    self.info.display_name()
                );
                Err(DriverError::UnknownCommand {
                    cluster: schema.id,
                    command: frame.command_id(),
                })
            }
        }
    }
}

impl Drop for SonoffDevice {
    fn drop(&mut self) {
        self.teardown();
    }
}
