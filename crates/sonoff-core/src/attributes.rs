//! Scoped attribute reads, writes and commands
//!
//! Every exchange goes through a [`TransactionScope`](crate::transaction::TransactionScope),
//! which applies the cluster's manufacturer code to that exchange only.

use crate::cluster::{CommandDirection, ClusterSchema};
use crate::error::DriverError;
use crate::transaction::ClusterHandle;
use crate::translate::{to_raw, to_semantic, Settings};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use zcl_protocol::{
    configure_reporting_payload, read_attributes_payload, write_attributes_payload,
    AttributeRecord, AttributeValue, ConfigureReportingResponse, GlobalCommand, ProtocolError,
    ReadAttributesResponse, ReportingConfig, SendOptions, Status, WriteAttributesResponse,
    ZclFrame, ZclRequest, ZclTransport,
};

/// Attribute and command access over a transport
#[derive(Clone)]
pub struct AttributeClient {
    transport: Arc<dyn ZclTransport>,
    sequence: Arc<AtomicU8>,
    timeout: Duration,
}

impl AttributeClient {
    #[must_use]
    pub fn new(transport: Arc<dyn ZclTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            sequence: Arc::new(AtomicU8::new(1)),
            timeout,
        }
    }

    fn next_sequence(&self) -> u8 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn request_options(&self) -> SendOptions {
        SendOptions {
            timeout: self.timeout,
            ..SendOptions::default()
        }
    }

    /// Hand a request to the transport, giving up after its timeout
    async fn deliver(&self, request: ZclRequest) -> Result<Option<ZclFrame>, ProtocolError> {
        let timeout = request.options.timeout;
        tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| ProtocolError::Timeout)?
    }

    /// Send and wait for the reply frame
    async fn exchange(&self, request: ZclRequest) -> Result<ZclFrame, ProtocolError> {
        self.deliver(request).await?.ok_or(ProtocolError::NoResponse)
    }

    /// Read attributes and pass their settings values to `handler`.
    ///
    /// `handler` is not called when the read fails. An empty name list issues
    /// no request.
    pub async fn read_attributes<F>(
        &self,
        cluster: &ClusterHandle,
        names: &[&str],
        handler: F,
    ) -> Result<(), DriverError>
    where
        F: FnOnce(Settings),
    {
        let values = self.read(cluster, names).await?;
        if !names.is_empty() {
            handler(values);
        }
        Ok(())
    }

    /// Read attributes and return their settings values, keyed by setting key.
    /// Attributes the device reports as unsupported are left out.
    pub async fn read(&self, cluster: &ClusterHandle, names: &[&str]) -> Result<Settings, DriverError> {
        if names.is_empty() {
            return Ok(Settings::new());
        }

        let schema = cluster.schema();
        let specs = names
            .iter()
            .map(|name| schema.attribute(name))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<u16> = specs.iter().map(|s| s.id).collect();
        let context = || names.iter().map(|n| (*n).to_string()).collect::<Vec<_>>();

        let response = {
            let scope = cluster.begin(self.next_sequence()).await;
            tracing::debug!(
                "Reading {:?} from {} (mfr {:?})",
                names,
                scope.address,
                scope.manufacturer_code
            );
            let frame = scope.global(GlobalCommand::ReadAttributes, read_attributes_payload(&ids));
            let request = scope.request(frame, self.request_options());
            self.exchange(request)
                .await
                .and_then(|reply| expect_global(reply, GlobalCommand::ReadAttributesResponse))
                .and_then(|reply| ReadAttributesResponse::parse(reply.payload()))
                .map_err(|source| DriverError::Read {
                    attributes: context(),
                    source,
                })?
        };

        Ok(translate_records(schema, &response))
    }

    /// Write settings to the device in one batch.
    ///
    /// Keys not in the cluster schema, or not in `filter` when given, are
    /// dropped. Returns the keys that were written; nothing is sent when that
    /// set is empty.
    pub async fn write_attributes(
        &self,
        cluster: &ClusterHandle,
        settings: &Settings,
        filter: Option<&[&str]>,
    ) -> Result<Vec<String>, DriverError> {
        let schema = cluster.schema();
        let mut keys = Vec::new();
        let mut records = Vec::new();
        for (key, value) in settings {
            if filter.is_some_and(|allowed| !allowed.contains(&key.as_str())) {
                continue;
            }
            let Some(spec) = schema.find_setting(key) else {
                continue;
            };
            records.push(AttributeRecord {
                id: spec.id,
                value: to_raw(spec, value)?,
            });
            keys.push(key.clone());
        }

        if records.is_empty() {
            tracing::debug!("No {} attributes to write", schema.name);
            return Ok(keys);
        }

        let response = {
            let scope = cluster.begin(self.next_sequence()).await;
            tracing::info!(
                "Writing {:?} to {} (mfr {:?})",
                keys,
                scope.address,
                scope.manufacturer_code
            );
            let request = match write_attributes_payload(&records) {
                Ok(payload) => scope.request(
                    scope.global(GlobalCommand::WriteAttributes, payload),
                    self.request_options(),
                ),
                Err(source) => {
                    return Err(DriverError::Write {
                        attributes: keys,
                        source,
                    })
                }
            };
            match self
                .exchange(request)
                .await
                .and_then(|reply| expect_global(reply, GlobalCommand::WriteAttributesResponse))
                .and_then(|reply| WriteAttributesResponse::parse(reply.payload()))
            {
                Ok(response) => response,
                Err(source) => {
                    return Err(DriverError::Write {
                        attributes: keys,
                        source,
                    })
                }
            }
        };

        if let Some(failure) = response.failures.first() {
            let attribute = schema
                .attribute_by_id(failure.id)
                .map_or_else(|| format!("{:#06x}", failure.id), |s| s.setting.to_string());
            tracing::error!("{} rejected write of {}: {:?}", schema.name, attribute, failure.status);
            return Err(DriverError::WriteRejected {
                attribute,
                status: failure.status,
            });
        }

        Ok(keys)
    }

    /// Configure attribute reporting for one attribute
    pub async fn configure_reporting(
        &self,
        cluster: &ClusterHandle,
        name: &str,
        min_interval: u16,
        max_interval: u16,
        reportable_change: Option<i64>,
    ) -> Result<(), DriverError> {
        let schema = cluster.schema();
        let spec = schema.attribute(name)?;
        let data_type = spec.wire_type.data_type();
        let reportable_change = reportable_change
            .filter(|_| data_type.is_analog())
            .map(|change| AttributeValue::from_i64(data_type, change))
            .transpose()?;
        let config = ReportingConfig {
            attribute_id: spec.id,
            data_type,
            min_interval,
            max_interval,
            reportable_change,
        };
        let failed = |source| DriverError::Configure {
            attribute: spec.setting.to_string(),
            source,
        };

        let response = {
            let scope = cluster.begin(self.next_sequence()).await;
            tracing::info!(
                "Configuring reporting of {} on {}: {}..{} s",
                spec.name,
                scope.address,
                min_interval,
                max_interval
            );
            let payload = configure_reporting_payload(&[config]).map_err(failed)?;
            let request = scope.request(
                scope.global(GlobalCommand::ConfigureReporting, payload),
                self.request_options(),
            );
            self.exchange(request)
                .await
                .and_then(|reply| expect_global(reply, GlobalCommand::ConfigureReportingResponse))
                .and_then(|reply| ConfigureReportingResponse::parse(reply.payload()))
                .map_err(failed)?
        };

        match response.failures.first() {
            Some(failure) => Err(DriverError::ReportingRejected {
                attribute: spec.setting.to_string(),
                status: failure.status,
            }),
            None => Ok(()),
        }
    }

    /// Send a host-to-device cluster command.
    ///
    /// Returns the reply frame when `options.wait_for_response` is set. The
    /// client's request timeout bounds the send either way.
    pub async fn send_command(
        &self,
        cluster: &ClusterHandle,
        command_id: u8,
        payload: Vec<u8>,
        options: SendOptions,
    ) -> Result<Option<ZclFrame>, DriverError> {
        let command = cluster
            .schema()
            .command(command_id, CommandDirection::HostToDevice)?;

        let options = SendOptions {
            timeout: self.timeout,
            ..options
        };
        let scope = cluster.begin(self.next_sequence()).await;
        let request = scope.request(scope.command(command_id, payload), options);
        tracing::debug!(
            "Sending {} to {}: {}",
            command.name,
            scope.address,
            request.frame.to_hex()
        );

        let result = if options.wait_for_response {
            self.exchange(request).await.map(Some)
        } else {
            self.deliver(request).await.map(|_| None)
        };
        result.map_err(|source| DriverError::Send {
            command: command.name,
            source,
        })
    }
}

/// Check that `reply` is the expected global response, surfacing a failing
/// default response as a device error
fn expect_global(reply: ZclFrame, expected: GlobalCommand) -> Result<ZclFrame, ProtocolError> {
    match reply.global_command() {
        Some(cmd) if cmd == expected => Ok(reply),
        Some(GlobalCommand::DefaultResponse) => {
            let status = reply
                .payload()
                .get(1)
                .map_or(Status::Failure, |b| Status::from_byte(*b));
            Err(ProtocolError::DeviceError(status))
        }
        _ => Err(ProtocolError::UnexpectedResponse {
            expected: expected as u8,
            actual: reply.command_id(),
        }),
    }
}

/// Translate decoded records into settings values, logging failures
pub(crate) fn translate_records(schema: &ClusterSchema, response: &ReadAttributesResponse) -> Settings {
    for failure in &response.failures {
        tracing::debug!(
            "{} attribute {:#06x} not read: {:?}",
            schema.name,
            failure.id,
            failure.status
        );
    }
    let mut values = Settings::new();
    for record in &response.values {
        match schema.attribute_by_id(record.id) {
            Some(spec) => {
                values.insert(spec.setting.to_string(), to_semantic(spec, &record.value));
            }
            None => tracing::debug!(
                "{} attribute {:#06x} not in schema, skipping",
                schema.name,
                record.id
            ),
        }
    }
    values
}
