//! In-memory transport for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zcl_protocol::{
    parse_report_attributes, AttributeRecord, AttributeStatus, AttributeValue, Direction,
    FrameType, GlobalCommand, ProtocolError, ReadAttributesResponse, Status,
    WriteAttributesResponse, ZclFrame, ZclRequest, ZclTransport,
};

/// Records every request and answers attribute commands from a value table
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<ZclRequest>>,
    values: Mutex<HashMap<(u16, u16), AttributeValue>>,
    rejected: Mutex<HashMap<u16, Status>>,
    in_flight: Mutex<HashMap<u16, (usize, usize)>>,
    delay: Mutex<Option<Duration>>,
    default_response: Mutex<Option<Status>>,
    offline: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_value(&self, cluster_id: u16, attribute_id: u16, value: AttributeValue) {
        self.values
            .lock()
            .unwrap()
            .insert((cluster_id, attribute_id), value);
    }

    pub fn value(&self, cluster_id: u16, attribute_id: u16) -> Option<AttributeValue> {
        self.values
            .lock()
            .unwrap()
            .get(&(cluster_id, attribute_id))
            .cloned()
    }

    /// Answer writes of `attribute_id` with `status`
    pub fn reject(&self, attribute_id: u16, status: Status) {
        self.rejected.lock().unwrap().insert(attribute_id, status);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn clear_delay(&self) {
        *self.delay.lock().unwrap() = None;
    }

    /// Answer global commands with a default response carrying `status`
    pub fn reply_default(&self, status: Status) {
        *self.default_response.lock().unwrap() = Some(status);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<ZclRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of concurrent requests seen on a cluster
    pub fn max_in_flight(&self, cluster_id: u16) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .get(&cluster_id)
            .map_or(0, |(_, max)| *max)
    }

    fn enter(&self, cluster_id: u16) {
        let mut in_flight = self.in_flight.lock().unwrap();
        let entry = in_flight.entry(cluster_id).or_default();
        entry.0 += 1;
        entry.1 = entry.1.max(entry.0);
    }

    fn leave(&self, cluster_id: u16) {
        if let Some(entry) = self.in_flight.lock().unwrap().get_mut(&cluster_id) {
            entry.0 -= 1;
        }
    }

    fn respond(&self, request: &ZclRequest) -> Result<Option<ZclFrame>, ProtocolError> {
        let cluster_id = request.target.cluster_id;
        let frame = &request.frame;
        let default_response = *self.default_response.lock().unwrap();
        let payload = match frame.global_command() {
            Some(_) if default_response.is_some() => (
                GlobalCommand::DefaultResponse,
                vec![frame.command_id(), default_response.map_or(0, |s| s as u8)],
            ),
            Some(GlobalCommand::ReadAttributes) => {
                let values = self.values.lock().unwrap();
                let mut response = ReadAttributesResponse::default();
                for id in frame
                    .payload()
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                {
                    match values.get(&(cluster_id, id)) {
                        Some(value) => response.values.push(AttributeRecord {
                            id,
                            value: value.clone(),
                        }),
                        None => response.failures.push(AttributeStatus {
                            id,
                            status: Status::UnsupportedAttribute,
                        }),
                    }
                }
                (GlobalCommand::ReadAttributesResponse, response.serialize()?)
            }
            Some(GlobalCommand::WriteAttributes) => {
                let records = parse_report_attributes(frame.payload())?;
                let rejected = self.rejected.lock().unwrap();
                let mut response = WriteAttributesResponse::default();
                for record in records {
                    match rejected.get(&record.id) {
                        Some(status) => response.failures.push(AttributeStatus {
                            id: record.id,
                            status: *status,
                        }),
                        None => self.set_value(cluster_id, record.id, record.value),
                    }
                }
                (GlobalCommand::WriteAttributesResponse, response.serialize())
            }
            Some(GlobalCommand::ConfigureReporting) => {
                (GlobalCommand::ConfigureReportingResponse, vec![Status::Success as u8])
            }
            _ => return Ok(None),
        };

        if !request.options.wait_for_response {
            return Ok(None);
        }
        Ok(Some(ZclFrame::new(
            FrameType::Global,
            Direction::ServerToClient,
            frame.manufacturer_code(),
            frame.transaction_seq(),
            payload.0 as u8,
            payload.1,
        )))
    }
}

#[async_trait]
impl ZclTransport for MockTransport {
    async fn send(&self, request: ZclRequest) -> Result<Option<ZclFrame>, ProtocolError> {
        let cluster_id = request.target.cluster_id;
        self.requests.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProtocolError::NotConnected);
        }

        self.enter(cluster_id);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.respond(&request);
        self.leave(cluster_id);
        result
    }
}
