//! ESP-IDF MQTT adapter for the bus transport.
//!
//! Implements [`BusClient`] over an already-connected `EspMqttClient`.
//! Inbound messages arrive on the MQTT task and are handed to the control
//! loop through a bounded channel; [`BusClient::try_next`] never blocks.
//!
//! ```text
//!   MQTT task ──callback──▶ sync_channel ──try_recv──▶ BusLink::poll
//! ```

use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::sys::EspError;
use log::{info, warn};

use crate::error::LinkError;
use crate::transport::bus::{BusClient, Topics};
use crate::transport::{Packet, packet};

/// Inbound messages buffered between the MQTT task and the control loop.
const INBOX_DEPTH: usize = 8;

pub struct MqttBus {
    client: EspMqttClient<'static>,
    inbox: Receiver<(String, Packet)>,
}

impl MqttBus {
    /// Connect to `broker_url` and subscribe to the inbound topic.
    pub fn connect(
        broker_url: &str,
        conf: &MqttClientConfiguration<'_>,
        topics: &Topics,
    ) -> Result<Self, EspError> {
        let (tx, inbox) = sync_channel(INBOX_DEPTH);
        let mut client =
            EspMqttClient::new_cb(broker_url, conf, move |event| forward(&tx, event.payload()))?;
        client.subscribe(&topics.inbound, QoS::AtLeastOnce)?;
        info!("mqtt: subscribed to {}", topics.inbound);
        Ok(Self { client, inbox })
    }
}

fn forward(tx: &SyncSender<(String, Packet)>, payload: EventPayload<'_, EspError>) {
    let EventPayload::Received {
        topic: Some(topic),
        data,
        ..
    } = payload
    else {
        return;
    };
    let Ok(bytes) = packet(data) else {
        warn!("mqtt: {} byte message on {} dropped", data.len(), topic);
        return;
    };
    match tx.try_send((topic.to_string(), bytes)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!("mqtt: inbox full, message dropped"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

impl BusClient for MqttBus {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        self.client
            .enqueue(topic, QoS::AtLeastOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("mqtt: publish to {} failed: {}", topic, e);
                LinkError::SendFailed
            })
    }

    fn try_next(&mut self) -> Option<(String, Packet)> {
        self.inbox.try_recv().ok()
    }
}
