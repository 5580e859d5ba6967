//! TLS MQTT client session, implementing [`MqttPort`].
//!
//! Uses `rumqttc`'s blocking client: one [`rumqttc::Client`] for
//! publishing/subscribing and one [`rumqttc::Connection`] polled with a
//! short timeout each tick so the caller's cooperative loop never blocks.
//! The broker session carries a last-will of `{"status":"offline"}`
//! (retained) on the status topic, mirrored by an explicit "online"
//! publish once the CONNACK arrives — the same announce/last-will pair
//! an irrigation node uses to let a hub track which nodes are alive.

use std::collections::VecDeque;
use std::time::Duration;

use log::{error, info, warn};
use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, Packet, QoS as RumqttQos};

use crate::app::ports::{ConnError, MqttPort, Qos};

const POLL_TIMEOUT: Duration = Duration::from_millis(200);
const MAX_QUEUED_COMMANDS: usize = 8;
/// Commands larger than this are dropped before reaching the dispatcher.
pub const MAX_COMMAND_PAYLOAD: usize = 2048;

fn status_topic(device_id: &str) -> String {
    format!("greenhouse/{device_id}/status")
}

fn commands_topic(device_id: &str) -> String {
    format!("greenhouse/{device_id}/commands")
}

fn to_rumqttc_qos(qos: Qos) -> RumqttQos {
    match qos {
        Qos::AtMostOnce => RumqttQos::AtMostOnce,
        Qos::AtLeastOnce => RumqttQos::AtLeastOnce,
    }
}

pub struct MqttAdapter {
    device_id: String,
    broker_host: String,
    broker_port: u16,
    ca_cert: Vec<u8>,
    username: Option<String>,
    password: Option<String>,
    client: Option<Client>,
    connection: Option<Connection>,
    connected: bool,
    inbound: VecDeque<Vec<u8>>,
}

impl MqttAdapter {
    pub fn new(
        device_id: impl Into<String>,
        broker_host: impl Into<String>,
        broker_port: u16,
        ca_cert: Vec<u8>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            broker_host: broker_host.into(),
            broker_port,
            ca_cert,
            username,
            password,
            client: None,
            connection: None,
            connected: false,
            inbound: VecDeque::new(),
        }
    }

    fn build_options(&self) -> MqttOptions {
        let client_id = format!("greenhouse-{}", self.device_id);
        let mut opts = MqttOptions::new(client_id, self.broker_host.clone(), self.broker_port);
        opts.set_keep_alive(Duration::from_secs(30));

        #[cfg(not(target_os = "espidf"))]
        {
            use rumqttc::{TlsConfiguration, Transport};
            opts.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca: self.ca_cert.clone(),
                alpn: None,
                client_auth: None,
            }));
        }

        opts.set_last_will(LastWill::new(
            status_topic(&self.device_id),
            br#"{"status":"offline"}"#.to_vec(),
            RumqttQos::AtLeastOnce,
            true,
        ));

        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            opts.set_credentials(user.clone(), pass.clone());
        } else {
            warn!("MqttAdapter: no broker credentials configured");
        }

        opts
    }

    fn drain_incoming(&mut self) {
        let Some(connection) = self.connection.as_mut() else { return };
        loop {
            match connection.recv_timeout(POLL_TIMEOUT) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => {
                    self.connected = true;
                    info!("MqttAdapter: connected to broker");
                }
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    if publish.topic == commands_topic(&self.device_id) {
                        if publish.payload.len() > MAX_COMMAND_PAYLOAD {
                            warn!("MqttAdapter: dropped oversized command payload ({}B)", publish.payload.len());
                        } else if self.inbound.len() >= MAX_QUEUED_COMMANDS {
                            warn!("MqttAdapter: command queue full, dropping oldest");
                            self.inbound.pop_front();
                            self.inbound.push_back(publish.payload.to_vec());
                        } else {
                            self.inbound.push_back(publish.payload.to_vec());
                        }
                    }
                }
                Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                    self.connected = false;
                    warn!("MqttAdapter: broker sent DISCONNECT");
                }
                Ok(Err(e)) => {
                    error!("MqttAdapter: connection error: {e}");
                    self.connected = false;
                    break;
                }
                Ok(Ok(_)) => continue,
                Err(_) => break, // timed out, nothing more pending this tick
            }
        }
    }
}

impl MqttPort for MqttAdapter {
    fn mqtt_up(&self) -> bool {
        self.connected
    }

    fn try_connect(&mut self) -> bool {
        if self.connected {
            return true;
        }
        if self.client.is_none() {
            let opts = self.build_options();
            let (client, connection) = Client::new(opts, 10);
            self.client = Some(client);
            self.connection = Some(connection);
        }

        self.drain_incoming();

        if self.connected {
            if let Some(client) = self.client.as_mut() {
                let topic = commands_topic(&self.device_id);
                if let Err(e) = client.subscribe(&topic, RumqttQos::AtLeastOnce) {
                    error!("MqttAdapter: subscribe to {topic} failed: {e}");
                }
                let status = status_topic(&self.device_id);
                if let Err(e) = client.publish(&status, RumqttQos::AtLeastOnce, true, br#"{"status":"online"}"#.to_vec()) {
                    error!("MqttAdapter: online announce failed: {e}");
                }
            }
        }
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos) -> Result<bool, ConnError> {
        let client = self.client.as_mut().ok_or(ConnError::NotConnected)?;
        if !self.connected {
            return Err(ConnError::NotConnected);
        }
        client
            .publish(topic, to_rumqttc_qos(qos), false, payload.to_vec())
            .map_err(|_| ConnError::Io)?;
        Ok(true)
    }

    fn poll_command(&mut self) -> Option<Vec<u8>> {
        self.drain_incoming();
        self.inbound.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_topic_matches_wire_convention() {
        assert_eq!(status_topic("gh-01"), "greenhouse/gh-01/status");
    }

    #[test]
    fn commands_topic_matches_wire_convention() {
        assert_eq!(commands_topic("gh-01"), "greenhouse/gh-01/commands");
    }

    #[test]
    fn fresh_adapter_reports_not_connected() {
        let adapter = MqttAdapter::new("gh-01", "mqtt.example.com", 8883, vec![], None, None);
        assert!(!adapter.mqtt_up());
    }

    #[test]
    fn publish_before_connect_is_rejected() {
        let mut adapter = MqttAdapter::new("gh-01", "mqtt.example.com", 8883, vec![], None, None);
        let result = adapter.publish("greenhouse/gh-01/data", b"{}", Qos::AtMostOnce);
        assert!(matches!(result, Err(ConnError::NotConnected)));
    }
}
