//! Connection to the MQTT broker.
//!
//! The network event loop runs in a task of its own and forwards
//! inbound messages over a channel. Everything else happens in [`run`],
//! one event at a time.
use super::discovery::{self, Discovery};
use super::router;
use super::topics;
use crate::bridge::{Bridge, Event};
use crate::config::Settings;
use crate::error::DynResult;
use crate::light::registry::DeviceRegistry;
use crate::light::state::{scene_label, StatePublisher, StateUpdate};
use crate::names::DeviceNames;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, LastWill, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

const CLIENT_ID: &str = "dali2mqttx";
const KEEP_ALIVE: Duration = Duration::from_secs(180);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
// Room for the full state and discovery burst after a scan
const REQUEST_CAPACITY: usize = 1024;

/// Topic and payload of a state update
pub fn state_message(base: &str, update: &StateUpdate) -> (String, String) {
    match update {
        StateUpdate::Brightness { light, level } => {
            (topics::brightness_status(base, *light), level.to_string())
        }
        StateUpdate::Power { light, on } => (
            topics::light_status(base, *light),
            if *on { topics::ON } else { topics::OFF }.to_string(),
        ),
        StateUpdate::Scene { light, scene } => {
            (topics::scene_status(base, *light), scene_label(*scene))
        }
        StateUpdate::Availability(online) => (
            topics::bridge_status(base),
            if *online {
                topics::ONLINE
            } else {
                topics::OFFLINE
            }
            .to_string(),
        ),
    }
}

/// Discovery documents for all lights and the bridge itself
pub fn discovery_messages(
    discovery: &Discovery,
    registry: &DeviceRegistry,
    names: &DeviceNames,
) -> Vec<discovery::Config> {
    let mut configs = Vec::new();
    for lamp in registry.lamps() {
        let light = lamp.light_ref();
        let name = names.friendly_name(light);
        configs.push(discovery.light(light, &name));
        configs.push(discovery.scene_select(light, &name, lamp.supported_scenes()));
    }
    for group in registry.groups() {
        let light = group.light_ref();
        let name = names.friendly_name(light);
        configs.push(discovery.light(light, &name));
        configs.push(discovery.scene_select(light, &name, group.scenes().iter().copied()));
    }
    configs.extend(discovery.buttons());
    configs
}

/// Publishes state as retained messages
pub struct MqttPublisher {
    client: AsyncClient,
    base: String,
}

impl MqttPublisher {
    fn send(&self, topic: String, payload: String) {
        debug!("Publish {}: {}", topic, payload);
        if let Err(e) = self.client.try_publish(topic, QoS::AtMostOnce, true, payload) {
            warn!("Failed to publish: {}", e);
        }
    }
}

impl StatePublisher for MqttPublisher {
    fn publish(&mut self, update: StateUpdate) {
        let (topic, payload) = state_message(&self.base, &update);
        self.send(topic, payload);
    }
}

enum Inbound {
    Connected,
    Message { topic: String, payload: Vec<u8> },
}

async fn event_loop(mut eventloop: rumqttc::EventLoop, tx: mpsc::Sender<Inbound>) {
    loop {
        let inbound = match eventloop.poll().await {
            Ok(rumqttc::Event::Incoming(Packet::ConnAck(_))) => Inbound::Connected,
            Ok(rumqttc::Event::Incoming(Packet::Publish(p))) => Inbound::Message {
                topic: p.topic,
                payload: p.payload.to_vec(),
            },
            Ok(_) => continue,
            Err(e) => {
                error!("MQTT connection failed: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        if tx.send(inbound).await.is_err() {
            break;
        }
    }
}

async fn next_poll(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => std::future::pending().await,
    }
}

struct Daemon {
    bridge: Bridge,
    names: DeviceNames,
    publisher: MqttPublisher,
    prefix: String,
}

impl Daemon {
    async fn handle(&mut self, event: Event) {
        let rescan = event == Event::Rescan;
        self.bridge.dispatch(event, &mut self.publisher).await;
        if rescan {
            self.announce().await;
        }
    }

    /// Publish discovery documents after a scan
    async fn announce(&mut self) {
        let registry = self.bridge.registry();
        if self.names.is_empty() {
            if let Err(e) = self.names.save(registry.lights()).await {
                warn!("{}", e);
            }
        }
        let discovery = Discovery {
            prefix: &self.prefix,
            base: &self.publisher.base,
        };
        for config in discovery_messages(&discovery, registry, &self.names) {
            self.publisher.send(config.topic, config.payload.to_string());
        }
    }

    async fn subscribe(&self) {
        for topic in topics::subscriptions(&self.publisher.base) {
            debug!("Subscribe to {}", topic);
            if let Err(e) = self.publisher.client.subscribe(&topic, QoS::AtMostOnce).await {
                error!("Failed to subscribe to {}: {}", topic, e);
            }
        }
    }
}

fn mqtt_options(settings: &Settings) -> MqttOptions {
    let mut opts = MqttOptions::new(CLIENT_ID, &settings.mqtt_server, settings.mqtt_port);
    opts.set_keep_alive(KEEP_ALIVE);
    if !settings.mqtt_username.is_empty() {
        opts.set_credentials(&settings.mqtt_username, &settings.mqtt_password);
    }
    opts.set_last_will(LastWill::new(
        topics::bridge_status(&settings.mqtt_base_topic),
        topics::OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));
    opts
}

/// Connect to the broker and process events until the connection task
/// stops. The bus is rescanned on every (re)connect.
pub async fn run(settings: &Settings, bridge: Bridge, names: DeviceNames) -> DynResult<()> {
    let (client, eventloop) = AsyncClient::new(mqtt_options(settings), REQUEST_CAPACITY);
    let (tx, mut rx) = mpsc::channel(16);
    tokio::spawn(event_loop(eventloop, tx));
    info!(
        "Connecting to MQTT broker {}:{}",
        settings.mqtt_server, settings.mqtt_port
    );

    let mut poll = (settings.poll_interval > 0).then(|| {
        let period = Duration::from_secs(settings.poll_interval);
        let mut i = tokio::time::interval_at(Instant::now() + period, period);
        i.set_missed_tick_behavior(MissedTickBehavior::Delay);
        i
    });

    let mut daemon = Daemon {
        bridge,
        names,
        publisher: MqttPublisher {
            client,
            base: settings.mqtt_base_topic.clone(),
        },
        prefix: settings.ha_discovery_prefix.clone(),
    };
    loop {
        tokio::select! {
            inbound = rx.recv() => {
                match inbound {
                    None => return Err("MQTT event loop stopped".into()),
                    Some(Inbound::Connected) => {
                        info!("Connected to MQTT broker");
                        daemon.subscribe().await;
                        daemon.handle(Event::Rescan).await;
                    }
                    Some(Inbound::Message { topic, payload }) => {
                        match router::parse_event(&daemon.publisher.base, &topic, &payload) {
                            Ok(event) => {
                                debug!("{} -> {:?}", topic, event);
                                daemon.handle(event).await;
                            }
                            Err(e) => warn!("{}", e),
                        }
                    }
                }
            }
            _ = next_poll(&mut poll) => {
                daemon.handle(Event::PollTick).await;
            }
        }
    }
}
