//! Translation of inbound MQTT messages into bridge events.
use super::topics::{BRIGHTNESS, FLASH, OFF, POLL, SCAN, SCENE, SET};
use crate::bridge::{Event, LevelCommand, SceneSelect};
use crate::light::lamp::SCENE_COUNT;
use crate::light::light_ref::{LightRef, ParseLightRefError};
use serde_derive::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Don't publish to {0}")]
    UnknownTopic(String),
    #[error(transparent)]
    Light(#[from] ParseLightRefError),
    #[error("Invalid payload for {topic}: {payload}")]
    Payload { topic: String, payload: String },
    #[error("Failed to parse flash payload: {0}")]
    Flash(#[from] serde_json::Error),
    #[error("Invalid flash speed {0}")]
    FlashSpeed(f64),
}

/// Payload of a flash message. `speed` is the time in seconds spent at
/// each of the two levels.
#[derive(Debug, Deserialize)]
pub struct FlashRequest {
    pub count: u32,
    pub speed: f64,
}

fn payload_error(topic: &str, payload: &str) -> RouteError {
    RouteError::Payload {
        topic: topic.to_string(),
        payload: payload.to_string(),
    }
}

fn parse_level(topic: &str, payload: &str) -> Result<LevelCommand, RouteError> {
    let level: u8 = payload
        .trim()
        .parse()
        .map_err(|_| payload_error(topic, payload))?;
    Ok(LevelCommand::Level(level))
}

fn parse_scene(topic: &str, payload: &str) -> Result<SceneSelect, RouteError> {
    if payload == "-" {
        return Ok(SceneSelect::None);
    }
    payload
        .strip_prefix("Scene ")
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| *n < SCENE_COUNT)
        .map(SceneSelect::Scene)
        .ok_or_else(|| payload_error(topic, payload))
}

fn parse_flash(light: LightRef, payload: &[u8]) -> Result<Event, RouteError> {
    let req: FlashRequest = serde_json::from_slice(payload)?;
    let interval =
        Duration::try_from_secs_f64(req.speed).map_err(|_| RouteError::FlashSpeed(req.speed))?;
    Ok(Event::Flash {
        light,
        count: req.count,
        interval,
    })
}

/// Turn a message received on `topic` into an event
pub fn parse_event(base: &str, topic: &str, payload: &[u8]) -> Result<Event, RouteError> {
    let unknown = || RouteError::UnknownTopic(topic.to_string());
    let rest = topic
        .strip_prefix(base)
        .and_then(|t| t.strip_prefix('/'))
        .ok_or_else(unknown)?;
    let parts: Vec<&str> = rest.split('/').collect();
    let text = || String::from_utf8_lossy(payload);
    match parts.as_slice() {
        [SCAN] => Ok(Event::Rescan),
        [POLL] => Ok(Event::PollTick),
        [id, SET] => {
            let light = id.parse()?;
            if payload == OFF.as_bytes() {
                Ok(Event::Command {
                    light,
                    command: LevelCommand::Off,
                })
            } else {
                Err(payload_error(topic, &text()))
            }
        }
        [id, BRIGHTNESS, SET] => Ok(Event::Command {
            light: id.parse()?,
            command: parse_level(topic, &text())?,
        }),
        [id, SCENE, SET] => Ok(Event::SceneSelect {
            light: id.parse()?,
            scene: parse_scene(topic, &text())?,
        }),
        [id, FLASH] => parse_flash(id.parse()?, payload),
        _ => Err(unknown()),
    }
}
