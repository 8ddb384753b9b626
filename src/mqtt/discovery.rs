//! Home Assistant MQTT discovery documents.
use super::topics;
use crate::light::light_ref::LightRef;
use crate::light::state::scene_label;
use serde_json::{json, Value};

const SW_VERSION: &str = concat!("dali2mqtt ", env!("CARGO_PKG_VERSION"));
const MANUFACTURER: &str = "dali2mqtt";

/// A retained message to publish
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub topic: String,
    pub payload: Value,
}

struct Button {
    name: &'static str,
    topic: fn(&str) -> String,
    device_class: Option<&'static str>,
}

const BUTTONS: [Button; 2] = [
    Button {
        name: "Poll lamps",
        topic: topics::poll,
        device_class: None,
    },
    Button {
        name: "Reinitialize lamps",
        topic: topics::scan,
        device_class: Some("restart"),
    },
];

/// Lower case alphanumeric words joined by `-`
pub fn slugify(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub struct Discovery<'a> {
    pub prefix: &'a str,
    pub base: &'a str,
}

impl Discovery<'_> {
    fn device(&self, light: LightRef) -> Value {
        let (tag, name) = match light {
            LightRef::Lamp(a) => (format!("A{}", a), format!("DALI Lamp {}", a)),
            LightRef::Group(g) => (format!("G{}", g), format!("DALI Group {}", g)),
        };
        json!({
            "identifiers": format!("{}_{}", self.base, tag),
            "via_device": self.base,
            "name": name,
            "sw_version": SW_VERSION,
            "manufacturer": MANUFACTURER,
            "connections": [["DALI", tag]],
        })
    }

    fn availability(&self, mut doc: Value) -> Value {
        doc["availability_topic"] = json!(topics::bridge_status(self.base));
        doc["payload_available"] = json!(topics::ONLINE);
        doc["payload_not_available"] = json!(topics::OFFLINE);
        doc
    }

    pub fn light(&self, light: LightRef, name: &str) -> Config {
        let base = self.base;
        let doc = json!({
            "name": name,
            "unique_id": format!("{}_{}", base, light),
            "state_topic": topics::light_status(base, light),
            "command_topic": topics::light_set(base, light),
            "payload_off": topics::OFF,
            "brightness_state_topic": topics::brightness_status(base, light),
            "brightness_command_topic": topics::brightness_set(base, light),
            "brightness_scale": 255,
            "on_command_type": "brightness",
            "device": self.device(light),
        });
        Config {
            topic: format!("{}/light/{}/{}/config", self.prefix, base, light),
            payload: self.availability(doc),
        }
    }

    /// Scene selector listing `-` and every programmed scene
    pub fn scene_select<I>(&self, light: LightRef, name: &str, scenes: I) -> Config
    where
        I: IntoIterator<Item = u8>,
    {
        let base = self.base;
        let options: Vec<String> = std::iter::once(scene_label(None))
            .chain(scenes.into_iter().map(|s| scene_label(Some(s))))
            .collect();
        let doc = json!({
            "name": format!("{} Scene", name),
            "unique_id": format!("{}_{}_scene", base, light),
            "state_topic": topics::scene_status(base, light),
            "command_topic": topics::scene_set(base, light),
            "options": options,
            "device": self.device(light),
        });
        Config {
            topic: format!("{}/select/{}/{}/config", self.prefix, base, light),
            payload: self.availability(doc),
        }
    }

    /// Buttons for polling and rescanning the bus
    pub fn buttons(&self) -> Vec<Config> {
        BUTTONS
            .iter()
            .map(|b| {
                let slug = slugify(b.name);
                let command_topic = (b.topic)(self.base);
                let mut doc = json!({
                    "name": b.name,
                    "unique_id": format!("{}_BUTTON_{}", self.base, slug),
                    "command_topic": command_topic,
                    "entity_category": "config",
                    "device": {
                        "identifiers": self.base,
                        "name": "DALI2MQTT Bridge",
                        "sw_version": SW_VERSION,
                        "manufacturer": MANUFACTURER,
                    },
                });
                if let Some(class) = b.device_class {
                    doc["device_class"] = json!(class);
                }
                Config {
                    topic: format!("{}/button/{}/{}/config", self.prefix, self.base, slug),
                    payload: self.availability(doc),
                }
            })
            .collect()
    }
}
