//! Topic layout below the base topic.
use crate::light::light_ref::LightRef;

pub const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";
pub const ON: &str = "ON";
pub const OFF: &str = "OFF";

pub const STATUS: &str = "status";
pub const SET: &str = "set";
pub const BRIGHTNESS: &str = "brightness";
pub const SCENE: &str = "scene";
pub const FLASH: &str = "flash";
pub const SCAN: &str = "scan";
pub const POLL: &str = "poll";

pub fn bridge_status(base: &str) -> String {
    format!("{}/{}", base, STATUS)
}

pub fn scan(base: &str) -> String {
    format!("{}/{}", base, SCAN)
}

pub fn poll(base: &str) -> String {
    format!("{}/{}", base, POLL)
}

pub fn light_set(base: &str, light: LightRef) -> String {
    format!("{}/{}/{}", base, light, SET)
}

pub fn light_status(base: &str, light: LightRef) -> String {
    format!("{}/{}/{}", base, light, STATUS)
}

pub fn brightness_set(base: &str, light: LightRef) -> String {
    format!("{}/{}/{}/{}", base, light, BRIGHTNESS, SET)
}

pub fn brightness_status(base: &str, light: LightRef) -> String {
    format!("{}/{}/{}/{}", base, light, BRIGHTNESS, STATUS)
}

pub fn scene_set(base: &str, light: LightRef) -> String {
    format!("{}/{}/{}/{}", base, light, SCENE, SET)
}

pub fn scene_status(base: &str, light: LightRef) -> String {
    format!("{}/{}/{}/{}", base, light, SCENE, STATUS)
}

pub fn flash(base: &str, light: LightRef) -> String {
    format!("{}/{}/{}", base, light, FLASH)
}

/// Topic filters for everything the bridge listens to
pub fn subscriptions(base: &str) -> Vec<String> {
    vec![
        format!("{}/+/{}", base, SET),
        format!("{}/+/{}/{}", base, BRIGHTNESS, SET),
        format!("{}/+/{}/{}", base, SCENE, SET),
        format!("{}/+/{}", base, FLASH),
        scan(base),
        poll(base),
    ]
}
