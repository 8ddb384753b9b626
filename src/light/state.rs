use super::light_ref::LightRef;

/// State change to be reported to the outside
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    /// Logical level 0-255
    Brightness { light: LightRef, level: u8 },
    Power { light: LightRef, on: bool },
    /// Selected scene, `None` when no scene is active
    Scene { light: LightRef, scene: Option<u8> },
    /// False while the bus is being scanned
    Availability(bool),
}

pub trait StatePublisher: Send {
    fn publish(&mut self, update: StateUpdate);
}

impl StatePublisher for Vec<StateUpdate> {
    fn publish(&mut self, update: StateUpdate) {
        self.push(update);
    }
}

pub fn scene_label(scene: Option<u8>) -> String {
    match scene {
        None => "-".to_string(),
        Some(s) => format!("Scene {}", s),
    }
}

/// Report a level change. Power is only reported when either side is off.
pub fn publish_level(out: &mut dyn StatePublisher, light: LightRef, old: u8, new: u8) {
    out.publish(StateUpdate::Brightness { light, level: new });
    if old == 0 || new == 0 {
        out.publish(StateUpdate::Power { light, on: new > 0 });
    }
}

/// Report the full state of a light
pub fn publish_full(out: &mut dyn StatePublisher, light: LightRef, level: u8, scene: Option<u8>) {
    out.publish(StateUpdate::Scene { light, scene });
    out.publish(StateUpdate::Brightness { light, level });
    out.publish(StateUpdate::Power { light, on: level > 0 });
}
