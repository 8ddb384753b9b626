use super::bus::BusError;
use super::level::LevelError;
use super::light_ref::LightRef;
use crate::common::address::GroupAddress;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error("{0} does not exist")]
    UnknownLight(LightRef),
    #[error("{light} has no scene {scene}")]
    SceneUnavailable { light: LightRef, scene: u8 },
    #[error("Group {0} has no lamps")]
    EmptyGroup(GroupAddress),
}
