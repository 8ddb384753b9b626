use super::bus::DaliBus;
use super::error::DeviceError;
use super::level::{self, LevelError};
use super::light_ref::LightRef;
use super::registry::DeviceRegistry;
use super::state::{publish_level, StatePublisher, StateUpdate};
use crate::common::address::{GroupAddress, Short};
use crate::common::defs::MASK;
use log::{debug, info};
use std::collections::BTreeSet;
use std::time::Duration;

pub const SCENE_COUNT: u8 = 16;

/// Physical level limits reported by a gear
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PhysicalRange {
    pub min_physical: u8,
    pub min_level: u8,
    pub max_level: u8,
}

impl PhysicalRange {
    /// Lowest level the gear will actually go to
    pub fn min_levels(&self) -> u8 {
        self.min_physical.max(self.min_level)
    }

    pub fn to_physical(&self, logical: u8) -> Result<u8, LevelError> {
        level::to_physical(logical, self.min_levels(), self.max_level)
    }

    /// Non-zero levels outside the range are clamped to it first
    pub fn to_logical(&self, physical: u8) -> Result<u8, LevelError> {
        let min = self.min_levels();
        let physical = if physical == 0 {
            0
        } else {
            physical.max(min).min(self.max_level)
        };
        level::to_logical(physical, min, self.max_level)
    }
}

#[derive(Debug, Clone)]
pub struct Lamp {
    address: Short,
    level: u8,
    range: PhysicalRange,
    scenes: [u8; SCENE_COUNT as usize],
    current_scene: Option<u8>,
    groups: BTreeSet<GroupAddress>,
}

impl Lamp {
    /// `level` is the logical level
    pub fn new(address: Short, range: PhysicalRange, scenes: [u8; 16], level: u8) -> Lamp {
        Lamp {
            address,
            level,
            range,
            scenes,
            current_scene: None,
            groups: BTreeSet::new(),
        }
    }

    pub fn address(&self) -> Short {
        self.address
    }

    pub fn light_ref(&self) -> LightRef {
        LightRef::Lamp(self.address)
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn range(&self) -> &PhysicalRange {
        &self.range
    }

    pub fn min_levels(&self) -> u8 {
        self.range.min_levels()
    }

    pub fn max_level(&self) -> u8 {
        self.range.max_level
    }

    pub fn scenes(&self) -> &[u8; 16] {
        &self.scenes
    }

    /// Indices of scenes with a stored level
    pub fn supported_scenes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..SCENE_COUNT).filter(|i| self.scenes[*i as usize] != MASK)
    }

    pub fn current_scene(&self) -> Option<u8> {
        self.current_scene
    }

    pub fn groups(&self) -> &BTreeSet<GroupAddress> {
        &self.groups
    }

    pub(super) fn take_scene(&mut self) -> Option<u8> {
        self.current_scene.take()
    }

    pub(crate) fn add_group(&mut self, group: GroupAddress) {
        self.groups.insert(group);
    }

    /// Logical level the lamp goes to when recalling a scene. `None` if
    /// the scene is out of range or not programmed.
    pub fn scene_level(&self, index: u8) -> Result<Option<u8>, LevelError> {
        match self.scenes.get(index as usize) {
            None | Some(&MASK) => Ok(None),
            Some(&physical) => self.range.to_logical(physical).map(Some),
        }
    }
}

impl DeviceRegistry {
    pub(super) fn lamp_mut(&mut self, addr: Short) -> Result<&mut Lamp, DeviceError> {
        self.lamps
            .get_mut(&addr)
            .ok_or(DeviceError::UnknownLight(LightRef::Lamp(addr)))
    }

    /// Store a new level for a lamp and report it. Returns the old
    /// level. Groups are not recalculated.
    fn store_lamp_level(
        &mut self,
        addr: Short,
        level: u8,
        out: &mut dyn StatePublisher,
    ) -> Result<Option<u8>, DeviceError> {
        let lamp = self.lamp_mut(addr)?;
        if lamp.level == level {
            return Ok(None);
        }
        let old = lamp.level;
        lamp.level = level;
        if lamp.take_scene().is_some() {
            out.publish(StateUpdate::Scene {
                light: lamp.light_ref(),
                scene: None,
            });
        }
        Ok(Some(old))
    }

    /// Set the cached level of a lamp without any bus traffic or group
    /// recalculation. Used when the level was changed by a group command.
    pub fn apply_lamp_level(
        &mut self,
        addr: Short,
        level: u8,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        if let Some(old) = self.store_lamp_level(addr, level, out)? {
            publish_level(out, LightRef::Lamp(addr), old, level);
        }
        Ok(())
    }

    /// Set the level of a lamp on the bus and recalculate all its groups.
    /// Nothing changes if the bus command fails.
    pub async fn set_lamp_level(
        &mut self,
        bus: &mut DaliBus,
        addr: Short,
        level: u8,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        let lamp = self.lamp_mut(addr)?;
        if lamp.level == level {
            return Ok(());
        }
        let physical = lamp.range.to_physical(level)?;
        bus.send_direct_level(addr.into(), physical).await?;
        info!("Set lamp_{} brightness level to {} ({})", addr, level, physical);
        let Some(old) = self.store_lamp_level(addr, level, out)? else {
            return Ok(());
        };
        let groups = self.lamp_mut(addr)?.groups.clone();
        self.recalc_groups(groups, out);
        publish_level(out, LightRef::Lamp(addr), old, level);
        Ok(())
    }

    /// Recall a scene on a lamp. Unprogrammed scenes are rejected
    /// without any state being reported.
    pub async fn set_lamp_scene(
        &mut self,
        bus: &mut DaliBus,
        addr: Short,
        index: u8,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        let light = LightRef::Lamp(addr);
        let lamp = self.lamp_mut(addr)?;
        let Some(scene_level) = lamp.scene_level(index)? else {
            return Err(DeviceError::SceneUnavailable { light, scene: index });
        };
        lamp.take_scene();
        out.publish(StateUpdate::Scene { light, scene: None });
        if scene_level != lamp.level {
            bus.send_go_to_scene(addr.into(), index).await?;
            info!("Call scene {} on {}", index, light);
            let lamp = self.lamp_mut(addr)?;
            let old = lamp.level;
            lamp.level = scene_level;
            let groups = lamp.groups.clone();
            self.recalc_groups(groups, out);
            publish_level(out, light, old, scene_level);
        }
        self.lamp_mut(addr)?.current_scene = Some(index);
        out.publish(StateUpdate::Scene {
            light,
            scene: Some(index),
        });
        Ok(())
    }

    /// Read the actual level from the bus. Groups are not recalculated.
    pub async fn poll_lamp(
        &mut self,
        bus: &mut DaliBus,
        addr: Short,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        let physical = bus.query_actual_level(addr).await?;
        let lamp = self.lamp_mut(addr)?;
        let level = lamp.range.to_logical(physical)?;
        debug!("Get lamp_{} brightness level {} ({})", addr, level, physical);
        if level != lamp.level {
            lamp.level = level;
            let light = lamp.light_ref();
            out.publish(StateUpdate::Brightness { light, level });
            out.publish(StateUpdate::Power {
                light,
                on: level > 0,
            });
        }
        Ok(())
    }

    /// Blink a lamp and return it to its cached level
    pub async fn flash_lamp(
        &mut self,
        bus: &mut DaliBus,
        addr: Short,
        count: u32,
        interval: Duration,
    ) -> Result<(), DeviceError> {
        let lamp = self.lamp_mut(addr)?;
        let restore = lamp.range.to_physical(lamp.level)?;
        info!("Flash lamp_{} {} times", addr, count);
        bus.flash(addr.into(), count, interval, restore).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn range() -> PhysicalRange {
        PhysicalRange {
            min_physical: 85,
            min_level: 100,
            max_level: 254,
        }
    }

    #[test]
    fn range_test() {
        let r = range();
        assert_eq!(r.min_levels(), 100);
        assert_eq!(r.to_physical(0), Ok(0));
        assert_eq!(r.to_physical(1), Ok(100));
        assert_eq!(r.to_physical(255), Ok(254));
        assert_eq!(r.to_logical(0), Ok(0));
        assert_eq!(r.to_logical(254), Ok(255));
        // Below min level reads as the lowest non-zero level
        assert_eq!(r.to_logical(90), Ok(1));
    }

    #[test]
    fn scene_test() {
        let mut scenes = [MASK; 16];
        scenes[2] = 254;
        scenes[5] = 0;
        scenes[6] = 20;
        let lamp = Lamp::new(Short::new(1), range(), scenes, 0);
        assert_eq!(lamp.supported_scenes().collect::<Vec<_>>(), vec![2, 5, 6]);
        assert_eq!(lamp.scene_level(2), Ok(Some(255)));
        assert_eq!(lamp.scene_level(5), Ok(Some(0)));
        assert_eq!(lamp.scene_level(6), Ok(Some(1)));
        assert_eq!(lamp.scene_level(3), Ok(None));
        assert_eq!(lamp.scene_level(16), Ok(None));
    }
}
