use super::address_set::ShortSet;
use super::bus::DaliBus;
use super::error::DeviceError;
use super::lamp::Lamp;
use super::level;
use super::light_ref::LightRef;
use super::registry::DeviceRegistry;
use super::state::{publish_level, StatePublisher, StateUpdate};
use crate::common::address::GroupAddress;
use log::{debug, info};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the level of a group is derived from its members
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum GroupMode {
    /// Arithmetic mean, rounded up
    #[default]
    Mean,
    Max,
    Min,
    /// Only changed by commands to the group itself
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown group mode \"{0}\", expected mean, max, min or off")]
pub struct ParseGroupModeError(pub String);

impl FromStr for GroupMode {
    type Err = ParseGroupModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(GroupMode::Mean),
            "max" => Ok(GroupMode::Max),
            "min" => Ok(GroupMode::Min),
            "off" => Ok(GroupMode::Off),
            _ => Err(ParseGroupModeError(s.to_string())),
        }
    }
}

impl fmt::Display for GroupMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            GroupMode::Mean => "mean",
            GroupMode::Max => "max",
            GroupMode::Min => "min",
            GroupMode::Off => "off",
        })
    }
}

fn ceil_mean(levels: &[u8]) -> Option<u8> {
    if levels.is_empty() {
        return None;
    }
    let n = levels.len() as u32;
    let sum: u32 = levels.iter().map(|l| *l as u32).sum();
    Some(((sum + n - 1) / n) as u8)
}

impl GroupMode {
    /// Group level for the given member levels. `None` in `Off` mode or
    /// when there are no members.
    pub fn aggregate(&self, levels: &[u8]) -> Option<u8> {
        match self {
            GroupMode::Mean => ceil_mean(levels),
            GroupMode::Max => levels.iter().copied().max(),
            GroupMode::Min => levels.iter().copied().min(),
            GroupMode::Off => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    address: GroupAddress,
    mode: GroupMode,
    lamps: ShortSet,
    level: u8,
    min_levels: u8,
    max_level: u8,
    scenes: BTreeSet<u8>,
    current_scene: Option<u8>,
}

impl Group {
    /// Build a group from its members. In `Off` mode the level starts at
    /// the mean of the members and then stays put.
    pub fn new(address: GroupAddress, mode: GroupMode, members: &[&Lamp]) -> Result<Group, DeviceError> {
        let levels: Vec<u8> = members.iter().map(|l| l.level()).collect();
        let seed = match mode {
            GroupMode::Off => GroupMode::Mean,
            m => m,
        };
        let level = seed
            .aggregate(&levels)
            .ok_or(DeviceError::EmptyGroup(address))?;
        let min_levels = members.iter().map(|l| l.min_levels()).min().unwrap_or(0);
        let max_level = members.iter().map(|l| l.max_level()).max().unwrap_or(0);
        let scenes = members.iter().copied().flat_map(Lamp::supported_scenes).collect();
        Ok(Group {
            address,
            mode,
            lamps: members.iter().map(|l| l.address()).collect(),
            level,
            min_levels,
            max_level,
            scenes,
            current_scene: None,
        })
    }

    pub fn address(&self) -> GroupAddress {
        self.address
    }

    pub fn light_ref(&self) -> LightRef {
        LightRef::Group(self.address)
    }

    pub fn mode(&self) -> GroupMode {
        self.mode
    }

    pub fn lamps(&self) -> &ShortSet {
        &self.lamps
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn min_levels(&self) -> u8 {
        self.min_levels
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    /// Scenes programmed in at least one member
    pub fn scenes(&self) -> &BTreeSet<u8> {
        &self.scenes
    }

    pub fn current_scene(&self) -> Option<u8> {
        self.current_scene
    }

    pub(super) fn take_scene(&mut self) -> Option<u8> {
        self.current_scene.take()
    }

    pub fn to_physical(&self, logical: u8) -> Result<u8, level::LevelError> {
        level::to_physical(logical, self.min_levels, self.max_level)
    }
}

impl DeviceRegistry {
    pub(super) fn group_mut(&mut self, addr: GroupAddress) -> Result<&mut Group, DeviceError> {
        self.groups
            .get_mut(&addr)
            .ok_or(DeviceError::UnknownLight(LightRef::Group(addr)))
    }

    /// All groups that share a member with `addr`, including itself
    fn affected_groups(&self, addr: GroupAddress) -> BTreeSet<GroupAddress> {
        let mut affected = BTreeSet::new();
        if let Some(group) = self.groups.get(&addr) {
            affected.insert(addr);
            for lamp in group.lamps.iter().filter_map(|a| self.lamps.get(&a)) {
                affected.extend(lamp.groups().iter().copied());
            }
        }
        affected
    }

    /// Derive the level of a group from its members
    pub fn recalc_group(&mut self, addr: GroupAddress, out: &mut dyn StatePublisher) {
        let Some(group) = self.groups.get(&addr) else {
            return;
        };
        let levels: Vec<u8> = group
            .lamps
            .iter()
            .filter_map(|a| self.lamps.get(&a).map(|l| l.level()))
            .collect();
        let Some(level) = group.mode.aggregate(&levels) else {
            return;
        };
        let Some(group) = self.groups.get_mut(&addr) else {
            return;
        };
        if group.level != level {
            let old = group.level;
            group.level = level;
            debug!("Group {} recalculated to {}", addr, level);
            publish_level(out, group.light_ref(), old, level);
        }
    }

    /// Set the level of all lamps in a group with a single command
    pub async fn set_group_level(
        &mut self,
        bus: &mut DaliBus,
        addr: GroupAddress,
        level: u8,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        let group = self.group_mut(addr)?;
        let physical = group.to_physical(level)?;
        bus.send_direct_level(addr.into(), physical).await?;
        info!("Set group_{} brightness level to {} ({})", addr, level, physical);
        let group = self.group_mut(addr)?;
        let old = group.level;
        group.level = level;
        let light = group.light_ref();
        if group.take_scene().is_some() {
            out.publish(StateUpdate::Scene { light, scene: None });
        }
        let members = group.lamps;
        for lamp in members.iter() {
            self.apply_lamp_level(lamp, level, out)?;
        }
        let affected = self.affected_groups(addr);
        self.recalc_groups(affected, out);
        let level = self.group_mut(addr)?.level;
        publish_level(out, light, old, level);
        Ok(())
    }

    /// Recall a scene on all lamps of a group. The cached member levels
    /// are not updated.
    pub async fn set_group_scene(
        &mut self,
        bus: &mut DaliBus,
        addr: GroupAddress,
        index: u8,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        let light = LightRef::Group(addr);
        let group = self.group_mut(addr)?;
        group.take_scene();
        out.publish(StateUpdate::Scene { light, scene: None });
        if !group.scenes.contains(&index) {
            return Err(DeviceError::SceneUnavailable { light, scene: index });
        }
        let old = group.level;
        bus.send_go_to_scene(addr.into(), index).await?;
        info!("Call scene {} on {}", index, light);
        self.group_mut(addr)?.current_scene = Some(index);
        out.publish(StateUpdate::Scene {
            light,
            scene: Some(index),
        });
        let affected = self.affected_groups(addr);
        self.recalc_groups(affected, out);
        let level = self.group_mut(addr)?.level;
        publish_level(out, light, old, level);
        Ok(())
    }

    /// Blink all lamps of a group and return the group to its level
    pub async fn flash_group(
        &mut self,
        bus: &mut DaliBus,
        addr: GroupAddress,
        count: u32,
        interval: Duration,
    ) -> Result<(), DeviceError> {
        let group = self.group_mut(addr)?;
        let restore = group.to_physical(group.level)?;
        info!("Flash group_{} {} times", addr, count);
        bus.flash(addr.into(), count, interval, restore).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::address::Short;
    use crate::common::defs::MASK;
    use crate::light::lamp::PhysicalRange;

    fn lamp(addr: u8, level: u8, min: u8, max: u8, scenes: &[u8]) -> Lamp {
        let mut s = [MASK; 16];
        for i in scenes {
            s[*i as usize] = 200;
        }
        Lamp::new(
            Short::new(addr),
            PhysicalRange {
                min_physical: 1,
                min_level: min,
                max_level: max,
            },
            s,
            level,
        )
    }

    #[test]
    fn aggregate_test() {
        assert_eq!(GroupMode::Mean.aggregate(&[10, 20, 30]), Some(20));
        assert_eq!(GroupMode::Mean.aggregate(&[10, 11]), Some(11));
        assert_eq!(GroupMode::Mean.aggregate(&[255, 255]), Some(255));
        assert_eq!(GroupMode::Max.aggregate(&[0, 0, 5]), Some(5));
        assert_eq!(GroupMode::Min.aggregate(&[7, 0, 5]), Some(0));
        assert_eq!(GroupMode::Off.aggregate(&[7, 9]), None);
        assert_eq!(GroupMode::Mean.aggregate(&[]), None);
    }

    #[test]
    fn parse_mode_test() {
        assert_eq!("max".parse(), Ok(GroupMode::Max));
        assert_eq!("off".parse(), Ok(GroupMode::Off));
        assert!("mean_on".parse::<GroupMode>().is_err());
        assert_eq!(GroupMode::default().to_string(), "mean");
    }

    #[test]
    fn new_group_test() {
        let a = lamp(1, 10, 50, 200, &[0, 3]);
        let b = lamp(4, 21, 30, 254, &[3, 9]);
        let g = Group::new(GroupAddress::new(2), GroupMode::Max, &[&a, &b]).unwrap();
        assert_eq!(g.level(), 21);
        assert_eq!(g.min_levels(), 30);
        assert_eq!(g.max_level(), 254);
        assert_eq!(g.scenes().iter().copied().collect::<Vec<_>>(), vec![0, 3, 9]);
        assert_eq!(g.lamps().to_vec(), vec![Short::new(1), Short::new(4)]);

        let g = Group::new(GroupAddress::new(2), GroupMode::Off, &[&a, &b]).unwrap();
        assert_eq!(g.level(), 16);

        assert!(matches!(
            Group::new(GroupAddress::new(3), GroupMode::Mean, &[]),
            Err(DeviceError::EmptyGroup(_))
        ));
    }
}
