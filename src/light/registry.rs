use super::bus::DaliBus;
use super::error::DeviceError;
use super::group::{Group, GroupMode};
use super::lamp::Lamp;
use super::light_ref::LightRef;
use super::state::{publish_full, StatePublisher, StateUpdate};
use crate::common::address::{GroupAddress, Short};
use log::warn;
use std::collections::BTreeMap;

/// Owner of all lamps and groups found on the bus. Lamps refer to their
/// groups and groups to their lamps by address.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    pub(super) lamps: BTreeMap<Short, Lamp>,
    pub(super) groups: BTreeMap<GroupAddress, Group>,
}

impl DeviceRegistry {
    pub fn new() -> DeviceRegistry {
        DeviceRegistry::default()
    }

    /// Add a lamp, replacing any lamp with the same address
    pub fn insert_lamp(&mut self, lamp: Lamp) {
        self.lamps.insert(lamp.address(), lamp);
    }

    /// Build a group from lamps already in the registry and link the
    /// members to it. Unknown members are an error.
    pub fn add_group(
        &mut self,
        address: GroupAddress,
        mode: GroupMode,
        members: &[Short],
    ) -> Result<(), DeviceError> {
        let lamps = members
            .iter()
            .map(|a| {
                self.lamps
                    .get(a)
                    .ok_or(DeviceError::UnknownLight(LightRef::Lamp(*a)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let group = Group::new(address, mode, &lamps)?;
        for a in members {
            if let Some(lamp) = self.lamps.get_mut(a) {
                lamp.add_group(address);
            }
        }
        self.groups.insert(address, group);
        Ok(())
    }

    pub fn lamp(&self, addr: Short) -> Option<&Lamp> {
        self.lamps.get(&addr)
    }

    pub fn group(&self, addr: GroupAddress) -> Option<&Group> {
        self.groups.get(&addr)
    }

    /// Lamps in address order
    pub fn lamps(&self) -> impl Iterator<Item = &Lamp> {
        self.lamps.values()
    }

    /// Groups in address order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn contains(&self, light: LightRef) -> bool {
        match light {
            LightRef::Lamp(a) => self.lamps.contains_key(&a),
            LightRef::Group(g) => self.groups.contains_key(&g),
        }
    }

    /// All lights, lamps first
    pub fn lights(&self) -> impl Iterator<Item = LightRef> + '_ {
        self.lamps
            .keys()
            .map(|a| LightRef::Lamp(*a))
            .chain(self.groups.keys().map(|g| LightRef::Group(*g)))
    }

    /// Recalculate each group once, in address order
    pub fn recalc_groups<I>(&mut self, groups: I, out: &mut dyn StatePublisher)
    where
        I: IntoIterator<Item = GroupAddress>,
    {
        let mut groups: Vec<GroupAddress> = groups.into_iter().collect();
        groups.sort();
        groups.dedup();
        for g in groups {
            self.recalc_group(g, out);
        }
    }

    /// Clear the selected scene of a lamp or group
    pub fn clear_scene(&mut self, light: LightRef, out: &mut dyn StatePublisher) -> Result<(), DeviceError> {
        match light {
            LightRef::Lamp(a) => {
                self.lamp_mut(a)?.take_scene();
            }
            LightRef::Group(g) => {
                self.group_mut(g)?.take_scene();
            }
        }
        out.publish(StateUpdate::Scene { light, scene: None });
        Ok(())
    }

    /// Read the level of every lamp, then recalculate every group
    pub async fn poll_all(&mut self, bus: &mut DaliBus, out: &mut dyn StatePublisher) {
        let lamps: Vec<Short> = self.lamps.keys().copied().collect();
        for addr in lamps {
            if let Err(e) = self.poll_lamp(bus, addr, out).await {
                warn!("Failed to poll lamp_{}: {}", addr, e);
            }
        }
        let groups: Vec<GroupAddress> = self.groups.keys().copied().collect();
        for g in groups {
            self.recalc_group(g, out);
        }
    }

    /// Report the complete state of every lamp and group
    pub fn publish_all(&self, out: &mut dyn StatePublisher) {
        for lamp in self.lamps.values() {
            publish_full(out, lamp.light_ref(), lamp.level(), lamp.current_scene());
        }
        for group in self.groups.values() {
            publish_full(out, group.light_ref(), group.level(), group.current_scene());
        }
    }
}
