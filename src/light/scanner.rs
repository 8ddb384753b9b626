//! Bus enumeration.
//!
//! Lamps are found by probing every short address, groups by reading
//! the membership bitmasks of the lamps found.
use super::bus::DaliBus;
use super::error::DeviceError;
use super::lamp::{Lamp, PhysicalRange, SCENE_COUNT};
use super::registry::DeviceRegistry;
use crate::common::address::{GroupAddress, Short};
use crate::common::defs::MASK;
use crate::config::BridgeConfig;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Probe short addresses in ascending order until `max_count` lamps are
/// found.
pub async fn scan_lamps(bus: &mut DaliBus, max_count: usize) -> Vec<Short> {
    let mut lamps = Vec::new();
    if max_count == 0 {
        return lamps;
    }
    for addr in Short::all() {
        debug!("Search for lamp {}", addr);
        match bus.presence_query(addr).await {
            Ok(true) => {
                debug!("Found lamp at address {}", addr);
                lamps.push(addr);
                if lamps.len() >= max_count {
                    info!("All {} configured lamps have been found, stopping scan", max_count);
                    break;
                }
            }
            Ok(false) => {}
            Err(e) => warn!("{} not present: {}", addr, e),
        }
    }
    info!("Found {} lamps", lamps.len());
    lamps
}

/// Map each group with at least one member to its members, in address
/// order.
pub async fn scan_groups(bus: &mut DaliBus, lamps: &[Short]) -> BTreeMap<GroupAddress, Vec<Short>> {
    info!("Scanning for groups");
    let mut groups: BTreeMap<GroupAddress, Vec<Short>> = BTreeMap::new();
    for &lamp in lamps {
        let (low, high) = match bus.query_group_membership(lamp).await {
            Ok(m) => m,
            Err(e) => {
                warn!("Can't get groups for lamp {}: {}", lamp, e);
                continue;
            }
        };
        let mask = (high as u16) << 8 | low as u16;
        let mut lamp_groups = Vec::new();
        for g in 0..GroupAddress::COUNT {
            if mask & (1 << g) != 0 {
                let g = GroupAddress::new(g);
                groups.entry(g).or_default().push(lamp);
                lamp_groups.push(g.value());
            }
        }
        debug!("Lamp {} is in groups {:?}", lamp, lamp_groups);
    }
    groups
}

/// Read scenes, level limits and the actual level of a lamp
pub async fn read_lamp(bus: &mut DaliBus, addr: Short) -> Result<Lamp, DeviceError> {
    let mut scenes = [MASK; SCENE_COUNT as usize];
    for (i, scene) in scenes.iter_mut().enumerate() {
        *scene = bus.query_scene_level(addr, i as u8).await?;
    }
    debug!("Scenes: {:?}", scenes);
    let range = PhysicalRange {
        min_physical: bus.query_physical_minimum(addr).await?,
        min_level: bus.query_min_level(addr).await?,
        max_level: bus.query_max_level(addr).await?,
    };
    let physical = bus.query_actual_level(addr).await?;
    let level = range.to_logical(physical)?;
    info!(
        "   - short address: {}, actual brightness level: {} (minimum: {}, max: {}, physical minimum: {})",
        addr, level, range.min_level, range.max_level, range.min_physical
    );
    Ok(Lamp::new(addr, range, scenes, level))
}

/// Scan the bus and build a new registry. Lamps that fail to answer
/// parameter queries are left out.
pub async fn build_registry(bus: &mut DaliBus, config: &BridgeConfig) -> DeviceRegistry {
    let mut registry = DeviceRegistry::new();
    let found = scan_lamps(bus, config.max_lamps).await;
    info!("Getting lamp parameters");
    for addr in found {
        match read_lamp(bus, addr).await {
            Ok(lamp) => registry.insert_lamp(lamp),
            Err(e) => warn!("While initializing lamp {}: {}", addr, e),
        }
    }
    let lamps: Vec<Short> = registry.lamps().map(Lamp::address).collect();
    let groups = scan_groups(bus, &lamps).await;
    for (g, members) in groups {
        if let Err(e) = registry.add_group(g, config.group_mode, &members) {
            warn!("While initializing group {}: {}", g, e);
        } else {
            let members: Vec<u8> = members.iter().map(Short::value).collect();
            info!("   - group address: {}, members: {:?}", g, members);
        }
    }
    info!("Finished scanning, {} lamps and {} groups", lamps.len(), registry.groups().count());
    registry
}
