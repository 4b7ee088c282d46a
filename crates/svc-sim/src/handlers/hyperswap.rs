//! Hyperswap volumes.
//!
//! A hyperswap volume is a bundle: the named volume in the site-1 pool, a
//! `site2` twin in the site-2 pool, one `fcsite` change volume per site and
//! an `activeactive` relationship tying them together.

use tracing::info;

use super::remote::RcSpec;
use super::vdisk::{CopySpec, VolumeSpec, parse_io_group, thin_from_command};
use super::{Handler, created, parse_capacity};
use crate::command::Command;
use crate::error::{Error, ErrorCode, Result};
use crate::inject::FaultTag;
use crate::simulator::Simulator;
use crate::state::RcState;
use crate::types::{CopyType, RcMode, ThinProvisioning};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("mkvolume", mkvolume),
    ("addvolumecopy", addvolumecopy),
    ("rmvolumecopy", rmvolumecopy),
    ("rmvolume", rmvolume),
];

/// Companion volume names of a hyperswap volume.
struct Bundle {
    master_change: String,
    aux: String,
    aux_change: String,
}

impl Bundle {
    fn of(name: &str) -> Self {
        Self {
            master_change: format!("fcsite1{name}"),
            aux: format!("site2{name}"),
            aux_change: format!("fcsite2{name}"),
        }
    }

    fn companions(&self) -> [&str; 3] {
        [&self.master_change, &self.aux, &self.aux_change]
    }
}

/// `site1pool:site2pool`.
fn split_pools(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((site1, site2)) if !site1.is_empty() && !site2.is_empty() && !site2.contains(':') => {
            Ok((site1, site2))
        }
        _ => Err(Error::invalid_input(format!(
            "pool {raw} is invalid for hyperswap volume"
        ))),
    }
}

impl Simulator {
    /// The activeactive relationship whose master is `volume`.
    fn hyperswap_relationship(&self, volume: &str) -> Option<String> {
        let link = self.volumes.get(volume)?.rc.as_ref()?;
        let rc = self.rc_relationships.get(&link.name)?;
        (rc.mode.copy_type == CopyType::Activeactive && rc.master_vdisk == volume)
            .then(|| rc.name.clone())
    }

    /// Create the companions of `master` and the relationship binding them.
    fn build_hyperswap(
        &mut self,
        master: &str,
        site1_pool: &str,
        site2_pool: &str,
        thin: Option<ThinProvisioning>,
    ) -> Result<()> {
        let bundle = Bundle::of(master);
        let Some(vol) = self.volumes.get(master) else {
            return Err(ErrorCode::Cmmvc5753e.into());
        };
        let (capacity, io_group) = (vol.capacity, vol.io_group);
        for (name, pool) in [
            (&bundle.master_change, site1_pool),
            (&bundle.aux, site2_pool),
            (&bundle.aux_change, site2_pool),
        ] {
            self.check_new_volume(name, &[pool])?;
        }

        for (name, pool) in [
            (&bundle.master_change, site1_pool),
            (&bundle.aux, site2_pool),
            (&bundle.aux_change, site2_pool),
        ] {
            self.create_volume(VolumeSpec {
                name: Some(name.clone()),
                capacity,
                io_group,
                copies: vec![CopySpec {
                    thin: thin.clone(),
                    ..CopySpec::plain(pool)
                }],
            })?;
        }

        let (_, rc_name) = self.create_rc_relationship(RcSpec {
            name: None,
            master: master.to_string(),
            aux: bundle.aux.clone(),
            aux_cluster: self.local_cluster(),
            mode: RcMode {
                copy_type: CopyType::Activeactive,
                ..RcMode::default()
            },
            state: RcState::ConsistentSynchronized,
            progress: 100,
        })?;
        if let Some(rc) = self.rc_relationships.get_mut(&rc_name) {
            rc.master_change_vdisk = Some(bundle.master_change);
            rc.aux_change_vdisk = Some(bundle.aux_change);
        }
        info!(volume = %master, relationship = %rc_name, "built hyperswap volume");
        Ok(())
    }

    /// Remove the companions and relationship, leaving `master` plain.
    fn unbuild_hyperswap(&mut self, master: &str, rc: &str) {
        self.drop_rc_relationship(rc);
        for companion in Bundle::of(master).companions() {
            self.purge_volume(companion);
        }
    }
}

fn mkvolume(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let pools = cmd.require("pool", ErrorCode::Cmmvc5707e)?;
    let (site1, site2) = split_pools(pools)?;
    let size = cmd.require("size", ErrorCode::Cmmvc5707e)?;
    let capacity = parse_capacity(size, cmd.value("unit").unwrap_or("mb"))?;
    let io_group = cmd.value("iogrp").map_or(Ok(0), parse_io_group)?;
    let thin = thin_from_command(cmd, capacity, fault)?;

    let id = sim.volumes.next_id();
    let name = cmd
        .unquoted("name")
        .map_or_else(|| format!("volume{id}"), str::to_string);
    sim.check_new_volume(&name, &[site1])?;
    let bundle = Bundle::of(&name);
    for companion in bundle.companions() {
        sim.check_new_volume(companion, &[site2])?;
    }

    sim.create_volume(VolumeSpec {
        name: Some(name.clone()),
        capacity,
        io_group,
        copies: vec![CopySpec {
            thin: thin.clone(),
            ..CopySpec::plain(site1)
        }],
    })?;
    sim.build_hyperswap(&name, site1, site2, thin)?;
    Ok(created("Volume", id))
}

fn addvolumecopy(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let key = cmd.object()?;
    let pool = cmd.require("pool", ErrorCode::Cmmvc5707e)?;
    let name = sim.volumes.resolve(key).ok_or(ErrorCode::Cmmvc5753e)?;
    let Some(vol) = sim.volumes.get(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if vol.rc.is_some() {
        return Err(ErrorCode::Cmmvc6065e.into());
    }
    let site1 = vol
        .primary_copy()
        .map(|c| c.pool.clone())
        .ok_or(ErrorCode::Cmmvc6353e)?;
    let capacity = vol.capacity;
    if sim.pool(pool).is_none() {
        return Err(ErrorCode::Cmmvc5754e.into());
    }
    let thin = thin_from_command(cmd, capacity, fault)?;
    sim.build_hyperswap(&name, &site1, pool, thin)?;
    Ok(String::new())
}

fn rmvolumecopy(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim
        .volumes
        .resolve(cmd.object()?)
        .ok_or(ErrorCode::Cmmvc5753e)?;
    let rc = sim
        .hyperswap_relationship(&name)
        .ok_or(ErrorCode::Cmmvc6353e)?;
    sim.unbuild_hyperswap(&name, &rc);
    info!(volume = %name, "removed hyperswap copy");
    Ok(String::new())
}

fn rmvolume(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim
        .volumes
        .resolve(cmd.object()?)
        .ok_or(ErrorCode::Cmmvc5753e)?;
    let own_rc = sim.hyperswap_relationship(&name);

    let mapped = sim.mappings.values().any(|m| m.volume == name);
    let flashcopied = sim.volume_in_fc_mapping(&name);
    let replicated = sim
        .volumes
        .get(&name)
        .and_then(|v| v.rc.as_ref())
        .is_some_and(|link| Some(&link.name) != own_rc.as_ref());
    if (mapped && !cmd.has("removehostmappings"))
        || (flashcopied && !cmd.has("removefcmaps"))
        || (replicated && !cmd.has("removercrelationships"))
    {
        return Err(ErrorCode::Cmmvc5840e.into());
    }

    if let Some(rc) = own_rc {
        sim.unbuild_hyperswap(&name, &rc);
    }
    sim.purge_volume(&name);
    Ok(String::new())
}
