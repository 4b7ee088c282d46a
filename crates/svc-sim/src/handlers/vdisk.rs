//! Volume (vdisk) commands.

use std::collections::BTreeMap;

use tracing::info;

use super::system::IO_GROUP_COUNT;
use super::{
    Handler, apply_table_fault, created, is_valid_name, parse_capacity, parse_num, parse_switch,
    render_object, render_table,
};
use crate::command::Command;
use crate::error::{Error, ErrorCode, Result};
use crate::format::{ObjectView, Table, capacity, on_off, yes_no};
use crate::inject::FaultTag;
use crate::simulator::Simulator;
use crate::store::find_unused_id;
use crate::types::{ThinProvisioning, Volume, VolumeCopy, volume_uid};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("mkvdisk", mkvdisk),
    ("rmvdisk", rmvdisk),
    ("lsvdisk", lsvdisk),
    ("chvdisk", chvdisk),
    ("expandvdisksize", expandvdisksize),
    ("migratevdisk", migratevdisk),
    ("addvdiskcopy", addvdiskcopy),
    ("rmvdiskcopy", rmvdiskcopy),
    ("lsvdiskcopy", lsvdiskcopy),
    ("lsvdisksyncprogress", lsvdisksyncprogress),
    ("lsvdiskfcmappings", lsvdiskfcmappings),
];

/// Allocation reported as used on a fresh thin copy.
const THIN_USED_BYTES: u64 = 786_432;

const DEFAULT_GRAINSIZE: u32 = 256;
const DEFAULT_RSIZE_PERCENT: u64 = 2;

/// One copy of a volume about to be created.
#[derive(Debug, Clone)]
pub(crate) struct CopySpec {
    pub(crate) pool: String,
    pub(crate) thin: Option<ThinProvisioning>,
    pub(crate) easy_tier: bool,
}

impl CopySpec {
    pub(crate) fn plain(pool: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            thin: None,
            easy_tier: true,
        }
    }
}

/// A volume about to be created.
#[derive(Debug, Clone)]
pub(crate) struct VolumeSpec {
    pub(crate) name: Option<String>,
    pub(crate) capacity: u64,
    pub(crate) io_group: u32,
    pub(crate) copies: Vec<CopySpec>,
}

impl Simulator {
    /// Check that a volume could be created, without creating it.
    pub(crate) fn check_new_volume(&self, name: &str, pools: &[&str]) -> Result<()> {
        if !is_valid_name(name) {
            return Err(ErrorCode::Cmmvc6527e.into());
        }
        if self.volumes.contains(name) {
            return Err(ErrorCode::Cmmvc6035e.into());
        }
        if pools.iter().any(|p| self.pool(p).is_none()) {
            return Err(ErrorCode::Cmmvc5754e.into());
        }
        Ok(())
    }

    /// Create a volume; returns its id and name.
    pub(crate) fn create_volume(&mut self, spec: VolumeSpec) -> Result<(u32, String)> {
        let id = self.volumes.next_id();
        let name = spec.name.unwrap_or_else(|| format!("vdisk{id}"));
        let pools: Vec<&str> = spec.copies.iter().map(|c| c.pool.as_str()).collect();
        self.check_new_volume(&name, &pools)?;

        let mut copies = BTreeMap::new();
        for (copy_id, copy) in spec.copies.into_iter().enumerate() {
            let pool = self.pool(&copy.pool).ok_or(ErrorCode::Cmmvc5754e)?;
            copies.insert(
                copy_id as u32,
                VolumeCopy {
                    id: copy_id as u32,
                    pool: pool.name.clone(),
                    pool_id: pool.id,
                    primary: copy_id == 0,
                    sync: true,
                    easy_tier: copy.easy_tier,
                    thin: copy.thin,
                },
            );
        }

        info!(volume = %name, id, capacity = spec.capacity, copies = copies.len(), "created volume");
        self.volumes.insert(Volume {
            id,
            name: name.clone(),
            uid: volume_uid(id),
            capacity: spec.capacity,
            io_group: spec.io_group,
            preferred_node: 1 + id % 2,
            rc: None,
            copies,
            autodelete_copy: None,
        });
        Ok((id, name))
    }

    /// Whether a volume is mapped, in a FlashCopy mapping, or replicated.
    pub(crate) fn volume_in_use(&self, name: &str) -> bool {
        self.mappings.values().any(|m| m.volume == name)
            || self.volume_in_fc_mapping(name)
            || self.volumes.get(name).is_some_and(|v| v.rc.is_some())
    }

    pub(crate) fn volume_in_fc_mapping(&self, name: &str) -> bool {
        self.fc_mappings
            .values()
            .any(|m| m.source == name || m.target == name)
    }

    /// Delete a volume together with its mappings and relationships.
    pub(crate) fn purge_volume(&mut self, name: &str) {
        let mapping_keys: Vec<String> = self
            .mappings
            .values()
            .filter(|m| m.volume == name)
            .map(|m| m.key.clone())
            .collect();
        for key in mapping_keys {
            self.mappings.remove(&key);
        }

        let fc_names: Vec<String> = self
            .fc_mappings
            .values()
            .filter(|m| m.source == name || m.target == name)
            .map(|m| m.name.clone())
            .collect();
        for fc in fc_names {
            self.drop_fc_mapping(&fc);
        }

        if let Some(rc) = self.volumes.get(name).and_then(|v| v.rc.clone()) {
            self.drop_rc_relationship(&rc.name);
        }

        if self.volumes.remove(name).is_some() {
            info!(volume = %name, "deleted volume");
        }
    }

    fn rename_volume(&mut self, old: &str, new: &str) {
        if !self.volumes.rename(old, new) {
            return;
        }
        let rename = |field: &mut String| {
            if field == old {
                *field = new.to_string();
            }
        };
        self.mappings.values_mut().for_each(|m| rename(&mut m.volume));
        for fc in self.fc_mappings.values_mut() {
            rename(&mut fc.source);
            rename(&mut fc.target);
        }
        for rc in self.rc_relationships.values_mut() {
            rename(&mut rc.master_vdisk);
            rename(&mut rc.aux_vdisk);
            if let Some(v) = rc.master_change_vdisk.as_mut() {
                rename(v);
            }
            if let Some(v) = rc.aux_change_vdisk.as_mut() {
                rename(v);
            }
        }
    }

    fn resolve_volume(&self, key: &str) -> Result<String> {
        self.volumes
            .resolve(key)
            .ok_or_else(|| ErrorCode::Cmmvc5753e.into())
    }

    /// `(id, name, count)` of the FlashCopy mappings touching a volume.
    fn fc_summary(&self, name: &str) -> (String, String, usize) {
        let maps: Vec<_> = self
            .fc_mappings
            .values()
            .filter(|m| m.source == name || m.target == name)
            .collect();
        match maps.as_slice() {
            [] => (String::new(), String::new(), 0),
            [only] => (only.id.to_string(), only.name.clone(), 1),
            many => ("many".to_string(), "many".to_string(), many.len()),
        }
    }
}

/// Thin provisioning requested by `-rsize`, `-thin` or `-compressed`.
pub(crate) fn thin_from_command(
    cmd: &Command,
    volume_capacity: u64,
    fault: Option<FaultTag>,
) -> Result<Option<ThinProvisioning>> {
    let compressed = cmd.has("compressed");
    if compressed && fault == Some(FaultTag::NoCompression) {
        return Err(ErrorCode::Cmmvc7050e.into());
    }
    if !(compressed || cmd.has("rsize") || cmd.has("thin")) {
        return Ok(None);
    }
    let percent = cmd
        .value("rsize")
        .map_or(Ok(DEFAULT_RSIZE_PERCENT), parse_rsize)?;
    let real_capacity = volume_capacity.saturating_mul(percent) / 100;
    let autoexpand = match cmd.value("autoexpand") {
        Some(v) => parse_switch(v)?,
        None => cmd.has("autoexpand"),
    };
    let grainsize = cmd
        .value("grainsize")
        .map_or(Ok(DEFAULT_GRAINSIZE), |v| parse_num(v, ErrorCode::Cmmvc5707e))?;
    Ok(Some(ThinProvisioning {
        real_capacity,
        used_capacity: THIN_USED_BYTES.min(real_capacity),
        autoexpand,
        warning: cmd.value("warning").unwrap_or("80%").to_string(),
        grainsize,
        compressed,
    }))
}

/// `2%`, `2` or `-1` (fully allocated).
fn parse_rsize(raw: &str) -> Result<u64> {
    let value: i64 = parse_num(raw.trim_end_matches('%'), ErrorCode::Cmmvc5707e)?;
    Ok(if value < 0 { 100 } else { value.min(100) as u64 })
}

/// `0` or `io_grp0`.
pub(crate) fn parse_io_group(raw: &str) -> Result<u32> {
    let id: u32 = parse_num(raw.trim_start_matches("io_grp"), ErrorCode::Cmmvc5754e)?;
    if id >= IO_GROUP_COUNT {
        return Err(ErrorCode::Cmmvc5754e.into());
    }
    Ok(id)
}

fn easy_tier_from_command(cmd: &Command) -> Result<bool> {
    cmd.value("easytier").map_or(Ok(true), parse_switch)
}

fn mkvdisk(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let pools = cmd.require("mdiskgrp", ErrorCode::Cmmvc5707e)?;
    let size = cmd.require("size", ErrorCode::Cmmvc5707e)?;
    let unit = cmd.require("unit", ErrorCode::Cmmvc5707e)?;
    let io_group = cmd.require("iogrp", ErrorCode::Cmmvc5707e)?;

    let pools: Vec<&str> = pools.split(':').collect();
    if pools.len() > 2 || pools.iter().any(|p| p.is_empty()) {
        return Err(ErrorCode::Cmmvc5707e.into());
    }
    if let Some(copies) = cmd.value("copies") {
        let copies: usize = parse_num(copies, ErrorCode::Cmmvc5707e)?;
        if copies != pools.len() {
            return Err(ErrorCode::Cmmvc5707e.into());
        }
    }

    let capacity = parse_capacity(size, unit)?;
    let io_group = parse_io_group(io_group)?;
    let thin = thin_from_command(cmd, capacity, fault)?;
    let easy_tier = easy_tier_from_command(cmd)?;

    let spec = VolumeSpec {
        name: cmd.unquoted("name").map(str::to_string),
        capacity,
        io_group,
        copies: pools
            .iter()
            .map(|p| CopySpec {
                pool: (*p).to_string(),
                thin: thin.clone(),
                easy_tier,
            })
            .collect(),
    };
    let (id, _) = sim.create_volume(spec)?;
    if fault == Some(FaultTag::BadId) {
        return Ok(format!("Virtual Disk, id [x{id}], successfully created"));
    }
    Ok(created("Virtual Disk", id))
}

fn rmvdisk(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_volume(cmd.object()?)?;
    if !cmd.has("force") && sim.volume_in_use(&name) {
        return Err(ErrorCode::Cmmvc5840e.into());
    }
    sim.purge_volume(&name);
    Ok(String::new())
}

const LSVDISK_HEADER: [&str; 19] = [
    "id",
    "name",
    "IO_group_id",
    "IO_group_name",
    "status",
    "mdisk_grp_id",
    "mdisk_grp_name",
    "capacity",
    "type",
    "FC_id",
    "FC_name",
    "RC_id",
    "RC_name",
    "vdisk_UID",
    "fc_map_count",
    "copy_count",
    "fast_write_state",
    "se_copy_count",
    "RC_change",
];

fn volume_type(vol: &Volume) -> &'static str {
    if vol.copies.len() > 1 { "many" } else { "striped" }
}

fn lsvdisk(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    if let Some(key) = cmd.object_opt() {
        let vol = sim.volumes.find(key).ok_or(ErrorCode::Cmmvc5754e)?;
        let mut view = volume_view(sim, vol);
        match fault {
            Some(FaultTag::BlankPrefNode) => view.set("preferred_node_id", ""),
            Some(FaultTag::NoPrefNode) => view.remove("preferred_node_id"),
            _ => {}
        }
        return Ok(render_object(cmd, &view));
    }

    let raw = cmd.has("bytes");
    let mut table = Table::new(LSVDISK_HEADER);
    for vol in sim.volumes.values() {
        let (fc_id, fc_name, fc_count) = sim.fc_summary(&vol.name);
        let (rc_id, rc_name) = vol
            .rc
            .as_ref()
            .map(|rc| (rc.id.to_string(), rc.name.clone()))
            .unwrap_or_default();
        table.push([
            vol.id.to_string(),
            vol.name.clone(),
            vol.io_group.to_string(),
            format!("io_grp{}", vol.io_group),
            "online".to_string(),
            vol.pool_id(),
            vol.pool_name().to_string(),
            capacity(vol.capacity, raw),
            volume_type(vol).to_string(),
            fc_id,
            fc_name,
            rc_id,
            rc_name,
            vol.uid.clone(),
            fc_count.to_string(),
            vol.copies.len().to_string(),
            "empty".to_string(),
            vol.thin_copy_count().to_string(),
            "no".to_string(),
        ]);
    }
    apply_table_fault(&mut table, fault, 0);
    render_table(cmd, table)
}

/// Full detail of one volume. Capacities are always in bytes.
fn volume_view(sim: &Simulator, vol: &Volume) -> ObjectView {
    let (fc_id, fc_name, fc_count) = sim.fc_summary(&vol.name);
    let mut view = ObjectView::new();
    view.push("id", vol.id.to_string());
    view.push("name", &vol.name);
    view.push("IO_group_id", vol.io_group.to_string());
    view.push("IO_group_name", format!("io_grp{}", vol.io_group));
    view.push("status", "online");
    view.push("mdisk_grp_id", vol.pool_id());
    view.push("mdisk_grp_name", vol.pool_name());
    view.push("capacity", vol.capacity.to_string());
    view.push("type", volume_type(vol));
    view.push("formatted", "yes");
    view.push("mdisk_id", "");
    view.push("mdisk_name", "");
    view.push("FC_id", fc_id);
    view.push("FC_name", fc_name);
    view.push(
        "RC_id",
        vol.rc.as_ref().map(|rc| rc.id.to_string()).unwrap_or_default(),
    );
    view.push(
        "RC_name",
        vol.rc.as_ref().map(|rc| rc.name.clone()).unwrap_or_default(),
    );
    view.push("vdisk_UID", &vol.uid);
    view.push("preferred_node_id", vol.preferred_node.to_string());
    view.push("fast_write_state", "empty");
    view.push("cache", "readwrite");
    view.push("udid", "");
    view.push("fc_map_count", fc_count.to_string());
    view.push("sync_rate", "50");
    view.push("copy_count", vol.copies.len().to_string());
    view.push("se_copy_count", vol.thin_copy_count().to_string());
    view.push("filesystem", "");
    view.push("mirror_write_priority", "latency");
    view.push("RC_change", "no");

    for copy in vol.copies.values() {
        let (used, real, free, overallocation) = match &copy.thin {
            Some(t) => (
                t.used_capacity,
                t.real_capacity,
                t.real_capacity.saturating_sub(t.used_capacity),
                if t.real_capacity == 0 {
                    0
                } else {
                    vol.capacity.saturating_mul(100) / t.real_capacity
                },
            ),
            None => (vol.capacity, vol.capacity, 0, 100),
        };
        view.push("copy_id", copy.id.to_string());
        view.push("status", "online");
        view.push("sync", yes_no(copy.sync));
        view.push("primary", yes_no(copy.primary));
        view.push("mdisk_grp_id", copy.pool_id.to_string());
        view.push("mdisk_grp_name", &copy.pool);
        view.push("type", "striped");
        view.push("mdisk_id", "");
        view.push("mdisk_name", "");
        view.push("fast_write_state", "empty");
        view.push("used_capacity", used.to_string());
        view.push("real_capacity", real.to_string());
        view.push("free_capacity", free.to_string());
        view.push("overallocation", overallocation.to_string());
        view.push("autoexpand", on_off(copy.thin.as_ref().is_some_and(|t| t.autoexpand)));
        view.push(
            "warning",
            copy.thin
                .as_ref()
                .map(|t| t.warning.trim_end_matches('%').to_string())
                .unwrap_or_default(),
        );
        view.push(
            "grainsize",
            copy.thin
                .as_ref()
                .map(|t| t.grainsize.to_string())
                .unwrap_or_default(),
        );
        view.push("se_copy", yes_no(copy.thin.is_some()));
        view.push("easy_tier", on_off(copy.easy_tier));
        view.push("easy_tier_status", if copy.easy_tier { "balanced" } else { "inactive" });
        view.push("compressed_copy", yes_no(copy.compressed()));
    }
    view
}

fn chvdisk(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_volume(cmd.object()?)?;

    let new_name = cmd.unquoted("name");
    if let Some(new) = new_name {
        if !is_valid_name(new) {
            return Err(ErrorCode::Cmmvc6527e.into());
        }
        if new != name && sim.volumes.contains(new) {
            return Err(ErrorCode::Cmmvc6035e.into());
        }
    }
    let autoexpand = cmd.value("autoexpand").map(parse_switch).transpose()?;
    let easy_tier = cmd.value("easytier").map(parse_switch).transpose()?;
    let warning = cmd.value("warning");
    let primary: Option<u32> = cmd
        .value("primary")
        .map(|v| parse_num(v, ErrorCode::Cmmvc6353e))
        .transpose()?;

    let Some(vol) = sim.volumes.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if let Some(p) = primary {
        if !vol.copies.contains_key(&p) {
            return Err(ErrorCode::Cmmvc6353e.into());
        }
        for copy in vol.copies.values_mut() {
            copy.primary = copy.id == p;
        }
    }
    for copy in vol.copies.values_mut() {
        if let Some(e) = easy_tier {
            copy.easy_tier = e;
        }
        if let Some(thin) = copy.thin.as_mut() {
            if let Some(a) = autoexpand {
                thin.autoexpand = a;
            }
            if let Some(w) = warning {
                thin.warning = w.to_string();
            }
        }
    }

    if let Some(new) = new_name {
        sim.rename_volume(&name, new);
    }
    Ok(String::new())
}

fn expandvdisksize(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_volume(cmd.object()?)?;
    let size = cmd.require("size", ErrorCode::Cmmvc5707e)?;
    let extra = parse_capacity(size, cmd.value("unit").unwrap_or("mb"))?;
    if let Some(vol) = sim.volumes.get_mut(&name) {
        vol.capacity = vol.capacity.saturating_add(extra);
        info!(volume = %name, capacity = vol.capacity, "expanded volume");
    }
    Ok(String::new())
}

fn migratevdisk(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let pool = cmd.require("mdiskgrp", ErrorCode::Cmmvc5707e)?;
    let name = sim.resolve_volume(cmd.require("vdisk", ErrorCode::Cmmvc5707e)?)?;
    let (pool_name, pool_id) = sim
        .pool(pool)
        .map(|p| (p.name.clone(), p.id))
        .ok_or(ErrorCode::Cmmvc5754e)?;
    let copy_id: Option<u32> = cmd
        .value("copy")
        .map(|v| parse_num(v, ErrorCode::Cmmvc6353e))
        .transpose()?;

    let Some(vol) = sim.volumes.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    let target = match copy_id {
        Some(id) => vol.copies.get_mut(&id).ok_or(ErrorCode::Cmmvc6353e)?,
        None => vol
            .copies
            .values_mut()
            .find(|c| c.primary)
            .ok_or(ErrorCode::Cmmvc6353e)?,
    };
    target.pool = pool_name;
    target.pool_id = pool_id;
    Ok(String::new())
}

fn addvdiskcopy(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_volume(cmd.object()?)?;
    let pool = cmd.require("mdiskgrp", ErrorCode::Cmmvc5707e)?;
    let (pool_name, pool_id) = sim
        .pool(pool)
        .map(|p| (p.name.clone(), p.id))
        .ok_or(ErrorCode::Cmmvc5754e)?;
    let easy_tier = easy_tier_from_command(cmd)?;

    let Some(vol) = sim.volumes.get(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if vol.copies.len() >= 2 {
        return Err(ErrorCode::Cmmvc6065e.into());
    }
    if vol.copies.values().any(|c| c.pool == pool_name) {
        return Err(ErrorCode::Cmmvc6430e.into());
    }
    let thin = thin_from_command(cmd, vol.capacity, fault)?;
    let copy_id = find_unused_id(vol.copies.keys().copied());
    let old_primary = vol.primary_copy().map(|c| c.id);

    let Some(vol) = sim.volumes.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    vol.copies.insert(
        copy_id,
        VolumeCopy {
            id: copy_id,
            pool: pool_name,
            pool_id,
            primary: false,
            sync: false,
            easy_tier,
            thin,
        },
    );
    if cmd.has("autodelete") {
        vol.autodelete_copy = old_primary;
    }
    info!(volume = %name, copy_id, "added volume copy");
    Ok(format!("Vdisk [{}] copy [{copy_id}] successfully created", vol.id))
}

fn rmvdiskcopy(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_volume(cmd.object()?)?;
    let copy_id: u32 = parse_num(
        cmd.require("copy", ErrorCode::Cmmvc5707e)?,
        ErrorCode::Cmmvc6353e,
    )?;
    let Some(vol) = sim.volumes.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if !vol.copies.contains_key(&copy_id) {
        return Err(ErrorCode::Cmmvc6353e.into());
    }
    if vol.copies.len() < 2 {
        return Err(ErrorCode::Cmmvc6065e.into());
    }
    remove_copy(vol, copy_id);
    Ok(String::new())
}

/// Drop a copy; the survivor becomes a synced primary when it is alone.
fn remove_copy(vol: &mut Volume, copy_id: u32) {
    vol.copies.remove(&copy_id);
    if vol.autodelete_copy == Some(copy_id) {
        vol.autodelete_copy = None;
    }
    if vol.copies.len() == 1 {
        for copy in vol.copies.values_mut() {
            copy.primary = true;
            copy.sync = true;
        }
    } else if !vol.copies.values().any(|c| c.primary) {
        if let Some(first) = vol.copies.values_mut().next() {
            first.primary = true;
        }
    }
    info!(volume = %vol.name, copy_id, "removed volume copy");
}

fn lsvdiskcopy(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let only = cmd.object_opt().map(|k| sim.resolve_volume(k)).transpose()?;
    let copy_filter: Option<u32> = cmd
        .value("copy")
        .map(|v| parse_num(v, ErrorCode::Cmmvc6353e))
        .transpose()?;
    let raw = cmd.has("bytes");

    let mut table = Table::new([
        "vdisk_id",
        "vdisk_name",
        "copy_id",
        "status",
        "sync",
        "primary",
        "mdisk_grp_id",
        "mdisk_grp_name",
        "capacity",
        "type",
        "se_copy",
        "easy_tier",
        "easy_tier_status",
        "compressed_copy",
    ]);
    for vol in sim.volumes.values() {
        if only.as_ref().is_some_and(|n| *n != vol.name) {
            continue;
        }
        for copy in vol.copies.values() {
            if copy_filter.is_some_and(|c| c != copy.id) {
                continue;
            }
            table.push([
                vol.id.to_string(),
                vol.name.clone(),
                copy.id.to_string(),
                "online".to_string(),
                yes_no(copy.sync).to_string(),
                yes_no(copy.primary).to_string(),
                copy.pool_id.to_string(),
                copy.pool.clone(),
                capacity(vol.capacity, raw),
                "striped".to_string(),
                yes_no(copy.thin.is_some()).to_string(),
                on_off(copy.easy_tier).to_string(),
                if copy.easy_tier { "balanced" } else { "inactive" }.to_string(),
                yes_no(copy.compressed()).to_string(),
            ]);
        }
    }
    if copy_filter.is_some() && table.is_empty() {
        return Err(ErrorCode::Cmmvc6353e.into());
    }
    render_table(cmd, table)
}

/// Each call reports unsynced copies at 50% and then marks them synced.
fn lsvdisksyncprogress(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let only = cmd.object_opt().map(|k| sim.resolve_volume(k)).transpose()?;
    let copy_filter: Option<u32> = cmd
        .value("copy")
        .map(|v| parse_num(v, ErrorCode::Cmmvc6353e))
        .transpose()?;
    if let (Some(name), Some(copy)) = (&only, copy_filter) {
        if !sim
            .volumes
            .get(name)
            .is_some_and(|v| v.copies.contains_key(&copy))
        {
            return Err(ErrorCode::Cmmvc6353e.into());
        }
    }

    let mut table = Table::new([
        "vdisk_id",
        "vdisk_name",
        "copy_id",
        "progress",
        "estimated_completion_time",
    ]);
    for vol in sim.volumes.values_mut() {
        if only.as_ref().is_some_and(|n| *n != vol.name) {
            continue;
        }
        let mut newly_synced = Vec::new();
        for copy in vol.copies.values_mut() {
            if copy_filter.is_some_and(|c| c != copy.id) {
                continue;
            }
            let (progress, eta) = if copy.sync {
                ("100", "")
            } else {
                copy.sync = true;
                newly_synced.push(copy.id);
                ("50", "140210012345")
            };
            table.push([
                vol.id.to_string(),
                vol.name.clone(),
                copy.id.to_string(),
                progress.to_string(),
                eta.to_string(),
            ]);
        }
        if let Some(old) = vol.autodelete_copy {
            if !newly_synced.is_empty() && !newly_synced.contains(&old) {
                remove_copy(vol, old);
            }
        }
    }
    render_table(cmd, table)
}

fn lsvdiskfcmappings(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_volume(cmd.object()?)?;
    let mut table = Table::new(["fc_id", "fc_name"]);
    for fc in sim
        .fc_mappings
        .values()
        .filter(|m| m.source == name || m.target == name)
    {
        table.push([fc.id.to_string(), fc.name.clone()]);
    }
    render_table(cmd, table)
}

/// Reject a volume reference that does not resolve.
pub(crate) fn require_volume(sim: &Simulator, key: &str, code: ErrorCode) -> Result<String> {
    sim.volumes
        .resolve(key)
        .ok_or(Error::Cli(code))
}

#[cfg(test)]
mod tests {
    use crate::inject::FaultTag;
    use crate::response::CliResponse;
    use crate::simulator::Simulator;
    use crate::types::volume_uid;

    fn run(sim: &mut Simulator, line: &str) -> String {
        sim.execute_line(line, true).expect("command").stdout
    }

    fn fail(sim: &mut Simulator, line: &str) -> String {
        let out = sim.execute_line(line, false).expect("raw output");
        assert!(!out.is_success(), "{line} should fail");
        out.stderr
    }

    fn mkvdisk(sim: &mut Simulator, name: &str) -> String {
        run(
            sim,
            &format!("svctask mkvdisk -name {name} -size 1 -unit gb -mdiskgrp \"openstack\" -iogrp 0"),
        )
    }

    fn object(sim: &mut Simulator, line: &str) -> crate::response::Record {
        let out = run(sim, line);
        CliResponse::parse(&out, "!", false)
            .expect("parse")
            .first()
            .cloned()
            .expect("record")
    }

    // ==================== mkvdisk Tests ====================

    #[test]
    fn mkvdisk_reports_id() {
        let mut sim = Simulator::default();
        assert_eq!(mkvdisk(&mut sim, "v1"), "Virtual Disk, id [0], successfully created");
        assert_eq!(mkvdisk(&mut sim, "v2"), "Virtual Disk, id [1], successfully created");
    }

    #[test]
    fn mkvdisk_then_lsvdisk_reports_bytes_and_pool() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        let record = object(&mut sim, "svcinfo lsvdisk -delim ! -obj v1");
        assert_eq!(record.get("capacity"), Some("1073741824"));
        assert_eq!(record.get("mdisk_grp_name"), Some("openstack"));
        assert_eq!(record.get("vdisk_UID"), Some(volume_uid(0).as_str()));
    }

    #[test]
    fn mkvdisk_requires_parameters() {
        let mut sim = Simulator::default();
        let err = fail(&mut sim, "mkvdisk -name v1 -size 1 -unit gb -iogrp 0");
        assert!(err.starts_with("CMMVC5707E"));
        let err = fail(&mut sim, "mkvdisk -name v1 -mdiskgrp openstack -unit gb -iogrp 0");
        assert!(err.starts_with("CMMVC5707E"));
    }

    #[test]
    fn mkvdisk_rejects_duplicates_and_bad_names() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        let err = fail(&mut sim, "mkvdisk -name v1 -size 1 -unit gb -mdiskgrp openstack -iogrp 0");
        assert!(err.starts_with("CMMVC6035E"));
        let err = fail(&mut sim, "mkvdisk -name 9v -size 1 -unit gb -mdiskgrp openstack -iogrp 0");
        assert!(err.starts_with("CMMVC6527E"));
        let err = fail(&mut sim, "mkvdisk -name v2 -size 1 -unit gb -mdiskgrp nopool -iogrp 0");
        assert!(err.starts_with("CMMVC5754E"));
        assert_eq!(sim.volumes().len(), 1);
    }

    #[test]
    fn mkvdisk_mirrored_across_pools() {
        let mut sim = Simulator::default();
        run(
            &mut sim,
            "mkvdisk -name m1 -size 2 -unit gb -mdiskgrp \"openstack:openstack1\" -copies 2 -iogrp 0",
        );
        let vol = sim.volumes().get("m1").expect("volume");
        assert_eq!(vol.copies.len(), 2);
        assert_eq!(vol.primary_copy().map(|c| c.pool.as_str()), Some("openstack"));
        let record = object(&mut sim, "lsvdisk -delim ! m1");
        assert_eq!(record.get("mdisk_grp_name"), Some("many"));
        assert_eq!(record.field("copy_id").map(|f| f.all()), Some(vec!["0", "1"]));
    }

    #[test]
    fn mkvdisk_thin_and_compressed() {
        let mut sim = Simulator::default();
        run(
            &mut sim,
            "mkvdisk -name t1 -size 1 -unit gb -mdiskgrp openstack -iogrp 0 -rsize 2% -autoexpand -warning 80% -grainsize 256",
        );
        let record = object(&mut sim, "lsvdisk -delim ! t1");
        assert_eq!(record.get("se_copy_count"), Some("1"));
        assert_eq!(record.get("autoexpand"), Some("on"));
        assert_eq!(record.get("real_capacity"), Some("21474836"));

        sim.error_injection("mkvdisk", FaultTag::NoCompression);
        let err = fail(
            &mut sim,
            "mkvdisk -name c1 -size 1 -unit gb -mdiskgrp openstack -iogrp 0 -rsize 2 -compressed",
        );
        assert!(err.starts_with("CMMVC7050E"));
        run(
            &mut sim,
            "mkvdisk -name c1 -size 1 -unit gb -mdiskgrp openstack -iogrp 0 -rsize 2 -compressed",
        );
        let record = object(&mut sim, "lsvdisk -delim ! c1");
        assert_eq!(record.get("compressed_copy"), Some("yes"));
    }

    #[test]
    fn mkvdisk_bad_id_still_creates() {
        let mut sim = Simulator::default();
        sim.error_injection("mkvdisk", FaultTag::BadId);
        let out = mkvdisk(&mut sim, "v1");
        assert_eq!(out, "Virtual Disk, id [x0], successfully created");
        assert!(sim.volumes().contains("v1"));
    }

    #[test]
    fn ids_are_reused() {
        let mut sim = Simulator::default();
        for name in ["a", "b", "c"] {
            mkvdisk(&mut sim, name);
        }
        run(&mut sim, "rmvdisk b");
        assert_eq!(mkvdisk(&mut sim, "d"), "Virtual Disk, id [1], successfully created");
    }

    // ==================== rmvdisk Tests ====================

    #[test]
    fn rmvdisk_errors() {
        let mut sim = Simulator::default();
        assert!(fail(&mut sim, "rmvdisk").starts_with("CMMVC5701E"));
        assert!(fail(&mut sim, "rmvdisk ghost").starts_with("CMMVC5753E"));
    }

    #[test]
    fn rmvdisk_mapped_needs_force() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.x");
        run(&mut sim, "mkvdiskhostmap -obj v1 -host h1");
        assert!(fail(&mut sim, "rmvdisk -obj v1").starts_with("CMMVC5840E"));
        assert!(sim.volumes().contains("v1"));
        run(&mut sim, "rmvdisk -force v1");
        assert!(!sim.volumes().contains("v1"));
        assert!(sim.host_mappings().is_empty());
    }

    #[test]
    fn rmvdisk_flashcopy_source_needs_force() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        mkvdisk(&mut sim, "v2");
        run(&mut sim, "mkfcmap -source v1 -target v2");
        assert!(fail(&mut sim, "rmvdisk v2").starts_with("CMMVC5840E"));
        run(&mut sim, "rmvdisk -force v2");
        assert!(sim.fc_mappings().is_empty());
        run(&mut sim, "rmvdisk v1");
    }

    // ==================== lsvdisk Tests ====================

    #[test]
    fn listing_honors_bytes_and_filter() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        mkvdisk(&mut sim, "v2");
        let out = run(&mut sim, "lsvdisk -delim ! -filtervalue name=v2");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.len(), 1);
        assert_eq!(resp.records()[0].get("capacity"), Some("1024MB"));

        let out = run(&mut sim, "lsvdisk -bytes -delim ! -nohdr");
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("!1073741824!"));
    }

    #[test]
    fn missing_volume_is_5754() {
        let mut sim = Simulator::default();
        assert!(fail(&mut sim, "lsvdisk -obj nope").starts_with("CMMVC5754E"));
    }

    #[test]
    fn preferred_node_faults() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        sim.error_injection("lsvdisk", FaultTag::BlankPrefNode);
        let record = object(&mut sim, "lsvdisk -delim ! v1");
        assert_eq!(record.get("preferred_node_id"), Some(""));

        sim.error_injection("lsvdisk", FaultTag::NoPrefNode);
        let record = object(&mut sim, "lsvdisk -delim ! v1");
        assert_eq!(record.get("preferred_node_id"), None);

        let record = object(&mut sim, "lsvdisk -delim ! v1");
        assert_eq!(record.get("preferred_node_id"), Some("1"));
    }

    // ==================== chvdisk Tests ====================

    #[test]
    fn rename_updates_references() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        mkvdisk(&mut sim, "v2");
        run(&mut sim, "mkhost -name h1 -hbawwpn AABBCCDD00112233");
        run(&mut sim, "mkvdiskhostmap -host h1 v1");
        run(&mut sim, "mkfcmap -source v1 -target v2");
        run(&mut sim, "chvdisk -name renamed v1");

        assert!(sim.volumes().contains("renamed"));
        assert_eq!(sim.volumes().names(), ["renamed", "v2"]);
        assert!(sim.host_mappings().values().all(|m| m.volume == "renamed"));
        assert!(sim.fc_mappings().values().all(|m| m.source == "renamed"));
        assert!(fail(&mut sim, "chvdisk -name v2 renamed").starts_with("CMMVC6035E"));
    }

    #[test]
    fn chvdisk_switches_primary() {
        let mut sim = Simulator::default();
        run(
            &mut sim,
            "mkvdisk -name m1 -size 1 -unit gb -mdiskgrp openstack:openstack1 -iogrp 0",
        );
        run(&mut sim, "chvdisk -primary 1 m1");
        let vol = sim.volumes().get("m1").expect("volume");
        assert_eq!(vol.primary_copy().map(|c| c.id), Some(1));
        assert!(fail(&mut sim, "chvdisk -primary 5 m1").starts_with("CMMVC6353E"));
    }

    #[test]
    fn expand_and_migrate() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        run(&mut sim, "expandvdisksize -size 1 -unit gb v1");
        assert_eq!(sim.volumes().get("v1").map(|v| v.capacity), Some(2 * 1_073_741_824));

        run(&mut sim, "migratevdisk -mdiskgrp openstack2 -vdisk v1");
        assert_eq!(sim.volumes().get("v1").map(|v| v.pool_name()), Some("openstack2"));
        assert!(fail(&mut sim, "migratevdisk -mdiskgrp nope -vdisk v1").starts_with("CMMVC5754E"));
    }

    // ==================== Copy Tests ====================

    #[test]
    fn add_copy_syncs_and_autodeletes() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        let out = run(&mut sim, "addvdiskcopy -mdiskgrp openstack1 -autodelete v1");
        assert_eq!(out, "Vdisk [0] copy [1] successfully created");
        assert!(fail(&mut sim, "addvdiskcopy -mdiskgrp openstack2 v1").starts_with("CMMVC6065E"));

        let out = run(&mut sim, "lsvdisksyncprogress -delim ! v1");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.select(&["copy_id", "progress"]), vec![
            vec!["0".to_string(), "100".to_string()],
            vec!["1".to_string(), "50".to_string()],
        ]);

        let vol = sim.volumes().get("v1").expect("volume");
        assert_eq!(vol.copies.len(), 1);
        assert_eq!(vol.primary_copy().map(|c| c.pool.as_str()), Some("openstack1"));
    }

    #[test]
    fn add_copy_in_same_pool_is_rejected() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        assert!(fail(&mut sim, "addvdiskcopy -mdiskgrp openstack v1").starts_with("CMMVC6430E"));
    }

    #[test]
    fn sync_progress_without_autodelete_keeps_both() {
        let mut sim = Simulator::default();
        mkvdisk(&mut sim, "v1");
        run(&mut sim, "addvdiskcopy -mdiskgrp openstack1 v1");
        run(&mut sim, "lsvdisksyncprogress v1");
        let out = run(&mut sim, "lsvdisksyncprogress -delim ! -copy 1 v1");
        assert!(out.ends_with("!1!100!"));

        let out = run(&mut sim, "lsvdiskcopy -delim ! v1");
        assert_eq!(CliResponse::parse(&out, "!", true).expect("parse").len(), 2);

        run(&mut sim, "rmvdiskcopy -copy 0 v1");
        let vol = sim.volumes().get("v1").expect("volume");
        assert_eq!(vol.copies.len(), 1);
        assert!(vol.copies.values().all(|c| c.primary));
        assert!(fail(&mut sim, "rmvdiskcopy -copy 1 v1").starts_with("CMMVC6065E"));
        assert!(fail(&mut sim, "rmvdiskcopy -copy 7 v1").starts_with("CMMVC6353E"));
    }

    #[test]
    fn fcmappings_of_volume() {
        let mut sim = Simulator::default();
        for name in ["a", "b", "c"] {
            mkvdisk(&mut sim, name);
        }
        run(&mut sim, "mkfcmap -source a -target b");
        run(&mut sim, "mkfcmap -source a -target c");
        let out = run(&mut sim, "lsvdiskfcmappings -delim ! a");
        assert_eq!(CliResponse::parse(&out, "!", true).expect("parse").len(), 2);
        let record = object(&mut sim, "lsvdisk -delim ! a");
        assert_eq!(record.get("FC_id"), Some("many"));
        assert_eq!(record.get("fc_map_count"), Some("2"));
    }
}
