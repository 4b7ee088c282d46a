//! Remote-copy relationships and consistency groups.

use std::str::FromStr;

use tracing::{debug, info};

use super::{Handler, created, is_valid_name, parse_num, render_object, render_table};
use crate::command::Command;
use crate::error::{Error, ErrorCode, Result};
use crate::format::{ObjectView, Table};
use crate::inject::FaultTag;
use crate::simulator::Simulator;
use crate::state::{Event, Progress, RcGroupState, RcState, rc_step, transition};
use crate::types::{ClusterRef, CopyType, CyclingMode, Primary, RcConsistGrp, RcLink, RcMode, RcRelationship};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("mkrcrelationship", mkrcrelationship),
    ("startrcrelationship", startrcrelationship),
    ("stoprcrelationship", stoprcrelationship),
    ("switchrcrelationship", switchrcrelationship),
    ("chrcrelationship", chrcrelationship),
    ("rmrcrelationship", rmrcrelationship),
    ("lsrcrelationship", lsrcrelationship),
    ("mkrcconsistgrp", mkrcconsistgrp),
    ("startrcconsistgrp", startrcconsistgrp),
    ("stoprcconsistgrp", stoprcconsistgrp),
    ("switchrcconsistgrp", switchrcconsistgrp),
    ("chrcconsistgrp", chrcconsistgrp),
    ("rmrcconsistgrp", rmrcconsistgrp),
    ("lsrcconsistgrp", lsrcconsistgrp),
];

/// A relationship about to be created.
#[derive(Debug, Clone)]
pub(crate) struct RcSpec {
    pub(crate) name: Option<String>,
    pub(crate) master: String,
    pub(crate) aux: String,
    pub(crate) aux_cluster: ClusterRef,
    pub(crate) mode: RcMode,
    pub(crate) state: RcState,
    pub(crate) progress: Progress,
}

fn parse_primary(cmd: &Command) -> Result<Option<Primary>> {
    cmd.value("primary")
        .map(|p| {
            Primary::from_str(p).map_err(|_| Error::invalid_input(format!("primary must be master or aux, got {p}")))
        })
        .transpose()
}

fn parse_cycling_mode(cmd: &Command) -> Result<Option<CyclingMode>> {
    cmd.value("cyclingmode")
        .map(|m| {
            CyclingMode::from_str(m)
                .map_err(|_| Error::invalid_input(format!("cycling mode must be none or multi, got {m}")))
        })
        .transpose()
}

fn stop_event(cmd: &Command) -> Event {
    if cmd.has("access") {
        Event::StopAccess
    } else {
        Event::Stop
    }
}

/// Copy direction after an event: cleared while idling, otherwise the
/// requested side, else unchanged (master when unset).
fn next_primary(state: RcState, current: Option<Primary>, requested: Option<Primary>) -> Option<Primary> {
    if state == RcState::Idling {
        None
    } else {
        requested.or(current).or(Some(Primary::Master))
    }
}

impl Simulator {
    /// `rcrel<n>` for the first `n >= id` no relationship is named after.
    fn free_rc_name(&self, id: u32) -> String {
        (id..)
            .map(|n| format!("rcrel{n}"))
            .find(|name| !self.rc_relationships.contains(name))
            .unwrap_or_default()
    }

    /// Create a relationship and point both volumes at it.
    pub(crate) fn create_rc_relationship(&mut self, spec: RcSpec) -> Result<(u32, String)> {
        let id = self.rc_relationships.next_id();
        let name = spec.name.unwrap_or_else(|| self.free_rc_name(id));
        if !is_valid_name(&name) {
            return Err(ErrorCode::Cmmvc6527e.into());
        }
        if self.rc_relationships.contains(&name) {
            return Err(ErrorCode::Cmmvc6035e.into());
        }
        for volume in [&spec.master, &spec.aux] {
            if let Some(vol) = self.volumes.get_mut(volume) {
                vol.rc = Some(RcLink {
                    id,
                    name: name.clone(),
                });
            }
        }
        info!(relationship = %name, id, master = %spec.master, aux = %spec.aux, copy_type = %spec.mode.copy_type, "created remote copy relationship");
        self.rc_relationships.insert(RcRelationship {
            id,
            name: name.clone(),
            master_cluster: self.local_cluster(),
            master_vdisk: spec.master,
            aux_cluster: spec.aux_cluster,
            aux_vdisk: spec.aux,
            primary: Some(Primary::Master),
            state: spec.state,
            progress: spec.progress,
            mode: spec.mode,
            master_change_vdisk: None,
            aux_change_vdisk: None,
            group: None,
        });
        Ok((id, name))
    }

    /// Remove a relationship, clearing the volume back-pointers and
    /// leaving its group empty if it was the last member.
    pub(crate) fn drop_rc_relationship(&mut self, name: &str) {
        let Some(rc) = self.rc_relationships.remove(name) else {
            return;
        };
        for volume in [&rc.master_vdisk, &rc.aux_vdisk] {
            if let Some(vol) = self.volumes.get_mut(volume) {
                if vol.rc.as_ref().is_some_and(|link| link.name == rc.name) {
                    vol.rc = None;
                }
            }
        }
        self.leave_rc_group(&rc);
        info!(relationship = %name, "deleted remote copy relationship");
    }

    fn leave_rc_group(&mut self, rc: &RcRelationship) {
        if let Some(group) = rc.group.as_deref().and_then(|g| self.rc_groups.get_mut(g)) {
            group.members.remove(&rc.id);
            if group.members.is_empty() {
                group.state = RcGroupState::Empty;
            }
        }
    }

    fn resolve_rc(&self, key: &str) -> Result<String> {
        self.rc_relationships
            .resolve(key)
            .ok_or_else(|| ErrorCode::Cmmvc5753e.into())
    }

    fn resolve_rc_group(&self, key: &str) -> Result<String> {
        self.rc_groups
            .resolve(key)
            .ok_or_else(|| ErrorCode::Cmmvc5753e.into())
    }

    /// Apply one event to a relationship, all or nothing.
    fn rc_event(&mut self, name: &str, event: Event, primary: Option<Primary>) -> Result<()> {
        let Some(rc) = self.rc_relationships.get_mut(name) else {
            return Err(ErrorCode::Cmmvc5753e.into());
        };
        let (state, progress) = rc_step(rc.state, rc.progress, rc.mode.uses_change_volumes(), event)?;
        debug!(relationship = %name, from = %rc.state, to = %state, progress, "remote copy transition");
        rc.state = state;
        rc.progress = progress;
        rc.primary = next_primary(state, rc.primary, primary);
        if state == RcState::End {
            self.drop_rc_relationship(name);
        }
        Ok(())
    }

    /// Poll a relationship; `drain` keeps stepping until nothing changes.
    fn rc_wait(&mut self, name: &str, drain: bool) {
        let Some(rc) = self.rc_relationships.get_mut(name) else {
            return;
        };
        while let Ok(next) =
            rc_step(rc.state, rc.progress, rc.mode.uses_change_volumes(), Event::Wait)
        {
            let changed = next != (rc.state, rc.progress);
            (rc.state, rc.progress) = next;
            if !drain || !changed {
                break;
            }
        }
    }

    /// Apply an event to every member of a group. Members the table
    /// rejects keep their state.
    fn rc_cascade(&mut self, group: &str, event: Event, primary: Option<Primary>) {
        let members: Vec<String> = self
            .rc_groups
            .get(group)
            .map(|g| g.members.values().cloned().collect())
            .unwrap_or_default();
        for name in members {
            let Some(rc) = self.rc_relationships.get_mut(&name) else {
                continue;
            };
            if let Ok((state, progress)) =
                rc_step(rc.state, rc.progress, rc.mode.uses_change_volumes(), event)
            {
                rc.state = state;
                rc.progress = progress;
                rc.primary = next_primary(state, rc.primary, primary);
            }
        }
    }

    fn rc_group_event(&mut self, name: &str, event: Event, primary: Option<Primary>) -> Result<()> {
        let Some(group) = self.rc_groups.get_mut(name) else {
            return Err(ErrorCode::Cmmvc5753e.into());
        };
        let state = transition(group.state, event)?;
        debug!(group = %name, from = %group.state, to = %state, "remote copy group transition");
        group.state = state;
        group.primary = match state.as_relationship() {
            Some(rc_state) => next_primary(rc_state, group.primary, primary),
            None => group.primary,
        };
        self.rc_cascade(name, event, primary);
        Ok(())
    }

    /// Poll a group: an initial copy finishes in one step and the members
    /// follow the group.
    fn rc_group_wait(&mut self, name: &str) {
        let Some(group) = self.rc_groups.get_mut(name) else {
            return;
        };
        if group.state != RcGroupState::InconsistentCopying {
            return;
        }
        let state = if group.mode.uses_change_volumes() {
            RcState::ConsistentCopying
        } else {
            RcState::ConsistentSynchronized
        };
        group.state = state.into();
        let members: Vec<String> = group.members.values().cloned().collect();
        for member in members {
            if let Some(rc) = self.rc_relationships.get_mut(&member) {
                rc.state = state;
                rc.progress = 100;
            }
        }
    }

    fn rc_view(&self, rc: &RcRelationship) -> Vec<(&'static str, String)> {
        let volume_id = |name: &str| {
            self.volumes
                .get(name)
                .map(|v| v.id.to_string())
                .unwrap_or_default()
        };
        let group_id = rc
            .group
            .as_deref()
            .and_then(|g| self.rc_groups.get(g))
            .map(|g| g.id.to_string())
            .unwrap_or_default();
        let change = |v: &Option<String>| {
            v.as_deref()
                .map(|n| (volume_id(n), n.to_string()))
                .unwrap_or_default()
        };
        let (master_change_id, master_change_name) = change(&rc.master_change_vdisk);
        let (aux_change_id, aux_change_name) = change(&rc.aux_change_vdisk);
        vec![
            ("id", rc.id.to_string()),
            ("name", rc.name.clone()),
            ("master_cluster_id", rc.master_cluster.id.clone()),
            ("master_cluster_name", rc.master_cluster.name.clone()),
            ("master_vdisk_id", volume_id(&rc.master_vdisk)),
            ("master_vdisk_name", rc.master_vdisk.clone()),
            ("aux_cluster_id", rc.aux_cluster.id.clone()),
            ("aux_cluster_name", rc.aux_cluster.name.clone()),
            ("aux_vdisk_id", volume_id(&rc.aux_vdisk)),
            ("aux_vdisk_name", rc.aux_vdisk.clone()),
            ("primary", rc.primary.map(|p| p.to_string()).unwrap_or_default()),
            ("consistency_group_id", group_id),
            ("consistency_group_name", rc.group.clone().unwrap_or_default()),
            ("state", rc.state.to_string()),
            ("bg_copy_priority", "50".to_string()),
            ("progress", rc.progress.to_string()),
            ("freeze_time", String::new()),
            ("status", "online".to_string()),
            ("sync", String::new()),
            ("copy_type", rc.mode.copy_type.to_string()),
            ("cycling_mode", rc.mode.cycling_mode.to_string()),
            ("cycle_period_seconds", rc.mode.cycle_period_seconds.to_string()),
            ("master_change_vdisk_id", master_change_id),
            ("master_change_vdisk_name", master_change_name),
            ("aux_change_vdisk_id", aux_change_id),
            ("aux_change_vdisk_name", aux_change_name),
        ]
    }

    fn rc_group_view(&self, group: &RcConsistGrp) -> Vec<(&'static str, String)> {
        vec![
            ("id", group.id.to_string()),
            ("name", group.name.clone()),
            ("master_cluster_id", group.master_cluster.id.clone()),
            ("master_cluster_name", group.master_cluster.name.clone()),
            ("aux_cluster_id", group.aux_cluster.id.clone()),
            ("aux_cluster_name", group.aux_cluster.name.clone()),
            ("primary", group.primary.map(|p| p.to_string()).unwrap_or_default()),
            ("state", group.state.to_string()),
            ("relationship_count", group.members.len().to_string()),
            ("copy_type", group.mode.copy_type.to_string()),
            ("cycling_mode", group.mode.cycling_mode.to_string()),
            ("freeze_time", String::new()),
        ]
    }
}

fn mkrcrelationship(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let master = cmd.require("master", ErrorCode::Cmmvc5707e)?;
    let aux = cmd.require("aux", ErrorCode::Cmmvc5707e)?;
    let cluster = cmd.require("cluster", ErrorCode::Cmmvc5707e)?;

    let master = sim.volumes.resolve(master).ok_or(ErrorCode::Cmmvc5754e)?;
    let aux = sim.volumes.resolve(aux).ok_or(ErrorCode::Cmmvc5754e)?;
    let aux_cluster = sim.find_cluster(cluster).ok_or(ErrorCode::Cmmvc5804e)?;

    let (Some(master_vol), Some(aux_vol)) = (sim.volumes.get(&master), sim.volumes.get(&aux)) else {
        return Err(ErrorCode::Cmmvc5754e.into());
    };
    if master_vol.rc.is_some() || aux_vol.rc.is_some() {
        return Err(ErrorCode::Cmmvc5753e.into());
    }
    if master_vol.capacity != aux_vol.capacity {
        return Err(ErrorCode::Cmmvc5912e.into());
    }

    let mut mode = RcMode::default();
    if cmd.has("global") {
        mode.copy_type = CopyType::Global;
    }
    if let Some(cycling) = parse_cycling_mode(cmd)? {
        mode.cycling_mode = cycling;
    }
    let (state, progress) = if cmd.has("sync") {
        (RcState::ConsistentStopped, 100)
    } else {
        (RcState::InconsistentStopped, 0)
    };

    let (id, _) = sim.create_rc_relationship(RcSpec {
        name: cmd.unquoted("name").map(str::to_string),
        master,
        aux,
        aux_cluster,
        mode,
        state,
        progress,
    })?;
    Ok(created("RC Relationship", id))
}

fn startrcrelationship(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc(cmd.object()?)?;
    let primary = parse_primary(cmd)?;
    sim.rc_event(&name, Event::Start, primary)?;
    Ok(String::new())
}

fn stoprcrelationship(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc(cmd.object()?)?;
    sim.rc_event(&name, stop_event(cmd), None)?;
    Ok(String::new())
}

fn switchrcrelationship(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc(cmd.object()?)?;
    let primary = parse_primary(cmd)?.ok_or(ErrorCode::Cmmvc5963e)?;
    let Some(rc) = sim.rc_relationships.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if !rc.state.is_consistent() {
        return Err(ErrorCode::Cmmvc5982e.into());
    }
    rc.primary = Some(primary);
    info!(relationship = %name, %primary, "switched copy direction");
    Ok(String::new())
}

fn chrcrelationship(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc(cmd.object()?)?;
    let change_volume = |flag: &str| -> Result<Option<String>> {
        cmd.unquoted(flag)
            .map(|v| sim.volumes.resolve(v).ok_or_else(|| ErrorCode::Cmmvc5754e.into()))
            .transpose()
    };
    let master_change = change_volume("masterchange")?;
    let aux_change = change_volume("auxchange")?;
    let cycling_mode = parse_cycling_mode(cmd)?;
    let cycle_period: Option<u32> = cmd
        .value("cycleperiodseconds")
        .map(|v| parse_num(v, ErrorCode::Cmmvc5707e))
        .transpose()?;
    let new_name = cmd.unquoted("name");
    if let Some(new) = new_name {
        if !is_valid_name(new) {
            return Err(ErrorCode::Cmmvc6527e.into());
        }
        if new != name && sim.rc_relationships.contains(new) {
            return Err(ErrorCode::Cmmvc6035e.into());
        }
    }
    let group = cmd
        .unquoted("consistgrp")
        .map(|g| sim.rc_groups.resolve(g).ok_or(ErrorCode::Cmmvc5754e))
        .transpose()?;

    let Some(rc) = sim.rc_relationships.get(&name).cloned() else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if let Some(group) = group.as_deref().and_then(|g| sim.rc_groups.get(g)) {
        if group.state != RcGroupState::Empty
            && (group.state != RcGroupState::from(rc.state) || group.mode.copy_type != rc.mode.copy_type)
        {
            return Err(ErrorCode::Cmmvc5982e.into());
        }
    }

    if let Some(rc) = sim.rc_relationships.get_mut(&name) {
        if let Some(v) = master_change {
            rc.master_change_vdisk = Some(v);
        }
        if cmd.has("nomasterchange") {
            rc.master_change_vdisk = None;
        }
        if let Some(v) = aux_change {
            rc.aux_change_vdisk = Some(v);
        }
        if cmd.has("noauxchange") {
            rc.aux_change_vdisk = None;
        }
        if let Some(mode) = cycling_mode {
            rc.mode.cycling_mode = mode;
        }
        if let Some(period) = cycle_period {
            rc.mode.cycle_period_seconds = period;
        }
    }

    if group.is_some() || cmd.has("noconsistgrp") {
        sim.leave_rc_group(&rc);
        if let Some(member) = sim.rc_relationships.get_mut(&name) {
            member.group = None;
        }
    }
    if let Some(group_name) = group {
        if let Some(member) = sim.rc_relationships.get_mut(&name) {
            member.group = Some(group_name.clone());
        }
        if let Some(group) = sim.rc_groups.get_mut(&group_name) {
            if group.state == RcGroupState::Empty {
                group.state = rc.state.into();
                group.mode = rc.mode;
                group.primary = rc.primary;
            }
            group.members.insert(rc.id, name.clone());
        }
    }

    if let Some(new) = new_name {
        if sim.rc_relationships.rename(&name, new) {
            rename_rc_references(sim, &rc, new);
        }
    }
    Ok(String::new())
}

fn rename_rc_references(sim: &mut Simulator, rc: &RcRelationship, new: &str) {
    for volume in [&rc.master_vdisk, &rc.aux_vdisk] {
        if let Some(link) = sim.volumes.get_mut(volume).and_then(|v| v.rc.as_mut()) {
            link.name = new.to_string();
        }
    }
    let group = sim
        .rc_relationships
        .get(new)
        .and_then(|r| r.group.clone());
    if let Some(group) = group.as_deref().and_then(|g| sim.rc_groups.get_mut(g)) {
        group.members.insert(rc.id, new.to_string());
    }
}

fn rmrcrelationship(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc(cmd.object()?)?;
    let event = if cmd.has("force") {
        Event::DeleteForce
    } else {
        Event::Delete
    };
    sim.rc_event(&name, event, None)?;
    Ok(String::new())
}

fn lsrcrelationship(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let drain = fault == Some(FaultTag::SpeedUp);
    if let Some(key) = cmd.object_opt() {
        let name = sim.rc_relationships.resolve(key).ok_or(ErrorCode::Cmmvc5754e)?;
        sim.rc_wait(&name, drain);
        let rc = sim.rc_relationships.get(&name).ok_or(ErrorCode::Cmmvc5754e)?;
        let mut view = ObjectView::new();
        for (field, value) in sim.rc_view(rc) {
            view.push(field, value);
        }
        return Ok(render_object(cmd, &view));
    }

    for name in sim.rc_relationships.names() {
        sim.rc_wait(&name, drain);
    }
    let mut table = Table::new(LSRCRELATIONSHIP_HEADER);
    for rc in sim.rc_relationships.values() {
        table.push(sim.rc_view(rc).into_iter().map(|(_, value)| value));
    }
    render_table(cmd, table)
}

const LSRCRELATIONSHIP_HEADER: [&str; 26] = [
    "id",
    "name",
    "master_cluster_id",
    "master_cluster_name",
    "master_vdisk_id",
    "master_vdisk_name",
    "aux_cluster_id",
    "aux_cluster_name",
    "aux_vdisk_id",
    "aux_vdisk_name",
    "primary",
    "consistency_group_id",
    "consistency_group_name",
    "state",
    "bg_copy_priority",
    "progress",
    "freeze_time",
    "status",
    "sync",
    "copy_type",
    "cycling_mode",
    "cycle_period_seconds",
    "master_change_vdisk_id",
    "master_change_vdisk_name",
    "aux_change_vdisk_id",
    "aux_change_vdisk_name",
];

fn mkrcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let cluster = cmd.require("cluster", ErrorCode::Cmmvc5707e)?;
    let aux_cluster = sim.find_cluster(cluster).ok_or(ErrorCode::Cmmvc5804e)?;
    let id = sim.rc_groups.next_id();
    let name = cmd
        .unquoted("name")
        .map_or_else(|| format!("rccstgrp{id}"), str::to_string);
    if !is_valid_name(&name) {
        return Err(ErrorCode::Cmmvc6527e.into());
    }
    if sim.rc_groups.contains(&name) {
        return Err(ErrorCode::Cmmvc6035e.into());
    }
    info!(group = %name, id, "created remote copy consistency group");
    let master_cluster = sim.local_cluster();
    sim.rc_groups.insert(RcConsistGrp {
        id,
        name,
        master_cluster,
        aux_cluster,
        primary: None,
        state: RcGroupState::Empty,
        mode: RcMode::default(),
        members: Default::default(),
    });
    Ok(created("RC Consistency Group", id))
}

fn startrcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc_group(cmd.object()?)?;
    let primary = parse_primary(cmd)?;
    sim.rc_group_event(&name, Event::Start, primary)?;
    Ok(String::new())
}

fn stoprcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc_group(cmd.object()?)?;
    sim.rc_group_event(&name, stop_event(cmd), None)?;
    Ok(String::new())
}

fn switchrcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc_group(cmd.object()?)?;
    let primary = parse_primary(cmd)?.ok_or(ErrorCode::Cmmvc5963e)?;
    let Some(group) = sim.rc_groups.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if !group.state.as_relationship().is_some_and(RcState::is_consistent) {
        return Err(ErrorCode::Cmmvc5982e.into());
    }
    group.primary = Some(primary);
    let members: Vec<String> = group.members.values().cloned().collect();
    for member in members {
        if let Some(rc) = sim.rc_relationships.get_mut(&member) {
            rc.primary = Some(primary);
        }
    }
    info!(group = %name, %primary, "switched group copy direction");
    Ok(String::new())
}

fn chrcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc_group(cmd.object()?)?;
    let cycling_mode = parse_cycling_mode(cmd)?;
    let cycle_period: Option<u32> = cmd
        .value("cycleperiodseconds")
        .map(|v| parse_num(v, ErrorCode::Cmmvc5707e))
        .transpose()?;
    let new_name = cmd.unquoted("name");
    if let Some(new) = new_name {
        if !is_valid_name(new) {
            return Err(ErrorCode::Cmmvc6527e.into());
        }
        if new != name && sim.rc_groups.contains(new) {
            return Err(ErrorCode::Cmmvc6035e.into());
        }
    }

    let Some(group) = sim.rc_groups.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if let Some(mode) = cycling_mode {
        group.mode.cycling_mode = mode;
    }
    if let Some(period) = cycle_period {
        group.mode.cycle_period_seconds = period;
    }
    let members: Vec<String> = group.members.values().cloned().collect();
    for member in &members {
        if let Some(rc) = sim.rc_relationships.get_mut(member) {
            if let Some(mode) = cycling_mode {
                rc.mode.cycling_mode = mode;
            }
            if let Some(period) = cycle_period {
                rc.mode.cycle_period_seconds = period;
            }
        }
    }
    if let Some(new) = new_name {
        if sim.rc_groups.rename(&name, new) {
            for member in &members {
                if let Some(rc) = sim.rc_relationships.get_mut(member) {
                    rc.group = Some(new.to_string());
                }
            }
        }
    }
    Ok(String::new())
}

fn rmrcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_rc_group(cmd.object()?)?;
    let Some(group) = sim.rc_groups.get(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if !group.members.is_empty() {
        let event = if cmd.has("force") {
            Event::DeleteForce
        } else {
            Event::Delete
        };
        transition(group.state, event)?;
    }
    if let Some(group) = sim.rc_groups.remove(&name) {
        for member in group.members.values() {
            if let Some(rc) = sim.rc_relationships.get_mut(member) {
                rc.group = None;
            }
        }
    }
    info!(group = %name, "deleted remote copy consistency group");
    Ok(String::new())
}

fn lsrcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    if let Some(key) = cmd.object_opt() {
        let name = sim.rc_groups.resolve(key).ok_or(ErrorCode::Cmmvc5754e)?;
        sim.rc_group_wait(&name);
        let group = sim.rc_groups.get(&name).ok_or(ErrorCode::Cmmvc5754e)?;
        let mut view = ObjectView::new();
        for (field, value) in sim.rc_group_view(group) {
            view.push(field, value);
        }
        for (id, member) in &group.members {
            view.push("RC_rel_id", id.to_string());
            view.push("RC_rel_name", member);
        }
        return Ok(render_object(cmd, &view));
    }

    for name in sim.rc_groups.names() {
        sim.rc_group_wait(&name);
    }
    let mut table = Table::new([
        "id",
        "name",
        "master_cluster_id",
        "master_cluster_name",
        "aux_cluster_id",
        "aux_cluster_name",
        "primary",
        "state",
        "relationship_count",
        "copy_type",
        "cycling_mode",
        "freeze_time",
    ]);
    for group in sim.rc_groups.values() {
        table.push(sim.rc_group_view(group).into_iter().map(|(_, value)| value));
    }
    render_table(cmd, table)
}
