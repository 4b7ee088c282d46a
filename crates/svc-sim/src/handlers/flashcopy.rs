//! FlashCopy mappings and consistency groups.
//!
//! Mappings and groups only advance when a listing polls them. A poll
//! applies one `wait` event, or, with the `speed_up` fault armed, keeps
//! applying it until nothing changes.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{Handler, created, is_valid_name, parse_num, parse_switch, render_object, render_table};
use crate::command::Command;
use crate::error::{ErrorCode, Result};
use crate::format::{Filter, ObjectView, Table, on_off, yes_no};
use crate::inject::FaultTag;
use crate::simulator::Simulator;
use crate::state::{Event, FcGroupState, FcMapState, Progress, fc_map_step, transition};
use crate::types::{FcConsistGrp, FcMapping};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("mkfcmap", mkfcmap),
    ("prestartfcmap", prestartfcmap),
    ("startfcmap", startfcmap),
    ("stopfcmap", stopfcmap),
    ("rmfcmap", rmfcmap),
    ("chfcmap", chfcmap),
    ("lsfcmap", lsfcmap),
    ("mkfcconsistgrp", mkfcconsistgrp),
    ("prestartfcconsistgrp", prestartfcconsistgrp),
    ("startfcconsistgrp", startfcconsistgrp),
    ("stopfcconsistgrp", stopfcconsistgrp),
    ("rmfcconsistgrp", rmfcconsistgrp),
    ("lsfcconsistgrp", lsfcconsistgrp),
];

const DEFAULT_COPY_RATE: u32 = 50;
const DEFAULT_CLEAN_RATE: u32 = 50;

fn start_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%y%m%d%H%M%S").to_string())
        .unwrap_or_default()
}

/// Events run by `prestart`: flush, then let the flush finish.
fn prepare_events(fault: Option<FaultTag>) -> [Event; 2] {
    if fault == Some(FaultTag::FlushFailed) {
        [Event::Prepare, Event::FlushFailed]
    } else {
        [Event::Prepare, Event::Wait]
    }
}

fn start_events(cmd: &Command) -> &'static [Event] {
    if cmd.has("prep") {
        &[Event::Prepare, Event::Wait, Event::Start]
    } else {
        &[Event::Start]
    }
}

/// Run `events` in order from `(state, progress)`, failing on the first
/// one the table rejects.
fn fc_map_steps(
    mut state: FcMapState,
    mut progress: Progress,
    copy_rate: u32,
    events: &[Event],
) -> Result<(FcMapState, Progress)> {
    for event in events {
        (state, progress) = fc_map_step(state, progress, copy_rate, *event)?;
    }
    Ok((state, progress))
}

impl Simulator {
    /// Remove a mapping, leaving its group empty if it was the last member.
    pub(crate) fn drop_fc_mapping(&mut self, name: &str) {
        let Some(fc) = self.fc_mappings.remove(name) else {
            return;
        };
        if let Some(group) = fc.group.as_deref().and_then(|g| self.fc_groups.get_mut(g)) {
            group.members.remove(&fc.id);
            if group.members.is_empty() {
                group.state = FcGroupState::Empty;
            }
        }
        info!(fcmap = %name, "deleted flashcopy mapping");
    }

    fn resolve_fc_mapping(&self, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
        let key = cmd.object()?;
        if fault == Some(FaultTag::BadId) {
            return Err(ErrorCode::Cmmvc5753e.into());
        }
        self.fc_mappings
            .resolve(key)
            .ok_or_else(|| ErrorCode::Cmmvc5753e.into())
    }

    fn resolve_fc_group(&self, key: &str) -> Result<String> {
        self.fc_groups
            .resolve(key)
            .ok_or_else(|| ErrorCode::Cmmvc5753e.into())
    }

    /// Apply `events` to one mapping, all or nothing.
    fn fc_map_events(&mut self, name: &str, events: &[Event]) -> Result<()> {
        let Some(fc) = self.fc_mappings.get_mut(name) else {
            return Err(ErrorCode::Cmmvc5753e.into());
        };
        let (state, progress) = fc_map_steps(fc.state, fc.progress, fc.copy_rate, events)?;
        debug!(fcmap = %name, from = %fc.state, to = %state, progress, "flashcopy transition");
        fc.state = state;
        fc.progress = progress;
        if events.contains(&Event::Start) {
            fc.start_time = Some(Utc::now());
        }
        if state == FcMapState::End {
            self.drop_fc_mapping(name);
        }
        Ok(())
    }

    /// Poll a mapping. Returns `true` when it autodeleted.
    fn fc_map_wait(&mut self, name: &str, drain: bool) -> bool {
        let Some(fc) = self.fc_mappings.get_mut(name) else {
            return false;
        };
        loop {
            let Ok(next) = fc_map_step(fc.state, fc.progress, fc.copy_rate, Event::Wait) else {
                break;
            };
            let changed = next != (fc.state, fc.progress);
            (fc.state, fc.progress) = next;
            if !drain || !changed {
                break;
            }
        }
        let done = fc.state == FcMapState::IdleOrCopied && fc.autodelete && fc.progress == 100;
        if done || fc.state == FcMapState::End {
            self.drop_fc_mapping(name);
            return true;
        }
        false
    }

    /// Apply `events` to every member of a group. Members the table
    /// rejects stay where they are.
    fn fc_cascade(&mut self, group: &str, events: &[Event]) {
        let members: Vec<String> = self
            .fc_groups
            .get(group)
            .map(|g| g.members.values().cloned().collect())
            .unwrap_or_default();
        for name in members {
            let Some(fc) = self.fc_mappings.get_mut(&name) else {
                continue;
            };
            for event in events {
                match fc_map_step(fc.state, fc.progress, fc.copy_rate, *event) {
                    Ok(next) => {
                        (fc.state, fc.progress) = next;
                        if *event == Event::Start {
                            fc.start_time = Some(Utc::now());
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }

    /// Apply `events` to a group and then, leniently, to its members.
    fn fc_group_events(&mut self, name: &str, events: &[Event]) -> Result<()> {
        let Some(group) = self.fc_groups.get_mut(name) else {
            return Err(ErrorCode::Cmmvc5753e.into());
        };
        let mut state = group.state;
        for event in events {
            state = transition(state, *event)?;
        }
        debug!(group = %name, from = %group.state, to = %state, "flashcopy group transition");
        group.state = state;
        if events.contains(&Event::Start) {
            group.start_time = Some(Utc::now());
        }
        self.fc_cascade(name, events);
        Ok(())
    }

    /// Poll a group. Returns `true` when it autodeleted.
    fn fc_group_wait(&mut self, name: &str) -> bool {
        let Some(state) = self.fc_groups.get(name).map(|g| g.state) else {
            return false;
        };
        if state != FcGroupState::Copying {
            if let Ok(next) = transition(state, Event::Wait) {
                if let Some(group) = self.fc_groups.get_mut(name) {
                    group.state = next;
                }
                self.fc_cascade(name, &[Event::Wait]);
            }
            return false;
        }

        self.fc_cascade(name, &[Event::Wait]);
        let Some(group) = self.fc_groups.get(name) else {
            return false;
        };
        let finished = group.members.values().all(|m| {
            self.fc_mappings
                .get(m)
                .is_none_or(|fc| fc.state == FcMapState::IdleOrCopied)
        });
        if !finished {
            return false;
        }
        if group.autodelete {
            self.remove_fc_group(name);
            return true;
        }
        if let Some(group) = self.fc_groups.get_mut(name) {
            group.state = FcGroupState::IdleOrCopied;
        }
        false
    }

    /// Delete a group; its mappings become standalone.
    fn remove_fc_group(&mut self, name: &str) {
        let Some(group) = self.fc_groups.remove(name) else {
            return;
        };
        for member in group.members.values() {
            if let Some(fc) = self.fc_mappings.get_mut(member) {
                fc.group = None;
            }
        }
        info!(group = %name, "deleted flashcopy consistency group");
    }

    fn fc_row(&self, fc: &FcMapping) -> Vec<String> {
        let volume_id = |name: &str| {
            self.volumes
                .get(name)
                .map(|v| v.id.to_string())
                .unwrap_or_default()
        };
        let group_id = fc
            .group
            .as_deref()
            .and_then(|g| self.fc_groups.get(g))
            .map(|g| g.id.to_string())
            .unwrap_or_default();
        vec![
            fc.id.to_string(),
            fc.name.clone(),
            volume_id(&fc.source),
            fc.source.clone(),
            volume_id(&fc.target),
            fc.target.clone(),
            group_id,
            fc.group.clone().unwrap_or_default(),
            fc.state.to_string(),
            fc.progress.to_string(),
            fc.copy_rate.to_string(),
            "100".to_string(),
            "off".to_string(),
            String::new(),
            String::new(),
            "no".to_string(),
            start_time(fc.start_time),
            yes_no(fc.rc_controlled).to_string(),
        ]
    }
}

fn mkfcmap(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let source = cmd.require("source", ErrorCode::Cmmvc5707e)?;
    let target = cmd.require("target", ErrorCode::Cmmvc5707e)?;
    let source = sim.volumes.resolve(source).ok_or(ErrorCode::Cmmvc5754e)?;
    let target = sim.volumes.resolve(target).ok_or(ErrorCode::Cmmvc5754e)?;
    if source == target {
        return Err(ErrorCode::Cmmvc6303e.into());
    }
    let capacity = |name: &str| sim.volumes.get(name).map(|v| v.capacity);
    if capacity(&source) != capacity(&target) {
        return Err(ErrorCode::Cmmvc5924e.into());
    }

    let copy_rate = cmd
        .value("copyrate")
        .map_or(Ok(DEFAULT_COPY_RATE), |v| parse_num(v, ErrorCode::Cmmvc5707e))?;
    let clean_rate = cmd
        .value("cleanrate")
        .map_or(Ok(DEFAULT_CLEAN_RATE), |v| parse_num(v, ErrorCode::Cmmvc5707e))?;

    let group = match cmd.unquoted("consistgrp") {
        Some(key) => {
            let name = sim.fc_groups.resolve(key).ok_or(ErrorCode::Cmmvc5754e)?;
            let state = sim.fc_groups.get(&name).map(|g| g.state);
            if !matches!(
                state,
                Some(FcGroupState::Empty | FcGroupState::IdleOrCopied | FcGroupState::Stopped)
            ) {
                return Err(ErrorCode::Cmmvc5903e.into());
            }
            Some(name)
        }
        None => None,
    };

    let id = sim.fc_mappings.next_id();
    let name = cmd
        .unquoted("name")
        .map_or_else(|| format!("fcmap{id}"), str::to_string);
    if !is_valid_name(&name) {
        return Err(ErrorCode::Cmmvc6527e.into());
    }
    if sim.fc_mappings.contains(&name) {
        return Err(ErrorCode::Cmmvc6035e.into());
    }
    let state = transition(FcMapState::Begin, Event::Make)?;

    if let Some(group) = group.as_deref().and_then(|g| sim.fc_groups.get_mut(g)) {
        if group.state == FcGroupState::Empty {
            group.state = transition(group.state, Event::Add)?;
        }
        group.members.insert(id, name.clone());
    }
    info!(fcmap = %name, id, source = %source, target = %target, copy_rate, "created flashcopy mapping");
    sim.fc_mappings.insert(FcMapping {
        id,
        name,
        source,
        target,
        copy_rate,
        clean_rate,
        progress: 0,
        autodelete: cmd.has("autodelete"),
        state,
        group,
        rc_controlled: false,
        start_time: None,
    });
    Ok(created("FlashCopy Mapping", id))
}

fn prestartfcmap(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_mapping(cmd, fault)?;
    sim.fc_map_events(&name, &prepare_events(fault))?;
    Ok(String::new())
}

fn startfcmap(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_mapping(cmd, fault)?;
    sim.fc_map_events(&name, start_events(cmd))?;
    Ok(String::new())
}

fn stopfcmap(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_mapping(cmd, fault)?;
    sim.fc_map_events(&name, &[Event::Stop])?;
    Ok(String::new())
}

fn rmfcmap(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_mapping(cmd, fault)?;
    let event = if cmd.has("force") {
        Event::DeleteForce
    } else {
        Event::Delete
    };
    sim.fc_map_events(&name, &[event])?;
    Ok(String::new())
}

fn chfcmap(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_mapping(cmd, fault)?;
    let copy_rate: Option<u32> = cmd
        .value("copyrate")
        .map(|v| parse_num(v, ErrorCode::Cmmvc5707e))
        .transpose()?;
    let clean_rate: Option<u32> = cmd
        .value("cleanrate")
        .map(|v| parse_num(v, ErrorCode::Cmmvc5707e))
        .transpose()?;
    let autodelete = cmd.value("autodelete").map(parse_switch).transpose()?;
    let new_name = cmd.unquoted("name");
    if let Some(new) = new_name {
        if !is_valid_name(new) {
            return Err(ErrorCode::Cmmvc6527e.into());
        }
        if new != name && sim.fc_mappings.contains(new) {
            return Err(ErrorCode::Cmmvc6035e.into());
        }
    }

    let Some(fc) = sim.fc_mappings.get_mut(&name) else {
        return Err(ErrorCode::Cmmvc5753e.into());
    };
    if let Some(rate) = copy_rate {
        fc.copy_rate = rate;
    }
    if let Some(rate) = clean_rate {
        fc.clean_rate = rate;
    }
    if let Some(on) = autodelete {
        fc.autodelete = on;
    }
    let (id, group) = (fc.id, fc.group.clone());
    if let Some(new) = new_name {
        if sim.fc_mappings.rename(&name, new) {
            if let Some(group) = group.as_deref().and_then(|g| sim.fc_groups.get_mut(g)) {
                group.members.insert(id, new.to_string());
            }
        }
    }
    Ok(String::new())
}

const LSFCMAP_HEADER: [&str; 18] = [
    "id",
    "name",
    "source_vdisk_id",
    "source_vdisk_name",
    "target_vdisk_id",
    "target_vdisk_name",
    "group_id",
    "group_name",
    "status",
    "progress",
    "copy_rate",
    "clean_progress",
    "incremental",
    "partner_FC_id",
    "partner_FC_name",
    "restoring",
    "start_time",
    "rc_controlled",
];

fn lsfcmap(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let filter = Filter::from_command(cmd)?;
    let header: Vec<String> = LSFCMAP_HEADER.iter().map(|h| (*h).to_string()).collect();
    let polled: Vec<String> = sim
        .fc_mappings
        .values()
        .filter(|fc| {
            filter
                .as_ref()
                .is_none_or(|f| f.matches(&header, &sim.fc_row(fc)))
        })
        .map(|fc| fc.name.clone())
        .collect();

    let drain = fault == Some(FaultTag::SpeedUp);
    for name in &polled {
        sim.fc_map_wait(name, drain);
    }

    let mut table = Table::new(LSFCMAP_HEADER);
    for fc in sim.fc_mappings.values() {
        table.push(sim.fc_row(fc));
    }
    render_table(cmd, table)
}

fn mkfcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let id = sim.fc_groups.next_id();
    let name = cmd
        .unquoted("name")
        .map_or_else(|| format!("fccstgrp{id}"), str::to_string);
    if !is_valid_name(&name) {
        return Err(ErrorCode::Cmmvc6527e.into());
    }
    if sim.fc_groups.contains(&name) {
        return Err(ErrorCode::Cmmvc6035e.into());
    }
    let state = transition(FcGroupState::Begin, Event::Make)?;
    info!(group = %name, id, "created flashcopy consistency group");
    sim.fc_groups.insert(FcConsistGrp {
        id,
        name,
        autodelete: cmd.has("autodelete"),
        state,
        start_time: None,
        members: Default::default(),
    });
    Ok(created("FlashCopy Consistency Group", id))
}

fn prestartfcconsistgrp(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_group(cmd.object()?)?;
    sim.fc_group_events(&name, &prepare_events(fault))?;
    Ok(String::new())
}

fn startfcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_group(cmd.object()?)?;
    sim.fc_group_events(&name, start_events(cmd))?;
    Ok(String::new())
}

fn stopfcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_group(cmd.object()?)?;
    sim.fc_group_events(&name, &[Event::Stop])?;
    Ok(String::new())
}

fn rmfcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_fc_group(cmd.object()?)?;
    let Some(group) = sim.fc_groups.get(&name) else {
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
    sim.remove_fc_group(&name);
    Ok(String::new())
}

fn lsfcconsistgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    if let Some(key) = cmd.object_opt() {
        let name = sim.fc_groups.resolve(key).ok_or(ErrorCode::Cmmvc5754e)?;
        if sim.fc_group_wait(&name) {
            return Err(ErrorCode::Cmmvc5754e.into());
        }
        let group = sim.fc_groups.get(&name).ok_or(ErrorCode::Cmmvc5754e)?;
        let mut view = ObjectView::new();
        view.push("id", group.id.to_string());
        view.push("name", &group.name);
        view.push("status", group.state.to_string());
        view.push("autodelete", on_off(group.autodelete));
        view.push("start_time", start_time(group.start_time));
        for (id, member) in &group.members {
            view.push("FC_mapping_id", id.to_string());
            view.push("FC_mapping_name", member);
        }
        return Ok(render_object(cmd, &view));
    }

    for name in sim.fc_groups.names() {
        sim.fc_group_wait(&name);
    }
    let mut table = Table::new(["id", "name", "status", "start_time"]);
    for group in sim.fc_groups.values() {
        table.push([
            group.id.to_string(),
            group.name.clone(),
            group.state.to_string(),
            start_time(group.start_time),
        ]);
    }
    render_table(cmd, table)
}
