//! Host and host-mapping commands.

use tracing::info;

use super::system::node_fc_ports;
use super::vdisk::require_volume;
use super::{Handler, apply_table_fault, created, is_valid_name, parse_num, render_object, render_table};
use crate::command::Command;
use crate::error::{ErrorCode, Result};
use crate::format::{ObjectView, Table};
use crate::inject::FaultTag;
use crate::simulator::Simulator;
use crate::store::find_unused_id;
use crate::types::{Host, HostMapping};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("mkhost", mkhost),
    ("addhostport", addhostport),
    ("chhost", chhost),
    ("rmhost", rmhost),
    ("lshost", lshost),
    ("mkvdiskhostmap", mkvdiskhostmap),
    ("rmvdiskhostmap", rmvdiskhostmap),
    ("lshostvdiskmap", lshostvdiskmap),
    ("lsvdiskhostmap", lsvdiskhostmap),
    ("lsiscsiauth", lsiscsiauth),
    ("lsfabric", lsfabric),
];

/// Host name a driver looks up to exercise the lookup fast path.
const FASTPATH_PROBE: &str = "DifferentHost";

/// Ports named by `-iscsiname` and `-hbawwpn`.
struct Ports {
    iscsi: Vec<String>,
    wwpns: Vec<String>,
}

impl Ports {
    fn from_command(cmd: &Command) -> Result<Self> {
        let iscsi: Vec<String> = cmd
            .unquoted("iscsiname")
            .map(|v| vec![v.to_string()])
            .unwrap_or_default();
        let wwpns: Vec<String> = cmd
            .unquoted("hbawwpn")
            .map(|v| {
                v.split(':')
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if iscsi.is_empty() && wwpns.is_empty() {
            return Err(ErrorCode::Cmmvc5707e.into());
        }
        Ok(Self { iscsi, wwpns })
    }

    fn all(&self) -> impl Iterator<Item = &String> {
        self.iscsi.iter().chain(&self.wwpns)
    }
}

impl Simulator {
    fn port_in_use(&self, port: &str) -> bool {
        self.hosts.values().any(|h| h.has_port(port))
    }

    fn resolve_host(&self, key: &str, code: ErrorCode) -> Result<String> {
        self.hosts.resolve(key).ok_or_else(|| code.into())
    }
}

fn mkhost(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let id = sim.hosts.next_id();
    let name = cmd
        .unquoted("name")
        .map_or_else(|| format!("host{id}"), str::to_string);
    if !is_valid_name(&name) {
        return Err(ErrorCode::Cmmvc6527e.into());
    }
    if sim.hosts.contains(&name) {
        return Err(ErrorCode::Cmmvc6035e.into());
    }
    let ports = Ports::from_command(cmd)?;
    if ports.all().any(|p| sim.port_in_use(p)) {
        return Err(ErrorCode::Cmmvc6581e.into());
    }

    info!(host = %name, id, ports = ports.iscsi.len() + ports.wwpns.len(), "created host");
    sim.hosts.insert(Host {
        id,
        name,
        iscsi_names: ports.iscsi,
        wwpns: ports.wwpns,
        site: cmd.unquoted("site").map(str::to_string),
        chap_secret: None,
    });
    Ok(created("Host", id))
}

fn addhostport(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_host(cmd.object()?, ErrorCode::Cmmvc5753e)?;
    let ports = Ports::from_command(cmd)?;
    if ports.all().any(|p| sim.port_in_use(p)) {
        return Err(ErrorCode::Cmmvc6581e.into());
    }
    if let Some(host) = sim.hosts.get_mut(&name) {
        host.iscsi_names.extend(ports.iscsi);
        host.wwpns.extend(ports.wwpns);
    }
    Ok(String::new())
}

fn chhost(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_host(cmd.object()?, ErrorCode::Cmmvc5753e)?;
    let new_name = cmd.unquoted("name");
    if let Some(new) = new_name {
        if !is_valid_name(new) {
            return Err(ErrorCode::Cmmvc6527e.into());
        }
        if new != name && sim.hosts.contains(new) {
            return Err(ErrorCode::Cmmvc6035e.into());
        }
    }

    if let Some(host) = sim.hosts.get_mut(&name) {
        if let Some(secret) = cmd.unquoted("chapsecret") {
            host.chap_secret = Some(secret.to_string());
        }
        if let Some(site) = cmd.unquoted("site") {
            host.site = Some(site.to_string());
        }
    }
    if let Some(new) = new_name {
        if sim.hosts.rename(&name, new) {
            for mapping in sim.mappings.values_mut().filter(|m| m.host == name) {
                mapping.host = new.to_string();
            }
        }
    }
    Ok(String::new())
}

fn rmhost(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let name = sim.resolve_host(cmd.object()?, ErrorCode::Cmmvc5753e)?;
    if sim.mappings.values().any(|m| m.host == name) {
        return Err(ErrorCode::Cmmvc5871e.into());
    }
    sim.hosts.remove(&name);
    info!(host = %name, "deleted host");
    Ok(String::new())
}

fn lshost(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let Some(key) = cmd.object_opt() else {
        let mut hosts: Vec<&Host> = sim.hosts.values().collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        let mut table = Table::new(["id", "name", "port_count", "iogrp_count", "status", "site_name"]);
        for host in hosts {
            table.push([
                host.id.to_string(),
                host.name.clone(),
                host.port_count().to_string(),
                "4".to_string(),
                "online".to_string(),
                host.site.clone().unwrap_or_default(),
            ]);
        }
        return render_table(cmd, table);
    };

    match fault {
        Some(FaultTag::MissingHost) => return Err(ErrorCode::Cmmvc5754e.into()),
        Some(FaultTag::BiggerTroubles) => return Err(ErrorCode::Cmmvc6527e.into()),
        Some(FaultTag::FailFastpath) if key == FASTPATH_PROBE => {
            return Err(ErrorCode::Cmmvc5701e.into());
        }
        _ => {}
    }

    let host = sim.hosts.find(key).ok_or(ErrorCode::Cmmvc5754e)?;
    let mut view = ObjectView::new();
    view.push("id", host.id.to_string());
    view.push("name", &host.name);
    view.push("port_count", host.port_count().to_string());
    view.push("type", "generic");
    view.push("mask", "1111");
    view.push("iogrp_count", "4");
    view.push("status", "online");
    view.push("site_id", "");
    view.push("site_name", host.site.clone().unwrap_or_default());
    for iqn in &host.iscsi_names {
        view.push("iscsi_name", iqn);
        view.push("node_logged_in_count", "0");
        view.push("state", "offline");
    }
    for wwpn in &host.wwpns {
        view.push("WWPN", wwpn);
        view.push("node_logged_in_count", "0");
        view.push("state", "active");
    }
    Ok(render_object(cmd, &view))
}

fn mkvdiskhostmap(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let host_key = cmd.require("host", ErrorCode::Cmmvc5707e)?;
    let vol_key = cmd.require("obj", ErrorCode::Cmmvc5707e)?;
    let volume = require_volume(sim, vol_key, ErrorCode::Cmmvc5753e)?;
    let host = sim.resolve_host(host_key, ErrorCode::Cmmvc5754e)?;

    let on_host: Vec<u32> = sim
        .mappings
        .values()
        .filter(|m| m.host == host)
        .map(|m| m.lun)
        .collect();
    let lun = match cmd.value("scsi") {
        Some(raw) => parse_num(raw, ErrorCode::Cmmvc5707e)?,
        None => find_unused_id(on_host.iter().copied()),
    };
    if on_host.contains(&lun) {
        return Err(ErrorCode::Cmmvc5879e.into());
    }
    if !cmd.has("force") && sim.mappings.values().any(|m| m.volume == volume) {
        return Err(ErrorCode::Cmmvc6071e.into());
    }

    let id = sim.mappings.next_id();
    info!(host = %host, volume = %volume, lun, "mapped volume");
    sim.mappings.insert(HostMapping::new(id, host, volume, lun));
    Ok(created("Virtual Disk to Host map", id))
}

fn rmvdiskhostmap(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let host_key = cmd.require("host", ErrorCode::Cmmvc5707e)?;
    let volume = require_volume(sim, cmd.object()?, ErrorCode::Cmmvc5753e)?;
    let host = sim.resolve_host(host_key, ErrorCode::Cmmvc5753e)?;
    let key = sim
        .mappings
        .values()
        .find(|m| m.host == host && m.volume == volume)
        .map(|m| m.key.clone())
        .ok_or(ErrorCode::Cmmvc5753e)?;
    sim.mappings.remove(&key);
    info!(host = %host, volume = %volume, "unmapped volume");
    Ok(String::new())
}

fn lshostvdiskmap(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let only = cmd
        .object_opt()
        .map(|k| sim.resolve_host(k, ErrorCode::Cmmvc5754e))
        .transpose()?;
    let mut table = Table::new(["id", "name", "SCSI_id", "vdisk_id", "vdisk_name", "vdisk_UID"]);
    for mapping in sim.mappings.values() {
        if only.as_ref().is_some_and(|h| *h != mapping.host) {
            continue;
        }
        let (Some(host), Some(vol)) = (sim.hosts.get(&mapping.host), sim.volumes.get(&mapping.volume))
        else {
            continue;
        };
        table.push([
            host.id.to_string(),
            host.name.clone(),
            mapping.lun.to_string(),
            vol.id.to_string(),
            vol.name.clone(),
            vol.uid.clone(),
        ]);
    }
    render_table(cmd, table)
}

fn lsvdiskhostmap(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let volume = require_volume(sim, cmd.object()?, ErrorCode::Cmmvc5753e)?;
    let mut table = Table::new([
        "id",
        "name",
        "SCSI_id",
        "host_id",
        "host_name",
        "vdisk_UID",
        "IO_group_id",
        "IO_group_name",
    ]);
    for mapping in sim.mappings.values().filter(|m| m.volume == volume) {
        let (Some(host), Some(vol)) = (sim.hosts.get(&mapping.host), sim.volumes.get(&volume)) else {
            continue;
        };
        table.push([
            vol.id.to_string(),
            vol.name.clone(),
            mapping.lun.to_string(),
            host.id.to_string(),
            host.name.clone(),
            vol.uid.clone(),
            vol.io_group.to_string(),
            format!("io_grp{}", vol.io_group),
        ]);
    }
    render_table(cmd, table)
}

fn lsiscsiauth(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let mut table = Table::new(["type", "id", "name", "iscsi_auth_method", "iscsi_chap_secret"]);
    for host in sim.hosts.values() {
        let (method, secret) = match &host.chap_secret {
            Some(secret) => ("chap", secret.clone()),
            None => ("none", String::new()),
        };
        table.push([
            "host".to_string(),
            host.id.to_string(),
            host.name.clone(),
            method.to_string(),
            secret,
        ]);
    }
    render_table(cmd, table)
}

/// Fabric logins: every FC port of every matching host, seen by every
/// node port.
fn lsfabric(sim: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    if fault == Some(FaultTag::NoHosts) {
        return Ok(String::new());
    }
    let host_filter = cmd.unquoted("host");
    let wwpn_filter = cmd.value("wwpn");

    let mut table = Table::new([
        "remote_wwpn",
        "remote_nportid",
        "id",
        "node_name",
        "local_wwpn",
        "local_port",
        "local_nportid",
        "state",
        "name",
        "cluster_name",
        "type",
    ]);
    for host in sim.hosts.values() {
        if host_filter.is_some_and(|h| h != host.name) {
            continue;
        }
        for wwpn in &host.wwpns {
            if wwpn_filter.is_some_and(|w| w != wwpn) {
                continue;
            }
            for (node_id, node_name, local_wwpn, port) in node_fc_ports() {
                table.push([
                    wwpn.clone(),
                    "010A00".to_string(),
                    node_id.to_string(),
                    node_name,
                    local_wwpn.to_string(),
                    port.to_string(),
                    format!("01{port:02}00"),
                    "active".to_string(),
                    host.name.clone(),
                    String::new(),
                    "host".to_string(),
                ]);
            }
        }
    }
    apply_table_fault(&mut table, fault, 0);
    render_table(cmd, table)
}

#[cfg(test)]
mod tests {
    use crate::inject::FaultTag;
    use crate::response::CliResponse;
    use crate::simulator::Simulator;

    fn run(sim: &mut Simulator, line: &str) -> String {
        sim.execute_line(line, true).expect("command").stdout
    }

    fn fail(sim: &mut Simulator, line: &str) -> String {
        let out = sim.execute_line(line, false).expect("raw output");
        assert!(!out.is_success(), "{line} should fail");
        out.stderr
    }

    fn with_volume() -> Simulator {
        let mut sim = Simulator::default();
        run(&mut sim, "mkvdisk -name v1 -size 1 -unit gb -mdiskgrp openstack -iogrp 0");
        sim
    }

    #[test]
    fn mkhost_assigns_ids_and_default_names() {
        let mut sim = Simulator::default();
        assert_eq!(
            run(&mut sim, "mkhost -name h1 -iscsiname iqn.a"),
            "Host, id [0], successfully created"
        );
        run(&mut sim, "mkhost -hbawwpn AA00:BB00");
        let host = sim.hosts().get("host1").expect("default name");
        assert_eq!(host.wwpns, ["AA00", "BB00"]);
    }

    #[test]
    fn mkhost_errors() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.a");
        assert!(fail(&mut sim, "mkhost -name h2").starts_with("CMMVC5707E"));
        assert!(fail(&mut sim, "mkhost -name h1 -iscsiname iqn.b").starts_with("CMMVC6035E"));
        assert!(fail(&mut sim, "mkhost -name h2 -iscsiname iqn.a").starts_with("CMMVC6581E"));
        assert!(fail(&mut sim, "mkhost -name 2h -iscsiname iqn.c").starts_with("CMMVC6527E"));
        assert_eq!(sim.hosts().len(), 1);
    }

    #[test]
    fn addhostport_and_chhost() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.a");
        run(&mut sim, "addhostport -hbawwpn CC00 h1");
        run(&mut sim, "chhost -chapsecret s3cret -site site1 h1");
        let host = sim.hosts().get("h1").expect("host");
        assert_eq!(host.port_count(), 2);
        assert_eq!(host.site.as_deref(), Some("site1"));

        let out = run(&mut sim, "lsiscsiauth -delim !");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.select(&["name", "iscsi_auth_method", "iscsi_chap_secret"]), vec![
            vec!["h1".to_string(), "chap".to_string(), "s3cret".to_string()]
        ]);
        assert!(fail(&mut sim, "addhostport -iscsiname iqn.z ghost").starts_with("CMMVC5753E"));
    }

    #[test]
    fn lshost_lists_sorted_by_name() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkhost -name zeta -iscsiname iqn.z");
        run(&mut sim, "mkhost -name alpha -iscsiname iqn.a");
        let out = run(&mut sim, "lshost -delim !");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.select(&["name"]), vec![vec!["alpha".to_string()], vec!["zeta".to_string()]]);
    }

    #[test]
    fn lshost_object_has_port_blocks() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkhost -name h1 -hbawwpn AA00:BB00");
        let out = run(&mut sim, "lshost -delim ! h1");
        let resp = CliResponse::parse(&out, "!", false).expect("parse");
        let record = resp.first().expect("record");
        assert_eq!(record.field("WWPN").map(|f| f.all()), Some(vec!["AA00", "BB00"]));
        assert!(fail(&mut sim, "lshost nope").starts_with("CMMVC5754E"));
    }

    #[test]
    fn lshost_faults() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.a");
        sim.error_injection("lshost", FaultTag::BiggerTroubles);
        assert!(fail(&mut sim, "lshost h1").starts_with("CMMVC6527E"));
        sim.error_injection("lshost", FaultTag::FailFastpath);
        assert!(fail(&mut sim, "lshost DifferentHost").starts_with("CMMVC5701E"));
    }

    #[test]
    fn mapping_assigns_lowest_free_lun() {
        let mut sim = with_volume();
        run(&mut sim, "mkvdisk -name v2 -size 1 -unit gb -mdiskgrp openstack -iogrp 0");
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.a");
        assert_eq!(
            run(&mut sim, "mkvdiskhostmap -host h1 -scsi 0 v1"),
            "Virtual Disk to Host map, id [0], successfully created"
        );
        run(&mut sim, "mkvdiskhostmap -host h1 v2");
        let luns: Vec<u32> = sim.host_mappings().values().map(|m| m.lun).collect();
        assert_eq!(luns, [0, 1]);

        let out = run(&mut sim, "lshostvdiskmap -delim ! h1");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.select(&["SCSI_id", "vdisk_name"]), vec![
            vec!["0".to_string(), "v1".to_string()],
            vec!["1".to_string(), "v2".to_string()],
        ]);
    }

    #[test]
    fn mapping_conflicts() {
        let mut sim = with_volume();
        run(&mut sim, "mkvdisk -name v2 -size 1 -unit gb -mdiskgrp openstack -iogrp 0");
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.a");
        run(&mut sim, "mkhost -name h2 -iscsiname iqn.b");
        run(&mut sim, "mkvdiskhostmap -host h1 -scsi 3 v1");

        assert!(fail(&mut sim, "mkvdiskhostmap -host h1 -scsi 3 v2").starts_with("CMMVC5879E"));
        assert!(fail(&mut sim, "mkvdiskhostmap -host h2 v1").starts_with("CMMVC6071E"));
        run(&mut sim, "mkvdiskhostmap -host h2 -force v1");
        assert!(fail(&mut sim, "mkvdiskhostmap -host h1").starts_with("CMMVC5707E"));
        assert!(fail(&mut sim, "mkvdiskhostmap -host h1 ghost").starts_with("CMMVC5753E"));
        assert!(fail(&mut sim, "mkvdiskhostmap -host ghost v2").starts_with("CMMVC5754E"));
    }

    #[test]
    fn unmap_and_rmhost() {
        let mut sim = with_volume();
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.a");
        run(&mut sim, "mkvdiskhostmap -host h1 v1");
        assert!(fail(&mut sim, "rmhost h1").starts_with("CMMVC5871E"));

        let out = run(&mut sim, "lsvdiskhostmap -delim ! v1");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.first().and_then(|r| r.get("host_name")), Some("h1"));

        run(&mut sim, "rmvdiskhostmap -host h1 v1");
        assert!(fail(&mut sim, "rmvdiskhostmap -host h1 v1").starts_with("CMMVC5753E"));
        run(&mut sim, "rmhost h1");
        assert!(sim.hosts().is_empty());
        assert!(fail(&mut sim, "rmhost h1").starts_with("CMMVC5753E"));
    }

    #[test]
    fn host_rename_follows_mappings() {
        let mut sim = with_volume();
        run(&mut sim, "mkhost -name h1 -iscsiname iqn.a");
        run(&mut sim, "mkvdiskhostmap -host h1 v1");
        run(&mut sim, "chhost -name h9 h1");
        assert!(sim.host_mappings().values().all(|m| m.host == "h9"));
    }

    #[test]
    fn fabric_logins() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkhost -name h1 -hbawwpn AA00:BB00");
        run(&mut sim, "mkhost -name h2 -hbawwpn CC00");

        let out = run(&mut sim, "lsfabric -delim ! -host h1");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.len(), 8);

        let out = run(&mut sim, "lsfabric -delim ! -wwpn CC00");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert!(resp.records().iter().all(|r| r.get("name") == Some("h2")));

        sim.error_injection("lsfabric", FaultTag::NoHosts);
        assert_eq!(run(&mut sim, "lsfabric -host h1"), "");

        sim.error_injection("lsfabric", FaultTag::HeaderMismatch);
        let out = run(&mut sim, "lsfabric -delim ! -host h1");
        assert!(CliResponse::parse(&out, "!", true).is_err());
    }
}
