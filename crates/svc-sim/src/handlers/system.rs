//! System, node, port, pool, license and partnership commands.

use tracing::info;

use super::{Handler, apply_table_fault, parse_num, render_object, render_table};
use crate::command::Command;
use crate::error::{ErrorCode, Result};
use crate::format::{ObjectView, Table, capacity, yes_no};
use crate::inject::FaultTag;
use crate::simulator::Simulator;
use crate::types::{Partnership, PartnershipKind, Pool};

pub(super) const HANDLERS: &[(&str, Handler)] = &[
    ("lssystem", lssystem),
    ("lsnodecanister", lsnodecanister),
    ("lsnode", lsnode),
    ("lsiogrp", lsiogrp),
    ("lsportip", lsportip),
    ("lsportfc", lsportfc),
    ("lsmdiskgrp", lsmdiskgrp),
    ("lslicense", lslicense),
    ("lsguicapabilities", lsguicapabilities),
    ("lspartnership", lspartnership),
    ("lspartnershipcandidate", lspartnershipcandidate),
    ("mkippartnership", mkippartnership),
    ("mkfcpartnership", mkfcpartnership),
    ("chpartnership", chpartnership),
    ("rmpartnership", rmpartnership),
];

/// A simulated node canister.
struct Node {
    id: u32,
    wwnn: &'static str,
    ports: [&'static str; 2],
    ip: &'static str,
}

static NODES: [Node; 2] = [
    Node {
        id: 1,
        wwnn: "123456789ABCDEF0",
        ports: ["500507680210C744", "500507680240C744"],
        ip: "1.234.56.78",
    },
    Node {
        id: 2,
        wwnn: "123456789ABCDEF1",
        ports: ["500507680220C744", "500507680230C744"],
        ip: "1.234.56.79",
    },
];

pub(super) const IO_GROUP_COUNT: u32 = 4;

/// `(node id, node name, wwpn, port number)` for every FC port on the nodes.
pub(super) fn node_fc_ports() -> impl Iterator<Item = (u32, String, &'static str, usize)> {
    NODES.iter().flat_map(|node| {
        node.ports
            .iter()
            .enumerate()
            .map(move |(idx, wwpn)| (node.id, node.name(), *wwpn, idx + 1))
    })
}

impl Node {
    fn name(&self) -> String {
        format!("node{}", self.id)
    }

    fn iscsi_name(&self) -> String {
        format!("iqn.1982-01.com.ibm:1234.sim.node{}", self.id)
    }
}

fn lssystem(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let raw = cmd.has("bytes");
    let total: u64 = sim.pools.iter().map(|p| p.capacity).sum();
    let used: u64 = sim.pools.iter().map(|p| used_in_pool(sim, p)).sum();
    let local = sim.local_cluster();

    let mut view = ObjectView::new();
    view.push("id", &local.id);
    view.push("name", &local.name);
    view.push("location", "local");
    view.push("partnership", "");
    view.push("total_mdisk_capacity", capacity(total, raw));
    view.push("space_in_mdisk_grps", capacity(total, raw));
    view.push("space_allocated_to_vdisks", capacity(used, raw));
    view.push("total_free_space", capacity(total.saturating_sub(used), raw));
    view.push("total_vdiskcopy_capacity", capacity(used, raw));
    view.push("statistics_status", "on");
    view.push("statistics_frequency", "15");
    view.push("cluster_locale", "en_US");
    view.push("time_zone", "520 US/Pacific");
    view.push("code_level", &sim.config.code_level);
    view.push("console_IP", "1.234.56.10:443");
    view.push("id_alias", &local.id);
    view.push("gm_link_tolerance", "300");
    view.push("gm_inter_cluster_delay_simulation", "0");
    view.push("gm_intra_cluster_delay_simulation", "0");
    view.push("gm_max_host_delay", "5");
    view.push("email_reply", "");
    view.push("inventory_mail_interval", "0");
    view.push("cluster_ntp_IP_address", "");
    view.push("tier", "generic_hdd");
    view.push("tier_capacity", capacity(total, raw));
    view.push("tier_free_capacity", capacity(total.saturating_sub(used), raw));
    view.push("has_nas_key", "no");
    view.push("layer", "storage");
    view.push("rc_buffer_size", "48");
    view.push("compression_active", "no");
    view.push("topology", &sim.config.topology);
    view.push("topology_status", "");
    Ok(render_object(cmd, &view))
}

/// Capacity allocated to volume copies in `pool`.
pub(super) fn used_in_pool(sim: &Simulator, pool: &Pool) -> u64 {
    sim.volumes
        .values()
        .flat_map(|v| v.copies.values().map(move |c| (v.capacity, c)))
        .filter(|(_, c)| c.pool == pool.name)
        .map(|(cap, _)| cap)
        .sum()
}

fn lsnodecanister(_: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let mut table = Table::new([
        "id",
        "name",
        "UPS_serial_number",
        "WWNN",
        "status",
        "IO_group_id",
        "IO_group_name",
        "config_node",
        "UPS_unique_id",
        "hardware",
        "iscsi_name",
        "iscsi_alias",
        "panel_name",
        "enclosure_id",
        "canister_id",
        "enclosure_serial_number",
        "site_id",
        "site_name",
    ]);
    for node in &NODES {
        let id = node.id.to_string();
        table.push([
            id.clone(),
            node.name(),
            String::new(),
            node.wwnn.to_string(),
            "online".to_string(),
            "0".to_string(),
            "io_grp0".to_string(),
            yes_no(node.id == 1).to_string(),
            node.wwnn.to_string(),
            "145".to_string(),
            node.iscsi_name(),
            String::new(),
            id.clone(),
            "1".to_string(),
            id.clone(),
            String::new(),
            id.clone(),
            format!("site{id}"),
        ]);
    }
    apply_table_fault(&mut table, fault, 2);
    render_table(cmd, table)
}

/// Per-node detail, printed as `key!value` lines regardless of `-delim`.
fn lsnode(_: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let Some(node) = cmd
        .value("node_id")
        .or_else(|| cmd.object_opt())
        .and_then(|id| NODES.iter().find(|n| n.id.to_string() == id || n.name() == id))
    else {
        return Ok(String::new());
    };
    let mut lines = vec![
        format!("id!{}", node.id),
        format!("name!{}", node.name()),
        format!("WWNN!{}", node.wwnn),
        "status!online".to_string(),
        "IO_group_id!0".to_string(),
        "IO_group_name!io_grp0".to_string(),
        format!("iscsi_name!{}", node.iscsi_name()),
    ];
    for (i, port) in node.ports.iter().enumerate() {
        lines.push(format!("port_id!{port}"));
        lines.push(format!("port_status!{}", if i == 0 { "active" } else { "inactive" }));
        lines.push("port_speed!8Gb".to_string());
    }
    Ok(lines.join("\n"))
}

fn lsiogrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let mut table = Table::new(["id", "name", "node_count", "vdisk_count", "host_count"]);
    for id in 0..IO_GROUP_COUNT {
        let vdisks = sim.volumes.values().filter(|v| v.io_group == id).count();
        let nodes = if id == 0 { NODES.len() } else { 0 };
        let hosts = if id == 0 { sim.hosts.len() } else { 0 };
        table.push([
            id.to_string(),
            format!("io_grp{id}"),
            nodes.to_string(),
            vdisks.to_string(),
            hosts.to_string(),
        ]);
    }
    table.push(["4", "recovery_io_grp", "0", "0", "0"]);
    render_table(cmd, table)
}

fn lsportip(_: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let mut table = Table::new([
        "id",
        "node_id",
        "node_name",
        "IP_address",
        "mask",
        "gateway",
        "IP_address_6",
        "prefix_6",
        "gateway_6",
        "MAC",
        "duplex",
        "state",
        "speed",
        "failover",
        "link_state",
        "host",
        "remote_copy",
        "host_6",
        "remote_copy_6",
        "remote_copy_status",
        "remote_copy_status_6",
    ]);
    let configured = fault != Some(FaultTag::IpNoConfig);
    for node in &NODES {
        for port in 1..=2u32 {
            for failover in ["no", "yes"] {
                let (ip, mask, gateway, state) = if configured && port == 1 {
                    (node.ip, "255.255.255.0", "1.234.56.1", "configured")
                } else {
                    ("", "", "", "unconfigured")
                };
                table.push([
                    port.to_string(),
                    node.id.to_string(),
                    node.name(),
                    ip.to_string(),
                    mask.to_string(),
                    gateway.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    format!("01:23:45:67:89:0{}", node.id),
                    "Full".to_string(),
                    state.to_string(),
                    "1Gb/s".to_string(),
                    failover.to_string(),
                    "active".to_string(),
                    String::new(),
                    "0".to_string(),
                    String::new(),
                    "0".to_string(),
                    String::new(),
                    String::new(),
                ]);
            }
        }
    }
    render_table(cmd, table)
}

fn lsportfc(_: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let mut table = Table::new([
        "id",
        "fc_io_port_id",
        "port_id",
        "type",
        "port_speed",
        "node_id",
        "node_name",
        "WWPN",
        "nportid",
        "status",
        "attachment",
    ]);
    let mut id = 0u32;
    for node in &NODES {
        for (i, wwpn) in node.ports.iter().enumerate() {
            table.push([
                id.to_string(),
                (i + 1).to_string(),
                (i + 1).to_string(),
                "fc".to_string(),
                "8Gb".to_string(),
                node.id.to_string(),
                node.name(),
                (*wwpn).to_string(),
                "010A00".to_string(),
                if i == 0 { "active" } else { "inactive" }.to_string(),
                "switch".to_string(),
            ]);
            id += 1;
        }
    }
    render_table(cmd, table)
}

fn lsmdiskgrp(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let raw = cmd.has("bytes");
    if let Some(key) = cmd.object_opt() {
        let pool = sim.pool(key).ok_or(ErrorCode::Cmmvc5754e)?;
        let used = used_in_pool(sim, pool);
        let vdisks = vdisks_in_pool(sim, pool);
        let mut view = ObjectView::new();
        view.push("id", pool.id.to_string());
        view.push("name", &pool.name);
        view.push("status", "online");
        view.push("mdisk_count", "1");
        view.push("vdisk_count", vdisks.to_string());
        view.push("capacity", capacity(pool.capacity, raw));
        view.push("extent_size", "256");
        view.push("free_capacity", capacity(pool.capacity.saturating_sub(used), raw));
        view.push("virtual_capacity", capacity(used, raw));
        view.push("used_capacity", capacity(used, raw));
        view.push("real_capacity", capacity(used, raw));
        view.push("overallocation", overallocation(used, pool.capacity));
        view.push("warning", "0");
        view.push("easy_tier", "auto");
        view.push("easy_tier_status", "balanced");
        view.push("compression_active", "no");
        view.push("compression_virtual_capacity", "0.00MB");
        view.push("compression_compressed_capacity", "0.00MB");
        view.push("compression_uncompressed_capacity", "0.00MB");
        view.push("site_id", pool.site_id.map(|s| s.to_string()).unwrap_or_default());
        view.push("site_name", pool.site_id.map(|s| format!("site{s}")).unwrap_or_default());
        view.push("data_reduction", "no");
        return Ok(render_object(cmd, &view));
    }

    let mut table = Table::new([
        "id",
        "name",
        "status",
        "mdisk_count",
        "vdisk_count",
        "capacity",
        "extent_size",
        "free_capacity",
        "virtual_capacity",
        "used_capacity",
        "real_capacity",
        "overallocation",
        "warning",
        "easy_tier",
        "easy_tier_status",
        "site_id",
        "site_name",
    ]);
    for pool in &sim.pools {
        let used = used_in_pool(sim, pool);
        table.push([
            pool.id.to_string(),
            pool.name.clone(),
            "online".to_string(),
            "1".to_string(),
            vdisks_in_pool(sim, pool).to_string(),
            capacity(pool.capacity, raw),
            "256".to_string(),
            capacity(pool.capacity.saturating_sub(used), raw),
            capacity(used, raw),
            capacity(used, raw),
            capacity(used, raw),
            overallocation(used, pool.capacity),
            "0".to_string(),
            "auto".to_string(),
            "balanced".to_string(),
            pool.site_id.map(|s| s.to_string()).unwrap_or_default(),
            pool.site_id.map(|s| format!("site{s}")).unwrap_or_default(),
        ]);
    }
    render_table(cmd, table)
}

fn vdisks_in_pool(sim: &Simulator, pool: &Pool) -> usize {
    sim.volumes
        .values()
        .filter(|v| v.copies.values().any(|c| c.pool == pool.name))
        .count()
}

fn overallocation(used: u64, total: u64) -> String {
    if total == 0 {
        "0".to_string()
    } else {
        (used.saturating_mul(100) / total).to_string()
    }
}

fn lslicense(_: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let compression = fault != Some(FaultTag::NoCompression);
    let mut view = ObjectView::new();
    view.push("used_flash", "0.00");
    view.push("used_remote", "0.00");
    view.push("used_virtualization", "0.00");
    view.push("license_flash", "0");
    view.push("license_remote", "0");
    view.push("license_virtualization", "0");
    view.push("license_physical_disks", "0");
    view.push("license_physical_flash", "off");
    view.push("license_physical_remote", "off");
    view.push("used_compression_capacity", if compression { "0.02" } else { "0.00" });
    view.push("license_compression_capacity", "0");
    view.push("license_compression_enclosures", if compression { "1" } else { "0" });
    Ok(render_object(cmd, &view))
}

fn lsguicapabilities(_: &mut Simulator, cmd: &Command, fault: Option<FaultTag>) -> Result<String> {
    let scheme = if fault == Some(FaultTag::NoCompression) { "0" } else { "9846" };
    let mut view = ObjectView::new();
    view.push("license_scheme", scheme);
    view.push("product_key", "2145");
    Ok(render_object(cmd, &view))
}

fn lspartnership(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let local = sim.local_cluster();
    let mut table = Table::new([
        "id",
        "name",
        "location",
        "partnership",
        "type",
        "cluster_ip",
        "event_log_sequence",
    ]);
    table.push([
        local.id.as_str(),
        local.name.as_str(),
        "local",
        "",
        "",
        "",
        "",
    ]);
    for p in sim.partnerships.values() {
        table.push([
            p.remote.id.clone(),
            p.remote.name.clone(),
            "remote".to_string(),
            p.status().to_string(),
            p.kind.to_string(),
            p.cluster_ip.clone().unwrap_or_default(),
            String::new(),
        ]);
    }
    render_table(cmd, table)
}

fn lspartnershipcandidate(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let aux = sim.aux_cluster();
    let configured = sim.partnerships.contains_key(&aux.name);
    let mut table = Table::new(["id", "configured", "name"]);
    table.push([aux.id.as_str(), yes_no(configured), aux.name.as_str()]);
    render_table(cmd, table)
}

/// Bandwidth and copy rate with the array defaults.
fn link_settings(cmd: &Command) -> Result<(u32, u32)> {
    let bandwidth = cmd
        .value("linkbandwidthmbits")
        .map_or(Ok(1000), |v| parse_num(v, ErrorCode::Cmmvc5707e))?;
    let rate = cmd
        .value("backgroundcopyrate")
        .map_or(Ok(50), |v| parse_num(v, ErrorCode::Cmmvc5707e))?;
    Ok((bandwidth, rate))
}

fn create_partnership(sim: &mut Simulator, partnership: Partnership) -> Result<String> {
    if sim.partnerships.contains_key(&partnership.remote.name) {
        return Err(ErrorCode::Cmmvc6035e.into());
    }
    info!(remote = %partnership.remote.name, kind = %partnership.kind, "created partnership");
    sim.partnerships
        .insert(partnership.remote.name.clone(), partnership);
    Ok(String::new())
}

fn mkippartnership(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let ip = cmd.require("clusterip", ErrorCode::Cmmvc5707e)?;
    let (link_bandwidth_mbits, background_copy_rate) = link_settings(cmd)?;
    let partnership = Partnership {
        remote: sim.aux_cluster(),
        kind: PartnershipKind::Ipv4,
        cluster_ip: Some(ip.to_string()),
        link_bandwidth_mbits,
        background_copy_rate,
        started: true,
    };
    create_partnership(sim, partnership)
}

fn mkfcpartnership(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let system = cmd.object()?;
    let remote = sim
        .find_cluster(system)
        .filter(|c| *c != sim.local_cluster())
        .ok_or(ErrorCode::Cmmvc5804e)?;
    let (link_bandwidth_mbits, background_copy_rate) = link_settings(cmd)?;
    let partnership = Partnership {
        remote,
        kind: PartnershipKind::Fc,
        cluster_ip: None,
        link_bandwidth_mbits,
        background_copy_rate,
        started: true,
    };
    create_partnership(sim, partnership)
}

fn find_partnership_key(sim: &Simulator, key: &str) -> Result<String> {
    sim.partnerships
        .values()
        .find(|p| p.remote.name == key || p.remote.id == key)
        .map(|p| p.remote.name.clone())
        .ok_or_else(|| ErrorCode::Cmmvc5753e.into())
}

fn chpartnership(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let key = find_partnership_key(sim, cmd.object()?)?;
    if cmd.has("start") && cmd.has("stop") {
        return Err(ErrorCode::Cmmvc5713e.into());
    }
    let bandwidth: Option<u32> = cmd
        .value("linkbandwidthmbits")
        .map(|v| parse_num(v, ErrorCode::Cmmvc5707e))
        .transpose()?;
    let rate: Option<u32> = cmd
        .value("backgroundcopyrate")
        .map(|v| parse_num(v, ErrorCode::Cmmvc5707e))
        .transpose()?;

    if let Some(p) = sim.partnerships.get_mut(&key) {
        if cmd.has("start") {
            p.started = true;
        } else if cmd.has("stop") {
            p.started = false;
        }
        if let Some(b) = bandwidth {
            p.link_bandwidth_mbits = b;
        }
        if let Some(r) = rate {
            p.background_copy_rate = r;
        }
    }
    Ok(String::new())
}

fn rmpartnership(sim: &mut Simulator, cmd: &Command, _: Option<FaultTag>) -> Result<String> {
    let key = find_partnership_key(sim, cmd.object()?)?;
    if sim.partnerships.get(&key).is_some_and(|p| p.started) {
        return Err(ErrorCode::Cmmvc6065e.into());
    }
    sim.partnerships.shift_remove(&key);
    info!(remote = %key, "removed partnership");
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use crate::inject::FaultTag;
    use crate::response::CliResponse;
    use crate::simulator::Simulator;

    fn run(sim: &mut Simulator, line: &str) -> String {
        sim.execute_line(line, true).expect("command").stdout
    }

    #[test]
    fn lssystem_reports_identity() {
        let mut sim = Simulator::default();
        let out = run(&mut sim, "svcinfo lssystem -delim !");
        let resp = CliResponse::parse(&out, "!", false).expect("parse");
        let record = resp.first().expect("record");
        assert_eq!(record.get("name"), Some("storwize-svc-sim"));
        assert_eq!(record.get("id"), Some("0123456789ABCDEF"));
        assert_eq!(record.get("topology"), Some("standard"));
    }

    #[test]
    fn lsnodecanister_lists_two_nodes() {
        let mut sim = Simulator::default();
        let out = run(&mut sim, "svcinfo lsnodecanister -delim !");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.len(), 2);
        assert_eq!(
            resp.records()[0].get("iscsi_name"),
            Some("iqn.1982-01.com.ibm:1234.sim.node1")
        );
    }

    #[test]
    fn lsnodecanister_header_mismatch_breaks_parser() {
        let mut sim = Simulator::default();
        sim.error_injection("lsnodecanister", FaultTag::HeaderMismatch);
        let out = run(&mut sim, "svcinfo lsnodecanister -delim !");
        assert!(CliResponse::parse(&out, "!", true).is_err());
    }

    #[test]
    fn lsnodecanister_remove_field_drops_id() {
        let mut sim = Simulator::default();
        sim.error_injection("lsnodecanister", FaultTag::RemoveField);
        let out = run(&mut sim, "svcinfo lsnodecanister -delim !");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.records()[0].get("id"), None);
        assert_eq!(resp.records()[0].get("name"), Some("node1"));
    }

    #[test]
    fn lsnode_detail_lists_ports() {
        let mut sim = Simulator::default();
        let out = run(&mut sim, "svcinfo lsnode -delim ! 2");
        let resp = CliResponse::parse(&out, "!", false).expect("parse");
        let record = resp.first().expect("record");
        assert_eq!(record.get("name"), Some("node2"));
        assert_eq!(record.field("port_id").map(|f| f.all().len()), Some(2));
    }

    #[test]
    fn bare_lsnode_takes_node_from_object() {
        let mut sim = Simulator::default();
        let out = run(&mut sim, "lsnode -delim ! 1");
        let resp = CliResponse::parse(&out, "!", false).expect("parse");
        assert_eq!(resp.first().and_then(|r| r.get("name")), Some("node1"));

        let out = run(&mut sim, "lsnode -delim ! -obj node2");
        let resp = CliResponse::parse(&out, "!", false).expect("parse");
        assert_eq!(resp.first().and_then(|r| r.get("id")), Some("2"));
    }

    #[test]
    fn lsportip_without_config() {
        let mut sim = Simulator::default();
        sim.error_injection("lsportip", FaultTag::IpNoConfig);
        let out = run(&mut sim, "lsportip -delim !");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert!(resp.records().iter().all(|r| r.get("IP_address") == Some("")));
    }

    #[test]
    fn lsmdiskgrp_reports_pool_usage() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkvdisk -name v1 -size 1 -unit gb -mdiskgrp openstack -iogrp 0");
        let out = run(&mut sim, "lsmdiskgrp -bytes -delim ! openstack");
        let resp = CliResponse::parse(&out, "!", false).expect("parse");
        let record = resp.first().expect("record");
        assert_eq!(record.get("vdisk_count"), Some("1"));
        assert_eq!(record.get("used_capacity"), Some("1073741824"));
        assert_eq!(record.get("site_id"), Some("1"));

        let out = sim.execute_line("lsmdiskgrp nope", false).expect("raw");
        assert!(out.stderr.starts_with("CMMVC5754E"));
    }

    #[test]
    fn compression_capability_fault() {
        let mut sim = Simulator::default();
        assert!(run(&mut sim, "lsguicapabilities").contains("license_scheme 9846"));
        sim.error_injection("lsguicapabilities", FaultTag::NoCompression);
        assert!(run(&mut sim, "lsguicapabilities").contains("license_scheme 0"));
        sim.error_injection("lslicense", FaultTag::NoCompression);
        assert!(run(&mut sim, "lslicense").contains("license_compression_enclosures 0"));
    }

    #[test]
    fn partnership_lifecycle() {
        let mut sim = Simulator::default();
        run(
            &mut sim,
            "mkippartnership -type ipv4 -clusterip 10.0.0.2 -linkbandwidthmbits 100 -backgroundcopyrate 50",
        );
        let out = run(&mut sim, "lspartnership -delim !");
        let resp = CliResponse::parse(&out, "!", true).expect("parse");
        assert_eq!(resp.len(), 2);
        assert_eq!(resp.records()[1].get("partnership"), Some("fully_configured"));

        let out = sim.execute_line("rmpartnership aux-svc-sim", false).expect("raw");
        assert!(out.stderr.starts_with("CMMVC6065E"));

        run(&mut sim, "chpartnership -stop aux-svc-sim");
        let out = run(&mut sim, "lspartnership -delim ! -filtervalue name=aux-svc-sim");
        assert!(out.contains("fully_configured_stopped"));

        run(&mut sim, "rmpartnership aux-svc-sim");
        assert!(sim.partnerships().is_empty());
    }

    #[test]
    fn duplicate_partnership_is_rejected() {
        let mut sim = Simulator::default();
        run(&mut sim, "mkfcpartnership -linkbandwidthmbits 1024 aux-svc-sim");
        let out = sim.execute_line("mkfcpartnership aux-svc-sim", false).expect("raw");
        assert!(out.stderr.starts_with("CMMVC6035E"));
        let out = sim.execute_line("mkfcpartnership nowhere", false).expect("raw");
        assert!(out.stderr.starts_with("CMMVC5804E"));
    }

    #[test]
    fn partnership_candidate_shows_configured() {
        let mut sim = Simulator::default();
        assert!(run(&mut sim, "lspartnershipcandidate -delim !").contains("!no!"));
        run(&mut sim, "mkfcpartnership aux-svc-sim");
        assert!(run(&mut sim, "lspartnershipcandidate -delim !").contains("!yes!"));
    }
}
