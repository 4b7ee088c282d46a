//! Typed records held by the simulator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use strum::{Display, EnumString, IntoStaticStr};

use crate::state::{FcGroupState, FcMapState, Progress, RcGroupState, RcState};
use crate::store::Keyed;

/// Prefix of every synthesized volume UID.
const UID_PREFIX: &str = "ABCDEFABCDEFABCDEF00000000000000";

/// Derive a volume UID from its id.
#[must_use]
pub fn volume_uid(id: u32) -> String {
    format!("{UID_PREFIX}{id}")
}

/// Thin-provisioning parameters of a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinProvisioning {
    /// Real (allocated) capacity in bytes.
    pub real_capacity: u64,
    /// Used capacity in bytes.
    pub used_capacity: u64,
    /// Grow the allocation automatically.
    pub autoexpand: bool,
    /// Warning threshold, e.g. `80%`.
    pub warning: String,
    /// Grain size in KiB.
    pub grainsize: u32,
    /// Data is compressed.
    pub compressed: bool,
}

/// One copy of a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeCopy {
    /// Copy id, 0 or 1.
    pub id: u32,
    /// Pool name.
    pub pool: String,
    /// Pool id.
    pub pool_id: u32,
    /// Reads are served from this copy.
    pub primary: bool,
    /// Contents match the other copy.
    pub sync: bool,
    /// Easy Tier enabled.
    pub easy_tier: bool,
    /// Thin provisioning, if any.
    pub thin: Option<ThinProvisioning>,
}

impl VolumeCopy {
    /// Whether the copy is compressed.
    #[must_use]
    pub fn compressed(&self) -> bool {
        self.thin.as_ref().is_some_and(|t| t.compressed)
    }
}

/// A virtual disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Numeric id.
    pub id: u32,
    /// Unique name.
    pub name: String,
    /// Synthesized WWN.
    pub uid: String,
    /// Capacity in bytes.
    pub capacity: u64,
    /// I/O group id.
    pub io_group: u32,
    /// Preferred node id.
    pub preferred_node: u32,
    /// Remote-copy relationship this volume belongs to.
    pub rc: Option<RcLink>,
    /// Copies, keyed by copy id.
    pub copies: BTreeMap<u32, VolumeCopy>,
    /// Copy to delete once the new one syncs.
    pub autodelete_copy: Option<u32>,
}

/// Back-pointer from a volume to its relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcLink {
    /// Relationship id.
    pub id: u32,
    /// Relationship name.
    pub name: String,
}

impl Volume {
    /// The primary copy, if any.
    #[must_use]
    pub fn primary_copy(&self) -> Option<&VolumeCopy> {
        self.copies
            .values()
            .find(|c| c.primary)
            .or_else(|| self.copies.values().next())
    }

    /// Pool of the primary copy, or `many` for a mirror.
    #[must_use]
    pub fn pool_name(&self) -> &str {
        if self.copies.len() > 1 {
            "many"
        } else {
            self.primary_copy().map_or("", |c| c.pool.as_str())
        }
    }

    /// Pool id of the primary copy, or `many` for a mirror.
    #[must_use]
    pub fn pool_id(&self) -> String {
        if self.copies.len() > 1 {
            "many".to_string()
        } else {
            self.primary_copy()
                .map_or_else(String::new, |c| c.pool_id.to_string())
        }
    }

    /// Number of thin-provisioned copies.
    #[must_use]
    pub fn thin_copy_count(&self) -> usize {
        self.copies.values().filter(|c| c.thin.is_some()).count()
    }
}

impl Keyed for Volume {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// A host object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Numeric id.
    pub id: u32,
    /// Unique name.
    pub name: String,
    /// iSCSI qualified names.
    pub iscsi_names: Vec<String>,
    /// Fibre Channel port names.
    pub wwpns: Vec<String>,
    /// Hyperswap site.
    pub site: Option<String>,
    /// CHAP secret for iSCSI.
    pub chap_secret: Option<String>,
}

impl Host {
    /// Whether the host owns the port.
    #[must_use]
    pub fn has_port(&self, port: &str) -> bool {
        self.iscsi_names.iter().chain(&self.wwpns).any(|p| p == port)
    }

    /// Number of ports of either kind.
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.iscsi_names.len() + self.wwpns.len()
    }
}

impl Keyed for Host {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// A volume-to-host mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMapping {
    /// Numeric id.
    pub id: u32,
    /// Store key; the id in decimal.
    pub key: String,
    /// Host name.
    pub host: String,
    /// Volume name.
    pub volume: String,
    /// SCSI LUN.
    pub lun: u32,
}

impl HostMapping {
    /// Create a mapping.
    #[must_use]
    pub fn new(id: u32, host: impl Into<String>, volume: impl Into<String>, lun: u32) -> Self {
        Self {
            id,
            key: id.to_string(),
            host: host.into(),
            volume: volume.into(),
            lun,
        }
    }
}

impl Keyed for HostMapping {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.key
    }
    fn set_name(&mut self, name: String) {
        self.key = name;
    }
}

/// A FlashCopy mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcMapping {
    /// Numeric id.
    pub id: u32,
    /// Unique name.
    pub name: String,
    /// Source volume name.
    pub source: String,
    /// Target volume name.
    pub target: String,
    /// Background copy rate; 0 never copies.
    pub copy_rate: u32,
    /// Cleaning rate.
    pub clean_rate: u32,
    /// Copy progress.
    pub progress: Progress,
    /// Delete once copied.
    pub autodelete: bool,
    /// Lifecycle state.
    pub state: FcMapState,
    /// Consistency group name.
    pub group: Option<String>,
    /// Owned by a remote-copy relationship.
    pub rc_controlled: bool,
    /// Last start.
    pub start_time: Option<DateTime<Utc>>,
}

impl Keyed for FcMapping {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// A FlashCopy consistency group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcConsistGrp {
    /// Numeric id.
    pub id: u32,
    /// Unique name.
    pub name: String,
    /// Delete once every member has copied.
    pub autodelete: bool,
    /// Lifecycle state.
    pub state: FcGroupState,
    /// Last start.
    pub start_time: Option<DateTime<Utc>>,
    /// Member mappings, id to name.
    pub members: BTreeMap<u32, String>,
}

impl Keyed for FcConsistGrp {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Remote-copy flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CopyType {
    /// Synchronous.
    Metro,
    /// Asynchronous.
    Global,
    /// Hyperswap.
    Activeactive,
}

/// Global mirror cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CyclingMode {
    /// Plain global mirror.
    None,
    /// Cycles through change volumes.
    Multi,
}

/// Which side of a relationship is the copy source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Primary {
    /// The master volume.
    Master,
    /// The auxiliary volume.
    Aux,
}

/// Cluster name and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    /// Cluster id.
    pub id: String,
    /// Cluster name.
    pub name: String,
}

/// Remote-copy parameters shared by relationships and groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcMode {
    /// Copy flavor.
    pub copy_type: CopyType,
    /// Cycling mode.
    pub cycling_mode: CyclingMode,
    /// Cycle period.
    pub cycle_period_seconds: u32,
}

impl RcMode {
    /// Global mirror with change volumes.
    #[must_use]
    pub fn uses_change_volumes(&self) -> bool {
        self.cycling_mode == CyclingMode::Multi && self.copy_type == CopyType::Global
    }
}

impl Default for RcMode {
    fn default() -> Self {
        Self {
            copy_type: CopyType::Metro,
            cycling_mode: CyclingMode::None,
            cycle_period_seconds: 300,
        }
    }
}

/// A remote-copy relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcRelationship {
    /// Numeric id.
    pub id: u32,
    /// Unique name.
    pub name: String,
    /// Master cluster.
    pub master_cluster: ClusterRef,
    /// Master volume name.
    pub master_vdisk: String,
    /// Auxiliary cluster.
    pub aux_cluster: ClusterRef,
    /// Auxiliary volume name.
    pub aux_vdisk: String,
    /// Current copy direction; `None` while idling.
    pub primary: Option<Primary>,
    /// Lifecycle state.
    pub state: RcState,
    /// Sync progress.
    pub progress: Progress,
    /// Copy parameters.
    pub mode: RcMode,
    /// Master change volume.
    pub master_change_vdisk: Option<String>,
    /// Auxiliary change volume.
    pub aux_change_vdisk: Option<String>,
    /// Consistency group name.
    pub group: Option<String>,
}

impl Keyed for RcRelationship {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// A remote-copy consistency group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcConsistGrp {
    /// Numeric id.
    pub id: u32,
    /// Unique name.
    pub name: String,
    /// Master cluster.
    pub master_cluster: ClusterRef,
    /// Auxiliary cluster.
    pub aux_cluster: ClusterRef,
    /// Copy direction.
    pub primary: Option<Primary>,
    /// Lifecycle state.
    pub state: RcGroupState,
    /// Copy parameters, taken from the first member.
    pub mode: RcMode,
    /// Member relationships, id to name.
    pub members: BTreeMap<u32, String>,
}

impl Keyed for RcConsistGrp {
    fn id(&self) -> u32 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Transport of a partnership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PartnershipKind {
    /// IPv4 link.
    Ipv4,
    /// Fibre Channel link.
    Fc,
}

/// A partnership with a remote system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partnership {
    /// Remote system.
    pub remote: ClusterRef,
    /// Link type.
    pub kind: PartnershipKind,
    /// Remote address for IP partnerships.
    pub cluster_ip: Option<String>,
    /// Link bandwidth.
    pub link_bandwidth_mbits: u32,
    /// Share of bandwidth for background copy, in percent.
    pub background_copy_rate: u32,
    /// Copying between the systems is enabled.
    pub started: bool,
}

impl Partnership {
    /// The status column.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        if self.started {
            "fully_configured"
        } else {
            "fully_configured_stopped"
        }
    }
}

/// A storage pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    /// Numeric id.
    pub id: u32,
    /// Unique name.
    pub name: String,
    /// Hyperswap site.
    pub site_id: Option<u32>,
    /// Capacity in bytes.
    pub capacity: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn copy(id: u32, pool: &str, primary: bool) -> VolumeCopy {
        VolumeCopy {
            id,
            pool: pool.to_string(),
            pool_id: id,
            primary,
            sync: true,
            easy_tier: true,
            thin: None,
        }
    }

    #[test]
    fn uid_is_derived_from_id() {
        let uid = volume_uid(7);
        assert!(uid.starts_with("ABCDEFABCDEFABCDEF"));
        assert!(uid.ends_with('7'));
        assert_eq!(uid.len(), 33);
    }

    #[test]
    fn mirrored_volume_reports_many() {
        let mut vol = Volume {
            id: 0,
            name: "v".to_string(),
            uid: volume_uid(0),
            capacity: 1,
            io_group: 0,
            preferred_node: 1,
            rc: None,
            copies: BTreeMap::new(),
            autodelete_copy: None,
        };
        vol.copies.insert(0, copy(0, "openstack", true));
        assert_eq!(vol.pool_name(), "openstack");
        vol.copies.insert(1, copy(1, "openstack1", false));
        assert_eq!(vol.pool_name(), "many");
        assert_eq!(vol.pool_id(), "many");
        assert_eq!(vol.primary_copy().map(|c| c.id), Some(0));
    }

    #[test]
    fn change_volumes_need_global_multi() {
        let mut mode = RcMode::default();
        assert!(!mode.uses_change_volumes());
        mode.copy_type = CopyType::Global;
        assert!(!mode.uses_change_volumes());
        mode.cycling_mode = CyclingMode::Multi;
        assert!(mode.uses_change_volumes());
    }

    #[test]
    fn enums_parse_cli_values() {
        assert_eq!(Primary::from_str("aux").expect("primary"), Primary::Aux);
        assert_eq!(CyclingMode::from_str("multi").expect("mode"), CyclingMode::Multi);
        assert_eq!(CopyType::Activeactive.to_string(), "activeactive");
    }

    #[test]
    fn host_ports() {
        let host = Host {
            id: 0,
            name: "h".to_string(),
            iscsi_names: vec!["iqn.a".to_string()],
            wwpns: vec!["AA".to_string(), "BB".to_string()],
            site: None,
            chap_secret: None,
        };
        assert!(host.has_port("BB"));
        assert!(!host.has_port("CC"));
        assert_eq!(host.port_count(), 3);
    }
}
