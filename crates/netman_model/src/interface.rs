use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortMode {
    Access,
    Trunk,
    BondMember,
    Unset,
}

impl Default for PortMode {
    fn default() -> Self {
        PortMode::Unset
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanningTreeConfig {
    pub edge: bool,
    pub no_root_port: bool,
}

/// The switching attributes shared by a standalone interface and a bond's
/// derived interface (e.g. `ae10`). Kept as one struct so the ACCESS/TRUNK
/// invariants only need to be checked in one place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchingAttributes {
    pub shutdown: bool,
    #[serde(default)]
    pub port_mode: PortMode,
    pub access_vlan: Option<u16>,
    pub trunk_native_vlan: Option<u16>,
    #[serde(default)]
    pub trunk_vlans: BTreeSet<u16>,
    #[serde(default)]
    pub spanning_tree: SpanningTreeConfig,
    #[serde(default)]
    pub lldp_enabled: bool,
    pub description: Option<String>,
}

impl SwitchingAttributes {
    /// Checks the invariants of §3: ACCESS carries no trunk state, TRUNK
    /// carries no access vlan.
    pub fn is_consistent(&self) -> bool {
        match self.port_mode {
            PortMode::Access => self.trunk_native_vlan.is_none() && self.trunk_vlans.is_empty(),
            PortMode::Trunk => self.access_vlan.is_none(),
            PortMode::BondMember | PortMode::Unset => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub bond_master: Option<u32>,
    #[serde(flatten)]
    pub switching: SwitchingAttributes,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bond_master: None,
            switching: SwitchingAttributes::default(),
        }
    }
}
