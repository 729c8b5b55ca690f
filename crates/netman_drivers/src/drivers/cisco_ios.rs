//! Cisco IOS driver (§4.2): talks CLI over SSH rather than NETCONF. IOS has
//! no candidate datastore, so `start_transaction` only snapshots
//! `show running-config` for a possible `rollback_transaction`; every
//! mutating call takes effect immediately and `commit_transaction` is a
//! no-op.

use crate::contract::SwitchDriver;
use crate::ssh;
use async_ssh2_tokio::Client;
use async_trait::async_trait;
use netman_model::{
    Bond, Interface, NetmanError, NetmanResult, PortMode, SpanningTreeConfig, SwitchDescriptor,
    SwitchingAttributes, Vlan,
};
use std::collections::BTreeSet;
use tracing::warn;

const MIN_VLAN: u16 = 1;
const MAX_VLAN: u16 = 4094;
const MAX_VLAN_NAME_LEN: usize = 32;
const MIN_BOND: u32 = 1;
const MAX_BOND: u32 = 255;

pub struct CiscoIosDriver {
    descriptor: SwitchDescriptor,
    client: Option<Client>,
    rollback_snapshot: Option<String>,
}

impl CiscoIosDriver {
    pub fn new(descriptor: SwitchDescriptor) -> Self {
        Self {
            descriptor,
            client: None,
            rollback_snapshot: None,
        }
    }

    fn client(&self) -> NetmanResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| NetmanError::Unavailable(format!("{} is not connected", self.descriptor.hostname)))
    }

    async fn exec(&self, command: &str) -> NetmanResult<String> {
        let client = self.client()?;
        let outcome = tokio::time::timeout(ssh::command_timeout(), client.execute(command))
            .await
            .map_err(|_| NetmanError::Unavailable(format!("exec timeout: {command}")))?
            .map_err(|err| NetmanError::Unavailable(err.to_string()))?;
        if outcome.exit_status != 0 {
            return Err(NetmanError::OperationNotCompleted(format!(
                "'{command}' failed (status {}): {}",
                outcome.exit_status,
                outcome.stderr.trim()
            )));
        }
        Ok(outcome.stdout)
    }

    /// Runs `lines` inside a `configure terminal` ... `end` envelope.
    async fn configure(&self, lines: &[String]) -> NetmanResult<()> {
        let script = format!("configure terminal\n{}\nend", lines.join("\n"));
        self.exec(&script).await?;
        Ok(())
    }

    /// Runs `lines` inside `interface X` ... `exit`, itself wrapped in
    /// `configure terminal` ... `end`.
    async fn configure_interface(&self, interface: &str, lines: &[String]) -> NetmanResult<()> {
        let mut script = vec![format!("interface {interface}")];
        script.extend(lines.iter().cloned());
        script.push("exit".to_string());
        self.configure(&script).await
    }

    async fn show_running_config(&self) -> NetmanResult<String> {
        self.exec("show running-config").await
    }

    async fn snapshot(&self) -> NetmanResult<RunningConfig> {
        let raw = self.show_running_config().await?;
        Ok(RunningConfig::parse(&raw))
    }

    fn require_vlan<'a>(config: &'a RunningConfig, number: u16) -> NetmanResult<&'a CiscoVlan> {
        config.vlans.iter().find(|v| v.id == number).ok_or(NetmanError::UnknownVlan(number))
    }

    fn require_interface<'a>(config: &'a RunningConfig, name: &str) -> NetmanResult<&'a CiscoInterface> {
        config
            .interfaces
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| NetmanError::UnknownInterface(name.to_string()))
    }

    fn require_bond<'a>(&self, config: &'a RunningConfig, number: u32) -> NetmanResult<&'a CiscoInterface> {
        let name = self.bond_interface_name(number);
        config
            .interfaces
            .iter()
            .find(|i| i.name == name)
            .ok_or(NetmanError::UnknownBond(number))
    }
}

#[async_trait]
impl SwitchDriver for CiscoIosDriver {
    async fn connect(&mut self) -> NetmanResult<()> {
        let client = ssh::connect(&self.descriptor, ssh::DEFAULT_SSH_PORT)
            .await
            .map_err(|err| NetmanError::Unavailable(err.to_string()))?;
        self.client = Some(client);
        self.exec("terminal length 0").await.ok();
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.client = None;
    }

    async fn start_transaction(&mut self) -> NetmanResult<()> {
        self.rollback_snapshot = Some(self.show_running_config().await?);
        Ok(())
    }

    async fn end_transaction(&mut self) -> NetmanResult<()> {
        self.rollback_snapshot = None;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> NetmanResult<()> {
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> NetmanResult<()> {
        if let Some(snapshot) = self.rollback_snapshot.take() {
            let script = format!("configure replace terminal force\n{snapshot}\n\nend");
            if let Err(err) = self.exec(&script).await {
                warn!(target: "drivers::cisco_ios", host = %self.descriptor.hostname, "rollback failed: {err}");
                return Err(err);
            }
        }
        Ok(())
    }

    async fn get_vlans(&mut self) -> NetmanResult<Vec<Vlan>> {
        let config = self.snapshot().await?;
        Ok(config.vlans.iter().map(CiscoVlan::to_model).collect())
    }

    async fn get_vlan(&mut self, number: u16) -> NetmanResult<Vlan> {
        let config = self.snapshot().await?;
        Ok(Self::require_vlan(&config, number)?.to_model())
    }

    async fn get_interfaces(&mut self) -> NetmanResult<Vec<Interface>> {
        let config = self.snapshot().await?;
        Ok(config
            .interfaces
            .iter()
            .filter(|i| !i.name.starts_with("Port-channel"))
            .map(CiscoInterface::to_model)
            .collect())
    }

    async fn get_interface(&mut self, name: &str) -> NetmanResult<Interface> {
        let config = self.snapshot().await?;
        Ok(Self::require_interface(&config, name)?.to_model())
    }

    async fn get_bonds(&mut self) -> NetmanResult<Vec<Bond>> {
        let config = self.snapshot().await?;
        Ok(config
            .interfaces
            .iter()
            .filter_map(|i| i.name.strip_prefix("Port-channel").and_then(|n| n.parse::<u32>().ok()).map(|number| {
                let mut bond = Bond::new(number, i.name.clone());
                bond.members = config
                    .interfaces
                    .iter()
                    .filter(|m| m.channel_group == Some(number))
                    .map(|m| m.name.clone())
                    .collect();
                bond.interface = i.to_model();
                bond
            }))
            .collect())
    }

    async fn get_bond(&mut self, number: u32) -> NetmanResult<Bond> {
        let config = self.snapshot().await?;
        let raw = self.require_bond(&config, number)?;
        let mut bond = Bond::new(number, raw.name.clone());
        bond.members = config
            .interfaces
            .iter()
            .filter(|m| m.channel_group == Some(number))
            .map(|m| m.name.clone())
            .collect();
        bond.interface = raw.to_model();
        Ok(bond)
    }

    async fn add_vlan(&mut self, number: u16, name: Option<&str>) -> NetmanResult<()> {
        if !(MIN_VLAN..=MAX_VLAN).contains(&number) {
            return Err(NetmanError::BadVlanNumber);
        }
        if let Some(name) = name {
            if name.is_empty() || name.len() > MAX_VLAN_NAME_LEN {
                return Err(NetmanError::BadVlanName);
            }
        }
        let config = self.snapshot().await?;
        if config.vlans.iter().any(|v| v.id == number) {
            return Err(NetmanError::VlanAlreadyExist(number));
        }
        let mut lines = vec![format!("vlan {number}")];
        if let Some(name) = name {
            lines.push(format!("name {name}"));
        }
        lines.push("exit".to_string());
        self.configure(&lines).await
    }

    async fn remove_vlan(&mut self, number: u16) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_vlan(&config, number)?;
        self.configure(&[format!("no vlan {number}")]).await
    }

    async fn set_access_mode(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.port_mode == Some(PortMode::Access) {
            return Ok(());
        }
        let mut lines = Vec::new();
        if raw.native_vlan.is_some() {
            lines.push("no switchport trunk native vlan".to_string());
        }
        if !raw.trunk_vlans.is_empty() {
            lines.push("no switchport trunk allowed vlan".to_string());
        }
        lines.push("switchport mode access".to_string());
        self.configure_interface(interface, &lines).await
    }

    async fn set_trunk_mode(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.port_mode == Some(PortMode::Trunk) {
            return Ok(());
        }
        let mut lines = Vec::new();
        if raw.access_vlan.is_some() {
            lines.push("no switchport access vlan".to_string());
        }
        lines.push("switchport mode trunk".to_string());
        self.configure_interface(interface, &lines).await
    }

    async fn set_access_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.port_mode != Some(PortMode::Access) {
            return Err(NetmanError::InterfaceInWrongPortMode {
                interface: interface.to_string(),
                mode: port_mode_label(raw.port_mode),
            });
        }
        Self::require_vlan(&config, number)?;
        self.configure_interface(interface, &[format!("switchport access vlan {number}")]).await
    }

    async fn remove_access_vlan(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.access_vlan.is_none() {
            return Err(NetmanError::AccessVlanNotSet(interface.to_string()));
        }
        self.configure_interface(interface, &["no switchport access vlan".to_string()]).await
    }

    async fn configure_native_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.port_mode != Some(PortMode::Trunk) {
            return Err(NetmanError::InterfaceInWrongPortMode {
                interface: interface.to_string(),
                mode: port_mode_label(raw.port_mode),
            });
        }
        Self::require_vlan(&config, number)?;
        if raw.trunk_vlans.contains(&number) {
            return Err(NetmanError::VlanAlreadyInTrunk {
                interface: interface.to_string(),
                vlan: number,
            });
        }
        self.configure_interface(interface, &[format!("switchport trunk native vlan {number}")]).await
    }

    async fn remove_native_vlan(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.native_vlan.is_none() {
            return Err(NetmanError::NativeVlanNotSet(interface.to_string()));
        }
        self.configure_interface(interface, &["no switchport trunk native vlan".to_string()]).await
    }

    async fn add_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.port_mode != Some(PortMode::Trunk) {
            return Err(NetmanError::InterfaceInWrongPortMode {
                interface: interface.to_string(),
                mode: port_mode_label(raw.port_mode),
            });
        }
        Self::require_vlan(&config, number)?;
        if raw.trunk_vlans.contains(&number) {
            return Ok(());
        }
        self.configure_interface(interface, &[format!("switchport trunk allowed vlan add {number}")]).await
    }

    async fn remove_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if !raw.trunk_vlans.contains(&number) {
            return Err(NetmanError::TrunkVlanNotSet {
                interface: interface.to_string(),
                vlan: number,
            });
        }
        self.configure_interface(interface, &[format!("switchport trunk allowed vlan remove {number}")]).await
    }

    async fn set_interface_description(&mut self, interface: &str, text: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_interface(&config, interface)?;
        self.configure_interface(interface, &[format!("description {text}")]).await
    }

    async fn remove_interface_description(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_interface(&config, interface)?;
        self.configure_interface(interface, &["no description".to_string()]).await
    }

    async fn edit_interface_spanning_tree(&mut self, interface: &str, edge: bool) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_interface(&config, interface)?;
        let line = if edge {
            "spanning-tree portfast".to_string()
        } else {
            "no spanning-tree portfast".to_string()
        };
        self.configure_interface(interface, &[line]).await
    }

    async fn openup_interface(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_interface(&config, interface)?;
        self.configure_interface(interface, &["no shutdown".to_string()]).await
    }

    async fn shutdown_interface(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_interface(&config, interface)?;
        self.configure_interface(interface, &["shutdown".to_string()]).await
    }

    async fn enable_lldp(&mut self, interface: &str, enabled: bool) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_interface(&config, interface)?;
        let lines = if enabled {
            vec!["lldp transmit".to_string(), "lldp receive".to_string()]
        } else {
            vec!["no lldp transmit".to_string(), "no lldp receive".to_string()]
        };
        self.configure_interface(interface, &lines).await
    }

    async fn add_bond(&mut self, number: u32) -> NetmanResult<()> {
        if !(MIN_BOND..=MAX_BOND).contains(&number) {
            return Err(NetmanError::BadBondNumber);
        }
        let config = self.snapshot().await?;
        let name = self.bond_interface_name(number);
        if config.interfaces.iter().any(|i| i.name == name) {
            return Err(NetmanError::BondAlreadyExist(number));
        }
        self.configure(&[format!("interface {name}"), "exit".to_string()]).await
    }

    async fn remove_bond(&mut self, number: u32) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        self.require_bond(&config, number)?;
        let name = self.bond_interface_name(number);
        self.configure(&[format!("no interface {name}")]).await
    }

    async fn add_interface_to_bond(&mut self, interface: &str, number: u32) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        Self::require_interface(&config, interface)?;
        self.require_bond(&config, number)?;
        self.configure_interface(interface, &[format!("channel-group {number} mode active")]).await
    }

    async fn remove_interface_from_bond(&mut self, interface: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        let raw = Self::require_interface(&config, interface)?;
        if raw.channel_group.is_none() {
            return Err(NetmanError::InterfaceNotInBond(interface.to_string()));
        }
        self.configure_interface(interface, &["no channel-group".to_string()]).await
    }

    async fn set_bond_link_speed(&mut self, number: u32, speed: &str) -> NetmanResult<()> {
        let config = self.snapshot().await?;
        self.require_bond(&config, number)?;
        let name = self.bond_interface_name(number);
        self.configure(&[format!("interface {name}"), format!("speed {speed}"), "exit".to_string()]).await
    }

    fn bond_interface_name(&self, number: u32) -> String {
        format!("Port-channel{number}")
    }
}

fn port_mode_label(mode: Option<PortMode>) -> String {
    match mode {
        Some(PortMode::Access) => "access",
        Some(PortMode::Trunk) => "trunk",
        Some(PortMode::BondMember) => "bond_member",
        Some(PortMode::Unset) | None => "unset",
    }
    .to_string()
}

struct CiscoVlan {
    id: u16,
    name: Option<String>,
}

impl CiscoVlan {
    fn to_model(&self) -> Vlan {
        let mut vlan = Vlan::new(self.id);
        vlan.name = self.name.clone();
        vlan
    }
}

struct CiscoInterface {
    name: String,
    shutdown: bool,
    description: Option<String>,
    port_mode: Option<PortMode>,
    access_vlan: Option<u16>,
    native_vlan: Option<u16>,
    trunk_vlans: BTreeSet<u16>,
    channel_group: Option<u32>,
    portfast: bool,
    lldp_disabled: bool,
}

impl CiscoInterface {
    fn new(name: String) -> Self {
        Self {
            name,
            shutdown: false,
            description: None,
            port_mode: None,
            access_vlan: None,
            native_vlan: None,
            trunk_vlans: BTreeSet::new(),
            channel_group: None,
            portfast: false,
            lldp_disabled: false,
        }
    }

    fn to_model(&self) -> Interface {
        let mut interface = Interface::new(self.name.clone());
        interface.bond_master = self.channel_group;
        interface.switching = SwitchingAttributes {
            shutdown: self.shutdown,
            port_mode: if self.channel_group.is_some() {
                PortMode::BondMember
            } else {
                self.port_mode.unwrap_or(PortMode::Unset)
            },
            access_vlan: self.access_vlan,
            trunk_native_vlan: self.native_vlan,
            trunk_vlans: self.trunk_vlans.clone(),
            spanning_tree: SpanningTreeConfig {
                edge: self.portfast,
                no_root_port: false,
            },
            lldp_enabled: !self.lldp_disabled,
            description: self.description.clone(),
        };
        interface
    }
}

struct RunningConfig {
    vlans: Vec<CiscoVlan>,
    interfaces: Vec<CiscoInterface>,
}

enum Block {
    None,
    Vlan(CiscoVlan),
    Interface(CiscoInterface),
}

impl RunningConfig {
    /// Walks `show running-config` output block by block. IOS delimits
    /// first-level blocks (`vlan N`, `interface X`) with a bare `!` line.
    fn parse(raw: &str) -> Self {
        let mut vlans = Vec::new();
        let mut interfaces = Vec::new();
        let mut block = Block::None;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed == "!" {
                flush(&mut block, &mut vlans, &mut interfaces);
                continue;
            }
            if !line.starts_with(' ') && !line.starts_with('\t') {
                flush(&mut block, &mut vlans, &mut interfaces);
                if let Some(rest) = trimmed.strip_prefix("vlan ") {
                    if let Ok(id) = rest.trim().parse::<u16>() {
                        block = Block::Vlan(CiscoVlan { id, name: None });
                    }
                    continue;
                }
                if let Some(name) = trimmed.strip_prefix("interface ") {
                    block = Block::Interface(CiscoInterface::new(name.trim().to_string()));
                    continue;
                }
                continue;
            }
            match &mut block {
                Block::Vlan(vlan) => {
                    if let Some(name) = trimmed.strip_prefix("name ") {
                        vlan.name = Some(name.trim().to_string());
                    }
                }
                Block::Interface(interface) => apply_interface_line(interface, trimmed),
                Block::None => {}
            }
        }
        flush(&mut block, &mut vlans, &mut interfaces);

        Self { vlans, interfaces }
    }
}

fn flush(block: &mut Block, vlans: &mut Vec<CiscoVlan>, interfaces: &mut Vec<CiscoInterface>) {
    match std::mem::replace(block, Block::None) {
        Block::Vlan(vlan) => vlans.push(vlan),
        Block::Interface(interface) => interfaces.push(interface),
        Block::None => {}
    }
}

fn apply_interface_line(interface: &mut CiscoInterface, line: &str) {
    if line == "shutdown" {
        interface.shutdown = true;
    } else if let Some(text) = line.strip_prefix("description ") {
        interface.description = Some(text.trim().to_string());
    } else if line == "switchport mode access" {
        interface.port_mode = Some(PortMode::Access);
    } else if line == "switchport mode trunk" {
        interface.port_mode = Some(PortMode::Trunk);
    } else if let Some(rest) = line.strip_prefix("switchport access vlan ") {
        interface.access_vlan = rest.trim().parse().ok();
    } else if let Some(rest) = line.strip_prefix("switchport trunk native vlan ") {
        interface.native_vlan = rest.trim().parse().ok();
    } else if let Some(rest) = line.strip_prefix("switchport trunk allowed vlan ") {
        interface.trunk_vlans = parse_vlan_list(rest.trim());
    } else if let Some(rest) = line.strip_prefix("channel-group ") {
        let number = rest.split_whitespace().next().and_then(|n| n.parse().ok());
        interface.channel_group = number;
    } else if line == "spanning-tree portfast" {
        interface.portfast = true;
    } else if line == "no lldp transmit" || line == "no lldp receive" {
        interface.lldp_disabled = true;
    }
}

fn parse_vlan_list(expr: &str) -> BTreeSet<u16> {
    let mut set = BTreeSet::new();
    for token in expr.split(',') {
        let token = token.trim();
        if let Some((start, end)) = token.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.trim().parse::<u16>(), end.trim().parse::<u16>()) {
                set.extend(start..=end);
            }
        } else if let Ok(n) = token.parse::<u16>() {
            set.insert(n);
        }
    }
    set
}
