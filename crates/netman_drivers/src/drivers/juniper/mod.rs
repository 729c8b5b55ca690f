//! Ties the wire session, config parser and edit builder together behind
//! the `SwitchDriver` contract. Every mutating method follows the same
//! shape: fetch a filtered snapshot, compute the edit, send it, classify
//! the reply.

pub mod config_tree;
pub mod edit;
pub mod errors;
pub mod netconf;
pub mod range;
pub mod xml;

use self::config_tree::{ConfigSnapshot, RawInterface, RawPortMode};
use self::errors::{classify, ErrorContext, RpcOutcome};
use self::netconf::{Datastore, NetconfSession};
use self::range::MembershipToken;
use self::xml::Element;
use crate::contract::SwitchDriver;
use async_trait::async_trait;
use netman_model::{
    AccessGroups, Bond, Interface, IpNetwork, NetmanError, NetmanResult, PortMode,
    SpanningTreeConfig, SwitchDescriptor, SwitchingAttributes, Vlan,
};
use std::collections::BTreeSet;
use tracing::warn;

const READ_FILTER: &str =
    "<configuration><vlans/><interfaces/><protocols><rstp/><lldp/></protocols></configuration>";

pub struct JuniperDriver {
    descriptor: SwitchDescriptor,
    session: Option<NetconfSession>,
}

impl JuniperDriver {
    pub fn new(descriptor: SwitchDescriptor) -> Self {
        Self {
            descriptor,
            session: None,
        }
    }

    fn session_mut(&mut self) -> NetmanResult<&mut NetconfSession> {
        self.session
            .as_mut()
            .ok_or_else(|| NetmanError::Unavailable(format!("{} is not connected", self.descriptor.hostname)))
    }

    async fn fetch_snapshot(&mut self) -> NetmanResult<ConfigSnapshot> {
        let reply = self
            .session_mut()?
            .get_config(Datastore::Running, READ_FILTER)
            .await
            .map_err(to_unavailable)?;
        if !reply.ok() {
            return Err(fatal_or_generic(&reply, &ErrorContext::default()));
        }
        let root = Element::parse(&reply.raw).map_err(to_unavailable)?;
        Ok(ConfigSnapshot::parse(&root))
    }

    async fn send_edit(&mut self, edit: Element, ctx: ErrorContext<'_>) -> NetmanResult<()> {
        let reply = self
            .session_mut()?
            .edit_config(&edit.to_xml())
            .await
            .map_err(to_unavailable)?;
        match classify(&reply, &ctx) {
            RpcOutcome::Ok => Ok(()),
            RpcOutcome::Retryable => Err(NetmanError::OperationNotCompleted(
                "configuration database modified".to_string(),
            )),
            RpcOutcome::Fatal(err) => Err(err),
        }
    }

    async fn send_edit_for(&mut self, interface: &str, edit: Element) -> NetmanResult<()> {
        self.send_edit(edit, ErrorContext { interface: Some(interface) }).await
    }

    async fn ensure_lock(&mut self) -> NetmanResult<()> {
        let reply = self.session_mut()?.lock_candidate().await.map_err(to_unavailable)?;
        match classify(&reply, &ErrorContext::default()) {
            RpcOutcome::Ok => Ok(()),
            RpcOutcome::Fatal(err) => Err(err),
            RpcOutcome::Retryable => {
                self.session_mut()?.discard_changes().await.map_err(to_unavailable)?;
                let reply = self.session_mut()?.lock_candidate().await.map_err(to_unavailable)?;
                match classify(&reply, &ErrorContext::default()) {
                    RpcOutcome::Ok => Ok(()),
                    RpcOutcome::Fatal(err) => Err(err),
                    RpcOutcome::Retryable => Err(NetmanError::OperationNotCompleted(
                        "configuration database modified".to_string(),
                    )),
                }
            }
        }
    }
}

fn to_unavailable(err: anyhow::Error) -> NetmanError {
    NetmanError::Unavailable(err.to_string())
}

fn fatal_or_generic(reply: &netconf::RpcReply, ctx: &ErrorContext) -> NetmanError {
    match classify(reply, ctx) {
        RpcOutcome::Fatal(err) => err,
        _ => NetmanError::OperationNotCompleted(
            reply
                .error_errors()
                .next()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "device reported an unclassified error".to_string()),
        ),
    }
}

fn is_bond_interface_name(name: &str) -> bool {
    name.strip_prefix("ae").is_some_and(|n| n.parse::<u32>().is_ok())
}

fn vlan_from_raw(raw: &config_tree::RawVlan, snapshot: &ConfigSnapshot) -> Vlan {
    let mut vlan = Vlan::new(raw.vlan_id);
    vlan.name = raw.description.clone();
    if let Some(l3) = raw.l3_interface.as_deref().and_then(|l3| snapshot.find_l3_unit(l3)) {
        vlan.access_groups = AccessGroups {
            inbound: l3.filter_in.clone(),
            outbound: l3.filter_out.clone(),
        };
        vlan.ips = l3
            .addresses
            .iter()
            .map(|a| IpNetwork {
                address: a.address,
                prefix_length: a.prefix_length,
            })
            .collect();
    }
    vlan
}

fn access_vlan_of(raw: &RawInterface, snapshot: &ConfigSnapshot) -> Option<u16> {
    if raw.port_mode != Some(RawPortMode::Access) {
        return None;
    }
    raw.members.first().and_then(|token| match token {
        MembershipToken::Literal(n) => Some(*n),
        MembershipToken::Named(name) => snapshot.vlan_name_to_id(name),
        MembershipToken::Range(_, _) => None,
    })
}

fn trunk_vlans_of(raw: &RawInterface, snapshot: &ConfigSnapshot) -> BTreeSet<u16> {
    let mut set = BTreeSet::new();
    if raw.port_mode != Some(RawPortMode::Trunk) {
        return set;
    }
    let resolve = snapshot.resolver();
    for token in &raw.members {
        match token {
            MembershipToken::Literal(n) => {
                set.insert(*n);
            }
            MembershipToken::Range(a, b) => set.extend(*a..=*b),
            MembershipToken::Named(name) => {
                if let Some(n) = resolve(name) {
                    set.insert(n);
                }
            }
        }
    }
    set
}

fn interface_from_raw(raw: &RawInterface, snapshot: &ConfigSnapshot) -> Interface {
    let port_mode = if raw.bond_master.is_some() {
        PortMode::BondMember
    } else {
        match raw.port_mode {
            Some(RawPortMode::Access) => PortMode::Access,
            Some(RawPortMode::Trunk) => PortMode::Trunk,
            None => PortMode::Unset,
        }
    };
    let spanning_tree = snapshot
        .find_rstp(&raw.name)
        .map(|e| SpanningTreeConfig {
            edge: e.edge,
            no_root_port: e.no_root_port,
        })
        .unwrap_or_default();
    let lldp_enabled = snapshot.find_lldp(&raw.name).map(|e| !e.disabled).unwrap_or(true);

    let mut interface = Interface::new(raw.name.clone());
    interface.bond_master = raw.bond_master;
    interface.switching = SwitchingAttributes {
        shutdown: raw.shutdown,
        port_mode,
        access_vlan: access_vlan_of(raw, snapshot),
        trunk_native_vlan: raw.native_vlan_id,
        trunk_vlans: trunk_vlans_of(raw, snapshot),
        spanning_tree,
        lldp_enabled,
        description: raw.description.clone(),
    };
    interface
}

fn bond_from_raw(ae: &RawInterface, number: u32, snapshot: &ConfigSnapshot) -> Bond {
    let mut bond = Bond::new(number, ae.name.clone());
    bond.members = snapshot
        .interfaces
        .iter()
        .filter(|i| i.bond_master == Some(number))
        .map(|i| i.name.clone())
        .collect();
    bond.link_speed = snapshot
        .interfaces
        .iter()
        .find(|i| i.bond_master == Some(number) && i.link_speed.is_some())
        .and_then(|i| i.link_speed.clone());
    bond.interface = interface_from_raw(ae, snapshot);
    bond
}

#[async_trait]
impl SwitchDriver for JuniperDriver {
    async fn connect(&mut self) -> NetmanResult<()> {
        let session = NetconfSession::connect(&self.descriptor).await.map_err(to_unavailable)?;
        self.session = Some(session);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.close_session().await {
                warn!(target: "drivers::juniper", host = %self.descriptor.hostname, "close-session failed: {err}");
            }
        }
    }

    async fn start_transaction(&mut self) -> NetmanResult<()> {
        self.ensure_lock().await
    }

    async fn end_transaction(&mut self) -> NetmanResult<()> {
        let reply = self.session_mut()?.unlock_candidate().await.map_err(to_unavailable)?;
        if reply.ok() {
            Ok(())
        } else {
            Err(fatal_or_generic(&reply, &ErrorContext::default()))
        }
    }

    async fn commit_transaction(&mut self) -> NetmanResult<()> {
        let reply = self.session_mut()?.commit().await.map_err(to_unavailable)?;
        if reply.ok() {
            return Ok(());
        }
        let reason = reply
            .error_errors()
            .next()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "commit failed".to_string());
        let _ = self.session_mut()?.discard_changes().await;
        Err(NetmanError::OperationNotCompleted(reason))
    }

    async fn rollback_transaction(&mut self) -> NetmanResult<()> {
        let reply = self.session_mut()?.discard_changes().await.map_err(to_unavailable)?;
        if reply.ok() {
            Ok(())
        } else {
            Err(fatal_or_generic(&reply, &ErrorContext::default()))
        }
    }

    async fn get_vlans(&mut self) -> NetmanResult<Vec<Vlan>> {
        let snapshot = self.fetch_snapshot().await?;
        Ok(snapshot.vlans.iter().map(|v| vlan_from_raw(v, &snapshot)).collect())
    }

    async fn get_vlan(&mut self, number: u16) -> NetmanResult<Vlan> {
        let snapshot = self.fetch_snapshot().await?;
        let raw = snapshot.find_vlan(number).ok_or(NetmanError::UnknownVlan(number))?;
        Ok(vlan_from_raw(raw, &snapshot))
    }

    async fn get_interfaces(&mut self) -> NetmanResult<Vec<Interface>> {
        let snapshot = self.fetch_snapshot().await?;
        Ok(snapshot
            .interfaces
            .iter()
            .filter(|i| !is_bond_interface_name(&i.name))
            .map(|i| interface_from_raw(i, &snapshot))
            .collect())
    }

    async fn get_interface(&mut self, name: &str) -> NetmanResult<Interface> {
        let snapshot = self.fetch_snapshot().await?;
        let raw = snapshot
            .find_interface(name)
            .ok_or_else(|| NetmanError::UnknownInterface(name.to_string()))?;
        Ok(interface_from_raw(raw, &snapshot))
    }

    async fn get_bonds(&mut self) -> NetmanResult<Vec<Bond>> {
        let snapshot = self.fetch_snapshot().await?;
        Ok(snapshot
            .interfaces
            .iter()
            .filter_map(|i| {
                i.name
                    .strip_prefix("ae")
                    .and_then(|n| n.parse::<u32>().ok())
                    .map(|number| bond_from_raw(i, number, &snapshot))
            })
            .collect())
    }

    async fn get_bond(&mut self, number: u32) -> NetmanResult<Bond> {
        let snapshot = self.fetch_snapshot().await?;
        let name = edit::bond_interface_name(number);
        let raw = snapshot
            .find_interface(&name)
            .ok_or(NetmanError::UnknownBond(number))?;
        Ok(bond_from_raw(raw, number, &snapshot))
    }

    async fn add_vlan(&mut self, number: u16, name: Option<&str>) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::add_vlan(&snapshot, number, name)?;
        self.send_edit(edit, ErrorContext::default()).await
    }

    async fn remove_vlan(&mut self, number: u16) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::remove_vlan(&snapshot, number)?;
        self.send_edit(edit, ErrorContext::default()).await
    }

    async fn set_access_mode(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        match edit::set_access_mode(&snapshot, interface)? {
            Some(edit) => self.send_edit_for(interface, edit).await,
            None => Ok(()),
        }
    }

    async fn set_trunk_mode(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        match edit::set_trunk_mode(&snapshot, interface)? {
            Some(edit) => self.send_edit_for(interface, edit).await,
            None => Ok(()),
        }
    }

    async fn set_access_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        match edit::set_access_vlan(&snapshot, interface, number)? {
            Some(edit) => self.send_edit_for(interface, edit).await,
            None => Ok(()),
        }
    }

    async fn remove_access_vlan(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::remove_access_vlan(&snapshot, interface)?;
        self.send_edit_for(interface, edit).await
    }

    async fn configure_native_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::configure_native_vlan(&snapshot, interface, number)?;
        self.send_edit_for(interface, edit).await
    }

    async fn remove_native_vlan(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::remove_native_vlan(&snapshot, interface)?;
        self.send_edit_for(interface, edit).await
    }

    async fn add_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::add_trunk_vlan(&snapshot, interface, number)?;
        self.send_edit_for(interface, edit).await
    }

    async fn remove_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::remove_trunk_vlan(&snapshot, interface, number)?;
        self.send_edit_for(interface, edit).await
    }

    async fn set_interface_description(&mut self, interface: &str, text: &str) -> NetmanResult<()> {
        let edit = edit::set_interface_description(interface, text);
        self.send_edit_for(interface, edit).await
    }

    async fn remove_interface_description(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::remove_interface_description(&snapshot, interface)?;
        self.send_edit_for(interface, edit).await
    }

    async fn edit_interface_spanning_tree(&mut self, interface: &str, edge: bool) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        match edit::edit_interface_spanning_tree(&snapshot, interface, edge) {
            Some(edit) => self.send_edit_for(interface, edit).await,
            None => Ok(()),
        }
    }

    async fn openup_interface(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        match edit::openup_interface(&snapshot, interface) {
            Some(edit) => self.send_edit_for(interface, edit).await,
            None => Ok(()),
        }
    }

    async fn shutdown_interface(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        match edit::shutdown_interface(&snapshot, interface) {
            Some(edit) => self.send_edit_for(interface, edit).await,
            None => Ok(()),
        }
    }

    async fn enable_lldp(&mut self, interface: &str, enabled: bool) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        match edit::enable_lldp(&snapshot, interface, enabled) {
            Some(edit) => self.send_edit_for(interface, edit).await,
            None => Ok(()),
        }
    }

    async fn add_bond(&mut self, number: u32) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::add_bond(&snapshot, number)?;
        self.send_edit(edit, ErrorContext::default()).await
    }

    async fn remove_bond(&mut self, number: u32) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::remove_bond(&snapshot, number)?;
        self.send_edit(edit, ErrorContext::default()).await
    }

    async fn add_interface_to_bond(&mut self, interface: &str, number: u32) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let link_speed = snapshot
            .interfaces
            .iter()
            .find(|i| i.bond_master == Some(number))
            .and_then(|i| i.link_speed.clone());
        let edit = edit::add_interface_to_bond(&snapshot, interface, number, link_speed.as_deref());
        self.send_edit_for(interface, edit).await
    }

    async fn remove_interface_from_bond(&mut self, interface: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::remove_interface_from_bond(&snapshot, interface)?;
        self.send_edit_for(interface, edit).await
    }

    async fn set_bond_link_speed(&mut self, number: u32, speed: &str) -> NetmanResult<()> {
        let snapshot = self.fetch_snapshot().await?;
        let edit = edit::set_bond_link_speed(&snapshot, number, speed)?;
        self.send_edit(edit, ErrorContext::default()).await
    }

    fn bond_interface_name(&self, number: u32) -> String {
        edit::bond_interface_name(number)
    }
}
