//! Pure `(snapshot, requested change) -> Option<edit document>` functions for
//! every mutation in §4.2. No I/O; `mod.rs` serialises the result and sends
//! it over the wire. `None` means the operation is a true no-op and no
//! `edit-config` is necessary at all (§8.6's LLDP idempotence, et al).

use super::config_tree::{ConfigSnapshot, RawPortMode};
use super::range::{self, MembershipToken};
use super::xml::{Element, OP_DELETE, OP_REPLACE};
use netman_model::NetmanError;

fn configuration(children: impl IntoIterator<Item = Element>) -> Element {
    Element::new("configuration").children(children)
}

fn members_element(tokens: impl IntoIterator<Item = MembershipToken>) -> impl Iterator<Item = Element> {
    tokens
        .into_iter()
        .map(|t| Element::with_text("members", t.rendered()))
}

fn interfaces_edit(iface_name: &str, unit_family_children: Vec<Element>, extra: Vec<Element>) -> Element {
    let mut interface = Element::new("interface").child(Element::with_text("name", iface_name));
    if !unit_family_children.is_empty() {
        interface = interface.child(
            Element::new("unit").child(Element::with_text("name", "0")).child(
                Element::new("family").child(Element::new("ethernet-switching").children(unit_family_children)),
            ),
        );
    }
    for e in extra {
        interface = interface.child(e);
    }
    configuration([Element::new("interfaces").child(interface)])
}

pub fn add_vlan(snapshot: &ConfigSnapshot, number: u16, name: Option<&str>) -> Result<Element, NetmanError> {
    if snapshot.find_vlan(number).is_some() {
        return Err(NetmanError::VlanAlreadyExist(number));
    }
    let mut vlan = Element::new("vlan")
        .child(Element::with_text("name", format!("VLAN{number}")))
        .child(Element::with_text("vlan-id", number.to_string()));
    if let Some(name) = name {
        vlan = vlan.child(Element::with_text("description", name));
    }
    Ok(configuration([Element::new("vlans").child(vlan)]))
}

pub fn remove_vlan(snapshot: &ConfigSnapshot, number: u16) -> Result<Element, NetmanError> {
    let vlan = snapshot.find_vlan(number).ok_or(NetmanError::UnknownVlan(number))?;
    let vlan_name = vlan.name.clone().unwrap_or_else(|| format!("VLAN{number}"));

    let mut top = Vec::new();
    top.push(
        Element::new("vlans").child(
            Element::new("vlan")
                .operation(OP_DELETE)
                .child(Element::with_text("name", &vlan_name)),
        ),
    );

    let mut interface_edits = Vec::new();
    if let Some(l3) = &vlan.l3_interface {
        if let Some((family, unit)) = l3.rsplit_once('.') {
            interface_edits.push(
                Element::new("interface")
                    .child(Element::with_text("name", family))
                    .child(
                        Element::new("unit")
                            .operation(OP_DELETE)
                            .child(Element::with_text("name", unit)),
                    ),
            );
        }
    }

    let resolve = snapshot.resolver();
    for iface in &snapshot.interfaces {
        if iface.members.is_empty() {
            continue;
        }
        if let Some(removal) = range::remove(&iface.members, number, &resolve) {
            let mut vlan_block = Element::new("vlan").child(
                Element::with_text("members", removal.deleted.rendered()).operation(OP_DELETE),
            );
            for addition in removal.additions {
                vlan_block = vlan_block.child(Element::with_text("members", addition.rendered()));
            }
            interface_edits.push(
                Element::new("interface")
                    .child(Element::with_text("name", &iface.name))
                    .child(Element::new("unit").child(Element::with_text("name", "0")).child(
                        Element::new("family").child(Element::new("ethernet-switching").child(vlan_block)),
                    )),
            );
        }
    }
    if !interface_edits.is_empty() {
        top.push(Element::new("interfaces").children(interface_edits));
    }
    Ok(configuration(top))
}

pub fn set_access_mode(snapshot: &ConfigSnapshot, interface: &str) -> Result<Option<Element>, NetmanError> {
    let raw = snapshot.find_interface(interface);
    let (port_mode, members, native) = match raw {
        Some(r) => (r.port_mode, &r.members, r.native_vlan_id),
        None => (None, &Vec::new(), None),
    };
    if port_mode == Some(RawPortMode::Access) {
        return Ok(None);
    }
    let mut children = vec![Element::with_text("port-mode", "access")];
    if !members.is_empty() {
        children.push(Element::new("vlan").operation(OP_DELETE));
    }
    if native.is_some() {
        children.push(Element::new("native-vlan-id").operation(OP_DELETE));
    }
    Ok(Some(interfaces_edit(interface, children, Vec::new())))
}

pub fn set_trunk_mode(snapshot: &ConfigSnapshot, interface: &str) -> Result<Option<Element>, NetmanError> {
    let raw = snapshot.find_interface(interface);
    let (port_mode, members) = match raw {
        Some(r) => (r.port_mode, &r.members),
        None => (None, &Vec::new()),
    };
    if port_mode == Some(RawPortMode::Trunk) {
        return Ok(None);
    }
    let mut children = vec![Element::with_text("port-mode", "trunk")];
    if !members.is_empty() {
        children.push(Element::new("vlan").operation(OP_DELETE));
    }
    Ok(Some(interfaces_edit(interface, children, Vec::new())))
}

pub fn set_access_vlan(
    snapshot: &ConfigSnapshot,
    interface: &str,
    number: u16,
) -> Result<Option<Element>, NetmanError> {
    if snapshot.find_vlan(number).is_none() {
        return Err(NetmanError::UnknownVlan(number));
    }
    let raw = snapshot.find_interface(interface);
    let (port_mode, members) = match raw {
        Some(r) => (r.port_mode, r.members.clone()),
        None => (None, Vec::new()),
    };
    if port_mode == Some(RawPortMode::Trunk) {
        return Err(NetmanError::InterfaceInWrongPortMode {
            interface: interface.to_string(),
            mode: "trunk".to_string(),
        });
    }
    if port_mode.is_none() && members == vec![MembershipToken::Literal(number)] {
        return Ok(None);
    }
    let mut children = Vec::new();
    for existing in &members {
        children.push(
            Element::with_text("members", existing.rendered()).operation(OP_DELETE),
        );
    }
    children.push(Element::with_text("members", number.to_string()));
    let vlan_block = Element::new("vlan").children(children);
    let mut unit_children = vec![vlan_block];
    if port_mode.is_none() {
        unit_children.insert(0, Element::with_text("port-mode", "access"));
    }
    Ok(Some(interfaces_edit(interface, unit_children, Vec::new())))
}

pub fn remove_access_vlan(snapshot: &ConfigSnapshot, interface: &str) -> Result<Element, NetmanError> {
    let raw = snapshot
        .find_interface(interface)
        .filter(|r| !r.members.is_empty())
        .ok_or_else(|| NetmanError::AccessVlanNotSet(interface.to_string()))?;
    let deletes: Vec<Element> = raw
        .members
        .iter()
        .map(|m| Element::with_text("members", m.rendered()).operation(OP_DELETE))
        .collect();
    Ok(interfaces_edit(interface, vec![Element::new("vlan").children(deletes)], Vec::new()))
}

pub fn configure_native_vlan(
    snapshot: &ConfigSnapshot,
    interface: &str,
    number: u16,
) -> Result<Element, NetmanError> {
    let raw = snapshot.find_interface(interface);
    let port_mode = raw.and_then(|r| r.port_mode);
    if port_mode == Some(RawPortMode::Access) {
        return Err(NetmanError::InterfaceInWrongPortMode {
            interface: interface.to_string(),
            mode: "access".to_string(),
        });
    }
    if let Some(r) = raw {
        let resolve = snapshot.resolver();
        if !range::tokens_containing(&r.members, number, &resolve).is_empty() {
            return Err(NetmanError::VlanAlreadyInTrunk {
                interface: interface.to_string(),
                vlan: number,
            });
        }
    }
    let mut children = vec![Element::with_text("native-vlan-id", number.to_string())];
    if port_mode.is_none() {
        children.insert(0, Element::with_text("port-mode", "trunk"));
    }
    Ok(interfaces_edit(interface, children, Vec::new()))
}

pub fn remove_native_vlan(snapshot: &ConfigSnapshot, interface: &str) -> Result<Element, NetmanError> {
    snapshot
        .find_interface(interface)
        .and_then(|r| r.native_vlan_id)
        .ok_or_else(|| NetmanError::NativeVlanNotSet(interface.to_string()))?;
    Ok(interfaces_edit(
        interface,
        vec![Element::new("native-vlan-id").operation(OP_DELETE)],
        Vec::new(),
    ))
}

pub fn add_trunk_vlan(
    snapshot: &ConfigSnapshot,
    interface: &str,
    number: u16,
) -> Result<Element, NetmanError> {
    if snapshot.find_vlan(number).is_none() {
        return Err(NetmanError::UnknownVlan(number));
    }
    let raw = snapshot.find_interface(interface);
    let port_mode = raw.and_then(|r| r.port_mode);
    if port_mode == Some(RawPortMode::Access) {
        return Err(NetmanError::InterfaceInWrongPortMode {
            interface: interface.to_string(),
            mode: "access".to_string(),
        });
    }
    let mut children = vec![Element::new("vlan").child(Element::with_text("members", number.to_string()))];
    if port_mode.is_none() {
        children.insert(0, Element::with_text("port-mode", "trunk"));
    }
    Ok(interfaces_edit(interface, children, Vec::new()))
}

pub fn remove_trunk_vlan(
    snapshot: &ConfigSnapshot,
    interface: &str,
    number: u16,
) -> Result<Element, NetmanError> {
    let raw = snapshot.find_interface(interface).ok_or_else(|| NetmanError::TrunkVlanNotSet {
        interface: interface.to_string(),
        vlan: number,
    })?;
    let resolve = snapshot.resolver();
    let removal = range::remove(&raw.members, number, &resolve).ok_or_else(|| NetmanError::TrunkVlanNotSet {
        interface: interface.to_string(),
        vlan: number,
    })?;
    let mut vlan_block =
        Element::new("vlan").child(Element::with_text("members", removal.deleted.rendered()).operation(OP_DELETE));
    for addition in removal.additions {
        vlan_block = vlan_block.child(Element::with_text("members", addition.rendered()));
    }
    Ok(interfaces_edit(interface, vec![vlan_block], Vec::new()))
}

pub fn set_interface_description(interface: &str, text: &str) -> Element {
    interfaces_edit(interface, vec![Element::with_text("description", text)], Vec::new())
}

pub fn remove_interface_description(
    snapshot: &ConfigSnapshot,
    interface: &str,
) -> Result<Element, NetmanError> {
    snapshot
        .find_interface(interface)
        .and_then(|r| r.description.as_ref())
        .ok_or_else(|| NetmanError::UnknownInterface(interface.to_string()))?;
    Ok(interfaces_edit(interface, vec![Element::new("description").operation(OP_DELETE)], Vec::new()))
}

pub fn edit_interface_spanning_tree(snapshot: &ConfigSnapshot, interface: &str, edge: bool) -> Option<Element> {
    let entry = snapshot.find_rstp(interface);
    let has_edge = entry.map(|e| e.edge).unwrap_or(false);
    if edge == has_edge {
        return None;
    }
    let edge_el = if edge {
        Element::new("edge")
    } else {
        Element::new("edge").operation(OP_DELETE)
    };
    Some(configuration([Element::new("protocols").child(
        Element::new("rstp").child(
            Element::new("interface")
                .child(Element::with_text("name", interface))
                .child(edge_el),
        ),
    )]))
}

pub fn shutdown_interface(snapshot: &ConfigSnapshot, interface: &str) -> Option<Element> {
    let already = snapshot.find_interface(interface).map(|r| r.shutdown).unwrap_or(false);
    if already {
        return None;
    }
    Some(interfaces_edit(interface, Vec::new(), vec![Element::new("disable")]))
}

pub fn openup_interface(snapshot: &ConfigSnapshot, interface: &str) -> Option<Element> {
    let shutdown = snapshot.find_interface(interface).map(|r| r.shutdown).unwrap_or(false);
    if !shutdown {
        return None;
    }
    Some(interfaces_edit(
        interface,
        Vec::new(),
        vec![Element::new("disable").operation(OP_DELETE)],
    ))
}

pub fn enable_lldp(snapshot: &ConfigSnapshot, interface: &str, enabled: bool) -> Option<Element> {
    let entry = snapshot.find_lldp(interface);
    let currently_disabled = entry.map(|e| e.disabled).unwrap_or(false);
    if enabled {
        if !currently_disabled {
            return None;
        }
        Some(configuration([Element::new("protocols").child(
            Element::new("lldp").child(
                Element::new("interface")
                    .child(Element::with_text("name", interface))
                    .child(Element::new("disable").operation(OP_DELETE)),
            ),
        )]))
    } else {
        if currently_disabled {
            return None;
        }
        Some(configuration([Element::new("protocols").child(
            Element::new("lldp").child(
                Element::new("interface")
                    .child(Element::with_text("name", interface))
                    .child(Element::new("disable")),
            ),
        )]))
    }
}

pub fn bond_interface_name(number: u32) -> String {
    format!("ae{number}")
}

pub fn add_bond(snapshot: &ConfigSnapshot, number: u32) -> Result<Element, NetmanError> {
    let name = bond_interface_name(number);
    if snapshot.find_interface(&name).is_some() {
        return Err(NetmanError::BondAlreadyExist(number));
    }
    Ok(configuration([Element::new("interfaces").child(
        Element::new("interface").child(Element::with_text("name", &name)).child(
            Element::new("aggregated-ether-options").child(
                Element::new("lacp")
                    .child(Element::new("active"))
                    .child(Element::with_text("periodic", "slow")),
            ),
        ),
    )]))
}

pub fn remove_bond(snapshot: &ConfigSnapshot, number: u32) -> Result<Element, NetmanError> {
    let name = bond_interface_name(number);
    if snapshot.find_interface(&name).is_none() {
        return Err(NetmanError::UnknownBond(number));
    }
    let mut interfaces = vec![Element::new("interface").operation(OP_DELETE).child(Element::with_text("name", &name))];
    for member in snapshot.interfaces.iter().filter(|i| i.bond_master == Some(number)) {
        interfaces.push(
            Element::new("interface")
                .child(Element::with_text("name", &member.name))
                .child(
                    Element::new("ether-options")
                        .child(Element::new("ieee-802.3ad").operation(OP_DELETE)),
                ),
        );
    }
    let mut top = vec![Element::new("interfaces").children(interfaces)];
    if snapshot.find_rstp(&name).is_some() {
        top.push(Element::new("protocols").child(
            Element::new("rstp").child(
                Element::new("interface")
                    .operation(OP_DELETE)
                    .child(Element::with_text("name", &name)),
            ),
        ));
    }
    Ok(configuration(top))
}

pub fn add_interface_to_bond(
    snapshot: &ConfigSnapshot,
    interface: &str,
    number: u32,
    link_speed: Option<&str>,
) -> Element {
    let mut ether_options =
        Element::new("ether-options").child(Element::new("ieee-802.3ad").child(Element::with_text("bundle", bond_interface_name(number))));
    if let Some(speed) = link_speed {
        ether_options = ether_options.child(
            Element::new("speed").child(Element::new(format!("ethernet-{speed}"))),
        );
    }
    let interface_el = Element::new("interface")
        .operation(OP_REPLACE)
        .child(Element::with_text("name", interface))
        .child(ether_options);
    let mut top = vec![Element::new("interfaces").child(interface_el)];
    if snapshot.find_rstp(interface).is_some() {
        top.push(
            Element::new("protocols").child(
                Element::new("rstp").child(
                    Element::new("interface")
                        .operation(OP_DELETE)
                        .child(Element::with_text("name", interface)),
                ),
            ),
        );
    }
    configuration(top)
}

pub fn remove_interface_from_bond(snapshot: &ConfigSnapshot, interface: &str) -> Result<Element, NetmanError> {
    snapshot
        .find_interface(interface)
        .and_then(|r| r.bond_master)
        .ok_or_else(|| NetmanError::InterfaceNotInBond(interface.to_string()))?;
    Ok(interfaces_edit(
        interface,
        Vec::new(),
        vec![Element::new("ether-options").child(Element::new("ieee-802.3ad").operation(OP_DELETE))],
    ))
}

pub fn set_bond_link_speed(snapshot: &ConfigSnapshot, number: u32, speed: &str) -> Result<Element, NetmanError> {
    let name = bond_interface_name(number);
    if snapshot.find_interface(&name).is_none() {
        return Err(NetmanError::UnknownBond(number));
    }
    let members: Vec<Element> = snapshot
        .interfaces
        .iter()
        .filter(|i| i.bond_master == Some(number))
        .map(|member| {
            Element::new("interface")
                .operation(OP_REPLACE)
                .child(Element::with_text("name", &member.name))
                .child(
                    Element::new("ether-options").child(
                        Element::new("speed").child(Element::new(format!("ethernet-{speed}"))),
                    ),
                )
        })
        .collect();
    Ok(configuration([Element::new("interfaces").children(members)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_from(xml: &str) -> ConfigSnapshot {
        ConfigSnapshot::parse(&Element::parse(xml).unwrap())
    }

    #[test]
    fn add_vlan_puts_supplied_name_in_description() {
        let snapshot = snapshot_from("<configuration><vlans/></configuration>");
        let edit = add_vlan(&snapshot, 1000, Some("Shizzle")).unwrap().to_xml();
        assert!(edit.contains("<name>VLAN1000</name>"));
        assert!(edit.contains("<description>Shizzle</description>"));
    }

    #[test]
    fn add_vlan_without_name_omits_description() {
        let snapshot = snapshot_from("<configuration><vlans/></configuration>");
        let edit = add_vlan(&snapshot, 1000, None).unwrap().to_xml();
        assert!(edit.contains("<name>VLAN1000</name>"));
        assert!(!edit.contains("<description>"));
    }

    #[test]
    fn remove_vlan_cascades_across_interfaces() {
        let xml = r#"<configuration>
          <vlans><vlan><name>STANDARD</name><vlan-id>10</vlan-id><l3-interface>vlan.25</l3-interface></vlan></vlans>
          <interfaces>
            <interface><name>ge-0/0/1</name><unit><name>0</name><family><ethernet-switching>
              <port-mode>trunk</port-mode><vlan><members>9</members><members>10</members><members>11</members></vlan>
            </ethernet-switching></family></unit></interface>
            <interface><name>ge-0/0/2</name><unit><name>0</name><family><ethernet-switching>
              <port-mode>trunk</port-mode><vlan><members>9-15</members></vlan>
            </ethernet-switching></family></unit></interface>
            <interface><name>ge-0/0/3</name><unit><name>0</name><family><ethernet-switching>
              <port-mode>access</port-mode><vlan><members>12</members></vlan>
            </ethernet-switching></family></unit></interface>
            <interface><name>ge-0/0/4</name><unit><name>0</name><family><ethernet-switching>
              <port-mode>access</port-mode><vlan><members>STANDARD</members></vlan>
            </ethernet-switching></family></unit></interface>
          </interfaces>
        </configuration>"#;
        let snapshot = snapshot_from(xml);
        let edit = remove_vlan(&snapshot, 10).unwrap();
        let rendered = edit.to_xml();
        assert!(rendered.contains(r#"<vlan operation="delete"><name>STANDARD</name></vlan>"#));
        assert!(rendered.contains("<unit operation=\"delete\"><name>25</name></unit>"));
        assert!(!rendered.contains("ge-0/0/3"));
        assert_eq!(
            snapshot.interfaces.iter().find(|i| i.name == "ge-0/0/4").unwrap().members,
            vec![MembershipToken::Named("STANDARD".into())]
        );
    }

    #[test]
    fn configure_native_vlan_rejects_collision() {
        let xml = r#"<configuration><interfaces><interface><name>ge-0/0/6</name><unit><name>0</name><family><ethernet-switching>
            <port-mode>trunk</port-mode><vlan><members>999-1001</members></vlan>
        </ethernet-switching></family></unit></interface></interfaces></configuration>"#;
        let snapshot = snapshot_from(xml);
        let err = configure_native_vlan(&snapshot, "ge-0/0/6", 1000).unwrap_err();
        assert_eq!(
            err,
            NetmanError::VlanAlreadyInTrunk {
                interface: "ge-0/0/6".into(),
                vlan: 1000
            }
        );
    }

    #[test]
    fn lldp_toggle_is_idempotent() {
        let xml = r#"<configuration><protocols><lldp><interface><name>ge-0/0/1</name><disable/></interface></lldp></protocols></configuration>"#;
        let snapshot = snapshot_from(xml);
        assert!(enable_lldp(&snapshot, "ge-0/0/1", false).is_none());
        let edit = enable_lldp(&snapshot, "ge-0/0/1", true).unwrap();
        assert!(edit.to_xml().contains(r#"<disable operation="delete"/>"#));
    }

    #[test]
    fn remove_bond_deletes_rstp_and_member_lag_blocks() {
        let xml = r#"<configuration>
          <interfaces>
            <interface><name>ae6</name><aggregated-ether-options><lacp><active/><periodic>slow</periodic></lacp></aggregated-ether-options></interface>
            <interface><name>ge-0/0/6</name><ether-options><ieee-802.3ad><bundle>ae6</bundle></ieee-802.3ad></ether-options></interface>
          </interfaces>
          <protocols><rstp><interface><name>ae6</name><edge/></interface></rstp></protocols>
        </configuration>"#;
        let snapshot = snapshot_from(xml);
        let edit = remove_bond(&snapshot, 6).unwrap().to_xml();
        assert!(edit.contains(r#"<interface operation="delete"><name>ae6</name></interface>"#));
        assert!(edit.contains("ge-0/0/6"));
        assert!(edit.contains(r#"<ieee-802.3ad operation="delete"/>"#));
        assert!(edit.contains(r#"<interface operation="delete"><name>ae6</name></interface>"#));
    }

    #[test]
    fn add_interface_to_bond_sets_speed_and_clears_rstp() {
        let xml = r#"<configuration><protocols><rstp><interface><name>ge-0/0/6</name><edge/></interface></rstp></protocols></configuration>"#;
        let snapshot = snapshot_from(xml);
        let edit = add_interface_to_bond(&snapshot, "ge-0/0/6", 6, Some("1g")).to_xml();
        assert!(edit.contains("<ethernet-1g/>"));
        assert!(edit.contains(r#"<interface operation="delete"><name>ge-0/0/6</name></interface>"#));
    }
}
