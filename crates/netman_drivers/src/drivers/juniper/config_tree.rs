//! Turns the filtered `<configuration>` subtree Junos hands back from
//! `get-config` into driver-internal read models. Pure parsing, no I/O.

use super::range::MembershipToken;
use super::xml::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPortMode {
    Access,
    Trunk,
}

#[derive(Debug, Clone)]
pub struct RawVlan {
    pub name: Option<String>,
    /// The operator-supplied label, stored in `<description>`; this is what
    /// surfaces as the model's `Vlan.name` (the Junos `<name>` is internal).
    pub description: Option<String>,
    pub vlan_id: u16,
    /// `vlan.25` / `irb.25` / any `<family>.<unit>`, split on the last dot.
    pub l3_interface: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawAddress {
    pub address: std::net::IpAddr,
    pub prefix_length: u8,
}

/// One `<unit>`'s `family/inet` block — used to resolve a VLAN's
/// `l3-interface` (e.g. `irb.25`) back to addresses and access-groups.
#[derive(Debug, Clone, Default)]
pub struct RawL3Unit {
    pub addresses: Vec<RawAddress>,
    pub filter_in: Option<String>,
    pub filter_out: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawInterface {
    pub name: String,
    pub shutdown: bool,
    pub description: Option<String>,
    pub port_mode: Option<RawPortMode>,
    pub members: Vec<MembershipToken>,
    pub native_vlan_id: Option<u16>,
    /// `(unit name, parsed family/inet block)` for every unit carrying one;
    /// looked up by `ConfigSnapshot::find_l3_unit` via a VLAN's `l3-interface`.
    pub l3_units: Vec<(String, RawL3Unit)>,
    /// Derived from `ether-options/ieee-802.3ad/bundle` (e.g. `ae6` -> 6).
    pub bond_master: Option<u32>,
    pub link_speed: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawRstpEntry {
    pub interface: String,
    pub edge: bool,
    pub no_root_port: bool,
}

#[derive(Debug, Clone)]
pub struct RawLldpEntry {
    pub interface: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    pub vlans: Vec<RawVlan>,
    pub interfaces: Vec<RawInterface>,
    pub rstp: Vec<RawRstpEntry>,
    pub lldp: Vec<RawLldpEntry>,
}

impl ConfigSnapshot {
    /// `root` is whatever `Element::parse` returned for an `rpc-reply` (so
    /// `<rpc-reply><data><configuration>...`), a bare `<data>`, or a bare
    /// `<configuration>` — tests exercise the bare form directly.
    pub fn parse(root: &Element) -> ConfigSnapshot {
        let configuration = root
            .find("data")
            .and_then(|d| d.find("configuration"))
            .or_else(|| root.find("configuration"))
            .unwrap_or(root);
        let vlans = configuration
            .find("vlans")
            .map(parse_vlans)
            .unwrap_or_default();
        let interfaces = configuration
            .find("interfaces")
            .map(parse_interfaces)
            .unwrap_or_default();
        let (rstp, lldp) = configuration
            .find("protocols")
            .map(parse_protocols)
            .unwrap_or_default();
        ConfigSnapshot {
            vlans,
            interfaces,
            rstp,
            lldp,
        }
    }

    pub fn find_vlan(&self, number: u16) -> Option<&RawVlan> {
        self.vlans.iter().find(|v| v.vlan_id == number)
    }

    pub fn find_vlan_by_name(&self, name: &str) -> Option<&RawVlan> {
        self.vlans.iter().find(|v| v.name.as_deref() == Some(name))
    }

    pub fn vlan_name_to_id(&self, name: &str) -> Option<u16> {
        self.find_vlan_by_name(name).map(|v| v.vlan_id)
    }

    pub fn resolver(&self) -> impl Fn(&str) -> Option<u16> + '_ {
        move |name: &str| self.vlan_name_to_id(name)
    }

    pub fn find_interface(&self, name: &str) -> Option<&RawInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Resolves a VLAN's `l3-interface` (e.g. `irb.25`) to the `family/inet`
    /// block of that unit, by splitting on the last dot.
    pub fn find_l3_unit(&self, l3_interface: &str) -> Option<&RawL3Unit> {
        let (family, unit) = l3_interface.rsplit_once('.')?;
        let iface = self.find_interface(family)?;
        iface.l3_units.iter().find(|(name, _)| name == unit).map(|(_, l3)| l3)
    }

    pub fn find_rstp(&self, interface: &str) -> Option<&RawRstpEntry> {
        self.rstp.iter().find(|e| e.interface == interface)
    }

    pub fn find_lldp(&self, interface: &str) -> Option<&RawLldpEntry> {
        self.lldp.iter().find(|e| e.interface == interface)
    }
}

fn parse_vlans(vlans_el: &Element) -> Vec<RawVlan> {
    vlans_el
        .find_all("vlan")
        .map(|vlan| {
            let vlan_id = vlan
                .find("vlan-id")
                .and_then(Element::text_trimmed)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let name = vlan.find("name").and_then(Element::text_trimmed).map(String::from);
            let description = vlan
                .find("description")
                .and_then(Element::text_trimmed)
                .map(String::from);
            let l3_interface = vlan
                .find("l3-interface")
                .and_then(Element::text_trimmed)
                .map(String::from);
            RawVlan {
                name,
                description,
                vlan_id,
                l3_interface,
            }
        })
        .collect()
}

fn parse_interfaces(interfaces_el: &Element) -> Vec<RawInterface> {
    interfaces_el
        .find_all("interface")
        .map(|iface| {
            let name = iface
                .find("name")
                .and_then(Element::text_trimmed)
                .unwrap_or_default()
                .to_string();
            let shutdown = iface.find("disable").is_some();
            let description = iface
                .find("description")
                .and_then(Element::text_trimmed)
                .map(String::from);

            let mut members = Vec::new();
            let mut port_mode = None;
            let mut native_vlan_id = None;
            let mut l3_units = Vec::new();

            for unit in iface.find_all("unit") {
                let unit_name = unit
                    .find("name")
                    .and_then(Element::text_trimmed)
                    .unwrap_or("0")
                    .to_string();
                if let Some(family) = unit.find("family") {
                    if let Some(eth_sw) = family.find("ethernet-switching") {
                        port_mode = eth_sw
                            .find("port-mode")
                            .and_then(Element::text_trimmed)
                            .and_then(|m| match m {
                                "access" => Some(RawPortMode::Access),
                                "trunk" => Some(RawPortMode::Trunk),
                                _ => None,
                            });
                        if let Some(vlan_block) = eth_sw.find("vlan") {
                            members.extend(vlan_block.find_all("members").filter_map(parse_member_token));
                        }
                        native_vlan_id = eth_sw
                            .find("native-vlan-id")
                            .and_then(Element::text_trimmed)
                            .and_then(|s| s.parse().ok());
                    }
                    if let Some(inet) = family.find("inet") {
                        let mut l3 = RawL3Unit::default();
                        if let Some(filter) = inet.find("filter") {
                            l3.filter_in = filter
                                .find("input")
                                .and_then(|i| i.find("filter-name"))
                                .and_then(Element::text_trimmed)
                                .map(String::from);
                            l3.filter_out = filter
                                .find("output")
                                .and_then(|o| o.find("filter-name"))
                                .and_then(Element::text_trimmed)
                                .map(String::from);
                        }
                        l3.addresses = inet
                            .find_all("address")
                            .filter_map(|a| a.find("name").and_then(Element::text_trimmed))
                            .filter_map(parse_cidr)
                            .collect();
                        l3_units.push((unit_name, l3));
                    }
                }
            }

            let mut bond_master = None;
            let mut link_speed = None;
            if let Some(ether_options) = iface.find("ether-options") {
                if let Some(lag) = ether_options.find("ieee-802.3ad") {
                    bond_master = lag
                        .find("bundle")
                        .and_then(Element::text_trimmed)
                        .and_then(|b| b.strip_prefix("ae"))
                        .and_then(|n| n.parse().ok());
                }
                link_speed = ether_options
                    .find("speed")
                    .and_then(|speed| speed.children.first())
                    .map(|speed_el| speed_el.tag.trim_start_matches("ethernet-").to_string());
            }

            RawInterface {
                name,
                shutdown,
                description,
                port_mode,
                members,
                native_vlan_id,
                l3_units,
                bond_master,
                link_speed,
            }
        })
        .collect()
}

/// Parses Junos's `"a.b.c.d/n"` / `"addr/prefix"` address text.
fn parse_cidr(text: &str) -> Option<RawAddress> {
    let (address, prefix_length) = text.split_once('/')?;
    Some(RawAddress {
        address: address.parse().ok()?,
        prefix_length: prefix_length.parse().ok()?,
    })
}

fn parse_member_token(el: &Element) -> Option<MembershipToken> {
    let text = el.text_trimmed()?;
    if let Some((a, b)) = text.split_once('-') {
        if let (Ok(a), Ok(b)) = (a.parse(), b.parse()) {
            return Some(MembershipToken::Range(a, b));
        }
    }
    if let Ok(n) = text.parse() {
        return Some(MembershipToken::Literal(n));
    }
    Some(MembershipToken::Named(text.to_string()))
}

fn parse_protocols(protocols_el: &Element) -> (Vec<RawRstpEntry>, Vec<RawLldpEntry>) {
    let rstp = protocols_el
        .find("rstp")
        .map(|rstp_el| {
            rstp_el
                .find_all("interface")
                .map(|entry| RawRstpEntry {
                    interface: entry
                        .find("name")
                        .and_then(Element::text_trimmed)
                        .unwrap_or_default()
                        .to_string(),
                    edge: entry.find("edge").is_some(),
                    no_root_port: entry.find("no-root-port").is_some(),
                })
                .collect()
        })
        .unwrap_or_default();

    let lldp = protocols_el
        .find("lldp")
        .map(|lldp_el| {
            lldp_el
                .find_all("interface")
                .map(|entry| RawLldpEntry {
                    interface: entry
                        .find("name")
                        .and_then(Element::text_trimmed)
                        .unwrap_or_default()
                        .to_string(),
                    disabled: entry.find("disable").is_some(),
                })
                .collect()
        })
        .unwrap_or_default();

    (rstp, lldp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trunk_interface_with_range_members() {
        let xml = r#"<configuration>
          <interfaces>
            <interface>
              <name>ge-0/0/2</name>
              <unit>
                <name>0</name>
                <family>
                  <ethernet-switching>
                    <port-mode>trunk</port-mode>
                    <vlan><members>9-15</members></vlan>
                  </ethernet-switching>
                </family>
              </unit>
            </interface>
          </interfaces>
        </configuration>"#;
        let root = Element::parse(xml).unwrap();
        let snapshot = ConfigSnapshot::parse(&root);
        let iface = snapshot.find_interface("ge-0/0/2").unwrap();
        assert_eq!(iface.port_mode, Some(RawPortMode::Trunk));
        assert_eq!(iface.members, vec![MembershipToken::Range(9, 15)]);
    }

    #[test]
    fn parses_bond_member_and_vlan_l3_interface() {
        let xml = r#"<configuration>
          <vlans>
            <vlan><name>STANDARD</name><vlan-id>10</vlan-id><l3-interface>vlan.25</l3-interface></vlan>
          </vlans>
          <interfaces>
            <interface>
              <name>ge-0/0/6</name>
              <ether-options><ieee-802.3ad><bundle>ae6</bundle></ieee-802.3ad></ether-options>
            </interface>
          </interfaces>
        </configuration>"#;
        let root = Element::parse(xml).unwrap();
        let snapshot = ConfigSnapshot::parse(&root);
        assert_eq!(snapshot.find_vlan(10).unwrap().l3_interface.as_deref(), Some("vlan.25"));
        assert_eq!(snapshot.find_interface("ge-0/0/6").unwrap().bond_master, Some(6));
    }

    #[test]
    fn resolves_l3_unit_from_irb_family_and_unit() {
        let xml = r#"<configuration>
          <interfaces>
            <interface>
              <name>irb</name>
              <unit>
                <name>25</name>
                <family><inet>
                  <filter><input><filter-name>STANDARD-IN</filter-name></input></filter>
                  <address><name>10.0.25.1/24</name></address>
                </inet></family>
              </unit>
            </interface>
          </interfaces>
        </configuration>"#;
        let root = Element::parse(xml).unwrap();
        let snapshot = ConfigSnapshot::parse(&root);
        let l3 = snapshot.find_l3_unit("irb.25").unwrap();
        assert_eq!(l3.filter_in.as_deref(), Some("STANDARD-IN"));
        assert_eq!(l3.addresses.len(), 1);
        assert_eq!(l3.addresses[0].prefix_length, 24);
        assert!(snapshot.find_l3_unit("irb.99").is_none());
    }

    #[test]
    fn parses_vlan_name_and_description_separately() {
        let xml = r#"<configuration>
          <vlans>
            <vlan><name>STANDARD</name><vlan-id>10</vlan-id><description>my-description</description></vlan>
          </vlans>
        </configuration>"#;
        let root = Element::parse(xml).unwrap();
        let snapshot = ConfigSnapshot::parse(&root);
        let vlan = snapshot.find_vlan(10).unwrap();
        assert_eq!(vlan.name.as_deref(), Some("STANDARD"));
        assert_eq!(vlan.description.as_deref(), Some("my-description"));
    }
}
