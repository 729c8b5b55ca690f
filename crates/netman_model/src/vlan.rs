use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Direction of an interface access-group (ACL) binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessGroupDirection {
    In,
    Out,
}

pub const IN: AccessGroupDirection = AccessGroupDirection::In;
pub const OUT: AccessGroupDirection = AccessGroupDirection::Out;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessGroups {
    #[serde(rename = "in")]
    pub inbound: Option<String>,
    #[serde(rename = "out")]
    pub outbound: Option<String>,
}

impl AccessGroups {
    pub fn get(&self, direction: AccessGroupDirection) -> Option<&str> {
        match direction {
            AccessGroupDirection::In => self.inbound.as_deref(),
            AccessGroupDirection::Out => self.outbound.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpNetwork {
    pub address: IpAddr,
    pub prefix_length: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vlan {
    pub number: u16,
    pub name: Option<String>,
    #[serde(default)]
    pub access_groups: AccessGroups,
    #[serde(default)]
    pub ips: Vec<IpNetwork>,
}

impl Vlan {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            name: None,
            access_groups: AccessGroups::default(),
            ips: Vec::new(),
        }
    }
}
