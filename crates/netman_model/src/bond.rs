use crate::interface::Interface;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bond {
    pub number: u32,
    pub link_speed: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    /// The bond's derived switch interface (e.g. `ae10` on Juniper), carrying
    /// every switching attribute a standalone interface would.
    pub interface: Interface,
}

impl Bond {
    pub fn new(number: u32, interface_name: impl Into<String>) -> Self {
        Self {
            number,
            link_speed: None,
            members: Vec::new(),
            interface: Interface::new(interface_name),
        }
    }
}
