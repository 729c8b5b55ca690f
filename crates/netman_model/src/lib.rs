pub mod bond;
pub mod errors;
pub mod interface;
pub mod switch;
pub mod vlan;

pub use bond::Bond;
pub use errors::{NetmanError, NetmanResult};
pub use interface::{Interface, PortMode, SpanningTreeConfig, SwitchingAttributes};
pub use switch::{SwitchDescriptor, SwitchKey};
pub use vlan::{AccessGroupDirection, AccessGroups, IpNetwork, Vlan, IN, OUT};
