pub mod cisco_ios;
pub mod juniper;

use crate::contract::{DriverFactory, DriverRegistry, SwitchDriver};
use netman_model::SwitchDescriptor;

struct JuniperFactory;

impl DriverFactory for JuniperFactory {
    fn build(&self, descriptor: &SwitchDescriptor) -> Box<dyn SwitchDriver> {
        Box::new(juniper::JuniperDriver::new(descriptor.clone()))
    }
}

struct CiscoIosFactory;

impl DriverFactory for CiscoIosFactory {
    fn build(&self, descriptor: &SwitchDescriptor) -> Box<dyn SwitchDriver> {
        Box::new(cisco_ios::CiscoIosDriver::new(descriptor.clone()))
    }
}

/// The registry netman ships with out of the box: Juniper (NETCONF/XML, the
/// rich driver) and Cisco IOS (CLI over SSH), keyed by the model names a
/// client would put in a `SwitchDescriptor`.
pub fn default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register("juniper", Box::new(JuniperFactory));
    registry.register("junos", Box::new(JuniperFactory));
    registry.register("cisco_ios", Box::new(CiscoIosFactory));
    registry.register("ios", Box::new(CiscoIosFactory));
    registry
}
