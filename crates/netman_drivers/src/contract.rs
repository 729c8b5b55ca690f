use async_trait::async_trait;
use netman_model::{Bond, Interface, NetmanResult, Vlan};

/// The capability set every switch driver implements (§4.2). Object-safe so
/// the session manager can hold a `Box<dyn SwitchDriver>` behind a single
/// indirection regardless of vendor.
#[async_trait]
pub trait SwitchDriver: Send + Sync {
    async fn connect(&mut self) -> NetmanResult<()>;

    /// Must never fail observably: device-side `close_session` errors are
    /// logged and swallowed (§5).
    async fn disconnect(&mut self);

    async fn start_transaction(&mut self) -> NetmanResult<()>;
    async fn end_transaction(&mut self) -> NetmanResult<()>;
    async fn commit_transaction(&mut self) -> NetmanResult<()>;
    async fn rollback_transaction(&mut self) -> NetmanResult<()>;

    async fn get_vlans(&mut self) -> NetmanResult<Vec<Vlan>>;
    async fn get_vlan(&mut self, number: u16) -> NetmanResult<Vlan>;
    async fn get_interfaces(&mut self) -> NetmanResult<Vec<Interface>>;
    async fn get_interface(&mut self, name: &str) -> NetmanResult<Interface>;
    async fn get_bonds(&mut self) -> NetmanResult<Vec<Bond>>;
    async fn get_bond(&mut self, number: u32) -> NetmanResult<Bond>;

    async fn add_vlan(&mut self, number: u16, name: Option<&str>) -> NetmanResult<()>;
    async fn remove_vlan(&mut self, number: u16) -> NetmanResult<()>;

    async fn set_access_mode(&mut self, interface: &str) -> NetmanResult<()>;
    async fn set_trunk_mode(&mut self, interface: &str) -> NetmanResult<()>;
    async fn set_access_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()>;
    async fn remove_access_vlan(&mut self, interface: &str) -> NetmanResult<()>;
    async fn configure_native_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()>;
    async fn remove_native_vlan(&mut self, interface: &str) -> NetmanResult<()>;
    async fn add_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()>;
    async fn remove_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()>;

    async fn set_interface_description(&mut self, interface: &str, text: &str) -> NetmanResult<()>;
    async fn remove_interface_description(&mut self, interface: &str) -> NetmanResult<()>;
    async fn edit_interface_spanning_tree(&mut self, interface: &str, edge: bool) -> NetmanResult<()>;
    async fn openup_interface(&mut self, interface: &str) -> NetmanResult<()>;
    async fn shutdown_interface(&mut self, interface: &str) -> NetmanResult<()>;
    async fn enable_lldp(&mut self, interface: &str, enabled: bool) -> NetmanResult<()>;

    async fn add_bond(&mut self, number: u32) -> NetmanResult<()>;
    async fn remove_bond(&mut self, number: u32) -> NetmanResult<()>;
    async fn add_interface_to_bond(&mut self, interface: &str, number: u32) -> NetmanResult<()>;
    async fn remove_interface_from_bond(&mut self, interface: &str) -> NetmanResult<()>;
    async fn set_bond_link_speed(&mut self, number: u32, speed: &str) -> NetmanResult<()>;

    /// The vendor's naming convention for a bond's derived switch interface
    /// (Juniper: `ae<n>`). No default: every vendor must state its own.
    fn bond_interface_name(&self, number: u32) -> String;

    async fn set_bond_access_vlan(&mut self, number: u32, vlan: u16) -> NetmanResult<()> {
        let name = self.bond_interface_name(number);
        self.set_access_vlan(&name, vlan).await
    }

    async fn add_bond_trunk_vlan(&mut self, number: u32, vlan: u16) -> NetmanResult<()> {
        let name = self.bond_interface_name(number);
        self.add_trunk_vlan(&name, vlan).await
    }

    async fn remove_bond_trunk_vlan(&mut self, number: u32, vlan: u16) -> NetmanResult<()> {
        let name = self.bond_interface_name(number);
        self.remove_trunk_vlan(&name, vlan).await
    }

    async fn configure_bond_native_vlan(&mut self, number: u32, vlan: u16) -> NetmanResult<()> {
        let name = self.bond_interface_name(number);
        self.configure_native_vlan(&name, vlan).await
    }
}

/// Builds a driver instance bound to a concrete switch descriptor. One
/// factory per vendor `model` string, registered in a `DriverRegistry`.
pub trait DriverFactory: Send + Sync {
    fn build(&self, descriptor: &netman_model::SwitchDescriptor) -> Box<dyn SwitchDriver>;
}

/// Maps a switch descriptor's `model` field to the factory that instantiates
/// its driver (§9: "dynamic dispatch of drivers").
#[derive(Default)]
pub struct DriverRegistry {
    factories: std::collections::HashMap<String, Box<dyn DriverFactory>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: impl Into<String>, factory: Box<dyn DriverFactory>) {
        self.factories.insert(model.into().to_lowercase(), factory);
    }

    pub fn build(
        &self,
        descriptor: &netman_model::SwitchDescriptor,
    ) -> Option<Box<dyn SwitchDriver>> {
        self.factories
            .get(&descriptor.model.to_lowercase())
            .map(|factory| factory.build(descriptor))
    }
}
