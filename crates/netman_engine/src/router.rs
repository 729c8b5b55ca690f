//! Dispatches the four bare-string session actions of §6
//! (`POST /switches-sessions/{id}/actions`) onto the session manager.

use crate::session::SessionManager;
use netman_model::NetmanError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown session action '{0}'")]
    UnknownAction(String),
    #[error(transparent)]
    Netman(#[from] NetmanError),
}

pub async fn dispatch_action(
    manager: &SessionManager,
    session_id: &str,
    action: &str,
) -> Result<(), ActionError> {
    match action {
        "start_transaction" => manager.start_transaction(session_id).await.map_err(Into::into),
        "commit" => manager.commit(session_id).await.map_err(Into::into),
        "end_transaction" => manager.end_transaction(session_id).await.map_err(Into::into),
        "rollback" => manager.rollback(session_id).await.map_err(Into::into),
        other => Err(ActionError::UnknownAction(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use async_trait::async_trait;
    use netman_drivers::{DriverFactory, DriverRegistry, SwitchDriver};
    use netman_model::{Bond, Interface, NetmanResult, SwitchDescriptor, Vlan};

    struct NoopDriver;

    #[async_trait]
    impl SwitchDriver for NoopDriver {
        async fn connect(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn disconnect(&mut self) {}
        async fn start_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn end_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn commit_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn rollback_transaction(&mut self) -> NetmanResult<()> {
            Ok(())
        }
        async fn get_vlans(&mut self) -> NetmanResult<Vec<Vlan>> {
            Ok(vec![])
        }
        async fn get_vlan(&mut self, number: u16) -> NetmanResult<Vlan> {
            Ok(Vlan::new(number))
        }
        async fn get_interfaces(&mut self) -> NetmanResult<Vec<Interface>> {
            Ok(vec![])
        }
        async fn get_interface(&mut self, name: &str) -> NetmanResult<Interface> {
            Ok(Interface::new(name))
        }
        async fn get_bonds(&mut self) -> NetmanResult<Vec<Bond>> {
            Ok(vec![])
        }
        async fn get_bond(&mut self, number: u32) -> NetmanResult<Bond> {
            Ok(Bond::new(number, format!("ae{number}")))
        }
        async fn add_vlan(&mut self, _number: u16, _name: Option<&str>) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_vlan(&mut self, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_access_mode(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_trunk_mode(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_access_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_access_vlan(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn configure_native_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_native_vlan(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn add_trunk_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_trunk_vlan(&mut self, _interface: &str, _number: u16) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_interface_description(&mut self, _interface: &str, _text: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_interface_description(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn edit_interface_spanning_tree(&mut self, _interface: &str, _edge: bool) -> NetmanResult<()> {
            Ok(())
        }
        async fn openup_interface(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn shutdown_interface(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn enable_lldp(&mut self, _interface: &str, _enabled: bool) -> NetmanResult<()> {
            Ok(())
        }
        async fn add_bond(&mut self, _number: u32) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_bond(&mut self, _number: u32) -> NetmanResult<()> {
            Ok(())
        }
        async fn add_interface_to_bond(&mut self, _interface: &str, _number: u32) -> NetmanResult<()> {
            Ok(())
        }
        async fn remove_interface_from_bond(&mut self, _interface: &str) -> NetmanResult<()> {
            Ok(())
        }
        async fn set_bond_link_speed(&mut self, _number: u32, _speed: &str) -> NetmanResult<()> {
            Ok(())
        }
        fn bond_interface_name(&self, number: u32) -> String {
            format!("ae{number}")
        }
    }

    struct NoopFactory;
    impl DriverFactory for NoopFactory {
        fn build(&self, _descriptor: &SwitchDescriptor) -> Box<dyn SwitchDriver> {
            Box::new(NoopDriver)
        }
    }

    async fn manager_with_open_session(id: &str) -> std::sync::Arc<SessionManager> {
        let mut registry = DriverRegistry::new();
        registry.register("junos", Box::new(NoopFactory));
        let manager = SessionManager::new(registry, SessionConfig::default());
        manager
            .open(
                id.to_string(),
                SwitchDescriptor {
                    model: "junos".into(),
                    hostname: "sw1".into(),
                    username: "admin".into(),
                    password: "secret".into(),
                    port: None,
                },
            )
            .await
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn routes_every_known_action() {
        let manager = manager_with_open_session("s1").await;
        dispatch_action(&manager, "s1", "start_transaction").await.unwrap();
        dispatch_action(&manager, "s1", "commit").await.unwrap();
        dispatch_action(&manager, "s1", "end_transaction").await.unwrap();
        dispatch_action(&manager, "s1", "start_transaction").await.unwrap();
        dispatch_action(&manager, "s1", "rollback").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let manager = manager_with_open_session("s1").await;
        let err = dispatch_action(&manager, "s1", "reboot").await.unwrap_err();
        assert!(matches!(err, ActionError::UnknownAction(a) if a == "reboot"));
    }

    #[tokio::test]
    async fn action_on_unknown_session_surfaces_session_expired() {
        let manager = manager_with_open_session("s1").await;
        let err = dispatch_action(&manager, "missing", "commit").await.unwrap_err();
        assert!(matches!(err, ActionError::Netman(NetmanError::SessionExpired(id)) if id == "missing"));
    }
}
