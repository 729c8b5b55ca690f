use crate::contract::SwitchDriver;
use async_trait::async_trait;
use netman_model::{Bond, Interface, NetmanResult, Vlan};
use std::future::Future;
use std::pin::Pin;
use tracing::warn;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Wraps any driver so every mutating call is framed by
/// `start_transaction` ... `commit_transaction` / `rollback_transaction`
/// (§4.3). Implemented as composition, per the "transactional wrapper as
/// decoration" design note: it holds the inner driver and re-exposes the
/// same capability set.
pub struct TransactionalDriver {
    inner: Box<dyn SwitchDriver>,
    active: bool,
}

impl TransactionalDriver {
    pub fn new(inner: Box<dyn SwitchDriver>) -> Self {
        Self {
            inner,
            active: false,
        }
    }

    /// Runs a mutation through the envelope: on error, roll back (swallowing
    /// any error from the rollback itself) and re-raise the original.
    async fn mutate<F, T>(&mut self, op: F) -> NetmanResult<T>
    where
        F: for<'a> FnOnce(&'a mut Box<dyn SwitchDriver>) -> BoxFuture<'a, NetmanResult<T>>,
    {
        self.start_transaction().await?;
        match op(&mut self.inner).await {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Err(rollback_err) = self.inner.rollback_transaction().await {
                    warn!(
                        target: "drivers::transactional",
                        "rollback after failed mutation also failed: {rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl SwitchDriver for TransactionalDriver {
    async fn connect(&mut self) -> NetmanResult<()> {
        self.inner.connect().await
    }

    async fn disconnect(&mut self) {
        self.inner.disconnect().await
    }

    async fn start_transaction(&mut self) -> NetmanResult<()> {
        if self.active {
            return Ok(());
        }
        self.inner.start_transaction().await?;
        self.active = true;
        Ok(())
    }

    async fn end_transaction(&mut self) -> NetmanResult<()> {
        let result = self.inner.end_transaction().await;
        self.active = false;
        result
    }

    async fn commit_transaction(&mut self) -> NetmanResult<()> {
        match self.inner.commit_transaction().await {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Err(rollback_err) = self.inner.rollback_transaction().await {
                    warn!(
                        target: "drivers::transactional",
                        "discard after failed commit also failed: {rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }

    async fn rollback_transaction(&mut self) -> NetmanResult<()> {
        self.inner.rollback_transaction().await
    }

    async fn get_vlans(&mut self) -> NetmanResult<Vec<Vlan>> {
        self.inner.get_vlans().await
    }

    async fn get_vlan(&mut self, number: u16) -> NetmanResult<Vlan> {
        self.inner.get_vlan(number).await
    }

    async fn get_interfaces(&mut self) -> NetmanResult<Vec<Interface>> {
        self.inner.get_interfaces().await
    }

    async fn get_interface(&mut self, name: &str) -> NetmanResult<Interface> {
        self.inner.get_interface(name).await
    }

    async fn get_bonds(&mut self) -> NetmanResult<Vec<Bond>> {
        self.inner.get_bonds().await
    }

    async fn get_bond(&mut self, number: u32) -> NetmanResult<Bond> {
        self.inner.get_bond(number).await
    }

    async fn add_vlan(&mut self, number: u16, name: Option<&str>) -> NetmanResult<()> {
        let name = name.map(|n| n.to_string());
        self.mutate(move |d| {
            let name = name;
            Box::pin(async move { d.add_vlan(number, name.as_deref()).await })
        })
        .await
    }

    async fn remove_vlan(&mut self, number: u16) -> NetmanResult<()> {
        self.mutate(move |d| Box::pin(async move { d.remove_vlan(number).await }))
            .await
    }

    async fn set_access_mode(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.set_access_mode(&interface).await }))
            .await
    }

    async fn set_trunk_mode(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.set_trunk_mode(&interface).await }))
            .await
    }

    async fn set_access_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.set_access_vlan(&interface, number).await }))
            .await
    }

    async fn remove_access_vlan(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.remove_access_vlan(&interface).await }))
            .await
    }

    async fn configure_native_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| {
            Box::pin(async move { d.configure_native_vlan(&interface, number).await })
        })
        .await
    }

    async fn remove_native_vlan(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.remove_native_vlan(&interface).await }))
            .await
    }

    async fn add_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.add_trunk_vlan(&interface, number).await }))
            .await
    }

    async fn remove_trunk_vlan(&mut self, interface: &str, number: u16) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| {
            Box::pin(async move { d.remove_trunk_vlan(&interface, number).await })
        })
        .await
    }

    async fn set_interface_description(&mut self, interface: &str, text: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        let text = text.to_string();
        self.mutate(move |d| {
            Box::pin(async move { d.set_interface_description(&interface, &text).await })
        })
        .await
    }

    async fn remove_interface_description(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| {
            Box::pin(async move { d.remove_interface_description(&interface).await })
        })
        .await
    }

    async fn edit_interface_spanning_tree(&mut self, interface: &str, edge: bool) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| {
            Box::pin(async move { d.edit_interface_spanning_tree(&interface, edge).await })
        })
        .await
    }

    async fn openup_interface(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.openup_interface(&interface).await }))
            .await
    }

    async fn shutdown_interface(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.shutdown_interface(&interface).await }))
            .await
    }

    async fn enable_lldp(&mut self, interface: &str, enabled: bool) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| Box::pin(async move { d.enable_lldp(&interface, enabled).await }))
            .await
    }

    async fn add_bond(&mut self, number: u32) -> NetmanResult<()> {
        self.mutate(move |d| Box::pin(async move { d.add_bond(number).await }))
            .await
    }

    async fn remove_bond(&mut self, number: u32) -> NetmanResult<()> {
        self.mutate(move |d| Box::pin(async move { d.remove_bond(number).await }))
            .await
    }

    async fn add_interface_to_bond(&mut self, interface: &str, number: u32) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| {
            Box::pin(async move { d.add_interface_to_bond(&interface, number).await })
        })
        .await
    }

    async fn remove_interface_from_bond(&mut self, interface: &str) -> NetmanResult<()> {
        let interface = interface.to_string();
        self.mutate(move |d| {
            Box::pin(async move { d.remove_interface_from_bond(&interface).await })
        })
        .await
    }

    async fn set_bond_link_speed(&mut self, number: u32, speed: &str) -> NetmanResult<()> {
        let speed = speed.to_string();
        self.mutate(move |d| Box::pin(async move { d.set_bond_link_speed(number, &speed).await }))
            .await
    }

    fn bond_interface_name(&self, number: u32) -> String {
        self.inner.bond_interface_name(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use netman_model::NetmanError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct StubDriver {
        rollback_calls: Arc<AtomicUsize>,
        fail_next_mutation: bool,
    }

    #[async_trait]
    impl SwitchDriver for StubDriver {
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
            self.rollback_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn get_vlans(&mut self) -> NetmanResult<Vec<Vlan>> {
            Ok(vec![])
        }
        async fn get_vlan(&mut self, number: u16) -> NetmanResult<Vlan> {
            Err(NetmanError::UnknownVlan(number))
        }
        async fn get_interfaces(&mut self) -> NetmanResult<Vec<Interface>> {
            Ok(vec![])
        }
        async fn get_interface(&mut self, name: &str) -> NetmanResult<Interface> {
            Err(NetmanError::UnknownInterface(name.to_string()))
        }
        async fn get_bonds(&mut self) -> NetmanResult<Vec<Bond>> {
            Ok(vec![])
        }
        async fn get_bond(&mut self, number: u32) -> NetmanResult<Bond> {
            Err(NetmanError::UnknownBond(number))
        }
        async fn add_vlan(&mut self, number: u16, _name: Option<&str>) -> NetmanResult<()> {
            if self.fail_next_mutation {
                Err(NetmanError::VlanAlreadyExist(number))
            } else {
                Ok(())
            }
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

    #[tokio::test]
    async fn failed_mutation_rolls_back_and_reraises() {
        let rollback_calls = Arc::new(AtomicUsize::new(0));
        let stub = StubDriver {
            rollback_calls: rollback_calls.clone(),
            fail_next_mutation: true,
        };
        let mut wrapper = TransactionalDriver::new(Box::new(stub));
        let err = wrapper.add_vlan(10, None).await.unwrap_err();
        assert_eq!(err, NetmanError::VlanAlreadyExist(10));
        assert_eq!(rollback_calls.load(Ordering::SeqCst), 1);
        assert!(wrapper.active, "session stays open for retry per §7");
    }

    #[tokio::test]
    async fn start_transaction_is_idempotent() {
        let stub = StubDriver::default();
        let mut wrapper = TransactionalDriver::new(Box::new(stub));
        wrapper.start_transaction().await.unwrap();
        wrapper.start_transaction().await.unwrap();
        assert!(wrapper.active);
    }

    #[tokio::test]
    async fn end_transaction_clears_active_flag() {
        let stub = StubDriver::default();
        let mut wrapper = TransactionalDriver::new(Box::new(stub));
        wrapper.start_transaction().await.unwrap();
        wrapper.end_transaction().await.unwrap();
        assert!(!wrapper.active);
    }
}
