use crate::config;
use anyhow::{Context, Result};
use async_ssh2_tokio::{AuthMethod, Client, ServerCheckMethod};
use netman_model::SwitchDescriptor;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_NETCONF_PORT: u16 = 830;

pub fn command_timeout() -> std::time::Duration {
    config::device_timeout()
}

/// Opens an SSH connection to the switch described by `descriptor`, using its
/// inline username/password. Host key verification is disabled, matching the
/// Juniper NETCONF wire contract (`hostkey_verify=False`).
pub async fn connect(descriptor: &SwitchDescriptor, default_port: u16) -> Result<Client> {
    let port = descriptor.port.unwrap_or(default_port);
    let auth = AuthMethod::with_password(&descriptor.password);
    Client::connect(
        (descriptor.hostname.as_str(), port),
        &descriptor.username,
        auth,
        ServerCheckMethod::NoCheck,
    )
    .await
    .with_context(|| format!("ssh connect {}:{}", descriptor.hostname, port))
}
