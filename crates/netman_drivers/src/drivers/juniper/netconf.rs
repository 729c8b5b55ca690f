//! The NETCONF wire session: SSH -> "netconf" subsystem -> hello exchange ->
//! framed `rpc`/`rpc-reply` (RFC 6241). Targets either datastore and parses
//! `<rpc-error>` elements out of the reply rather than just checking for
//! `<ok/>`.

use super::xml::Element;
use crate::ssh::{self, DEFAULT_NETCONF_PORT};
use anyhow::{bail, Context, Result};
use async_ssh2_tokio::Client;
use netman_model::SwitchDescriptor;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const NETCONF_EOM: &str = "]]>]]>";

trait NetconfIo: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T> NetconfIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

#[derive(Debug, Clone)]
pub struct RpcError {
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct RpcReply {
    pub raw: String,
    pub errors: Vec<RpcError>,
}

impl RpcReply {
    pub fn ok(&self) -> bool {
        self.errors.iter().all(|e| e.severity != "error")
    }

    pub fn error_errors(&self) -> impl Iterator<Item = &RpcError> {
        self.errors.iter().filter(|e| e.severity == "error")
    }
}

pub enum Datastore {
    Running,
    Candidate,
}

impl Datastore {
    fn tag(&self) -> &'static str {
        match self {
            Datastore::Running => "running",
            Datastore::Candidate => "candidate",
        }
    }
}

pub struct NetconfSession {
    #[allow(dead_code)]
    client: Client,
    stream: Pin<Box<dyn NetconfIo>>,
    next_id: u32,
}

impl NetconfSession {
    pub async fn connect(descriptor: &SwitchDescriptor) -> Result<NetconfSession> {
        let client = ssh::connect(descriptor, DEFAULT_NETCONF_PORT).await?;
        let channel = client
            .get_channel()
            .await
            .with_context(|| format!("netconf channel {}", descriptor.hostname))?;
        channel
            .request_subsystem(true, "netconf")
            .await
            .context("netconf subsystem denied")?;
        let stream = channel.into_stream();
        let mut session = NetconfSession {
            client,
            stream: Box::pin(stream),
            next_id: 1,
        };
        session.send_hello().await?;
        Ok(session)
    }

    async fn send_hello(&mut self) -> Result<()> {
        let hello = r#"<?xml version="1.0" encoding="UTF-8"?>
<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
  </capabilities>
</hello>]]>]]>"#;
        self.stream.as_mut().write_all(hello.as_bytes()).await?;
        self.stream.as_mut().flush().await?;
        let _server_hello = self.read_frame().await?;
        Ok(())
    }

    /// Sends `<rpc>{inner}</rpc>` and returns the parsed reply. Never fails
    /// just because the device reported an `<rpc-error>` — callers classify
    /// those via `errors.rs`.
    pub async fn rpc(&mut self, inner: &str) -> Result<RpcReply> {
        let message_id = self.next_id;
        self.next_id += 1;
        let payload = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><rpc message-id="{message_id}" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">{inner}</rpc>{NETCONF_EOM}"#
        );
        self.stream
            .as_mut()
            .write_all(payload.as_bytes())
            .await
            .context("write netconf rpc")?;
        self.stream.as_mut().flush().await?;
        let raw = self.read_frame().await?;
        let errors = parse_rpc_errors(&raw)?;
        Ok(RpcReply { raw, errors })
    }

    pub async fn get_config(&mut self, datastore: Datastore, filter_inner: &str) -> Result<RpcReply> {
        let inner = format!(
            "<get-config><source><{}/></source><filter type=\"subtree\">{}</filter></get-config>",
            datastore.tag(),
            filter_inner
        );
        self.rpc(&inner).await
    }

    pub async fn edit_config(&mut self, config_inner: &str) -> Result<RpcReply> {
        let inner = format!(
            "<edit-config><target><candidate/></target><default-operation>merge</default-operation><config>{config_inner}</config></edit-config>"
        );
        self.rpc(&inner).await
    }

    pub async fn lock_candidate(&mut self) -> Result<RpcReply> {
        self.rpc("<lock><target><candidate/></target></lock>").await
    }

    pub async fn unlock_candidate(&mut self) -> Result<RpcReply> {
        self.rpc("<unlock><target><candidate/></target></unlock>").await
    }

    pub async fn commit(&mut self) -> Result<RpcReply> {
        self.rpc("<commit/>").await
    }

    pub async fn discard_changes(&mut self) -> Result<RpcReply> {
        self.rpc("<discard-changes/>").await
    }

    pub async fn close_session(&mut self) -> Result<RpcReply> {
        self.rpc("<close-session/>").await
    }

    async fn read_frame(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        loop {
            let mut chunk = vec![0u8; 4096];
            let read = self
                .stream
                .as_mut()
                .read(&mut chunk)
                .await
                .context("read netconf frame")?;
            if read == 0 {
                bail!("netconf stream closed");
            }
            buf.extend_from_slice(&chunk[..read]);
            if buf.len() >= NETCONF_EOM.len()
                && buf[buf.len() - NETCONF_EOM.len()..] == NETCONF_EOM.as_bytes()[..]
            {
                break;
            }
        }
        buf.truncate(buf.len() - NETCONF_EOM.len());
        String::from_utf8(buf).context("netconf reply not utf8")
    }
}

fn parse_rpc_errors(raw: &str) -> Result<Vec<RpcError>> {
    if !raw.contains("<rpc-error>") {
        return Ok(Vec::new());
    }
    let root = Element::parse(raw)?;
    Ok(root
        .find_all("rpc-error")
        .map(|e| RpcError {
            severity: e
                .find("error-severity")
                .and_then(Element::text_trimmed)
                .unwrap_or("error")
                .to_string(),
            message: e
                .find("error-message")
                .and_then(Element::text_trimmed)
                .unwrap_or_default()
                .to_string(),
        })
        .collect())
}
