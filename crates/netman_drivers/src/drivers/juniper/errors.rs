//! RPC error classification (§4.4.5): a fragile-by-nature substring table,
//! centralised here per the design note so every observed string has one
//! place to be tested against.

use super::netconf::{RpcError, RpcReply};
use netman_model::NetmanError;
use tracing::warn;

/// Extra context used to fill the operand of an error whose message alone
/// doesn't carry one (e.g. "port value outside range 0..47" says nothing
/// about which interface the caller asked about).
#[derive(Default)]
pub struct ErrorContext<'a> {
    pub interface: Option<&'a str>,
}

pub enum RpcOutcome {
    Ok,
    /// "configuration database modified" — caller discards and retries once.
    Retryable,
    Fatal(NetmanError),
}

pub fn classify(reply: &RpcReply, ctx: &ErrorContext) -> RpcOutcome {
    for error in &reply.errors {
        if error.severity != "error" {
            log_warning(error);
            continue;
        }
        if error.message.contains("configuration database modified") {
            return RpcOutcome::Retryable;
        }
        return RpcOutcome::Fatal(classify_message(&error.message, ctx));
    }
    RpcOutcome::Ok
}

fn classify_message(message: &str, ctx: &ErrorContext) -> NetmanError {
    if message.contains("not within range (1..4094)") {
        return NetmanError::BadVlanNumber;
    }
    if message.contains("not within range (2..255)") {
        return NetmanError::BadVlanName;
    }
    if message.contains("device value outside range 0..31") {
        return NetmanError::BadBondNumber;
    }
    if message.contains("port value outside range 0..47") {
        return NetmanError::UnknownInterface(ctx.interface.unwrap_or("").to_string());
    }
    if message.contains("Configuration database is already open") {
        return NetmanError::SwitchLocked;
    }
    NetmanError::OperationNotCompleted(message.to_string())
}

fn log_warning(error: &RpcError) {
    if error.message.contains("statement not found") {
        return;
    }
    warn!(target: "drivers::juniper", "device warning: {}", error.message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_with(messages: &[(&str, &str)]) -> RpcReply {
        RpcReply {
            raw: String::new(),
            errors: messages
                .iter()
                .map(|(sev, msg)| RpcError {
                    severity: sev.to_string(),
                    message: msg.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn classifies_every_row_of_the_table() {
        let ctx = ErrorContext::default();
        let cases = [
            ("Value 9000 is not within range (1..4094)", NetmanError::BadVlanNumber),
            (
                "Value 'x'.repeat(300) is not within range (2..255)",
                NetmanError::BadVlanName,
            ),
            ("device value outside range 0..31", NetmanError::BadBondNumber),
            (
                "port value outside range 0..47",
                NetmanError::UnknownInterface(String::new()),
            ),
            (
                "Configuration database is already open",
                NetmanError::SwitchLocked,
            ),
            ("some unrecognised device error", NetmanError::OperationNotCompleted("some unrecognised device error".into())),
        ];
        for (message, expected) in cases {
            let reply = reply_with(&[("error", message)]);
            match classify(&reply, &ctx) {
                RpcOutcome::Fatal(err) => assert_eq!(err, expected, "for message {message}"),
                _ => panic!("expected a fatal classification for {message}"),
            }
        }
    }

    #[test]
    fn configuration_database_modified_is_retryable() {
        let reply = reply_with(&[("error", "configuration database modified")]);
        assert!(matches!(classify(&reply, &ErrorContext::default()), RpcOutcome::Retryable));
    }

    #[test]
    fn statement_not_found_warning_is_ignored() {
        let reply = reply_with(&[("warning", "statement not found")]);
        assert!(matches!(classify(&reply, &ErrorContext::default()), RpcOutcome::Ok));
    }
}
