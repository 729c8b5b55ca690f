use thiserror::Error;

/// The closed error taxonomy of §7. Every variant's `Display` text includes
/// the operand it failed on, so it is useful to an operator without the
/// taxonomy name attached.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetmanError {
    #[error("Vlan number is invalid")]
    BadVlanNumber,
    #[error("Vlan name is invalid")]
    BadVlanName,
    #[error("Bond number is invalid")]
    BadBondNumber,

    #[error("Vlan {0} not found")]
    UnknownVlan(u16),
    #[error("Unknown interface {0}")]
    UnknownInterface(String),
    #[error("Bond {0} not found")]
    UnknownBond(u32),

    #[error("Vlan {0} already exists")]
    VlanAlreadyExist(u16),
    #[error("Bond {0} already exists")]
    BondAlreadyExist(u32),
    #[error("Vlan {vlan} is already in trunk on interface {interface}")]
    VlanAlreadyInTrunk { interface: String, vlan: u16 },
    #[error("Operation cannot be performed on a {mode} mode interface {interface}")]
    InterfaceInWrongPortMode { interface: String, mode: String },
    #[error("Interface {0} is not in a bond")]
    InterfaceNotInBond(String),

    #[error("Access Vlan is not set on interface {0}")]
    AccessVlanNotSet(String),
    #[error("Native Vlan is not set on interface {0}")]
    NativeVlanNotSet(String),
    #[error("Trunk Vlan is not set on interface {interface} ({vlan})")]
    TrunkVlanNotSet { interface: String, vlan: u16 },

    #[error("Switch is locked and can't be modified")]
    SwitchLocked,
    #[error("Session {0} has expired")]
    SessionExpired(String),

    #[error("An error occured while completing operation, no modifications have been applied : {0}")]
    OperationNotCompleted(String),

    #[error("Switch is unreachable: {0}")]
    Unavailable(String),
}

impl NetmanError {
    /// The HTTP status this error must be surfaced as, per §7.
    pub fn http_status(&self) -> u16 {
        use NetmanError::*;
        match self {
            BadVlanNumber | BadVlanName | BadBondNumber => 400,
            UnknownVlan(_) | UnknownInterface(_) | UnknownBond(_) => 404,
            VlanAlreadyExist(_)
            | BondAlreadyExist(_)
            | VlanAlreadyInTrunk { .. }
            | InterfaceInWrongPortMode { .. }
            | InterfaceNotInBond(_) => 409,
            AccessVlanNotSet(_) | NativeVlanNotSet(_) | TrunkVlanNotSet { .. } => 409,
            SwitchLocked => 423,
            SessionExpired(_) => 410,
            OperationNotCompleted(_) => 502,
            Unavailable(_) => 504,
        }
    }

    pub fn taxonomy_name(&self) -> &'static str {
        use NetmanError::*;
        match self {
            BadVlanNumber => "BadVlanNumber",
            BadVlanName => "BadVlanName",
            BadBondNumber => "BadBondNumber",
            UnknownVlan(_) => "UnknownVlan",
            UnknownInterface(_) => "UnknownInterface",
            UnknownBond(_) => "UnknownBond",
            VlanAlreadyExist(_) => "VlanAlreadyExist",
            BondAlreadyExist(_) => "BondAlreadyExist",
            VlanAlreadyInTrunk { .. } => "VlanAlreadyInTrunk",
            InterfaceInWrongPortMode { .. } => "InterfaceInWrongPortMode",
            InterfaceNotInBond(_) => "InterfaceNotInBond",
            AccessVlanNotSet(_) => "AccessVlanNotSet",
            NativeVlanNotSet(_) => "NativeVlanNotSet",
            TrunkVlanNotSet { .. } => "TrunkVlanNotSet",
            SwitchLocked => "SwitchLocked",
            SessionExpired(_) => "SessionExpired",
            OperationNotCompleted(_) => "OperationNotCompleted",
            Unavailable(_) => "Unavailable",
        }
    }
}

pub type NetmanResult<T> = Result<T, NetmanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy_table() {
        assert_eq!(NetmanError::BadVlanNumber.http_status(), 400);
        assert_eq!(NetmanError::UnknownInterface("ge-0/0/1".into()).http_status(), 404);
        assert_eq!(
            NetmanError::VlanAlreadyInTrunk {
                interface: "ge-0/0/1".into(),
                vlan: 10
            }
            .http_status(),
            409
        );
        assert_eq!(NetmanError::SwitchLocked.http_status(), 423);
        assert_eq!(NetmanError::SessionExpired("abc".into()).http_status(), 410);
        assert_eq!(NetmanError::OperationNotCompleted("bad".into()).http_status(), 502);
        assert_eq!(NetmanError::Unavailable("timeout".into()).http_status(), 504);
    }

    #[test]
    fn messages_carry_the_operand() {
        let err = NetmanError::UnknownVlan(4000);
        assert_eq!(err.to_string(), "Vlan 4000 not found");
        let err = NetmanError::TrunkVlanNotSet {
            interface: "ge-0/0/6".into(),
            vlan: 1000,
        };
        assert!(err.to_string().contains("ge-0/0/6"));
    }
}
