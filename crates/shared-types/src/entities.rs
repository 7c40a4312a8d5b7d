//! # Core Ledger Entities
//!
//! Types that cross crate boundaries: the bus carries them inside events and
//! the gateway returns them from every state-changing operation.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `TxHash`
//! - **Confirmation**: `TransactionReceipt`, `OperationType`
//! - **Lifecycle**: `ConnectionState`, `RegistryKind`

use crate::errors::ParseError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A 32-byte hash (Keccak-256 on the live path, random in emulation).
pub type Hash = [u8; 32];

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Decode `0x`-prefixed (or bare) hex into a fixed-size array.
fn decode_fixed<const N: usize>(kind: &'static str, input: &str) -> Result<[u8; N], ParseError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);

    if digits.len() != N * 2 {
        return Err(ParseError::InvalidLength {
            kind,
            expected: N * 2,
            got: digits.len(),
        });
    }

    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|_| ParseError::InvalidHex {
        kind,
        input: input.to_string(),
    })?;
    Ok(out)
}

// =============================================================================
// IDENTITY
// =============================================================================

/// A 20-byte account address.
///
/// Parsing is case-insensitive; the text form is always lowercase, so two
/// spellings of the same wallet compare equal and key the same record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address (unset officer/verifier on chain).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Parse from hex text.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        decode_fixed::<20>("address", input.trim()).map(Self)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// True for the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

/// A 32-byte transaction (or block) hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxHash(pub Hash);

impl TxHash {
    /// Parse from hex text.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        decode_fixed::<32>("hash", input.trim()).map(Self)
    }
}

impl FromStr for TxHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

// =============================================================================
// CONFIRMATION
// =============================================================================

/// State-changing operations that produce a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    RegisterCitizen,
    VerifyCitizen,
    UploadDocument,
    VerifyDocument,
    RejectDocument,
    SubmitGrievance,
    AssignGrievance,
    ResolveGrievance,
    Deployment,
}

impl OperationType {
    /// Gas charged by the emulation for this operation.
    #[must_use]
    pub fn emulated_gas(&self) -> u64 {
        match self {
            Self::RegisterCitizen => 75_000,
            Self::VerifyCitizen => 45_000,
            Self::UploadDocument => 85_000,
            Self::VerifyDocument | Self::RejectDocument => 55_000,
            Self::SubmitGrievance => 110_000,
            Self::AssignGrievance => 35_000,
            Self::ResolveGrievance => 60_000,
            Self::Deployment => 150_000,
        }
    }

    /// Delay before the emulation publishes the domain event, if any.
    ///
    /// Assignment and deployment have no domain event.
    #[must_use]
    pub fn event_delay(&self) -> Option<Duration> {
        let ms = match self {
            Self::RegisterCitizen => 800,
            Self::VerifyCitizen => 600,
            Self::UploadDocument => 900,
            Self::VerifyDocument | Self::RejectDocument => 700,
            Self::SubmitGrievance => 1_000,
            Self::ResolveGrievance => 800,
            Self::AssignGrievance | Self::Deployment => return None,
        };
        Some(Duration::from_millis(ms))
    }

    /// Wire name (matches the serde form).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegisterCitizen => "registerCitizen",
            Self::VerifyCitizen => "verifyCitizen",
            Self::UploadDocument => "uploadDocument",
            Self::VerifyDocument => "verifyDocument",
            Self::RejectDocument => "rejectDocument",
            Self::SubmitGrievance => "submitGrievance",
            Self::AssignGrievance => "assignGrievance",
            Self::ResolveGrievance => "resolveGrievance",
            Self::Deployment => "deployment",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receipt returned by every state-changing operation, live or emulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub hash: TxHash,
    /// Block that included the transaction.
    pub block_number: u64,
    /// Hash of that block.
    pub block_hash: TxHash,
    /// Gas consumed.
    pub gas_used: u64,
    /// Effective gas price in wei.
    pub gas_price: u128,
    /// Unix seconds when the receipt was produced.
    pub timestamp: u64,
    /// What the transaction did.
    pub operation: OperationType,
    /// Id allocated by a creating operation (document / grievance).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<u64>,
    /// Address of a newly deployed contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    /// True when the receipt was fabricated by the emulation.
    pub synthetic: bool,
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Connection state machine.
///
/// ```text
/// Uninitialized ──► Connecting ──► Online
///       │               │            │
///       └───(forced)────┴──► Offline ◄┘ (re-initialise)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Connecting,
    Online,
    Offline,
}

impl ConnectionState {
    /// Check if a transition is valid.
    #[must_use]
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        match (self, next) {
            (_, Self::Uninitialized) => true,
            (Self::Uninitialized, Self::Connecting | Self::Offline) => true,
            (Self::Connecting, Self::Online | Self::Offline) => true,
            (Self::Online | Self::Offline, Self::Connecting | Self::Offline) => true,
            _ => false,
        }
    }

    /// True once `initialize` has settled on a mode.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Online | Self::Offline)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Online => "online",
            Self::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// The three domain registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegistryKind {
    Citizen,
    Document,
    Grievance,
}

impl RegistryKind {
    /// All registries in provisioning order.
    pub const ALL: [RegistryKind; 3] = [Self::Citizen, Self::Document, Self::Grievance];

    /// Contract (and artifact) name.
    #[must_use]
    pub fn contract_name(&self) -> &'static str {
        match self {
            Self::Citizen => "CitizenRegistry",
            Self::Document => "DocumentRegistry",
            Self::Grievance => "GrievanceSystem",
        }
    }

    /// Environment variable holding a pre-deployed address.
    #[must_use]
    pub fn address_env_var(&self) -> &'static str {
        match self {
            Self::Citizen => "CITIZEN_REGISTRY_ADDRESS",
            Self::Document => "DOCUMENT_REGISTRY_ADDRESS",
            Self::Grievance => "GRIEVANCE_SYSTEM_ADDRESS",
        }
    }

    /// Name of a single record in this registry.
    #[must_use]
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Document => "document",
            Self::Grievance => "grievance",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}
