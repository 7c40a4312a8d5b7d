//! # Contract ABI
//!
//! Hardhat build artifacts (`<Name>.sol/<Name>.json`) and the parameter type
//! grammar used to encode calls and decode results.

pub mod codec;

pub use codec::{decode, decode_revert_reason, encode, encode_call, revert_reason_from_message, Token};

use crate::domain::{LedgerError, LedgerResult};
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::path::Path;

/// A compiled contract artifact.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub contract_name: Option<String>,
    pub abi: Vec<AbiItem>,
    #[serde(default)]
    pub bytecode: String,
}

impl Artifact {
    /// Read and parse an artifact file.
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Artifact(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
            .map_err(|e| LedgerError::Artifact(format!("{}: {e}", path.display())))
    }

    /// Parse artifact JSON.
    pub fn from_json(text: &str) -> LedgerResult<Self> {
        serde_json::from_str(text).map_err(|e| LedgerError::Artifact(e.to_string()))
    }

    /// Function entry by name.
    pub fn function(&self, name: &str) -> LedgerResult<&AbiItem> {
        self.find(AbiItemKind::Function, name)
            .ok_or_else(|| LedgerError::Abi(format!("function `{name}` not in ABI")))
    }

    /// Event entry by name.
    pub fn event(&self, name: &str) -> LedgerResult<&AbiItem> {
        self.find(AbiItemKind::Event, name)
            .ok_or_else(|| LedgerError::Abi(format!("event `{name}` not in ABI")))
    }

    /// Constructor entry, if declared.
    #[must_use]
    pub fn constructor(&self) -> Option<&AbiItem> {
        self.abi.iter().find(|i| i.kind == AbiItemKind::Constructor)
    }

    /// Deployable init code.
    pub fn bytecode_bytes(&self) -> LedgerResult<Vec<u8>> {
        let digits = self.bytecode.trim_start_matches("0x");
        if digits.is_empty() {
            return Err(LedgerError::Artifact("artifact has no bytecode".into()));
        }
        hex::decode(digits).map_err(|e| LedgerError::Artifact(format!("bytecode: {e}")))
    }

    fn find(&self, kind: AbiItemKind, name: &str) -> Option<&AbiItem> {
        self.abi
            .iter()
            .find(|i| i.kind == kind && i.name.as_deref() == Some(name))
    }
}

/// Kind of ABI entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiItemKind {
    Function,
    Event,
    Constructor,
    Error,
    Fallback,
    Receive,
}

/// One entry of a contract ABI.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiItem {
    #[serde(rename = "type")]
    pub kind: AbiItemKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(default)]
    pub state_mutability: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
}

impl AbiItem {
    /// Canonical signature, e.g. `uploadDocument(string,uint8,string,uint256)`.
    pub fn signature(&self) -> LedgerResult<String> {
        let types = self
            .inputs
            .iter()
            .map(|p| p.param_type().map(|t| t.canonical()))
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(format!(
            "{}({})",
            self.name.as_deref().unwrap_or_default(),
            types.join(",")
        ))
    }

    /// Four-byte function selector.
    pub fn selector(&self) -> LedgerResult<[u8; 4]> {
        let hash = keccak256(self.signature()?.as_bytes());
        Ok([hash[0], hash[1], hash[2], hash[3]])
    }

    /// Event topic0.
    pub fn topic(&self) -> LedgerResult<[u8; 32]> {
        Ok(keccak256(self.signature()?.as_bytes()))
    }

    /// Input types in declaration order.
    pub fn input_types(&self) -> LedgerResult<Vec<ParamType>> {
        self.inputs.iter().map(AbiParam::param_type).collect()
    }

    /// Output types in declaration order.
    pub fn output_types(&self) -> LedgerResult<Vec<ParamType>> {
        self.outputs.iter().map(AbiParam::param_type).collect()
    }

    /// Decode an event log into named values.
    ///
    /// Indexed static params come from `topics[1..]`, the rest from `data`.
    /// Indexed dynamic params are hashed on chain and are skipped.
    pub fn decode_log(
        &self,
        topics: &[[u8; 32]],
        data: &[u8],
    ) -> LedgerResult<HashMap<String, Token>> {
        let mut values = HashMap::new();
        let mut topic_iter = topics.iter().skip(usize::from(!self.anonymous));

        let mut body_params = Vec::new();
        for param in &self.inputs {
            let ty = param.param_type()?;
            if param.indexed {
                let Some(topic) = topic_iter.next() else {
                    return Err(LedgerError::Abi(format!(
                        "missing topic for indexed `{}`",
                        param.name
                    )));
                };
                if !ty.is_dynamic() {
                    let mut token = decode(&[ty], topic)?;
                    if let Some(token) = token.pop() {
                        values.insert(param.name.clone(), token);
                    }
                }
            } else {
                body_params.push((param.name.clone(), ty));
            }
        }

        let types: Vec<ParamType> = body_params.iter().map(|(_, t)| t.clone()).collect();
        let tokens = decode(&types, data)?;
        for ((name, _), token) in body_params.into_iter().zip(tokens) {
            values.insert(name, token);
        }
        Ok(values)
    }
}

/// A function, event or tuple component parameter.
#[derive(Clone, Debug, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub components: Vec<AbiParam>,
}

impl AbiParam {
    /// Parse the textual type, resolving `tuple` through `components`.
    pub fn param_type(&self) -> LedgerResult<ParamType> {
        if let Some(suffix) = self.ty.strip_prefix("tuple") {
            let inner = self
                .components
                .iter()
                .map(AbiParam::param_type)
                .collect::<LedgerResult<Vec<_>>>()?;
            return apply_array_suffix(ParamType::Tuple(inner), suffix);
        }
        ParamType::parse(&self.ty)
    }
}

/// ABI parameter type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Parse an elementary or array type name (not `tuple`).
    pub fn parse(text: &str) -> LedgerResult<Self> {
        if let Some(open) = text.rfind('[') {
            if text.ends_with(']') {
                let inner = Self::parse(&text[..open])?;
                return apply_array_suffix(inner, &text[open..]);
            }
        }

        let bad = || LedgerError::Abi(format!("unsupported ABI type `{text}`"));
        let parsed = match text {
            "address" => Self::Address,
            "bool" => Self::Bool,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            "uint" => Self::Uint(256),
            "int" => Self::Int(256),
            _ => {
                if let Some(bits) = text.strip_prefix("uint") {
                    Self::Uint(bits.parse().map_err(|_| bad())?)
                } else if let Some(bits) = text.strip_prefix("int") {
                    Self::Int(bits.parse().map_err(|_| bad())?)
                } else if let Some(len) = text.strip_prefix("bytes") {
                    let len: usize = len.parse().map_err(|_| bad())?;
                    if !(1..=32).contains(&len) {
                        return Err(bad());
                    }
                    Self::FixedBytes(len)
                } else {
                    return Err(bad());
                }
            }
        };
        Ok(parsed)
    }

    /// Name used in signatures.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Uint(bits) => format!("uint{bits}"),
            Self::Int(bits) => format!("int{bits}"),
            Self::Address => "address".into(),
            Self::Bool => "bool".into(),
            Self::FixedBytes(len) => format!("bytes{len}"),
            Self::Bytes => "bytes".into(),
            Self::String => "string".into(),
            Self::Array(inner) => format!("{}[]", inner.canonical()),
            Self::FixedArray(inner, len) => format!("{}[{len}]", inner.canonical()),
            Self::Tuple(items) => format!(
                "({})",
                items.iter().map(Self::canonical).collect::<Vec<_>>().join(",")
            ),
        }
    }

    /// True if the encoding is referenced by offset.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => true,
            Self::FixedArray(inner, _) => inner.is_dynamic(),
            Self::Tuple(items) => items.iter().any(Self::is_dynamic),
            _ => false,
        }
    }

    /// Bytes occupied in the head of the enclosing tuple.
    #[must_use]
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            Self::FixedArray(inner, len) => inner.head_size() * len,
            Self::Tuple(items) => items.iter().map(Self::head_size).sum(),
            _ => 32,
        }
    }
}

fn apply_array_suffix(mut ty: ParamType, suffix: &str) -> LedgerResult<ParamType> {
    let mut rest = suffix;
    while let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped
            .find(']')
            .ok_or_else(|| LedgerError::Abi(format!("unterminated array suffix `{suffix}`")))?;
        let dim = &stripped[..close];
        ty = if dim.is_empty() {
            ParamType::Array(Box::new(ty))
        } else {
            let len = dim
                .parse()
                .map_err(|_| LedgerError::Abi(format!("bad array length `{dim}`")))?;
            ParamType::FixedArray(Box::new(ty), len)
        };
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return Err(LedgerError::Abi(format!("bad type suffix `{suffix}`")));
    }
    Ok(ty)
}

/// Keccak-256 digest.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Flatten decoded outputs into a name -> value map.
///
/// A single struct output (`tuple` with components) is unpacked so callers
/// can read its fields directly.
pub fn named_outputs(
    params: &[AbiParam],
    mut tokens: Vec<Token>,
) -> LedgerResult<HashMap<String, Token>> {
    if params.len() == 1 && params[0].ty == "tuple" {
        let Some(Token::Tuple(fields)) = tokens.pop() else {
            return Err(LedgerError::Abi("expected struct output".into()));
        };
        return named_outputs(&params[0].components, fields);
    }
    Ok(params
        .iter()
        .map(|p| p.name.clone())
        .zip(tokens)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "contractName": "DocumentRegistry",
        "abi": [
            {"type": "constructor", "inputs": []},
            {"type": "function", "name": "uploadDocument", "stateMutability": "nonpayable",
             "inputs": [
                {"name": "_documentHash", "type": "string"},
                {"name": "_docType", "type": "uint8"},
                {"name": "_metadata", "type": "string"},
                {"name": "_expiryDate", "type": "uint256"}],
             "outputs": [{"name": "", "type": "uint256"}]},
            {"type": "event", "name": "DocumentUploaded", "anonymous": false,
             "inputs": [
                {"name": "documentId", "type": "uint256", "indexed": true},
                {"name": "owner", "type": "address", "indexed": true},
                {"name": "docType", "type": "uint8", "indexed": false}]}
        ],
        "bytecode": "0x6080"
    }"#;

    #[test]
    fn test_transfer_selector() {
        let item = AbiItem {
            kind: AbiItemKind::Function,
            name: Some("transfer".into()),
            inputs: vec![
                AbiParam {
                    name: "to".into(),
                    ty: "address".into(),
                    indexed: false,
                    components: vec![],
                },
                AbiParam {
                    name: "amount".into(),
                    ty: "uint256".into(),
                    indexed: false,
                    components: vec![],
                },
            ],
            outputs: vec![],
            state_mutability: None,
            anonymous: false,
        };
        assert_eq!(item.selector().unwrap(), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_artifact_parsing() {
        let artifact = Artifact::from_json(ARTIFACT).unwrap();
        let upload = artifact.function("uploadDocument").unwrap();
        assert_eq!(
            upload.signature().unwrap(),
            "uploadDocument(string,uint8,string,uint256)"
        );
        assert!(artifact.constructor().is_some());
        assert_eq!(artifact.bytecode_bytes().unwrap(), vec![0x60, 0x80]);
        assert!(artifact.function("missing").is_err());
    }

    #[test]
    fn test_param_type_parsing() {
        assert_eq!(
            ParamType::parse("uint256[]").unwrap(),
            ParamType::Array(Box::new(ParamType::Uint(256)))
        );
        assert_eq!(
            ParamType::parse("bytes32[2]").unwrap(),
            ParamType::FixedArray(Box::new(ParamType::FixedBytes(32)), 2)
        );
        assert!(ParamType::parse("bytes33").is_err());
        assert!(ParamType::parse("fixed128x18").is_err());
    }

    #[test]
    fn test_tuple_canonical() {
        let param = AbiParam {
            name: "doc".into(),
            ty: "tuple[]".into(),
            indexed: false,
            components: vec![
                AbiParam {
                    name: "id".into(),
                    ty: "uint256".into(),
                    indexed: false,
                    components: vec![],
                },
                AbiParam {
                    name: "tags".into(),
                    ty: "string[]".into(),
                    indexed: false,
                    components: vec![],
                },
            ],
        };
        let ty = param.param_type().unwrap();
        assert_eq!(ty.canonical(), "(uint256,string[])[]");
        assert!(ty.is_dynamic());
    }

    #[test]
    fn test_decode_log_indexed_and_data() {
        use primitive_types::U256;

        let artifact = Artifact::from_json(ARTIFACT).unwrap();
        let event = artifact.event("DocumentUploaded").unwrap();

        let mut id_topic = [0u8; 32];
        id_topic[30] = 0x03;
        id_topic[31] = 0xe9; // 1001
        let mut owner_topic = [0u8; 32];
        owner_topic[12..].copy_from_slice(&[0x11; 20]);
        let data = encode(&[Token::Uint(U256::from(1u64))]);

        let values = event
            .decode_log(&[event.topic().unwrap(), id_topic, owner_topic], &data)
            .unwrap();
        assert_eq!(values["documentId"].as_u64(), Some(1001));
        assert_eq!(values["docType"].as_u64(), Some(1));
        assert!(matches!(values["owner"], Token::Address(_)));
    }
}
