//! # ABI Codec
//!
//! Head/tail encoding of call arguments and decoding of return data and logs.

use super::{AbiItem, ParamType};
use crate::domain::{LedgerError, LedgerResult};
use primitive_types::U256;
use shared_types::Address;

/// Selector of `Error(string)`, the payload of `require`/`revert` messages.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// An ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    /// Signed values are carried as their two's-complement word.
    Int(U256),
    Address(Address),
    Bool(bool),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Token>),
    FixedArray(Vec<Token>),
    Tuple(Vec<Token>),
}

impl Token {
    /// Unsigned value if it fits in `u64`.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(v) | Self::Int(v) if v.bits() <= 64 => Some(v.low_u64()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(a) => Some(*a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a dynamic or fixed array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Token]> {
        match self {
            Self::Array(items) | Self::FixedArray(items) => Some(items),
            _ => None,
        }
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes(_) | Self::String(_) | Self::Array(_) => true,
            Self::FixedArray(items) | Self::Tuple(items) => items.iter().any(Self::is_dynamic),
            _ => false,
        }
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<Address> for Token {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode `tokens` as a top-level tuple.
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    encode_tuple(tokens)
}

/// Selector followed by encoded arguments.
///
/// Argument count must match the function's inputs.
pub fn encode_call(function: &AbiItem, args: &[Token]) -> LedgerResult<Vec<u8>> {
    if function.inputs.len() != args.len() {
        return Err(LedgerError::Abi(format!(
            "{} expects {} arguments, got {}",
            function.signature()?,
            function.inputs.len(),
            args.len()
        )));
    }
    let mut data = function.selector()?.to_vec();
    data.extend(encode(args));
    Ok(data)
}

fn word_u256(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn word_usize(value: usize) -> [u8; 32] {
    word_u256(U256::from(value))
}

fn pad_right(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let rem = out.len() % 32;
    if rem != 0 {
        out.resize(out.len() + 32 - rem, 0);
    }
    out
}

fn encode_tuple(tokens: &[Token]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = tokens.iter().map(encode_token).collect();
    let head_len: usize = tokens
        .iter()
        .zip(&encoded)
        .map(|(t, e)| if t.is_dynamic() { 32 } else { e.len() })
        .sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (token, bytes) in tokens.iter().zip(encoded) {
        if token.is_dynamic() {
            head.extend_from_slice(&word_usize(head_len + tail.len()));
            tail.extend(bytes);
        } else {
            head.extend(bytes);
        }
    }
    head.extend(tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(v) | Token::Int(v) => word_u256(*v).to_vec(),
        Token::Address(a) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(a.as_bytes());
            word.to_vec()
        }
        Token::Bool(b) => word_usize(usize::from(*b)).to_vec(),
        Token::FixedBytes(bytes) => {
            let mut word = [0u8; 32];
            let len = bytes.len().min(32);
            word[..len].copy_from_slice(&bytes[..len]);
            word.to_vec()
        }
        Token::Bytes(bytes) => {
            let mut out = word_usize(bytes.len()).to_vec();
            out.extend(pad_right(bytes));
            out
        }
        Token::String(s) => {
            let mut out = word_usize(s.len()).to_vec();
            out.extend(pad_right(s.as_bytes()));
            out
        }
        Token::Array(items) => {
            let mut out = word_usize(items.len()).to_vec();
            out.extend(encode_tuple(items));
            out
        }
        Token::FixedArray(items) | Token::Tuple(items) => encode_tuple(items),
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode `data` as a top-level tuple of `types`.
pub fn decode(types: &[ParamType], data: &[u8]) -> LedgerResult<Vec<Token>> {
    decode_tuple(types, data, 0)
}

fn short(at: usize, data: &[u8]) -> LedgerError {
    LedgerError::Abi(format!(
        "return data too short: need word at {at}, have {} bytes",
        data.len()
    ))
}

fn read_word(data: &[u8], at: usize) -> LedgerResult<&[u8]> {
    data.get(at..at + 32).ok_or_else(|| short(at, data))
}

fn read_usize(data: &[u8], at: usize) -> LedgerResult<usize> {
    let value = U256::from_big_endian(read_word(data, at)?);
    if value > U256::from(data.len()) {
        return Err(LedgerError::Abi(format!("offset or length {value} out of range")));
    }
    Ok(value.low_u64() as usize)
}

fn decode_tuple(types: &[ParamType], data: &[u8], base: usize) -> LedgerResult<Vec<Token>> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut offset = base;
    for ty in types {
        if ty.is_dynamic() {
            let relative = read_usize(data, offset)?;
            tokens.push(decode_at(ty, data, base + relative)?);
        } else {
            tokens.push(decode_at(ty, data, offset)?);
        }
        offset += ty.head_size();
    }
    Ok(tokens)
}

fn decode_at(ty: &ParamType, data: &[u8], at: usize) -> LedgerResult<Token> {
    let token = match ty {
        ParamType::Uint(_) => Token::Uint(U256::from_big_endian(read_word(data, at)?)),
        ParamType::Int(_) => Token::Int(U256::from_big_endian(read_word(data, at)?)),
        ParamType::Address => {
            let word = read_word(data, at)?;
            Token::Address(Address::from_slice(&word[12..]).ok_or_else(|| short(at, data))?)
        }
        ParamType::Bool => Token::Bool(read_word(data, at)?.iter().any(|b| *b != 0)),
        ParamType::FixedBytes(len) => Token::FixedBytes(read_word(data, at)?[..*len].to_vec()),
        ParamType::Bytes => Token::Bytes(read_bytes(data, at)?.to_vec()),
        ParamType::String => {
            let bytes = read_bytes(data, at)?;
            Token::String(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| LedgerError::Abi(format!("invalid utf-8 string: {e}")))?,
            )
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let types = vec![(**inner).clone(); len];
            Token::Array(decode_tuple(&types, data, at + 32)?)
        }
        ParamType::FixedArray(inner, len) => {
            let types = vec![(**inner).clone(); *len];
            Token::FixedArray(decode_tuple(&types, data, at)?)
        }
        ParamType::Tuple(items) => Token::Tuple(decode_tuple(items, data, at)?),
    };
    Ok(token)
}

fn read_bytes(data: &[u8], at: usize) -> LedgerResult<&[u8]> {
    let len = read_usize(data, at)?;
    data.get(at + 32..at + 32 + len).ok_or_else(|| short(at + 32, data))
}

// =============================================================================
// REVERT REASONS
// =============================================================================

/// Extract the message of an `Error(string)` revert payload.
#[must_use]
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&ERROR_STRING_SELECTOR)?;
    match decode(&[ParamType::String], body).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}

/// Extract a revert reason from a node error message.
///
/// Handles the Hardhat form (`reverted with reason string 'X'`), the geth
/// form (`execution reverted: X`) and a bare `revert X`.
#[must_use]
pub fn revert_reason_from_message(message: &str) -> Option<String> {
    if let Some(rest) = message.split("reverted with reason string '").nth(1) {
        return rest.split('\'').next().map(str::to_string);
    }
    if let Some(rest) = message.split("execution reverted: ").nth(1) {
        return Some(rest.trim().to_string());
    }
    message
        .split("revert ")
        .nth(1)
        .map(|rest| rest.trim().to_string())
        .filter(|r| !r.is_empty())
}
