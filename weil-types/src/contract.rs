use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base32::Alphabet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{CONTRACT_ID_DECODED_LEN, POD_COUNTER_LEN};
use crate::error::WeilError;

/// Decode the pod (routing) counter embedded in a base32 contract id.
///
/// The id is uppercased and decoded as unpadded RFC 4648 base32. The result
/// must be exactly 36 bytes; the first four, read big-endian as a signed
/// integer, select the pod that executes calls to the contract.
pub fn decode_pod_counter(contract_id: &str) -> Result<i32, WeilError> {
    let invalid = |reason: String| WeilError::InvalidContractId {
        contract_id: contract_id.to_string(),
        reason,
    };

    let upper = contract_id.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(invalid("empty contract id".to_string()));
    }

    let decoded = base32::decode(Alphabet::Rfc4648 { padding: false }, &upper)
        .ok_or_else(|| invalid("not valid base32".to_string()))?;

    if decoded.len() != CONTRACT_ID_DECODED_LEN {
        return Err(invalid(format!(
            "expected {} bytes, got {}",
            CONTRACT_ID_DECODED_LEN,
            decoded.len()
        )));
    }

    let mut prefix = [0u8; POD_COUNTER_LEN];
    prefix.copy_from_slice(&decoded[..POD_COUNTER_LEN]);
    Ok(i32::from_be_bytes(prefix))
}

/// Identifier of a deployed applet, validated on construction.
///
/// Cloning is cheap; the string is shared and the pod counter is decoded once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractId {
    id: Arc<str>,
    pod_counter: i32,
}

impl ContractId {
    /// Parse and validate a contract id string.
    pub fn parse(contract_id: &str) -> Result<Self, WeilError> {
        let pod_counter = decode_pod_counter(contract_id)?;
        Ok(Self {
            id: Arc::from(contract_id.trim()),
            pod_counter,
        })
    }

    /// The pod counter that routes calls to this contract.
    pub fn pod_counter(&self) -> i32 {
        self.pod_counter
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl FromStr for ContractId {
    type Err = WeilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContractId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.id)
    }
}

impl<'de> Deserialize<'de> for ContractId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ContractId::parse(&s).map_err(serde::de::Error::custom)
    }
}
