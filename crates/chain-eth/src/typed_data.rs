//! Minimal EIP-712 support for structs whose members are all `string`.
//!
//! That is the only shape the onboarding message needs, so there is no
//! general ABI encoder here: each member is encoded as `keccak256(value)`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};

const DOMAIN_TYPE: &str = "EIP712Domain(string name,string version,uint256 chainId)";

/// EIP-712 domain with `name`, `version` and `chainId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
}

impl Eip712Domain {
    pub fn separator(&self) -> [u8; 32] {
        let mut chain_id = [0u8; 32];
        chain_id[24..].copy_from_slice(&self.chain_id.to_be_bytes());

        let mut hasher = Keccak256::new();
        hasher.update(Keccak256::digest(DOMAIN_TYPE.as_bytes()));
        hasher.update(Keccak256::digest(self.name.as_bytes()));
        hasher.update(Keccak256::digest(self.version.as_bytes()));
        hasher.update(chain_id);
        hasher.finalize().into()
    }
}

/// A named `string` member and its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringField {
    pub name: String,
    pub value: String,
}

/// Typed data whose primary type has only `string` members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedData {
    pub domain: Eip712Domain,
    pub primary_type: String,
    pub fields: Vec<StringField>,
}

impl TypedData {
    pub fn new(domain: Eip712Domain, primary_type: impl Into<String>) -> Self {
        Self {
            domain,
            primary_type: primary_type.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(StringField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// `Type(string a,string b)`
    pub fn encode_type(&self) -> String {
        let members: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("string {}", f.name))
            .collect();
        format!("{}({})", self.primary_type, members.join(","))
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(Keccak256::digest(self.encode_type().as_bytes()));
        for field in &self.fields {
            hasher.update(Keccak256::digest(field.value.as_bytes()));
        }
        hasher.finalize().into()
    }

    /// The digest a wallet signs: `keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)`.
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update([0x19u8, 0x01]);
        hasher.update(self.domain.separator());
        hasher.update(self.struct_hash());
        hasher.finalize().into()
    }

    /// JSON accepted by `eth_signTypedData_v4`.
    pub fn to_json(&self) -> Value {
        let members: Vec<Value> = self
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "type": "string" }))
            .collect();
        let message: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), Value::String(f.value.clone())))
            .collect();

        let mut types = serde_json::Map::new();
        types.insert(
            "EIP712Domain".into(),
            json!([
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
            ]),
        );
        types.insert(self.primary_type.clone(), Value::Array(members));

        json!({
            "types": types,
            "primaryType": self.primary_type,
            "domain": self.domain,
            "message": message,
        })
    }
}
