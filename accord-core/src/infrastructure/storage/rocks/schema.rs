/// Helper to build storage keys consistently.
pub struct KeyBuilder {
    buf: Vec<u8>,
}

impl KeyBuilder {
    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap) }
    }

    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.buf.extend_from_slice(prefix);
        self
    }

    pub fn hash32(mut self, hash: &[u8; 32]) -> Self {
        self.buf.extend_from_slice(hash);
        self
    }

    pub fn str(mut self, value: &str) -> Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn u64_be(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn sep(mut self) -> Self {
        self.buf.push(b':');
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

pub const SCHEMA_VERSION: u32 = 1;

pub const CF_METADATA: &str = "metadata";
pub const CF_DEFAULT: &str = "default";
pub const CF_CONTRACT: &str = "contract";
/// Genesis reference and signer-membership indexes.
pub const CF_CONTRACT_INDEX: &str = "contract_index";
pub const CF_SIGNER: &str = "signer";
pub const CF_USER: &str = "user";
pub const CF_USER_INDEX: &str = "user_index";
pub const CF_INTENT: &str = "intent";

pub const KEY_SCHEMA_VERSION: &[u8] = b"schema_version";
pub const KEY_NEXT_CONTRACT_ID: &[u8] = b"next_contract_id";
pub const KEY_NEXT_USER_ID: &[u8] = b"next_user_id";
pub const KEY_NEXT_SIGNER_ROW_ID: &[u8] = b"next_signer_row_id";

pub const PREFIX_CONTRACT: &[u8] = b"con:";
pub const PREFIX_GENESIS: &[u8] = b"gen:";
pub const PREFIX_SIGNER: &[u8] = b"sig:";
pub const PREFIX_USER_CONTRACT: &[u8] = b"usr_con:";
pub const PREFIX_USER: &[u8] = b"usr:";
pub const PREFIX_EMAIL: &[u8] = b"email:";
pub const PREFIX_INTENT: &[u8] = b"int:";
