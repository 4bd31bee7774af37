#![allow(dead_code)]

/// Genesis datum captured from a live contract: one required signer, threshold 1.
pub const REFERENCE_DATUM_HEX: &str = "d8799f5840623935623133633732333664333330323833653732306263643164623765343763643733613861626438626138613737663465313235663161313434373539659f581c34c9af470aaff4f843ff7805ff9ff785fc1fe6af6c67baf7443800d6ff8001581c0fb7885eac82f0ea18abdea461c3911da8e88c0cf404b8d3f9e1d6cbff";
pub const REFERENCE_DOCUMENT_HASH: &[u8] = b"b95b13c7236d330283e720bcd1db7e47cd73a8abd8ba8a77f4e125f1a144759e";
pub const REFERENCE_SIGNER_HEX: &str = "34c9af470aaff4f843ff7805ff9ff785fc1fe6af6c67baf7443800d6";
pub const REFERENCE_CREATOR_HEX: &str = "0fb7885eac82f0ea18abdea461c3911da8e88c0cf404b8d3f9e1d6cb";

pub const TEST_CONTRACT_TYPE: &str = "rental";
pub const TEST_EMAIL_DOMAIN: &str = "example.com";
pub const KEY_HASH_LEN: usize = 28;
