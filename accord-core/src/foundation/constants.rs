//! System-wide constants for Accord contract signing.

/// Nanoseconds per second (10^9).
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Nanoseconds per millisecond (10^6).
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Environment variable that pins `now_nanos()` in tests.
pub const TEST_NOW_NANOS_ENV_VAR: &str = "ACCORD_TEST_NOW_NANOS";

/// Ledger transaction hash size in bytes.
pub const TX_REF_SIZE: usize = 32;

/// Maximum encoded size of a structured record accepted by the decoder (16 KB).
///
/// A contract with a few hundred signers stays far below this.
pub const MAX_RECORD_BYTES: usize = 16 * 1024;

/// Maximum CBOR nesting depth accepted by the decoder.
pub const MAX_CBOR_DEPTH: usize = 32;

/// Plutus data splits byte strings into chunks of at most this many bytes.
pub const PLUTUS_BYTES_CHUNK: usize = 64;

/// Number of positional fields in the contract record constructor.
pub const RECORD_FIELD_COUNT: usize = 5;

/// Action tag carried by the signing redeemer.
pub const SIGN_CONTRACT_ACTION: &[u8] = b"sign_contract";

/// Length of credentials generated for provisioned signers.
pub const GENERATED_PASSWORD_LEN: usize = 16;

/// Maximum number of signers on a single contract.
pub const MAX_CONTRACT_SIGNERS: usize = 256;

/// Maximum length of a contract name.
pub const MAX_CONTRACT_NAME_LENGTH: usize = 256;

/// Maximum length of an email address.
pub const MAX_EMAIL_LENGTH: usize = 320;

/// Timeout for acquiring storage mutexes.
pub const STORAGE_LOCK_TIMEOUT_SECS: u64 = 5;

/// Default page size for contract listings.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Maximum page size for contract listings.
pub const MAX_PAGE_LIMIT: usize = 100;
