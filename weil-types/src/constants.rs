use std::time::Duration;

// ─── Sentinel Endpoints ──────────────────────────────────────────────────────

/// Default base URL of the sentinel node fronting the ledger.
pub const DEFAULT_SENTINEL_URL: &str = "https://sentinel.unweil.me";

/// Environment variable overriding the sentinel base URL.
pub const SENTINEL_HOST_ENV: &str = "SENTINEL_HOST";

/// Multipart contract-execution endpoint.
pub const EXECUTE_SMARTCONTRACT_PATH: &str = "/contracts/execute_smartcontract";

/// Plain JSON transaction submission endpoint.
pub const SUBMIT_TXN_PATH: &str = "/submit_txn";

/// Applet name → contract id lookup endpoint.
pub const GET_APPLET_ADDRESS_PATH: &str = "/get_applet_address";

// ─── Execution Payload ───────────────────────────────────────────────────────

/// Multipart field carrying the gzip-compressed envelope.
pub const TRANSACTION_FIELD_NAME: &str = "transaction";

/// Filename attached to the multipart part.
pub const TRANSACTION_FILE_NAME: &str = "transaction_data";

/// Content type of the multipart part.
pub const TRANSACTION_MIME: &str = "application/octet-stream";

/// Header flag asking the sentinel not to wait for the commit.
pub const NON_BLOCKING_HEADER: &str = "x-non-blocking";

/// `type` tag of a contract-execution user transaction.
pub const SMART_CONTRACT_EXECUTOR: &str = "SmartContractExecutor";

/// `type` tag of the default verifier.
pub const DEFAULT_VERIFIER: &str = "DefaultVerifier";

// ─── Client Behaviour ────────────────────────────────────────────────────────

/// Maximum number of submissions made while reconciling nonce conflicts.
pub const MAX_RETRIES: u32 = 3;

/// Per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of in-flight submissions per client.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Nonce handed out for a routing key the tracker has never seen.
pub const INITIAL_NONCE: u64 = 1;

/// Service name of the audit applet.
pub const AUDIT_APPLET_SVC_NAME: &str = "auditor";

// ─── Contract Ids ────────────────────────────────────────────────────────────

/// Length of a base32-decoded contract id.
pub const CONTRACT_ID_DECODED_LEN: usize = 36;

/// Width of the big-endian pod counter prefix inside a contract id.
pub const POD_COUNTER_LEN: usize = 4;

// ─── Key Derivation ──────────────────────────────────────────────────────────

/// Base path under which derived accounts are indexed. Coin type 9345 is
/// WeilChain's SLIP-44 registration.
pub const DERIVATION_PATH: &str = "m/44'/9345'/0'/0";

/// Version tag of the stored mnemonic wallet format.
pub const STORED_WALLET_VERSION: u32 = 1;
