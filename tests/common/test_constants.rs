//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Largest vCPU count the provider accepts.
pub const MAX_CPUS: u32 = 16;

/// Largest RAM size in megabytes the provider accepts.
pub const MAX_RAM_MB: u32 = 32_000;

/// File name of the private key written by the key file fixture.
pub const KEY_FILE_NAME: &str = "id_rsa";
