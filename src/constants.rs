//! Constants
//!
//! TigerStyle: Explicit limits with units, no magic numbers.

// =============================================================================
// Ship Limits
// =============================================================================

/// Maximum ship name length in characters
pub const SHIP_NAME_CHARS_MAX: usize = 127;

/// Exact IMO number length in digits
pub const IMO_NUMBER_DIGITS_COUNT: usize = 7;

// =============================================================================
// Listing
// =============================================================================

/// Page size when the caller does not ask for one
pub const LIST_LIMIT_DEFAULT: usize = 20;

/// Largest page size a caller may ask for
pub const LIST_LIMIT_MAX: usize = 1_000;

// =============================================================================
// Storage
// =============================================================================

/// Default SQLite database path
pub const DATABASE_PATH_DEFAULT: &str = "~/.ships/ships.db";

/// Path that selects a private in-memory SQLite database
pub const DATABASE_PATH_IN_MEMORY: &str = ":memory:";

/// Default pool size for the SQLite backend
pub const DATABASE_CONNECTIONS_COUNT_DEFAULT: u32 = 5;

/// Largest pool size accepted from configuration
pub const DATABASE_CONNECTIONS_COUNT_MAX: u32 = 64;

/// How long a SQLite writer waits for a competing writer's lock
pub const DATABASE_BUSY_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Time
// =============================================================================

/// Milliseconds per second
pub const TIME_MS_PER_SEC: u64 = 1_000;

/// Largest single advance of a simulated clock (one day)
pub const SIM_CLOCK_ADVANCE_MS_MAX: u64 = 86_400 * TIME_MS_PER_SEC;

/// Simulated clock start, 2024-01-01T00:00:00Z in milliseconds
pub const SIM_CLOCK_START_MS: u64 = 1_704_067_200_000;

// =============================================================================
// HTTP
// =============================================================================

/// Default HTTP bind address
pub const HTTP_BIND_ADDRESS_DEFAULT: &str = "127.0.0.1:8000";

/// Application name
pub const APP_NAME: &str = "ships";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
