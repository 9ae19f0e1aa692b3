//! TigerStyle Constants
//!
//! Named limits and defaults. Units are part of the name.

/// Namespace assigned to prefixes created without one.
pub const NAMESPACE_DEFAULT: &str = "root";

/// Combined cidr + namespace bytes a record key may hold.
///
/// Keeps keys well inside PostgreSQL's btree index row limit (2704 bytes).
pub const PREFIX_KEY_BYTES_MAX: usize = 2048;

/// Default table name for the PostgreSQL backend.
pub const POSTGRES_TABLE_DEFAULT: &str = "prefixes";

/// Default PostgreSQL port.
pub const POSTGRES_PORT_DEFAULT: u16 = 5432;

/// Connections held by the PostgreSQL pool.
pub const POSTGRES_CONNECTIONS_MAX: u32 = 10;

/// PostgreSQL truncates identifiers beyond this length.
pub const POSTGRES_IDENTIFIER_BYTES_MAX: usize = 63;

/// Suffix length reserved for derived index names (`_identity_idx`).
pub const POSTGRES_INDEX_SUFFIX_BYTES_MAX: usize = 13;

/// Default number of operations in a simulated run.
pub const DST_OPS_COUNT_DEFAULT: usize = 500;

/// Environment variable holding the simulation seed.
pub const DST_SEED_ENV: &str = "DST_SEED";
