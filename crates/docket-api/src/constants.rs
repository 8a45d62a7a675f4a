//! API constants

/// Versioned prefix every batch route is mounted under.
pub const API_PREFIX: &str = "/api/v0";

/// Header carrying the authenticated caller id, set by the upstream auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
