/// Timestamp format used on the wire: ISO-8601 with an explicit UTC
/// offset, e.g. `2024-09-27T18:12:03-07:00`.
pub const ISO_8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// User agent sent on every outbound HTTP request.
pub const USER_AGENT: &str = concat!("instabao-admin/", env!("CARGO_PKG_VERSION"));
