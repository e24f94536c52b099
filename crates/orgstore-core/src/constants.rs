//! Well-known names shared across backends.

/// Space created together with every organization.
pub const LOADINGZONE: &str = "loadingzone";

/// Name of the singleton policy aggregating the statements of all public spaces.
pub const PUBLIC_ACCESS_POLICY: &str = "spc_all_public";

/// Separator between the segments of scoped policy names.
pub const POLICY_NAME_SEPARATOR: char = '_';

/// Separator between the segments of object keys in prefix-emulated storage.
pub const KEY_DELIMITER: char = '/';
