//! Machine-parseable `errcode` values carried in every error body.
//!
//! The `M_*` codes follow Matrix conventions; the lowercase phrases are the
//! bridge-specific codes existing provisioning clients already match on.

pub const FORBIDDEN: &str = "M_FORBIDDEN";
pub const NOT_FOUND: &str = "M_NOT_FOUND";
pub const MISSING_PARAM: &str = "M_MISSING_PARAM";
pub const UNKNOWN: &str = "M_UNKNOWN";

pub const NOT_CONNECTED: &str = "not connected";
pub const ALREADY_CONNECTED: &str = "already connected";
pub const FAILED_TO_DISCONNECT: &str = "failed to disconnect";
pub const FAILED_TO_CONNECT: &str = "failed to connect";
pub const NOT_LOGGED_IN: &str = "not logged in";

pub const ALREADY_LOGGED_IN: &str = "already logged in";
pub const LOGIN_IN_PROGRESS: &str = "login in progress";
pub const CONNECTION_ERROR: &str = "connection error";
