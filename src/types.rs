//! Core value types for the a3s-audit system
//!
//! All types use camelCase JSON serialization for wire compatibility.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

/// An opaque identifier (trace, user or resource)
///
/// Serializes to its natural JSON form: numbers stay numbers, UUIDs and
/// strings become strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Signed integer key
    Int(i64),
    /// Unsigned integer key that does not fit in `i64`
    Uint(u64),
    /// UUID key
    Uuid(Uuid),
    /// Free-form string key
    Str(String),
}

impl Identifier {
    /// Generate a random UUID v4 identifier
    pub fn new_v4() -> Self {
        Self::Uuid(Uuid::new_v4())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Uint(v) => write!(f, "{}", v),
            Self::Uuid(v) => write!(f, "{}", v),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Identifier {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Identifier {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for Identifier {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for Identifier {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Uint(v),
        }
    }
}

impl From<Uuid> for Identifier {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<String> for Identifier {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Identifier {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// Kind of operation being audited (e.g. "CREATE", "UPDATE")
///
/// Open-ended: applications may use any tag. Common CRUD tags are
/// provided as constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionType(Cow<'static, str>);

impl ActionType {
    pub const CREATE: Self = Self(Cow::Borrowed("CREATE"));
    pub const READ: Self = Self(Cow::Borrowed("READ"));
    pub const UPDATE: Self = Self(Cow::Borrowed("UPDATE"));
    pub const DELETE: Self = Self(Cow::Borrowed("DELETE"));
    pub const LIST: Self = Self(Cow::Borrowed("LIST"));

    /// Create a custom action tag
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ActionType {
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for ActionType {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

/// Kind of domain entity being audited (e.g. "User", "Order")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(Cow<'static, str>);

impl EntityType {
    /// Create an entity tag
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EntityType {
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for EntityType {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

/// Transport-derived facts about the request being observed
///
/// Populated by the adapter when the audit context is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    /// Client network address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Client user-agent string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Request target (URI, RPC name, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_uri: Option<String>,

    /// Request method (GET, POST, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl RequestInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn request_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = Some(uri.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// Current time in Unix milliseconds
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
