//! Handler payload values.
//!
//! `Payload` is the value tree handlers put into a response intent. It is
//! richer than JSON: it carries arbitrary-precision integers and user
//! identities, both of which get special treatment when encoded.

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::security::permissions::Permission;

/// String-keyed map of payload values.
pub type PayloadMap = BTreeMap<String, Payload>;

/// An arbitrary value produced by a handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    BigInt(BigInt),
    String(String),
    List(Vec<Payload>),
    Map(PayloadMap),
    User(UserIdentity),
}

impl Payload {
    /// An empty map.
    pub fn map() -> Self {
        Payload::Map(PayloadMap::new())
    }

    /// Builder-style insert. Non-map payloads are returned unchanged.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Payload>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert into a map payload. Returns `false` when the payload is not a map.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Payload>) -> bool {
        match self {
            Payload::Map(entries) => {
                entries.insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        match self {
            Payload::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Payload::Map(_))
    }

    /// Null and the empty string are not worth writing as a response body.
    pub fn is_blank(&self) -> bool {
        match self {
            Payload::Null => true,
            Payload::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Identity of the user a request runs as.
///
/// Encodes as a map with `_id`, `uname`, `displayName` and any extra fields.
/// The permission set is never encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct UserIdentity {
    pub id: i64,
    pub uname: String,
    pub display_name: Option<String>,
    pub fields: PayloadMap,
    permissions: Permission,
}

impl UserIdentity {
    pub fn new(id: i64, uname: impl Into<String>) -> Self {
        Self {
            id,
            uname: uname.into(),
            display_name: None,
            fields: PayloadMap::new(),
            permissions: Permission::NONE,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Payload>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permission) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn permissions(&self) -> Permission {
        self.permissions
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Int(i64::from(value))
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Int(value)
    }
}

impl From<u32> for Payload {
    fn from(value: u32) -> Self {
        Payload::Int(i64::from(value))
    }
}

impl From<u64> for Payload {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Payload::Int(v),
            Err(_) => Payload::BigInt(BigInt::from(value)),
        }
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Payload::Float(value)
    }
}

impl From<BigInt> for Payload {
    fn from(value: BigInt) -> Self {
        Payload::BigInt(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::String(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::String(value)
    }
}

impl From<UserIdentity> for Payload {
    fn from(value: UserIdentity) -> Self {
        Payload::User(value)
    }
}

impl From<PayloadMap> for Payload {
    fn from(value: PayloadMap) -> Self {
        Payload::Map(value)
    }
}

impl<T: Into<Payload>> From<Vec<T>> for Payload {
    fn from(value: Vec<T>) -> Self {
        Payload::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Payload::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Payload::from(u)
                } else {
                    Payload::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Payload::String(s),
            Value::Array(items) => Payload::List(items.into_iter().map(Payload::from).collect()),
            Value::Object(entries) => Payload::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Payload::from(v)))
                    .collect(),
            ),
        }
    }
}
