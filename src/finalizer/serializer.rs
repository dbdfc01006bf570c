//! Serialization filter for structured output.
//!
//! Rules applied to every key/value pair while encoding for the wire:
//! - keys starting with `_` are dropped, except `_id`
//! - arbitrary-precision integers become `"BigInt::<digits>"` strings
//! - user identities lose `displayName` unless the caller may reveal it
//!
//! The filter works during the encode pass and never touches its input.

use num_bigint::BigInt;
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};

use super::payload::{Payload, UserIdentity};

pub const BIGINT_TAG: &str = "BigInt";
pub const IDENTITY_KEY: &str = "_id";
pub const UNAME_KEY: &str = "uname";
pub const DISPLAY_NAME_KEY: &str = "displayName";

const PRIVATE_PREFIX: char = '_';

#[derive(Debug, Clone, Copy)]
enum Visibility {
    /// Everything is kept (template data never leaves the server).
    Raw,
    /// Wire rules apply.
    Wire { reveal_display_name: bool },
}

/// A payload viewed through the serialization filter.
#[derive(Debug, Clone, Copy)]
pub struct Filtered<'a> {
    value: &'a Payload,
    visibility: Visibility,
}

/// View `value` through the wire filter.
pub fn filtered(value: &Payload, reveal_display_name: bool) -> Filtered<'_> {
    Filtered {
        value,
        visibility: Visibility::Wire { reveal_display_name },
    }
}

/// Encode `value` as a JSON document with the wire filter applied.
///
/// Fails only for values JSON cannot represent (non-finite floats).
pub fn encode(value: &Payload, reveal_display_name: bool) -> Result<String, serde_json::Error> {
    serde_json::to_string(&filtered(value, reveal_display_name))
}

/// Whether a map key survives the wire filter.
pub fn is_visible_key(key: &str) -> bool {
    !key.starts_with(PRIVATE_PREFIX) || key == IDENTITY_KEY
}

pub fn tag_bigint(value: &BigInt) -> String {
    format!("{BIGINT_TAG}::{value}")
}

impl<'a> Filtered<'a> {
    fn child(&self, value: &'a Payload) -> Filtered<'a> {
        Filtered {
            value,
            visibility: self.visibility,
        }
    }

    fn keeps(&self, key: &str) -> bool {
        match self.visibility {
            Visibility::Raw => true,
            Visibility::Wire { .. } => is_visible_key(key),
        }
    }

    fn reveals_display_name(&self) -> bool {
        match self.visibility {
            Visibility::Raw => true,
            Visibility::Wire { reveal_display_name } => reveal_display_name,
        }
    }

    fn serialize_user<S: Serializer>(&self, user: &'a UserIdentity, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(IDENTITY_KEY, &user.id)?;
        map.serialize_entry(UNAME_KEY, &user.uname)?;
        if let Some(display_name) = user.display_name.as_ref().filter(|_| self.reveals_display_name()) {
            map.serialize_entry(DISPLAY_NAME_KEY, display_name)?;
        }
        for (key, value) in &user.fields {
            if matches!(key.as_str(), IDENTITY_KEY | UNAME_KEY | DISPLAY_NAME_KEY) || !self.keeps(key) {
                continue;
            }
            map.serialize_entry(key, &self.child(value))?;
        }
        map.end()
    }
}

impl Serialize for Filtered<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Payload::Null => serializer.serialize_unit(),
            Payload::Bool(b) => serializer.serialize_bool(*b),
            Payload::Int(i) => serializer.serialize_i64(*i),
            Payload::Float(f) if !f.is_finite() => {
                Err(S::Error::custom(format!("cannot encode non-finite number {f}")))
            }
            Payload::Float(f) => serializer.serialize_f64(*f),
            Payload::BigInt(v) => serializer.serialize_str(&tag_bigint(v)),
            Payload::String(s) => serializer.serialize_str(s),
            Payload::List(items) => serializer.collect_seq(items.iter().map(|item| self.child(item))),
            Payload::Map(entries) => {
                let mut map = serializer.serialize_map(None)?;
                for (key, value) in entries.iter().filter(|(key, _)| self.keeps(key)) {
                    map.serialize_entry(key, &self.child(value))?;
                }
                map.end()
            }
            Payload::User(user) => self.serialize_user(user, serializer),
        }
    }
}

/// Unfiltered encoding, used for template data.
impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Filtered {
            value: self,
            visibility: Visibility::Raw,
        }
        .serialize(serializer)
    }
}
