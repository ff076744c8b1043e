use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

pub const ITEM_ID_FIELD: &str = "ItemId";

/// Inbound bid as posted by a client.
///
/// Only `ItemId` is interpreted. The document itself is kept as received
/// (field order, number spelling, unknown fields) and serialized back out
/// with insignificant whitespace removed.
#[derive(Clone)]
pub struct Bid {
    item_id: Option<String>,
    document: Box<RawValue>,
}

impl Bid {
    /// Build a bid from the text of a JSON object.
    pub fn from_raw(raw: &RawValue) -> Result<Self, serde_json::Error> {
        let fields: BTreeMap<String, &RawValue> = serde_json::from_str(raw.get())?;

        // Property names bind case-insensitively; an exact match wins.
        let item_id = fields
            .get(ITEM_ID_FIELD)
            .or_else(|| {
                fields
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(ITEM_ID_FIELD))
                    .map(|(_, value)| value)
            })
            .and_then(|value| serde_json::from_str::<String>(value.get()).ok());

        let document = RawValue::from_string(compact(raw.get()))?;
        Ok(Self { item_id, document })
    }

    /// `None` when the field is absent, `null`, or not a string.
    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn as_json(&self) -> &str {
        self.document.get()
    }
}

impl fmt::Debug for Bid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bid").field(&self.as_json()).finish()
    }
}

impl PartialEq for Bid {
    fn eq(&self, other: &Self) -> bool {
        self.as_json() == other.as_json()
    }
}

impl<'de> Deserialize<'de> for Bid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Bid::from_raw(&raw).map_err(de::Error::custom)
    }
}

impl Serialize for Bid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

/// Strip whitespace outside string literals from valid JSON text.
fn compact(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if !matches!(c, ' ' | '\t' | '\n' | '\r') {
            out.push(c);
        }
    }
    out
}
