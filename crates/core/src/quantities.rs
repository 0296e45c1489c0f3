use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A name listed twice in one recipe section.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("duplicate entry `{0}`")]
pub struct DuplicateEntry(pub String);

/// Ordered `name -> quantity` mapping with unique names.
///
/// Backend order is kept for display. A JSON object that repeats a name is a
/// decode error instead of a silent overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quantities(Vec<(String, String)>);

impl Quantities {
    /// Build from pairs, rejecting a repeated name.
    pub fn try_from_pairs<I, K, V>(pairs: I) -> Result<Self, DuplicateEntry>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut out = Self::default();
        for (k, v) in pairs {
            out.insert_unique(k.into(), v.into())?;
        }
        Ok(out)
    }

    fn insert_unique(&mut self, name: String, quantity: String) -> Result<(), DuplicateEntry> {
        if self.get(&name).is_some() {
            return Err(DuplicateEntry(name));
        }
        self.0.push((name, quantity));
        Ok(())
    }

    /// Quantity for `name`, if listed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Entries in backend order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Quantities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Quantities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantitiesVisitor;

        impl<'de> Visitor<'de> for QuantitiesVisitor {
            type Value = Quantities;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of name -> quantity strings")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(Quantities::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Quantities::default();
                while let Some((name, quantity)) = access.next_entry::<String, String>()? {
                    out.insert_unique(name, quantity)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(out)
            }
        }

        deserializer.deserialize_any(QuantitiesVisitor)
    }
}
