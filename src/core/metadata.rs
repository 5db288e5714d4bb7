//! Metadata for objects, properties and archives.
//!
//! Metadata is an ordered list of string key/value pairs. Schema layers
//! identify themselves through it (`schema`, `schemaBaseType`,
//! `interpretation`), and archives record their provenance in it.

use smallvec::SmallVec;
use std::fmt;

/// How strictly a schema probe compares metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchemaMatching {
    /// The `schema` entry must equal the requested title.
    #[default]
    Strict,
    /// Every header matches. Used to wrap data without checking it.
    NoMatching,
}

/// Ordered key/value pairs of strings.
///
/// Insertion order is preserved so a written header reads back identically.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    entries: SmallVec<[(String, String); 4]>,
}

impl MetaData {
    /// Schema title key.
    pub const SCHEMA_KEY: &'static str = "schema";
    /// Schema base type key.
    pub const SCHEMA_BASE_KEY: &'static str = "schemaBaseType";
    /// Interpretation key (e.g. "point", "vector", "normal").
    pub const INTERPRETATION_KEY: &'static str = "interpretation";

    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set only if the key is not present yet.
    pub fn set_unique(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.entries.push((key, value.into()));
        true
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over key/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add every entry of `other` that is not already present.
    pub fn append_unique(&mut self, other: &MetaData) {
        for (k, v) in other.iter() {
            self.set_unique(k, v);
        }
    }

    /// Serialize as `key=value;key2=value2`, escaping `\`, `;` and `=`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            escape_into(&mut out, k);
            out.push('=');
            escape_into(&mut out, v);
        }
        out
    }

    /// Parse the [`serialize`](Self::serialize) format. Entries without an
    /// unescaped `=` or with an empty key are skipped.
    pub fn parse(s: &str) -> Self {
        let mut meta = Self::new();
        for part in split_unescaped(s, ';') {
            let mut kv = split_unescaped(part, '=');
            let (Some(key), Some(_)) = (kv.next(), kv.next()) else {
                continue;
            };
            let value = &part[key.len() + 1..];
            let key = unescape(key);
            if !key.is_empty() {
                meta.set(key, unescape(value));
            }
        }
        meta
    }

    /// Schema title, if any.
    pub fn schema(&self) -> Option<&str> {
        self.get(Self::SCHEMA_KEY)
    }

    pub fn set_schema(&mut self, schema: &str) {
        self.set(Self::SCHEMA_KEY, schema);
    }

    pub fn schema_base(&self) -> Option<&str> {
        self.get(Self::SCHEMA_BASE_KEY)
    }

    pub fn interpretation(&self) -> Option<&str> {
        self.get(Self::INTERPRETATION_KEY)
    }

    /// Strict schema probe.
    pub fn matches_schema(&self, title: &str) -> bool {
        self.matches_schema_with(title, SchemaMatching::Strict)
    }

    /// Schema probe with an explicit matching mode.
    pub fn matches_schema_with(&self, title: &str, matching: SchemaMatching) -> bool {
        match matching {
            SchemaMatching::NoMatching => true,
            SchemaMatching::Strict => self.schema() == Some(title),
        }
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetaData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut meta = Self::new();
        for (k, v) in iter {
            meta.set(k, v);
        }
        meta
    }
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, '\\' | ';' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('\\' | ';' | '=')) => out.push(next),
                Some(other) => {
                    out.push(c);
                    out.push(other);
                }
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on `sep` where it is not preceded by an odd run of backslashes.
fn split_unescaped(s: &str, sep: char) -> impl Iterator<Item = &str> {
    let mut start = 0;
    let mut escaped = false;
    let mut pieces = Vec::new();
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            pieces.push(&s[start..i]);
            start = i + 1;
        }
    }
    if start < s.len() {
        pieces.push(&s[start..]);
    }
    pieces.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_order() {
        let mut meta = MetaData::new();
        meta.set("b", "1");
        meta.set("a", "2");
        meta.set("b", "3");
        let pairs: Vec<_> = meta.iter().collect();
        assert_eq!(pairs, vec![("b", "3"), ("a", "2")]);
    }

    #[test]
    fn test_set_unique() {
        let mut meta = MetaData::new().with("k", "v");
        assert!(!meta.set_unique("k", "other"));
        assert_eq!(meta.get("k"), Some("v"));
        meta.append_unique(&MetaData::new().with("k", "x").with("z", "y"));
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.get("z"), Some("y"));
    }

    #[test]
    fn test_serialize_parse() {
        let meta = MetaData::new()
            .with("schema", "AbcGeom_PolyMesh_v1")
            .with("interpretation", "point");
        let s = meta.serialize();
        assert_eq!(s, "schema=AbcGeom_PolyMesh_v1;interpretation=point");
        assert_eq!(MetaData::parse(&s), meta);
    }

    #[test]
    fn test_escape() {
        let meta = MetaData::new().with("key=with;special", "value\\with=;");
        let parsed = MetaData::parse(&meta.serialize());
        assert_eq!(parsed.get("key=with;special"), Some("value\\with=;"));
    }

    #[test]
    fn test_parse_skips_garbage() {
        let meta = MetaData::parse("novalue;=empty;ok=1;");
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.get("ok"), Some("1"));
        assert!(MetaData::parse("").is_empty());
    }

    #[test]
    fn test_schema_matching() {
        let meta = MetaData::new().with(MetaData::SCHEMA_KEY, "AbcGeom_SubD_v1");
        assert!(meta.matches_schema("AbcGeom_SubD_v1"));
        assert!(!meta.matches_schema("AbcGeom_PolyMesh_v1"));
        assert!(meta.matches_schema_with("AbcGeom_PolyMesh_v1", SchemaMatching::NoMatching));
        assert!(!MetaData::new().matches_schema("AbcGeom_SubD_v1"));
    }
}
