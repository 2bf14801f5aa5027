//! The parsed form of a URL query string.

mod decode;
mod encode;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::Result;

use std::fmt;
use std::io::Write;

/// An ordered multi-map from query keys to their values.
///
/// Keys keep the order in which they were first seen. Values for a key keep
/// the order in which they were appended, so `s=first&i=1&s=second` holds
/// `s => [first, second]` followed by `i => [1]`.
///
/// ```
/// let query = qparams::QueryMap::parse("?s=first&i=1&s=second").unwrap();
/// assert_eq!(query.get("s").unwrap(), ["first", "second"]);
/// assert_eq!(query.to_string(), "?s=first&s=second&i=1");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryMap {
    inner: IndexMap<String, Vec<String>>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query string.
    ///
    /// A leading `?` is skipped, pairs are separated by `&`, `+` decodes to a
    /// space and `%XX` to the escaped byte. A key without `=` gets an empty
    /// value. Empty segments (`a=1&&b=2`) are skipped.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.strip_prefix('?').unwrap_or(input);
        let mut map = Self::new();
        for segment in input.split('&').filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            let key = std::str::from_utf8(&decode::decode(key.as_bytes()))?.to_owned();
            let value = std::str::from_utf8(&decode::decode(value.as_bytes()))?.to_owned();
            map.append(key, value);
        }
        Ok(map)
    }

    /// Adds `value` after any existing values for `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces all values for `key`, returning the previous ones.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) -> Option<Vec<String>> {
        match self.inner.entry(key.into()) {
            Entry::Occupied(mut o) => Some(std::mem::replace(o.get_mut(), values)),
            Entry::Vacant(v) => {
                v.insert(values);
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.inner.get(key).map(Vec::as_slice)
    }

    /// Removes `key`, keeping the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.inner.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Writes the map as `?key=value&key=value`, or nothing at all when there
    /// are no pairs.
    pub fn write_to<W: Write>(&self, writer: &mut W, use_form_encoding: bool) -> Result<()> {
        let mut first_kv = true;
        for (key, values) in &self.inner {
            for value in values {
                writer.write_all(if first_kv { b"?" } else { b"&" })?;
                first_kv = false;
                for encoded in encode::encode(key.as_bytes(), use_form_encoding) {
                    writer.write_all(&encoded)?;
                }
                writer.write_all(b"=")?;
                for encoded in encode::encode(value.as_bytes(), use_form_encoding) {
                    writer.write_all(&encoded)?;
                }
            }
        }
        Ok(())
    }

    /// Renders the map with the given encoding mode, see [`QueryMap::write_to`].
    pub fn to_query_string(&self, use_form_encoding: bool) -> Result<String> {
        let mut buffer = Vec::with_capacity(64);
        self.write_to(&mut buffer, use_form_encoding)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl fmt::Display for QueryMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.to_query_string(false).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl<K, V> Extend<(K, V)> for QueryMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for QueryMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl From<&url::Url> for QueryMap {
    fn from(url: &url::Url) -> Self {
        url.query_pairs().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryMap;

    #[test]
    fn parse_groups_values_by_key() {
        let query = QueryMap::parse("s=first&i=1&s=second&i=2").unwrap();
        assert_eq!(query.keys().collect::<Vec<_>>(), ["s", "i"]);
        assert_eq!(query.get("s").unwrap(), ["first", "second"]);
        assert_eq!(query.get("i").unwrap(), ["1", "2"]);
    }

    #[test]
    fn parse_decodes_keys_and_values() {
        let query = QueryMap::parse("?na%6De=a+b%20c&flag&&x=").unwrap();
        assert_eq!(query.get("name").unwrap(), ["a b c"]);
        assert_eq!(query.get("flag").unwrap(), [""]);
        assert_eq!(query.get("x").unwrap(), [""]);
        assert_eq!(query.len(), 3);
    }

    #[test]
    fn parse_rejects_invalid_utf8() {
        assert!(matches!(
            QueryMap::parse("s=%FF%FE"),
            Err(crate::Error::Utf8(_))
        ));
    }

    #[test]
    fn empty_map_renders_nothing() {
        assert_eq!(QueryMap::new().to_string(), "");
        assert_eq!(QueryMap::parse("").unwrap().to_string(), "");
        assert_eq!(QueryMap::parse("?").unwrap().to_string(), "");
    }

    #[test]
    fn render_escapes_delimiters() {
        let query: QueryMap = [("q", "a string"), ("q", "1+1=2&more")].into_iter().collect();
        assert_eq!(query.to_string(), "?q=a+string&q=1%2B1%3D2%26more");
        assert_eq!(
            query.to_query_string(true).unwrap(),
            "?q=a+string&q=1%2B1%3D2%26more"
        );
    }

    #[test]
    fn form_encoding_is_stricter() {
        let query: QueryMap = [("path", "/a/b?c")].into_iter().collect();
        assert_eq!(query.to_string(), "?path=/a/b?c");
        assert_eq!(query.to_query_string(true).unwrap(), "?path=%2Fa%2Fb%3Fc");
    }

    #[test]
    fn insert_replaces_and_remove_keeps_order() {
        let mut query = QueryMap::parse("a=1&b=2&c=3").unwrap();
        let previous = query.insert("a", vec!["9".to_owned(), "8".to_owned()]);
        assert_eq!(previous.unwrap(), ["1"]);
        assert_eq!(query.remove("b").unwrap(), ["2"]);
        assert_eq!(query.to_string(), "?a=9&a=8&c=3");
        assert!(!query.contains_key("b"));
    }

    #[test]
    fn from_url_reads_query_pairs() {
        let url = url::Url::parse("http://example.org/path?s=some%20string&b=true#frag").unwrap();
        let query = QueryMap::from(&url);
        assert_eq!(query.get("s").unwrap(), ["some string"]);
        assert_eq!(query.get("b").unwrap(), ["true"]);
    }
}
