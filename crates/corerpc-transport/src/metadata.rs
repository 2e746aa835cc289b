use indexmap::IndexMap;

/// Key suffix that marks a value as binary, mirroring gRPC's `-bin`
/// metadata convention: such values are base64-encoded on the wire.
pub const BIN_HEADER_SUFFIX: &str = "-bin";

/// An ordered multimap of header/trailer values, keyed case-insensitively.
///
/// Keys are normalized to lowercase on insert (wire metadata is
/// case-insensitive by convention); `-bin`-suffixed keys have their
/// values base64-encoded, matching [`encode_key_value`].
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    entries: IndexMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `key`/`value` via [`encode_key_value`] and appends the
    /// value to that key's list.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let (key, value) = encode_key_value(key, value.into());
        self.entries.entry(key).or_default().push(value);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Merges `other`'s entries into `self`, preserving arrival order
    /// within each key.
    pub fn extend(&mut self, other: Metadata) {
        for (key, values) in other.entries {
            self.entries.entry(key).or_default().extend(values);
        }
    }
}

/// Lowercases `key` and, if it ends in [`BIN_HEADER_SUFFIX`], base64-encodes
/// `value`. Shared by the client's request-header setters and the server's
/// response-header/trailer setters.
pub fn encode_key_value(key: &str, value: String) -> (String, String) {
    let key = key.to_ascii_lowercase();
    if key.ends_with(BIN_HEADER_SUFFIX) {
        use base64::Engine;
        let value = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
        (key, value)
    } else {
        (key, value)
    }
}
