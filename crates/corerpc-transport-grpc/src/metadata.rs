use corerpc_transport::Metadata;
use tonic::metadata::{MetadataMap, MetadataValue};

/// Converts a generic [`Metadata`] into tonic's [`MetadataMap`], for
/// attaching to an outgoing request or response.
pub fn to_tonic(md: &Metadata) -> MetadataMap {
    let mut out = MetadataMap::new();
    for (key, values) in md.iter() {
        for value in values {
            if let (Ok(key), Ok(value)) = (
                tonic::metadata::MetadataKey::from_bytes(key.as_bytes()),
                MetadataValue::try_from(value.as_str()),
            ) {
                out.append(key, value);
            } else {
                tracing::warn!(key, value, "dropped metadata entry that isn't valid for gRPC");
            }
        }
    }
    out
}

/// Converts tonic's [`MetadataMap`] (from an incoming request) into a
/// generic [`Metadata`].
pub fn from_tonic(md: &MetadataMap) -> Metadata {
    let mut out = Metadata::new();
    for entry in md.iter() {
        if let tonic::metadata::KeyAndValueRef::Ascii(key, value) = entry {
            if let Ok(value) = value.to_str() {
                out.insert(key.as_str(), value.to_string());
            }
        }
    }
    out
}
