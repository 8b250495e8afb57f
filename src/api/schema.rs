use crate::api::error::WireError;

#[cfg(feature = "json")]
pub mod json;

/// Marker for a wire encoding. Chosen once per deployment; both directions
/// of a connection use the same schema.
pub trait Schema {
    fn schema_type() -> SchemaType;
}

pub enum SchemaType {
    Text,
    Binary,
}

pub trait Serialize<S>
where
    S: Schema,
    Self: Sized,
{
    fn serialize(&self) -> Vec<u8>;
}

pub trait Deserialize<S>
where
    S: Schema,
    Self: Sized,
{
    /// Decodes one whole message. A truncated buffer is a decode error,
    /// never a partial value.
    fn deserialize(buf: &[u8]) -> Result<Self, WireError>;
}
