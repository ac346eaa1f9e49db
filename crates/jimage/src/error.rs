use thiserror::Error;

#[derive(Debug, Error)]
pub enum JImageError {
    #[error("Image too short for its {what}: {needed} bytes needed, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("Invalid attribute kind: {0}")]
    InvalidAttributeKind(u8),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Resource {0} is compressed")]
    CompressedResource(String),
    #[error("Resource {name} points outside of the image: {offset}+{size}")]
    ResourceOutOfBounds {
        name: String,
        offset: usize,
        size: usize,
    },
    #[error("Location attributes of entry {0} point outside of the index")]
    InvalidLocation(usize),
}
