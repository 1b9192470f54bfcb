use thiserror::Error;

/// Error raised while parsing bencoded bytes.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum BencodeParseError {
    #[error("incomplete value starting at byte {pos}")]
    BytesEmpty { pos: usize },
    #[error("invalid byte found at {pos}")]
    InvalidByte { pos: usize },
    #[error("invalid integer starting at byte {pos}")]
    InvalidInt { pos: usize },
    #[error("invalid byte string length starting at byte {pos}")]
    InvalidLength { pos: usize },
    #[error("dictionary key at byte {pos} is not sorted or is a duplicate")]
    InvalidKeyOrdering { pos: usize },
    #[error("trailing bytes after the value, starting at byte {pos}")]
    BytesRemaining { pos: usize },
}
