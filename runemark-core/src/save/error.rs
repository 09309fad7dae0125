use crate::save::{MAGIC, TOKEN_MAX};
use nom::{
    error::{ContextError, ErrorKind, ParseError},
    Needed,
};
use thiserror::Error;

/// Errors raised while encoding or decoding save data
#[derive(Debug, Error)]
pub enum Error<'a> {
    #[error("The encoder or decoder failed due to IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid magic bytes in header: {0:?}, expected {:?}", MAGIC)]
    InvalidMagic([u8; 4]),
    #[error("Unsupported save format version {0}, this build reads versions {1} through {2}")]
    UnsupportedVersion(u32, u32, u32),
    #[error("Token of {0} bytes exceeds the {} byte limit", TOKEN_MAX)]
    TokenTooLong(usize),
    #[error("Token is not valid UTF-8")]
    TokenEncoding,
    #[error("Attribute type \"{0}\" is not registered; its payload length is unknown and the rest of the file cannot be read")]
    UnknownAttrib(String),
    #[error("\"{0}\" is not an entity identifier")]
    BadReference(String),
    #[error("Negative record count {0} in save data")]
    BadCount(i32),
    #[error("Parsing error {1:?} for input: {0:?}")]
    Parsing(&'a [u8], ErrorKind),
    #[error("Length prefixed block has invalid length. Found {0}, the input has only {1} bytes")]
    InvalidLength(usize, usize),
    #[error("Failed to encode cbor: {0}")]
    Encoder(#[from] ciborium::ser::Error<std::io::Error>),
    #[error("Failed to decode cbor: {0}")]
    Decoder(#[from] ciborium::de::Error<std::io::Error>),
    #[error("Context {0}. {1}")]
    Context(&'static str, Box<Self>),
    #[error("Parsing failed as incomplete input provided. Needed {0:?}")]
    Incomplete(Needed),
}

/// Shortcut for results whose errors may borrow from the parsed buffer
pub type Result<'a, T> = std::result::Result<T, Error<'a>>;

impl<'a> Error<'a> {
    /// Detaches the error from the buffer it was parsed out of, for APIs
    /// that must outlive the loaded bytes.
    pub fn into_owned(self) -> ErrorOwned {
        match self {
            Error::Io(e) => ErrorOwned::Io(e),
            Error::InvalidMagic(magic) => ErrorOwned::InvalidMagic(magic),
            Error::UnsupportedVersion(v, lo, hi) => ErrorOwned::UnsupportedVersion(v, lo, hi),
            Error::TokenTooLong(len) => ErrorOwned::TokenTooLong(len),
            Error::TokenEncoding => ErrorOwned::TokenEncoding,
            Error::UnknownAttrib(name) => ErrorOwned::UnknownAttrib(name),
            Error::BadReference(token) => ErrorOwned::BadReference(token),
            Error::BadCount(count) => ErrorOwned::BadCount(count),
            Error::Parsing(input, kind) => ErrorOwned::Parsing(input.to_vec(), kind),
            Error::InvalidLength(len, have) => ErrorOwned::InvalidLength(len, have),
            Error::Encoder(e) => ErrorOwned::Encoder(e),
            Error::Decoder(e) => ErrorOwned::Decoder(e),
            Error::Context(ctx, inner) => ErrorOwned::Context(ctx, Box::new(inner.into_owned())),
            Error::Incomplete(needed) => ErrorOwned::Incomplete(needed),
        }
    }
}

/// Owned mirror of [Error]
#[derive(Debug, Error)]
pub enum ErrorOwned {
    #[error("The encoder or decoder failed due to IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid magic bytes in header: {0:?}, expected {:?}", MAGIC)]
    InvalidMagic([u8; 4]),
    #[error("Unsupported save format version {0}, this build reads versions {1} through {2}")]
    UnsupportedVersion(u32, u32, u32),
    #[error("Token of {0} bytes exceeds the {} byte limit", TOKEN_MAX)]
    TokenTooLong(usize),
    #[error("Token is not valid UTF-8")]
    TokenEncoding,
    #[error("Attribute type \"{0}\" is not registered; its payload length is unknown and the rest of the file cannot be read")]
    UnknownAttrib(String),
    #[error("\"{0}\" is not an entity identifier")]
    BadReference(String),
    #[error("Negative record count {0} in save data")]
    BadCount(i32),
    #[error("Parsing error {1:?} for input: {0:?}")]
    Parsing(Vec<u8>, ErrorKind),
    #[error("Length prefixed block has invalid length. Found {0}, the input has only {1} bytes")]
    InvalidLength(usize, usize),
    #[error("Failed to encode cbor: {0}")]
    Encoder(ciborium::ser::Error<std::io::Error>),
    #[error("Failed to decode cbor: {0}")]
    Decoder(ciborium::de::Error<std::io::Error>),
    #[error("Context {0}. {1}")]
    Context(&'static str, Box<Self>),
    #[error("Parsing failed as incomplete input provided. Needed {0:?}")]
    Incomplete(Needed),
}

/// Shortcut for results with detached errors
pub type ResultOwned<T> = std::result::Result<T, ErrorOwned>;

impl<'a> From<Error<'a>> for ErrorOwned {
    fn from(e: Error<'a>) -> Self {
        e.into_owned()
    }
}

impl<'a> ParseError<&'a [u8]> for Error<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        Error::Parsing(input, kind)
    }

    fn append(_: &[u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> ContextError<&'a [u8]> for Error<'a> {
    fn add_context(_input: &'a [u8], ctx: &'static str, other: Self) -> Self {
        Error::Context(ctx, Box::new(other))
    }
}
