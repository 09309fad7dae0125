mod decoder;
mod encoder;
pub mod error;

use nom::{bytes::complete::take, error::context, number::complete::be_u32, Err};
use serde::{Deserialize, Serialize};
use std::io::Write;

use error::{Error, Result};

pub use decoder::{block, ciborium_parse, length_decoding, token, Parser, Reader};
pub use encoder::{
    ciborium_into_writer, encode_be_i32, encode_be_u32, encode_be_u64, encode_token,
    length_encoded, Writer,
};

// Magic bytes to distinguish other files from a save. Ascii for RMRK
pub const MAGIC: [u8; 4] = [0x52, 0x4d, 0x52, 0x4b];

/// Current save format version. History:
/// v1  header, CBOR meta block, region/building/unit records
/// v2  faction records carry their attribute chains
/// v3  entity references stored as base-36 tokens instead of decimal ints
/// v4  ship records, turn counter in the meta block
pub const FORMAT_VERSION: u32 = 4;

/// Oldest format version this build still reads.
pub const EARLIEST_FORMAT_VERSION: u32 = 1;

/// First version whose faction records carry attribute chains.
pub const VER_FACTION_ATTRIBS: u32 = 2;

/// First version that stores entity references as base-36 tokens.
pub const VER_BASE36_REFS: u32 = 3;

/// First version with ship records.
pub const VER_SHIPS: u32 = 4;

/// Sentinel token terminating attribute chains and repeated-record runs.
pub const END_TOKEN: &str = "end";

/// Upper bound on token length in bytes.
pub const TOKEN_MAX: usize = 64;

/// Descriptive header data carried by every save file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMeta {
    /// Name of the game this file belongs to
    #[serde(default)]
    pub game: String,
    /// Turn the world was saved at
    #[serde(default)]
    pub turn: u64,
}

/// Writes the file header (magic bytes, format version, meta block) and
/// hands back a [Writer] positioned at the body.
pub fn begin_save<'a>(sink: &'a mut dyn Write, meta: &SaveMeta) -> Result<'static, Writer<'a>> {
    sink.write_all(&MAGIC)?;
    encode_be_u32(FORMAT_VERSION, &mut *sink)?;
    length_encoded(&mut *sink, |sink| ciborium_into_writer(meta, sink))?;
    Ok(Writer::new(sink))
}

/// Checks the file header and hands back the meta block plus a [Reader]
/// positioned at the body, carrying the file's format version.
pub fn begin_load(bytes: &[u8]) -> Result<'_, (SaveMeta, Reader<'_>)> {
    match header(bytes) {
        Ok((rest, (meta, version))) => Ok((meta, Reader::new(rest, version))),
        Err(Err::Incomplete(needed)) => Err(Error::Incomplete(needed)),
        Err(Err::Error(e)) | Err(Err::Failure(e)) => Err(e),
    }
}

fn header(input: &[u8]) -> Parser<'_, (SaveMeta, u32)> {
    let (input, _) = context("magic bytes", parse_magic)(input)?;
    let (input, version) = context("format version", parse_version)(input)?;
    let (input, meta) = context("save meta", length_decoding(ciborium_parse))(input)?;
    Ok((input, (meta.unwrap_or_default(), version)))
}

fn parse_magic(input: &[u8]) -> Parser<'_, ()> {
    let (input, magic) = take(4_u32)(input)?;
    if magic != MAGIC {
        let mut magic_buff = [0; 4];
        magic_buff.copy_from_slice(magic);
        Err(Err::Failure(Error::InvalidMagic(magic_buff)))
    } else {
        Ok((input, ()))
    }
}

fn parse_version(input: &[u8]) -> Parser<'_, u32> {
    let (input, version) = be_u32(input)?;
    if !(EARLIEST_FORMAT_VERSION..=FORMAT_VERSION).contains(&version) {
        Err(Err::Failure(Error::UnsupportedVersion(
            version,
            EARLIEST_FORMAT_VERSION,
            FORMAT_VERSION,
        )))
    } else {
        Ok((input, version))
    }
}
