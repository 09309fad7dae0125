use log::warn;
use nom::{
    bytes::complete::take,
    error::context,
    number::complete::{be_i32, be_u64},
    Err, IResult,
};
use serde::de::DeserializeOwned;

use super::error::{Error, Result};

pub type Parser<'a, T> = IResult<&'a [u8], T, Error<'a>>;

pub fn length_decoding<'a, R, F>(f: F) -> impl FnMut(&'a [u8]) -> Parser<'a, Option<R>>
where
    F: FnMut(&'a [u8]) -> Parser<'a, R> + Copy,
{
    move |input| {
        let (input, len) = context("block length", be_u64)(input)?;
        if input.len() < len as usize {
            return Err(Err::Error(Error::InvalidLength(len as usize, input.len())));
        }
        let restricted_input = &input[0..len as usize];
        let result = if len == 0 {
            warn!("Block length is 0");
            None
        } else {
            let (_, result) = context("block body", f)(restricted_input)?;
            Some(result)
        };
        Ok((&input[len as usize..], result))
    }
}

pub fn ciborium_parse<'a, T: DeserializeOwned>(input: &'a [u8]) -> Parser<'a, T> {
    let res = ciborium::de::from_reader(input)
        .map_err(Error::Decoder)
        .map_err(Err::Failure)?;
    Ok((&input[input.len()..], res))
}

/// Reads a token: one length byte, then that many UTF-8 bytes.
pub fn token(input: &[u8]) -> Parser<'_, String> {
    let (input, len) = context("token length", nom::number::complete::u8)(input)?;
    let (input, bytes) = context("token bytes", take(len as usize))(input)?;
    match std::str::from_utf8(bytes) {
        Ok(token) => Ok((input, token.to_owned())),
        Err(_) => Err(Err::Failure(Error::TokenEncoding)),
    }
}

/// Reads a length-prefixed run of raw bytes.
pub fn block(input: &[u8]) -> Parser<'_, &[u8]> {
    let (input, len) = context("block length", be_u64)(input)?;
    if input.len() < len as usize {
        return Err(Err::Error(Error::InvalidLength(len as usize, input.len())));
    }
    Ok((&input[len as usize..], &input[0..len as usize]))
}

/// Forward-only read cursor over a loaded save file. Attribute deserialize
/// callbacks receive this positioned at the start of their payload and
/// must leave it positioned right after it, whatever their outcome.
///
/// The format version of the whole file is read once from the header and
/// exposed through [Reader::version] so that callbacks can pick legacy
/// decodings.
pub struct Reader<'a> {
    input: &'a [u8],
    version: u32,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8], version: u32) -> Self {
        Reader { input, version }
    }

    /// Format version of the file this cursor reads from.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Bytes left in front of the cursor.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    fn run<T>(&mut self, parser: impl FnOnce(&'a [u8]) -> Parser<'a, T>) -> Result<'a, T> {
        match parser(self.input) {
            Ok((rest, value)) => {
                self.input = rest;
                Ok(value)
            }
            Err(Err::Incomplete(needed)) => Err(Error::Incomplete(needed)),
            Err(Err::Error(e)) | Err(Err::Failure(e)) => Err(e),
        }
    }

    pub fn read_int(&mut self) -> Result<'a, i32> {
        self.run(|input| context("int", be_i32)(input))
    }

    pub fn read_token(&mut self) -> Result<'a, String> {
        self.run(token)
    }

    pub fn read_block(&mut self) -> Result<'a, &'a [u8]> {
        self.run(block)
    }

    /// Reads a length-prefixed CBOR block. `None` means the block was
    /// written empty.
    pub fn read_cbor<T: DeserializeOwned>(&mut self) -> Result<'a, Option<T>> {
        self.run(length_decoding(ciborium_parse))
    }
}

#[cfg(test)]
mod tests {
    use super::super::encoder::Writer;
    use super::*;

    fn reader_over(buff: &[u8]) -> Reader<'_> {
        Reader::new(buff, super::super::FORMAT_VERSION)
    }

    #[test]
    fn primitives_round_trip() {
        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            out.write_int(i32::MIN).expect("int");
            out.write_token("giveitem").expect("token");
            out.write_block(b"raw payload").expect("block");
            out.write_cbor(&vec!["a".to_owned(), "b".to_owned()])
                .expect("cbor");
        }
        let mut src = reader_over(&buff);
        assert_eq!(src.read_int().expect("int"), i32::MIN);
        assert_eq!(src.read_token().expect("token"), "giveitem");
        assert_eq!(src.read_block().expect("block"), b"raw payload");
        assert_eq!(
            src.read_cbor::<Vec<String>>().expect("cbor"),
            Some(vec!["a".to_owned(), "b".to_owned()])
        );
        assert_eq!(src.remaining(), 0);
    }

    #[test]
    fn truncated_int_is_an_error() {
        let mut src = reader_over(&[0, 1]);
        assert!(src.read_int().is_err());
    }

    #[test]
    fn truncated_token_is_an_error() {
        // length byte promises 5 bytes, only 2 follow
        let mut src = reader_over(&[5, b'a', b'b']);
        assert!(src.read_token().is_err());
    }

    #[test]
    fn oversized_block_is_an_error() {
        let mut buff = vec![];
        {
            let mut out = Writer::new(&mut buff);
            out.write_block(b"abc").expect("block");
        }
        buff.truncate(buff.len() - 1);
        let mut src = reader_over(&buff);
        assert!(matches!(
            src.read_block(),
            Err(Error::InvalidLength(3, 2))
        ));
    }

    #[test]
    fn non_utf8_token_is_an_error() {
        let mut src = reader_over(&[2, 0xff, 0xfe]);
        assert!(matches!(src.read_token(), Err(Error::TokenEncoding)));
    }
}
