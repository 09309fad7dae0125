use log::warn;

use super::error::{Error, Result};
use super::{END_TOKEN, TOKEN_MAX};
use std::any::type_name;
use std::io::ErrorKind;
use std::io::Write;

pub fn encode_be_u32<'a, W: Write>(value: u32, mut sink: W) -> Result<'a, ()> {
    let mut buff: [u8; 4] = [0; 4];
    buff.copy_from_slice(&value.to_be_bytes());
    sink.write_all(&buff)?;
    Ok(())
}

pub fn encode_be_i32<'a, W: Write>(value: i32, mut sink: W) -> Result<'a, ()> {
    let mut buff: [u8; 4] = [0; 4];
    buff.copy_from_slice(&value.to_be_bytes());
    sink.write_all(&buff)?;
    Ok(())
}

pub fn encode_be_u64<'a, W: Write>(value: u64, mut sink: W) -> Result<'a, ()> {
    let mut buff: [u8; 8] = [0; 8];
    buff.copy_from_slice(&value.to_be_bytes());
    sink.write_all(&buff)?;
    Ok(())
}

/// Writes a token as a single length byte followed by its UTF-8 bytes.
pub fn encode_token<'a, W: Write>(token: &str, mut sink: W) -> Result<'a, ()> {
    let bytes = token.as_bytes();
    if bytes.len() > TOKEN_MAX {
        return Err(Error::TokenTooLong(bytes.len()));
    }
    sink.write_all(&[bytes.len() as u8])?;
    sink.write_all(bytes)?;
    Ok(())
}

pub fn length_encoded<'a, W: Write, F>(mut sink: W, body: F) -> Result<'a, ()>
where
    F: FnOnce(&mut Vec<u8>) -> Result<'a, ()>,
{
    let mut buff = vec![];
    body(&mut buff)?;
    encode_be_u64(buff.len() as u64, &mut sink)?;
    if !buff.is_empty() {
        sink.write_all(&buff)?;
    }
    Ok(())
}

/// Guard that allows writing 0 bytes with ciborium to buffers but warns about that.
pub fn ciborium_into_writer<'a, T: ?Sized + serde::Serialize, W: Write>(
    value: &T,
    writer: W,
) -> Result<'a, ()> {
    match ciborium::into_writer(value, writer) {
        Err(ciborium::ser::Error::Io(e)) => match e.kind() {
            ErrorKind::WriteZero => {
                warn!("Serialization body of {} is empty!", type_name::<T>());
                Ok(())
            }
            _ => Err(ciborium::ser::Error::Io(e).into()),
        },
        Err(e) => Err(e.into()),
        Ok(_) => Ok(()),
    }
}

/// Sequential, append-only cursor over a byte sink. Attribute serialize
/// callbacks receive this and never the sink itself, so every payload is
/// built from the same small set of primitives.
pub struct Writer<'a> {
    sink: &'a mut dyn Write,
}

impl<'a> Writer<'a> {
    pub fn new(sink: &'a mut dyn Write) -> Self {
        Writer { sink }
    }

    pub fn write_int(&mut self, value: i32) -> Result<'static, ()> {
        encode_be_i32(value, &mut self.sink)
    }

    pub fn write_token(&mut self, token: &str) -> Result<'static, ()> {
        encode_token(token, &mut self.sink)
    }

    /// Writes the sentinel that terminates a repeated-record sequence.
    pub fn write_end(&mut self) -> Result<'static, ()> {
        encode_token(END_TOKEN, &mut self.sink)
    }

    /// Writes a length-prefixed run of raw bytes.
    pub fn write_block(&mut self, bytes: &[u8]) -> Result<'static, ()> {
        encode_be_u64(bytes.len() as u64, &mut self.sink)?;
        self.sink.write_all(bytes)?;
        Ok(())
    }

    /// Writes a value as a length-prefixed CBOR block.
    pub fn write_cbor<T: ?Sized + serde::Serialize>(&mut self, value: &T) -> Result<'static, ()> {
        length_encoded(&mut self.sink, |sink| ciborium_into_writer(value, sink))
    }
}
