//! Deserialize data from the bytecode protocol.
use bytes::Bytes;
use nom::{
    IResult,
    bytes::complete::take,
    multi::many_m_n,
    number::complete::{be_i32, be_u8},
};
use nombytes::NomBytes;

use crate::constants::{MAX_PROTOCOL_ARRAY_SIZE, MAX_VARINT_BYTES};

type ParseError = nom::Err<nom::error::Error<NomBytes>>;

/// Convert bytes to a validated UTF-8 string.
/// Returns an error if the bytes are not valid UTF-8.
pub fn bytes_to_string(bytes: &Bytes) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|_| {
            nom::Err::Failure(nom::error::Error::new(
                NomBytes::from(bytes.as_ref()),
                nom::error::ErrorKind::Verify,
            ))
        })
}

/// Parse an unsigned LEB128 varint of at most five bytes.
pub fn parse_unsigned_varint(s: NomBytes) -> IResult<NomBytes, u32> {
    let mut result: u32 = 0;
    let mut remaining = s;

    for i in 0..MAX_VARINT_BYTES {
        let (s, b) = be_u8(remaining)?;
        remaining = s;

        result |= ((b & 0x7F) as u32) << (7 * i);

        if (b & 0x80) == 0 {
            return Ok((remaining, result));
        }
    }

    Err(nom::Err::Failure(nom::error::Error::new(
        remaining,
        nom::error::ErrorKind::TooLarge,
    )))
}

/// Parse a compact string: varint length `N` then `N` raw bytes.
/// `N = 0` is the absent string and parses as empty.
pub fn parse_compact_bytes(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = parse_unsigned_varint(s)?;
    if length == 0 {
        return Ok((s, Bytes::new()));
    }
    let (s, raw) = take(length as usize)(s)?;
    Ok((s, raw.into_bytes()))
}

/// Parse a compact string and validate it as UTF-8.
pub fn parse_compact_string(s: NomBytes) -> IResult<NomBytes, String> {
    let (s, raw) = parse_compact_bytes(s)?;
    Ok((s, bytes_to_string(&raw)?))
}

/// Parse a compact array: varint element count followed by the elements.
pub fn parse_compact_array<O, E, F>(f: F) -> impl FnMut(NomBytes) -> IResult<NomBytes, Vec<O>, E>
where
    F: nom::Parser<NomBytes, O, E> + Copy,
    E: nom::error::ParseError<NomBytes>,
{
    move |input: NomBytes| {
        let (i, count) = match parse_unsigned_varint(input.clone()) {
            Ok(ok) => ok,
            Err(nom::Err::Incomplete(n)) => return Err(nom::Err::Incomplete(n)),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(nom::Err::Failure(E::from_error_kind(e.input, e.code)));
            }
        };

        if count as usize > MAX_PROTOCOL_ARRAY_SIZE {
            return Err(nom::Err::Failure(E::from_error_kind(
                i,
                nom::error::ErrorKind::TooLarge,
            )));
        }

        let count = count as usize;
        many_m_n(count, count, f)(i)
    }
}

/// Parse an `i32`-length byte blob where `-1` means null.
pub fn parse_nullable_bytes(s: NomBytes) -> IResult<NomBytes, Option<Bytes>> {
    let (s, length) = be_i32(s)?;

    if length == -1 {
        return Ok((s, None));
    }

    if length < 0 {
        return Err(nom::Err::Failure(nom::error::Error::new(
            s,
            nom::error::ErrorKind::TooLarge,
        )));
    }

    let (s, raw) = take(length as usize)(s)?;
    Ok((s, Some(raw.into_bytes())))
}

/// Skip a tagged field section.
/// Format: unsigned varint count, then for each: varint tag, varint size, bytes
pub fn skip_tagged_fields(s: NomBytes) -> IResult<NomBytes, ()> {
    let (mut s, count) = parse_unsigned_varint(s)?;

    for _ in 0..count {
        let (remaining, _tag) = parse_unsigned_varint(s)?;
        let (remaining, size) = parse_unsigned_varint(remaining)?;
        let (remaining, _) = take(size as usize)(remaining)?;
        s = remaining;
    }

    Ok((s, ()))
}
