//! Recursive descent parser for bencoded bytes.
use std::collections::BTreeMap;

use crate::error::BencodeParseError;
use crate::mutable::BencodeMut;

pub fn decode(bytes: &[u8]) -> Result<BencodeMut, BencodeParseError> {
    let (value, consumed) = decode_value(bytes, 0)?;

    if consumed != bytes.len() {
        return Err(BencodeParseError::BytesRemaining { pos: consumed });
    }

    Ok(value)
}

fn decode_value(bytes: &[u8], pos: usize) -> Result<(BencodeMut, usize), BencodeParseError> {
    match bytes.get(pos) {
        Some(&crate::INT_START) => decode_int(bytes, pos),
        Some(&crate::LIST_START) => decode_list(bytes, pos),
        Some(&crate::DICT_START) => decode_dict(bytes, pos),
        Some(&(crate::BYTE_LEN_LOW..=crate::BYTE_LEN_HIGH)) => {
            let (data, next) = decode_bytes(bytes, pos)?;
            Ok((BencodeMut::Bytes(data.to_vec()), next))
        }
        Some(_) => Err(BencodeParseError::InvalidByte { pos }),
        None => Err(BencodeParseError::BytesEmpty { pos }),
    }
}

fn decode_int(bytes: &[u8], pos: usize) -> Result<(BencodeMut, usize), BencodeParseError> {
    let body_start = pos + 1;
    let relative_end = bytes[body_start..]
        .iter()
        .position(|&b| b == crate::BEN_END)
        .ok_or(BencodeParseError::InvalidInt { pos })?;
    let body = &bytes[body_start..body_start + relative_end];

    validate_int_body(body, pos)?;

    let text = std::str::from_utf8(body).map_err(|_| BencodeParseError::InvalidInt { pos })?;
    let value = text.parse::<i64>().map_err(|_| BencodeParseError::InvalidInt { pos })?;

    Ok((BencodeMut::Int(value), body_start + relative_end + 1))
}

/// BEP 3: `i-0e` is invalid, and so is any integer with a leading zero
/// other than `i0e` itself.
fn validate_int_body(body: &[u8], pos: usize) -> Result<(), BencodeParseError> {
    let digits = match body {
        [] => return Err(BencodeParseError::InvalidInt { pos }),
        [b'-', rest @ ..] => {
            if rest.first() == Some(&b'0') {
                return Err(BencodeParseError::InvalidInt { pos });
            }
            rest
        }
        digits => digits,
    };

    if digits.is_empty() || (digits.len() > 1 && digits[0] == b'0') {
        return Err(BencodeParseError::InvalidInt { pos });
    }

    Ok(())
}

fn decode_bytes(bytes: &[u8], pos: usize) -> Result<(&[u8], usize), BencodeParseError> {
    let relative_sep = bytes[pos..]
        .iter()
        .position(|&b| b == crate::BYTE_LEN_END)
        .ok_or(BencodeParseError::InvalidLength { pos })?;
    let len_bytes = &bytes[pos..pos + relative_sep];

    if len_bytes.is_empty() || !len_bytes.iter().all(u8::is_ascii_digit) {
        return Err(BencodeParseError::InvalidLength { pos });
    }

    let len = std::str::from_utf8(len_bytes)
        .expect("ascii digits are valid utf-8")
        .parse::<usize>()
        .map_err(|_| BencodeParseError::InvalidLength { pos })?;

    let data_start = pos + relative_sep + 1;
    let data_end = data_start.checked_add(len).ok_or(BencodeParseError::InvalidLength { pos })?;

    if data_end > bytes.len() {
        return Err(BencodeParseError::BytesEmpty { pos: data_start });
    }

    Ok((&bytes[data_start..data_end], data_end))
}

fn decode_list(bytes: &[u8], pos: usize) -> Result<(BencodeMut, usize), BencodeParseError> {
    let mut items = Vec::new();
    let mut cursor = pos + 1;

    loop {
        match bytes.get(cursor) {
            Some(&crate::BEN_END) => return Ok((BencodeMut::List(items), cursor + 1)),
            Some(_) => {
                let (item, next) = decode_value(bytes, cursor)?;
                items.push(item);
                cursor = next;
            }
            None => return Err(BencodeParseError::BytesEmpty { pos: cursor }),
        }
    }
}

fn decode_dict(bytes: &[u8], pos: usize) -> Result<(BencodeMut, usize), BencodeParseError> {
    let mut dict = BTreeMap::new();
    let mut last_key: Option<Vec<u8>> = None;
    let mut cursor = pos + 1;

    loop {
        match bytes.get(cursor) {
            Some(&crate::BEN_END) => return Ok((BencodeMut::Dict(dict), cursor + 1)),
            Some(_) => {
                let key_pos = cursor;
                let (key, next) = decode_bytes(bytes, cursor)?;

                // keys must appear in strictly ascending raw byte order
                if let Some(previous) = &last_key {
                    if previous.as_slice() >= key {
                        return Err(BencodeParseError::InvalidKeyOrdering { pos: key_pos });
                    }
                }
                last_key = Some(key.to_vec());

                let (value, next) = decode_value(bytes, next)?;
                dict.insert(key.to_vec(), value);
                cursor = next;
            }
            None => return Err(BencodeParseError::BytesEmpty { pos: cursor }),
        }
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use crate::{ben_bytes, ben_int, ben_list, ben_map, BencodeMut, BencodeParseError};

        #[test]
        fn decode_an_integer() {
            assert_eq!(BencodeMut::decode(b"i42e").unwrap(), BencodeMut::Int(42));
            assert_eq!(BencodeMut::decode(b"i-42e").unwrap(), BencodeMut::Int(-42));
            assert_eq!(BencodeMut::decode(b"i0e").unwrap(), BencodeMut::Int(0));
        }

        #[test]
        fn reject_invalid_integers() {
            assert!(BencodeMut::decode(b"ie").is_err());
            assert!(BencodeMut::decode(b"i-0e").is_err());
            assert!(BencodeMut::decode(b"i042e").is_err());
            assert!(BencodeMut::decode(b"i42").is_err());
        }

        #[test]
        fn decode_a_byte_string() {
            assert_eq!(BencodeMut::decode(b"4:spam").unwrap(), BencodeMut::Bytes(b"spam".to_vec()));
            assert_eq!(BencodeMut::decode(b"0:").unwrap(), BencodeMut::Bytes(vec![]));
        }

        #[test]
        fn reject_a_truncated_byte_string() {
            assert!(BencodeMut::decode(b"5:spam").is_err());
            assert!(BencodeMut::decode(b"4spam").is_err());
        }

        #[test]
        fn decode_a_list() {
            let expected = ben_list!(ben_int!(1), ben_bytes!("a"));

            assert_eq!(BencodeMut::decode(b"li1e1:ae").unwrap(), expected);
        }

        #[test]
        fn decode_a_dictionary() {
            let expected = ben_map! {
                "bar" => ben_bytes!("spam"),
                "foo" => ben_int!(42)
            };

            assert_eq!(BencodeMut::decode(b"d3:bar4:spam3:fooi42ee").unwrap(), expected);
        }

        #[test]
        fn reject_a_dictionary_with_unsorted_keys() {
            assert_eq!(
                BencodeMut::decode(b"d3:fooi42e3:bar4:spame").unwrap_err(),
                BencodeParseError::InvalidKeyOrdering { pos: 10 }
            );
        }

        #[test]
        fn reject_trailing_bytes() {
            assert_eq!(
                BencodeMut::decode(b"i42ei7e").unwrap_err(),
                BencodeParseError::BytesRemaining { pos: 4 }
            );
        }

        #[test]
        fn round_trip_nested_documents() {
            let document = ben_map! {
                "files" => ben_map! {
                    "a" => ben_list!(ben_int!(1), ben_int!(2)),
                    "b" => ben_bytes!("xyz")
                },
                "interval" => ben_int!(1800)
            };

            let encoded = document.encode();

            assert_eq!(BencodeMut::decode(&encoded).unwrap(), document);
        }
    }
}
