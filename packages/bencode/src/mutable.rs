use std::collections::BTreeMap;

use crate::decode;
use crate::error::BencodeParseError;

/// A mutable bencode value.
///
/// Dictionaries use a `BTreeMap` keyed by the raw key bytes, so encoding
/// emits keys in the byte order BEP 3 requires without a sorting pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeMut {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<BencodeMut>),
    Dict(BTreeMap<Vec<u8>, BencodeMut>),
}

impl BencodeMut {
    #[must_use]
    pub fn new_int(value: i64) -> BencodeMut {
        BencodeMut::Int(value)
    }

    #[must_use]
    pub fn new_bytes<B: Into<Vec<u8>>>(value: B) -> BencodeMut {
        BencodeMut::Bytes(value.into())
    }

    #[must_use]
    pub fn new_list() -> BencodeMut {
        BencodeMut::List(Vec::new())
    }

    #[must_use]
    pub fn new_dict() -> BencodeMut {
        BencodeMut::Dict(BTreeMap::new())
    }

    #[must_use]
    pub fn int(&self) -> Option<i64> {
        match self {
            BencodeMut::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeMut::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn list(&self) -> Option<&Vec<BencodeMut>> {
        match self {
            BencodeMut::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn list_mut(&mut self) -> Option<&mut Vec<BencodeMut>> {
        match self {
            BencodeMut::List(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn dict(&self) -> Option<&BTreeMap<Vec<u8>, BencodeMut>> {
        match self {
            BencodeMut::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn dict_mut(&mut self) -> Option<&mut BTreeMap<Vec<u8>, BencodeMut>> {
        match self {
            BencodeMut::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Encodes the value into freshly allocated bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.encode_into(&mut bytes);
        bytes
    }

    fn encode_into(&self, bytes: &mut Vec<u8>) {
        match self {
            BencodeMut::Int(n) => {
                bytes.push(crate::INT_START);
                bytes.extend(n.to_string().into_bytes());
                bytes.push(crate::BEN_END);
            }
            BencodeMut::Bytes(data) => {
                encode_bytes(data, bytes);
            }
            BencodeMut::List(list) => {
                bytes.push(crate::LIST_START);
                for item in list {
                    item.encode_into(bytes);
                }
                bytes.push(crate::BEN_END);
            }
            BencodeMut::Dict(dict) => {
                bytes.push(crate::DICT_START);
                // BTreeMap iteration order is the raw byte order of the keys.
                for (key, value) in dict {
                    encode_bytes(key, bytes);
                    value.encode_into(bytes);
                }
                bytes.push(crate::BEN_END);
            }
        }
    }

    /// Decodes a single bencoded value spanning the whole input.
    ///
    /// # Errors
    ///
    /// Will return a `BencodeParseError` if the bytes are not a well
    /// formed BEP 3 document, or if anything trails the first value.
    pub fn decode(bytes: &[u8]) -> Result<BencodeMut, BencodeParseError> {
        decode::decode(bytes)
    }
}

fn encode_bytes(data: &[u8], bytes: &mut Vec<u8>) {
    bytes.extend(data.len().to_string().into_bytes());
    bytes.push(crate::BYTE_LEN_END);
    bytes.extend_from_slice(data);
}

impl From<i64> for BencodeMut {
    fn from(value: i64) -> Self {
        BencodeMut::new_int(value)
    }
}

impl From<&str> for BencodeMut {
    fn from(value: &str) -> Self {
        BencodeMut::new_bytes(value)
    }
}

#[cfg(test)]
mod tests {

    mod it_should {
        use crate::BencodeMut;

        #[test]
        fn encode_an_integer() {
            assert_eq!(BencodeMut::new_int(-42).encode(), b"i-42e".to_vec());
        }

        #[test]
        fn encode_a_byte_string() {
            assert_eq!(BencodeMut::new_bytes("spam"), BencodeMut::Bytes(b"spam".to_vec()));
            assert_eq!(BencodeMut::new_bytes("spam").encode(), b"4:spam".to_vec());
        }

        #[test]
        fn encode_an_empty_byte_string() {
            assert_eq!(BencodeMut::new_bytes("").encode(), b"0:".to_vec());
        }

        #[test]
        fn encode_a_list() {
            let mut list = BencodeMut::new_list();
            list.list_mut().unwrap().push(BencodeMut::new_int(1));
            list.list_mut().unwrap().push(BencodeMut::new_bytes("a"));

            assert_eq!(list.encode(), b"li1e1:ae".to_vec());
        }

        #[test]
        fn encode_a_dictionary_with_keys_in_raw_byte_order() {
            let mut dict = BencodeMut::new_dict();
            {
                let map = dict.dict_mut().unwrap();
                map.insert(b"zz".to_vec(), BencodeMut::new_int(1));
                map.insert(b"aa".to_vec(), BencodeMut::new_int(2));
                map.insert(vec![0xff], BencodeMut::new_int(3));
            }

            // 0xff sorts after ascii
            let mut expected = b"d2:aai2e2:zzi1e1:".to_vec();
            expected.push(0xff);
            expected.extend_from_slice(b"i3ee");

            assert_eq!(dict.encode(), expected);
        }
    }
}
