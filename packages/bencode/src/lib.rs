//! Library for building and parsing bencoded data.
//!
//! Bencode is the serialisation format described in
//! [BEP 3](https://www.bittorrent.org/beps/bep_0003.html). The tracker
//! response path only ever encodes, so the central type is the mutable
//! builder [`BencodeMut`]; the decoder is used by tests and bencode-typed
//! tooling.
//!
//! Encoding bencoded data:
//!
//! ```rust
//! use swarm_tracker_bencode::{ben_int, ben_bytes, ben_map};
//!
//! let message = (ben_map! {
//!     "lucky_number" => ben_int!(7),
//!     "lucky_string" => ben_bytes!("7")
//! })
//! .encode();
//!
//! let data = b"d12:lucky_numberi7e12:lucky_string1:7e"; // cspell:disable-line
//! assert_eq!(&data[..], &message[..]);
//! ```
//!
//! Decoding bencoded data:
//!
//! ```rust
//! use swarm_tracker_bencode::BencodeMut;
//!
//! let data = b"d12:lucky_numberi7ee"; // cspell:disable-line
//! let bencode = BencodeMut::decode(data).unwrap();
//!
//! assert_eq!(bencode.dict().unwrap().get(b"lucky_number".as_slice()).unwrap().int(), Some(7));
//! ```

mod decode;
mod error;
mod mutable;

pub use crate::error::BencodeParseError;
pub use crate::mutable::BencodeMut;

pub(crate) const BEN_END: u8 = b'e';
pub(crate) const DICT_START: u8 = b'd';
pub(crate) const LIST_START: u8 = b'l';
pub(crate) const INT_START: u8 = b'i';

pub(crate) const BYTE_LEN_LOW: u8 = b'0';
pub(crate) const BYTE_LEN_HIGH: u8 = b'9';
pub(crate) const BYTE_LEN_END: u8 = b':';

/// Construct a `BencodeMut` map by supplying string references as keys and `BencodeMut` as values.
#[macro_export]
macro_rules! ben_map {
    ( $($key:expr => $val:expr),* ) => {
        {
            #[allow(unused_mut)]
            let mut bencode_map = $crate::BencodeMut::new_dict();
            {
                #[allow(unused_mut, unused_variables)]
                let mut map = bencode_map.dict_mut().unwrap();
                $(
                    map.insert($key.as_bytes().to_vec(), $val);
                )*
            }
            bencode_map
        }
    }
}

/// Construct a `BencodeMut` list by supplying a list of `BencodeMut` values.
#[macro_export]
macro_rules! ben_list {
    ( $($val:expr),* ) => {
        {
            #[allow(unused_mut)]
            let mut bencode_list = $crate::BencodeMut::new_list();
            {
                #[allow(unused_mut, unused_variables)]
                let mut list = bencode_list.list_mut().unwrap();
                $(
                    list.push($val);
                )*
            }
            bencode_list
        }
    }
}

/// Construct `BencodeMut` bytes by supplying a type convertible to bytes.
#[macro_export]
macro_rules! ben_bytes {
    ( $val:expr ) => {
        $crate::BencodeMut::new_bytes($val)
    };
}

/// Construct a `BencodeMut` integer by supplying an `i64`.
#[macro_export]
macro_rules! ben_int {
    ( $val:expr ) => {
        $crate::BencodeMut::new_int($val)
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn the_macros_should_compose() {
        let message = (ben_map! {
            "interval" => ben_int!(120),
            "peers" => ben_list!(ben_bytes!("abc"))
        })
        .encode();

        assert_eq!(&message[..], b"d8:intervali120e5:peersl3:abcee".as_slice());
    }
}
