//! `Scrape` response for the HTTP tracker.
//!
//! The body is a bencoded dictionary with a single `files` key mapping
//! each raw 20-byte info-hash to its swarm counts.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use swarm_tracker_bencode::{ben_int, ben_map};

use crate::core::ScrapeData;

/// The bencoded `Scrape` response.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Bencoded {
    scrape_data: ScrapeData,
}

impl Bencoded {
    /// Returns the bencoded representation of the scrape data.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut files = ben_map!();
        {
            let files_mut = files.dict_mut().expect("a dict was just built");

            for (info_hash, metadata) in &self.scrape_data.files {
                files_mut.insert(
                    info_hash.bytes().to_vec(),
                    ben_map! {
                        "complete" => ben_int!(i64::from(metadata.complete)),
                        "downloaded" => ben_int!(i64::from(metadata.downloaded)),
                        "incomplete" => ben_int!(i64::from(metadata.incomplete))
                    },
                );
            }
        }

        (ben_map! {
            "files" => files
        })
        .encode()
    }
}

impl From<ScrapeData> for Bencoded {
    fn from(scrape_data: ScrapeData) -> Self {
        Self { scrape_data }
    }
}

impl IntoResponse for Bencoded {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {

    mod scrape_response {
        use swarm_tracker_primitives::info_hash::InfoHash;
        use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;

        use crate::core::ScrapeData;
        use crate::servers::http::responses::scrape::Bencoded;

        fn sample_scrape_data() -> ScrapeData {
            ScrapeData {
                files: vec![(
                    InfoHash([0x69; 20]),
                    SwarmMetadata {
                        complete: 1,
                        downloaded: 2,
                        incomplete: 3,
                    },
                )],
            }
        }

        #[test]
        fn should_be_converted_from_scrape_data() {
            let response = Bencoded::from(sample_scrape_data());

            assert_eq!(
                response,
                Bencoded {
                    scrape_data: sample_scrape_data()
                }
            );
        }

        #[test]
        fn should_be_bencoded() {
            let response = Bencoded {
                scrape_data: sample_scrape_data(),
            };

            let bytes = response.body();

            // cspell:disable-next-line
            let expected_bytes = b"d5:filesd20:iiiiiiiiiiiiiiiiiiiid8:completei1e10:downloadedi2e10:incompletei3eeee";

            assert_eq!(
                String::from_utf8(bytes).unwrap(),
                String::from_utf8(expected_bytes.to_vec()).unwrap()
            );
        }

        #[test]
        fn should_be_an_empty_files_dictionary_for_an_empty_scrape() {
            let response = Bencoded::from(ScrapeData::default());

            assert_eq!(String::from_utf8(response.body()).unwrap(), "d5:filesdee");
        }
    }
}
