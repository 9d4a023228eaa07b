// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Decoding of string uploads.
//!
//! Backends receive string payloads together with a format token and use
//! [`decode_string`] to turn them into the bytes that get stored.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use bytes::Bytes;
use percent_encoding::percent_decode_str;

use crate::error::{Error, Result};

pub const FORMAT_RAW: &str = "raw";
pub const FORMAT_BASE64: &str = "base64";
pub const FORMAT_BASE64URL: &str = "base64url";
pub const FORMAT_DATA_URL: &str = "data_url";

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Bytes decoded from a string upload, plus the MIME type a data URL declared.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedString {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// The parts of a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime_type: Option<&'a str>,
    pub base64: bool,
    pub payload: &'a str,
}

/// Split a `data:[<mediatype>][;base64],<data>` URL into its parts.
pub fn parse_data_url(value: &str) -> Result<DataUrl<'_>> {
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| Error::InvalidArgument("string is not a data URL".to_string()))?;
    let (header, payload) = rest.split_once(',').ok_or_else(|| {
        Error::InvalidArgument("data URL is missing the ',' separator".to_string())
    })?;

    let (media, base64) = match header.strip_suffix(";base64") {
        Some(media) => (media, true),
        None => (header, false),
    };

    Ok(DataUrl {
        mime_type: if media.is_empty() { None } else { Some(media) },
        base64,
        payload,
    })
}

/// Decode `value` according to `format`, one of the `FORMAT_*` tokens.
pub fn decode_string(value: &str, format: &str) -> Result<DecodedString> {
    match format {
        FORMAT_RAW => Ok(DecodedString {
            bytes: Bytes::copy_from_slice(value.as_bytes()),
            content_type: None,
        }),
        FORMAT_BASE64 => Ok(DecodedString {
            bytes: Bytes::from(STANDARD_LENIENT.decode(value)?),
            content_type: None,
        }),
        FORMAT_BASE64URL => Ok(DecodedString {
            bytes: Bytes::from(URL_SAFE_LENIENT.decode(value)?),
            content_type: None,
        }),
        FORMAT_DATA_URL => {
            let data_url = parse_data_url(value)?;
            let bytes = if data_url.base64 {
                Bytes::from(STANDARD_LENIENT.decode(data_url.payload)?)
            } else {
                let decoded = percent_decode_str(data_url.payload)
                    .decode_utf8()
                    .map_err(|e| {
                        Error::InvalidArgument(format!("invalid data URL payload: {}", e))
                    })?;
                Bytes::copy_from_slice(decoded.as_bytes())
            };
            Ok(DecodedString {
                bytes,
                content_type: data_url.mime_type.map(str::to_string),
            })
        }
        other => Err(Error::InvalidArgument(format!(
            "unknown string format '{}'",
            other
        ))),
    }
}
