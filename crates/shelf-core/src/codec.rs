//! Object serialization over std streams.

use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ShelfError, ShelfResult};

/// Serialization format used to turn objects into shelf blobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Compact binary encoding via `bincode`.
    #[default]
    Bincode,
    /// Self-describing JSON via `serde_json`.
    Json,
}

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bincode => "bincode",
            Self::Json => "json",
        }
    }

    /// Encode one object into `writer`.
    pub fn encode<T, W>(self, value: &T, writer: W) -> ShelfResult<()>
    where
        T: Serialize + ?Sized,
        W: Write,
    {
        match self {
            Self::Bincode => bincode::serialize_into(writer, value)
                .map_err(|e| ShelfError::Codec(format!("bincode encode: {e}"))),
            Self::Json => serde_json::to_writer(writer, value)
                .map_err(|e| ShelfError::Codec(format!("json encode: {e}"))),
        }
    }

    /// Decode one object from `reader`.
    pub fn decode<T, R>(self, reader: R) -> ShelfResult<T>
    where
        T: DeserializeOwned,
        R: BufRead,
    {
        match self {
            Self::Bincode => bincode::deserialize_from(reader)
                .map_err(|e| ShelfError::Codec(format!("bincode decode: {e}"))),
            Self::Json => serde_json::from_reader(reader)
                .map_err(|e| ShelfError::Codec(format!("json decode: {e}"))),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bincode" => Ok(Self::Bincode),
            "json" => Ok(Self::Json),
            other => Err(ShelfError::InvalidArgument(format!("unknown codec {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u32,
        tags: Vec<String>,
        weights: BTreeMap<String, f64>,
    }

    fn sample() -> Sample {
        Sample {
            id: 7,
            tags: vec!["a".into(), "b\nc".into()],
            weights: [("x".to_string(), 0.5)].into_iter().collect(),
        }
    }

    #[test]
    fn both_codecs_roundtrip() {
        for codec in [Codec::Bincode, Codec::Json] {
            let mut buf = Vec::new();
            codec.encode(&sample(), &mut buf).unwrap();
            let back: Sample = codec.decode(Cursor::new(buf)).unwrap();
            assert_eq!(back, sample(), "{codec}");
        }
    }

    #[test]
    fn names_parse_back() {
        for codec in [Codec::Bincode, Codec::Json] {
            assert_eq!(codec.name().parse::<Codec>().unwrap(), codec);
        }
        assert!(matches!(
            "pickle".parse::<Codec>(),
            Err(ShelfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn truncated_input_is_codec_error() {
        let mut buf = Vec::new();
        Codec::Bincode.encode(&sample(), &mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        let err = Codec::Bincode.decode::<Sample, _>(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ShelfError::Codec(_)));
    }
}
