// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Read, Write};

/// Error during serialization of the on-disk log block frame.
#[derive(Debug)]
pub enum EncodeError {
    /// I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "EncodeError: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Error during deserialization of the on-disk log block frame.
#[derive(Debug)]
pub enum DecodeError {
    /// I/O error.
    Io(std::io::Error),

    /// Magic bytes at the start of a frame did not match.
    InvalidMagic,

    /// An enum discriminant did not map to a known variant.
    InvalidTag(&'static str, u32),

    /// A length-prefixed field exceeded the enclosing frame's declared size.
    LengthOutOfBounds,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "DecodeError: {e}"),
            Self::InvalidMagic => write!(f, "DecodeError: magic mismatch"),
            Self::InvalidTag(what, got) => write!(f, "DecodeError: invalid {what} tag: {got}"),
            Self::LengthOutOfBounds => write!(f, "DecodeError: length field out of bounds"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Trait to serialize a frame component into a byte stream.
pub trait Encode {
    /// Serializes into the writer.
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError>;

    /// Serializes into a fresh `Vec<u8>`.
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut v = Vec::new();
        #[expect(clippy::expect_used, reason = "writing into a Vec cannot fail")]
        self.encode_into(&mut v).expect("cannot fail");
        v
    }
}

/// Trait to deserialize a frame component from a byte stream.
pub trait Decode: Sized {
    /// Deserializes from the reader.
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError>;
}
