//! Table file formats and per-frame header/footer layout.
//!
//! TOB2 and TOB3 share the frame shape `header ∥ data ∥ footer`; they differ
//! in whether the frame header carries a starting record number. TOB1 is
//! recognised so its ASCII metadata can still be inspected, but it has no
//! frame decoder. TOA5 is plain text and never reaches the binary path.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::error::{CampbellError, Result};
use crate::tob::types::nsec_to_datetime;
use chrono::{DateTime, Utc};

/// File format declared in the first field of the ASCII header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TobFormat {
    /// Binary, frame header holds no timestamp. Recognised but not decodable.
    Tob1,
    /// Binary, 8-byte frame header (NSEC timestamp).
    Tob2,
    /// Binary, 12-byte frame header (NSEC timestamp + record number).
    Tob3,
    /// Comma-separated text; handled by the delegated CSV reader.
    Toa5,
}

/// Start-of-frame values parsed from a binary frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Timestamp of the frame's first record, as reported by the logger.
    pub time: DateTime<Utc>,
    /// Record number of the frame's first record (TOB3 only).
    pub record: Option<u32>,
}

impl TobFormat {
    /// Parse the format name from the ASCII header.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "TOB1" => Ok(Self::Tob1),
            "TOB2" => Ok(Self::Tob2),
            "TOB3" => Ok(Self::Tob3),
            "TOA5" => Ok(Self::Toa5),
            _ => Err(CampbellError::UnsupportedFormat {
                format: name.to_string(),
            }),
        }
    }

    /// Canonical format name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tob1 => "TOB1",
            Self::Tob2 => "TOB2",
            Self::Tob3 => "TOB3",
            Self::Toa5 => "TOA5",
        }
    }

    /// Size of the per-frame header in bytes.
    pub fn frame_header_size(self) -> usize {
        match self {
            Self::Tob1 => 8,
            Self::Tob2 => 8,
            Self::Tob3 => 12,
            Self::Toa5 => 0,
        }
    }

    /// Size of the per-frame footer in bytes.
    pub fn frame_footer_size(self) -> usize {
        match self {
            Self::Tob1 => 4,
            Self::Tob2 => 4,
            Self::Tob3 => 4,
            Self::Toa5 => 0,
        }
    }

    /// Decode a frame header from its `frame_header_size` bytes.
    ///
    /// The caller guarantees `bytes.len() == self.frame_header_size()`.
    pub fn parse_frame_header(
        self,
        bytes: &[u8],
        truncate_nsec_to_millis: bool,
    ) -> Result<FrameHeader> {
        match self {
            Self::Tob2 => {
                let mut nsec = [0u8; 8];
                nsec.copy_from_slice(&bytes[..8]);
                Ok(FrameHeader {
                    time: nsec_to_datetime(&nsec, truncate_nsec_to_millis),
                    record: None,
                })
            }
            Self::Tob3 => {
                let mut nsec = [0u8; 8];
                nsec.copy_from_slice(&bytes[..8]);
                Ok(FrameHeader {
                    time: nsec_to_datetime(&nsec, truncate_nsec_to_millis),
                    record: Some(BigEndian::read_u32(&bytes[8..12])),
                })
            }
            // TOB1 frame headers carry no timestamp; decoding them is not
            // supported. TOA5 has no binary frames at all.
            Self::Tob1 | Self::Toa5 => Err(CampbellError::UnsupportedFormat {
                format: self.name().to_string(),
            }),
        }
    }

    /// Consume a frame footer.
    ///
    /// The footer's 4 bytes hold a validation stamp the decoder does not
    /// interpret; reading them keeps the stream aligned to the next frame.
    pub fn parse_frame_footer(self, _bytes: &[u8]) {}
}
