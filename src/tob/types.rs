//! Campbell column data types.
//!
//! Dataloggers record each table column in one of a small set of on-disk
//! encodings, named on line six of the ASCII file header. Most are plain
//! big-endian numerics; `FP2` (a 2-byte decimal float) and `NSEC` (an 8-byte
//! timestamp) are Campbell-proprietary and need custom conversion.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Seconds from the Unix epoch to 1990-01-01T00:00:00Z, the reference point
/// of all Campbell timestamps.
const CAMPBELL_EPOCH_UNIX_SECONDS: i64 = 631_152_000;

/// The instant all `NSEC` values count from.
pub fn campbell_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::seconds(CAMPBELL_EPOCH_UNIX_SECONDS)
}

/// On-disk column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsType {
    /// 32-bit IEEE float, big-endian (`IEEE4`, `IEEE4B`)
    Ieee4,
    /// 64-bit IEEE float, big-endian (`IEEE8`, `IEEE8B`)
    Ieee8,
    /// Signed 32-bit integer, big-endian (`Long`, `LONG`)
    Long,
    /// Unsigned 32-bit integer, big-endian (`ULONG`, `UINT4`, `UINT4B`)
    ULong,
    /// Unsigned 16-bit integer, big-endian (`UINT2`, `UINT2B`)
    UInt2,
    /// Unsigned 8-bit integer (`UINT1`, `UINT1B`, `Bool8`, `Bool8B`)
    UInt1,
    /// 1-byte boolean (`Boolean`)
    Boolean,
    /// Campbell 2-byte decimal float (`FP2`)
    Fp2,
    /// Campbell 8-byte timestamp (`NSEC`, `SecNano`)
    Nsec,
    /// Fixed-length byte string (`ASCII(n)`)
    Ascii(usize),
}

impl CsType {
    /// Parse a dtype token from the ASCII header.
    ///
    /// `ASCII(n)` widths are registered dynamically from the parenthesised
    /// token; every other name must match the table exactly. Returns `None`
    /// for unknown names so the caller can attach the field name to the error.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IEEE4" | "IEEE4B" => Some(Self::Ieee4),
            "IEEE8" | "IEEE8B" => Some(Self::Ieee8),
            "Long" | "LONG" => Some(Self::Long),
            "ULONG" | "UINT4" | "UINT4B" => Some(Self::ULong),
            "UINT2" | "UINT2B" => Some(Self::UInt2),
            "UINT1" | "UINT1B" | "Bool8" | "Bool8B" => Some(Self::UInt1),
            "Boolean" => Some(Self::Boolean),
            "FP2" => Some(Self::Fp2),
            "NSEC" | "SecNano" => Some(Self::Nsec),
            _ => Self::parse_ascii_width(name),
        }
    }

    /// Parse the width out of an `ASCII(n)`-shaped dtype token.
    fn parse_ascii_width(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("ASCII(")?;
        let digits = rest.strip_suffix(')')?;
        let width: usize = digits.trim().parse().ok()?;
        Some(Self::Ascii(width))
    }

    /// Get the size in bytes of one value of this type
    pub fn width(self) -> usize {
        match self {
            Self::Ieee4 => 4,
            Self::Ieee8 => 8,
            Self::Long => 4,
            Self::ULong => 4,
            Self::UInt2 => 2,
            Self::UInt1 => 1,
            Self::Boolean => 1,
            Self::Fp2 => 2,
            Self::Nsec => 8,
            Self::Ascii(n) => n,
        }
    }

    /// Whether a contiguous run of values can be decoded by bulk big-endian
    /// conversion. Proprietary encodings force the element-wise decode path.
    pub fn is_native(self) -> bool {
        !matches!(self, Self::Fp2 | Self::Nsec | Self::Ascii(_))
    }
}

/// Convert a Campbell FP2 value to an IEEE 754 float.
///
/// FP2 format (16 bits, big-endian on disk): SEEMMMMM MMMMMMMM
/// - S: sign bit (bit 15)
/// - E: decimal exponent magnitude (bits 14-13)
/// - M: mantissa (bits 12-0)
///
/// Value = (1 - 2S) × M × 10^(-E), with reserved encodings for the
/// non-finite values: (S=0, E=0, M=8191) = +INF, (S=1, E=0, M=8191) = -INF,
/// (S=1, E=0, M=8190) = NAN.
#[inline(always)]
pub fn fp2_to_f32(raw: u16) -> f32 {
    let sign = raw >> 15;
    let exponent = (raw & 0x6000) >> 13;
    let mantissa = raw & 0x1FFF;

    match (sign, exponent, mantissa) {
        (0, 0, 8191) => f32::INFINITY,
        (1, 0, 8191) => f32::NEG_INFINITY,
        (1, 0, 8190) => f32::NAN,
        _ => {
            let magnitude = mantissa as f32 * 10f32.powi(-(exponent as i32));
            if sign == 1 {
                -magnitude
            } else {
                magnitude
            }
        }
    }
}

/// Decode an NSEC timestamp from its 8 on-disk bytes.
///
/// Two little-endian unsigned 32-bit words: seconds since the Campbell epoch
/// and nanoseconds into that second. Loggers populate the nanosecond word at
/// millisecond granularity, so the sub-millisecond digits are truncated by
/// default to match their output; pass `truncate_to_millis = false` to keep
/// the raw nanoseconds.
#[inline(always)]
pub fn nsec_to_datetime(bytes: &[u8; 8], truncate_to_millis: bool) -> DateTime<Utc> {
    let seconds = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let mut nanos = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if truncate_to_millis {
        nanos = nanos / 1_000_000 * 1_000_000;
    }

    campbell_epoch() + TimeDelta::seconds(seconds as i64) + TimeDelta::nanoseconds(nanos as i64)
}
