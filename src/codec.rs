//! Sample Codec (C2): decode/encode between raw driver bytes and normalized
//! `f64` samples.
//!
//! Adapted from the teacher's generic `samples` transcoder (per-width
//! `ToBytes`/`FromBytes` impls keyed by endianness), collapsed into a single
//! runtime-selected enum instead of a const-generic type per format, since
//! the codec a bridge uses is chosen at `open()` time rather than at
//! compile time. Every width, including the 24-bit ones, is normalized
//! through `dasp_sample::Sample` — the same conversion the teacher uses
//! throughout its examples (`U::from_sample(sample)`) — with
//! `dasp_sample::I24` standing in for the 24-bit widths exactly as the
//! teacher's own `samples_formats.rs` re-exports it for that purpose.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use dasp_sample::{Sample as DaspSample, I24};

use crate::error::{BridgeError, Result};

/// Byte order of a wire sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderKind {
    Little,
    Big,
}

/// One of the recognized wire sample formats.
///
/// Each variant fully determines `bytes_per_sample`, `is_float`,
/// `is_signed` and `byte_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCodec {
    U8,
    I8,
    I16Le,
    I16Be,
    I24Le,
    I24Be,
    I32Le,
    I32Be,
    F32Le,
    F32Be,
    F64Le,
    F64Be,
}

impl SampleCodec {
    /// Number of bytes one sample occupies on the wire.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleCodec::U8 | SampleCodec::I8 => 1,
            SampleCodec::I16Le | SampleCodec::I16Be => 2,
            SampleCodec::I24Le | SampleCodec::I24Be => 3,
            SampleCodec::I32Le | SampleCodec::I32Be | SampleCodec::F32Le | SampleCodec::F32Be => 4,
            SampleCodec::F64Le | SampleCodec::F64Be => 8,
        }
    }

    /// Whether this format stores IEEE-754 floats rather than integers.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            SampleCodec::F32Le | SampleCodec::F32Be | SampleCodec::F64Le | SampleCodec::F64Be
        )
    }

    /// Whether the integer representation is signed. Float formats report
    /// `true`; only `U8` is unsigned.
    pub fn is_signed(&self) -> bool {
        !matches!(self, SampleCodec::U8)
    }

    /// Endianness of multi-byte formats; `U8`/`I8` report `Little` by
    /// convention since a single byte has no order.
    pub fn byte_order(&self) -> ByteOrderKind {
        match self {
            SampleCodec::I16Be | SampleCodec::I24Be | SampleCodec::I32Be | SampleCodec::F32Be
            | SampleCodec::F64Be => ByteOrderKind::Big,
            _ => ByteOrderKind::Little,
        }
    }

    /// Decodes exactly `src.len() / bytes_per_sample()` samples from `src`
    /// into the front of `dst`, normalizing to `[-1.0, +1.0]` for integer
    /// formats.
    ///
    /// Returns [`BridgeError::BufferMisaligned`] if `src`'s length is not a
    /// whole multiple of `bytes_per_sample()`, or if `dst` is too short to
    /// hold the resulting samples.
    pub fn decode(&self, dst: &mut [f64], src: &[u8]) -> Result<()> {
        let bps = self.bytes_per_sample();
        if src.len() % bps != 0 {
            return Err(BridgeError::BufferMisaligned);
        }
        let n = src.len() / bps;
        if dst.len() < n {
            return Err(BridgeError::BufferMisaligned);
        }
        for (chunk, out) in src.chunks_exact(bps).zip(dst.iter_mut()) {
            *out = self.decode_one(chunk);
        }
        Ok(())
    }

    /// Encodes exactly `src.len()` samples into the front of `dst`, clamping
    /// to the representable range of the target format. Never fails on
    /// numeric range.
    ///
    /// Returns [`BridgeError::BufferMisaligned`] if `dst` cannot hold
    /// `src.len()` samples at this codec's width.
    pub fn encode(&self, dst: &mut [u8], src: &[f64]) -> Result<()> {
        let bps = self.bytes_per_sample();
        if dst.len() < src.len() * bps {
            return Err(BridgeError::BufferMisaligned);
        }
        for (chunk, &sample) in dst.chunks_exact_mut(bps).zip(src.iter()) {
            self.encode_one(chunk, sample);
        }
        Ok(())
    }

    fn decode_one(&self, b: &[u8]) -> f64 {
        match self {
            SampleCodec::U8 => b[0].to_sample::<f64>(),
            SampleCodec::I8 => (b[0] as i8).to_sample::<f64>(),
            SampleCodec::I16Le => LittleEndian::read_i16(b).to_sample::<f64>(),
            SampleCodec::I16Be => BigEndian::read_i16(b).to_sample::<f64>(),
            SampleCodec::I24Le => I24::new_unchecked(LittleEndian::read_i24(b)).to_sample::<f64>(),
            SampleCodec::I24Be => I24::new_unchecked(BigEndian::read_i24(b)).to_sample::<f64>(),
            SampleCodec::I32Le => LittleEndian::read_i32(b).to_sample::<f64>(),
            SampleCodec::I32Be => BigEndian::read_i32(b).to_sample::<f64>(),
            SampleCodec::F32Le => LittleEndian::read_f32(b) as f64,
            SampleCodec::F32Be => BigEndian::read_f32(b) as f64,
            SampleCodec::F64Le => LittleEndian::read_f64(b),
            SampleCodec::F64Be => BigEndian::read_f64(b),
        }
    }

    fn encode_one(&self, b: &mut [u8], sample: f64) {
        let clamped = sample.clamp(-1.0, 1.0);
        match self {
            SampleCodec::U8 => b[0] = clamped.to_sample::<u8>(),
            SampleCodec::I8 => b[0] = clamped.to_sample::<i8>() as u8,
            SampleCodec::I16Le => LittleEndian::write_i16(b, clamped.to_sample::<i16>()),
            SampleCodec::I16Be => BigEndian::write_i16(b, clamped.to_sample::<i16>()),
            SampleCodec::I24Le => LittleEndian::write_i24(b, clamped.to_sample::<I24>().inner()),
            SampleCodec::I24Be => BigEndian::write_i24(b, clamped.to_sample::<I24>().inner()),
            SampleCodec::I32Le => LittleEndian::write_i32(b, clamped.to_sample::<i32>()),
            SampleCodec::I32Be => BigEndian::write_i32(b, clamped.to_sample::<i32>()),
            SampleCodec::F32Le => LittleEndian::write_f32(b, clamped as f32),
            SampleCodec::F32Be => BigEndian::write_f32(b, clamped as f32),
            SampleCodec::F64Le => LittleEndian::write_f64(b, clamped),
            SampleCodec::F64Be => BigEndian::write_f64(b, clamped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SampleCodec; 12] = [
        SampleCodec::U8,
        SampleCodec::I8,
        SampleCodec::I16Le,
        SampleCodec::I16Be,
        SampleCodec::I24Le,
        SampleCodec::I24Be,
        SampleCodec::I32Le,
        SampleCodec::I32Be,
        SampleCodec::F32Le,
        SampleCodec::F32Be,
        SampleCodec::F64Le,
        SampleCodec::F64Be,
    ];

    fn tolerance(c: &SampleCodec) -> f64 {
        let bits: i32 = match c {
            SampleCodec::U8 | SampleCodec::I8 => 8,
            SampleCodec::I16Le | SampleCodec::I16Be => 16,
            SampleCodec::I24Le | SampleCodec::I24Be => 24,
            SampleCodec::I32Le | SampleCodec::I32Be => 32,
            SampleCodec::F32Le | SampleCodec::F32Be | SampleCodec::F64Le | SampleCodec::F64Be => {
                return 1e-6
            }
        };
        2f64.powi(-(bits - 1))
    }

    #[test]
    fn round_trip_known_values() {
        for codec in ALL {
            let input = [-1.0, -0.5, 0.0, 0.5, 1.0];
            let mut bytes = vec![0u8; input.len() * codec.bytes_per_sample()];
            codec.encode(&mut bytes, &input).unwrap();
            let mut out = vec![0.0; input.len()];
            codec.decode(&mut out, &bytes).unwrap();
            let tol = tolerance(&codec);
            for (a, b) in input.iter().zip(out.iter()) {
                assert!((a - b).abs() <= tol, "{codec:?}: {a} vs {b}, tol {tol}");
            }
        }
    }

    #[test]
    fn misaligned_source_rejected() {
        let codec = SampleCodec::I16Le;
        let mut dst = [0.0; 4];
        let src = [0u8; 3];
        assert_eq!(
            codec.decode(&mut dst, &src),
            Err(BridgeError::BufferMisaligned)
        );
    }

    #[test]
    fn encode_clamps_out_of_range() {
        let codec = SampleCodec::I16Le;
        let mut bytes = [0u8; 2];
        codec.encode(&mut bytes, &[2.0]).unwrap();
        assert_eq!(LittleEndian::read_i16(&bytes), i16::MAX);
        codec.encode(&mut bytes, &[-2.0]).unwrap();
        assert_eq!(LittleEndian::read_i16(&bytes), i16::MIN);
    }

    #[test]
    fn u8_uses_bias_128() {
        let codec = SampleCodec::U8;
        let mut bytes = [0u8; 1];
        codec.encode(&mut bytes, &[0.0]).unwrap();
        assert_eq!(bytes[0], 128);
    }

    #[test]
    fn i24_round_trip_extremes() {
        let codec = SampleCodec::I24Le;
        let mut bytes = [0u8; 3];
        codec.encode(&mut bytes, &[1.0]).unwrap();
        let mut out = [0.0; 1];
        codec.decode(&mut out, &bytes).unwrap();
        assert!((out[0] - 1.0).abs() < 1e-6);
    }

    proptest::proptest! {
        #[test]
        fn decode_encode_preserves_sign_and_order(f in -1.0f64..=1.0) {
            for codec in ALL {
                let mut bytes = vec![0u8; codec.bytes_per_sample()];
                codec.encode(&mut bytes, &[f]).unwrap();
                let mut out = [0.0];
                codec.decode(&mut out, &bytes).unwrap();
                let tol = tolerance(&codec);
                proptest::prop_assert!((out[0] - f).abs() <= tol + 1e-6);
            }
        }
    }
}
