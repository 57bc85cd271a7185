//! Base-128 little-endian varint codec.
//!
//! Each byte carries 7 payload bits, least significant group first; the
//! high bit marks continuation. A `u64` therefore encodes in at most 10
//! bytes.

use crate::TraceFile;

/// Reads a varint from `f`.
///
/// End of stream terminates the integer: a varint cut short by EOF yields
/// the bits accumulated so far, and an immediate EOF yields 0. Callers
/// detect end-of-stream from the event layer, not from varint reads.
pub fn read_vuint(f: &mut dyn TraceFile) -> u64 {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let Some(b) = f.getc() else {
            break;
        };
        if shift < 64 {
            value |= u64::from(b & 0x7f).wrapping_shl(shift);
        }
        if b & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    value
}

/// Drains one varint from `f` without computing its value.
pub fn skip_vuint(f: &mut dyn TraceFile) {
    loop {
        match f.getc() {
            Some(b) if b & 0x80 != 0 => continue,
            _ => return,
        }
    }
}

/// Appends the varint encoding of `value` to `out`.
pub fn write_vuint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut b = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            b |= 0x80;
        }
        out.push(b);
        if value == 0 {
            return;
        }
    }
}

/// Number of bytes `value` occupies as a varint (minimum 1).
pub fn vuint_len(value: u64) -> usize {
    let bits = 64 - u64::leading_zeros(value) as usize;
    bits.div_ceil(7).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BytesFile;
    use rand::{Rng, SeedableRng};

    fn roundtrip(value: u64) {
        let mut encoded = Vec::new();
        write_vuint(&mut encoded, value);
        assert_eq!(encoded.len(), vuint_len(value), "length law for {value}");
        let mut f = BytesFile::new(encoded);
        assert_eq!(read_vuint(&mut f), value);
        assert_eq!(f.getc(), None, "no trailing bytes for {value}");
    }

    #[test]
    fn roundtrip_boundaries() {
        for shift in 0..64 {
            let v = 1u64 << shift;
            roundtrip(v - 1);
            roundtrip(v);
            roundtrip(v | 1);
        }
        roundtrip(u64::MAX);
    }

    #[test]
    fn roundtrip_random() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x7f7f7f7f);
        for _ in 0..10_000 {
            let bits = rng.gen_range(0..=64u32);
            let v = rng.gen::<u64>() >> (64 - bits).min(63);
            roundtrip(v);
        }
    }

    #[test]
    fn eof_mid_varint_yields_partial_accumulator() {
        // 0xff alone promises a continuation that never arrives.
        let mut f = BytesFile::new(vec![0xff]);
        assert_eq!(read_vuint(&mut f), 0x7f);
        // Immediate EOF yields zero.
        let mut f = BytesFile::new(vec![]);
        assert_eq!(read_vuint(&mut f), 0);
    }

    #[test]
    fn skip_consumes_same_bytes_as_read() {
        let mut encoded = Vec::new();
        write_vuint(&mut encoded, 300);
        write_vuint(&mut encoded, 7);
        let mut f = BytesFile::new(encoded);
        skip_vuint(&mut f);
        assert_eq!(read_vuint(&mut f), 7);
    }

    #[test]
    fn known_encodings() {
        let mut out = Vec::new();
        write_vuint(&mut out, 0);
        assert_eq!(out, [0x00]);
        out.clear();
        write_vuint(&mut out, 127);
        assert_eq!(out, [0x7f]);
        out.clear();
        write_vuint(&mut out, 128);
        assert_eq!(out, [0x80, 0x01]);
        out.clear();
        write_vuint(&mut out, 300);
        assert_eq!(out, [0xac, 0x02]);
    }
}
