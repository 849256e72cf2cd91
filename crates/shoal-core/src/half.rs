//! IEEE 754 binary16 ("half float") conversion.
//!
//! Only the two conversions the packed cell codec needs. Encoding
//! rounds to nearest, ties to even, and **saturates**: values beyond
//! the largest finite half (`±65504`) and infinities clamp to that
//! bound instead of producing a half infinity. NaN encodes as `+0.0`
//! so that a corrupt cell can never poison a decoded mirror.

/// Largest finite binary16 value.
pub const HALF_MAX: f32 = 65504.0;

/// Smallest positive normal binary16 value (`2^-14`).
pub const HALF_MIN_POSITIVE: f32 = 6.103_515_6e-5;

/// Relative precision of binary16 (`2^-11`, half an ulp at 1.0).
pub const HALF_EPSILON: f32 = 4.882_812_5e-4;

/// Convert an `f32` to binary16 bits with saturation.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    if value.is_nan() {
        return 0;
    }
    let v = value.clamp(-HALF_MAX, HALF_MAX);
    let bits = v.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mant = bits & 0x007f_ffff;

    // f32 zero and f32 subnormals are far below the half subnormal range.
    if exp == 0 {
        return sign;
    }

    let e = exp - 127 + 15;
    if e <= 0 {
        if e < -10 {
            return sign;
        }
        let m = mant | 0x0080_0000;
        let shift = (14 - e) as u32;
        let truncated = m >> shift;
        let rem = m & ((1u32 << shift) - 1);
        let halfway = 1u32 << (shift - 1);
        let mut r = truncated;
        if rem > halfway || (rem == halfway && truncated & 1 == 1) {
            // May carry into the exponent field, which yields the
            // smallest normal: still the correct encoding.
            r += 1;
        }
        return sign | r as u16;
    }

    let mut h = ((e as u32) << 10) | (mant >> 13);
    let rem = mant & 0x1fff;
    if rem > 0x1000 || (rem == 0x1000 && h & 1 == 1) {
        h += 1;
    }
    sign | h as u16
}

/// Convert binary16 bits to an `f32`. Exact for every input.
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits & 0x8000) << 16;
    let exp = u32::from((bits >> 10) & 0x1f);
    let mant = u32::from(bits & 0x03ff);
    match exp {
        0 if mant == 0 => f32::from_bits(sign),
        0 => {
            let magnitude = mant as f32 * 2f32.powi(-24);
            if sign != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        31 => f32::from_bits(sign | 0x7f80_0000 | (mant << 13)),
        _ => f32::from_bits(sign | ((exp + 112) << 23) | (mant << 13)),
    }
}

/// Round an `f32` through binary16 and back.
pub fn quantize(value: f32) -> f32 {
    f16_bits_to_f32(f32_to_f16_bits(value))
}
