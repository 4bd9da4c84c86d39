//! sRGB ↔ linear-light conversion.

use std::sync::OnceLock;

static DECODE_LUT: OnceLock<[f32; 256]> = OnceLock::new();

fn decode_lut() -> &'static [f32; 256] {
    DECODE_LUT.get_or_init(|| {
        let mut lut = [0.0f32; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let c = i as f32 / 255.0;
            *slot = if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
        }
        lut
    })
}

/// Decode a stored sRGB byte to linear light in `[0, 1]`.
pub fn srgb_to_linear(v: u8) -> f32 {
    decode_lut()[v as usize]
}

/// Encode linear light to a stored sRGB byte, clamping out-of-range input.
pub fn linear_to_srgb(v: f32) -> u8 {
    let v = v.clamp(0.0, 1.0);
    let c = if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0 + 0.5) as u8
}
