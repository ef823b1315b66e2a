/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! RGB to HSV and back
//!
//! Hue is normalized to `[0,1)` instead of degrees, saturation and value
//! are in the range of the input samples.
//!
//! The transform is reversible for colors whose channel spread (max - min)
//! is above [`MIN_DELTA`], below that a color is treated as gray.

/// Channel spread under which a color has no hue or saturation
pub const MIN_DELTA: f32 = 1e-4;

/// Convert one RGB triple to HSV
#[inline]
pub fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if delta <= MIN_DELTA {
        return [0.0, 0.0, max];
    }
    let saturation = delta / max;

    let mut hue = if r == max {
        let h = (g - b) / delta;
        if h < 0.0 {
            h + 6.0
        } else {
            h
        }
    } else if g == max {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    hue /= 6.0;

    [hue, saturation, max]
}

/// Convert one HSV triple back to RGB
#[inline]
pub fn hsv_to_rgb([h, s, v]: [f32; 3]) -> [f32; 3] {
    if s == 0.0 {
        return [v, v, v];
    }
    // a full turn is the same as none
    let h = if h == 1.0 { 0.0 } else { h } * 6.0;

    let sector = h.floor();
    let f = h - sector;

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as i32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q]
    }
}

/// Convert interleaved RGBA samples to HSVA in place
pub fn rgba_to_hsva(pixels: &mut [f32]) {
    for pixel in pixels.chunks_exact_mut(4) {
        let hsv = rgb_to_hsv([pixel[0], pixel[1], pixel[2]]);
        pixel[..3].copy_from_slice(&hsv);
    }
}

/// Convert interleaved HSVA samples to RGBA in place
pub fn hsva_to_rgba(pixels: &mut [f32]) {
    for pixel in pixels.chunks_exact_mut(4) {
        let rgb = hsv_to_rgb([pixel[0], pixel[1], pixel[2]]);
        pixel[..3].copy_from_slice(&rgb);
    }
}

#[cfg(test)]
mod tests {
    use nanorand::Rng;

    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn round_trip_random_colors() {
        let mut samples = vec![0_u16; 3 * 2000];
        nanorand::WyRand::new().fill(&mut samples);

        for rgb in samples.chunks_exact(3) {
            let rgb = [
                f32::from(rgb[0]) / 65535.0,
                f32::from(rgb[1]) / 65535.0,
                f32::from(rgb[2]) / 65535.0
            ];
            let hsv = rgb_to_hsv(rgb);
            assert!((0.0..1.0).contains(&hsv[0]), "hue {} out of range", hsv[0]);

            let back = hsv_to_rgb(hsv);
            let delta = rgb[0].max(rgb[1]).max(rgb[2]) - rgb[0].min(rgb[1]).min(rgb[2]);
            if delta > MIN_DELTA {
                assert!(close(rgb, back), "{rgb:?} came back as {back:?}");
            }
        }
    }

    #[test]
    fn hue_sectors() {
        // green is the largest channel: hue in [1/6, 1/2]
        let [h, _, _] = rgb_to_hsv([0.2, 0.9, 0.4]);
        assert!((1.0 / 6.0..=0.5).contains(&h), "{h}");
        // blue is the largest channel: hue in [1/2, 5/6]
        let [h, _, _] = rgb_to_hsv([0.3, 0.1, 0.8]);
        assert!((0.5..=5.0 / 6.0).contains(&h), "{h}");
        // red above blue above green wraps below one
        let [h, _, _] = rgb_to_hsv([0.9, 0.1, 0.3]);
        assert!((5.0 / 6.0..1.0).contains(&h), "{h}");
    }

    #[test]
    fn primaries() {
        assert!(close(rgb_to_hsv([1.0, 0.0, 0.0]), [0.0, 1.0, 1.0]));
        assert!(close(rgb_to_hsv([0.0, 1.0, 0.0]), [1.0 / 3.0, 1.0, 1.0]));
        assert!(close(rgb_to_hsv([0.0, 0.0, 1.0]), [2.0 / 3.0, 1.0, 1.0]));
    }

    #[test]
    fn grays_have_no_hue() {
        assert_eq!(rgb_to_hsv([0.5, 0.5, 0.5]), [0.0, 0.0, 0.5]);
        assert_eq!(rgb_to_hsv([0.5, 0.50005, 0.5]), [0.0, 0.0, 0.50005]);
        assert_eq!(rgb_to_hsv([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        assert_eq!(hsv_to_rgb([0.7, 0.0, 0.25]), [0.25, 0.25, 0.25]);
    }

    #[test]
    fn full_turn_wraps_to_red() {
        assert_eq!(hsv_to_rgb([1.0, 1.0, 1.0]), hsv_to_rgb([0.0, 1.0, 1.0]));
        assert_eq!(hsv_to_rgb([1.0, 1.0, 1.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn buffer_conversion_keeps_alpha() {
        let mut pixels = [0.0, 1.0, 0.0, 0.25, 0.2, 0.2, 0.2, 0.75];
        rgba_to_hsva(&mut pixels);
        assert_eq!(pixels[3], 0.25);
        assert_eq!(pixels[7], 0.75);
        hsva_to_rgba(&mut pixels);
        assert!(close([pixels[0], pixels[1], pixels[2]], [0.0, 1.0, 0.0]));
        assert!(close([pixels[4], pixels[5], pixels[6]], [0.2, 0.2, 0.2]));
    }
}
