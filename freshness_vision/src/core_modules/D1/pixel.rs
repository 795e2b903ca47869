// THEORY (1D Pixel Color Spaces):
// The `Pixel` module is the most fundamental unit of the freshness engine. It is a
// "dumb" data container for a single RGB pixel plus the single-pixel color
// transforms every later stage is built on. Nothing here reads a neighbor; spatial
// operators (Laplacian, edges) live in the feature extractor.
//
// Three representations are derived from one `Pixel`:
// - Gray:  Rec. 601 luma, rounded to a byte.
// - HSV:   8-bit convention used by the spoilage predicates. Hue is the color
//          wheel angle halved into 0..=179, saturation and value span 0..=255.
// - Lab:   CIE L*a*b* (D65) packed into bytes. L* is scaled from 0..100 to
//          0..255, a* and b* are offset by +128.
//
// Lab needs linear light, so the sRGB transfer curve is undone through a
// 256-entry `OnceLock` LUT; the hot path is a table lookup and a multiply.

pub mod pixel {
    use std::sync::OnceLock;

    pub type Byte = u8;
    pub type Channel = Byte;
    pub type NormalizedChannel = f32;
    pub type Hue = f32;
    pub type Luminance = f64;

    const CHANNELS: usize = 3;

    // D65 reference white in XYZ.
    const WHITE_X: f32 = 0.950_456;
    const WHITE_Z: f32 = 1.088_754;
    const LAB_EPSILON: f32 = 0.008_856;

    static SRGB_TO_LINEAR_LUT: OnceLock<[NormalizedChannel; 256]> = OnceLock::new();

    /// A single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    /// A pixel in the 8-bit HSV convention (hue 0..=179).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HsvPixel {
        pub hue: Channel,
        pub saturation: Channel,
        pub value: Channel,
    }

    /// A pixel in the 8-bit Lab convention (L*·255/100, a*+128, b*+128).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LabPixel {
        pub lightness: Channel,
        pub a: Channel,
        pub b: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        #[inline]
        fn srgb_to_linear_normalized_from_byte(srgb_value: Byte) -> NormalizedChannel {
            let table = SRGB_TO_LINEAR_LUT.get_or_init(|| {
                let mut table = [0.0f32; 256];
                let mut i = 0usize;
                while i < 256 {
                    let srgb_normalized = i as NormalizedChannel / 255.0f32;
                    table[i] = if srgb_normalized <= 0.04045f32 {
                        srgb_normalized / 12.92f32
                    } else {
                        ((srgb_normalized + 0.055f32) / 1.055f32).powf(2.4f32)
                    };
                    i += 1;
                }
                table
            });
            table[srgb_value as usize]
        }

        #[inline]
        fn normalized(&self) -> (NormalizedChannel, NormalizedChannel, NormalizedChannel) {
            (
                self.red as NormalizedChannel / 255.0,
                self.green as NormalizedChannel / 255.0,
                self.blue as NormalizedChannel / 255.0,
            )
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }

        /// Grayscale byte used for the sharpness and edge operators.
        pub fn gray(&self) -> Channel {
            self.luminance().round().clamp(0.0, 255.0) as Channel
        }

        /// Hue angle in degrees [0, 360), computed on normalized sRGB.
        /// Achromatic pixels report 0.
        pub fn hue(&self) -> Hue {
            let (red, green, blue) = self.normalized();
            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            if chroma <= 1e-6 {
                return 0.0;
            }

            let inverse_chroma = 1.0 / chroma;

            let (base_difference, sector_offset) = if maximum_channel == red {
                (green - blue, 0.0)
            } else if maximum_channel == green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference * inverse_chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        pub fn to_hsv(&self) -> HsvPixel {
            let maximum_channel = self.red.max(self.green.max(self.blue));
            let minimum_channel = self.red.min(self.green.min(self.blue));

            let saturation = if maximum_channel == 0 {
                0
            } else {
                let chroma = (maximum_channel - minimum_channel) as f32;
                (chroma * 255.0 / maximum_channel as f32).round() as Channel
            };

            // Halving folds 0..360 into a byte; 359.5°+ rounds back onto 0.
            let hue = ((self.hue() * 0.5).round() as u16 % 180) as Channel;

            HsvPixel {
                hue,
                saturation,
                value: maximum_channel,
            }
        }

        pub fn to_lab(&self) -> LabPixel {
            let red = Self::srgb_to_linear_normalized_from_byte(self.red);
            let green = Self::srgb_to_linear_normalized_from_byte(self.green);
            let blue = Self::srgb_to_linear_normalized_from_byte(self.blue);

            let x = (0.412_453 * red + 0.357_580 * green + 0.180_423 * blue) / WHITE_X;
            let y = 0.212_671 * red + 0.715_160 * green + 0.072_169 * blue;
            let z = (0.019_334 * red + 0.119_193 * green + 0.950_227 * blue) / WHITE_Z;

            let f = |t: f32| {
                if t > LAB_EPSILON {
                    t.cbrt()
                } else {
                    7.787 * t + 16.0 / 116.0
                }
            };
            let (fx, fy, fz) = (f(x), f(y), f(z));

            let lightness = if y > LAB_EPSILON {
                116.0 * y.cbrt() - 16.0
            } else {
                903.3 * y
            };
            let a = 500.0 * (fx - fy);
            let b = 200.0 * (fy - fz);

            let to_byte = |v: f32| v.round().clamp(0.0, 255.0) as Channel;
            LabPixel {
                lightness: to_byte(lightness * 255.0 / 100.0),
                a: to_byte(a + 128.0),
                b: to_byte(b + 128.0),
            }
        }
    }

    impl From<[Byte; CHANNELS]> for Pixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl From<&image::Rgb<Byte>> for Pixel {
        fn from(rgb: &image::Rgb<Byte>) -> Self {
            Pixel::from(rgb.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    fn close(actual: u8, expected: u8) -> bool {
        (actual as i16 - expected as i16).abs() <= 1
    }

    #[test]
    fn primaries_land_on_half_degree_hues() {
        assert_eq!(Pixel::new(255, 0, 0).to_hsv(), HsvPixel { hue: 0, saturation: 255, value: 255 });
        assert_eq!(Pixel::new(0, 255, 0).to_hsv().hue, 60);
        assert_eq!(Pixel::new(0, 0, 255).to_hsv().hue, 120);
        assert_eq!(Pixel::new(255, 128, 0).to_hsv().hue, 15);
    }

    #[test]
    fn grays_have_no_saturation() {
        for level in [0u8, 40, 128, 255] {
            let hsv = Pixel::new(level, level, level).to_hsv();
            assert_eq!(hsv.saturation, 0);
            assert_eq!(hsv.hue, 0);
            assert_eq!(hsv.value, level);
        }
    }

    #[test]
    fn luma_uses_rec601_weights() {
        assert_eq!(Pixel::new(128, 128, 128).gray(), 128);
        assert_eq!(Pixel::new(255, 0, 0).gray(), 76);
        assert_eq!(Pixel::new(0, 255, 0).gray(), 150);
    }

    #[test]
    fn lab_extremes_match_reference_white_and_black() {
        let white = Pixel::new(255, 255, 255).to_lab();
        assert!(close(white.lightness, 255));
        assert!(close(white.a, 128));
        assert!(close(white.b, 128));

        let black = Pixel::new(0, 0, 0).to_lab();
        assert_eq!(black, LabPixel { lightness: 0, a: 128, b: 128 });
    }

    #[test]
    fn lab_orders_mid_gray_and_red() {
        // L* of sRGB 128 gray is ~53.6, i.e. ~137 on the byte scale.
        let gray = Pixel::new(128, 128, 128).to_lab();
        assert!((135..=139).contains(&gray.lightness));

        let red = Pixel::new(255, 0, 0).to_lab();
        assert!(red.a > 200, "red should sit far on the +a* side, got {}", red.a);
    }
}
