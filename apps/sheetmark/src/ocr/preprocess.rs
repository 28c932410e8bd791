//! Image preprocessing for OCR
//!
//! Every crop is converted to grayscale and contrast-stretched to the full
//! 0-255 range. Identifier and date crops are then binarized with a local
//! mean threshold, which copes with uneven scan lighting around short codes.
//! Free-text crops are sharpened instead, since binarizing small running
//! text tends to break glyph strokes.

use std::io::Cursor;

use image::{imageops, DynamicImage, GrayImage, ImageFormat, Luma};

use super::types::OcrError;
use crate::config::OcrTuning;
use crate::fields::FieldProfile;

/// Prepare a cropped region for recognition
pub fn preprocess(crop: &DynamicImage, profile: FieldProfile, tuning: &OcrTuning) -> GrayImage {
    let mut gray = crop.to_luma8();
    stretch_contrast(&mut gray);

    match profile {
        FieldProfile::Identifier | FieldProfile::Date => {
            adaptive_threshold(&gray, tuning.threshold_window, tuning.threshold_offset)
        }
        FieldProfile::FreeText => {
            imageops::unsharpen(&gray, tuning.unsharp_sigma, tuning.unsharp_threshold)
        }
    }
}

/// Linearly map the darkest pixel to 0 and the brightest to 255
pub fn stretch_contrast(image: &mut GrayImage) {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return;
    }

    let range = (max - min) as u32;
    for pixel in image.pixels_mut() {
        let v = (pixel[0] - min) as u32;
        pixel[0] = ((v * 255 + range / 2) / range) as u8;
    }
}

/// Binarize against the mean of a `window` x `window` neighbourhood.
///
/// A pixel becomes black when it is darker than the local mean by more than
/// `offset` grey levels.
pub fn adaptive_threshold(image: &GrayImage, window: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    // Summed-area table with a zero row and column in front
    let stride = (width + 1) as usize;
    let mut integral = vec![0u64; stride * (height + 1) as usize];
    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += image.get_pixel(x, y)[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            integral[idx] = integral[idx - stride] + row_sum;
        }
    }

    let radius = (window.max(1) / 2) as i64;
    GrayImage::from_fn(width, height, |x, y| {
        let x0 = (x as i64 - radius).max(0) as usize;
        let y0 = (y as i64 - radius).max(0) as usize;
        let x1 = (x as i64 + radius + 1).min(width as i64) as usize;
        let y1 = (y as i64 + radius + 1).min(height as i64) as usize;

        let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0];
        let count = ((x1 - x0) * (y1 - y0)) as u64;
        let mean = (sum / count) as i32;

        let value = image.get_pixel(x, y)[0] as i32;
        if value < mean - offset {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Encode a preprocessed crop as PNG for the engine
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, OcrError> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_contrast_spans_full_range() {
        let mut image = GrayImage::from_fn(4, 1, |x, _| Luma([100 + x as u8 * 10]));
        stretch_contrast(&mut image);
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image.get_pixel(3, 0)[0], 255);
        assert!(image.get_pixel(1, 0)[0] < image.get_pixel(2, 0)[0]);
    }

    #[test]
    fn test_stretch_contrast_flat_image_unchanged() {
        let mut image = GrayImage::from_pixel(3, 3, Luma([128]));
        stretch_contrast(&mut image);
        assert!(image.pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn test_adaptive_threshold_separates_ink_from_paper() {
        // Dark vertical stroke on a light background
        let image = GrayImage::from_fn(21, 21, |x, _| {
            if (9..=11).contains(&x) {
                Luma([30])
            } else {
                Luma([220])
            }
        });
        let binary = adaptive_threshold(&image, 15, 10);
        assert_eq!(binary.get_pixel(10, 10)[0], 0);
        assert_eq!(binary.get_pixel(2, 10)[0], 255);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_preprocess_by_profile() {
        let tuning = OcrTuning::default();
        let crop = DynamicImage::ImageLuma8(GrayImage::from_fn(40, 20, |x, _| {
            Luma([if x % 8 < 2 { 40 } else { 200 }])
        }));

        let binary = preprocess(&crop, FieldProfile::Date, &tuning);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));

        let sharpened = preprocess(&crop, FieldProfile::FreeText, &tuning);
        assert_eq!(sharpened.dimensions(), (40, 20));
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&GrayImage::from_pixel(2, 2, Luma([255]))).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
