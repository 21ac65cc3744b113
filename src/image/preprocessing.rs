use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// YOLO padding grey
const PAD_VALUE: f32 = 114.0 / 255.0;

/// How an image was fitted into the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    /// Map a point from model input space back to original image pixels.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = ((x - self.pad_x) / self.scale).clamp(0.0, self.orig_width as f32);
        let oy = ((y - self.pad_y) / self.scale).clamp(0.0, self.orig_height as f32);
        (ox, oy)
    }
}

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Aspect-preserving resize onto a `size`×`size` canvas, as NCHW in [0, 1].
    pub fn letterbox(image: &DynamicImage, size: u32) -> (Array4<f32>, Letterbox) {
        let (orig_width, orig_height) = image.dimensions();
        let scale = (size as f32 / orig_width as f32).min(size as f32 / orig_height as f32);

        let new_width = ((orig_width as f32 * scale).round() as u32).clamp(1, size);
        let new_height = ((orig_height as f32 * scale).round() as u32).clamp(1, size);
        let pad_x = (size - new_width) / 2;
        let pad_y = (size - new_height) / 2;

        let resized = image
            .resize_exact(new_width, new_height, FilterType::Triangle)
            .to_rgb8();

        let side = size as usize;
        let mut input = Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (cx, cy) = ((x + pad_x) as usize, (y + pad_y) as usize);
            for c in 0..3 {
                input[[0, c, cy, cx]] = pixel[c] as f32 / 255.0;
            }
        }

        let letterbox = Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            orig_width,
            orig_height,
        };
        (input, letterbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn wide_image_is_padded_vertically() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([255, 0, 0])));
        let (input, letterbox) = ImagePreprocessor::letterbox(&image, 64);

        assert_eq!(input.shape(), &[1, 3, 64, 64]);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 16.0);
        assert!((input[[0, 0, 0, 10]] - PAD_VALUE).abs() < 1e-6);
        assert!((input[[0, 0, 32, 32]] - 1.0).abs() < 1e-6);
        assert!(input[[0, 1, 32, 32]].abs() < 1e-6);
    }

    #[test]
    fn maps_points_back_to_original() {
        let image = DynamicImage::new_rgb8(200, 100);
        let (_, letterbox) = ImagePreprocessor::letterbox(&image, 64);

        let (x, y) = letterbox.to_original(32.0, 32.0);
        assert!((x - 100.0).abs() < 1e-3);
        assert!((y - 50.0).abs() < 1e-3);

        let (x, y) = letterbox.to_original(0.0, 0.0);
        assert_eq!((x, y), (0.0, 0.0));
    }
}
