//! In-memory plotting surface handed to the agent for each question.
//!
//! Drawing goes through plotters' `BitMapBackend` over an RGB buffer owned by
//! the canvas. `to_png` always encodes the full surface, whether or not
//! anything was drawn.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::types::{AppError, AppResult};

pub type CanvasArea<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    figures: usize,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![255; (width as usize) * (height as usize) * 3],
            figures: 0,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Clears the surface back to blank white.
    pub fn new_figure(&mut self) {
        self.pixels.fill(255);
        self.figures = 0;
    }

    /// Number of successful `draw` calls since the last `new_figure`.
    pub fn figures_drawn(&self) -> usize {
        self.figures
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| *p == 255)
    }

    /// Runs `paint` on the surface. A failed paint leaves the pixels as they
    /// were before the call.
    pub fn draw<F>(&mut self, paint: F) -> AppResult<()>
    where
        F: FnOnce(&CanvasArea<'_>) -> anyhow::Result<()>,
    {
        let size = (self.width, self.height);
        let before = self.pixels.clone();
        let result = {
            let root = BitMapBackend::with_buffer(&mut self.pixels, size).into_drawing_area();
            paint(&root)
                .map_err(|e| AppError::Canvas(e.to_string()))
                .and_then(|()| root.present().map_err(|e| AppError::Canvas(e.to_string())))
        };
        match result {
            Ok(()) => {
                self.figures += 1;
                Ok(())
            }
            Err(e) => {
                self.pixels = before;
                Err(e)
            }
        }
    }

    /// Encodes the surface as PNG in memory, at maximum compression so a blank
    /// surface stays small.
    pub fn to_png(&self) -> AppResult<Vec<u8>> {
        let mut png = Vec::new();
        PngEncoder::new_with_quality(&mut png, CompressionType::Best, FilterType::Adaptive)
            .write_image(&self.pixels, self.width, self.height, ColorType::Rgb8)
            .map_err(|e| AppError::Canvas(e.to_string()))?;
        Ok(png)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    /// Fills the area with pseudo-random pixels so the PNG cannot compress.
    pub(crate) fn paint_noise(canvas: &mut Canvas) {
        let (w, h) = canvas.dimensions();
        canvas
            .draw(|area| {
                let mut seed: u32 = 0x2545_f491;
                for x in 0..w as i32 {
                    for y in 0..h as i32 {
                        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                        let [r, g, b, _] = seed.to_le_bytes();
                        area.draw_pixel((x, y), &RGBColor(r, g, b))?;
                    }
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_blank_canvas_encodes_small_png() {
        let canvas = Canvas::new(64, 48);
        assert!(canvas.is_blank());
        let png = canvas.to_png().unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert!(png.len() <= 1000, "blank png was {} bytes", png.len());
    }

    #[test]
    fn test_drawn_canvas_encodes_large_png() {
        let mut canvas = Canvas::new(64, 48);
        paint_noise(&mut canvas);
        assert!(!canvas.is_blank());
        assert_eq!(canvas.figures_drawn(), 1);
        let png = canvas.to_png().unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert!(png.len() > 1000, "noisy png was only {} bytes", png.len());
    }

    #[test]
    fn test_new_figure_resets() {
        let mut canvas = Canvas::new(16, 16);
        canvas
            .draw(|area| {
                area.fill(&BLACK)?;
                Ok(())
            })
            .unwrap();
        assert!(!canvas.is_blank());
        canvas.new_figure();
        assert!(canvas.is_blank());
        assert_eq!(canvas.figures_drawn(), 0);
    }

    #[test]
    fn test_paint_errors_surface_as_canvas_errors() {
        let mut canvas = Canvas::new(8, 8);
        let err = canvas
            .draw(|_| anyhow::bail!("no font available"))
            .unwrap_err();
        assert!(matches!(err, AppError::Canvas(msg) if msg.contains("no font")));
    }

    #[test]
    fn test_failed_paint_restores_pixels() {
        let mut canvas = Canvas::new(16, 16);
        let err = canvas.draw(|area| {
            area.fill(&BLACK)?;
            anyhow::bail!("axis range is empty")
        });
        assert!(err.is_err());
        assert!(canvas.is_blank());
        assert_eq!(canvas.figures_drawn(), 0);
        assert!(canvas.to_png().unwrap().len() <= 1000);
    }

    #[test]
    fn test_default_size_blank_canvas_stays_under_threshold() {
        let plot = crate::config::PlotConfig::default();
        let canvas = Canvas::new(plot.canvas_width, plot.canvas_height);
        let png = canvas.to_png().unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert!(
            png.len() <= plot.byte_threshold,
            "blank {}x{} png was {} bytes",
            plot.canvas_width,
            plot.canvas_height,
            png.len()
        );
    }
}
