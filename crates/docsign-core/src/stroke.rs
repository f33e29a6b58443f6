//! Freehand signature capture
//!
//! Pointer events are recorded as strokes (one per press-drag-release) and
//! only rasterized when the signature is saved or submitted.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::config::CanvasConfig;
use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub type Stroke = Vec<Point>;

/// Rendered signature, PNG encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
    blank: bool,
}

impl SignatureImage {
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when no pixel was drawn
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.png))
    }
}

/// Records pointer strokes on the signature canvas
#[derive(Debug, Clone)]
pub struct StrokeCapture {
    canvas: CanvasConfig,
    strokes: Vec<Stroke>,
    active: bool,
}

impl StrokeCapture {
    pub fn new(canvas: CanvasConfig) -> Self {
        Self {
            canvas,
            strokes: Vec::new(),
            active: false,
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn is_drawing(&self) -> bool {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Pointer down. Ignored while a stroke is already active.
    pub fn begin_stroke(&mut self, point: Point) -> bool {
        if self.active {
            return false;
        }
        self.strokes.push(vec![point]);
        self.active = true;
        true
    }

    /// Pointer move. Ignored unless a stroke is active.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        if !self.active {
            return false;
        }
        match self.strokes.last_mut() {
            Some(stroke) => {
                stroke.push(point);
                true
            }
            None => false,
        }
    }

    /// Pointer up or leave
    pub fn end_stroke(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = false;
    }

    /// Rasterize the recorded strokes. Does not modify the stroke history.
    pub fn render(&self) -> Result<SignatureImage, RenderError> {
        let CanvasConfig {
            width,
            height,
            stroke_width,
        } = self.canvas;
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyCanvas { width, height });
        }

        let mut raster = Raster::new(width, height);
        let radius = (stroke_width / 2.0).max(0.5);
        for stroke in &self.strokes {
            match stroke.as_slice() {
                [] => {}
                [dot] => raster.segment(*dot, *dot, radius),
                points => {
                    for pair in points.windows(2) {
                        raster.segment(pair[0], pair[1], radius);
                    }
                }
            }
        }

        let blank = raster.is_blank();
        let png = raster.encode()?;
        Ok(SignatureImage {
            png,
            width,
            height,
            blank,
        })
    }
}

/// Grayscale + alpha canvas, black ink on a transparent background
struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 2],
        }
    }

    /// Paint a round-capped line segment
    fn segment(&mut self, a: Point, b: Point, radius: f64) {
        let min_x = (a.x.min(b.x) - radius).floor().max(0.0);
        let max_x = (a.x.max(b.x) + radius).ceil().min(self.width as f64 - 1.0);
        let min_y = (a.y.min(b.y) - radius).floor().max(0.0);
        let max_y = (a.y.max(b.y) + radius).ceil().min(self.height as f64 - 1.0);
        if min_x > max_x || min_y > max_y {
            return;
        }

        for y in min_y as u32..=max_y as u32 {
            for x in min_x as u32..=max_x as u32 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if distance_to_segment(center, a, b) <= radius {
                    let offset = (y as usize * self.width as usize + x as usize) * 2;
                    self.pixels[offset] = 0;
                    self.pixels[offset + 1] = 255;
                }
            }
        }
    }

    fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(2).all(|px| px[1] == 0)
    }

    fn encode(&self) -> Result<Vec<u8>, RenderError> {
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
        encoder.set_color(png::ColorType::GrayscaleAlpha);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        writer.finish()?;
        Ok(out)
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn capture() -> StrokeCapture {
        StrokeCapture::new(CanvasConfig {
            width: 40,
            height: 20,
            stroke_width: 2.0,
        })
    }

    fn decode_alpha(image: &SignatureImage) -> Vec<u8> {
        let decoder = png::Decoder::new(image.png_bytes());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf[..info.buffer_size()]
            .chunks_exact(2)
            .map(|px| px[1])
            .collect()
    }

    #[test]
    fn test_stroke_lifecycle() {
        let mut pad = capture();
        assert!(pad.begin_stroke(Point::new(1.0, 1.0)));
        assert!(pad.extend_stroke(Point::new(5.0, 5.0)));
        assert!(pad.end_stroke());
        assert!(!pad.is_drawing());
        assert_eq!(
            pad.strokes(),
            &[vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)]]
        );
    }

    #[test]
    fn test_stray_events_are_ignored() {
        let mut pad = capture();
        assert!(!pad.extend_stroke(Point::new(3.0, 3.0)));
        assert!(!pad.end_stroke());
        assert!(pad.is_empty());

        pad.begin_stroke(Point::new(1.0, 1.0));
        assert!(!pad.begin_stroke(Point::new(9.0, 9.0)));
        assert_eq!(pad.strokes().len(), 1);
    }

    #[test]
    fn test_render_draws_ink() {
        let mut pad = capture();
        pad.begin_stroke(Point::new(2.0, 10.0));
        pad.extend_stroke(Point::new(38.0, 10.0));
        pad.end_stroke();

        let image = pad.render().unwrap();
        assert!(image.png_bytes().starts_with(&PNG_MAGIC));
        assert!(!image.is_blank());
        assert_eq!((image.width(), image.height()), (40, 20));

        let alpha = decode_alpha(&image);
        assert_eq!(alpha[10 * 40 + 20], 255);
        assert_eq!(alpha[0], 0);
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut pad = capture();
        pad.begin_stroke(Point::new(5.0, 5.0));
        pad.end_stroke();
        let first = pad.render().unwrap();
        let second = pad.render().unwrap();
        assert_eq!(first, second);
        assert_eq!(pad.strokes().len(), 1);
    }

    #[test]
    fn test_clear_then_render_is_blank() {
        let mut pad = capture();
        pad.begin_stroke(Point::new(2.0, 2.0));
        pad.extend_stroke(Point::new(30.0, 15.0));
        pad.clear();
        assert!(!pad.is_drawing());

        let image = pad.render().unwrap();
        assert!(image.is_blank());
        assert!(decode_alpha(&image).iter().all(|a| *a == 0));
    }

    #[test]
    fn test_points_outside_canvas_are_clipped() {
        let mut pad = capture();
        pad.begin_stroke(Point::new(-50.0, -50.0));
        pad.extend_stroke(Point::new(-10.0, -10.0));
        pad.end_stroke();
        assert!(pad.render().unwrap().is_blank());
    }

    #[test]
    fn test_zero_sized_canvas() {
        let pad = StrokeCapture::new(CanvasConfig {
            width: 0,
            height: 10,
            stroke_width: 2.0,
        });
        assert_eq!(
            pad.render().unwrap_err(),
            RenderError::EmptyCanvas {
                width: 0,
                height: 10
            }
        );
    }

    #[test]
    fn test_data_url_prefix() {
        let image = capture().render().unwrap();
        assert!(image.to_data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
