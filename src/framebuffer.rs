//! 1-bit frame buffer for the e-paper panel.
//!
//! Row-major, MSB first, set bit = ink. The buffer is sized for the panel
//! and can be used at a smaller logical size (tests, alternative panels).

use crate::config::{PANEL_HEIGHT, PANEL_WIDTH};
use core::convert::Infallible;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

const STRIDE_MAX: usize = (PANEL_WIDTH as usize + 7) / 8;

/// Bytes needed for a full panel frame.
pub const FRAME_BUFFER_LEN: usize = STRIDE_MAX * PANEL_HEIGHT as usize;

pub struct FrameBuffer {
    size: Size,
    stride: usize,
    bits: [u8; FRAME_BUFFER_LEN],
}

impl FrameBuffer {
    /// Frame of the full panel size.
    pub const fn new() -> Self {
        Self::with_size(Size::new(PANEL_WIDTH, PANEL_HEIGHT))
    }

    /// Frame of `size`, clamped to the panel dimensions.
    pub const fn with_size(size: Size) -> Self {
        let width = if size.width < PANEL_WIDTH {
            size.width
        } else {
            PANEL_WIDTH
        };
        let height = if size.height < PANEL_HEIGHT {
            size.height
        } else {
            PANEL_HEIGHT
        };
        Self {
            size: Size::new(width, height),
            stride: (width as usize + 7) / 8,
            bits: [0; FRAME_BUFFER_LEN],
        }
    }

    /// Packed rows of the logical frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits[..self.stride * self.size.height as usize]
    }

    pub fn is_dark(&self, point: Point) -> bool {
        match self.index(point) {
            Some((byte, mask)) => self.bits[byte] & mask != 0,
            None => false,
        }
    }

    /// Every inked pixel, row by row.
    pub fn dark_pixels(&self) -> impl Iterator<Item = Point> + '_ {
        let (w, h) = (self.size.width as i32, self.size.height as i32);
        (0..h)
            .flat_map(move |y| (0..w).map(move |x| Point::new(x, y)))
            .filter(move |p| self.is_dark(*p))
    }

    /// Inked pixels inside `area`.
    pub fn dark_count_in(&self, area: &Rectangle) -> usize {
        area.points().filter(|p| self.is_dark(*p)).count()
    }

    fn index(&self, point: Point) -> Option<(usize, u8)> {
        if point.x < 0
            || point.y < 0
            || point.x >= self.size.width as i32
            || point.y >= self.size.height as i32
        {
            return None;
        }
        let (x, y) = (point.x as usize, point.y as usize);
        Some((y * self.stride + x / 8, 0x80 >> (x % 8)))
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some((byte, mask)) = self.index(point) {
                if color.is_on() {
                    self.bits[byte] |= mask;
                } else {
                    self.bits[byte] &= !mask;
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = if color.is_on() { 0xFF } else { 0x00 };
        self.bits.fill(fill);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn pixels_outside_frame_are_ignored() {
        let mut frame = FrameBuffer::with_size(Size::new(16, 8));
        let _ = frame.draw_iter([
            Pixel(Point::new(-1, 0), BinaryColor::On),
            Pixel(Point::new(16, 0), BinaryColor::On),
            Pixel(Point::new(0, 8), BinaryColor::On),
        ]);
        assert_eq!(frame.dark_pixels().count(), 0);
    }

    #[test]
    fn set_and_clear_single_pixel() {
        let mut frame = FrameBuffer::with_size(Size::new(16, 8));
        let p = Point::new(9, 3);
        let _ = frame.draw_iter([Pixel(p, BinaryColor::On)]);
        assert!(frame.is_dark(p));
        assert_eq!(frame.as_bytes()[3 * 2 + 1], 0x40);

        let _ = frame.draw_iter([Pixel(p, BinaryColor::Off)]);
        assert!(!frame.is_dark(p));
    }

    #[test]
    fn oversize_request_is_clamped_to_panel() {
        let frame = FrameBuffer::with_size(Size::new(1000, 1000));
        assert_eq!(frame.size(), Size::new(PANEL_WIDTH, PANEL_HEIGHT));
        assert_eq!(frame.as_bytes().len(), FRAME_BUFFER_LEN);
    }

    #[test]
    fn filled_rectangle_counts() {
        let mut frame = FrameBuffer::new();
        let rect = Rectangle::new(Point::new(10, 10), Size::new(4, 3));
        let _ = rect
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut frame);
        assert_eq!(frame.dark_count_in(&rect), 12);
        assert_eq!(frame.dark_pixels().count(), 12);

        let _ = frame.clear(BinaryColor::Off);
        assert_eq!(frame.dark_pixels().count(), 0);
    }
}
