//! Badge renderer: draws into the frame buffer and hands it to the panel.
//!
//! ## Layout
//!
//! - **Info**: up to `MAX_INFO_LINES` lines in `FONT_10X20`, each line
//!   centered horizontally, the block centered vertically. Lines that do not
//!   fit the panel height are dropped.
//! - **QR**: the fixed-version symbol at `QR_SCALE` px per module with a
//!   `QR_QUIET_ZONE` margin, centered. Encoding failures and symbols that
//!   do not fit are replaced by a centered error string.
//! - **Blank**: nothing.
//! - **Status**: partial update of a fixed, centered sub-rectangle.
//!
//! The renderer never puts the panel to sleep on its own; callers follow
//! every paint with [`Renderer::hibernate`].

use crate::config::{LINE_SPACING, QR_QUIET_ZONE, QR_SCALE, STATUS_HEIGHT, STATUS_WIDTH};
use crate::content::{InfoText, Screen};
use crate::error::{PanelError, QrError};
use crate::framebuffer::FrameBuffer;
use crate::qr::{self, QrBuffers};
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

/// Shown instead of a symbol that cannot be encoded or does not fit.
pub const QR_ERROR_TEXT: &str = "QR Generation Failed";

/// Shown when the info text has no printable lines.
pub const NO_INFO_TEXT: &str = "No Info";

/// Shown if a QR screen is requested with no payload stored.
pub const NO_QR_TEXT: &str = "No QR Data Available";

const INFO_FONT: MonoFont<'static> = FONT_10X20;
const MESSAGE_FONT: MonoFont<'static> = FONT_6X10;

/// Buffer-based e-paper driver.
pub trait Panel {
    /// Push the whole frame with a full refresh waveform.
    fn full_update(&mut self, frame: &FrameBuffer) -> Result<(), PanelError>;

    /// Refresh only `area` of the frame.
    fn partial_update(&mut self, frame: &FrameBuffer, area: &Rectangle) -> Result<(), PanelError>;

    /// Enter the low-power hold state; the image stays on the glass.
    fn hibernate(&mut self) -> Result<(), PanelError>;
}

/// What a full repaint ended up drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderOutcome {
    Blank,
    Info { lines: usize },
    /// Symbol drawn; `x`/`y` is the top-left of the first module.
    Qr { side: u32, x: i32, y: i32 },
    QrFailed(QrError),
    QrDoesNotFit { needed: u32 },
    Message,
}

pub struct Renderer<P> {
    panel: P,
    frame: FrameBuffer,
    qr: QrBuffers,
    status_area: Rectangle,
}

impl<P: Panel> Renderer<P> {
    /// Renderer for a full-size panel.
    pub fn new(panel: P) -> Self {
        Self::with_frame(panel, FrameBuffer::new())
    }

    pub fn with_frame(panel: P, frame: FrameBuffer) -> Self {
        let bounds = frame.bounding_box();
        let status_size = Size::new(STATUS_WIDTH, STATUS_HEIGHT).component_min(bounds.size);
        Self {
            panel,
            frame,
            qr: QrBuffers::new(),
            status_area: centered(&bounds, status_size),
        }
    }

    /// Clear the whole frame, draw `screen` and push it with a full refresh.
    pub fn render_full(&mut self, screen: Screen<'_>) -> RenderOutcome {
        let _ = self.frame.clear(BinaryColor::Off);
        let outcome = match screen {
            Screen::Info(info) => draw_info(&mut self.frame, info),
            Screen::Qr(text) => draw_qr(&mut self.frame, &mut self.qr, text.as_str()),
            Screen::Blank => RenderOutcome::Blank,
        };
        self.push_full();
        debug!("Full update done: {:?}", outcome);
        outcome
    }

    /// Full repaint with a single centered message.
    pub fn render_message(&mut self, text: &str) -> RenderOutcome {
        let _ = self.frame.clear(BinaryColor::Off);
        draw_message(&mut self.frame, text);
        self.push_full();
        RenderOutcome::Message
    }

    /// Partial update of the status rectangle; the rest of the panel is untouched.
    pub fn render_status(&mut self, text: &str) -> Result<(), PanelError> {
        let area = self.status_area;
        let _ = area
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(&mut self.frame);
        {
            let mut clipped = self.frame.clipped(&area);
            let baseline = centered_baseline(&MESSAGE_FONT, &area);
            draw_line(&mut clipped, text, &MESSAGE_FONT, &area, baseline);
        }
        self.panel.partial_update(&self.frame, &area)
    }

    /// Put the panel into low-power hold.
    pub fn hibernate(&mut self) {
        if let Err(e) = self.panel.hibernate() {
            warn!("Panel hibernate failed: {:?}", e);
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn status_area(&self) -> Rectangle {
        self.status_area
    }

    fn push_full(&mut self) {
        if let Err(e) = self.panel.full_update(&self.frame) {
            error!("Panel full update failed: {:?}", e);
        }
    }
}

fn draw_info(frame: &mut FrameBuffer, info: &InfoText) -> RenderOutcome {
    let area = frame.bounding_box();
    let glyph_h = INFO_FONT.character_size.height as i32;
    let spacing = LINE_SPACING as i32;
    let line_h = glyph_h + spacing;

    let fits = ((area.size.height as i32 + spacing) / line_h).max(1) as usize;
    let lines = info.display_lines().count().min(fits);
    if lines == 0 {
        draw_message(frame, NO_INFO_TEXT);
        return RenderOutcome::Info { lines: 0 };
    }

    let block_h = lines as i32 * glyph_h + (lines as i32 - 1) * spacing;
    let top = area.top_left.y + (area.size.height as i32 - block_h) / 2;
    let first_baseline = top + INFO_FONT.baseline as i32;

    for (i, line) in info.display_lines().take(lines).enumerate() {
        draw_line(frame, line, &INFO_FONT, &area, first_baseline + i as i32 * line_h);
    }
    RenderOutcome::Info { lines }
}

fn draw_qr(frame: &mut FrameBuffer, buffers: &mut QrBuffers, text: &str) -> RenderOutcome {
    let grid = match qr::encode(text, buffers) {
        Ok(grid) => grid,
        Err(e) => {
            warn!("QR encoding failed: {:?}", e);
            draw_message(frame, QR_ERROR_TEXT);
            return RenderOutcome::QrFailed(e);
        }
    };

    let area = frame.bounding_box();
    let side = grid.side();
    let needed = (side + 2 * QR_QUIET_ZONE) * QR_SCALE;
    if needed > area.size.width || needed > area.size.height {
        warn!(
            "QR symbol needs {} px, area is {}x{}",
            needed,
            area.size.width,
            area.size.height
        );
        draw_message(frame, QR_ERROR_TEXT);
        return RenderOutcome::QrDoesNotFit { needed };
    }

    let quiet = (QR_QUIET_ZONE * QR_SCALE) as i32;
    let origin = area.top_left
        + Point::new(
            (area.size.width - needed) as i32 / 2 + quiet,
            (area.size.height - needed) as i32 / 2 + quiet,
        );
    let module = Size::new(QR_SCALE, QR_SCALE);
    let ink = PrimitiveStyle::with_fill(BinaryColor::On);

    for y in 0..side {
        for x in 0..side {
            if grid.is_dark(x, y) {
                let at = origin + Point::new((x * QR_SCALE) as i32, (y * QR_SCALE) as i32);
                let _ = Rectangle::new(at, module).into_styled(ink).draw(frame);
            }
        }
    }

    RenderOutcome::Qr {
        side,
        x: origin.x,
        y: origin.y,
    }
}

fn draw_message(frame: &mut FrameBuffer, text: &str) {
    let area = frame.bounding_box();
    let baseline = centered_baseline(&MESSAGE_FONT, &area);
    draw_line(frame, text, &MESSAGE_FONT, &area, baseline);
}

fn draw_line<D>(target: &mut D, text: &str, font: &MonoFont<'_>, area: &Rectangle, baseline: i32)
where
    D: DrawTarget<Color = BinaryColor>,
{
    let x = area.top_left.x + (area.size.width as i32 - text_width(font, text) as i32) / 2;
    let y = clamp_baseline(font, area, baseline);
    let style = MonoTextStyle::new(font, BinaryColor::On);
    let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Alphabetic).draw(target);
}

/// Pixel width of `text` in a monospaced font.
pub fn text_width(font: &MonoFont<'_>, text: &str) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        return 0;
    }
    n * font.character_size.width + (n - 1) * font.character_spacing
}

/// Clamp `baseline` so the glyph's ascent stays below the top of `area`
/// and its descent above the bottom. The top edge wins if both cannot hold.
pub fn clamp_baseline(font: &MonoFont<'_>, area: &Rectangle, baseline: i32) -> i32 {
    let ascent = font.baseline as i32;
    let descent = font.character_size.height as i32 - ascent - 1;
    let highest = area.top_left.y + ascent;
    let lowest = area.top_left.y + area.size.height as i32 - 1 - descent;
    baseline.min(lowest).max(highest)
}

fn centered_baseline(font: &MonoFont<'_>, area: &Rectangle) -> i32 {
    let glyph_h = font.character_size.height as i32;
    area.top_left.y + (area.size.height as i32 - glyph_h) / 2 + font.baseline as i32
}

fn centered(bounds: &Rectangle, size: Size) -> Rectangle {
    let offset = Point::new(
        (bounds.size.width - size.width) as i32 / 2,
        (bounds.size.height - size.height) as i32 / 2,
    );
    Rectangle::new(bounds.top_left + offset, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PANEL_HEIGHT, PANEL_WIDTH};
    use crate::content::QrText;
    use crate::mock::RecordingPanel;
    use crate::qr::QR_SIDE;

    fn renderer() -> Renderer<RecordingPanel> {
        Renderer::new(RecordingPanel::new())
    }

    #[test]
    fn blank_clears_everything_and_pushes_full_frame() {
        let mut r = renderer();
        let info = InfoText::new("Ada");
        r.render_full(Screen::Info(&info));
        assert!(r.frame().dark_pixels().count() > 0);

        assert_eq!(r.render_full(Screen::Blank), RenderOutcome::Blank);
        assert_eq!(r.frame().dark_pixels().count(), 0);
        assert_eq!(r.panel().full_updates, 2);
        assert!(r.panel().awake);
    }

    #[test]
    fn info_lines_are_centered() {
        let mut r = renderer();
        let info = InfoText::new("AB");
        assert_eq!(r.render_full(Screen::Info(&info)), RenderOutcome::Info { lines: 1 });

        let width = text_width(&INFO_FONT, "AB") as i32;
        let left = (PANEL_WIDTH as i32 - width) / 2;
        let ink: std::vec::Vec<_> = r.frame().dark_pixels().collect();
        let min_x = ink.iter().map(|p| p.x).min().unwrap();
        let max_x = ink.iter().map(|p| p.x).max().unwrap();
        assert!(min_x >= left);
        assert!(max_x < left + width);

        let min_y = ink.iter().map(|p| p.y).min().unwrap();
        let max_y = ink.iter().map(|p| p.y).max().unwrap();
        let top_gap = min_y;
        let bottom_gap = PANEL_HEIGHT as i32 - 1 - max_y;
        assert!((top_gap - bottom_gap).abs() <= INFO_FONT.character_size.height as i32);
    }

    #[test]
    fn info_overflow_is_dropped_not_overdrawn() {
        let mut r = renderer();
        let info = InfoText::new("1\n2\n3\n4\n5\n6\n7\n8\n9\n10");
        match r.render_full(Screen::Info(&info)) {
            RenderOutcome::Info { lines } => assert!(lines < 10 && lines > 0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_info_shows_placeholder() {
        let mut r = renderer();
        let info = InfoText::new("\n\n");
        assert_eq!(r.render_full(Screen::Info(&info)), RenderOutcome::Info { lines: 0 });
        assert!(r.frame().dark_pixels().count() > 0);
    }

    #[test]
    fn qr_symbol_is_centered_with_quiet_zone() {
        let mut r = renderer();
        let qr = QrText::new("https://example.com").unwrap();
        let outcome = r.render_full(Screen::Qr(&qr));

        let needed = ((QR_SIDE + 2 * QR_QUIET_ZONE) * QR_SCALE) as i32;
        let quiet = (QR_QUIET_ZONE * QR_SCALE) as i32;
        let x = (PANEL_WIDTH as i32 - needed) / 2 + quiet;
        let y = (PANEL_HEIGHT as i32 - needed) / 2 + quiet;
        assert_eq!(outcome, RenderOutcome::Qr { side: QR_SIDE, x, y });

        // Top-left finder module is a full dark block.
        let module = Rectangle::new(Point::new(x, y), Size::new(QR_SCALE, QR_SCALE));
        assert_eq!(r.frame().dark_count_in(&module), (QR_SCALE * QR_SCALE) as usize);

        // Quiet zone stays white.
        let zone = Rectangle::new(Point::new(x - quiet, y - quiet), Size::new(quiet as u32, quiet as u32));
        assert_eq!(r.frame().dark_count_in(&zone), 0);
        let ink = r.frame().dark_pixels().count();
        let symbol_px = (QR_SIDE * QR_SCALE) as usize;
        assert!(ink > 0 && ink < symbol_px * symbol_px);
    }

    #[test]
    fn qr_that_does_not_fit_shows_error_string() {
        let mut r = Renderer::with_frame(
            RecordingPanel::new(),
            FrameBuffer::with_size(Size::new(100, 100)),
        );
        let qr = QrText::new("https://example.com").unwrap();
        let needed = (QR_SIDE + 2 * QR_QUIET_ZONE) * QR_SCALE;
        assert_eq!(
            r.render_full(Screen::Qr(&qr)),
            RenderOutcome::QrDoesNotFit { needed }
        );
        // Error text, not a symbol: ink only inside one text row.
        let ink: std::vec::Vec<_> = r.frame().dark_pixels().collect();
        assert!(!ink.is_empty());
        let rows = ink.iter().map(|p| p.y).max().unwrap() - ink.iter().map(|p| p.y).min().unwrap();
        assert!(rows < MESSAGE_FONT.character_size.height as i32);
        assert_eq!(r.panel().full_updates, 1);
    }

    #[test]
    fn status_touches_only_its_rectangle() {
        let mut r = renderer();
        let info = InfoText::new("A\nB\nC\nD");
        r.render_full(Screen::Info(&info));
        let before: std::vec::Vec<_> = r
            .frame()
            .dark_pixels()
            .filter(|p| !r.status_area().contains(*p))
            .collect();

        r.render_status("Low battery").unwrap();
        let after: std::vec::Vec<_> = r
            .frame()
            .dark_pixels()
            .filter(|p| !r.status_area().contains(*p))
            .collect();

        assert_eq!(before, after);
        assert!(r.frame().dark_count_in(&r.status_area()) > 0);
        assert_eq!(r.panel().partial_updates, 1);
        assert_eq!(r.panel().last_partial, Some(r.status_area()));
        assert_eq!(r.panel().full_updates, 1);
    }

    #[test]
    fn status_area_is_precomputed_and_centered() {
        let r = renderer();
        let area = r.status_area();
        assert_eq!(area.size, Size::new(STATUS_WIDTH, STATUS_HEIGHT));
        assert_eq!(area.top_left.x, (PANEL_WIDTH - STATUS_WIDTH) as i32 / 2);
        assert_eq!(area.top_left.y, (PANEL_HEIGHT - STATUS_HEIGHT) as i32 / 2);
    }

    #[test]
    fn baseline_is_clamped_into_area() {
        let area = Rectangle::new(Point::new(0, 0), Size::new(100, 40));
        let ascent = INFO_FONT.baseline as i32;
        let descent = INFO_FONT.character_size.height as i32 - ascent - 1;
        assert_eq!(clamp_baseline(&INFO_FONT, &area, -50), ascent);
        assert_eq!(clamp_baseline(&INFO_FONT, &area, 500), 39 - descent);
        assert_eq!(clamp_baseline(&INFO_FONT, &area, ascent + 3), ascent + 3);
    }

    #[test]
    fn panel_failure_is_not_fatal() {
        let mut panel = RecordingPanel::new();
        panel.fail = true;
        let mut r = Renderer::new(panel);
        assert_eq!(r.render_full(Screen::Blank), RenderOutcome::Blank);
        assert!(r.render_status("x").is_err());
        r.hibernate();
    }
}
