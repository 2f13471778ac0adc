//! 2.13" e-paper panel wrapper.
//!
//! Copies the badge frame buffer into the driver's rotated buffer and
//! pushes it. Full updates use the full-refresh waveform; status updates
//! use the quick (partial) waveform, which leaves unchanged pixels alone.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use embassy_time::Delay;
use epd_waveshare::epd2in13_v2::{Display2in13, Epd2in13};
use epd_waveshare::prelude::*;
use pixeltag::error::PanelError;
use pixeltag::framebuffer::FrameBuffer;
use pixeltag::render::Panel;

/// Type alias for the concrete display driver.
pub type Driver<SPI, BUSY, DC, RST> = Epd2in13<SPI, BUSY, DC, RST, Delay>;

pub struct EpdPanel<SPI, BUSY, DC, RST> {
    spi: SPI,
    epd: Driver<SPI, BUSY, DC, RST>,
    display: Display2in13,
    delay: Delay,
    asleep: bool,
    /// Quick waveform currently loaded.
    quick: bool,
}

/// Initialise the panel in landscape orientation.
pub fn init<SPI, BUSY, DC, RST>(
    mut spi: SPI,
    busy: BUSY,
    dc: DC,
    rst: RST,
) -> Result<EpdPanel<SPI, BUSY, DC, RST>, PanelError>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    let mut delay = Delay;
    let epd = Epd2in13::new(&mut spi, busy, dc, rst, &mut delay, None).map_err(|_| PanelError::Bus)?;
    let mut display = Display2in13::default();
    display.set_rotation(DisplayRotation::Rotate90);
    Ok(EpdPanel {
        spi,
        epd,
        display,
        delay,
        asleep: false,
        quick: false,
    })
}

impl<SPI, BUSY, DC, RST> EpdPanel<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    fn wake(&mut self) -> Result<(), PanelError> {
        if self.asleep {
            self.epd
                .wake_up(&mut self.spi, &mut self.delay)
                .map_err(|_| PanelError::Bus)?;
            self.asleep = false;
            // The controller comes back with the full LUT loaded.
            self.quick = false;
        }
        Ok(())
    }

    fn use_lut(&mut self, quick: bool) -> Result<(), PanelError> {
        if self.quick != quick {
            let lut = if quick { RefreshLut::Quick } else { RefreshLut::Full };
            self.epd
                .set_lut(&mut self.spi, &mut self.delay, Some(lut))
                .map_err(|_| PanelError::Bus)?;
            self.quick = quick;
        }
        Ok(())
    }

    fn push(&mut self, frame: &FrameBuffer, quick: bool) -> Result<(), PanelError> {
        self.wake()?;
        self.use_lut(quick)?;
        let _ = self.display.clear(Color::White);
        let _ = self
            .display
            .draw_iter(frame.dark_pixels().map(|p| Pixel(p, Color::Black)));
        self.epd
            .update_and_display_frame(&mut self.spi, self.display.buffer(), &mut self.delay)
            .map_err(|_| PanelError::Busy)
    }
}

impl<SPI, BUSY, DC, RST> Panel for EpdPanel<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    fn full_update(&mut self, frame: &FrameBuffer) -> Result<(), PanelError> {
        self.push(frame, false)
    }

    fn partial_update(&mut self, frame: &FrameBuffer, _area: &Rectangle) -> Result<(), PanelError> {
        // The quick waveform only drives pixels that changed, which keeps
        // the update inside `area` without rotated window arithmetic.
        self.push(frame, true)
    }

    fn hibernate(&mut self) -> Result<(), PanelError> {
        if self.asleep {
            return Ok(());
        }
        self.epd
            .sleep(&mut self.spi, &mut self.delay)
            .map_err(|_| PanelError::Bus)?;
        self.asleep = true;
        Ok(())
    }
}
