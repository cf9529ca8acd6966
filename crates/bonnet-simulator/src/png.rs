//! Display transport that writes each frame to disk as a PNG.

use std::io;
use std::path::PathBuf;

use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{BinaryColorTheme, OutputSettings, OutputSettingsBuilder, SimulatorDisplay};
use log::debug;

use bonnet_core::DisplayTransport;

/// Decodes page-ordered frames (byte `x + (y / 8) * width`, bit `y % 8`) and
/// saves them as `frame-NNNN.png` under `dir`.
pub struct PngTransport {
    dir: PathBuf,
    size: Size,
    settings: OutputSettings,
    next_frame: u32,
}

impl PngTransport {
    pub fn new(dir: impl Into<PathBuf>, width: u32, height: u32, scale: u32) -> Self {
        Self {
            dir: dir.into(),
            size: Size::new(width, height),
            settings: OutputSettingsBuilder::new()
                .theme(BinaryColorTheme::OledBlue)
                .scale(scale.max(1))
                .build(),
            next_frame: 0,
        }
    }

    fn decode(&self, frame: &[u8]) -> SimulatorDisplay<BinaryColor> {
        let mut display = SimulatorDisplay::new(self.size);
        let width = self.size.width as usize;
        let pixels = (0..self.size.height as usize).flat_map(|y| {
            (0..width).filter_map(move |x| {
                let byte = frame.get(x + (y >> 3) * width)?;
                (byte & (1 << (y & 7)) != 0).then(|| Pixel(Point::new(x as i32, y as i32), BinaryColor::On))
            })
        });
        let _ = display.draw_iter(pixels);
        display
    }
}

impl DisplayTransport for PngTransport {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        let path = self.dir.join(format!("frame-{:04}.png", self.next_frame));
        self.decode(frame)
            .to_rgb_output_image(&self.settings)
            .save_png(&path)
            .map_err(io::Error::other)?;
        self.next_frame += 1;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}
