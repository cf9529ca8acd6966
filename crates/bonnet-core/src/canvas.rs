// src/canvas.rs
//! Monochrome drawing surface with an invert mask.
//!
//! Every render pass draws into a [`Canvas`]: a plain on/off pixel grid plus a
//! parallel invert grid used by highlight styles. The visible value of a pixel
//! is `pixel XOR invert`. When the pass completes the canvas is packed into the
//! page-ordered bit buffer that monochrome OLED controllers expect.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use parking_lot::Mutex;

use crate::ui::geometry::BoundingBox;

/// Number of idle canvases kept for reuse by [`CanvasPool`].
pub const CANVAS_POOL_CAPACITY: usize = 4;

/// Pixel grid plus invert mask, sized once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
    invert: Vec<bool>,
    ink: Option<BoundingBox>,
}

impl Canvas {
    /// Allocate a cleared canvas.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![false; len],
            invert: vec![false; len],
            ink: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reset every pixel and every invert bit.
    pub fn clear(&mut self) {
        self.pixels.fill(false);
        self.invert.fill(false);
        self.ink = None;
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    #[inline]
    fn touch(&mut self, x: i32, y: i32) {
        match &mut self.ink {
            Some(bb) => bb.expand_to(x, y),
            None => self.ink = Some(BoundingBox::point(x, y)),
        }
    }

    /// Write a single pixel. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = on;
            self.touch(x, y);
        }
    }

    /// Raw pixel value, ignoring the invert mask.
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|idx| self.pixels[idx])
    }

    /// Raw invert bit.
    pub fn inverted(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|idx| self.invert[idx])
    }

    /// Visible value of a pixel: pixel XOR invert.
    pub fn is_lit(&self, x: i32, y: i32) -> bool {
        self.index(x, y)
            .is_some_and(|idx| self.pixels[idx] ^ self.invert[idx])
    }

    fn set_inverted(&mut self, x: i32, y: i32) {
        if let Some(idx) = self.index(x, y) {
            self.invert[idx] = true;
            self.touch(x, y);
        }
    }

    /// Mark the 3x3 neighbourhood of `(x, y)` as inverted.
    pub fn mark_halo(&mut self, x: i32, y: i32) {
        self.mark_halo_within(x, y, None);
    }

    fn mark_halo_within(&mut self, x: i32, y: i32, clip: Option<&BoundingBox>) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (hx, hy) = (x + dx, y + dy);
                if clip.is_none_or(|c| c.contains_point(hx, hy)) {
                    self.set_inverted(hx, hy);
                }
            }
        }
    }

    /// Fill a `w x h` block with the given value, clamped to the canvas.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, on: bool) {
        let Some((x0, y0, x1, y1)) = self.clamp_block(x, y, w, h) else {
            return;
        };
        for py in y0..y1 {
            let row = py as usize * self.width as usize;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(on);
        }
        self.touch(x0, y0);
        self.touch(x1 - 1, y1 - 1);
    }

    /// Set the invert bit over a `w x h` block, clamped to the canvas.
    pub fn invert_block(&mut self, x: i32, y: i32, w: u32, h: u32) {
        let Some((x0, y0, x1, y1)) = self.clamp_block(x, y, w, h) else {
            return;
        };
        for py in y0..y1 {
            let row = py as usize * self.width as usize;
            self.invert[row + x0 as usize..row + x1 as usize].fill(true);
        }
        self.touch(x0, y0);
        self.touch(x1 - 1, y1 - 1);
    }

    /// Clamp a block to the canvas, returning exclusive end coordinates.
    fn clamp_block(&self, x: i32, y: i32, w: u32, h: u32) -> Option<(i32, i32, i32, i32)> {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w.min(i32::MAX as u32) as i32).min(self.width as i32);
        let y1 = y.saturating_add(h.min(i32::MAX as u32) as i32).min(self.height as i32);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    /// Bounding box of everything drawn since the last [`clear`](Self::clear).
    pub fn ink_bounds(&self) -> Option<BoundingBox> {
        self.ink
    }

    /// Length in bytes of the packed bit buffer.
    pub fn packed_len(&self) -> usize {
        self.width as usize * self.height.div_ceil(8) as usize
    }

    /// Pack into a fresh page-ordered bit buffer.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.packed_len()];
        self.pack_into(&mut out);
        out
    }

    /// Pack into `out`: byte `x + (y / 8) * width`, bit `y % 8`.
    ///
    /// Bytes past the end of `out` are not written.
    pub fn pack_into(&self, out: &mut [u8]) {
        out.fill(0);
        let width = self.width as usize;
        for y in 0..self.height as usize {
            let page = (y >> 3) * width;
            let bit = 1u8 << (y & 7);
            let row = y * width;
            for x in 0..width {
                if (self.pixels[row + x] ^ self.invert[row + x])
                    && let Some(byte) = out.get_mut(page + x)
                {
                    *byte |= bit;
                }
            }
        }
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> embedded_graphics::geometry::Size {
        embedded_graphics::geometry::Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            self.set_pixel(coord.x, coord.y, color.is_on());
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_rect(
            area.top_left.x,
            area.top_left.y,
            area.size.width,
            area.size.height,
            color.is_on(),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ClippedCanvas
// ---------------------------------------------------------------------------

/// A window onto a [`Canvas`] that discards pixels outside its bounds.
///
/// With `halo` enabled every lit pixel also marks its 3x3 neighbourhood in the
/// invert mask, restricted to the same window.
pub struct ClippedCanvas<'a> {
    canvas: &'a mut Canvas,
    clip: Option<BoundingBox>,
    halo: bool,
}

impl<'a> ClippedCanvas<'a> {
    pub fn new(canvas: &'a mut Canvas, x: i32, y: i32, w: u32, h: u32) -> Self {
        let clip = BoundingBox::from_origin_size(x, y, crate::ui::geometry::Size::new(w, h));
        Self {
            canvas,
            clip,
            halo: false,
        }
    }

    pub fn with_halo(mut self, halo: bool) -> Self {
        self.halo = halo;
        self
    }
}

impl Dimensions for ClippedCanvas<'_> {
    fn bounding_box(&self) -> Rectangle {
        match self.clip {
            Some(bb) => bb.into(),
            None => Rectangle::zero(),
        }
    }
}

impl DrawTarget for ClippedCanvas<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let Some(clip) = self.clip else {
            return Ok(());
        };
        for Pixel(coord, color) in pixels {
            if !clip.contains_point(coord.x, coord.y) {
                continue;
            }
            self.canvas.set_pixel(coord.x, coord.y, color.is_on());
            if self.halo && color.is_on() {
                self.canvas.mark_halo_within(coord.x, coord.y, Some(&clip));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CanvasPool
// ---------------------------------------------------------------------------

/// Bounded recycler so a steady render loop does not reallocate every pass.
pub struct CanvasPool {
    width: u32,
    height: u32,
    idle: Mutex<heapless::Vec<Canvas, CANVAS_POOL_CAPACITY>>,
}

impl CanvasPool {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            idle: Mutex::new(heapless::Vec::new()),
        }
    }

    /// Take an idle canvas (cleared) or allocate a new one.
    pub fn acquire(&self) -> Canvas {
        match self.idle.lock().pop() {
            Some(mut canvas) => {
                canvas.clear();
                canvas
            }
            None => Canvas::new(self.width, self.height),
        }
    }

    /// Return a canvas. Dropped when the pool is full or the size differs.
    pub fn release(&self, canvas: Canvas) {
        if canvas.width != self.width || canvas.height != self.height {
            return;
        }
        // Full pool: let it drop.
        let _ = self.idle.lock().push(canvas);
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}
