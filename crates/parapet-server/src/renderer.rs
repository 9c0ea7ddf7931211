//! Draws CAPTCHA answers onto a map canvas using a built-in 5x7 bitmap font.

use parapet_fallback::captcha::IMAGE_LEN;
use parapet_fallback::{CaptchaError, CaptchaRenderer};
use parapet_protocol::MAP_SIZE;
use rand::Rng;

const GLYPH_WIDTH: usize = 5;
const GLYPH_HEIGHT: usize = 7;

/// Map palette ids: the four shades of snow white and of black.
const BACKGROUND: [u8; 4] = [32, 33, 34, 35];
const INK: [u8; 4] = [116, 117, 118, 119];

const DIGITS: [[u8; GLYPH_HEIGHT]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

const LETTERS: [[u8; GLYPH_HEIGHT]; 26] = [
    [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
    [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
    [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
    [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
];

fn glyph(c: char) -> Option<&'static [u8; GLYPH_HEIGHT]> {
    match c {
        '0'..='9' => DIGITS.get(c as usize - '0' as usize),
        'A'..='Z' => LETTERS.get(c as usize - 'A' as usize),
        _ => None,
    }
}

/// Renders digits and upper-case letters with per-glyph jitter, speckle and strike lines.
#[derive(Debug, Clone)]
pub struct BitmapRenderer {
    noise_pixels: usize,
    lines: usize,
}

impl Default for BitmapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BitmapRenderer {
    pub fn new() -> Self {
        Self {
            noise_pixels: 600,
            lines: 3,
        }
    }
}

struct Canvas {
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(rng: &mut impl Rng) -> Self {
        let pixels = (0..IMAGE_LEN)
            .map(|_| BACKGROUND[rng.gen_range(0..BACKGROUND.len())])
            .collect();
        Self { pixels }
    }

    fn set(&mut self, x: i32, y: i32, color: u8) {
        if (0..MAP_SIZE as i32).contains(&x) && (0..MAP_SIZE as i32).contains(&y) {
            self.pixels[y as usize * MAP_SIZE + x as usize] = color;
        }
    }

    fn line(&mut self, from: (i32, i32), to: (i32, i32), color: u8) {
        let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).max(1);
        for step in 0..=steps {
            let x = from.0 + (to.0 - from.0) * step / steps;
            let y = from.1 + (to.1 - from.1) * step / steps;
            self.set(x, y, color);
        }
    }
}

impl CaptchaRenderer for BitmapRenderer {
    fn render(&self, answer: &str) -> Result<Vec<u8>, CaptchaError> {
        let glyphs = answer
            .chars()
            .map(|c| glyph(c).ok_or(CaptchaError::UnsupportedCharacter(c)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rng = rand::thread_rng();
        let mut canvas = Canvas::new(&mut rng);
        if glyphs.is_empty() {
            return Ok(canvas.pixels);
        }

        // Leave a margin on each side so jitter never clips a glyph
        let cell = GLYPH_WIDTH + 1;
        let scale = ((MAP_SIZE * 3 / 4) / (cell * glyphs.len()))
            .min((MAP_SIZE / 2) / GLYPH_HEIGHT)
            .max(1);
        let width = (cell * glyphs.len() - 1) * scale;
        let height = GLYPH_HEIGHT * scale;
        let left = (MAP_SIZE.saturating_sub(width) / 2) as i32;
        let top = (MAP_SIZE.saturating_sub(height) / 2) as i32;
        let jitter = (scale as i32 * 2).max(2);
        let shift = scale as i32 / 2;

        for (index, rows) in glyphs.iter().enumerate() {
            let ox = left + (index * cell * scale) as i32 + rng.gen_range(-shift..=shift);
            let oy = top + rng.gen_range(-jitter..=jitter);
            let ink = INK[rng.gen_range(0..INK.len())];
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            canvas.set(
                                ox + (col * scale + dx) as i32,
                                oy + (row * scale + dy) as i32,
                                ink,
                            );
                        }
                    }
                }
            }
        }

        let size = MAP_SIZE as i32;
        for _ in 0..self.lines {
            let from = (0, rng.gen_range(top..top + height as i32));
            let to = (size - 1, rng.gen_range(top..top + height as i32));
            canvas.line(from, to, INK[rng.gen_range(0..INK.len())]);
        }
        for _ in 0..self.noise_pixels {
            let palette = if rng.gen_bool(0.5) { &INK } else { &BACKGROUND };
            let color = palette[rng.gen_range(0..palette.len())];
            canvas.set(rng.gen_range(0..size), rng.gen_range(0..size), color);
        }

        Ok(canvas.pixels)
    }
}
