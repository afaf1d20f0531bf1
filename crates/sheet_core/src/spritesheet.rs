//! Spritesheet slicing and the in-session texture store.
//!
//! A spritesheet is a single image cut into equally sized tiles. Tiles are laid
//! out row-major starting at `margin` pixels from the top-left corner, with
//! `spacing` pixels between neighbours. Any partial tile at the right or bottom
//! edge is dropped. Frames are numbered from 0 in the order they are cut.

use image::{imageops, RgbaImage};
use std::collections::HashMap;

/// How to cut a sheet into frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub margin: u32,
    pub spacing: u32,
}

impl SheetConfig {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            margin: 0,
            spacing: 0,
        }
    }
}

/// Pixel-space rectangle of one frame inside its sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl FrameRect {
    /// UV rectangle `[u0, v0, u1, v1]` for a sheet of the given size.
    pub fn uv(&self, sheet_width: u32, sheet_height: u32) -> [f32; 4] {
        let sw = sheet_width.max(1) as f32;
        let sh = sheet_height.max(1) as f32;
        [
            self.x as f32 / sw,
            self.y as f32 / sh,
            (self.x + self.w) as f32 / sw,
            (self.y + self.h) as f32 / sh,
        ]
    }
}

/// Cut an `image_width` x `image_height` sheet into frames.
pub fn slice_frames(image_width: u32, image_height: u32, config: &SheetConfig) -> Vec<FrameRect> {
    let SheetConfig {
        frame_width: fw,
        frame_height: fh,
        margin,
        spacing,
        ..
    } = *config;

    if fw == 0 || fh == 0 {
        return Vec::new();
    }
    if fw > image_width || fh > image_height {
        log::warn!(
            "Frame size {}x{} is larger than the sheet ({}x{})",
            fw,
            fh,
            image_width,
            image_height
        );
        return Vec::new();
    }

    let usable_w = u64::from(image_width.saturating_sub(margin)) + u64::from(spacing);
    let usable_h = u64::from(image_height.saturating_sub(margin)) + u64::from(spacing);
    let columns = usable_w / (u64::from(fw) + u64::from(spacing));
    let rows = usable_h / (u64::from(fh) + u64::from(spacing));
    let total = (columns * rows) as usize;
    if total == 0 {
        return Vec::new();
    }

    let mut frames = Vec::with_capacity(total);
    for index in 0..total {
        let col = (index as u64 % columns) as u32;
        let row = (index as u64 / columns) as u32;
        frames.push(FrameRect {
            x: margin + col * (fw + spacing),
            y: margin + row * (fh + spacing),
            w: fw,
            h: fh,
        });
    }
    frames
}

/// A decoded sheet plus the frames cut from it.
#[derive(Debug, Clone)]
pub struct Texture {
    key: String,
    source: RgbaImage,
    frames: Vec<FrameRect>,
}

impl Texture {
    pub fn from_spritesheet(key: &str, source: RgbaImage, config: &SheetConfig) -> Self {
        let frames = slice_frames(source.width(), source.height(), config);
        Self {
            key: key.to_string(),
            source,
            frames,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    pub fn size(&self) -> (u32, u32) {
        self.source.dimensions()
    }

    pub fn frame(&self, index: usize) -> Option<&FrameRect> {
        self.frames.get(index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame names are their indices rendered as strings.
    /// Copy one frame out of the sheet as its own image.
    pub fn frame_image(&self, index: usize) -> Option<RgbaImage> {
        let rect = self.frames.get(index)?;
        Some(imageops::crop_imm(&self.source, rect.x, rect.y, rect.w, rect.h).to_image())
    }

    pub fn frame_names(&self) -> Vec<String> {
        (0..self.frames.len()).map(|i| i.to_string()).collect()
    }
}

/// Decode image bytes and slice them into a spritesheet texture.
pub fn decode_spritesheet(key: &str, bytes: &[u8], config: &SheetConfig) -> Result<Texture, String> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| format!("Failed to decode spritesheet '{key}': {e}"))?;
    Ok(Texture::from_spritesheet(key, image.to_rgba8(), config))
}

/// Keyed store of the textures loaded by one session.
#[derive(Debug, Default)]
pub struct TextureManager {
    textures: HashMap<String, Texture>,
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture. Keys are unique within a manager.
    pub fn add(&mut self, texture: Texture) -> Result<(), String> {
        if self.textures.contains_key(texture.key()) {
            return Err(format!("Texture key '{}' is already in use", texture.key()));
        }
        self.textures.insert(texture.key.clone(), texture);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Texture> {
        self.textures.get(key)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).expect("encode png");
        out.into_inner()
    }

    #[test]
    fn full_grid_is_sliced_row_major() {
        let frames = slice_frames(128, 128, &SheetConfig::new(32, 32));
        assert_eq!(frames.len(), 16);
        assert_eq!(frames[0], FrameRect { x: 0, y: 0, w: 32, h: 32 });
        assert_eq!(frames[3], FrameRect { x: 96, y: 0, w: 32, h: 32 });
        assert_eq!(frames[4], FrameRect { x: 0, y: 32, w: 32, h: 32 });
        assert_eq!(frames[15], FrameRect { x: 96, y: 96, w: 32, h: 32 });
    }

    #[test]
    fn single_strip_yields_one_row() {
        let frames = slice_frames(128, 32, &SheetConfig::new(32, 32));
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|f| f.y == 0));
    }

    #[test]
    fn partial_edge_tiles_are_dropped() {
        let frames = slice_frames(100, 50, &SheetConfig::new(32, 32));
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn frame_larger_than_sheet_yields_nothing() {
        assert!(slice_frames(16, 16, &SheetConfig::new(32, 32)).is_empty());
        assert!(slice_frames(64, 16, &SheetConfig::new(32, 32)).is_empty());
    }

    #[test]
    fn zero_sized_frame_yields_nothing() {
        assert!(slice_frames(64, 64, &SheetConfig::new(0, 32)).is_empty());
    }

    #[test]
    fn margin_and_spacing_offset_frames() {
        let config = SheetConfig {
            margin: 1,
            spacing: 2,
            ..SheetConfig::new(10, 10)
        };
        // (45 - 1 + 2) / 12 = 3 columns, (23 - 1 + 2) / 12 = 2 rows
        let frames = slice_frames(45, 23, &config);
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[1], FrameRect { x: 13, y: 1, w: 10, h: 10 });
        assert_eq!(frames[3], FrameRect { x: 1, y: 13, w: 10, h: 10 });
    }

    #[test]
    fn frame_image_crops_one_tile() {
        let mut img = RgbaImage::new(64, 32);
        img.put_pixel(32, 0, Rgba([9, 9, 9, 255]));
        let texture = Texture::from_spritesheet("sheet", img, &SheetConfig::new(32, 32));
        let frame = texture.frame_image(1).expect("second frame");
        assert_eq!(frame.dimensions(), (32, 32));
        assert_eq!(frame.get_pixel(0, 0), &Rgba([9, 9, 9, 255]));
        assert!(texture.frame_image(2).is_none());
    }

    #[test]
    fn uv_covers_frame_rect() {
        let rect = FrameRect { x: 32, y: 0, w: 32, h: 32 };
        assert_eq!(rect.uv(128, 64), [0.25, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn decode_spritesheet_reads_png() {
        let bytes = png_bytes(64, 32);
        let texture = decode_spritesheet("sheet", &bytes, &SheetConfig::new(32, 32)).expect("decode");
        assert_eq!(texture.key(), "sheet");
        assert_eq!(texture.size(), (64, 32));
        assert_eq!(texture.frame_count(), 2);
        assert_eq!(texture.frame_names(), vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn decode_spritesheet_rejects_garbage() {
        let err = decode_spritesheet("sheet", b"not an image", &SheetConfig::new(32, 32))
            .expect_err("garbage should not decode");
        assert!(err.contains("Failed to decode spritesheet 'sheet'"));
    }

    #[test]
    fn texture_manager_rejects_duplicate_keys() {
        let mut textures = TextureManager::new();
        let img = RgbaImage::new(32, 32);
        textures
            .add(Texture::from_spritesheet("a", img.clone(), &SheetConfig::new(32, 32)))
            .expect("first add");
        let err = textures
            .add(Texture::from_spritesheet("a", img, &SheetConfig::new(16, 16)))
            .expect_err("duplicate");
        assert!(err.contains("already in use"));
        assert_eq!(textures.len(), 1);
        assert_eq!(textures.get("a").map(Texture::frame_count), Some(1));
    }
}
