use std::collections::HashMap;
use std::rc::Rc;

use super::geometry::{Point, Size};
use crate::sensors::ReadingLines;
use crate::settings::{OverlaySettings, OverlayTheme};

/// Typeface for all overlay text. GDI falls back to a stock face when it
/// is not installed.
pub const FONT_FACE: &str = "Cascadia Mono";
/// Outline drawn behind every glyph so text reads on any background.
pub const OUTLINE_COLOR: Color = Color::argb(150, 32, 32, 32);
pub const OUTLINE_WIDTH: i32 = 1;
/// Alpha of the full-window fill while interactive. One is enough for
/// the OS to hit-test the whole window without visibly tinting it.
pub const DRAG_HIT_ALPHA: u8 = 1;
/// Padding between the text block and the window edge.
pub const INNER_PADDING: i32 = 0;
/// Vertical spacing between stacked lines. Negative pulls the tight
/// line boxes together.
pub const ROW_SPACING: i32 = -2;
/// Widest values each temperature line can show; the value column is
/// sized from these so live readings never change the overlay width.
pub const VALUE_TEMPLATES: [&str; 2] = ["CPU: 888.8 C", "GPU: 888.8 C"];

/// Straight (non-premultiplied) ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { a: 255, r, g, b }
    }

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub cpu: Color,
    pub gpu: Color,
    pub status: Color,
}

pub fn theme_colors(theme: OverlayTheme) -> ThemeColors {
    match theme {
        OverlayTheme::NeonMint => ThemeColors {
            cpu: Color::rgb(0, 250, 154),
            gpu: Color::rgb(50, 205, 50),
            status: Color::rgb(245, 245, 245),
        },
        OverlayTheme::Ember => ThemeColors {
            cpu: Color::rgb(255, 165, 0),
            gpu: Color::rgb(255, 69, 0),
            status: Color::rgb(255, 228, 181),
        },
        OverlayTheme::Ice => ThemeColors {
            cpu: Color::rgb(0, 191, 255),
            gpu: Color::rgb(0, 255, 255),
            status: Color::rgb(240, 248, 255),
        },
        OverlayTheme::Bw => ThemeColors {
            cpu: Color::rgb(255, 255, 255),
            gpu: Color::rgb(255, 255, 255),
            status: Color::rgb(255, 255, 255),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontSpec {
    pub size_tenths: u16,
}

/// Everything that shapes a glyph sprite. Styles with equal fields share
/// atlas entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub font: FontSpec,
    pub fill: Color,
    pub outline: Color,
    pub outline_width: i32,
}

/// Coverage of one glyph as the platform rasterizer drew it, before any
/// outline or color is applied. `width` doubles as the advance basis.
#[derive(Debug, Clone)]
pub struct RawGlyph {
    pub width: i32,
    pub height: i32,
    pub coverage: Vec<u8>,
}

/// Platform text measurement and rasterization, one glyph at a time.
/// The atlas layers outlines and colors on top of the raw coverage.
pub trait GlyphRasterizer {
    /// Height of one line of `font` before outline padding.
    fn line_height(&mut self, font: FontSpec) -> i32;
    fn raster_glyph(&mut self, ch: char, font: FontSpec) -> RawGlyph;
}

/// One colored, outlined glyph cell ready to blit.
#[derive(Debug, Clone)]
pub struct GlyphSprite {
    pub width: i32,
    pub height: i32,
    /// Horizontal pen advance after this glyph.
    pub advance: i32,
    /// Premultiplied ARGB cell pixels, row-major.
    pub pixels: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AtlasKey {
    style: TextStyle,
    ch: char,
}

/// Cache of rendered glyph sprites keyed by style and character.
pub struct GlyphAtlas<R> {
    rasterizer: R,
    sprites: HashMap<AtlasKey, Rc<GlyphSprite>>,
    line_heights: HashMap<FontSpec, i32>,
}

impl<R: GlyphRasterizer> GlyphAtlas<R> {
    pub fn new(rasterizer: R) -> Self {
        Self {
            rasterizer,
            sprites: HashMap::new(),
            line_heights: HashMap::new(),
        }
    }

    /// Full line height for `style`, outline padding included.
    pub fn line_height(&mut self, style: &TextStyle) -> i32 {
        let raw = match self.line_heights.get(&style.font) {
            Some(raw) => *raw,
            None => {
                let raw = self.rasterizer.line_height(style.font);
                self.line_heights.insert(style.font, raw);
                raw
            }
        };
        (raw + style.outline_width * 2 + 6).max(1)
    }

    /// Advance width of `text`, without the outline allowance the labels
    /// add on top.
    pub fn measure(&mut self, text: &str, style: &TextStyle) -> i32 {
        let mut width = 0;
        for ch in text.chars() {
            width += self.sprite(ch, style).advance;
        }
        width.max(1)
    }

    fn sprite(&mut self, ch: char, style: &TextStyle) -> Rc<GlyphSprite> {
        let key = AtlasKey { style: *style, ch };
        if let Some(sprite) = self.sprites.get(&key) {
            return Rc::clone(sprite);
        }
        let sprite = Rc::new(build_sprite(&mut self.rasterizer, ch, style));
        self.sprites.insert(key, Rc::clone(&sprite));
        sprite
    }

    /// Number of cached sprites, across all styles.
    pub fn cached_sprites(&self) -> usize {
        self.sprites.len()
    }
}

/// Stamp outline copies of the raw coverage around the origin, then the
/// fill on top, into a padded premultiplied cell.
fn build_sprite<R: GlyphRasterizer>(
    rasterizer: &mut R,
    ch: char,
    style: &TextStyle,
) -> GlyphSprite {
    let raw = rasterizer.raster_glyph(ch, style.font);
    let outline_width = style.outline_width.max(0);
    let pad = outline_width + 2;
    let cell_width = raw.width + outline_width * 2 + 6;
    let cell_height = raw.height + outline_width * 2 + 6;
    let mut pixels = vec![0u32; (cell_width * cell_height) as usize];

    if outline_width > 0 && style.outline.a > 0 {
        for oy in -outline_width..=outline_width {
            for ox in -outline_width..=outline_width {
                if ox == 0 && oy == 0 {
                    continue;
                }
                stamp(
                    &mut pixels,
                    cell_width,
                    cell_height,
                    &raw,
                    pad + ox,
                    pad + oy,
                    style.outline,
                );
            }
        }
    }
    stamp(
        &mut pixels,
        cell_width,
        cell_height,
        &raw,
        pad,
        pad,
        style.fill,
    );

    GlyphSprite {
        width: cell_width,
        height: cell_height,
        advance: raw.width.max(1),
        pixels,
    }
}

fn stamp(
    pixels: &mut [u32],
    cell_width: i32,
    cell_height: i32,
    raw: &RawGlyph,
    offset_x: i32,
    offset_y: i32,
    color: Color,
) {
    for y in 0..raw.height {
        let dest_y = y + offset_y;
        if dest_y < 0 || dest_y >= cell_height {
            continue;
        }
        for x in 0..raw.width {
            let dest_x = x + offset_x;
            if dest_x < 0 || dest_x >= cell_width {
                continue;
            }
            let coverage = raw.coverage[(y * raw.width + x) as usize];
            if coverage == 0 {
                continue;
            }
            let index = (dest_y * cell_width + dest_x) as usize;
            pixels[index] = over(pixels[index], premultiply(color, coverage));
        }
    }
}

/// Premultiplied source-over of `src` onto `dst`, both 0xAARRGGBB.
fn over(dst: u32, src: u32) -> u32 {
    let src_a = src >> 24;
    if src_a == 0 {
        return dst;
    }
    if src_a == 255 {
        return src;
    }
    let inv = 255 - src_a;
    let blend = |shift: u32| {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        (s + (d * inv + 127) / 255).min(255) << shift
    };
    blend(24) | blend(16) | blend(8) | blend(0)
}

fn premultiply(color: Color, coverage: u8) -> u32 {
    let a = (u32::from(color.a) * u32::from(coverage) + 127) / 255;
    let r = (u32::from(color.r) * a + 127) / 255;
    let g = (u32::from(color.g) * a + 127) / 255;
    let b = (u32::from(color.b) * a + 127) / 255;
    (a << 24) | (r << 16) | (g << 8) | b
}

/// Render parameters derived from the current settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayVisuals {
    pub cpu_style: TextStyle,
    pub gpu_style: TextStyle,
    pub status_style: TextStyle,
    /// Minimum overlay width, sized from [`VALUE_TEMPLATES`].
    pub value_column_width: i32,
}

#[derive(Debug, Clone)]
pub struct PlacedLabel {
    pub text: String,
    pub origin: Point,
    pub style: TextStyle,
}

/// Positioned labels plus the window size that contains them.
#[derive(Debug, Clone, Default)]
pub struct FrameLayout {
    pub size: Size,
    pub labels: Vec<PlacedLabel>,
    /// Top-left of the first label; the controller anchors on this when
    /// preserving position across re-layouts.
    pub text_origin: Point,
}

impl FrameLayout {
    fn empty() -> Self {
        Self {
            size: Size::new(1, 1),
            labels: Vec::new(),
            text_origin: Point::new(INNER_PADDING, INNER_PADDING),
        }
    }
}

/// Final overlay frame, premultiplied ARGB top-down rows. Matches the
/// 32bpp DIB layout so the platform push is a plain copy.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub width: i32,
    pub height: i32,
    pub pixels: Vec<u32>,
}

impl FrameBuffer {
    fn new(size: Size, fill: u32) -> Self {
        Self {
            width: size.width,
            height: size.height,
            pixels: vec![fill; (size.width * size.height) as usize],
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    fn blit_over(&mut self, sprite: &GlyphSprite, origin: Point) {
        for y in 0..sprite.height {
            let dest_y = origin.y + y;
            if dest_y < 0 || dest_y >= self.height {
                continue;
            }
            for x in 0..sprite.width {
                let dest_x = origin.x + x;
                if dest_x < 0 || dest_x >= self.width {
                    continue;
                }
                let src = sprite.pixels[(y * sprite.width + x) as usize];
                if src == 0 {
                    continue;
                }
                let index = (dest_y * self.width + dest_x) as usize;
                self.pixels[index] = over(self.pixels[index], src);
            }
        }
    }
}

/// Turns reading lines into layered-window frames, caching glyph sprites
/// across frames.
pub struct Compositor<R> {
    atlas: GlyphAtlas<R>,
}

impl<R: GlyphRasterizer> Compositor<R> {
    pub fn new(rasterizer: R) -> Self {
        Self {
            atlas: GlyphAtlas::new(rasterizer),
        }
    }

    pub fn visuals_for(&mut self, settings: &OverlaySettings) -> OverlayVisuals {
        let colors = theme_colors(settings.theme);
        let value_font = FontSpec {
            size_tenths: settings.font_size.value_size_tenths(),
        };
        let status_font = FontSpec {
            size_tenths: settings.font_size.status_size_tenths(),
        };
        let cpu_style = TextStyle {
            font: value_font,
            fill: colors.cpu,
            outline: OUTLINE_COLOR,
            outline_width: OUTLINE_WIDTH,
        };
        let gpu_style = TextStyle {
            fill: colors.gpu,
            ..cpu_style
        };
        let status_style = TextStyle {
            font: status_font,
            fill: colors.status,
            outline: OUTLINE_COLOR,
            outline_width: OUTLINE_WIDTH,
        };
        let value_column_width = VALUE_TEMPLATES
            .iter()
            .map(|template| self.atlas.measure(template, &cpu_style) + OUTLINE_WIDTH * 2)
            .max()
            .unwrap_or(1);
        OverlayVisuals {
            cpu_style,
            gpu_style,
            status_style,
            value_column_width,
        }
    }

    /// Stack the present lines and size the window around them. The
    /// value column keeps the width stable while readings change.
    pub fn layout(&mut self, lines: &ReadingLines, visuals: &OverlayVisuals) -> FrameLayout {
        let mut labels: Vec<PlacedLabel> = Vec::new();
        let mut width = visuals.value_column_width;
        let mut bottom = INNER_PADDING;
        let mut y = INNER_PADDING;

        let mut place = |labels: &mut Vec<PlacedLabel>,
                         atlas: &mut GlyphAtlas<R>,
                         text: &str,
                         style: TextStyle,
                         y: &mut i32,
                         width: &mut i32,
                         bottom: &mut i32| {
            if !labels.is_empty() {
                *y += ROW_SPACING;
            }
            let label_width = atlas.measure(text, &style) + style.outline_width * 2;
            let label_height = atlas.line_height(&style);
            labels.push(PlacedLabel {
                text: text.to_string(),
                origin: Point::new(INNER_PADDING, *y),
                style,
            });
            *width = (*width).max(label_width);
            *y += label_height;
            *bottom = *y;
        };

        if let Some(cpu) = &lines.cpu {
            place(
                &mut labels,
                &mut self.atlas,
                cpu,
                visuals.cpu_style,
                &mut y,
                &mut width,
                &mut bottom,
            );
        }
        if let Some(gpu) = &lines.gpu {
            place(
                &mut labels,
                &mut self.atlas,
                gpu,
                visuals.gpu_style,
                &mut y,
                &mut width,
                &mut bottom,
            );
        }
        if let Some(status) = &lines.status {
            place(
                &mut labels,
                &mut self.atlas,
                status,
                visuals.status_style,
                &mut y,
                &mut width,
                &mut bottom,
            );
        }

        if labels.is_empty() {
            return FrameLayout::empty();
        }

        let text_origin = labels[0].origin;
        FrameLayout {
            size: Size::new(
                (width + INNER_PADDING * 2).max(1),
                (bottom + INNER_PADDING).max(1),
            ),
            labels,
            text_origin,
        }
    }

    /// Compose one frame. While interactive the whole window carries a
    /// barely-visible fill so the OS hit-tests every pixel of it.
    pub fn compose(&mut self, layout: &FrameLayout, interactive: bool) -> Option<FrameBuffer> {
        if layout.size.width <= 0 || layout.size.height <= 0 {
            return None;
        }
        let background = if interactive {
            premultiply(Color::argb(DRAG_HIT_ALPHA, 0, 0, 0), 255)
        } else {
            0
        };
        let mut frame = FrameBuffer::new(layout.size, background);
        for label in &layout.labels {
            self.draw_text(&mut frame, label);
        }
        Some(frame)
    }

    fn draw_text(&mut self, frame: &mut FrameBuffer, label: &PlacedLabel) {
        let mut pen_x = label.origin.x;
        for ch in label.text.chars() {
            let sprite = self.atlas.sprite(ch, &label.style);
            frame.blit_over(&sprite, Point::new(pen_x, label.origin.y));
            pen_x += sprite.advance;
        }
    }

    pub fn cached_sprites(&self) -> usize {
        self.atlas.cached_sprites()
    }
}

/// Fixed-metric rasterizer that draws every visible glyph as a solid
/// block. Keeps layout and compositing deterministic where platform text
/// is unavailable, and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockGlyphRasterizer;

impl BlockGlyphRasterizer {
    fn cell_height(font: FontSpec) -> i32 {
        (i32::from(font.size_tenths) / 10).max(1)
    }

    fn cell_width(font: FontSpec) -> i32 {
        (Self::cell_height(font) * 6 / 10).max(1)
    }
}

impl GlyphRasterizer for BlockGlyphRasterizer {
    fn line_height(&mut self, font: FontSpec) -> i32 {
        Self::cell_height(font) + 2
    }

    fn raster_glyph(&mut self, ch: char, font: FontSpec) -> RawGlyph {
        let width = Self::cell_width(font);
        let height = Self::cell_height(font);
        let coverage = if ch.is_whitespace() {
            vec![0u8; (width * height) as usize]
        } else {
            vec![255u8; (width * height) as usize]
        };
        RawGlyph {
            width,
            height,
            coverage,
        }
    }
}

#[cfg(windows)]
pub use platform::GdiGlyphRasterizer;

#[cfg(windows)]
mod platform {
    use super::{BlockGlyphRasterizer, FontSpec, GlyphRasterizer, RawGlyph, FONT_FACE};
    use windows::Win32::Foundation::{COLORREF, HANDLE, HWND, SIZE};
    use windows::Win32::Graphics::Gdi::{
        CreateCompatibleDC, CreateDIBSection, CreateFontIndirectW, DeleteDC, DeleteObject,
        GdiFlush, GetDC, GetDeviceCaps, GetTextExtentPoint32W, ReleaseDC, SelectObject, SetBkMode,
        SetTextColor, TextOutW, ANTIALIASED_QUALITY, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
        DEFAULT_CHARSET, DIB_RGB_COLORS, FW_NORMAL, HDC, HFONT, HGDIOBJ, LOGFONTW, LOGPIXELSY,
        TRANSPARENT,
    };

    /// Rasterizes glyphs through a memory DC and reads coverage back out
    /// of the grayscale render. Falls back to block glyphs when a GDI
    /// call fails, so the overlay never goes blank.
    #[derive(Debug, Default)]
    pub struct GdiGlyphRasterizer {
        fallback: BlockGlyphRasterizer,
    }

    struct FontDc {
        screen: HDC,
        dc: HDC,
        font: HFONT,
        old_font: HGDIOBJ,
    }

    impl FontDc {
        fn create(font: FontSpec) -> Option<Self> {
            unsafe {
                let screen = GetDC(HWND::default());
                if screen.0.is_null() {
                    return None;
                }
                let dc = CreateCompatibleDC(screen);
                if dc.0.is_null() {
                    let _ = ReleaseDC(HWND::default(), screen);
                    return None;
                }
                let dpi = GetDeviceCaps(screen, LOGPIXELSY);
                let mut logfont = LOGFONTW {
                    // Negative height selects character height in device
                    // pixels; size is in tenths of a point.
                    lfHeight: -((i32::from(font.size_tenths) * dpi + 360) / 720),
                    lfWeight: FW_NORMAL.0 as i32,
                    lfCharSet: DEFAULT_CHARSET,
                    lfQuality: ANTIALIASED_QUALITY,
                    ..Default::default()
                };
                for (dst, src) in logfont.lfFaceName.iter_mut().zip(FONT_FACE.encode_utf16()) {
                    *dst = src;
                }
                let hfont = CreateFontIndirectW(&logfont);
                if hfont.0.is_null() {
                    let _ = DeleteDC(dc);
                    let _ = ReleaseDC(HWND::default(), screen);
                    return None;
                }
                let old_font = SelectObject(dc, hfont);
                Some(Self {
                    screen,
                    dc,
                    font: hfont,
                    old_font,
                })
            }
        }

        fn text_extent(&self, text: &str) -> Option<(i32, i32)> {
            let wide: Vec<u16> = text.encode_utf16().collect();
            let mut size = SIZE::default();
            unsafe { GetTextExtentPoint32W(self.dc, &wide, &mut size) }
                .as_bool()
                .then_some((size.cx, size.cy))
        }
    }

    impl Drop for FontDc {
        fn drop(&mut self) {
            unsafe {
                let _ = SelectObject(self.dc, self.old_font);
                let _ = DeleteObject(self.font);
                let _ = DeleteDC(self.dc);
                let _ = ReleaseDC(HWND::default(), self.screen);
            }
        }
    }

    impl GdiGlyphRasterizer {
        fn try_raster(&mut self, ch: char, font: FontSpec) -> Option<RawGlyph> {
            let font_dc = FontDc::create(font)?;
            let text = ch.to_string();
            let (width, height) = font_dc.text_extent(&text)?;
            let width = width.max(1);
            let height = height.max(1);

            unsafe {
                let mut bmi = BITMAPINFO::default();
                bmi.bmiHeader = BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                };
                let mut bits: *mut core::ffi::c_void = std::ptr::null_mut();
                let dib = CreateDIBSection(
                    font_dc.dc,
                    &bmi,
                    DIB_RGB_COLORS,
                    &mut bits,
                    HANDLE::default(),
                    0,
                )
                .ok()?;
                if bits.is_null() {
                    let _ = DeleteObject(dib);
                    return None;
                }
                let old_bitmap = SelectObject(font_dc.dc, dib);

                SetBkMode(font_dc.dc, TRANSPARENT);
                SetTextColor(font_dc.dc, COLORREF(0x00ff_ffff));
                let wide: Vec<u16> = text.encode_utf16().collect();
                let drew = TextOutW(font_dc.dc, 0, 0, &wide).as_bool();
                let _ = GdiFlush();

                let glyph = if drew {
                    let pixels =
                        std::slice::from_raw_parts(bits as *const u32, (width * height) as usize);
                    // White-on-black render: any channel is the coverage.
                    let coverage = pixels.iter().map(|px| ((px >> 8) & 0xFF) as u8).collect();
                    Some(RawGlyph {
                        width,
                        height,
                        coverage,
                    })
                } else {
                    None
                };

                let _ = SelectObject(font_dc.dc, old_bitmap);
                let _ = DeleteObject(dib);
                glyph
            }
        }
    }

    impl GlyphRasterizer for GdiGlyphRasterizer {
        fn line_height(&mut self, font: FontSpec) -> i32 {
            FontDc::create(font)
                .and_then(|dc| dc.text_extent("Ag"))
                .map(|(_, height)| height)
                .unwrap_or_else(|| self.fallback.line_height(font))
        }

        fn raster_glyph(&mut self, ch: char, font: FontSpec) -> RawGlyph {
            self.try_raster(ch, font)
                .unwrap_or_else(|| self.fallback.raster_glyph(ch, font))
        }
    }
}
