//! Card rendering with `image` and `fontdue`.

use std::{
    fs::File,
    io::{BufWriter, Write},
    sync::Arc,
};

use async_trait::async_trait;
use fontdue::Font;
use image::{
    ExtendedColorType, ImageReader, Rgb, RgbImage, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use tracing::debug;

use crate::{
    application::collaborators::{CardRenderer, CollaboratorError},
    domain::card::TitleCard,
    infra::{error::InfraError, fonts::FontLibrary},
};

pub const CARD_WIDTH: u32 = 3200;
pub const CARD_HEIGHT: u32 = 1800;
const TITLE_PX: f32 = 150.0;
const EPISODE_TEXT_PX: f32 = 70.0;
const TITLE_BASELINE_FROM_BOTTOM: f32 = 300.0;
const LINE_SPACING: f32 = 1.15;
/// Fraction of the card height covered by the bottom shade.
const SHADE_FRACTION: f32 = 0.45;
const SHADE_STRENGTH: f32 = 0.75;

/// Draws the standard card layout: artwork filled to 16:9, a bottom shade,
/// the title and the season/episode line.
pub struct ImageCardRenderer {
    fonts: Arc<FontLibrary>,
    jpeg_quality: u8,
}

impl ImageCardRenderer {
    pub fn new(fonts: Arc<FontLibrary>, jpeg_quality: u8) -> Self {
        Self {
            fonts,
            jpeg_quality,
        }
    }

    fn render_blocking(&self, card: &TitleCard) -> Result<(), CollaboratorError> {
        // Synced artwork keeps a `.jpg` name whatever its real encoding is.
        let source = ImageReader::open(&card.source)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| InfraError::file(&card.source, err))?
            .decode()
            .map_err(|err| {
                CollaboratorError::Render(format!(
                    "source image `{}` could not be decoded: {err}",
                    card.source.display()
                ))
            })?;
        let mut canvas = source
            .resize_to_fill(CARD_WIDTH, CARD_HEIGHT, FilterType::Lanczos3)
            .to_rgb8();
        shade_bottom(&mut canvas);

        match self.fonts.resolve(&card.font) {
            Some(path) => {
                let font = self.fonts.load(path)?;
                draw_text(&mut canvas, &font, card);
            }
            None => debug!(
                target = "tcm_webui::infra::render",
                "no font configured; card rendered without text"
            ),
        }

        let file = File::create(&card.destination)
            .map_err(|err| InfraError::file(&card.destination, err))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
            .encode(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|err| CollaboratorError::Render(format!("JPEG encoding failed: {err}")))?;
        writer
            .flush()
            .map_err(|err| InfraError::file(&card.destination, err))?;
        Ok(())
    }
}

#[async_trait]
impl CardRenderer for ImageCardRenderer {
    async fn render(&self, card: &TitleCard) -> Result<(), CollaboratorError> {
        let renderer = Self {
            fonts: Arc::clone(&self.fonts),
            jpeg_quality: self.jpeg_quality,
        };
        let card = card.clone();
        tokio::task::spawn_blocking(move || renderer.render_blocking(&card))
            .await
            .map_err(|err| InfraError::join(err.to_string()))?
    }
}

fn shade_bottom(canvas: &mut RgbImage) {
    let height = canvas.height();
    let shade_start = (height as f32 * (1.0 - SHADE_FRACTION)) as u32;
    let span = (height - shade_start).max(1) as f32;

    for y in shade_start..height {
        let factor = 1.0 - SHADE_STRENGTH * ((y - shade_start) as f32 / span);
        for x in 0..canvas.width() {
            let Rgb([r, g, b]) = *canvas.get_pixel(x, y);
            canvas.put_pixel(
                x,
                y,
                Rgb([scale(r, factor), scale(g, factor), scale(b, factor)]),
            );
        }
    }
}

fn scale(channel: u8, factor: f32) -> u8 {
    (channel as f32 * factor).round().clamp(0.0, 255.0) as u8
}

fn draw_text(canvas: &mut RgbImage, font: &Font, card: &TitleCard) {
    let color = parse_color(&card.font.color);
    let title_px = TITLE_PX * card.font.size;
    let lines: Vec<&str> = card.title.lines().filter(|line| !line.trim().is_empty()).collect();

    let mut baseline = canvas.height() as f32 - TITLE_BASELINE_FROM_BOTTOM;
    // Multi-line titles grow upwards from the fixed bottom baseline.
    baseline -= title_px * LINE_SPACING * lines.len().saturating_sub(1) as f32;
    for line in &lines {
        draw_line(canvas, font, line, title_px, baseline, color);
        baseline += title_px * LINE_SPACING;
    }

    let episode_line = card.episode_line();
    let below_title = canvas.height() as f32 - TITLE_BASELINE_FROM_BOTTOM + EPISODE_TEXT_PX * 1.8;
    draw_line(
        canvas,
        font,
        &episode_line,
        EPISODE_TEXT_PX,
        below_title,
        color,
    );
}

/// Draw `text` horizontally centered with its baseline at `baseline`.
fn draw_line(canvas: &mut RgbImage, font: &Font, text: &str, px: f32, baseline: f32, color: [u8; 3]) {
    let width: f32 = text
        .chars()
        .map(|ch| font.metrics(ch, px).advance_width)
        .sum();
    let mut pen_x = (canvas.width() as f32 - width) / 2.0;

    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, px);
        let left = (pen_x + metrics.xmin as f32).round() as i64;
        let top = (baseline - metrics.height as f32 - metrics.ymin as f32).round() as i64;

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let coverage = bitmap[gy * metrics.width + gx];
                if coverage == 0 {
                    continue;
                }
                let x = left + gx as i64;
                let y = top + gy as i64;
                if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                blend(pixel, color, coverage);
            }
        }
        pen_x += metrics.advance_width;
    }
}

fn blend(pixel: &mut Rgb<u8>, color: [u8; 3], coverage: u8) {
    let alpha = coverage as f32 / 255.0;
    for (channel, target) in pixel.0.iter_mut().zip(color) {
        *channel = (*channel as f32 * (1.0 - alpha) + target as f32 * alpha).round() as u8;
    }
}

/// `#RGB`, `#RRGGBB`, or a handful of names; anything else is white.
fn parse_color(value: &str) -> [u8; 3] {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "black" => return [0, 0, 0],
        "white" => return [255, 255, 255],
        "red" => return [255, 0, 0],
        "yellow" => return [255, 255, 0],
        _ => {}
    }

    let hex = value.trim_start_matches('#');
    if !hex.is_ascii() {
        return [255, 255, 255];
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => hex.to_string(),
        _ => return [255, 255, 255],
    };
    let channel = |index: usize| u8::from_str_radix(&expanded[index..index + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => [r, g, b],
        _ => [255, 255, 255],
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::{series::FontSpec, values::ConfigMap};

    #[test]
    fn colors_parse_short_long_and_named() {
        assert_eq!(parse_color("#FFF"), [255, 255, 255]);
        assert_eq!(parse_color("#1a2B3c"), [0x1a, 0x2b, 0x3c]);
        assert_eq!(parse_color("Black"), [0, 0, 0]);
        assert_eq!(parse_color("#zzzzzz"), [255, 255, 255]);
        assert_eq!(parse_color("ééé"), [255, 255, 255]);
    }

    #[test]
    fn shade_darkens_only_the_bottom() {
        let mut canvas = RgbImage::from_pixel(10, 100, Rgb([200, 200, 200]));
        shade_bottom(&mut canvas);

        assert_eq!(canvas.get_pixel(0, 0), &Rgb([200, 200, 200]));
        assert!(canvas.get_pixel(0, 99).0[0] < 100);
    }

    #[tokio::test]
    async fn renders_a_jpeg_without_a_font() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("s1e1.png");
        RgbImage::from_pixel(64, 36, Rgb([10, 120, 200]))
            .save(&source)
            .expect("write source");
        let card = TitleCard {
            card_type: "standard".into(),
            title: "PILOT".into(),
            season_text: "Season 1".into(),
            episode_text: "EPISODE 1".into(),
            hide_season_text: false,
            font: FontSpec::default(),
            source,
            destination: dir.path().join("preview.jpg"),
            extras: ConfigMap::new(),
        };

        let renderer = ImageCardRenderer::new(Arc::new(FontLibrary::default()), 80);
        renderer.render(&card).await.expect("render");

        let written = image::open(&card.destination).expect("decode output");
        assert_eq!((written.width(), written.height()), (CARD_WIDTH, CARD_HEIGHT));
    }

    #[tokio::test]
    async fn undecodable_source_is_a_render_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("s1e1.jpg");
        std::fs::write(&source, b"not an image").expect("write");
        let card = TitleCard {
            card_type: "standard".into(),
            title: "PILOT".into(),
            season_text: String::new(),
            episode_text: String::new(),
            hide_season_text: true,
            font: FontSpec::default(),
            source,
            destination: PathBuf::from("/unused.jpg"),
            extras: ConfigMap::new(),
        };

        let renderer = ImageCardRenderer::new(Arc::new(FontLibrary::default()), 80);
        let err = renderer.render(&card).await.expect_err("bad source");
        assert!(matches!(err, CollaboratorError::Render(_)));
    }
}
