//! Image metadata, palette and contrast heuristics, OCR, and similarity.
//!
//! Colours are quantized to multiples of 32 per channel. At most 12 distinct
//! quantized colours reads as a chart; a greyscale standard deviation above 50
//! reads as a text region.

use ::image::imageops::FilterType;
use ::image::{ColorType, DynamicImage, ImageReader};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use super::{DocumentParser, IngestError, ParsedContent};
use crate::config::KnowledgeConfig;
use crate::knowledge::DocFlag;

const THUMBNAIL_SIDE: u32 = 50;
const SAMPLE_PIXELS: usize = 1000;
const TOP_COLORS: usize = 5;
const CHART_MAX_COLORS: usize = 12;
const TEXT_STDDEV_THRESHOLD: f64 = 50.0;
const COMPARE_SIDE: u32 = 100;
const SIMILAR_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysis {
    pub path: String,
    pub filename: String,
    pub format: String,
    pub mode: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub size_bytes: u64,
    pub is_chart: bool,
    pub dominant_colors: Vec<String>,
    pub has_text: bool,
    pub timestamp: String,
}

impl ImageAnalysis {
    /// Human-readable description stored as the document text.
    pub fn describe(&self) -> String {
        format!(
            "Image {} {}x{} ({}), aspect ratio {}\nDominant colours: {}\nChart-like palette: {}\nText region: {}",
            self.format,
            self.width,
            self.height,
            self.mode,
            self.aspect_ratio,
            self.dominant_colors.join(", "),
            yes_no(self.is_chart),
            yes_no(self.has_text),
        )
    }

    pub fn flags(&self) -> Vec<DocFlag> {
        let mut flags = Vec::new();
        if self.is_chart {
            flags.push(DocFlag::Chart);
        }
        if self.has_text {
            flags.push(DocFlag::TextRegion);
        }
        flags
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    pub text: String,
    pub text_length: usize,
    pub has_chinese: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageComparison {
    pub image1: String,
    pub image2: String,
    pub similarity: f64,
    pub is_similar: bool,
}

pub struct ImageParser;

impl DocumentParser for ImageParser {
    fn name(&self) -> &'static str {
        "image"
    }

    fn parse(&self, path: &Path) -> Result<ParsedContent, IngestError> {
        let analysis = analyze_image(path)?;
        Ok(ParsedContent {
            text: analysis.describe(),
            page_count: None,
            flags: analysis.flags(),
        })
    }
}

pub fn analyze_image(path: &Path) -> Result<ImageAnalysis, IngestError> {
    let size_bytes = std::fs::metadata(path)
        .map_err(|e| IngestError::read(path, e))?
        .len();
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| IngestError::read(path, e))?;
    let format = reader
        .format()
        .map(|f| format!("{f:?}").to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".into());
    let img = reader.decode().map_err(|source| IngestError::Image {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = (img.width(), img.height());
    let dominant = dominant_colors(&img);
    let analysis = ImageAnalysis {
        path: path.to_string_lossy().into_owned(),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        format,
        mode: color_mode(img.color()).to_string(),
        width,
        height,
        aspect_ratio: round_to(width as f64 / height.max(1) as f64, 2),
        size_bytes,
        is_chart: dominant.distinct <= CHART_MAX_COLORS,
        dominant_colors: dominant.top,
        has_text: luma_stddev(&img) > TEXT_STDDEV_THRESHOLD,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    debug!(path = %path.display(), width, height, is_chart = analysis.is_chart, "image analyzed");
    Ok(analysis)
}

pub(crate) struct Palette {
    pub top: Vec<String>,
    pub distinct: usize,
}

/// Top quantized colours from a 50×50 thumbnail, sampling the first 1000 pixels.
pub(crate) fn dominant_colors(img: &DynamicImage) -> Palette {
    let thumb = img
        .resize_exact(THUMBNAIL_SIDE, THUMBNAIL_SIDE, FilterType::Triangle)
        .to_rgb8();

    // first-seen order breaks count ties
    let mut counts: Vec<([u8; 3], usize)> = Vec::new();
    for pixel in thumb.pixels().take(SAMPLE_PIXELS) {
        let q = [
            quantize(pixel.0[0]),
            quantize(pixel.0[1]),
            quantize(pixel.0[2]),
        ];
        match counts.iter_mut().find(|(c, _)| *c == q) {
            Some((_, n)) => *n += 1,
            None => counts.push((q, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    Palette {
        distinct: counts.len(),
        top: counts
            .iter()
            .take(TOP_COLORS)
            .map(|([r, g, b], _)| format!("#{r:02x}{g:02x}{b:02x}"))
            .collect(),
    }
}

fn quantize(c: u8) -> u8 {
    (c / 32) * 32
}

/// Population standard deviation of the greyscale image.
pub(crate) fn luma_stddev(img: &DynamicImage) -> f64 {
    let gray = img.to_luma8();
    let n = gray.width() as usize * gray.height() as usize;
    if n == 0 {
        return 0.0;
    }
    let mean = gray.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n as f64;
    let var = gray
        .pixels()
        .map(|p| {
            let d = p.0[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    var.sqrt()
}

fn color_mode(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 => "L",
        ColorType::La8 | ColorType::La16 => "LA",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA",
        _ => "unknown",
    }
}

/// Resize both images to 100×100 RGB and score `1 − Σ|Δ| / (255·3·100·100)`.
pub fn compare_images(a: &Path, b: &Path) -> Result<ImageComparison, IngestError> {
    let img_a = open_image(a)?;
    let img_b = open_image(b)?;
    let similarity = similarity(&img_a, &img_b);
    Ok(ImageComparison {
        image1: a.to_string_lossy().into_owned(),
        image2: b.to_string_lossy().into_owned(),
        similarity,
        is_similar: similarity > SIMILAR_THRESHOLD,
    })
}

pub(crate) fn similarity(a: &DynamicImage, b: &DynamicImage) -> f64 {
    let pa = a
        .resize_exact(COMPARE_SIDE, COMPARE_SIDE, FilterType::Triangle)
        .to_rgb8();
    let pb = b
        .resize_exact(COMPARE_SIDE, COMPARE_SIDE, FilterType::Triangle)
        .to_rgb8();

    let diff: u64 = pa
        .as_raw()
        .iter()
        .zip(pb.as_raw())
        .map(|(x, y)| x.abs_diff(*y) as u64)
        .sum();
    let max_diff = 255.0 * 3.0 * (COMPARE_SIDE * COMPARE_SIDE) as f64;
    round_to(1.0 - diff as f64 / max_diff, 4)
}

fn open_image(path: &Path) -> Result<DynamicImage, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    ::image::open(path).map_err(|source| IngestError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the configured OCR binary (tesseract) and capture stdout.
pub async fn extract_text(path: &Path, config: &KnowledgeConfig) -> Result<OcrResult, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }

    let output = tokio::process::Command::new(&config.ocr_command)
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(&config.ocr_languages)
        .output()
        .await
        .map_err(|e| IngestError::Ocr(format!("could not run {}: {e}", config.ocr_command)))?;

    if !output.status.success() {
        return Err(IngestError::Ocr(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(ocr_result(String::from_utf8_lossy(&output.stdout).into_owned()))
}

pub(crate) fn ocr_result(text: String) -> OcrResult {
    OcrResult {
        text_length: text.chars().count(),
        has_chinese: text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)),
        text,
    }
}

fn round_to(x: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (x * f).round() / f
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgb, RgbImage};

    fn split_image(w: u32, h: u32, left: [u8; 3], right: [u8; 3]) -> DynamicImage {
        let img = RgbImage::from_fn(w, h, |x, _| if x < w / 2 { Rgb(left) } else { Rgb(right) });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn two_tone_image_is_chart_like() {
        let img = split_image(100, 100, [255, 0, 0], [0, 0, 255]);
        let palette = dominant_colors(&img);
        assert!(palette.distinct <= CHART_MAX_COLORS);
        assert!(palette.top.contains(&"#e00000".to_string()));
        assert!(palette.top.contains(&"#0000e0".to_string()));
    }

    #[test]
    fn noisy_image_is_not_chart_like() {
        let img = RgbImage::from_fn(50, 50, |x, y| {
            Rgb([(x * 5) as u8, (y * 5) as u8, ((x * y) % 256) as u8])
        });
        let palette = dominant_colors(&DynamicImage::ImageRgb8(img));
        assert!(palette.distinct > CHART_MAX_COLORS);
        assert_eq!(palette.top.len(), TOP_COLORS);
    }

    #[test]
    fn contrast_heuristic() {
        let black_white = split_image(40, 40, [0, 0, 0], [255, 255, 255]);
        assert!(luma_stddev(&black_white) > TEXT_STDDEV_THRESHOLD);

        let flat = split_image(40, 40, [120, 120, 120], [120, 120, 120]);
        assert!(luma_stddev(&flat) < 1.0);
    }

    #[test]
    fn similarity_bounds() {
        let white = split_image(60, 60, [255, 255, 255], [255, 255, 255]);
        let black = split_image(60, 60, [0, 0, 0], [0, 0, 0]);
        assert_eq!(similarity(&white, &white), 1.0);
        assert_eq!(similarity(&white, &black), 0.0);
    }

    #[test]
    fn analyze_png_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        split_image(200, 100, [0, 0, 0], [255, 255, 255])
            .save(&path)
            .unwrap();

        let analysis = analyze_image(&path).unwrap();
        assert_eq!(analysis.format, "PNG");
        assert_eq!(analysis.mode, "RGB");
        assert_eq!((analysis.width, analysis.height), (200, 100));
        assert_eq!(analysis.aspect_ratio, 2.0);
        assert!(analysis.is_chart);
        assert!(analysis.has_text);
        assert_eq!(analysis.flags(), vec![DocFlag::Chart, DocFlag::TextRegion]);
    }

    #[test]
    fn compare_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        split_image(80, 80, [10, 20, 30], [200, 200, 200]).save(&a).unwrap();
        split_image(80, 80, [12, 20, 30], [200, 200, 198]).save(&b).unwrap();

        let cmp = compare_images(&a, &b).unwrap();
        assert!(cmp.is_similar);
        assert!(cmp.similarity > 0.99);
    }

    #[test]
    fn ocr_result_detects_cjk() {
        let r = ocr_result("Revenue 收入 up".into());
        assert!(r.has_chinese);
        assert_eq!(r.text_length, 13);
        assert!(!ocr_result("plain".into()).has_chinese);
    }

    #[test]
    fn not_an_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"nope").unwrap();
        assert!(analyze_image(&path).is_err());
    }
}
