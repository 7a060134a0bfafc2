//! Image normalisation for transport: bounded-width JPEG data URLs.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

pub const RESIZE_JPEG_QUALITY: u8 = 85;
pub const RENDER_JPEG_QUALITY: u8 = 90;

/// Raw bytes of a referenced image plus whatever mime type the source
/// declared.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// The two ways a non-inline image reference can be turned into pixels.
pub trait ImageSource: Send + Sync {
    /// Reads the referenced bytes verbatim.
    fn fetch(&self, reference: &str) -> Result<FetchedImage>;

    /// Loads and decodes the reference into pixels.
    fn render(&self, reference: &str) -> Result<DynamicImage>;
}

/// Remote URLs over HTTP, anything else as a local path.
pub struct DefaultImageSource {
    http: HttpClient,
    timeout: Duration,
}

impl DefaultImageSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(),
            timeout,
        }
    }
}

impl ImageSource for DefaultImageSource {
    fn fetch(&self, reference: &str) -> Result<FetchedImage> {
        if !is_remote(reference) {
            let path = Path::new(reference);
            let bytes =
                fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
            return Ok(FetchedImage {
                bytes,
                mime_type: mime_for_path(path).map(str::to_string),
            });
        }
        let response = self
            .http
            .get(reference)
            .timeout(self.timeout)
            .send()
            .with_context(|| format!("image fetch failed ({reference})"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("Failed to fetch image ({}): {reference}", status.as_u16());
        }
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| value.starts_with("image/"));
        let bytes = response
            .bytes()
            .with_context(|| format!("image body read failed ({reference})"))?
            .to_vec();
        Ok(FetchedImage { bytes, mime_type })
    }

    fn render(&self, reference: &str) -> Result<DynamicImage> {
        if !is_remote(reference) {
            return image::open(reference).with_context(|| format!("failed to load {reference}"));
        }
        let bytes = self
            .http
            .get(reference)
            .header(ACCEPT, "image/*")
            .timeout(self.timeout)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .with_context(|| format!("failed to load {reference}"))?;
        image::load_from_memory(&bytes).with_context(|| format!("failed to decode {reference}"))
    }
}

pub struct ImageCodec {
    source: Box<dyn ImageSource>,
}

impl ImageCodec {
    pub fn new(timeout: Duration) -> Self {
        Self::with_source(DefaultImageSource::new(timeout))
    }

    pub fn with_source<S: ImageSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Scales an inline image down to `max_width` (keeping aspect ratio) and
    /// re-encodes it as JPEG. Returns the input untouched when it cannot be
    /// decoded or encoded.
    pub fn resize(&self, image: &str, max_width: u32) -> String {
        match resize_data_url(image, max_width) {
            Ok(resized) => resized,
            Err(err) => {
                tracing::debug!("resize skipped, keeping original image: {err:#}");
                image.to_string()
            }
        }
    }

    /// Turns any image reference into an inline data URL.
    ///
    /// Data URLs pass through. Other references are first fetched verbatim;
    /// if that fails they are loaded, decoded and re-encoded as JPEG. Only
    /// when both routes fail is an error returned.
    pub fn to_canonical_encoding(&self, source: &str) -> Result<String> {
        if is_data_url(source) {
            return Ok(source.to_string());
        }

        let fetch_err = match self.source.fetch(source) {
            Ok(fetched) => {
                let mime = fetched
                    .mime_type
                    .or_else(|| sniff_mime(&fetched.bytes).map(str::to_string))
                    .unwrap_or_else(|| "image/jpeg".to_string());
                return Ok(to_data_url(&mime, &fetched.bytes));
            }
            Err(err) => err,
        };
        tracing::debug!("direct fetch failed for {source}, falling back to render: {fetch_err:#}");

        let rendered = self
            .source
            .render(source)
            .and_then(|image| encode_jpeg(&image, RENDER_JPEG_QUALITY));
        match rendered {
            Ok(bytes) => Ok(to_data_url("image/jpeg", &bytes)),
            Err(render_err) => Err(anyhow!(
                "Failed to convert image to base64 ({source}): fetch: {fetch_err:#}; render: {render_err:#}"
            )),
        }
    }
}

fn resize_data_url(image: &str, max_width: u32) -> Result<String> {
    let (_, payload) = split_data_url(image).ok_or_else(|| anyhow!("not an inline image"))?;
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("image base64 decode failed")?;
    let decoded = image::load_from_memory(&bytes).context("image decode failed")?;
    let (width, height) = decoded.dimensions();
    let scaled = if width > max_width && max_width > 0 {
        let new_height = ((height as f64) * (max_width as f64) / (width as f64))
            .round()
            .max(1.0) as u32;
        decoded.resize_exact(max_width, new_height, FilterType::Triangle)
    } else {
        decoded
    };
    let encoded = encode_jpeg(&scaled, RESIZE_JPEG_QUALITY)?;
    Ok(to_data_url("image/jpeg", &encoded))
}

/// JPEG has no alpha; transparent pixels are composited onto white first.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8 };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    let rgb = DynamicImage::ImageRgba8(flattened).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&DynamicImage::ImageRgb8(rgb))
        .context("jpeg encode failed")?;
    Ok(bytes)
}

pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

fn is_remote(reference: &str) -> bool {
    let lowered = reference.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Splits `data:{mime};base64,{payload}` into its mime type and payload.
pub fn split_data_url(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.split(';').next().unwrap_or_default();
    Some((mime, payload))
}

/// The base64 payload of a data URL, or the input when it carries no header.
pub fn strip_data_url(value: &str) -> &str {
    match value.split_once(',') {
        Some((_, payload)) => payload,
        None => value,
    }
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Width and height of an inline image, if it decodes.
pub fn image_dimensions(data_url: &str) -> Option<(u32, u32)> {
    let (_, payload) = split_data_url(data_url)?;
    let bytes = BASE64.decode(payload.trim().as_bytes()).ok()?;
    image::load_from_memory(&bytes)
        .ok()
        .map(|image| image.dimensions())
}

/// Decoded bytes of an inline image.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let (mime, payload) =
        split_data_url(data_url).ok_or_else(|| anyhow!("not an inline image"))?;
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("image base64 decode failed")?;
    Ok((mime.to_string(), bytes))
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())?;
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" | "heif" => Some("image/heic"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let lowered = mime.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    if lowered.contains("gif") {
        return "gif";
    }
    "png"
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use anyhow::bail;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::*;

    pub(crate) fn png_data_url(width: u32, height: u32) -> String {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap_or_default();
        to_data_url("image/png", bytes.get_ref())
    }

    struct RenderOnlySource;

    impl ImageSource for RenderOnlySource {
        fn fetch(&self, _reference: &str) -> Result<FetchedImage> {
            bail!("blocked by cross-origin policy")
        }

        fn render(&self, _reference: &str) -> Result<DynamicImage> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                4,
                4,
                Rgb([0, 0, 0]),
            )))
        }
    }

    struct BrokenSource;

    impl ImageSource for BrokenSource {
        fn fetch(&self, _reference: &str) -> Result<FetchedImage> {
            bail!("fetch refused")
        }

        fn render(&self, _reference: &str) -> Result<DynamicImage> {
            bail!("render refused")
        }
    }

    #[test]
    fn resize_scales_wide_images_proportionally() {
        let codec = ImageCodec::with_source(BrokenSource);
        let resized = codec.resize(&png_data_url(1600, 1000), 800);
        assert!(resized.starts_with("data:image/jpeg;base64,"));
        assert_eq!(image_dimensions(&resized), Some((800, 500)));
    }

    #[test]
    fn resize_keeps_dimensions_of_narrow_images() {
        let codec = ImageCodec::with_source(BrokenSource);
        let resized = codec.resize(&png_data_url(320, 240), 800);
        assert_eq!(image_dimensions(&resized), Some((320, 240)));
        assert!(resized.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn resize_returns_undecodable_input_unchanged() {
        let codec = ImageCodec::with_source(BrokenSource);
        let garbage = "data:image/jpeg;base64,bm90IGFuIGltYWdl";
        assert_eq!(codec.resize(garbage, 800), garbage);
        assert_eq!(codec.resize("/images/heels.jpg", 800), "/images/heels.jpg");
    }

    #[test]
    fn canonical_encoding_passes_data_urls_through() -> anyhow::Result<()> {
        let codec = ImageCodec::with_source(BrokenSource);
        let inline = png_data_url(2, 2);
        assert_eq!(codec.to_canonical_encoding(&inline)?, inline);
        Ok(())
    }

    #[test]
    fn canonical_encoding_reads_local_files() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("shirt.png");
        RgbImage::from_pixel(3, 5, Rgb([10, 20, 30])).save(&path)?;

        let codec = ImageCodec::new(Duration::from_secs(5));
        let encoded = codec.to_canonical_encoding(&path.to_string_lossy())?;
        assert!(encoded.starts_with("data:image/png;base64,"));
        assert_eq!(image_dimensions(&encoded), Some((3, 5)));
        Ok(())
    }

    #[test]
    fn canonical_encoding_falls_back_to_render() -> anyhow::Result<()> {
        let codec = ImageCodec::with_source(RenderOnlySource);
        let encoded = codec.to_canonical_encoding("https://cdn.example.com/coat.jpg")?;
        assert!(encoded.starts_with("data:image/jpeg;base64,"));
        assert_eq!(image_dimensions(&encoded), Some((4, 4)));
        Ok(())
    }

    #[test]
    fn canonical_encoding_fails_when_both_routes_fail() {
        let codec = ImageCodec::with_source(BrokenSource);
        let err = codec
            .to_canonical_encoding("https://cdn.example.com/coat.jpg")
            .err()
            .map(|err| format!("{err:#}"))
            .unwrap_or_default();
        assert!(err.contains("fetch refused"));
        assert!(err.contains("render refused"));
    }

    #[test]
    fn data_url_helpers() {
        assert_eq!(
            split_data_url("data:image/webp;base64,QUJD"),
            Some(("image/webp", "QUJD"))
        );
        assert_eq!(split_data_url("QUJD"), None);
        assert_eq!(strip_data_url("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url("QUJD"), "QUJD");
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/png"), "png");
    }
}
