//! QR code rendering for BR Code payloads
//!
//! The payload string is placed in the QR code verbatim; banking apps scan it
//! and fill in the transfer.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::Luma;
use qrcode::QrCode;

use crate::{Error, Result};

/// QR code output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrFormat {
    /// PNG image bytes
    Png,
    /// SVG string
    Svg,
    /// Unicode art for terminal display
    Terminal,
}

/// Options for QR code generation. Every format keeps the standard quiet zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    pub format: QrFormat,
    /// Minimum image side in pixels (PNG only)
    pub size: u32,
}

impl QrOptions {
    pub fn png(size: u32) -> Self {
        Self {
            format: QrFormat::Png,
            size,
        }
    }

    pub fn svg() -> Self {
        Self {
            format: QrFormat::Svg,
            size: 0,
        }
    }

    pub fn terminal() -> Self {
        Self {
            format: QrFormat::Terminal,
            size: 0,
        }
    }
}

/// Render `payload` as a QR code in the requested format
pub fn render_qr(payload: &str, options: &QrOptions) -> Result<Vec<u8>> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| Error::QrCode(e.to_string()))?;

    match options.format {
        QrFormat::Png => render_png(&code, options.size),
        QrFormat::Svg => Ok(render_svg(&code).into_bytes()),
        QrFormat::Terminal => Ok(render_terminal(&code).into_bytes()),
    }
}

fn render_png(code: &QrCode, size: u32) -> Result<Vec<u8>> {
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build();

    let mut bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::L8,
    )
    .map_err(|e| Error::QrCode(format!("PNG encoding failed: {}", e)))?;

    Ok(bytes)
}

fn render_svg(code: &QrCode) -> String {
    code.render::<qrcode::render::svg::Color>().build()
}

fn render_terminal(code: &QrCode) -> String {
    code.render::<qrcode::render::unicode::Dense1x2>().build()
}

/// PNG QR code as a `data:` URI for embedding in HTML
pub fn qr_data_uri(payload: &str) -> Result<String> {
    let png = render_qr(payload, &QrOptions::png(256))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
