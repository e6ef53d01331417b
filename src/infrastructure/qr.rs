//! 登录二维码渲染：终端字符画与面板用的 SVG

use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};

use crate::errors::{BiliMateError, Result};

fn encode(content: &str) -> Result<QrCode> {
    QrCode::with_error_correction_level(content.as_bytes(), EcLevel::L)
        .map_err(|e| BiliMateError::LoginError(format!("cannot encode qrcode: {}", e)))
}

/// 终端显示用，深浅色对调以适配深色背景
pub fn render_terminal(content: &str) -> Result<String> {
    let code = encode(content)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

pub fn render_svg(content: &str, size: u32) -> Result<String> {
    let code = encode(content)?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(size, size)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}
