//! 图像归一化
//!
//! 在送入文本识别后端前修正单页图像：
//! 1. 按 EXIF 方向元数据转正（手机拍照常见）
//! 2. 横向图片再旋转 90°，输出一律为纵向——答题页默认竖排书写，
//!    这是面向本领域的策略，不是通用变换
//! 3. 统一重编码为固定质量的 JPEG，约束下游载荷大小
//!
//! 任何处理失败（图片损坏、编码不支持）都不报错，而是原样放行
//! （fail-open）：让识别后端尽力处理原始数据。可用性优先于保真度。

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat};
use tracing::warn;

use crate::errors::Result;

/// 归一化输出的 JPEG 质量
pub const NORMALIZED_JPEG_QUALITY: u8 = 80;

/// 归一化结果
///
/// 用和类型显式区分“处理成功”与“原样放行”，测试与调用方可以
/// 分辨两种路径，而不是把失败静默吞掉。
#[derive(Debug, Clone)]
pub enum Normalized {
    /// 已转正并重编码为 JPEG
    Processed { data: Vec<u8>, content_type: String },
    /// 未处理，保留原始数据与 MIME 类型
    Passthrough { data: Vec<u8>, content_type: String },
}

impl Normalized {
    pub fn data(&self) -> &[u8] {
        match self {
            Normalized::Processed { data, .. } => data,
            Normalized::Passthrough { data, .. } => data,
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Normalized::Processed { content_type, .. } => content_type,
            Normalized::Passthrough { content_type, .. } => content_type,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Normalized::Processed { .. })
    }
}

/// 归一化单页
///
/// 非图像输入（如 PDF）直接放行。
pub fn normalize_page(data: Vec<u8>, content_type: &str) -> Normalized {
    if !content_type.starts_with("image/") {
        return Normalized::Passthrough {
            data,
            content_type: content_type.to_string(),
        };
    }

    match try_normalize(&data) {
        Ok(jpeg) => Normalized::Processed {
            data: jpeg,
            content_type: "image/jpeg".to_string(),
        },
        Err(e) => {
            warn!("图像归一化失败，原样放行: {}", e);
            Normalized::Passthrough {
                data,
                content_type: content_type.to_string(),
            }
        }
    }
}

fn try_normalize(data: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data)?;

    // EXIF 转正
    let orientation = read_exif_orientation(data);
    let img = apply_orientation(img, orientation);

    // 横向照片旋转为纵向
    let img = if img.width() > img.height() {
        img.rotate90()
    } else {
        img
    };

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Jpeg(NORMALIZED_JPEG_QUALITY))?;
    Ok(out.into_inner())
}

/// 读取 EXIF 方向标签（0x0112），无 EXIF 或读取失败时返回 1（默认方向）
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// 按 EXIF 方向值施加对应变换
///
/// EXIF 方向值含义: 1=原样 2=水平翻转 3=旋转180 4=垂直翻转
/// 5=转90+翻转 6=转90 7=转270+翻转 8=转270
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgb([120u8, 130, 140]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn decoded_dimensions(normalized: &Normalized) -> (u32, u32) {
        let img = image::load_from_memory(normalized.data()).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_landscape_becomes_portrait() {
        let data = encode_png(200, 100);
        let result = normalize_page(data, "image/png");
        assert!(result.is_processed());
        assert_eq!(result.content_type(), "image/jpeg");
        let (w, h) = decoded_dimensions(&result);
        assert!(h > w, "expected portrait output, got {w}x{h}");
    }

    #[test]
    fn test_portrait_orientation_unchanged() {
        let data = encode_png(100, 200);
        let result = normalize_page(data, "image/png");
        assert!(result.is_processed());
        let (w, h) = decoded_dimensions(&result);
        assert_eq!((w, h), (100, 200));
    }

    #[test]
    fn test_corrupt_image_fails_open() {
        let garbage = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11];
        let result = normalize_page(garbage.clone(), "image/jpeg");
        assert!(!result.is_processed());
        assert_eq!(result.data(), garbage.as_slice());
        assert_eq!(result.content_type(), "image/jpeg");
    }

    #[test]
    fn test_non_image_passthrough() {
        let pdf = b"%PDF-1.7 fake".to_vec();
        let result = normalize_page(pdf.clone(), "application/pdf");
        assert!(!result.is_processed());
        assert_eq!(result.data(), pdf.as_slice());
        assert_eq!(result.content_type(), "application/pdf");
    }

    #[test]
    fn test_apply_orientation_rotates() {
        let img = image::load_from_memory(&encode_png(30, 10)).unwrap();
        let rotated = apply_orientation(img, 6);
        assert_eq!((rotated.width(), rotated.height()), (10, 30));
    }

    #[test]
    fn test_missing_exif_defaults_to_identity() {
        // PNG 没有 EXIF 容器
        assert_eq!(read_exif_orientation(&encode_png(10, 10)), 1);
    }
}
