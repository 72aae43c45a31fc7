// Image XObject encoding: rasters and stamp images -> stream payloads

use std::io::Cursor;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use lopdf::{Object, Stream, dictionary};

use crate::error::WorkbenchError;
use crate::pdf::optimizer::deflate;

/// Encoded image data ready to become an image XObject.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub filter: &'static str,
    pub color_space: &'static str,
    pub bits_per_component: u8,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Builds the XObject stream; `smask` is the object id of a soft mask image.
    pub fn into_stream(self, smask: Option<lopdf::ObjectId>) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space,
            "BitsPerComponent" => self.bits_per_component as i64,
            "Filter" => self.filter,
        };
        if let Some(id) = smask {
            dict.set("SMask", Object::Reference(id));
        }
        Stream::new(dict, self.data)
    }
}

/// Encodes an RGB image to JPEG bytes at `quality` (1-100).
pub(crate) fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(WorkbenchError::embed(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

fn encode_gray_flate(gray: &GrayImage) -> crate::error::Result<EncodedImage> {
    Ok(EncodedImage {
        data: deflate(gray.as_raw())?,
        filter: "FlateDecode",
        color_space: "DeviceGray",
        bits_per_component: 8,
        width: gray.width(),
        height: gray.height(),
    })
}

/// Encodes a filtered page raster.
///
/// Monochrome filters are stored losslessly as DeviceGray; everything else
/// as a DeviceRGB JPEG.
pub fn encode_page_raster(
    raster: &RgbaImage,
    monochrome: bool,
    quality: u8,
) -> crate::error::Result<EncodedImage> {
    let dynamic = DynamicImage::ImageRgba8(raster.clone());
    if monochrome {
        return encode_gray_flate(&dynamic.to_luma8());
    }
    let rgb = dynamic.to_rgb8();
    Ok(EncodedImage {
        data: encode_rgb_to_jpeg(&rgb, quality)?,
        filter: "DCTDecode",
        color_space: "DeviceRGB",
        bits_per_component: 8,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Decoded stamp image: color channels plus an optional alpha soft mask.
#[derive(Debug, Clone)]
pub struct StampImage {
    pub color: EncodedImage,
    pub alpha: Option<EncodedImage>,
}

/// Decodes watermark image bytes (any format `image` understands).
pub fn decode_stamp_image(data: &[u8]) -> crate::error::Result<StampImage> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| WorkbenchError::embed(format!("cannot decode watermark image: {e}")))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(WorkbenchError::embed("watermark image has zero size"));
    }
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let rgb = DynamicImage::ImageRgba8(rgba.clone()).to_rgb8();
    let color = EncodedImage {
        data: deflate(rgb.as_raw())?,
        filter: "FlateDecode",
        color_space: "DeviceRGB",
        bits_per_component: 8,
        width,
        height,
    };

    let alpha = if rgba.pixels().any(|p| p.0[3] < 255) {
        let mask = GrayImage::from_fn(width, height, |x, y| image::Luma([rgba.get_pixel(x, y).0[3]]));
        Some(encode_gray_flate(&mask)?)
    } else {
        None
    };

    Ok(StampImage { color, alpha })
}
