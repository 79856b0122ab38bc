//! 8-bit PNG output and input for regression images

use crate::error::{TestError, TestResult};
use png::{BitDepth, ColorType, Decoder, Encoder};
use runblob_core::Image;
use std::io::{BufRead, Seek, Write};

fn color_type(channels: usize) -> TestResult<ColorType> {
    match channels {
        1 => Ok(ColorType::Grayscale),
        2 => Ok(ColorType::GrayscaleAlpha),
        3 => Ok(ColorType::Rgb),
        4 => Ok(ColorType::Rgba),
        n => Err(TestError::UnsupportedLayout(format!("{} channels", n))),
    }
}

/// Write an image as an 8-bit PNG
pub fn write_png<W: Write>(image: &Image, writer: W) -> TestResult<()> {
    let mut encoder = Encoder::new(writer, image.width(), image.height());
    encoder.set_color(color_type(image.channels())?);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(|e| TestError::ImageWrite {
        path: String::new(),
        message: format!("PNG header error: {}", e),
    })?;
    writer
        .write_image_data(image.data())
        .map_err(|e| TestError::ImageWrite {
            path: String::new(),
            message: format!("PNG write error: {}", e),
        })
}

/// Read an 8-bit PNG written by [`write_png`]
pub fn read_png<R: BufRead + Seek>(reader: R) -> TestResult<Image> {
    let mut reader = Decoder::new(reader)
        .read_info()
        .map_err(|e| TestError::ImageDecode(format!("PNG decode error: {}", e)))?;

    let info = reader.info();
    let (width, height) = (info.width, info.height);
    let channels = match (info.color_type, info.bit_depth) {
        (ColorType::Grayscale, BitDepth::Eight) => 1,
        (ColorType::GrayscaleAlpha, BitDepth::Eight) => 2,
        (ColorType::Rgb, BitDepth::Eight) => 3,
        (ColorType::Rgba, BitDepth::Eight) => 4,
        (color, depth) => {
            return Err(TestError::UnsupportedLayout(format!(
                "PNG {:?} {:?}",
                color, depth
            )));
        }
    };

    let size = reader
        .output_buffer_size()
        .ok_or_else(|| TestError::ImageDecode("failed to get output buffer size".to_string()))?;
    let mut buf = vec![0; size];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| TestError::ImageDecode(format!("PNG frame error: {}", e)))?;
    buf.truncate(frame.buffer_size());
    Ok(Image::from_data(width, height, channels, buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_png_roundtrip_gray_alpha() {
        let mut image = Image::new(6, 4, 2).unwrap();
        for (i, v) in image.data_mut().iter_mut().enumerate() {
            *v = (i * 5) as u8;
        }
        let mut buffer = Vec::new();
        write_png(&image, &mut buffer).unwrap();
        let restored = read_png(Cursor::new(buffer)).unwrap();
        assert_eq!(restored, image);
    }

    #[test]
    fn test_png_rejects_five_channels() {
        let image = Image::new(2, 2, 4).unwrap();
        assert!(write_png(&image, Vec::new()).is_ok());
        assert!(color_type(5).is_err());
    }
}
