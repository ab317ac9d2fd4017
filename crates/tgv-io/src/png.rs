use std::{fs, fs::File, path::Path};

use png::{BitDepth, ColorType, Decoder, Encoder, Transformations};
use tgv_image::{Image, ImageSize};

use crate::error::IoError;

/// Read a PNG image as RGBA (rgba8).
///
/// Grayscale, grayscale-alpha, palette and RGB files are expanded to four
/// channels with an opaque alpha where the file has none; 16-bit samples are
/// stripped to 8 bits.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A RGBA image with four channels (rgba8).
pub fn read_image_png_rgba8(file_path: impl AsRef<Path>) -> Result<Image<u8, 4>, IoError> {
    let (buf, size, color_type) = read_png_impl(file_path)?;

    let rgba = match color_type {
        ColorType::Rgba => buf,
        ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
            .collect(),
        ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, u8::MAX]).collect(),
        ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        other => return Err(IoError::UnsupportedColorType(format!("{other:?}"))),
    };

    Ok(Image::new(size, rgba)?)
}

/// Writes the given PNG _(rgba8)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image containing the RGBA data.
pub fn write_image_png_rgba8(
    file_path: impl AsRef<Path>,
    image: &Image<u8, 4>,
) -> Result<(), IoError> {
    write_png_impl(
        file_path,
        image.as_slice(),
        image.size(),
        BitDepth::Eight,
        ColorType::Rgba,
    )
}

/// Dump a luminance buffer to an 8-bit grayscale PNG for inspection.
///
/// Luminance values `0..=765` are divided by three, so a grey pixel of the
/// source frame keeps its original intensity.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The luminance image.
pub fn write_luminance_png(
    file_path: impl AsRef<Path>,
    image: &Image<u16, 1>,
) -> Result<(), IoError> {
    let file_path = file_path.as_ref();
    let gray: Vec<u8> = image
        .as_slice()
        .iter()
        .map(|&l| (l / 3).min(u8::MAX as u16) as u8)
        .collect();

    log::debug!(
        "writing luminance dump {} ({})",
        file_path.display(),
        image.size()
    );

    write_png_impl(
        file_path,
        &gray,
        image.size(),
        BitDepth::Eight,
        ColorType::Grayscale,
    )
}

// utility function to read the png file
fn read_png_impl(file_path: impl AsRef<Path>) -> Result<(Vec<u8>, ImageSize, ColorType), IoError> {
    // verify the file exists
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    // verify the file extension
    if let Some(extension) = file_path.extension() {
        if extension != "png" {
            return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
        }
    } else {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let file = fs::File::open(file_path)?;
    let mut decoder = Decoder::new(file);
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);

    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
    buf.truncate(info.buffer_size());

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };

    Ok((buf, size, info.color_type))
}

fn write_png_impl(
    file_path: impl AsRef<Path>,
    image_data: &[u8],
    image_size: ImageSize,
    // Make sure you set `depth` correctly
    depth: BitDepth,
    color_type: ColorType,
) -> Result<(), IoError> {
    let file = File::create(file_path)?;

    let mut encoder = Encoder::new(file, image_size.width as u32, image_size.height as u32);
    encoder.set_color(color_type);
    encoder.set_depth(depth);

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .write_image_data(image_data)
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    Ok(())
}
