//! Binary PPM (`P6`) images, used for tile templates and debug artifacts.

use std::fs;
use std::io::Write;
use std::path::Path;

use ndarray::Array2;

use super::{Frame, Rgb};
use crate::*;

pub fn decode_ppm(bytes: &[u8]) -> Result<Frame> {
    let mut pos = 0;
    let magic = header_token(bytes, &mut pos)?;
    if magic != b"P6" {
        return Err(SweepError::InvalidImage("not a binary PPM".into()));
    }

    let width = header_number(bytes, &mut pos)?;
    let height = header_number(bytes, &mut pos)?;
    let max_value = header_number(bytes, &mut pos)?;
    if max_value == 0 || max_value > 255 {
        return Err(SweepError::InvalidImage(format!(
            "unsupported max value {}",
            max_value
        )));
    }
    // exactly one whitespace byte separates the header from the raster
    pos += 1;

    let len = width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| SweepError::InvalidImage("image too large".into()))?;
    let end = pos
        .checked_add(len)
        .ok_or_else(|| SweepError::InvalidImage("image too large".into()))?;
    let raster = bytes
        .get(pos..end)
        .ok_or_else(|| SweepError::InvalidImage("truncated raster".into()))?;

    let pixels = raster
        .chunks_exact(3)
        .map(|px| Rgb(px[0], px[1], px[2]))
        .collect();
    let pixels = Array2::from_shape_vec([height, width], pixels)
        .map_err(|err| SweepError::InvalidImage(err.to_string()))?;
    Ok(Frame::from_pixels(pixels))
}

pub fn encode_ppm(frame: &Frame, out: &mut impl Write) -> Result<()> {
    write!(out, "P6\n{} {}\n255\n", frame.width(), frame.height())?;
    let raster: Vec<u8> = frame
        .pixels()
        .iter()
        .flat_map(|&Rgb(r, g, b)| [r, g, b])
        .collect();
    out.write_all(&raster)?;
    Ok(())
}

pub fn load_ppm(path: &Path) -> Result<Frame> {
    decode_ppm(&fs::read(path)?)
}

pub fn save_ppm(frame: &Frame, path: &Path) -> Result<()> {
    let mut file = std::io::BufWriter::new(fs::File::create(path)?);
    encode_ppm(frame, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Loads every `.ppm` file in `dir`, sorted by name. Unreadable files are skipped.
pub fn load_templates(dir: &Path) -> Result<Vec<Frame>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "ppm"))
        .collect();
    paths.sort();

    let mut templates = Vec::with_capacity(paths.len());
    for path in paths {
        match load_ppm(&path) {
            Ok(frame) => templates.push(frame),
            Err(err) => log::warn!("skipping template {}: {}", path.display(), err),
        }
    }
    log::debug!("loaded {} template(s) from {}", templates.len(), dir.display());
    Ok(templates)
}

fn header_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    loop {
        match bytes.get(*pos) {
            Some(b'#') => {
                while bytes.get(*pos).is_some_and(|&b| b != b'\n') {
                    *pos += 1;
                }
            }
            Some(b) if b.is_ascii_whitespace() => *pos += 1,
            Some(_) => break,
            None => return Err(SweepError::InvalidImage("truncated header".into())),
        }
    }

    let start = *pos;
    while bytes.get(*pos).is_some_and(|b| !b.is_ascii_whitespace()) {
        *pos += 1;
    }
    Ok(&bytes[start..*pos])
}

fn header_number(bytes: &[u8], pos: &mut usize) -> Result<usize> {
    let token = header_token(bytes, pos)?;
    core::str::from_utf8(token)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| SweepError::InvalidImage("bad header number".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_frame_decodes_identically() {
        let mut frame = Frame::new(3, 2, Rgb(1, 2, 3));
        frame.fill_rect((1, 1), 1, 1, Rgb(200, 100, 50));

        let mut bytes = Vec::new();
        encode_ppm(&frame, &mut bytes).unwrap();

        assert!(bytes.starts_with(b"P6\n3 2\n255\n"));
        assert_eq!(decode_ppm(&bytes).unwrap(), frame);
    }

    #[test]
    fn header_comments_are_skipped() {
        let mut bytes = b"P6\n# made by hand\n1 1\n255\n".to_vec();
        bytes.extend_from_slice(&[9, 8, 7]);

        let frame = decode_ppm(&bytes).unwrap();

        assert_eq!(frame.pixel((0, 0)), Some(Rgb(9, 8, 7)));
    }

    #[test]
    fn truncated_raster_is_rejected() {
        let bytes = b"P6 2 2 255\n\x01\x02\x03".to_vec();
        assert!(matches!(decode_ppm(&bytes), Err(SweepError::InvalidImage(_))));
    }

    #[test]
    fn oversized_header_is_rejected() {
        assert!(matches!(
            decode_ppm(b"P6 18446744073709551615 2 255\n\0\0\0"),
            Err(SweepError::InvalidImage(_))
        ));
        assert!(matches!(
            decode_ppm(b"P6 6148914691236517205 1 255\n\0\0\0"),
            Err(SweepError::InvalidImage(_))
        ));
    }

    #[test]
    fn ascii_ppm_is_rejected() {
        assert!(matches!(
            decode_ppm(b"P3 1 1 255\n0 0 0"),
            Err(SweepError::InvalidImage(_))
        ));
    }
}
