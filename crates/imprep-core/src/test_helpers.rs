//! Shared test fixtures.
//!
//! `write_exif_jpeg` emits the smallest file the EXIF reader accepts: a JPEG
//! SOI marker, one APP1 `Exif` segment carrying a little-endian TIFF block,
//! and EOI. It has no pixel data, which is fine for everything except
//! previews (those tests encode real images with the `image` crate).

use std::path::Path;

/// Tags written into a fixture file. `None` fields are omitted.
#[derive(Debug, Clone, Default)]
pub struct ExifFixture {
    pub make: Option<String>,
    pub model: Option<String>,
    pub date_time_original: Option<String>,
    /// (numerator, denominator)
    pub focal_length: Option<(u32, u32)>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ExifFixture {
    /// A DJI Phantom 4 Pro frame.
    pub fn dji(date_time: &str) -> Self {
        Self {
            make: Some("DJI".into()),
            model: Some("FC6310".into()),
            date_time_original: Some(date_time.into()),
            focal_length: Some((88, 10)),
            width: Some(5472),
            height: Some(3648),
        }
    }

    /// Timestamp only; no camera description.
    pub fn timestamp_only(date_time: &str) -> Self {
        Self {
            date_time_original: Some(date_time.into()),
            ..Self::default()
        }
    }
}

enum Raw {
    Ascii(String),
    Long(u32),
    Rational(u32, u32),
}

pub fn write_exif_jpeg(path: &Path, fixture: &ExifFixture) {
    std::fs::write(path, exif_jpeg_bytes(fixture)).unwrap();
}

pub fn exif_jpeg_bytes(fixture: &ExifFixture) -> Vec<u8> {
    let mut ifd0 = Vec::new();
    if let Some(make) = &fixture.make {
        ifd0.push((0x010F, Raw::Ascii(make.clone())));
    }
    if let Some(model) = &fixture.model {
        ifd0.push((0x0110, Raw::Ascii(model.clone())));
    }

    let mut exif = Vec::new();
    if let Some(dt) = &fixture.date_time_original {
        exif.push((0x9003, Raw::Ascii(dt.clone())));
    }
    if let Some((n, d)) = fixture.focal_length {
        exif.push((0x920A, Raw::Rational(n, d)));
    }
    if let Some(w) = fixture.width {
        exif.push((0xA002, Raw::Long(w)));
    }
    if let Some(h) = fixture.height {
        exif.push((0xA003, Raw::Long(h)));
    }

    let tiff = tiff_block(ifd0, exif);
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    let segment_len = (2 + 6 + tiff.len()) as u16;
    out.extend(segment_len.to_be_bytes());
    out.extend(b"Exif\0\0");
    out.extend(tiff);
    out.extend([0xFF, 0xD9]);
    out
}

fn tiff_block(mut ifd0: Vec<(u16, Raw)>, mut exif: Vec<(u16, Raw)>) -> Vec<u8> {
    let has_exif = !exif.is_empty();
    if has_exif {
        ifd0.push((0x8769, Raw::Long(0)));
    }
    ifd0.sort_by_key(|e| e.0);
    exif.sort_by_key(|e| e.0);

    let ifd_size = |n: usize| 2 + 12 * n + 4;
    let exif_offset = 8 + ifd_size(ifd0.len());
    let data_base = exif_offset + if has_exif { ifd_size(exif.len()) } else { 0 };

    if let Some(entry) = ifd0.iter_mut().find(|e| e.0 == 0x8769) {
        entry.1 = Raw::Long(exif_offset as u32);
    }

    let mut out = b"II*\0".to_vec();
    out.extend(8u32.to_le_bytes());
    let mut data = Vec::new();
    write_ifd(&mut out, &ifd0, data_base, &mut data);
    if has_exif {
        write_ifd(&mut out, &exif, data_base, &mut data);
    }
    out.extend(data);
    out
}

fn write_ifd(out: &mut Vec<u8>, entries: &[(u16, Raw)], data_base: usize, data: &mut Vec<u8>) {
    out.extend((entries.len() as u16).to_le_bytes());
    for (tag, raw) in entries {
        out.extend(tag.to_le_bytes());
        match raw {
            Raw::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                out.extend(2u16.to_le_bytes());
                out.extend((bytes.len() as u32).to_le_bytes());
                if bytes.len() <= 4 {
                    bytes.resize(4, 0);
                    out.extend(bytes);
                } else {
                    out.extend(((data_base + data.len()) as u32).to_le_bytes());
                    data.extend(bytes);
                    if data.len() % 2 == 1 {
                        data.push(0);
                    }
                }
            }
            Raw::Long(v) => {
                out.extend(4u16.to_le_bytes());
                out.extend(1u32.to_le_bytes());
                out.extend(v.to_le_bytes());
            }
            Raw::Rational(n, d) => {
                out.extend(5u16.to_le_bytes());
                out.extend(1u32.to_le_bytes());
                out.extend(((data_base + data.len()) as u32).to_le_bytes());
                data.extend(n.to_le_bytes());
                data.extend(d.to_le_bytes());
            }
        }
    }
    out.extend(0u32.to_le_bytes());
}

/// Write a small decodable JPEG with uniform colour.
pub fn write_plain_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 120, 150]));
    img.save(path).unwrap();
}

/// Write a decodable JPEG that also carries the fixture's EXIF block.
pub fn write_exif_image(path: &Path, fixture: &ExifFixture, width: u32, height: u32) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 80, 120]));
    let mut encoded = std::io::Cursor::new(Vec::new());
    img.write_to(&mut encoded, image::ImageFormat::Jpeg).unwrap();
    let encoded = encoded.into_inner();

    // Splice the APP1 segment (without its own SOI/EOI) in right after SOI
    let exif = exif_jpeg_bytes(fixture);
    let app1 = &exif[2..exif.len() - 2];
    let mut out = Vec::with_capacity(encoded.len() + app1.len());
    out.extend_from_slice(&encoded[..2]);
    out.extend_from_slice(app1);
    out.extend_from_slice(&encoded[2..]);
    std::fs::write(path, out).unwrap();
}
