use crate::core::errors::{MetadataError, MetadataResult};
use crate::core::types::{ExifSummary, ImageMetadata};
use exif::{In, Tag, Value};
use std::io::Cursor;
use tracing::debug;

/// Extract structural properties and the curated EXIF summary from a raw
/// byte buffer.
///
/// Total function: a buffer that cannot be decoded produces the degraded
/// partial record instead of an error, so metadata never fails an upload.
pub fn extract_metadata(bytes: &[u8]) -> ImageMetadata {
    match parse_metadata(bytes) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("Metadata extraction degraded: {}", e);
            ImageMetadata::degraded(e)
        }
    }
}

fn parse_metadata(bytes: &[u8]) -> MetadataResult<ImageMetadata> {
    let format = image::guess_format(bytes)
        .map(format_name)
        .unwrap_or_else(|_| "Unknown".to_string());

    let img = image::load_from_memory(bytes)?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(MetadataError::InvalidDimensions { width, height });
    }

    let total_pixels = u64::from(width) * u64::from(height);
    let exif = summarize_exif(bytes);
    let has_exif = !exif.is_empty();

    Ok(ImageMetadata {
        error: None,
        format,
        mode: Some(color_mode(img.color())),
        size: format!("{width} x {height}"),
        width: Some(width),
        height: Some(height),
        total_pixels: Some(total_pixels),
        megapixels: Some(round2(total_pixels as f64 / 1_000_000.0)),
        aspect_ratio: Some(round2(f64::from(width) / f64::from(height))),
        file_size_bytes: Some(bytes.len() as u64),
        file_size_mb: Some(round2(bytes.len() as f64 / (1024.0 * 1024.0))),
        exif,
        has_exif,
    })
}

/// Debug renders the format variant name (Jpeg, Png, ...); clients expect
/// it upper-cased.
fn format_name(format: image::ImageFormat) -> String {
    format!("{format:?}").to_uppercase()
}

fn color_mode(color: image::ColorType) -> String {
    match color {
        image::ColorType::L8 => "L",
        image::ColorType::La8 => "LA",
        image::ColorType::Rgb8 => "RGB",
        image::ColorType::Rgba8 => "RGBA",
        image::ColorType::L16 => "L16",
        image::ColorType::La16 => "LA16",
        image::ColorType::Rgb16 => "RGB16",
        image::ColorType::Rgba16 => "RGBA16",
        image::ColorType::Rgb32F => "RGB32F",
        image::ColorType::Rgba32F => "RGBA32F",
        _ => "Unknown",
    }
    .to_string()
}

/// Read the EXIF block and pick out the curated fields. Each field parses
/// independently; one bad tag never poisons the rest. No EXIF block at all
/// leaves every field absent.
fn summarize_exif(bytes: &[u8]) -> ExifSummary {
    match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => summarize(&exif),
        Err(_) => ExifSummary::default(),
    }
}

fn summarize(exif: &exif::Exif) -> ExifSummary {
    let latitude = gps_decimal(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
    let longitude = gps_decimal(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);

    ExifSummary {
        camera_make: display_field(exif, Tag::Make),
        camera_model: display_field(exif, Tag::Model),
        software: display_field(exif, Tag::Software),
        lens_make: display_field(exif, Tag::LensMake),
        lens_model: display_field(exif, Tag::LensModel),

        date_taken: display_field(exif, Tag::DateTime),
        date_original: display_field(exif, Tag::DateTimeOriginal),
        date_digitized: display_field(exif, Tag::DateTimeDigitized),

        aperture: rational_field(exif, Tag::FNumber).map(|f| format!("f/{}", format_ratio(f))),
        shutter_speed: first_rational(exif, Tag::ExposureTime).and_then(format_shutter),
        iso: uint_field(exif, Tag::PhotographicSensitivity),
        focal_length: rational_field(exif, Tag::FocalLength)
            .map(|f| format!("{}mm", format_ratio(f))),
        focal_length_35mm: uint_field(exif, Tag::FocalLengthIn35mmFilm),
        flash: display_field(exif, Tag::Flash),
        exposure_mode: display_field(exif, Tag::ExposureMode),
        exposure_program: display_field(exif, Tag::ExposureProgram),
        metering_mode: display_field(exif, Tag::MeteringMode),
        white_balance: display_field(exif, Tag::WhiteBalance),
        digital_zoom_ratio: rational_field(exif, Tag::DigitalZoomRatio),

        color_space: display_field(exif, Tag::ColorSpace),
        resolution_unit: display_field(exif, Tag::ResolutionUnit),
        x_resolution: rational_field(exif, Tag::XResolution),
        y_resolution: rational_field(exif, Tag::YResolution),
        compression: display_field(exif, Tag::Compression),
        orientation: display_field(exif, Tag::Orientation),
        scene_type: display_field(exif, Tag::SceneType),
        scene_capture_type: display_field(exif, Tag::SceneCaptureType),
        contrast: display_field(exif, Tag::Contrast),
        saturation: display_field(exif, Tag::Saturation),
        sharpness: display_field(exif, Tag::Sharpness),

        gps_available: Some(latitude.is_some() && longitude.is_some()),
        latitude,
        longitude,
        gps_altitude: rational_field(exif, Tag::GPSAltitude),
        gps_timestamp: display_field(exif, Tag::GPSTimeStamp),
        gps_datestamp: display_field(exif, Tag::GPSDateStamp),
    }
}

fn display_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY)
        .map(|field| field.display_value().to_string())
}

fn uint_field(exif: &exif::Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

fn rational_field(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(v) => v.first().map(|r| r.to_f64()),
        Value::SRational(v) => v.first().map(|r| r.to_f64()),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn first_rational(exif: &exif::Exif, tag: Tag) -> Option<exif::Rational> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().copied(),
        _ => None,
    }
}

/// Convert a DMS coordinate plus hemisphere reference to signed decimal
/// degrees, rounded to 6 decimals. Both the coordinate and its reference
/// must be present.
fn gps_decimal(exif: &exif::Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let coord = exif.get_field(coord_tag, In::PRIMARY)?;
    let dms = match &coord.value {
        Value::Rational(v) if v.len() >= 3 => v,
        _ => return None,
    };

    let reference = exif.get_field(ref_tag, In::PRIMARY)?;
    let hemisphere = match &reference.value {
        Value::Ascii(v) => *v.first()?.first()?,
        _ => return None,
    };

    let degrees = dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0;
    if !degrees.is_finite() {
        return None;
    }

    // Southern latitudes and western longitudes are negative
    let signed = match hemisphere.to_ascii_uppercase() {
        b'S' | b'W' => -degrees,
        _ => degrees,
    };

    Some(round6(signed))
}

/// `1/n s` for exposures under a second (reciprocal taken from the rational
/// so 1/200 stays exactly 1/200), plain seconds otherwise.
fn format_shutter(exposure: exif::Rational) -> Option<String> {
    let seconds = exposure.to_f64();
    if !seconds.is_finite() {
        return None;
    }

    if seconds > 0.0 && seconds < 1.0 {
        Some(format!("1/{}s", exposure.denom / exposure.num))
    } else {
        Some(format!("{}s", format_ratio(seconds)))
    }
}

/// Whole numbers keep one decimal ("2.0") so f-stop and focal length read
/// like camera values.
fn format_ratio(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational};
    use image::{ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([120, 30, 200]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn rational(num: u32, denom: u32) -> Rational {
        Rational { num, denom }
    }

    fn ascii_field(tag: Tag, text: &[u8]) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.to_vec()]),
        }
    }

    fn read_back(fields: &[Field]) -> exif::Exif {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        exif::Reader::new().read_raw(buf.into_inner()).unwrap()
    }

    #[test]
    fn structural_fields_from_plain_png() {
        let bytes = png_bytes(8, 6);
        let metadata = extract_metadata(&bytes);

        assert_eq!(metadata.error, None);
        assert_eq!(metadata.format, "PNG");
        assert_eq!(metadata.mode.as_deref(), Some("RGB"));
        assert_eq!(metadata.size, "8 x 6");
        assert_eq!(metadata.width, Some(8));
        assert_eq!(metadata.height, Some(6));
        assert_eq!(metadata.total_pixels, Some(48));
        assert_eq!(metadata.megapixels, Some(0.0));
        assert_eq!(metadata.aspect_ratio, Some(1.33));
        assert_eq!(metadata.file_size_bytes, Some(bytes.len() as u64));
        assert!(!metadata.has_exif);
        assert!(metadata.exif.is_empty());
    }

    #[test]
    fn empty_exif_serializes_to_empty_object() {
        let json = serde_json::to_value(ExifSummary::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn garbage_bytes_degrade_without_failing() {
        let metadata = extract_metadata(b"definitely not an image");

        assert!(metadata
            .error
            .as_deref()
            .unwrap()
            .starts_with("Could not extract metadata:"));
        assert_eq!(metadata.format, "Unknown");
        assert_eq!(metadata.size, "Unknown");
        assert_eq!(metadata.width, None);
        assert!(!metadata.has_exif);
        assert!(metadata.exif.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let bytes = png_bytes(20, 10);
        assert_eq!(extract_metadata(&bytes), extract_metadata(&bytes));

        let garbage = b"\x00\x01\x02\x03";
        assert_eq!(extract_metadata(garbage), extract_metadata(garbage));
    }

    #[test]
    fn gps_dms_converts_to_decimal_degrees() {
        let exif = read_back(&[
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(40, 1), rational(26, 1), rational(46, 1)]),
            },
            ascii_field(Tag::GPSLatitudeRef, b"N"),
            Field {
                tag: Tag::GPSLongitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(7, 1), rational(35, 1), rational(0, 1)]),
            },
            ascii_field(Tag::GPSLongitudeRef, b"W"),
            Field {
                tag: Tag::GPSAltitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(1234, 10)]),
            },
        ]);

        let summary = summarize(&exif);
        assert_eq!(summary.gps_available, Some(true));
        assert_eq!(summary.latitude, Some(40.446111));
        assert_eq!(summary.longitude, Some(-7.583333));
        assert_eq!(summary.gps_altitude, Some(123.4));
    }

    #[test]
    fn southern_hemisphere_flips_sign() {
        let exif = read_back(&[
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(33, 1), rational(51, 1), rational(36, 1)]),
            },
            ascii_field(Tag::GPSLatitudeRef, b"S"),
        ]);

        let summary = summarize(&exif);
        assert_eq!(summary.latitude, Some(-33.86));
        // Longitude never resolved, so GPS is not considered available
        assert_eq!(summary.longitude, None);
        assert_eq!(summary.gps_available, Some(false));
    }

    #[test]
    fn coordinate_without_reference_stays_absent() {
        let exif = read_back(&[Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(vec![rational(10, 1), rational(0, 1), rational(0, 1)]),
        }]);

        let summary = summarize(&exif);
        assert_eq!(summary.latitude, None);
        assert_eq!(summary.gps_available, Some(false));
    }

    #[test]
    fn gps_group_without_coordinates_is_not_available() {
        let exif = read_back(&[
            Field {
                tag: Tag::GPSAltitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(525, 10)]),
            },
            Field {
                tag: Tag::GPSTimeStamp,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(12, 1), rational(34, 1), rational(56, 1)]),
            },
        ]);

        let summary = summarize(&exif);
        // Availability means resolved coordinates, not a non-empty GPS group
        assert_eq!(summary.gps_available, Some(false));
        assert_eq!(summary.latitude, None);
        assert_eq!(summary.longitude, None);
        assert_eq!(summary.gps_altitude, Some(52.5));
        assert!(summary.gps_timestamp.is_some());
    }

    #[test]
    fn camera_and_exposure_fields() {
        let exif = read_back(&[
            ascii_field(Tag::Make, b"Canon"),
            ascii_field(Tag::Model, b"Canon EOS R5"),
            Field {
                tag: Tag::FNumber,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(18, 10)]),
            },
            Field {
                tag: Tag::ExposureTime,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(1, 200)]),
            },
            Field {
                tag: Tag::PhotographicSensitivity,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![400]),
            },
            Field {
                tag: Tag::FocalLength,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![rational(50, 1)]),
            },
        ]);

        let summary = summarize(&exif);
        assert_eq!(summary.camera_make.as_deref(), Some("Canon"));
        assert_eq!(summary.camera_model.as_deref(), Some("Canon EOS R5"));
        assert_eq!(summary.aperture.as_deref(), Some("f/1.8"));
        assert_eq!(summary.shutter_speed.as_deref(), Some("1/200s"));
        assert_eq!(summary.iso, Some(400));
        assert_eq!(summary.focal_length.as_deref(), Some("50.0mm"));
        // Absent tags stay absent
        assert_eq!(summary.lens_model, None);
        assert_eq!(summary.flash, None);
        assert!(!summary.is_empty());
    }

    #[test]
    fn shutter_formatting() {
        assert_eq!(format_shutter(rational(1, 200)).as_deref(), Some("1/200s"));
        // Truncated reciprocal: 3/200s is 1/66.67, reported as 1/66s
        assert_eq!(format_shutter(rational(3, 200)).as_deref(), Some("1/66s"));
        assert_eq!(format_shutter(rational(2, 1)).as_deref(), Some("2.0s"));
        assert_eq!(format_shutter(rational(0, 1)).as_deref(), Some("0.0s"));
        assert_eq!(format_shutter(rational(1, 0)), None);
    }

    #[test]
    fn ratio_formatting_keeps_camera_style() {
        assert_eq!(format_ratio(1.8), "1.8");
        assert_eq!(format_ratio(2.0), "2.0");
        assert_eq!(format_ratio(4.25), "4.25");
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round2(1.337), 1.34);
        assert_eq!(round2(2.0), 2.0);
        assert_eq!(round6(40.44611111), 40.446111);
        assert_eq!(round6(-7.5833333), -7.583333);
    }
}
