//! Conversion of raw dataset rows into fixed-size RGB u8 arrays.

use crate::types::{
    ConversionReport, DatasetResult, ImageArray, ImagePayload, LabeledArrays, RawRecord,
    TrashDatasetError,
};
use image::imageops::FilterType;
use image::DynamicImage;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

pub(crate) const DEFAULT_LOG_EVERY_RECORDS: usize = 500;

enum Outcome {
    Converted { pixels: Vec<u8>, label: i64 },
    MissingImage,
    MissingLabel,
    DecodeFailed,
}

/// Decode an image payload from memory or disk.
pub fn decode_payload(payload: &ImagePayload) -> DatasetResult<DynamicImage> {
    match payload {
        ImagePayload::Bytes(bytes) => {
            image::load_from_memory(bytes).map_err(|e| TrashDatasetError::Image {
                path: PathBuf::from("<memory>"),
                source: e,
            })
        }
        ImagePayload::Path(path) => image::open(path).map_err(|e| TrashDatasetError::Image {
            path: path.clone(),
            source: e,
        }),
    }
}

/// RGB-convert and bilinearly resize one image to `(width, height)`, returning HWC bytes.
pub fn image_to_array(img: &DynamicImage, size: (u32, u32)) -> Vec<u8> {
    let rgb = img.to_rgb8();
    if rgb.dimensions() == size {
        return rgb.into_raw();
    }
    image::imageops::resize(&rgb, size.0, size.1, FilterType::Triangle).into_raw()
}

fn convert_one(record: &RawRecord, size: (u32, u32)) -> Outcome {
    let Some(payload) = &record.image else {
        return Outcome::MissingImage;
    };
    let label = match record.label {
        Some(l) if l >= 0 => l,
        _ => return Outcome::MissingLabel,
    };
    match decode_payload(payload) {
        Ok(img) => Outcome::Converted {
            pixels: image_to_array(&img, size),
            label,
        },
        Err(e) => {
            log::debug!("skipping record: {e}");
            Outcome::DecodeFailed
        }
    }
}

/// Convert every record to a `(N, height, width, 3)` u8 array plus labels.
///
/// Records without an image, without a non-negative label, or whose image fails to
/// decode are skipped and tallied in the report. Surviving records keep their order.
pub fn dataset_to_arrays(
    records: &[RawRecord],
    size: (u32, u32),
) -> DatasetResult<(LabeledArrays, ConversionReport)> {
    let total = records.len();
    let done = AtomicUsize::new(0);
    let started = Instant::now();

    let outcomes: Vec<Outcome> = records
        .par_iter()
        .map(|record| {
            let out = convert_one(record, size);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if n % DEFAULT_LOG_EVERY_RECORDS == 0 || n == total {
                log::info!(
                    "converting images: {n}/{total} ({:.1}s)",
                    started.elapsed().as_secs_f32()
                );
            }
            out
        })
        .collect();

    let mut report = ConversionReport {
        total,
        ..Default::default()
    };
    let mut images = ImageArray::with_capacity(total, size.0 as usize, size.1 as usize);
    let mut labels = Vec::with_capacity(total);
    for outcome in outcomes {
        match outcome {
            Outcome::Converted { pixels, label } => {
                images.push(&pixels)?;
                labels.push(label);
                report.converted += 1;
            }
            Outcome::MissingImage => report.missing_image += 1,
            Outcome::MissingLabel => report.missing_label += 1,
            Outcome::DecodeFailed => report.decode_failed += 1,
        }
    }
    if report.skipped() > 0 {
        log::warn!(
            "skipped {} of {total} records (missing_image={}, missing_label={}, decode_failed={})",
            report.skipped(),
            report.missing_image,
            report.missing_label,
            report.decode_failed
        );
    }
    Ok((LabeledArrays { images, labels }, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn rgba_is_converted_to_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 40])));
        let arr = image_to_array(&img, (4, 4));
        assert_eq!(arr.len(), 4 * 4 * 3);
        assert_eq!(&arr[..3], &[10, 20, 30]);
    }

    #[test]
    fn resize_hits_target_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 30, Rgb([200, 100, 0])));
        let arr = image_to_array(&img, (16, 16));
        assert_eq!(arr.len(), 16 * 16 * 3);
        // Uniform input stays uniform under bilinear filtering.
        assert!(arr
            .chunks(3)
            .all(|p| p[0].abs_diff(200) <= 1 && p[1].abs_diff(100) <= 1 && p[2] <= 1));
    }

    #[test]
    fn malformed_records_are_skipped() {
        let good = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            8,
            8,
            Rgb([1, 2, 3]),
        )));
        let records = vec![
            RawRecord {
                image: Some(ImagePayload::Bytes(good.clone())),
                label: Some(2),
            },
            RawRecord {
                image: Some(ImagePayload::Bytes(b"definitely not an image".to_vec())),
                label: Some(1),
            },
            RawRecord {
                image: None,
                label: Some(0),
            },
            RawRecord {
                image: Some(ImagePayload::Bytes(good.clone())),
                label: Some(-1),
            },
            RawRecord {
                image: Some(ImagePayload::Bytes(good)),
                label: Some(0),
            },
        ];
        let (arrays, report) = dataset_to_arrays(&records, (8, 8)).unwrap();
        assert_eq!(arrays.images.shape(), [2, 8, 8, 3]);
        assert_eq!(arrays.labels, vec![2, 0]);
        assert_eq!(report.converted, 2);
        assert_eq!(report.decode_failed, 1);
        assert_eq!(report.missing_image, 1);
        assert_eq!(report.missing_label, 1);
        assert_eq!(report.skipped(), 3);
    }

    #[test]
    fn default_size_yields_128_square_rgb() {
        let records: Vec<RawRecord> = [(640, 480), (100, 300), (128, 128)]
            .into_iter()
            .enumerate()
            .map(|(i, (w, h))| RawRecord {
                image: Some(ImagePayload::Bytes(png_bytes(DynamicImage::ImageRgb8(
                    RgbImage::from_pixel(w, h, Rgb([9, 9, 9])),
                )))),
                label: Some(i as i64),
            })
            .collect();
        let size = crate::types::DEFAULT_IMAGE_SIZE;
        let (arrays, _) = dataset_to_arrays(&records, (size, size)).unwrap();
        assert_eq!(arrays.images.shape(), [3, 128, 128, 3]);
        assert_eq!(arrays.images.data.len(), 3 * 128 * 128 * 3);
        assert_eq!(arrays.labels.len(), 3);
    }

    #[test]
    fn missing_file_path_counts_as_decode_failure() {
        let records = vec![RawRecord {
            image: Some(ImagePayload::Path(PathBuf::from("/nonexistent/x.png"))),
            label: Some(0),
        }];
        let (arrays, report) = dataset_to_arrays(&records, (8, 8)).unwrap();
        assert!(arrays.is_empty());
        assert_eq!(report.decode_failed, 1);
    }
}
