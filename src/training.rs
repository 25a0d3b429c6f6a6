//! Builds the recognizer's training set from roster rows.

use image::imageops::{self, FilterType};
use image::GrayImage;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::augment::augment_image;
use crate::error::{Error, Result};
use crate::roster::RosterRecord;

/// Face samples and their labels. A label is the roster row index the sample
/// came from.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub images: Vec<GrayImage>,
    pub labels: Vec<usize>,
    /// Row indices that produced no sample.
    pub skipped: Vec<usize>,
}

impl TrainingSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Decode a stored picture as grayscale and resize it to `face_size²`.
///
/// # Errors
///
/// Returns `Error::ImageDecode` if the bytes are not a supported image.
pub fn prepare_face(picture: &[u8], face_size: u32) -> Result<GrayImage> {
    let gray = image::load_from_memory(picture)?.to_luma8();
    Ok(imageops::resize(&gray, face_size, face_size, FilterType::Triangle))
}

/// Turn roster rows into training samples: every usable row yields its
/// resized photo plus one randomly rotated copy, both labelled with the row
/// index. Rows with an empty name or picture, or an undecodable picture, are
/// skipped with a log line.
///
/// # Errors
///
/// Returns `Error::EmptyRoster` for no rows and `Error::NoValidTrainingImages`
/// when every row was skipped.
pub fn build_training_set<R: Rng>(
    records: &[RosterRecord],
    face_size: u32,
    max_rotation_degrees: i32,
    rng: &mut R,
) -> Result<TrainingSet> {
    if records.is_empty() {
        return Err(Error::EmptyRoster);
    }

    let mut set = TrainingSet::default();

    for (index, record) in records.iter().enumerate() {
        let name = record.name.as_deref().unwrap_or("");
        debug!(
            "Processing record {}: name={:?}, picture size={}",
            index,
            name,
            record.picture_len()
        );

        let picture = match record.picture.as_deref() {
            Some(picture) if record.is_trainable() => picture,
            _ => {
                warn!("Skipping incomplete record {}", index);
                set.skipped.push(index);
                continue;
            }
        };

        let face = match prepare_face(picture, face_size) {
            Ok(face) => face,
            Err(err) => {
                warn!("Failed to decode picture for {:?}: {}", name, err);
                set.skipped.push(index);
                continue;
            }
        };

        let augmented = augment_image(&face, max_rotation_degrees, rng);
        set.images.push(face);
        set.labels.push(index);
        set.images.push(augmented);
        set.labels.push(index);
        debug!("Loaded training samples for {:?}", name);
    }

    if set.is_empty() {
        return Err(Error::NoValidTrainingImages);
    }

    info!(
        "Built training set: {} samples from {} records ({} skipped)",
        set.len(),
        records.len(),
        set.skipped.len()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Luma};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([((x * 3 + y * 5) % 256) as u8]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn record(name: Option<&str>, picture: Option<Vec<u8>>) -> RosterRecord {
        RosterRecord {
            name: name.map(str::to_string),
            picture,
        }
    }

    #[test]
    fn test_two_samples_per_valid_row_labelled_by_index() {
        let records = vec![
            record(Some("alice"), Some(png_bytes(40, 60))),
            record(None, Some(png_bytes(10, 10))),
            record(Some("carol"), Some(png_bytes(300, 300))),
        ];
        let mut rng = StdRng::seed_from_u64(42);

        let set = build_training_set(&records, 200, 15, &mut rng).unwrap();

        assert_eq!(set.len(), 4);
        assert_eq!(set.labels, vec![0, 0, 2, 2]);
        assert_eq!(set.skipped, vec![1]);
        for image in &set.images {
            assert_eq!(image.dimensions(), (200, 200));
        }
    }

    #[test]
    fn test_undecodable_picture_is_skipped() {
        let records = vec![
            record(Some("bob"), Some(vec![0xde, 0xad, 0xbe, 0xef])),
            record(Some("dan"), Some(png_bytes(20, 20))),
        ];
        let mut rng = StdRng::seed_from_u64(1);

        let set = build_training_set(&records, 64, 15, &mut rng).unwrap();
        assert_eq!(set.labels, vec![1, 1]);
        assert_eq!(set.skipped, vec![0]);
    }

    #[test]
    fn test_empty_roster() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            build_training_set(&[], 200, 15, &mut rng),
            Err(Error::EmptyRoster)
        ));
    }

    #[test]
    fn test_all_rows_invalid() {
        let records = vec![
            record(Some(""), Some(png_bytes(10, 10))),
            record(Some("eve"), Some(Vec::new())),
            record(Some("fay"), Some(b"not an image".to_vec())),
        ];
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(
            build_training_set(&records, 200, 15, &mut rng),
            Err(Error::NoValidTrainingImages)
        ));
    }

    #[test]
    fn test_prepare_face_resizes() {
        let face = prepare_face(&png_bytes(123, 45), 100).unwrap();
        assert_eq!(face.dimensions(), (100, 100));
    }
}
