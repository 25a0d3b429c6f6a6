use std::io::Cursor;

use attendance::attendance::{Candidate, Readiness, Session};
use attendance::face_detection::FaceBoundingBox;
use attendance::face_recognition::model_lbph::LbphFaceRecognizer;
use attendance::face_recognition::FaceRecognitionModel;
use attendance::roster::Roster;
use attendance::training::{build_training_set, prepare_face};
use chrono::Local;
use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn png(img: GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

fn horizontal() -> Vec<u8> {
    png(GrayImage::from_fn(240, 240, |_, y| {
        Luma([if (y / 3) % 2 == 0 { 230 } else { 20 }])
    }))
}

fn vertical() -> Vec<u8> {
    png(GrayImage::from_fn(240, 240, |x, _| {
        Luma([if (x / 3) % 2 == 0 { 230 } else { 20 }])
    }))
}

fn checker() -> Vec<u8> {
    png(GrayImage::from_fn(240, 240, |x, y| {
        Luma([if ((x / 5) + (y / 5)) % 2 == 0 { 230 } else { 20 }])
    }))
}

#[test]
fn roster_photos_train_a_recognizer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");
    {
        let roster = Roster::create(&path, "user_profile").unwrap();
        roster.enroll("alice", &horizontal()).unwrap();
        roster.enroll("broken", b"garbage").unwrap();
        roster.enroll("carol", &vertical()).unwrap();
        roster.enroll("dave", &checker()).unwrap();
    }

    let roster = Roster::open(&path, "user_profile").unwrap();
    let records = roster.select().unwrap();
    assert_eq!(records.len(), 4);

    let mut rng = StdRng::seed_from_u64(2024);
    let set = build_training_set(&records, 200, 15, &mut rng).unwrap();
    assert_eq!(set.labels, vec![0, 0, 2, 2, 3, 3]);
    assert_eq!(set.skipped, vec![1]);

    let mut recognizer = LbphFaceRecognizer::default();
    recognizer.train(&set.images, &set.labels).unwrap();
    assert_eq!(recognizer.sample_count(), 6);

    for (label, picture) in [(0, horizontal()), (2, vertical()), (3, checker())] {
        let face = prepare_face(&picture, 200).unwrap();
        let prediction = recognizer.predict(&face).unwrap();
        assert_eq!(prediction.label, label);
        assert!(prediction.confidence < 1e-6);
    }
}

#[test]
fn recognized_face_checks_in_once() {
    let roster = Roster::open_in_memory("user_profile").unwrap();
    roster.enroll("alice", &horizontal()).unwrap();
    roster.enroll("carol", &vertical()).unwrap();

    let records = roster.select().unwrap();
    let names: Vec<String> = records
        .iter()
        .map(|r| r.name.clone().unwrap_or_default())
        .collect();

    let mut rng = StdRng::seed_from_u64(5);
    let set = build_training_set(&records, 200, 15, &mut rng).unwrap();
    let mut recognizer = LbphFaceRecognizer::default();
    recognizer.train(&set.images, &set.labels).unwrap();

    let mut session = Session::default();
    let readiness = Readiness {
        camera_open: true,
        detector_loaded: true,
        training_samples: recognizer.sample_count(),
    };
    assert!(session.toggle(&readiness).unwrap());

    let face = prepare_face(&vertical(), 200).unwrap();
    let candidate = Candidate {
        bbox: FaceBoundingBox {
            x: 0,
            y: 0,
            width: 200,
            height: 200,
            score: 4.0,
        },
        prediction: recognizer.predict(&face),
    };

    let (_, check_in) = session
        .observe(&[candidate], &names, 120.0, Local::now())
        .unwrap();
    assert_eq!(check_in.name, "carol");
    assert!(!session.is_recognizing());
    assert!(session
        .observe(&[candidate], &names, 120.0, Local::now())
        .is_none());
}
