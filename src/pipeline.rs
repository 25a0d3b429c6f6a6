//! Per-frame face detection and recognition.

use chrono::{DateTime, Local};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::contrast::equalize_histogram;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::attendance::{Candidate, CheckIn, Session};
use crate::face_detection::{FaceBoundingBox, FaceDetectionModel};
use crate::face_recognition::FaceRecognitionModel;

const FACE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BADGE_HEIGHT: u32 = 8;

/// Detect faces on the equalised grayscale frame and ask the recognizer about
/// each one. Faces entirely outside the frame are dropped.
pub fn analyze_frame<D, R>(
    frame: &RgbImage,
    detector: &mut D,
    recognizer: &R,
    face_size: u32,
) -> Vec<Candidate>
where
    D: FaceDetectionModel + ?Sized,
    R: FaceRecognitionModel + ?Sized,
{
    let gray = equalize_histogram(&imageops::grayscale(frame));
    let (width, height) = gray.dimensions();

    detector
        .run(&gray)
        .into_iter()
        .filter_map(|bbox| {
            let (x, y, w, h) = bbox.clamp_to(width, height)?;
            let roi = imageops::crop_imm(&gray, x, y, w, h).to_image();
            let face = imageops::resize(&roi, face_size, face_size, FilterType::Triangle);
            Some(Candidate {
                bbox,
                prediction: recognizer.predict(&face),
            })
        })
        .collect()
}

/// Outline every candidate; mark the accepted one with a badge above its box.
pub fn annotate(frame: &mut RgbImage, candidates: &[Candidate], accepted: Option<usize>) {
    let (width, height) = frame.dimensions();

    for (i, candidate) in candidates.iter().enumerate() {
        let Some(rect) = frame_rect(&candidate.bbox, width, height) else {
            continue;
        };
        draw_hollow_rect_mut(frame, rect, FACE_COLOR);
        if rect.width() > 2 && rect.height() > 2 {
            let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                .of_size(rect.width() - 2, rect.height() - 2);
            draw_hollow_rect_mut(frame, inner, FACE_COLOR);
        }

        if accepted == Some(i) {
            let top = (rect.top() - BADGE_HEIGHT as i32 - 2).max(0);
            let badge = Rect::at(rect.left(), top).of_size(rect.width(), BADGE_HEIGHT);
            draw_filled_rect_mut(frame, badge, MATCH_COLOR);
        }
    }
}

/// Let `session` judge the candidates found in `frame`, then draw them. Returns
/// the check-in if this frame produced one.
pub fn resolve_frame(
    frame: &mut RgbImage,
    candidates: &[Candidate],
    session: &mut Session,
    names: &[String],
    threshold: f64,
    now: DateTime<Local>,
) -> Option<CheckIn> {
    let accepted = session.observe(candidates, names, threshold, now);
    annotate(frame, candidates, accepted.as_ref().map(|(i, _)| *i));
    accepted.map(|(_, check_in)| check_in)
}

fn frame_rect(bbox: &FaceBoundingBox, width: u32, height: u32) -> Option<Rect> {
    let (x, y, w, h) = bbox.clamp_to(width, height)?;
    // clamped coordinates fit in the frame, which is far below i32::MAX
    Some(Rect::at(x as i32, y as i32).of_size(w, h))
}
