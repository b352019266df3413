//! Raw network output decoding: class probabilities and YOLO boxes

use tract_onnx::prelude::tract_ndarray::ArrayViewD;

use crate::engine::BoxError;
use crate::preprocess::Letterbox;
use crate::result::DetectedObject;

/// Tolerance when deciding whether scores already sum to one
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// Detection filtering parameters
#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

/// Return scores as a probability distribution, applying softmax to raw logits
pub fn class_probabilities(scores: Vec<f32>) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let is_distribution = scores.iter().all(|s| (0.0..=1.0).contains(s))
        && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE;
    if is_distribution {
        return scores;
    }
    softmax(&scores)
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Output tensor layout of a YOLO detection head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `[1, 4 + nc, anchors]` (YOLOv8 and later): boxes then class scores
    ChannelsFirst { attrs: usize, anchors: usize },
    /// `[1, anchors, 5 + nc]` (YOLOv5): boxes, objectness, class scores
    AnchorsFirst { attrs: usize, anchors: usize },
}

impl Layout {
    fn of(shape: &[usize]) -> Result<Self, BoxError> {
        match *shape {
            [1, a, b] if a <= b && a > 4 => Ok(Layout::ChannelsFirst { attrs: a, anchors: b }),
            [1, a, b] if a > b && b > 5 => Ok(Layout::AnchorsFirst { attrs: b, anchors: a }),
            _ => Err(format!("unsupported detection output shape {:?}", shape).into()),
        }
    }
}

/// Decode a detection head into boxes in source pixels, highest confidence first
pub fn decode_detections(
    output: ArrayViewD<'_, f32>,
    params: &DetectionParams,
    letterbox: &Letterbox,
) -> Result<Vec<DetectedObject>, BoxError> {
    let layout = Layout::of(output.shape())?;
    let mut candidates = Vec::new();

    match layout {
        Layout::ChannelsFirst { attrs, anchors } => {
            for i in 0..anchors {
                let get = |k: usize| output[[0, k, i]];
                let (class_id, score) = best_class((4..attrs).map(get));
                let cxcywh = [get(0), get(1), get(2), get(3)];
                push_candidate(&mut candidates, cxcywh, class_id, score, params);
            }
        }
        Layout::AnchorsFirst { attrs, anchors } => {
            for i in 0..anchors {
                let get = |k: usize| output[[0, i, k]];
                let (class_id, score) = best_class((5..attrs).map(get));
                let cxcywh = [get(0), get(1), get(2), get(3)];
                push_candidate(&mut candidates, cxcywh, class_id, score * get(4), params);
            }
        }
    }

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let kept = non_max_suppression(candidates, params.iou_threshold, params.max_detections);

    Ok(kept
        .into_iter()
        .map(|det| DetectedObject {
            bbox: letterbox.to_source(det.bbox),
            ..det
        })
        .collect())
}

fn best_class(scores: impl Iterator<Item = f32>) -> (usize, f32) {
    scores
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (idx, score)| {
            if score > best.1 {
                (idx, score)
            } else {
                best
            }
        })
}

fn push_candidate(
    candidates: &mut Vec<DetectedObject>,
    cxcywh: [f32; 4],
    class_id: usize,
    confidence: f32,
    params: &DetectionParams,
) {
    if !confidence.is_finite() || confidence < params.confidence_threshold {
        return;
    }
    if cxcywh.iter().any(|v| !v.is_finite()) {
        return;
    }
    let [cx, cy, w, h] = cxcywh;
    let (half_w, half_h) = (w.abs() / 2.0, h.abs() / 2.0);
    candidates.push(DetectedObject {
        class_id,
        confidence,
        bbox: [cx - half_w, cy - half_h, cx + half_w, cy + half_h],
    });
}

/// Greedy per-class NMS over candidates sorted by descending confidence
fn non_max_suppression(
    candidates: Vec<DetectedObject>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<DetectedObject> {
    let mut kept: Vec<DetectedObject> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area = |r: &[f32; 4]| (r[2] - r[0]) * (r[3] - r[1]);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tract_onnx::prelude::tract_ndarray::Array3;

    fn params() -> DetectionParams {
        DetectionParams {
            confidence_threshold: 0.25,
            iou_threshold: 0.5,
            max_detections: 300,
        }
    }

    fn identity() -> Letterbox {
        Letterbox::fit(640, 640, 640)
    }

    /// Pad with all-zero anchors so anchors outnumber attributes, as in real heads
    fn padded(rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let attrs = rows[0].len();
        let mut rows = rows.to_vec();
        while rows.len() <= attrs {
            rows.push(vec![0.0; attrs]);
        }
        rows
    }

    /// Build a `[1, 4 + nc, anchors]` head from per-anchor rows
    fn channels_first(rows: &[Vec<f32>]) -> Array3<f32> {
        let rows = padded(rows);
        let attrs = rows[0].len();
        Array3::from_shape_fn((1, attrs, rows.len()), |(_, k, i)| rows[i][k])
    }

    /// Build a `[1, anchors, 5 + nc]` head from per-anchor rows
    fn anchors_first(rows: &[Vec<f32>]) -> Array3<f32> {
        let rows = padded(rows);
        let attrs = rows[0].len();
        Array3::from_shape_fn((1, rows.len(), attrs), |(_, i, k)| rows[i][k])
    }

    #[test]
    fn test_probabilities_pass_through() {
        let probs = class_probabilities(vec![0.2, 0.8]);
        assert_eq!(probs, vec![0.2, 0.8]);
    }

    #[test]
    fn test_logits_are_softmaxed() {
        let probs = class_probabilities(vec![1.0, 3.0, -2.0]);

        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[1] > probs[0] && probs[0] > probs[2]);
    }

    #[test]
    fn test_decode_channels_first() {
        let head = channels_first(&[
            vec![100.0, 100.0, 20.0, 40.0, 0.9, 0.1],
            vec![300.0, 300.0, 50.0, 50.0, 0.05, 0.6],
            vec![500.0, 500.0, 10.0, 10.0, 0.1, 0.1],
        ]);

        let dets = decode_detections(head.view().into_dyn(), &params(), &identity()).unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[0].bbox, [90.0, 80.0, 110.0, 120.0]);
        assert_eq!(dets[1].class_id, 1);
        assert_eq!(dets[1].bbox, [275.0, 275.0, 325.0, 325.0]);
    }

    #[test]
    fn test_decode_anchors_first_uses_objectness() {
        let head = anchors_first(&[
            vec![50.0, 50.0, 10.0, 10.0, 0.5, 0.9, 0.1],
            vec![60.0, 60.0, 10.0, 10.0, 0.9, 0.2, 0.8],
        ]);

        let dets = decode_detections(head.view().into_dyn(), &params(), &identity()).unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 1);
        assert!((dets[0].confidence - 0.72).abs() < 1e-6);
        assert!((dets[1].confidence - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap_only() {
        let head = channels_first(&[
            vec![100.0, 100.0, 50.0, 50.0, 0.9, 0.0],
            vec![102.0, 102.0, 50.0, 50.0, 0.8, 0.0],
            vec![101.0, 101.0, 50.0, 50.0, 0.0, 0.7],
        ]);

        let dets = decode_detections(head.view().into_dyn(), &params(), &identity()).unwrap();

        let classes: Vec<usize> = dets.iter().map(|d| d.class_id).collect();
        assert_eq!(classes, vec![0, 1]);
    }

    #[test]
    fn test_max_detections_cap() {
        let rows: Vec<Vec<f32>> = (0..10)
            .map(|i| vec![i as f32 * 60.0 + 20.0, 20.0, 10.0, 10.0, 0.9 - i as f32 * 0.01])
            .collect();
        let head = channels_first(&rows);
        let capped = DetectionParams { max_detections: 3, ..params() };

        let dets = decode_detections(head.view().into_dyn(), &capped, &identity()).unwrap();

        assert_eq!(dets.len(), 3);
        assert!(dets.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_no_candidates_is_empty_not_error() {
        let head = channels_first(&[vec![100.0, 100.0, 10.0, 10.0, 0.01]]);

        let dets = decode_detections(head.view().into_dyn(), &params(), &identity()).unwrap();

        assert!(dets.is_empty());
    }

    #[test]
    fn test_unsupported_shape() {
        let head = Array3::<f32>::zeros((2, 6, 10)).into_dyn();
        assert!(decode_detections(head.view(), &params(), &identity()).is_err());
    }

    #[test]
    fn test_iou() {
        assert_eq!(iou(&[0.0, 0.0, 10.0, 10.0], &[0.0, 0.0, 10.0, 10.0]), 1.0);
        assert_eq!(iou(&[0.0, 0.0, 10.0, 10.0], &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((iou(&[0.0, 0.0, 10.0, 10.0], &[5.0, 0.0, 15.0, 10.0]) - 1.0 / 3.0).abs() < 1e-6);
    }
}
