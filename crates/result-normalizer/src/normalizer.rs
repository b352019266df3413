//! Inference result to response envelope mapping

use inference_engine::{
    ClassNames, ClassificationOutcome, DetectedObject, DetectionOutcome, InferenceResult,
};
use tracing::debug;

use crate::envelope::{Detection, FileInfo, Prediction, ResponseEnvelope};
use crate::NormalizeError;

/// Map one inference result onto its response envelope
pub fn normalize(
    result: InferenceResult,
    file_info: FileInfo,
) -> Result<ResponseEnvelope, NormalizeError> {
    match result {
        InferenceResult::Classification(outcome) => Ok(classification(outcome, file_info)),
        InferenceResult::Detection(outcome) => Ok(detection(outcome, file_info)),
        InferenceResult::Empty => Err(NormalizeError::UnrecognizedShape),
    }
}

fn classification(outcome: ClassificationOutcome, file_info: FileInfo) -> ResponseEnvelope {
    let ClassificationOutcome {
        class_id,
        confidence,
        names,
    } = outcome;

    ResponseEnvelope::Classification {
        success: true,
        prediction: Prediction {
            class_id,
            class_name: resolve_class_name(names.as_ref(), class_id),
            confidence: round_confidence(confidence),
        },
        file_info,
    }
}

fn detection(outcome: DetectionOutcome, file_info: FileInfo) -> ResponseEnvelope {
    let DetectionOutcome { objects, names } = outcome;

    let detections: Vec<Detection> = objects
        .into_iter()
        .map(|object| detected(object, names.as_ref()))
        .collect();
    debug!("Normalized {} detections", detections.len());

    ResponseEnvelope::Detection {
        success: true,
        total_objects: detections.len(),
        detections,
        file_info,
    }
}

fn detected(object: DetectedObject, names: Option<&ClassNames>) -> Detection {
    let [x1, y1, x2, y2] = object.bbox.map(f64::from);
    Detection {
        class_id: object.class_id,
        class_name: resolve_class_name(names, object.class_id),
        confidence: round_confidence(object.confidence),
        bbox: [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
    }
}

/// Name from the lookup table, or `class_<id>` when unknown
pub fn resolve_class_name(names: Option<&ClassNames>, class_id: usize) -> String {
    names
        .and_then(|names| names.get(class_id))
        .map(str::to_string)
        .unwrap_or_else(|| format!("class_{}", class_id))
}

/// Round to 4 decimal places.
///
/// Formatting rounds on the exact binary value of the widened score, so
/// halfway cases resolve like a decimal-correct `round(x, 4)`.
pub fn round_confidence(confidence: f32) -> f64 {
    let value = f64::from(confidence);
    format!("{:.4}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn file_info() -> FileInfo {
        FileInfo {
            filename: Some("red.png".to_string()),
            size: 75,
        }
    }

    fn cat_dog() -> Option<ClassNames> {
        Some(ClassNames::from_list(["cat", "dog"]))
    }

    #[test]
    fn test_classification_envelope_json() {
        let result = InferenceResult::Classification(ClassificationOutcome {
            class_id: 1,
            confidence: 0.87234,
            names: cat_dog(),
        });

        let envelope = normalize(result, file_info()).unwrap();

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "prediction": {"class_id": 1, "class_name": "dog", "confidence": 0.8723},
                "file_info": {"filename": "red.png", "size": 75}
            })
        );
    }

    #[test]
    fn test_classification_fallback_name() {
        let result = InferenceResult::Classification(ClassificationOutcome {
            class_id: 7,
            confidence: 0.5,
            names: cat_dog(),
        });

        match normalize(result, file_info()).unwrap() {
            ResponseEnvelope::Classification { prediction, .. } => {
                assert_eq!(prediction.class_name, "class_7")
            }
            other => panic!("expected classification, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_table_uses_fallback() {
        assert_eq!(resolve_class_name(None, 3), "class_3");
        assert_eq!(resolve_class_name(Some(&ClassNames::default()), 0), "class_0");
    }

    #[test]
    fn test_detection_envelope_json() {
        let result = InferenceResult::Detection(DetectionOutcome {
            objects: vec![
                DetectedObject { class_id: 0, confidence: 0.91234, bbox: [1.5, 2.0, 30.0, 40.25] },
                DetectedObject { class_id: 4, confidence: 0.5, bbox: [0.0, 0.0, 8.0, 8.0] },
            ],
            names: cat_dog(),
        });

        let envelope = normalize(result, file_info()).unwrap();

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "detections": [
                    {"class_id": 0, "class_name": "cat", "confidence": 0.9123, "bbox": [1.5, 2.0, 30.0, 40.25]},
                    {"class_id": 4, "class_name": "class_4", "confidence": 0.5, "bbox": [0.0, 0.0, 8.0, 8.0]}
                ],
                "total_objects": 2,
                "file_info": {"filename": "red.png", "size": 75}
            })
        );
    }

    #[test]
    fn test_zero_detections() {
        let result = InferenceResult::Detection(DetectionOutcome {
            objects: Vec::new(),
            names: None,
        });

        match normalize(result, file_info()).unwrap() {
            ResponseEnvelope::Detection {
                detections,
                total_objects,
                ..
            } => {
                assert!(detections.is_empty());
                assert_eq!(total_objects, 0);
            }
            other => panic!("expected detection, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_box_corners_are_ordered() {
        let object = DetectedObject {
            class_id: 0,
            confidence: 0.9,
            bbox: [10.0, 20.0, 5.0, 2.0],
        };

        assert_eq!(detected(object, None).bbox, [5.0, 2.0, 10.0, 20.0]);
    }

    #[test]
    fn test_empty_result_is_error() {
        assert_eq!(
            normalize(InferenceResult::Empty, file_info()),
            Err(NormalizeError::UnrecognizedShape)
        );
    }

    #[test]
    fn test_missing_filename_serializes_null() {
        let info = FileInfo { filename: None, size: 3 };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"filename": null, "size": 3})
        );
    }

    #[test]
    fn test_round_confidence() {
        assert_eq!(round_confidence(0.87234), 0.8723);
        assert_eq!(round_confidence(1.0), 1.0);
        assert_eq!(round_confidence(0.0), 0.0);
        assert_eq!(round_confidence(0.99996), 1.0);
        assert_eq!(round_confidence(0.00004), 0.0);
    }

    fn detected_object() -> impl Strategy<Value = DetectedObject> {
        (0usize..20, 0.0f32..=1.0, prop::array::uniform4(-1000.0f32..1000.0)).prop_map(
            |(class_id, confidence, bbox)| DetectedObject {
                class_id,
                confidence,
                bbox,
            },
        )
    }

    proptest! {
        #[test]
        fn prop_confidence_has_at_most_four_decimals(c in 0.0f32..=1.0) {
            let rounded = round_confidence(c);
            prop_assert!((0.0..=1.0).contains(&rounded));
            prop_assert!((rounded - f64::from(c)).abs() <= 0.00005 + 1e-12);
            let scaled = rounded * 10_000.0;
            prop_assert!((scaled - scaled.round()).abs() < 1e-6);
        }

        #[test]
        fn prop_detections_keep_order_and_count(objects in prop::collection::vec(detected_object(), 0..30)) {
            let result = InferenceResult::Detection(DetectionOutcome {
                objects: objects.clone(),
                names: None,
            });

            match normalize(result, file_info()).unwrap() {
                ResponseEnvelope::Detection { detections, total_objects, .. } => {
                    prop_assert_eq!(detections.len(), objects.len());
                    prop_assert_eq!(total_objects, objects.len());
                    for (detection, object) in detections.iter().zip(&objects) {
                        prop_assert_eq!(detection.class_id, object.class_id);
                        prop_assert_eq!(detection.confidence, round_confidence(object.confidence));
                        prop_assert!(detection.bbox.iter().all(|v| v.is_finite()));
                        prop_assert!(detection.bbox[0] <= detection.bbox[2]);
                        prop_assert!(detection.bbox[1] <= detection.bbox[3]);
                    }
                }
                other => prop_assert!(false, "expected detection, got {:?}", other),
            }
        }
    }
}
