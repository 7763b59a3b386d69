use chrono::{DateTime, Utc};
use serde::Serialize;

/// One successful prediction for one camera
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub camera_id: u32,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    /// Response body of the prediction API, passed through untouched
    pub result: serde_json::Value,
}

impl PredictionRecord {
    pub fn new(camera_id: u32, model: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            camera_id,
            model: model.into(),
            timestamp: Utc::now(),
            result,
        }
    }
}

/// One failed capture or prediction for one camera
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub camera_id: u32,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(camera_id: u32, error: impl Into<String>) -> Self {
        Self {
            camera_id,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prediction_record_json_shape() {
        let record = PredictionRecord::new(2, "resnet50", json!({"label": "cat", "score": 0.9}));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["cameraId"], 2);
        assert_eq!(value["model"], "resnet50");
        assert_eq!(value["result"]["label"], "cat");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_error_record_json_shape() {
        let record = ErrorRecord::new(0, "capture timed out");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["cameraId"], 0);
        assert_eq!(value["error"], "capture timed out");
    }
}
