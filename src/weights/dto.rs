use serde::{Deserialize, Serialize};

/// Body of POST /api/add_weight. No range checks on `weight` beyond the
/// numeric parse serde performs.
#[derive(Debug, Deserialize)]
pub struct AddWeightRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AddWeightResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub username: Option<String>,
}

/// One row of GET /api/history, ascending by date.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub date: String,
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entry_wire_shape() {
        let json = serde_json::to_string(&HistoryEntry {
            date: "2024-05-01".into(),
            weight: 70.5,
        })
        .unwrap();
        assert_eq!(json, r#"{"date":"2024-05-01","weight":70.5}"#);
    }

    #[test]
    fn weight_accepts_any_numeric_value() {
        let req: AddWeightRequest =
            serde_json::from_str(r#"{"username":"a","weight":-12.5}"#).unwrap();
        assert_eq!(req.weight, Some(-12.5));
    }
}
