use crate::outcome::CheckOutcome;

/// Pretty printed JSON array, one object per outcome.
pub fn render(outcomes: &[CheckOutcome]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outcomes)
}
