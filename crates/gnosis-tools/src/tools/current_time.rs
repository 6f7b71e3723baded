use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::registry::Tool;

/// Tool for reading the gateway's wall clock
pub struct GetCurrentTimeTool;

impl GetCurrentTimeTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GetCurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time, either in UTC or in the server's local timezone"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "enum": ["utc", "local"],
                    "description": "Timezone to report the time in (default: utc)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let timezone = args
            .get("timezone")
            .and_then(|v| v.as_str())
            .unwrap_or("utc");

        let (iso8601, unix) = match timezone {
            "utc" => {
                let now = Utc::now();
                (now.to_rfc3339(), now.timestamp())
            }
            "local" => {
                let now = Local::now();
                (now.to_rfc3339(), now.timestamp())
            }
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "unsupported timezone '{}', expected 'utc' or 'local'",
                    other
                )))
            }
        };

        Ok(json!({
            "timezone": timezone,
            "iso8601": iso8601,
            "unix": unix,
        }))
    }
}
