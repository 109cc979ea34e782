use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    status: Option<u16>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(status) = status {
                response["status"] = json!(status);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => match status {
            Some(status) => eprintln!("Error ({}): {}", status, message),
            None => eprintln!("Error: {}", message),
        },
    }
    Ok(())
}

/// Join a server base URL and an API path without doubling slashes
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Pull the `message` field out of an API error body
pub fn error_message(body: &Value) -> String {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("unexpected response from server")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            endpoint("http://localhost:7071/", "/api/checkAdminStatus"),
            "http://localhost:7071/api/checkAdminStatus"
        );
        assert_eq!(endpoint("http://h", "health"), "http://h/health");
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(error_message(&json!({ "message": "nope" })), "nope");
        assert_eq!(error_message(&json!({})), "unexpected response from server");
    }
}
