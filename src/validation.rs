//! Presence checks for JSON request bodies.
//!
//! A field counts as present when it holds a truthy value: absent keys,
//! `null`, `false`, `0` and `""` are all treated as missing.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{FromRequest, Request},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::shared::AppError;

// Same ceiling axum's own body extractors default to
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// JSON request body that treats an empty body as `{}`
///
/// A non-empty body must be well-formed JSON sent as `application/json`;
/// anything else is rejected as a bad request rather than read as missing fields.
#[derive(Debug)]
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

        if bytes.is_empty() {
            debug!("Empty request body, reading as {{}}");
            return Ok(JsonBody(Value::Object(Default::default())));
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Returns the first of `fields` missing from `body`, in the order given
pub fn first_missing<'a>(body: &Value, fields: &[&'a str]) -> Option<&'a str> {
    fields
        .iter()
        .copied()
        .find(|field| !is_present(body.get(*field)))
}

pub fn require_fields(body: &Value, fields: &[&str]) -> Result<(), AppError> {
    match first_missing(body, fields) {
        Some(field) => Err(AppError::MissingField(field.to_string())),
        None => Ok(()),
    }
}

/// Reads a present field as an integer id
pub fn integer_field(body: &Value, field: &str) -> Result<i64, AppError> {
    body.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::BadRequest(format!("{} must be an integer", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({}), false)]
    #[case(json!({"roomId": null}), false)]
    #[case(json!({"roomId": 0}), false)]
    #[case(json!({"roomId": ""}), false)]
    #[case(json!({"roomId": false}), false)]
    #[case(json!({"roomId": 4}), true)]
    #[case(json!({"roomId": "4"}), true)]
    #[case(json!({"roomId": []}), true)]
    fn test_presence(#[case] body: serde_json::Value, #[case] expected: bool) {
        assert_eq!(is_present(body.get("roomId")), expected);
    }

    #[test]
    fn test_first_missing_respects_field_order() {
        let body = json!({"roomId": 1});
        assert_eq!(first_missing(&body, &["roomId", "memberId"]), Some("memberId"));

        let body = json!({});
        assert_eq!(first_missing(&body, &["roomId", "memberId"]), Some("roomId"));

        let body = json!({"roomId": 1, "memberId": 2});
        assert_eq!(first_missing(&body, &["roomId", "memberId"]), None);
    }

    #[test]
    fn test_require_fields_error() {
        let err = require_fields(&json!({"memberId": 3}), &["roomId"]).unwrap_err();
        assert!(matches!(err, AppError::MissingField(ref f) if f == "roomId"));
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_json_body_empty_reads_as_object() {
        for content_type in [None, Some("application/json")] {
            let JsonBody(value) = JsonBody::from_request(request(content_type, ""), &())
                .await
                .unwrap();
            assert_eq!(value, json!({}));
        }
    }

    #[tokio::test]
    async fn test_json_body_parses_json() {
        let JsonBody(value) =
            JsonBody::from_request(request(Some("application/json"), r#"{"roomId": 3}"#), &())
                .await
                .unwrap();
        assert_eq!(value, json!({"roomId": 3}));
    }

    #[rstest]
    #[case(Some("application/json"), "{roomId:")]
    #[case(Some("application/x-www-form-urlencoded"), "roomId=1")]
    #[case(None, r#"{"roomId": 1}"#)]
    #[tokio::test]
    async fn test_json_body_rejects_unreadable_bodies(
        #[case] content_type: Option<&str>,
        #[case] body: &'static str,
    ) {
        let result = JsonBody::from_request(request(content_type, body), &()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_integer_field() {
        assert_eq!(integer_field(&json!({"roomId": 12}), "roomId").unwrap(), 12);
        assert!(matches!(
            integer_field(&json!({"roomId": "12"}), "roomId"),
            Err(AppError::BadRequest(_))
        ));
    }
}
