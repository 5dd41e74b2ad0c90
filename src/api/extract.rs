//! Extractors whose rejections flow through the error translator.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts, StatusCode},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::Segment;

use crate::errors::{ApiError, ApiException, FieldErrors, ValidationDetail, REQUIRED_FIELD_MESSAGE};

/// Key used for messages that cannot be attributed to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// JSON body that fails with `unsupported_media_type`, `parse_error` or `validation_error`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json_content_type(&content_type) {
            return Err(ApiException::unsupported_media_type(content_type).into());
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiException::custom(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "payload_too_large",
                    "Request body is too large.",
                )
            } else {
                ApiException::parse_error(rejection.body_text())
            }
        })?;

        let value: Value = serde_json::from_slice(&bytes).map_err(ApiException::parse_error)?;
        let parsed = deserialize_fields(value)
            .map_err(|fields| ApiError::validation(ValidationDetail::Fields(fields)))?;

        Ok(Self(parsed))
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Upper bound on re-deserialization passes while collecting field errors
const MAX_PASSES: usize = 64;

/// Stand-in values tried, in order, for a missing or invalid field so that deserialization can
/// continue past it
fn placeholder(attempt: usize) -> Option<Value> {
    let value = match attempt {
        0 => Value::Null,
        1 => Value::String(String::new()),
        2 => Value::from(0),
        3 => Value::Bool(false),
        4 => Value::Array(Vec::new()),
        5 => Value::Object(Default::default()),
        _ => return None,
    };
    Some(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

fn field_key(steps: &[Step]) -> String {
    let mut key = String::new();
    for step in steps {
        match step {
            Step::Key(name) => {
                if !key.is_empty() {
                    key.push('.');
                }
                key.push_str(name);
            }
            Step::Index(index) => key.push_str(&format!("[{index}]")),
        }
    }
    key
}

/// Path of a deserialization error, `None` when it runs through an enum or unknown segment
fn steps_of(path: &serde_path_to_error::Path) -> Option<Vec<Step>> {
    path.iter()
        .map(|segment| match segment {
            Segment::Map { key } => Some(Step::Key(key.clone())),
            Segment::Seq { index } => Some(Step::Index(*index)),
            _ => None,
        })
        .collect()
}

fn set_at(root: &mut Value, steps: &[Step], value: Value) -> bool {
    let Some((last, parents)) = steps.split_last() else {
        return false;
    };
    let mut current = root;
    for step in parents {
        let next = match (step, current) {
            (Step::Key(key), Value::Object(map)) => map.get_mut(key),
            (Step::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(next) => current = next,
            None => return false,
        }
    }
    match (last, current) {
        (Step::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            true
        }
        (Step::Index(index), Value::Array(items)) if *index < items.len() => {
            items[*index] = value;
            true
        }
        _ => false,
    }
}

/// Deserialize `value`, collecting every field error instead of stopping at the first one.
///
/// Missing fields get [`REQUIRED_FIELD_MESSAGE`] and wrongly typed fields get the serde message,
/// both keyed by their dotted path. After each error the offending field is filled with a
/// placeholder and deserialization is retried.
fn deserialize_fields<T: DeserializeOwned>(mut value: Value) -> Result<T, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut placeholders: Vec<(Vec<Step>, usize)> = Vec::new();

    for _ in 0..MAX_PASSES {
        let outcome: Result<T, _> = serde_path_to_error::deserialize(&value);
        let err = match outcome {
            Ok(parsed) if errors.is_empty() => return Ok(parsed),
            Ok(_) => return Err(errors),
            Err(err) => err,
        };

        let message = err.inner().to_string();
        let Some(mut steps) = steps_of(err.path()) else {
            errors
                .entry(NON_FIELD_ERRORS.to_string())
                .or_default()
                .push(message);
            break;
        };

        let missing = missing_field(&message).map(str::to_string);
        if let Some(field) = &missing {
            steps.push(Step::Key(field.clone()));
        }

        // An error at or below one of our own placeholders means it had the wrong shape
        if let Some(slot) = placeholders
            .iter()
            .position(|(filled, _)| steps.starts_with(filled))
        {
            let (filled, attempt) = &mut placeholders[slot];
            *attempt += 1;
            match placeholder(*attempt) {
                Some(next) if set_at(&mut value, filled, next.clone()) => continue,
                _ => break,
            }
        }

        if steps.is_empty() {
            errors
                .entry(NON_FIELD_ERRORS.to_string())
                .or_default()
                .push(message);
            break;
        }

        let text = match missing {
            Some(_) => REQUIRED_FIELD_MESSAGE.to_string(),
            None => message,
        };
        errors.entry(field_key(&steps)).or_default().push(text);

        match placeholder(0) {
            Some(first) if set_at(&mut value, &steps, first.clone()) => placeholders.push((steps, 0)),
            _ => break,
        }
    }

    Err(errors)
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .split('`')
        .next()
        .filter(|field| !field.is_empty())
}

/// Numeric primary key from the path; anything unparseable is a missing resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found())?;
        raw.parse().map(Self).map_err(|_| ApiError::not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CaughtError;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct NewRider {
        name: String,
        licence_class: String,
    }

    fn json_request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/riders/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn extract(content_type: Option<&str>, body: &str) -> Result<NewRider, CaughtError> {
        <ValidatedJson<NewRider> as FromRequest<()>>::from_request(json_request(content_type, body), &())
            .await
            .map(|ValidatedJson(rider)| rider)
            .map_err(|ApiError(err)| err)
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type(""));
    }

    #[test]
    fn test_missing_field_name() {
        assert_eq!(missing_field("missing field `name`"), Some("name"));
        assert_eq!(missing_field("invalid type: integer `1`, expected a string"), None);
    }

    #[tokio::test]
    async fn test_valid_body() {
        let rider = extract(
            Some("application/json"),
            r#"{"name": "Ada", "licence_class": "A2"}"#,
        )
        .await
        .unwrap();
        assert_eq!(rider.name, "Ada");
    }

    #[tokio::test]
    async fn test_missing_field_is_required_error() {
        let err = extract(Some("application/json"), r#"{"name": "Ada"}"#)
            .await
            .unwrap_err();
        let mut expected = FieldErrors::new();
        expected.insert("licence_class".to_string(), vec![REQUIRED_FIELD_MESSAGE.to_string()]);
        assert!(matches!(err, CaughtError::Validation(ValidationDetail::Fields(fields)) if fields == expected));
    }

    #[tokio::test]
    async fn test_every_missing_field_is_reported() {
        let err = extract(Some("application/json"), "{}").await.unwrap_err();
        let expected = ValidationDetail::required(["licence_class", "name"]);
        assert!(matches!(err, CaughtError::Validation(detail) if detail == expected));
    }

    #[tokio::test]
    async fn test_wrong_type_is_keyed_by_field() {
        let err = extract(Some("application/json"), r#"{"name": 7, "licence_class": "A"}"#)
            .await
            .unwrap_err();
        match err {
            CaughtError::Validation(ValidationDetail::Fields(fields)) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(
                    fields["name"],
                    vec!["invalid type: integer `7`, expected a string".to_string()]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Garage {
        owner: String,
        bikes: Vec<Bike>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Bike {
        make: String,
        year: u16,
    }

    #[test]
    fn test_nested_errors_use_dotted_paths() {
        let value = serde_json::json!({
            "bikes": [{"make": "Ducati", "year": "old"}, {"year": 1999}]
        });
        let fields = deserialize_fields::<Garage>(value).unwrap_err();

        let mut expected = FieldErrors::new();
        expected.insert("owner".to_string(), vec![REQUIRED_FIELD_MESSAGE.to_string()]);
        expected.insert(
            "bikes[0].year".to_string(),
            vec!["invalid type: string \"old\", expected u16".to_string()],
        );
        expected.insert("bikes[1].make".to_string(), vec![REQUIRED_FIELD_MESSAGE.to_string()]);
        assert_eq!(fields, expected);
    }

    #[test]
    fn test_non_object_body_is_non_field_error() {
        let fields = deserialize_fields::<Bike>(serde_json::json!("a bike")).unwrap_err();
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key(NON_FIELD_ERRORS));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let err = extract(Some("application/json"), "{not json").await.unwrap_err();
        match err {
            CaughtError::Api(exc) => {
                assert_eq!(exc.status(), StatusCode::BAD_REQUEST);
                assert_eq!(exc.default_code(), "parse_error");
                assert!(exc.to_string().starts_with("JSON parse error - "));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let err = extract(None, r#"{"name": "Ada"}"#).await.unwrap_err();
        match err {
            CaughtError::Api(exc) => {
                assert_eq!(exc.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
                assert_eq!(exc.to_string(), "Unsupported media type \"\" in request.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
