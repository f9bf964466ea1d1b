//! Request-shape validation for the books API.
//!
//! Pure functions from raw input to typed values, usable without an HTTP
//! stack. Bodies are decoded into request DTOs and checked with `validator`;
//! every offending field is reported, not just the first.

use std::borrow::Cow;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::models::{BookChanges, NewBook};

/// Length of the canonical hyphenated UUID form.
const HYPHENATED_UUID_LEN: usize = 36;

/// Body fields in the order issues are reported.
const BOOK_FIELDS: [&str; 3] = ["title", "author", "genre"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    fn new(message: &str, issues: Vec<FieldIssue>) -> Self {
        Self {
            message: message.to_string(),
            issues,
        }
    }

    fn body(issues: Vec<FieldIssue>) -> Self {
        Self::new("Invalid request body", issues)
    }
}

/// A body field as sent. Wrong JSON types are kept so they surface as
/// field issues next to the others instead of aborting decoding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum TextField {
    Text(String),
    Mistyped(Value),
}

impl TextField {
    fn into_text(self) -> Option<String> {
        match self {
            TextField::Text(text) => Some(text),
            TextField::Mistyped(_) => None,
        }
    }
}

/// `POST /api/books` body.
#[derive(Debug, Deserialize, Validate)]
struct CreateBookRequest {
    #[serde(default, deserialize_with = "present")]
    #[validate(required(message = "Required"), custom(function = "non_empty_text"))]
    title: Option<TextField>,
    #[serde(default, deserialize_with = "present")]
    #[validate(required(message = "Required"), custom(function = "non_empty_text"))]
    author: Option<TextField>,
    #[serde(default, deserialize_with = "present")]
    #[validate(required(message = "Required"), custom(function = "non_empty_text"))]
    genre: Option<TextField>,
}

/// `PUT /api/books/{id}` body. Absent fields stay unchanged.
#[derive(Debug, Deserialize, Validate)]
struct UpdateBookRequest {
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "non_empty_text"))]
    title: Option<TextField>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "non_empty_text"))]
    author: Option<TextField>,
    #[serde(default, deserialize_with = "present")]
    #[validate(custom(function = "non_empty_text"))]
    genre: Option<TextField>,
}

/// A key that is present is `Some`, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<TextField>, D::Error>
where
    D: Deserializer<'de>,
{
    TextField::deserialize(deserializer).map(Some)
}

fn non_empty_text(field: &TextField) -> Result<(), validator::ValidationError> {
    let violation =
        |code: &'static str, message: Cow<'static, str>| -> Result<(), validator::ValidationError> {
            Err(validator::ValidationError::new(code).with_message(message))
        };

    match field {
        TextField::Text(text) if text.trim().is_empty() => {
            violation("empty", Cow::Borrowed("Must not be empty"))
        }
        TextField::Text(_) => Ok(()),
        TextField::Mistyped(other) => violation(
            "type",
            Cow::Owned(format!("Expected string, received {}", type_name(other))),
        ),
    }
}

/// Accepts only the hyphenated `8-4-4-4-12` form.
pub fn parse_book_id(raw: &str) -> Result<Uuid, ValidationError> {
    let invalid = || {
        ValidationError::new(
            "Invalid route parameters",
            vec![FieldIssue::new("id", "Invalid uuid")],
        )
    };

    if raw.len() != HYPHENATED_UUID_LEN {
        return Err(invalid());
    }
    Uuid::parse_str(raw).map_err(|_| invalid())
}

/// Decode a request body. An empty body decodes to `null`.
pub fn parse_json_body(bytes: &[u8]) -> Result<Value, ValidationError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| {
        ValidationError::body(vec![FieldIssue::new(
            "body",
            format!("Malformed JSON: {}", e),
        )])
    })
}

pub fn parse_new_book(body: &Value) -> Result<NewBook, ValidationError> {
    let request: CreateBookRequest = decode(body)?;
    request.validate().map_err(|e| ValidationError::body(field_issues(&e)))?;

    match (
        request.title.and_then(TextField::into_text),
        request.author.and_then(TextField::into_text),
        request.genre.and_then(TextField::into_text),
    ) {
        (Some(title), Some(author), Some(genre)) => Ok(NewBook {
            title,
            author,
            genre,
        }),
        _ => Err(ValidationError::body(Vec::new())),
    }
}

pub fn parse_book_changes(body: &Value) -> Result<BookChanges, ValidationError> {
    let request: UpdateBookRequest = decode(body)?;
    request.validate().map_err(|e| ValidationError::body(field_issues(&e)))?;

    Ok(BookChanges {
        title: request.title.and_then(TextField::into_text),
        author: request.author.and_then(TextField::into_text),
        genre: request.genre.and_then(TextField::into_text),
    })
}

/// Only objects are accepted; serde would otherwise read a struct from an array.
fn decode<T: DeserializeOwned>(body: &Value) -> Result<T, ValidationError> {
    let shape_issue = |message: String| ValidationError::body(vec![FieldIssue::new("body", message)]);

    if !body.is_object() {
        return Err(shape_issue(format!(
            "Expected object, received {}",
            type_name(body)
        )));
    }
    T::deserialize(body).map_err(|e| shape_issue(e.to_string()))
}

fn field_issues(errors: &ValidationErrors) -> Vec<FieldIssue> {
    let by_field = errors.field_errors();
    BOOK_FIELDS
        .iter()
        .filter_map(|field| by_field.get(*field).map(|errs| (*field, errs)))
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                let message = err.message.clone().unwrap_or_else(|| err.code.clone());
                FieldIssue::new(field, message)
            })
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(err: &ValidationError) -> Vec<&str> {
        err.issues.iter().map(|i| i.field.as_str()).collect()
    }

    #[test]
    fn book_id_accepts_hyphenated_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_book_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn book_id_rejects_other_shapes() {
        let id = Uuid::new_v4();
        for raw in [
            "not-a-uuid".to_string(),
            "".to_string(),
            id.simple().to_string(),
            id.braced().to_string(),
            id.urn().to_string(),
            "zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz".to_string(),
        ] {
            let err = parse_book_id(&raw).unwrap_err();
            assert_eq!(fields(&err), vec!["id"], "accepted {raw:?}");
        }
    }

    #[test]
    fn new_book_requires_all_fields() {
        let book = parse_new_book(&json!({
            "title": "Dune", "author": "Herbert", "genre": "SciFi", "user_id": "intruder"
        }))
        .unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.genre, "SciFi");

        let err = parse_new_book(&json!({ "title": "Dune" })).unwrap_err();
        assert_eq!(fields(&err), vec!["author", "genre"]);
    }

    #[test]
    fn new_book_reports_type_and_empty_issues() {
        let err = parse_new_book(&json!({ "title": 42, "author": "", "genre": null })).unwrap_err();
        assert_eq!(err.issues[0].message, "Expected string, received number");
        assert_eq!(err.issues[1].message, "Must not be empty");
        assert_eq!(err.issues[2].message, "Expected string, received null");
    }

    #[test]
    fn body_must_be_an_object() {
        for body in [Value::Null, json!([]), json!("Dune")] {
            assert_eq!(fields(&parse_new_book(&body).unwrap_err()), vec!["body"]);
            assert_eq!(fields(&parse_book_changes(&body).unwrap_err()), vec!["body"]);
        }
    }

    #[test]
    fn changes_are_all_optional() {
        assert!(parse_book_changes(&json!({})).unwrap().is_empty());

        let changes = parse_book_changes(&json!({ "genre": "Classic" })).unwrap();
        assert_eq!(changes.genre.as_deref(), Some("Classic"));
        assert!(changes.title.is_none());

        let err = parse_book_changes(&json!({ "title": true, "author": "" })).unwrap_err();
        assert_eq!(fields(&err), vec!["title", "author"]);
    }

    #[test]
    fn null_is_a_type_error_not_an_absent_field() {
        let err = parse_book_changes(&json!({ "genre": null })).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::new("genre", "Expected string, received null")]);
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let err = parse_new_book(&json!({ "title": "  ", "author": "Austen", "genre": "\t" }))
            .unwrap_err();
        assert_eq!(fields(&err), vec!["title", "genre"]);
        assert!(err.issues.iter().all(|i| i.message == "Must not be empty"));
    }

    #[test]
    fn create_request_validator_flags_missing_fields() {
        let request: CreateBookRequest =
            serde_json::from_value(json!({ "author": "Herbert" })).unwrap();
        let errors = request.validate().unwrap_err();
        let issues = field_issues(&errors);
        assert_eq!(
            issues,
            vec![FieldIssue::new("title", "Required"), FieldIssue::new("genre", "Required")]
        );
    }

    #[test]
    fn json_body_decoding() {
        assert_eq!(parse_json_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_json_body(b"{\"a\":1}").unwrap(), json!({ "a": 1 }));
        assert_eq!(fields(&parse_json_body(b"{oops").unwrap_err()), vec!["body"]);
    }
}
