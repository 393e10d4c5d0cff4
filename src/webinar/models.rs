//! Wire types of the downstream webinar API.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Uniform response envelope: `{result, isSuccess, error}`.
///
/// When `is_success` is false the `result` must not be consumed, even if
/// present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(result: T) -> Self {
        Self {
            result: Some(result),
            is_success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            result: None,
            is_success: false,
            error: Some(error.into()),
        }
    }
}

/// A webinar proposal as stored by the webinars module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Proposal {
    #[serde(deserialize_with = "null_as_default")]
    pub proposal_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "flexible_datetime")]
    pub event_date: NaiveDateTime,
    #[serde(deserialize_with = "flexible_datetime")]
    pub creation_time: NaiveDateTime,
    #[serde(deserialize_with = "null_as_default")]
    pub audience_answer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub knowledge_answer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub use_case_answer: String,
    pub is_active: bool,
    pub webinar_number: i32,
    pub status: i32,
    pub meetup: Option<String>,
    pub streamyard: Option<String>,
    pub live_streaming: Option<String>,
    pub flyer: Option<String>,
    pub views: Option<i32>,
    pub live_attends: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Speaker {
    #[serde(deserialize_with = "null_as_default")]
    pub speaker_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub twitter: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub image: Option<String>,
}

impl Speaker {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// A proposal paired with the speakers presenting it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalWithSpeakers {
    pub proposal: Proposal,
    #[serde(deserialize_with = "null_as_default")]
    pub speakers: Vec<Speaker>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 timestamps, offset-less ISO timestamps (with or without
/// fractional seconds) and plain dates.
fn flexible_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(NaiveDateTime::default());
    };
    parse_datetime(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("unrecognized date-time format: {}", raw))
    })
}

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_proposal_envelope() {
        let envelope: ApiResponse<Vec<ProposalWithSpeakers>> = serde_json::from_value(json!({
            "result": [{
                "proposal": {
                    "proposalId": "c0ffee",
                    "title": "Minimal APIs",
                    "description": "All about endpoints",
                    "eventDate": "2025-03-15T00:00:00",
                    "creationTime": "2025-01-02T10:11:12.345Z",
                    "isActive": true,
                    "webinarNumber": 42,
                    "status": 1,
                    "meetup": "https://meetup.com/x",
                    "views": null
                },
                "speakers": [{
                    "speakerId": "s1",
                    "name": "Ana",
                    "lastName": "Pérez",
                    "email": "ana@example.com",
                    "twitter": "anap",
                    "description": "Dev",
                    "image": null
                }]
            }],
            "isSuccess": true,
            "error": null
        }))
        .unwrap();

        assert!(envelope.is_success);
        let items = envelope.result.unwrap();
        let proposal = &items[0].proposal;
        assert_eq!(proposal.webinar_number, 42);
        assert_eq!(proposal.event_date.format("%Y-%m-%d").to_string(), "2025-03-15");
        assert_eq!(proposal.meetup.as_deref(), Some("https://meetup.com/x"));
        assert_eq!(proposal.views, None);
        assert_eq!(items[0].speakers[0].full_name(), "Ana Pérez");
    }

    #[test]
    fn test_failure_envelope_without_result() {
        let envelope: ApiResponse<Vec<Speaker>> =
            serde_json::from_value(json!({"isSuccess": false, "error": "rate limited"})).unwrap();
        assert!(!envelope.is_success);
        assert!(envelope.result.is_none());
        assert_eq!(envelope.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_null_fields_become_defaults() {
        let speaker: Speaker =
            serde_json::from_value(json!({"name": "Ana", "lastName": null, "twitter": null}))
                .unwrap();
        assert_eq!(speaker.last_name, "");
        assert_eq!(speaker.full_name(), "Ana");

        let item: ProposalWithSpeakers =
            serde_json::from_value(json!({"proposal": {"title": "T"}, "speakers": null})).unwrap();
        assert!(item.speakers.is_empty());
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("2025-03-15T18:00:00-05:00").is_some());
        assert!(parse_datetime("2025-03-15T18:00:00.1234567").is_some());
        assert!(parse_datetime("2025-03-15").is_some());
        assert!(parse_datetime("15/03/2025").is_none());
    }

    #[test]
    fn test_offset_keeps_local_wall_clock() {
        let dt = parse_datetime("2025-03-15T23:30:00-05:00").unwrap();
        assert_eq!(dt.format("%d-%B-%Y").to_string(), "15-March-2025");
    }

    #[test]
    fn test_unrecognized_date_is_an_error() {
        let result: Result<Proposal, _> = serde_json::from_value(json!({"eventDate": "soon"}));
        assert!(result.is_err());
    }
}
