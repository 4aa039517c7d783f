use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

/// The JSON answer envelope returned by `application/dns-json` DoH resolvers.
///
/// Only [`Answer::data`] is consumed. Missing and `null` lists decode as empty.
#[serde_as]
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AnswerEnvelope {
    #[serde(rename = "Status")]
    pub status: u16,
    #[serde(rename = "TC")]
    pub truncated: bool,
    #[serde(rename = "RD")]
    pub recursion_desired: bool,
    #[serde(rename = "RA")]
    pub recursion_available: bool,
    #[serde(rename = "AD")]
    pub authenticated_data: bool,
    #[serde(rename = "CD")]
    pub checking_disabled: bool,
    #[serde(rename = "Question")]
    #[serde_as(as = "DefaultOnNull")]
    pub questions: Vec<Question>,
    #[serde(rename = "Answer")]
    #[serde_as(as = "DefaultOnNull")]
    pub answers: Vec<Answer>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Question {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Answer {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "TTL")]
    pub ttl: u32,
    pub data: String,
}

impl AnswerEnvelope {
    /// Join the `data` of every answer with `", "`, in the order the resolver returned them.
    #[must_use]
    pub fn flatten(&self) -> String {
        self.answers
            .iter()
            .map(|answer| answer.data.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(data: &str) -> Answer {
        Answer {
            name: "example.com".to_string(),
            record_type: 1,
            ttl: 300,
            data: data.to_string(),
        }
    }

    #[test]
    fn flatten_joins_in_order() {
        let envelope = AnswerEnvelope {
            answers: vec![answer("1.2.3.4"), answer("5.6.7.8")],
            ..AnswerEnvelope::default()
        };
        assert_eq!(envelope.flatten(), "1.2.3.4, 5.6.7.8");
    }

    #[test]
    fn flatten_without_answers_is_empty() {
        assert_eq!(AnswerEnvelope::default().flatten(), "");
    }

    #[test]
    fn decodes_cloudflare_response() {
        let body = r#"{
            "Status": 0, "TC": false, "RD": true, "RA": true, "AD": false, "CD": false,
            "Question": [{ "name": "example.com", "type": 1 }],
            "Answer": [{ "name": "example.com", "type": 1, "TTL": 3005, "data": "93.184.216.34" }]
        }"#;
        let envelope: AnswerEnvelope = serde_json::from_str(body).unwrap();
        assert!(envelope.recursion_desired);
        assert_eq!(envelope.questions[0].name, "example.com");
        assert_eq!(envelope.answers[0].ttl, 3005);
        assert_eq!(envelope.flatten(), "93.184.216.34");
    }

    #[test]
    fn decodes_nxdomain_without_answers() {
        let body = r#"{ "Status": 3, "Question": [{ "name": "nope.invalid", "type": 1 }],
            "Authority": [{ "name": "invalid", "type": 6, "TTL": 60, "data": "soa" }] }"#;
        let envelope: AnswerEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.status, 3);
        assert!(envelope.answers.is_empty());
        assert_eq!(envelope.flatten(), "");
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let body = r#"{ "Status": 3, "Question": null, "Answer": null }"#;
        let envelope: AnswerEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.status, 3);
        assert!(envelope.questions.is_empty());
        assert!(envelope.answers.is_empty());
        assert_eq!(envelope.flatten(), "");
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(serde_json::from_str::<AnswerEnvelope>(r#"{ "Answer": "nope" }"#).is_err());
        assert!(serde_json::from_str::<AnswerEnvelope>("<html>").is_err());
    }
}
