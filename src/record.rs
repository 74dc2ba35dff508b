//! The persisted résumé record and its structured feedback.
//!
//! A record is written twice during an analysis: once with
//! [`FeedbackState::Pending`] right after both files are stored, and once
//! more with [`FeedbackState::Ready`] after scoring. Anything reading the
//! store must accept both shapes, because a failed scoring call leaves the
//! first write in place.
//!
//! Serialised shape (camelCase JSON, stored as a string value):
//!
//! ```text
//! { "id": "…", "resumePath": "…", "imagePath": "…", "companyName": "…",
//!   "jobTitle": "…", "jobDescription": "…", "feedback": "" | { … } }
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    id: String,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: FeedbackState,
}

impl ResumeRecord {
    /// Build a record with pending feedback. The id is fixed for the
    /// lifetime of the record.
    pub fn new(
        id: impl Into<String>,
        resume_path: impl Into<String>,
        image_path: impl Into<String>,
        company_name: impl Into<String>,
        job_title: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resume_path: resume_path.into(),
            image_path: image_path.into(),
            company_name: company_name.into(),
            job_title: job_title.into(),
            job_description: job_description.into(),
            feedback: FeedbackState::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key under which this record is stored, e.g. `resume:<id>`.
    pub fn key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.id)
    }

    /// View route for this record.
    pub fn route(&self) -> String {
        format!("/resume/{}", self.id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Feedback slot of a record: empty string until scoring completes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FeedbackState {
    #[default]
    Pending,
    Ready(Feedback),
}

impl FeedbackState {
    pub fn as_ready(&self) -> Option<&Feedback> {
        match self {
            FeedbackState::Ready(f) => Some(f),
            FeedbackState::Pending => None,
        }
    }
}

impl Serialize for FeedbackState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeedbackState::Pending => serializer.serialize_str(""),
            FeedbackState::Ready(f) => f.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FeedbackState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(#[allow(dead_code)] String),
            Ready(Feedback),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(_) => FeedbackState::Pending,
            Raw::Ready(f) => FeedbackState::Ready(f),
        })
    }
}

/// Structured feedback returned by the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// 0–100.
    pub overall_score: f64,
    #[serde(rename = "ATS")]
    pub ats: Category,
    pub tone_and_style: Category,
    pub content: Category,
    pub structure: Category,
    pub skills: Category,
}

impl Feedback {
    /// Categories in display order, with their labels.
    pub fn categories(&self) -> [(&'static str, &Category); 5] {
        [
            ("ATS", &self.ats),
            ("Tone & Style", &self.tone_and_style),
            ("Content", &self.content),
            ("Structure", &self.structure),
            ("Skills", &self.skills),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}
