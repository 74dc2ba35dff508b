//! Scoring prompts and the instruction payload sent with each review.
//!
//! Every prompt lives here so a wording change touches exactly one place and
//! tests can inspect the text without a live model.

use crate::config::ResponseFormat;
use serde::{Deserialize, Serialize};

/// System prompt used when `ReviewConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert in ATS (Applicant Tracking System) and resume analysis.
You will be given an image of the first page of a candidate's resume together with the job it targets.
Rate the resume honestly: low scores are fine when the resume is weak. Be thorough and specific.
Respond only with the requested format. Do not add commentary, markdown fences or explanations outside it."#;

/// The response shape the scorer must produce.
pub const FEEDBACK_FORMAT: &str = r#"interface Feedback {
  overallScore: number; // max 100
  ATS: {
    score: number; // rate based on ATS suitability
    tips: { type: "good" | "improve"; tip: string; }[]; // give 3-4 tips
  };
  toneAndStyle: {
    score: number; // max 100
    tips: { type: "good" | "improve"; tip: string; explanation: string; }[]; // give 3-4 tips
  };
  content: {
    score: number; // max 100
    tips: { type: "good" | "improve"; tip: string; explanation: string; }[]; // give 3-4 tips
  };
  structure: {
    score: number; // max 100
    tips: { type: "good" | "improve"; tip: string; explanation: string; }[]; // give 3-4 tips
  };
  skills: {
    score: number; // max 100
    tips: { type: "good" | "improve"; tip: string; explanation: string; }[]; // give 3-4 tips
  };
}"#;

/// Structured instruction payload handed to the scoring capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringInstructions {
    pub job_title: String,
    pub job_description: String,
    pub response_format: ResponseFormat,
}

impl ScoringInstructions {
    pub fn new(
        job_title: impl Into<String>,
        job_description: impl Into<String>,
        response_format: ResponseFormat,
    ) -> Self {
        Self {
            job_title: job_title.into(),
            job_description: job_description.into(),
            response_format,
        }
    }

    /// Render the instructions as the user-turn text.
    pub fn to_prompt(&self) -> String {
        format!(
            "Please analyze and rate this resume and suggest how to improve it.\n\
             If provided, take the job description into consideration.\n\
             The job title is: {title}\n\
             The job description is: {description}\n\
             Provide the feedback using the following format:\n{format}\n\
             Return the analysis as a {tag} object, without any other text and without the backticks.\n\
             Do not include any other text or comments.",
            title = self.job_title,
            description = self.job_description,
            format = FEEDBACK_FORMAT,
            tag = self.response_format.as_str().to_uppercase(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_job_context_and_format() {
        let i = ScoringInstructions::new("Engineer", "Build things", ResponseFormat::Json);
        let p = i.to_prompt();
        assert!(p.contains("The job title is: Engineer"));
        assert!(p.contains("The job description is: Build things"));
        assert!(p.contains("as a JSON object"));
        assert!(p.contains("overallScore"));
    }

    #[test]
    fn payload_serialises_camel_case() {
        let i = ScoringInstructions::new("Engineer", "Build things", ResponseFormat::Json);
        let v = serde_json::to_value(&i).unwrap();
        assert_eq!(v["jobTitle"], "Engineer");
        assert_eq!(v["responseFormat"], "json");
    }
}
