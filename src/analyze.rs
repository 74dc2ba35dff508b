//! The analysis orchestrator.
//!
//! [`ResumeAnalyzer::analyze`] runs a strictly sequential pipeline:
//!
//! ```text
//! upload PDF ─▶ rasterise page 1 ─▶ upload PNG ─▶ write record (pending)
//!      ─▶ score ─▶ parse feedback ─▶ rewrite record (ready) ─▶ route
//! ```
//!
//! The first failing step aborts the run; nothing is rolled back. A failure
//! after the first record write therefore leaves a record with empty
//! feedback in the store, which readers must tolerate.

use crate::backend::{require_auth, Capabilities, ScoringResponse, StoredBlob};
use crate::config::{ResponseFormat, ReviewConfig};
use crate::error::ReviewError;
use crate::model::{ConversionResult, UploadedFile, PNG_MIME};
use crate::pipeline::render::PageRasterizer;
use crate::progress::{AnalysisStage, NoopObserver, SharedObserver};
use crate::prompts::ScoringInstructions;
use crate::record::{Feedback, FeedbackState, ResumeRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where an unauthenticated submit is sent back to after signing in.
const UPLOAD_ROUTE: &str = "/upload";

/// The text fields of the upload form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisForm {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
}

impl AnalysisForm {
    pub fn with_file(self, file: UploadedFile) -> AnalysisRequest {
        AnalysisRequest {
            file,
            company_name: self.company_name,
            job_title: self.job_title,
            job_description: self.job_description,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file: UploadedFile,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The record as written by the second store write.
    pub record: ResumeRecord,
    /// `/resume/<id>`
    pub route: String,
}

pub struct ResumeAnalyzer {
    caps: Capabilities,
    rasterizer: Arc<dyn PageRasterizer>,
    key_prefix: String,
    response_format: ResponseFormat,
    observer: SharedObserver,
}

impl ResumeAnalyzer {
    pub fn new(caps: Capabilities, rasterizer: Arc<dyn PageRasterizer>, config: &ReviewConfig) -> Self {
        Self {
            caps,
            rasterizer,
            key_prefix: config.key_prefix.clone(),
            response_format: config.response_format,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Form submit: the held file (if any) plus the text fields.
    pub async fn submit(
        &self,
        file: Option<UploadedFile>,
        form: AnalysisForm,
    ) -> Result<AnalysisOutcome, ReviewError> {
        match file {
            Some(file) => self.analyze(form.with_file(file)).await,
            None => Err(self.report(ReviewError::NoFileSelected)),
        }
    }

    /// Run the full sequence for one submission.
    ///
    /// Requires an authenticated session; otherwise fails with
    /// [`ReviewError::Unauthenticated`] redirecting back to the upload view.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, ReviewError> {
        match self.run(request).await {
            Ok(outcome) => {
                self.observer.on_complete(&outcome.route);
                Ok(outcome)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    async fn run(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, ReviewError> {
        require_auth(self.caps.auth.as_ref(), UPLOAD_ROUTE)?;

        self.stage(AnalysisStage::UploadingFile);
        let resume = self.upload(&request.file).await?;

        self.stage(AnalysisStage::Converting);
        let image = self.rasterizer.rasterize(&request.file).await?;
        check_conversion(&image)?;

        self.stage(AnalysisStage::UploadingImage);
        let image_blob = self.upload(&image.file).await?;

        self.stage(AnalysisStage::Preparing);
        let mut record = ResumeRecord::new(
            Uuid::new_v4().to_string(),
            resume.path,
            image_blob.path,
            request.company_name,
            request.job_title,
            request.job_description,
        );
        let key = record.key(&self.key_prefix);
        self.write(&key, &record).await?;

        self.stage(AnalysisStage::Analyzing);
        let instructions = ScoringInstructions::new(
            record.job_title.clone(),
            record.job_description.clone(),
            self.response_format,
        );
        let response = match self.caps.scoring.feedback(&record.resume_path, &instructions).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                return Err(ReviewError::ScoringFailed {
                    reason: "the scoring service returned no result".into(),
                })
            }
            Err(e) => return Err(ReviewError::ScoringFailed { reason: e.to_string() }),
        };

        record.feedback = FeedbackState::Ready(extract_feedback(&response)?);
        self.write(&key, &record).await?;

        self.stage(AnalysisStage::Complete);
        let route = record.route();
        info!("Analysis stored under {}", key);
        Ok(AnalysisOutcome { record, route })
    }

    async fn upload(&self, file: &UploadedFile) -> Result<StoredBlob, ReviewError> {
        let failed = |reason: String| ReviewError::UploadFailed {
            name: file.name().to_string(),
            reason,
        };
        match self.caps.storage.upload(file).await {
            Ok(Some(blob)) => {
                debug!("Uploaded {} → {} ({} bytes)", file.name(), blob.path, blob.size);
                Ok(blob)
            }
            Ok(None) => Err(failed("storage returned no result".into())),
            Err(e) => Err(failed(e.to_string())),
        }
    }

    async fn write(&self, key: &str, record: &ResumeRecord) -> Result<(), ReviewError> {
        let store_failed = |reason: String| ReviewError::StoreFailed {
            key: key.to_string(),
            reason,
        };
        let json = record.to_json().map_err(|e| store_failed(e.to_string()))?;
        self.caps
            .kv
            .set(key, &json)
            .await
            .map_err(|e| store_failed(e.to_string()))
    }

    fn stage(&self, stage: AnalysisStage) {
        info!("{}", stage.status_text());
        self.observer.on_stage(stage);
    }

    fn report(&self, error: ReviewError) -> ReviewError {
        warn!("Analysis failed: {}", error);
        self.observer.on_error(&error.status_text());
        error
    }
}

/// The rasteriser must hand back a named, non-empty PNG.
fn check_conversion(result: &ConversionResult) -> Result<(), ReviewError> {
    let file = &result.file;
    let problem = if file.name().is_empty() {
        Some("image has no name".to_string())
    } else if file.size() == 0 {
        Some(format!("'{}' is empty", file.name()))
    } else if file.mime_type() != PNG_MIME {
        Some(format!("'{}' has type '{}'", file.name(), file.mime_type()))
    } else {
        None
    };

    match problem {
        Some(detail) => Err(ReviewError::ConversionFailed { detail }),
        None => Ok(()),
    }
}

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*[ \t]*\n(.*?)\n?```\s*$").unwrap());

/// Parse the scorer's reply into [`Feedback`].
///
/// Accepts the string form and the first element of the sequence form.
/// One surrounding markdown code fence is tolerated.
pub fn extract_feedback(response: &ScoringResponse) -> Result<Feedback, ReviewError> {
    let text = response
        .content_text()
        .ok_or_else(|| ReviewError::MalformedScoringResponse {
            detail: "response content is an empty sequence".into(),
        })?;

    let body = match RE_CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    };

    serde_json::from_str(body).map_err(|e| ReviewError::MalformedScoringResponse {
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        Authenticator, BlobStorage, ContentPart, KeyValueStore, KvItem, MessageContent,
        ScoringMessage, ScoringService,
    };
    use crate::error::BackendError;
    use crate::progress::AnalysisObserver;
    use crate::record::tests::SAMPLE_FEEDBACK;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails the test if any capability is touched.
    struct Untouchable {
        signed_in: bool,
    }

    #[async_trait]
    impl BlobStorage for Untouchable {
        async fn upload(&self, _file: &UploadedFile) -> Result<Option<StoredBlob>, BackendError> {
            panic!("upload must not be called")
        }

        async fn read(&self, _path: &str) -> Result<Option<Vec<u8>>, BackendError> {
            panic!("read must not be called")
        }
    }

    #[async_trait]
    impl KeyValueStore for Untouchable {
        async fn set(&self, _key: &str, _value: &str) -> Result<(), BackendError> {
            panic!("set must not be called")
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            panic!("get must not be called")
        }

        async fn list(&self, _pattern: &str, _values: bool) -> Result<Vec<KvItem>, BackendError> {
            panic!("list must not be called")
        }
    }

    #[async_trait]
    impl ScoringService for Untouchable {
        async fn feedback(
            &self,
            _path: &str,
            _instructions: &ScoringInstructions,
        ) -> Result<Option<ScoringResponse>, BackendError> {
            panic!("feedback must not be called")
        }
    }

    #[async_trait]
    impl PageRasterizer for Untouchable {
        async fn rasterize(&self, _file: &UploadedFile) -> Result<ConversionResult, ReviewError> {
            panic!("rasterize must not be called")
        }
    }

    impl Authenticator for Untouchable {
        fn is_authenticated(&self) -> bool {
            self.signed_in
        }
    }

    #[derive(Default)]
    struct Errors(Mutex<Vec<String>>);

    impl AnalysisObserver for Errors {
        fn on_error(&self, status: &str) {
            self.0.lock().unwrap().push(status.to_string());
        }
    }

    fn analyzer(signed_in: bool, observer: Arc<Errors>) -> ResumeAnalyzer {
        let fake = Arc::new(Untouchable { signed_in });
        let caps = Capabilities {
            storage: fake.clone(),
            kv: fake.clone(),
            scoring: fake.clone(),
            auth: fake.clone(),
        };
        ResumeAnalyzer::new(caps, fake, &ReviewConfig::default()).with_observer(observer)
    }

    #[tokio::test]
    async fn submit_without_file_touches_nothing() {
        let errors = Arc::new(Errors::default());
        let err = analyzer(true, errors.clone())
            .submit(None, AnalysisForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::NoFileSelected));
        assert_eq!(
            *errors.0.lock().unwrap(),
            vec!["Error: Please upload a PDF first.".to_string()]
        );
    }

    #[tokio::test]
    async fn unauthenticated_redirects_to_upload() {
        let errors = Arc::new(Errors::default());
        let request = AnalysisForm::default().with_file(UploadedFile::pdf("cv.pdf", vec![1u8]));
        let err = analyzer(false, errors).analyze(request).await.unwrap_err();
        match err {
            ReviewError::Unauthenticated { redirect } => assert_eq!(redirect, "/auth?next=/upload"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn feedback_from_string_content() {
        let f = extract_feedback(&ScoringResponse::text(SAMPLE_FEEDBACK)).unwrap();
        assert_eq!(f.overall_score, 78.0);
        assert_eq!(f.ats.score, 80.0);
    }

    #[test]
    fn feedback_from_first_part() {
        let response = ScoringResponse {
            message: ScoringMessage {
                content: MessageContent::Parts(vec![
                    ContentPart {
                        text: SAMPLE_FEEDBACK.to_string(),
                    },
                    ContentPart {
                        text: "ignored".to_string(),
                    },
                ]),
            },
        };
        assert_eq!(extract_feedback(&response).unwrap().skills.score, 60.0);
    }

    #[test]
    fn feedback_inside_code_fence() {
        let fenced = format!("```json\n{SAMPLE_FEEDBACK}\n```\n");
        let f = extract_feedback(&ScoringResponse::text(fenced)).unwrap();
        assert_eq!(f.structure.score, 85.0);
    }

    #[test]
    fn empty_parts_are_malformed() {
        let response = ScoringResponse {
            message: ScoringMessage {
                content: MessageContent::Parts(vec![]),
            },
        };
        assert!(matches!(
            extract_feedback(&response),
            Err(ReviewError::MalformedScoringResponse { .. })
        ));
    }

    #[test]
    fn prose_is_malformed() {
        let err = extract_feedback(&ScoringResponse::text("I think it's great!")).unwrap_err();
        assert!(matches!(err, ReviewError::MalformedScoringResponse { .. }));
    }

    #[test]
    fn conversion_checks() {
        let ok = ConversionResult {
            image_url: String::new(),
            file: UploadedFile::new("cv.png", PNG_MIME, vec![1u8]),
            width: 1,
            height: 1,
        };
        assert!(check_conversion(&ok).is_ok());

        let mut empty = ok.clone();
        empty.file = UploadedFile::new("cv.png", PNG_MIME, Vec::<u8>::new());
        assert!(matches!(
            check_conversion(&empty),
            Err(ReviewError::ConversionFailed { .. })
        ));

        let mut jpeg = ok.clone();
        jpeg.file = UploadedFile::new("cv.jpg", "image/jpeg", vec![1u8]);
        assert!(check_conversion(&jpeg).is_err());

        let mut unnamed = ok;
        unnamed.file = UploadedFile::new("", PNG_MIME, vec![1u8]);
        assert!(check_conversion(&unnamed).is_err());
    }
}
