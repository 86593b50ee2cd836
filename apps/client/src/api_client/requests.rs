//! Backend actions as tagged request variants.
//!
//! Each variant knows its endpoint, validates itself against the backend's
//! acceptance rules and only then serializes into a multipart form.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::errors::{ClientError, Result};
use crate::validation::{
    validate_file, validate_text_input, FileCandidate, DOCUMENT_EXTENSIONS, MARKDOWN_EXTENSIONS,
};

pub const DEFAULT_MODEL: &str = "gemma-3-4b-it";
pub const DEFAULT_TEMPERATURE: f64 = 0.15;
/// The backend generates at most two documents per request.
pub const MAX_OUTPUT_TYPES: usize = 2;

/// What the backend should generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    Resume,
    CoverLetter,
    Skills,
    InterviewHrQuestions,
    InterviewJobSpecific,
    InterviewReverse,
    ColdEmail,
}

impl OutputType {
    pub fn endpoint(self) -> &'static str {
        match self {
            OutputType::Resume => "/api/process/resume",
            OutputType::CoverLetter => "/api/process/cover-letter",
            OutputType::Skills => "/api/process/skills",
            OutputType::InterviewHrQuestions => "/api/generate/interview-hr-questions",
            OutputType::InterviewJobSpecific => "/api/generate/interview-job-specific",
            OutputType::InterviewReverse => "/api/generate/interview-reverse",
            OutputType::ColdEmail => "/api/generate/cold-email",
        }
    }

    /// Value the backend expects in `promptType`.
    pub fn prompt_type(self) -> &'static str {
        match self {
            OutputType::Resume => "resume",
            OutputType::CoverLetter => "cover",
            OutputType::Skills => "skills",
            OutputType::InterviewHrQuestions => "interview-hr-questions",
            OutputType::InterviewJobSpecific => "interview-job-specific",
            OutputType::InterviewReverse => "interview-reverse",
            OutputType::ColdEmail => "cold-email",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputType::Resume => "Resume",
            OutputType::CoverLetter => "Cover letter",
            OutputType::Skills => "Skills suggestions",
            OutputType::InterviewHrQuestions => "HR interview questions",
            OutputType::InterviewJobSpecific => "Job-specific interview questions",
            OutputType::InterviewReverse => "Reverse interview questions",
            OutputType::ColdEmail => "Cold email",
        }
    }

    /// Only resume and cover letter generation read the candidate's resume.
    pub fn requires_resume(self) -> bool {
        matches!(self, OutputType::Resume | OutputType::CoverLetter)
    }

    /// Skills suggestions are produced from the job description alone.
    pub fn requires_job_details(self) -> bool {
        self != OutputType::Skills
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn endpoint(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "/api/markdownFile2PDF",
            DocumentFormat::Docx => "/api/markdownFile2DOCX",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// A job description or resume, pasted or uploaded.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentInput {
    Text(String),
    File(PathBuf),
}

impl DocumentInput {
    fn validate(&self, label: &str) -> Option<String> {
        match self {
            DocumentInput::Text(text) => validate_text_input(text, label),
            DocumentInput::File(path) => match FileCandidate::from_path(path) {
                Ok(candidate) => validate_file(Some(&candidate), DOCUMENT_EXTENSIONS)
                    .error_message
                    .map(|msg| format!("{label}: {msg}")),
                Err(e) => Some(format!("{label} file could not be read: {e}")),
            },
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            DocumentInput::Text(text) => Some(text.trim()),
            DocumentInput::File(_) => None,
        }
    }
}

/// Generation options shared by every processing action.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOptions {
    pub output_types: Vec<OutputType>,
    pub model: String,
    pub temperature: f64,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub interviewer_name: Option<String>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            output_types: vec![OutputType::Resume],
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            job_title: None,
            company_name: None,
            interviewer_name: None,
        }
    }
}

impl OptimizeOptions {
    fn requires_resume(&self) -> bool {
        self.output_types.iter().any(|t| t.requires_resume())
    }

    fn validate(&self, errors: &mut Vec<String>) {
        if self.output_types.is_empty() || self.output_types.len() > MAX_OUTPUT_TYPES {
            errors.push(format!(
                "Select between 1 and {MAX_OUTPUT_TYPES} output types"
            ));
        }

        if !(self.temperature > 0.0 && self.temperature < 2.0) {
            errors.push("Temperature must be greater than 0 and less than 2".to_string());
        }

        if self.model.trim().is_empty() {
            errors.push("Model is required".to_string());
        }

        if self.output_types.iter().any(|t| t.requires_job_details()) {
            if is_blank(&self.job_title) {
                errors.push("Job title is required".to_string());
            }
            if is_blank(&self.company_name) {
                errors.push("Company is required".to_string());
            }
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

/// The `optimize` JSON part, named the way the backend reads it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizePayload<'a> {
    prompt_type: Vec<&'static str>,
    temperature: f64,
    model: &'a str,
    #[serde(rename = "resume_string", skip_serializing_if = "Option::is_none")]
    resume: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_title: Option<&'a str>,
    #[serde(rename = "company_name", skip_serializing_if = "Option::is_none")]
    company_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interviewer_name: Option<&'a str>,
}

/// One variant per backend action.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    /// POST /api/upload
    UploadDocuments {
        job: DocumentInput,
        resume: DocumentInput,
        options: OptimizeOptions,
    },
    /// POST to the endpoint of the first requested output type.
    Process {
        job: DocumentInput,
        resume: Option<DocumentInput>,
        options: OptimizeOptions,
    },
    /// POST /api/markdownFile2PDF or /api/markdownFile2DOCX
    ConvertMarkdown {
        format: DocumentFormat,
        file: PathBuf,
    },
}

impl ApiRequest {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiRequest::UploadDocuments { .. } => "/api/upload",
            ApiRequest::Process { options, .. } => options
                .output_types
                .first()
                .copied()
                .unwrap_or(OutputType::Resume)
                .endpoint(),
            ApiRequest::ConvertMarkdown { format, .. } => format.endpoint(),
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            ApiRequest::UploadDocuments { .. } => "upload documents",
            ApiRequest::Process { .. } => "process",
            ApiRequest::ConvertMarkdown { .. } => "convert markdown",
        }
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        match self {
            ApiRequest::UploadDocuments {
                job,
                resume,
                options,
            } => {
                errors.extend(job.validate("Job Description"));
                errors.extend(resume.validate("Resume"));
                options.validate(&mut errors);
            }
            ApiRequest::Process {
                job,
                resume,
                options,
            } => {
                errors.extend(job.validate("Job Description"));
                match resume {
                    Some(resume) => errors.extend(resume.validate("Resume")),
                    None if options.requires_resume() => {
                        errors.push("Resume is required".to_string())
                    }
                    None => {}
                }
                options.validate(&mut errors);
            }
            ApiRequest::ConvertMarkdown { file, .. } => match FileCandidate::from_path(file) {
                Ok(candidate) => {
                    errors.extend(validate_file(Some(&candidate), MARKDOWN_EXTENSIONS).error_message)
                }
                Err(e) => errors.push(format!("Markdown file could not be read: {e}")),
            },
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(errors.join("; ")))
        }
    }

    /// Name a converted document is saved under when the server does not send one.
    pub fn output_filename(&self) -> Option<String> {
        match self {
            ApiRequest::ConvertMarkdown { format, file } => {
                let stem = file.file_stem()?.to_string_lossy();
                Some(format!("{stem}.{}", format.extension()))
            }
            _ => None,
        }
    }

    /// Serializes the request. Call `validate` first.
    pub async fn to_form(&self) -> Result<Form> {
        match self {
            ApiRequest::UploadDocuments {
                job,
                resume,
                options,
            } => documents_form(self.resume_field(), job, Some(resume), options).await,
            ApiRequest::Process {
                job,
                resume,
                options,
            } => documents_form(self.resume_field(), job, resume.as_ref(), options).await,
            ApiRequest::ConvertMarkdown { file, .. } => {
                Ok(Form::new().part("file", file_part(file).await?))
            }
        }
    }

    /// The cover-letter endpoint reads the resume from a differently named part.
    fn resume_field(&self) -> &'static str {
        if self.endpoint() == OutputType::CoverLetter.endpoint() {
            "coverLetter"
        } else {
            "resume"
        }
    }
}

async fn documents_form(
    resume_field: &'static str,
    job: &DocumentInput,
    resume: Option<&DocumentInput>,
    options: &OptimizeOptions,
) -> Result<Form> {
    let payload = OptimizePayload {
        prompt_type: options.output_types.iter().map(|t| t.prompt_type()).collect(),
        temperature: options.temperature,
        model: options.model.trim(),
        resume: resume.and_then(DocumentInput::as_text),
        job_description: job.as_text(),
        job_title: options.job_title.as_deref().map(str::trim),
        company_name: options.company_name.as_deref().map(str::trim),
        interviewer_name: options.interviewer_name.as_deref().map(str::trim),
    };

    let mut form = Form::new().text("optimize", serde_json::to_string(&payload)?);

    if let DocumentInput::File(path) = job {
        form = form.part("job", file_part(path).await?);
    }
    if let Some(DocumentInput::File(path)) = resume {
        form = form.part(resume_field, file_part(path).await?);
    }

    Ok(form)
}

async fn file_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path).await?;
    let candidate = FileCandidate::new(
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        bytes.len() as u64,
    );

    Ok(Part::bytes(bytes)
        .file_name(candidate.name)
        .mime_str(&candidate.mime_type)?)
}
