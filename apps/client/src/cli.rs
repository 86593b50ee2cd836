use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::api_client::requests::{
    DocumentFormat, DocumentInput, OptimizeOptions, OutputType, DEFAULT_TEMPERATURE,
};
use crate::settings::Theme;
use crate::sync::listing::{CategoryFilter, SortField, SortOrder};

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(version, about = "Generate tailored resumes and cover letters and manage the generated files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Browse, download and delete generated files
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },
    /// Upload a job description and a resume for optimization
    Upload(GenerateArgs),
    /// Run one generation action (resume, cover letter, skills, interview prep, cold email)
    Process {
        kind: OutputType,
        /// Optional second document to generate in the same request
        #[arg(long)]
        also: Option<OutputType>,
        #[command(flatten)]
        args: GenerateArgs,
    },
    /// Convert a markdown file to PDF or DOCX
    Convert { format: DocumentFormat, file: PathBuf },
    /// Theme and model preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Check that the backend is reachable
    Health,
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// Print the current listing
    List {
        #[arg(long, value_enum, default_value_t = SortField::Date)]
        sort: SortField,
        #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
        order: SortOrder,
        #[arg(long, value_enum, default_value_t = CategoryFilter::All)]
        category: CategoryFilter,
    },
    /// Poll the listing and report new arrivals until interrupted
    Watch {
        /// Retry failed polls sooner instead of waiting a full interval
        #[arg(long)]
        backoff: bool,
    },
    /// Download one file into the download directory
    Download { name: String },
    /// Delete one or more files
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the stored preferences
    Show,
    /// Set the theme, or toggle it when no value is given
    Theme {
        #[arg(value_enum)]
        theme: Option<Theme>,
    },
    /// Manage the selectable models
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    List,
    Add { label: String, value: String },
    Remove { id: String },
    /// Restore the built-in model list
    Reset,
}

/// Inputs shared by `upload` and `process`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Job description text
    #[arg(long, conflicts_with = "job_file")]
    pub job: Option<String>,
    /// Job description file (.pdf, .doc, .docx, .txt)
    #[arg(long)]
    pub job_file: Option<PathBuf>,
    /// Resume text
    #[arg(long, conflicts_with = "resume_file")]
    pub resume: Option<String>,
    /// Resume file (.pdf, .doc, .docx, .txt)
    #[arg(long)]
    pub resume_file: Option<PathBuf>,
    /// Output types for `upload` (at most two)
    #[arg(long = "output", value_enum)]
    pub outputs: Vec<OutputType>,
    /// Model value; defaults to the first configured model
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,
    #[arg(long)]
    pub job_title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub interviewer: Option<String>,
}

impl GenerateArgs {
    pub fn job_input(&self) -> Option<DocumentInput> {
        document_input(&self.job, &self.job_file)
    }

    pub fn resume_input(&self) -> Option<DocumentInput> {
        document_input(&self.resume, &self.resume_file)
    }

    pub fn options(&self, output_types: Vec<OutputType>, default_model: &str) -> OptimizeOptions {
        OptimizeOptions {
            output_types,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            temperature: self.temperature,
            job_title: self.job_title.clone(),
            company_name: self.company.clone(),
            interviewer_name: self.interviewer.clone(),
        }
    }
}

fn document_input(text: &Option<String>, file: &Option<PathBuf>) -> Option<DocumentInput> {
    match (text, file) {
        (Some(text), _) => Some(DocumentInput::Text(text.clone())),
        (None, Some(path)) => Some(DocumentInput::File(path.clone())),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("client").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_files_list_defaults() {
        match parse(&["files", "list"]).command {
            Command::Files {
                command: FilesCommand::List { sort, order, category },
            } => {
                assert_eq!(sort, SortField::Date);
                assert_eq!(order, SortOrder::Desc);
                assert_eq!(category, CategoryFilter::All);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_files_watch_backoff_flag() {
        for (args, expected) in [
            (&["files", "watch"][..], false),
            (&["files", "watch", "--backoff"][..], true),
        ] {
            match parse(args).command {
                Command::Files {
                    command: FilesCommand::Watch { backoff },
                } => assert_eq!(backoff, expected),
                other => panic!("unexpected command: {other:?}"),
            }
        }
    }

    #[test]
    fn test_delete_requires_a_name() {
        assert!(Cli::try_parse_from(["client", "files", "delete"]).is_err());
    }

    #[test]
    fn test_process_builds_options_with_default_model() {
        let cli = parse(&[
            "process",
            "cover-letter",
            "--job",
            "Senior Rust engineer wanted",
            "--resume-file",
            "cv.pdf",
            "--job-title",
            "Engineer",
            "--company",
            "Acme",
        ]);
        let Command::Process { kind, also, args } = cli.command else {
            panic!("expected process");
        };
        assert_eq!(kind, OutputType::CoverLetter);
        assert_eq!(also, None);
        assert_eq!(
            args.job_input(),
            Some(DocumentInput::Text("Senior Rust engineer wanted".to_string()))
        );
        assert_eq!(args.resume_input(), Some(DocumentInput::File(PathBuf::from("cv.pdf"))));

        let options = args.options(vec![kind], "gpt-4-turbo");
        assert_eq!(options.model, "gpt-4-turbo");
        assert_eq!(options.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(options.company_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_text_and_file_inputs_conflict() {
        let result = Cli::try_parse_from([
            "client", "upload", "--job", "text", "--job-file", "jd.pdf",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_theme_is_optional() {
        let cli = parse(&["settings", "theme"]);
        assert!(matches!(
            cli.command,
            Command::Settings {
                command: SettingsCommand::Theme { theme: None }
            }
        ));
        let cli = parse(&["settings", "theme", "dark"]);
        assert!(matches!(
            cli.command,
            Command::Settings {
                command: SettingsCommand::Theme { theme: Some(Theme::Dark) }
            }
        ));
    }
}
