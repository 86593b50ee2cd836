mod api_client;
mod cli;
mod config;
mod download;
mod errors;
mod notify;
mod settings;
mod sync;
mod validation;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api_client::requests::{ApiRequest, OutputType};
use crate::api_client::{ApiClient, ApiResponse, FileRecord};
use crate::cli::{Cli, Command, FilesCommand, GenerateArgs, ModelsCommand, SettingsCommand};
use crate::config::Config;
use crate::download::Downloads;
use crate::errors::ClientError;
use crate::notify::{ChannelNotifier, Notification, TracingNotifier};
use crate::settings::SettingsStore;
use crate::sync::listing::{filter_records, format_date, format_file_size, sort_records, FileCategory};
use crate::sync::schedule::ExponentialBackoff;
use crate::sync::{FileSynchronizer, SyncSettings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(message) = boundary_message(&e) {
                error!("{e:#}");
                eprintln!("Something went wrong: {message}");
            }
            ExitCode::FAILURE
        }
    }
}

/// A failure the notifier has already shown; only the exit status is left.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Reported(String);

impl Reported {
    fn from_client(e: ClientError) -> anyhow::Error {
        Reported(e.user_message()).into()
    }
}

/// Text for the top-level error line, or `None` when it was already reported.
/// Prefers the user-facing text of a client error over the raw chain.
fn boundary_message(e: &anyhow::Error) -> Option<String> {
    if e.is::<Reported>() {
        return None;
    }
    match e.downcast_ref::<ClientError>() {
        Some(client_error) => Some(client_error.user_message()),
        None => Some(format!("{e:#}")),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;

    // Logs go to stderr so listings on stdout stay pipeable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting resume client v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = SettingsStore::load(&config.settings_path);
    let api = ApiClient::new(&config.api_base_url, config.request_timeout)?;
    let downloads = Downloads::new(&config.download_dir);

    match cli.command {
        Command::Files { command } => run_files(command, &config, api, downloads).await,
        Command::Upload(args) => {
            let job = args
                .job_input()
                .ok_or_else(|| anyhow!("A job description is required (--job or --job-file)"))?;
            let resume = args
                .resume_input()
                .ok_or_else(|| anyhow!("A resume is required (--resume or --resume-file)"))?;
            let outputs = if args.outputs.is_empty() {
                vec![OutputType::Resume]
            } else {
                args.outputs.clone()
            };
            let request = ApiRequest::UploadDocuments {
                job,
                resume,
                options: args.options(outputs, settings.default_model()),
            };
            submit(&api, &downloads, &request).await
        }
        Command::Process { kind, also, args } => {
            info!("Generating {}", kind.label());
            let request = process_request(kind, also, &args, settings.default_model())?;
            submit(&api, &downloads, &request).await
        }
        Command::Convert { format, file } => {
            submit(&api, &downloads, &ApiRequest::ConvertMarkdown { format, file }).await
        }
        Command::Settings { command } => run_settings(command, &mut settings),
        Command::Health => {
            let status = api.health().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}

fn process_request(
    kind: OutputType,
    also: Option<OutputType>,
    args: &GenerateArgs,
    default_model: &str,
) -> Result<ApiRequest> {
    let job = args
        .job_input()
        .ok_or_else(|| anyhow!("A job description is required (--job or --job-file)"))?;
    let output_types = std::iter::once(kind).chain(also).collect();

    Ok(ApiRequest::Process {
        job,
        resume: args.resume_input(),
        options: args.options(output_types, default_model),
    })
}

async fn submit(api: &ApiClient, downloads: &Downloads, request: &ApiRequest) -> Result<()> {
    info!("Submitting {}", request.action_name());

    match api.submit(request).await? {
        ApiResponse::Json(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        ApiResponse::Blob(file) => {
            let path = downloads.save(&file).await?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

async fn run_files(
    command: FilesCommand,
    config: &Config,
    api: ApiClient,
    downloads: Downloads,
) -> Result<()> {
    let settings = SyncSettings {
        poll_interval: config.poll_interval,
        arrival_window: config.arrival_window,
    };
    let api = Arc::new(api);

    // failures below were already shown as toasts
    match command {
        FilesCommand::List {
            sort,
            order,
            category,
        } => {
            let sync = logging_synchronizer(api, downloads, settings);
            sync.fetch_files().await.map_err(Reported::from_client)?;
            let mut records = filter_records(&sync.records(), category);
            sort_records(&mut records, sort, order);
            print_records(&records);
        }
        FilesCommand::Watch { backoff } => {
            let (notifier, toasts) = ChannelNotifier::new();
            let mut sync = FileSynchronizer::new(api, Arc::new(notifier), downloads, settings);
            if backoff {
                sync = sync.with_retry_policy(Arc::new(ExponentialBackoff::default()));
            }
            watch(Arc::new(sync), toasts).await?;
        }
        FilesCommand::Download { name } => {
            let sync = logging_synchronizer(api, downloads, settings);
            let path = sync
                .download_file(&name)
                .await
                .map_err(Reported::from_client)?;
            println!("Saved {}", path.display());
        }
        FilesCommand::Delete { names } => {
            let sync = logging_synchronizer(api, downloads, settings);
            if let [name] = names.as_slice() {
                sync.delete_file(name).await.map_err(Reported::from_client)?;
            } else {
                let outcomes = sync.delete_many(&names).await;
                let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
                if failed > 0 {
                    return Err(Reported(format!(
                        "{failed} of {} deletions failed",
                        outcomes.len()
                    ))
                    .into());
                }
            }
        }
    }
    Ok(())
}

/// One-shot synchronizer whose toasts become log lines.
fn logging_synchronizer(
    api: Arc<ApiClient>,
    downloads: Downloads,
    settings: SyncSettings,
) -> FileSynchronizer {
    FileSynchronizer::new(api, Arc::new(TracingNotifier), downloads, settings)
}

/// Mounts the synchronizer, prints every toast and every listing change,
/// and unmounts on Ctrl-C.
async fn watch(
    sync: Arc<FileSynchronizer>,
    mut toasts: UnboundedReceiver<Notification>,
) -> Result<()> {
    let mounted = sync.mount();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut shown: Option<Vec<String>> = None;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            Some(toast) = toasts.recv() => {
                println!("[{}] {}", toast.summary, toast.detail);
            }
            _ = ticker.tick() => {
                let state = mounted.synchronizer().snapshot();
                if state.is_refreshing {
                    continue;
                }
                let names: Vec<String> =
                    state.current_records.iter().map(|r| r.name.clone()).collect();
                if shown.as_ref() != Some(&names) {
                    print_records(&state.current_records);
                    shown = Some(names);
                }
            }
        }
    }

    mounted.unmount();
    Ok(())
}

fn print_records(records: &[FileRecord]) {
    if records.is_empty() {
        println!("No files found");
        return;
    }

    println!("{:<48} {:<8} {:>10}  {}", "NAME", "TYPE", "SIZE", "DATE");
    for record in records {
        println!(
            "{:<48} {:<8} {:>10}  {}",
            record.name,
            category_label(FileCategory::of(&record.name)),
            format_file_size(record.size_bytes),
            format_date(&record.uploaded_date),
        );
    }
}

fn category_label(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Cover => "cover",
        FileCategory::Resume => "resume",
        FileCategory::Skills => "skills",
        FileCategory::Other => "other",
    }
}

fn run_settings(command: SettingsCommand, settings: &mut SettingsStore) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            println!("file: {}", settings.path().display());
            println!("theme: {}", settings.theme().as_str());
            println!("default model: {}", settings.default_model());
            print_models(settings);
        }
        SettingsCommand::Theme { theme } => {
            let theme = match theme {
                Some(theme) => settings.set_theme(theme)?,
                None => settings.toggle_theme()?,
            };
            println!("theme: {}", theme.as_str());
        }
        SettingsCommand::Models { command } => match command {
            ModelsCommand::List => print_models(settings),
            ModelsCommand::Add { label, value } => {
                let model = settings.add_model(&label, &value)?;
                println!("Added {} ({})", model.label, model.id);
            }
            ModelsCommand::Remove { id } => {
                let model = settings.remove_model(&id)?;
                println!("Removed {}", model.label);
            }
            ModelsCommand::Reset => {
                settings.reset_to_defaults()?;
                print_models(settings);
            }
        },
    }
    Ok(())
}

fn print_models(settings: &SettingsStore) {
    for model in settings.models() {
        println!("{:<38} {:<24} {}", model.id, model.label, model.value);
    }
}
