use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use translator_app::{
    render_status, system_locale, AppConfig, ConfigOverrides, Controller, PreferenceStore,
    WebSocketConnector,
};
use translator_core::{Locale, LocalePreference, Phase};
use translator_logging::{client_info, client_warn};
use translator_remote::ReqwestGateway;

/// Poll interval used once the progress channel is gone.
const STATUS_POLL: Duration = Duration::from_secs(5);
const CANCEL_ACK_WAIT: Duration = Duration::from_secs(5);

type AppController = Controller<ReqwestGateway, WebSocketConnector>;

#[derive(Parser)]
#[command(name = "translator")]
#[command(about = "Translate EPUB books with a local translation service")]
struct Cli {
    /// Configuration file (defaults to ./translator.ron when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base url of the HTTP api, e.g. http://localhost:8000
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// Base url of the progress WebSocket, e.g. ws://localhost:8000
    #[arg(long, global = true)]
    ws_base: Option<String>,
    /// Where logs go: terminal, file or both
    #[arg(long, global = true)]
    log: Option<String>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the translation engine is installed and running
    Status,
    /// Ask the service to start the translation engine
    StartEngine,
    /// List the models the engine can translate with
    Models,
    /// List the languages the service supports
    Languages,
    /// Upload a book, translate it and download the result
    Translate {
        /// EPUB file to translate
        file: PathBuf,
        /// Source language code
        #[arg(long)]
        source: Option<String>,
        /// Target language code
        #[arg(long)]
        target: Option<String>,
        /// Model to translate with
        #[arg(long)]
        model: String,
        /// Directory the translated book is written to
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Show or change the interface language
    Locale {
        #[command(subcommand)]
        action: Option<LocaleAction>,
    },
}

#[derive(Subcommand)]
enum LocaleAction {
    /// Print the stored preference and the language in effect
    Show,
    /// Store a preference: system, ko or en
    Set { value: String },
    /// Switch between Korean and English
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        api_base: cli.api_base.clone(),
        ws_base: cli.ws_base.clone(),
        preferences_dir: None,
        log_destination: cli.log.clone(),
    };
    let config = AppConfig::load(cli.config.as_deref(), &overrides)?;
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    translator_logging::initialize(config.log_destination(), level, &config.log_file);

    let mut preferences = PreferenceStore::load(&config.preferences_dir);
    let system = system_locale();
    let locale = preferences.locale().resolve(system);

    match cli.command {
        Commands::Status => {
            let status = controller(&config)?.engine_status().await?;
            println!("installed: {}, running: {}", status.installed, status.running);
        }
        Commands::StartEngine => {
            let started = controller(&config)?.request_engine_start().await?;
            if !started.success {
                bail!("the service could not start the engine");
            }
            println!("engine started");
        }
        Commands::Models => {
            for model in controller(&config)?.models().await? {
                println!("{model}");
            }
        }
        Commands::Languages => {
            for language in controller(&config)?.languages().await? {
                println!("{}\t{}", language.code, language.name);
            }
        }
        Commands::Translate {
            file,
            source,
            target,
            model,
            output,
        } => {
            let mut controller = controller(&config)?;
            translate(
                &mut controller,
                locale,
                &file,
                source.as_deref(),
                target.as_deref(),
                &model,
                &output,
            )
            .await?;
        }
        Commands::Locale { action } => match action.unwrap_or(LocaleAction::Show) {
            LocaleAction::Show => print_locale(preferences.locale(), system),
            LocaleAction::Set { value } => {
                let preference = parse_preference(&value)?;
                preferences.set_locale(preference)?;
                print_locale(preference, system);
            }
            LocaleAction::Toggle => {
                let preference = preferences.toggle_locale(system)?;
                print_locale(preference, system);
            }
        },
    }
    Ok(())
}

fn controller(config: &AppConfig) -> Result<AppController> {
    let gateway = ReqwestGateway::new(config.gateway_settings())?;
    Ok(Controller::new(
        Arc::new(gateway),
        WebSocketConnector::new(config.channel_settings()),
    ))
}

fn print_locale(preference: LocalePreference, system: Locale) {
    println!(
        "preference: {}, in effect: {}",
        preference,
        preference.resolve(system)
    );
}

fn parse_preference(value: &str) -> Result<LocalePreference> {
    if value.trim().eq_ignore_ascii_case("system") || Locale::from_code(value).is_some() {
        Ok(LocalePreference::parse(value))
    } else {
        bail!("unknown locale {value:?}; expected system, ko or en")
    }
}

enum Step {
    Interrupted,
    Event(Result<(), translator_app::ControllerError>),
    Poll,
}

async fn translate(
    controller: &mut AppController,
    locale: Locale,
    file: &Path,
    source: Option<&str>,
    target: Option<&str>,
    model: &str,
    output: &Path,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .context("input file has no usable name")?;

    let uploaded = controller.upload(file_name, bytes).await?;
    println!("{}", render_status(&uploaded, locale));
    if let Some(source) = source {
        controller.select_source_language(source)?;
    }
    if let Some(target) = target {
        controller.select_target_language(target)?;
    }
    controller.select_model(model)?;
    let started = controller.start().await?;
    client_info!("Translating {} as job {:?}", file_name, started.job_id);

    let mut updates = controller.subscribe();
    let mut poll = tokio::time::interval(STATUS_POLL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_line = String::new();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        let line = render_status(&snapshot, locale);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        if !snapshot.phase.is_active() {
            break;
        }

        let step = tokio::select! {
            _ = &mut ctrl_c => Step::Interrupted,
            result = controller.next_event(), if snapshot.channel_open => Step::Event(result),
            _ = poll.tick(), if !snapshot.channel_open => Step::Poll,
        };
        match step {
            Step::Interrupted => {
                if let Some(ack) = controller.cancel_with_ack().await? {
                    match tokio::time::timeout(CANCEL_ACK_WAIT, ack).await {
                        Ok(Ok(Ok(reply))) if reply.success => {
                            client_info!("Service cancelled the job")
                        }
                        Ok(Ok(Ok(reply))) => client_warn!(
                            "Service did not cancel the job: {}",
                            reply.message.unwrap_or_default()
                        ),
                        Ok(Ok(Err(err))) => client_warn!("Cancel request failed: {}", err),
                        Ok(Err(_)) | Err(_) => client_warn!("No answer to the cancel request"),
                    }
                }
            }
            Step::Event(result) => result?,
            Step::Poll => {
                if let Err(err) = controller.refresh_status().await {
                    client_warn!("Status poll failed: {}", err);
                }
            }
        }
    }

    let finished = controller.snapshot();
    match finished.phase {
        Phase::Completed => {
            let stem = file
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("book");
            let name = format!("{stem}_{}.epub", finished.target_language);
            let path = controller.download_to(output, &name).await?;
            println!("{}", path.display());
            Ok(())
        }
        Phase::Failed => bail!(finished.error.unwrap_or_default()),
        _ => Ok(()),
    }
}
