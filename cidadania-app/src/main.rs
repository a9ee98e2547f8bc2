mod command;
mod console;
mod decoder;
mod render;

use crate::command::Command;
use crate::console::{ConsoleNotifier, SystemClipboard};
use chrono::{Datelike, Local};
use cidadania_core::{
    AudioBackend, CidadaniaConfig, ContactDesk, ContactForm, ContactSubject, ContentEvent,
    ContentStore, CoreError, DayOfWeek, NewsFeed, Notifier, PlaybackController, PlaybackEvent,
    ProgramSchedule, ShareOutcome, Sharer, SyncPhase,
};
use cidadania_stream::{HttpStreamBackend, DEFAULT_FRAME_BUFFER};
use cidadania_supabase::{SupabaseConfig, SupabaseStore, SUPABASE_CONFIG_TEMPLATE};
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_TARGET: &str = "cidadania::app";
const LOG_TARGET_EVENTS: &str = "cidadania::events";

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let provider_templates: &[&str] = &[SUPABASE_CONFIG_TEMPLATE];
    let config = match CidadaniaConfig::load_or_create(Some(provider_templates)) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            println!("Configuração criada em {}", path.display());
            println!("Preencha a seção [providers.supabase] e execute novamente.");
            std::process::exit(0);
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            error!(
                target: LOG_TARGET,
                "Config file {} has syntax errors: {}",
                CidadaniaConfig::config_path().display(),
                parse_error
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!(target: LOG_TARGET, "{e}");
            std::process::exit(1);
        }
    };

    let store_config = match SupabaseConfig::from_providers(&config.providers) {
        Ok(Some(store_config)) => store_config,
        Ok(None) => {
            error!(
                target: LOG_TARGET,
                "Missing [providers.supabase] section in {}",
                CidadaniaConfig::config_path().display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!(target: LOG_TARGET, "{e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(target: LOG_TARGET, "Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!(target: LOG_TARGET, "Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!(target: LOG_TARGET, "Failed to set Ctrl+C handler: {}", e);
    }

    if let Err(e) = runtime.block_on(run(config, &store_config, &cancel_token)) {
        error!(target: LOG_TARGET, "{e}");
        std::process::exit(1);
    }
}

/// Everything the console drives
struct App {
    config: CidadaniaConfig,
    feed: Arc<NewsFeed>,
    schedule: Arc<ProgramSchedule>,
    player: Arc<PlaybackController>,
    sharer: Sharer,
    contacts: ContactDesk,
}

async fn run(
    config: CidadaniaConfig,
    store_config: &SupabaseConfig,
    cancel_token: &CancellationToken,
) -> Result<(), CoreError> {
    let store: Arc<dyn ContentStore> = Arc::new(SupabaseStore::new(store_config)?);
    info!(target: LOG_TARGET, "Using {} content store", store.name());

    let (frame_tx, frame_rx) = mpsc::channel(DEFAULT_FRAME_BUFFER);
    let backend = Arc::new(HttpStreamBackend::new(frame_tx)?);
    let app = App::new(config, store, Arc::new(ConsoleNotifier), backend)?;

    let decoder = tokio::spawn(decoder::run_decoder(
        app.config.player.decoder_command.clone(),
        frame_rx,
        cancel_token.clone(),
    ));
    tokio::spawn(log_content_events(app.feed.subscribe()));
    tokio::spawn(log_content_events(app.schedule.subscribe()));
    tokio::spawn(log_playback_events(app.player.subscribe()));

    let mounted = tokio::select! {
        () = cancel_token.cancelled() => false,
        () = app.mount() => true,
    };

    let result = if mounted {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        app.command_loop(&mut lines, cancel_token).await
    } else {
        Ok(())
    };

    // Teardown: late query results are dropped and the stream is closed
    app.feed.close().await;
    app.schedule.close().await;
    app.player.release().await;
    cancel_token.cancel();
    if let Err(e) = decoder.await {
        warn!(target: LOG_TARGET, "Decoder task failed: {}", e);
    }

    info!(target: LOG_TARGET, "Shutdown complete");
    result
}

impl App {
    fn new(
        config: CidadaniaConfig,
        store: Arc<dyn ContentStore>,
        notifier: Arc<dyn Notifier>,
        backend: Arc<dyn AudioBackend>,
    ) -> Result<Self, CoreError> {
        let feed = NewsFeed::new(store.clone(), notifier.clone());
        let schedule = ProgramSchedule::new(store.clone(), notifier.clone());
        let player = PlaybackController::new(
            backend,
            config.station.stream_url()?,
            config.player.initial_volume,
        );

        // Console has no native share sheet; links go to the clipboard
        let sharer = Sharer::new(
            config.station.site_origin()?,
            config.station.share_tagline.clone(),
            None,
            Box::new(SystemClipboard),
            notifier.clone(),
        );
        let contacts = ContactDesk::new(store, notifier);

        Ok(Self {
            config,
            feed,
            schedule,
            player,
            sharer,
            contacts,
        })
    }

    /// Load both collections independently and show the first screen
    async fn mount(&self) {
        tokio::join!(self.feed.select_category(None), self.schedule.load());
        self.print_status().await;
        self.print_feed().await;
        println!("{}", render::HELP);
    }

    /// Read and run commands until `quit`, end of input or shutdown.
    ///
    /// Shutdown also interrupts a running command, including form prompts.
    async fn command_loop<R>(
        &self,
        lines: &mut Lines<R>,
        cancel_token: &CancellationToken,
    ) -> Result<(), CoreError>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            show_prompt("> ");
            let line = tokio::select! {
                () = cancel_token.cancelled() => break,
                line = lines.next_line() => line?,
            };
            // End of input
            let Some(line) = line else {
                break;
            };

            match command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => {
                    tokio::select! {
                        () = cancel_token.cancelled() => break,
                        result = self.execute(command, lines) => result?,
                    }
                }
                Ok(None) => {}
                Err(e) => println!("{e}"),
            }
        }

        Ok(())
    }

    async fn execute<R>(&self, command: Command, lines: &mut Lines<R>) -> Result<(), CoreError>
    where
        R: AsyncBufRead + Unpin,
    {
        match command {
            Command::Play => {
                if let Err(e) = self.player.toggle_playback().await {
                    warn!(target: LOG_TARGET, "Could not open audio output: {}", e);
                    println!("Não foi possível abrir a transmissão ao vivo.");
                }
                self.print_status().await;
            }
            Command::Volume(level) => {
                self.player.set_volume(level).await;
                self.print_status().await;
            }
            Command::Mute => {
                self.player.toggle_mute().await;
                self.print_status().await;
            }
            Command::News(category) => {
                self.feed.select_category(category).await;
                self.print_feed().await;
            }
            Command::Share(position) => self.share(position).await,
            Command::Schedule(day) => self.show_day(day).await,
            Command::Now => self.show_on_air().await,
            Command::Contact => self.contact(lines).await?,
            Command::Status => self.print_status().await,
            Command::Help => println!("{}", render::HELP),
            // Handled by the loop
            Command::Quit => {}
        }
        Ok(())
    }

    async fn print_status(&self) {
        let now = Local::now();
        let on_air = self
            .schedule
            .on_air(DayOfWeek::from(now.weekday()), now.time())
            .await;
        let session = self.player.session().await;
        println!(
            "{}",
            render::player_line(&self.config.station, &session, on_air.as_ref())
        );
    }

    async fn print_feed(&self) {
        let state = self.feed.state().await;
        let category = self.feed.selected_category().await;
        print!("{}", render::feed_view(&state, category));
    }

    async fn share(&self, position: usize) {
        let Some(article) = self.feed.article(position - 1).await else {
            println!("Notícia {position} não encontrada.");
            return;
        };

        match self.sharer.share_article(&article) {
            ShareOutcome::Shared(_) => {}
            ShareOutcome::Copied(link) | ShareOutcome::Unavailable(link) => {
                println!("{}\n{}", link.text, link.url);
            }
        }
    }

    async fn show_day(&self, day: Option<DayOfWeek>) {
        // A failed load is only retried when the user asks for the schedule again
        if self.schedule.phase().await == SyncPhase::Errored {
            self.schedule.load().await;
        }

        let day = match day {
            Some(day) => day,
            None => self.schedule.selected_day().await,
        };
        let view = self.schedule.select_day(day).await;
        print!("{}", render::day_view(day, &view));
    }

    async fn show_on_air(&self) {
        let now = Local::now();
        let day = DayOfWeek::from(now.weekday());
        match self.schedule.on_air(day, now.time()).await {
            Some(program) => println!(
                "No ar: {} com {} ({})",
                program.title,
                program.host,
                program.slot_label()
            ),
            None => println!("Nenhum programa no ar agora."),
        }
    }

    async fn contact<R>(&self, lines: &mut Lines<R>) -> Result<(), CoreError>
    where
        R: AsyncBufRead + Unpin,
    {
        println!("Assuntos:");
        for (index, subject) in ContactSubject::ALL.iter().enumerate() {
            println!("  {}. {}", index + 1, subject.label());
        }

        let name = prompt(lines, "Nome").await?;
        let email = prompt(lines, "E-mail").await?;
        let phone = prompt(lines, "Telefone (opcional)").await?;
        let subject = prompt(lines, "Assunto").await?;
        let message = prompt(lines, "Mensagem").await?;

        let form = ContactForm {
            name,
            email,
            phone,
            subject: subject_from_choice(&subject),
            message,
        };

        if let Err(e) = self.contacts.submit(&form).await {
            debug!(target: LOG_TARGET, "Contact form not sent: {}", e);
            if let Some(message) = render::contact_error(&e) {
                println!("{message}");
            }
        }
        Ok(())
    }
}

/// Accept a subject by its number in the list as well as by name
fn subject_from_choice(choice: &str) -> String {
    choice
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| ContactSubject::ALL.get(index))
        .map_or_else(|| choice.to_string(), |subject| subject.label().to_string())
}

fn show_prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

async fn prompt<R>(lines: &mut Lines<R>, label: &str) -> Result<String, CoreError>
where
    R: AsyncBufRead + Unpin,
{
    show_prompt(&format!("{label}: "));
    Ok(lines.next_line().await?.unwrap_or_default())
}

/// Log news and schedule events
async fn log_content_events(mut rx: broadcast::Receiver<ContentEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                ContentEvent::Loading { collection } => {
                    debug!(target: LOG_TARGET_EVENTS, "Loading {}", collection);
                }
                ContentEvent::Loaded { collection, count } => {
                    info!(target: LOG_TARGET_EVENTS, "Loaded {} {} rows", count, collection);
                }
                ContentEvent::Failed {
                    collection,
                    message,
                } => {
                    error!(target: LOG_TARGET_EVENTS, "Loading {} failed: {}", collection, message);
                }
                ContentEvent::StaleDiscarded {
                    collection,
                    generation,
                } => {
                    debug!(
                        target: LOG_TARGET_EVENTS,
                        "Discarded stale {} response (generation {})",
                        collection,
                        generation
                    );
                }
            },
            Err(broadcast::error::RecvError::Closed) => {
                debug!(target: LOG_TARGET_EVENTS, "Content event channel closed");
                break;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                info!(target: LOG_TARGET_EVENTS, "Missed {} content events", n);
            }
        }
    }
}

/// Log player events
async fn log_playback_events(mut rx: broadcast::Receiver<PlaybackEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                PlaybackEvent::Started => info!(target: LOG_TARGET_EVENTS, "Live stream started"),
                PlaybackEvent::Stopped => info!(target: LOG_TARGET_EVENTS, "Live stream stopped"),
                PlaybackEvent::VolumeChanged { level, effective } => {
                    debug!(
                        target: LOG_TARGET_EVENTS,
                        "Volume {} (effective {})",
                        level,
                        effective
                    );
                }
                PlaybackEvent::MuteChanged { muted } => {
                    debug!(target: LOG_TARGET_EVENTS, "Muted: {}", muted);
                }
                PlaybackEvent::TransportError { message } => {
                    error!(target: LOG_TARGET_EVENTS, "Stream transport error: {}", message);
                }
            },
            Err(broadcast::error::RecvError::Closed) => {
                debug!(target: LOG_TARGET_EVENTS, "Playback event channel closed");
                break;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                info!(target: LOG_TARGET_EVENTS, "Missed {} playback events", n);
            }
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled() -> bool {
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(CidadaniaConfig::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging.
///
/// Console logs go to stderr so they do not interleave with the player output.
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = cidadania_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidadania_core::MemoryStore;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn offline_app() -> App {
        let (frame_tx, _frame_rx) = mpsc::channel(1);
        App::new(
            CidadaniaConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(ConsoleNotifier),
            Arc::new(HttpStreamBackend::new(frame_tx).unwrap()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_quit_ends_loop() {
        let app = offline_app();
        let mut lines = BufReader::new(&b"status\nquit\nplay\n"[..]).lines();

        let result = app.command_loop(&mut lines, &CancellationToken::new()).await;

        assert!(result.is_ok());
        // `play` after `quit` never ran
        assert!(!app.player.session().await.is_playing);
    }

    #[tokio::test]
    async fn test_end_of_input_ends_loop() {
        let app = offline_app();
        let mut lines = BufReader::new(&b"vol 40\n"[..]).lines();

        assert!(app.command_loop(&mut lines, &CancellationToken::new()).await.is_ok());
        assert_eq!(app.player.session().await.volume_level, 40);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_contact_form() {
        let app = offline_app();
        // The writer stays open, so the form waits for the e-mail field
        let (mut input, reader) = tokio::io::duplex(64);
        input.write_all(b"contact\nAna\n").await.unwrap();
        let mut lines = BufReader::new(reader).lines();
        let cancel_token = CancellationToken::new();

        let (result, ()) = tokio::join!(
            tokio::time::timeout(
                Duration::from_secs(2),
                app.command_loop(&mut lines, &cancel_token)
            ),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel_token.cancel();
            },
        );

        assert!(matches!(result, Ok(Ok(()))));
        drop(input);
    }

    #[test]
    fn test_subject_from_number() {
        assert_eq!(subject_from_choice("1"), "Sugestão de Programa");
        assert_eq!(subject_from_choice(" 6 "), "Outro");
    }

    #[test]
    fn test_subject_passthrough() {
        assert_eq!(subject_from_choice("Elogio"), "Elogio");
        assert_eq!(subject_from_choice("0"), "0");
        assert_eq!(subject_from_choice("9"), "9");
    }
}
