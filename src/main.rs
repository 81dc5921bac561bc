use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use pokedex_battle::action::Action;
use pokedex_battle::api::GameApi;
use pokedex_battle::config::{ApiConfig, DEFAULT_DEX_URL, DEFAULT_GAME_URL, DEFAULT_TIMEOUT_SECS};
use pokedex_battle::effect::Effect;
use pokedex_battle::reducer::reducer;
use pokedex_battle::state::AppState;
use pokedex_battle::ui;

#[derive(Parser, Debug)]
#[command(name = "pokedex-battle")]
#[command(about = "Browse the pokedex and battle to unlock new creatures")]
struct Args {
    /// Catalog and creature detail endpoint
    #[arg(long, default_value = DEFAULT_DEX_URL)]
    dex_url: String,

    /// Battle endpoint
    #[arg(long, default_value = DEFAULT_GAME_URL)]
    game_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Directory for client.log (defaults to the user cache directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    setup_logging(args.log_dir.clone())?;

    let config = ApiConfig {
        dex_url: args.dex_url,
        game_url: args.game_url,
        timeout: Duration::from_secs(args.timeout_secs),
    };
    let api = GameApi::new(config).map_err(io::Error::other)?;
    API.set(api)
        .map_err(|_| io::Error::other("game api initialized twice"))?;

    let debug = DebugSession::new(args.debug);
    debug.save_state_schema::<AppState>().map_err(debug_error)?;
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    let state = debug
        .load_state_or_else_async(|| async { Ok::<AppState, io::Error>(AppState::default()) })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    tracing::info!("client exited");
    Ok(())
}

/// Log to a file; the terminal belongs to the UI.
fn setup_logging(log_dir: Option<PathBuf>) -> io::Result<()> {
    let log_dir = log_dir.unwrap_or_else(|| {
        dirs_next::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pokedex-battle")
            .join("logs")
    });
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "client.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    // keep the writer alive for the whole process
    std::mem::forget(guard);

    tracing::info!(log_dir = %log_dir.display(), "logging initialized");
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |_runtime| {},
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            handle_effect,
        )
        .await
}

static API: OnceLock<GameApi> = OnceLock::new();

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>) {
    let Some(api) = API.get().cloned() else {
        tracing::error!(?effect, "game api not initialized");
        return;
    };
    match effect {
        Effect::LoadCatalog => {
            ctx.tasks().spawn(TaskKey::new("catalog"), async move {
                match api.fetch_catalog().await {
                    Ok(ids) => Action::DexDidLoad(ids),
                    Err(error) => Action::DexDidError(error),
                }
            });
        }
        Effect::LoadCard { id } => {
            // a newer selection replaces the pending card request
            ctx.tasks().spawn(TaskKey::new("card"), async move {
                match api.fetch_card(&id).await {
                    Ok(card) => Action::CardDidLoad { id, card },
                    Err(error) => Action::CardDidError { id, error },
                }
            });
        }
        Effect::StartGame(request) => {
            ctx.tasks().spawn(TaskKey::new("game"), async move {
                match api.start_game(&request).await {
                    Ok(reply) => Action::BattleDidStart(reply),
                    Err(error) => Action::BattleDidError(error),
                }
            });
        }
        Effect::PlayMove(request) => {
            ctx.tasks().spawn(TaskKey::new("game"), async move {
                let session_id = request.session_id.clone();
                match api.play_move(&request).await {
                    Ok(reply) => Action::MoveDidResolve { session_id, reply },
                    Err(error) => Action::MoveDidError { session_id, error },
                }
            });
        }
        Effect::Flee(request) => {
            ctx.tasks().spawn(TaskKey::new("game"), async move {
                let session_id = request.session_id.clone();
                match api.flee(&request).await {
                    Ok(()) => Action::FleeDidResolve { session_id },
                    Err(error) => Action::FleeDidError { session_id, error },
                }
            });
        }
    }
}
