mod app;
mod logging;
mod tui;
mod ui;

use std::collections::HashSet;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use crossbeam_channel::Receiver;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use lithium_core::{
    CancellationToken, Config, DecodeConfig, Library, PixelFormat, ScanEvent, ScanHandle,
    ScanWorker, SqliteCatalog, ThumbnailStore, Thumbnails, TitleId, TitleRecord, load_config,
    validate_config,
};
use ratatui::{Terminal, backend::CrosstermBackend, style::Style, widgets::Widget};
use tracing::{debug, error, info, trace, warn};

use app::{Action, AppMode, AppState, Launcher};
use tui::{AppEvent, EventHandler, handle_key};
use ui::{
    AppLayout, CacheStats, DetailView, Footer, Header, HelpView, PageTabs, ProgressView, Theme,
    ThumbState, TitleList,
};

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "LITHIUMX_CONFIG";

/// LithiumX - terminal title launcher
#[derive(Parser, Debug)]
#[command(name = "lithiumx")]
#[command(about = "Browse scanned titles with thumbnails and launch them")]
#[command(version)]
struct Args {
    /// Configuration file (falls back to $LITHIUMX_CONFIG, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs here instead of the platform cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Never read or write decoded thumbnails on disk
    #[arg(long)]
    no_disk_cache: bool,

    /// Scan once, print every page and exit
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let log_path = args.log_file.clone().unwrap_or_else(logging::default_log_path);
    logging::init(&log_path)?;

    let config = resolve_config(&args)?;

    if args.dump {
        return dump(&config);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run app
    let result = run_app(&mut terminal, &config, &args);

    // Restore terminal
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    if let Err(e) = &result {
        error!(error = %e, "exiting with error");
    }
    result
}

fn resolve_config(args: &Args) -> Result<Config> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path).wrap_err_with(|| format!("Failed to load config from {:?}", path))?
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    validate_config(&config).wrap_err("Configuration validation failed")?;
    info!(pages = config.pages.len(), "configuration loaded");
    Ok(config)
}

/// Run one synchronous scan pass and print what it found
fn dump(config: &Config) -> Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut worker = ScanWorker::new(config.pages.clone(), config.scan.clone(), tx);
    worker.run_pass();

    let mut library = Library::new(&config.pages);
    for event in rx.try_iter() {
        library.apply(event);
    }

    for page in library.pages().iter().filter(|p| !p.recent) {
        println!("[{}] {} titles", page.name, page.len());
        for record in page.records() {
            println!(
                "  {:<40} {:<12} {}",
                record.title,
                record.source.as_str(),
                record.executable.display()
            );
        }
    }

    let progress = library.progress();
    println!(
        "{} titles in {} directories, {} errors",
        progress.titles_found, progress.dirs_scanned, progress.errors
    );
    Ok(())
}

fn catalog_path(config: &Config) -> Option<PathBuf> {
    config
        .catalog
        .path
        .clone()
        .or_else(|| dirs::data_dir().map(|d| d.join("lithiumx").join("catalog.db")))
}

/// The catalog is optional; the launcher works without it
fn open_catalog(config: &Config) -> Option<SqliteCatalog> {
    let path = catalog_path(config)?;
    match SqliteCatalog::open(&path) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "catalog unavailable");
            None
        }
    }
}

fn decode_config(config: &Config, args: &Args) -> Result<DecodeConfig> {
    let thumbs = &config.thumbnails;
    let format = PixelFormat::from_depth(thumbs.colour_depth)
        .ok_or_else(|| eyre!("Unsupported colour depth {}", thumbs.colour_depth))?;

    let store = if thumbs.disk_cache && !args.no_disk_cache {
        thumbs
            .disk_cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("lithiumx").join("thumbs")))
            .map(ThumbnailStore::new)
    } else {
        None
    };
    if let Some(store) = &store {
        debug!(dir = %store.dir().display(), "thumbnail disk cache enabled");
    }

    Ok(DecodeConfig {
        format,
        max_dimension: thumbs.max_dimension,
        pool_size: thumbs.pool_size,
        store,
    })
}

/// Everything the UI thread drives besides its own state
struct Session {
    scan: ScanHandle,
    scan_events: Receiver<ScanEvent>,
    thumbs: Thumbnails<TitleId>,
    catalog: Option<SqliteCatalog>,
    launcher: Launcher,
    recent_limit: usize,
}

impl Session {
    fn start(config: &Config, args: &Args) -> Result<Self> {
        let (tx, scan_events) = crossbeam_channel::unbounded();
        let mut worker = ScanWorker::new(config.pages.clone(), config.scan.clone(), tx);
        // The scan thread writes through its own connection
        if let Some(sink) = open_catalog(config) {
            worker = worker.with_catalog(Box::new(sink));
        }
        let scan = worker
            .spawn(CancellationToken::new())
            .wrap_err("Failed to start title scan")?;

        let thumbs = Thumbnails::new(
            decode_config(config, args)?,
            config.thumbnails.cache_bytes,
            Duration::from_millis(config.thumbnails.sweep_interval_ms),
        )
        .wrap_err("Failed to start thumbnail decoder")?;

        Ok(Self {
            scan,
            scan_events,
            thumbs,
            catalog: open_catalog(config),
            launcher: Launcher::new(config.launch.command.clone()),
            recent_limit: config.catalog.recent_limit,
        })
    }

    fn load_recent(&mut self, state: &mut AppState) {
        let Some(catalog) = &self.catalog else {
            return;
        };
        match catalog.recent_titles(self.recent_limit) {
            Ok(records) => {
                debug!(count = records.len(), "recent titles loaded");
                state.library.load_recent(records);
            }
            Err(e) => warn!(error = %e, "failed to load recent titles"),
        }
    }

    /// Apply pending scan events, dropping thumbnails of titles that left
    fn drain_scan_events(&mut self, state: &mut AppState) {
        for event in self.scan_events.try_iter() {
            for record in state.library.apply(event) {
                release_if_unlisted(&mut self.thumbs, &state.library, &record);
            }
        }
    }

    /// Collect finished decodes and keep the visible rows fed
    fn pump_thumbnails(&mut self, state: &AppState) {
        self.thumbs.poll(
            |id, image| {
                if image.is_none() {
                    trace!(title = %id, "thumbnail unavailable");
                }
            },
            |id, _| trace!(title = %id, "thumbnail evicted"),
        );

        let visible = state.visible_thumbnails();
        for (id, path, selected) in &visible {
            self.thumbs.request(*id, path, *selected);
        }

        // Refresh recency of the one the detail pane shows
        if let Some(record) = state.selected_record() {
            self.thumbs.get(&record.id);
        }

        let on_screen: HashSet<TitleId> = visible.iter().map(|(id, _, _)| *id).collect();
        let detached = self.thumbs.tick(Instant::now(), |id| on_screen.contains(id));
        if detached > 0 {
            trace!(detached, "off-screen decodes aborted");
        }
    }

    fn launch(&mut self, state: &mut AppState) {
        let Some(record) = state.selected_record().cloned() else {
            return;
        };

        match self.launcher.launch(&record) {
            Ok(message) => {
                if let Some(catalog) = self.catalog.as_mut() {
                    let recorded = catalog
                        .record_launch(&record)
                        .and_then(|()| catalog.prune_recent(self.recent_limit));
                    if let Err(e) = recorded {
                        warn!(title = %record.title, error = %e, "failed to record launch");
                    }
                }
                for pruned in state.library.push_recent(record, self.recent_limit) {
                    release_if_unlisted(&mut self.thumbs, &state.library, &pruned);
                }
                state.set_status(message);
            }
            Err(e) => {
                error!(title = %record.title, error = %e, "launch failed");
                state.set_status(format!("Launch failed: {}", e));
            }
        }
    }

    fn shutdown(&mut self) {
        self.scan.shutdown();
        self.thumbs.clear(|_, _| {});
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
    args: &Args,
) -> Result<()> {
    let theme = Theme::default();
    let mut state = AppState::new(&config.pages);
    let event_handler = EventHandler::new(50); // 50ms tick rate

    let mut session = Session::start(config, args)?;
    session.load_recent(&mut state);

    loop {
        session.drain_scan_events(&mut state);
        session.pump_thumbnails(&state);

        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();
            let layout = AppLayout::new(area);

            // Background
            frame
                .buffer_mut()
                .set_style(area, Style::default().bg(theme.bg));

            // Update visible height for scrolling
            state.visible_height = layout.list.height as usize;

            let buf = frame.buffer_mut();
            let thumbs = &session.thumbs;

            Header::new(&state.library, state.spinner_frame, &theme).render(layout.header, buf);
            PageTabs::new(&state.library, &theme).render(layout.tabs, buf);

            if let Some(page) = state.library.active_page() {
                if page.is_empty() && !page.recent && state.library.is_scanning() {
                    ProgressView::new(state.library.progress(), state.spinner_frame, &theme)
                        .render(layout.list, buf);
                } else {
                    let records = page.records();
                    TitleList::new(page, |index| thumb_state(thumbs, &records[index]), &theme)
                        .render(layout.list, buf);
                }

                let selected = page.selected_record();
                let image = selected.and_then(|r| thumbs.peek(&r.id));
                DetailView::new(selected, image, &theme).render(layout.detail, buf);
            }

            // Help overlay
            if state.mode == AppMode::Help {
                HelpView::new(&theme).render(area, buf);
            }

            let stats = CacheStats {
                resident_bytes: thumbs.resident_bytes(),
                capacity: thumbs.capacity(),
                cached: thumbs.cached(),
                pending: thumbs.pending(),
            };
            Footer::new(state.mode, &theme, stats)
                .with_status(state.status_message.as_deref())
                .render(layout.footer, buf);
        })?;

        // Handle events
        match event_handler.next()? {
            AppEvent::Key(key) => {
                let action = handle_key(key, state.mode);
                handle_action(&mut state, &mut session, action);
            }
            AppEvent::Resize(_, _) => {
                // Terminal will redraw on next loop
            }
            AppEvent::Tick => {
                state.tick_spinner();
            }
        }

        if state.should_quit {
            break;
        }
    }

    session.shutdown();
    info!("bye");
    Ok(())
}

/// Titles can sit on several pages; keep the thumbnail while any still lists it
fn release_if_unlisted(thumbs: &mut Thumbnails<TitleId>, library: &Library, record: &TitleRecord) {
    if !library.contains(record.id) {
        thumbs.forget(&record.id);
    }
}

fn thumb_state(thumbs: &Thumbnails<TitleId>, record: &TitleRecord) -> ThumbState {
    if record.thumbnail.is_none() || thumbs.is_unavailable(&record.id) {
        ThumbState::Missing
    } else if thumbs.is_cached(&record.id) {
        ThumbState::Ready
    } else {
        ThumbState::Loading
    }
}

fn handle_action(state: &mut AppState, session: &mut Session, action: Action) {
    match action {
        Action::MoveUp => state.move_up(),
        Action::MoveDown => state.move_down(),
        Action::PageUp => state.page_up(),
        Action::PageDown => state.page_down(),
        Action::GoToFirst => state.go_to_first(),
        Action::GoToLast => state.go_to_last(),
        Action::NextPage => state.next_page(),
        Action::PrevPage => state.prev_page(),
        Action::Launch => session.launch(state),
        Action::Rescan => {
            info!("rescan requested");
            session.scan.rescan();
            state.set_status("Rescanning");
        }
        Action::ShowHelp => state.show_help(),
        Action::HideHelp => state.hide_help(),
        Action::Quit => state.quit(),
        Action::Tick => {}
    }
}
