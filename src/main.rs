mod app;
mod catalog;
mod config;
mod diff;
mod gesture;
mod hint;
mod navigator;
mod render;
mod section_id;

use std::fs::{self, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notify::event::ModifyKind;
use notify::{
    Config as WatchConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::{table_of_contents, App, AppOptions};
use catalog::Catalog;
use config::Config;
use hint::FileHintStore;
use navigator::Navigator;
use render::Highlighter;

#[derive(Debug, Parser)]
#[command(
    name = "cread",
    version,
    about = "Read a C textbook section by section and practise typing its code samples"
)]
struct Cli {
    /// Section to open, e.g. '3.2', or a chapter number for its contents.
    section: Option<String>,

    /// Catalog TOML file. Defaults to the bundled catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the section as plain text and exit.
    #[arg(long)]
    plain: bool,

    /// Print the table of contents and exit.
    #[arg(long)]
    list: bool,

    /// Reload the catalog when the file changes (file catalog only).
    #[arg(long)]
    watch: bool,

    /// Write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Forget that the swipe hint was already shown.
    #[arg(long)]
    reset_hint: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install logger: {err}"))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match cli.config.clone() {
        Some(path) => path,
        None => match Config::default_path() {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    Config::load(&path)
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load(path),
        None => Catalog::bundled().context("Bundled catalog is invalid"),
    }
}

/// Watches the catalog's directory rather than the file itself, so saves that
/// replace the file through a rename keep being seen.
struct CatalogWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    path: PathBuf,
}

impl CatalogWatcher {
    fn new(path: &Path) -> Result<Self> {
        let path = fs::canonicalize(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            WatchConfig::default(),
        )?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        Ok(Self {
            _watcher: watcher,
            rx,
            path,
        })
    }

    fn is_change(&self, event: &Event) -> bool {
        let content = match event.kind {
            EventKind::Modify(ModifyKind::Metadata(_)) => false,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => true,
            _ => false,
        };
        content && event.paths.iter().any(|path| path == &self.path)
    }

    /// Drains pending events; true when any of them changed the catalog file.
    fn changed(&self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(event) => changed |= self.is_change(&event),
                Err(err) => warn!("catalog watch error: {err}"),
            }
        }
        changed
    }
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn run_interactive(mut app: App, catalog_path: Option<PathBuf>, watch: bool) -> Result<()> {
    let watcher = match (&catalog_path, watch) {
        (Some(path), true) => Some(CatalogWatcher::new(path)?),
        _ => None,
    };

    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    loop {
        app.tick(Instant::now());
        terminal.draw(|frame| app.draw(frame))?;

        if let (Some(watcher), Some(path)) = (&watcher, &catalog_path) {
            if watcher.changed() {
                match Catalog::load(path) {
                    Ok(catalog) => {
                        info!(path = %path.display(), "catalog reloaded");
                        app.replace_catalog(catalog);
                        app.set_status(format!("Reloaded {}", path.display()));
                    }
                    Err(err) => {
                        warn!("catalog reload failed: {err:#}");
                        app.set_status(format!("Reload failed: {err:#}"));
                    }
                }
            }
        }

        if event::poll(Duration::from_millis(120))? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key)? {
                        break;
                    }
                }
                CEvent::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Some(path) = cli.log_file.as_ref().or(config.log_file.as_ref()) {
        init_logging(path)?;
    }

    let catalog_path = cli.catalog.clone().or_else(|| config.catalog.clone());
    if cli.watch && catalog_path.is_none() {
        return Err(anyhow!("--watch requires a catalog file"));
    }
    let catalog = load_catalog(catalog_path.as_deref())?;
    if catalog.is_empty() {
        return Err(anyhow!("catalog has no chapters"));
    }

    if cli.list {
        print!("{}", table_of_contents(&catalog));
        return Ok(());
    }

    let hint_store = FileHintStore::new(config.hint_flag_path());
    if cli.reset_hint {
        hint_store.reset()?;
    }

    let start = cli.section.clone().unwrap_or_else(|| config.start.clone());
    let plain = cli.plain || !io::stdout().is_terminal();
    let mut app = App::new(
        Navigator::new(catalog),
        Highlighter::new(&config.theme),
        Box::new(hint_store),
        AppOptions {
            hint_duration: config.hint_duration(),
            swipe_threshold: config.swipe_threshold,
            show_hint: !plain,
        },
    );

    if plain {
        app.route_to(&start);
        println!("{}", app.plain_view());
        return Ok(());
    }

    info!(start = %start, "starting interactive session");
    app.route_to(&start);
    run_interactive(app, catalog_path, cli.watch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, MetadataKind, RenameMode};
    use std::thread;

    fn wait_for_change(watcher: &CatalogWatcher) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if watcher.changed() {
                return true;
            }
            thread::sleep(Duration::from_millis(25));
        }
        false
    }

    fn settle(watcher: &CatalogWatcher) {
        thread::sleep(Duration::from_millis(200));
        watcher.changed();
    }

    fn rename_save(path: &Path, contents: &str) {
        let tmp = path.with_extension("toml.swp");
        fs::write(&tmp, contents).unwrap();
        fs::rename(&tmp, path).unwrap();
    }

    #[test]
    fn watcher_keeps_seeing_rename_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        fs::write(&path, "").unwrap();
        let watcher = CatalogWatcher::new(&path).unwrap();
        settle(&watcher);

        rename_save(&path, "# first\n");
        assert!(wait_for_change(&watcher));
        settle(&watcher);

        rename_save(&path, "# second\n");
        assert!(wait_for_change(&watcher));
    }

    #[test]
    fn watcher_ignores_other_files_in_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        fs::write(&path, "").unwrap();
        let watcher = CatalogWatcher::new(&path).unwrap();
        settle(&watcher);

        fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();
        thread::sleep(Duration::from_millis(300));
        assert!(!watcher.changed());
    }

    #[test]
    fn only_content_events_count_as_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        fs::write(&path, "").unwrap();
        let watcher = CatalogWatcher::new(&path).unwrap();
        let target = watcher.path.clone();

        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path(target.clone());
        assert!(!watcher.is_change(&access));

        let touched = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))
            .add_path(target.clone());
        assert!(!watcher.is_change(&touched));

        let other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(dir.path().join("other.toml"));
        assert!(!watcher.is_change(&other));

        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(target.clone());
        assert!(watcher.is_change(&renamed));

        let written = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(target);
        assert!(watcher.is_change(&written));
    }
}
