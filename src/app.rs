use crate::{
    catalog::Catalog,
    config::{self, AppConfig},
    resolve::{self, ResolvedDisplay},
    scan::{self, Activation, ContentKind},
    toggle, update, viewer,
};
use anyhow::{bail, Context, Result};
use arboard::Clipboard;
use std::{
    collections::BTreeSet,
    fs,
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::{Duration, Instant},
};

const LOG_CAPACITY: usize = 200;
const TOAST_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPurpose {
    FilterMods,
    SetRoot,
    SetViewer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        purpose: InputPurpose,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupMode {
    Ui,
    Headless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub choice: DialogChoice,
}

enum CatalogMessage {
    Completed(update::RefreshResult),
    Failed { error: String },
}

/// One line of the listing: the scanned folder plus what the resolver made
/// of it. Rebuilt wholesale on every rescan.
#[derive(Debug, Clone)]
pub struct ModRow {
    pub folder: scan::ModFolder,
    pub display: ResolvedDisplay,
}

impl ModRow {
    pub fn status_label(&self) -> &'static str {
        self.folder.activation.label()
    }

    fn haystack(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.folder.author,
            self.display.character,
            self.display.costume,
            self.display.kind.label(),
            self.status_label(),
        )
        .to_lowercase()
    }
}

pub(crate) fn filter_indices(rows: &[ModRow], filter: &str) -> Vec<usize> {
    let filter = filter.trim().to_lowercase();
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            if filter.is_empty() || row.haystack().contains(&filter) {
                Some(index)
            } else {
                None
            }
        })
        .collect()
}

pub struct App {
    pub config: AppConfig,
    pub catalog: Catalog,
    pub rows: Vec<ModRow>,
    pub selected: usize,
    pub mod_filter: String,
    mod_filter_snapshot: Option<String>,
    pub status: String,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub toast: Option<Toast>,
    pub input_mode: InputMode,
    pub should_quit: bool,
    pub help_open: bool,
    pub dialog: Option<Dialog>,
    pending_toggle: Option<usize>,
    pub catalog_refreshing: bool,
    clipboard: Option<Clipboard>,
    catalog_tx: Sender<CatalogMessage>,
    catalog_rx: Receiver<CatalogMessage>,
    cache_path: PathBuf,
    log_path: PathBuf,
}

impl App {
    pub fn initialize(root_override: Option<PathBuf>, mode: StartupMode) -> Result<Self> {
        let mut config = AppConfig::load_or_create()?;
        if let Some(root) = root_override {
            config.mods_root = Some(root);
            config.save()?;
        }
        let cache_path = config::catalog_cache_path()?;
        let log_path = config::log_path()?;
        let (catalog_tx, catalog_rx) = mpsc::channel();

        let mut app = App {
            config,
            catalog: Catalog::default(),
            rows: Vec::new(),
            selected: 0,
            mod_filter: String::new(),
            mod_filter_snapshot: None,
            status: String::new(),
            logs: Vec::new(),
            log_scroll: 0,
            toast: None,
            input_mode: InputMode::Normal,
            should_quit: false,
            help_open: false,
            dialog: None,
            pending_toggle: None,
            catalog_refreshing: false,
            clipboard: None,
            catalog_tx,
            catalog_rx,
            cache_path,
            log_path,
        };

        app.reload_catalog();
        app.rescan();
        if mode == StartupMode::Ui {
            app.start_catalog_refresh();
        }
        Ok(app)
    }

    fn reload_catalog(&mut self) {
        match Catalog::load(&self.cache_path) {
            Ok(catalog) => {
                if catalog.is_empty() {
                    self.log_warn(
                        "Character table is empty; mods will show as Unknown until it refreshes"
                            .to_string(),
                    );
                }
                self.catalog = catalog;
            }
            Err(err) => {
                self.log_warn(format!("Character table unreadable: {err:#}"));
                self.catalog = Catalog::default();
            }
        }
    }

    pub fn rescan(&mut self) {
        self.rows.clear();
        let Some(root) = self.config.mods_root.clone() else {
            self.status = "No mods folder configured (press m to set one)".to_string();
            return;
        };
        if !root.is_dir() {
            let message = format!("Mods folder not found: {}", root.display());
            self.log_info(message.clone());
            self.status = message;
            return;
        }

        let scan = scan::scan_mods(&root);
        for warning in &scan.warnings {
            self.log_warn(warning.clone());
        }
        self.rows = scan
            .folders
            .into_iter()
            .map(|folder| ModRow {
                display: resolve::resolve_folder(&folder, &self.catalog),
                folder,
            })
            .collect();
        self.clamp_selection();

        let authors: BTreeSet<&str> = self
            .rows
            .iter()
            .map(|row| row.folder.author.as_str())
            .collect();
        self.status = format!(
            "Scanned {} mod(s) from {} author(s)",
            self.rows.len(),
            authors.len()
        );
    }

    fn re_resolve(&mut self) {
        let catalog = &self.catalog;
        for row in self.rows.iter_mut() {
            row.display = resolve::resolve_folder(&row.folder, catalog);
        }
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        filter_indices(&self.rows, &self.mod_filter)
    }

    pub fn selected_row_index(&self) -> Option<usize> {
        self.visible_indices().get(self.selected).copied()
    }

    pub fn clamp_selection(&mut self) {
        let visible = self.visible_indices().len();
        if visible == 0 {
            self.selected = 0;
        } else if self.selected >= visible {
            self.selected = visible - 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        self.selected = self.selected.saturating_add(1);
        self.clamp_selection();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible_indices().len().saturating_sub(1);
    }

    pub fn page_up(&mut self, page: usize) {
        self.selected = self.selected.saturating_sub(page.max(1));
    }

    pub fn page_down(&mut self, page: usize) {
        self.selected = self.selected.saturating_add(page.max(1));
        self.clamp_selection();
    }

    pub fn toggle_selected(&mut self) {
        let Some(index) = self.selected_row_index() else {
            self.status = "Nothing selected".to_string();
            return;
        };
        let verb = match self.rows[index].folder.activation {
            Activation::Active => "Disable",
            Activation::Inactive => "Enable",
            // Let the toggle itself report the missing marker.
            Activation::Missing => {
                self.perform_toggle(index);
                return;
            }
        };
        if self.config.confirm_toggle {
            let folder = &self.rows[index].folder;
            self.dialog = Some(Dialog {
                title: "Confirm".to_string(),
                message: format!("{verb} {}/{}?", folder.author, folder.name),
                choice: DialogChoice::Yes,
            });
            self.pending_toggle = Some(index);
            return;
        }
        self.perform_toggle(index);
    }

    pub fn dialog_choice_left(&mut self) {
        if let Some(dialog) = self.dialog.as_mut() {
            dialog.choice = DialogChoice::Yes;
        }
    }

    pub fn dialog_choice_right(&mut self) {
        if let Some(dialog) = self.dialog.as_mut() {
            dialog.choice = DialogChoice::No;
        }
    }

    pub fn dialog_set_choice(&mut self, choice: DialogChoice) {
        if let Some(dialog) = self.dialog.as_mut() {
            dialog.choice = choice;
        }
    }

    pub fn dialog_confirm(&mut self) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        let pending = self.pending_toggle.take();
        if dialog.choice == DialogChoice::Yes {
            if let Some(index) = pending {
                self.perform_toggle(index);
            }
        } else {
            self.status = "Cancelled".to_string();
        }
    }

    fn perform_toggle(&mut self, index: usize) {
        if index >= self.rows.len() {
            return;
        }
        let (author, name) = {
            let folder = &self.rows[index].folder;
            (folder.author.clone(), folder.name.clone())
        };
        match toggle::toggle_marker(&self.rows[index].folder) {
            Ok((marker, activation)) => {
                let row = &mut self.rows[index];
                row.folder.marker = Some(marker);
                row.folder.activation = activation;
                let verb = if activation == Activation::Active {
                    "Enabled"
                } else {
                    "Disabled"
                };
                self.status = format!("{verb} {author}/{name}");
                self.log_info(format!("{verb} {author}/{name}"));
            }
            Err(err) => {
                self.status = format!("Toggle failed: {err}");
                self.log_error(format!("Toggle failed for {author}/{name}: {err}"));
                self.set_toast("Toggle failed", ToastLevel::Error);
            }
        }
    }

    pub fn open_selected(&mut self) {
        let Some(index) = self.selected_row_index() else {
            self.status = "Nothing selected".to_string();
            return;
        };
        let path = self.rows[index].folder.path.display().to_string();
        let label = format!(
            "{}/{}",
            self.rows[index].folder.author, self.rows[index].folder.name
        );
        self.open_external(&path, &label);
    }

    pub fn preview_selected(&mut self) {
        let Some(index) = self.selected_row_index() else {
            self.status = "Nothing selected".to_string();
            return;
        };
        let row = &self.rows[index];
        let label = format!("{}/{}", row.folder.author, row.folder.name);
        match row.folder.kind {
            ContentKind::Animation => {
                let Some(executable) = self.config.viewer_path.clone() else {
                    self.status = "Viewer not configured (press v to set one)".to_string();
                    self.log_warn(format!("Preview of {label} skipped: viewer not configured"));
                    return;
                };
                let asset = row.folder.preview.clone();
                match viewer::launch(&executable, asset.as_deref()) {
                    Ok(()) => {
                        self.status = format!("Viewer launched for {label}");
                        self.log_info(format!("Viewer launched for {label}"));
                    }
                    Err(err) => {
                        self.status = format!("Viewer launch failed: {err}");
                        self.log_error(format!("Viewer launch failed: {err:#}"));
                        self.set_toast("Viewer launch failed", ToastLevel::Error);
                    }
                }
            }
            ContentKind::Image => {
                let Some(preview) = row.folder.preview.clone() else {
                    self.status = format!("No previewable asset in {label}");
                    self.log_warn(format!("No previewable asset in {label}"));
                    return;
                };
                let target = preview.display().to_string();
                self.open_external(&target, &label);
            }
            ContentKind::None => {
                self.status = format!("No previewable asset in {label}");
                self.log_warn(format!("No previewable asset in {label}"));
            }
        }
    }

    pub fn copy_selected_path(&mut self) {
        let Some(index) = self.selected_row_index() else {
            self.status = "Nothing selected".to_string();
            return;
        };
        let path = self.rows[index].folder.path.display().to_string();
        if self.copy_to_clipboard(&path) {
            self.status = format!("Copied {path}");
        }
    }

    fn open_external(&mut self, target: &str, label: &str) {
        let mut errors = Vec::new();
        let candidates = [
            ("xdg-open", vec![target]),
            ("gio", vec!["open", target]),
            ("kde-open5", vec![target]),
            ("kioclient5", vec!["exec", target]),
        ];
        for (command, args) in candidates {
            match Command::new(command)
                .args(&args)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => {
                    self.status = format!("Opened {label}");
                    return;
                }
                Ok(status) => {
                    errors.push(format!("{command} exited {status}"));
                }
                Err(err) => {
                    errors.push(format!("{command} failed: {err}"));
                }
            }
        }
        self.status = format!("Failed to open {label}");
        if errors.is_empty() {
            self.log_warn(format!("Failed to open {label}"));
        } else {
            self.log_warn(format!("Failed to open {label}: {}", errors.join("; ")));
        }
    }

    fn copy_to_clipboard(&mut self, text: &str) -> bool {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => {
                    self.status = format!("Clipboard unavailable: {err}");
                    self.log_warn(format!("Clipboard unavailable: {err}"));
                    return false;
                }
            }
        }
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text.to_string()),
            None => return false,
        };
        if let Err(err) = result {
            self.status = format!("Clipboard copy failed: {err}");
            self.log_warn(format!("Clipboard copy failed: {err}"));
            return false;
        }
        true
    }

    pub fn start_catalog_refresh(&mut self) {
        if self.catalog_refreshing {
            return;
        }
        self.catalog_refreshing = true;
        let tx = self.catalog_tx.clone();
        let cache_path = self.cache_path.clone();
        thread::spawn(move || {
            let message = match update::refresh_catalog(&cache_path) {
                Ok(result) => CatalogMessage::Completed(result),
                Err(err) => CatalogMessage::Failed {
                    error: format!("{err:#}"),
                },
            };
            let _ = tx.send(message);
        });
    }

    pub fn poll_catalog(&mut self) {
        loop {
            match self.catalog_rx.try_recv() {
                Ok(CatalogMessage::Completed(result)) => {
                    self.catalog_refreshing = false;
                    match result {
                        update::RefreshResult::UpToDate => {
                            self.log_info("Character table is up to date".to_string());
                        }
                        update::RefreshResult::Refreshed { entries } => {
                            self.reload_catalog();
                            self.re_resolve();
                            self.status = format!("Character table updated ({entries} entries)");
                            self.log_info(format!("Character table updated ({entries} entries)"));
                        }
                    }
                }
                Ok(CatalogMessage::Failed { error }) => {
                    self.catalog_refreshing = false;
                    self.log_warn(format!(
                        "Character table refresh failed: {error}; using cached table"
                    ));
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    pub fn enter_filter(&mut self) {
        self.mod_filter_snapshot = Some(self.mod_filter.clone());
        self.input_mode = InputMode::Editing {
            prompt: "Filter".to_string(),
            buffer: self.mod_filter.clone(),
            purpose: InputPurpose::FilterMods,
        };
    }

    pub fn enter_set_root(&mut self) {
        let current = self
            .config
            .mods_root
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        self.input_mode = InputMode::Editing {
            prompt: "Mods folder".to_string(),
            buffer: current,
            purpose: InputPurpose::SetRoot,
        };
    }

    pub fn enter_set_viewer(&mut self) {
        let current = self
            .config
            .viewer_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        self.input_mode = InputMode::Editing {
            prompt: "Viewer executable".to_string(),
            buffer: current,
            purpose: InputPurpose::SetViewer,
        };
    }

    /// Live filter application while the user types.
    pub fn set_filter_live(&mut self, value: &str) {
        self.mod_filter = value.to_string();
        self.clamp_selection();
    }

    pub fn clear_filter(&mut self) {
        if self.mod_filter.is_empty() {
            return;
        }
        self.mod_filter.clear();
        self.clamp_selection();
        self.status = "Filter cleared".to_string();
    }

    pub fn cancel_input(&mut self, purpose: InputPurpose) {
        if purpose == InputPurpose::FilterMods {
            if let Some(snapshot) = self.mod_filter_snapshot.take() {
                self.mod_filter = snapshot;
                self.clamp_selection();
            }
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn handle_submit(&mut self, purpose: InputPurpose, value: String) -> Result<()> {
        self.input_mode = InputMode::Normal;
        match purpose {
            InputPurpose::FilterMods => {
                self.mod_filter_snapshot = None;
                self.set_filter_live(&value);
                Ok(())
            }
            InputPurpose::SetRoot => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    bail!("mods folder path is empty");
                }
                let root = PathBuf::from(trimmed);
                self.config.mods_root = Some(root.clone());
                self.config.save().context("save config")?;
                self.log_info(format!("Mods folder set to {}", root.display()));
                self.rescan();
                Ok(())
            }
            InputPurpose::SetViewer => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    bail!("viewer path is empty");
                }
                let path = PathBuf::from(trimmed);
                if !path.is_file() {
                    self.log_warn(format!(
                        "Viewer executable not found at {} (saved anyway)",
                        path.display()
                    ));
                }
                self.config.viewer_path = Some(path.clone());
                self.config.save().context("save config")?;
                self.status = format!("Viewer set to {}", path.display());
                Ok(())
            }
        }
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if Instant::now() >= toast.expires_at {
                self.toast = None;
            }
        }
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + Duration::from_secs(TOAST_SECS),
        });
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        self.log_scroll = (self.log_scroll + lines).min(self.logs.len().saturating_sub(1));
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }

        self.logs.push(LogEntry {
            level,
            message: message.clone(),
        });

        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
            self.log_scroll = self.log_scroll.saturating_sub(overflow);
        }

        let _ = append_log_file(&self.log_path, level, &message);
    }

    /// Plain-text listing for `--scan`.
    pub fn listing_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{:<16} {:<20} {:<24} {:<12} {}",
            "AUTHOR", "CHARACTER", "COSTUME", "TYPE", "STATUS"
        )];
        for row in &self.rows {
            lines.push(format!(
                "{:<16} {:<20} {:<24} {:<12} {}",
                row.folder.author,
                row.display.character,
                row.display.costume,
                row.display.kind.label(),
                row.status_label(),
            ));
        }
        lines
    }
}

pub fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn append_log_file(path: &PathBuf, level: LogLevel, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "[{label}] {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ContentType;
    use crate::scan::ModFolder;

    fn row(author: &str, character: &str, costume: &str, kind: ContentType, active: bool) -> ModRow {
        ModRow {
            folder: ModFolder {
                author: author.to_string(),
                name: costume.to_string(),
                path: PathBuf::from("/tmp/mods").join(author).join(costume),
                marker: None,
                activation: if active {
                    Activation::Active
                } else {
                    Activation::Inactive
                },
                kind: ContentKind::Animation,
                file_names: Vec::new(),
                preview: None,
            },
            display: ResolvedDisplay {
                character: character.to_string(),
                costume: costume.to_string(),
                kind,
            },
        }
    }

    #[test]
    fn filter_matches_any_listing_column_case_insensitively() {
        let rows = vec![
            row("linr", "Celia", "Bunny Girl", ContentType::Cutscene, true),
            row("miagi", "Justia", "Default", ContentType::Idle, false),
        ];
        assert_eq!(filter_indices(&rows, "CELIA"), vec![0]);
        assert_eq!(filter_indices(&rows, "miagi"), vec![1]);
        assert_eq!(filter_indices(&rows, "idle"), vec![1]);
        assert_eq!(filter_indices(&rows, "inactive"), vec![1]);
        assert_eq!(filter_indices(&rows, "bunny"), vec![0]);
    }

    #[test]
    fn empty_or_blank_filter_hides_nothing() {
        let rows = vec![
            row("a", "X", "One", ContentType::Idle, true),
            row("b", "Y", "Two", ContentType::Image, false),
        ];
        assert_eq!(filter_indices(&rows, ""), vec![0, 1]);
        assert_eq!(filter_indices(&rows, "   "), vec![0, 1]);
    }

    #[test]
    fn unmatched_filter_hides_everything() {
        let rows = vec![row("a", "X", "One", ContentType::Idle, true)];
        assert!(filter_indices(&rows, "zzz").is_empty());
    }

    #[test]
    fn dating_sim_label_is_searchable() {
        let rows = vec![row("a", "Justia", "Blue Oath", ContentType::DatingSim, true)];
        assert_eq!(filter_indices(&rows, "dating sim"), vec![0]);
    }
}
