/*!
 * Application controller wiring the CLI to the translation engine.
 *
 * Builds the provider registry and storage from configuration, runs the
 * orchestrator over the discovered subtitle files, and renders progress
 * events as an indicatif progress bar.
 */

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app_config::AppConfig;
use crate::file_utils;
use crate::glossary::parse_glossary;
use crate::language_utils;
use crate::orchestrator::{Orchestrator, ProgressEvent, SubtitleFile, TranslateOptions};
use crate::providers::ProviderRegistry;
use crate::providers::openai_compat::OpenAiCompatProvider;
use crate::storage::sqlite::SqliteStore;
use crate::storage::{CacheStore, MemoryCacheStore, MemorySessionStore, SessionStore};
use crate::subtitle_processor::{Subtitle, SubtitleFormat};
use crate::translation::cache::TranslationCache;
use crate::translation::session::FileStatus;

/// Main application controller for subtitle translation.
pub struct Controller {
    config: AppConfig,
}

impl Controller {
    /// Create a controller with the given configuration.
    pub fn with_config(config: AppConfig) -> Result<Self> {
        language_utils::normalize_language_code(&config.source_language)
            .context("Invalid source language")?;
        let target = language_utils::normalize_language_code(&config.target_language)
            .context("Invalid target language")?;
        if target == language_utils::AUTO {
            return Err(anyhow!("Target language cannot be 'auto'"));
        }
        Ok(Self { config })
    }

    /// Build the provider registry from configuration.
    fn build_registry(&self) -> ProviderRegistry {
        let settings = &self.config.provider;
        let provider = OpenAiCompatProvider::new(
            settings.id.clone(),
            settings.id.clone(),
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.model.clone(),
        );
        let schema = provider.schema(settings.rate_limit.clone());

        let mut registry = ProviderRegistry::new();
        registry.register(schema, Arc::new(provider));
        registry
    }

    /// Open persistent storage, degrading to in-memory stores when the
    /// database cannot be opened.
    fn build_storage(&self) -> (Arc<dyn CacheStore>, Arc<dyn SessionStore>) {
        match SqliteStore::new_default() {
            Ok(store) => {
                let store = Arc::new(store);
                (store.clone() as Arc<dyn CacheStore>, store as Arc<dyn SessionStore>)
            }
            Err(e) => {
                warn!("Falling back to in-memory storage: {}", e);
                (
                    Arc::new(MemoryCacheStore::new()),
                    Arc::new(MemorySessionStore::new()),
                )
            }
        }
    }

    fn load_glossary(&self) -> Result<Option<Vec<crate::glossary::GlossaryItem>>> {
        let Some(path) = &self.config.glossary_path else {
            return Ok(None);
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read glossary file: {}", path))?;
        let items = parse_glossary(&content);
        info!("Loaded {} glossary terms from {}", items.len(), path);
        Ok(Some(items))
    }

    /// Translate all subtitle files under `input_path`.
    pub async fn run(
        &self,
        input_path: PathBuf,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
        resume: bool,
    ) -> Result<()> {
        let paths = file_utils::find_subtitle_files(&input_path)?;
        if paths.is_empty() {
            return Err(anyhow!("No subtitle files found under {}", input_path.display()));
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            let format = SubtitleFormat::from_path(path)
                .ok_or_else(|| anyhow!("Unsupported subtitle format: {}", path.display()))?;
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let subtitle = Subtitle::parse(&content, format)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            files.push(SubtitleFile {
                name: path.display().to_string(),
                subtitle,
            });
        }

        let registry = Arc::new(self.build_registry());
        let (cache_store, session_store) = self.build_storage();
        let orchestrator = Orchestrator::new(
            registry,
            TranslationCache::new(cache_store),
            session_store,
        );

        let mut overrides = self.config.batcher.clone();
        if let Some(glossary) = self.load_glossary()? {
            overrides.glossary = Some(glossary);
        }

        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, winding down");
                    cancel.cancel();
                }
            });
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let progress = spawn_progress_renderer(events_rx);

        let mut options = TranslateOptions::new(
            self.config.provider.id.clone(),
            self.config.source_language.clone(),
            self.config.target_language.clone(),
        );
        options.mode = self.config.mode;
        options.overrides = overrides;
        options.temperature = self.config.temperature;
        options.events = Some(events_tx);
        options.cancel = cancel;
        options.resume = resume;

        let outcome = orchestrator.translate_files(&files, &options).await;
        // Dropping the options drops the event sender, letting the renderer finish
        drop(options);
        let _ = progress.await;

        let outcome = outcome.map_err(|e| anyhow!(e.user_message()))?;

        let mut failed = 0usize;
        for (file_outcome, path) in outcome.files.iter().zip(&paths) {
            match (&file_outcome.status, &file_outcome.subtitle) {
                (FileStatus::Completed, Some(subtitle)) => {
                    let out_path = file_utils::output_path(
                        path,
                        &self.config.target_language,
                        output_dir.as_deref(),
                    );
                    if out_path.exists() && !force_overwrite {
                        warn!("Skipping existing output: {}", out_path.display());
                        continue;
                    }
                    file_utils::atomic_write(&out_path, &subtitle.serialize())?;
                    info!("Wrote {}", out_path.display());
                }
                _ => {
                    failed += 1;
                    if let Some(error) = &file_outcome.error {
                        warn!("{}: {}", file_outcome.name, error.user_message());
                    }
                }
            }
        }

        if failed > 0 {
            Err(anyhow!("{} of {} files failed to translate", failed, outcome.files.len()))
        } else {
            Ok(())
        }
    }
}

/// Render progress events as a progress bar until the channel closes.
fn spawn_progress_renderer(
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        while let Some(event) = events.recv().await {
            match event {
                ProgressEvent::FileStarted { name, .. } => {
                    bar.set_message(name);
                }
                ProgressEvent::Progress { current, total, file } => {
                    if bar.is_hidden() {
                        bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                    }
                    bar.set_length(total as u64);
                    bar.set_position(current as u64);
                    if let Some(file) = file {
                        bar.set_message(file);
                    }
                }
                ProgressEvent::BatchCompleted { .. } => {}
                ProgressEvent::FileCompleted { status, .. } => {
                    if status == FileStatus::Error {
                        bar.println("file failed, continuing");
                    }
                }
            }
        }
        bar.finish_and_clear();
    })
}
