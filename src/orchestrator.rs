/*!
 * Translation orchestration across one or many subtitle files.
 *
 * The orchestrator resolves the effective configuration for the selected
 * provider, drives the batch translator per file, aggregates job-level
 * progress, applies bilingual post-processing, and persists a resumable
 * session snapshot after every completed batch and file transition.
 *
 * Files are processed strictly sequentially; concurrency lives inside the
 * per-file batch dispatch. Progress is surfaced as [`ProgressEvent`]s on a
 * channel rather than callbacks, decoupling the engine from UI lifecycles.
 */

use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app_config::{BatcherConfig, BatcherOverrides, TranslateMode};
use crate::errors::{ErrorKind, TranslationError};
use crate::providers::{Provider, ProviderRegistry};
use crate::storage::SessionStore;
use crate::subtitle_processor::{Subtitle, SubtitleLine};
use crate::translation::batch::{BatchEvent, BatchTranslator, cache_suffix};
use crate::translation::cache::{TranslationCache, cache_key};
use crate::translation::session::{
    CompletedBatch, FileStatus, SessionConfig, StoredFile, TranslationSession, load_resumable,
};

/// Job-level events drained by the caller.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A file began translating
    FileStarted { file_index: usize, name: String },
    /// Cumulative line progress across the whole job
    Progress {
        current: usize,
        total: usize,
        file: Option<String>,
    },
    /// A batch finished translating
    BatchCompleted {
        file_index: usize,
        batch: CompletedBatch,
    },
    /// A file finished, successfully or not
    FileCompleted {
        file_index: usize,
        status: FileStatus,
    },
}

/// A named subtitle document queued for translation.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    pub name: String,
    pub subtitle: Subtitle,
}

/// Per-file result of a job.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub name: String,
    pub status: FileStatus,
    /// Translated document; present even on partial failure
    pub subtitle: Option<Subtitle>,
    pub error: Option<TranslationError>,
}

/// Result of a multi-file job.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    pub files: Vec<FileOutcome>,
}

impl JobOutcome {
    /// Whether every file completed successfully.
    pub fn is_success(&self) -> bool {
        self.files.iter().all(|f| f.status == FileStatus::Completed)
    }
}

/// Options for a translation run.
#[derive(Clone)]
pub struct TranslateOptions {
    /// Registry id of the provider to use
    pub provider_id: String,
    /// Source language code ("auto" = detect)
    pub source: String,
    /// Target language code
    pub target: String,
    /// Output mode
    pub mode: TranslateMode,
    /// User overrides applied on top of provider limits
    pub overrides: BatcherOverrides,
    /// Sampling temperature; the provider's recommendation when absent
    pub temperature: Option<f32>,
    /// Sink for job-level events
    pub events: Option<mpsc::UnboundedSender<ProgressEvent>>,
    /// Cooperative cancellation for the whole job
    pub cancel: CancellationToken,
    /// Attempt to resume from a stored session
    pub resume: bool,
}

impl TranslateOptions {
    /// Create options with defaults for everything but the essentials.
    pub fn new(
        provider_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            source: source.into(),
            target: target.into(),
            mode: TranslateMode::default(),
            overrides: BatcherOverrides::default(),
            temperature: None,
            events: None,
            cancel: CancellationToken::new(),
            resume: false,
        }
    }
}

/// Drives translation for single files and multi-file jobs.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    cache: TranslationCache,
    sessions: Arc<dyn SessionStore>,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: TranslationCache,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            registry,
            cache,
            sessions,
        }
    }

    fn resolve(
        &self,
        options: &TranslateOptions,
    ) -> Result<(Arc<dyn Provider>, BatcherConfig, Option<f32>), TranslationError> {
        let provider = self.registry.get(&options.provider_id).ok_or_else(|| {
            TranslationError::new(
                ErrorKind::Unknown,
                format!("Unknown provider: {}", options.provider_id),
            )
        })?;

        let rate_limit = self
            .registry
            .schema(&options.provider_id)
            .and_then(|s| s.rate_limit.as_ref());
        let config = BatcherConfig::effective(rate_limit, &options.overrides);
        let temperature = options
            .temperature
            .or(rate_limit.map(|r| r.recommended_temperature));

        Ok((provider, config, temperature))
    }

    fn build_translator(
        &self,
        provider: Arc<dyn Provider>,
        config: BatcherConfig,
        temperature: Option<f32>,
        options: &TranslateOptions,
        events: Option<mpsc::UnboundedSender<BatchEvent>>,
    ) -> BatchTranslator {
        let mut translator = BatchTranslator::new(
            provider,
            config,
            self.cache.clone(),
            options.source.clone(),
            options.target.clone(),
        )
        .with_temperature(temperature)
        .with_cancel(options.cancel.clone());
        if let Some(events) = events {
            translator = translator.with_events(events);
        }
        translator
    }

    /// Translate a single subtitle document.
    pub async fn translate_subtitle(
        &self,
        subtitle: &Subtitle,
        options: &TranslateOptions,
    ) -> Result<Subtitle, TranslationError> {
        if options.cancel.is_cancelled() {
            return Err(TranslationError::cancelled());
        }

        let (provider, config, temperature) = self.resolve(options)?;

        let (batch_tx, forward) = match &options.events {
            Some(user_events) => {
                let (tx, mut rx) = mpsc::unbounded_channel::<BatchEvent>();
                let user_events = user_events.clone();
                let handle = tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        let _ = user_events.send(match event {
                            BatchEvent::Progress { current, total } => ProgressEvent::Progress {
                                current,
                                total,
                                file: None,
                            },
                            BatchEvent::BatchCompleted { batch } => ProgressEvent::BatchCompleted {
                                file_index: 0,
                                batch,
                            },
                        });
                    }
                });
                (Some(tx), Some(handle))
            }
            None => (None, None),
        };

        let translator = self.build_translator(provider, config, temperature, options, batch_tx);
        let result = translator.translate_lines(&subtitle.lines).await;
        drop(translator);
        if let Some(handle) = forward {
            let _ = handle.await;
        }

        let mut lines = result?;
        apply_mode(&mut lines, options.mode);

        Ok(Subtitle {
            format: subtitle.format,
            lines,
            metadata: subtitle.metadata.clone(),
        })
    }

    /// Translate a batch of files strictly sequentially, checkpointing a
    /// resumable session along the way.
    ///
    /// A failed file is marked and the job continues; CANCELLED propagates
    /// and stops the whole job with the session preserved. On full success
    /// the session is cleared.
    pub async fn translate_files(
        &self,
        files: &[SubtitleFile],
        options: &TranslateOptions,
    ) -> Result<JobOutcome, TranslationError> {
        let (provider, config, temperature) = self.resolve(options)?;

        let session_config = SessionConfig {
            source_language: options.source.clone(),
            target_language: options.target.clone(),
            provider_id: options.provider_id.clone(),
            mode: options.mode,
            tactic_lite: config.tactic_lite,
        };

        if options.resume {
            self.seed_cache_from_session(&session_config, &config).await;
        }

        let stored_files: Vec<StoredFile> = files
            .iter()
            .map(|f| StoredFile {
                name: f.name.clone(),
                content: f.subtitle.serialize(),
                line_count: f.subtitle.lines.len(),
            })
            .collect();

        let session = Arc::new(Mutex::new(TranslationSession::new(
            stored_files,
            session_config,
        )));
        self.save_session(&session).await;

        let job_total: usize = files.iter().map(|f| f.subtitle.lines.len()).sum();
        let mut offset = 0usize;
        let mut outcome = JobOutcome::default();

        for (file_index, file) in files.iter().enumerate() {
            if options.cancel.is_cancelled() {
                self.save_session(&session).await;
                return Err(TranslationError::cancelled());
            }

            info!("Translating file {}/{}: {}", file_index + 1, files.len(), file.name);
            session.lock().set_file_status(file_index, FileStatus::Translating);
            self.save_session(&session).await;
            self.emit(options, ProgressEvent::FileStarted {
                file_index,
                name: file.name.clone(),
            });

            let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<BatchEvent>();
            let drain = {
                let session = session.clone();
                let store = self.sessions.clone();
                let user_events = options.events.clone();
                let file_name = file.name.clone();
                tokio::spawn(async move {
                    while let Some(event) = batch_rx.recv().await {
                        match event {
                            BatchEvent::Progress { current, total: _ } => {
                                let snapshot = {
                                    let mut s = session.lock();
                                    s.set_file_progress(file_index, current);
                                    s.clone()
                                };
                                if let Err(e) = store.save(&snapshot).await {
                                    warn!("Failed to save session: {}", e);
                                }
                                if let Some(tx) = &user_events {
                                    let _ = tx.send(ProgressEvent::Progress {
                                        current: offset + current,
                                        total: job_total,
                                        file: Some(file_name.clone()),
                                    });
                                }
                            }
                            BatchEvent::BatchCompleted { batch } => {
                                let snapshot = {
                                    let mut s = session.lock();
                                    s.add_completed_batch(file_index, batch.clone());
                                    s.clone()
                                };
                                if let Err(e) = store.save(&snapshot).await {
                                    warn!("Failed to save session: {}", e);
                                }
                                if let Some(tx) = &user_events {
                                    let _ = tx.send(ProgressEvent::BatchCompleted { file_index, batch });
                                }
                            }
                        }
                    }
                })
            };

            let translator = self.build_translator(
                provider.clone(),
                config.clone(),
                temperature,
                options,
                Some(batch_tx),
            );
            let result = translator.translate_lines(&file.subtitle.lines).await;
            drop(translator);
            let _ = drain.await;

            match result {
                Ok(mut lines) => {
                    apply_mode(&mut lines, options.mode);
                    {
                        let mut s = session.lock();
                        s.set_file_progress(file_index, file.subtitle.lines.len());
                        s.set_file_status(file_index, FileStatus::Completed);
                    }
                    self.save_session(&session).await;
                    self.emit(options, ProgressEvent::FileCompleted {
                        file_index,
                        status: FileStatus::Completed,
                    });

                    outcome.files.push(FileOutcome {
                        name: file.name.clone(),
                        status: FileStatus::Completed,
                        subtitle: Some(Subtitle {
                            format: file.subtitle.format,
                            lines,
                            metadata: file.subtitle.metadata.clone(),
                        }),
                        error: None,
                    });
                }
                Err(e) if e.kind == ErrorKind::Cancelled => {
                    session.lock().set_file_status(file_index, FileStatus::Error);
                    self.save_session(&session).await;
                    return Err(e);
                }
                Err(e) => {
                    error!("File {} failed: {}", file.name, e);
                    session.lock().set_file_status(file_index, FileStatus::Error);
                    self.save_session(&session).await;
                    self.emit(options, ProgressEvent::FileCompleted {
                        file_index,
                        status: FileStatus::Error,
                    });

                    outcome.files.push(FileOutcome {
                        name: file.name.clone(),
                        status: FileStatus::Error,
                        subtitle: None,
                        error: Some(e),
                    });
                }
            }

            offset += file.subtitle.lines.len();
        }

        if outcome.is_success() {
            if let Err(e) = self.sessions.clear().await {
                warn!("Failed to clear session after success: {}", e);
            }
        }

        Ok(outcome)
    }

    /// Re-seed the translation cache from a compatible stored session so
    /// already-translated batches short-circuit on a resumed run.
    async fn seed_cache_from_session(&self, session_config: &SessionConfig, config: &BatcherConfig) {
        let Some(stored) = load_resumable(self.sessions.as_ref()).await else {
            return;
        };

        if stored.config != *session_config {
            info!("Stored session does not match current configuration, ignoring");
            return;
        }

        let suffix = cache_suffix(
            &session_config.provider_id,
            &session_config.source_language,
            &session_config.target_language,
            session_config.tactic_lite,
        );

        let mut seeded = 0usize;
        for batches in stored.completed_batches.values() {
            for batch in batches {
                let key = cache_key(&batch.merged_text, &suffix);
                let value = batch.translations.join(&config.line_separator);
                self.cache.set(&key, &value).await;
                seeded += 1;
            }
        }

        if seeded > 0 {
            info!("Resumed session {}: seeded {} completed batches", stored.id, seeded);
        }
    }

    async fn save_session(&self, session: &Arc<Mutex<TranslationSession>>) {
        let snapshot = session.lock().clone();
        if let Err(e) = self.sessions.save(&snapshot).await {
            warn!("Failed to save session: {}", e);
        }
    }

    fn emit(&self, options: &TranslateOptions, event: ProgressEvent) {
        if let Some(events) = &options.events {
            let _ = events.send(event);
        }
    }
}

/// Bilingual post-processing: prefix the translation with the original,
/// joined by a newline. Translate-only mode leaves lines untouched.
fn apply_mode(lines: &mut [SubtitleLine], mode: TranslateMode) {
    if mode != TranslateMode::Bilingual {
        return;
    }
    for line in lines.iter_mut() {
        if let Some(translated) = &line.translated {
            if !translated.is_empty() {
                line.translated = Some(format!("{}\n{}", line.text, translated));
            }
        }
    }
}
