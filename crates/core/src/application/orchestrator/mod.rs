// Generation Orchestrator - turns a story into panels or pages

mod references;
mod render;

pub use references::resolve_references;

use crate::application::queue::TaskQueue;
use crate::domain::scene::{collect_characters, number_page_scenes, number_scenes};
use crate::domain::{
    ComicStyle, DomainError, GeneratedImage, LayoutMode, QueueStatus, QueueTask, Scene,
    Storyboard, TaskError,
};
use crate::error::{AppError, Result};
use crate::port::{AnalyzeRequest, ApiKey, ContentService, CredentialStore, RosterStore};
use render::{read_board, render_item, write_board, Attempt, RenderContext, SharedStoryboard};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub mode: LayoutMode,
    /// Panels or pages installed
    pub items: usize,
    pub scenes: usize,
    /// Declared character names, first appearance order
    pub characters: Vec<String>,
    pub revision: u64,
}

/// Result of one `generate_all` run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Tasks handed to the queue
    pub submitted: usize,
    /// Items left alone because they were already generating
    pub skipped: usize,
    /// Queue counters once the batch drained
    pub status: QueueStatus,
}

/// Generation Orchestrator
///
/// Owns the storyboard and drives its items through the bounded queue.
pub struct GenerationOrchestrator {
    queue: TaskQueue<GeneratedImage>,
    content: Arc<dyn ContentService>,
    roster: Arc<dyn RosterStore>,
    credentials: Arc<dyn CredentialStore>,
    style: ComicStyle,
    storyboard: SharedStoryboard,
    /// Last batch ticket handed out by `generate_all`
    batches: AtomicU64,
}

impl GenerationOrchestrator {
    pub fn new(
        queue: TaskQueue<GeneratedImage>,
        content: Arc<dyn ContentService>,
        roster: Arc<dyn RosterStore>,
        credentials: Arc<dyn CredentialStore>,
        style: ComicStyle,
    ) -> Self {
        Self {
            queue,
            content,
            roster,
            credentials,
            style,
            storyboard: Arc::new(RwLock::new(Storyboard::default())),
            batches: AtomicU64::new(0),
        }
    }

    pub fn queue(&self) -> &TaskQueue<GeneratedImage> {
        &self.queue
    }

    pub fn style(&self) -> ComicStyle {
        self.style
    }

    /// Cloned snapshot for display
    pub fn storyboard(&self) -> Storyboard {
        read_board(&self.storyboard).clone()
    }

    /// Split `text` into scenes (or pages) and install a fresh storyboard
    pub async fn analyze(&self, text: &str, mode: LayoutMode) -> Result<AnalysisSummary> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("story text is empty".to_string()));
        }
        let api_key = self.require_api_key().await?;
        let request = AnalyzeRequest {
            text: text.to_string(),
            api_key,
        };

        let summary = match mode {
            LayoutMode::SinglePanel => {
                let mut scenes = self.content.analyze_scenes(request).await?;
                if scenes.is_empty() {
                    return Err(AppError::Validation(
                        "analysis returned no scenes".to_string(),
                    ));
                }
                number_scenes(&mut scenes);
                let characters = collect_characters(&scenes);
                let scene_count = scenes.len();

                let mut board = write_board(&self.storyboard);
                board.install_panels(scenes);
                AnalysisSummary {
                    mode,
                    items: board.len(),
                    scenes: scene_count,
                    characters,
                    revision: board.revision(),
                }
            }
            LayoutMode::MultiPanel => {
                let mut pages = self.content.analyze_pages(request).await?;
                if pages.is_empty() {
                    return Err(AppError::Validation(
                        "analysis returned no pages".to_string(),
                    ));
                }
                number_page_scenes(&mut pages);
                let characters = collect_characters(pages.iter().flat_map(|p| &p.scenes));
                let scene_count: usize = pages.iter().map(|p| p.scenes.len()).sum();

                let mut board = write_board(&self.storyboard);
                board.install_pages(pages);
                AnalysisSummary {
                    mode,
                    items: board.len(),
                    scenes: scene_count,
                    characters,
                    revision: board.revision(),
                }
            }
        };

        info!(
            mode = %summary.mode,
            items = summary.items,
            scenes = summary.scenes,
            revision = summary.revision,
            "Story analysed"
        );
        Ok(summary)
    }

    /// Render every item that is not already generating or queued.
    ///
    /// Pre-flight errors (no credential, empty storyboard) are returned before
    /// the queue is touched. Each planned item is reserved under the storyboard
    /// lock before its task is submitted, so a manual run cannot claim it while
    /// the task waits. Item failures are recorded on the items and counted in
    /// the report, they do not fail the batch.
    pub async fn generate_all(&self) -> Result<BatchReport> {
        let api_key = self.require_api_key().await?;
        if read_board(&self.storyboard).is_empty() {
            return Err(AppError::Validation(
                "nothing to generate: analyse a story first".to_string(),
            ));
        }

        // Tasks of an earlier batch that were still waiting are gone after the
        // reset, so every reservation left on the board is withdrawn below
        let discarded = self.queue.reset();
        let ticket = self.batches.fetch_add(1, Ordering::SeqCst) + 1;

        let (revision, planned, skipped, withdrawn) = {
            let mut board = write_board(&self.storyboard);
            let withdrawn = board.withdraw_all();
            let mut planned = Vec::with_capacity(board.len());
            let mut skipped = 0;
            for index in 0..board.len() {
                let Some(task_id) = board.task_id(index) else {
                    continue;
                };
                let item_id = board.item_id(index).unwrap_or_default().to_string();
                match board.item_state_mut(index)?.enqueue(&item_id, ticket) {
                    Ok(()) => planned.push((index, task_id)),
                    Err(_) => skipped += 1,
                }
            }
            (board.revision(), planned, skipped, withdrawn)
        };

        let ctx = self.render_context(api_key);
        let tasks: Vec<QueueTask<GeneratedImage>> = planned
            .into_iter()
            .map(|(index, task_id)| {
                let ctx = ctx.clone();
                QueueTask::new(task_id, move || async move {
                    render_item(&ctx, index, revision, Attempt::Batch(ticket))
                        .await
                        .map_err(TaskError::from)
                })
            })
            .collect();
        let submitted = tasks.len();

        info!(
            submitted,
            skipped,
            discarded,
            withdrawn,
            revision,
            ticket,
            "Batch generation started"
        );
        if let Err(err) = self.queue.enqueue_batch(tasks) {
            write_board(&self.storyboard).withdraw_all();
            return Err(err.into());
        }
        self.queue.wait_all().await;

        let status = self.queue.status();
        info!(
            completed = status.completed,
            failed = status.failed,
            "Batch generation finished"
        );
        Ok(BatchReport {
            submitted,
            skipped,
            status,
        })
    }

    /// Render one item directly, outside the queue.
    ///
    /// Refused while the item is generating or waiting in the queue. A remote
    /// failure is recorded on the item and also returned.
    pub async fn generate_item(&self, index: usize) -> Result<GeneratedImage> {
        let api_key = self.require_api_key().await?;
        let revision = self.check_index(index)?;
        render_item(&self.render_context(api_key), index, revision, Attempt::Manual)
            .await
            .map_err(AppError::from)
    }

    /// Drop the current image of an item, then render it again.
    ///
    /// The image is only dropped once the item has been claimed.
    pub async fn regenerate_item(&self, index: usize) -> Result<GeneratedImage> {
        let api_key = self.require_api_key().await?;
        let revision = self.check_index(index)?;
        render_item(
            &self.render_context(api_key),
            index,
            revision,
            Attempt::Regenerate,
        )
        .await
        .map_err(AppError::from)
    }

    /// Replace the scene behind a panel (single-panel mode only)
    pub fn edit_scene(&self, index: usize, scene: Scene) -> Result<()> {
        write_board(&self.storyboard).replace_scene(index, scene)?;
        info!(index, "Scene edited");
        Ok(())
    }

    async fn require_api_key(&self) -> Result<ApiKey> {
        self.credentials
            .get()
            .await?
            .ok_or_else(|| AppError::Config("no API key configured".to_string()))
    }

    fn check_index(&self, index: usize) -> Result<u64> {
        let board = read_board(&self.storyboard);
        if board.is_empty() {
            return Err(AppError::Validation(
                "nothing to generate: analyse a story first".to_string(),
            ));
        }
        if index >= board.len() {
            return Err(DomainError::ItemOutOfRange {
                index,
                len: board.len(),
            }
            .into());
        }
        Ok(board.revision())
    }

    fn render_context(&self, api_key: ApiKey) -> RenderContext {
        RenderContext {
            content: Arc::clone(&self.content),
            roster: Arc::clone(&self.roster),
            storyboard: Arc::clone(&self.storyboard),
            style: self.style,
            api_key,
        }
    }
}
