// Render one storyboard item
//
// Shared by queued batch tasks and manual single-item runs. The storyboard
// lock is only held for the begin and write-back steps, never across a
// remote call.

use super::references::resolve_references;
use crate::domain::{
    ComicStyle, DomainError, GeneratedImage, ImageOptions, ItemWork, Storyboard, TaskError,
};
use crate::error::AppError;
use crate::port::{ApiKey, ContentError, ContentService, PageRequest, PanelRequest, RosterStore};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

pub(crate) type SharedStoryboard = Arc<RwLock<Storyboard>>;

pub(crate) fn read_board(board: &SharedStoryboard) -> RwLockReadGuard<'_, Storyboard> {
    board.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_board(board: &SharedStoryboard) -> RwLockWriteGuard<'_, Storyboard> {
    board.write().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a render needs, cloned into each task
#[derive(Clone)]
pub(crate) struct RenderContext {
    pub content: Arc<dyn ContentService>,
    pub roster: Arc<dyn RosterStore>,
    pub storyboard: SharedStoryboard,
    pub style: ComicStyle,
    pub api_key: ApiKey,
}

/// How an attempt claims its item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    /// Queued task holding the reservation of this batch ticket
    Batch(u64),
    /// Manual run on an idle item
    Manual,
    /// Manual run that also drops the current image once the item is claimed
    Regenerate,
}

#[derive(Debug)]
pub(crate) enum RenderFailure {
    /// Item busy or index out of range; item state untouched
    Refused(DomainError),
    /// Storyboard replaced, or reservation withdrawn, since the render was planned
    Stale { item: String },
    /// Roster could not be read; recorded on the item
    Roster(AppError),
    /// Remote call failed; recorded on the item
    Remote(ContentError),
}

impl From<RenderFailure> for TaskError {
    fn from(failure: RenderFailure) -> Self {
        match failure {
            RenderFailure::Refused(DomainError::ItemBusy(item)) => TaskError::Busy(item),
            RenderFailure::Refused(err) => TaskError::Failed(err.to_string()),
            RenderFailure::Stale { item } => TaskError::Stale(item),
            RenderFailure::Roster(err) => TaskError::Failed(err.to_string()),
            RenderFailure::Remote(err) => TaskError::Remote(err.to_string()),
        }
    }
}

impl From<RenderFailure> for AppError {
    fn from(failure: RenderFailure) -> Self {
        match failure {
            RenderFailure::Refused(err) => AppError::Domain(err),
            RenderFailure::Stale { item } => AppError::InvalidState(format!(
                "storyboard was replaced while {item} was rendering"
            )),
            RenderFailure::Roster(err) => err,
            RenderFailure::Remote(err) => AppError::Remote(err),
        }
    }
}

/// Run one attempt for the item at `index` of storyboard `revision`
pub(crate) async fn render_item(
    ctx: &RenderContext,
    index: usize,
    revision: u64,
    attempt: Attempt,
) -> Result<GeneratedImage, RenderFailure> {
    let (item_id, work) = {
        let mut board = write_board(&ctx.storyboard);
        let item_id = match board.item_id(index) {
            Some(id) if board.revision() == revision => id.to_string(),
            Some(id) => {
                return Err(RenderFailure::Stale {
                    item: id.to_string(),
                })
            }
            None => {
                return Err(RenderFailure::Refused(DomainError::ItemOutOfRange {
                    index,
                    len: board.len(),
                }))
            }
        };
        let work = board.work(index).map_err(RenderFailure::Refused)?;
        let state = board
            .item_state_mut(index)
            .map_err(RenderFailure::Refused)?;
        match attempt {
            Attempt::Batch(ticket) => {
                if !state
                    .begin_queued(&item_id, ticket)
                    .map_err(RenderFailure::Refused)?
                {
                    debug!(item_id = %item_id, ticket, "Reservation withdrawn; task skipped");
                    return Err(RenderFailure::Stale { item: item_id });
                }
            }
            Attempt::Manual => state.begin(&item_id).map_err(RenderFailure::Refused)?,
            Attempt::Regenerate => {
                state.begin(&item_id).map_err(RenderFailure::Refused)?;
                state.clear_image();
            }
        }
        (item_id, work)
    };

    debug!(item_id = %item_id, revision, "Rendering item");
    let result = request_image(ctx, work).await;

    let mut board = write_board(&ctx.storyboard);
    if board.revision() != revision {
        warn!(item_id = %item_id, "Storyboard replaced during render; result dropped");
        return Err(RenderFailure::Stale { item: item_id });
    }
    let state = board
        .item_state_mut(index)
        .map_err(RenderFailure::Refused)?;

    match result {
        Ok(image) => {
            state.succeed(image.clone());
            debug!(item_id = %item_id, url = %image.image_url, "Item rendered");
            Ok(image)
        }
        Err(failure) => {
            let message = match &failure {
                RenderFailure::Remote(err) => err.to_string(),
                RenderFailure::Roster(err) => err.to_string(),
                other => format!("{other:?}"),
            };
            state.fail(message.clone());
            warn!(item_id = %item_id, error = %message, "Item render failed");
            Err(failure)
        }
    }
}

async fn request_image(
    ctx: &RenderContext,
    work: ItemWork,
) -> Result<GeneratedImage, RenderFailure> {
    let roster = ctx.roster.list_all().await.map_err(RenderFailure::Roster)?;
    let references = resolve_references(&roster, &work.character_names());

    let image = match work {
        ItemWork::Panel { scene } => {
            ctx.content
                .render_panel(PanelRequest {
                    scene,
                    references,
                    style: ctx.style,
                    options: ImageOptions::standard(),
                    api_key: ctx.api_key.clone(),
                })
                .await
        }
        ItemWork::Page {
            page_number,
            title,
            scenes,
        } => {
            ctx.content
                .render_page(PageRequest {
                    page_number,
                    title,
                    scenes,
                    references,
                    style: ctx.style,
                    options: ImageOptions::hd(),
                    api_key: ctx.api_key.clone(),
                })
                .await
        }
    };
    image.map_err(RenderFailure::Remote)
}
