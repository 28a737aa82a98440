//! Storyboard: per-item generation state owned by the orchestrator.
//!
//! Every panel or page carries an [`ItemState`]. The only way to start work
//! on an item is [`ItemState::begin`], which refuses a second concurrent
//! attempt; that refusal is what keeps one in-flight task per item.

use crate::domain::{DomainError, GeneratedImage, LayoutMode, PageDraft, Scene};
use serde::{Deserialize, Serialize};

/// Coarse phase of an item, derived from its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPhase {
    Empty,
    Ready,
    Failed,
}

/// Mutable generation state of one panel or page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    pub image: Option<GeneratedImage>,
    pub error: Option<String>,
    pub generating: bool,
    /// Batch ticket of a task waiting in the queue for this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued: Option<u64>,
}

impl ItemState {
    /// An error wins over a stale image kept from an earlier success
    pub fn phase(&self) -> ItemPhase {
        match (&self.error, &self.image) {
            (Some(_), _) => ItemPhase::Failed,
            (None, Some(_)) => ItemPhase::Ready,
            (None, None) => ItemPhase::Empty,
        }
    }

    /// Generating, or waiting in the queue
    pub fn is_busy(&self) -> bool {
        self.generating || self.queued.is_some()
    }

    /// Start a manual attempt. Fails if one is in flight or queued.
    pub fn begin(&mut self, item_id: &str) -> Result<(), DomainError> {
        if self.is_busy() {
            return Err(DomainError::ItemBusy(item_id.to_string()));
        }
        self.generating = true;
        self.error = None;
        Ok(())
    }

    /// Reserve the item for a queued task of batch `ticket`
    pub fn enqueue(&mut self, item_id: &str, ticket: u64) -> Result<(), DomainError> {
        if self.is_busy() {
            return Err(DomainError::ItemBusy(item_id.to_string()));
        }
        self.queued = Some(ticket);
        Ok(())
    }

    /// Turn the reservation of batch `ticket` into a running attempt.
    ///
    /// Returns `Ok(false)` when the reservation was withdrawn or belongs to
    /// another batch; the state is left untouched in that case.
    pub fn begin_queued(&mut self, item_id: &str, ticket: u64) -> Result<bool, DomainError> {
        if self.queued != Some(ticket) {
            return Ok(false);
        }
        if self.generating {
            return Err(DomainError::ItemBusy(item_id.to_string()));
        }
        self.queued = None;
        self.generating = true;
        self.error = None;
        Ok(true)
    }

    /// Drop a queue reservation whose task will never run
    pub fn withdraw(&mut self) {
        self.queued = None;
    }

    pub fn succeed(&mut self, image: GeneratedImage) {
        self.image = Some(image);
        self.error = None;
        self.generating = false;
    }

    /// Record a failure; a previous image is left in place
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.generating = false;
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.image_url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub id: String,
    pub panel_number: u32,
    pub scene: Scene,
    pub image_prompt: String,
    pub state: ItemState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub page_number: u32,
    pub title: String,
    pub scenes: Vec<Scene>,
    pub state: ItemState,
}

impl Page {
    /// Title shown to the prompt builder; falls back to the page number
    pub fn display_title(&self) -> String {
        if self.title.trim().is_empty() {
            format!("Page {}", self.page_number)
        } else {
            self.title.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "items", rename_all = "snake_case")]
pub enum StoryboardContent {
    #[default]
    Empty,
    Panels(Vec<Panel>),
    Pages(Vec<Page>),
}

/// Snapshot of what a task needs to render one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemWork {
    Panel {
        scene: Scene,
    },
    Page {
        page_number: u32,
        title: String,
        scenes: Vec<Scene>,
    },
}

impl ItemWork {
    /// Declared character names, deduplicated in first-appearance order
    pub fn character_names(&self) -> Vec<String> {
        match self {
            ItemWork::Panel { scene } => crate::domain::scene::collect_characters([scene]),
            ItemWork::Page { scenes, .. } => crate::domain::scene::collect_characters(scenes),
        }
    }
}

/// The analysed story, one item per panel or page.
///
/// `revision` increases each time a new analysis is installed so that a task
/// started against an older storyboard never writes into a newer one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storyboard {
    revision: u64,
    content: StoryboardContent,
}

impl Storyboard {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn content(&self) -> &StoryboardContent {
        &self.content
    }

    pub fn mode(&self) -> Option<LayoutMode> {
        match self.content {
            StoryboardContent::Empty => None,
            StoryboardContent::Panels(_) => Some(LayoutMode::SinglePanel),
            StoryboardContent::Pages(_) => Some(LayoutMode::MultiPanel),
        }
    }

    pub fn len(&self) -> usize {
        match &self.content {
            StoryboardContent::Empty => 0,
            StoryboardContent::Panels(panels) => panels.len(),
            StoryboardContent::Pages(pages) => pages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn panels(&self) -> &[Panel] {
        match &self.content {
            StoryboardContent::Panels(panels) => panels,
            _ => &[],
        }
    }

    pub fn pages(&self) -> &[Page] {
        match &self.content {
            StoryboardContent::Pages(pages) => pages,
            _ => &[],
        }
    }

    /// Replace the content with one panel per scene
    pub fn install_panels(&mut self, scenes: Vec<Scene>) {
        let panels = scenes
            .into_iter()
            .enumerate()
            .map(|(index, scene)| Panel {
                id: format!("panel-{}", index + 1),
                panel_number: index as u32 + 1,
                image_prompt: scene.description.clone(),
                scene,
                state: ItemState::default(),
            })
            .collect();
        self.replace(StoryboardContent::Panels(panels));
    }

    /// Replace the content with one page per analysed page
    pub fn install_pages(&mut self, drafts: Vec<PageDraft>) {
        let pages = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| Page {
                id: format!("page-{}", index + 1),
                page_number: index as u32 + 1,
                title: draft.title,
                scenes: draft.scenes,
                state: ItemState::default(),
            })
            .collect();
        self.replace(StoryboardContent::Pages(pages));
    }

    pub fn clear(&mut self) {
        self.replace(StoryboardContent::Empty);
    }

    fn replace(&mut self, content: StoryboardContent) {
        self.revision += 1;
        self.content = content;
    }

    /// Withdraw every queue reservation, returning how many were held
    pub fn withdraw_all(&mut self) -> usize {
        let states: Vec<&mut ItemState> = match &mut self.content {
            StoryboardContent::Empty => Vec::new(),
            StoryboardContent::Panels(panels) => panels.iter_mut().map(|p| &mut p.state).collect(),
            StoryboardContent::Pages(pages) => pages.iter_mut().map(|p| &mut p.state).collect(),
        };
        let mut withdrawn = 0;
        for state in states {
            if state.queued.is_some() {
                state.withdraw();
                withdrawn += 1;
            }
        }
        withdrawn
    }

    /// Queue task id for an item ("panel-<i>" / "page-<i>", 0-based index)
    pub fn task_id(&self, index: usize) -> Option<String> {
        match self.mode()? {
            LayoutMode::SinglePanel => Some(format!("panel-{index}")),
            LayoutMode::MultiPanel => Some(format!("page-{index}")),
        }
    }

    pub fn item_id(&self, index: usize) -> Option<&str> {
        match &self.content {
            StoryboardContent::Empty => None,
            StoryboardContent::Panels(panels) => panels.get(index).map(|p| p.id.as_str()),
            StoryboardContent::Pages(pages) => pages.get(index).map(|p| p.id.as_str()),
        }
    }

    pub fn item_state(&self, index: usize) -> Option<&ItemState> {
        match &self.content {
            StoryboardContent::Empty => None,
            StoryboardContent::Panels(panels) => panels.get(index).map(|p| &p.state),
            StoryboardContent::Pages(pages) => pages.get(index).map(|p| &p.state),
        }
    }

    pub fn item_state_mut(&mut self, index: usize) -> Result<&mut ItemState, DomainError> {
        let len = self.len();
        let state = match &mut self.content {
            StoryboardContent::Empty => None,
            StoryboardContent::Panels(panels) => panels.get_mut(index).map(|p| &mut p.state),
            StoryboardContent::Pages(pages) => pages.get_mut(index).map(|p| &mut p.state),
        };
        state.ok_or(DomainError::ItemOutOfRange { index, len })
    }

    /// Clone what a task needs to render the item
    pub fn work(&self, index: usize) -> Result<ItemWork, DomainError> {
        let len = self.len();
        let work = match &self.content {
            StoryboardContent::Empty => None,
            StoryboardContent::Panels(panels) => panels.get(index).map(|panel| ItemWork::Panel {
                scene: panel.scene.clone(),
            }),
            StoryboardContent::Pages(pages) => pages.get(index).map(|page| ItemWork::Page {
                page_number: page.page_number,
                title: page.display_title(),
                scenes: page.scenes.clone(),
            }),
        };
        work.ok_or(DomainError::ItemOutOfRange { index, len })
    }

    /// Replace the scene behind a panel and refresh its prompt
    pub fn replace_scene(&mut self, index: usize, scene: Scene) -> Result<(), DomainError> {
        let len = self.len();
        let found = match self.mode() {
            Some(LayoutMode::MultiPanel) => LayoutMode::MultiPanel.to_string(),
            None => "empty".to_string(),
            Some(LayoutMode::SinglePanel) => String::new(),
        };
        let StoryboardContent::Panels(panels) = &mut self.content else {
            return Err(DomainError::ModeMismatch {
                expected: LayoutMode::SinglePanel.to_string(),
                found,
            });
        };
        let panel = panels
            .get_mut(index)
            .ok_or(DomainError::ItemOutOfRange { index, len })?;
        if panel.state.generating {
            return Err(DomainError::ItemBusy(panel.id.clone()));
        }
        panel.image_prompt = scene.description.clone();
        panel.scene = Scene {
            id: panel.scene.id.clone(),
            ..scene
        };
        Ok(())
    }
}
