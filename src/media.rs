//! On-demand images: one request per prompt, applied only while the cell is mounted.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::models::{CellId, DEFAULT_IMAGE_MIME, ImagePayload, MediaStatus};
use crate::network::{Generator, Part};
use crate::prompts::styled_prompt;

pub const OFFLINE_LABEL: &str = "MEDIA OFFLINE";

/// Result of one generation request, addressed to the cell that issued it.
#[derive(Debug)]
pub struct Completion {
    pub cell: CellId,
    pub request: u64,
    pub outcome: Result<Vec<Part>, GenerationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    Stale,
}

/// What the renderer should draw for a cell.
#[derive(Debug, PartialEq, Eq)]
pub enum MediaView<'a> {
    Busy,
    Image(&'a ImagePayload),
    Offline,
}

/// Everything a cell needs to issue requests.
#[derive(Clone)]
pub struct RequestContext {
    generator: Arc<dyn Generator>,
    completions: UnboundedSender<Completion>,
    runtime: Handle,
    timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new(
        generator: Arc<dyn Generator>,
        completions: UnboundedSender<Completion>,
        runtime: Handle,
        timeout: Option<Duration>,
    ) -> Self {
        Self { generator, completions, runtime, timeout }
    }
}

pub struct MediaFetchCell {
    id: CellId,
    prompt: String,
    status: MediaStatus,
    request: u64,
    alive: bool,
    cancel: CancellationToken,
    ctx: RequestContext,
}

impl MediaFetchCell {
    /// Creates the cell in `Pending` and issues its request.
    pub fn create(id: CellId, prompt: &str, ctx: RequestContext) -> Self {
        let mut cell = Self {
            id,
            prompt: prompt.to_string(),
            status: MediaStatus::Pending,
            request: 0,
            alive: true,
            cancel: CancellationToken::new(),
            ctx,
        };
        cell.issue();
        cell
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> &MediaStatus {
        &self.status
    }

    pub fn payload(&self) -> Option<&ImagePayload> {
        match &self.status {
            MediaStatus::Ready(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn view(&self) -> MediaView<'_> {
        match &self.status {
            MediaStatus::Pending => MediaView::Busy,
            MediaStatus::Ready(payload) => MediaView::Image(payload),
            MediaStatus::Failed => MediaView::Offline,
        }
    }

    /// Points the cell at a new prompt. The old request's result, if it ever
    /// arrives, is discarded. Re-setting the same prompt does nothing.
    #[cfg(test)]
    pub fn set_prompt(&mut self, prompt: &str) {
        if !self.alive || self.prompt == prompt {
            return;
        }
        tracing::debug!(cell = %self.id, from = %self.prompt, to = prompt, "prompt changed");
        self.prompt = prompt.to_string();
        self.issue();
    }

    /// Stops listening for the in-flight result. Idempotent.
    pub fn teardown(&mut self) {
        if self.alive {
            tracing::trace!(cell = %self.id, "teardown");
        }
        self.alive = false;
        self.cancel.cancel();
    }

    pub fn apply(&mut self, completion: Completion) -> Applied {
        if !self.alive
            || completion.cell != self.id
            || completion.request != self.request
            || !self.status.is_pending()
        {
            tracing::trace!(cell = %completion.cell, request = completion.request, "stale response ignored");
            return Applied::Stale;
        }

        self.status = match completion.outcome {
            Ok(parts) => match first_inline_image(&parts) {
                Some(payload) => {
                    tracing::info!(cell = %self.id, prompt = %self.prompt, bytes = payload.data.len(), "image ready");
                    MediaStatus::Ready(payload)
                }
                None => {
                    tracing::warn!(cell = %self.id, prompt = %self.prompt, error = %GenerationError::NoImageData, "image generation failed");
                    MediaStatus::Failed
                }
            },
            Err(err) => {
                tracing::warn!(cell = %self.id, prompt = %self.prompt, error = %err, "image generation failed");
                MediaStatus::Failed
            }
        };
        Applied::Updated
    }

    fn issue(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.request += 1;
        self.status = MediaStatus::Pending;

        let token = self.cancel.clone();
        let generator = Arc::clone(&self.ctx.generator);
        let completions = self.ctx.completions.clone();
        let timeout = self.ctx.timeout;
        let prompt = styled_prompt(&self.prompt);
        let (cell, request) = (self.id, self.request);

        self.ctx.runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                outcome = request_image(generator.as_ref(), &prompt, timeout) => outcome,
            };
            // Receiver is gone once the board is dropped at shutdown.
            let _ = completions.send(Completion { cell, request, outcome });
        });
    }
}

impl Drop for MediaFetchCell {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn request_image(
    generator: &dyn Generator,
    prompt: &str,
    timeout: Option<Duration>,
) -> Result<Vec<Part>, GenerationError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, generator.generate(prompt))
            .await
            .map_err(|_| GenerationError::TimedOut(limit))?,
        None => generator.generate(prompt).await,
    }
}

/// The first part carrying inline image data, in response order.
pub fn first_inline_image(parts: &[Part]) -> Option<ImagePayload> {
    parts.iter().find_map(|part| {
        part.inline_data.as_ref().map(|inline| ImagePayload {
            mime_type: inline
                .mime_type
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
            data: inline.data.clone(),
        })
    })
}

/// Owns the mounted cells and routes completions to them.
pub struct MediaBoard {
    cells: BTreeMap<CellId, MediaFetchCell>,
    next_id: usize,
    ctx: RequestContext,
    completions: UnboundedReceiver<Completion>,
}

impl MediaBoard {
    pub fn new(generator: Arc<dyn Generator>, runtime: Handle, timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cells: BTreeMap::new(),
            next_id: 0,
            ctx: RequestContext::new(generator, tx, runtime, timeout),
            completions: rx,
        }
    }

    pub fn mount(&mut self, prompt: &str) -> CellId {
        let id = CellId(self.next_id);
        self.next_id += 1;
        self.cells.insert(id, MediaFetchCell::create(id, prompt, self.ctx.clone()));
        id
    }

    pub fn unmount(&mut self, id: CellId) -> bool {
        match self.cells.remove(&id) {
            Some(mut cell) => {
                cell.teardown();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn retarget(&mut self, id: CellId, prompt: &str) {
        if let Some(cell) = self.cells.get_mut(&id) {
            cell.set_prompt(prompt);
        }
    }

    pub fn runtime(&self) -> &Handle {
        &self.ctx.runtime
    }

    pub fn cell(&self, id: CellId) -> Option<&MediaFetchCell> {
        self.cells.get(&id)
    }

    pub fn pending(&self) -> usize {
        self.cells.values().filter(|c| c.status().is_pending()).count()
    }

    /// Applies every completion that has arrived; never blocks.
    /// Returns how many cells changed state.
    pub fn pump(&mut self) -> usize {
        let mut updated = 0;
        while let Ok(completion) = self.completions.try_recv() {
            if self.route(completion) == Applied::Updated {
                updated += 1;
            }
        }
        updated
    }

    fn route(&mut self, completion: Completion) -> Applied {
        match self.cells.get_mut(&completion.cell) {
            Some(cell) => cell.apply(completion),
            None => {
                tracing::trace!(cell = %completion.cell, "response for unmounted cell ignored");
                Applied::Stale
            }
        }
    }
}
