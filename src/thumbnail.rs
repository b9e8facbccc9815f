//! Half-block thumbnails: each terminal cell shows two stacked pixels through `▀`.

use std::collections::{HashMap, HashSet};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::RgbImage;
use image::imageops::{self, FilterType};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::{CellId, ImagePayload};

/// Decoded images are shrunk to fit this many pixels per side.
const MAX_SIDE: u32 = 256;

#[derive(Debug, PartialEq)]
pub enum Thumbnail {
    Decoding,
    Ready(Vec<Line<'static>>),
    Undecodable,
}

pub struct ThumbnailCache {
    runtime: Handle,
    requested: HashSet<CellId>,
    decoded: HashMap<CellId, Option<RgbImage>>,
    rendered: HashMap<CellId, ((u16, u16), Vec<Line<'static>>)>,
    done_tx: UnboundedSender<(CellId, Option<RgbImage>)>,
    done_rx: UnboundedReceiver<(CellId, Option<RgbImage>)>,
}

impl ThumbnailCache {
    pub fn new(runtime: Handle) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            requested: HashSet::new(),
            decoded: HashMap::new(),
            rendered: HashMap::new(),
            done_tx,
            done_rx,
        }
    }

    /// Starts decoding `payload` on the blocking pool. Only the first call per
    /// cell does anything.
    pub fn request(&mut self, id: CellId, payload: &ImagePayload) {
        if !self.requested.insert(id) {
            return;
        }
        let payload = payload.clone();
        let done = self.done_tx.clone();
        self.runtime.spawn_blocking(move || {
            let _ = done.send((id, decode(id, &payload)));
        });
    }

    /// Collects finished decodes; never blocks. Returns how many arrived.
    pub fn pump(&mut self) -> usize {
        let mut arrived = 0;
        while let Ok((id, image)) = self.done_rx.try_recv() {
            self.decoded.insert(id, image);
            arrived += 1;
        }
        arrived
    }

    /// The thumbnail of cell `id` at `width` x `rows` terminal cells. Scaling
    /// happens again only when the size changes.
    pub fn lines(&mut self, id: CellId, width: u16, rows: u16) -> Thumbnail {
        let image = match self.decoded.get(&id) {
            None => return Thumbnail::Decoding,
            Some(None) => return Thumbnail::Undecodable,
            Some(Some(image)) => image,
        };
        if width == 0 || rows == 0 {
            return Thumbnail::Ready(Vec::new());
        }
        if let Some((size, lines)) = self.rendered.get(&id) {
            if *size == (width, rows) {
                return Thumbnail::Ready(lines.clone());
            }
        }
        let lines = half_blocks(image, width, rows);
        self.rendered.insert(id, ((width, rows), lines.clone()));
        Thumbnail::Ready(lines)
    }
}

fn decode(id: CellId, payload: &ImagePayload) -> Option<RgbImage> {
    let bytes = match BASE64.decode(payload.data.as_bytes()) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(cell = %id, error = %err, "payload is not valid base64");
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(image) => Some(image.thumbnail(MAX_SIDE, MAX_SIDE).grayscale().to_rgb8()),
        Err(err) => {
            tracing::debug!(cell = %id, mime = %payload.mime_type, error = %err, "payload is not a decodable image");
            None
        }
    }
}

fn half_blocks(image: &RgbImage, width: u16, rows: u16) -> Vec<Line<'static>> {
    let scaled = imageops::resize(image, u32::from(width), u32::from(rows) * 2, FilterType::Triangle);
    (0..u32::from(rows))
        .map(|row| {
            let spans: Vec<Span<'static>> = (0..u32::from(width))
                .map(|x| {
                    let top = scaled.get_pixel(x, row * 2);
                    let bottom = scaled.get_pixel(x, row * 2 + 1);
                    Span::styled(
                        "▀",
                        Style::default()
                            .fg(Color::Rgb(top[0], top[1], top[2]))
                            .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}
