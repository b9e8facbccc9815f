//! The Empire page as data.
//!
//! A page is a column of blocks. Each block is one reveal target; inside a
//! staggered block every item with a stagger index is a child target of its
//! own. Target ids are handed out in document order so the viewport reports
//! them top to bottom.

use crate::models::{CellId, TargetId};
use crate::reveal::RevealTarget;
use crate::utils::wrapped_rows;
use crate::viewport::RowSpan;

pub const PHONE: &str = "097181 20614";
pub const MAP_URL: &str = "https://www.google.com/maps/search/Empire+Strength+Fitness+Nangloi+Delhi/";
pub const NAV_LINKS: [&str; 3] = ["PHILOSOPHY", "SERVICES", "CONNECT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Eyebrow,
    Display,
    Accent,
    Prose,
    Muted,
    Stat,
    Phone,
    Link,
    Cta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text { text: String, tone: Tone },
    Image { prompt: String, rows: usize, cell: Option<CellId> },
    Gap,
}

impl Body {
    fn rows(&self, width: usize) -> usize {
        match self {
            Body::Text { text, .. } => wrapped_rows(text, width),
            Body::Image { rows, .. } => *rows,
            Body::Gap => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Own target when the item is a staggered child.
    pub target: Option<TargetId>,
    pub stagger: u8,
    pub body: Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Always,
    Simple,
    Staggered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: TargetId,
    pub reveal: Reveal,
    /// Entrance delay in stagger steps for the block itself.
    pub stagger: u8,
    pub centered: bool,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub span: RowSpan,
    pub items: Vec<RowSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub blocks: Vec<BlockLayout>,
    pub height: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn builder() -> PageBuilder {
        PageBuilder::default()
    }

    /// Hands every image on the page to `mount` and remembers the cell.
    pub fn mount_media(&mut self, mut mount: impl FnMut(&str) -> CellId) {
        for item in self.blocks.iter_mut().flat_map(|b| b.items.iter_mut()) {
            if let Body::Image { prompt, cell, .. } = &mut item.body {
                if cell.is_none() {
                    *cell = Some(mount(prompt));
                }
            }
        }
    }

    pub fn media(&self) -> Vec<CellId> {
        self.blocks
            .iter()
            .flat_map(|b| b.items.iter())
            .filter_map(|item| match item.body {
                Body::Image { cell, .. } => cell,
                _ => None,
            })
            .collect()
    }

    pub fn reveal_targets(&self) -> Vec<RevealTarget> {
        self.blocks
            .iter()
            .filter_map(|block| match block.reveal {
                Reveal::Always => None,
                Reveal::Simple => Some(RevealTarget::simple(block.id)),
                Reveal::Staggered => Some(RevealTarget::staggered(
                    block.id,
                    block.items.iter().filter_map(|i| i.target).collect(),
                )),
            })
            .collect()
    }

    /// Stacks blocks top to bottom with one blank row after each.
    pub fn layout(&self, width: usize) -> PageLayout {
        let mut row = 0;
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let top = row;
            let items = block
                .items
                .iter()
                .map(|item| {
                    let span = RowSpan::new(row, item.body.rows(width));
                    row = span.bottom();
                    span
                })
                .collect();
            blocks.push(BlockLayout { span: RowSpan::new(top, row - top), items });
            row += 1;
        }
        PageLayout { blocks, height: row }
    }
}

impl PageLayout {
    /// Row spans of every block and every staggered child.
    pub fn spans<'a>(&'a self, page: &'a Page) -> impl Iterator<Item = (TargetId, RowSpan)> + 'a {
        page.blocks.iter().zip(&self.blocks).flat_map(|(block, layout)| {
            std::iter::once((block.id, layout.span)).chain(
                block
                    .items
                    .iter()
                    .zip(&layout.items)
                    .filter_map(|(item, span)| item.target.map(|id| (id, *span))),
            )
        })
    }
}

#[derive(Debug, Default)]
pub struct PageBuilder {
    next: usize,
    blocks: Vec<Block>,
}

impl PageBuilder {
    fn id(&mut self) -> TargetId {
        let id = TargetId(self.next);
        self.next += 1;
        id
    }

    /// Adds a block. Items are `(stagger, body)`; in a staggered block every
    /// item with a non-zero stagger becomes a child target.
    pub fn block(mut self, reveal: Reveal, stagger: u8, centered: bool, items: Vec<(u8, Body)>) -> Self {
        let id = self.id();
        let items = items
            .into_iter()
            .map(|(delay, body)| {
                let target = (reveal == Reveal::Staggered && delay > 0).then(|| self.id());
                Item { target, stagger: delay, body }
            })
            .collect();
        self.blocks.push(Block { id, reveal, stagger, centered, items });
        self
    }

    pub fn build(self) -> Page {
        Page { blocks: self.blocks }
    }
}

pub fn text(tone: Tone, text: impl Into<String>) -> Body {
    Body::Text { text: text.into(), tone }
}

pub fn image(prompt: &str, rows: usize) -> Body {
    Body::Image { prompt: prompt.to_string(), rows, cell: None }
}

impl Page {
    pub fn empire(year: i32) -> Page {
        use Tone::*;

        let services = [
            ("IMPORTED MACHINERY", "Top-tier biomechanically optimized equipment."),
            ("ELITE HIIT ZONE", "Dedicated high-intensity tactical training area."),
            ("CARDIO LOFT", "Expansive range of modern trainers."),
            ("PERSONAL PREP", "1-on-1 body transformation coaching."),
            ("GROUP SYNERGY", "Zumba, Yoga, and Aerobics."),
            ("NUTRITION LAB", "Customized meal planning."),
        ];

        let mut page = Page::builder()
            // home
            .block(Reveal::Always, 0, false, vec![(0, image("Luxury gym interior", 12))])
            .block(
                Reveal::Staggered,
                1,
                true,
                vec![
                    (0, text(Eyebrow, "● 6000 SQ FT ELITE FACILITY")),
                    (0, Body::Gap),
                    (2, text(Display, "BUILT")),
                    (2, text(Accent, "BEYOND")),
                    (3, text(Prose, "Imported machinery, elite discipline, and total transformation.")),
                    (0, Body::Gap),
                    (4, text(Cta, format!("CLAIM YOUR SPOT →  {PHONE}"))),
                ],
            )
            // about
            .block(
                Reveal::Staggered,
                0,
                false,
                vec![
                    (1, image("Gym weights rack", 8)),
                    (2, text(Stat, "6K")),
                    (2, text(Muted, "SQUARE FEET OF PURE IRON")),
                    (3, text(Stat, "15+")),
                    (3, text(Muted, "PRO CERTIFIED STAFF")),
                    (4, image("Athlete training", 8)),
                ],
            )
            .block(
                Reveal::Staggered,
                0,
                false,
                vec![
                    (1, text(Eyebrow, "PHILOSOPHY")),
                    (2, text(Display, "NOT JUST A")),
                    (2, text(Accent, "WORKOUT")),
                    (3, text(Prose, "Sanctuary for those who respect the grind. Elite imported equipment.")),
                    (0, text(Link, "START YOUR EVOLUTION →")),
                ],
            )
            // services
            .block(Reveal::Simple, 0, true, vec![(0, text(Eyebrow, "ARSENAL")), (0, text(Display, "PRO AMENITIES"))]);

        for (i, (title, desc)) in services.into_iter().enumerate() {
            let stagger = (i % 3) as u8 + 1;
            page = page.block(Reveal::Simple, stagger, false, vec![(0, text(Accent, title)), (0, text(Muted, desc))]);
        }

        page
            // contact
            .block(Reveal::Simple, 0, false, vec![(0, text(Eyebrow, "CONNECT")), (0, text(Display, "GET IN THE RING"))])
            .block(
                Reveal::Staggered,
                0,
                false,
                vec![
                    (1, text(Accent, "LOCATION")),
                    (1, text(Prose, "Nangloi Extension, Delhi, 110041")),
                    (1, text(Link, MAP_URL)),
                    (0, Body::Gap),
                    (2, text(Accent, "PHONE")),
                    (2, text(Phone, PHONE)),
                ],
            )
            .block(Reveal::Simple, 0, false, vec![(0, image("Abstract city map", 10))])
            .block(Reveal::Always, 0, true, vec![(0, text(Muted, format!("© {year} EMPIRE FITNESS NANGLOI")))])
            .build()
    }
}
