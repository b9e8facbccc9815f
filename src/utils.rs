use anyhow::Result;
use ratatui::layout::Rect;

/// Rows taken by the navigation bar above the page.
pub const NAV_HEIGHT: u16 = 2;
/// Rows taken by the key hints below the page.
pub const HINT_HEIGHT: u16 = 1;

/// Area the scrolling page gets inside a terminal of the given size.
pub fn page_area(screen: Rect) -> Rect {
    Rect {
        x: screen.x,
        y: screen.y + NAV_HEIGHT.min(screen.height),
        width: screen.width,
        height: screen.height.saturating_sub(NAV_HEIGHT + HINT_HEIGHT),
    }
}

pub fn current_page_area() -> Result<Rect> {
    let (cols, rows) = crossterm::terminal::size()?;
    Ok(page_area(Rect::new(0, 0, cols, rows)))
}

pub fn calculate_max_scroll(content_rows: usize, view_rows: usize) -> usize {
    content_rows.saturating_sub(view_rows)
}

/// Rows needed to show `text` wrapped at `width` columns.
pub fn wrapped_rows(text: &str, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    let chars = text.chars().count();
    chars.div_ceil(width).max(1)
}

/// Splits `text` into chunks of at most `width` characters; always at least one.
pub fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_wrap_matches_row_count() {
        for text in ["", "short", "a somewhat longer line of marketing copy"] {
            assert_eq!(hard_wrap(text, 7).len(), wrapped_rows(text, 7));
        }
    }

    #[test]
    fn page_area_leaves_room_for_chrome() {
        let area = page_area(Rect::new(0, 0, 80, 24));
        assert_eq!(area, Rect::new(0, 2, 80, 21));
        assert_eq!(page_area(Rect::new(0, 0, 80, 1)).height, 0);
    }

    #[test]
    fn max_scroll_never_underflows() {
        assert_eq!(calculate_max_scroll(10, 40), 0);
        assert_eq!(calculate_max_scroll(100, 40), 60);
    }

    #[test]
    fn wraps_by_char_count() {
        assert_eq!(wrapped_rows("", 10), 1);
        assert_eq!(wrapped_rows("0123456789", 10), 1);
        assert_eq!(wrapped_rows("0123456789a", 10), 2);
        assert_eq!(wrapped_rows("anything", 0), 1);
    }
}
