use crossterm::event::KeyCode;

use crate::app::App;

/// Applies one key press. Returns `false` when the user asked to quit.
pub fn handle_key(key: KeyCode, app: &mut App) -> bool {
    match key {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1),
        KeyCode::PageDown | KeyCode::Char(' ') => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Home | KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::End | KeyCode::Char('G') => app.scroll_to_bottom(),
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with;
    use crate::page::Page;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn keys_scroll_and_quit() {
        let t0 = Instant::now();
        let mut app = app_with(Page::empire(2026), 10, t0);
        app.tick(t0 + Duration::from_millis(800));

        assert!(handle_key(KeyCode::Char('j'), &mut app));
        assert_eq!(app.viewport.offset(), 1);
        assert!(handle_key(KeyCode::Up, &mut app));
        assert_eq!(app.viewport.offset(), 0);
        assert!(handle_key(KeyCode::Up, &mut app));
        assert_eq!(app.viewport.offset(), 0);

        handle_key(KeyCode::PageDown, &mut app);
        assert_eq!(app.viewport.offset(), 9);
        handle_key(KeyCode::Char('G'), &mut app);
        assert_eq!(app.viewport.offset(), app.viewport.max_offset());
        handle_key(KeyCode::Home, &mut app);
        assert_eq!(app.viewport.offset(), 0);

        assert!(handle_key(KeyCode::Char('x'), &mut app));
        assert!(!handle_key(KeyCode::Char('q'), &mut app));
        assert!(!handle_key(KeyCode::Esc, &mut app));
    }
}
