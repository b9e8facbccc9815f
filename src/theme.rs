use ratatui::style::{Color, Modifier, Style};

use crate::page::Tone;

pub struct Theme {
    pub root_bg: Color,
    pub primary: Color,
    pub muted: Color,
    pub frame_bg: Color,

    // Specific components
    pub eyebrow: Style,
    pub display: Style,
    pub accent: Style,
    pub prose: Style,
    pub stat: Style,
    pub phone: Style,
    pub link: Style,
    pub cta: Style,
    pub nav_brand: Style,
    pub nav_link: Style,
    pub nav_cta: Style,
    pub nav_rule: Style,
    pub placeholder: Style,
    pub spinner: Style,
    pub footer: Style,
    pub splash: Style,
}

impl Default for Theme {
    fn default() -> Self {
        let gold = Color::Rgb(212, 175, 55);
        Self {
            root_bg: Color::Rgb(9, 9, 11),
            primary: gold,
            muted: Color::Rgb(82, 82, 91),
            frame_bg: Color::Rgb(24, 24, 27),

            eyebrow: Style::default().fg(gold).add_modifier(Modifier::BOLD),
            display: Style::default().fg(Color::White).add_modifier(Modifier::BOLD | Modifier::ITALIC),
            accent: Style::default().fg(gold).add_modifier(Modifier::BOLD | Modifier::ITALIC),
            prose: Style::default().fg(Color::Rgb(161, 161, 170)),
            stat: Style::default().fg(gold).add_modifier(Modifier::BOLD | Modifier::ITALIC),
            phone: Style::default().fg(gold).add_modifier(Modifier::BOLD),
            link: Style::default().fg(gold).add_modifier(Modifier::UNDERLINED),
            cta: Style::default().fg(Color::Black).bg(gold).add_modifier(Modifier::BOLD),
            nav_brand: Style::default().fg(Color::White).add_modifier(Modifier::BOLD | Modifier::ITALIC),
            nav_link: Style::default().fg(Color::Rgb(161, 161, 170)).add_modifier(Modifier::BOLD),
            nav_cta: Style::default().fg(Color::Black).bg(gold).add_modifier(Modifier::BOLD),
            nav_rule: Style::default().fg(Color::Rgb(63, 63, 70)),
            placeholder: Style::default().fg(Color::Rgb(63, 63, 70)).add_modifier(Modifier::BOLD),
            spinner: Style::default().fg(gold),
            footer: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            splash: Style::default().fg(gold).add_modifier(Modifier::BOLD),
        }
    }
}

impl Theme {
    pub fn tone(&self, tone: Tone) -> Style {
        match tone {
            Tone::Eyebrow => self.eyebrow,
            Tone::Display => self.display,
            Tone::Accent => self.accent,
            Tone::Prose => self.prose,
            Tone::Muted => Style::default().fg(self.muted).add_modifier(Modifier::BOLD),
            Tone::Stat => self.stat,
            Tone::Phone => self.phone,
            Tone::Link => self.link,
            Tone::Cta => self.cta,
        }
    }
}
