// Prompt strings sent to the image model.

pub const STYLE_PREFIX: &str = "High-end luxury fitness photography, dramatic lighting";

pub fn styled_prompt(subject: &str) -> String {
    format!("{STYLE_PREFIX}: {subject}")
}
