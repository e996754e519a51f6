use std::fmt::Display;

use console::{style, StyledObject};

/// Dashboard text roles. Colour choices live here only.
fn styled(text: impl Display) -> StyledObject<String> {
    style(text.to_string())
}

/// Section titles and release names.
pub fn heading(text: impl Display) -> StyledObject<String> {
    styled(text).bright()
}

/// Organization, project and definition names.
pub fn scope(text: impl Display) -> StyledObject<String> {
    styled(text).cyan()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    styled(text).dim()
}

pub fn notice(text: impl Display) -> StyledObject<String> {
    styled(text).bright().yellow()
}

pub fn success(text: impl Display) -> StyledObject<String> {
    styled(text).bright().green()
}

pub fn failure(text: impl Display) -> StyledObject<String> {
    styled(text).bright().red()
}

pub fn brand(text: impl Display) -> StyledObject<String> {
    styled(text).magenta().bold()
}
