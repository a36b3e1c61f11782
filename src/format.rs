// Format command dispatch
// Parses command name/value pairs into FormatCommand and applies them to the
// current selection. Every dispatch ends with a history capture.

use std::sync::LazyLock;

use regex::Regex;

use crate::content::EditableSurface;
use crate::richtext::markup::legacy_font_size_to_points;
use crate::richtext::structured_document::Alignment;
use crate::richtext::structured_editor::{EditError, StructuredEditor};
use crate::sync::ContentSync;

static HEX_COLOR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").ok());
static POINT_SIZE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})\s*pt$").ok());

/// Largest font size accepted, in points
const MAX_FONT_POINTS: u16 = 400;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatCommandError {
    #[error("unsupported format command: {0}")]
    Unsupported(String),
    #[error("{command} needs a value")]
    MissingValue { command: &'static str },
    #[error("invalid value for {command}: {value:?}")]
    InvalidValue { command: &'static str, value: String },
    #[error("format command rejected: {0}")]
    Rejected(#[from] EditError),
}

/// A validated formatting intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Align(Alignment),
    List { ordered: bool },
    FontName(String),
    /// Size in points
    FontSize(u16),
    /// `#rrggbb`
    ForeColor(String),
    /// `#rrggbb`
    Highlight(String),
    CreateLink(String),
    Unlink,
    RemoveFormat,
}

impl FormatCommand {
    /// Parse a command name (case-insensitive) and its optional value
    pub fn parse(name: &str, value: Option<&str>) -> Result<Self, FormatCommandError> {
        let command = match name.to_ascii_lowercase().as_str() {
            "bold" => FormatCommand::Bold,
            "italic" => FormatCommand::Italic,
            "underline" => FormatCommand::Underline,
            "strikethrough" => FormatCommand::Strikethrough,
            "justifyleft" => FormatCommand::Align(Alignment::Left),
            "justifycenter" => FormatCommand::Align(Alignment::Center),
            "justifyright" => FormatCommand::Align(Alignment::Right),
            "justifyfull" => FormatCommand::Align(Alignment::Justify),
            "insertorderedlist" => FormatCommand::List { ordered: true },
            "insertunorderedlist" => FormatCommand::List { ordered: false },
            "fontname" => {
                let value = required("fontName", value)?;
                FormatCommand::FontName(parse_font_name(value)?)
            }
            "fontsize" => {
                let value = required("fontSize", value)?;
                FormatCommand::FontSize(parse_font_size(value)?)
            }
            "forecolor" => {
                let value = required("foreColor", value)?;
                FormatCommand::ForeColor(parse_color("foreColor", value)?)
            }
            "hilitecolor" | "backcolor" => {
                let value = required("hiliteColor", value)?;
                FormatCommand::Highlight(parse_color("hiliteColor", value)?)
            }
            "createlink" => {
                let value = required("createLink", value)?;
                FormatCommand::CreateLink(parse_link(value)?)
            }
            "unlink" => FormatCommand::Unlink,
            "removeformat" => FormatCommand::RemoveFormat,
            _ => return Err(FormatCommandError::Unsupported(name.to_string())),
        };
        Ok(command)
    }

    /// Canonical command name
    pub fn name(&self) -> &'static str {
        match self {
            FormatCommand::Bold => "bold",
            FormatCommand::Italic => "italic",
            FormatCommand::Underline => "underline",
            FormatCommand::Strikethrough => "strikeThrough",
            FormatCommand::Align(Alignment::Left) => "justifyLeft",
            FormatCommand::Align(Alignment::Center) => "justifyCenter",
            FormatCommand::Align(Alignment::Right) => "justifyRight",
            FormatCommand::Align(Alignment::Justify) => "justifyFull",
            FormatCommand::List { ordered: true } => "insertOrderedList",
            FormatCommand::List { ordered: false } => "insertUnorderedList",
            FormatCommand::FontName(_) => "fontName",
            FormatCommand::FontSize(_) => "fontSize",
            FormatCommand::ForeColor(_) => "foreColor",
            FormatCommand::Highlight(_) => "hiliteColor",
            FormatCommand::CreateLink(_) => "createLink",
            FormatCommand::Unlink => "unlink",
            FormatCommand::RemoveFormat => "removeFormat",
        }
    }

    /// Run the command against an editor's current selection
    pub fn apply(&self, editor: &mut StructuredEditor) -> Result<(), FormatCommandError> {
        match self {
            FormatCommand::Bold => editor.toggle_bold(),
            FormatCommand::Italic => editor.toggle_italic(),
            FormatCommand::Underline => editor.toggle_underline(),
            FormatCommand::Strikethrough => editor.toggle_strikethrough(),
            FormatCommand::Align(alignment) => editor.set_alignment(*alignment),
            FormatCommand::List { ordered } => editor.toggle_list(*ordered),
            FormatCommand::FontName(name) => editor.set_font_family(name),
            FormatCommand::FontSize(points) => editor.set_font_size(*points),
            FormatCommand::ForeColor(color) => editor.set_color(color),
            FormatCommand::Highlight(color) => editor.set_highlight(color),
            FormatCommand::CreateLink(url) => editor.set_link(url),
            FormatCommand::Unlink => editor.remove_link(),
            FormatCommand::RemoveFormat => editor.clear_formatting(),
        }?;
        Ok(())
    }
}

/// Parse and apply a command, then capture a snapshot.
/// Unsupported commands and bad values are ignored; the capture still runs.
/// Returns whether the capture recorded a new snapshot.
pub fn dispatch<S>(sync: &mut ContentSync, surface: &mut S, name: &str, value: Option<&str>) -> bool
where
    S: EditableSurface + ?Sized,
{
    let outcome =
        FormatCommand::parse(name, value).and_then(|command| surface.apply_format(&command));
    if let Err(err) = outcome {
        tracing::debug!(command = name, error = %err, "format command ignored");
    }
    sync.capture(surface)
}

fn required<'a>(
    command: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, FormatCommandError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(FormatCommandError::MissingValue { command }),
    }
}

fn invalid(command: &'static str, value: &str) -> FormatCommandError {
    FormatCommandError::InvalidValue {
        command,
        value: value.to_string(),
    }
}

fn parse_font_name(value: &str) -> Result<String, FormatCommandError> {
    let name = value.trim_matches(|c| c == '\'' || c == '"').trim();
    if name.is_empty() || name.contains([';', '"', '<', '>', '{', '}']) {
        return Err(invalid("fontName", value));
    }
    Ok(name.to_string())
}

/// Legacy 1..7 scale or an explicit `NNpt`
fn parse_font_size(value: &str) -> Result<u16, FormatCommandError> {
    if let Ok(legacy) = value.parse::<u8>() {
        if (1..=7).contains(&legacy) {
            return Ok(legacy_font_size_to_points(legacy));
        }
        return Err(invalid("fontSize", value));
    }
    let lower = value.to_ascii_lowercase();
    let points = POINT_SIZE
        .as_ref()
        .and_then(|re| re.captures(&lower))
        .and_then(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u16>().ok()));
    match points {
        Some(points) if (1..=MAX_FONT_POINTS).contains(&points) => Ok(points),
        _ => Err(invalid("fontSize", value)),
    }
}

/// Validate `#rgb` / `#rrggbb` and normalize to lower-case `#rrggbb`
fn parse_color(command: &'static str, value: &str) -> Result<String, FormatCommandError> {
    let valid = HEX_COLOR.as_ref().is_some_and(|re| re.is_match(value));
    if !valid {
        return Err(invalid(command, value));
    }
    let digits = value[1..].to_ascii_lowercase();
    if digits.len() == 3 {
        let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
        return Ok(format!("#{}", expanded));
    }
    Ok(format!("#{}", digits))
}

fn parse_link(value: &str) -> Result<String, FormatCommandError> {
    let url = value.trim();
    let scheme: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(11)
        .collect::<String>()
        .to_ascii_lowercase();
    if url.is_empty() || scheme.starts_with("javascript:") || scheme.starts_with("vbscript:") {
        return Err(invalid("createLink", value));
    }
    Ok(url.to_string())
}
