use std::borrow::Cow;

use rtf_parser::paragraph::Paragraph as RtfParagraph;
use rtf_parser::{Painter, RtfDocument};

use super::{Decoder, ImportDecodeError, SourceKind};
use crate::richtext::structured_document::{
    Block, InlineContent, StructuredDocument, TextRun, TextStyle,
};

const PARAGRAPH_BREAK_SENTINEL: char = '\u{001E}';
const PARAGRAPH_BREAK_ESCAPE: &str = "\\'1e";

/// RTF import. Styling covers bold, italic, underline, and strikethrough runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtfDecoder;

impl Decoder for RtfDecoder {
    fn kind(&self) -> SourceKind {
        SourceKind::Rtf
    }

    fn decode(&self, bytes: &[u8]) -> Result<StructuredDocument, ImportDecodeError> {
        parse_rtf_document(bytes)
    }
}

/// Convert raw RTF bytes into a [`StructuredDocument`].
pub fn parse_rtf_document(bytes: &[u8]) -> Result<StructuredDocument, ImportDecodeError> {
    let cow = String::from_utf8_lossy(bytes);
    let normalized = inject_paragraph_sentinels(cow.as_ref());
    let rtf = RtfDocument::try_from(normalized.as_ref())
        .map_err(|err| ImportDecodeError::Rtf(err.to_string()))?;

    let mut doc = StructuredDocument::new();
    let mut current_runs: Vec<InlineContent> = Vec::new();
    let mut last_paragraph_state: Option<RtfParagraph> = None;

    for block in rtf.body.iter() {
        if last_paragraph_state
            .as_ref()
            .map(|prev| prev != &block.paragraph)
            .unwrap_or(false)
            && !current_runs.is_empty()
        {
            finalize_paragraph(&mut current_runs, &mut doc, false);
        }

        let appended = append_style_block(
            block.text.as_str(),
            &block.painter,
            &mut current_runs,
            &mut doc,
        );

        if appended {
            last_paragraph_state = Some(block.paragraph);
        }
    }

    finalize_paragraph(&mut current_runs, &mut doc, false);
    drop_trailing_empty_blocks(&mut doc);

    Ok(doc)
}

fn append_style_block(
    text: &str,
    painter: &Painter,
    current_runs: &mut Vec<InlineContent>,
    doc: &mut StructuredDocument,
) -> bool {
    let normalized = if text.contains(PARAGRAPH_BREAK_SENTINEL) {
        Cow::Owned(text.replace(PARAGRAPH_BREAK_SENTINEL, "\n"))
    } else {
        Cow::Borrowed(text)
    };
    let text = normalized.as_ref();
    let mut start = 0usize;
    let mut appended = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '\r' => {
                if start < idx {
                    appended |= push_run(&text[start..idx], painter, current_runs);
                }
                start = idx + ch.len_utf8();
            }
            '\n' => {
                if start < idx {
                    appended |= push_run(&text[start..idx], painter, current_runs);
                }
                finalize_paragraph(current_runs, doc, true);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }

    if start < text.len() {
        appended |= push_run(&text[start..], painter, current_runs);
    }

    appended
}

fn push_run(text: &str, painter: &Painter, runs: &mut Vec<InlineContent>) -> bool {
    if text.is_empty() {
        return false;
    }

    runs.push(InlineContent::Text(TextRun::new(text, style_from_painter(painter))));
    true
}

fn style_from_painter(painter: &Painter) -> TextStyle {
    TextStyle {
        bold: painter.bold,
        italic: painter.italic,
        underline: painter.underline,
        strikethrough: painter.strike,
        ..TextStyle::default()
    }
}

fn finalize_paragraph(
    current_runs: &mut Vec<InlineContent>,
    doc: &mut StructuredDocument,
    allow_empty: bool,
) {
    if current_runs.is_empty() {
        if allow_empty {
            doc.add_block(Block::paragraph(0));
        }
        return;
    }

    let mut block = Block::paragraph(0);
    block.content = std::mem::take(current_runs);
    block.merge_adjacent_runs();
    doc.add_block(block);
}

/// A closing `\par` leaves an empty paragraph behind
fn drop_trailing_empty_blocks(doc: &mut StructuredDocument) {
    while doc.block_count() > 1 && doc.blocks().last().is_some_and(|b| b.is_empty()) {
        doc.remove_block(doc.block_count() - 1);
    }
}

/// Mark every `\par` with a sentinel character so paragraph breaks survive
/// parsing as text.
fn inject_paragraph_sentinels(input: &str) -> Cow<'_, str> {
    const NEEDLE: &[u8] = b"par";
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut last_copied = 0;
    let mut output: Option<String> = None;

    while i + NEEDLE.len() < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        let slice = &bytes[i + 1..];
        if slice[..NEEDLE.len()]
            .iter()
            .map(|b| b.to_ascii_lowercase())
            .ne(NEEDLE.iter().copied())
        {
            i += 1;
            continue;
        }
        let after_word = i + 1 + NEEDLE.len();
        // Skip \pard, \parshape, etc.
        if let Some(next) = bytes.get(after_word)
            && next.is_ascii_alphabetic()
        {
            i += 1;
            continue;
        }
        let mut after_space = after_word;
        if bytes.get(after_space) == Some(&b' ') {
            after_space += 1;
        }
        let already_tagged = bytes
            .get(after_space..after_space + PARAGRAPH_BREAK_ESCAPE.len())
            .is_some_and(|segment| segment == PARAGRAPH_BREAK_ESCAPE.as_bytes());
        if already_tagged {
            i = after_space;
            continue;
        }

        let out = output.get_or_insert_with(|| String::with_capacity(input.len() + 8));
        out.push_str(&input[last_copied..after_space]);
        out.push_str(PARAGRAPH_BREAK_ESCAPE);
        last_copied = after_space;
        i = after_space;
    }

    match output {
        Some(mut out) => {
            out.push_str(&input[last_copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(input),
    }
}
