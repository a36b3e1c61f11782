use crate::pipeline::markup_codec::standalone_html;
use crate::richtext::structured_document::PageGeometry;

const TWIPS_PER_INCH: f32 = 1440.0;

const PRINT_STYLE: &str = "@media print{body{margin:0;padding:0;max-width:none}\
header,footer{display:none}}";

/// Standalone page that opens the platform print dialog once loaded.
/// Works on the current markup directly; no encoder is involved.
pub fn print_page(title: &str, markup: &str, page: Option<&PageGeometry>) -> String {
    let mut style = String::from(PRINT_STYLE);
    if let Some(page) = page {
        style.push_str(&page_rule(page));
    }
    standalone_html(title, markup, &style, Some("window.print()"))
}

fn page_rule(page: &PageGeometry) -> String {
    format!(
        "@page{{size:{} {};margin:{} {} {} {}}}",
        inches(page.width),
        inches(page.height),
        inches(page.margin_top),
        inches(page.margin_right),
        inches(page.margin_bottom),
        inches(page.margin_left),
    )
}

fn inches(twips: u32) -> String {
    let value = twips as f32 / TWIPS_PER_INCH;
    let mut out = format!("{value:.2}");
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out.push_str("in");
    out
}
