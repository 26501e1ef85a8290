//! Plain text PDF documents (Helvetica, A4) built with `pdf-writer`.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

/// Lines per A4 page at 14pt leading.
const LINES_PER_PAGE: usize = 52;

/// Characters per line before wrapping at 10pt Helvetica.
const WRAP_WIDTH: usize = 95;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const LEADING: f32 = 14.0;

const BODY_FONT: Name<'static> = Name(b"F1");
const TITLE_FONT: Name<'static> = Name(b"F2");

/// Non-ASCII characters become `?` because the fonts use WinAnsi.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, ' '..='~') { c } else { '?' })
        .collect()
}

fn wrap(line: &str) -> Vec<String> {
    if line.chars().count() <= WRAP_WIDTH {
        return vec![line.to_string()];
    }

    let indent: String = line.chars().take_while(|c| *c == ' ').collect();
    let mut wrapped = Vec::new();
    let mut current = indent.clone();
    for word in line.split_whitespace() {
        let extra = if current.trim().is_empty() { 0 } else { 1 };
        if current.chars().count() + extra + word.chars().count() > WRAP_WIDTH
            && !current.trim().is_empty()
        {
            wrapped.push(std::mem::replace(&mut current, format!("{indent}  ")));
        } else if extra == 1 {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.trim().is_empty() {
        wrapped.push(current);
    }
    wrapped
}

fn page_content(title: Option<&str>, lines: &[String]) -> Vec<u8> {
    let mut content = Content::new();
    content.begin_text();
    content.set_leading(LEADING);
    content.next_line(MARGIN, PAGE_HEIGHT - MARGIN);
    if let Some(title) = title {
        content.set_font(TITLE_FONT, 14.0);
        content.show(Str(sanitize(title).as_bytes()));
        content.next_line_using_leading();
        content.next_line_using_leading();
    }
    content.set_font(BODY_FONT, 10.0);
    for line in lines {
        content.show(Str(sanitize(line).as_bytes()));
        content.next_line_using_leading();
    }
    content.end_text();
    content.finish()
}

/// Render a titled document. Pages break every `LINES_PER_PAGE` lines;
/// the title only appears on the first page.
pub fn write_text_pdf(title: &str, lines: &[String]) -> Vec<u8> {
    let wrapped: Vec<String> = lines.iter().flat_map(|l| wrap(l)).collect();
    let mut pages: Vec<&[String]> = wrapped.chunks(LINES_PER_PAGE).collect();
    if pages.is_empty() {
        pages.push(&[]);
    }

    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let body_font_id = Ref::new(3);
    let title_font_id = Ref::new(4);
    // (page, content stream) pairs follow the fixed objects.
    let page_ids: Vec<(Ref, Ref)> = (0..pages.len() as i32)
        .map(|i| (Ref::new(5 + 2 * i), Ref::new(6 + 2 * i)))
        .collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().map(|(page, _)| *page))
        .count(pages.len() as i32);
    pdf.type1_font(body_font_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(title_font_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    for (i, (chunk, (page_id, content_id))) in pages.iter().zip(&page_ids).enumerate() {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(tree_id);
        page.contents(*content_id);
        page.resources()
            .fonts()
            .pair(BODY_FONT, body_font_id)
            .pair(TITLE_FONT, title_font_id);
        page.finish();

        let content = page_content((i == 0).then_some(title), chunk);
        pdf.stream(*content_id, &content);
    }

    pdf.finish()
}
