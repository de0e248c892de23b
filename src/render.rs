//! Card rendering.
//!
//! The card is a pure projection of [`CompositionState`] into SVG markup.
//! [`render_card`] produces a standalone card document, [`render_view`] the
//! whole screen with the card embedded as the group [`CARD_ID`]. The export
//! pipeline locates that group and rasterizes it alone.

use std::fmt::Write;

use tracing::trace;

use crate::background::{Background, css_hex};
use crate::state::CompositionState;
use crate::text::{AverageMetrics, TextMeasure, TextStyle};

/// Stable identity of the card group inside a rendered view.
pub const CARD_ID: &str = "post-card";

/// Shown in place of an empty display name.
pub const NAME_PLACEHOLDER: &str = "Display Name";
/// Shown after the `@` in place of an empty handle.
pub const HANDLE_PLACEHOLDER: &str = "username";
/// Shown in place of an empty body.
pub const BODY_PLACEHOLDER: &str = "Your post content will appear here...";
/// Avatar glyph when the display name is empty.
pub const GLYPH_PLACEHOLDER: &str = "?";

// ============================================================================
// Geometry
// ============================================================================

/// Card width in CSS pixels.
pub const CARD_WIDTH: f32 = 448.0;
const PADDING: f32 = 24.0;
const RADIUS: f32 = 12.0;
const AVATAR: f32 = 40.0;
const HEADER_GAP: f32 = 12.0;
const SECTION_GAP: f32 = 16.0;
const CLOSE_SIZE: f32 = 20.0;
const BODY_FONT: f32 = 18.0;
const BODY_LINE: f32 = 28.0;
const BODY_WIDTH: f32 = CARD_WIDTH - 2.0 * PADDING;
const HEADER_X: f32 = PADDING + AVATAR + HEADER_GAP;
// Header text stops one gap short of the close glyph.
const HEADER_WIDTH: f32 = CARD_WIDTH - PADDING - CLOSE_SIZE - HEADER_GAP - HEADER_X;

const BODY_STYLE: TextStyle = TextStyle::regular(BODY_FONT);
const NAME_STYLE: TextStyle = TextStyle::bold(16.0);
const HANDLE_STYLE: TextStyle = TextStyle::regular(14.0);
const ELLIPSIS: &str = "\u{2026}";

const VIEW_MARGIN: f32 = 32.0;
const VIEW_HEADER: f32 = 112.0;

const FONT_STACK: &str =
    "Inter, 'Helvetica Neue', Helvetica, Arial, 'Liberation Sans', 'DejaVu Sans', sans-serif";
const WHITE: &str = "#ffffff";
const GLYPH_FILL: &str = "#e5e7eb";
const GLYPH_TEXT: &str = "#374151";

// ============================================================================
// Rendered output
// ============================================================================

/// A standalone SVG document containing only the card.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCard {
    svg: String,
    width: f32,
    height: f32,
}

impl RenderedCard {
    /// Returns the SVG markup.
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Returns the natural size in CSS pixels.
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

/// The whole screen: heading, subtitle and the card.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedView {
    svg: String,
    width: f32,
    height: f32,
}

impl RenderedView {
    /// Returns the SVG markup.
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Consumes the view, returning the SVG markup.
    pub fn into_svg(self) -> String {
        self.svg
    }

    /// Returns the page size in CSS pixels.
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Lines of text after measuring, ready to be written out.
struct Layout {
    name: String,
    handle: String,
    body: Vec<String>,
}

impl Layout {
    fn new(state: &CompositionState, metrics: &dyn TextMeasure) -> Self {
        Self {
            name: fit_line(&header_name(state.display_name()), HEADER_WIDTH, NAME_STYLE, metrics),
            handle: fit_line(&header_handle(state.handle()), HEADER_WIDTH, HANDLE_STYLE, metrics),
            body: body_lines(state.body(), metrics),
        }
    }

    fn card_height(&self) -> f32 {
        PADDING + AVATAR + SECTION_GAP + self.body.len() as f32 * BODY_LINE + PADDING
    }
}

/// Renders the card on its own, laid out with [`AverageMetrics`].
pub fn render_card(state: &CompositionState) -> RenderedCard {
    render_card_with(state, &AverageMetrics)
}

/// Renders the card on its own, laid out with `metrics`.
pub fn render_card_with(state: &CompositionState, metrics: &dyn TextMeasure) -> RenderedCard {
    let layout = Layout::new(state, metrics);
    let height = layout.card_height();

    let mut svg = String::new();
    open_document(&mut svg, CARD_WIDTH, height);
    write_card(&mut svg, state, &layout, 0.0, 0.0);
    svg.push_str("</svg>");

    trace!(height, lines = layout.body.len(), "rendered card");
    RenderedCard {
        svg,
        width: CARD_WIDTH,
        height,
    }
}

/// Renders the whole screen with the card addressable as [`CARD_ID`], laid
/// out with [`AverageMetrics`].
pub fn render_view(state: &CompositionState) -> RenderedView {
    render_view_with(state, &AverageMetrics)
}

/// Renders the whole screen with the card addressable as [`CARD_ID`].
///
/// Pass the metrics of the fonts that will draw the view so that wrapped
/// lines fit the card.
pub fn render_view_with(state: &CompositionState, metrics: &dyn TextMeasure) -> RenderedView {
    let layout = Layout::new(state, metrics);
    let width = CARD_WIDTH + 2.0 * VIEW_MARGIN;
    let height = VIEW_HEADER + layout.card_height() + VIEW_MARGIN;

    let mut svg = String::new();
    open_document(&mut svg, width, height);
    let _ = write!(
        svg,
        r#"<rect width="{width}" height="{height}" fill="{WHITE}"/>"#
    );
    let _ = write!(
        svg,
        r##"<text x="{cx}" y="56" text-anchor="middle" font-family="{FONT_STACK}" font-size="36" font-weight="bold" fill="#09090b">Preety Post</text>"##,
        cx = width / 2.0
    );
    let _ = write!(
        svg,
        r##"<text x="{cx}" y="86" text-anchor="middle" font-family="{FONT_STACK}" font-size="16" fill="#71717a">Create beautiful X post cards with your content</text>"##,
        cx = width / 2.0
    );
    write_card(&mut svg, state, &layout, VIEW_MARGIN, VIEW_HEADER);
    svg.push_str("</svg>");

    RenderedView { svg, width, height }
}

fn open_document(out: &mut String, width: f32, height: f32) {
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
}

fn write_card(out: &mut String, state: &CompositionState, layout: &Layout, x: f32, y: f32) {
    let height = layout.card_height();

    let _ = write!(out, r#"<g id="{CARD_ID}" transform="translate({x} {y})">"#);
    out.push_str("<defs>");
    write_gradient(out, state.background());
    let _ = write!(
        out,
        r#"<clipPath id="{CARD_ID}-avatar"><circle cx="{c}" cy="{c}" r="{r}"/></clipPath>"#,
        c = PADDING + AVATAR / 2.0,
        r = AVATAR / 2.0
    );
    let _ = write!(
        out,
        r#"<clipPath id="{CARD_ID}-frame"><rect width="{CARD_WIDTH}" height="{height}" rx="{RADIUS}"/></clipPath>"#
    );
    out.push_str("</defs>");

    let _ = write!(
        out,
        r#"<rect width="{CARD_WIDTH}" height="{height}" rx="{RADIUS}" fill="url(#{CARD_ID}-bg)"/>"#
    );
    let _ = write!(out, r#"<g clip-path="url(#{CARD_ID}-frame)">"#);
    write_avatar(out, state);
    write_header(out, layout);
    write_close_glyph(out);
    write_body(out, &layout.body);
    out.push_str("</g></g>");
}

fn write_gradient(out: &mut String, background: Background) {
    let (x1, y1, x2, y2) = background.direction().vector();
    let _ = write!(
        out,
        r#"<linearGradient id="{CARD_ID}-bg" x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}">"#
    );
    let stops = background.stops();
    let last = stops.len().saturating_sub(1).max(1) as f32;
    for (i, color) in stops.iter().enumerate() {
        let _ = write!(
            out,
            r#"<stop offset="{}" stop-color="{}"/>"#,
            i as f32 / last,
            css_hex(*color)
        );
    }
    out.push_str("</linearGradient>");
}

fn write_avatar(out: &mut String, state: &CompositionState) {
    let center = PADDING + AVATAR / 2.0;
    match state.profile_image() {
        Some(image) => {
            let _ = write!(
                out,
                r#"<image x="{PADDING}" y="{PADDING}" width="{AVATAR}" height="{AVATAR}" preserveAspectRatio="xMidYMid slice" clip-path="url(#{CARD_ID}-avatar)" xlink:href="{}"/>"#,
                image.to_data_uri()
            );
        }
        None => {
            let _ = write!(
                out,
                r#"<circle cx="{center}" cy="{center}" r="{r}" fill="{GLYPH_FILL}"/>"#,
                r = AVATAR / 2.0
            );
            let _ = write!(
                out,
                r#"<text x="{center}" y="{baseline}" text-anchor="middle" font-family="{FONT_STACK}" font-size="16" fill="{GLYPH_TEXT}">{}</text>"#,
                escape_xml(&fallback_glyph(state.display_name())),
                baseline = center + 5.5
            );
        }
    }
}

fn write_header(out: &mut String, layout: &Layout) {
    let _ = write!(
        out,
        r#"<text id="{CARD_ID}-name" x="{HEADER_X}" y="{y}" font-family="{FONT_STACK}" font-size="{size}" font-weight="bold" fill="{WHITE}" xml:space="preserve">{}</text>"#,
        escape_xml(&layout.name),
        size = NAME_STYLE.size,
        y = PADDING + 17.0
    );
    let _ = write!(
        out,
        r#"<text id="{CARD_ID}-handle" x="{HEADER_X}" y="{y}" font-family="{FONT_STACK}" font-size="{size}" fill="{WHITE}" fill-opacity="0.8" xml:space="preserve">{}</text>"#,
        escape_xml(&layout.handle),
        size = HANDLE_STYLE.size,
        y = PADDING + 37.0
    );
}

fn write_close_glyph(out: &mut String) {
    let x = CARD_WIDTH - PADDING - CLOSE_SIZE;
    let y = PADDING + (AVATAR - CLOSE_SIZE) / 2.0;
    let (a, b) = (CLOSE_SIZE * 0.25, CLOSE_SIZE * 0.75);
    let _ = write!(
        out,
        r#"<path d="M{x0} {y0} L{x1} {y1} M{x1} {y0} L{x0} {y1}" fill="none" stroke="{WHITE}" stroke-width="2" stroke-linecap="round"/>"#,
        x0 = x + a,
        y0 = y + a,
        x1 = x + b,
        y1 = y + b
    );
}

fn write_body(out: &mut String, lines: &[String]) {
    let top = PADDING + AVATAR + SECTION_GAP;
    let _ = write!(
        out,
        r#"<text id="{CARD_ID}-body" font-family="{FONT_STACK}" font-size="{BODY_FONT}" fill="{WHITE}" xml:space="preserve">"#
    );
    for (i, line) in lines.iter().enumerate() {
        let _ = write!(
            out,
            r#"<tspan x="{PADDING}" y="{y}">{}</tspan>"#,
            escape_xml(line),
            y = top + i as f32 * BODY_LINE + 20.0
        );
    }
    out.push_str("</text>");
}

// ============================================================================
// Text helpers
// ============================================================================

/// The glyph shown when no picture is set: the uppercased first character of
/// the display name, or `?` when the name is empty.
pub fn fallback_glyph(display_name: &str) -> String {
    match display_name.chars().next() {
        Some(first) => first.to_uppercase().collect(),
        None => GLYPH_PLACEHOLDER.to_string(),
    }
}

/// The display name, or its placeholder when empty.
pub fn header_name(display_name: &str) -> String {
    if display_name.is_empty() {
        NAME_PLACEHOLDER.to_string()
    } else {
        display_name.to_string()
    }
}

/// The `@`-prefixed handle, or `@username` when empty.
pub fn header_handle(handle: &str) -> String {
    if handle.is_empty() {
        format!("@{HANDLE_PLACEHOLDER}")
    } else {
        format!("@{handle}")
    }
}

fn body_lines(body: &str, metrics: &dyn TextMeasure) -> Vec<String> {
    if body.is_empty() {
        return vec![BODY_PLACEHOLDER.to_string()];
    }
    body.split('\n')
        .flat_map(|line| wrap_line(line.trim_end_matches('\r'), BODY_WIDTH, BODY_STYLE, metrics))
        .collect()
}

/// Greedy word wrap to `max` pixels. Words wider than a line are split.
fn wrap_line(line: &str, max: f32, style: TextStyle, metrics: &dyn TextMeasure) -> Vec<String> {
    let space = metrics.width(" ", style);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;
    let mut started = false;

    for word in line.split(' ') {
        let mut word = word;
        loop {
            let word_width = metrics.width(word, style);
            let needed = if started { current_width + space + word_width } else { word_width };
            if needed <= max {
                if started {
                    current.push(' ');
                }
                current.push_str(word);
                current_width = needed;
                started = true;
                break;
            }
            if started {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
                started = false;
                continue;
            }
            let split = fitting_prefix(word, max, style, metrics).max(first_char_len(word));
            lines.push(word[..split].to_string());
            word = &word[split..];
            if word.is_empty() {
                break;
            }
        }
    }
    lines.push(current);
    lines
}

/// Shortens `text` with an ellipsis so it fits in `max` pixels.
fn fit_line(text: &str, max: f32, style: TextStyle, metrics: &dyn TextMeasure) -> String {
    if metrics.width(text, style) <= max {
        return text.to_string();
    }
    let budget = max - metrics.width(ELLIPSIS, style);
    let end = fitting_prefix(text, budget, style, metrics);
    format!("{}{ELLIPSIS}", text[..end].trim_end())
}

/// Byte length of the longest prefix of `text` no wider than `max`.
fn fitting_prefix(text: &str, max: f32, style: TextStyle, metrics: &dyn TextMeasure) -> usize {
    let mut width = 0.0;
    let mut buf = [0u8; 4];
    for (i, c) in text.char_indices() {
        width += metrics.width(c.encode_utf8(&mut buf), style);
        if width > max {
            return i;
        }
    }
    text.len()
}

fn first_char_len(text: &str) -> usize {
    text.chars().next().map_or(0, char::len_utf8)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile_image::{ProfileImage, sample_png};
    use crate::state::CompositionStore;

    /// Every character is half an em wide.
    struct HalfEm;

    impl TextMeasure for HalfEm {
        fn width(&self, text: &str, style: TextStyle) -> f32 {
            text.chars().count() as f32 * style.size * 0.5
        }
    }

    #[test]
    fn glyph_falls_back_to_initial() {
        assert_eq!(fallback_glyph("ada"), "A");
        assert_eq!(fallback_glyph("émile"), "É");
        assert_eq!(fallback_glyph(""), "?");
    }

    #[test]
    fn header_placeholders() {
        assert_eq!(header_name(""), "Display Name");
        assert_eq!(header_name("Ada"), "Ada");
        assert_eq!(header_handle(""), "@username");
        assert_eq!(header_handle("ada"), "@ada");
    }

    #[test]
    fn empty_state_renders_placeholders() {
        let card = render_card(&CompositionState::new());
        let svg = card.svg();
        assert!(svg.contains(">Display Name<"));
        assert!(svg.contains(">@username<"));
        assert!(svg.contains(BODY_PLACEHOLDER));
        assert!(svg.contains(">?</text>"));
        assert!(svg.contains(r##"stop-color="#f472b6""##));
    }

    #[test]
    fn user_text_is_escaped() {
        let mut store = CompositionStore::new();
        store.set_display_name("<b>Ada</b> & co");
        store.set_body("a < b");
        let svg = render_card(store.state()).svg().to_string();
        assert!(svg.contains("&lt;b&gt;Ada&lt;/b&gt; &amp; co"));
        assert!(svg.contains("a &lt; b"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn picture_replaces_glyph() {
        let mut store = CompositionStore::new();
        store.set_display_name("Ada");
        store.set_profile_image(ProfileImage::from_bytes(sample_png(2, 2)).unwrap());
        let svg = render_card(store.state()).svg().to_string();
        assert!(svg.contains("data:image/png;base64,"));
        assert!(!svg.contains(">A</text>"));
    }

    #[test]
    fn body_grows_card() {
        let mut store = CompositionStore::new();
        store.set_body("one");
        let short = render_card(store.state()).size().1;
        store.set_body("one\ntwo\nthree");
        let tall = render_card(store.state()).size().1;
        assert_eq!(tall - short, 2.0 * BODY_LINE);
        assert_eq!(render_card(store.state()).size().0, CARD_WIDTH);
    }

    #[test]
    fn wrap_respects_width() {
        // 10 characters per line at 2px each.
        let style = TextStyle::regular(4.0);
        let lines = wrap_line("the quick brown fox jumps over the lazy dog", 20.0, style, &HalfEm);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");

        let long = wrap_line(&"x".repeat(25), 20.0, style, &HalfEm);
        assert_eq!(long, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn wrap_keeps_spacing() {
        let style = TextStyle::regular(4.0);
        assert_eq!(wrap_line("  a  b", 100.0, style, &HalfEm), vec!["  a  b"]);
    }

    #[test]
    fn wrap_uses_measured_width() {
        // 44 characters fit a 400px line at 9px each but not under the
        // wider estimate.
        let sentence = "Shipping a new release of our app this week!";
        assert_eq!(sentence.chars().count(), 44);
        assert_eq!(wrap_line(sentence, BODY_WIDTH, BODY_STYLE, &HalfEm).len(), 1);

        let lines = wrap_line(sentence, BODY_WIDTH, BODY_STYLE, &AverageMetrics);
        assert_eq!(lines.len(), 2);
        for line in &lines {
            assert!(AverageMetrics.width(line, BODY_STYLE) <= BODY_WIDTH);
        }
        assert_eq!(lines.join(" "), sentence);
    }

    #[test]
    fn long_name_is_shortened_before_close_glyph() {
        let mut store = CompositionStore::new();
        let name = "Bartholomew Maximilian Featherstonehaugh-Worthington III";
        store.set_display_name(name);
        store.set_handle("a_really_long_handle_that_keeps_going_and_going_forever");

        let layout = Layout::new(store.state(), &AverageMetrics);
        assert!(layout.name.ends_with(ELLIPSIS));
        assert!(name.starts_with(layout.name.trim_end_matches(ELLIPSIS)));
        assert!(AverageMetrics.width(&layout.name, NAME_STYLE) <= HEADER_WIDTH);
        assert!(layout.handle.starts_with("@a_really"));
        assert!(AverageMetrics.width(&layout.handle, HANDLE_STYLE) <= HEADER_WIDTH);
        assert!(HEADER_X + HEADER_WIDTH < CARD_WIDTH - PADDING - CLOSE_SIZE);

        let svg = render_card(store.state()).svg().to_string();
        assert!(svg.contains(&format!(">{}<", layout.name)));
    }

    #[test]
    fn short_name_is_untouched() {
        let layout = Layout::new(&CompositionState::new(), &AverageMetrics);
        assert_eq!(layout.name, "Display Name");
        assert_eq!(layout.handle, "@username");
    }

    #[test]
    fn view_embeds_addressable_card() {
        let view = render_view(&CompositionState::new());
        assert!(view.svg().contains(r#"<g id="post-card""#));
        assert!(view.svg().contains("Preety Post"));
        assert_eq!(view.svg().matches(r#"id="post-card""#).count(), 1);
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut store = CompositionStore::new();
        store.set_display_name("Ada");
        store.set_body("Hello world");
        assert_eq!(render_card(store.state()), render_card(store.state()));
    }
}
