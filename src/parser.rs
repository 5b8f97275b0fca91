//! Event-driven markup parser.
//!
//! A thin, stateful consumer of tokenizer events: it keeps the stack of
//! open elements, applies the HTML element-category rules (void elements,
//! implicit closes, foreign content), normalizes names per mode, and
//! forwards higher-level events to a [`Handler`].
//!
//! Invariants:
//! - The open-element stack only grows at `on_open_tag` and shrinks at
//!   `on_close_tag`; it never reorders.
//! - Every delivered event has `start_index() <= end_index()`.
//! - Synthesized closes (void elements, self-closing tags, implicit closes,
//!   end of input) carry a collapsed zero-width span.

use crate::error::{ErrorKind, ParseError};
use crate::tokenizer::{Flow, QuoteKind, Span, TokenSink, Tokenizer, TokenizerOptions};
use std::borrow::Cow;

/// User-facing event callbacks. Every method has a no-op default, so a
/// handler implements only what it consumes. Event callbacks return a
/// [`Flow`] directive; returning [`Flow::Pause`] suspends the parser at
/// that event boundary until `resume()`.
pub trait Handler {
    /// Fired exactly once, synchronously, during parser construction.
    fn on_parser_init(&mut self) {}
    fn on_reset(&mut self) {}
    fn on_end(&mut self) {}
    /// Absent an implementation, errors are dropped, not raised.
    fn on_error(&mut self, _error: ParseError) {}
    fn on_open_tag_name(&mut self, _name: &str) -> Flow {
        Flow::Continue
    }
    fn on_open_tag(&mut self, _name: &str, _attributes: &[(String, String)]) -> Flow {
        Flow::Continue
    }
    fn on_attribute(&mut self, _name: &str, _value: &str, _quote: QuoteKind) -> Flow {
        Flow::Continue
    }
    fn on_close_tag(&mut self, _name: &str) -> Flow {
        Flow::Continue
    }
    fn on_text(&mut self, _text: &str) -> Flow {
        Flow::Continue
    }
    fn on_comment(&mut self, _data: &str) -> Flow {
        Flow::Continue
    }
    fn on_comment_end(&mut self) -> Flow {
        Flow::Continue
    }
    fn on_cdata_start(&mut self) -> Flow {
        Flow::Continue
    }
    fn on_cdata_end(&mut self) -> Flow {
        Flow::Continue
    }
    fn on_processing_instruction(&mut self, _name: &str, _data: &str) -> Flow {
        Flow::Continue
    }
    fn on_declaration(&mut self, _data: &str) -> Flow {
        Flow::Continue
    }
}

#[derive(Clone, Debug)]
pub struct ParserOptions {
    /// XML rules: strict entities, every element may self-close, no
    /// element-category tables, names preserved verbatim.
    pub xml_mode: bool,
    /// Decode character references in text and attribute values.
    pub decode_entities: bool,
    /// Lowercase tag names. Defaults to `!xml_mode`.
    pub lowercase_tags: Option<bool>,
    /// Lowercase attribute names. Defaults to `!xml_mode`.
    pub lowercase_attribute_names: Option<bool>,
    /// Surface `<![CDATA[..]]>` as CDATA events. Defaults to `xml_mode`;
    /// otherwise the section is surfaced as a comment.
    pub recognize_cdata: Option<bool>,
    /// Honor `/>` on non-void HTML elements. Defaults to `xml_mode`.
    pub recognize_self_closing: Option<bool>,
    /// Lexical validation plus unclosed-tag checks, reported via
    /// `on_error` with `Line N` diagnostics.
    pub strict_mode: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            xml_mode: false,
            decode_entities: true,
            lowercase_tags: None,
            lowercase_attribute_names: None,
            recognize_cdata: None,
            recognize_self_closing: None,
            strict_mode: false,
        }
    }
}

impl ParserOptions {
    pub fn xml() -> Self {
        Self {
            xml_mode: true,
            ..Self::default()
        }
    }
}

/// Elements with neither content nor closing tag.
fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Pending option content, closed by any form-associated control.
const OPTION_TAGS: &[&str] = &["option", "optgroup"];
const P_TAG: &[&str] = &["p"];

/// Stack-top names an opening tag implicitly closes, keyed by the opening
/// tag. Popping repeats while the stack top stays in the returned set.
fn open_implies_close(name: &str) -> Option<&'static [&'static str]> {
    Some(match name {
        "tr" => &["tr", "th", "td"],
        "th" => &["th"],
        "td" => &["thead", "th", "td"],
        "body" => &["head", "link", "script"],
        "li" => &["li"],
        "p" => P_TAG,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => P_TAG,
        "select" | "input" | "output" | "button" | "datalist" | "textarea" => OPTION_TAGS,
        "option" => &["option"],
        "optgroup" => OPTION_TAGS,
        "dd" | "dt" => &["dt", "dd"],
        "address" | "article" | "aside" | "blockquote" | "details" | "div" | "dl" | "fieldset"
        | "figcaption" | "figure" | "footer" | "form" | "header" | "hgroup" | "hr" | "main"
        | "nav" | "ol" | "pre" | "section" | "table" | "ul" => P_TAG,
        "rt" | "rp" => &["rt", "rp"],
        "tbody" | "tfoot" => &["thead", "tbody"],
        _ => return None,
    })
}

/// The standard HTML element vocabulary. `/>` on a name outside this set
/// is honored even in lenient HTML mode; known non-void elements ignore it
/// unless `recognize_self_closing` is set.
fn is_known_html_element(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr"
            | "address"
            | "area"
            | "article"
            | "aside"
            | "audio"
            | "b"
            | "base"
            | "bdi"
            | "bdo"
            | "blockquote"
            | "body"
            | "br"
            | "button"
            | "canvas"
            | "caption"
            | "cite"
            | "code"
            | "col"
            | "colgroup"
            | "data"
            | "datalist"
            | "dd"
            | "del"
            | "details"
            | "dfn"
            | "dialog"
            | "div"
            | "dl"
            | "dt"
            | "em"
            | "embed"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "head"
            | "header"
            | "hgroup"
            | "hr"
            | "html"
            | "i"
            | "iframe"
            | "img"
            | "input"
            | "ins"
            | "kbd"
            | "label"
            | "legend"
            | "li"
            | "link"
            | "main"
            | "map"
            | "mark"
            | "math"
            | "menu"
            | "meta"
            | "meter"
            | "nav"
            | "noscript"
            | "object"
            | "ol"
            | "optgroup"
            | "option"
            | "output"
            | "p"
            | "param"
            | "picture"
            | "pre"
            | "progress"
            | "q"
            | "rp"
            | "rt"
            | "ruby"
            | "s"
            | "samp"
            | "script"
            | "section"
            | "select"
            | "slot"
            | "small"
            | "source"
            | "span"
            | "strong"
            | "style"
            | "sub"
            | "summary"
            | "sup"
            | "svg"
            | "table"
            | "tbody"
            | "td"
            | "template"
            | "textarea"
            | "tfoot"
            | "th"
            | "thead"
            | "time"
            | "title"
            | "tr"
            | "track"
            | "u"
            | "ul"
            | "var"
            | "video"
            | "wbr"
    )
}

/// Roots of foreign content; inside them `/>` is always honored.
fn is_foreign_context_element(name: &str) -> bool {
    matches!(name, "math" | "svg")
}

/// Elements that switch back to HTML rules inside foreign content.
fn is_html_integration_element(name: &str) -> bool {
    matches!(
        name,
        "mglyph" | "malignmark" | "foreignobject" | "desc" | "title"
    )
}

struct ParserSink<H: Handler> {
    handler: H,
    xml_mode: bool,
    lowercase_tags: bool,
    lowercase_attribute_names: bool,
    recognize_cdata: bool,
    recognize_self_closing: bool,
    strict_mode: bool,
    stack: Vec<String>,
    /// One entry per open `math`/`svg` or integration element; the top
    /// decides whether foreign rules apply.
    foreign_context: Vec<bool>,
    /// Open tag being assembled, until its `>` arrives.
    open_tag: Option<String>,
    tag_open_start: usize,
    attributes: Vec<(String, String)>,
    attribute_name: Option<String>,
    attribute_value: String,
    start_index: usize,
    end_index: usize,
    errored: bool,
}

impl<H: Handler> ParserSink<H> {
    fn fold_tag<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.lowercase_tags && name.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(name.to_ascii_lowercase())
        } else {
            Cow::Borrowed(name)
        }
    }

    fn in_foreign_context(&self) -> bool {
        self.foreign_context.last().copied().unwrap_or(false)
    }

    fn is_void(&self, name: &str) -> bool {
        !self.xml_mode && is_void_element(name)
    }

    fn set_span(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end, "event span out of order");
        self.start_index = start;
        self.end_index = end;
    }

    fn report(&mut self, kind: ErrorKind, line: usize) {
        self.errored = true;
        self.handler.on_error(ParseError::new(kind, line));
    }

    /// Pop one element and keep the foreign-context stack in sync.
    fn pop_element(&mut self) -> String {
        let name = self.stack.pop().expect("pop on empty element stack");
        if is_foreign_context_element(&name) || is_html_integration_element(&name) {
            self.foreign_context.pop();
        }
        name
    }

    /// Emit `on_open_tag` and, for void or self-closed elements, the
    /// matching synthesized close.
    fn finish_open_tag(&mut self, end: usize, self_closing: bool) -> Flow {
        let Some(name) = self.open_tag.take() else {
            return Flow::Continue;
        };
        self.set_span(self.tag_open_start, end);
        let mut flow = self.handler.on_open_tag(&name, &self.attributes);
        if self.is_void(&name) {
            self.set_span(end, end);
            flow = flow.and(self.handler.on_close_tag(&name));
        } else if self_closing && self.stack.last().map(String::as_str) == Some(name.as_str()) {
            self.pop_element();
            self.set_span(end, end);
            flow = flow.and(self.handler.on_close_tag(&name));
        }
        flow
    }

    fn reset_state(&mut self) {
        self.stack.clear();
        self.foreign_context.clear();
        self.open_tag = None;
        self.tag_open_start = 0;
        self.attributes.clear();
        self.attribute_name = None;
        self.attribute_value.clear();
        self.start_index = 0;
        self.end_index = 0;
        self.errored = false;
    }
}

impl<H: Handler> TokenSink for ParserSink<H> {
    fn on_text(&mut self, text: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        self.set_span(span.start, span.end);
        self.handler.on_text(text)
    }

    fn on_text_entity(&mut self, decoded: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        self.set_span(span.start, span.end);
        self.handler.on_text(decoded)
    }

    fn on_open_tag_name(&mut self, raw: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        let name = self.fold_tag(raw).into_owned();
        let mut flow = Flow::Continue;
        if !self.xml_mode
            && let Some(closes) = open_implies_close(&name)
        {
            while self
                .stack
                .last()
                .is_some_and(|top| closes.contains(&top.as_str()))
            {
                let popped = self.pop_element();
                #[cfg(any(test, feature = "debug-stats"))]
                log::trace!(target: "markup.parser", "implicit close of {popped} before {name}");
                self.set_span(span.end, span.end);
                flow = flow.and(self.handler.on_close_tag(&popped));
            }
        }
        if !self.is_void(&name) {
            self.stack.push(name.clone());
            if is_foreign_context_element(&name) {
                self.foreign_context.push(true);
            } else if is_html_integration_element(&name) {
                self.foreign_context.push(false);
            }
        }
        self.tag_open_start = span.start - 1;
        self.set_span(span.start - 1, span.end);
        flow = flow.and(self.handler.on_open_tag_name(&name));
        self.open_tag = Some(name);
        self.attributes.clear();
        flow
    }

    fn on_open_tag_end(&mut self, end: usize) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        self.finish_open_tag(end, false)
    }

    fn on_self_closing_tag(&mut self, end: usize) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        let close = self.recognize_self_closing
            || self.xml_mode
            || self.in_foreign_context()
            || self
                .open_tag
                .as_deref()
                .is_some_and(|name| !is_known_html_element(name));
        self.finish_open_tag(end, close)
    }

    fn on_close_tag(&mut self, raw: &str, span: Span, line: usize) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        let name = self.fold_tag(raw);
        let Some(position) = self.stack.iter().rposition(|open| *open == *name) else {
            if self.strict_mode {
                self.report(ErrorKind::ClosingTagMissing, line);
            }
            return Flow::Continue;
        };
        let mut flow = Flow::Continue;
        while self.stack.len() > position + 1 {
            let popped = self.pop_element();
            self.set_span(span.end, span.end);
            flow = flow.and(self.handler.on_close_tag(&popped));
        }
        let matched = self.pop_element();
        self.set_span(span.start, span.end);
        flow.and(self.handler.on_close_tag(&matched))
    }

    fn on_attribute_name(&mut self, raw: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        let name = if self.lowercase_attribute_names {
            raw.to_ascii_lowercase()
        } else {
            raw.to_string()
        };
        self.attribute_name = Some(name);
        self.attribute_value.clear();
        self.end_index = span.end;
        Flow::Continue
    }

    fn on_attribute_data(&mut self, value: &str) -> Flow {
        self.attribute_value.push_str(value);
        Flow::Continue
    }

    fn on_attribute_entity(&mut self, decoded: &str) -> Flow {
        self.attribute_value.push_str(decoded);
        Flow::Continue
    }

    fn on_attribute_end(&mut self, quote: QuoteKind, end: usize) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        let Some(name) = self.attribute_name.take() else {
            debug_assert!(false, "attribute end without a name");
            return Flow::Continue;
        };
        self.set_span(self.tag_open_start, end);
        let flow = self
            .handler
            .on_attribute(&name, &self.attribute_value, quote);
        // First occurrence wins in the attribute map.
        if !self.attributes.iter().any(|(existing, _)| *existing == name) {
            self.attributes
                .push((name, std::mem::take(&mut self.attribute_value)));
        } else {
            self.attribute_value.clear();
        }
        flow
    }

    fn on_comment(&mut self, text: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        self.set_span(span.start, span.end);
        let flow = self.handler.on_comment(text);
        flow.and(self.handler.on_comment_end())
    }

    fn on_cdata(&mut self, text: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        self.set_span(span.start, span.end);
        if self.recognize_cdata {
            let mut flow = self.handler.on_cdata_start();
            flow = flow.and(self.handler.on_text(text));
            flow.and(self.handler.on_cdata_end())
        } else {
            let data = format!("[CDATA[{text}]]");
            let flow = self.handler.on_comment(&data);
            flow.and(self.handler.on_comment_end())
        }
    }

    fn on_declaration(&mut self, text: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        self.set_span(span.start, span.end);
        self.handler.on_declaration(text)
    }

    fn on_processing_instruction(&mut self, text: &str, span: Span) -> Flow {
        if self.errored {
            return Flow::Continue;
        }
        self.set_span(span.start, span.end);
        let name = text
            .split(|c: char| c.is_ascii_whitespace())
            .next()
            .unwrap_or("");
        self.handler.on_processing_instruction(name, text)
    }

    fn on_error(&mut self, error: ParseError) {
        self.errored = true;
        self.handler.on_error(error);
    }

    fn on_end(&mut self, end: usize, line: usize) {
        if self.errored {
            return;
        }
        if self.strict_mode && !self.stack.is_empty() {
            self.report(ErrorKind::ClosingTagMissing, line);
            return;
        }
        self.set_span(end, end);
        while !self.stack.is_empty() {
            let popped = self.pop_element();
            let _ = self.handler.on_close_tag(&popped);
        }
        self.handler.on_end();
    }
}

/// Streaming push parser over a [`Handler`].
pub struct Parser<H: Handler> {
    tokenizer: Tokenizer<ParserSink<H>>,
}

impl<H: Handler> Parser<H> {
    pub fn new(mut handler: H, options: ParserOptions) -> Self {
        handler.on_parser_init();
        let sink = ParserSink {
            handler,
            xml_mode: options.xml_mode,
            lowercase_tags: options.lowercase_tags.unwrap_or(!options.xml_mode),
            lowercase_attribute_names: options
                .lowercase_attribute_names
                .unwrap_or(!options.xml_mode),
            recognize_cdata: options.recognize_cdata.unwrap_or(options.xml_mode),
            recognize_self_closing: options.recognize_self_closing.unwrap_or(options.xml_mode),
            strict_mode: options.strict_mode,
            stack: Vec::new(),
            foreign_context: Vec::new(),
            open_tag: None,
            tag_open_start: 0,
            attributes: Vec::new(),
            attribute_name: None,
            attribute_value: String::new(),
            start_index: 0,
            end_index: 0,
            errored: false,
        };
        let tokenizer_options = TokenizerOptions {
            xml_mode: options.xml_mode,
            decode_entities: options.decode_entities,
            strict_mode: options.strict_mode,
        };
        Self {
            tokenizer: Tokenizer::new(tokenizer_options, sink),
        }
    }

    /// Feed the next document fragment.
    pub fn write(&mut self, chunk: &str) {
        self.tokenizer.write(chunk);
    }

    /// Mark end of input; remaining open elements are closed (lenient) or
    /// reported (strict).
    pub fn end(&mut self) {
        self.tokenizer.end();
    }

    /// `write(chunk)` followed by `end()`.
    pub fn end_with(&mut self, chunk: &str) {
        self.tokenizer.write(chunk);
        self.tokenizer.end();
    }

    /// Reset and parse a complete document in one call.
    pub fn parse_complete(&mut self, data: &str) {
        self.reset();
        self.tokenizer.write(data);
        self.tokenizer.end();
    }

    /// Suspend event delivery at the next event boundary.
    pub fn pause(&mut self) {
        self.tokenizer.pause();
    }

    /// Resume a paused parser. A no-op when not paused.
    pub fn resume(&mut self) {
        self.tokenizer.resume();
    }

    /// Return to the freshly constructed state, keeping the handler.
    pub fn reset(&mut self) {
        self.tokenizer.sink_mut().handler.on_reset();
        self.tokenizer.sink_mut().reset_state();
        self.tokenizer.reset();
    }

    /// Start of the span of the last delivered event.
    pub fn start_index(&self) -> usize {
        self.tokenizer.sink().start_index
    }

    /// End of the span of the last delivered event, exclusive.
    pub fn end_index(&self) -> usize {
        self.tokenizer.sink().end_index
    }

    pub fn handler(&self) -> &H {
        &self.tokenizer.sink().handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.tokenizer.sink_mut().handler
    }

    pub fn into_handler(self) -> H {
        self.tokenizer.into_sink().handler
    }
}
