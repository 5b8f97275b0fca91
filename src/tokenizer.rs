//! Streaming markup tokenizer.
//!
//! A byte-driven state machine over an incrementally written buffer. Events
//! are delivered to a [`TokenSink`] as they are recognized; nothing is
//! buffered beyond the lexeme in progress.
//!
//! Invariants:
//! - Chunk-equivalence: `write(a); write(b)` produces the same event
//!   sequence as `write(ab)`; only the timing of delivery differs.
//! - `section_start <= index` whenever a section is open; the difference is
//!   the lexeme in progress.
//! - On reentry into `write`/`resume`, scanning continues exactly where the
//!   previous call left off; no byte is scanned twice, none is skipped.
//! - All indices are absolute byte offsets into the total input, so they
//!   survive compaction of the consumed buffer prefix.
//! - While paused, no events fire and no input is consumed.

use crate::entities::{DecodeKind, Decoded, EntityDecoder, FeedResult};
use crate::error::{ErrorKind, ParseError};
use crate::position::PositionTracker;
use memchr::{memchr, memchr2, memchr3};

/// Absolute half-open byte span into the total input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must be <= end");
        Self { start, end }
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// How an attribute value was written in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteKind {
    Double,
    Single,
    Unquoted,
    /// Attribute without `=`; the value is empty.
    NoValue,
}

/// Directive returned by event callbacks; checked after every delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Suspend scanning at this event boundary; `resume()` continues.
    Pause,
}

impl Flow {
    /// Combine two directives; a pause from either side wins.
    pub fn and(self, other: Flow) -> Flow {
        if self == Flow::Pause || other == Flow::Pause {
            Flow::Pause
        } else {
            Flow::Continue
        }
    }
}

/// Receiver for lexical events.
///
/// Spans are absolute and half-open. Text slices borrow from the input
/// buffer and are only valid for the duration of the call.
pub trait TokenSink {
    fn on_text(&mut self, _text: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    /// A decoded character reference in text context; `span` covers the
    /// source reference.
    fn on_text_entity(&mut self, _decoded: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    /// `span` covers the name only; the `<` sits at `span.start - 1`.
    fn on_open_tag_name(&mut self, _name: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    /// `end` is the offset just past the closing `>`.
    fn on_open_tag_end(&mut self, _end: usize) -> Flow {
        Flow::Continue
    }
    /// `/>` was seen; `end` is just past the `>`.
    fn on_self_closing_tag(&mut self, _end: usize) -> Flow {
        Flow::Continue
    }
    /// A complete closing tag; `span` covers `</name ... >`.
    fn on_close_tag(&mut self, _name: &str, _span: Span, _line: usize) -> Flow {
        Flow::Continue
    }
    fn on_attribute_name(&mut self, _name: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    /// A piece of the current attribute value; values with references
    /// arrive in several pieces.
    fn on_attribute_data(&mut self, _value: &str) -> Flow {
        Flow::Continue
    }
    fn on_attribute_entity(&mut self, _decoded: &str) -> Flow {
        Flow::Continue
    }
    /// The current attribute is complete.
    fn on_attribute_end(&mut self, _quote: QuoteKind, _end: usize) -> Flow {
        Flow::Continue
    }
    /// `text` is the comment body; `span` covers `<!-- ... -->`.
    fn on_comment(&mut self, _text: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    /// `text` is the section body; `span` covers `<![CDATA[ ... ]]>`.
    fn on_cdata(&mut self, _text: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    /// `text` is everything between `<!` and `>`.
    fn on_declaration(&mut self, _text: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    /// `text` is everything between `<?` and `>`.
    fn on_processing_instruction(&mut self, _text: &str, _span: Span) -> Flow {
        Flow::Continue
    }
    fn on_error(&mut self, _error: ParseError) {}
    /// End of input; `line` is the final line for diagnostics.
    fn on_end(&mut self, _end: usize, _line: usize) {}
}

#[derive(Clone, Debug)]
pub struct TokenizerOptions {
    /// XML lexical rules: strict entity set, no raw-text elements, any
    /// non-delimiter starts a tag name.
    pub xml_mode: bool,
    /// Decode character references in text and attribute values.
    pub decode_entities: bool,
    /// Validate lexical constraints and report violations via `on_error`.
    pub strict_mode: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            xml_mode: false,
            decode_entities: true,
            strict_mode: false,
        }
    }
}

impl TokenizerOptions {
    pub fn xml() -> Self {
        Self {
            xml_mode: true,
            ..Self::default()
        }
    }
}

/// Always-on instrumentation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    pub steps: u64,
    pub events_emitted: u64,
    pub bytes_consumed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Text,
    BeforeTagName,
    InTagName,
    BeforeClosingTagName,
    InClosingTagName,
    AfterClosingTagName,
    /// `</` followed by something that cannot be a name; body up to `>`
    /// becomes a comment.
    InSpecialComment,
    BeforeAttributeName,
    InAttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    InAttributeValueDq,
    InAttributeValueSq,
    InAttributeValueNq,
    SelfClosingTag,
    BeforeDeclaration,
    InDeclaration,
    InProcessingInstruction,
    BeforeComment,
    InComment,
    AfterCommentDash1,
    AfterCommentDash2,
    InCdataSequence,
    InCdata,
    AfterCdataBracket1,
    AfterCdataBracket2,
    /// Second letter of a tag name that may open `script`/`style`.
    BeforeSpecialS,
    /// Second letter of a tag name that may open `title`/`textarea`.
    BeforeSpecialT,
    /// Matching the remainder of a raw-text element name.
    SpecialStartSequence,
    /// Raw-text element body; only `</name` terminates it.
    InSpecialTag,
    /// Character reference in progress; orthogonal to `base_state`.
    InEntity,
}

const SEQ_CDATA: &[u8] = b"CDATA[";
const SEQ_SCRIPT_END: &[u8] = b"</script";
const SEQ_STYLE_END: &[u8] = b"</style";
const SEQ_TITLE_END: &[u8] = b"</title";
const SEQ_TEXTAREA_END: &[u8] = b"</textarea";

fn is_end_of_tag_section(c: char) -> bool {
    c == '/' || c == '>' || c.is_ascii_whitespace()
}

/// Entities are decoded inside `title`/`textarea` bodies but not inside
/// `script`/`style`.
fn special_decodes_entities(seq: &[u8]) -> bool {
    matches!(seq, b"</title" | b"</textarea")
}

/// Streaming tokenizer bound to a [`TokenSink`].
pub struct Tokenizer<S: TokenSink> {
    options: TokenizerOptions,
    sink: S,
    state: State,
    /// State to return to when the entity sub-machine resolves.
    base_state: State,
    /// Unconsumed input; `buffer_offset` is the absolute offset of byte 0.
    buffer: String,
    buffer_offset: usize,
    /// Absolute scan position.
    index: usize,
    /// Absolute start of the lexeme in progress.
    section_start: Option<usize>,
    /// Absolute offset of the `<` of the construct in progress.
    tag_start: Option<usize>,
    /// Name span of a closing tag awaiting its `>`.
    close_name: Option<Span>,
    /// Close sequence of the raw-text element in progress.
    special_sequence: Option<&'static [u8]>,
    sequence_index: usize,
    entity_decoder: EntityDecoder,
    entity_start: usize,
    paused: bool,
    ended: bool,
    trailing_emitted: bool,
    finished: bool,
    errored: bool,
    position: PositionTracker,
    stats: TokenizerStats,
}

impl<S: TokenSink> Tokenizer<S> {
    pub fn new(options: TokenizerOptions, sink: S) -> Self {
        Self {
            options,
            sink,
            state: State::Text,
            base_state: State::Text,
            buffer: String::new(),
            buffer_offset: 0,
            index: 0,
            section_start: None,
            tag_start: None,
            close_name: None,
            special_sequence: None,
            sequence_index: 0,
            entity_decoder: EntityDecoder::new(),
            entity_start: 0,
            paused: false,
            ended: false,
            trailing_emitted: false,
            finished: false,
            errored: false,
            position: PositionTracker::new(),
            stats: TokenizerStats::default(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Total bytes ever written.
    pub fn write_index(&self) -> usize {
        self.buffer_offset + self.buffer.len()
    }

    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    /// Append a fragment and scan as far as possible.
    pub fn write(&mut self, chunk: &str) {
        if self.ended {
            let line = self.position.line_at(self.write_index());
            self.sink
                .on_error(ParseError::new(ErrorKind::WriteAfterEnd, line));
            return;
        }
        self.buffer.push_str(chunk);
        if !self.paused {
            self.run();
            self.compact();
        }
    }

    /// Mark end of input. Remaining buffered input is drained unless the
    /// tokenizer is paused, in which case `resume()` completes the drain.
    pub fn end(&mut self) {
        if self.ended {
            let line = self.position.line_at(self.write_index());
            self.sink
                .on_error(ParseError::new(ErrorKind::EndAfterEnd, line));
            return;
        }
        self.ended = true;
        if !self.paused {
            self.drive_end();
        }
    }

    /// Suspend event delivery at the next event boundary.
    pub fn pause(&mut self) {
        if !self.finished {
            self.paused = true;
        }
    }

    /// Resume a paused tokenizer. A no-op when not paused.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        if self.errored || self.finished {
            return;
        }
        if self.ended {
            self.drive_end();
        } else {
            self.run();
            self.compact();
        }
    }

    /// Return to the freshly constructed state, keeping options and sink.
    pub fn reset(&mut self) {
        self.state = State::Text;
        self.base_state = State::Text;
        self.buffer.clear();
        self.buffer_offset = 0;
        self.index = 0;
        self.section_start = None;
        self.tag_start = None;
        self.close_name = None;
        self.special_sequence = None;
        self.sequence_index = 0;
        self.entity_decoder = EntityDecoder::new();
        self.entity_start = 0;
        self.paused = false;
        self.ended = false;
        self.trailing_emitted = false;
        self.finished = false;
        self.errored = false;
        self.position.reset();
        self.stats = TokenizerStats::default();
    }

    fn abs_end(&self) -> usize {
        self.buffer_offset + self.buffer.len()
    }

    fn current_char(&self) -> Option<char> {
        let rel = self.index - self.buffer_offset;
        self.buffer.get(rel..)?.chars().next()
    }

    fn run(&mut self) {
        loop {
            if self.paused || self.errored || self.finished {
                break;
            }
            let Some(c) = self.current_char() else { break };
            self.position.observe(c, self.index);
            self.stats.steps += 1;
            let before = self.index;
            self.dispatch(c);
            if self.index == before {
                self.index += c.len_utf8();
            } else if let Some(cur) = self.current_char() {
                // A state handler moved the cursor; it now rests on the
                // last processed character.
                self.index += cur.len_utf8();
            } else {
                break;
            }
        }
        self.stats.bytes_consumed = self.index as u64;
    }

    fn dispatch(&mut self, c: char) {
        match self.state {
            State::Text => self.step_text(c),
            State::BeforeTagName => self.step_before_tag_name(c),
            State::InTagName => self.step_in_tag_name(c),
            State::BeforeClosingTagName => self.step_before_closing_tag_name(c),
            State::InClosingTagName => self.step_in_closing_tag_name(c),
            State::AfterClosingTagName => self.step_after_closing_tag_name(c),
            State::InSpecialComment => self.step_in_special_comment(c),
            State::BeforeAttributeName => self.step_before_attribute_name(c),
            State::InAttributeName => self.step_in_attribute_name(c),
            State::AfterAttributeName => self.step_after_attribute_name(c),
            State::BeforeAttributeValue => self.step_before_attribute_value(c),
            State::InAttributeValueDq => self.step_in_attribute_value_quoted(c, b'"'),
            State::InAttributeValueSq => self.step_in_attribute_value_quoted(c, b'\''),
            State::InAttributeValueNq => self.step_in_attribute_value_unquoted(c),
            State::SelfClosingTag => self.step_self_closing_tag(c),
            State::BeforeDeclaration => self.step_before_declaration(c),
            State::InDeclaration => self.step_in_declaration(c),
            State::InProcessingInstruction => self.step_in_processing_instruction(c),
            State::BeforeComment => self.step_before_comment(c),
            State::InComment => self.step_in_comment(c),
            State::AfterCommentDash1 => self.step_after_comment_dash1(c),
            State::AfterCommentDash2 => self.step_after_comment_dash2(c),
            State::InCdataSequence => self.step_in_cdata_sequence(c),
            State::InCdata => self.step_in_cdata(c),
            State::AfterCdataBracket1 => self.step_after_cdata_bracket1(c),
            State::AfterCdataBracket2 => self.step_after_cdata_bracket2(c),
            State::BeforeSpecialS => self.step_before_special_s(c),
            State::BeforeSpecialT => self.step_before_special_t(c),
            State::SpecialStartSequence => self.step_special_start_sequence(c),
            State::InSpecialTag => self.step_in_special_tag(c),
            State::InEntity => self.step_in_entity(c),
        }
    }

    /// Fast-forward the cursor to the next occurrence of one of `targets`,
    /// starting at `from`. Leaves the cursor on the match and returns the
    /// matched byte, or consumes to the end of buffered input. Newlines in
    /// the skipped region are observed.
    fn fast_forward(&mut self, from: usize, targets: &[u8]) -> Option<u8> {
        let rel = from - self.buffer_offset;
        let found = {
            let bytes = &self.buffer.as_bytes()[rel..];
            match *targets {
                [a] => memchr(a, bytes),
                [a, b] => memchr2(a, b, bytes),
                [a, b, c] => memchr3(a, b, c, bytes),
                _ => unreachable!("fast_forward takes one to three targets"),
            }
        };
        match found {
            Some(off) => {
                self.position
                    .observe_region(&self.buffer.as_bytes()[rel..rel + off + 1], from);
                self.index = from + off;
                Some(self.buffer.as_bytes()[rel + off])
            }
            None => {
                self.position
                    .observe_region(&self.buffer.as_bytes()[rel..], from);
                self.index = self.abs_end();
                None
            }
        }
    }

    fn step_text(&mut self, c: char) {
        debug_assert_eq!(self.state, State::Text);
        let _ = c;
        if self.section_start.is_none() {
            self.section_start = Some(self.index);
        }
        let found = if self.options.decode_entities {
            self.fast_forward(self.index, b"<&")
        } else {
            self.fast_forward(self.index, b"<")
        };
        match found {
            Some(b'<') => {
                let sec = self.section_start.take().expect("text section open");
                self.emit_text(sec, self.index);
                self.begin_tag_open();
            }
            Some(_) => self.start_entity(),
            None => {}
        }
    }

    fn begin_tag_open(&mut self) {
        self.tag_start = Some(self.index);
        self.section_start = None;
        self.state = State::BeforeTagName;
    }

    fn is_tag_start_char(&self, c: char) -> bool {
        if self.options.xml_mode {
            !is_end_of_tag_section(c)
        } else {
            c.is_ascii_alphabetic()
        }
    }

    fn step_before_tag_name(&mut self, c: char) {
        if c == '!' {
            self.state = State::BeforeDeclaration;
            self.section_start = Some(self.index + 1);
        } else if c == '?' {
            self.state = State::InProcessingInstruction;
            self.section_start = Some(self.index + 1);
        } else if c == '/' {
            self.state = State::BeforeClosingTagName;
        } else if self.is_tag_start_char(c) {
            self.section_start = Some(self.index);
            if self.options.xml_mode {
                self.state = State::InTagName;
            } else {
                self.state = match c.to_ascii_lowercase() {
                    's' => State::BeforeSpecialS,
                    't' => State::BeforeSpecialT,
                    _ => State::InTagName,
                };
            }
        } else {
            // Not a tag after all; the `<` belongs to the text run.
            self.section_start = self.tag_start.take();
            self.state = State::Text;
            self.step_text(c);
        }
    }

    fn step_before_special_s(&mut self, c: char) {
        if c.is_ascii() {
            match c.to_ascii_lowercase() {
                'c' => return self.start_special(SEQ_SCRIPT_END),
                't' => return self.start_special(SEQ_STYLE_END),
                _ => {}
            }
        }
        self.state = State::InTagName;
        self.step_in_tag_name(c);
    }

    fn step_before_special_t(&mut self, c: char) {
        if c.is_ascii() {
            match c.to_ascii_lowercase() {
                'i' => return self.start_special(SEQ_TITLE_END),
                'e' => return self.start_special(SEQ_TEXTAREA_END),
                _ => {}
            }
        }
        self.state = State::InTagName;
        self.step_in_tag_name(c);
    }

    fn start_special(&mut self, sequence: &'static [u8]) {
        self.special_sequence = Some(sequence);
        // `</` plus the two letters already seen.
        self.sequence_index = 4;
        self.state = State::SpecialStartSequence;
    }

    fn step_special_start_sequence(&mut self, c: char) {
        let seq = self
            .special_sequence
            .expect("special sequence armed in SpecialStartSequence");
        if self.sequence_index == seq.len() {
            if !is_end_of_tag_section(c) {
                // Longer name, e.g. `<titles>`: an ordinary element.
                self.special_sequence = None;
            }
        } else if c.is_ascii() && (c as u8 | 0x20) == seq[self.sequence_index] {
            self.sequence_index += 1;
            return;
        } else {
            self.special_sequence = None;
        }
        self.sequence_index = 0;
        self.state = State::InTagName;
        self.step_in_tag_name(c);
    }

    fn step_in_tag_name(&mut self, c: char) {
        if is_end_of_tag_section(c) {
            let sec = self.section_start.take().expect("tag name section open");
            self.emit_open_tag_name(sec, self.index);
            self.state = State::BeforeAttributeName;
            self.step_before_attribute_name(c);
        } else if self.options.strict_mode && c == '<' {
            self.strict_error(ErrorKind::TagNameWithLt);
        } else if self.options.strict_mode && c == '&' {
            self.strict_error(ErrorKind::TagNameWithAmp);
        }
    }

    fn step_before_closing_tag_name(&mut self, c: char) {
        if c.is_ascii_whitespace() {
            // Skip.
        } else if c == '>' {
            // `</>` is dropped entirely.
            self.tag_start = None;
            self.section_start = None;
            self.state = State::Text;
        } else if self.is_tag_start_char(c) {
            self.section_start = Some(self.index);
            self.state = State::InClosingTagName;
        } else {
            self.section_start = Some(self.index);
            self.state = State::InSpecialComment;
        }
    }

    fn step_in_closing_tag_name(&mut self, c: char) {
        if c == '>' || c.is_ascii_whitespace() {
            let sec = self.section_start.take().expect("closing name section open");
            self.close_name = Some(Span::new(sec, self.index));
            self.state = State::AfterClosingTagName;
            self.step_after_closing_tag_name(c);
        } else if self.options.strict_mode && c == '<' {
            self.strict_error(ErrorKind::TagNameWithLt);
        } else if self.options.strict_mode && c == '&' {
            self.strict_error(ErrorKind::TagNameWithAmp);
        }
    }

    fn step_after_closing_tag_name(&mut self, c: char) {
        // Skip everything until `>`.
        if c == '>' || self.fast_forward(self.index, b">").is_some() {
            let name = self.close_name.take().expect("closing tag name recorded");
            let start = self.tag_start.take().expect("closing tag start recorded");
            self.emit_close_tag(name, Span::new(start, self.index + 1));
            self.section_start = None;
            self.state = State::Text;
        }
    }

    fn step_in_special_comment(&mut self, c: char) {
        if c == '>' || self.fast_forward(self.index, b">").is_some() {
            let sec = self.section_start.take().expect("comment section open");
            let start = self.tag_start.take().expect("comment start recorded");
            self.emit_comment(sec, self.index, Span::new(start, self.index + 1));
            self.state = State::Text;
        }
    }

    fn step_before_attribute_name(&mut self, c: char) {
        if c == '>' {
            self.finish_open_tag();
        } else if c == '/' {
            self.state = State::SelfClosingTag;
        } else if !c.is_ascii_whitespace() {
            self.section_start = Some(self.index);
            self.state = State::InAttributeName;
        }
    }

    fn finish_open_tag(&mut self) {
        self.emit_open_tag_end(self.index + 1);
        self.tag_start = None;
        self.section_start = None;
        self.sequence_index = 0;
        if self.special_sequence.is_some() {
            debug_assert!(!self.options.xml_mode, "no raw-text elements in XML mode");
            self.state = State::InSpecialTag;
        } else {
            self.state = State::Text;
        }
    }

    fn step_in_attribute_name(&mut self, c: char) {
        if c == '=' || is_end_of_tag_section(c) {
            let sec = self
                .section_start
                .take()
                .expect("attribute name section open");
            self.emit_attribute_name(sec, self.index);
            self.state = State::AfterAttributeName;
            self.step_after_attribute_name(c);
        } else if self.options.strict_mode && c == '<' {
            self.strict_error(ErrorKind::AttributeNameWithLt);
        } else if self.options.strict_mode && c == '&' {
            self.strict_error(ErrorKind::AttributeNameWithAmp);
        }
    }

    fn step_after_attribute_name(&mut self, c: char) {
        if c == '=' {
            self.state = State::BeforeAttributeValue;
        } else if c == '/' || c == '>' {
            self.emit_attribute_end(QuoteKind::NoValue, self.index);
            self.state = State::BeforeAttributeName;
            self.step_before_attribute_name(c);
        } else if !c.is_ascii_whitespace() {
            self.emit_attribute_end(QuoteKind::NoValue, self.index);
            self.section_start = Some(self.index);
            self.state = State::InAttributeName;
        }
    }

    fn step_before_attribute_value(&mut self, c: char) {
        if c == '"' {
            self.section_start = Some(self.index + 1);
            self.state = State::InAttributeValueDq;
        } else if c == '\'' {
            self.section_start = Some(self.index + 1);
            self.state = State::InAttributeValueSq;
        } else if !c.is_ascii_whitespace() {
            if self.options.strict_mode {
                if c == '>' {
                    self.strict_error(ErrorKind::AttributeValueMissing);
                } else {
                    self.strict_error(ErrorKind::AttributeValueUnquoted);
                }
                return;
            }
            self.section_start = Some(self.index);
            self.state = State::InAttributeValueNq;
            self.step_in_attribute_value_unquoted(c);
        }
    }

    fn step_in_attribute_value_quoted(&mut self, c: char, quote: u8) {
        let _ = c;
        let found = match (self.options.decode_entities, self.options.strict_mode) {
            (true, true) => self.fast_forward(self.index, &[quote, b'&', b'<']),
            (true, false) => self.fast_forward(self.index, &[quote, b'&']),
            (false, true) => self.fast_forward(self.index, &[quote, b'<']),
            (false, false) => self.fast_forward(self.index, &[quote]),
        };
        match found {
            Some(b'&') => self.start_entity(),
            Some(b'<') => self.strict_error(ErrorKind::UnescapedLtInAttributeValue),
            Some(q) => {
                debug_assert_eq!(q, quote);
                let sec = self
                    .section_start
                    .take()
                    .expect("attribute value section open");
                self.emit_attribute_data(sec, self.index);
                let kind = if quote == b'"' {
                    QuoteKind::Double
                } else {
                    QuoteKind::Single
                };
                self.emit_attribute_end(kind, self.index + 1);
                self.state = State::BeforeAttributeName;
            }
            None => {}
        }
    }

    fn step_in_attribute_value_unquoted(&mut self, c: char) {
        if c == '>' || c.is_ascii_whitespace() {
            let sec = self
                .section_start
                .take()
                .expect("attribute value section open");
            self.emit_attribute_data(sec, self.index);
            self.emit_attribute_end(QuoteKind::Unquoted, self.index);
            self.state = State::BeforeAttributeName;
            self.step_before_attribute_name(c);
        } else if self.options.decode_entities && c == '&' {
            self.start_entity();
        }
    }

    fn step_self_closing_tag(&mut self, c: char) {
        if c == '>' {
            self.emit_self_closing_tag(self.index + 1);
            self.tag_start = None;
            self.section_start = None;
            // A self-closed raw-text element has no body.
            self.special_sequence = None;
            self.sequence_index = 0;
            self.state = State::Text;
        } else if !c.is_ascii_whitespace() {
            self.state = State::BeforeAttributeName;
            self.step_before_attribute_name(c);
        }
    }

    fn step_before_declaration(&mut self, c: char) {
        match c {
            '[' => {
                self.sequence_index = 0;
                self.state = State::InCdataSequence;
            }
            '-' => self.state = State::BeforeComment,
            _ => {
                self.state = State::InDeclaration;
                self.step_in_declaration(c);
            }
        }
    }

    fn step_in_declaration(&mut self, c: char) {
        if c == '>' || self.fast_forward(self.index, b">").is_some() {
            let sec = self.section_start.take().expect("declaration section open");
            let start = self.tag_start.take().expect("declaration start recorded");
            self.emit_declaration(sec, self.index, Span::new(start, self.index + 1));
            self.state = State::Text;
        }
    }

    fn step_in_processing_instruction(&mut self, c: char) {
        if c == '>' || self.fast_forward(self.index, b">").is_some() {
            let sec = self.section_start.take().expect("instruction section open");
            let start = self.tag_start.take().expect("instruction start recorded");
            self.emit_processing_instruction(sec, self.index, Span::new(start, self.index + 1));
            self.state = State::Text;
        }
    }

    fn step_before_comment(&mut self, c: char) {
        if c == '-' {
            // Enter with both dashes pre-seen so `<!-->` closes immediately.
            self.section_start = Some(self.index + 1);
            self.state = State::AfterCommentDash2;
        } else {
            self.state = State::InDeclaration;
            self.step_in_declaration(c);
        }
    }

    fn step_in_comment(&mut self, c: char) {
        if c == '-' || self.fast_forward(self.index, b"-").is_some() {
            self.state = State::AfterCommentDash1;
        }
    }

    fn step_after_comment_dash1(&mut self, c: char) {
        self.state = if c == '-' {
            State::AfterCommentDash2
        } else {
            State::InComment
        };
    }

    fn step_after_comment_dash2(&mut self, c: char) {
        if c == '>' {
            let sec = self.section_start.take().expect("comment section open");
            let start = self.tag_start.take().expect("comment start recorded");
            // Short comments (`<!-->`, `<!--->`) clamp to an empty body.
            let content_end = self.index.saturating_sub(2).max(sec);
            self.emit_comment(sec, content_end, Span::new(start, self.index + 1));
            self.state = State::Text;
        } else if c != '-' {
            // `-->` may be preceded by extra dashes; anything else reverts.
            self.state = State::InComment;
        }
    }

    fn step_in_cdata_sequence(&mut self, c: char) {
        if c.is_ascii() && c as u8 == SEQ_CDATA[self.sequence_index] {
            self.sequence_index += 1;
            if self.sequence_index == SEQ_CDATA.len() {
                self.sequence_index = 0;
                self.section_start = Some(self.index + 1);
                self.state = State::InCdata;
            }
        } else {
            self.sequence_index = 0;
            self.state = State::InDeclaration;
            self.step_in_declaration(c);
        }
    }

    fn step_in_cdata(&mut self, c: char) {
        if c == ']' || self.fast_forward(self.index, b"]").is_some() {
            self.state = State::AfterCdataBracket1;
        }
    }

    fn step_after_cdata_bracket1(&mut self, c: char) {
        self.state = if c == ']' {
            State::AfterCdataBracket2
        } else {
            State::InCdata
        };
    }

    fn step_after_cdata_bracket2(&mut self, c: char) {
        if c == '>' {
            let sec = self.section_start.take().expect("cdata section open");
            let start = self.tag_start.take().expect("cdata start recorded");
            let content_end = self.index.saturating_sub(2).max(sec);
            self.emit_cdata(sec, content_end, Span::new(start, self.index + 1));
            self.state = State::Text;
        } else if c != ']' {
            // `]]>` may be preceded by extra brackets.
            self.state = State::InCdata;
        }
    }

    fn step_in_special_tag(&mut self, c: char) {
        let seq = self
            .special_sequence
            .expect("special sequence armed in InSpecialTag");
        if self.section_start.is_none() {
            self.section_start = Some(self.index);
        }
        if self.sequence_index == seq.len() {
            if c == '>' || c == '/' || c.is_ascii_whitespace() {
                let end_of_text = self.index - seq.len();
                let sec = self.section_start.take().expect("raw-text section open");
                self.emit_text(sec, end_of_text);
                // `</` sits at the start of the matched sequence.
                self.tag_start = Some(end_of_text);
                self.close_name = Some(Span::new(end_of_text + 2, self.index));
                self.special_sequence = None;
                self.sequence_index = 0;
                self.state = State::AfterClosingTagName;
                self.step_after_closing_tag_name(c);
                return;
            }
            self.sequence_index = 0;
        }
        if c.is_ascii() && (c as u8 | 0x20) == seq[self.sequence_index] {
            self.sequence_index += 1;
        } else if self.sequence_index == 0 {
            if special_decodes_entities(seq) && self.options.decode_entities {
                match self.fast_forward(self.index, b"<&") {
                    Some(b'&') => self.start_entity(),
                    Some(_) => self.sequence_index = 1,
                    None => {}
                }
            } else if self.fast_forward(self.index, b"<").is_some() {
                self.sequence_index = 1;
            }
        } else {
            // A failed partial match may itself open a new one: `<</script`.
            self.sequence_index = usize::from(c == '<');
        }
    }

    fn start_entity(&mut self) {
        debug_assert!(self.options.decode_entities);
        let kind = if self.options.xml_mode {
            DecodeKind::Strict
        } else if matches!(
            self.state,
            State::InAttributeValueDq | State::InAttributeValueSq | State::InAttributeValueNq
        ) {
            DecodeKind::Attribute
        } else {
            DecodeKind::Legacy
        };
        self.base_state = self.state;
        self.state = State::InEntity;
        self.entity_start = self.index;
        self.entity_decoder.start(kind);
    }

    fn step_in_entity(&mut self, c: char) {
        match self.entity_decoder.feed(c) {
            FeedResult::Continue => {}
            FeedResult::Emit { text, consumed } => {
                self.resolve_entity(text, consumed);
                // Rest on the last consumed byte; the loop advances past it.
                self.index = self.entity_start + consumed - 1;
            }
            FeedResult::Reject => self.reject_entity(),
        }
    }

    /// Deliver a resolved reference in the context it was started from.
    fn resolve_entity(&mut self, text: Decoded, consumed: usize) {
        let start = self.entity_start;
        let end = start + consumed;
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "markup.tokenizer",
            "entity {:?} consumed {} at {}",
            text.as_str(),
            consumed,
            start
        );
        self.state = self.base_state;
        match self.base_state {
            State::Text | State::InSpecialTag => {
                if let Some(sec) = self.section_start
                    && sec < start
                {
                    self.emit_text(sec, start);
                }
                self.emit_text_entity(text, Span::new(start, end));
                self.section_start = Some(end);
            }
            State::InAttributeValueDq | State::InAttributeValueSq | State::InAttributeValueNq => {
                if let Some(sec) = self.section_start
                    && sec < start
                {
                    self.emit_attribute_data(sec, start);
                }
                self.emit_attribute_entity(text);
                self.section_start = Some(end);
            }
            _ => debug_assert!(false, "entity resolved in state {:?}", self.base_state),
        }
    }

    /// The text was not a reference; rescan it as ordinary input.
    fn reject_entity(&mut self) {
        self.state = self.base_state;
        if self.options.strict_mode && self.options.xml_mode && self.named_entity_started() {
            self.strict_error(ErrorKind::UnrecognizedEntity);
            return;
        }
        // The section still covers the `&`; everything after it is
        // reprocessed by the base state.
        self.index = self.entity_start;
    }

    fn named_entity_started(&self) -> bool {
        let rel = self.entity_start + 1 - self.buffer_offset;
        self.buffer
            .as_bytes()
            .get(rel)
            .is_some_and(|b| b.is_ascii_alphabetic())
    }

    fn strict_error(&mut self, kind: ErrorKind) {
        debug_assert!(self.options.strict_mode);
        let line = self.position.line_at(self.index);
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "markup.tokenizer", "strict error {kind:?} at line {line}");
        self.errored = true;
        self.sink.on_error(ParseError::new(kind, line));
    }

    /// Drain and finish after `end()`; resumable across pauses.
    fn drive_end(&mut self) {
        debug_assert!(self.ended);
        if self.finished || self.errored {
            return;
        }
        self.run();
        if self.paused || self.errored {
            return;
        }
        if !self.trailing_emitted {
            self.trailing_emitted = true;
            self.flush_trailing();
            if self.errored {
                return;
            }
        }
        if self.options.strict_mode && self.state != State::Text {
            self.strict_error(ErrorKind::ClosingTagMissing);
            return;
        }
        if self.paused {
            return;
        }
        self.finished = true;
        let end = self.abs_end();
        let line = self.position.line_at(end);
        self.sink.on_end(end, line);
    }

    fn flush_trailing(&mut self) {
        if self.state == State::InEntity {
            match self.entity_decoder.end() {
                FeedResult::Emit { text, consumed } => self.resolve_entity(text, consumed),
                _ => {
                    self.state = self.base_state;
                    if self.options.strict_mode
                        && self.options.xml_mode
                        && self.named_entity_started()
                    {
                        self.strict_error(ErrorKind::UnrecognizedEntity);
                        return;
                    }
                }
            }
        }
        let end = self.abs_end();
        match self.state {
            State::InComment | State::AfterCommentDash1 | State::AfterCommentDash2 => {
                let sec = self.section_start.take().expect("comment section open");
                let start = self.tag_start.take().expect("comment start recorded");
                self.emit_comment(sec, end, Span::new(start, end));
            }
            State::InCdata | State::AfterCdataBracket1 | State::AfterCdataBracket2 => {
                let sec = self.section_start.take().expect("cdata section open");
                let start = self.tag_start.take().expect("cdata start recorded");
                self.emit_cdata(sec, end, Span::new(start, end));
            }
            // An unfinished tag is dropped without events.
            State::InTagName
            | State::InClosingTagName
            | State::InAttributeName
            | State::InAttributeValueDq
            | State::InAttributeValueSq
            | State::InAttributeValueNq => {}
            State::BeforeTagName | State::BeforeClosingTagName => {
                if let Some(start) = self.tag_start.take() {
                    self.emit_text(start, end);
                }
            }
            _ => {
                if let Some(sec) = self.section_start.take()
                    && sec < end
                {
                    self.emit_text(sec, end);
                }
            }
        }
    }

    /// Drop the consumed buffer prefix. Only offsets below every live
    /// section are discarded, so lexemes never straddle a hole.
    fn compact(&mut self) {
        let mut floor = self.index.min(self.abs_end());
        if let Some(sec) = self.section_start {
            floor = floor.min(sec);
        }
        if let Some(start) = self.tag_start {
            floor = floor.min(start);
        }
        if self.entity_decoder.is_active() {
            floor = floor.min(self.entity_start);
        }
        debug_assert!(floor >= self.buffer_offset, "floor below retained buffer");
        let cut = floor - self.buffer_offset;
        if cut > 0 {
            self.buffer.drain(..cut);
            self.buffer_offset = floor;
            self.position.prune_below(floor);
        }
    }

    fn note_flow(&mut self, flow: Flow) {
        self.stats.events_emitted += 1;
        if flow == Flow::Pause {
            self.paused = true;
        }
    }

    fn emit_text(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let text = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_text(text, Span::new(start, end));
        self.note_flow(flow);
    }

    fn emit_text_entity(&mut self, text: Decoded, span: Span) {
        let flow = self.sink.on_text_entity(text.as_str(), span);
        self.note_flow(flow);
    }

    fn emit_open_tag_name(&mut self, start: usize, end: usize) {
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let name = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_open_tag_name(name, Span::new(start, end));
        self.note_flow(flow);
    }

    fn emit_open_tag_end(&mut self, end: usize) {
        let flow = self.sink.on_open_tag_end(end);
        self.note_flow(flow);
    }

    fn emit_self_closing_tag(&mut self, end: usize) {
        let flow = self.sink.on_self_closing_tag(end);
        self.note_flow(flow);
    }

    fn emit_close_tag(&mut self, name: Span, span: Span) {
        let line = self.position.line_at(span.start);
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let text = &buffer[name.start - *buffer_offset..name.end - *buffer_offset];
        let flow = sink.on_close_tag(text, span, line);
        self.note_flow(flow);
    }

    fn emit_attribute_name(&mut self, start: usize, end: usize) {
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let name = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_attribute_name(name, Span::new(start, end));
        self.note_flow(flow);
    }

    fn emit_attribute_data(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let value = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_attribute_data(value);
        self.note_flow(flow);
    }

    fn emit_attribute_entity(&mut self, text: Decoded) {
        let flow = self.sink.on_attribute_entity(text.as_str());
        self.note_flow(flow);
    }

    fn emit_attribute_end(&mut self, quote: QuoteKind, end: usize) {
        let flow = self.sink.on_attribute_end(quote, end);
        self.note_flow(flow);
    }

    fn emit_comment(&mut self, start: usize, end: usize, span: Span) {
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let text = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_comment(text, span);
        self.note_flow(flow);
    }

    fn emit_cdata(&mut self, start: usize, end: usize, span: Span) {
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let text = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_cdata(text, span);
        self.note_flow(flow);
    }

    fn emit_declaration(&mut self, start: usize, end: usize, span: Span) {
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let text = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_declaration(text, span);
        self.note_flow(flow);
    }

    fn emit_processing_instruction(&mut self, start: usize, end: usize, span: Span) {
        let Self {
            buffer,
            buffer_offset,
            sink,
            ..
        } = self;
        let text = &buffer[start - *buffer_offset..end - *buffer_offset];
        let flow = sink.on_processing_instruction(text, span);
        self.note_flow(flow);
    }
}

#[cfg(test)]
mod tests {
    use super::{Flow, QuoteKind, Span, TokenSink, Tokenizer, TokenizerOptions};
    use crate::error::ParseError;

    /// Records every event as a display string for snapshot comparisons.
    #[derive(Default)]
    struct CollectSink {
        events: Vec<String>,
        spans: Vec<Span>,
        pause_on_text: bool,
    }

    impl TokenSink for CollectSink {
        fn on_text(&mut self, text: &str, span: Span) -> Flow {
            self.events.push(format!("text({text})"));
            self.spans.push(span);
            if self.pause_on_text {
                Flow::Pause
            } else {
                Flow::Continue
            }
        }
        fn on_text_entity(&mut self, decoded: &str, span: Span) -> Flow {
            self.events.push(format!("text({decoded})"));
            self.spans.push(span);
            if self.pause_on_text {
                Flow::Pause
            } else {
                Flow::Continue
            }
        }
        fn on_open_tag_name(&mut self, name: &str, span: Span) -> Flow {
            self.events.push(format!("open-name({name})"));
            self.spans.push(span);
            Flow::Continue
        }
        fn on_open_tag_end(&mut self, _end: usize) -> Flow {
            self.events.push("open-end".to_string());
            Flow::Continue
        }
        fn on_self_closing_tag(&mut self, _end: usize) -> Flow {
            self.events.push("self-close".to_string());
            Flow::Continue
        }
        fn on_close_tag(&mut self, name: &str, span: Span, _line: usize) -> Flow {
            self.events.push(format!("close({name})"));
            self.spans.push(span);
            Flow::Continue
        }
        fn on_attribute_name(&mut self, name: &str, span: Span) -> Flow {
            self.events.push(format!("attr-name({name})"));
            self.spans.push(span);
            Flow::Continue
        }
        fn on_attribute_data(&mut self, value: &str) -> Flow {
            self.events.push(format!("attr-data({value})"));
            Flow::Continue
        }
        fn on_attribute_entity(&mut self, decoded: &str) -> Flow {
            self.events.push(format!("attr-data({decoded})"));
            Flow::Continue
        }
        fn on_attribute_end(&mut self, quote: QuoteKind, _end: usize) -> Flow {
            self.events.push(format!("attr-end({quote:?})"));
            Flow::Continue
        }
        fn on_comment(&mut self, text: &str, span: Span) -> Flow {
            self.events.push(format!("comment({text})"));
            self.spans.push(span);
            Flow::Continue
        }
        fn on_cdata(&mut self, text: &str, span: Span) -> Flow {
            self.events.push(format!("cdata({text})"));
            self.spans.push(span);
            Flow::Continue
        }
        fn on_declaration(&mut self, text: &str, span: Span) -> Flow {
            self.events.push(format!("declaration({text})"));
            self.spans.push(span);
            Flow::Continue
        }
        fn on_processing_instruction(&mut self, text: &str, span: Span) -> Flow {
            self.events.push(format!("pi({text})"));
            self.spans.push(span);
            Flow::Continue
        }
        fn on_error(&mut self, error: ParseError) {
            self.events.push(format!("error({error})"));
        }
        fn on_end(&mut self, _end: usize, _line: usize) {
            self.events.push("end".to_string());
        }
    }

    fn tokenize(options: TokenizerOptions, input: &str) -> Vec<String> {
        let mut tokenizer = Tokenizer::new(options, CollectSink::default());
        tokenizer.write(input);
        tokenizer.end();
        tokenizer.into_sink().events
    }

    fn tokenize_split(options: TokenizerOptions, input: &str, split: usize) -> Vec<String> {
        let mut tokenizer = Tokenizer::new(options, CollectSink::default());
        tokenizer.write(&input[..split]);
        tokenizer.write(&input[split..]);
        tokenizer.end();
        tokenizer.into_sink().events
    }

    #[test]
    fn tokenizes_a_simple_document() {
        let events = tokenize(
            TokenizerOptions::default(),
            "<!DOCTYPE html><div class=\"box\">Hi</div>",
        );
        assert_eq!(
            events,
            [
                "declaration(DOCTYPE html)",
                "open-name(div)",
                "attr-name(class)",
                "attr-data(box)",
                "attr-end(Double)",
                "open-end",
                "text(Hi)",
                "close(div)",
                "end",
            ]
        );
    }

    #[test]
    fn raw_text_element_body_is_not_markup() {
        let events = tokenize(TokenizerOptions::default(), "<script><div></div></script>");
        assert_eq!(
            events,
            [
                "open-name(script)",
                "open-end",
                "text(<div></div>)",
                "close(script)",
                "end",
            ]
        );
    }

    #[test]
    fn raw_text_close_tag_matches_case_insensitively() {
        let events = tokenize(TokenizerOptions::default(), "<SCRIPT>let x;</ScRiPt >");
        assert_eq!(
            events,
            [
                "open-name(SCRIPT)",
                "open-end",
                "text(let x;)",
                "close(ScRiPt)",
                "end",
            ]
        );
    }

    #[test]
    fn raw_text_near_matches_stay_text() {
        let events = tokenize(TokenizerOptions::default(), "<script>a</scriptx>b</script>");
        assert_eq!(
            events,
            [
                "open-name(script)",
                "open-end",
                "text(a</scriptx>b)",
                "close(script)",
                "end",
            ]
        );
    }

    #[test]
    fn self_closed_special_tag_skips_the_raw_text_body() {
        let events = tokenize(TokenizerOptions::default(), "<style />&apos;<br/>");
        assert_eq!(
            events,
            [
                "open-name(style)",
                "self-close",
                "text(')",
                "open-name(br)",
                "self-close",
                "end",
            ]
        );
    }

    #[test]
    fn rcdata_decodes_entities_but_raw_text_does_not() {
        let events = tokenize(TokenizerOptions::default(), "<title>a&amp;b</title>");
        assert_eq!(
            events,
            [
                "open-name(title)",
                "open-end",
                "text(a)",
                "text(&)",
                "text(b)",
                "close(title)",
                "end",
            ]
        );
        let events = tokenize(TokenizerOptions::default(), "<style>a&amp;b</style>");
        assert_eq!(
            events,
            [
                "open-name(style)",
                "open-end",
                "text(a&amp;b)",
                "close(style)",
                "end",
            ]
        );
    }

    #[test]
    fn numeric_entity_backout_is_literal_text() {
        let events = tokenize(TokenizerOptions::default(), "id=770&#anchor");
        assert_eq!(events, ["text(id=770&#anchor)", "end"]);
    }

    #[test]
    fn legacy_entity_emits_without_semicolon() {
        let events = tokenize(TokenizerOptions::default(), "&timesbar;&timesbar");
        assert_eq!(events, ["text(⨱)", "text(⨱)", "end"]);
    }

    #[test]
    fn ambiguous_ampersand_preserves_query_strings() {
        let events = tokenize(
            TokenizerOptions::default(),
            "<img src=\"?&image_uri=1&&image;=2&image=3\"/>",
        );
        assert_eq!(
            events,
            [
                "open-name(img)",
                "attr-name(src)",
                "attr-data(?&image_uri=1&&image;=2&image=3)",
                "attr-end(Double)",
                "self-close",
                "end",
            ]
        );
    }

    #[test]
    fn entity_state_survives_chunk_boundaries() {
        let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), CollectSink::default());
        tokenizer.write("&am");
        tokenizer.write("p; it up!");
        tokenizer.end();
        let events = tokenizer.into_sink().events;
        assert_eq!(events, ["text(&)", "text( it up!)", "end"]);
    }

    #[test]
    fn comments_and_cdata_use_their_dash_and_bracket_states() {
        let events = tokenize(
            TokenizerOptions::default(),
            "<!--a-b--><!----><![CDATA[x]]y]]>",
        );
        assert_eq!(events, ["comment(a-b)", "comment()", "cdata(x]]y)", "end"]);
    }

    #[test]
    fn long_dash_runs_close_comments() {
        let events = tokenize(TokenizerOptions::default(), "<!--x--->");
        assert_eq!(events, ["comment(x-)", "end"]);
    }

    #[test]
    fn processing_instruction_and_declaration_are_distinct() {
        let events = tokenize(TokenizerOptions::default(), "<?php echo?><!bar>");
        assert_eq!(events, ["pi(php echo?)", "declaration(bar)", "end"]);
    }

    #[test]
    fn unterminated_comment_is_flushed_at_end() {
        let events = tokenize(TokenizerOptions::default(), "<!--never closed");
        assert_eq!(events, ["comment(never closed)", "end"]);
    }

    #[test]
    fn unfinished_tags_are_dropped_at_end() {
        assert_eq!(
            tokenize(TokenizerOptions::default(), "a<div"),
            ["text(a)", "end"]
        );
        assert_eq!(
            tokenize(TokenizerOptions::default(), "a<"),
            ["text(a)", "text(<)", "end"]
        );
    }

    #[test]
    fn xml_mode_has_no_raw_text_elements() {
        let events = tokenize(TokenizerOptions::xml(), "<script><x/></script>");
        assert_eq!(
            events,
            [
                "open-name(script)",
                "open-end",
                "open-name(x)",
                "self-close",
                "close(script)",
                "end",
            ]
        );
    }

    #[test]
    fn xml_mode_decodes_only_the_predefined_entities() {
        let events = tokenize(TokenizerOptions::xml(), "&lt;&nbsp;&gt;");
        assert_eq!(events, ["text(<)", "text(&nbsp;)", "text(>)", "end"]);
    }

    #[test]
    fn entities_can_be_disabled() {
        let options = TokenizerOptions {
            decode_entities: false,
            ..TokenizerOptions::default()
        };
        let events = tokenize(options, "a&amp;b");
        assert_eq!(events, ["text(a&amp;b)", "end"]);
    }

    #[test]
    fn strict_mode_reports_the_line_of_the_offense() {
        let options = TokenizerOptions {
            strict_mode: true,
            ..TokenizerOptions::default()
        };
        let events = tokenize(options, "<html>\n<b&ody>what is up?</b&ody>");
        assert_eq!(
            events,
            [
                "open-name(html)",
                "open-end",
                "text(\n)",
                "error(Element name cannot include '&'. Line 2)",
            ]
        );
    }

    #[test]
    fn strict_mode_validates_attribute_values() {
        let options = TokenizerOptions {
            strict_mode: true,
            ..TokenizerOptions::default()
        };
        let events = tokenize(options.clone(), "<a x=1>");
        assert_eq!(
            events,
            [
                "open-name(a)",
                "attr-name(x)",
                "error(Attribute value must be in quotes. Line 1)",
            ]
        );
        let events = tokenize(options.clone(), "<a x=>");
        assert_eq!(
            events,
            [
                "open-name(a)",
                "attr-name(x)",
                "error(Attribute value is missing. Line 1)",
            ]
        );
        let events = tokenize(options, "<a x=\"1<2\">");
        assert_eq!(
            events,
            [
                "open-name(a)",
                "attr-name(x)",
                "error(Unescaped '<' not allowed in attributes values. Line 1)",
            ]
        );
    }

    #[test]
    fn write_after_end_is_reported() {
        let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), CollectSink::default());
        tokenizer.write("x");
        tokenizer.end();
        tokenizer.write("y");
        tokenizer.end();
        let events = tokenizer.into_sink().events;
        assert_eq!(
            events,
            [
                "text(x)",
                "end",
                "error(.write() after done! Line 1)",
                "error(.end() after done! Line 1)",
            ]
        );
    }

    #[test]
    fn pause_suspends_at_the_event_boundary() {
        let sink = CollectSink {
            pause_on_text: true,
            ..CollectSink::default()
        };
        let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), sink);
        tokenizer.write("a<b>c</b>");
        assert_eq!(tokenizer.sink().events, ["text(a)"]);
        tokenizer.resume();
        assert_eq!(
            tokenizer.sink().events,
            ["text(a)", "open-name(b)", "open-end", "text(c)"]
        );
        tokenizer.resume();
        tokenizer.end();
        let events = tokenizer.into_sink().events;
        assert_eq!(
            events,
            [
                "text(a)",
                "open-name(b)",
                "open-end",
                "text(c)",
                "close(b)",
                "end"
            ]
        );
    }

    #[test]
    fn resume_when_not_paused_is_a_no_op() {
        let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), CollectSink::default());
        tokenizer.write("a");
        tokenizer.resume();
        tokenizer.end();
        assert_eq!(tokenizer.into_sink().events, ["text(a)", "end"]);
    }

    #[test]
    fn every_split_point_produces_identical_events() {
        let input = "<!DOCTYPE html><!--c--><div class=one data-x=\"y&amp;z\">Hi &amp; bye\
                     <script>let x = 1;</script><title>a&lt;b</title>é</div>";
        let whole = tokenize(TokenizerOptions::default(), input);
        for split in 0..=input.len() {
            if !input.is_char_boundary(split) {
                continue;
            }
            let chunked = tokenize_split(TokenizerOptions::default(), input, split);
            assert_eq!(
                whole, chunked,
                "split at byte {split} must match whole-input tokenization"
            );
        }
    }

    #[test]
    fn spans_are_ordered_and_bounded() {
        let input = "<p a=1>x&amp;y</p><!--c--><![CDATA[d]]>";
        let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), CollectSink::default());
        tokenizer.write(input);
        tokenizer.end();
        let sink = tokenizer.into_sink();
        for span in &sink.spans {
            assert!(span.start <= span.end, "span out of order: {span:?}");
            assert!(span.end <= input.len(), "span past input: {span:?}");
        }
    }

    #[test]
    fn compaction_keeps_open_sections_intact() {
        let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), CollectSink::default());
        // Leave a text section open across many writes; the open lexeme
        // must survive prefix compaction.
        tokenizer.write("<div>");
        for _ in 0..100 {
            tokenizer.write("word ");
        }
        tokenizer.write("</div>");
        tokenizer.end();
        let events = tokenizer.into_sink().events;
        assert_eq!(events.first().map(String::as_str), Some("open-name(div)"));
        let text = events
            .iter()
            .find(|e| e.starts_with("text("))
            .expect("text event");
        assert_eq!(text.len(), "text()".len() + 500);
        assert_eq!(events.last().map(String::as_str), Some("end"));
    }
}
