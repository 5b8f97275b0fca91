//! Incremental character-reference decoder.
//!
//! The decoder is a restartable state machine fed one character at a time,
//! so partial references survive `write` boundaries. Contract:
//! - `start(kind)` arms the decoder at an `&`; `consumed` counts from and
//!   including that `&`.
//! - `feed(ch)` returns `Continue` while the reference may still grow,
//!   `Emit` once it resolves (with the number of source bytes it replaces),
//!   or `Reject` when the text is not a reference and stands as written.
//! - `end()` flushes end-of-input state (pending numeric references in HTML
//!   mode, pending legacy named matches).
//! - Characters that continue a reference are always ASCII, so consumed
//!   counts are valid byte and character counts alike.
//!
//! Named references walk a byte-keyed trie with one node per prefix; nodes
//! carry an optional expansion (one or two code points) and a legacy flag
//! (HTML accepts the name without a trailing `;`). In attribute context the
//! ambiguous-ampersand rule additionally requires the character after a
//! semicolonless match to be neither alphanumeric nor `=`.

use std::sync::OnceLock;

mod table;

use table::{NAMED_ENTITIES, XML_ENTITIES};

/// Context a reference is decoded in; selects table and termination rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeKind {
    /// Document text in HTML mode: legacy names may omit the `;`.
    Legacy,
    /// Attribute values in HTML mode: the ambiguous-ampersand rule applies.
    Attribute,
    /// XML: the five predefined names only, `;` required everywhere.
    Strict,
}

/// Replacement text for one reference. At most two code points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    buf: [u8; 8],
    len: u8,
}

impl Decoded {
    fn from_str(s: &str) -> Self {
        debug_assert!(s.len() <= 8, "entity expansion longer than two code points");
        let mut buf = [0u8; 8];
        buf[..s.len()].copy_from_slice(s.as_bytes());
        Self {
            buf,
            len: s.len() as u8,
        }
    }

    fn from_char(ch: char) -> Self {
        let mut buf = [0u8; 8];
        let len = ch.encode_utf8(&mut buf).len() as u8;
        Self { buf, len }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len as usize])
            .expect("decoded entity text is valid UTF-8")
    }
}

/// Outcome of feeding one character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedResult {
    /// The reference may still grow; feed the next character.
    Continue,
    /// Resolved: `text` replaces `consumed` bytes starting at the `&`.
    /// The character that triggered resolution is not part of `consumed`
    /// unless it was the terminating `;`.
    Emit { text: Decoded, consumed: usize },
    /// Not a reference; the source text stands as written.
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeState {
    Idle,
    /// Just after `&`.
    Begin,
    /// Just after `&#`.
    NumericStart,
    /// Just after `&#x`; without a hex digit the whole prefix backs out.
    NumericHexStart,
    Numeric {
        hex: bool,
    },
    Named,
}

#[derive(Debug)]
pub struct EntityDecoder {
    state: DecodeState,
    kind: DecodeKind,
    /// Bytes accepted so far, including the `&`.
    consumed: usize,
    code: u32,
    node: usize,
    /// Longest legacy match seen on the current walk.
    best: Option<(Decoded, usize)>,
}

impl EntityDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Idle,
            kind: DecodeKind::Legacy,
            consumed: 0,
            code: 0,
            node: 0,
            best: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != DecodeState::Idle
    }

    /// Arm the decoder at an `&`.
    pub fn start(&mut self, kind: DecodeKind) {
        self.state = DecodeState::Begin;
        self.kind = kind;
        self.consumed = 1;
        self.code = 0;
        self.node = 0;
        self.best = None;
    }

    pub fn feed(&mut self, ch: char) -> FeedResult {
        let result = self.step(ch);
        if !matches!(result, FeedResult::Continue) {
            self.state = DecodeState::Idle;
        }
        result
    }

    /// Flush end-of-input state.
    pub fn end(&mut self) -> FeedResult {
        let result = match self.state {
            DecodeState::Numeric { .. } if self.kind != DecodeKind::Strict => FeedResult::Emit {
                text: Decoded::from_char(sanitize_code_point(self.code)),
                consumed: self.consumed,
            },
            DecodeState::Named => match self.best.take() {
                Some((text, consumed)) if self.kind != DecodeKind::Strict => {
                    FeedResult::Emit { text, consumed }
                }
                _ => FeedResult::Reject,
            },
            _ => FeedResult::Reject,
        };
        self.state = DecodeState::Idle;
        result
    }

    fn step(&mut self, ch: char) -> FeedResult {
        match self.state {
            DecodeState::Idle => {
                debug_assert!(false, "feed() on an idle entity decoder");
                FeedResult::Reject
            }
            DecodeState::Begin => {
                if ch == '#' {
                    self.state = DecodeState::NumericStart;
                    self.consumed += 1;
                    return FeedResult::Continue;
                }
                self.state = DecodeState::Named;
                self.walk(ch)
            }
            DecodeState::NumericStart => {
                if ch == 'x' || ch == 'X' {
                    self.state = DecodeState::NumericHexStart;
                    self.consumed += 1;
                    return FeedResult::Continue;
                }
                if let Some(digit) = ch.to_digit(10) {
                    self.state = DecodeState::Numeric { hex: false };
                    self.accumulate(digit, 10);
                    return FeedResult::Continue;
                }
                FeedResult::Reject
            }
            DecodeState::NumericHexStart => {
                if let Some(digit) = ch.to_digit(16) {
                    self.state = DecodeState::Numeric { hex: true };
                    self.accumulate(digit, 16);
                    return FeedResult::Continue;
                }
                // Back out: `&#x` without a digit is literal text.
                FeedResult::Reject
            }
            DecodeState::Numeric { hex } => {
                let radix = if hex { 16 } else { 10 };
                if let Some(digit) = ch.to_digit(radix) {
                    self.accumulate(digit, radix);
                    return FeedResult::Continue;
                }
                if ch == ';' {
                    return FeedResult::Emit {
                        text: Decoded::from_char(sanitize_code_point(self.code)),
                        consumed: self.consumed + 1,
                    };
                }
                if self.kind == DecodeKind::Strict {
                    // XML requires the terminator.
                    return FeedResult::Reject;
                }
                FeedResult::Emit {
                    text: Decoded::from_char(sanitize_code_point(self.code)),
                    consumed: self.consumed,
                }
            }
            DecodeState::Named => self.walk(ch),
        }
    }

    fn walk(&mut self, ch: char) -> FeedResult {
        let trie = self.trie();
        if ch == ';' {
            if let Some(expansion) = trie.expansion(self.node) {
                return FeedResult::Emit {
                    text: Decoded::from_str(expansion),
                    consumed: self.consumed + 1,
                };
            }
            // `;` after an expansion-less prefix fails like any other byte.
            return self.fail_named(ch);
        }
        if ch.is_ascii()
            && let Some(next) = trie.child(self.node, ch as u8)
        {
            self.node = next;
            self.consumed += 1;
            if self.kind != DecodeKind::Strict
                && trie.legacy(next)
                && let Some(expansion) = trie.expansion(next)
            {
                self.best = Some((Decoded::from_str(expansion), self.consumed));
            }
            return FeedResult::Continue;
        }
        self.fail_named(ch)
    }

    fn fail_named(&mut self, ch: char) -> FeedResult {
        let best = self.best.take();
        match self.kind {
            DecodeKind::Legacy => match best {
                Some((text, consumed)) => FeedResult::Emit { text, consumed },
                None => FeedResult::Reject,
            },
            DecodeKind::Attribute => match best {
                // Ambiguous ampersand: a semicolonless match only counts
                // when nothing was consumed past it and the next character
                // could not extend a query string.
                Some((text, consumed))
                    if consumed == self.consumed
                        && !ch.is_ascii_alphanumeric()
                        && ch != '=' =>
                {
                    FeedResult::Emit { text, consumed }
                }
                _ => FeedResult::Reject,
            },
            DecodeKind::Strict => FeedResult::Reject,
        }
    }

    fn accumulate(&mut self, digit: u32, radix: u32) {
        self.code = self.code.saturating_mul(radix).saturating_add(digit);
        self.consumed += 1;
    }

    fn trie(&self) -> &'static EntityTrie {
        match self.kind {
            DecodeKind::Strict => xml_trie(),
            _ => html_trie(),
        }
    }
}

impl Default for EntityDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a numeric reference code point to its replacement character.
fn sanitize_code_point(code: u32) -> char {
    if code == 0 || code > 0x10_FFFF || (0xD800..=0xDFFF).contains(&code) {
        return '\u{FFFD}';
    }
    if (0x80..=0x9F).contains(&code) {
        return WINDOWS_1252[(code - 0x80) as usize];
    }
    char::from_u32(code).unwrap_or('\u{FFFD}')
}

/// HTML replacement characters for the C1 control range 0x80..=0x9F.
const WINDOWS_1252: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Byte-keyed prefix trie over the named-reference table.
#[derive(Debug)]
struct TrieNode {
    ch: u8,
    expansion: Option<&'static str>,
    legacy: bool,
    /// Child node indices, sorted by their byte.
    children: Vec<u32>,
}

#[derive(Debug)]
pub(crate) struct EntityTrie {
    nodes: Vec<TrieNode>,
}

impl EntityTrie {
    fn build(entries: &[(&'static str, &'static str, bool)]) -> Self {
        let mut nodes = vec![TrieNode {
            ch: 0,
            expansion: None,
            legacy: false,
            children: Vec::new(),
        }];
        for &(name, expansion, legacy) in entries {
            debug_assert!(name.is_ascii(), "entity name must be ASCII: {name}");
            let mut node = 0usize;
            for &b in name.as_bytes() {
                let existing = nodes[node]
                    .children
                    .iter()
                    .copied()
                    .find(|&i| nodes[i as usize].ch == b);
                node = match existing {
                    Some(i) => i as usize,
                    None => {
                        let insert_at = nodes[node]
                            .children
                            .iter()
                            .position(|&i| nodes[i as usize].ch > b)
                            .unwrap_or(nodes[node].children.len());
                        let idx = nodes.len() as u32;
                        nodes.push(TrieNode {
                            ch: b,
                            expansion: None,
                            legacy: false,
                            children: Vec::new(),
                        });
                        nodes[node].children.insert(insert_at, idx);
                        idx as usize
                    }
                };
            }
            debug_assert!(
                nodes[node].expansion.is_none(),
                "duplicate entity name: {name}"
            );
            nodes[node].expansion = Some(expansion);
            nodes[node].legacy = legacy;
        }
        Self { nodes }
    }

    fn child(&self, node: usize, b: u8) -> Option<usize> {
        let children = &self.nodes[node].children;
        children
            .binary_search_by_key(&b, |&i| self.nodes[i as usize].ch)
            .ok()
            .map(|pos| children[pos] as usize)
    }

    fn expansion(&self, node: usize) -> Option<&'static str> {
        self.nodes[node].expansion
    }

    fn legacy(&self, node: usize) -> bool {
        self.nodes[node].legacy
    }
}

fn html_trie() -> &'static EntityTrie {
    static TRIE: OnceLock<EntityTrie> = OnceLock::new();
    TRIE.get_or_init(|| EntityTrie::build(NAMED_ENTITIES))
}

fn xml_trie() -> &'static EntityTrie {
    static TRIE: OnceLock<EntityTrie> = OnceLock::new();
    TRIE.get_or_init(|| EntityTrie::build(XML_ENTITIES))
}
