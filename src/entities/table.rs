//! Named character reference table.
//!
//! Entries are `(name, expansion, legacy)`: the reference name without the
//! leading `&` or trailing `;`, the replacement text (one or two code
//! points), and whether HTML accepts the name without a terminating `;`.
//!
//! This is a curated table; the full WHATWG set (~2,200 entries) has the
//! same shape and can be dropped in without touching the decoder.

pub(crate) const NAMED_ENTITIES: &[(&str, &str, bool)] = &[
    // Predefined XML five (HTML treats the lowercase forms as legacy).
    ("amp", "&", true),
    ("AMP", "&", true),
    ("lt", "<", true),
    ("LT", "<", true),
    ("gt", ">", true),
    ("GT", ">", true),
    ("quot", "\"", true),
    ("QUOT", "\"", true),
    ("apos", "'", false),
    // Latin-1 letters.
    ("AElig", "Æ", true),
    ("Aacute", "Á", true),
    ("Agrave", "À", true),
    ("Auml", "Ä", true),
    ("Ccedil", "Ç", true),
    ("Eacute", "É", true),
    ("Egrave", "È", true),
    ("Ntilde", "Ñ", true),
    ("Ouml", "Ö", true),
    ("Uuml", "Ü", true),
    ("aacute", "á", true),
    ("aelig", "æ", true),
    ("agrave", "à", true),
    ("auml", "ä", true),
    ("ccedil", "ç", true),
    ("eacute", "é", true),
    ("egrave", "è", true),
    ("ntilde", "ñ", true),
    ("ouml", "ö", true),
    ("szlig", "ß", true),
    ("thorn", "þ", true),
    ("uuml", "ü", true),
    ("yuml", "ÿ", true),
    // Latin-1 punctuation and symbols.
    ("brvbar", "¦", true),
    ("cedil", "¸", true),
    ("cent", "¢", true),
    ("copy", "©", true),
    ("COPY", "©", true),
    ("curren", "¤", true),
    ("deg", "°", true),
    ("divide", "÷", true),
    ("frac12", "½", true),
    ("frac14", "¼", true),
    ("frac34", "¾", true),
    ("iexcl", "¡", true),
    ("iquest", "¿", true),
    ("laquo", "«", true),
    ("macr", "¯", true),
    ("micro", "µ", true),
    ("middot", "·", true),
    ("nbsp", "\u{00A0}", true),
    ("not", "¬", true),
    ("ordf", "ª", true),
    ("ordm", "º", true),
    ("para", "¶", true),
    ("plusmn", "±", true),
    ("pound", "£", true),
    ("raquo", "»", true),
    ("reg", "®", true),
    ("REG", "®", true),
    ("sect", "§", true),
    ("shy", "\u{00AD}", true),
    ("sup1", "¹", true),
    ("sup2", "²", true),
    ("sup3", "³", true),
    ("times", "×", true),
    ("uml", "¨", true),
    ("yen", "¥", true),
    // General punctuation and typography (semicolon required).
    ("bull", "•", false),
    ("dagger", "†", false),
    ("Dagger", "‡", false),
    ("emsp", "\u{2003}", false),
    ("ensp", "\u{2002}", false),
    ("euro", "€", false),
    ("hellip", "…", false),
    ("ldquo", "\u{201C}", false),
    ("lsaquo", "‹", false),
    ("lsquo", "\u{2018}", false),
    ("mdash", "—", false),
    ("ndash", "–", false),
    ("oline", "‾", false),
    ("permil", "‰", false),
    ("rdquo", "\u{201D}", false),
    ("rsaquo", "›", false),
    ("rsquo", "\u{2019}", false),
    ("thinsp", "\u{2009}", false),
    ("trade", "™", false),
    ("zwj", "\u{200D}", false),
    ("zwnj", "\u{200C}", false),
    // Greek letters.
    ("Delta", "Δ", false),
    ("Omega", "Ω", false),
    ("alpha", "α", false),
    ("beta", "β", false),
    ("delta", "δ", false),
    ("gamma", "γ", false),
    ("omega", "ω", false),
    ("pi", "π", false),
    ("sigma", "σ", false),
    // Arrows.
    ("darr", "↓", false),
    ("harr", "↔", false),
    ("larr", "←", false),
    ("rarr", "→", false),
    ("uarr", "↑", false),
    // Mathematical operators. The `times`/`divide`/`not` families share
    // trie prefixes with the legacy Latin-1 forms above.
    ("and", "∧", false),
    ("cap", "∩", false),
    ("cong", "≅", false),
    ("cup", "∪", false),
    ("divideontimes", "⋇", false),
    ("empty", "∅", false),
    ("equiv", "≡", false),
    ("exist", "∃", false),
    ("forall", "∀", false),
    ("ge", "≥", false),
    ("infin", "∞", false),
    ("int", "∫", false),
    ("isin", "∈", false),
    ("le", "≤", false),
    ("minus", "−", false),
    ("nabla", "∇", false),
    ("ne", "≠", false),
    ("ni", "∋", false),
    ("notin", "∉", false),
    ("nsub", "⊄", false),
    ("oplus", "⊕", false),
    ("or", "∨", false),
    ("otimes", "⊗", false),
    ("part", "∂", false),
    ("perp", "⊥", false),
    ("prod", "∏", false),
    ("prop", "∝", false),
    ("radic", "√", false),
    ("sdot", "⋅", false),
    ("sim", "∼", false),
    ("sub", "⊂", false),
    ("sube", "⊆", false),
    ("sum", "∑", false),
    ("sup", "⊃", false),
    ("supe", "⊇", false),
    ("there4", "∴", false),
    ("timesb", "⊠", false),
    ("timesbar", "⨱", true),
    ("timesd", "⨰", false),
    // Two-code-point expansions.
    ("NotEqualTilde", "\u{2242}\u{0338}", false),
    ("fjlig", "fj", false),
];

/// The five predefined XML entities; the only named references XML mode
/// recognizes.
pub(crate) const XML_ENTITIES: &[(&str, &str, bool)] = &[
    ("amp", "&", false),
    ("apos", "'", false),
    ("gt", ">", false),
    ("lt", "<", false),
    ("quot", "\"", false),
];
