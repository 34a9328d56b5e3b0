//! Feed markup extractor
//!
//! Turns a raw RSS body into item records with a small tokenizer and a
//! three-state machine (outside an item, inside an item, inside a field).
//! Malformed input never fails: blocks that cannot be completed are dropped
//! and scanning resumes at the next item.

use crate::ingest::ItemRecord;
use std::borrow::Cow;

const ITEM_TAG: &str = "item";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Lexical unit of feed markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Character data outside any literal wrapper (entities still encoded)
    Text(&'a str),
    /// Content of a `<![CDATA[ ... ]]>` wrapper, verbatim
    CData(&'a str),
    Start {
        name: &'a str,
        raw: &'a str,
        self_closing: bool,
    },
    End {
        name: &'a str,
        raw: &'a str,
    },
    /// Comments, processing instructions and declarations
    Skip,
}

/// Returns true if `s` (starting right after a `<`) can begin markup
fn starts_markup(s: &str) -> bool {
    s.chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?' | '_' | ':'))
        .unwrap_or(false)
}

struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn take_text(&mut self, len: usize) -> Token<'a> {
        let (text, rest) = self.rest.split_at(len);
        self.rest = rest;
        Token::Text(text)
    }

    /// Skips past `terminator`, or to the end of input when it never appears
    fn skip_past(&mut self, from: usize, terminator: &str) -> Token<'a> {
        self.rest = match self.rest[from..].find(terminator) {
            Some(end) => &self.rest[from + end + terminator.len()..],
            None => "",
        };
        Token::Skip
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        match self.rest.find('<') {
            Some(0) => {}
            Some(lt) => return Some(self.take_text(lt)),
            None => return Some(self.take_text(self.rest.len())),
        }

        if let Some(body) = self.rest.strip_prefix(CDATA_OPEN) {
            let token = match body.find(CDATA_CLOSE) {
                Some(end) => {
                    self.rest = &body[end + CDATA_CLOSE.len()..];
                    Token::CData(&body[..end])
                }
                None => {
                    self.rest = "";
                    Token::CData(body)
                }
            };
            return Some(token);
        }
        if self.rest.starts_with("<!--") {
            return Some(self.skip_past(4, "-->"));
        }
        if self.rest.starts_with("<?") {
            return Some(self.skip_past(2, "?>"));
        }
        if self.rest.starts_with("<!") {
            return Some(self.skip_past(2, ">"));
        }

        // A '<' that cannot open a tag, or whose tag is interrupted by another
        // '<' before closing, is plain text.
        let after = &self.rest[1..];
        if !starts_markup(after) {
            let next_lt = after.find('<').map(|i| i + 1).unwrap_or(self.rest.len());
            return Some(self.take_text(next_lt));
        }
        let gt = match after.find(|c: char| c == '<' || c == '>') {
            Some(i) if after.as_bytes()[i] == b'>' => i + 1,
            Some(i) => return Some(self.take_text(i + 1)),
            None => return Some(self.take_text(self.rest.len())),
        };

        let raw = &self.rest[..=gt];
        self.rest = &self.rest[gt + 1..];
        let inner = &raw[1..raw.len() - 1];

        if let Some(name) = inner.strip_prefix('/') {
            return Some(Token::End {
                name: name.trim(),
                raw,
            });
        }

        let self_closing = inner.ends_with('/');
        let inner = inner.strip_suffix('/').unwrap_or(inner);
        let name = inner.split(char::is_whitespace).next().unwrap_or("");

        Some(Token::Start {
            name,
            raw,
            self_closing,
        })
    }
}

/// Item fields the extractor collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    PubDate,
    Description,
}

impl Field {
    fn from_tag(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "pubDate" => Some(Self::PubDate),
            "description" => Some(Self::Description),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::PubDate => "pubDate",
            Self::Description => "description",
        }
    }
}

/// Fields found so far in one item block; the first occurrence of each wins
#[derive(Debug, Default)]
struct ItemFields {
    title: Option<String>,
    pub_date: Option<String>,
    description: Option<String>,
}

impl ItemFields {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::PubDate => &mut self.pub_date,
            Field::Description => &mut self.description,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// Builds the record, or `None` when a required field is missing
    fn into_record(self, source_link: &str) -> Option<ItemRecord> {
        let title = self.title?.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let pub_date = self.pub_date?.trim().to_string();
        let description = clean_description(&self.description?);

        Some(ItemRecord {
            title,
            description,
            publication_date: pub_date,
            source_link: source_link.to_string(),
        })
    }
}

#[derive(Debug)]
enum State {
    OutsideItem,
    InItem(ItemFields),
    InField {
        fields: ItemFields,
        field: Field,
        buf: String,
    },
}

/// Extracts every complete item from a feed body, in order of appearance
///
/// An item is complete when it has a non-empty title, a publication date and
/// a description. Each of those may be plain text (entities decoded) or wrapped
/// in CDATA (taken verbatim). Descriptions additionally have one level of inner
/// CDATA unwrapped and all markup tags removed. Every record's source link is
/// `source_link`, the URL of the feed the body came from.
///
/// # Example
///
/// ```
/// use newsreel::ingest::extract_items;
///
/// let body = "<rss><channel><item>\
///     <title><![CDATA[Hello]]></title>\
///     <pubDate>Mon, 01 Jan 2023 00:00:00 GMT</pubDate>\
///     <description><![CDATA[<b>World</b>]]></description>\
///     </item></channel></rss>";
/// let items = extract_items(body, "https://example.com/rss");
/// assert_eq!(items.len(), 1);
/// assert_eq!(items[0].description, "World");
/// ```
pub fn extract_items(body: &str, source_link: &str) -> Vec<ItemRecord> {
    let mut items = Vec::new();
    let mut state = State::OutsideItem;

    for token in Tokenizer::new(body) {
        state = match (state, token) {
            (State::OutsideItem, Token::Start { name, self_closing, .. })
                if name == ITEM_TAG && !self_closing =>
            {
                State::InItem(ItemFields::default())
            }
            (State::OutsideItem, _) => State::OutsideItem,

            (State::InItem(fields), token) => match token {
                // An item opening inside another drops the unterminated one
                Token::Start { name, self_closing, .. } if name == ITEM_TAG => {
                    if self_closing {
                        State::InItem(fields)
                    } else {
                        State::InItem(ItemFields::default())
                    }
                }
                Token::Start {
                    name,
                    self_closing: true,
                    ..
                } => {
                    let mut fields = fields;
                    if let Some(field) = Field::from_tag(name) {
                        fields.set(field, String::new());
                    }
                    State::InItem(fields)
                }
                Token::Start { name, .. } => match Field::from_tag(name) {
                    Some(field) => State::InField {
                        fields,
                        field,
                        buf: String::new(),
                    },
                    None => State::InItem(fields),
                },
                Token::End { name, .. } if name == ITEM_TAG => {
                    items.extend(fields.into_record(source_link));
                    State::OutsideItem
                }
                _ => State::InItem(fields),
            },

            (
                State::InField {
                    mut fields,
                    field,
                    mut buf,
                },
                token,
            ) => match token {
                Token::Text(text) => {
                    buf.push_str(&html_escape::decode_html_entities(text));
                    State::InField { fields, field, buf }
                }
                Token::CData(text) => {
                    buf.push_str(text);
                    State::InField { fields, field, buf }
                }
                Token::End { name, .. } if name == field.tag() => {
                    fields.set(field, buf);
                    State::InItem(fields)
                }
                // The field never closed; it counts as missing
                Token::End { name, .. } if name == ITEM_TAG => {
                    items.extend(fields.into_record(source_link));
                    State::OutsideItem
                }
                Token::Start { name, self_closing: false, .. } if name == ITEM_TAG => {
                    State::InItem(ItemFields::default())
                }
                Token::Start { raw, .. } | Token::End { raw, .. } => {
                    buf.push_str(raw);
                    State::InField { fields, field, buf }
                }
                Token::Skip => State::InField { fields, field, buf },
            },
        };
    }

    items
}

/// Unwraps one level of literal wrappers, strips markup and trims
fn clean_description(raw: &str) -> String {
    strip_tags(&unwrap_literal_once(raw)).trim().to_string()
}

/// Replaces each `<![CDATA[x]]>` in `text` with `x`, without rescanning `x`
fn unwrap_literal_once(text: &str) -> Cow<'_, str> {
    if !text.contains(CDATA_OPEN) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(CDATA_OPEN) {
        let body = &rest[start + CDATA_OPEN.len()..];
        match body.find(CDATA_CLOSE) {
            Some(end) => {
                out.push_str(&rest[..start]);
                out.push_str(&body[..end]);
                rest = &body[end + CDATA_CLOSE.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Removes every bracketed markup tag, leaving the text between them
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        match after.find('>') {
            Some(gt) if starts_markup(after) => rest = &after[gt + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
