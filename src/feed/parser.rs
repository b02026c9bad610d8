use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors produced while reading a feed document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The XML is not well-formed (syntax error, mismatched end tag, unknown entity).
    #[error("XML parse error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// The document contains no element at all.
    #[error("Document has no root element")]
    NoRootElement,

    /// The document ended while elements were still open.
    #[error("Document ended with {0} unclosed element(s)")]
    UnclosedElement(usize),

    /// CDATA section is not valid UTF-8.
    #[error("Invalid text in document: {0}")]
    InvalidText(String),
}

/// Raw field values of one `<item>`, before any display derivation.
///
/// Text values are the concatenated text and CDATA of the matched element and
/// its descendants. Nothing is trimmed or cleaned here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
    /// `dc:creator`, preferred over any other `creator`
    pub dc_creator: Option<String>,
    pub creator: Option<String>,
    pub categories: Vec<String>,
    /// `content:encoded`, preferred over any other `encoded`
    pub content_encoded: Option<String>,
    pub encoded: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
    DcCreator,
    Creator,
    Category,
    ContentEncoded,
    Encoded,
}

impl Field {
    /// Maps an element inside an item to the field it feeds.
    ///
    /// The core RSS fields only match unprefixed names so that `media:title`
    /// or `atom:link` never shadow the real ones. A DOM `querySelector("title")`
    /// matches by local name and would pick up `media:title` when it comes first.
    fn from_element(e: &BytesStart<'_>) -> Option<Field> {
        let qname = e.name();
        let local = e.local_name();
        match qname.as_ref() {
            b"title" => return Some(Field::Title),
            b"link" => return Some(Field::Link),
            b"description" => return Some(Field::Description),
            b"pubDate" => return Some(Field::PubDate),
            b"category" => return Some(Field::Category),
            b"dc:creator" => return Some(Field::DcCreator),
            b"content:encoded" => return Some(Field::ContentEncoded),
            _ => {}
        }
        match local.as_ref() {
            b"creator" => Some(Field::Creator),
            b"encoded" => Some(Field::Encoded),
            _ => None,
        }
    }

    fn is_repeated(self) -> bool {
        matches!(self, Field::Category)
    }
}

/// An element open inside the current item.
struct OpenElement {
    /// Field being captured, `None` for uninteresting or already-claimed elements
    capture: Option<(Field, String)>,
}

/// Accumulates one item while its subtree is being read.
struct ItemBuilder {
    /// Document depth of the `<item>` element itself
    depth: usize,
    open: Vec<OpenElement>,
    item: FeedItem,
    claimed: Vec<Field>,
}

impl ItemBuilder {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            open: Vec::new(),
            item: FeedItem::default(),
            claimed: Vec::new(),
        }
    }

    /// Decides at the start tag whether this element is captured. Single-valued
    /// fields take the first element in document order.
    fn claim(&mut self, e: &BytesStart<'_>) -> Option<(Field, String)> {
        let field = Field::from_element(e)?;
        if !field.is_repeated() {
            if self.claimed.contains(&field) {
                return None;
            }
            self.claimed.push(field);
        }
        Some((field, String::new()))
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let capture = self.claim(e);
        self.open.push(OpenElement { capture });
    }

    fn empty(&mut self, e: &BytesStart<'_>) {
        if let Some((field, text)) = self.claim(e) {
            self.store(field, text);
        }
    }

    fn text(&mut self, text: &str) {
        // Text belongs to every open ancestor, like DOM textContent
        for el in &mut self.open {
            if let Some((_, buf)) = el.capture.as_mut() {
                buf.push_str(text);
            }
        }
    }

    fn end(&mut self) {
        if let Some(OpenElement {
            capture: Some((field, text)),
        }) = self.open.pop()
        {
            self.store(field, text);
        }
    }

    fn store(&mut self, field: Field, text: String) {
        let item = &mut self.item;
        match field {
            Field::Title => item.title = Some(text),
            Field::Link => item.link = Some(text),
            Field::Description => item.description = Some(text),
            Field::PubDate => item.pub_date = Some(text),
            Field::DcCreator => item.dc_creator = Some(text),
            Field::Creator => item.creator = Some(text),
            Field::Category => item.categories.push(text),
            Field::ContentEncoded => item.content_encoded = Some(text),
            Field::Encoded => item.encoded = Some(text),
        }
    }
}

/// Reads every `<item>` element of a feed document in document order.
///
/// Works for RSS 2.0 (`channel/item`) and RSS 1.0 (`rdf:RDF/item`) alike,
/// since items are matched wherever they appear. The whole document must be
/// well-formed: a syntax error anywhere fails the parse, even after items
/// have been read.
///
/// # Security
///
/// SEC-002: `quick-xml` 0.37 never expands `<!ENTITY>` declarations. Only the
/// five predefined entities and character references are resolved; any other
/// entity reference is reported as [`ParseError::Xml`].
pub fn parse_items(xml: &str) -> Result<Vec<FeedItem>, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    let mut depth: usize = 0;
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| ParseError::Xml {
            position: reader.error_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                saw_root = true;
                match current.as_mut() {
                    Some(builder) => builder.start(&e),
                    None if e.local_name().as_ref() == b"item" => {
                        current = Some(ItemBuilder::new(depth));
                    }
                    None => {}
                }
            }
            Event::Empty(e) => {
                saw_root = true;
                match current.as_mut() {
                    Some(builder) => builder.empty(&e),
                    None if e.local_name().as_ref() == b"item" => items.push(FeedItem::default()),
                    None => {}
                }
            }
            Event::End(_) => {
                if let Some(builder) = current.as_mut() {
                    if builder.depth == depth {
                        if let Some(done) = current.take() {
                            items.push(done.item);
                        }
                    } else {
                        builder.end();
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(builder) = current.as_mut() {
                    let text = t.unescape().map_err(|e| ParseError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    builder.text(&text);
                }
            }
            Event::CData(c) => {
                if let Some(builder) = current.as_mut() {
                    let text = std::str::from_utf8(&c)
                        .map_err(|e| ParseError::InvalidText(e.to_string()))?;
                    builder.text(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ParseError::NoRootElement);
    }
    if depth != 0 {
        return Err(ParseError::UnclosedElement(depth));
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Klima</title>
    <link>https://www.shz.de/klima</link>
    <item>
      <title>Neue Windparks vor Sylt</title>
      <link>https://www.shz.de/artikel/1</link>
      <description><![CDATA[<p>Mehr <b>Strom</b> vom Meer</p>]]></description>
      <pubDate>Tue, 02 Jan 2024 10:00:00 +0100</pubDate>
      <dc:creator>Anna Schmidt</dc:creator>
      <category>Energie</category>
      <category>Sylt</category>
      <content:encoded><![CDATA[<img src="https://img.example/1.jpg"><p>Langtext</p>]]></content:encoded>
      <media:title>Bildtitel</media:title>
    </item>
    <item>
      <title>Moorschutz &amp; Klima</title>
      <link>https://www.shz.de/artikel/2</link>
      <description>&lt;p&gt;Escaped markup&lt;/p&gt;</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_items_in_document_order() {
        let items = parse_items(RSS).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Neue Windparks vor Sylt"));
        assert_eq!(items[1].title.as_deref(), Some("Moorschutz & Klima"));
    }

    #[test]
    fn test_channel_fields_not_attributed_to_items() {
        let items = parse_items(RSS).unwrap();
        assert_eq!(items[0].link.as_deref(), Some("https://www.shz.de/artikel/1"));
    }

    #[test]
    fn test_full_item_fields() {
        let items = parse_items(RSS).unwrap();
        let first = &items[0];
        assert_eq!(
            first.description.as_deref(),
            Some("<p>Mehr <b>Strom</b> vom Meer</p>")
        );
        assert_eq!(
            first.pub_date.as_deref(),
            Some("Tue, 02 Jan 2024 10:00:00 +0100")
        );
        assert_eq!(first.dc_creator.as_deref(), Some("Anna Schmidt"));
        assert_eq!(first.creator, None);
        assert_eq!(first.categories, vec!["Energie", "Sylt"]);
        assert_eq!(
            first.content_encoded.as_deref(),
            Some(r#"<img src="https://img.example/1.jpg"><p>Langtext</p>"#)
        );
    }

    #[test]
    fn test_prefixed_title_does_not_shadow() {
        let xml = r#"<rss><channel><item>
            <media:title xmlns:media="m">Wrong</media:title>
            <title>Right</title>
        </item></channel></rss>"#;
        let items = parse_items(xml).unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Right"));
    }

    #[test]
    fn test_escaped_markup_is_unescaped() {
        let items = parse_items(RSS).unwrap();
        assert_eq!(
            items[1].description.as_deref(),
            Some("<p>Escaped markup</p>")
        );
    }

    #[test]
    fn test_first_match_wins() {
        let xml = "<rss><item><title>One</title><title>Two</title></item></rss>";
        let items = parse_items(xml).unwrap();
        assert_eq!(items[0].title.as_deref(), Some("One"));
    }

    #[test]
    fn test_text_content_includes_descendants() {
        let xml = "<rss><item><description>Hello <b>bold</b> world</description></item></rss>";
        let items = parse_items(xml).unwrap();
        assert_eq!(items[0].description.as_deref(), Some("Hello bold world"));
    }

    #[test]
    fn test_plain_creator_and_encoded() {
        let xml = r#"<rss><item>
            <creator>Plain Author</creator>
            <x:encoded xmlns:x="urn:x">Body</x:encoded>
        </item></rss>"#;
        let items = parse_items(xml).unwrap();
        assert_eq!(items[0].creator.as_deref(), Some("Plain Author"));
        assert_eq!(items[0].encoded.as_deref(), Some("Body"));
        assert_eq!(items[0].content_encoded, None);
    }

    #[test]
    fn test_empty_elements() {
        let xml = "<rss><item><link/><category/></item><item/></rss>";
        let items = parse_items(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link.as_deref(), Some(""));
        assert_eq!(items[0].categories, vec![String::new()]);
        assert_eq!(items[1], FeedItem::default());
    }

    #[test]
    fn test_rdf_items() {
        let xml = r#"<rdf:RDF xmlns:rdf="urn:rdf">
            <channel><title>Feed</title></channel>
            <item><title>A</title></item>
            <item><title>B</title></item>
        </rdf:RDF>"#;
        let titles: Vec<_> = parse_items(xml)
            .unwrap()
            .into_iter()
            .map(|i| i.title.unwrap_or_default())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_no_items() {
        let xml = "<rss version=\"2.0\"><channel><title>Empty</title></channel></rss>";
        assert!(parse_items(xml).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_xml_rejected() {
        assert!(matches!(
            parse_items("<not valid xml"),
            Err(ParseError::Xml { .. })
        ));
        assert!(matches!(
            parse_items("<rss><item></channel></rss>"),
            Err(ParseError::Xml { .. })
        ));
    }

    #[test]
    fn test_unclosed_document_rejected() {
        let result = parse_items("<rss><channel><item><title>x</title></item>");
        assert!(matches!(
            result,
            Err(ParseError::UnclosedElement(_)) | Err(ParseError::Xml { .. })
        ));
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(matches!(parse_items(""), Err(ParseError::NoRootElement)));
        assert!(matches!(
            parse_items("<?xml version=\"1.0\"?>\n"),
            Err(ParseError::NoRootElement)
        ));
    }

    #[test]
    fn test_custom_entity_not_expanded() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE rss [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<rss><item><title>&xxe;</title></item></rss>"#;
        assert!(matches!(parse_items(xml), Err(ParseError::Xml { .. })));
    }
}
