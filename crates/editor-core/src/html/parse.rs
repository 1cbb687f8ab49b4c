use super::HtmlError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum HtmlNode {
    Element(HtmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct HtmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "figure", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

pub(super) fn parse_tree(input: &str) -> Result<Vec<HtmlNode>, HtmlError> {
    let tokens = tokenize(input)?;

    let mut stack: Vec<HtmlElement> = vec![HtmlElement {
        name: String::new(),
        attrs: Vec::new(),
        children: Vec::new(),
    }];

    for token in tokens {
        match token {
            Token::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(HtmlNode::Text(text));
                }
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                close_implied(&mut stack, &name);
                let el = HtmlElement {
                    name,
                    attrs,
                    children: Vec::new(),
                };
                if self_closing || VOID_ELEMENTS.contains(&el.name.as_str()) {
                    if let Some(top) = stack.last_mut() {
                        top.children.push(HtmlNode::Element(el));
                    }
                } else {
                    stack.push(el);
                }
            }
            Token::End { name } => {
                // Unmatched end tags are dropped.
                if let Some(pos) = stack.iter().rposition(|el| el.name == name) {
                    if pos > 0 {
                        while stack.len() > pos {
                            pop_into_parent(&mut stack);
                        }
                    }
                }
            }
        }
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

fn pop_into_parent(stack: &mut Vec<HtmlElement>) {
    if let Some(el) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(HtmlNode::Element(el));
        }
    }
}

fn close_implied(stack: &mut Vec<HtmlElement>, opening: &str) {
    if CLOSES_PARAGRAPH.contains(&opening) && stack.last().is_some_and(|el| el.name == "p") {
        pop_into_parent(stack);
    }
    match opening {
        "li" => close_nearest(stack, &["li"], &["ul", "ol"]),
        "tr" => close_nearest(stack, &["tr"], &["table", "thead", "tbody", "tfoot"]),
        "td" | "th" => close_nearest(stack, &["td", "th"], &["tr", "table"]),
        "thead" | "tbody" | "tfoot" => close_nearest(stack, &["thead", "tbody", "tfoot"], &["table"]),
        _ => {}
    }
}

/// Closes the innermost open `targets` element unless a `boundaries` element comes first.
fn close_nearest(stack: &mut Vec<HtmlElement>, targets: &[&str], boundaries: &[&str]) {
    let mut found = None;
    for (ix, el) in stack.iter().enumerate().skip(1).rev() {
        if targets.contains(&el.name.as_str()) {
            found = Some(ix);
            break;
        }
        if boundaries.contains(&el.name.as_str()) {
            break;
        }
    }
    if let Some(ix) = found {
        while stack.len() > ix {
            pop_into_parent(stack);
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, HtmlError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut text_start = 0usize;

    let flush_text = |tokens: &mut Vec<Token>, from: usize, to: usize| {
        if from < to {
            tokens.push(Token::Text(decode_entities(&input[from..to])));
        }
    };

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &input[pos..];

        if rest.starts_with("<!--") {
            flush_text(&mut tokens, text_start, pos);
            let Some(end) = rest[4..].find("-->") else {
                return Err(HtmlError::UnterminatedComment { position: pos });
            };
            pos += 4 + end + 3;
            text_start = pos;
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            flush_text(&mut tokens, text_start, pos);
            let Some(end) = rest.find('>') else {
                return Err(HtmlError::UnterminatedTag { position: pos });
            };
            pos += end + 1;
            text_start = pos;
            continue;
        }

        if rest.starts_with("</") {
            if !rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                pos += 1;
                continue;
            }
            flush_text(&mut tokens, text_start, pos);
            let Some(end) = rest.find('>') else {
                return Err(HtmlError::UnterminatedTag { position: pos });
            };
            let name = rest[2..end]
                .trim()
                .split(|c: char| c.is_ascii_whitespace())
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            tokens.push(Token::End { name });
            pos += end + 1;
            text_start = pos;
            continue;
        }

        if !rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            // A bare `<` is literal text.
            pos += 1;
            continue;
        }

        flush_text(&mut tokens, text_start, pos);
        let tag_start = pos;
        let (token, next) = read_start_tag(input, tag_start)?;
        pos = next;

        if let Token::Start {
            name,
            self_closing: false,
            ..
        } = &token
        {
            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                let closing = format!("</{name}");
                let skip_to = input[pos..]
                    .to_ascii_lowercase()
                    .find(&closing)
                    .map(|ix| pos + ix)
                    .unwrap_or(input.len());
                pos = skip_to;
                text_start = pos;
                continue;
            }
        }

        tokens.push(token);
        text_start = pos;
    }

    flush_text(&mut tokens, text_start, input.len());
    Ok(tokens)
}

fn read_start_tag(input: &str, tag_start: usize) -> Result<(Token, usize), HtmlError> {
    let bytes = input.as_bytes();
    let unterminated = HtmlError::UnterminatedTag {
        position: tag_start,
    };

    let mut pos = tag_start + 1;
    let name_start = pos;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'-' | b':')) {
        pos += 1;
    }
    let name = input[name_start..pos].to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let Some(&b) = bytes.get(pos) else {
            return Err(unterminated);
        };
        match b {
            b'>' => {
                return Ok((
                    Token::Start {
                        name,
                        attrs,
                        self_closing: false,
                    },
                    pos + 1,
                ));
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                return Ok((
                    Token::Start {
                        name,
                        attrs,
                        self_closing: true,
                    },
                    pos + 2,
                ));
            }
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let key = input[attr_start..pos].to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            attrs.push((key, String::new()));
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = match bytes.get(pos) {
            None => return Err(unterminated),
            Some(&quote @ (b'"' | b'\'')) => {
                let value_start = pos + 1;
                let Some(len) = input[value_start..].find(quote as char) else {
                    return Err(HtmlError::UnterminatedAttribute { position: pos });
                };
                pos = value_start + len + 1;
                decode_entities(&input[value_start..value_start + len])
            }
            Some(_) => {
                let value_start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                    pos += 1;
                }
                decode_entities(&input[value_start..pos])
            }
        };
        attrs.push((key, value));
    }
}

pub(super) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
                _ => None,
            }?;
            Some((c, end + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(nodes: &[HtmlNode], ix: usize) -> &HtmlElement {
        match &nodes[ix] {
            HtmlNode::Element(el) => el,
            HtmlNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn unterminated_markup_is_rejected_with_position() {
        assert_eq!(
            parse_tree("<p>ok</p><b"),
            Err(HtmlError::UnterminatedTag { position: 9 })
        );
        assert_eq!(
            parse_tree("<a href=\"x>y</a>"),
            Err(HtmlError::UnterminatedAttribute { position: 8 })
        );
        assert_eq!(
            parse_tree("a<!-- never closed"),
            Err(HtmlError::UnterminatedComment { position: 1 })
        );
    }

    #[test]
    fn implicit_closes_and_stray_end_tags() {
        let tree = parse_tree("<p>one<p>two</span><ul><li>a<li>b</ul>").unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(element(&tree, 0).name, "p");
        assert_eq!(element(&tree, 1).children, vec![HtmlNode::Text("two".into())]);
        let list = element(&tree, 2);
        assert_eq!(list.children.len(), 2);
    }

    #[test]
    fn void_elements_and_attributes() {
        let tree = parse_tree("<p>a<br>b<img src='x.png' alt=pic data-flag></p>").unwrap();
        let p = element(&tree, 0);
        assert_eq!(p.children.len(), 4);
        let img = element(&p.children, 3);
        assert_eq!(img.attr("src"), Some("x.png"));
        assert_eq!(img.attr("alt"), Some("pic"));
        assert!(img.has_attr("data-flag"));
    }

    #[test]
    fn entities_decode_named_and_numeric() {
        assert_eq!(decode_entities("a&amp;b&lt;&#39;&#x41;&nbsp;&bogus;"), "a&b<'A\u{a0}&bogus;");
    }

    #[test]
    fn bare_angle_bracket_is_text() {
        let tree = parse_tree("1 < 2").unwrap();
        assert_eq!(tree, vec![HtmlNode::Text("1 < 2".into())]);
    }
}
