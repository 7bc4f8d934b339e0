use crate::error::RegexError;
use crate::token::{Token, TokenSequence};
use lazy_static::lazy_static;
use std::collections::BTreeSet;

lazy_static! {
    /// Alphabet of the `.` wildcard.
    static ref ASCII_CHARS: BTreeSet<char> = (0u8..128).map(char::from).collect();
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) enum RegexAstNode {
    Epsilon,
    Char(BTreeSet<char>),
    Concatenation(Vec<RegexAstNode>),
    Union(Vec<RegexAstNode>),
    /// `upper_bound` of `None` means unbounded.
    Quantification {
        operand: Box<RegexAstNode>,
        lower_bound: usize,
        upper_bound: Option<usize>,
    },
}

impl RegexAstNode {
    pub(crate) fn new(pattern: &str) -> Result<Self, RegexError> {
        let sequence = TokenSequence::try_from(pattern)?;
        log::trace!("{} tokens in {pattern:?}: {:?}", sequence.len(), sequence.as_slice());
        AstParser::parse(sequence.as_slice())
    }
}

/// Intermediate item of the flat node list built for one expression.
#[derive(Debug)]
enum Item {
    Node(RegexAstNode),
    /// A quantifier whose operand is bound later from the preceding node.
    Quantifier {
        text: String,
        lower_bound: usize,
        upper_bound: Option<usize>,
    },
    UnionSeparator,
}

struct AstParser;

impl AstParser {
    fn parse(tokens: &[Token]) -> Result<RegexAstNode, RegexError> {
        if tokens.is_empty() {
            return Ok(RegexAstNode::Epsilon);
        }

        let items = Self::parse_expression(tokens)?;

        let mut groups = Vec::new();
        let mut current = Vec::new();
        for item in items {
            match item {
                Item::UnionSeparator => groups.push(std::mem::take(&mut current)),
                item => current.push(item),
            }
        }
        groups.push(current);

        let mut nodes = groups
            .into_iter()
            .map(Self::group_node)
            .collect::<Result<Vec<_>, _>>()?;

        if nodes.len() == 1 {
            Ok(nodes.remove(0))
        } else {
            Ok(RegexAstNode::Union(nodes))
        }
    }

    /// Walks the top level parenthesized spans of `tokens` from left to right.
    /// The parts between spans are plain terms, each interior is parsed as a
    /// whole expression, so recursion only goes as deep as the nesting.
    fn parse_expression(tokens: &[Token]) -> Result<Vec<Item>, RegexError> {
        let mut items = Vec::new();
        let mut rest = tokens;

        while let Some((open, close)) = Self::find_group(rest)? {
            items.extend(Self::parse_term(&rest[..open])?);
            items.push(Item::Node(Self::parse(&rest[open + 1..close])?));
            rest = &rest[close + 1..];
        }

        items.extend(Self::parse_term(rest)?);
        Ok(items)
    }

    /// Positions of the first top level `(` and its matching `)`.
    fn find_group(tokens: &[Token]) -> Result<Option<(usize, usize)>, RegexError> {
        let mut open_pos = 0;
        let mut depth = 0usize;

        for (pos, token) in tokens.iter().enumerate() {
            match token {
                Token::OpenGroup => {
                    if depth == 0 {
                        open_pos = pos;
                    }
                    depth += 1;
                }
                Token::CloseGroup => {
                    if depth == 0 {
                        return Err(RegexError::UnbalancedParenthesis);
                    }
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Some((open_pos, pos)));
                    }
                }
                _ => {}
            }
        }

        if depth > 0 {
            return Err(RegexError::UnbalancedParenthesis);
        }
        Ok(None)
    }

    /// Parses a slice without parentheses.
    fn parse_term(tokens: &[Token]) -> Result<Vec<Item>, RegexError> {
        let mut items = Vec::with_capacity(tokens.len());

        for token in tokens {
            let item = match token {
                Token::Char(text) => Item::Node(RegexAstNode::Char(decode_char_token(text)?)),
                Token::Quantifier(text) => {
                    if matches!(items.last(), Some(Item::Quantifier { .. })) {
                        return Err(RegexError::ContiguousQuantifiers(text.clone()));
                    }
                    let (lower_bound, upper_bound) = decode_quantifier_token(text)?;
                    Item::Quantifier {
                        text: text.clone(),
                        lower_bound,
                        upper_bound,
                    }
                }
                Token::Union => Item::UnionSeparator,
                Token::OpenGroup | Token::CloseGroup => {
                    unreachable!("parentheses are isolated by parse_expression")
                }
            };
            items.push(item);
        }

        Ok(items)
    }

    /// Binds every quantifier to the node before it and collapses the group into one node.
    fn group_node(group: Vec<Item>) -> Result<RegexAstNode, RegexError> {
        let mut nodes: Vec<RegexAstNode> = Vec::with_capacity(group.len());

        for item in group {
            match item {
                Item::Node(node) => nodes.push(node),
                Item::Quantifier {
                    text,
                    lower_bound,
                    upper_bound,
                } => {
                    let operand = nodes.pop().ok_or(RegexError::DanglingQuantifier(text))?;
                    nodes.push(RegexAstNode::Quantification {
                        operand: Box::new(operand),
                        lower_bound,
                        upper_bound,
                    });
                }
                Item::UnionSeparator => unreachable!("groups are split on union separators"),
            }
        }

        Ok(match nodes.len() {
            0 => RegexAstNode::Epsilon,
            1 => nodes.remove(0),
            _ => RegexAstNode::Concatenation(nodes),
        })
    }
}

fn decode_char_token(text: &str) -> Result<BTreeSet<char>, RegexError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some('['), _) => parse_square_bracket(&text[1..]),
        (Some('\\'), Some(escaped)) => Ok(BTreeSet::from([escaped])),
        (Some('.'), None) => Ok(ASCII_CHARS.clone()),
        (Some(c), _) => Ok(BTreeSet::from([c])),
        (None, _) => Ok(BTreeSet::new()),
    }
}

/// Decodes the body of a square bracket expression, `content` starts right
/// after the opening `[` and runs through the closing `]`.
fn parse_square_bracket(content: &str) -> Result<BTreeSet<char>, RegexError> {
    let chars: Vec<char> = content.chars().collect();
    let mut char_set = BTreeSet::new();
    let mut pos = 0;

    while let Some(&c) = chars.get(pos) {
        match c {
            '\\' => {
                if let Some(&escaped) = chars.get(pos + 1) {
                    char_set.insert(escaped);
                }
                pos += 2;
            }
            ']' => break,
            lower if chars.get(pos + 1) == Some(&'-')
                && chars.get(pos + 2).is_some_and(|&upper| upper != ']') =>
            {
                let upper = chars[pos + 2];
                if lower > upper {
                    return Err(RegexError::InvalidRangeNotation { lower, upper });
                }
                char_set.extend(lower..=upper);
                pos += 3;
            }
            _ => {
                char_set.insert(c);
                pos += 1;
            }
        }
    }

    Ok(char_set)
}

fn decode_quantifier_token(text: &str) -> Result<(usize, Option<usize>), RegexError> {
    match text {
        "*" => Ok((0, None)),
        "+" => Ok((1, None)),
        "?" => Ok((0, Some(1))),
        _ => parse_curly_bracket(text),
    }
}

fn parse_curly_bracket(text: &str) -> Result<(usize, Option<usize>), RegexError> {
    let invalid = || RegexError::InvalidQuantifierBounds(text.to_string());

    let content = text
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(invalid)?;

    let bounds = content
        .split(',')
        .map(|section| section.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    match bounds.as_slice() {
        [n] => Ok((*n, Some(*n))),
        [n, m] if n <= m => Ok((*n, Some(*m))),
        _ => Err(invalid()),
    }
}
