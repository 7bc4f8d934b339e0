use crate::error::RegexError;
use std::fmt::{Display, Formatter};

/// `Char` and `Quantifier` keep the source text they were scanned from,
/// decoding into char sets and bounds is left to the parser.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) enum Token {
    Char(String),
    Quantifier(String),
    Union,
    OpenGroup,
    CloseGroup,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Char(text) | Token::Quantifier(text) => write!(f, "{text}"),
            Token::Union => write!(f, "|"),
            Token::OpenGroup => write!(f, "("),
            Token::CloseGroup => write!(f, ")"),
        }
    }
}

impl Display for TokenSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Position of the first `target` at or after `start` that is not escaped by a backslash.
fn find_unescaped(pattern: &[char], target: char, start: usize) -> Option<usize> {
    let mut escaped = false;
    for (pos, &c) in pattern.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == target {
            return Some(pos);
        }
    }
    None
}

fn collect_span(pattern: &[char], start: usize, end: usize) -> String {
    pattern[start..=end].iter().collect()
}

impl TryFrom<&str> for TokenSequence {
    type Error = RegexError;

    fn try_from(pattern: &str) -> Result<Self, Self::Error> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut pos = 0;

        while let Some(&cur) = chars.get(pos) {
            let (token, next_pos) = match cur {
                '\\' => match chars.get(pos + 1) {
                    // the backslash stays in the payload, so `\.` decodes as a literal dot
                    Some(_) => (Token::Char(collect_span(&chars, pos, pos + 1)), pos + 2),
                    None => return Err(RegexError::DanglingEscape { position: pos }),
                },
                '[' => {
                    let end = find_unescaped(&chars, ']', pos + 1)
                        .ok_or(RegexError::UnmatchedBracket { position: pos })?;
                    (Token::Char(collect_span(&chars, pos, end)), end + 1)
                }
                // an unclosed '{' is just a literal
                '{' => match find_unescaped(&chars, '}', pos + 1) {
                    Some(end) => (Token::Quantifier(collect_span(&chars, pos, end)), end + 1),
                    None => (Token::Char(cur.to_string()), pos + 1),
                },
                '+' | '*' | '?' => (Token::Quantifier(cur.to_string()), pos + 1),
                '|' => (Token::Union, pos + 1),
                '(' => (Token::OpenGroup, pos + 1),
                ')' => (Token::CloseGroup, pos + 1),
                _ => (Token::Char(cur.to_string()), pos + 1),
            };
            tokens.push(token);
            pos = next_pos;
        }

        Ok(TokenSequence::new(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use Token::*;

    fn char_token(text: &str) -> Token {
        Char(text.to_string())
    }

    fn quantifier_token(text: &str) -> Token {
        Quantifier(text.to_string())
    }

    #[test]
    fn test_parsing_of_all_special_tokens() {
        // given
        let pattern = r"a.b*c+d?e|f(g){2}[\.i]";
        let expected = vec![
            char_token("a"),
            char_token("."),
            char_token("b"),
            quantifier_token("*"),
            char_token("c"),
            quantifier_token("+"),
            char_token("d"),
            quantifier_token("?"),
            char_token("e"),
            Union,
            char_token("f"),
            OpenGroup,
            char_token("g"),
            CloseGroup,
            quantifier_token("{2}"),
            char_token(r"[\.i]"),
        ];

        // when
        let res = TokenSequence::try_from(pattern).unwrap();

        // then
        assert_eq!(res.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_parsing_with_escaped_special_characters() {
        // given
        let pattern = r"a\.\*\+\?\|\(\)\[\]\{\}\\";

        // when
        let res = TokenSequence::try_from(pattern).unwrap();

        // then
        insta::assert_debug_snapshot!(res.as_slice(), @r#"
        [
            Char(
                "a",
            ),
            Char(
                "\\.",
            ),
            Char(
                "\\*",
            ),
            Char(
                "\\+",
            ),
            Char(
                "\\?",
            ),
            Char(
                "\\|",
            ),
            Char(
                "\\(",
            ),
            Char(
                "\\)",
            ),
            Char(
                "\\[",
            ),
            Char(
                "\\]",
            ),
            Char(
                "\\{",
            ),
            Char(
                "\\}",
            ),
            Char(
                "\\\\",
            ),
        ]
        "#);
    }

    #[test]
    fn test_parsing_empty_string_returns_empty_sequence() {
        // given
        let pattern = "";

        // when
        let res = TokenSequence::try_from(pattern).unwrap();

        // then
        assert_eq!(res.len(), 0);
    }

    #[test]
    fn test_square_brackets_are_one_token_up_to_the_first_unescaped_closing_bracket() {
        // given
        let pattern = r"([a-z\]]{1,2}b.)+\+";
        let expected = vec![
            OpenGroup,
            char_token(r"[a-z\]]"),
            quantifier_token("{1,2}"),
            char_token("b"),
            char_token("."),
            CloseGroup,
            quantifier_token("+"),
            char_token(r"\+"),
        ];

        // when
        let res = TokenSequence::try_from(pattern).unwrap();

        // then
        assert_eq!(res.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_unclosed_curly_bracket_is_a_literal() {
        // given
        let pattern = "ab{";
        let expected = vec![char_token("a"), char_token("b"), char_token("{")];

        // when
        let res = TokenSequence::try_from(pattern).unwrap();

        // then
        assert_eq!(res.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_escaped_closing_curly_bracket_does_not_close_quantifier() {
        // given
        let pattern = r"a{2\}";
        let expected = vec![
            char_token("a"),
            char_token("{"),
            char_token("2"),
            char_token(r"\}"),
        ];

        // when
        let res = TokenSequence::try_from(pattern).unwrap();

        // then
        assert_eq!(res.as_slice(), expected.as_slice());
    }

    #[rstest]
    #[case("ab[cd", 2)]
    #[case(r"[a\]", 0)]
    #[case("x|[", 2)]
    #[case("[[", 0)]
    fn test_unmatched_square_bracket_fails(#[case] pattern: &str, #[case] position: usize) {
        // when
        let res = TokenSequence::try_from(pattern);

        // then
        assert_eq!(res, Err(RegexError::UnmatchedBracket { position }));
    }

    #[test]
    fn test_parsing_fails_on_trailing_escape_character() {
        // given
        let pattern = r"abc\";

        // when
        let res = TokenSequence::try_from(pattern);

        // then
        assert_eq!(res, Err(RegexError::DanglingEscape { position: 3 }));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case(r"a{2,4}b*")]
    #[case(r"((a?b)*)+")]
    #[case(r"[0-9]+\.[0-9]*|x{")]
    #[case(r"\(\)")]
    fn test_display_reproduces_the_pattern(#[case] pattern: &str) {
        // when
        let res = TokenSequence::try_from(pattern).unwrap();

        // then
        assert_eq!(res.to_string(), pattern);
    }
}
