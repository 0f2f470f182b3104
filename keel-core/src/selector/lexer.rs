use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Error,
    EndOfString,
    ClosedPar,
    Comma,
    DoesNotExist,
    DoubleEquals,
    Equals,
    GreaterThan,
    Identifier,
    In,
    LessThan,
    NotEquals,
    NotIn,
    OpenPar,
    Contains,
    NotContains,
    HasPrefix,
    HasSuffix,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Token::Error => "error",
            Token::EndOfString => "end of string",
            Token::ClosedPar => ")",
            Token::Comma => ",",
            Token::DoesNotExist => "!",
            Token::DoubleEquals => "==",
            Token::Equals => "=",
            Token::GreaterThan => ">",
            Token::Identifier => "identifier",
            Token::In => "in",
            Token::LessThan => "<",
            Token::NotEquals => "!=",
            Token::NotIn => "notin",
            Token::OpenPar => "(",
            Token::Contains => "~",
            Token::NotContains => "!~",
            Token::HasPrefix => "=~",
            Token::HasSuffix => "~=",
        })
    }
}

/// Symbols, longest first.
const SYMBOLS: &[(&str, Token)] = &[
    ("!=", Token::NotEquals),
    ("!~", Token::NotContains),
    ("==", Token::DoubleEquals),
    ("=~", Token::HasPrefix),
    ("~=", Token::HasSuffix),
    ("!", Token::DoesNotExist),
    ("(", Token::OpenPar),
    (")", Token::ClosedPar),
    (",", Token::Comma),
    ("=", Token::Equals),
    (">", Token::GreaterThan),
    ("<", Token::LessThan),
    ("~", Token::Contains),
];

fn is_special(c: char) -> bool {
    matches!(c, '=' | '!' | '(' | ')' | ',' | '>' | '<' | '~')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Identifier,
    Symbol,
}

/// Finite state lexer over a selector string.
#[derive(Debug)]
pub struct Lexer<'s> {
    input: &'s str,
    position: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(input: &'s str) -> Self {
        Self { input, position: 0 }
    }

    /// Next token and its literal text.
    pub fn lex(&mut self) -> (Token, &'s str) {
        let mut state = State::Start;
        let mut start = self.position;
        loop {
            let current = self.input[self.position..].chars().next();
            match (state, current) {
                (State::Start, None) => return (Token::EndOfString, ""),
                (State::Start, Some(c)) if c.is_whitespace() => {
                    self.position += c.len_utf8();
                    start = self.position;
                }
                (State::Start, Some(c)) if is_special(c) => state = State::Symbol,
                (State::Start, Some(_)) => state = State::Identifier,
                (State::Identifier, Some(c)) if !c.is_whitespace() && !is_special(c) => {
                    self.position += c.len_utf8();
                }
                (State::Identifier, _) => {
                    let literal = &self.input[start..self.position];
                    let token = match literal {
                        "in" => Token::In,
                        "notin" => Token::NotIn,
                        _ => Token::Identifier,
                    };
                    return (token, literal);
                }
                (State::Symbol, _) => {
                    let rest = &self.input[self.position..];
                    for (symbol, token) in SYMBOLS {
                        if rest.starts_with(symbol) {
                            self.position += symbol.len();
                            return (*token, &self.input[start..self.position]);
                        }
                    }
                    let len = current.map(char::len_utf8).unwrap_or(0);
                    self.position += len;
                    return (Token::Error, &self.input[start..self.position]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<(Token, &str)> {
        let mut lexer = Lexer::new(input);
        let mut result = Vec::new();
        loop {
            let item = lexer.lex();
            result.push(item);
            if item.0 == Token::EndOfString {
                return result;
            }
        }
    }

    #[test]
    fn operators() {
        assert_eq!(
            tokens("x=y,z,!w"),
            vec![
                (Token::Identifier, "x"),
                (Token::Equals, "="),
                (Token::Identifier, "y"),
                (Token::Comma, ","),
                (Token::Identifier, "z"),
                (Token::Comma, ","),
                (Token::DoesNotExist, "!"),
                (Token::Identifier, "w"),
                (Token::EndOfString, ""),
            ]
        );
        let lexed = tokens("a==b c!=d e>1 f<2 g~h i!~j k=~l m~=n");
        let operators = lexed
            .iter()
            .filter(|(t, _)| *t != Token::Identifier && *t != Token::EndOfString)
            .map(|(t, _)| *t)
            .collect::<Vec<_>>();
        assert_eq!(
            operators,
            vec![
                Token::DoubleEquals,
                Token::NotEquals,
                Token::GreaterThan,
                Token::LessThan,
                Token::Contains,
                Token::NotContains,
                Token::HasPrefix,
                Token::HasSuffix,
            ]
        );
    }

    #[test]
    fn keywords_and_parentheses() {
        assert_eq!(
            tokens(" x  in (a, b) ,y notin()"),
            vec![
                (Token::Identifier, "x"),
                (Token::In, "in"),
                (Token::OpenPar, "("),
                (Token::Identifier, "a"),
                (Token::Comma, ","),
                (Token::Identifier, "b"),
                (Token::ClosedPar, ")"),
                (Token::Comma, ","),
                (Token::Identifier, "y"),
                (Token::NotIn, "notin"),
                (Token::OpenPar, "("),
                (Token::ClosedPar, ")"),
                (Token::EndOfString, ""),
            ]
        );
        assert_eq!(
            tokens("inside=1"),
            vec![
                (Token::Identifier, "inside"),
                (Token::Equals, "="),
                (Token::Identifier, "1"),
                (Token::EndOfString, ""),
            ]
        );
    }

    #[test]
    fn symbol_splitting() {
        assert_eq!(
            tokens("a=!b"),
            vec![
                (Token::Identifier, "a"),
                (Token::Equals, "="),
                (Token::DoesNotExist, "!"),
                (Token::Identifier, "b"),
                (Token::EndOfString, ""),
            ]
        );
        assert_eq!(tokens(""), vec![(Token::EndOfString, "")]);
    }
}
