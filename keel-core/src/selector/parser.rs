use super::{
    Operator, Requirement, SelectorError,
    lexer::{Lexer, Token},
};

/// How `in` / `notin` are read: keywords after a key, plain identifiers where
/// a value is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    KeyAndOperator,
    Values,
}

/// Recursive descent parser over the scanned tokens, with explicit position
/// and one token of lookahead.
pub(super) struct Parser<'s> {
    items: Vec<(Token, &'s str)>,
    position: usize,
    errors: Vec<String>,
}

impl<'s> Parser<'s> {
    pub(super) fn new(input: &'s str) -> Self {
        let mut lexer = Lexer::new(input);
        let mut items = Vec::new();
        loop {
            let item = lexer.lex();
            items.push(item);
            if item.0 == Token::EndOfString {
                break;
            }
        }
        Self {
            items,
            position: 0,
            errors: Vec::new(),
        }
    }

    fn resolve(item: (Token, &'s str), context: Context) -> (Token, &'s str) {
        match item {
            (Token::In | Token::NotIn, literal) if context == Context::Values => {
                (Token::Identifier, literal)
            }
            v => v,
        }
    }

    fn lookahead(&self, context: Context) -> (Token, &'s str) {
        let index = self.position.min(self.items.len() - 1);
        Self::resolve(self.items[index], context)
    }

    fn consume(&mut self, context: Context) -> (Token, &'s str) {
        let index = self.position.min(self.items.len() - 1);
        self.position += 1;
        Self::resolve(self.items[index], context)
    }

    fn syntax(&self, found: &str, expected: &str) -> SelectorError {
        SelectorError::Syntax {
            position: self.position,
            found: found.to_string(),
            expected: expected.to_string(),
        }
    }

    pub(super) fn parse(mut self) -> Result<Vec<Requirement>, SelectorError> {
        let mut requirements = Vec::new();
        loop {
            let (token, literal) = self.lookahead(Context::Values);
            match token {
                Token::Identifier | Token::DoesNotExist => {
                    requirements.push(self.parse_requirement()?);
                    let (token, literal) = self.consume(Context::Values);
                    match token {
                        Token::EndOfString => break,
                        Token::Comma => {
                            let (token, literal) = self.lookahead(Context::Values);
                            if token != Token::Identifier && token != Token::DoesNotExist {
                                return Err(self.syntax(
                                    display_literal(token, literal),
                                    "identifier after ','",
                                ));
                            }
                        }
                        _ => {
                            return Err(self.syntax(
                                display_literal(token, literal),
                                "',' or 'end of string'",
                            ));
                        }
                    }
                }
                Token::EndOfString => break,
                _ => {
                    return Err(self.syntax(
                        display_literal(token, literal),
                        "'!', identifier, or 'end of string'",
                    ));
                }
            }
        }
        if self.errors.is_empty() {
            Ok(requirements)
        } else {
            Err(SelectorError::Invalid(self.errors))
        }
    }

    fn parse_requirement(&mut self) -> Result<Requirement, SelectorError> {
        let (key, operator) = self.parse_key_and_infer_operator()?;
        if let Some(operator) = operator {
            return Ok(self.validated(key, operator, Vec::new()));
        }
        let operator = self.parse_operator()?;
        let values = match operator {
            Operator::In | Operator::NotIn => self.parse_values()?,
            _ => vec![self.parse_exact_value()?],
        };
        Ok(self.validated(key, operator, values))
    }

    fn validated(&mut self, key: String, operator: Operator, values: Vec<String>) -> Requirement {
        self.errors.extend(Requirement::problems(&key, operator, &values));
        Requirement {
            key,
            operator,
            values,
        }
    }

    /// Reads the key, returning the operator when it is implied (`!key`,
    /// or a bare key followed by ',' or the end).
    fn parse_key_and_infer_operator(
        &mut self,
    ) -> Result<(String, Option<Operator>), SelectorError> {
        let (mut token, mut literal) = self.consume(Context::Values);
        let mut operator = None;
        if token == Token::DoesNotExist {
            operator = Some(Operator::DoesNotExist);
            (token, literal) = self.consume(Context::Values);
        }
        if token != Token::Identifier {
            return Err(self.syntax(display_literal(token, literal), "identifier"));
        }
        let (next, _) = self.lookahead(Context::Values);
        if operator.is_none() && matches!(next, Token::EndOfString | Token::Comma) {
            operator = Some(Operator::Exists);
        }
        Ok((literal.to_string(), operator))
    }

    fn parse_operator(&mut self) -> Result<Operator, SelectorError> {
        let (token, literal) = self.consume(Context::KeyAndOperator);
        Ok(match token {
            Token::In => Operator::In,
            Token::NotIn => Operator::NotIn,
            Token::Equals => Operator::Equals,
            Token::DoubleEquals => Operator::DoubleEquals,
            Token::NotEquals => Operator::NotEquals,
            Token::GreaterThan => Operator::GreaterThan,
            Token::LessThan => Operator::LessThan,
            Token::Contains => Operator::Contains,
            Token::NotContains => Operator::NotContains,
            Token::HasPrefix => Operator::HasPrefix,
            Token::HasSuffix => Operator::HasSuffix,
            _ => {
                return Err(self.syntax(
                    display_literal(token, literal),
                    "one of =, ==, !=, >, <, ~, !~, =~, ~=, in, notin",
                ));
            }
        })
    }

    /// `( v1, v2, ... )`, possibly empty. Empty entries are kept as empty
    /// strings.
    fn parse_values(&mut self) -> Result<Vec<String>, SelectorError> {
        let (token, literal) = self.consume(Context::Values);
        if token != Token::OpenPar {
            return Err(self.syntax(display_literal(token, literal), "'('"));
        }
        let (token, literal) = self.lookahead(Context::Values);
        match token {
            Token::Identifier | Token::Comma => {
                let values = self.parse_identifiers_list()?;
                let (token, literal) = self.consume(Context::Values);
                if token != Token::ClosedPar {
                    return Err(self.syntax(display_literal(token, literal), "')'"));
                }
                Ok(values)
            }
            Token::ClosedPar => {
                self.consume(Context::Values);
                Ok(Vec::new())
            }
            _ => Err(self.syntax(display_literal(token, literal), "',', ')' or identifier")),
        }
    }

    fn parse_identifiers_list(&mut self) -> Result<Vec<String>, SelectorError> {
        let mut values = Vec::new();
        loop {
            let (token, literal) = self.consume(Context::Values);
            match token {
                Token::Identifier => {
                    values.push(literal.to_string());
                    let (token, literal) = self.lookahead(Context::Values);
                    match token {
                        Token::Comma => continue,
                        Token::ClosedPar => return Ok(values),
                        _ => {
                            return Err(self.syntax(display_literal(token, literal), "',' or ')'"));
                        }
                    }
                }
                Token::Comma => {
                    if values.is_empty() {
                        values.push(String::new());
                    }
                    let (token, _) = self.lookahead(Context::Values);
                    if token == Token::ClosedPar {
                        values.push(String::new());
                        return Ok(values);
                    }
                    if token == Token::Comma {
                        self.consume(Context::Values);
                        values.push(String::new());
                    }
                }
                _ => {
                    return Err(self.syntax(display_literal(token, literal), "',', or identifier"));
                }
            }
        }
    }

    /// Single operand, empty when the clause ends right after the operator.
    fn parse_exact_value(&mut self) -> Result<String, SelectorError> {
        let (token, _) = self.lookahead(Context::Values);
        if matches!(token, Token::EndOfString | Token::Comma) {
            return Ok(String::new());
        }
        let (token, literal) = self.consume(Context::Values);
        if token == Token::Identifier {
            return Ok(literal.to_string());
        }
        Err(self.syntax(display_literal(token, literal), "identifier"))
    }
}

fn display_literal<'a>(token: Token, literal: &'a str) -> &'a str {
    if token == Token::EndOfString {
        "end of string"
    } else {
        literal
    }
}
