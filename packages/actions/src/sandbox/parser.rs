//! Recursive descent parser for custom-code scripts

use super::ast::*;
use super::error::{ScriptError, ScriptResult};
use super::lexer::{lex, Token, TokenSpan};
use serde_json::{Number, Value};

/// Deepest recursion the parser enters: brackets, unary operators and
/// nested statements each take one level
pub const MAX_NESTING: usize = 64;

/// Tallest expression tree a script may build, so evaluating or dropping it
/// stays well inside the stack
pub const MAX_EXPR_DEPTH: usize = 256;

pub fn parse(source: &str) -> ScriptResult<Script> {
    let mut tokens = Vec::new();
    for result in lex(source) {
        match result {
            Ok(spanned) => tokens.push((spanned.token, spanned.span)),
            Err(e) => {
                return Err(ScriptError::Lex {
                    span: e.span,
                    message: e.message,
                })
            }
        }
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    parser.parse_script()
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, TokenSpan)>,
    pos: usize,
    nesting: usize,
}

impl<'src> Parser<'src> {
    fn parse_script(&mut self) -> ScriptResult<Script> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Script { body })
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn parse_statement(&mut self) -> ScriptResult<Stmt> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> ScriptResult<Stmt> {
        let stmt = match self.peek_token() {
            Some(Token::Let) | Some(Token::Const) => self.parse_let()?,
            Some(Token::If) => return self.parse_if(),
            Some(Token::While) => return self.parse_while(),
            Some(Token::LBrace) => return Ok(Stmt::Block(self.parse_block()?)),
            Some(Token::Return) => {
                self.advance();
                if self.check(Token::Semi) || self.check(Token::RBrace) || self.is_at_end() {
                    Stmt::Return(None)
                } else {
                    Stmt::Return(Some(self.parse_expression()?))
                }
            }
            Some(Token::Throw) => {
                self.advance();
                Stmt::Throw(self.parse_expression()?)
            }
            Some(_) => Stmt::Expr(self.parse_expression()?),
            None => return Err(self.eof("statement")),
        };

        // Semicolons are optional
        self.match_token(Token::Semi);
        Ok(stmt)
    }

    fn parse_let(&mut self) -> ScriptResult<Stmt> {
        let start = self.peek_span();
        let mutable = matches!(self.advance(), Some((Token::Let, _)));
        let name = self.expect_ident()?;
        let init = if self.match_token(Token::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Stmt::Let {
            name,
            mutable,
            init,
            span: start.to(self.prev_span()),
        })
    }

    fn parse_if(&mut self) -> ScriptResult<Stmt> {
        self.expect(Token::If)?;
        let condition = self.parse_condition()?;
        let then_branch = self.parse_branch()?;
        let else_branch = if self.match_token(Token::Else) {
            Some(self.parse_branch()?)
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> ScriptResult<Stmt> {
        self.expect(Token::While)?;
        let condition = self.parse_condition()?;
        let body = self.parse_branch()?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_condition(&mut self) -> ScriptResult<Expr> {
        self.expect(Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(Token::RParen)?;
        Ok(condition)
    }

    /// Block or single statement after `if`/`else`/`while`
    fn parse_branch(&mut self) -> ScriptResult<Vec<Stmt>> {
        if self.check(Token::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_block(&mut self) -> ScriptResult<Vec<Stmt>> {
        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.check(Token::RBrace) {
            if self.is_at_end() {
                return Err(self.eof("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(body)
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn parse_expression(&mut self) -> ScriptResult<Expr> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> ScriptResult<Expr> {
        let target = self.parse_or()?;

        let compound = match self.peek_token() {
            Some(Token::Assign) => None,
            Some(Token::PlusAssign) => Some(BinaryOp::Add),
            Some(Token::MinusAssign) => Some(BinaryOp::Sub),
            _ => return Ok(target),
        };
        let op_span = self.peek_span();
        self.advance();

        if !matches!(
            target.kind,
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
        ) {
            return Err(ScriptError::UnexpectedToken {
                span: op_span,
                expected: "assignable expression before '='".to_string(),
                found: "expression".to_string(),
            });
        }

        let rhs = self.parse_expression()?;
        let span = target.span.to(rhs.span);
        let value = match compound {
            Some(op) => Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(target.clone()),
                    right: Box::new(rhs),
                },
                span,
            ),
            None => rhs,
        };

        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(Token::Or) {
            let right = self.parse_and()?;
            left = self.bounded(logical(LogicalOp::Or, left, right))?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.match_token(Token::And) {
            let right = self.parse_equality()?;
            left = self.bounded(logical(LogicalOp::And, left, right))?;
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = self.bounded(binary(op, left, right))?;
        }
    }

    fn parse_comparison(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Lte) => BinaryOp::Lte,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Gte) => BinaryOp::Gte,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.bounded(binary(op, left, right))?;
        }
    }

    fn parse_additive(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.bounded(binary(op, left, right))?;
        }
    }

    fn parse_multiplicative(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.bounded(binary(op, left, right))?;
        }
    }

    fn parse_unary(&mut self) -> ScriptResult<Expr> {
        let op = match self.peek_token() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.peek_span();
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        let span = start.to(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> ScriptResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(Token::Dot) {
                let property = self.expect_ident()?;
                let span = expr.span.to(self.prev_span());
                expr = self.bounded(Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                    span,
                ))?;
            } else if self.match_token(Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                let span = expr.span.to(self.prev_span());
                expr = self.bounded(Expr::new(
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                ))?;
            } else if self.match_token(Token::LParen) {
                let args = self.parse_list(Token::RParen, Self::parse_expression)?;
                let span = expr.span.to(self.prev_span());
                expr = self.bounded(Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                ))?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> ScriptResult<Expr> {
        let Some((token, span)) = self.advance().cloned() else {
            return Err(self.eof("expression"));
        };

        let kind = match token {
            Token::Number(text) => ExprKind::Literal(parse_number(text)),
            Token::String(raw) => ExprKind::Literal(Value::String(unescape(raw))),
            Token::True => ExprKind::Literal(Value::Bool(true)),
            Token::False => ExprKind::Literal(Value::Bool(false)),
            Token::Null => ExprKind::Literal(Value::Null),
            Token::Ident(name) => ExprKind::Ident(name.to_string()),
            Token::LParen => {
                let inner = self.parse_expression()?;
                self.expect(Token::RParen)?;
                return Ok(Expr::new(inner.kind, span.to(self.prev_span())));
            }
            Token::LBracket => ExprKind::Array(self.parse_list(Token::RBracket, Self::parse_expression)?),
            Token::LBrace => ExprKind::Object(self.parse_list(Token::RBrace, Self::parse_property)?),
            other => {
                return Err(ScriptError::UnexpectedToken {
                    span,
                    expected: "expression".to_string(),
                    found: other.to_string(),
                })
            }
        };

        Ok(Expr::new(kind, span.to(self.prev_span())))
    }

    /// `key: value` or shorthand `key` inside an object literal
    fn parse_property(&mut self) -> ScriptResult<(String, Expr)> {
        let span = self.peek_span();
        let key = match self.advance().cloned() {
            Some((Token::Ident(name), _)) => name.to_string(),
            Some((Token::String(raw), _)) => unescape(raw),
            Some((Token::Number(text), _)) => text.to_string(),
            Some((other, span)) => {
                return Err(ScriptError::UnexpectedToken {
                    span,
                    expected: "property name".to_string(),
                    found: other.to_string(),
                })
            }
            None => return Err(self.eof("property name")),
        };

        if self.match_token(Token::Colon) {
            Ok((key, self.parse_expression()?))
        } else {
            let value = Expr::new(ExprKind::Ident(key.clone()), span);
            Ok((key, value))
        }
    }

    /// Comma separated items up to `close`, trailing comma allowed.
    /// The opening delimiter has already been consumed.
    fn parse_list<T>(
        &mut self,
        close: Token<'src>,
        mut item: impl FnMut(&mut Self) -> ScriptResult<T>,
    ) -> ScriptResult<Vec<T>> {
        let mut items = Vec::new();
        while !self.check(close.clone()) {
            if self.is_at_end() {
                return Err(self.eof(&format!("'{}'", close)));
            }
            items.push(item(self)?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // ---------------------------------------------------------------------
    // Depth limits
    // ---------------------------------------------------------------------

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ScriptResult<T>) -> ScriptResult<T> {
        if self.nesting >= MAX_NESTING {
            return Err(ScriptError::TooDeep {
                span: self.peek_span(),
                limit: MAX_NESTING,
            });
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn bounded(&self, expr: Expr) -> ScriptResult<Expr> {
        if expr.depth() > MAX_EXPR_DEPTH {
            return Err(ScriptError::TooDeep {
                span: expr.span,
                limit: MAX_EXPR_DEPTH,
            });
        }
        Ok(expr)
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    fn peek(&self) -> Option<&(Token<'src>, TokenSpan)> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token<'src>> {
        self.peek().map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, TokenSpan)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ScriptResult<()> {
        if self.check(token.clone()) {
            self.advance();
            return Ok(());
        }
        match self.peek() {
            Some((found, span)) => Err(ScriptError::UnexpectedToken {
                span: *span,
                expected: format!("'{}'", token),
                found: found.to_string(),
            }),
            None => Err(self.eof(&format!("'{}'", token))),
        }
    }

    fn expect_ident(&mut self) -> ScriptResult<String> {
        match self.peek() {
            Some((Token::Ident(name), _)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            Some((found, span)) => Err(ScriptError::UnexpectedToken {
                span: *span,
                expected: "identifier".to_string(),
                found: found.to_string(),
            }),
            None => Err(self.eof("identifier")),
        }
    }

    fn peek_span(&self) -> TokenSpan {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| *span)
            .unwrap_or_else(|| self.end_span())
    }

    fn prev_span(&self) -> TokenSpan {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, span)| *span)
            .unwrap_or_else(|| self.end_span())
    }

    fn end_span(&self) -> TokenSpan {
        let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
        TokenSpan { start: end, end }
    }

    fn eof(&self, expected: &str) -> ScriptError {
        ScriptError::UnexpectedEof {
            expected: expected.to_string(),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// Integers stay integers so `1 + 1` prints as `2`, not `2.0`
fn parse_number(text: &str) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn unescape(raw: &str) -> String {
    let inner = &raw[1..raw.len().saturating_sub(1).max(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expr(source: &str) -> ExprKind {
        match parse(source).unwrap().body.into_iter().next() {
            Some(Stmt::Expr(e)) => e.kind,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let ExprKind::Binary { op, right, .. } = expr("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));

        let ExprKind::Logical { op, .. } = expr("a == 1 || b && c") else {
            panic!("expected logical");
        };
        assert_eq!(op, LogicalOp::Or);
    }

    #[test]
    fn test_method_call_chain() {
        let ExprKind::Call { callee, args } = expr("state.set('count', 1)") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].kind, ExprKind::Literal(json!("count")));
        assert!(matches!(callee.kind, ExprKind::Member { ref property, .. } if property == "set"));
    }

    #[test]
    fn test_object_and_array_literals() {
        let ExprKind::Object(props) = expr("({ a: 1, 'b c': [1, 2,], d, })") else {
            panic!("expected object");
        };
        let keys: Vec<_> = props.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b c", "d"]);
        assert!(matches!(props[1].1.kind, ExprKind::Array(ref items) if items.len() == 2));
    }

    #[test]
    fn test_statements() {
        let script = parse(
            r#"
            let total = 0;
            const limit = 3
            while (total < limit) { total += 1 }
            if (total == 3) return total; else throw "bad"
            "#,
        )
        .unwrap();

        assert_eq!(script.body.len(), 4);
        assert!(matches!(script.body[0], Stmt::Let { mutable: true, .. }));
        assert!(matches!(script.body[1], Stmt::Let { mutable: false, .. }));
        assert!(matches!(script.body[3], Stmt::If { else_branch: Some(_), .. }));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(expr(r#""a\n\"b\" A""#), ExprKind::Literal(json!("a\n\"b\" A")));
        assert_eq!(expr("'it\\'s'"), ExprKind::Literal(json!("it's")));
    }

    #[test]
    fn test_numbers_keep_integers() {
        assert_eq!(expr("42"), ExprKind::Literal(json!(42)));
        assert_eq!(expr("1.5"), ExprKind::Literal(json!(1.5)));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(matches!(
            parse("1 + 2 = 3"),
            Err(ScriptError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_unterminated_block() {
        assert!(matches!(parse("if (x) { y()"), Err(ScriptError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_lex_error_surfaces() {
        assert!(matches!(parse("let a = #"), Err(ScriptError::Lex { .. })));
    }

    #[test]
    fn test_expression_depth() {
        let Some(Stmt::Expr(e)) = parse("a.b(1 + 2)").unwrap().body.into_iter().next() else {
            panic!("expected expression statement");
        };
        // call -> binary -> literal
        assert_eq!(e.depth(), 3);
    }

    #[test]
    fn test_nesting_limit() {
        let within = format!("{}1{}", "(".repeat(MAX_NESTING - 4), ")".repeat(MAX_NESTING - 4));
        assert!(parse(&within).is_ok());

        let beyond = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(matches!(
            parse(&beyond),
            Err(ScriptError::TooDeep { limit: MAX_NESTING, .. })
        ));

        let chain = format!("x{}", ".y".repeat(MAX_EXPR_DEPTH));
        assert!(matches!(
            parse(&chain),
            Err(ScriptError::TooDeep { limit: MAX_EXPR_DEPTH, .. })
        ));
    }
}
