//! Expression parsing
//!
//! Precedence, lowest to highest:
//! assignment, `?:`, `??`, `||`, `&&`, equality, comparison, additive,
//! multiplicative, unary, `**` (right associative), postfix (call/member/index).

use super::guards::{nested, LoopGuard};
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::{Span, Token};

/// Parse an expression.
pub fn parse_expression(parser: &mut Parser) -> Result<Expression, ParseError> {
    nested(parser, "expression", parse_assignment)
}

fn parse_assignment(parser: &mut Parser) -> Result<Expression, ParseError> {
    let target = parse_conditional(parser)?;

    let op = match parser.current() {
        Token::Equal => None,
        Token::PlusEqual => Some(BinaryOp::Add),
        Token::MinusEqual => Some(BinaryOp::Subtract),
        Token::StarEqual => Some(BinaryOp::Multiply),
        Token::SlashEqual => Some(BinaryOp::Divide),
        Token::PercentEqual => Some(BinaryOp::Modulo),
        _ => return Ok(target),
    };

    if !target.is_assignable() {
        return Err(ParseError::invalid_syntax(
            "Invalid assignment target",
            target.span(),
        ));
    }
    parser.advance();

    let value = nested(parser, "assignment", parse_assignment)?;
    let span = target.span().to(&value.span());
    Ok(Expression::Assign {
        target: Box::new(target),
        op,
        value: Box::new(value),
        span,
    })
}

fn parse_conditional(parser: &mut Parser) -> Result<Expression, ParseError> {
    let test = parse_coalesce(parser)?;
    if !parser.eat(&Token::Question) {
        return Ok(test);
    }
    let consequent = nested(parser, "conditional", parse_assignment)?;
    parser.expect(Token::Colon)?;
    let alternate = nested(parser, "conditional", parse_assignment)?;
    let span = test.span().to(&alternate.span());
    Ok(Expression::Conditional {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
        span,
    })
}

fn parse_coalesce(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_or(parser)?;
    while parser.eat(&Token::QuestionQuestion) {
        let right = parse_or(parser)?;
        left = logical(LogicalOp::Coalesce, left, right);
    }
    Ok(left)
}

fn parse_or(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_and(parser)?;
    while parser.eat(&Token::PipePipe) {
        let right = parse_and(parser)?;
        left = logical(LogicalOp::Or, left, right);
    }
    Ok(left)
}

fn parse_and(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_equality(parser)?;
    while parser.eat(&Token::AmpAmp) {
        let right = parse_equality(parser)?;
        left = logical(LogicalOp::And, left, right);
    }
    Ok(left)
}

fn parse_equality(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_comparison(parser)?;
    loop {
        let op = match parser.current() {
            Token::EqualEqual => BinaryOp::Equal,
            Token::BangEqual => BinaryOp::NotEqual,
            _ => return Ok(left),
        };
        parser.advance();
        let right = parse_comparison(parser)?;
        left = binary(op, left, right);
    }
}

fn parse_comparison(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_additive(parser)?;
    loop {
        let op = match parser.current() {
            Token::Less => BinaryOp::Less,
            Token::LessEqual => BinaryOp::LessEqual,
            Token::Greater => BinaryOp::Greater,
            Token::GreaterEqual => BinaryOp::GreaterEqual,
            _ => return Ok(left),
        };
        parser.advance();
        let right = parse_additive(parser)?;
        left = binary(op, left, right);
    }
}

fn parse_additive(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_multiplicative(parser)?;
    loop {
        let op = match parser.current() {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Subtract,
            _ => return Ok(left),
        };
        parser.advance();
        let right = parse_multiplicative(parser)?;
        left = binary(op, left, right);
    }
}

fn parse_multiplicative(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_unary(parser)?;
    loop {
        let op = match parser.current() {
            Token::Star => BinaryOp::Multiply,
            Token::Slash => BinaryOp::Divide,
            Token::Percent => BinaryOp::Modulo,
            _ => return Ok(left),
        };
        parser.advance();
        let right = parse_unary(parser)?;
        left = binary(op, left, right);
    }
}

fn parse_unary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let op = match parser.current() {
        Token::Bang => UnaryOp::Not,
        Token::Minus => UnaryOp::Negate,
        Token::Typeof => UnaryOp::Typeof,
        _ => return parse_power(parser),
    };
    let start = parser.advance().1;
    let operand = nested(parser, "unary expression", parse_unary)?;
    let span = start.to(&operand.span());
    Ok(Expression::Unary {
        op,
        operand: Box::new(operand),
        span,
    })
}

fn parse_power(parser: &mut Parser) -> Result<Expression, ParseError> {
    let base = parse_postfix(parser)?;
    if !parser.eat(&Token::StarStar) {
        return Ok(base);
    }
    let exponent = nested(parser, "exponent", parse_unary)?;
    Ok(binary(BinaryOp::Power, base, exponent))
}

fn parse_postfix(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut expr = parse_primary(parser)?;
    let mut guard = LoopGuard::new("postfix");
    loop {
        guard.check()?;
        match parser.current() {
            Token::LeftParen => {
                let (args, end) = parse_arguments(parser)?;
                let span = expr.span().to(&end);
                expr = Expression::Call {
                    callee: Box::new(expr),
                    args,
                    span,
                };
            }
            Token::Dot | Token::LeftBracket => expr = parse_member_suffix(parser, expr)?,
            _ => return Ok(expr),
        }
    }
}

/// Parse one `.name` or `[index]` suffix applied to `object`.
fn parse_member_suffix(parser: &mut Parser, object: Expression) -> Result<Expression, ParseError> {
    if parser.eat(&Token::Dot) {
        let (property, end) = parser.expect_property_name()?;
        let span = object.span().to(&end);
        return Ok(Expression::Member {
            object: Box::new(object),
            property,
            span,
        });
    }
    parser.expect(Token::LeftBracket)?;
    let index = parse_expression(parser)?;
    let end = parser.expect(Token::RightBracket)?;
    let span = object.span().to(&end);
    Ok(Expression::Index {
        object: Box::new(object),
        index: Box::new(index),
        span,
    })
}

/// Parse a parenthesized argument list. Returns the arguments and the closing span.
pub(crate) fn parse_arguments(parser: &mut Parser) -> Result<(Vec<Argument>, Span), ParseError> {
    parser.expect(Token::LeftParen)?;
    let mut args = Vec::new();
    let mut guard = LoopGuard::new("arguments");
    while !parser.check(&Token::RightParen) {
        guard.check()?;

        let is_named = matches!(parser.peek(), Some(Token::Colon))
            && (matches!(parser.current(), Token::Identifier(_))
                || parser.current().keyword_text().is_some());
        let name = if is_named {
            let (label, _) = parser.expect_property_name()?;
            parser.expect(Token::Colon)?;
            Some(label)
        } else {
            None
        };

        let value = parse_expression(parser)?;
        if name.is_none() && args.iter().any(|a: &Argument| a.name.is_some()) {
            return Err(ParseError::invalid_syntax(
                "Positional argument follows named argument",
                value.span(),
            ));
        }
        args.push(Argument { name, value });

        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    let end = parser.expect(Token::RightParen)?;
    Ok((args, end))
}

fn parse_primary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let span = parser.current_span();
    match parser.current().clone() {
        Token::Null => {
            parser.advance();
            Ok(Expression::Null(span))
        }
        Token::True => {
            parser.advance();
            Ok(Expression::Bool(true, span))
        }
        Token::False => {
            parser.advance();
            Ok(Expression::Bool(false, span))
        }
        Token::IntLiteral(n) => {
            parser.advance();
            Ok(Expression::Int(n, span))
        }
        Token::FloatLiteral(n) => {
            parser.advance();
            Ok(Expression::Float(n, span))
        }
        Token::StringLiteral(s) => {
            parser.advance();
            Ok(Expression::Str(s, span))
        }
        Token::Identifier(name) => {
            parser.advance();
            Ok(Expression::Identifier(name, span))
        }
        Token::This => {
            parser.advance();
            Ok(Expression::This(span))
        }
        Token::LeftParen => {
            parser.advance();
            let inner = parse_expression(parser)?;
            parser.expect(Token::RightParen)?;
            Ok(inner)
        }
        Token::LeftBracket => parse_list(parser),
        Token::LeftBrace => parse_dict(parser),
        Token::Function => {
            let decl = super::stmt::parse_function_body(parser, true)?;
            Ok(Expression::Function(decl))
        }
        Token::New => parse_new(parser),
        Token::Super => parse_super(parser),
        _ => Err(parser.unexpected_token(&[])),
    }
}

fn parse_list(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.expect(Token::LeftBracket)?;
    let mut items = Vec::new();
    let mut guard = LoopGuard::new("list_literal");
    while !parser.check(&Token::RightBracket) {
        guard.check()?;
        items.push(parse_expression(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    let end = parser.expect(Token::RightBracket)?;
    Ok(Expression::List(items, start.to(&end)))
}

fn parse_dict(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.expect(Token::LeftBrace)?;
    let mut entries = Vec::new();
    let mut guard = LoopGuard::new("dict_literal");
    while !parser.check(&Token::RightBrace) {
        guard.check()?;
        let key = match parser.current().clone() {
            Token::StringLiteral(s) => {
                parser.advance();
                s
            }
            Token::IntLiteral(n) => {
                parser.advance();
                n.to_string()
            }
            _ => parser.expect_property_name()?.0,
        };
        parser.expect(Token::Colon)?;
        let value = parse_expression(parser)?;
        entries.push((key, value));
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    let end = parser.expect(Token::RightBrace)?;
    Ok(Expression::Dict(entries, start.to(&end)))
}

/// `new Callee(args)` where the callee is a member chain without calls.
fn parse_new(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.expect(Token::New)?;
    let (name, name_span) = parser.expect_identifier()?;
    let mut class = Expression::Identifier(name, name_span);
    while matches!(parser.current(), Token::Dot | Token::LeftBracket) {
        class = parse_member_suffix(parser, class)?;
    }
    let (args, end) = if parser.check(&Token::LeftParen) {
        parse_arguments(parser)?
    } else {
        (Vec::new(), class.span())
    };
    Ok(Expression::New {
        class: Box::new(class),
        args,
        span: start.to(&end),
    })
}

fn parse_super(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.expect(Token::Super)?;
    if parser.check(&Token::LeftParen) {
        let (args, end) = parse_arguments(parser)?;
        return Ok(Expression::SuperCall {
            args,
            span: start.to(&end),
        });
    }
    if parser.eat(&Token::Dot) {
        let (property, end) = parser.expect_property_name()?;
        return Ok(Expression::SuperMember {
            property,
            span: start.to(&end),
        });
    }
    Err(parser.unexpected_token(&[Token::LeftParen, Token::Dot]))
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    let span = left.span().to(&right.span());
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}

fn logical(op: LogicalOp, left: Expression, right: Expression) -> Expression {
    let span = left.span().to(&right.span());
    Expression::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}
