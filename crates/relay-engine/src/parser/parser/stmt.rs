//! Statement parsing

use std::sync::Arc;

use super::expr::parse_expression;
use super::guards::{nested, LoopGuard};
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::token::{Span, Token};

/// Parse a single statement.
pub fn parse_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    nested(parser, "statement", parse_statement_inner)
}

fn parse_statement_inner(parser: &mut Parser) -> Result<Statement, ParseError> {
    match parser.current() {
        Token::Let | Token::Const => parse_variable_declaration(parser),
        Token::Function if matches!(parser.peek(), Some(Token::Identifier(_))) => {
            let decl = parse_function_body(parser, false)?;
            Ok(Statement::Function(decl))
        }
        Token::Class => parse_class_declaration(parser),
        Token::If => parse_if_statement(parser),
        Token::While => parse_while_statement(parser),
        Token::For => parse_for_of_statement(parser),
        Token::Return => parse_return_statement(parser),
        Token::Break => {
            let span = parser.advance().1;
            parser.eat(&Token::Semicolon);
            Ok(Statement::Break(span))
        }
        Token::Continue => {
            let span = parser.advance().1;
            parser.eat(&Token::Semicolon);
            Ok(Statement::Continue(span))
        }
        Token::Throw => {
            let start = parser.advance().1;
            let value = parse_expression(parser)?;
            parser.eat(&Token::Semicolon);
            let span = start.to(&value.span());
            Ok(Statement::Throw(value, span))
        }
        Token::Try => parse_try_statement(parser),
        Token::Import => parse_import_declaration(parser),
        Token::Semicolon => Ok(Statement::Empty(parser.advance().1)),
        _ => {
            let expr = parse_expression(parser)?;
            parser.eat(&Token::Semicolon);
            Ok(Statement::Expression(expr))
        }
    }
}

fn parse_variable_declaration(parser: &mut Parser) -> Result<Statement, ParseError> {
    let (keyword, start) = parser.advance();
    let constant = keyword == Token::Const;
    let (name, name_span) = parser.expect_identifier()?;

    let initializer = if parser.eat(&Token::Equal) {
        Some(parse_expression(parser)?)
    } else {
        None
    };

    if constant && initializer.is_none() {
        return Err(ParseError::invalid_syntax(
            format!("Missing initializer in const declaration '{}'", name),
            name_span,
        ));
    }

    let end = initializer.as_ref().map(Expression::span).unwrap_or(name_span);
    parser.eat(&Token::Semicolon);
    Ok(Statement::Variable(VariableDeclaration {
        name,
        constant,
        initializer,
        span: start.to(&end),
    }))
}

/// Parse `function name(params) { body }`.
///
/// The name is optional when `anonymous_ok` is set (function expressions).
pub(crate) fn parse_function_body(
    parser: &mut Parser,
    anonymous_ok: bool,
) -> Result<Arc<FunctionDecl>, ParseError> {
    let start = parser.expect(Token::Function)?;
    let name = match parser.current() {
        Token::Identifier(_) => parser.expect_identifier()?.0,
        _ if anonymous_ok => "<anonymous>".to_string(),
        _ => return Err(parser.unexpected_token(&[Token::Identifier("name".into())])),
    };
    parse_callable(parser, name, start)
}

/// Parameter list and body shared by functions, methods and constructors.
fn parse_callable(
    parser: &mut Parser,
    name: String,
    start: Span,
) -> Result<Arc<FunctionDecl>, ParseError> {
    let params = parse_parameters(parser)?;
    let (body, end) = parse_block(parser)?;
    Ok(Arc::new(FunctionDecl {
        name,
        params,
        body,
        span: start.to(&end),
    }))
}

fn parse_parameters(parser: &mut Parser) -> Result<Vec<Parameter>, ParseError> {
    parser.expect(Token::LeftParen)?;
    let mut params: Vec<Parameter> = Vec::new();
    let mut guard = LoopGuard::new("parameters");
    while !parser.check(&Token::RightParen) {
        guard.check()?;
        let (name, span) = parser.expect_identifier()?;
        if params.iter().any(|p| p.name == name) {
            return Err(ParseError::invalid_syntax(
                format!("Duplicate parameter '{}'", name),
                span,
            ));
        }
        let default = if parser.eat(&Token::Equal) {
            Some(parse_expression(parser)?)
        } else {
            None
        };
        if default.is_none() && params.iter().any(|p| p.default.is_some()) {
            return Err(ParseError::invalid_syntax(
                format!("Parameter '{}' without default follows a defaulted one", name),
                span,
            ));
        }
        params.push(Parameter { name, default });
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    parser.expect(Token::RightParen)?;
    Ok(params)
}

/// Parse `{ statements }`. Returns the statements and the closing brace span.
fn parse_block(parser: &mut Parser) -> Result<(Vec<Statement>, Span), ParseError> {
    parser.expect(Token::LeftBrace)?;
    parser.block_depth += 1;
    let result = parse_block_contents(parser);
    parser.block_depth -= 1;
    let statements = result?;
    let end = parser.expect(Token::RightBrace)?;
    Ok((statements, end))
}

fn parse_block_contents(parser: &mut Parser) -> Result<Vec<Statement>, ParseError> {
    let mut statements = Vec::new();
    let mut guard = LoopGuard::new("block");
    while !parser.check(&Token::RightBrace) && !parser.at_end() {
        guard.check()?;
        statements.push(parse_statement(parser)?);
    }
    Ok(statements)
}

/// Body of `if`/`while`/`for`: a braced block or a single statement.
fn parse_body(parser: &mut Parser) -> Result<(Vec<Statement>, Span), ParseError> {
    if parser.check(&Token::LeftBrace) {
        return parse_block(parser);
    }
    parser.block_depth += 1;
    let result = parse_statement(parser);
    parser.block_depth -= 1;
    let statement = result?;
    let span = statement.span();
    Ok((vec![statement], span))
}

fn parse_condition(parser: &mut Parser) -> Result<Expression, ParseError> {
    parser.expect(Token::LeftParen)?;
    let condition = parse_expression(parser)?;
    parser.expect(Token::RightParen)?;
    Ok(condition)
}

fn parse_if_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(Token::If)?;
    let condition = parse_condition(parser)?;
    let (then_branch, mut end) = parse_body(parser)?;

    let else_branch = if parser.eat(&Token::Else) {
        let (branch, branch_end) = if parser.check(&Token::If) {
            let nested_if = parse_statement(parser)?;
            let span = nested_if.span();
            (vec![nested_if], span)
        } else {
            parse_body(parser)?
        };
        end = branch_end;
        Some(branch)
    } else {
        None
    };

    Ok(Statement::If(IfStatement {
        condition,
        then_branch,
        else_branch,
        span: start.to(&end),
    }))
}

fn parse_while_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(Token::While)?;
    let condition = parse_condition(parser)?;
    let (body, end) = parse_body(parser)?;
    Ok(Statement::While(WhileStatement {
        condition,
        body,
        span: start.to(&end),
    }))
}

fn parse_for_of_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(Token::For)?;
    parser.expect(Token::LeftParen)?;
    // `for (let x of xs)` and `for (x of xs)` are both accepted
    if !parser.eat(&Token::Let) {
        parser.eat(&Token::Const);
    }
    let (binding, _) = parser.expect_identifier()?;
    parser.expect(Token::Of)?;
    let iterable = parse_expression(parser)?;
    parser.expect(Token::RightParen)?;
    let (body, end) = parse_body(parser)?;
    Ok(Statement::ForOf(ForOfStatement {
        binding,
        iterable,
        body,
        span: start.to(&end),
    }))
}

fn parse_return_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(Token::Return)?;
    let value = match parser.current() {
        Token::Semicolon | Token::RightBrace | Token::Eof => None,
        _ => Some(parse_expression(parser)?),
    };
    parser.eat(&Token::Semicolon);
    let end = value.as_ref().map(Expression::span).unwrap_or(start);
    Ok(Statement::Return(value, start.to(&end)))
}

fn parse_try_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(Token::Try)?;
    let (body, _) = parse_block(parser)?;
    parser.expect(Token::Catch)?;

    let catch_binding = if parser.eat(&Token::LeftParen) {
        let (name, _) = parser.expect_identifier()?;
        parser.expect(Token::RightParen)?;
        Some(name)
    } else {
        None
    };

    let (handler, end) = parse_block(parser)?;
    Ok(Statement::Try(TryStatement {
        body,
        catch_binding,
        handler,
        span: start.to(&end),
    }))
}

fn parse_import_declaration(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    if parser.block_depth > 0 {
        return Err(ParseError::invalid_syntax(
            "Import is only allowed at the top level of a component",
            start,
        ));
    }
    parser.expect(Token::Import)?;

    let (first, mut end) = parser.expect_identifier()?;
    let mut path = vec![first];
    let mut guard = LoopGuard::new("import_path");
    while parser.eat(&Token::Dot) {
        guard.check()?;
        let (segment, span) = parser.expect_identifier()?;
        path.push(segment);
        end = span;
    }

    let alias = if parser.eat(&Token::As) {
        let (alias, span) = parser.expect_identifier()?;
        end = span;
        Some(alias)
    } else {
        None
    };

    parser.eat(&Token::Semicolon);
    Ok(Statement::Import(ImportDeclaration {
        path,
        alias,
        span: start.to(&end),
    }))
}

// ============================================================================
// Classes
// ============================================================================

fn parse_class_declaration(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.expect(Token::Class)?;
    let (name, _) = parser.expect_identifier()?;

    let parent = if parser.eat(&Token::Extends) {
        let (parent_name, span) = parser.expect_identifier()?;
        let mut parent = Expression::Identifier(parent_name, span);
        while parser.eat(&Token::Dot) {
            let (property, end) = parser.expect_property_name()?;
            let span = parent.span().to(&end);
            parent = Expression::Member {
                object: Box::new(parent),
                property,
                span,
            };
        }
        Some(parent)
    } else {
        None
    };

    parser.expect(Token::LeftBrace)?;
    parser.block_depth += 1;
    let members = parse_class_members(parser, &name);
    parser.block_depth -= 1;
    let mut decl = members?;
    let end = parser.expect(Token::RightBrace)?;

    decl.name = name;
    decl.parent = parent;
    decl.span = start.to(&end);
    Ok(Statement::Class(Arc::new(decl)))
}

fn parse_class_members(parser: &mut Parser, class_name: &str) -> Result<ClassDecl, ParseError> {
    let mut decl = ClassDecl {
        name: String::new(),
        parent: None,
        constructor: None,
        methods: Vec::new(),
        static_methods: Vec::new(),
        fields: Vec::new(),
        span: Span::default(),
    };

    let mut guard = LoopGuard::new("class_body");
    while !parser.check(&Token::RightBrace) && !parser.at_end() {
        guard.check()?;
        if parser.eat(&Token::Semicolon) {
            continue;
        }

        // `static` alone followed by `(` or `=` is a member named "static"
        let is_static = parser.check(&Token::Static)
            && !matches!(parser.peek(), Some(Token::LeftParen | Token::Equal));
        if is_static {
            parser.advance();
        }

        let (member, span) = parser.expect_property_name()?;
        if parser.check(&Token::LeftParen) {
            let method = parse_callable(parser, member.clone(), span)?;
            if member == "constructor" && !is_static {
                if decl.constructor.is_some() {
                    return Err(ParseError::invalid_syntax(
                        format!("Class '{}' has more than one constructor", class_name),
                        span,
                    ));
                }
                decl.constructor = Some(method);
            } else if is_static {
                decl.static_methods.push(method);
            } else {
                decl.methods.push(method);
            }
            continue;
        }

        let initializer = if parser.eat(&Token::Equal) {
            Some(parse_expression(parser)?)
        } else {
            None
        };
        parser.eat(&Token::Semicolon);
        decl.fields.push(FieldDecl {
            name: member,
            initializer,
            is_static,
            span,
        });
    }
    Ok(decl)
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_program;
    use crate::parser::ast::*;

    #[test]
    fn test_class_members_are_sorted() {
        let program = parse_program(
            "class Counter extends Base {
                count = 0;
                static created = 0;
                constructor(start = 0) { this.count = start; }
                increment(step = 1) { this.count += step; return this.count; }
                static make() { return new Counter(); }
            }",
        )
        .unwrap();

        let Statement::Class(class) = &program.statements[0] else {
            panic!("expected class");
        };
        assert_eq!(class.name, "Counter");
        assert!(class.parent.is_some());
        assert!(class.constructor.is_some());
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.static_methods.len(), 1);
        assert_eq!(class.fields.len(), 2);
        assert!(class.fields[1].is_static);
    }

    #[test]
    fn test_import_only_at_top_level() {
        assert!(parse_program("import geometry.shapes as shapes;").is_ok());
        assert!(parse_program("function f() { import geometry; }").is_err());
    }

    #[test]
    fn test_else_if_chain_nests() {
        let program = parse_program("if (a) { x } else if (b) { y } else { z }").unwrap();
        let Statement::If(stmt) = &program.statements[0] else {
            panic!("expected if");
        };
        let else_branch = stmt.else_branch.as_ref().unwrap();
        assert!(matches!(else_branch[0], Statement::If(_)));
    }

    #[test]
    fn test_defaulted_parameter_order() {
        assert!(parse_program("function f(a, b = 1) {}").is_ok());
        assert!(parse_program("function f(a = 1, b) {}").is_err());
        assert!(parse_program("function f(a, a) {}").is_err());
    }
}
