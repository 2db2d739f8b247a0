//! The parser.
//!
//! Expressions use Pratt parsing: every token kind maps to an optional
//! prefix rule, an optional infix rule, and a precedence, and
//! `parse_precedence` climbs while the next token binds at least as tightly
//! as requested. Statements and declarations are plain recursive descent.
//!
//! On a syntax error the parser records a diagnostic, enters panic mode to
//! suppress cascading errors, and resynchronizes at the next statement
//! boundary, so a single parse reports every independent syntax error. The
//! returned AST is meaningful only when no diagnostics were produced.

use mcc_arena::StringInterner;

use crate::ast::{
    Block, BlockItem, Decl, DeclData, DeclKind, Expr, ExprData, ExprKind, ForInit, ParamDecl,
    Stmt, StmtData, StmtKind, TranslationUnit,
};
use crate::ast::{BinaryOp, UnaryOp};
use crate::diagnostic::Diagnostic;
use crate::srcloc::SourceRange;
use crate::token::{Token, TokenKind};

/// What a parse produced: the translation unit under construction and every
/// syntax diagnostic. The AST is only meaningful when `diagnostics` is
/// empty, but it is always structurally valid.
pub struct ParseResult {
    /// The parsed translation unit.
    pub tu: TranslationUnit,
    /// Syntax errors, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a token stream produced by [`crate::lexer::lex`].
pub fn parse(source: &str, tokens: &[Token], syms: &mut StringInterner) -> ParseResult {
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        syms,
        tu: TranslationUnit::default(),
        diagnostics: Vec::new(),
        panic_mode: false,
    };

    let mut items = Vec::new();
    while !parser.is_at_end() {
        if let Some(decl) = parser.declaration() {
            items.push(decl);
        }
        if parser.panic_mode {
            parser.synchronize();
        }
    }
    parser.tu.items = items.into_boxed_slice();

    log::debug!(
        "parsed {} top-level declarations, {} diagnostics",
        parser.tu.items.len(),
        parser.diagnostics.len()
    );
    ParseResult {
        tu: parser.tu,
        diagnostics: parser.diagnostics,
    }
}

/// Expression precedence, low to high. Binary rules climb with
/// `next_higher`; assignment and the ternary re-enter at their own level to
/// get right associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    None,
    Assignment,
    Ternary,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Comparison,
    Shift,
    Term,
    Factor,
    Unary,
    Call,
}

impl Prec {
    fn next_higher(self) -> Prec {
        match self {
            Prec::None => Prec::Assignment,
            Prec::Assignment => Prec::Ternary,
            Prec::Ternary => Prec::Or,
            Prec::Or => Prec::And,
            Prec::And => Prec::BitOr,
            Prec::BitOr => Prec::BitXor,
            Prec::BitXor => Prec::BitAnd,
            Prec::BitAnd => Prec::Equality,
            Prec::Equality => Prec::Comparison,
            Prec::Comparison => Prec::Shift,
            Prec::Shift => Prec::Term,
            Prec::Term => Prec::Factor,
            Prec::Factor => Prec::Unary,
            Prec::Unary => Prec::Call,
            Prec::Call => Prec::Call,
        }
    }
}

type PrefixFn<'a> = fn(&mut Parser<'a>) -> Option<Expr>;
type InfixFn<'a> = fn(&mut Parser<'a>, Expr) -> Option<Expr>;

struct Rule<'a> {
    prefix: Option<PrefixFn<'a>>,
    infix: Option<InfixFn<'a>>,
    prec: Prec,
}

/// The expression parsing table. Token kinds absent here (including the
/// compound assignment and increment punctuators) take part in no
/// expression and surface as "expected expression" errors.
fn rule<'a>(kind: TokenKind) -> Rule<'a> {
    use TokenKind::*;

    fn prefix<'a>(f: PrefixFn<'a>) -> Rule<'a> {
        Rule {
            prefix: Some(f),
            infix: None,
            prec: Prec::None,
        }
    }
    fn infix<'a>(f: InfixFn<'a>, prec: Prec) -> Rule<'a> {
        Rule {
            prefix: None,
            infix: Some(f),
            prec,
        }
    }

    match kind {
        LParen => Rule {
            prefix: Some(Parser::group),
            infix: Some(Parser::call),
            prec: Prec::Call,
        },
        Minus => Rule {
            prefix: Some(Parser::unary),
            infix: Some(Parser::binary),
            prec: Prec::Term,
        },
        Tilde | Bang => prefix(Parser::unary),
        Integer => prefix(Parser::number),
        Identifier => prefix(Parser::name),

        Plus => infix(Parser::binary, Prec::Term),
        Star | Slash | Percent => infix(Parser::binary, Prec::Factor),
        LessLess | GreaterGreater => infix(Parser::binary, Prec::Shift),
        Less | LessEq | Greater | GreaterEq => infix(Parser::binary, Prec::Comparison),
        EqEq | BangEq => infix(Parser::binary, Prec::Equality),
        Amp => infix(Parser::binary, Prec::BitAnd),
        Caret => infix(Parser::binary, Prec::BitXor),
        Pipe => infix(Parser::binary, Prec::BitOr),
        AmpAmp => infix(Parser::binary, Prec::And),
        PipePipe => infix(Parser::binary, Prec::Or),
        Eq => infix(Parser::assign, Prec::Assignment),
        Question => infix(Parser::ternary, Prec::Ternary),

        _ => Rule {
            prefix: None,
            infix: None,
            prec: Prec::None,
        },
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    syms: &'a mut StringInterner,
    tu: TranslationUnit,
    diagnostics: Vec<Diagnostic>,
    panic_mode: bool,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Token {
        self.tokens[self.pos]
    }

    fn previous(&self) -> Token {
        debug_assert!(self.pos > 0);
        self.tokens[self.pos - 1]
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    /// Record an error unless one is already being recovered from.
    fn error_at(&mut self, range: SourceRange, message: impl Into<String>) {
        if self.panic_mode {
            return;
        }
        self.diagnostics.push(Diagnostic::new(message, range));
        self.panic_mode = true;
    }

    /// Advance one token, surfacing any error tokens as diagnostics.
    fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        loop {
            self.pos += 1;
            let current = self.current();
            match current.kind {
                TokenKind::Error(err) => self.error_at(current.range(), err.message()),
                _ => break,
            }
        }
    }

    /// Consume the current token; error when it is not of the given kind.
    fn consume(&mut self, kind: TokenKind, message: &str) {
        let current = self.current();
        if current.kind != kind {
            self.error_at(current.range(), message);
        }
        self.advance();
    }

    /// Consume the current token when it matches.
    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.current().kind != kind {
            return false;
        }
        self.advance();
        true
    }

    /// Skip to the next statement boundary after an error.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.is_at_end() {
            if self.pos > 0
                && matches!(
                    self.previous().kind,
                    TokenKind::Semicolon | TokenKind::RBrace
                )
            {
                return;
            }
            match self.current().kind {
                TokenKind::KwInt
                | TokenKind::KwReturn
                | TokenKind::KwIf
                | TokenKind::KwWhile
                | TokenKind::KwDo
                | TokenKind::KwFor
                | TokenKind::KwBreak
                | TokenKind::KwContinue
                | TokenKind::LBrace
                | TokenKind::RBrace => return,
                _ => self.advance(),
            }
        }
    }

    fn add_expr(&mut self, kind: ExprKind, range: SourceRange) -> Expr {
        self.tu.exprs.push(ExprData {
            kind,
            range,
            ty: None,
        })
    }

    fn add_stmt(&mut self, kind: StmtKind, range: SourceRange) -> Stmt {
        self.tu.stmts.push(StmtData { kind, range })
    }

    /*
     * Expressions
     */

    fn expression(&mut self) -> Option<Expr> {
        self.parse_precedence(Prec::Assignment)
    }

    fn parse_precedence(&mut self, prec: Prec) -> Option<Expr> {
        self.advance();
        let Some(prefix) = rule(self.previous().kind).prefix else {
            self.error_at(self.previous().range(), "expected expression");
            return None;
        };
        let mut expr = prefix(self)?;

        while prec <= rule(self.current().kind).prec {
            self.advance();
            let infix = rule(self.previous().kind)
                .infix
                .expect("token with a precedence must have an infix rule");
            expr = infix(self, expr)?;
        }
        Some(expr)
    }

    fn number(&mut self) -> Option<Expr> {
        let token = self.previous();
        let text = token.text(self.source);
        match text.parse::<i32>() {
            Ok(value) => Some(self.add_expr(ExprKind::Const(value), token.range())),
            Err(_) => {
                self.error_at(token.range(), "integer constant is too large");
                None
            }
        }
    }

    fn name(&mut self) -> Option<Expr> {
        let token = self.previous();
        let symbol = self.syms.intern(token.text(self.source));
        Some(self.add_expr(ExprKind::Name(symbol), token.range()))
    }

    fn group(&mut self) -> Option<Expr> {
        let expr = self.expression()?;
        self.consume(TokenKind::RParen, "expected ')'");
        Some(expr)
    }

    fn unary(&mut self) -> Option<Expr> {
        let token = self.previous();
        let op = match token.kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Tilde => UnaryOp::Complement,
            TokenKind::Bang => UnaryOp::Not,
            kind => unreachable!("not a unary operator: {:?}", kind),
        };
        let inner = self.parse_precedence(Prec::Unary)?;
        let range = token.range().union(self.tu.expr_range(inner));
        Some(self.add_expr(ExprKind::Unary { op, inner }, range))
    }

    fn binary(&mut self, lhs: Expr) -> Option<Expr> {
        let token = self.previous();
        let op = match token.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::LessLess => BinaryOp::Shl,
            TokenKind::GreaterGreater => BinaryOp::Shr,
            TokenKind::EqEq => BinaryOp::Equal,
            TokenKind::BangEq => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEq => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEq => BinaryOp::GreaterEqual,
            TokenKind::AmpAmp => BinaryOp::LogicalAnd,
            TokenKind::PipePipe => BinaryOp::LogicalOr,
            kind => unreachable!("not a binary operator: {:?}", kind),
        };
        // Left associative: the right operand starts one level higher.
        let rhs = self.parse_precedence(rule(token.kind).prec.next_higher())?;
        let range = self.tu.expr_range(lhs).union(self.tu.expr_range(rhs));
        Some(self.add_expr(ExprKind::Binary { op, lhs, rhs }, range))
    }

    fn assign(&mut self, lhs: Expr) -> Option<Expr> {
        // Right associative: re-enter at the same level.
        let rhs = self.parse_precedence(Prec::Assignment)?;
        let range = self.tu.expr_range(lhs).union(self.tu.expr_range(rhs));
        Some(self.add_expr(
            ExprKind::Binary {
                op: BinaryOp::Assign,
                lhs,
                rhs,
            },
            range,
        ))
    }

    fn ternary(&mut self, cond: Expr) -> Option<Expr> {
        let then_expr = self.expression()?;
        self.consume(TokenKind::Colon, "expected ':'");
        // Right associative: `a ? b : c ? d : e` nests to the right.
        let else_expr = self.parse_precedence(Prec::Ternary)?;
        let range = self
            .tu
            .expr_range(cond)
            .union(self.tu.expr_range(else_expr));
        Some(self.add_expr(
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            },
            range,
        ))
    }

    fn call(&mut self, callee: Expr) -> Option<Expr> {
        let mut args = Vec::new();
        if self.current().kind != TokenKind::RParen {
            loop {
                args.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected ')'");
        let range = self
            .tu
            .expr_range(callee)
            .union(self.previous().range());
        Some(self.add_expr(
            ExprKind::Call {
                callee,
                args: args.into_boxed_slice(),
            },
            range,
        ))
    }

    /*
     * Statements
     */

    fn statement(&mut self) -> Option<Stmt> {
        let start = self.current().range();
        match self.current().kind {
            TokenKind::Semicolon => {
                self.advance();
                Some(self.add_stmt(StmtKind::Empty, start))
            }
            TokenKind::KwReturn => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::Semicolon, "expected ';'");
                let range = start.union(self.previous().range());
                Some(self.add_stmt(StmtKind::Return(expr), range))
            }
            TokenKind::LBrace => {
                self.advance();
                let block = self.block();
                let range = start.union(self.previous().range());
                Some(self.add_stmt(StmtKind::Compound(block), range))
            }
            TokenKind::KwIf => self.if_statement(),
            TokenKind::KwWhile => self.while_statement(),
            TokenKind::KwDo => self.do_while_statement(),
            TokenKind::KwFor => self.for_statement(),
            TokenKind::KwBreak => {
                self.advance();
                self.consume(TokenKind::Semicolon, "expected ';'");
                let range = start.union(self.previous().range());
                Some(self.add_stmt(StmtKind::Break, range))
            }
            TokenKind::KwContinue => {
                self.advance();
                self.consume(TokenKind::Semicolon, "expected ';'");
                let range = start.union(self.previous().range());
                Some(self.add_stmt(StmtKind::Continue, range))
            }
            _ => {
                let expr = self.expression()?;
                self.consume(TokenKind::Semicolon, "expected ';'");
                let range = start.union(self.previous().range());
                Some(self.add_stmt(StmtKind::Expr(expr), range))
            }
        }
    }

    fn if_statement(&mut self) -> Option<Stmt> {
        let start = self.current().range();
        self.advance();
        self.consume(TokenKind::LParen, "expected '('");
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "expected ')'");
        let then_stmt = self.statement()?;
        let else_stmt = if self.matches(TokenKind::KwElse) {
            Some(self.statement()?)
        } else {
            None
        };
        let range = start.union(self.previous().range());
        Some(self.add_stmt(
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            },
            range,
        ))
    }

    fn while_statement(&mut self) -> Option<Stmt> {
        let start = self.current().range();
        self.advance();
        self.consume(TokenKind::LParen, "expected '('");
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "expected ')'");
        let body = self.statement()?;
        let range = start.union(self.previous().range());
        Some(self.add_stmt(StmtKind::While { cond, body }, range))
    }

    fn do_while_statement(&mut self) -> Option<Stmt> {
        let start = self.current().range();
        self.advance();
        let body = self.statement()?;
        self.consume(TokenKind::KwWhile, "expected 'while'");
        self.consume(TokenKind::LParen, "expected '('");
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "expected ')'");
        self.consume(TokenKind::Semicolon, "expected ';'");
        let range = start.union(self.previous().range());
        Some(self.add_stmt(StmtKind::DoWhile { body, cond }, range))
    }

    fn for_statement(&mut self) -> Option<Stmt> {
        let start = self.current().range();
        self.advance();
        self.consume(TokenKind::LParen, "expected '('");

        let init = if self.matches(TokenKind::Semicolon) {
            ForInit::Expr(None)
        } else if self.current().kind == TokenKind::KwInt {
            // The declaration consumes its own ';'.
            let decl = self.declaration()?;
            if let DeclKind::Func { .. } = self.tu.decls[decl].kind {
                self.error_at(self.tu.decls[decl].range, "expected a variable declaration");
                return None;
            }
            ForInit::Decl(decl)
        } else {
            let expr = self.expression()?;
            self.consume(TokenKind::Semicolon, "expected ';'");
            ForInit::Expr(Some(expr))
        };

        let cond = if self.current().kind != TokenKind::Semicolon {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "expected ';'");

        let post = if self.current().kind != TokenKind::RParen {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RParen, "expected ')'");

        let body = self.statement()?;
        let range = start.union(self.previous().range());
        Some(self.add_stmt(
            StmtKind::For {
                init,
                cond,
                post,
                body,
            },
            range,
        ))
    }

    /// Parse block items up to (and including) the closing brace.
    fn block(&mut self) -> Block {
        let mut items = Vec::new();
        while self.current().kind != TokenKind::RBrace && !self.is_at_end() {
            let item = if self.current().kind == TokenKind::KwInt {
                self.declaration().map(BlockItem::Decl)
            } else {
                self.statement().map(BlockItem::Stmt)
            };
            match item {
                Some(item) => items.push(item),
                None => self.synchronize(),
            }
        }
        self.consume(TokenKind::RBrace, "expected '}'");
        items.into_boxed_slice()
    }

    /*
     * Declarations
     */

    /// Parse the identifier being declared.
    fn identifier(&mut self) -> Option<mcc_arena::Symbol> {
        let current = self.current();
        if current.kind != TokenKind::Identifier {
            self.error_at(current.range(), "expected identifier");
            self.advance();
            return None;
        }
        self.advance();
        Some(self.syms.intern(current.text(self.source)))
    }

    fn parameter_list(&mut self) -> Option<Box<[ParamDecl]>> {
        self.consume(TokenKind::LParen, "expected '('");
        let mut params = Vec::new();
        match self.current().kind {
            TokenKind::KwVoid => {
                self.advance();
            }
            TokenKind::RParen => {}
            _ => loop {
                let start = self.current().range();
                self.consume(TokenKind::KwInt, "expected keyword 'int'");
                let name = self.identifier()?;
                params.push(ParamDecl {
                    name,
                    ident: None,
                    range: start.union(self.previous().range()),
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            },
        }
        self.consume(TokenKind::RParen, "expected ')'");
        Some(params.into_boxed_slice())
    }

    /// Parse a declaration: `int name(...)` introduces a function, anything
    /// else a variable with an optional initializer.
    fn declaration(&mut self) -> Option<Decl> {
        let start = self.current().range();
        self.consume(TokenKind::KwInt, "expected keyword 'int'");
        let name = self.identifier()?;

        if self.current().kind == TokenKind::LParen {
            let params = self.parameter_list()?;
            let body = if self.current().kind == TokenKind::LBrace {
                let body_start = self.current().range();
                self.advance();
                let block = self.block();
                let range = body_start.union(self.previous().range());
                Some(self.add_stmt(StmtKind::Compound(block), range))
            } else {
                self.consume(TokenKind::Semicolon, "expected ';'");
                None
            };
            let range = start.union(self.previous().range());
            return Some(self.tu.decls.push(DeclData {
                kind: DeclKind::Func {
                    name,
                    ident: None,
                    params,
                    body,
                },
                range,
            }));
        }

        let init = if self.matches(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "expected ';'");
        let range = start.union(self.previous().range());
        Some(self.tu.decls.push(DeclData {
            kind: DeclKind::Var {
                name,
                ident: None,
                init,
            },
            range,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(source: &str) -> ParseResult {
        let tokens = lex(source);
        let mut syms = StringInterner::new();
        parse(source, &tokens, &mut syms)
    }

    fn parse_expr_of_main(source: &str) -> (TranslationUnit, Expr) {
        let result = parse_source(source);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let tu = result.tu;
        let body = match tu.decls[tu.items[0]].kind {
            DeclKind::Func { body: Some(b), .. } => b,
            ref k => panic!("expected function definition, got {:?}", k),
        };
        let block = match tu.stmts[body].kind {
            StmtKind::Compound(ref block) => block.clone(),
            ref k => panic!("expected compound, got {:?}", k),
        };
        let stmt = match block[0] {
            BlockItem::Stmt(s) => s,
            _ => panic!("expected statement"),
        };
        let expr = match tu.stmts[stmt].kind {
            StmtKind::Return(e) => e,
            ref k => panic!("expected return, got {:?}", k),
        };
        (tu, expr)
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (tu, e) = parse_expr_of_main("int main(void) { return 1 + 2 * 3; }");
        let ExprKind::Binary { op: BinaryOp::Add, lhs, rhs } = tu.exprs[e].kind else {
            panic!("expected addition at the root");
        };
        assert!(matches!(tu.exprs[lhs].kind, ExprKind::Const(1)));
        assert!(matches!(
            tu.exprs[rhs].kind,
            ExprKind::Binary { op: BinaryOp::Mul, .. }
        ));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let (tu, e) = parse_expr_of_main("int main(void) { return 1 - 2 - 3; }");
        let ExprKind::Binary { op: BinaryOp::Sub, lhs, rhs } = tu.exprs[e].kind else {
            panic!("expected subtraction at the root");
        };
        assert!(matches!(
            tu.exprs[lhs].kind,
            ExprKind::Binary { op: BinaryOp::Sub, .. }
        ));
        assert!(matches!(tu.exprs[rhs].kind, ExprKind::Const(3)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let result = parse_source("int main(void) { a = b = 1; }");
        assert!(result.diagnostics.is_empty());
        let tu = result.tu;
        let assignments: Vec<(Expr, Expr)> = tu
            .exprs
            .iter()
            .filter_map(|(_, data)| match data.kind {
                ExprKind::Binary {
                    op: BinaryOp::Assign,
                    lhs,
                    rhs,
                } => Some((lhs, rhs)),
                _ => None,
            })
            .collect();
        assert_eq!(assignments.len(), 2);
        // The outer assignment's right operand is the inner assignment.
        let outer = assignments
            .iter()
            .find(|&&(_, rhs)| {
                matches!(
                    tu.exprs[rhs].kind,
                    ExprKind::Binary { op: BinaryOp::Assign, .. }
                )
            })
            .expect("a = (b = 1) should nest to the right");
        assert!(matches!(tu.exprs[outer.0].kind, ExprKind::Name(_)));
    }

    #[test]
    fn ternary_nests_to_the_right() {
        let (tu, e) = parse_expr_of_main("int main(void) { return 1 ? 2 : 3 ? 4 : 5; }");
        let ExprKind::Ternary { else_expr, .. } = tu.exprs[e].kind else {
            panic!("expected ternary at the root");
        };
        assert!(matches!(tu.exprs[else_expr].kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn logical_or_binds_looser_than_and() {
        let (tu, e) = parse_expr_of_main("int main(void) { return 1 || 2 && 3; }");
        let ExprKind::Binary { op, rhs, .. } = tu.exprs[e].kind else {
            panic!("expected binary at the root");
        };
        assert_eq!(op, BinaryOp::LogicalOr);
        assert!(matches!(
            tu.exprs[rhs].kind,
            ExprKind::Binary { op: BinaryOp::LogicalAnd, .. }
        ));
    }

    #[test]
    fn call_arguments() {
        let (tu, e) = parse_expr_of_main("int main(void) { return f(1, 2 + 3); }");
        let ExprKind::Call { ref args, callee } = tu.exprs[e].kind else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(tu.exprs[callee].kind, ExprKind::Name(_)));
    }

    #[test]
    fn unary_plus_is_rejected() {
        let result = parse_source("int main(void) { return +1; }");
        assert!(!result.diagnostics.is_empty());
        assert_eq!(result.diagnostics[0].message, "expected expression");
    }

    #[test]
    fn compound_assignment_is_rejected() {
        let result = parse_source("int main(void) { a += 1; }");
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn statements_parse() {
        let source = "
            int main(void) {
                int i = 0;
                int acc = 0;
                for (int j = 0; j < 10; j = j + 1) { acc = acc + j; }
                while (i < 5) { i = i + 1; if (i == 3) continue; }
                do { i = i - 1; } while (i > 0);
                if (acc > 40) return 1; else return 0;
            }";
        let result = parse_source(source);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn forward_declaration_parses() {
        let result = parse_source("int f(int a, int b);\nint main(void) { return f(1, 2); }");
        assert!(result.diagnostics.is_empty());
        let tu = result.tu;
        assert_eq!(tu.items.len(), 2);
        match tu.decls[tu.items[0]].kind {
            DeclKind::Func { ref params, body, .. } => {
                assert_eq!(params.len(), 2);
                assert!(body.is_none());
            }
            ref k => panic!("expected function, got {:?}", k),
        }
    }

    #[test]
    fn missing_operand_reports_at_the_semicolon() {
        let source = "int main(void) { return 1 + ; }";
        let result = parse_source(source);
        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert_eq!(diag.message, "expected expression");
        let semi = source.find(';').unwrap() as u32;
        assert_eq!(diag.range, SourceRange::new(semi, semi + 1));
    }

    #[test]
    fn recovery_reports_multiple_errors() {
        let source = "
            int main(void) {
                return 1 + ;
                return 2 + ;
                return 3;
            }";
        let result = parse_source(source);
        assert_eq!(result.diagnostics.len(), 2);
    }

    #[test]
    fn error_tokens_become_syntax_errors() {
        let result = parse_source("int main(void) { return 12ab; }");
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message == "malformed integer literal"));
    }

    #[test]
    fn ranges_cover_whole_expressions() {
        let source = "int main(void) { return 1 + 2 * 3; }";
        let (tu, e) = parse_expr_of_main(source);
        let text_begin = source.find("1 + 2 * 3").unwrap() as u32;
        assert_eq!(
            tu.exprs[e].range,
            SourceRange::new(text_begin, text_begin + "1 + 2 * 3".len() as u32)
        );
    }
}
