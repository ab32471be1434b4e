//! Recursive-descent parser and macro expander for CEL (§4.3, §4.3.1,
//! §4.3.2, §4.4).
//!
//! Grammar (§4.3):
//!
//! ```text
//! expr   := or ( '?' or ':' or )?
//! or     := and ( '||' and )*
//! and    := rel ( '&&' rel )*
//! rel    := calc ( relop calc )?
//! calc   := unary ( calcop unary )*
//! unary  := ('!'|'-')* member
//! member := primary ( '.' id ('(' args? ')')? | '.?' id | '[' expr ']' | '[?' expr ']' )*
//! primary:= '.'? id ('(' args? ')')? | '(' expr ')' | list | map | struct | literal
//! ```
//!
//! Every rule returns `Result<ExprId, Diagnostic>` rather than threading a
//! recovery token set through the grammar: on failure the top-level caller
//! (`Parser::run`) records the diagnostic and substitutes a placeholder
//! node, bounded by `max_parse_error_recovery_limit` (§9).

use cel_diagnostic::{Diagnostic, ErrorCode, IssueCollector};
use cel_ir::{
    Constant, ExprArena, ExprId, ExprIdGenerator, ExprKind, FieldInit, MapEntry, MacroCall, MacroCalls, Name,
    Positions, Span, StringInterner,
};
use cel_lexer::{Token, TokenKind};
use cel_stack::ensure_sufficient_stack;
use rustc_hash::FxHashSet;

use crate::cursor::Cursor;
use crate::macros::{MacroFactory, MacroRegistry};

/// Environment knobs that affect parsing (§6 "Environment options"). The
/// numeric defaults aren't named by the design docs, only that they must
/// be configurable; the values below are chosen generously enough that
/// no realistic hand-written expression trips them.
#[derive(Clone, Debug)]
pub struct ParserOptions {
    pub enable_optional_syntax: bool,
    pub populate_macro_calls: bool,
    pub enable_reserved_ids: bool,
    pub retain_repeated_unary_operators: bool,
    pub max_expression_code_point_size: usize,
    pub max_parse_recursion_depth: usize,
    pub max_parse_error_recovery_limit: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            enable_optional_syntax: true,
            populate_macro_calls: true,
            enable_reserved_ids: true,
            retain_repeated_unary_operators: false,
            max_expression_code_point_size: 100_000,
            max_parse_recursion_depth: 250,
            max_parse_error_recovery_limit: 30,
        }
    }
}

/// What `parse` hands back alongside the caller's untouched `Source`
/// (`cel_ir::Source` is immutable, per its own doc comment).
#[derive(Default)]
pub struct ParseOutput {
    pub arena: ExprArena,
    pub positions: Positions,
    pub macro_calls: MacroCalls,
}

/// Lex and parse `source`, populating `issues` with whatever the lexer or
/// parser recorded. Always returns a best-effort `ParseOutput`, even when
/// `issues.has_errors()`; deciding whether an erroring parse still yields
/// a usable AST is the caller's call (`celc`'s `Builder`), not this
/// crate's (§7: "any issue with severity error causes build/check to
/// produce no AST" describes the pipeline's contract, not a per-stage
/// one).
pub fn parse(
    source: &cel_ir::Source,
    interner: &mut StringInterner,
    macros: &MacroRegistry,
    options: &ParserOptions,
    issues: &mut IssueCollector,
) -> ParseOutput {
    if source.code_point_len() > options.max_expression_code_point_size {
        issues.push(Diagnostic::error(
            ErrorCode::E0006,
            format!(
                "expression has {} code points, exceeding the configured limit of {}",
                source.code_point_len(),
                options.max_expression_code_point_size
            ),
            Span::DUMMY,
        ));
        let mut arena = ExprArena::new();
        let mut ids = ExprIdGenerator::new();
        let name = interner.intern("$error");
        let id = ids.next_id();
        arena.insert(id, ExprKind::Ident { name, absolute: false }, Span::DUMMY);
        arena.set_root(id);
        return ParseOutput { arena, positions: Positions::default(), macro_calls: MacroCalls::default() };
    }

    let (tokens, lex_issues) = cel_lexer::lex(source.content(), interner);
    issues.extend(lex_issues);

    let mut parser = Parser::new(&tokens, interner, macros, options);
    parser.run();
    let (arena, positions, macro_calls, parser_issues) = parser.finish();
    issues.extend(parser_issues);
    ParseOutput { arena, positions, macro_calls }
}

struct Parser<'a> {
    cursor: Cursor<'a>,
    interner: &'a mut StringInterner,
    macros: &'a MacroRegistry,
    options: &'a ParserOptions,
    arena: ExprArena,
    ids: ExprIdGenerator,
    positions: Positions,
    macro_calls: MacroCalls,
    issues: IssueCollector,
    depth: usize,
    recovery_count: usize,
    aborted: bool,
    macro_span: Span,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], interner: &'a mut StringInterner, macros: &'a MacroRegistry, options: &'a ParserOptions) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            interner,
            macros,
            options,
            arena: ExprArena::new(),
            ids: ExprIdGenerator::new(),
            positions: Positions::default(),
            macro_calls: MacroCalls::default(),
            issues: IssueCollector::new(),
            depth: 0,
            recovery_count: 0,
            aborted: false,
            macro_span: Span::DUMMY,
        }
    }

    fn finish(self) -> (ExprArena, Positions, MacroCalls, IssueCollector) {
        (self.arena, self.positions, self.macro_calls, self.issues)
    }

    fn run(&mut self) {
        let result = self.parse_expr();
        let root = match result {
            Ok(id) => id,
            Err(diag) => self.recover(diag),
        };
        if !self.cursor.is_eof() && !self.aborted {
            self.issues.push(Diagnostic::error(
                ErrorCode::E1001,
                format!("unexpected trailing {}", self.cursor.current_kind().describe()),
                self.cursor.current_span(),
            ));
        }
        self.arena.set_root(root);
    }

    // ---- node construction -------------------------------------------------

    fn push_node(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = self.ids.next_id();
        self.arena.insert(id, kind, span);
        self.positions.insert(id, span);
        id
    }

    fn push_call(&mut self, target: Option<ExprId>, function_name: &str, args: Vec<ExprId>, span: Span) -> ExprId {
        let function = self.interner.intern(function_name);
        self.push_node(ExprKind::Call { target, function, args }, span)
    }

    /// Record a parse failure: push the diagnostic, synthesize a
    /// placeholder identifier so the caller always gets back a valid
    /// `ExprId`, and count it against the recovery limit (E1008 past it).
    fn recover(&mut self, diag: Diagnostic) -> ExprId {
        let span = diag.span;
        self.issues.push(diag);
        self.recovery_count += 1;
        if self.recovery_count > self.options.max_parse_error_recovery_limit && !self.aborted {
            self.aborted = true;
            self.issues.push(Diagnostic::error(
                ErrorCode::E1008,
                "too many parse errors, aborting".to_string(),
                span,
            ));
        }
        let name = self.interner.intern("$error");
        self.push_node(ExprKind::Ident { name, absolute: false }, span)
    }

    // ---- token helpers -------------------------------------------------

    fn expect(&mut self, kind: &TokenKind) -> Result<Span, Diagnostic> {
        if self.cursor.check(kind) {
            let span = self.cursor.current_span();
            self.cursor.advance();
            Ok(span)
        } else {
            Err(Diagnostic::error(
                ErrorCode::E1001,
                format!("expected {}, found {}", kind.describe(), self.cursor.current_kind().describe()),
                self.cursor.current_span(),
            ))
        }
    }

    fn consume_ident(&mut self) -> Result<Name, Diagnostic> {
        if let TokenKind::Ident(name) = *self.cursor.current_kind() {
            self.cursor.advance();
            if self.options.enable_reserved_ids {
                let text = self.interner.resolve(name).to_string();
                if cel_lexer::is_reserved(&text) {
                    return Err(Diagnostic::error(
                        ErrorCode::E1006,
                        format!("`{text}` is a reserved identifier"),
                        self.cursor.previous_span(),
                    ));
                }
            }
            Ok(name)
        } else {
            Err(Diagnostic::error(
                ErrorCode::E1004,
                format!("expected identifier, found {}", self.cursor.current_kind().describe()),
                self.cursor.current_span(),
            ))
        }
    }

    fn consume_optional_marker(&mut self, syntax: &'static str) -> Result<bool, Diagnostic> {
        if self.cursor.check(&TokenKind::Question) {
            if !self.options.enable_optional_syntax {
                return Err(Diagnostic::error(
                    ErrorCode::E1005,
                    format!("optional {syntax} syntax is disabled"),
                    self.cursor.current_span(),
                ));
            }
            self.cursor.advance();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Run `f`, tracking recursion depth (E1007 past `max_parse_recursion_depth`)
    /// and growing the native stack when needed (§9's stack-safety note).
    fn enter_rule(&mut self, f: impl FnOnce(&mut Self) -> Result<ExprId, Diagnostic>) -> Result<ExprId, Diagnostic> {
        if self.aborted {
            return Ok(self.error_placeholder());
        }
        self.depth += 1;
        if self.depth > self.options.max_parse_recursion_depth {
            self.depth -= 1;
            return Err(Diagnostic::error(
                ErrorCode::E1007,
                "parse recursion depth exceeded".to_string(),
                self.cursor.current_span(),
            ));
        }
        let result = ensure_sufficient_stack(|| f(self));
        self.depth -= 1;
        result
    }

    fn error_placeholder(&mut self) -> ExprId {
        let span = self.cursor.current_span();
        let name = self.interner.intern("$error");
        self.push_node(ExprKind::Ident { name, absolute: false }, span)
    }

    /// Skip tokens until one of `stoppers` (or end of input), so a single
    /// malformed element in a comma-separated list doesn't drag down every
    /// element after it. Used by `parse_args`/list/map/struct-literal
    /// parsing, never by the binary-operator chains (those have no natural
    /// resync point other than the chain's own separators, which `parse_or`
    /// etc. already consume in their loop).
    fn resync_to(&mut self, stoppers: &[TokenKind]) {
        while !self.cursor.is_eof() && !stoppers.iter().any(|s| self.cursor.check(s)) {
            self.cursor.advance();
        }
    }

    // ---- grammar ---------------------------------------------------------

    fn parse_expr(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let cond = p.parse_or()?;
            if p.cursor.check(&TokenKind::Question) {
                p.cursor.advance();
                let then_branch = p.parse_or()?;
                p.expect(&TokenKind::Colon)?;
                let else_branch = p.parse_or()?;
                let span = p.arena.span(cond).merge(p.arena.span(else_branch));
                Ok(p.push_call(None, "_?_:_", vec![cond, then_branch, else_branch], span))
            } else {
                Ok(cond)
            }
        })
    }

    fn parse_or(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let mut terms = vec![p.parse_and()?];
            let mut op_spans = Vec::new();
            while p.cursor.check(&TokenKind::PipePipe) {
                op_spans.push(p.cursor.current_span());
                p.cursor.advance();
                terms.push(p.parse_and()?);
            }
            Ok(p.balance("_||_", &terms, &op_spans))
        })
    }

    fn parse_and(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let mut terms = vec![p.parse_rel()?];
            let mut op_spans = Vec::new();
            while p.cursor.check(&TokenKind::AmpAmp) {
                op_spans.push(p.cursor.current_span());
                p.cursor.advance();
                terms.push(p.parse_rel()?);
            }
            Ok(p.balance("_&&_", &terms, &op_spans))
        })
    }

    /// §4.3.1: `or`/`and` are commutative-associative, so a long chain is
    /// folded into a balanced binary tree (middle operator of each
    /// sub-range becomes the root) rather than a deep left-leaning one.
    fn balance(&mut self, function_name: &'static str, terms: &[ExprId], op_spans: &[Span]) -> ExprId {
        fn build(parser: &mut Parser<'_>, function_name: &'static str, terms: &[ExprId], op_spans: &[Span]) -> ExprId {
            if terms.len() == 1 {
                return terms[0];
            }
            let op_count = op_spans.len();
            let mid = op_count / 2;
            let left = build(parser, function_name, &terms[..=mid], &op_spans[..mid]);
            let right = build(parser, function_name, &terms[mid + 1..], &op_spans[mid + 1..]);
            let span = parser.arena.span(left).merge(parser.arena.span(right));
            parser.push_call(None, function_name, vec![left, right], span)
        }
        build(self, function_name, terms, op_spans)
    }

    fn parse_rel(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let left = p.parse_calc()?;
            let function: Option<&'static str> = match p.cursor.current_kind() {
                TokenKind::Less => Some("_<_"),
                TokenKind::LessEqual => Some("_<=_"),
                TokenKind::Greater => Some("_>_"),
                TokenKind::GreaterEqual => Some("_>=_"),
                TokenKind::EqualEqual => Some("_==_"),
                TokenKind::BangEqual => Some("_!=_"),
                _ => None,
            };
            match function {
                Some(function) => {
                    p.cursor.advance();
                    let right = p.parse_calc()?;
                    let span = p.arena.span(left).merge(p.arena.span(right));
                    Ok(p.push_call(None, function, vec![left, right], span))
                }
                None => Ok(left),
            }
        })
    }

    fn parse_calc(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let mut left = p.parse_unary()?;
            loop {
                let function: Option<&'static str> = match p.cursor.current_kind() {
                    TokenKind::Plus => Some("_+_"),
                    TokenKind::Minus => Some("_-_"),
                    TokenKind::Star => Some("_*_"),
                    TokenKind::Slash => Some("_/_"),
                    TokenKind::Percent => Some("_%_"),
                    _ => None,
                };
                let Some(function) = function else { break };
                p.cursor.advance();
                let right = p.parse_unary()?;
                let span = p.arena.span(left).merge(p.arena.span(right));
                left = p.push_call(None, function, vec![left, right], span);
            }
            Ok(left)
        })
    }

    /// Collapses runs of the same repeated prefix operator (`!!x` → `x`,
    /// `--x` → `x`) unless `retain_repeated_unary_operators` is set, per
    /// §6's environment option of the same name.
    fn parse_unary(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let mut runs: Vec<(bool, usize, Span)> = Vec::new();
            loop {
                let (is_bang, span) = match p.cursor.current_kind() {
                    TokenKind::Bang => (true, p.cursor.current_span()),
                    TokenKind::Minus => (false, p.cursor.current_span()),
                    _ => break,
                };
                p.cursor.advance();
                match runs.last_mut() {
                    Some((last_bang, count, last_span)) if *last_bang == is_bang => {
                        *count += 1;
                        *last_span = last_span.merge(span);
                    }
                    _ => runs.push((is_bang, 1, span)),
                }
            }
            let mut operand = p.parse_member()?;
            for (is_bang, count, op_span) in runs.into_iter().rev() {
                let applied = if p.options.retain_repeated_unary_operators { count } else { count % 2 };
                let function = if is_bang { "!_" } else { "-_" };
                for _ in 0..applied {
                    let span = op_span.merge(p.arena.span(operand));
                    operand = p.push_call(None, function, vec![operand], span);
                }
            }
            Ok(operand)
        })
    }

    fn parse_member(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let mut expr = p.parse_primary()?;
            loop {
                match p.cursor.current_kind() {
                    TokenKind::Dot => {
                        p.cursor.advance();
                        let field = p.consume_ident()?;
                        if p.cursor.check(&TokenKind::LeftParen) {
                            p.cursor.advance();
                            let args = p.parse_args(&TokenKind::RightParen)?;
                            let end = p.expect(&TokenKind::RightParen)?;
                            let span = p.arena.span(expr).merge(end);
                            expr = p.assemble_call(Some(expr), field, args, span)?;
                        } else if p.cursor.check(&TokenKind::LeftBrace) {
                            if let Some(type_name) = p.dotted_type_name(expr, field) {
                                let start = p.arena.span(expr);
                                expr = p.parse_struct_literal(type_name, start)?;
                            } else {
                                let span = p.arena.span(expr).merge(p.cursor.previous_span());
                                expr = p.push_node(ExprKind::Select { operand: expr, field, test_only: false }, span);
                            }
                        } else {
                            let span = p.arena.span(expr).merge(p.cursor.previous_span());
                            expr = p.push_node(ExprKind::Select { operand: expr, field, test_only: false }, span);
                        }
                    }
                    TokenKind::DotQuestion => {
                        if !p.options.enable_optional_syntax {
                            return Err(Diagnostic::error(
                                ErrorCode::E1005,
                                "optional `.?` syntax is disabled".to_string(),
                                p.cursor.current_span(),
                            ));
                        }
                        p.cursor.advance();
                        let field = p.consume_ident()?;
                        let field_text = p.interner.resolve(field).to_string();
                        let field_span = p.cursor.previous_span();
                        let field_const = p.push_node(ExprKind::Constant(Constant::String(field_text)), field_span);
                        let span = p.arena.span(expr).merge(field_span);
                        expr = p.push_call(None, "optional_select", vec![expr, field_const], span);
                    }
                    TokenKind::LeftBracket => {
                        p.cursor.advance();
                        let index = p.parse_expr()?;
                        let end = p.expect(&TokenKind::RightBracket)?;
                        let span = p.arena.span(expr).merge(end);
                        expr = p.push_call(None, "_[_]", vec![expr, index], span);
                    }
                    TokenKind::BracketQuestion => {
                        if !p.options.enable_optional_syntax {
                            return Err(Diagnostic::error(
                                ErrorCode::E1005,
                                "optional `[?` syntax is disabled".to_string(),
                                p.cursor.current_span(),
                            ));
                        }
                        p.cursor.advance();
                        let index = p.parse_expr()?;
                        let end = p.expect(&TokenKind::RightBracket)?;
                        let span = p.arena.span(expr).merge(end);
                        expr = p.push_call(None, "_[?_]", vec![expr, index], span);
                    }
                    _ => break,
                }
            }
            Ok(expr)
        })
    }

    fn parse_primary(&mut self) -> Result<ExprId, Diagnostic> {
        self.enter_rule(|p| {
            let start = p.cursor.current_span();
            let absolute = if p.cursor.check(&TokenKind::Dot) {
                p.cursor.advance();
                true
            } else {
                false
            };
            if absolute && !matches!(p.cursor.current_kind(), TokenKind::Ident(_)) {
                return Err(Diagnostic::error(
                    ErrorCode::E1001,
                    format!("expected identifier after `.`, found {}", p.cursor.current_kind().describe()),
                    p.cursor.current_span(),
                ));
            }
            match p.cursor.current_kind().clone() {
                TokenKind::Ident(_) => {
                    let name = p.consume_ident()?;
                    if p.cursor.check(&TokenKind::LeftParen) {
                        p.cursor.advance();
                        let args = p.parse_args(&TokenKind::RightParen)?;
                        let end = p.expect(&TokenKind::RightParen)?;
                        p.assemble_call(None, name, args, start.merge(end))
                    } else if p.cursor.check(&TokenKind::LeftBrace) {
                        p.parse_struct_literal(name, start)
                    } else {
                        let span = start.merge(p.cursor.previous_span());
                        Ok(p.push_node(ExprKind::Ident { name, absolute }, span))
                    }
                }
                TokenKind::Constant(c) => {
                    p.cursor.advance();
                    Ok(p.push_node(ExprKind::Constant(c), start))
                }
                TokenKind::LeftParen => {
                    p.cursor.advance();
                    let inner = p.parse_expr()?;
                    p.expect(&TokenKind::RightParen)?;
                    Ok(inner)
                }
                TokenKind::LeftBracket => p.parse_list_literal(),
                TokenKind::LeftBrace => p.parse_map_literal(),
                other => Err(Diagnostic::error(
                    ErrorCode::E1002,
                    format!("expected expression, found {}", other.describe()),
                    p.cursor.current_span(),
                )),
            }
        })
    }

    /// Parses one comma-separated element via `element`; on failure records
    /// the diagnostic, synthesizes a placeholder in its place, and
    /// resynchronizes to the next `,` or `closing` rather than abandoning
    /// the rest of the list (§4.3's "the parser continues after syntactic
    /// errors").
    fn recovering_element(&mut self, closing: &TokenKind, element: impl FnOnce(&mut Self) -> Result<ExprId, Diagnostic>) -> ExprId {
        match element(self) {
            Ok(id) => id,
            Err(diag) => {
                let id = self.recover(diag);
                self.resync_to(&[TokenKind::Comma, closing.clone()]);
                id
            }
        }
    }

    fn parse_args(&mut self, closing: &TokenKind) -> Result<Vec<ExprId>, Diagnostic> {
        let mut args = Vec::new();
        if !self.cursor.check(closing) {
            loop {
                args.push(self.recovering_element(closing, Self::parse_expr));
                if self.cursor.check(&TokenKind::Comma) {
                    self.cursor.advance();
                    if self.cursor.check(closing) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        Ok(args)
    }

    fn parse_list_literal(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.cursor.current_span();
        self.cursor.advance();
        let mut elements = Vec::new();
        let mut optional_indices = FxHashSet::default();
        if !self.cursor.check(&TokenKind::RightBracket) {
            loop {
                let optional = match self.consume_optional_marker("list-element") {
                    Ok(optional) => optional,
                    Err(diag) => {
                        self.recover(diag);
                        false
                    }
                };
                let element = self.recovering_element(&TokenKind::RightBracket, Self::parse_expr);
                if optional {
                    optional_indices.insert(elements.len());
                }
                elements.push(element);
                if self.cursor.check(&TokenKind::Comma) {
                    self.cursor.advance();
                    if self.cursor.check(&TokenKind::RightBracket) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        let end = self.expect(&TokenKind::RightBracket)?;
        Ok(self.push_node(ExprKind::CreateList { elements, optional_indices }, start.merge(end)))
    }

    fn parse_map_literal(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.cursor.current_span();
        self.cursor.advance();
        let mut entries = Vec::new();
        if !self.cursor.check(&TokenKind::RightBrace) {
            loop {
                let optional = match self.consume_optional_marker("map-entry") {
                    Ok(optional) => optional,
                    Err(diag) => {
                        self.recover(diag);
                        false
                    }
                };
                let key = self.recovering_element(&TokenKind::RightBrace, |p| {
                    let key = p.parse_expr()?;
                    p.expect(&TokenKind::Colon)?;
                    Ok(key)
                });
                let value = self.recovering_element(&TokenKind::RightBrace, Self::parse_expr);
                entries.push(MapEntry { key, value, optional });
                if self.cursor.check(&TokenKind::Comma) {
                    self.cursor.advance();
                    if self.cursor.check(&TokenKind::RightBrace) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        let end = self.expect(&TokenKind::RightBrace)?;
        Ok(self.push_node(ExprKind::CreateMap { entries }, start.merge(end)))
    }

    fn parse_struct_literal(&mut self, type_name: Name, start: Span) -> Result<ExprId, Diagnostic> {
        self.cursor.advance();
        let mut fields = Vec::new();
        if !self.cursor.check(&TokenKind::RightBrace) {
            loop {
                let optional = match self.consume_optional_marker("field-init") {
                    Ok(optional) => optional,
                    Err(diag) => {
                        self.recover(diag);
                        false
                    }
                };
                let field = match self.consume_ident() {
                    Ok(field) => field,
                    Err(diag) => {
                        self.recover(diag);
                        self.resync_to(&[TokenKind::Colon, TokenKind::Comma, TokenKind::RightBrace]);
                        self.interner.intern("$error")
                    }
                };
                if self.cursor.check(&TokenKind::Colon) {
                    self.cursor.advance();
                }
                let value = self.recovering_element(&TokenKind::RightBrace, Self::parse_expr);
                fields.push(FieldInit { field, value, optional });
                if self.cursor.check(&TokenKind::Comma) {
                    self.cursor.advance();
                    if self.cursor.check(&TokenKind::RightBrace) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        let end = self.expect(&TokenKind::RightBrace)?;
        Ok(self.push_node(ExprKind::CreateStruct { type_name, fields }, start.merge(end)))
    }

    /// Reinterprets a just-built chain of plain selects as a dotted type
    /// name when it's immediately followed by `{`, e.g. `pkg.Msg{...}`.
    /// The discarded `Select` nodes stay in the arena, unreachable from
    /// root, same as any other macro- or sugar-expansion byproduct.
    fn dotted_segments(&self, id: ExprId) -> Option<(Vec<String>, bool)> {
        match self.arena.kind(id) {
            ExprKind::Ident { name, absolute } => Some((vec![self.interner.resolve(*name).to_string()], *absolute)),
            ExprKind::Select { operand, field, test_only: false } => {
                let (mut segments, absolute) = self.dotted_segments(*operand)?;
                segments.push(self.interner.resolve(*field).to_string());
                Some((segments, absolute))
            }
            _ => None,
        }
    }

    fn dotted_type_name(&mut self, operand: ExprId, field: Name) -> Option<Name> {
        let (mut segments, absolute) = self.dotted_segments(operand)?;
        segments.push(self.interner.resolve(field).to_string());
        let joined = segments.join(".");
        let full = if absolute { format!(".{joined}") } else { joined };
        Some(self.interner.intern(&full))
    }

    // ---- call assembly and macro dispatch (§4.3.2) ------------------------

    fn assemble_call(&mut self, target: Option<ExprId>, function: Name, args: Vec<ExprId>, span: Span) -> Result<ExprId, Diagnostic> {
        let function_text = self.interner.resolve(function).to_string();

        if let Some(result) = self.try_expand_builtin_macro(target, &function_text, &args, span) {
            let root = result?;
            self.record_macro_call(root, target, function, &args);
            return Ok(root);
        }

        if let Some(expander) = self.macros.lookup(&function_text, args.len(), target.is_some()) {
            self.macro_span = span;
            let mut factory = ParserMacroFactory { parser: self };
            match expander.expand(&mut factory, target, &args) {
                Ok(Some(root)) => {
                    self.record_macro_call(root, target, function, &args);
                    return Ok(root);
                }
                Ok(None) => {}
                Err(diag) => return Err(diag),
            }
        }

        Ok(self.push_node(ExprKind::Call { target, function, args }, span))
    }

    fn record_macro_call(&mut self, root: ExprId, target: Option<ExprId>, function: Name, args: &[ExprId]) {
        if self.options.populate_macro_calls {
            self.macro_calls.insert(
                root,
                MacroCall { target, function, args: args.to_vec(), receiver_style: target.is_some() },
            );
        }
    }

    /// The six built-in macros (§4.4). Returns `None` when `function` isn't
    /// one of their names, so the caller falls through to custom-macro
    /// lookup and then ordinary call assembly.
    fn try_expand_builtin_macro(
        &mut self,
        target: Option<ExprId>,
        function: &str,
        args: &[ExprId],
        span: Span,
    ) -> Option<Result<ExprId, Diagnostic>> {
        match (target, function, args.len()) {
            (None, "has", 1) => Some(self.expand_has(args[0], span)),
            (None, "has", _) => Some(Err(Diagnostic::error(
                ErrorCode::E2002,
                "invalid argument to has() macro".to_string(),
                span,
            ))),
            (Some(target), "all", 2) => Some(self.expand_fold(target, args, span, FoldKind::All)),
            (Some(target), "exists", 2) => Some(self.expand_fold(target, args, span, FoldKind::Exists)),
            (Some(target), "exists_one", 2) => Some(self.expand_fold(target, args, span, FoldKind::ExistsOne)),
            (Some(target), "map", 2) => Some(self.expand_fold(target, args, span, FoldKind::Map)),
            (Some(target), "map", 3) => Some(self.expand_fold(target, args, span, FoldKind::MapFilter)),
            (Some(target), "filter", 2) => Some(self.expand_fold(target, args, span, FoldKind::Filter)),
            (Some(_), "all" | "exists" | "exists_one" | "map" | "filter", _) => Some(Err(Diagnostic::error(
                ErrorCode::E2001,
                format!("wrong number of arguments to `{function}()` macro"),
                span,
            ))),
            _ => None,
        }
    }

    /// `has(e.f)`: `e.f` must be a plain `Select`; expansion is the same
    /// select with `test_only` flipped on (§4.4). The original `Select`
    /// node is left behind in the arena, unreachable.
    fn expand_has(&mut self, arg: ExprId, span: Span) -> Result<ExprId, Diagnostic> {
        match self.arena.kind(arg).clone() {
            ExprKind::Select { operand, field, test_only: false } => {
                Ok(self.push_node(ExprKind::Select { operand, field, test_only: true }, span))
            }
            _ => Err(Diagnostic::error(ErrorCode::E2002, "invalid argument to has() macro".to_string(), span)),
        }
    }

    /// `e.all/exists/exists_one/map/filter(x, ...)`: every fold macro
    /// shares the same shape, a `Comprehension` over `target` whose
    /// accumulator starts at `accu_init` and is threaded through
    /// `loop_cond`/`loop_step` until `result` (§4.4's table).
    fn expand_fold(&mut self, target: ExprId, args: &[ExprId], span: Span, kind: FoldKind) -> Result<ExprId, Diagnostic> {
        let iter_var = match self.arena.kind(args[0]) {
            ExprKind::Ident { name, .. } => *name,
            _ => {
                return Err(Diagnostic::error(
                    ErrorCode::E2001,
                    "argument must be a simple name".to_string(),
                    self.arena.span(args[0]),
                ))
            }
        };
        let accu_var = self.interner.intern("__result__");

        let accu = || ExprKind::Ident { name: accu_var, absolute: false };
        let int_const = |v: i64| ExprKind::Constant(Constant::Int(v));
        let bool_const = |v: bool| ExprKind::Constant(Constant::Bool(v));

        let (accu_init, loop_cond, loop_step, result) = match kind {
            FoldKind::All => {
                let pred = args[1];
                let accu_init = self.push_node(bool_const(true), span);
                let accu_ref = self.push_node(accu(), span);
                let loop_cond = self.push_call(None, "@not_strictly_false", vec![accu_ref], span);
                let accu_ref = self.push_node(accu(), span);
                let loop_step = self.push_call(None, "_&&_", vec![accu_ref, pred], span);
                let result = self.push_node(accu(), span);
                (accu_init, loop_cond, loop_step, result)
            }
            FoldKind::Exists => {
                let pred = args[1];
                let accu_init = self.push_node(bool_const(false), span);
                let accu_ref = self.push_node(accu(), span);
                let negated = self.push_call(None, "!_", vec![accu_ref], span);
                let loop_cond = self.push_call(None, "@not_strictly_false", vec![negated], span);
                let accu_ref = self.push_node(accu(), span);
                let loop_step = self.push_call(None, "_||_", vec![accu_ref, pred], span);
                let result = self.push_node(accu(), span);
                (accu_init, loop_cond, loop_step, result)
            }
            FoldKind::ExistsOne => {
                let pred = args[1];
                let accu_init = self.push_node(int_const(0), span);
                let loop_cond = self.push_node(bool_const(true), span);
                let accu_ref = self.push_node(accu(), span);
                let one = self.push_node(int_const(1), span);
                let incremented = self.push_call(None, "_+_", vec![accu_ref, one], span);
                let accu_ref = self.push_node(accu(), span);
                let loop_step = self.push_call(None, "_?_:_", vec![pred, incremented, accu_ref], span);
                let accu_ref = self.push_node(accu(), span);
                let one = self.push_node(int_const(1), span);
                let result = self.push_call(None, "_==_", vec![accu_ref, one], span);
                (accu_init, loop_cond, loop_step, result)
            }
            FoldKind::Map => {
                let transform = args[1];
                let accu_init = self.push_node(
                    ExprKind::CreateList { elements: Vec::new(), optional_indices: FxHashSet::default() },
                    span,
                );
                let loop_cond = self.push_node(bool_const(true), span);
                let accu_ref = self.push_node(accu(), span);
                let singleton =
                    self.push_node(ExprKind::CreateList { elements: vec![transform], optional_indices: FxHashSet::default() }, span);
                let loop_step = self.push_call(None, "_+_", vec![accu_ref, singleton], span);
                let result = self.push_node(accu(), span);
                (accu_init, loop_cond, loop_step, result)
            }
            FoldKind::MapFilter => {
                let pred = args[1];
                let transform = args[2];
                let accu_init = self.push_node(
                    ExprKind::CreateList { elements: Vec::new(), optional_indices: FxHashSet::default() },
                    span,
                );
                let loop_cond = self.push_node(bool_const(true), span);
                let accu_ref = self.push_node(accu(), span);
                let singleton =
                    self.push_node(ExprKind::CreateList { elements: vec![transform], optional_indices: FxHashSet::default() }, span);
                let appended = self.push_call(None, "_+_", vec![accu_ref, singleton], span);
                let accu_ref = self.push_node(accu(), span);
                let loop_step = self.push_call(None, "_?_:_", vec![pred, appended, accu_ref], span);
                let result = self.push_node(accu(), span);
                (accu_init, loop_cond, loop_step, result)
            }
            FoldKind::Filter => {
                let pred = args[1];
                let accu_init = self.push_node(
                    ExprKind::CreateList { elements: Vec::new(), optional_indices: FxHashSet::default() },
                    span,
                );
                let loop_cond = self.push_node(bool_const(true), span);
                let accu_ref = self.push_node(accu(), span);
                // `args[0]` already is `Ident(iter_var)`; reusing its id as
                // the appended element is the same reference the real
                // expansion would build fresh.
                let singleton =
                    self.push_node(ExprKind::CreateList { elements: vec![args[0]], optional_indices: FxHashSet::default() }, span);
                let appended = self.push_call(None, "_+_", vec![accu_ref, singleton], span);
                let accu_ref = self.push_node(accu(), span);
                let loop_step = self.push_call(None, "_?_:_", vec![pred, appended, accu_ref], span);
                let result = self.push_node(accu(), span);
                (accu_init, loop_cond, loop_step, result)
            }
        };

        Ok(self.push_node(
            ExprKind::Comprehension { iter_var, iter_range: target, accu_var, accu_init, loop_cond, loop_step, result },
            span,
        ))
    }
}

#[derive(Clone, Copy)]
enum FoldKind {
    All,
    Exists,
    ExistsOne,
    Map,
    MapFilter,
    Filter,
}

struct ParserMacroFactory<'p, 'a> {
    parser: &'p mut Parser<'a>,
}

impl MacroFactory for ParserMacroFactory<'_, '_> {
    fn push(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.parser.push_node(kind, span)
    }

    fn call_span(&self) -> Span {
        self.parser.macro_span
    }

    fn intern(&mut self, s: &str) -> Name {
        self.parser.interner.intern(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_ir::Source;

    fn parse_str(src: &str) -> (ExprArena, StringInterner, IssueCollector) {
        let source = Source::new(src.to_string(), "<input>".to_string());
        let mut interner = StringInterner::new();
        let macros = MacroRegistry::new();
        let options = ParserOptions::default();
        let mut issues = IssueCollector::new();
        let output = parse(&source, &mut interner, &macros, &options, &mut issues);
        (output.arena, interner, issues)
    }

    fn root_kind(arena: &ExprArena) -> &ExprKind {
        match arena.root() {
            Some(id) => arena.kind(id),
            None => panic!("parser did not set a root"),
        }
    }

    #[test]
    fn parses_simple_arithmetic() {
        let (arena, interner, issues) = parse_str("1 + 2 * 3");
        assert!(issues.is_empty());
        match root_kind(&arena) {
            ExprKind::Call { function, args, .. } => {
                assert_eq!(interner.resolve(*function), "_+_");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn balances_long_or_chains() {
        let (arena, _interner, issues) = parse_str("a || b || c || d || e");
        assert!(issues.is_empty());
        // A balanced tree of 5 leaves has depth ceil(log2(5)) = 3, not the
        // 4 a left-leaning fold over 4 operators would produce.
        fn depth(arena: &ExprArena, id: ExprId) -> usize {
            match arena.kind(id) {
                ExprKind::Call { args, .. } if !args.is_empty() => {
                    1 + args.iter().map(|a| depth(arena, *a)).max().unwrap_or(0)
                }
                _ => 0,
            }
        }
        let root = match arena.root() {
            Some(id) => id,
            None => panic!("parser did not set a root"),
        };
        assert_eq!(depth(&arena, root), 3);
    }

    #[test]
    fn has_macro_sets_test_only() {
        let (arena, _interner, issues) = parse_str("has(a.b)");
        assert!(issues.is_empty());
        match root_kind(&arena) {
            ExprKind::Select { test_only, .. } => assert!(*test_only),
            other => panic!("expected a select, got {other:?}"),
        }
    }

    #[test]
    fn has_with_non_select_argument_is_an_error() {
        let (_arena, _interner, issues) = parse_str("has(a)");
        assert!(issues.has_errors());
    }

    #[test]
    fn exists_macro_builds_a_comprehension() {
        let (arena, interner, issues) = parse_str("[1, 2, 3].exists(x, x > 1)");
        assert!(issues.is_empty());
        match root_kind(&arena) {
            ExprKind::Comprehension { iter_var, accu_var, .. } => {
                assert_eq!(interner.resolve(*iter_var), "x");
                assert_eq!(interner.resolve(*accu_var), "__result__");
            }
            other => panic!("expected a comprehension, got {other:?}"),
        }
    }

    #[test]
    fn struct_literal_after_dotted_path() {
        let (arena, interner, issues) = parse_str("pkg.sub.Msg{field: 1}");
        assert!(issues.is_empty());
        match root_kind(&arena) {
            ExprKind::CreateStruct { type_name, fields } => {
                assert_eq!(interner.resolve(*type_name), "pkg.sub.Msg");
                assert_eq!(fields.len(), 1);
            }
            other => panic!("expected a struct literal, got {other:?}"),
        }
    }

    #[test]
    fn ternary_builds_conditional_call() {
        let (arena, interner, issues) = parse_str("true ? 1 : 2");
        assert!(issues.is_empty());
        match root_kind(&arena) {
            ExprKind::Call { function, args, .. } => {
                assert_eq!(interner.resolve(*function), "_?_:_");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn repeated_negation_collapses_by_default() {
        let (arena, _interner, issues) = parse_str("!!true");
        assert!(issues.is_empty());
        match root_kind(&arena) {
            ExprKind::Constant(Constant::Bool(true)) => {}
            other => panic!("expected collapsed negation to disappear, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_call_reports_diagnostic() {
        let (_arena, _interner, issues) = parse_str("foo(1, 2");
        assert!(issues.has_errors());
    }

    #[test]
    fn leading_dot_sets_absolute_on_an_identifier() {
        let (arena, _interner, issues) = parse_str(".pkg");
        assert!(issues.is_empty());
        match root_kind(&arena) {
            ExprKind::Ident { absolute, .. } => assert!(*absolute),
            other => panic!("expected an absolute identifier, got {other:?}"),
        }
    }

    #[test]
    fn leading_dot_not_followed_by_an_identifier_is_e1001() {
        for src in [".(1 + 2)", ".[1]", ".{}"] {
            let (_arena, _interner, issues) = parse_str(src);
            assert!(issues.has_errors(), "expected an error for {src:?}");
            assert!(issues.errors().any(|d| d.code == ErrorCode::E1001), "expected E1001 for {src:?}");
        }
    }
}
