// ABOUTME: Indentation-tracking lexer: source text to token stream

use crate::error::PyrlError;
use crate::span::Span;
use crate::token::{Keyword, Operator, PerlRegex, Punct, Token, TokenKind};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char as nchar, digit1, one_of};
use nom::combinator::{opt, recognize};
use nom::multi::many1;
use nom::sequence::{pair, preceded};
use nom::IResult;

/// Recognizes the lexeme of a numeric literal (hex, binary, or
/// decimal/float with optional exponent) without consuming surrounding
/// context. Returns the matched text and whether it denotes a float.
fn number_lexeme(input: &str) -> IResult<&str, (&str, bool)> {
    let hex = recognize(preceded(tag("0x"), many1(one_of("0123456789abcdefABCDEF"))));
    let bin = recognize(preceded(tag("0b"), many1(one_of("01"))));
    fn exponent(input: &str) -> IResult<&str, &str> {
        recognize(pair(one_of("eE"), pair(opt(one_of("+-")), digit1)))(input)
    }
    let decimal = alt((
        recognize(pair(digit1, pair(opt(pair(nchar('.'), digit1)), opt(exponent)))),
        recognize(pair(nchar('.'), pair(digit1, opt(exponent)))),
    ));

    if let Ok((rest, text)) = alt((hex, bin))(input) {
        return Ok((rest, (text, false)));
    }
    let (rest, text) = decimal(input)?;
    let is_float = text.contains('.') || text.contains('e') || text.contains('E');
    Ok((rest, (text, is_float)))
}

fn parse_int_lexeme(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        text.parse().ok()
    }
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    indent_stack: Vec<usize>,
    paren_depth: i32,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source,
            pos: 0,
            line: 1,
            col: 1,
            indent_stack: vec![0],
            paren_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }

    /// Processes leading whitespace of a fresh logical line, emitting
    /// INDENT/DEDENT tokens. Returns true if the line is blank or
    /// comment-only (and should be skipped without indent bookkeeping).
    fn handle_line_start(&mut self) -> Result<bool, PyrlError> {
        let line = self.line;
        let mut width = 0usize;
        let mut saw_tab = false;
        let mut saw_space = false;
        loop {
            match self.peek() {
                Some(' ') => {
                    saw_space = true;
                    width += 1;
                    self.advance();
                }
                Some('\t') => {
                    saw_tab = true;
                    width += 1;
                    self.advance();
                }
                _ => break,
            }
        }
        if saw_tab && saw_space {
            return Err(PyrlError::lex(
                "inconsistent use of tabs and spaces in indentation",
                Span::new(line, 1),
            ));
        }
        match self.peek() {
            None => return Ok(true),
            Some('\n') | Some('\r') | Some('#') => return Ok(true),
            _ => {}
        }
        let top = *self.indent_stack.last().unwrap();
        if width > top {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent, Span::new(line, 1));
        } else if width < top {
            while *self.indent_stack.last().unwrap() > width {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent, Span::new(line, 1));
            }
            if *self.indent_stack.last().unwrap() != width {
                return Err(PyrlError::lex("inconsistent dedent", Span::new(line, 1)));
            }
        }
        Ok(false)
    }

    fn skip_comment_and_newline(&mut self) {
        if self.peek() == Some('#') {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
        }
        if self.peek() == Some('\r') {
            self.advance();
        }
        if self.peek() == Some('\n') {
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        s
    }

    fn read_string(&mut self, quote: char, triple: bool) -> Result<String, PyrlError> {
        let start = self.span();
        let mut s = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(PyrlError::lex("unterminated string literal", start));
                }
                Some(c) if c == quote => {
                    if triple {
                        let save = self.pos;
                        let save_line = self.line;
                        let save_col = self.col;
                        self.advance();
                        if self.peek() == Some(quote) && self.peek2() == Some(quote) {
                            self.advance();
                            self.advance();
                            return Ok(s);
                        }
                        self.pos = save;
                        self.line = save_line;
                        self.col = save_col;
                        s.push(c);
                        self.advance();
                    } else {
                        self.advance();
                        return Ok(s);
                    }
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('n') => {
                            s.push('\n');
                            self.advance();
                        }
                        Some('t') => {
                            s.push('\t');
                            self.advance();
                        }
                        Some('r') => {
                            s.push('\r');
                            self.advance();
                        }
                        Some('\\') => {
                            s.push('\\');
                            self.advance();
                        }
                        Some('\'') => {
                            s.push('\'');
                            self.advance();
                        }
                        Some('"') => {
                            s.push('"');
                            self.advance();
                        }
                        Some(other) => {
                            s.push('\\');
                            s.push(other);
                            self.advance();
                        }
                        None => return Err(PyrlError::lex("unterminated string literal", start)),
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Scans the body of a Perl construct (`m/body/`, `s/body/repl/`,
    /// `qr/body/`) up to the next unescaped `/`.
    fn read_regex_body(&mut self) -> Result<String, PyrlError> {
        let start = self.span();
        let mut s = String::new();
        loop {
            match self.peek() {
                None => return Err(PyrlError::lex("unterminated regex literal", start)),
                Some('/') => {
                    self.advance();
                    return Ok(s);
                }
                Some('\\') => {
                    s.push('\\');
                    self.advance();
                    if let Some(c) = self.peek() {
                        s.push(c);
                        self.advance();
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_flags(&mut self) -> String {
        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, 'i' | 'm' | 's' | 'g') {
                flags.push(c);
                self.advance();
            } else {
                break;
            }
        }
        flags
    }

    fn run(mut self) -> Result<Vec<Token>, PyrlError> {
        loop {
            if self.at_line_start && self.paren_depth == 0 {
                if self.handle_line_start()? {
                    self.skip_comment_and_newline();
                    if self.peek().is_none() && self.pos >= self.source.len() {
                        if self.rest().is_empty() {
                            break;
                        }
                    }
                    continue;
                }
                self.at_line_start = false;
            }

            let c = match self.peek() {
                Some(c) => c,
                None => break,
            };

            match c {
                ' ' | '\t' => {
                    self.advance();
                }
                '\r' => {
                    self.advance();
                }
                '\n' => {
                    let span = self.span();
                    self.advance();
                    if self.paren_depth == 0 {
                        self.push(TokenKind::Newline, span);
                        self.at_line_start = true;
                    }
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '(' => {
                    let span = self.span();
                    self.advance();
                    self.paren_depth += 1;
                    self.push(TokenKind::Punct(Punct::LParen), span);
                }
                ')' => {
                    let span = self.span();
                    self.advance();
                    self.paren_depth -= 1;
                    self.push(TokenKind::Punct(Punct::RParen), span);
                }
                '[' => {
                    let span = self.span();
                    self.advance();
                    self.paren_depth += 1;
                    self.push(TokenKind::Punct(Punct::LBracket), span);
                }
                ']' => {
                    let span = self.span();
                    self.advance();
                    self.paren_depth -= 1;
                    self.push(TokenKind::Punct(Punct::RBracket), span);
                }
                '{' => {
                    let span = self.span();
                    self.advance();
                    self.paren_depth += 1;
                    self.push(TokenKind::Punct(Punct::LBrace), span);
                }
                '}' => {
                    let span = self.span();
                    self.advance();
                    self.paren_depth -= 1;
                    self.push(TokenKind::Punct(Punct::RBrace), span);
                }
                ',' => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Punct(Punct::Comma), span);
                }
                ':' => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Punct(Punct::Colon), span);
                }
                ';' => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Punct(Punct::Semicolon), span);
                }
                '.' if !self.peek2().map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Punct(Punct::Dot), span);
                }
                '.' => {
                    let span = self.span();
                    let (lexeme, _) = number_lexeme(self.rest())
                        .map_err(|_| PyrlError::lex("invalid numeric literal", span))?
                        .1;
                    let consumed = lexeme.len();
                    let text = lexeme.to_string();
                    for _ in 0..consumed {
                        self.advance();
                    }
                    let v: f64 = text
                        .parse()
                        .map_err(|_| PyrlError::lex("invalid float literal", span))?;
                    self.push(TokenKind::Float(v), span);
                }
                '"' | '\'' => {
                    let span = self.span();
                    let quote = c;
                    let triple = self.peek2() == Some(quote)
                        && self.rest().chars().nth(2) == Some(quote);
                    self.advance();
                    if triple {
                        self.advance();
                        self.advance();
                    }
                    let text = self.read_string(quote, triple)?;
                    self.push(TokenKind::Str(text), span);
                }
                '$' => {
                    let span = self.span();
                    self.advance();
                    let name = self.read_identifier();
                    if name.is_empty() {
                        return Err(PyrlError::lex("expected identifier after '$'", span));
                    }
                    self.push(TokenKind::ScalarVar(name), span);
                }
                '@' => {
                    let span = self.span();
                    self.advance();
                    let name = self.read_identifier();
                    if name.is_empty() {
                        return Err(PyrlError::lex("expected identifier after '@'", span));
                    }
                    self.push(TokenKind::ArrayVar(name), span);
                }
                '%' if self.peek2().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false) => {
                    let span = self.span();
                    self.advance();
                    let name = self.read_identifier();
                    self.push(TokenKind::HashVar(name), span);
                }
                '&' if self.peek2().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false) => {
                    let span = self.span();
                    self.advance();
                    let name = self.read_identifier();
                    self.push(TokenKind::FuncVar(name), span);
                }
                // `&(params): expr` anonymous lambda — an empty name signals
                // the parser to expect a parameter list, not an identifier.
                '&' if self.peek2() == Some('(') => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::FuncVar(String::new()), span);
                }
                c if c.is_ascii_digit() => {
                    let span = self.span();
                    let (lexeme, is_float) = number_lexeme(self.rest())
                        .map_err(|_| PyrlError::lex("invalid numeric literal", span))?
                        .1;
                    let consumed = lexeme.len();
                    let text = lexeme.to_string();
                    for _ in 0..consumed {
                        self.advance();
                    }
                    if is_float {
                        let v: f64 = text
                            .parse()
                            .map_err(|_| PyrlError::lex("invalid float literal", span))?;
                        self.push(TokenKind::Float(v), span);
                    } else {
                        let v = parse_int_lexeme(&text)
                            .ok_or_else(|| PyrlError::lex("invalid integer literal", span))?;
                        self.push(TokenKind::Int(v), span);
                    }
                }
                c if c.is_alphabetic() || c == '_' => {
                    let span = self.span();
                    // `r"..."` raw string prefix
                    if c == 'r' && matches!(self.peek2(), Some('"') | Some('\'')) {
                        self.advance();
                        let quote = self.peek().unwrap();
                        self.advance();
                        let mut text = String::new();
                        loop {
                            match self.peek() {
                                None => return Err(PyrlError::lex("unterminated raw string", span)),
                                Some(q) if q == quote => {
                                    self.advance();
                                    break;
                                }
                                Some(ch) => {
                                    text.push(ch);
                                    self.advance();
                                }
                            }
                        }
                        self.push(TokenKind::RawStr(text), span);
                        continue;
                    }
                    // `m/.../flags`
                    if c == 'm' && self.peek2() == Some('/') {
                        self.advance();
                        self.advance();
                        let pattern = self.read_regex_body()?;
                        let flags = self.read_flags();
                        self.push(TokenKind::Regex(PerlRegex::Match { pattern, flags }), span);
                        continue;
                    }
                    // `qr/.../flags`
                    if c == 'q' && self.peek2() == Some('r') && self.rest().chars().nth(2) == Some('/') {
                        self.advance();
                        self.advance();
                        self.advance();
                        let pattern = self.read_regex_body()?;
                        let flags = self.read_flags();
                        self.push(TokenKind::Regex(PerlRegex::Compiled { pattern, flags }), span);
                        continue;
                    }
                    // `s/.../.../flags`
                    if c == 's' && self.peek2() == Some('/') {
                        self.advance();
                        self.advance();
                        let pattern = self.read_regex_body()?;
                        let replacement = self.read_regex_body()?;
                        let flags = self.read_flags();
                        self.push(
                            TokenKind::Regex(PerlRegex::Subst { pattern, replacement, flags }),
                            span,
                        );
                        continue;
                    }
                    let name = self.read_identifier();
                    if let Some(kw) = Keyword::from_str(&name) {
                        self.push(TokenKind::Keyword(kw), span);
                    } else {
                        self.push(TokenKind::Identifier(name), span);
                    }
                }
                '=' => {
                    let span = self.span();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::Eq), span);
                    } else if self.peek() == Some('~') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::Match), span);
                    } else {
                        self.push(TokenKind::Operator(Operator::Assign), span);
                    }
                }
                '!' => {
                    let span = self.span();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::Ne), span);
                    } else if self.peek() == Some('~') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::NotMatch), span);
                    } else {
                        return Err(PyrlError::lex("unexpected character '!'", span));
                    }
                }
                '<' => {
                    let span = self.span();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::Le), span);
                    } else {
                        self.push(TokenKind::Operator(Operator::Lt), span);
                    }
                }
                '>' => {
                    let span = self.span();
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::Ge), span);
                    } else {
                        self.push(TokenKind::Operator(Operator::Gt), span);
                    }
                }
                '+' => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Operator(Operator::Plus), span);
                }
                '-' => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Operator(Operator::Minus), span);
                }
                '*' => {
                    let span = self.span();
                    self.advance();
                    if self.peek() == Some('*') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::DoubleStar), span);
                    } else {
                        self.push(TokenKind::Operator(Operator::Star), span);
                    }
                }
                '/' => {
                    let span = self.span();
                    self.advance();
                    if self.peek() == Some('/') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::DoubleSlash), span);
                    } else {
                        self.push(TokenKind::Operator(Operator::Slash), span);
                    }
                }
                '%' => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Operator(Operator::Percent), span);
                }
                '^' => {
                    let span = self.span();
                    self.advance();
                    self.push(TokenKind::Operator(Operator::Caret), span);
                }
                other => {
                    let span = self.span();
                    return Err(PyrlError::lex(
                        format!("unexpected character '{}'", other),
                        span,
                    ));
                }
            }
        }

        let tail_span = self.span();
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, tail_span);
        }
        self.push(TokenKind::Eof, tail_span);
        Ok(self.tokens)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, PyrlError> {
    Lexer::new(source).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_assignment() {
        let ks = kinds("$x = 5\n");
        assert_eq!(
            ks,
            vec![ScalarVar("x".into()), Operator(Operator::Assign), Int(5), Newline, Eof]
        );
    }

    #[test]
    fn test_sigils() {
        let ks = kinds("@xs %m &f\n");
        assert!(matches!(ks[0], ArrayVar(_)));
        assert!(matches!(ks[1], HashVar(_)));
        assert!(matches!(ks[2], FuncVar(_)));
    }

    #[test]
    fn test_indent_dedent_balance() {
        let src = "if True:\n    $x = 1\n    $y = 2\nprint($x)\n";
        let toks = tokenize(src).unwrap();
        let indents = toks.iter().filter(|t| t.kind == Indent).count();
        let dedents = toks.iter().filter(|t| t.kind == Dedent).count();
        assert_eq!(indents, dedents);
        assert_eq!(indents, 1);
    }

    #[test]
    fn test_mixed_tabs_and_spaces_rejected() {
        let src = "if True:\n \t$x = 1\n";
        assert!(tokenize(src).is_err());
    }

    #[test]
    fn test_newline_suppressed_inside_parens() {
        let ks = kinds("foo(1,\n2)\n");
        let newline_count = ks.iter().filter(|k| **k == Newline).count();
        assert_eq!(newline_count, 1);
    }

    #[test]
    fn test_float_and_hex_and_bin_literals() {
        let ks = kinds("1.5 0x1A 0b101\n");
        assert_eq!(ks[0], Float(1.5));
        assert_eq!(ks[1], Int(26));
        assert_eq!(ks[2], Int(5));
    }

    #[test]
    fn test_string_escapes() {
        let ks = kinds("\"a\\nb\"\n");
        assert_eq!(ks[0], Str("a\nb".to_string()));
    }

    #[test]
    fn test_triple_quoted_string() {
        let ks = kinds("\"\"\"a\nb\"\"\"\n");
        assert_eq!(ks[0], Str("a\nb".to_string()));
    }

    #[test]
    fn test_regex_match_literal() {
        let ks = kinds("$t =~ m/world/i\n");
        match &ks[2] {
            Regex(PerlRegex::Match { pattern, flags }) => {
                assert_eq!(pattern, "world");
                assert_eq!(flags, "i");
            }
            other => panic!("expected regex token, got {:?}", other),
        }
    }

    #[test]
    fn test_keywords_recognized() {
        let ks = kinds("if elif else while def return class\n");
        assert!(ks.iter().all(|k| matches!(k, Keyword(_)) || *k == Newline));
    }

    #[test]
    fn test_anonymous_lambda_funcvar() {
        let ks = kinds("&($x): $x + 1\n");
        assert_eq!(ks[0], FuncVar(String::new()));
        assert_eq!(ks[1], Punct(crate::token::Punct::LParen));
    }

    #[test]
    fn test_comment_ignored() {
        let ks = kinds("$x = 1 # a comment\n");
        assert_eq!(ks, vec![ScalarVar("x".into()), Operator(Operator::Assign), Int(1), Newline, Eof]);
    }
}
