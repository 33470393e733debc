//! GLSL source preprocessing on a token stream.
//!
//! Three passes run before compilation:
//! - [`resolve_includes`]: splices `#include <chunk>` lines, recursively
//! - [`replace_light_counts`]: substitutes the `NUM_*_LIGHTS` identifiers
//! - [`unroll_loops`]: expands `for ( int i = A; i < B; i ++ ) { ... }` with
//!   constant bounds, rewriting `[ i ]` to the literal index
//!
//! The lexer keeps whitespace and punctuation verbatim, so a source with
//! nothing to rewrite comes back unchanged.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::errors::{LumenError, Result};

// ----------------------------------------------------------------------------
// Lexer
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Number(&'a str),
    Space(&'a str),
    Punct(&'a str),
}

impl<'a> Token<'a> {
    fn text(self) -> &'a str {
        match self {
            Self::Ident(s) | Self::Number(s) | Self::Space(s) | Self::Punct(s) => s,
        }
    }
}

fn lex(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(first) = rest.chars().next() {
        let split = |pred: fn(char) -> bool| {
            rest.find(|c: char| !pred(c)).unwrap_or(rest.len())
        };
        let (token, len) = if first.is_ascii_alphabetic() || first == '_' {
            let len = split(|c| c.is_ascii_alphanumeric() || c == '_');
            (Token::Ident(&rest[..len]), len)
        } else if first.is_ascii_digit() {
            let len = split(|c| c.is_ascii_alphanumeric() || c == '.');
            (Token::Number(&rest[..len]), len)
        } else if first.is_whitespace() {
            let len = split(char::is_whitespace);
            (Token::Space(&rest[..len]), len)
        } else {
            let len = first.len_utf8();
            (Token::Punct(&rest[..len]), len)
        };
        tokens.push(token);
        rest = &rest[len..];
    }

    tokens
}

// ----------------------------------------------------------------------------
// Includes
// ----------------------------------------------------------------------------

/// Chunk name of an `#include <name>` line.
fn include_target(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?;
    let name = rest.trim().strip_prefix('<')?.strip_suffix('>')?;
    Some(name.trim())
}

/// Replaces every `#include <chunk>` line with the chunk's resolved source.
pub fn resolve_includes<'a, F>(source: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<Cow<'a, str>>,
{
    let mut stack = Vec::new();
    let mut out = String::with_capacity(source.len() * 2);
    expand_into(source, lookup, &mut stack, &mut out)?;
    Ok(out)
}

fn expand_into<'a, F>(
    source: &str,
    lookup: &F,
    stack: &mut Vec<String>,
    out: &mut String,
) -> Result<()>
where
    F: Fn(&str) -> Option<Cow<'a, str>>,
{
    for line in source.split_inclusive('\n') {
        let Some(chunk) = include_target(line) else {
            out.push_str(line);
            continue;
        };

        if stack.iter().any(|open| open == chunk) {
            return Err(LumenError::IncludeCycle {
                chunk: chunk.to_string(),
            });
        }
        let body = lookup(chunk).ok_or_else(|| LumenError::ShaderInclude {
            chunk: chunk.to_string(),
        })?;

        stack.push(chunk.to_string());
        expand_into(&body, lookup, stack, out)?;
        stack.pop();

        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Light counts
// ----------------------------------------------------------------------------

/// Light counts substituted into the shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightCounts {
    pub directional: usize,
    pub point: usize,
    pub spot: usize,
    pub hemi: usize,
}

/// Replaces `NUM_DIR_LIGHTS`, `NUM_POINT_LIGHTS`, `NUM_SPOT_LIGHTS` and
/// `NUM_HEMI_LIGHTS` identifiers by their counts.
#[must_use]
pub fn replace_light_counts(source: &str, counts: LightCounts) -> String {
    let mut out = String::with_capacity(source.len());
    for token in lex(source) {
        let count = match token {
            Token::Ident("NUM_DIR_LIGHTS") => Some(counts.directional),
            Token::Ident("NUM_POINT_LIGHTS") => Some(counts.point),
            Token::Ident("NUM_SPOT_LIGHTS") => Some(counts.spot),
            Token::Ident("NUM_HEMI_LIGHTS") => Some(counts.hemi),
            _ => None,
        };
        match count {
            Some(count) => out.push_str(&count.to_string()),
            None => out.push_str(token.text()),
        }
    }
    out
}

// ----------------------------------------------------------------------------
// Loop unrolling
// ----------------------------------------------------------------------------

/// Cursor over the non-space tokens starting at `pos`.
struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'a> Cursor<'_, 'a> {
    fn next(&mut self) -> Option<Token<'a>> {
        while let Some(&token) = self.tokens.get(self.pos) {
            self.pos += 1;
            if !matches!(token, Token::Space(_)) {
                return Some(token);
            }
        }
        None
    }

    fn expect(&mut self, expected: Token<'a>) -> Option<()> {
        (self.next()? == expected).then_some(())
    }

    fn number(&mut self) -> Option<i64> {
        match self.next()? {
            Token::Number(n) => n.parse().ok(),
            _ => None,
        }
    }
}

/// A loop header at `start`: `(first, end, index just past the opening brace)`.
fn loop_header(tokens: &[Token<'_>], start: usize) -> Option<(i64, i64, usize)> {
    let mut cursor = Cursor { tokens, pos: start };
    cursor.expect(Token::Ident("for"))?;
    cursor.expect(Token::Punct("("))?;
    cursor.expect(Token::Ident("int"))?;
    cursor.expect(Token::Ident("i"))?;
    cursor.expect(Token::Punct("="))?;
    let first = cursor.number()?;
    cursor.expect(Token::Punct(";"))?;
    cursor.expect(Token::Ident("i"))?;
    cursor.expect(Token::Punct("<"))?;
    let end = cursor.number()?;
    cursor.expect(Token::Punct(";"))?;
    cursor.expect(Token::Ident("i"))?;
    cursor.expect(Token::Punct("+"))?;
    cursor.expect(Token::Punct("+"))?;
    cursor.expect(Token::Punct(")"))?;
    cursor.expect(Token::Punct("{"))?;
    Some((first, end, cursor.pos))
}

/// Index of the `}` closing the block whose body starts at `body`.
fn block_end(tokens: &[Token<'_>], body: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, token) in tokens[body..].iter().enumerate() {
        match token {
            Token::Punct("{") => depth += 1,
            Token::Punct("}") => {
                depth -= 1;
                if depth == 0 {
                    return Some(body + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Emits `body` once with every `[ i ]` subscript replaced by `[ index ]`.
fn emit_iteration(body: &[Token<'_>], index: i64, out: &mut String) {
    let mut pos = 0;
    while pos < body.len() {
        if body[pos] == Token::Punct("[") {
            let mut cursor = Cursor { tokens: body, pos: pos + 1 };
            if cursor.next() == Some(Token::Ident("i")) && cursor.next() == Some(Token::Punct("]")) {
                let _ = write!(out, "[ {index} ]");
                pos = cursor.pos;
                continue;
            }
        }
        out.push_str(body[pos].text());
        pos += 1;
    }
}

/// Unrolls constant-bound `for ( int i = A; i < B; i ++ )` loops.
///
/// Loops whose bounds are not integer literals are left in place.
#[must_use]
pub fn unroll_loops(source: &str) -> String {
    let tokens = lex(source);
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;

    while pos < tokens.len() {
        if tokens[pos] == Token::Ident("for")
            && let Some((first, end, body)) = loop_header(&tokens, pos)
            && let Some(close) = block_end(&tokens, body)
        {
            let body = &tokens[body..close];
            for index in first..end {
                out.push_str("\n\t");
                emit_iteration(body, index, &mut out);
            }
            pos = close + 1;
            continue;
        }
        out.push_str(tokens[pos].text());
        pos += 1;
    }

    out
}

/// Prefixes every line with its 1-based number, for compile diagnostics.
#[must_use]
pub fn add_line_numbers(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{}: {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;

    fn retokenize(source: &str) -> String {
        lex(source).iter().map(|t| t.text()).collect()
    }

    fn library(chunks: &[(&str, &str)]) -> FxHashMap<String, String> {
        chunks
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn lexing_is_lossless() {
        let source = "void main() {\n\tgl_Position = vec4( 1.0e2, 0.5, -1, 1 );\n}\n";
        assert_eq!(retokenize(source), source);
    }

    #[test]
    fn includes_resolve_recursively() {
        let chunks = library(&[("outer", "#include <inner>\nfloat b;"), ("inner", "float a;")]);
        let lookup = |name: &str| chunks.get(name).map(|s| Cow::Borrowed(s.as_str()));
        let out = resolve_includes("#include <outer>\nvoid main() {}\n", &lookup).unwrap();
        assert_eq!(out, "float a;\nfloat b;\nvoid main() {}\n");
    }

    #[test]
    fn missing_include_is_an_error() {
        let lookup = |_: &str| None::<Cow<'static, str>>;
        let err = resolve_includes("#include <nowhere>\n", &lookup).unwrap_err();
        assert_eq!(err, LumenError::ShaderInclude { chunk: "nowhere".into() });
    }

    #[test]
    fn include_cycles_are_detected() {
        let chunks = library(&[("a", "#include <b>"), ("b", "#include <a>")]);
        let lookup = |name: &str| chunks.get(name).map(|s| Cow::Borrowed(s.as_str()));
        let err = resolve_includes("#include <a>", &lookup).unwrap_err();
        assert_eq!(err, LumenError::IncludeCycle { chunk: "a".into() });
    }

    #[test]
    fn light_counts_replace_whole_identifiers() {
        let counts = LightCounts {
            directional: 2,
            point: 1,
            ..LightCounts::default()
        };
        let out = replace_light_counts(
            "uniform L d[NUM_DIR_LIGHTS]; int p = NUM_POINT_LIGHTS; int x = NUM_DIR_LIGHTS_MAX;",
            counts,
        );
        assert_eq!(out, "uniform L d[2]; int p = 1; int x = NUM_DIR_LIGHTS_MAX;");
    }

    #[test]
    fn loops_unroll_with_literal_indices() {
        let out = unroll_loops("for ( int i = 0; i < 2; i ++ ) {\n\tsum += w[ i ];\n}");
        assert!(out.contains("sum += w[ 0 ];"));
        assert!(out.contains("sum += w[ 1 ];"));
        assert!(!out.contains("for"));
    }

    #[test]
    fn nested_blocks_stay_inside_the_iteration() {
        let out = unroll_loops("for (int i = 1; i < 2; i++) { if (a) { b[i] = 1.0; } }\nc();");
        assert!(out.contains("if (a) { b[ 1 ] = 1.0; }"));
        assert!(out.ends_with("\nc();"));
    }

    #[test]
    fn empty_and_symbolic_loops() {
        assert_eq!(unroll_loops("for ( int i = 0; i < 0; i ++ ) { x[ i ]; }"), "");
        let symbolic = "for ( int i = 0; i < N; i ++ ) { x[ i ]; }";
        assert_eq!(unroll_loops(symbolic), symbolic);
    }

    #[test]
    fn numbers_every_line() {
        assert_eq!(add_line_numbers("a\nb"), "1: a\n2: b");
    }
}
