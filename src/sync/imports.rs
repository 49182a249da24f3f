//! Lexical import extraction for Go sources.
//!
//! This is not a parser. It tokenizes just enough of a file to find the
//! package clause and the import declarations that precede the first
//! top-level declaration, and it never fails: malformed input yields
//! whatever was recognised before the lexer gave up.

use std::iter::Peekable;
use std::str::Chars;

/// Extracts the import paths a source file declares.
///
/// Paths are returned verbatim and in declaration order; resolving them is
/// the registry's job.
pub trait ImportExtractor {
    fn extract_imports(&self, contents: &str) -> Vec<String>;
}

/// [`ImportExtractor`] for Go source files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoImportExtractor;

impl ImportExtractor for GoImportExtractor {
    fn extract_imports(&self, contents: &str) -> Vec<String> {
        let mut lexer = Lexer::new(contents);
        let mut imports = Vec::new();

        while let Some(token) = lexer.next_token() {
            if let Token::Ident(word) = token {
                match word.as_str() {
                    "import" => read_import_decl(&mut lexer, &mut imports),
                    "func" | "type" | "var" | "const" => break,
                    _ => {}
                }
            }
        }

        imports
    }
}

/// Read the package name from a file's package clause.
///
/// Leading comments (build constraints, license headers) are skipped.
/// Returns `None` when the first token is not `package <name>`.
pub fn parse_package_clause(contents: &str) -> Option<String> {
    let mut lexer = Lexer::new(contents);
    match lexer.next_token()? {
        Token::Ident(word) if word == "package" => {}
        _ => return None,
    }
    match lexer.next_token()? {
        Token::Ident(name) => Some(name),
        _ => None,
    }
}

/// Consume one import declaration after the `import` keyword.
fn read_import_decl(lexer: &mut Lexer<'_>, imports: &mut Vec<String>) {
    match lexer.next_token() {
        Some(Token::Open) => {
            let mut depth = 1usize;
            while let Some(token) = lexer.next_token() {
                match token {
                    Token::Open => depth += 1,
                    Token::Close => {
                        depth -= 1;
                        if depth == 0 {
                            return;
                        }
                    }
                    Token::Str(path) => imports.push(path),
                    _ => {}
                }
            }
        }
        Some(Token::Str(path)) => imports.push(path),
        // Aliased, dot or blank import: the path follows the name.
        Some(Token::Ident(_)) | Some(Token::Punct('.')) => {
            if let Some(Token::Str(path)) = lexer.next_token() {
                imports.push(path);
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    /// Interpreted or raw string literal, quotes removed
    Str(String),
    Open,
    Close,
    Punct(char),
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.chars().peekable(),
        }
    }

    /// Next significant token, or `None` at end of input or on a literal
    /// that never terminates.
    fn next_token(&mut self) -> Option<Token> {
        loop {
            let c = self.chars.next()?;
            match c {
                c if c.is_whitespace() || c == ';' => continue,
                '/' if self.chars.peek() == Some(&'/') => self.skip_line(),
                '/' if self.chars.peek() == Some(&'*') => {
                    self.chars.next();
                    self.skip_block_comment();
                }
                '"' => return self.interpreted_string().map(Token::Str),
                '`' => return self.raw_string().map(Token::Str),
                '\'' => {
                    self.rune_literal()?;
                }
                '(' | '[' | '{' => return Some(Token::Open),
                ')' | ']' | '}' => return Some(Token::Close),
                c if c.is_alphanumeric() || c == '_' => {
                    let mut word = String::from(c);
                    while let Some(&next) = self.chars.peek() {
                        if next.is_alphanumeric() || next == '_' {
                            word.push(next);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    return Some(Token::Ident(word));
                }
                other => return Some(Token::Punct(other)),
            }
        }
    }

    fn skip_line(&mut self) {
        for c in self.chars.by_ref() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        while let Some(c) = self.chars.next() {
            if c == '*' && self.chars.peek() == Some(&'/') {
                self.chars.next();
                return;
            }
        }
    }

    fn interpreted_string(&mut self) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '"' => return Some(value),
                '\\' => value.push(self.chars.next()?),
                '\n' => return None,
                c => value.push(c),
            }
        }
        None
    }

    fn raw_string(&mut self) -> Option<String> {
        let mut value = String::new();
        for c in self.chars.by_ref() {
            if c == '`' {
                return Some(value);
            }
            value.push(c);
        }
        None
    }

    fn rune_literal(&mut self) -> Option<()> {
        while let Some(c) = self.chars.next() {
            match c {
                '\'' => return Some(()),
                '\\' => {
                    self.chars.next()?;
                }
                '\n' => return None,
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(src: &str) -> Vec<String> {
        GoImportExtractor.extract_imports(src)
    }

    #[test]
    fn test_single_and_block_imports() {
        let src = r#"package main

import "fmt"

import (
	"net/http"
	log "github.com/sirupsen/logrus"
	. "example.com/shop/backend/libs/testutil"
	_ "github.com/lib/pq"
)

func main() {}
"#;
        assert_eq!(
            extract(src),
            vec![
                "fmt",
                "net/http",
                "github.com/sirupsen/logrus",
                "example.com/shop/backend/libs/testutil",
                "github.com/lib/pq",
            ]
        );
    }

    #[test]
    fn test_aliased_single_line_imports() {
        let src = "package x\nimport pg \"github.com/jackc/pgx/v5\"\nimport _ `embed`\n";
        assert_eq!(extract(src), vec!["github.com/jackc/pgx/v5", "embed"]);
    }

    #[test]
    fn test_comments_are_ignored() {
        let src = r#"// Package x does things.
// import "commented/out"
package x

/* import "also/commented" */
import (
	"os" // trailing "comment/path"
	/* "inside/block/comment" */
	"strings"
)
"#;
        assert_eq!(extract(src), vec!["os", "strings"]);
    }

    #[test]
    fn test_stops_at_first_declaration() {
        let src = r#"package x

import "os"

var banner = "import \"not/an/import\""

func f() {
	_ = `import "also/not"`
}
"#;
        assert_eq!(extract(src), vec!["os"]);
    }

    #[test]
    fn test_nested_parentheses_tolerated() {
        let src = "package x\nimport (\n\t\"a\"\n\t(\"b\")\n\t\"c\"\n)\nimport \"d\"\n";
        assert_eq!(extract(src), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_malformed_input_returns_partial_results() {
        assert_eq!(extract("package x\nimport (\n\t\"a\"\n\t\"b"), vec!["a"]);
        assert_eq!(extract("package x\nimport (\n\t\"a\"\n"), vec!["a"]);
        assert!(extract("").is_empty());
        assert!(extract("\"unterminated").is_empty());
    }

    #[test]
    fn test_package_clause() {
        assert_eq!(parse_package_clause("package main\n"), Some("main".to_string()));
        assert_eq!(
            parse_package_clause("//go:build linux\n\n/* header */\npackage orders_test\n"),
            Some("orders_test".to_string())
        );
        assert_eq!(parse_package_clause("func main() {}"), None);
        assert_eq!(parse_package_clause(""), None);
        assert_eq!(parse_package_clause("package"), None);
    }
}
