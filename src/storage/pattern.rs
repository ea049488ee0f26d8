//! Glob matching for KEYS.
//!
//! Keys are arbitrary bytes, so matching is done byte-wise. The pattern is
//! compiled once into tokens and matched with a single backtrack point (the
//! most recent `*`), which keeps a match within O(pattern × key).

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Byte(u8),
    Range(u8, u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Star,
    Any,
    Literal(u8),
    Class { negate: bool, items: Vec<ClassItem> },
}

impl Token {
    fn accepts(&self, c: u8) -> bool {
        match self {
            Token::Star | Token::Any => true,
            Token::Literal(b) => *b == c,
            Token::Class { negate, items } => {
                let hit = items.iter().any(|item| match *item {
                    ClassItem::Byte(b) => b == c,
                    ClassItem::Range(lo, hi) => (lo..=hi).contains(&c),
                });
                hit != *negate
            }
        }
    }
}

/// A compiled KEYS pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    /// `None` for a pattern with an unterminated class, which matches
    /// nothing.
    tokens: Option<Vec<Token>>,
}

impl GlobPattern {
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            tokens: compile(pattern),
        }
    }

    pub fn matches(&self, text: &[u8]) -> bool {
        let Some(tokens) = &self.tokens else {
            return false;
        };

        let (mut p, mut t) = (0, 0);
        // Position of the last `*` seen and the text index it resumes from.
        let mut star: Option<(usize, usize)> = None;

        while t < text.len() {
            match tokens.get(p) {
                Some(Token::Star) => {
                    star = Some((p, t));
                    p += 1;
                }
                Some(token) if token.accepts(text[t]) => {
                    p += 1;
                    t += 1;
                }
                _ => match star {
                    Some((star_p, star_t)) => {
                        p = star_p + 1;
                        t = star_t + 1;
                        star = Some((star_p, t));
                    }
                    None => return false,
                },
            }
        }

        tokens[p..].iter().all(|token| *token == Token::Star)
    }
}

fn compile(pattern: &[u8]) -> Option<Vec<Token>> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut i = 0;

    while i < pattern.len() {
        match pattern[i] {
            b'*' => {
                // Runs of stars behave like one.
                if tokens.last() != Some(&Token::Star) {
                    tokens.push(Token::Star);
                }
                i += 1;
            }
            b'?' => {
                tokens.push(Token::Any);
                i += 1;
            }
            b'[' => {
                let (token, next) = compile_class(pattern, i + 1)?;
                tokens.push(token);
                i = next;
            }
            b'\\' if i + 1 < pattern.len() => {
                tokens.push(Token::Literal(pattern[i + 1]));
                i += 2;
            }
            literal => {
                tokens.push(Token::Literal(literal));
                i += 1;
            }
        }
    }

    Some(tokens)
}

/// Compiles a class body starting just after `[`. Returns the token and
/// the index just past `]`, or `None` if the class is never closed.
fn compile_class(pattern: &[u8], start: usize) -> Option<(Token, usize)> {
    let (negate, mut i) = match pattern.get(start) {
        Some(b'^') => (true, start + 1),
        _ => (false, start),
    };
    let mut items = Vec::new();

    while i < pattern.len() && pattern[i] != b']' {
        if pattern[i] == b'\\' && i + 1 < pattern.len() {
            items.push(ClassItem::Byte(pattern[i + 1]));
            i += 2;
            continue;
        }
        if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (a, b) = (pattern[i], pattern[i + 2]);
            items.push(ClassItem::Range(a.min(b), a.max(b)));
            i += 3;
            continue;
        }
        items.push(ClassItem::Byte(pattern[i]));
        i += 1;
    }

    if i >= pattern.len() {
        return None;
    }
    Some((Token::Class { negate, items }, i + 1))
}
