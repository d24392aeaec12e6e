use std::fmt;

use promptcraft_core::Value;

#[derive(Debug)]
pub(crate) struct SyntaxError {
    message: String,
    line: usize,
}

impl SyntaxError {
    fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Output(Expr),
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    For {
        var: String,
        iterable: Expr,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Value),
    Lookup { root: String, path: Vec<Accessor> },
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Filter {
        input: Box<Expr>,
        filter: Filter,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum Accessor {
    Field(String),
    Index(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Closed allow-list of operations a template may apply to a value. Anything
/// outside this set is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Filter {
    Upper,
    Lower,
    Trim,
    Length,
    Default,
    Join,
    Safe,
}

impl Filter {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "upper" => Some(Filter::Upper),
            "lower" => Some(Filter::Lower),
            "trim" => Some(Filter::Trim),
            "length" | "count" => Some(Filter::Length),
            "default" => Some(Filter::Default),
            "join" => Some(Filter::Join),
            "safe" => Some(Filter::Safe),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Filter::Default | Filter::Join => 1,
            _ => 0,
        }
    }
}

pub(crate) fn parse(source: &str) -> Result<Vec<Node>, SyntaxError> {
    let segments = lex(source)?;
    let mut parser = Parser {
        segments: segments.into_iter(),
        line: 1,
    };
    // An empty stop list never yields a terminator: stray end tags error out
    // inside parse_until.
    let (nodes, _terminator) = parser.parse_until(&[])?;
    Ok(nodes)
}

#[derive(Debug)]
enum Segment {
    Text(String),
    Expr { content: String, line: usize },
    Tag { content: String, line: usize },
}

fn lex(source: &str) -> Result<Vec<Segment>, SyntaxError> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut line = 1usize;

    loop {
        let expr_at = rest.find("{{");
        let tag_at = rest.find("{%");
        let (start, open_len, close, is_expr) = match (expr_at, tag_at) {
            (None, None) => {
                if !rest.is_empty() {
                    segments.push(Segment::Text(rest.to_string()));
                }
                return Ok(segments);
            }
            (Some(e), Some(t)) if e < t => (e, 2, "}}", true),
            (Some(e), None) => (e, 2, "}}", true),
            (_, Some(t)) => (t, 2, "%}", false),
        };

        let text = &rest[..start];
        if !text.is_empty() {
            segments.push(Segment::Text(text.to_string()));
        }
        line += text.matches('\n').count();

        let inner = &rest[start + open_len..];
        let Some(end) = inner.find(close) else {
            let what = if is_expr {
                "unterminated variable expression"
            } else {
                "unterminated block tag"
            };
            return Err(SyntaxError::new(what, line));
        };
        let content = inner[..end].trim().to_string();
        let segment_line = line;
        line += inner[..end].matches('\n').count();
        segments.push(if is_expr {
            Segment::Expr {
                content,
                line: segment_line,
            }
        } else {
            Segment::Tag {
                content,
                line: segment_line,
            }
        });
        rest = &inner[end + close.len()..];
    }
}

struct TagHead {
    keyword: String,
    rest: String,
    line: usize,
}

struct Parser {
    segments: std::vec::IntoIter<Segment>,
    line: usize,
}

impl Parser {
    /// Parses nodes until one of the `stop` tags is reached (returned as the
    /// terminator) or the input ends (terminator `None`).
    fn parse_until(&mut self, stop: &[&str]) -> Result<(Vec<Node>, Option<TagHead>), SyntaxError> {
        let mut nodes = Vec::new();
        while let Some(segment) = self.segments.next() {
            match segment {
                Segment::Text(text) => nodes.push(Node::Text(text)),
                Segment::Expr { content, line } => {
                    self.line = line;
                    if content.is_empty() {
                        return Err(SyntaxError::new("empty variable expression", line));
                    }
                    nodes.push(Node::Output(parse_expression(&content, line)?));
                }
                Segment::Tag { content, line } => {
                    self.line = line;
                    let (keyword, rest) = split_tag(&content, line)?;
                    if stop.contains(&keyword.as_str()) {
                        return Ok((nodes, Some(TagHead { keyword, rest, line })));
                    }
                    match keyword.as_str() {
                        "if" => nodes.push(self.parse_if(&rest, line)?),
                        "for" => nodes.push(self.parse_for(&rest, line)?),
                        "elif" | "else" | "endif" | "endfor" => {
                            return Err(SyntaxError::new(
                                format!("unexpected '{keyword}' tag"),
                                line,
                            ));
                        }
                        other => {
                            return Err(SyntaxError::new(format!("unknown tag '{other}'"), line));
                        }
                    }
                }
            }
        }
        Ok((nodes, None))
    }

    fn parse_if(&mut self, condition: &str, line: usize) -> Result<Node, SyntaxError> {
        if condition.is_empty() {
            return Err(SyntaxError::new("'if' tag requires a condition", line));
        }
        let mut branches = Vec::new();
        let mut cond = parse_expression(condition, line)?;
        loop {
            let (body, terminator) = self.parse_until(&["elif", "else", "endif"])?;
            let Some(head) = terminator else {
                return Err(SyntaxError::new(
                    "unexpected end of template, expected 'endif'",
                    self.line,
                ));
            };
            match head.keyword.as_str() {
                "elif" => {
                    branches.push((cond, body));
                    if head.rest.is_empty() {
                        return Err(SyntaxError::new(
                            "'elif' tag requires a condition",
                            head.line,
                        ));
                    }
                    cond = parse_expression(&head.rest, head.line)?;
                }
                "else" => {
                    ensure_no_args(&head)?;
                    branches.push((cond, body));
                    let (otherwise, terminator) = self.parse_until(&["endif"])?;
                    let Some(end) = terminator else {
                        return Err(SyntaxError::new(
                            "unexpected end of template, expected 'endif'",
                            self.line,
                        ));
                    };
                    ensure_no_args(&end)?;
                    return Ok(Node::If {
                        branches,
                        otherwise,
                    });
                }
                "endif" => {
                    ensure_no_args(&head)?;
                    branches.push((cond, body));
                    return Ok(Node::If {
                        branches,
                        otherwise: Vec::new(),
                    });
                }
                other => {
                    return Err(SyntaxError::new(
                        format!("unexpected '{other}' tag"),
                        head.line,
                    ));
                }
            }
        }
    }

    fn parse_for(&mut self, head: &str, line: usize) -> Result<Node, SyntaxError> {
        let head = head.trim();
        let Some(var_end) = head.find(char::is_whitespace) else {
            return Err(SyntaxError::new(
                "'for' tag requires 'name in expression'",
                line,
            ));
        };
        let var = &head[..var_end];
        if !is_identifier(var) {
            return Err(SyntaxError::new(
                format!("invalid loop variable '{var}'"),
                line,
            ));
        }
        let rest = head[var_end..].trim_start();
        let Some(after_in) = rest.strip_prefix("in") else {
            return Err(SyntaxError::new(
                "'for' tag requires 'name in expression'",
                line,
            ));
        };
        if !after_in.starts_with(char::is_whitespace) {
            return Err(SyntaxError::new(
                "'for' tag requires 'name in expression'",
                line,
            ));
        }
        let iterable = parse_expression(after_in.trim_start(), line)?;
        let (body, terminator) = self.parse_until(&["endfor"])?;
        let Some(end) = terminator else {
            return Err(SyntaxError::new(
                "unexpected end of template, expected 'endfor'",
                self.line,
            ));
        };
        ensure_no_args(&end)?;
        Ok(Node::For {
            var: var.to_string(),
            iterable,
            body,
        })
    }
}

fn split_tag(content: &str, line: usize) -> Result<(String, String), SyntaxError> {
    if content.is_empty() {
        return Err(SyntaxError::new("empty block tag", line));
    }
    match content.find(char::is_whitespace) {
        Some(end) => Ok((
            content[..end].to_string(),
            content[end..].trim().to_string(),
        )),
        None => Ok((content.to_string(), String::new())),
    }
}

fn ensure_no_args(head: &TagHead) -> Result<(), SyntaxError> {
    if head.rest.is_empty() {
        Ok(())
    } else {
        Err(SyntaxError::new(
            format!("'{}' tag takes no arguments", head.keyword),
            head.line,
        ))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(Value),
    Symbol(&'static str),
}

fn tokenize(input: &str, line: usize) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let invalid =
                || SyntaxError::new(format!("invalid number literal '{text}'"), line);
            let value = if text.contains('.') {
                let parsed: f64 = text.parse().map_err(|_| invalid())?;
                serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(invalid)?
            } else {
                let parsed: i64 = text.parse().map_err(|_| invalid())?;
                Value::from(parsed)
            };
            tokens.push(Token::Number(value));
            continue;
        }
        if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            let mut out = String::new();
            let mut closed = false;
            while i < chars.len() {
                let ch = chars[i];
                if ch == '\\' && i + 1 < chars.len() {
                    let escaped = chars[i + 1];
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    i += 2;
                    continue;
                }
                if ch == quote {
                    closed = true;
                    i += 1;
                    break;
                }
                out.push(ch);
                i += 1;
            }
            if !closed {
                return Err(SyntaxError::new("unterminated string literal", line));
            }
            tokens.push(Token::Str(out));
            continue;
        }
        if i + 1 < chars.len() {
            let two = match (c, chars[i + 1]) {
                ('=', '=') => Some("=="),
                ('!', '=') => Some("!="),
                ('<', '=') => Some("<="),
                ('>', '=') => Some(">="),
                _ => None,
            };
            if let Some(op) = two {
                tokens.push(Token::Symbol(op));
                i += 2;
                continue;
            }
        }
        let single = match c {
            '<' => "<",
            '>' => ">",
            '|' => "|",
            '.' => ".",
            '[' => "[",
            ']' => "]",
            '(' => "(",
            ')' => ")",
            ',' => ",",
            other => {
                return Err(SyntaxError::new(
                    format!("unexpected character '{other}' in expression"),
                    line,
                ));
            }
        };
        tokens.push(Token::Symbol(single));
        i += 1;
    }
    Ok(tokens)
}

pub(crate) fn parse_expression(input: &str, line: usize) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(input, line)?;
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        line,
    };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(SyntaxError::new(
            format!("unexpected trailing tokens in expression '{input}'"),
            line,
        ));
    }
    Ok(expr)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(s)) if s == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), SyntaxError> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(SyntaxError::new(format!("expected '{symbol}'"), self.line))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_keyword("not") {
            Ok(Expr::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_filtered()?;
        let op = match self.peek() {
            Some(Token::Symbol(s)) => match *s {
                "==" => Some(BinaryOp::Eq),
                "!=" => Some(BinaryOp::Ne),
                "<=" => Some(BinaryOp::Le),
                ">=" => Some(BinaryOp::Ge),
                "<" => Some(BinaryOp::Lt),
                ">" => Some(BinaryOp::Gt),
                _ => None,
            },
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.parse_filtered()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_filtered(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        while self.eat_symbol("|") {
            let name = match self.advance() {
                Some(Token::Ident(name)) => name,
                _ => {
                    return Err(SyntaxError::new("expected filter name after '|'", self.line));
                }
            };
            let Some(filter) = Filter::from_name(&name) else {
                return Err(SyntaxError::new(format!("unknown filter '{name}'"), self.line));
            };
            let mut args = Vec::new();
            if self.eat_symbol("(") {
                if !self.eat_symbol(")") {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat_symbol(",") {
                            continue;
                        }
                        self.expect_symbol(")")?;
                        break;
                    }
                }
            }
            if args.len() != filter.arity() {
                return Err(SyntaxError::new(
                    format!(
                        "filter '{name}' takes {} argument(s), got {}",
                        filter.arity(),
                        args.len()
                    ),
                    self.line,
                ));
            }
            expr = Expr::Filter {
                input: Box::new(expr),
                filter,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.advance() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Number(n)) => Ok(Expr::Literal(n)),
            Some(Token::Symbol(s)) if s == "(" => {
                let inner = self.parse_or()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "none" | "null" => Ok(Expr::Literal(Value::Null)),
                "and" | "or" | "not" | "in" => Err(SyntaxError::new(
                    format!("unexpected keyword '{name}'"),
                    self.line,
                )),
                _ => self.parse_path(name),
            },
            _ => Err(SyntaxError::new("expected a value", self.line)),
        }
    }

    fn parse_path(&mut self, root: String) -> Result<Expr, SyntaxError> {
        let mut path = Vec::new();
        loop {
            if self.eat_symbol(".") {
                match self.advance() {
                    Some(Token::Ident(field)) => path.push(Accessor::Field(field)),
                    _ => {
                        return Err(SyntaxError::new(
                            "expected attribute name after '.'",
                            self.line,
                        ));
                    }
                }
            } else if self.eat_symbol("[") {
                let index = self.parse_or()?;
                self.expect_symbol("]")?;
                path.push(Accessor::Index(Box::new(index)));
            } else {
                break;
            }
        }
        Ok(Expr::Lookup { root, path })
    }
}
