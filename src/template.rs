//! URI Templates, as described in RFC 6570
//!
//! Only string values are supported, which is all that image names need.
//! Within that limit every operator and modifier from level 4 is handled.

use crate::errors::TemplateError;
use regex::Regex;
use std::{collections::HashMap, fmt, str::FromStr};

/// A parsed URI Template
#[derive(Clone)]
pub struct UriTemplate {
    serialized: String,
    parts: Vec<Part>,
}

#[derive(Clone, Debug)]
enum Part {
    Literal(String),
    Expression(Operator, Vec<VarSpec>),
}

#[derive(Clone, Debug)]
struct VarSpec {
    name: String,
    prefix: Option<usize>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParameter,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Reserved),
            '#' => Some(Operator::Fragment),
            '.' => Some(Operator::Label),
            '/' => Some(Operator::Path),
            ';' => Some(Operator::PathParameter),
            '?' => Some(Operator::Query),
            '&' => Some(Operator::QueryContinuation),
            _ => None,
        }
    }

    fn first(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved => "",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParameter => ";",
            Operator::Query => "?",
            Operator::QueryContinuation => "&",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved | Operator::Fragment => ",",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParameter => ";",
            Operator::Query | Operator::QueryContinuation => "&",
        }
    }

    fn is_named(self) -> bool {
        match self {
            Operator::PathParameter | Operator::Query | Operator::QueryContinuation => true,
            _ => false,
        }
    }

    fn if_empty(self) -> &'static str {
        match self {
            Operator::Query | Operator::QueryContinuation => "=",
            _ => "",
        }
    }

    fn allows_reserved(self) -> bool {
        self == Operator::Reserved || self == Operator::Fragment
    }
}

impl UriTemplate {
    /// Returns a reference to the template text
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Parse a [prim@str] as a [UriTemplate]
    pub fn parse(s: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut rest = s;
        while !rest.is_empty() {
            match rest.find(|c: char| c == '{' || c == '}') {
                None => {
                    parts.push(Part::Literal(rest.to_owned()));
                    rest = "";
                }
                Some(pos) if rest[pos..].starts_with('}') => {
                    return Err(TemplateError::UnexpectedBrace {
                        template: s.to_owned(),
                    })
                }
                Some(pos) => {
                    if pos > 0 {
                        parts.push(Part::Literal(rest[..pos].to_owned()));
                    }
                    let end = match rest[pos..].find('}') {
                        Some(end) => pos + end,
                        None => {
                            return Err(TemplateError::Unclosed {
                                template: s.to_owned(),
                            })
                        }
                    };
                    parts.push(UriTemplate::parse_expression(s, &rest[pos + 1..end])?);
                    rest = &rest[end + 1..];
                }
            }
        }
        Ok(UriTemplate {
            serialized: s.to_owned(),
            parts,
        })
    }

    fn parse_expression(template: &str, expression: &str) -> Result<Part, TemplateError> {
        lazy_static! {
            static ref VARSPEC: Regex = Regex::new(concat!(
                "^",
                "(?P<name>",
                /* */ "(?:[a-zA-Z0-9_]|%[0-9a-fA-F]{2})",
                /* */ "(?:\\.?(?:[a-zA-Z0-9_]|%[0-9a-fA-F]{2}))*",
                ")",
                "(?:",
                /* */ "(?P<explode>\\*)|",
                /* */ ":(?P<prefix>[1-9][0-9]{0,3})",
                ")?",
                "$",
            ))
            .unwrap();
        }
        let invalid = || TemplateError::InvalidExpression {
            template: template.to_owned(),
            expression: expression.to_owned(),
        };
        let (operator, list) = match expression.chars().next().and_then(Operator::from_char) {
            Some(operator) => (operator, &expression[1..]),
            None => (Operator::Simple, expression),
        };
        let mut vars = Vec::new();
        for spec in list.split(',') {
            let captures = VARSPEC.captures(spec).ok_or_else(invalid)?;
            // explode has no effect on string values, so it is only validated
            vars.push(VarSpec {
                name: captures["name"].to_owned(),
                prefix: match captures.name("prefix") {
                    Some(m) => Some(m.as_str().parse().map_err(|_| invalid())?),
                    None => None,
                },
            });
        }
        Ok(Part::Expression(operator, vars))
    }

    /// Expand the template with the given variables
    ///
    /// Variables that are not defined are left out of the result, along with
    /// any separators they would have needed.
    pub fn expand(&self, vars: &HashMap<&str, &str>) -> String {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(literal) => result.push_str(literal),
                Part::Expression(operator, specs) => {
                    let mut first = true;
                    for spec in specs {
                        let value = match vars.get(spec.name.as_str()) {
                            Some(value) => *value,
                            None => continue,
                        };
                        result.push_str(if first {
                            operator.first()
                        } else {
                            operator.separator()
                        });
                        first = false;
                        let value = match spec.prefix {
                            Some(len) => value.chars().take(len).collect(),
                            None => value.to_owned(),
                        };
                        if operator.is_named() {
                            result.push_str(&spec.name);
                            if value.is_empty() {
                                result.push_str(operator.if_empty());
                                continue;
                            }
                            result.push('=');
                        }
                        percent_encode(&mut result, &value, operator.allows_reserved());
                    }
                }
            }
        }
        result
    }
}

fn percent_encode(out: &mut String, value: &str, allow_reserved: bool) {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let is_triplet = b == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit();
        if allow_reserved && is_triplet {
            out.push_str(&value[i..i + 3]);
            i += 3;
            continue;
        }
        let unreserved = b.is_ascii_alphanumeric() || b"-._~".contains(&b);
        let reserved = b":/?#[]@!$&'()*+,;=".contains(&b);
        if unreserved || (allow_reserved && reserved) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
        i += 1;
    }
}

impl FromStr for UriTemplate {
    type Err = TemplateError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UriTemplate::parse(s)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UriTemplate({})", self)
    }
}
