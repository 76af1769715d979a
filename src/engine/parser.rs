//! Rule source parser.
//!
//! Turns rule source text into a [`RuleChain`]. The grammar is line based:
//!
//! ```text
//! # comment
//! /sp[a4]m/i then replace **** then points 5
//! !"/" then log
//! /(fu|ck)/i then warn Mind your language, %player%! \
//!     then points 2 unless chat.trusted
//! ```
//!
//! ```text
//! logical-line := ["!"] pattern (then <token> [params])* (unless <permission>)*
//! pattern      := "/" regex "/" [flags]     `\/` is a literal slash
//!               | '"' literal '"'           `\x` is a literal x
//! flags        := "i"                        case-insensitive
//! ```
//!
//! A trailing `\` joins the next physical line onto the current one. Every
//! error reports the first physical line of the logical rule, which is kept
//! alongside the joined text in a `NumberedLine`.
//!
//! `then` and `unless` are recognised as whitespace-delimited words anywhere
//! after the pattern, so they cannot appear inside action parameters.

use super::rule::{ActionInvocation, Matcher, Rule, RuleChain};
use crate::actions::ActionRegistry;
use crate::error::{ParseError, ParseResult};
use regex::RegexBuilder;

const COMMENT: char = '#';
const CONTINUATION: char = '\\';
const ESCAPE: char = '\\';

/// A logical line and the physical line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NumberedLine {
    number: usize,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Then,
    Unless,
}

/// Parse a whole rule file.
pub fn parse_chain(name: &str, source: &str, registry: &ActionRegistry) -> ParseResult<RuleChain> {
    parse_lines(name, source.lines(), registry)
}

/// Parse physical lines (numbered from 1) into a chain.
///
/// Fails as a whole on the first bad rule; there is no partial chain.
pub fn parse_lines<I, S>(name: &str, lines: I, registry: &ActionRegistry) -> ParseResult<RuleChain>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let logical = join_lines(lines)?;
    let mut rules = Vec::with_capacity(logical.len());
    for line in &logical {
        let rule = parse_rule(line, registry)?;
        tracing::trace!(
            chain = name,
            line = rule.line(),
            matcher = %rule.matcher(),
            actions = rule.actions().len(),
            "rule compiled"
        );
        rules.push(rule);
    }
    tracing::debug!(chain = name, rules = rules.len(), "chain compiled");
    Ok(RuleChain::new(name, rules))
}

/// Drop blanks and comments, join continuations.
fn join_lines<I, S>(lines: I) -> ParseResult<Vec<NumberedLine>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut logical = Vec::new();
    let mut pending: Option<NumberedLine> = None;

    for (idx, raw) in lines.into_iter().enumerate() {
        let number = idx + 1;
        let trimmed = raw.as_ref().trim();

        if pending.is_none() && (trimmed.is_empty() || trimmed.starts_with(COMMENT)) {
            continue;
        }

        let (body, continues) = match trimmed.strip_suffix(CONTINUATION) {
            Some(body) => (body.trim_end(), true),
            None => (trimmed, false),
        };

        let current = match pending.take() {
            Some(mut open) => {
                if !body.is_empty() {
                    if !open.text.is_empty() {
                        open.text.push(' ');
                    }
                    open.text.push_str(body);
                }
                open
            }
            None => NumberedLine { number, text: body.to_string() },
        };

        if continues {
            pending = Some(current);
        } else {
            logical.push(current);
        }
    }

    if let Some(open) = pending {
        return Err(ParseError::malformed(open.number, "line continuation at end of input"));
    }
    Ok(logical)
}

fn parse_rule(line: &NumberedLine, registry: &ActionRegistry) -> ParseResult<Rule> {
    let number = line.number;
    let (matcher, rest) = parse_matcher(&line.text, number)?;

    let mut actions = Vec::new();
    let mut exemptions = Vec::new();
    for (keyword, body) in split_segments(rest, number)? {
        match keyword {
            Keyword::Then => {
                let (token, params) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
                let params = params.trim();
                if token.is_empty() {
                    return Err(ParseError::malformed(number, "'then' without an action"));
                }
                let action =
                    registry.construct(token, params).map_err(|err| ParseError::from_action(number, token, err))?;
                actions.push(ActionInvocation::new(token.to_ascii_lowercase(), params.to_string(), action));
            }
            Keyword::Unless => {
                if body.is_empty() || body.contains(char::is_whitespace) {
                    return Err(ParseError::malformed(number, "'unless' expects a single permission"));
                }
                exemptions.push(body.to_string());
            }
        }
    }

    Ok(Rule::new(number, matcher, actions, exemptions))
}

/// Parse the leading `[!]/regex/flags` or `[!]"literal"`; return the rest.
fn parse_matcher(text: &str, number: usize) -> ParseResult<(Matcher, &str)> {
    let text = text.trim_start();
    let (negated, text) = match text.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };

    let mut chars = text.char_indices();
    let (delimiter, literal) = match chars.next() {
        Some((_, '/')) => ('/', false),
        Some((_, '"')) => ('"', true),
        _ => return Err(ParseError::malformed(number, "expected /pattern/ or \"literal\"")),
    };

    let mut body = String::new();
    let mut end = None;
    while let Some((idx, c)) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some((_, next)) if next == delimiter || literal => body.push(next),
                Some((_, next)) => {
                    body.push(c);
                    body.push(next);
                }
                None => body.push(c),
            }
            continue;
        }
        if c == delimiter {
            end = Some(idx + c.len_utf8());
            break;
        }
        body.push(c);
    }

    let Some(end) = end else {
        return Err(ParseError::malformed(number, "unterminated pattern"));
    };
    if body.is_empty() {
        return Err(ParseError::malformed(number, "empty pattern"));
    }

    let rest = &text[end..];
    let (flags, rest) = rest.split_at(rest.find(char::is_whitespace).unwrap_or(rest.len()));
    let mut case_insensitive = false;
    for flag in flags.chars() {
        match flag {
            'i' => case_insensitive = true,
            other => return Err(ParseError::malformed(number, format!("unknown pattern flag '{other}'"))),
        }
    }

    let source = if literal { regex::escape(&body) } else { body };
    let regex = RegexBuilder::new(&source)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|err| ParseError::InvalidPattern { line: number, message: err.to_string() })?;

    Ok((Matcher::new(regex, negated, case_insensitive, source), rest))
}

/// Split `then ...` / `unless ...` segments following the pattern.
fn split_segments(rest: &str, number: usize) -> ParseResult<Vec<(Keyword, &str)>> {
    let mut segments = Vec::new();
    let mut open: Option<(Keyword, usize)> = None;

    for caps in regex!(r"(?:^|\s)(then|unless)(?:\s|$)").captures_iter(rest) {
        let (Some(whole), Some(word)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        match open {
            Some((keyword, start)) => segments.push((keyword, rest[start..whole.start()].trim())),
            None => {
                let stray = rest[..whole.start()].trim();
                if !stray.is_empty() {
                    return Err(ParseError::malformed(number, format!("unexpected text after pattern: '{stray}'")));
                }
            }
        }
        let keyword = if word.as_str() == "then" { Keyword::Then } else { Keyword::Unless };
        open = Some((keyword, word.end()));
    }

    match open {
        Some((keyword, start)) => segments.push((keyword, rest[start..].trim())),
        None => {
            let stray = rest.trim();
            if !stray.is_empty() {
                return Err(ParseError::malformed(number, format!("unexpected text after pattern: '{stray}'")));
            }
        }
    }
    Ok(segments)
}
