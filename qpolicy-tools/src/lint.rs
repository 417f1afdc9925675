//! qrexec policy linter.
//!
//! [`parse_file`] is a command: it reads a policy file (or the routine's
//! stdin for [`STDIN_PATH`]), prints every problem as
//! `<file>:<line>: <message>` and exits with [`crate::FAILURE_STATUS`] when
//! anything was wrong. [`parse_policy`] is the pure parser underneath.
//!
//! # Line grammar
//!
//! ```text
//! # comment
//! !include PATH
//! !include-dir PATH
//! !include-service SERVICE ARGUMENT PATH
//! !compat-4.0
//! SERVICE ARGUMENT SOURCE TARGET ACTION [PARAM=VALUE ...]
//! SERVICE SOURCE TARGET ACTION [PARAM=VALUE ...]
//! ```
//!
//! The second rule form omits the argument, which then matches any (`*`).
//! Include-service files drop the `SERVICE ARGUMENT` columns.

use std::fmt;
use std::io::Write;

use crate::error::ToolExit;
use crate::stdio;

/// Pseudo-path meaning "read the policy from stdin".
pub const STDIN_PATH: &str = "-";

const MAX_QUBE_NAME: usize = 31;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Policy action keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    Deny,
    Ask,
}

impl Action {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "allow" => Some(Action::Allow),
            "deny" => Some(Action::Deny),
            "ask" => Some(Action::Ask),
            _ => None,
        }
    }

    fn allowed_params(self) -> &'static [&'static str] {
        match self {
            Action::Allow => &["target", "user", "autostart", "notify"],
            Action::Deny => &["notify"],
            Action::Ask => &["target", "default_target", "user", "autostart", "notify"],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allow => write!(f, "allow"),
            Action::Deny => write!(f, "deny"),
            Action::Ask => write!(f, "ask"),
        }
    }
}

/// A parsed policy rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub lineno: usize,
    /// `None` in include-service files.
    pub service: Option<String>,
    pub argument: Option<String>,
    pub source: String,
    pub target: String,
    pub action: Action,
    pub params: Vec<(String, String)>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:", self.lineno)?;
        if let (Some(service), Some(argument)) = (&self.service, &self.argument) {
            write!(f, " {service} {argument}")?;
        }
        write!(f, " {} {} {}", self.source, self.target, self.action)?;
        for (key, value) in &self.params {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// A parsed `!` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub lineno: usize,
    pub name: String,
    pub args: Vec<String>,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: !{}", self.lineno, self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// One meaningful line of a policy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyLine {
    Directive(Directive),
    Rule(Rule),
}

impl fmt::Display for PolicyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyLine::Directive(d) => d.fmt(f),
            PolicyLine::Rule(r) => r.fmt(f),
        }
    }
}

/// A problem found on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintError {
    pub lineno: usize,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Command entry point
// ---------------------------------------------------------------------------

/// Lint the policy at `path` (or stdin for `-`).
///
/// With `show`, every parsed line is echoed on success.
pub fn parse_file(path: &str, show: bool, include_service: bool) -> Result<(), ToolExit> {
    let mut out = stdio::stdout();
    let (display, text) = if path == STDIN_PATH {
        ("<stdin>", stdio::stdin().read_all()?)
    } else {
        match std::fs::read_to_string(path) {
            Ok(text) => (path, text),
            Err(err) => {
                writeln!(out, "{path}: {err}")?;
                return Err(ToolExit::failure());
            }
        }
    };

    match parse_policy(&text, include_service) {
        Ok(lines) => {
            if show {
                for line in &lines {
                    writeln!(out, "{line}")?;
                }
            }
            Ok(())
        }
        Err(errors) => {
            for err in &errors {
                writeln!(out, "{display}:{}: {}", err.lineno, err.message)?;
            }
            Err(ToolExit::failure())
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a whole policy, collecting every error rather than stopping at
/// the first one.
pub fn parse_policy(text: &str, include_service: bool) -> Result<Vec<PolicyLine>, Vec<LintError>> {
    let mut lines = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed = if let Some(directive) = trimmed.strip_prefix('!') {
            parse_directive(lineno, directive).map(PolicyLine::Directive)
        } else {
            parse_rule(lineno, trimmed, include_service).map(PolicyLine::Rule)
        };

        match parsed {
            Ok(line) => lines.push(line),
            Err(message) => errors.push(LintError { lineno, message }),
        }
    }

    if errors.is_empty() {
        Ok(lines)
    } else {
        Err(errors)
    }
}

fn parse_directive(lineno: usize, text: &str) -> Result<Directive, String> {
    let mut tokens = text.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_string();
    let args: Vec<String> = tokens.map(str::to_string).collect();

    let expected = match name.as_str() {
        "include" | "include-dir" => 1,
        "include-service" => 3,
        "compat-4.0" => 0,
        _ => return Err(format!("invalid directive: !{name}")),
    };
    if args.len() != expected {
        return Err(format!(
            "!{name}: expected {expected} argument(s), got {}",
            args.len()
        ));
    }
    if name == "include-service" {
        check_service(&args[0])?;
        check_argument(&args[0], &args[1])?;
    }

    Ok(Directive { lineno, name, args })
}

fn parse_rule(lineno: usize, text: &str, include_service: bool) -> Result<Rule, String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let minimum = if include_service { 3 } else { 4 };
    if tokens.len() < minimum {
        return Err(format!(
            "wrong number of fields: expected at least {minimum}, got {}",
            tokens.len()
        ));
    }

    let (service, argument, rest) = if include_service {
        (None, None, &tokens[..])
    } else if tokens.len() >= 5 && Action::parse(tokens[4]).is_some() {
        check_service(tokens[0])?;
        check_argument(tokens[0], tokens[1])?;
        (
            Some(tokens[0].to_string()),
            Some(tokens[1].to_string()),
            &tokens[2..],
        )
    } else if Action::parse(tokens[3]).is_some() {
        // Argument column omitted: same as `*`.
        check_service(tokens[0])?;
        (Some(tokens[0].to_string()), Some("*".to_string()), &tokens[1..])
    } else {
        return Err(format!(
            "invalid action: {}",
            tokens.get(4).copied().unwrap_or(tokens[3])
        ));
    };

    let source = rest[0];
    let target = rest[1];
    if !is_valid_source(source) {
        return Err(format!("invalid source: {source}"));
    }
    if !is_valid_target(target) {
        return Err(format!("invalid target: {target}"));
    }

    let action = Action::parse(rest[2]).ok_or_else(|| format!("invalid action: {}", rest[2]))?;
    let params = parse_params(action, &rest[3..])?;

    Ok(Rule {
        lineno,
        service,
        argument,
        source: source.to_string(),
        target: target.to_string(),
        action,
        params,
    })
}

fn parse_params(action: Action, tokens: &[&str]) -> Result<Vec<(String, String)>, String> {
    let mut params: Vec<(String, String)> = Vec::new();
    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            return Err(format!("invalid parameter: {token}"));
        };
        if !action.allowed_params().contains(&key) {
            return Err(format!("parameter {key} not allowed for action {action}"));
        }
        if params.iter().any(|(existing, _)| existing == key) {
            return Err(format!("duplicate parameter: {key}"));
        }
        let valid = match key {
            "autostart" | "notify" => matches!(value, "yes" | "no"),
            "target" | "default_target" => is_valid_redirect(value),
            _ => !value.is_empty(),
        };
        if !valid {
            return Err(format!("invalid value for {key}: {value}"));
        }
        params.push((key.to_string(), value.to_string()));
    }
    Ok(params)
}

// ---------------------------------------------------------------------------
// Token checks
// ---------------------------------------------------------------------------

fn check_service(service: &str) -> Result<(), String> {
    let valid = service == "*"
        || (!service.is_empty()
            && service
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')));
    if valid {
        Ok(())
    } else {
        Err(format!("invalid service name: {service}"))
    }
}

fn check_argument(service: &str, argument: &str) -> Result<(), String> {
    if argument == "*" {
        return Ok(());
    }
    if service == "*" {
        return Err("wildcard service requires wildcard argument".to_string());
    }
    let valid = argument.strip_prefix('+').is_some_and(|rest| {
        rest.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))
    });
    if valid {
        Ok(())
    } else {
        Err(format!("invalid argument: {argument}"))
    }
}

fn is_qube_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_QUBE_NAME
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn is_valid_keyword(token: &str) -> bool {
    match token {
        "*" | "@anyvm" | "@adminvm" | "@dispvm" | "dom0" => true,
        _ => {
            if let Some(rest) = token.strip_prefix("@dispvm:") {
                return match rest.strip_prefix("@tag:") {
                    Some(tag) => !tag.is_empty(),
                    None => is_qube_name(rest),
                };
            }
            if let Some(rest) = token
                .strip_prefix("@tag:")
                .or_else(|| token.strip_prefix("@type:"))
            {
                return !rest.is_empty();
            }
            !token.starts_with('@') && is_qube_name(token)
        }
    }
}

fn is_valid_source(token: &str) -> bool {
    is_valid_keyword(token)
}

fn is_valid_target(token: &str) -> bool {
    token == "@default" || is_valid_keyword(token)
}

/// Values accepted by `target=` / `default_target=`.
fn is_valid_redirect(value: &str) -> bool {
    match value {
        "@adminvm" | "@dispvm" | "dom0" => true,
        _ => match value.strip_prefix("@dispvm:") {
            Some(rest) => is_qube_name(rest),
            None => is_qube_name(value),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
