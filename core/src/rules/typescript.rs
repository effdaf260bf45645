//! Rules for `tsc` syntax diagnostics and the typescript-eslint rules the repair scripts target.

use super::{LineContext, LiteralSpans, RuleCatalog, RuleEntry, Severity, Window};
use crate::error::MenderResult;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[\w$.\[\]'"]+[ \t]*(?:\*\*|\?\?|\|\||&&|[-+*/%])?=[^=>]"#)
        .expect("assignment regex")
});

static DECLARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*[\w$]+[ \t]*(?:=[^=]|,|;|$)").expect("declarator regex")
});

/// The start of an object member: `key:`, `'key':` or a spread.
static MEMBER_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[ \t]*(?:\.\.\.|(?:[\w$]+|'[^'\n]*'|"[^"\n]*")[ \t]*:)"#)
        .expect("member start regex")
});

static AWAIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bawait[ \t]+").expect("await regex"));

const STATEMENT_KEYWORDS: &[&str] = &[
    "return", "throw", "break", "continue", "const", "let", "var", "import",
];

const DECLARATION_KEYWORDS: &[&str] = &["const", "let", "var"];

/// Words that can be followed by a value without a colon in between.
const NON_PROPERTY_WORDS: &[&str] = &[
    "await", "case", "const", "delete", "else", "export", "import", "in", "let", "new", "of",
    "return", "throw", "typeof", "var", "void", "yield",
];

/// Last characters after which a statement is clearly not finished.
const OPEN_ENDINGS: &[char] = &[
    ';', ',', '{', '(', '[', '=', '+', '-', '*', '/', '%', '&', '|', '?', ':', '.', '<', '>', '!',
    '\\',
];

pub(super) fn catalog() -> MenderResult<RuleCatalog> {
    let mut catalog = RuleCatalog::new();

    catalog
        .insert_universal(
            RuleEntry::new("duplicate-comma", r",(?:[ \t]*,)+")?
                .describe("Runs of commas collapse to one")
                .fixer(|_| Some(",".into())),
        )
        .insert_universal(
            RuleEntry::new("duplicate-semicolon", r";(?:[ \t]*;)+[ \t]*$")?
                .describe("Repeated statement terminators collapse to one")
                .fixer(|_| Some(";".into())),
        );

    catalog
        .insert(
            "TS1005",
            RuleEntry::new(
                "missing-terminator",
                r"^(?P<body>[ \t]*(?:(?:export[ \t]+)?(?:const|let|var)[ \t]+\S.*|return\b.*|break\b.*|continue\b.*|throw[ \t]+.*))$",
            )?
            .describe("Declaration, return, break or continue without a terminating `;`")
            .guard(expects_semicolon)
            .fixer(terminate),
        )
        .insert(
            "TS1005",
            RuleEntry::new("missing-assignment-terminator", r"^(?P<body>[ \t]*\S.*)$")?
                .describe("Assignment or property mutation without a terminating `;`")
                .guard(|ctx| expects_semicolon(ctx) && ASSIGNMENT.is_match(ctx.current.trim_start()))
                .fixer(terminate),
        )
        .insert(
            "TS1005",
            RuleEntry::new(
                "import-trailing-comma",
                r#"(?P<head>\}[ \t]*from[ \t]*(?:'[^'\n]*'|"[^"\n]*"))[ \t]*,[ \t]*$"#,
            )?
            .describe("Import statement terminated with `,`")
            .fixer(|caps| Some(format!("{};", &caps["head"]))),
        )
        .insert(
            "TS1005",
            RuleEntry::new(
                "export-list-trailing-comma",
                r"^(?P<head>[ \t]*export[ \t]*\{[^}\n]*\})[ \t]*,[ \t]*$",
            )?
            .describe("Export list terminated with `,`")
            .fixer(|caps| Some(format!("{};", &caps["head"]))),
        )
        .insert(
            "TS1005",
            RuleEntry::new("comma-as-terminator", r",[ \t]*$")?
                .describe("Statement ends in `,` where `;` was intended")
                .guard(terminates_statement)
                .fixer(|_| Some(";".into())),
        )
        .insert(
            "TS1005",
            RuleEntry::new(
                "missing-property-colon",
                r#"^(?P<indent>[ \t]*)(?P<key>[A-Za-z_$][\w$]*|'[^'\n]*'|"[^"\n]*")[ \t]+(?P<value>['"`\d\[{-]|true\b|false\b|null\b|undefined\b)"#,
            )?
            .describe("Property name followed by its value without a `:`")
            .guard(expects_colon)
            .fixer(insert_colon),
        )
        .insert(
            "TS1005",
            RuleEntry::new(
                "comma-before-member",
                r#"^(?P<prev>[ \t]*(?:\}|[\w$]+[ \t]*:[ \t]*[^,{}\s](?:.*[^,{}\s])?))[ \t]*\n(?P<member>[ \t]*(?:\.\.\.|(?:[\w$]+|'[^'\n]*'|"[^"\n]*")[ \t]*:).*)$"#,
            )?
            .describe("Object member reported where the member above it lacks its `,`")
            .window(Window::WithPrevious)
            .guard(|ctx| expects_comma(ctx) && starts_member(ctx.current))
            .fixer(separate_members),
        )
        .insert(
            "TS1005",
            RuleEntry::new(
                "missing-property-comma",
                r"^(?P<prop>[ \t]*[\w$]+[ \t]*:[ \t]*[^,{}\s](?:.*[^,{}\s])?)[ \t]*$",
            )?
            .describe("Object property followed by another member without a `,`")
            .guard(member_follows)
            .fixer(|caps| close_member(&caps["prop"])),
        )
        .insert(
            "TS1005",
            RuleEntry::new("missing-member-comma", r"^(?P<brace>[ \t]*\})[ \t]*$")?
                .describe("Nested object or method closed with `}` where `},` was needed")
                .guard(member_follows)
                .fixer(|caps| Some(format!("{},", &caps["brace"]))),
        );

    catalog.insert(
        "TS1003",
        RuleEntry::new(
            "dangling-member-access",
            r"(?P<target>[\w$)\]])[ \t]*(?:\?\.|\.|\[)[ \t]*$",
        )?
        .describe("Member or index access left incomplete at the end of a line")
        .guard(member_access_ends_here)
        .fixer(|caps| Some(caps["target"].to_string())),
    );

    catalog
        .insert(
            "TS1128",
            RuleEntry::new(
                "orphaned-brace-after-return",
                r"^(?P<stmt>[ \t]*return\b[^\n;]*[^\n;{,\s])[ \t]*\n[ \t]*\},?[ \t]*$",
            )?
            .describe("Closing brace left behind after the code following a return was deleted")
            .window(Window::WithPrevious)
            .compile_only()
            .fixer(|caps| Some(format!("{};", &caps["stmt"]))),
        )
        .insert(
            "TS1128",
            RuleEntry::new("orphaned-brace", r"^[ \t]*\},?[ \t]*$")?
                .describe("Closing brace directly after a line that already closed its block")
                .guard(follows_closed_block)
                .fixer(|_| Some(String::new())),
        );

    catalog.insert(
        "TS1109",
        RuleEntry::new(
            "empty-for-initializer",
            r"for[ \t]*\([ \t]*(?P<kw>let|var)[ \t]+(?P<name>[\w$]+)[ \t]*=[ \t]*;",
        )?
        .describe("`for` loop variable initialised with nothing")
        .fixer(|caps| Some(format!("for ({} {} = 0;", &caps["kw"], &caps["name"]))),
    );

    let brace_leading_comma = RuleEntry::new("brace-leading-comma", r"\{[ \t]*,(?P<gap>[ \t]*)")?
        .describe("Object literal or pattern opening with a stray comma")
        .fixer(|caps| match &caps["gap"] {
            "" => Some("{".into()),
            _ => Some("{ ".into()),
        });
    catalog
        .insert("TS1109", brace_leading_comma.clone())
        .insert("TS1136", brace_leading_comma);

    catalog
        .insert(
            "TS1127",
            RuleEntry::new(
                "smart-quotes",
                r#"[\x{2018}\x{2019}](?P<single>[^\x{2018}\x{2019}'\n]*)[\x{2018}\x{2019}]|[\x{201C}\x{201D}](?P<double>[^\x{201C}\x{201D}"\n]*)[\x{201C}\x{201D}]"#,
            )?
            .describe("Curly quotes used as string delimiters")
            .severity(Severity::Warning)
            .fixer(straighten_quotes),
        )
        .insert(
            "TS1002",
            RuleEntry::new(
                "unterminated-string",
                r#"^(?:(?:[^'\n]*'[^'\n]*')*[^'\n]*'[^'\n]*|(?:[^"\n]*"[^"\n]*")*[^"\n]*"[^"\n]*)$"#,
            )?
            .describe("String literal without a closing quote; needs a human")
            .compile_only(),
        );

    catalog
        .insert(
            "no-empty-pattern",
            RuleEntry::new(
                "empty-destructuring",
                r"^(?P<indent>[ \t]*)(?:const|let|var)[ \t]*(?:\{[ \t]*\}|\[[ \t]*\])[ \t]*=[ \t]*(?P<expr>\S.*)$",
            )?
            .describe("Destructuring that binds nothing; keep the expression for its effects")
            .severity(Severity::Warning)
            .fixer(|caps| Some(format!("{}{}", &caps["indent"], &caps["expr"]))),
        )
        .insert(
            "@typescript-eslint/await-thenable",
            RuleEntry::new("await-non-promise", r"\bawait[ \t]+")?
                .describe("`await` on a value that is not a promise")
                .guard(flags_first_await)
                .first_only()
                .compile_only()
                .fixer(|_| Some(String::new())),
        )
        .insert(
            "@typescript-eslint/no-floating-promises",
            RuleEntry::new("void-floating-promise", r"^(?P<indent>[ \t]*)(?P<stmt>\S.*)$")?
                .describe("Promise-valued statement whose result is dropped")
                .guard(|ctx| !ctx.current.contains("void "))
                .fixer(|caps| Some(format!("{}void {}", &caps["indent"], &caps["stmt"]))),
        )
        .insert(
            "@typescript-eslint/no-misused-promises",
            RuleEntry::new(
                "timer-async-callback",
                r"\b(?P<timer>setInterval|setTimeout)\((?P<callback>[\w$.]+),",
            )?
            .describe("Async function handed directly to a timer")
            .compile_only()
            .fixer(|caps| {
                Some(format!(
                    "{}(() => void {}(),",
                    &caps["timer"], &caps["callback"]
                ))
            }),
        );

    Ok(catalog)
}

fn terminate(caps: &Captures<'_>) -> Option<String> {
    let body = caps.name("body")?.as_str().trim_end();
    let last = body.chars().last()?;
    if OPEN_ENDINGS.contains(&last)
        || body.contains("//")
        || body.contains("/*")
        || !brackets_balanced(body)
    {
        return None;
    }
    Some(format!("{body};"))
}

fn insert_colon(caps: &Captures<'_>) -> Option<String> {
    let key = &caps["key"];
    if NON_PROPERTY_WORDS.contains(&key) {
        return None;
    }
    Some(format!("{}{key}: {}", &caps["indent"], &caps["value"]))
}

fn close_member(prop: &str) -> Option<String> {
    if prop.contains("//") || prop.contains("/*") || !brackets_balanced(prop) {
        return None;
    }
    Some(format!("{prop},"))
}

fn separate_members(caps: &Captures<'_>) -> Option<String> {
    let prev = &caps["prev"];
    let closed = match prev.trim_start() {
        "}" => format!("{prev},"),
        _ => close_member(prev)?,
    };
    Some(format!("{closed}\n{}", &caps["member"]))
}

fn straighten_quotes(caps: &Captures<'_>) -> Option<String> {
    if let Some(single) = caps.name("single") {
        return Some(format!("'{}'", single.as_str()));
    }
    caps.name("double")
        .map(|double| format!("\"{}\"", double.as_str()))
}

fn expects_semicolon(ctx: &LineContext<'_>) -> bool {
    let message = ctx.message();
    (message.is_empty() || message.contains("';'")) && !ctx.next.is_some_and(continues_expression)
}

fn expects_colon(ctx: &LineContext<'_>) -> bool {
    ctx.message().contains("':'")
}

fn expects_comma(ctx: &LineContext<'_>) -> bool {
    ctx.message().contains("','")
}

fn member_follows(ctx: &LineContext<'_>) -> bool {
    expects_comma(ctx) && ctx.next.is_some_and(starts_member)
}

fn starts_member(line: &str) -> bool {
    MEMBER_START.is_match(line) && !starts_with_keyword(line.trim_start(), &["case", "default"])
}

/// The diagnostic's column is the first `await` in code, which is the one the fix removes.
fn flags_first_await(ctx: &LineContext<'_>) -> bool {
    let Some(diagnostic) = ctx.diagnostic else {
        return false;
    };
    let offset: usize = ctx
        .current
        .chars()
        .take(diagnostic.column.saturating_sub(1))
        .map(char::len_utf8)
        .sum();
    let literals = LiteralSpans::new(ctx.current);
    AWAIT
        .find_iter(ctx.current)
        .find(|m| !literals.contains(m.start()))
        .is_some_and(|m| m.start() == offset)
}

/// The trailing comma ends a statement rather than continuing an array/object literal, an
/// argument list or a multi-declarator `const`. Ambiguous lines are rejected.
fn terminates_statement(ctx: &LineContext<'_>) -> bool {
    let line = ctx.current.trim_start();
    if !(starts_with_keyword(line, STATEMENT_KEYWORDS) || ASSIGNMENT.is_match(line)) {
        return false;
    }
    if ctx.previous.is_some_and(opens_literal) {
        return false;
    }
    if starts_with_keyword(line, DECLARATION_KEYWORDS) && ctx.next.is_some_and(|n| DECLARATOR.is_match(n))
    {
        return false;
    }
    brackets_balanced(line)
}

fn member_access_ends_here(ctx: &LineContext<'_>) -> bool {
    !ctx.next.is_some_and(|next| {
        next.trim_start()
            .starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$')
    })
}

fn follows_closed_block(ctx: &LineContext<'_>) -> bool {
    ctx.diagnostic.is_some()
        && ctx
            .previous
            .is_some_and(|p| matches!(p.trim(), "}" | "};" | "},"))
}

fn continues_expression(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with("//") || line.starts_with("/*") {
        return false;
    }
    line.starts_with(['.', '?', ':', '+', '-', '*', '/', '%', '&', '|', ')', ']', ',', '=', '>'])
}

fn opens_literal(line: &str) -> bool {
    line.trim_end().ends_with(['[', '{', '(', ','])
}

fn starts_with_keyword(line: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| {
        line.strip_prefix(kw).is_some_and(|rest| {
            !rest
                .starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$')
        })
    })
}

/// Brackets pair up and template literals are closed.
fn brackets_balanced(text: &str) -> bool {
    let mut depth = [0i32; 3];
    let mut backticks = 0;
    for c in text.chars() {
        match c {
            '(' => depth[0] += 1,
            ')' => depth[0] -= 1,
            '[' => depth[1] += 1,
            ']' => depth[1] -= 1,
            '{' => depth[2] += 1,
            '}' => depth[2] -= 1,
            '`' => backticks += 1,
            _ => {}
        }
    }
    depth == [0; 3] && backticks % 2 == 0
}
