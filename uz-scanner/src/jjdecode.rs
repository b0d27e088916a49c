//! Decoder for jjencode-obfuscated script fragments.
//!
//! The booking site hides its `gv-token` inside a script encoded with
//! jjencode: a bootstrap expression builds an object whose sixteen keys
//! evaluate to the characters `0-9a-f`, then a payload of `+`-joined
//! fragments (quoted punctuation runs, key accessors, coercion
//! expressions for `l`/`o`/`t`/`u`, octal and `\uXXXX` escapes for
//! everything else) is concatenated into a string and handed to the
//! `Function` constructor. Decoding therefore happens in two phases,
//! matching the two evaluations the browser performs:
//!
//! 1. resolve each payload fragment to its characters and concatenate;
//! 2. unescape the result as a JavaScript string literal.
//!
//! The alphabet and grouping are fixed by the scheme; any deviation
//! produces garbage rather than an error, so this module is pinned by
//! golden input/output pairs and an encode/decode round-trip property.

/// Error from [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JjDecodeError {
    /// The `gv=~[];` bootstrap prologue was not found.
    #[error("missing jjencode bootstrap")]
    MissingBootstrap,

    /// The `gv.$(gv.$(gv.$$+"\""+...+"\"")())();` payload wrapper was
    /// not found.
    #[error("missing jjencode payload")]
    MissingPayload,

    /// The payload contained unbalanced quotes or brackets.
    #[error("unbalanced jjencode payload")]
    UnbalancedPayload,

    /// A payload fragment did not match any known jjencode form.
    #[error("unknown jjencode fragment: {0}")]
    UnknownFragment(String),

    /// A string escape in the reconstructed source was malformed.
    #[error("malformed escape sequence near: {0}")]
    BadEscape(String),
}

/// The sixteen hash keys, in order; key `i` evaluates to the hex digit
/// `i` in the encoded script.
const DIGIT_KEYS: [&str; 16] = [
    "___", "__$", "_$_", "_$$", "$__", "$_$", "$$_", "$$$", "$___", "$__$", "$_$_", "$_$$",
    "$$__", "$$_$", "$$$_", "$$$$",
];

/// Decode a jjencoded fragment back to the original script source.
pub fn decode(encoded: &str) -> Result<String, JjDecodeError> {
    let text = encoded.trim();
    let gv = parse_global(text)?;
    let payload = locate_payload(text, gv)?;
    if payload.is_empty() {
        return Ok(String::new());
    }

    let mut content = String::new();
    for fragment in split_fragments(payload)? {
        append_fragment(&mut content, fragment, gv)?;
    }

    unescape_js(&content)
}

/// Extract the global variable name from the `gv=~[];` prologue.
fn parse_global(text: &str) -> Result<&str, JjDecodeError> {
    let idx = text.find("=~[];").ok_or(JjDecodeError::MissingBootstrap)?;
    let gv = &text[..idx];
    let valid = !gv.is_empty()
        && gv
            .chars()
            .all(|c| c == '$' || c == '_' || c.is_ascii_alphanumeric());
    if !valid {
        return Err(JjDecodeError::MissingBootstrap);
    }
    // The prologue is immediately followed by the key-table assignment.
    if !text[idx + 5..].starts_with(&format!("{gv}={{")) {
        return Err(JjDecodeError::MissingBootstrap);
    }
    Ok(gv)
}

/// Slice out the `+`-joined payload between the Function-constructor
/// wrapper markers.
fn locate_payload<'a>(text: &'a str, gv: &str) -> Result<&'a str, JjDecodeError> {
    let open = format!("{gv}.$({gv}.$({gv}.$$+\"\\\"\"+");
    let close = "+\"\\\"\")())();";

    let start = text.find(&open).ok_or(JjDecodeError::MissingPayload)? + open.len();
    if !text.ends_with(close) {
        return Err(JjDecodeError::MissingPayload);
    }
    let end = text.len() - close.len();
    if start > end {
        return Err(JjDecodeError::MissingPayload);
    }
    Ok(&text[start..end])
}

/// Split the payload on top-level `+`, respecting quoted runs and
/// bracketed coercion expressions.
fn split_fragments(payload: &str) -> Result<Vec<&str>, JjDecodeError> {
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in payload.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(JjDecodeError::UnbalancedPayload)?;
            }
            '+' if depth == 0 => {
                fragments.push(&payload[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_string || depth != 0 {
        return Err(JjDecodeError::UnbalancedPayload);
    }
    fragments.push(&payload[start..]);
    Ok(fragments)
}

/// Resolve one payload fragment and append its characters to `out`.
fn append_fragment(out: &mut String, fragment: &str, gv: &str) -> Result<(), JjDecodeError> {
    // Quoted literal run: unescape one level (`\"` and `\\`).
    if let Some(inner) = fragment
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(next) => out.push(next),
                    None => return Err(JjDecodeError::BadEscape(inner.to_string())),
                }
            } else {
                out.push(c);
            }
        }
        return Ok(());
    }

    // `(![]+"")[gv._$_]` ("false"[2]) is the only letter the scheme
    // cannot reach through the hash.
    if fragment == format!("(![]+\"\")[{gv}._$_]") {
        out.push('l');
        return Ok(());
    }

    // Hash accessors: the sixteen digit keys plus `o`/`t`/`u`.
    if let Some(key) = fragment
        .strip_prefix(gv)
        .and_then(|rest| rest.strip_prefix('.'))
    {
        let resolved = match key {
            "_$" => Some('o'),
            "__" => Some('t'),
            "_" => Some('u'),
            key => DIGIT_KEYS
                .iter()
                .position(|&k| k == key)
                .map(|i| char::from_digit(i as u32, 16).expect("index below 16")),
        };
        if let Some(c) = resolved {
            out.push(c);
            return Ok(());
        }
    }

    Err(JjDecodeError::UnknownFragment(fragment.to_string()))
}

/// Unescape the reconstructed source as a JavaScript string literal:
/// octal escapes, `\uXXXX`, and identity escapes like `\"` and `\\`.
fn unescape_js(content: &str) -> Result<String, JjDecodeError> {
    let mut out = String::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => return Err(JjDecodeError::BadEscape("\\".to_string())),
            Some('u') => {
                let mut value = 0u32;
                for _ in 0..4 {
                    let digit = chars
                        .next()
                        .and_then(|h| h.to_digit(16))
                        .ok_or_else(|| JjDecodeError::BadEscape("\\u".to_string()))?;
                    value = value * 16 + digit;
                }
                let c = char::from_u32(value)
                    .ok_or_else(|| JjDecodeError::BadEscape(format!("\\u{value:04x}")))?;
                out.push(c);
            }
            Some(d) if d.is_digit(8) => {
                // Octal escapes are at most three digits and stay below 256.
                let mut value = d.to_digit(8).expect("octal digit");
                for _ in 0..2 {
                    let Some(digit) = chars.peek().and_then(|next| next.to_digit(8)) else {
                        break;
                    };
                    if value * 8 + digit > 0xFF {
                        break;
                    }
                    value = value * 8 + digit;
                    chars.next();
                }
                let c = char::from_u32(value)
                    .ok_or_else(|| JjDecodeError::BadEscape(format!("\\{value:o}")))?;
                out.push(c);
            }
            // JavaScript treats unrecognised escapes as the character
            // itself, which also covers `\"` and `\\`.
            Some(other) => out.push(other),
        }
    }
    Ok(out)
}

/// Reference encoder used to pin the decoder in tests. Mirrors the
/// jjencode scheme: punctuation passes through in quoted runs, hex
/// digits and `l`/`o`/`t`/`u` become hash accessors, everything else
/// becomes an octal or `\uXXXX` escape.
#[cfg(test)]
pub(crate) mod test_support {
    use super::DIGIT_KEYS;

    pub fn jjencode(gv: &str, text: &str) -> String {
        let mut fragments: Vec<String> = Vec::new();
        let mut run = String::new();

        let flush = |fragments: &mut Vec<String>, run: &mut String| {
            if !run.is_empty() {
                fragments.push(format!("\"{run}\""));
                run.clear();
            }
        };

        for c in text.chars() {
            let n = c as u32;
            match n {
                0x22 | 0x5c => {
                    run.push_str("\\\\\\");
                    run.push(c);
                }
                0x21..=0x2f | 0x3a..=0x40 | 0x5b..=0x60 | 0x7b..=0x7f => run.push(c),
                0x30..=0x39 | 0x61..=0x66 => {
                    flush(&mut fragments, &mut run);
                    let idx = if n < 0x40 { n - 0x30 } else { n - 0x57 };
                    fragments.push(format!("{gv}.{}", DIGIT_KEYS[idx as usize]));
                }
                0x6c => {
                    flush(&mut fragments, &mut run);
                    fragments.push(format!("(![]+\"\")[{gv}._$_]"));
                }
                0x6f => {
                    flush(&mut fragments, &mut run);
                    fragments.push(format!("{gv}._$"));
                }
                0x74 => {
                    flush(&mut fragments, &mut run);
                    fragments.push(format!("{gv}.__"));
                }
                0x75 => {
                    flush(&mut fragments, &mut run);
                    fragments.push(format!("{gv}._"));
                }
                _ if n < 128 => {
                    // Zero-padded to three digits so a following digit
                    // character cannot extend the escape.
                    run.push_str("\\\\");
                    flush(&mut fragments, &mut run);
                    for d in format!("{n:03o}").chars() {
                        let idx = d.to_digit(8).expect("octal digit");
                        fragments.push(format!("{gv}.{}", DIGIT_KEYS[idx as usize]));
                    }
                }
                _ => {
                    run.push_str("\\\\");
                    flush(&mut fragments, &mut run);
                    fragments.push(format!("{gv}._"));
                    for d in format!("{n:04x}").chars() {
                        let idx = d.to_digit(16).expect("hex digit");
                        fragments.push(format!("{gv}.{}", DIGIT_KEYS[idx as usize]));
                    }
                }
            }
        }
        flush(&mut fragments, &mut run);

        format!(
            "{}{}.$({}.$({}.$$+\"\\\"\"+{}+\"\\\"\")())();",
            bootstrap(gv),
            gv,
            gv,
            gv,
            fragments.join("+")
        )
    }

    /// The fixed jjencode bootstrap, with the global substituted.
    fn bootstrap(gv: &str) -> String {
        let template = concat!(
            "@=~[];@={___:++@,$$$$:(![]+\"\")[@],__$:++@,$_$_:(![]+\"\")[@],",
            "_$_:++@,$_$$:({}+\"\")[@],$$_$:(@[@]+\"\")[@],_$$:++@,",
            "$$$_:(!\"\"+\"\")[@],$__:++@,$_$:++@,$$__:({}+\"\")[@],$$_:++@,",
            "$$$:++@,$___:++@,$__$:++@};",
            "@.$_=(@.$_=@+\"\")[@.$_$]+(@._$=@.$_[@.__$])+(@.$$=(@.$+\"\")[@.__$])+",
            "((!@)+\"\")[@._$$]+(@.__=@.$_[@.$$_])+(@.$=(!\"\"+\"\")[@.__$])+",
            "(@._=(!\"\"+\"\")[@._$_])+@.$_[@.$_$]+@.__+@._$+@.$;",
            "@.$$=@.$+(!\"\"+\"\")[@._$$]+@.__+@._+@.$+@.$$;",
            "@.$=(@.___)[@.$_][@.$_];",
        );
        template.replace('@', gv)
    }
}
