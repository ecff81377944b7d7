//! Arithmetic, comparison, logic, text and type primitives.

use super::*;
use crate::list::List;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};

pub(super) const PRIMS: &[(Selector, Prim)] = &[
    (Selector::ReportSum, |_, _, args| binary(&args, |x, y| x + y)),
    (Selector::ReportDifference, |_, _, args| binary(&args, |x, y| x - y)),
    (Selector::ReportProduct, |_, _, args| binary(&args, |x, y| x * y)),
    (Selector::ReportQuotient, |_, _, args| binary(&args, |x, y| x / y)),
    (Selector::ReportModulus, |_, _, args| binary(&args, |x, y| ((x % y) + y) % y)),
    (Selector::ReportRound, report_round),
    (Selector::ReportMonadic, report_monadic),
    (Selector::ReportRandom, report_random),
    (Selector::ReportLessThan, |_, _, args| compare(&args, std::cmp::Ordering::Less)),
    (Selector::ReportGreaterThan, |_, _, args| compare(&args, std::cmp::Ordering::Greater)),
    (Selector::ReportEquals, |_, _, args| {
        Ok(Outcome::Report(snap_equals(&arg(&args, 0), &arg(&args, 1)).into()))
    }),
    (Selector::ReportIsIdentical, |_, _, args| {
        Ok(Outcome::Report(is_identical(&arg(&args, 0), &arg(&args, 1)).into()))
    }),
    (Selector::ReportNot, |_, _, args| Ok(Outcome::Report((!arg(&args, 0).to_bool()).into()))),
    (Selector::ReportTrue, |_, _, _| Ok(Outcome::Report(true.into()))),
    (Selector::ReportFalse, |_, _, _| Ok(Outcome::Report(false.into()))),
    (Selector::ReportJoinWords, report_join_words),
    (Selector::ReportLetter, report_letter),
    (Selector::ReportStringSize, report_string_size),
    (Selector::ReportUnicode, report_unicode),
    (Selector::ReportUnicodeAsLetter, report_unicode_as_letter),
    (Selector::ReportTextSplit, report_text_split),
    (Selector::ReportTextFunction, report_text_function),
    (Selector::ReportIsA, |_, _, args| {
        Ok(Outcome::Report((arg(&args, 0).type_of() == &*arg(&args, 1).to_string()).into()))
    }),
    (Selector::ReportTypeOf, |_, _, args| Ok(Outcome::Report(Value::text(arg(&args, 0).type_of())))),
];

/* ---------------------------------- Math ---------------------------------- */

fn binary(args: &[Value], op: impl Fn(f64, f64) -> f64) -> Result<Outcome> {
    let (x, y) = (arg(args, 0).to_number(), arg(args, 1).to_number());
    Ok(Outcome::Report(Value::Number(op(x, y))))
}

/// halves round up, as in `floor(x + 0.5)`
fn report_round(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    Ok(Outcome::Report(Value::Number((arg(&args, 0).to_number() + 0.5).floor())))
}

/// Trigonometry works in degrees. Unknown functions give 0.
fn report_monadic(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let x = arg(&args, 1).to_number();
    let result = match &*arg(&args, 0).to_string() {
        | "abs" => x.abs(),
        | "floor" => x.floor(),
        | "sqrt" => x.sqrt(),
        | "sin" => x.to_radians().sin(),
        | "cos" => x.to_radians().cos(),
        | "tan" => x.to_radians().tan(),
        | "asin" => x.asin().to_degrees(),
        | "acos" => x.acos().to_degrees(),
        | "atan" => x.atan().to_degrees(),
        | "ln" => x.ln(),
        | "log" => x.log10(),
        | "e^" => x.exp(),
        | "10^" => 10f64.powf(x),
        | _ => 0.0,
    };
    Ok(Outcome::Report(Value::Number(result)))
}

/// An integer between both ends when both are integers, else any number in
/// between.
fn report_random(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let (floor, ceil) = (arg(&args, 0).to_number(), arg(&args, 1).to_number());
    if floor.is_nan() || ceil.is_nan() {
        return Ok(Outcome::Report(Value::Number(f64::NAN)));
    }
    let mut rng = rand::rng();
    let n = if floor.fract() != 0.0 || ceil.fract() != 0.0 {
        rng.random::<f64>() * (ceil - floor) + floor
    } else {
        (rng.random::<f64>() * (ceil - floor + 1.0)).floor() + floor
    };
    Ok(Outcome::Report(Value::Number(n)))
}

/// Numeric when both sides read as numbers, else by lowercased text.
fn compare(args: &[Value], wanted: std::cmp::Ordering) -> Result<Outcome> {
    let (a, b) = (arg(args, 0), arg(args, 1));
    let (x, y) = (a.to_number(), b.to_number());
    let order = if x.is_nan() || y.is_nan() {
        Some(a.to_string().to_lowercase().cmp(&b.to_string().to_lowercase()))
    } else {
        x.partial_cmp(&y)
    };
    Ok(Outcome::Report((order == Some(wanted)).into()))
}

/* ---------------------------------- Text ---------------------------------- */

fn report_join_words(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let text = match arg(&args, 0) {
        | Value::List(list) => list.borrow().as_text(),
        | other => other.to_string(),
    };
    Ok(Outcome::Report(Value::text(text)))
}

fn report_letter(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let idx = arg(&args, 0).to_number();
    let text = arg(&args, 1).to_string();
    let letter = match idx >= 1.0 {
        | true => text.chars().nth(idx as usize - 1).map(String::from).unwrap_or_default(),
        | false => String::new(),
    };
    Ok(Outcome::Report(Value::text(letter)))
}

/// the letter count; a list gives its length instead
fn report_string_size(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let size = match arg(&args, 0) {
        | Value::List(list) => list.borrow().length(),
        | other => other.to_string().chars().count(),
    };
    Ok(Outcome::Report(Value::Number(size as f64)))
}

fn report_unicode(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let code = arg(&args, 0).to_string().chars().next().map_or(0, u32::from);
    Ok(Outcome::Report(Value::Number(f64::from(code))))
}

fn report_unicode_as_letter(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let code = arg(&args, 0).to_number();
    let letter = match code >= 0.0 {
        | true => char::from_u32(code as u32).map(String::from).unwrap_or_default(),
        | false => String::new(),
    };
    Ok(Outcome::Report(Value::text(letter)))
}

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\t\r\n ]+").expect("whitespace pattern"));

/// Splits by a named delimiter, or by the delimiter text itself. The empty
/// delimiter splits into letters.
fn report_text_split(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let (text, delimiter) = (arg(&args, 0), arg(&args, 1));
    for input in [&text, &delimiter] {
        if !matches!(input.type_of(), "text" | "number") {
            Err(EvalError::NotAText(input.describe()))?
        }
    }
    let text = text.to_string();
    let parts: Vec<String> = match &*delimiter.to_string() {
        | "line" => text.split('\n').map(String::from).collect(),
        | "tab" => text.split('\t').map(String::from).collect(),
        | "cr" => text.split('\r').map(String::from).collect(),
        | "whitespace" => WHITESPACE.split(text.trim()).map(String::from).collect(),
        | "letter" | "" => text.chars().map(String::from).collect(),
        | delimiter => text.split(delimiter).map(String::from).collect(),
    };
    let items = parts.into_iter().map(Value::text).collect();
    Ok(Outcome::Report(List::new(items).into()))
}

fn report_text_function(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let text = arg(&args, 1).to_string();
    let result = match &*arg(&args, 0).to_string() {
        | "encode URI" => encode_uri(&text, URI_KEEP),
        | "decode URI" => decode_uri(&text, URI_RESERVED)?,
        | "encode URI component" => encode_uri(&text, ""),
        | "decode URI component" => decode_uri(&text, "")?,
        | "XML escape" => xml_escape(&text),
        | "XML unescape" => xml_unescape(&text),
        | _ => String::new(),
    };
    Ok(Outcome::Report(Value::text(result)))
}

/* ----------------------------------- URI ---------------------------------- */

/// punctuation that is never escaped
const URI_MARKS: &str = "-_.!~*'()";
/// reserved characters that survive `encode URI`
const URI_KEEP: &str = ";,/?:@&=+$#";
/// escapes that `decode URI` leaves alone
const URI_RESERVED: &str = ";,/?:@&=+$#";

/// Percent-encodes the UTF-8 bytes of every character outside the
/// unreserved set and `keep`.
fn encode_uri(text: &str, keep: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || URI_MARKS.contains(c) || keep.contains(c) {
            out.push(c);
            continue;
        }
        let mut buf = [0; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Decodes percent escapes, except those standing for a character in
/// `preserve`. A broken escape or invalid UTF-8 is an error.
fn decode_uri(text: &str, preserve: &str) -> Result<String> {
    let malformed = || EvalError::MalformedUri(text.to_owned());
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let hex = text.get(i + 1..i + 3).ok_or_else(malformed)?;
        let byte = u8::from_str_radix(hex, 16).map_err(|_| malformed())?;
        if byte.is_ascii() && preserve.contains(char::from(byte)) {
            out.extend_from_slice(&bytes[i..i + 3]);
        } else {
            out.push(byte);
        }
        i += 3;
    }
    String::from_utf8(out).map_err(|_| malformed())
}

/* ----------------------------------- XML ---------------------------------- */

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            | '\'' => out.push_str("&apos;"),
            | '"' => out.push_str("&quot;"),
            | '<' => out.push_str("&lt;"),
            | '>' => out.push_str("&gt;"),
            | '&' => out.push_str("&amp;"),
            | '\n' => out.push_str("&#xD;"),
            | c => out.push(c),
        }
    }
    out
}

static XML_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(apos|quot|lt|gt|amp|#xD);").expect("entity pattern"));

fn xml_unescape(text: &str) -> String {
    let replaced = XML_ENTITY.replace_all(text, |caps: &Captures| {
        match &caps[1] {
            | "apos" => "'",
            | "quot" => "\"",
            | "lt" => "<",
            | "gt" => ">",
            | "amp" => "&",
            | _ => "\n",
        }
        .to_owned()
    });
    replaced.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uri_round_trip_keeps_reserved_characters() {
        let encoded = encode_uri("a b/ü?", URI_KEEP);
        assert_eq!(encoded, "a%20b/%C3%BC?");
        assert_eq!(encode_uri("a/b", ""), "a%2Fb");
        assert_eq!(decode_uri("a%2Fb%20c", URI_RESERVED).unwrap(), "a%2Fb c");
        assert_eq!(decode_uri("%C3%BC", "").unwrap(), "ü");
        assert!(decode_uri("%E0%A4%A", "").is_err());
    }

    #[test]
    fn xml_entities() {
        let escaped = xml_escape("<a href='x'>\n&");
        assert_eq!(escaped, "&lt;a href=&apos;x&apos;&gt;&#xD;&amp;");
        assert_eq!(xml_unescape(&escaped), "<a href='x'>\n&");
        assert_eq!(xml_unescape("&nbsp;"), "&nbsp;");
    }

    fn report(outcome: Result<Outcome>) -> String {
        match outcome.unwrap() {
            | Outcome::Report(value) => value.to_string(),
            | other => panic!("expected a value, got {:?}", other),
        }
    }

    #[test]
    fn comparisons_fall_back_to_text() {
        let args = |a: &str, b: &str| vec![Value::text(a), Value::text(b)];
        assert_eq!(report(compare(&args("10", "9"), std::cmp::Ordering::Greater)), "true");
        assert_eq!(report(compare(&args("apple", "Banana"), std::cmp::Ordering::Less)), "true");
    }

    #[test]
    fn modulus_takes_the_sign_of_the_divisor() {
        let args = vec![Value::Number(-7.0), Value::Number(3.0)];
        assert_eq!(report(binary(&args, |x, y| ((x % y) + y) % y)), "2");
    }
}
