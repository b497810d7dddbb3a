/// Formats a coordinate value for G-code output.
///
/// * `decimal_places` — digits after the decimal point.
/// * `strip_trailing_zeros` — remove trailing zeros in the fractional
///   part (and the decimal point itself when nothing remains).
/// * `suppress_leading_zero` — for values with |v| < 1, omit the leading
///   `0` (`0.5` → `.5`, `-0.5` → `-.5`).
pub fn format_coord(
    value: f64,
    decimal_places: u32,
    strip_trailing_zeros: bool,
    suppress_leading_zero: bool,
) -> String {
    let mut s = format!("{:.prec$}", value, prec = decimal_places as usize);

    if strip_trailing_zeros && s.contains('.') {
        s = s.trim_end_matches('0').trim_end_matches('.').to_string();
    }

    if suppress_leading_zero {
        if let Some(rest) = s.strip_prefix("0.") {
            s = format!(".{rest}");
        } else if let Some(rest) = s.strip_prefix("-0.") {
            s = format!("-.{rest}");
        }
    }

    // "-0" after stripping is just "0".
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Context values available for substitution in start/end code templates
/// and tool-change commands.
pub struct TemplateContext {
    pub tool_number: u32,
    pub tool_diameter: f64,
    pub tool_name: String,
    pub spindle_speed: f64,
    pub feed_rate: f64,
    pub work_offset: String,
}

/// Replaces `{variable}` tokens in `template` with values from `ctx`.
///
/// Supported variables: `{tool_number}`, `{tool_diameter}`, `{tool_name}`,
/// `{spindle_speed}`, `{feed_rate}`, `{work_offset}`. Unknown variables
/// and unclosed braces are left as-is.
pub fn render_template(template: &str, ctx: &TemplateContext) -> String {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            result.push(ch);
            continue;
        }
        let mut token = String::new();
        let mut closed = false;
        for inner in chars.by_ref() {
            if inner == '}' {
                closed = true;
                break;
            }
            token.push(inner);
        }
        if !closed {
            result.push('{');
            result.push_str(&token);
            continue;
        }
        match token.as_str() {
            "tool_number" => result.push_str(&ctx.tool_number.to_string()),
            "tool_diameter" => result.push_str(&ctx.tool_diameter.to_string()),
            "tool_name" => result.push_str(&ctx.tool_name),
            "spindle_speed" => result.push_str(&ctx.spindle_speed.to_string()),
            "feed_rate" => result.push_str(&ctx.feed_rate.to_string()),
            "work_offset" => result.push_str(&ctx.work_offset),
            _ => {
                result.push('{');
                result.push_str(&token);
                result.push('}');
            }
        }
    }
    result
}
