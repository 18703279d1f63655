use super::literal::{find_unquoted, parse_value};
use crate::domain::{BlockKind, GlmError, GlmResult, ParamValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NmlTokenLine {
    pub source_line: usize,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub name: String,
    pub value: ParamValue,
    pub source_line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub kind: BlockKind,
    pub source_line: usize,
    pub entries: Vec<ParsedEntry>,
}

struct PendingEntry {
    name: String,
    raw: String,
    source_line: usize,
}

impl PendingEntry {
    fn finish(self) -> GlmResult<ParsedEntry> {
        let raw = self.raw.trim().trim_end_matches(',');
        Ok(ParsedEntry {
            value: parse_value(raw, self.source_line)?,
            name: self.name,
            source_line: self.source_line,
        })
    }
}

pub fn tokenize_namelist(source: &str) -> Vec<NmlTokenLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| tokenize_line(index + 1, line))
        .collect()
}

/// Splits namelist text into blocks of raw entries. Parameter names are not
/// checked against any schema here.
pub fn parse_namelist(source: &str) -> GlmResult<Vec<ParsedBlock>> {
    let mut blocks = Vec::new();
    let mut current: Option<ParsedBlock> = None;
    let mut pending: Option<PendingEntry> = None;

    for token_line in tokenize_namelist(source) {
        let line = token_line.source_line;
        let mut body = token_line.raw.as_str();

        let Some(block) = current.as_mut() else {
            let (kind, rest) = parse_header(line, body)?;
            current = Some(ParsedBlock {
                kind,
                source_line: line,
                entries: Vec::new(),
            });
            if rest.is_empty() {
                continue;
            }
            // A body can follow the header on the same line.
            body = rest;
            let Some(block) = current.as_mut() else {
                continue;
            };
            if consume_body(block, &mut pending, line, body)? {
                blocks.extend(current.take());
            }
            continue;
        };

        if consume_body(block, &mut pending, line, body)? {
            blocks.extend(current.take());
        }
    }

    if let Some(block) = current {
        return Err(GlmError::parse(
            block.source_line,
            format!("block '{}' is not terminated with '/'", block.kind.header()),
        ));
    }

    Ok(blocks)
}

/// Feeds one line of block body. Returns `true` once the block terminator
/// has been consumed.
fn consume_body(
    block: &mut ParsedBlock,
    pending: &mut Option<PendingEntry>,
    line: usize,
    body: &str,
) -> GlmResult<bool> {
    let (content, closes) = split_terminator(body);

    for segment in split_assignments(content) {
        consume_segment(block, pending, line, segment)?;
    }

    if closes {
        if let Some(entry) = pending.take() {
            block.entries.push(entry.finish()?);
        }
    }
    Ok(closes)
}

fn consume_segment(
    block: &mut ParsedBlock,
    pending: &mut Option<PendingEntry>,
    line: usize,
    content: &str,
) -> GlmResult<()> {
    match find_unquoted(content, '=') {
        Some(index) => {
            if let Some(entry) = pending.take() {
                block.entries.push(entry.finish()?);
            }
            let name = content[..index].trim();
            if !is_valid_name(name) {
                return Err(GlmError::parse(
                    line,
                    format!("invalid parameter name '{}'", name),
                ));
            }
            *pending = Some(PendingEntry {
                name: name.to_string(),
                raw: content[index + 1..].trim().to_string(),
                source_line: line,
            });
        }
        None => {
            let Some(entry) = pending.as_mut() else {
                return Err(GlmError::parse(
                    line,
                    format!("expected 'name = value', found '{}'", content),
                ));
            };
            if !entry.raw.trim_end().ends_with(',') && !entry.raw.trim().is_empty() {
                entry.raw.push(',');
            }
            entry.raw.push(' ');
            entry.raw.push_str(content);
        }
    }
    Ok(())
}

/// Cuts a line such as `a = 1, b = 2` before each parameter name that is
/// followed by an unquoted `=`. The first piece may be a bare continuation.
fn split_assignments(content: &str) -> Vec<&str> {
    let mut starts = vec![0];
    let mut quote: Option<char> = None;
    for (index, ch) in content.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == '=' => {
                if let Some(start) = assignment_name_start(&content[..index])
                    && starts.last().is_some_and(|last| start > *last)
                {
                    starts.push(start);
                }
            }
            None => {}
        }
    }

    let mut segments = Vec::with_capacity(starts.len());
    for (position, start) in starts.iter().enumerate() {
        let end = starts.get(position + 1).copied().unwrap_or(content.len());
        let segment = content[*start..end].trim();
        if !segment.is_empty() {
            segments.push(segment);
        }
    }
    segments
}

/// Byte offset where the name in front of an `=` begins, provided the name
/// is separated from any earlier value by a comma or whitespace.
fn assignment_name_start(prefix: &str) -> Option<usize> {
    let trimmed = prefix.trim_end();
    let name_len = trimmed
        .bytes()
        .rev()
        .take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
        .count();
    if name_len == 0 {
        return None;
    }

    let start = trimmed.len() - name_len;
    let before = &trimmed[..start];
    (before.trim().is_empty() || before.ends_with(char::is_whitespace) || before.ends_with(','))
        .then_some(start)
}

fn parse_header(line: usize, body: &str) -> GlmResult<(BlockKind, &str)> {
    let Some(header) = body.strip_prefix('&') else {
        return Err(GlmError::parse(
            line,
            format!("expected a block header starting with '&', found '{}'", body),
        ));
    };

    let (name, rest) = header
        .split_once(char::is_whitespace)
        .map_or((header, ""), |(name, rest)| (name, rest.trim()));
    let kind = BlockKind::from_name(name)
        .ok_or_else(|| GlmError::parse(line, format!("unknown block '&{}'", name)))?;
    Ok((kind, rest))
}

/// Separates a trailing `/` (or legacy `&end`) terminator from the content
/// that precedes it on the same line.
fn split_terminator(body: &str) -> (&str, bool) {
    if body.eq_ignore_ascii_case("&end") {
        return ("", true);
    }
    match find_unquoted(body, '/') {
        Some(index) if body[index + 1..].trim().is_empty() => (body[..index].trim(), true),
        _ => (body, false),
    }
}

fn tokenize_line(source_line: usize, line: &str) -> Option<NmlTokenLine> {
    let normalized = strip_inline_comment(line).trim();
    if normalized.is_empty() {
        return None;
    }

    Some(NmlTokenLine {
        source_line,
        raw: normalized.to_owned(),
    })
}

fn strip_inline_comment(line: &str) -> &str {
    match find_unquoted(line, '!') {
        Some(index) => &line[..index],
        None => line,
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
        _ => return false,
    }

    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::{parse_namelist, tokenize_namelist};
    use crate::domain::{BlockKind, GlmErrorKind, ParamValue};

    #[test]
    fn tokenizer_drops_comments_and_blank_lines() {
        let lines = tokenize_namelist("! header\n\n&time   ! section\n   dt = 3600.0\n/\n");

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].source_line, 3);
        assert_eq!(lines[0].raw, "&time");
        assert_eq!(lines[1].raw, "dt = 3600.0");
    }

    #[test]
    fn parser_collects_entries_per_block() {
        let blocks = parse_namelist(
            "&glm_setup\n   sim_name = 'Lake'\n   max_layers = 500\n/\n&time\n   timefmt = 2\n/\n",
        )
        .expect("valid namelist should parse");

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::GlmSetup);
        assert_eq!(blocks[0].entries[0].name, "sim_name");
        assert_eq!(blocks[0].entries[0].value, ParamValue::Str("Lake".into()));
        assert_eq!(blocks[0].entries[1].source_line, 3);
        assert_eq!(blocks[1].kind, BlockKind::Time);
    }

    #[test]
    fn continuation_lines_extend_the_previous_value() {
        let blocks = parse_namelist(
            "&morphometry\n   H = -5.0, -4.0,\n       -3.0\n   A = 1.0, 2.0, 3.0 /\n",
        )
        .expect("continuations should parse");

        let entries = &blocks[0].entries;
        assert_eq!(entries[0].value, ParamValue::RealList(vec![-5.0, -4.0, -3.0]));
        assert_eq!(entries[1].value, ParamValue::RealList(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn slashes_inside_strings_do_not_close_blocks() {
        let blocks = parse_namelist("&output\n   out_dir = 'runs/output/'\n/\n")
            .expect("quoted slashes should parse");

        assert_eq!(
            blocks[0].entries[0].value,
            ParamValue::Str("runs/output/".into())
        );
    }

    #[test]
    fn several_assignments_may_share_a_line() {
        let blocks = parse_namelist(
            "&time\n   timefmt = 2, dt = 3600.0\n   start = '1997-01-01 00:00:00' stop = 'a, b = c' /\n",
        )
        .expect("shared lines should parse");

        let entries = &blocks[0].entries;
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["timefmt", "dt", "start", "stop"]);
        assert_eq!(entries[0].value, ParamValue::Int(2));
        assert_eq!(entries[1].value, ParamValue::Real(3600.0));
        assert_eq!(entries[1].source_line, 2);
        assert_eq!(entries[3].value, ParamValue::Str("a, b = c".into()));
    }

    #[test]
    fn shared_line_lists_keep_all_items() {
        let blocks = parse_namelist("&morphometry\n   H = 1.0, 2.0, A = 3.0, 4.0\n/\n")
            .expect("lists on a shared line should parse");

        let entries = &blocks[0].entries;
        assert_eq!(entries[0].name, "H");
        assert_eq!(entries[0].value, ParamValue::RealList(vec![1.0, 2.0]));
        assert_eq!(entries[1].name, "A");
        assert_eq!(entries[1].value, ParamValue::RealList(vec![3.0, 4.0]));
    }

    #[test]
    fn unterminated_block_reports_header_line() {
        let error = parse_namelist("\n&time\n   dt = 1.0\n").expect_err("missing '/' should fail");

        assert_eq!(error.kind(), GlmErrorKind::Parse);
        assert!(error.message().starts_with("line 2:"));
        assert!(error.message().contains("&time"));
    }

    #[test]
    fn unknown_headers_and_stray_values_are_rejected() {
        let error = parse_namelist("&weather\n/\n").expect_err("unknown block should fail");
        assert!(error.message().contains("unknown block '&weather'"));

        let error = parse_namelist("&time\n   3600.0\n/\n").expect_err("value without name");
        assert!(error.message().starts_with("line 2:"));

        let error = parse_namelist("dt = 1.0\n").expect_err("assignment outside block");
        assert_eq!(error.kind(), GlmErrorKind::Parse);
    }
}
