// ABOUTME: Line-level Markdown syntax helpers for the slide-bridge application
// ABOUTME: Recognizes separators, slide headings, code fences and pipe table rows

/// A fenced code block opener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    pub marker: char,
    pub len: usize,
    pub info: String,
}

impl Fence {
    /// Whether `line` closes this fence
    pub fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|&c| c == self.marker).count();
        run >= self.len && trimmed[run * self.marker.len_utf8()..].trim().is_empty()
    }
}

/// Parse a fence opener (``` or ~~~, at most three spaces of indent)
pub fn fence_open(line: &str) -> Option<Fence> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let trimmed = line.trim();
    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|&c| c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    // Backtick fences may not carry backticks in their info string
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(Fence {
        marker,
        len,
        info: info.to_string(),
    })
}

/// Whether a line is an explicit slide separator: a thematic break or an `<hr>` tag
pub fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    if is_html_rule(trimmed) {
        return true;
    }
    let mut chars = trimmed.chars().filter(|c| !c.is_whitespace());
    let first = match chars.next() {
        Some(c @ ('-' | '*' | '_')) => c,
        _ => return false,
    };
    let mut count = 1;
    for c in chars {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

fn is_html_rule(trimmed: &str) -> bool {
    let lower = trimmed.to_ascii_lowercase();
    if !lower.starts_with("<hr") || !lower.ends_with('>') {
        return false;
    }
    matches!(lower[3..].chars().next(), Some(' ' | '/' | '>'))
}

/// Level of a slide-starting heading (`#` or `##`), if the line is one
pub fn slide_heading(line: &str) -> Option<(u8, &str)> {
    let (level, rest) = heading(line)?;
    (level <= 2).then_some((level, rest))
}

/// Any ATX heading at the start of a line, with its text
pub fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    match rest.chars().next() {
        None => Some((hashes as u8, "")),
        Some(c) if c.is_whitespace() => Some((hashes as u8, rest.trim())),
        _ => None,
    }
}

/// Split a pipe-delimited row into trimmed cells. Escaped pipes (`\|`) stay in the cell.
pub fn table_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if unescaped_pipes(trimmed) < 2 {
        return None;
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);

    // Leading and trailing pipes delimit the row rather than empty cells
    if trimmed.starts_with('|') {
        cells.remove(0);
    }
    if trimmed.ends_with('|') && !trimmed.ends_with("\\|") {
        cells.pop();
    }

    Some(cells.into_iter().map(|c| c.trim().to_string()).collect())
}

/// Table row with at least three cells, as used by both the classifier and the builder
pub fn wide_table_row(line: &str) -> Option<Vec<String>> {
    table_cells(line).filter(|cells| cells.len() >= 3)
}

/// Whether the cells form a pipe-table alignment row such as `|---|:--:|`
pub fn is_alignment_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let inner = cell.trim_matches(':');
            !inner.is_empty() && inner.chars().all(|c| c == '-')
        })
}

fn unescaped_pipes(line: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '|' => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        assert!(is_separator("---"));
        assert!(is_separator("  * * *  "));
        assert!(is_separator("_____"));
        assert!(is_separator("<hr>"));
        assert!(is_separator("<HR />"));
        assert!(is_separator("<hr class=\"x\">"));
        assert!(!is_separator("--"));
        assert!(!is_separator("-- -x"));
        assert!(!is_separator("<html>"));
        assert!(!is_separator("- item"));
    }

    #[test]
    fn test_headings() {
        assert_eq!(slide_heading("# Title"), Some((1, "Title")));
        assert_eq!(slide_heading("## Point "), Some((2, "Point")));
        assert_eq!(slide_heading("#"), Some((1, "")));
        assert_eq!(slide_heading("### Deep"), None);
        assert_eq!(slide_heading("#hashtag"), None);
        assert_eq!(slide_heading(" # indented"), None);
        assert_eq!(heading("### Deep"), Some((3, "Deep")));
    }

    #[test]
    fn test_fences() {
        let fence = fence_open("```chart:pie").unwrap();
        assert_eq!(fence.marker, '`');
        assert_eq!(fence.info, "chart:pie");
        assert!(fence.is_closed_by("```"));
        assert!(!fence.is_closed_by("~~~"));
        assert!(fence_open("``").is_none());
        assert!(fence_open("~~~~ python").is_some());
    }

    #[test]
    fn test_table_cells() {
        assert_eq!(
            table_cells("| a | b | c |").unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(table_cells("a | b | c").unwrap().len(), 3);
        assert_eq!(table_cells("| a | b |").unwrap().len(), 2);
        assert!(table_cells("a | b").is_none());
        assert_eq!(
            table_cells(r"| x \| y | b | c |").unwrap()[0],
            "x | y".to_string()
        );
        assert!(wide_table_row("| a | b |").is_none());
    }

    #[test]
    fn test_alignment_row() {
        let cells = table_cells("|---|:---:|---:|").unwrap();
        assert!(is_alignment_row(&cells));
        let cells = table_cells("| a | - | b |").unwrap();
        assert!(!is_alignment_row(&cells));
    }
}
