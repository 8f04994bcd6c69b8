//! Cell and column reference parsing shared by the reader and configuration

/// Parse column letters like "A", "T" or "AB" into a 0-based column index
pub fn parse_column_letters(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (ch as usize - 'A' as usize + 1);
    }
    Some(col - 1)
}

/// Convert a 0-based column index to letters (0 -> A, 1 -> B, etc.)
pub fn column_letters(mut col: usize) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// Parse a cell reference like "A1" into (row, col) as 0-based indices
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col = 0u32;
    let mut row_str = String::new();

    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        } else if ch.is_ascii_digit() {
            row_str.push(ch);
        }
    }

    if row_str.is_empty() {
        return None;
    }

    let row = row_str.parse::<u32>().ok()?;

    // Convert to 0-based
    Some((row.saturating_sub(1), col.saturating_sub(1)))
}

/// Parse a cell range like "A1:B2" into (start_row, start_col, end_row, end_col)
pub fn parse_cell_range(range: &str) -> Option<(u32, u32, u32, u32)> {
    let (start, end) = range.split_once(':')?;
    let (start_row, start_col) = parse_cell_ref(start)?;
    let (end_row, end_col) = parse_cell_ref(end)?;

    Some((start_row, start_col, end_row, end_col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("B2"), Some((1, 1)));
        assert_eq!(parse_cell_ref("AA1"), Some((0, 26)));
        assert_eq!(parse_cell_ref("AB10"), Some((9, 27)));
    }

    #[test]
    fn test_parse_cell_range() {
        assert_eq!(parse_cell_range("B1:O1"), Some((0, 1, 0, 14)));
        assert_eq!(parse_cell_range("A1"), None);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(parse_column_letters("A"), Some(0));
        assert_eq!(parse_column_letters("K"), Some(10));
        assert_eq!(parse_column_letters("T"), Some(19));
        assert_eq!(parse_column_letters("AA"), Some(26));
        assert_eq!(parse_column_letters("t"), None);
        assert_eq!(parse_column_letters(""), None);
        assert_eq!(column_letters(19), "T");
        assert_eq!(column_letters(27), "AB");
    }
}
