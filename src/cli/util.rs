use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use termion::style::{Underline, Reset};
use chrono::{DateTime, Utc};
use std::fmt::{self, Write as _};

/// Columns are never shrunk below this width.
const MIN_COLUMN_WIDTH: usize = 4;

/// Format a timestamp for display.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Render rows as a table fitted to the terminal's width.
pub fn print_table<H, T, R>(header: H, rows: T)
where
    H: TableRow,
    T: AsRef<[R]>,
    R: TableRow<Size = H::Size>,
{
    let (terminal_width, _) = termion::terminal_size().unwrap_or((80, 20));
    print!("{}", render_table(&header, rows.as_ref(), usize::from(terminal_width)));
}

/// Render rows as a table at most `max_width` columns wide.
///
/// Titles and names are the long columns here, so the widest column is
/// shrunk first. Shortened cells end with an ellipsis.
fn render_table<H, R>(header: &H, rows: &[R], max_width: usize) -> String
where
    H: TableRow,
    R: TableRow<Size = H::Size>,
{
    let mut widths = (0..H::size())
        .map(|inx| UnicodeWidthStr::width(header.column(inx)))
        .collect::<Vec<_>>();

    for row in rows {
        for (inx, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(UnicodeWidthStr::width(row.column(inx)));
        }
    }

    // Widths plus the spaces separating columns.
    let total = |widths: &[usize]| widths.iter().sum::<usize>() + widths.len() - 1;

    while total(&widths) > max_width {
        let widest = widths.iter_mut()
            .filter(|w| **w > MIN_COLUMN_WIDTH)
            .max_by_key(|w| **w);

        match widest {
            Some(width) => *width -= 1,
            None => break,
        }
    }

    let mut out = String::new();

    for (inx, width) in widths.iter().enumerate() {
        if inx > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}{}{}",
            Underline, Column(header.column(inx), *width), Reset);
    }
    out.push('\n');

    for row in rows {
        for (inx, width) in widths.iter().enumerate() {
            if inx > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{}", Column(row.column(inx), *width));
        }
        out.push('\n');
    }

    out
}

pub trait TableRow {
    type Size;

    fn size() -> usize;

    fn column(&self, index: usize) -> &str;
}

macro_rules! impl_table_row {
    {
        $(
            $sizeconst:literal $size:ident => $($inx:tt : $ty:ident),+
        );+
        $(;)*
    } => {
        $(
            pub struct $size;

            impl<$($ty),+> TableRow for ($($ty,)+)
            where
                $($ty: AsRef<str>),+
            {
                type Size = $size;

                fn size() -> usize { $sizeconst }

                fn column(&self, index: usize) -> &str {
                    match index {
                        $($inx => self.$inx.as_ref(),)+
                        _ => "",
                    }
                }
            }
        )+
    };
}

impl_table_row! {
    1 One   => 0: A;
    2 Two   => 0: A, 1: B;
    3 Three => 0: A, 1: B, 2: C;
    4 Four  => 0: A, 1: B, 2: C, 3: D;
    5 Five  => 0: A, 1: B, 2: C, 3: D, 4: E;
    6 Six   => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F;
}

/// A cell padded or cut to exactly the given display width.
struct Column<'a>(&'a str, usize);

impl<'a> fmt::Display for Column<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let Column(text, width) = *self;

        if UnicodeWidthStr::width(text) <= width {
            let pad = width - UnicodeWidthStr::width(text);
            return write!(fmt, "{0}{1:2$}", text, "", pad);
        }

        // Leave room for the ellipsis.
        let limit = width.saturating_sub(1);
        let mut used = 0;
        let mut end = 0;

        for (inx, chr) in text.char_indices() {
            let w = UnicodeWidthChar::width(chr).unwrap_or(0);
            if used + w > limit {
                break;
            }
            used += w;
            end = inx + chr.len_utf8();
        }

        let pad = limit - used;
        write!(fmt, "{0}…{1:2$}", &text[..end], "", pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(table: &str) -> Vec<String> {
        table.replace(&Underline.to_string(), "")
            .replace(&Reset.to_string(), "")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn columns_are_padded() {
        let rows = vec![("CSPG-ISR-1", "Graph Embeddings", "submitted")];
        let table = plain(&render_table(&("ID", "Title", "Status"), &rows, 80));

        assert_eq!(table, vec![
            "ID         Title            Status   ",
            "CSPG-ISR-1 Graph Embeddings submitted",
        ]);
    }

    #[test]
    fn widest_column_is_shortened() {
        let rows = vec![("ABC", "A very long manuscript title", "paid")];
        let table = plain(&render_table(&("ID", "Title", "Status"), &rows, 20));

        assert_eq!(table[0], "ID  Title     Status");
        assert_eq!(table[1], "ABC A very l… paid  ");
        assert!(table.iter().all(|line| line.width() == 20));
    }

    #[test]
    fn wide_characters() {
        assert_eq!(Column("समीक्षा", 3).to_string().width(), 3);
        assert_eq!(Column("日本語", 4).to_string(), "日… ");
    }
}
