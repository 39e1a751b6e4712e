//! Flash directory listing parser.
//!
//! Pure functions over the lines captured from `dir flash:`. A boot
//! loader listing looks like:
//!
//! ```text
//! Directory of flash:/
//! 2    -rwx  616      <date>  vlan.dat
//! 3    -rwx  5825     <date>  config.text
//! 4    -rwx  13063436 <date>  c2960-lanbasek9-mz.150-2.SE11.bin
//! ```
//!
//! A line qualifies only when it splits into more than one whitespace
//! token; the filename is the last token. (The original tool scanned all
//! tokens in one mode and took the last in another; one policy is kept,
//! the last-token one, which cannot mistake a size or date column for a
//! filename.)

use indexmap::IndexSet;

/// Extract filenames from listing lines, in first-seen order.
pub fn parse_listing<'a, I>(lines: I) -> IndexSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() > 1 {
                tokens.last().map(|t| t.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Filenames that should be erased during a reset: anything whose name
/// contains `config` or `vlan`, case-insensitively.
pub fn files_to_erase<'a, I>(lines: I) -> IndexSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    parse_listing(lines)
        .into_iter()
        .filter(|name| {
            let name = name.to_lowercase();
            name.contains("config") || name.contains("vlan")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_token_lines_yield_nothing() {
        let files = files_to_erase(["config.text", "vlan.dat"]);
        assert!(files.is_empty());
    }

    #[test]
    fn test_multi_token_lines_select_by_name() {
        let files = files_to_erase([
            "-rwx 1234 config.text",
            "-rwx 99 vlan.dat",
            "-rwx 50 readme.text",
        ]);
        let expected: Vec<&str> = vec!["config.text", "vlan.dat"];
        assert_eq!(files.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_realistic_listing() {
        let listing = [
            "Directory of flash:/",
            "",
            "2    -rwx  616       <date>  vlan.dat",
            "3    -rwx  5825      <date>  config.text",
            "4    -rwx  13063436  <date>  c2960-lanbasek9-mz.150-2.SE11.bin",
            "5    -rwx  3096      <date>  multiple-fs",
            "",
            "32514048 bytes total (15804928 bytes free)",
            "switch:",
        ];
        let files = files_to_erase(listing);
        assert_eq!(
            files.iter().map(String::as_str).collect::<Vec<_>>(),
            ["vlan.dat", "config.text"]
        );
    }

    #[test]
    fn test_case_insensitive_selection() {
        let files = files_to_erase(["-rwx 5825 CONFIG.TEXT.backup"]);
        assert_eq!(files.len(), 1);
        assert!(files.contains("CONFIG.TEXT.backup"));
    }

    #[test]
    fn test_duplicates_collapse_in_order() {
        let names = parse_listing([
            "-rwx 1 a.bin",
            "-rwx 2 b.bin",
            "-rwx 3 a.bin",
        ]);
        assert_eq!(
            names.iter().map(String::as_str).collect::<Vec<_>>(),
            ["a.bin", "b.bin"]
        );
    }
}
