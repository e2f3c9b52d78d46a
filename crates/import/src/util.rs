/// Compile-once regex literal.
macro_rules! re {
    ($pattern:literal) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($pattern).unwrap())
    }};
}
pub(crate) use re;

/// Fold fullwidth digits and dash variants to ASCII. Other characters pass
/// through untouched.
pub(crate) fn fold_numeric(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '０'..='９' => (((c as u32 - '０' as u32) as u8) + b'0') as char,
            'ー' | '−' | '‐' | '–' | '—' => '-',
            _ => c,
        })
        .collect()
}

/// Longest-substring keyword search: among candidates whose keyword occurs
/// in `text`, pick the one with the most characters. Ties keep the earlier
/// candidate (strictly-greater comparison).
pub(crate) fn longest_keyword<'a, T, I>(text: &str, candidates: I) -> Option<&'a T>
where
    I: IntoIterator<Item = (&'a str, &'a T)>,
{
    let mut best: Option<&T> = None;
    let mut best_len = 0usize;
    for (keyword, payload) in candidates {
        if keyword.is_empty() {
            continue;
        }
        let len = keyword.chars().count();
        if text.contains(keyword) && len > best_len {
            best = Some(payload);
            best_len = len;
        }
    }
    best
}
