//! Property tests for escaping and code span math.

use mdtex_convert::escape::escape_prose;
use mdtex_convert::transforms::inline::render_code_span;
use proptest::prelude::*;

/// Split a rendered code span into (plain, math) runs.
fn split_math(rendered: &str) -> (Vec<String>, Vec<String>) {
    let inner = rendered
        .strip_prefix("\\texttt{")
        .and_then(|rest| rest.strip_suffix('}'))
        .expect("code span is wrapped in \\texttt");
    let mut plain = Vec::new();
    let mut math = Vec::new();
    for (index, part) in inner.split('$').enumerate() {
        if index % 2 == 0 {
            plain.push(part.to_string());
        } else {
            math.push(part.to_string());
        }
    }
    (plain, math)
}

proptest! {
    #[test]
    fn escape_prose_is_idempotent(text in "[#%&_\\\\ab ]{0,40}") {
        let once = escape_prose(&text);
        prop_assert_eq!(escape_prose(&once), once);
    }

    #[test]
    fn escape_prose_leaves_no_bare_reserved(text in "[#%&_ab ]{0,40}") {
        let escaped = escape_prose(&text);
        let chars: Vec<char> = escaped.chars().collect();
        for (index, ch) in chars.iter().enumerate() {
            if matches!(ch, '#' | '%' | '&' | '_') {
                prop_assert!(index > 0 && chars[index - 1] == '\\', "bare {} in {}", ch, escaped);
            }
        }
    }

    #[test]
    fn math_regions_are_never_escaped(content in "[a-z0-9_^()%&# -]{1,30}") {
        let rendered = render_code_span(&content);
        let (plain, math) = split_math(&rendered);
        for region in &math {
            prop_assert!(!region.contains('\\'), "escaped math {:?} in {}", region, rendered);
        }
        for run in &plain {
            let chars: Vec<char> = run.chars().collect();
            for (index, ch) in chars.iter().enumerate() {
                if matches!(ch, '%' | '&' | '#' | '_' | '^') {
                    prop_assert!(
                        index > 0 && chars[index - 1] == '\\',
                        "unescaped {} outside math in {}",
                        ch,
                        rendered
                    );
                }
            }
        }
    }
}
