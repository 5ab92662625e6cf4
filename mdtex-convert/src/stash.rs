use regex::{Captures, Regex};

/// Swaps matched regions for private-use placeholder tokens and back.
///
/// Tokens look like `<open>index<close>` where both delimiters are private-use code points,
/// so no rewrite rule or escaper can match inside them.
#[derive(Debug)]
pub(crate) struct Stash {
    open: char,
    close: char,
    stored: Vec<String>,
}

impl Stash {
    pub(crate) fn new(open: char, close: char) -> Self {
        Self {
            open,
            close,
            stored: Vec::new(),
        }
    }

    /// Replace every match of `pattern` with a placeholder.
    pub(crate) fn protect(&mut self, pattern: &Regex, text: &str) -> String {
        let (open, close, stored) = (self.open, self.close, &mut self.stored);
        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                stored.push(caps[0].to_string());
                format!("{open}{}{close}", stored.len() - 1)
            })
            .into_owned()
    }

    /// Put every stored region back in place of its placeholder.
    pub(crate) fn restore(&self, text: &str) -> String {
        if self.stored.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(self.open) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.open.len_utf8()..];
            match self.lookup(after) {
                Some((original, consumed)) => {
                    out.push_str(original);
                    rest = &after[consumed..];
                }
                None => {
                    out.push(self.open);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn lookup<'s>(&'s self, after_open: &str) -> Option<(&'s str, usize)> {
        let end = after_open.find(self.close)?;
        let index: usize = after_open[..end].parse().ok()?;
        let original = self.stored.get(index)?;
        Some((original.as_str(), end + self.close.len_utf8()))
    }
}
