use crate::summarizer::tokenizer::Tokenizer;
use std::ops::Range;
use std::sync::Arc;

const TERMINAL_MARKS: [char; 5] = ['.', '?', '!', '。', '！'];

/// One backend request worth of source lines, prefixed by the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Indices of the source lines carried by this window.
    pub lines: Range<usize>,
    /// Prompt prefix followed by every line, each terminated by `\n`.
    pub text: String,
    /// Tokens of the prefix plus `tokens(line) + 1` per line.
    pub tokens: usize,
    prefix_len: usize,
}

impl Window {
    /// The window text without its prompt prefix.
    pub fn body(&self) -> &str {
        &self.text[self.prefix_len..]
    }

    pub fn source_lines(&self) -> impl Iterator<Item = &str> {
        self.body().split_terminator('\n')
    }
}

fn ends_with_terminal(line: &str) -> bool {
    line.trim_end()
        .chars()
        .last()
        .is_some_and(|ch| TERMINAL_MARKS.contains(&ch))
}

fn continues_sentence(line: &str) -> bool {
    !line.trim().is_empty() && !ends_with_terminal(line)
}

fn ends_on_fragment(line: &str) -> bool {
    line.trim()
        .chars()
        .last()
        .is_some_and(|ch| ch.len_utf8() == 1 && !TERMINAL_MARKS.contains(&ch))
}

/// Splits lines into windows that fit a token budget without cutting a
/// sentence in half where it can be avoided.
pub struct Chunker {
    tokenizer: Arc<dyn Tokenizer>,
    extension_ceiling: Option<usize>,
}

impl Chunker {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            extension_ceiling: None,
        }
    }

    /// Stop sentence-boundary extension once a window would exceed
    /// `ceiling` tokens.
    pub fn with_extension_ceiling(mut self, ceiling: Option<usize>) -> Self {
        self.extension_ceiling = ceiling;
        self
    }

    fn line_cost(&self, line: &str) -> usize {
        self.tokenizer.count_tokens(line) + 1
    }

    pub fn chunk(&self, lines: &[&str], prefix: &str, soft_limit: usize) -> Vec<Window> {
        let prefix_tokens = self.tokenizer.count_tokens(prefix);
        let mut windows = Vec::new();
        let mut i = 0usize;

        while i < lines.len() {
            let start = i;
            let mut tokens = prefix_tokens;
            let mut costs = Vec::new();

            // A window always takes its first line, even when the prefix
            // alone already exceeds the budget.
            while i < lines.len() && (i == start || tokens <= soft_limit) {
                let cost = self.line_cost(lines[i]);
                tokens += cost;
                costs.push(cost);
                i += 1;
            }

            while i < lines.len() && continues_sentence(lines[i - 1]) {
                let cost = self.line_cost(lines[i]);
                if self
                    .extension_ceiling
                    .is_some_and(|ceiling| tokens + cost > ceiling)
                {
                    break;
                }
                tokens += cost;
                costs.push(cost);
                i += 1;
            }

            if i < lines.len() && i - start > 1 && ends_on_fragment(lines[i - 1]) {
                i -= 1;
                tokens -= costs.pop().unwrap_or(0);
            }

            windows.push(build_window(prefix, &lines[start..i], start, tokens));
        }

        windows
    }
}

fn build_window(prefix: &str, lines: &[&str], start: usize, tokens: usize) -> Window {
    let body_len: usize = lines.iter().map(|line| line.len() + 1).sum();
    let mut text = String::with_capacity(prefix.len() + body_len);
    text.push_str(prefix);
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    Window {
        lines: start..start + lines.len(),
        text,
        tokens,
        prefix_len: prefix.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Chunker, Window};
    use crate::summarizer::tokenizer::Tokenizer;
    use std::sync::Arc;

    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }

        fn name(&self) -> &str {
            "words"
        }
    }

    fn chunker() -> Chunker {
        Chunker::new(Arc::new(WordTokenizer))
    }

    fn ranges(windows: &[Window]) -> Vec<(usize, usize)> {
        windows.iter().map(|w| (w.lines.start, w.lines.end)).collect()
    }

    #[test]
    fn windows_partition_lines_without_loss() {
        let source = (0..200)
            .map(|n| match n % 7 {
                0 => String::new(),
                1 => format!("Sentence {n} ends here."),
                2 => format!("clause {n} continues"),
                3 => format!("第{n}句。"),
                4 => "   ".to_string(),
                5 => format!("question {n}?"),
                _ => format!("fragment {n} with several more words"),
            })
            .collect::<Vec<_>>();
        let lines = source.iter().map(String::as_str).collect::<Vec<_>>();

        let windows = chunker().chunk(&lines, "Summarize: ", 12);

        let rebuilt = windows
            .iter()
            .flat_map(|w| w.source_lines())
            .collect::<Vec<_>>();
        assert_eq!(rebuilt, lines);

        let mut expected_start = 0;
        for window in &windows {
            assert_eq!(window.lines.start, expected_start);
            assert!(!window.lines.is_empty());
            assert!(window.text.starts_with("Summarize: "));
            expected_start = window.lines.end;
        }
        assert_eq!(expected_start, lines.len());
    }

    #[test]
    fn terminated_lines_respect_soft_limit() {
        let lines = ["a b.", "c d.", "e f.", "g h.", "i j."];
        let windows = chunker().chunk(&lines, "P", 4);
        // prefix 1 + two lines of 3 tokens overshoots by one line at most.
        assert_eq!(ranges(&windows), vec![(0, 2), (2, 4), (4, 5)]);
        assert_eq!(windows[0].tokens, 7);
        assert_eq!(windows[0].text, "Pa b.\nc d.\n");
    }

    #[test]
    fn extends_past_limit_until_sentence_ends() {
        let lines = ["one two", "three four", "five six", "seven eight.", "nine ten."];
        let windows = chunker().chunk(&lines, "Summarize:", 5);
        assert_eq!(ranges(&windows), vec![(0, 4), (4, 5)]);
        assert_eq!(windows[0].tokens, 13);
        assert_eq!(windows[1].tokens, 4);
    }

    #[test]
    fn blank_line_stops_extension() {
        let lines = ["alpha beta", "", "gamma"];
        let windows = chunker().chunk(&lines, "P", 1);
        assert_eq!(ranges(&windows), vec![(0, 2), (2, 3)]);
    }

    #[test]
    fn cjk_terminal_mark_stops_extension() {
        let lines = ["第一句", "第二句。", "第三句"];
        let windows = chunker().chunk(&lines, "P", 1);
        assert_eq!(ranges(&windows), vec![(0, 2), (2, 3)]);
    }

    #[test]
    fn trailing_whitespace_after_terminal_mark_is_ignored() {
        let lines = ["first words.  \t", "second line", "third."];
        let windows = chunker().chunk(&lines, "P", 1);
        assert_eq!(ranges(&windows), vec![(0, 1), (1, 3)]);
    }

    #[test]
    fn oversized_prefix_still_yields_one_line_per_window() {
        let lines = ["a.", "b.", "c."];
        let prefix = "one two three four five six seven eight nine ten";
        let windows = chunker().chunk(&lines, prefix, 5);
        assert_eq!(ranges(&windows), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn extension_ceiling_defers_unterminated_fragment() {
        let lines = ["one two", "three four", "five six", "seven eight.", "nine ten."];
        let windows = chunker()
            .with_extension_ceiling(Some(8))
            .chunk(&lines, "Summarize:", 5);
        assert_eq!(ranges(&windows), vec![(0, 1), (1, 2), (2, 4), (4, 5)]);
        assert_eq!(windows[0].tokens, 4);
    }

    #[test]
    fn single_trailing_empty_line_is_kept() {
        let source = "first.\nsecond.\n";
        let lines = source.split('\n').collect::<Vec<_>>();
        let windows = chunker().chunk(&lines, "", 100);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].body(), "first.\nsecond.\n\n");
        assert_eq!(windows[0].source_lines().count(), 3);
    }
}
