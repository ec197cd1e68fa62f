//! Incremental tokenizer over the raw source stream.
//!
//! [`BlockReader`] keeps an append-only text buffer with a consumed-prefix
//! cursor. Tokens are cut at the first occurrence of a caller-supplied
//! delimiter; the buffer is refilled in fixed-size chunks until the delimiter
//! shows up or the stream ends.

mod charset;

use std::io::{self, ErrorKind, Read};

pub use charset::Charset;

use crate::observability::log_debug;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Delimiter-driven tokenizer over a byte stream.
///
/// After the delimiter is found the cursor moves past the token plus
/// `skip_length` characters, which may differ from the delimiter's own
/// length. Once the stream is exhausted the remaining text is returned as one
/// final token and every later call yields `None`.
pub struct BlockReader<R> {
    inner: R,
    charset: Charset,
    chunk: Vec<u8>,
    pending: Vec<u8>,
    text: String,
    consumed: usize,
    skip_length: usize,
    exhausted: bool,
    finished: bool,
    produced_any: bool,
}

impl<R: Read> BlockReader<R> {
    /// Wrap `inner`, reading `chunk_size` bytes per refill.
    pub fn new(inner: R, charset: Charset, chunk_size: usize, skip_length: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            inner,
            charset,
            chunk: vec![0; chunk_size],
            pending: Vec::new(),
            text: String::with_capacity(chunk_size),
            consumed: 0,
            skip_length,
            exhausted: false,
            finished: false,
            produced_any: false,
        }
    }

    /// Returns the text before the next `delimiter`, or the unconsumed
    /// remainder once the stream is exhausted. `None` after that.
    pub fn next_token(&mut self, delimiter: &str) -> io::Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }

        let mut search_from = self.consumed;
        loop {
            if !delimiter.is_empty() {
                if let Some(found) = self.text[search_from..].find(delimiter) {
                    let token_end = search_from + found;
                    if let Some(next) = self.skip_chars(token_end, self.skip_length) {
                        let token = self.text[self.consumed..token_end].to_string();
                        self.consumed = next;
                        return Ok(Some(self.emit(token)));
                    }
                    if !self.exhausted {
                        // Delimiter found but the skip reaches past the buffered text.
                        search_from = self.refill(token_end)?;
                        continue;
                    }
                    let token = self.text[self.consumed..token_end].to_string();
                    self.consumed = self.text.len();
                    return Ok(Some(self.emit(token)));
                }
            }

            if self.exhausted {
                let token = self.text[self.consumed..].to_string();
                self.finish();
                return Ok(Some(self.emit(token)));
            }

            let overlap = delimiter.len().saturating_sub(1);
            let resume = self.text.len().saturating_sub(overlap).max(self.consumed);
            search_from = self.refill(resume)?;
        }
    }

    /// Whether the final token has already been handed out.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read one chunk and append it. Returns `resume` shifted by any
    /// compaction and moved back onto a character boundary.
    fn refill(&mut self, resume: usize) -> io::Result<usize> {
        let mut resume = resume;
        if self.consumed > 0 && self.consumed >= self.text.len() / 2 {
            self.text.drain(..self.consumed);
            resume -= self.consumed;
            self.consumed = 0;
        }

        let count = loop {
            match self.inner.read(&mut self.chunk) {
                Ok(count) => break count,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };

        if count == 0 {
            self.exhausted = true;
            self.charset
                .decode_into(&[], &mut self.pending, &mut self.text, true);
        } else {
            self.charset.decode_into(
                &self.chunk[..count],
                &mut self.pending,
                &mut self.text,
                false,
            );
        }

        while !self.text.is_char_boundary(resume) {
            resume -= 1;
        }
        Ok(resume)
    }

    /// Byte offset `count` characters after `from`, if that many are buffered.
    fn skip_chars(&self, from: usize, count: usize) -> Option<usize> {
        let tail = &self.text[from..];
        tail.char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(tail.len()))
            .nth(count)
            .map(|offset| from + offset)
    }

    fn emit(&mut self, token: String) -> String {
        if self.produced_any {
            return token;
        }
        self.produced_any = true;
        match token.strip_prefix(BYTE_ORDER_MARK) {
            Some(stripped) => {
                log_debug!(
                    component = "reader",
                    event = "byte_order_mark_stripped",
                );
                stripped.to_string()
            }
            None => token,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.text = String::new();
        self.pending = Vec::new();
        self.chunk = Vec::new();
        self.consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::{BlockReader, Charset};

    /// Hands out at most `step` bytes per read call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
        }
    }

    fn reader(data: &str, chunk: usize, skip: usize) -> BlockReader<Cursor<Vec<u8>>> {
        BlockReader::new(Cursor::new(data.as_bytes().to_vec()), Charset::Utf8, chunk, skip)
    }

    fn drain<R: Read>(reader: &mut BlockReader<R>, delimiter: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        while let Some(token) = reader.next_token(delimiter).expect("read token") {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn returns_prefix_and_advances_past_delimiter() {
        let mut reader = reader(
            "DUMMY_MME3\t0A0A0A01\tsysadm\tletmein123\t2011\t/tmp/OMS_LOGS/ebs/ready\tDUMMY_POOL",
            10_000,
            1,
        );
        assert_eq!(
            reader.next_token("\t").expect("token").as_deref(),
            Some("DUMMY_MME3")
        );
        assert_eq!(
            reader.next_token("\t").expect("token").as_deref(),
            Some("0A0A0A01")
        );
    }

    #[test]
    fn remainder_returned_once_then_end_of_stream() {
        let mut reader = reader("test", 16, 1);
        assert_eq!(reader.next_token("\t").expect("token").as_deref(), Some("test"));
        assert!(reader.is_finished());
        assert_eq!(reader.next_token("\t").expect("token"), None);
        assert_eq!(reader.next_token("\n").expect("token"), None);
    }

    #[test]
    fn empty_stream_yields_single_empty_token() {
        let mut reader = reader("", 16, 1);
        assert_eq!(reader.next_token("\n").expect("token").as_deref(), Some(""));
        assert_eq!(reader.next_token("\n").expect("token"), None);
    }

    #[test]
    fn trailing_delimiter_leaves_empty_final_token() {
        let mut reader = reader("a\nb\n", 16, 1);
        assert_eq!(drain(&mut reader, "\n"), vec!["a", "b", ""]);
    }

    #[test]
    fn skip_length_is_independent_of_delimiter_length() {
        // Delimiter "\r" but two characters consumed, swallowing the "\n".
        let mut reader = reader("one\r\ntwo\r\nthree", 64, 2);
        assert_eq!(drain(&mut reader, "\r"), vec!["one", "two", "three"]);

        // Skip shorter than the delimiter leaves its tail on the next token.
        let mut reader = self::reader("one||two", 64, 1);
        assert_eq!(drain(&mut reader, "||"), vec!["one", "|two"]);
    }

    #[test]
    fn token_boundaries_do_not_depend_on_chunk_size() {
        let data = "alpha<>beta<>gamma is longer<>\u{00e5}\u{00e4}\u{00f6}<>end";
        let expected = vec![
            "alpha",
            "beta",
            "gamma is longer",
            "\u{00e5}\u{00e4}\u{00f6}",
            "end",
        ];
        for step in 1..8 {
            let mut reader = BlockReader::new(
                Trickle {
                    data: data.as_bytes(),
                    step,
                },
                Charset::Utf8,
                step,
                2,
            );
            assert_eq!(drain(&mut reader, "<>"), expected, "step {step}");
        }
    }

    #[test]
    fn skip_reads_ahead_across_chunks() {
        let mut reader = BlockReader::new(
            Trickle {
                data: b"ab\r\ncd",
                step: 3,
            },
            Charset::Utf8,
            3,
            2,
        );
        assert_eq!(drain(&mut reader, "\r"), vec!["ab", "cd"]);
    }

    #[test]
    fn skip_past_end_of_stream_is_clamped() {
        let mut reader = reader("ab\r", 64, 5);
        assert_eq!(drain(&mut reader, "\r"), vec!["ab", ""]);
    }

    #[test]
    fn byte_order_mark_stripped_from_first_token_only() {
        let mut reader = reader("\u{FEFF}head\n\u{FEFF}body", 4, 1);
        assert_eq!(drain(&mut reader, "\n"), vec!["head", "\u{FEFF}body"]);
    }

    #[test]
    fn byte_order_mark_stripped_from_sole_remainder() {
        let mut reader = reader("\u{FEFF}only", 64, 1);
        assert_eq!(drain(&mut reader, "\n"), vec!["only"]);
    }

    #[test]
    fn long_line_without_delimiter_grows_buffer() {
        let line = "x".repeat(50_000);
        let data = format!("{line}\nshort");
        let mut reader = reader(&data, 7, 1);
        let tokens = drain(&mut reader, "\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].len(), 50_000);
        assert_eq!(tokens[1], "short");
    }

    #[test]
    fn latin1_stream_decodes() {
        let mut reader = BlockReader::new(
            Cursor::new(b"caf\xe9|ol\xe9".to_vec()),
            Charset::Latin1,
            2,
            1,
        );
        assert_eq!(drain(&mut reader, "|"), vec!["café", "olé"]);
    }

    #[test]
    fn read_failure_propagates() {
        let mut reader = BlockReader::new(Broken, Charset::Utf8, 16, 1);
        let err = reader.next_token("\n").expect_err("read must fail");
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
