/// Character encoding used to decode the source byte stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8; malformed sequences decode to U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1, one byte per character.
    Latin1,
}

impl Charset {
    /// Decode `bytes` onto `out`. Bytes belonging to a character that is cut
    /// off at the end of the slice are left in `pending` unless `eof` is set.
    pub(crate) fn decode_into(
        self,
        bytes: &[u8],
        pending: &mut Vec<u8>,
        out: &mut String,
        eof: bool,
    ) {
        match self {
            Charset::Latin1 => out.extend(bytes.iter().map(|&b| char::from(b))),
            Charset::Utf8 => {
                pending.extend_from_slice(bytes);
                let mut rest: &[u8] = pending;
                loop {
                    match std::str::from_utf8(rest) {
                        Ok(valid) => {
                            out.push_str(valid);
                            rest = &[];
                            break;
                        }
                        Err(err) => {
                            let (valid, after) = rest.split_at(err.valid_up_to());
                            if let Ok(valid) = std::str::from_utf8(valid) {
                                out.push_str(valid);
                            }
                            match err.error_len() {
                                Some(len) => {
                                    out.push(char::REPLACEMENT_CHARACTER);
                                    rest = &after[len..];
                                }
                                None if eof => {
                                    out.push(char::REPLACEMENT_CHARACTER);
                                    rest = &[];
                                    break;
                                }
                                None => {
                                    rest = after;
                                    break;
                                }
                            }
                        }
                    }
                }
                let keep = rest.len();
                let start = pending.len() - keep;
                pending.drain(..start);
            }
        }
    }
}
