use super::fonts::{encode_win_ansi, text_width, FontStyle};

#[derive(Debug, Clone, PartialEq)]
pub struct InlineRun {
    pub text: String,
    pub style: FontStyle,
    pub href: Option<String>,
}

impl InlineRun {
    pub fn new(text: impl Into<String>, style: FontStyle) -> Self {
        Self {
            text: text.into(),
            style,
            href: None,
        }
    }
}

/// Encoded text drawn with one font and one link target.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub bytes: Vec<u8>,
    pub style: FontStyle,
    pub href: Option<String>,
    pub width: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub width: f32,
}

impl Line {
    fn push(&mut self, bytes: &[u8], style: FontStyle, href: Option<&String>, size: f32) {
        let width = text_width(bytes, style, size);
        self.width += width;
        if let Some(last) = self.fragments.last_mut() {
            if last.style == style && last.href.as_ref() == href {
                last.bytes.extend_from_slice(bytes);
                last.width += width;
                return;
            }
        }
        self.fragments.push(Fragment {
            bytes: bytes.to_vec(),
            style,
            href: href.cloned(),
            width,
        });
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[derive(Debug)]
struct Piece<'a> {
    bytes: Vec<u8>,
    run: &'a InlineRun,
}

enum Token<'a> {
    Space(&'a InlineRun),
    Word(Vec<Piece<'a>>),
}

fn tokenize(runs: &[InlineRun]) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word: Vec<Piece> = Vec::new();
    for run in runs {
        let mut current = String::new();
        for ch in run.text.chars() {
            if ch.is_whitespace() {
                if !current.is_empty() {
                    word.push(Piece {
                        bytes: encode_win_ansi(&current),
                        run,
                    });
                    current.clear();
                }
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                if !matches!(tokens.last(), Some(Token::Space(_))) {
                    tokens.push(Token::Space(run));
                }
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            word.push(Piece {
                bytes: encode_win_ansi(&current),
                run,
            });
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

/// Break `runs` into lines no wider than `max_width`. Whitespace collapses to
/// single spaces and never starts or ends a line. Words wider than a whole
/// line are split between characters.
pub fn wrap(runs: &[InlineRun], size: f32, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut pending_space: Option<&InlineRun> = None;

    for token in tokenize(runs) {
        match token {
            Token::Space(run) => {
                if !line.is_empty() {
                    pending_space = Some(run);
                }
            }
            Token::Word(pieces) => {
                let word_width: f32 = pieces
                    .iter()
                    .map(|piece| text_width(&piece.bytes, piece.run.style, size))
                    .sum();
                let space_width = pending_space
                    .map(|run| text_width(b" ", run.style, size))
                    .unwrap_or(0.0);

                if !line.is_empty() && line.width + space_width + word_width > max_width {
                    lines.push(std::mem::take(&mut line));
                    pending_space = None;
                }
                if let Some(run) = pending_space.take() {
                    if !line.is_empty() {
                        line.push(b" ", run.style, run.href.as_ref(), size);
                    }
                }

                if !line.is_empty() || word_width <= max_width {
                    for piece in &pieces {
                        line.push(&piece.bytes, piece.run.style, piece.run.href.as_ref(), size);
                    }
                    continue;
                }

                for piece in &pieces {
                    for byte in &piece.bytes {
                        let glyph = [*byte];
                        let width = text_width(&glyph, piece.run.style, size);
                        if !line.is_empty() && line.width + width > max_width {
                            lines.push(std::mem::take(&mut line));
                        }
                        line.push(&glyph, piece.run.style, piece.run.href.as_ref(), size);
                    }
                }
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
