use super::config::PostConfig;
use super::formatter::format_coord;

/// The value carried by a single G-code word.
#[derive(Debug, Clone, PartialEq)]
pub enum WordValue {
    Coord(f64),
    Str(String),
}

/// A single G-code word: a letter paired with a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: WordValue,
}

impl Word {
    pub fn coord(letter: char, value: f64) -> Self {
        Word {
            letter,
            value: WordValue::Coord(value),
        }
    }
}

/// A single line of G-code, holding words in canonical order and an
/// optional comment.
pub struct Block {
    words: Vec<Word>,
    comment: Option<String>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.comment.is_none()
    }

    /// Renders the block to a G-code line (without end-of-line).
    ///
    /// Coordinate values are formatted with the `[format]` settings;
    /// comments are wrapped in the `[program]` delimiters.
    pub fn render(&self, cfg: &PostConfig) -> String {
        let sep = &cfg.format.word_separator;
        let mut line = String::new();
        let mut needs_sep = false;

        for word in &self.words {
            if needs_sep {
                line.push_str(sep);
            }
            line.push_str(&render_word(word, cfg));
            needs_sep = true;
        }

        if let Some(text) = &self.comment {
            if needs_sep {
                line.push_str(sep);
            }
            line.push_str(&cfg.program.comment_open);
            line.push_str(text);
            line.push_str(&cfg.program.comment_close);
        }
        line
    }
}

fn render_word(word: &Word, cfg: &PostConfig) -> String {
    match &word.value {
        WordValue::Coord(v) => format!(
            "{}{}",
            word.letter,
            format_coord(
                *v,
                cfg.format.decimal_places,
                !cfg.format.trailing_zeros,
                cfg.format.leading_zero_suppression,
            )
        ),
        WordValue::Str(s) => s.clone(),
    }
}

/// Builds a [`Block`] by accumulating words in named slots, then emitting
/// them in canonical word order on [`build`](BlockBuilder::build):
///
/// motion G → other codes → X Y Z → I J R → dwell → F → S → M
#[derive(Default)]
pub struct BlockBuilder {
    motion: Option<String>,
    codes: Vec<String>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    i: Option<f64>,
    j: Option<f64>,
    r: Option<f64>,
    dwell: Option<(char, f64)>,
    feed_val: Option<f64>,
    spindle_val: Option<f64>,
    m_codes: Vec<String>,
    comment_text: Option<String>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        BlockBuilder::default()
    }

    /// Sets the motion code (e.g. `"G0"`, `"G1"`, `"G2"`).
    pub fn motion(mut self, code: &str) -> Self {
        self.motion = Some(code.to_string());
        self
    }

    /// Adds a bare code word (e.g. `"G4"`, `"G54"`).
    pub fn code(mut self, code: &str) -> Self {
        self.codes.push(code.to_string());
        self
    }

    /// Adds an axis word. `letter` must be X, Y or Z (case-insensitive).
    pub fn axis(mut self, letter: char, value: f64) -> Self {
        match letter.to_ascii_uppercase() {
            'X' => self.x = Some(value),
            'Y' => self.y = Some(value),
            'Z' => self.z = Some(value),
            _ => {}
        }
        self
    }

    /// Adds an arc parameter word: I, J or R (case-insensitive).
    pub fn arc_param(mut self, letter: char, value: f64) -> Self {
        match letter.to_ascii_uppercase() {
            'I' => self.i = Some(value),
            'J' => self.j = Some(value),
            'R' => self.r = Some(value),
            _ => {}
        }
        self
    }

    /// Sets the dwell duration word with its dialect letter.
    pub fn dwell(mut self, letter: char, seconds: f64) -> Self {
        self.dwell = Some((letter, seconds));
        self
    }

    pub fn feed(mut self, value: f64) -> Self {
        self.feed_val = Some(value);
        self
    }

    pub fn spindle(mut self, value: f64) -> Self {
        self.spindle_val = Some(value);
        self
    }

    pub fn m(mut self, code: &str) -> Self {
        self.m_codes.push(code.to_string());
        self
    }

    /// Sets the block comment text (without delimiters).
    pub fn comment(mut self, text: &str) -> Self {
        self.comment_text = Some(text.to_string());
        self
    }

    /// Consumes the builder and produces a [`Block`] with words in
    /// canonical order.
    pub fn build(self) -> Block {
        let mut words: Vec<Word> = Vec::with_capacity(12 + self.codes.len());

        if let Some(code) = self.motion {
            words.push(Word {
                letter: 'G',
                value: WordValue::Str(code),
            });
        }
        for code in self.codes {
            words.push(Word {
                letter: 'G',
                value: WordValue::Str(code),
            });
        }
        for (letter, opt) in [('X', self.x), ('Y', self.y), ('Z', self.z)] {
            if let Some(v) = opt {
                words.push(Word::coord(letter, v));
            }
        }
        for (letter, opt) in [('I', self.i), ('J', self.j), ('R', self.r)] {
            if let Some(v) = opt {
                words.push(Word::coord(letter, v));
            }
        }
        if let Some((letter, seconds)) = self.dwell {
            words.push(Word::coord(letter, seconds));
        }
        if let Some(v) = self.feed_val {
            words.push(Word::coord('F', v));
        }
        if let Some(v) = self.spindle_val {
            words.push(Word::coord('S', v));
        }
        for code in self.m_codes {
            words.push(Word {
                letter: 'M',
                value: WordValue::Str(code),
            });
        }

        Block {
            words,
            comment: self.comment_text,
        }
    }
}
