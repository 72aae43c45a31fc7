// Content stream construction for stamps and raster placement

/// Six-element affine matrix `[a b c d e f]`, as used by the `cm` operator.
///
/// ```text
/// [ a b 0 ]
/// [ c d 0 ]
/// [ e f 1 ]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::identity()
        }
    }

    /// Counter-clockwise rotation by `degrees`.
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// self * other (right multiplication): applies `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Average Helvetica glyph advance as a fraction of the font size.
pub const HELVETICA_CHAR_WIDTH_RATIO: f64 = 0.5;

/// Approximate rendered width of `text` in Helvetica at `font_size`.
pub fn helvetica_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * HELVETICA_CHAR_WIDTH_RATIO
}

/// Formats a number for a content stream: at most four decimals, no trailing zeros.
pub fn fmt_num(v: f64) -> String {
    let v = if v.abs() < 1e-9 { 0.0 } else { v };
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Escapes a PDF name per ISO 32000 7.3.5 (without the leading slash).
pub fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        let regular = b.is_ascii_graphic()
            && !matches!(
                b,
                b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%'
            );
        if regular {
            out.push(b as char);
        } else {
            out.push_str(&format!("#{b:02X}"));
        }
    }
    out
}

/// Encodes `text` as a literal string for a standard 14 font.
///
/// Characters outside Latin-1 become `?`; the result is the raw byte string
/// including the surrounding parentheses.
pub fn encode_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for ch in text.chars() {
        let code = u32::from(ch);
        let byte = if code <= 0xFF { code as u8 } else { b'?' };
        match byte {
            b'\\' | b'(' | b')' => {
                out.push(b'\\');
                out.push(byte);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
    out
}

/// Accumulates content stream operators.
#[derive(Debug, Default)]
pub struct ContentBuilder {
    buf: Vec<u8>,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(b'\n');
        self
    }

    pub fn save(&mut self) -> &mut Self {
        self.line("q")
    }

    pub fn restore(&mut self) -> &mut Self {
        self.line("Q")
    }

    pub fn concat(&mut self, m: &Matrix) -> &mut Self {
        let s = format!(
            "{} {} {} {} {} {} cm",
            fmt_num(m.a),
            fmt_num(m.b),
            fmt_num(m.c),
            fmt_num(m.d),
            fmt_num(m.e),
            fmt_num(m.f)
        );
        self.line(&s)
    }

    pub fn set_graphics_state(&mut self, name: &str) -> &mut Self {
        let s = format!("/{} gs", escape_name(name));
        self.line(&s)
    }

    /// Draws an image XObject into the rectangle `(x, y, width, height)`.
    pub fn draw_image(&mut self, name: &str, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.save();
        self.concat(&Matrix {
            a: width,
            b: 0.0,
            c: 0.0,
            d: height,
            e: x,
            f: y,
        });
        let s = format!("/{} Do", escape_name(name));
        self.line(&s);
        self.restore()
    }

    /// Shows `text` with its baseline starting at `(x, y)`.
    pub fn draw_text(
        &mut self,
        font: &str,
        font_size: f64,
        x: f64,
        y: f64,
        color: [f64; 3],
        text: &str,
    ) -> &mut Self {
        self.line("BT");
        let fill = format!(
            "{} {} {} rg",
            fmt_num(color[0]),
            fmt_num(color[1]),
            fmt_num(color[2])
        );
        self.line(&fill);
        let tf = format!("/{} {} Tf", escape_name(font), fmt_num(font_size));
        self.line(&tf);
        let td = format!("{} {} Td", fmt_num(x), fmt_num(y));
        self.line(&td);
        self.buf.extend_from_slice(&encode_literal(text));
        self.line(" Tj");
        self.line("ET")
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
