//! Stochastic content generators for test variations
//!
//! Uses seeded RNG for reproducibility. Print seed on failure for replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use splitstream_core::Format;

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("SPLITSTREAM_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    /// Returns 0, 1, 2, ... with decreasing probability
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Poisson-like count (simplified)
    pub fn poisson(&mut self, lambda: f64) -> usize {
        let l = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= self.rng.gen::<f64>();
            if p <= l {
                break;
            }
        }
        k - 1
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    fn pick<'a>(&mut self, items: &[&'a [u8]]) -> &'a [u8] {
        items[self.rng.gen_range(0..items.len())]
    }

    // =========================================================================
    // Chunking and whitespace
    // =========================================================================

    /// Ascending cut positions in `0..=len`. Occasionally every position
    /// (byte-at-a-time feeding).
    pub fn cuts(&mut self, len: usize) -> Vec<usize> {
        if self.chance(0.1) {
            return (1..len).collect();
        }
        let count = self.poisson(4.0);
        let mut cuts: Vec<usize> = (0..count).map(|_| self.rng.gen_range(0..=len)).collect();
        cuts.sort_unstable();
        cuts
    }

    /// Zero or more whitespace bytes
    pub fn whitespace_run(&mut self) -> Vec<u8> {
        let len = self.geometric(0.5);
        (0..len).map(|_| self.pick(&[b" ", b"\t", b"\r", b"\n"])[0]).collect()
    }

    /// One or more whitespace bytes
    pub fn separator(&mut self) -> Vec<u8> {
        let mut sep = vec![b' '];
        sep.extend(self.whitespace_run());
        sep
    }

    /// A complete top-level document in `format`
    pub fn document(&mut self, format: Format) -> Vec<u8> {
        match format {
            Format::Json => self.json_value(2),
            Format::Xml => self.xml_element(2),
            Format::Ubjson => self.ubjson_value(2),
        }
    }

    /// Random element or key name
    pub fn name(&mut self) -> Vec<u8> {
        let len = 1 + self.geometric(0.7);
        let mut name = Vec::with_capacity(len);
        name.push(self.rng.gen_range(b'a'..=b'z'));
        let chars = b"abcdefghijklmnopqrstuvwxyz0123456789-_";
        for _ in 1..len {
            name.push(chars[self.rng.gen_range(0..chars.len())]);
        }
        name
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Random JSON value nested at most `depth` containers deep
    pub fn json_value(&mut self, depth: usize) -> Vec<u8> {
        let kinds = if depth == 0 { 4 } else { 6 };
        match self.rng.gen_range(0..kinds) {
            0 => self.json_string(),
            1 => self.json_number(),
            2 => self.pick(&[b"true", b"false", b"null"]).to_vec(),
            3 => self.json_string(),
            4 => self.json_array(depth - 1),
            _ => self.json_object(depth - 1),
        }
    }

    /// String full of structural look-alikes and escapes
    pub fn json_string(&mut self) -> Vec<u8> {
        let pieces: &[&[u8]] = &[
            b"abc", b"}", b"]", b"{", b"[", b",", b":", b" ", b"<a>", br#"\""#, br"\\", br"\n",
            br"\/", br"\u001e", br"\uD83D\uDE00", "\u{e9}t\u{e9}".as_bytes(), "😀".as_bytes(),
        ];
        let mut out = vec![b'"'];
        for _ in 0..self.geometric(0.7) {
            out.extend(self.pick(pieces));
        }
        out.push(b'"');
        out
    }

    pub fn json_number(&mut self) -> Vec<u8> {
        match self.rng.gen_range(0..4) {
            0 => self.rng.gen_range(-1000i32..1000).to_string().into_bytes(),
            1 => format!("{}.{}", self.rng.gen_range(-50i32..50), self.rng.gen_range(0u32..1000))
                .into_bytes(),
            2 => format!(
                "{}{}{}",
                self.rng.gen_range(1u32..10),
                ["e", "E", "e+", "e-"][self.rng.gen_range(0..4)],
                self.rng.gen_range(0u32..30)
            )
            .into_bytes(),
            _ => b"0".to_vec(),
        }
    }

    fn json_array(&mut self, depth: usize) -> Vec<u8> {
        let mut out = vec![b'['];
        let count = self.geometric(0.6);
        for i in 0..count {
            if i > 0 {
                out.push(b',');
            }
            out.extend(self.whitespace_run());
            out.extend(self.json_value(depth));
            out.extend(self.whitespace_run());
        }
        out.push(b']');
        out
    }

    fn json_object(&mut self, depth: usize) -> Vec<u8> {
        let mut out = vec![b'{'];
        let count = self.geometric(0.6);
        for i in 0..count {
            if i > 0 {
                out.push(b',');
            }
            out.extend(self.whitespace_run());
            out.extend(self.json_string());
            out.extend(self.whitespace_run());
            out.push(b':');
            out.extend(self.whitespace_run());
            out.extend(self.json_value(depth));
            out.extend(self.whitespace_run());
        }
        out.push(b'}');
        out
    }

    // =========================================================================
    // XML
    // =========================================================================

    /// Random element with attributes, text, comments, CDATA and children
    pub fn xml_element(&mut self, depth: usize) -> Vec<u8> {
        let name = self.name();
        let mut out = vec![b'<'];
        out.extend(&name);
        for _ in 0..self.geometric(0.4) {
            out.push(b' ');
            out.extend(self.name());
            out.push(b'=');
            let value = self.pick(&[b"1", b"a > b", b"x/y", b"it's", b"say \"hi\"", b""]);
            let quote = if value.contains(&b'"') { b'\'' } else { b'"' };
            out.push(quote);
            out.extend(value);
            out.push(quote);
        }
        if self.chance(0.2) {
            out.extend(b"/>");
            return out;
        }
        out.push(b'>');
        for _ in 0..self.geometric(0.6) {
            match self.rng.gen_range(0..6) {
                0 => out.extend(self.pick(&[b"text", b" &lt;b&gt; ", b"a > b", b"\n  "])),
                1 => out.extend(self.pick(&[b"<!-- <not-a-tag> -->", b"<!---->", b"<!-- a - b -->"])),
                2 => out.extend(self.pick(&[b"<![CDATA[</fake>]]>", b"<![CDATA[]]>", b"<![CDATA[a]b]]c]]>"])),
                3 => out.extend(b"<?pi <data/> ?>"),
                _ if depth > 0 => out.extend(self.xml_element(depth - 1)),
                _ => out.extend(b"leaf"),
            }
        }
        out.extend(b"</");
        out.extend(&name);
        out.extend(self.pick(&[b">", b" >", b"\n>"]));
        out
    }

    // =========================================================================
    // UBJSON
    // =========================================================================

    fn ubjson_length(&mut self, out: &mut Vec<u8>, len: usize) {
        match self.rng.gen_range(0..4) {
            0 if len < 128 => out.extend([b'i', len as u8]),
            1 if len < 256 => out.extend([b'U', len as u8]),
            2 => {
                out.push(b'I');
                out.extend((len as i16).to_be_bytes());
            }
            _ => {
                out.push(b'l');
                out.extend((len as i32).to_be_bytes());
            }
        }
    }

    fn ubjson_payload(&mut self, out: &mut Vec<u8>, marker: u8) {
        let size = match marker {
            b'i' | b'U' => 1,
            b'C' => {
                out.push(self.rng.gen_range(b'a'..=b'z'));
                return;
            }
            b'I' => 2,
            b'l' | b'd' => 4,
            b'L' | b'D' => 8,
            b'S' | b'H' => {
                let body: &[u8] = if marker == b'H' { b"3.14159265358979" } else { self.pick(&[b"", b"]}", b"text", b"[$#"]) };
                self.ubjson_length(out, body.len());
                out.extend(body);
                return;
            }
            _ => 0,
        };
        for _ in 0..size {
            out.push(self.rng.gen());
        }
    }

    /// Random UBJSON value nested at most `depth` containers deep
    pub fn ubjson_value(&mut self, depth: usize) -> Vec<u8> {
        let mut out = Vec::new();
        self.ubjson_into(&mut out, depth);
        out
    }

    fn ubjson_into(&mut self, out: &mut Vec<u8>, depth: usize) {
        let scalars = b"ZTFiUIlLdDCSH";
        let kinds = if depth == 0 { scalars.len() } else { scalars.len() + 4 };
        let k = self.rng.gen_range(0..kinds);
        if k < scalars.len() {
            let marker = scalars[k];
            out.push(marker);
            self.ubjson_payload(out, marker);
            return;
        }
        let depth = depth - 1;
        let count = self.geometric(0.6);
        match k - scalars.len() {
            // Marker-terminated array, with no-ops
            0 => {
                out.push(b'[');
                for _ in 0..count {
                    if self.chance(0.2) {
                        out.push(b'N');
                    }
                    self.ubjson_into(out, depth);
                }
                out.push(b']');
            }
            // Counted array, optionally typed
            1 => {
                out.push(b'[');
                let typed = self.chance(0.5).then(|| self.pick(&[b"Z", b"T", b"i", b"I", b"D", b"S"])[0]);
                if let Some(t) = typed {
                    out.extend([b'$', t]);
                }
                out.push(b'#');
                self.ubjson_length(out, count);
                for _ in 0..count {
                    match typed {
                        Some(t) => self.ubjson_payload(out, t),
                        None => self.ubjson_into(out, depth),
                    }
                }
            }
            // Marker-terminated object
            2 => {
                out.push(b'{');
                for _ in 0..count {
                    let key = self.name();
                    self.ubjson_length(out, key.len());
                    out.extend(key);
                    self.ubjson_into(out, depth);
                }
                out.push(b'}');
            }
            // Counted object
            _ => {
                out.extend(b"{#");
                self.ubjson_length(out, count);
                for _ in 0..count {
                    let key = self.name();
                    self.ubjson_length(out, key.len());
                    out.extend(key);
                    self.ubjson_into(out, depth);
                }
            }
        }
    }
}
