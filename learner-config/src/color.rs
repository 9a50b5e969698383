use crate::common::*;

static NAMED_COLORS: Lazy<HashMap<&'static str, [u8; 3]>> = Lazy::new(|| {
    [
        ("black", [0, 0, 0]),
        ("white", [255, 255, 255]),
        ("red", [255, 0, 0]),
        ("lime", [0, 255, 0]),
        ("green", [0, 128, 0]),
        ("blue", [0, 0, 255]),
        ("yellow", [255, 255, 0]),
        ("cyan", [0, 255, 255]),
        ("magenta", [255, 0, 255]),
        ("orange", [255, 165, 0]),
        ("purple", [128, 0, 128]),
        ("brown", [165, 42, 42]),
        ("pink", [255, 192, 203]),
        ("gray", [128, 128, 128]),
        ("grey", [128, 128, 128]),
        ("navy", [0, 0, 128]),
        ("olive", [128, 128, 0]),
        ("teal", [0, 128, 128]),
        ("maroon", [128, 0, 0]),
        ("silver", [192, 192, 192]),
    ]
    .into_iter()
    .collect()
});

/// A display color, either a name/hex string or an RGB triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Rgb(u8, u8, u8),
    Name(String),
}

impl Color {
    pub fn random<R>(rng: &mut R) -> Self
    where
        R: Rng,
    {
        let [r, g, b]: [u8; 3] = rng.gen();
        Self::Rgb(r, g, b)
    }

    /// Resolve to an RGB triple.
    ///
    /// Strings may be `#rgb`, `#rrggbb` or one of the basic CSS color names.
    pub fn to_rgb(&self) -> Result<[u8; 3]> {
        match self {
            Self::Rgb(r, g, b) => Ok([*r, *g, *b]),
            Self::Name(name) => {
                let name = name.trim().to_lowercase();
                if let Some(hex) = name.strip_prefix('#') {
                    return parse_hex(hex)
                        .ok_or_else(|| format_err!("invalid hex color '{}'", name));
                }
                NAMED_COLORS
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| format_err!("unknown color name '{}'", name))
            }
        }
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::Rgb(r, g, b)
    }
}

/// Draw `count` pairwise distinct random colors.
pub fn random_distinct_colors<R>(count: usize, rng: &mut R) -> Vec<Color>
where
    R: Rng,
{
    let mut seen = HashSet::with_capacity(count);
    let mut colors = Vec::with_capacity(count);
    while colors.len() < count {
        let color = Color::random(rng);
        if seen.insert(color.clone()) {
            colors.push(color);
        }
    }
    colors
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|ch| ch.to_digit(16).map(|digit| digit as u8))
        .collect::<Option<_>>()?;
    match *digits.as_slice() {
        [r, g, b] => Some([r * 17, g * 17, b * 17]),
        [r1, r2, g1, g2, b1, b2] => Some([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2]),
        _ => None,
    }
}
