use crate::common::*;

/// A fraction within the closed range [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Proportion(R64);

impl Proportion {
    pub fn new(value: f64) -> Result<Self> {
        Self::try_from(value)
    }

    pub fn to_r64(&self) -> R64 {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.raw()
    }

    /// The truncated count this proportion selects out of `total`.
    pub fn of(&self, total: usize) -> usize {
        (total as f64 * self.0.raw()).trunc() as usize
    }
}

impl Serialize for Proportion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Proportion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::try_from(value).map_err(|err| D::Error::custom(format!("{:?}", err)))
    }
}

impl TryFrom<R64> for Proportion {
    type Error = Error;

    fn try_from(value: R64) -> Result<Self, Self::Error> {
        ensure!(
            (0.0..=1.0).contains(&value.raw()),
            "proportion must be within range [0.0, 1.0], but get {}",
            value
        );
        Ok(Self(value))
    }
}

impl TryFrom<f64> for Proportion {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::try_from(R64::try_new(value).ok_or_else(|| format_err!("not a finite value"))?)
    }
}

impl From<Proportion> for f64 {
    fn from(proportion: Proportion) -> Self {
        proportion.0.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportion_range() {
        assert!(Proportion::new(0.0).is_ok());
        assert!(Proportion::new(1.0).is_ok());
        assert!(Proportion::new(1.5).is_err());
        assert!(Proportion::new(-0.1).is_err());
        assert!(Proportion::new(f64::NAN).is_err());
        assert!(serde_json::from_str::<Proportion>("2.0").is_err());
    }

    #[test]
    fn proportion_truncates() {
        let half = Proportion::new(0.5).unwrap();
        assert_eq!(half.of(7), 3);
        assert_eq!(Proportion::new(0.99).unwrap().of(10), 9);
    }
}
