use std::fmt::{self, Write as _};

use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 128-bit seed behind every random decision of a session.
///
/// Replaying a session with the same seed, catalog and inputs yields the
/// same onboarding pool, the same candidate sets and the same presentation
/// order. Serialized as a 32-character hex string.
///
/// ```
/// use palate_engine::SessionSeed;
/// use rand::Rng as _;
///
/// let seed: SessionSeed = rand::rng().random();
/// let json = serde_json::to_string(&seed).unwrap();
/// assert_eq!(json.len(), 34);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionSeed([u8; 16]);

/// Independent random streams derived from one [`SessionSeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngStream {
    OnboardingPool = 1,
    Wildcards = 2,
    Presentation = 3,
}

impl SessionSeed {
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    #[must_use]
    pub const fn as_u128(self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// Generator for one (round, stream) pair.
    ///
    /// Round 0 is the onboarding phase; rounds are numbered from 1.
    #[must_use]
    pub fn rng(self, round: usize, stream: RngStream) -> Pcg32 {
        const ROUND_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
        let value = self.as_u128();
        #[expect(clippy::cast_possible_truncation)]
        let (high, low) = ((value >> 64) as u64, value as u64);
        let state = high ^ (round as u64).wrapping_add(1).wrapping_mul(ROUND_MIX);
        let mut rng = Pcg32::new(state, low ^ stream as u64);
        // Burn one output so nearby states diverge immediately.
        let _: u32 = rng.random();
        rng
    }

    /// Fresh seed from the thread-local generator.
    #[must_use]
    pub fn random() -> Self {
        rand::rng().random()
    }
}

impl fmt::Display for SessionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.as_u128())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid seed `{input}`: expected 32 hex characters")]
pub struct ParseSeedError {
    #[error(not(source))]
    input: String,
}

impl std::str::FromStr for SessionSeed {
    type Err = ParseSeedError;

    /// Parses 1 to 32 hex digits; shorter inputs are zero-extended on the
    /// left, so `"7"` and `"00...07"` are the same seed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSeedError {
            input: s.to_owned(),
        };
        if s.is_empty() || s.len() > 32 {
            return Err(err());
        }
        u128::from_str_radix(s, 16)
            .map(Self::from_u128)
            .map_err(|_| err())
    }
}

impl Serialize for SessionSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut hex = String::with_capacity(32);
        write!(&mut hex, "{self}").map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex)
    }
}

impl<'de> Deserialize<'de> for SessionSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        if hex.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "invalid hex: expected 32 characters, got {}",
                hex.len()
            )));
        }
        hex.parse().map_err(serde::de::Error::custom)
    }
}

impl Distribution<SessionSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SessionSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        SessionSeed(seed)
    }
}
