//! Brazilian individual taxpayer IDs (CPF).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AgendaError, Result};

/// A validated CPF, stored as its 11 digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Accepts any punctuation (`529.982.247-25`, `52998224725`); fails with
    /// [`AgendaError::InvalidCpf`] unless the digits form a valid CPF.
    pub fn parse(text: &str) -> Result<Self> {
        let digits: Vec<u8> = text
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();
        if is_valid(&digits) {
            Ok(Cpf(digits.iter().map(|d| char::from(b'0' + d)).collect()))
        } else {
            Err(AgendaError::InvalidCpf(text.to_owned()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `XXX.XXX.XXX-XX`.
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
    }
}

fn is_valid(digits: &[u8]) -> bool {
    if digits.len() != 11 || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }
    // Position t (9, then 10) holds the check digit over the t digits before it,
    // weighted t+1 down to 2.
    (9..11).all(|t| {
        let sum: u32 = digits[..t]
            .iter()
            .enumerate()
            .map(|(c, &d)| u32::from(d) * (t as u32 + 1 - c as u32))
            .sum();
        (sum * 10 % 11 % 10) as u8 == digits[t]
    })
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

impl TryFrom<String> for Cpf {
    type Error = AgendaError;

    fn try_from(s: String) -> Result<Self> {
        Cpf::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid() {
        for text in ["529.982.247-25", "11144477735", "123.456.789-09", " 529 982 247 25 "] {
            assert!(Cpf::parse(text).is_ok(), "{text} should be valid");
        }
        let cpf = Cpf::parse("529.982.247-25").unwrap();
        assert_eq!(cpf.as_str(), "52998224725");
        assert_eq!(cpf.to_string(), "529.982.247-25");
    }

    #[test]
    fn test_invalid() {
        for text in ["529.982.247-26", "111.111.111-11", "1234567890", "123456789012", "", "abc"] {
            assert!(
                matches!(Cpf::parse(text), Err(AgendaError::InvalidCpf(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_as_digits() {
        let cpf = Cpf::parse("111.444.777-35").unwrap();
        assert_eq!(serde_json::to_string(&cpf).unwrap(), "\"11144477735\"");
        assert!(serde_json::from_str::<Cpf>("\"11144477736\"").is_err());
    }
}
