//! Numeric parameters of a control sequence

/// Upper bound on a single parameter value; larger wire values saturate
const MAX_PARAM_VALUE: u32 = 65_535;

/// Upper bound on the number of parameters kept from one sequence
const MAX_PARAMS: usize = 32;

/// Semicolon-separated parameters. Missing or garbled entries are unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: Vec<Option<u32>>,
}

impl Params {
    /// Parse the raw parameter text collected between the intro and the final byte
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        let values = raw
            .split([';', ':'])
            .take(MAX_PARAMS)
            .map(|field| {
                if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let value = field.bytes().fold(0u32, |acc, b| {
                    acc.saturating_mul(10)
                        .saturating_add((b - b'0') as u32)
                        .min(MAX_PARAM_VALUE)
                });
                Some(value)
            })
            .collect();

        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameter at `index`, `None` when unset
    pub fn get(&self, index: usize) -> Option<u32> {
        self.values.get(index).copied().flatten()
    }

    /// Parameter at `index`, or `default` when unset
    pub fn get_or(&self, index: usize, default: u32) -> u32 {
        self.get(index).unwrap_or(default)
    }

    /// Repeat count at `index`: unset and zero both mean one
    pub fn count(&self, index: usize) -> usize {
        self.get(index).filter(|&n| n > 0).unwrap_or(1) as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<u32>> + '_ {
        self.values.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_missing_fields_are_unset() {
        let params = Params::parse("");
        assert!(params.is_empty());
        assert_eq!(params.count(0), 1);

        let params = Params::parse(";5");
        assert_eq!(params.get(0), None);
        assert_eq!(params.get(1), Some(5));
        assert_eq!(params.get_or(0, 1), 1);
    }

    #[test]
    fn zero_count_means_one() {
        assert_eq!(Params::parse("0").count(0), 1);
        assert_eq!(Params::parse("7").count(0), 7);
    }

    #[test]
    fn garbage_fields_are_unset() {
        let params = Params::parse("1;x2;3");
        assert_eq!(params.get(0), Some(1));
        assert_eq!(params.get(1), None);
        assert_eq!(params.get(2), Some(3));
    }

    #[test]
    fn huge_values_saturate() {
        let params = Params::parse("99999999999999999999");
        assert_eq!(params.get(0), Some(MAX_PARAM_VALUE));
    }

    #[test]
    fn colon_separates_like_semicolon() {
        let params = Params::parse("38:5:196");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(2), Some(196));
    }
}
