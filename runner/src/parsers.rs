//! Option enums for the command line.
//!
//! Each variant can be given by its full name or by any prefix long enough to pick it out,
//! plus a few short aliases where a natural one exists.

use clap::ValueEnum;
use clap::builder::PossibleValue;

/// How the dense operand and the sparse operand are filled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FillOptions {
    Random,
    Sequential,
    Banded,
    Identity,
}

/// How the batched dot products are dispatched.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DispatchOptions {
    Serial,
    Parallel,
}

/// Produce a collection of PossibleValue's for an Enum variant.
///
/// We allow any prefix of the full name which uniquely determines the variant.
/// We additionally allow the user to specify a collection of aliases which are
/// not prefixes. For each alias, we also allow any unique prefix of that alias.
///
/// For example, for the `Identity` variant of `FillOptions`, running
/// `get_aliases("identity", 1, Some(vec![("eye", 3)]))` produces the following set of
/// allowed strings:
///
/// ```text
/// i, id, ide, iden, ident, identi, identit, identity, eye
/// ```
fn get_aliases(
    base: &'static str,
    min_unique_base_prefix: usize,
    alias: Option<Vec<(&'static str, usize)>>,
) -> PossibleValue {
    let prefixes = (min_unique_base_prefix..base.len()).map(|i| &base[..i]);
    match alias {
        None => PossibleValue::new(base).aliases(prefixes),
        Some(vec) => PossibleValue::new(base).aliases(prefixes.chain(
            vec.into_iter().flat_map(|(alias, min_unique)| {
                (min_unique..alias.len() + 1).map(|i| &alias[..i])
            }),
        )),
    }
}

impl ValueEnum for FillOptions {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            FillOptions::Random,
            FillOptions::Sequential,
            FillOptions::Banded,
            FillOptions::Identity,
        ]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            FillOptions::Random => get_aliases("random", 1, None),
            FillOptions::Sequential => get_aliases("sequential", 1, None),
            FillOptions::Banded => get_aliases("banded", 1, None),
            FillOptions::Identity => get_aliases("identity", 1, Some(vec![("eye", 3)])),
        })
    }
}

impl ValueEnum for DispatchOptions {
    fn value_variants<'a>() -> &'a [Self] {
        &[DispatchOptions::Serial, DispatchOptions::Parallel]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            DispatchOptions::Serial => get_aliases("serial", 2, None),
            DispatchOptions::Parallel => get_aliases("parallel", 1, None),
        })
    }
}

/// Parse a probability in `[0, 1]`.
pub fn parse_probability(s: &str) -> Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("`{s}` is not a number: {e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("`{s}` is not in [0, 1]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_select_variants() {
        assert_eq!(
            FillOptions::from_str("seq", true),
            Ok(FillOptions::Sequential)
        );
        assert_eq!(FillOptions::from_str("r", true), Ok(FillOptions::Random));
        assert_eq!(FillOptions::from_str("eye", true), Ok(FillOptions::Identity));
        assert_eq!(
            DispatchOptions::from_str("par", true),
            Ok(DispatchOptions::Parallel)
        );
        assert!(DispatchOptions::from_str("s", true).is_err());
    }

    #[test]
    fn test_probability_bounds() {
        assert_eq!(parse_probability("0.25"), Ok(0.25));
        assert!(parse_probability("1.5").is_err());
        assert!(parse_probability("lots").is_err());
    }
}
