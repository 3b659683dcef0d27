//! Canonical enumeration of modulation schemes, with aliases, family, and
//! kind. See SPEC_FULL.md section 2 ("Modulation Registry").
//!
//! The registry is a single owned value constructed once at process start
//! via [`ModulationRegistry::new`] and then passed down by reference; there
//! is no global mutable state (SPEC_FULL.md section 2, "Singletons").

use crate::error::{Error, Result};

/// The closed set of modulation schemes spanning all three datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms, missing_docs)]
pub enum ModulationName {
    Ook,
    Ask4,
    Ask8,
    Bpsk,
    Qpsk,
    Psk8,
    Psk16,
    Psk32,
    Psk64,
    Apsk16,
    Apsk32,
    Apsk64,
    Apsk128,
    Qam4,
    Qam8,
    Qam16,
    Qam32,
    Qam64,
    Qam128,
    Qam256,
    Fsk2,
    Fsk4,
    Fsk8,
    Fsk16,
    Pam4,
    Pam8,
    Pam16,
    AmDsb,
    AmDsbWc,
    AmDsbSc,
    AmSsbWc,
    AmSsbSc,
    AmUsb,
    AmLsb,
    Fm,
    Pm,
    Gmsk,
    Oqpsk,
    /// Not one of the known names; returned by [`ModulationRegistry::lookup`]
    /// when no alias matches.
    Unknown,
}

/// The coarse kind partition used to classify a [`ModulationName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationKind {
    /// Analog modulations (AM variants, FM, PM).
    Analog,
    /// Digital modulations (everything keyed/shifted/modulated digitally).
    Digital,
    /// [`ModulationName::Unknown`] only.
    Unknown,
}

/// The modulation family within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms, missing_docs)]
pub enum ModulationFamily {
    AM,
    FM,
    PM,
    APSK,
    ASK,
    FSK,
    PSK,
    PAM,
    QAM,
    Unknown,
}

/// One row of the alias table: a name plus its non-empty, ordered list of
/// display strings. The first entry is the canonical short label.
struct AliasRow {
    name: ModulationName,
    aliases: &'static [&'static str],
}

/// `verify_unique` found two names that share an alias.
#[derive(Debug, Clone)]
pub struct DuplicateAlias {
    /// The alias string that appeared twice.
    pub alias: String,
    /// The first modulation name found to claim it.
    pub first: ModulationName,
    /// The second modulation name found to claim it.
    pub second: ModulationName,
}

/// The full alias table. Every dataset-specific spelling a parser might
/// encounter is listed here; `Unknown` deliberately has no row and no
/// aliases, since it's the fallback rather than a name that datasets spell.
const TABLE: &[AliasRow] = &[
    AliasRow { name: ModulationName::Ook, aliases: &["OOK", "2ASK"] },
    AliasRow { name: ModulationName::Ask4, aliases: &["4ASK"] },
    AliasRow { name: ModulationName::Ask8, aliases: &["8ASK"] },
    AliasRow { name: ModulationName::Bpsk, aliases: &["BPSK"] },
    AliasRow { name: ModulationName::Qpsk, aliases: &["QPSK"] },
    AliasRow { name: ModulationName::Psk8, aliases: &["8PSK"] },
    AliasRow { name: ModulationName::Psk16, aliases: &["16PSK"] },
    AliasRow { name: ModulationName::Psk32, aliases: &["32PSK"] },
    AliasRow { name: ModulationName::Psk64, aliases: &["64PSK"] },
    AliasRow { name: ModulationName::Apsk16, aliases: &["16APSK", "APSK16"] },
    AliasRow { name: ModulationName::Apsk32, aliases: &["32APSK", "APSK32"] },
    AliasRow { name: ModulationName::Apsk64, aliases: &["64APSK", "APSK64"] },
    AliasRow { name: ModulationName::Apsk128, aliases: &["128APSK", "APSK128"] },
    AliasRow { name: ModulationName::Qam4, aliases: &["4QAM"] },
    AliasRow { name: ModulationName::Qam8, aliases: &["8QAM"] },
    AliasRow { name: ModulationName::Qam16, aliases: &["16QAM"] },
    AliasRow { name: ModulationName::Qam32, aliases: &["32QAM"] },
    AliasRow { name: ModulationName::Qam64, aliases: &["64QAM"] },
    AliasRow { name: ModulationName::Qam128, aliases: &["128QAM"] },
    AliasRow { name: ModulationName::Qam256, aliases: &["256QAM"] },
    AliasRow { name: ModulationName::Fsk2, aliases: &["2FSK"] },
    AliasRow { name: ModulationName::Fsk4, aliases: &["4FSK"] },
    AliasRow { name: ModulationName::Fsk8, aliases: &["8FSK"] },
    AliasRow { name: ModulationName::Fsk16, aliases: &["16FSK"] },
    AliasRow { name: ModulationName::Pam4, aliases: &["4PAM"] },
    AliasRow { name: ModulationName::Pam8, aliases: &["8PAM"] },
    AliasRow { name: ModulationName::Pam16, aliases: &["16PAM"] },
    AliasRow { name: ModulationName::AmDsb, aliases: &["AM-DSB"] },
    AliasRow { name: ModulationName::AmDsbWc, aliases: &["AM-DSB-WC"] },
    AliasRow { name: ModulationName::AmDsbSc, aliases: &["AM-DSB-SC"] },
    AliasRow { name: ModulationName::AmSsbWc, aliases: &["AM-SSB-WC"] },
    AliasRow { name: ModulationName::AmSsbSc, aliases: &["AM-SSB-SC"] },
    AliasRow { name: ModulationName::AmUsb, aliases: &["AM-USB"] },
    AliasRow { name: ModulationName::AmLsb, aliases: &["AM-LSB"] },
    AliasRow { name: ModulationName::Fm, aliases: &["FM"] },
    AliasRow { name: ModulationName::Pm, aliases: &["PM"] },
    AliasRow { name: ModulationName::Gmsk, aliases: &["GMSK"] },
    AliasRow { name: ModulationName::Oqpsk, aliases: &["OQPSK"] },
];

/// Process-wide, read-mostly table mapping between [`ModulationName`] and its
/// dataset-specific display spellings.
///
/// Constructed once via [`ModulationRegistry::new`] (which runs
/// [`verify_unique`](ModulationRegistry::verify_unique) and fails fast on a
/// duplicate alias) and then held by the caller for the life of the
/// process; see SPEC_FULL.md section 2.
pub struct ModulationRegistry;

impl ModulationRegistry {
    /// Builds the registry, verifying alias uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAlias`] naming the first duplicate alias
    /// found, per the pairwise check required by spec section 4.1.
    pub fn new() -> Result<Self> {
        Self::verify_unique()?;
        Ok(Self)
    }

    /// First alias for `name`, i.e. its canonical short label.
    ///
    /// # Panics
    ///
    /// Panics if `name` is [`ModulationName::Unknown`]; callers should never
    /// ask for the canonical label of the fallback name.
    #[must_use]
    pub fn canonical(&self, name: ModulationName) -> &'static str {
        row(name)
            .unwrap_or_else(|| unreachable!("Unknown has no alias row"))
            .aliases[0]
    }

    /// Finds the `ModulationName` whose alias list contains `text` exactly
    /// (case-sensitive). Returns [`ModulationName::Unknown`] when no row
    /// matches.
    #[must_use]
    pub fn lookup(&self, text: &str) -> ModulationName {
        TABLE
            .iter()
            .find(|row| row.aliases.iter().any(|alias| *alias == text))
            .map_or(ModulationName::Unknown, |row| row.name)
    }

    /// The modulation family for `name`.
    #[must_use]
    pub fn family(&self, name: ModulationName) -> ModulationFamily {
        family_of(name)
    }

    /// The analog/digital/unknown kind for `name`.
    #[must_use]
    pub fn kind(&self, name: ModulationName) -> ModulationKind {
        kind_of(name)
    }

    /// Exhaustive pairwise check that every alias string appears under at
    /// most one `ModulationName`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAlias`] naming the first duplicate pair
    /// found, in table order.
    pub fn verify_unique() -> Result<()> {
        for (i, a) in TABLE.iter().enumerate() {
            for b in &TABLE[i + 1..] {
                for alias in a.aliases {
                    if b.aliases.contains(alias) {
                        return Err(Error::DuplicateAlias {
                            alias: (*alias).to_string(),
                            first: format!("{:?}", a.name),
                            second: format!("{:?}", b.name),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Looks up the alias row for `name`, or `None` for `Unknown`.
fn row(name: ModulationName) -> Option<&'static AliasRow> {
    TABLE.iter().find(|row| row.name == name)
}

/// Derives the coarse analog/digital/unknown kind for `name`.
const fn kind_of(name: ModulationName) -> ModulationKind {
    use ModulationName::{
        AmDsb, AmDsbSc, AmDsbWc, AmLsb, AmSsbSc, AmSsbWc, AmUsb, Fm, Pm, Unknown,
    };
    match name {
        AmDsb | AmDsbWc | AmDsbSc | AmSsbWc | AmSsbSc | AmUsb | AmLsb | Fm | Pm => {
            ModulationKind::Analog
        }
        Unknown => ModulationKind::Unknown,
        _ => ModulationKind::Digital,
    }
}

/// Derives the modulation family for `name`.
const fn family_of(name: ModulationName) -> ModulationFamily {
    use ModulationFamily as F;
    use ModulationName as N;
    match name {
        N::AmDsb | N::AmDsbWc | N::AmDsbSc | N::AmSsbWc | N::AmSsbSc | N::AmUsb | N::AmLsb => {
            F::AM
        }
        N::Fm => F::FM,
        N::Pm => F::PM,
        N::Apsk16 | N::Apsk32 | N::Apsk64 | N::Apsk128 => F::APSK,
        N::Ook | N::Ask4 | N::Ask8 => F::ASK,
        N::Fsk2 | N::Fsk4 | N::Fsk8 | N::Fsk16 | N::Gmsk => F::FSK,
        N::Bpsk | N::Qpsk | N::Psk8 | N::Psk16 | N::Psk32 | N::Psk64 | N::Oqpsk => F::PSK,
        N::Pam4 | N::Pam8 | N::Pam16 => F::PAM,
        N::Qam4 | N::Qam8 | N::Qam16 | N::Qam32 | N::Qam64 | N::Qam128 | N::Qam256 => F::QAM,
        N::Unknown => F::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn verify_unique_passes_on_the_real_table() {
        ModulationRegistry::verify_unique().expect("table ships with no duplicate aliases");
    }

    #[test]
    fn round_trip_every_alias() {
        let registry = ModulationRegistry::new().expect("table is valid");
        for row in TABLE {
            for alias in row.aliases {
                assert_eq!(
                    registry.lookup(alias),
                    row.name,
                    "alias {alias} should round-trip to {:?}",
                    row.name
                );
            }
            assert_eq!(registry.canonical(row.name), row.aliases[0]);
        }
    }

    #[test]
    fn unknown_text_maps_to_unknown() {
        let registry = ModulationRegistry::new().expect("table is valid");
        assert_eq!(registry.lookup("not-a-real-modulation"), ModulationName::Unknown);
    }

    #[test_case("16APSK", "APSK16"; "apsk dataset alias spellings")]
    #[test_case("OOK", "2ASK"; "ask dataset alias spellings")]
    fn both_aliases_map_to_the_same_name(a: &str, b: &str) {
        let registry = ModulationRegistry::new().expect("table is valid");
        assert_eq!(registry.lookup(a), registry.lookup(b));
    }

    #[test]
    fn kind_and_family_partition_every_known_name() {
        let registry = ModulationRegistry::new().expect("table is valid");
        for row in TABLE {
            let kind = registry.kind(row.name);
            assert_ne!(kind, ModulationKind::Unknown);
            assert_ne!(registry.family(row.name), ModulationFamily::Unknown);
        }
        assert_eq!(registry.kind(ModulationName::Unknown), ModulationKind::Unknown);
    }

    #[test]
    fn detects_an_injected_duplicate() {
        // A local table shadowing the real one, with BPSK's alias reused.
        let conflicting: &[AliasRow] = &[
            AliasRow { name: ModulationName::Bpsk, aliases: &["BPSK"] },
            AliasRow { name: ModulationName::Qpsk, aliases: &["BPSK"] },
        ];
        let mut found = None;
        'outer: for (i, a) in conflicting.iter().enumerate() {
            for b in &conflicting[i + 1..] {
                for alias in a.aliases {
                    if b.aliases.contains(alias) {
                        found = Some((*alias, a.name, b.name));
                        break 'outer;
                    }
                }
            }
        }
        assert_eq!(found, Some(("BPSK", ModulationName::Bpsk, ModulationName::Qpsk)));
    }
}
