//! Postal-code → voivodeship aggregation for the reporting panel. Pure
//! table lookup over the first two digits of a Polish postal code, plus a
//! batch statistic that is recomputed in full on every call.

use serde::{Deserialize, Serialize};

/// The sixteen Polish voivodeships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Voivodeship {
    Dolnoslaskie,
    KujawskoPomorskie,
    Lubelskie,
    Lubuskie,
    Lodzkie,
    Malopolskie,
    Mazowieckie,
    Opolskie,
    Podkarpackie,
    Podlaskie,
    Pomorskie,
    Slaskie,
    Swietokrzyskie,
    WarminskoMazurskie,
    Wielkopolskie,
    Zachodniopomorskie,
}

impl Voivodeship {
    pub fn code(self) -> &'static str {
        match self {
            Voivodeship::Dolnoslaskie => "dolnoslaskie",
            Voivodeship::KujawskoPomorskie => "kujawsko-pomorskie",
            Voivodeship::Lubelskie => "lubelskie",
            Voivodeship::Lubuskie => "lubuskie",
            Voivodeship::Lodzkie => "lodzkie",
            Voivodeship::Malopolskie => "malopolskie",
            Voivodeship::Mazowieckie => "mazowieckie",
            Voivodeship::Opolskie => "opolskie",
            Voivodeship::Podkarpackie => "podkarpackie",
            Voivodeship::Podlaskie => "podlaskie",
            Voivodeship::Pomorskie => "pomorskie",
            Voivodeship::Slaskie => "slaskie",
            Voivodeship::Swietokrzyskie => "swietokrzyskie",
            Voivodeship::WarminskoMazurskie => "warminsko-mazurskie",
            Voivodeship::Wielkopolskie => "wielkopolskie",
            Voivodeship::Zachodniopomorskie => "zachodniopomorskie",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Voivodeship::Dolnoslaskie => "Dolnośląskie",
            Voivodeship::KujawskoPomorskie => "Kujawsko-Pomorskie",
            Voivodeship::Lubelskie => "Lubelskie",
            Voivodeship::Lubuskie => "Lubuskie",
            Voivodeship::Lodzkie => "Łódzkie",
            Voivodeship::Malopolskie => "Małopolskie",
            Voivodeship::Mazowieckie => "Mazowieckie",
            Voivodeship::Opolskie => "Opolskie",
            Voivodeship::Podkarpackie => "Podkarpackie",
            Voivodeship::Podlaskie => "Podlaskie",
            Voivodeship::Pomorskie => "Pomorskie",
            Voivodeship::Slaskie => "Śląskie",
            Voivodeship::Swietokrzyskie => "Świętokrzyskie",
            Voivodeship::WarminskoMazurskie => "Warmińsko-Mazurskie",
            Voivodeship::Wielkopolskie => "Wielkopolskie",
            Voivodeship::Zachodniopomorskie => "Zachodniopomorskie",
        }
    }

    /// Resolve a postal code by its two-digit prefix. Prefixes 24, 79 and
    /// 89 have no assignment; anything shorter than two digits is
    /// unrecognized.
    pub fn from_zip(zip: &str) -> Option<Voivodeship> {
        let prefix = zip.as_bytes().get(..2)?;
        if !prefix.iter().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let n = (prefix[0] - b'0') * 10 + (prefix[1] - b'0');
        let region = match n {
            0..=9 => Voivodeship::Mazowieckie,
            10..=14 | 19 => Voivodeship::WarminskoMazurskie,
            15..=18 => Voivodeship::Podlaskie,
            20..=23 => Voivodeship::Lubelskie,
            25..=29 => Voivodeship::Swietokrzyskie,
            30..=34 => Voivodeship::Malopolskie,
            35..=39 => Voivodeship::Podkarpackie,
            40..=44 => Voivodeship::Slaskie,
            45..=49 => Voivodeship::Opolskie,
            50..=59 => Voivodeship::Dolnoslaskie,
            60..=64 => Voivodeship::Wielkopolskie,
            65..=69 => Voivodeship::Lubuskie,
            70..=78 => Voivodeship::Zachodniopomorskie,
            80..=84 => Voivodeship::Pomorskie,
            85..=88 => Voivodeship::KujawskoPomorskie,
            90..=99 => Voivodeship::Lodzkie,
            _ => return None,
        };
        Some(region)
    }
}

/// One row of the regional breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoivodeshipStat {
    pub name: String,
    pub code: String,
    pub count: usize,
    pub percentage: f64,
}

/// Aggregate a batch of optional postal codes into per-voivodeship counts
/// and percentages. Codes that resolve to no region (and missing inputs)
/// are excluded from the denominator; the output is sorted by descending
/// count with ties kept in first-seen order. Empty when nothing resolves.
pub fn voivodeship_stats<'a, I>(zip_codes: I) -> Vec<VoivodeshipStat>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: Vec<(Voivodeship, usize)> = Vec::new();
    let mut recognized = 0usize;

    for zip in zip_codes {
        let Some(zip) = zip else { continue };
        let Some(region) = Voivodeship::from_zip(zip) else {
            continue;
        };
        recognized += 1;
        match counts.iter_mut().find(|(r, _)| *r == region) {
            Some((_, count)) => *count += 1,
            None => counts.push((region, 1)),
        }
    }

    if recognized == 0 {
        return Vec::new();
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(region, count)| VoivodeshipStat {
            name: region.display_name().to_string(),
            code: region.code().to_string(),
            count,
            percentage: 100.0 * count as f64 / recognized as f64,
        })
        .collect()
}
