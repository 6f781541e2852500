//! Lookups that turn raw survey answers into the standardized attributes of a
//! [`Respondent`](crate::Respondent).
//!
//! All the functions of this module are pure. They are used by the pool
//! readers when a pool file carries raw answers (state, city, income text)
//! instead of the standardized columns.

use std::collections::{BTreeSet, HashMap, HashSet};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::{Category, IncomeBracket, Locality, Region};

// ********* Age ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Generation {
    Alpha,
    Z,
    Y,
    X,
    BabyBoomers,
    Silent,
}

impl Generation {
    pub fn label(&self) -> &'static str {
        match self {
            Generation::Alpha => "1. Geração Alfa",
            Generation::Z => "2. Geração Z",
            Generation::Y => "3. Geração Y",
            Generation::X => "4. Geração X",
            Generation::BabyBoomers => "5. Baby Boomers",
            Generation::Silent => "6. Geração Silenciosa",
        }
    }
}

pub fn generation_for_age(age: u32) -> Generation {
    match age {
        79..=u32::MAX => Generation::Silent,
        60..=78 => Generation::BabyBoomers,
        44..=59 => Generation::X,
        28..=43 => Generation::Y,
        12..=27 => Generation::Z,
        _ => Generation::Alpha,
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum AgeBand {
    Under25,
    From25To34,
    From35To44,
    From45To54,
    From55To64,
    From65To74,
    Over75,
}

impl AgeBand {
    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Under25 => "1. Menos de 25",
            AgeBand::From25To34 => "2. De 25 a 34 anos",
            AgeBand::From35To44 => "3. De 35 a 44 anos",
            AgeBand::From45To54 => "4. De 45 a 54 anos",
            AgeBand::From55To64 => "5. De 55 a 64 anos",
            AgeBand::From65To74 => "6. De 65 a 74 anos",
            AgeBand::Over75 => "7. Acima de 75",
        }
    }
}

pub fn age_band(age: u32) -> AgeBand {
    match age {
        0..=24 => AgeBand::Under25,
        25..=34 => AgeBand::From25To34,
        35..=44 => AgeBand::From35To44,
        45..=54 => AgeBand::From45To54,
        55..=64 => AgeBand::From55To64,
        65..=74 => AgeBand::From65To74,
        _ => AgeBand::Over75,
    }
}

// ********* Income ***********

/// Estimates a household income from a free-text answer such as
/// `"De R$ 2.500,00 a R$ 5.000,00"`.
///
/// Numbers use the Brazilian notation. Values under 1000 are ignored (they are
/// usually option numbers). Returns the integer part of the mean.
pub fn income_estimate(text: &str) -> Option<u32> {
    let mut values: Vec<f64> = Vec::new();
    let mut token = String::new();
    // The trailing space flushes the last token.
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            token.push(c);
            continue;
        }
        if !token.is_empty() {
            let cleaned: String = token
                .chars()
                .filter(|c| *c != '.')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            if let Ok(v) = cleaned.parse::<f64>() {
                if v >= 1000.0 {
                    values.push(v);
                }
            }
            token.clear();
        }
    }
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(mean.trunc() as u32)
}

/// The detailed income bands of the legacy questionnaires.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum IncomeBand {
    UpTo1500,
    UpTo2500,
    UpTo4500,
    UpTo5500,
    UpTo8000,
    UpTo11000,
    UpTo13000,
    UpTo16000,
    UpTo18500,
    UpTo21000,
    UpTo24500,
    UpTo28000,
    Over28000,
}

const INCOME_BANDS: [(IncomeBand, u32, &str); 13] = [
    (IncomeBand::UpTo1500, 1500, "01. Até R$ 1,5 mil"),
    (IncomeBand::UpTo2500, 2500, "02. De R$ 1,5 mil a R$ 2,5 mil"),
    (IncomeBand::UpTo4500, 4500, "03. De R$ 2,5 mil a R$ 4,5 mil"),
    (IncomeBand::UpTo5500, 5500, "04. De R$ 4,5 mil a R$ 5,5 mil"),
    (IncomeBand::UpTo8000, 8000, "05. De R$ 5,5 mil a R$ 8 mil"),
    (IncomeBand::UpTo11000, 11000, "06. De R$ 8 mil a R$ 11 mil"),
    (IncomeBand::UpTo13000, 13000, "07. De R$ 11 mil a R$ 13 mil"),
    (IncomeBand::UpTo16000, 16000, "08. De R$ 13 mil a R$ 16 mil"),
    (IncomeBand::UpTo18500, 18500, "09. De R$ 16 mil a R$ 18,5 mil"),
    (IncomeBand::UpTo21000, 21000, "10. De R$ 18,5 mil a R$ 21 mil"),
    (IncomeBand::UpTo24500, 24500, "11. De R$ 21 mil a R$ 24,5 mil"),
    (IncomeBand::UpTo28000, 28000, "12. De R$ 24,5 mil a R$ 28 mil"),
    (IncomeBand::Over28000, u32::MAX, "13. Acima de R$ 28 mil"),
];

impl IncomeBand {
    pub fn label(&self) -> &'static str {
        INCOME_BANDS
            .iter()
            .find(|(b, _, _)| b == self)
            .map(|(_, _, l)| *l)
            .unwrap_or("")
    }

    pub fn from_label(s: &str) -> Option<IncomeBand> {
        let s = s.trim();
        INCOME_BANDS
            .iter()
            .find(|(_, _, l)| *l == s)
            .map(|(b, _, _)| *b)
    }

    pub fn macro_bracket(&self) -> IncomeBracket {
        match self {
            IncomeBand::UpTo1500 | IncomeBand::UpTo2500 => IncomeBracket::Under2500,
            IncomeBand::UpTo4500 | IncomeBand::UpTo5500 => IncomeBracket::From2500To5000,
            IncomeBand::UpTo8000 | IncomeBand::UpTo11000 => IncomeBracket::From5000To10000,
            IncomeBand::UpTo13000
            | IncomeBand::UpTo16000
            | IncomeBand::UpTo18500
            | IncomeBand::UpTo21000 => IncomeBracket::From10000To20000,
            IncomeBand::UpTo24500 | IncomeBand::UpTo28000 | IncomeBand::Over28000 => {
                IncomeBracket::Over20000
            }
        }
    }
}

/// Bands are upper-inclusive: 1500 is still in the first band.
pub fn income_band(value: u32) -> IncomeBand {
    INCOME_BANDS
        .iter()
        .find(|(_, upper, _)| value <= *upper)
        .map(|(b, _, _)| *b)
        .unwrap_or(IncomeBand::Over28000)
}

pub fn macro_bracket_for_band(label: &str) -> Option<IncomeBracket> {
    IncomeBand::from_label(label).map(|b| b.macro_bracket())
}

/// Best-effort macro bracket from a free-text income answer.
pub fn income_bracket_for_text(text: &str) -> Option<IncomeBracket> {
    if let Some(b) = IncomeBracket::from_label(text) {
        return Some(b);
    }
    if let Some(b) = macro_bracket_for_band(text) {
        return Some(b);
    }
    income_estimate(text).map(|v| income_band(v).macro_bracket())
}

// ********* Location ***********

pub fn region_for_state(uf: &str) -> Option<Region> {
    match uf.trim().to_uppercase().as_str() {
        "AC" | "AP" | "AM" | "PA" | "RO" | "RR" | "TO" => Some(Region::Norte),
        "AL" | "BA" | "CE" | "MA" | "PB" | "PE" | "PI" | "RN" | "SE" => Some(Region::Nordeste),
        "DF" | "GO" | "MT" | "MS" => Some(Region::CentroOeste),
        "ES" | "MG" | "RJ" | "SP" => Some(Region::Sudeste),
        "PR" | "RS" | "SC" => Some(Region::Sul),
        _ => None,
    }
}

const STATE_CAPITALS: [&str; 27] = [
    "ARACAJU",
    "BELEM",
    "BELO HORIZONTE",
    "BOA VISTA",
    "BRASILIA",
    "CAMPO GRANDE",
    "CUIABA",
    "CURITIBA",
    "FLORIANOPOLIS",
    "FORTALEZA",
    "GOIANIA",
    "JOAO PESSOA",
    "MACAPA",
    "MACEIO",
    "MANAUS",
    "NATAL",
    "PALMAS",
    "PORTO ALEGRE",
    "PORTO VELHO",
    "RECIFE",
    "RIO BRANCO",
    "RIO DE JANEIRO",
    "SALVADOR",
    "SAO LUIS",
    "SAO PAULO",
    "TERESINA",
    "VITORIA",
];

/// `"São Paulo - SP"` becomes `"SAO PAULO"`.
pub fn normalize_city(city: &str) -> String {
    let name = city.split(" - ").next().unwrap_or("");
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
        .trim()
        .to_string()
}

/// A state capital is `Capital`, any other named city is `Interior`.
pub fn locality_for_city(city: &str) -> Option<Locality> {
    let normalized = normalize_city(city);
    if normalized.is_empty() {
        None
    } else if STATE_CAPITALS.contains(&normalized.as_str()) {
        Some(Locality::Capital)
    } else {
        Some(Locality::Interior)
    }
}

// ********* Column names ***********

/// Maps the many spellings of a question to its canonical code.
///
/// ```
/// use quota_sampling::standardize::ColumnCatalog;
///
/// let catalog = ColumnCatalog::default();
/// assert_eq!(catalog.resolve("Qual é a sua idade?"), "FE2P5");
/// assert_eq!(catalog.resolve(" FE2P3 "), "FE2P3");
/// assert_eq!(catalog.resolve("Latitude"), "Latitude");
/// ```
#[derive(Debug, Clone)]
pub struct ColumnCatalog {
    codes: HashSet<String>,
    // Lowercased alias -> code.
    aliases: HashMap<String, String>,
}

impl ColumnCatalog {
    /// Builds a catalog from `(code, aliases)` entries. When the same alias is
    /// listed under two codes, the last one wins.
    pub fn new(entries: &[(&str, &[&str])]) -> ColumnCatalog {
        let mut codes: HashSet<String> = HashSet::new();
        let mut aliases: HashMap<String, String> = HashMap::new();
        for (code, texts) in entries.iter() {
            codes.insert(code.to_string());
            for text in texts.iter() {
                let clean = text.trim().to_lowercase();
                if !clean.is_empty() {
                    aliases.insert(clean, code.to_string());
                }
            }
        }
        ColumnCatalog { codes, aliases }
    }

    /// The canonical code of a raw column name, if the catalog knows it.
    pub fn canonical(&self, raw: &str) -> Option<&str> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(code) = self.codes.get(trimmed) {
            return Some(code.as_str());
        }
        self.aliases
            .get(&trimmed.to_lowercase())
            .map(|c| c.as_str())
    }

    /// The canonical code, or the trimmed raw name when unknown.
    pub fn resolve(&self, raw: &str) -> String {
        match self.canonical(raw) {
            Some(code) => code.to_string(),
            None => raw.trim().to_string(),
        }
    }

    /// Resolves a whole header. Also returns the canonical codes that matched.
    pub fn resolve_all(&self, raw: &[String]) -> (Vec<String>, BTreeSet<String>) {
        let mut matched: BTreeSet<String> = BTreeSet::new();
        let resolved: Vec<String> = raw
            .iter()
            .map(|r| match self.canonical(r) {
                Some(code) => {
                    matched.insert(code.to_string());
                    code.to_string()
                }
                None => r.trim().to_string(),
            })
            .collect();
        (resolved, matched)
    }
}

const DEFAULT_QUESTIONS: [(&str, &[&str]); 8] = [
    ("Código", &["Código"]),
    (
        "FE2P3",
        &[
            "P1",
            "FE2P3",
            "Qual o seu Gênero?",
            "Gênero: (SOMENTE REGISTRAR)",
            "Gênero (anotar):",
            "Gênero (apenas anotar)",
        ],
    ),
    (
        "FE2P5",
        &[
            "P2.1",
            "FE2P5",
            "Qual é a sua idade?",
            "Qual sua idade por gentileza?",
            "Quantos anos o(a) Sr(a) tem? (RU e Espontânea)",
        ],
    ),
    (
        "FE2P6",
        &[
            "P2.2",
            "FE2P6",
            "Faixa etária: (SOMENTE REGISTRAR)",
            "Faixa etária (SOMENTE ANOTAR)",
            "Idade (anotar)",
            "Apenas anotar de acordo com a idade do entrevistado?",
        ],
    ),
    (
        "FE2P7",
        &[
            "E2.1",
            "FE2P7",
            "Em qual cidade você mora?",
            "Antes de iniciar a pesquisa, o(a) Sr(a) poderia dizer qual CIDADE que o(a) Sr(a) mora?",
            "Mora em qual cidade?",
            "Em que estado/capital o(a) Sr(a) mora?",
        ],
    ),
    (
        "FE2P10",
        &[
            "P3",
            "FE2P1068",
            "FE2P10",
            "Qual a sua renda familiar aproximada? (CONSIDERANDO A SOMA DE TODOS DA CASA JUNTOS)",
            "Somando todos na sua casa, em qual dessas faixas se encaixa melhor a sua renda familiar mensal? (RM e Estimulada)",
        ],
    ),
    (
        "IC4P30",
        &[
            "I1",
            "IC4P30",
            "Sobre intenção de comprar um imóvel nos próximos 2 anos, ou seja, em 24 meses, você diria que: RU e ESTIMULADA",
            "Você tem intenção de comprar um IMÓVEL ENTRE 2022 e 2024? (RU e estimulada)",
            "ICE32P363",
        ],
    ),
    (
        "IC4P32",
        &[
            "I2",
            "IC4P32",
            "Você pensa em fechar negócio em até quantos meses? RU e estimulada",
            "Você pretende comprar este imóvel em até quanto tempo? RU e ESTIMULADA",
            "ICE32P364",
        ],
    ),
];

impl Default for ColumnCatalog {
    fn default() -> Self {
        ColumnCatalog::new(&DEFAULT_QUESTIONS)
    }
}
