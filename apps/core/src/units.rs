use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    NoSuchConversion { from: String, to: String },
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSuchConversion { from, to } => {
                write!(f, "no conversion from '{from}' to '{to}'")
            }
        }
    }
}

impl std::error::Error for ConversionError {}

#[derive(Debug, Clone, Copy)]
pub enum ConversionRule {
    Scale(f64),
    Transform(fn(f64) -> f64),
}

impl ConversionRule {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Scale(factor) => value * factor,
            Self::Transform(transform) => transform(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitCategory {
    pub name: &'static str,
    rules: HashMap<&'static str, HashMap<&'static str, ConversionRule>>,
}

impl UnitCategory {
    pub fn rule(&self, from: &str, to: &str) -> Option<ConversionRule> {
        self.rules.get(from)?.get(to).copied()
    }

    fn linear(name: &'static str, base_factors: &[(&'static str, f64)]) -> Self {
        let mut rules = HashMap::new();
        for (from, from_factor) in base_factors {
            let targets: HashMap<&'static str, ConversionRule> = base_factors
                .iter()
                .filter(|(to, _)| to != from)
                .map(|(to, to_factor)| (*to, ConversionRule::Scale(from_factor / to_factor)))
                .collect();
            rules.insert(*from, targets);
        }
        Self { name, rules }
    }

    fn with_rules(
        name: &'static str,
        entries: &[(&'static str, &'static str, ConversionRule)],
    ) -> Self {
        let mut rules: HashMap<&'static str, HashMap<&'static str, ConversionRule>> =
            HashMap::new();
        for (from, to, rule) in entries {
            rules.entry(*from).or_default().insert(*to, *rule);
        }
        Self { name, rules }
    }
}

/// Categorised conversion rules, scanned in declaration order.
#[derive(Debug, Clone)]
pub struct UnitTable {
    categories: Vec<UnitCategory>,
}

impl UnitTable {
    pub fn builtin() -> &'static UnitTable {
        static TABLE: OnceLock<UnitTable> = OnceLock::new();
        TABLE.get_or_init(build_builtin_table)
    }

    pub fn categories(&self) -> &[UnitCategory] {
        &self.categories
    }

    pub fn convert(&self, value: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
        let rule = self
            .categories
            .iter()
            .find_map(|category| category.rule(from, to))
            .ok_or_else(|| ConversionError::NoSuchConversion {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        Ok(round_to_millis(rule.apply(value)))
    }
}

pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
    UnitTable::builtin().convert(value, from, to)
}

/// Renders a converted value the way the result slot shows it, e.g. `32.0 fahrenheit`.
pub fn format_quantity(value: f64, unit: &str) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1} {unit}")
    } else {
        format!("{value} {unit}")
    }
}

fn round_to_millis(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn build_builtin_table() -> UnitTable {
    let categories = vec![
        UnitCategory::linear(
            "length",
            &[
                ("km", 1000.0),
                ("m", 1.0),
                ("cm", 0.01),
                ("mm", 0.001),
                ("mi", 1609.344),
                ("yd", 0.9144),
                ("ft", 0.3048),
                ("in", 0.0254),
                ("nmi", 1852.0),
            ],
        ),
        UnitCategory::linear(
            "mass",
            &[
                ("t", 1_000_000.0),
                ("kg", 1000.0),
                ("g", 1.0),
                ("mg", 0.001),
                ("lb", 453.592_37),
                ("oz", 28.349_523_125),
                ("st", 6350.293_18),
            ],
        ),
        UnitCategory::linear(
            "volume",
            &[
                ("m3", 1000.0),
                ("l", 1.0),
                ("dl", 0.1),
                ("cl", 0.01),
                ("ml", 0.001),
                ("gal", 3.785_411_784),
                ("qt", 0.946_352_946),
                ("pt", 0.473_176_473),
                ("cup", 0.236_588_236_5),
                ("floz", 0.029_573_529_562_5),
            ],
        ),
        UnitCategory::linear(
            "time",
            &[
                ("w", 604_800.0),
                ("d", 86_400.0),
                ("h", 3600.0),
                ("min", 60.0),
                ("s", 1.0),
                ("ms", 0.001),
            ],
        ),
        UnitCategory::linear(
            "data",
            &[
                ("tb", 1e12),
                ("gb", 1e9),
                ("mb", 1e6),
                ("kb", 1e3),
                ("b", 1.0),
                ("tib", 1_099_511_627_776.0),
                ("gib", 1_073_741_824.0),
                ("mib", 1_048_576.0),
                ("kib", 1024.0),
            ],
        ),
        UnitCategory::linear(
            "speed",
            &[
                ("mps", 1.0),
                ("kmh", 1000.0 / 3600.0),
                ("mph", 1609.344 / 3600.0),
                ("kn", 1852.0 / 3600.0),
            ],
        ),
        UnitCategory::with_rules(
            "temperature",
            &[
                ("celsius", "fahrenheit", ConversionRule::Transform(|c| c * 9.0 / 5.0 + 32.0)),
                ("celsius", "kelvin", ConversionRule::Transform(|c| c + 273.15)),
                ("fahrenheit", "celsius", ConversionRule::Transform(|f| (f - 32.0) * 5.0 / 9.0)),
                (
                    "fahrenheit",
                    "kelvin",
                    ConversionRule::Transform(|f| (f - 32.0) * 5.0 / 9.0 + 273.15),
                ),
                ("kelvin", "celsius", ConversionRule::Transform(|k| k - 273.15)),
                (
                    "kelvin",
                    "fahrenheit",
                    ConversionRule::Transform(|k| (k - 273.15) * 9.0 / 5.0 + 32.0),
                ),
            ],
        ),
    ];
    UnitTable { categories }
}
