//! Physical quantities tagged with a dimension that is only known at runtime.
//!
//! Items declare what they need and what they produce as lists of [`Quantity`]s (e.g. `45 psi`,
//! `9.75 m^3/h`). Quantities expressed in different units of the same physical dimension (e.g.
//! `kW` and `W`) are interchangeable, so matching between producers and consumers is done on the
//! canonical [`Dimension`] rather than on the unit.
use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Names of the SI base dimensions, in the order they are stored in a [`Dimension`]
const BASE_DIMENSION_NAMES: [&str; 7] = [
    "length",
    "mass",
    "time",
    "current",
    "temperature",
    "amount",
    "luminosity",
];

/// The physical dimension of a quantity, as exponents of the SI base dimensions.
///
/// This is the key used to match produced quantities against required ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Dimension([i8; 7]);

impl Dimension {
    /// A pure number
    pub const DIMENSIONLESS: Dimension = Dimension([0, 0, 0, 0, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const LENGTH: Dimension = Dimension([1, 0, 0, 0, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const MASS: Dimension = Dimension([0, 1, 0, 0, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const TIME: Dimension = Dimension([0, 0, 1, 0, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const CURRENT: Dimension = Dimension([0, 0, 0, 1, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const TEMPERATURE: Dimension = Dimension([0, 0, 0, 0, 1, 0, 0]);
    #[allow(missing_docs)]
    pub const AMOUNT: Dimension = Dimension([0, 0, 0, 0, 0, 1, 0]);
    #[allow(missing_docs)]
    pub const LUMINOSITY: Dimension = Dimension([0, 0, 0, 0, 0, 0, 1]);
    /// Energy per unit time (e.g. kW)
    pub const POWER: Dimension = Dimension([2, 1, -3, 0, 0, 0, 0]);
    /// e.g. kWh, J
    pub const ENERGY: Dimension = Dimension([2, 1, -2, 0, 0, 0, 0]);
    /// Force per unit area (e.g. psi, bar)
    pub const PRESSURE: Dimension = Dimension([-1, 1, -2, 0, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const FORCE: Dimension = Dimension([1, 1, -2, 0, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const VOLUME: Dimension = Dimension([3, 0, 0, 0, 0, 0, 0]);
    /// Volume per unit time (e.g. m^3/h)
    pub const VOLUMETRIC_FLOW: Dimension = Dimension([3, 0, -1, 0, 0, 0, 0]);
    /// Mass per unit time (e.g. kg/s)
    pub const MASS_FLOW: Dimension = Dimension([0, 1, -1, 0, 0, 0, 0]);
    #[allow(missing_docs)]
    pub const VELOCITY: Dimension = Dimension([1, 0, -1, 0, 0, 0, 0]);

    /// Raise the dimension to an integer power, or `None` if an exponent overflows
    pub fn checked_powi(self, exponent: i8) -> Option<Dimension> {
        let mut exponents = [0; 7];
        for (out, base) in exponents.iter_mut().zip(self.0) {
            *out = base.checked_mul(exponent)?;
        }
        Some(Dimension(exponents))
    }

    /// The dimension of the product of two quantities, or `None` if an exponent overflows
    pub fn checked_mul(self, rhs: Dimension) -> Option<Dimension> {
        let mut exponents = [0; 7];
        for ((out, lhs), rhs) in exponents.iter_mut().zip(self.0).zip(rhs.0) {
            *out = lhs.checked_add(rhs)?;
        }
        Some(Dimension(exponents))
    }

    /// The dimension of the quotient of two quantities, or `None` if an exponent overflows
    pub fn checked_div(self, rhs: Dimension) -> Option<Dimension> {
        self.checked_mul(rhs.checked_powi(-1)?)
    }

    /// The conventional name of this dimension, if it has one
    pub fn name(self) -> Option<&'static str> {
        NAMED_DIMENSIONS
            .iter()
            .find(|(dimension, _)| *dimension == self)
            .map(|(_, name)| *name)
    }
}

/// Dimensions with conventional names, used when displaying diagnostics
const NAMED_DIMENSIONS: [(Dimension, &str); 16] = [
    (Dimension::DIMENSIONLESS, "dimensionless"),
    (Dimension::LENGTH, "length"),
    (Dimension::MASS, "mass"),
    (Dimension::TIME, "time"),
    (Dimension::CURRENT, "current"),
    (Dimension::TEMPERATURE, "temperature"),
    (Dimension::AMOUNT, "amount"),
    (Dimension::LUMINOSITY, "luminosity"),
    (Dimension::POWER, "power"),
    (Dimension::ENERGY, "energy"),
    (Dimension::PRESSURE, "pressure"),
    (Dimension::FORCE, "force"),
    (Dimension::VOLUME, "volume"),
    (Dimension::VOLUMETRIC_FLOW, "volumetric flow"),
    (Dimension::MASS_FLOW, "mass flow"),
    (Dimension::VELOCITY, "velocity"),
];

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return write!(f, "{name}");
        }

        let mut first = true;
        for (name, exponent) in BASE_DIMENSION_NAMES.iter().zip(self.0) {
            if exponent == 0 {
                continue;
            }
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if exponent == 1 {
                write!(f, "{name}")?;
            } else {
                write!(f, "{name}^{exponent}")?;
            }
        }

        Ok(())
    }
}

/// Look up a single unit symbol, returning its factor to SI base units and its dimension
fn lookup_symbol(symbol: &str) -> Option<(f64, Dimension)> {
    use Dimension as D;

    let unit = match symbol {
        // Length
        "m" => (1.0, D::LENGTH),
        "km" => (1e3, D::LENGTH),
        "cm" => (1e-2, D::LENGTH),
        "mm" => (1e-3, D::LENGTH),
        "ft" => (0.3048, D::LENGTH),
        "in" => (0.0254, D::LENGTH),
        // Mass
        "kg" => (1.0, D::MASS),
        "g" => (1e-3, D::MASS),
        "t" => (1e3, D::MASS),
        "lb" => (0.453_592_37, D::MASS),
        // Time
        "s" => (1.0, D::TIME),
        "min" => (60.0, D::TIME),
        "h" | "hr" | "hour" => (3600.0, D::TIME),
        "d" | "day" => (86_400.0, D::TIME),
        // Other base units
        "A" => (1.0, D::CURRENT),
        "K" => (1.0, D::TEMPERATURE),
        "mol" => (1.0, D::AMOUNT),
        "cd" => (1.0, D::LUMINOSITY),
        // Volume
        "L" | "l" => (1e-3, D::VOLUME),
        "mL" => (1e-6, D::VOLUME),
        "gal" => (3.785_411_784e-3, D::VOLUME),
        // Force
        "N" => (1.0, D::FORCE),
        "kN" => (1e3, D::FORCE),
        // Power
        "W" => (1.0, D::POWER),
        "kW" => (1e3, D::POWER),
        "MW" => (1e6, D::POWER),
        "GW" => (1e9, D::POWER),
        "hp" => (745.699_871_582_270_2, D::POWER),
        // Energy
        "J" => (1.0, D::ENERGY),
        "kJ" => (1e3, D::ENERGY),
        "MJ" => (1e6, D::ENERGY),
        "GJ" => (1e9, D::ENERGY),
        "Wh" => (3.6e3, D::ENERGY),
        "kWh" => (3.6e6, D::ENERGY),
        "MWh" => (3.6e9, D::ENERGY),
        // Pressure
        "Pa" => (1.0, D::PRESSURE),
        "kPa" => (1e3, D::PRESSURE),
        "MPa" => (1e6, D::PRESSURE),
        "mbar" => (1e2, D::PRESSURE),
        "bar" => (1e5, D::PRESSURE),
        "atm" => (101_325.0, D::PRESSURE),
        "psi" => (6_894.757_293_168_361, D::PRESSURE),
        _ => return None,
    };

    Some(unit)
}

/// Error raised when combining unit terms overflows a dimension exponent
const EXPONENT_OUT_OF_RANGE: &str = "Unit exponent out of range";

/// Parse a single term of a unit expression (e.g. `m^3`)
fn parse_unit_term(term: &str) -> Result<(f64, Dimension)> {
    let (symbol, exponent) = match term.split_once('^') {
        Some((symbol, exponent)) => {
            let exponent = exponent
                .trim()
                .parse::<i8>()
                .with_context(|| format!("Invalid exponent in unit term: {term}"))?;
            (symbol.trim(), exponent)
        }
        None => (term, 1),
    };
    ensure!(!symbol.is_empty(), "Empty unit term");

    let Some((factor, dimension)) = lookup_symbol(symbol) else {
        bail!("Unknown unit symbol: {symbol}");
    };

    let dimension = dimension
        .checked_powi(exponent)
        .context(EXPONENT_OUT_OF_RANGE)?;

    Ok((factor.powi(i32::from(exponent)), dimension))
}

/// A unit of measurement: a symbol together with its scale and dimension
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    symbol: Rc<str>,
    factor: f64,
    dimension: Dimension,
}

impl Unit {
    /// The unit of a pure number
    pub fn dimensionless() -> Self {
        Self {
            symbol: "".into(),
            factor: 1.0,
            dimension: Dimension::DIMENSIONLESS,
        }
    }

    /// The symbol used to write this unit (e.g. `m^3/h`)
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The factor converting a value in this unit into SI base units
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// The physical dimension of this unit
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }
}

impl FromStr for Unit {
    type Err = anyhow::Error;

    /// Parse a unit expression made of known symbols joined by `*` and `/`, where each symbol may
    /// be raised to an integer power with `^` or `**` (e.g. `kW`, `m^3/h`, `L/min`).
    fn from_str(s: &str) -> Result<Self> {
        let expr = s.trim().replace("**", "^");
        if expr.is_empty() {
            return Ok(Unit::dimensionless());
        }

        let mut factor = 1.0;
        let mut dimension = Dimension::DIMENSIONLESS;
        let mut sign: i8 = 1;
        let mut rest = expr.as_str();
        loop {
            let end = rest.find(['*', '/']).unwrap_or(rest.len());
            let (term, tail) = rest.split_at(end);
            let (term_factor, term_dimension) =
                parse_unit_term(term.trim()).with_context(|| format!("Invalid unit: {expr}"))?;
            factor *= term_factor.powi(i32::from(sign));
            dimension = term_dimension
                .checked_powi(sign)
                .and_then(|term_dimension| dimension.checked_mul(term_dimension))
                .context(EXPONENT_OUT_OF_RANGE)
                .with_context(|| format!("Invalid unit: {expr}"))?;

            let mut chars = tail.chars();
            match chars.next() {
                None => break,
                Some('/') => sign = -1,
                Some(_) => sign = 1,
            }
            rest = chars.as_str();
        }

        Ok(Unit {
            symbol: expr.as_str().into(),
            factor,
            dimension,
        })
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A magnitude expressed in a particular [`Unit`].
///
/// Quantities can only be compared, added or subtracted when they share a [`Dimension`].
/// Equality and ordering compare the underlying SI magnitudes, so `1 kW == 1000 W`.
#[derive(Debug, Clone)]
pub struct Quantity {
    value: f64,
    unit: Unit,
}

impl Quantity {
    /// Create a new quantity from a magnitude and a unit
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// The magnitude, expressed in [`Quantity::unit`]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The unit the magnitude is expressed in
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// The canonical dimension of the quantity
    pub fn dimension(&self) -> Dimension {
        self.unit.dimension
    }

    /// The magnitude expressed in SI base units
    pub fn si_value(&self) -> f64 {
        self.value * self.unit.factor
    }

    /// Whether the magnitude is finite
    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }

    /// Check that `other` can be combined with `self`
    fn check_same_dimension(&self, other: &Quantity, operation: &str) -> Result<()> {
        ensure!(
            self.dimension() == other.dimension(),
            "Cannot {operation} quantities of different dimensions: {self} ({}) and {other} ({})",
            self.dimension(),
            other.dimension()
        );
        Ok(())
    }

    /// Express the quantity in a different unit of the same dimension
    pub fn to_unit(&self, unit: &Unit) -> Result<Quantity> {
        ensure!(
            self.dimension() == unit.dimension,
            "Cannot convert {self} ({}) to {unit} ({})",
            self.dimension(),
            unit.dimension
        );
        Ok(Quantity::new(self.si_value() / unit.factor, unit.clone()))
    }

    /// Add two quantities of the same dimension. The result is in the unit of `self`.
    pub fn try_add(&self, other: &Quantity) -> Result<Quantity> {
        self.check_same_dimension(other, "add")?;
        Ok(Quantity::new(
            self.value + other.si_value() / self.unit.factor,
            self.unit.clone(),
        ))
    }

    /// Subtract a quantity of the same dimension. The result is in the unit of `self`.
    pub fn try_sub(&self, other: &Quantity) -> Result<Quantity> {
        self.check_same_dimension(other, "subtract")?;
        Ok(Quantity::new(
            self.value - other.si_value() / self.unit.factor,
            self.unit.clone(),
        ))
    }

    /// The smaller of two quantities of the same dimension, keeping its own unit.
    ///
    /// On a tie, `self` is returned.
    pub fn try_min(&self, other: &Quantity) -> Result<Quantity> {
        self.check_same_dimension(other, "compare")?;
        if other.si_value() < self.si_value() {
            Ok(other.clone())
        } else {
            Ok(self.clone())
        }
    }

    /// The ratio `self / other` for quantities of the same dimension
    pub fn ratio(&self, other: &Quantity) -> Result<f64> {
        self.check_same_dimension(other, "divide")?;
        Ok(self.si_value() / other.si_value())
    }

    /// Multiply the magnitude by a plain number
    pub fn scale(&self, factor: f64) -> Quantity {
        Quantity::new(self.value * factor, self.unit.clone())
    }

    /// A zero quantity in the same unit
    pub fn zero_like(&self) -> Quantity {
        Quantity::new(0.0, self.unit.clone())
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.dimension() == other.dimension() && self.si_value() == other.si_value()
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.dimension() != other.dimension() {
            return None;
        }
        self.si_value().partial_cmp(&other.si_value())
    }
}

impl float_cmp::ApproxEq for &Quantity {
    type Margin = float_cmp::F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        self.dimension() == other.dimension()
            && self.si_value().approx_eq(other.si_value(), margin)
    }
}

impl FromStr for Quantity {
    type Err = anyhow::Error;

    /// Parse a quantity written as `<number> <unit>` (e.g. `9.75 m^3/h`). The unit may be omitted
    /// for dimensionless quantities.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (number, unit) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
        let value = number
            .parse::<f64>()
            .with_context(|| format!("Invalid quantity: {s}"))?;
        let unit = unit
            .parse::<Unit>()
            .with_context(|| format!("Invalid quantity: {s}"))?;

        Ok(Quantity::new(value, unit))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.symbol.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.unit)
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|err: anyhow::Error| serde::de::Error::custom(format!("{err:#}")))
    }
}

/// Parse a quantity, panicking on invalid input. Only for use with literals in tests.
#[cfg(test)]
pub fn q(s: &str) -> Quantity {
    s.parse().unwrap()
}
