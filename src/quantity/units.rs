use std::fmt;

/// Grams per unit for every supported mass unit.
const MASS_UNITS: &[(&str, f64)] = &[
    ("ug", 0.000_001),
    ("mg", 0.001),
    ("g", 1.0),
    ("kg", 1000.0),
    ("oz", 28.349_523_125),
    ("lb", 453.592_37),
];

/// Millilitres per unit for every supported volume unit.
const VOLUME_UNITS: &[(&str, f64)] = &[
    ("ml", 1.0),
    ("l", 1000.0),
    ("tsp", 4.928_921_6),
    ("tbsp", 14.786_764_8),
    ("cup", 236.588_236_5),
    ("floz", 29.573_529_6),
];

const PIECE_UNIT: &str = "pc";

// Spellings accepted on input, mapped to the canonical unit name.
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("gram", "g"),
    ("grams", "g"),
    ("milligram", "mg"),
    ("milligrams", "mg"),
    ("microgram", "ug"),
    ("micrograms", "ug"),
    ("µg", "ug"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("pound", "lb"),
    ("pounds", "lb"),
    ("lbs", "lb"),
    ("millilitre", "ml"),
    ("millilitres", "ml"),
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("litre", "l"),
    ("litres", "l"),
    ("liter", "l"),
    ("liters", "l"),
    ("teaspoon", "tsp"),
    ("teaspoons", "tsp"),
    ("tablespoon", "tbsp"),
    ("tablespoons", "tbsp"),
    ("cups", "cup"),
    ("fl_oz", "floz"),
    ("piece", "pc"),
    ("pieces", "pc"),
    ("pcs", "pc"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Mass,
    Volume,
    Piece,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Mass => write!(f, "mass"),
            UnitKind::Volume => write!(f, "volume"),
            UnitKind::Piece => write!(f, "piece"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuantityError {
    #[error("Unit not recognised: {0}")]
    UnknownUnit(String),

    #[error("Unit '{unit}' is a {found} unit, expected a {expected} unit")]
    UnitTypeMismatch {
        unit: String,
        expected: UnitKind,
        found: UnitKind,
    },

    #[error("Quantity must not be zero")]
    ZeroQuantity,

    #[error("Quantity must not be negative: {0}")]
    NegativeQuantity(f64),

    #[error("Quantity must be a finite number: {0}")]
    NonFiniteQuantity(f64),

    #[error("Converting between mass and volume requires a density (g/ml)")]
    MissingDensity,

    #[error("Converting to or from pieces requires a piece mass (g)")]
    MissingPieceMass,
}

/// Canonical lower-case name for `unit`, resolving spelled-out aliases.
pub fn normalise_unit(unit: &str) -> Result<String, QuantityError> {
    let cleaned = unit.trim().to_lowercase().replace([' ', '.'], "");
    if let Some((_, canonical)) = UNIT_ALIASES.iter().find(|(alias, _)| *alias == cleaned) {
        return Ok((*canonical).to_string());
    }
    unit_kind(&cleaned).map(|_| cleaned)
}

pub fn unit_kind(unit: &str) -> Result<UnitKind, QuantityError> {
    if MASS_UNITS.iter().any(|(name, _)| *name == unit) {
        Ok(UnitKind::Mass)
    } else if VOLUME_UNITS.iter().any(|(name, _)| *name == unit) {
        Ok(UnitKind::Volume)
    } else if unit == PIECE_UNIT {
        Ok(UnitKind::Piece)
    } else {
        Err(QuantityError::UnknownUnit(unit.to_string()))
    }
}

/// Rejects negative and non-finite quantities. Zero is accepted here; callers
/// that need a non-zero quantity check for it themselves.
pub fn validate_quantity(quantity: f64) -> Result<f64, QuantityError> {
    if !quantity.is_finite() {
        return Err(QuantityError::NonFiniteQuantity(quantity));
    }
    if quantity < 0.0 {
        return Err(QuantityError::NegativeQuantity(quantity));
    }
    Ok(quantity)
}

/// Normalises `unit` and checks that it measures mass.
pub fn validate_mass_unit(unit: &str) -> Result<String, QuantityError> {
    let unit = normalise_unit(unit)?;
    match unit_kind(&unit)? {
        UnitKind::Mass => Ok(unit),
        found => Err(QuantityError::UnitTypeMismatch {
            unit,
            expected: UnitKind::Mass,
            found,
        }),
    }
}

fn grams_per_mass_unit(unit: &str) -> Option<f64> {
    MASS_UNITS.iter().find(|(name, _)| *name == unit).map(|(_, g)| *g)
}

fn ml_per_volume_unit(unit: &str) -> Option<f64> {
    VOLUME_UNITS.iter().find(|(name, _)| *name == unit).map(|(_, ml)| *ml)
}

fn to_grams(
    quantity: f64,
    unit: &str,
    g_per_ml: Option<f64>,
    piece_mass_g: Option<f64>,
) -> Result<f64, QuantityError> {
    match unit_kind(unit)? {
        UnitKind::Mass => Ok(quantity * grams_per_mass_unit(unit).unwrap_or(1.0)),
        UnitKind::Volume => {
            let density = g_per_ml.ok_or(QuantityError::MissingDensity)?;
            Ok(quantity * ml_per_volume_unit(unit).unwrap_or(1.0) * density)
        }
        UnitKind::Piece => {
            let piece_mass = piece_mass_g.ok_or(QuantityError::MissingPieceMass)?;
            Ok(quantity * piece_mass)
        }
    }
}

fn from_grams(
    grams: f64,
    unit: &str,
    g_per_ml: Option<f64>,
    piece_mass_g: Option<f64>,
) -> Result<f64, QuantityError> {
    match unit_kind(unit)? {
        UnitKind::Mass => Ok(grams / grams_per_mass_unit(unit).unwrap_or(1.0)),
        UnitKind::Volume => {
            let density = g_per_ml.ok_or(QuantityError::MissingDensity)?;
            Ok(grams / density / ml_per_volume_unit(unit).unwrap_or(1.0))
        }
        UnitKind::Piece => {
            let piece_mass = piece_mass_g.ok_or(QuantityError::MissingPieceMass)?;
            Ok(grams / piece_mass)
        }
    }
}

/// Converts `quantity` from `from_unit` to `to_unit`.
///
/// Conversions within one unit kind never need bulk properties. Crossing
/// between mass and volume needs `g_per_ml`, crossing to or from pieces needs
/// `piece_mass_g` (and volume to pieces needs both).
pub fn convert(
    quantity: f64,
    from_unit: &str,
    to_unit: &str,
    g_per_ml: Option<f64>,
    piece_mass_g: Option<f64>,
) -> Result<f64, QuantityError> {
    let quantity = validate_quantity(quantity)?;
    let from_unit = normalise_unit(from_unit)?;
    let to_unit = normalise_unit(to_unit)?;

    let converted = if from_unit == to_unit {
        quantity
    } else if let (UnitKind::Volume, UnitKind::Volume) = (unit_kind(&from_unit)?, unit_kind(&to_unit)?) {
        let ml = quantity * ml_per_volume_unit(&from_unit).unwrap_or(1.0);
        ml / ml_per_volume_unit(&to_unit).unwrap_or(1.0)
    } else {
        let grams = to_grams(quantity, &from_unit, g_per_ml, piece_mass_g)?;
        from_grams(grams, &to_unit, g_per_ml, piece_mass_g)?
    };

    // Huge inputs can overflow during scaling.
    if !converted.is_finite() {
        return Err(QuantityError::NonFiniteQuantity(converted));
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalise_unit_aliases() {
        assert_eq!(normalise_unit(" Grams ").unwrap(), "g");
        assert_eq!(normalise_unit("Tbsp").unwrap(), "tbsp");
        assert_eq!(normalise_unit("fl oz").unwrap(), "floz");
        assert!(matches!(normalise_unit("handful"), Err(QuantityError::UnknownUnit(_))));
    }

    #[test]
    fn test_validate_mass_unit_rejects_volume() {
        assert_eq!(validate_mass_unit("mg").unwrap(), "mg");
        let err = validate_mass_unit("ml").unwrap_err();
        assert!(matches!(
            err,
            QuantityError::UnitTypeMismatch { expected: UnitKind::Mass, found: UnitKind::Volume, .. }
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(0.0).unwrap(), 0.0);
        assert!(matches!(validate_quantity(-1.0), Err(QuantityError::NegativeQuantity(_))));
        assert!(matches!(validate_quantity(f64::NAN), Err(QuantityError::NonFiniteQuantity(_))));
    }

    #[test]
    fn test_convert_within_mass() {
        assert!(approx(convert(1.0, "kg", "g", None, None).unwrap(), 1000.0));
        assert!(approx(convert(500.0, "mg", "g", None, None).unwrap(), 0.5));
    }

    #[test]
    fn test_convert_within_volume_needs_no_density() {
        assert!(approx(convert(1.0, "l", "ml", None, None).unwrap(), 1000.0));
    }

    #[test]
    fn test_convert_volume_to_mass_uses_density() {
        assert!(approx(convert(100.0, "ml", "g", Some(1.03), None).unwrap(), 103.0));
        assert_eq!(
            convert(100.0, "ml", "g", None, None).unwrap_err(),
            QuantityError::MissingDensity
        );
    }

    #[test]
    fn test_convert_rejects_overflow() {
        assert!(matches!(
            convert(1e306, "kg", "g", None, None),
            Err(QuantityError::NonFiniteQuantity(_))
        ));
        assert!(matches!(
            convert(f64::MAX, "l", "ml", None, None),
            Err(QuantityError::NonFiniteQuantity(_))
        ));
        assert!(approx(convert(1e300, "kg", "kg", None, None).unwrap() / 1e300, 1.0));
    }

    #[test]
    fn test_convert_pieces() {
        assert!(approx(convert(2.0, "pc", "g", None, Some(50.0)).unwrap(), 100.0));
        assert!(approx(convert(100.0, "g", "pc", None, Some(50.0)).unwrap(), 2.0));
        assert_eq!(
            convert(1.0, "pc", "g", None, None).unwrap_err(),
            QuantityError::MissingPieceMass
        );
    }
}
