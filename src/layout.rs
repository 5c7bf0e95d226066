//! Packing plans shared by the decode and encode sides of every entity.
//!
//! Method fields pack consecutive `bit` fields LSB-first into octets (eight
//! per octet, a run never crosses a non-bit field). Property fields each own
//! one bit of the 16-bit flags word, MSB-first from bit 15 down to bit 1.

use crate::schema::{check_property_capacity, Class, Field, SchemaError, MAX_PROPERTY_FIELDS};
use tracing::debug;

/// Bits per packed octet in a method's boolean run.
pub const BITS_PER_OCTET: u8 = 8;

/// Flag bit of the first declared property field.
pub const FIRST_PROPERTY_BIT: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStep {
    /// Field read/written through its type's scalar codec. For properties,
    /// `presence` is the flag bit guarding the payload.
    Scalar { field: usize, presence: Option<u8> },
    /// Field stored in bit `bit` of packed word `word` (method octet number,
    /// or 0 for the property flags word).
    Bit { field: usize, word: usize, bit: u8 },
    /// End of a packed octet: the pending bits are written as one octet.
    Flush,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub steps: Vec<LayoutStep>,
    /// Packed octets (methods) or flag words (properties).
    pub words: usize,
}

impl Layout {
    pub fn bits(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.steps.iter().filter_map(|s| match *s {
            LayoutStep::Bit { field, word, bit } => Some((field, word, bit)),
            _ => None,
        })
    }
}

/// Plan a method's positional fields.
pub fn plan_method(fields: &[Field]) -> Layout {
    let mut steps = Vec::with_capacity(fields.len() + 1);
    let mut word = 0usize;
    let mut pending = 0u8;
    for (i, f) in fields.iter().enumerate() {
        if f.is_bit() {
            if pending == BITS_PER_OCTET {
                steps.push(LayoutStep::Flush);
                word += 1;
                pending = 0;
            }
            steps.push(LayoutStep::Bit { field: i, word, bit: pending });
            pending += 1;
        } else {
            if pending > 0 {
                steps.push(LayoutStep::Flush);
                word += 1;
                pending = 0;
            }
            steps.push(LayoutStep::Scalar { field: i, presence: None });
        }
    }
    if pending > 0 {
        steps.push(LayoutStep::Flush);
        word += 1;
    }
    Layout { steps, words: word }
}

/// Plan a class's property fields against the single flags word.
pub fn plan_properties(class: &Class) -> Result<Layout, SchemaError> {
    check_property_capacity(class)?;
    debug_assert!(class.fields.len() <= MAX_PROPERTY_FIELDS);
    let steps = class
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let bit = FIRST_PROPERTY_BIT - i as u8;
            if f.is_bit() {
                LayoutStep::Bit { field: i, word: 0, bit }
            } else {
                LayoutStep::Scalar { field: i, presence: Some(bit) }
            }
        })
        .collect::<Vec<_>>();
    debug!(class = %class.name, fields = steps.len(), "planned property flags");
    Ok(Layout { steps, words: 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: &str) -> Field {
        Field { name: name.to_string(), ty: ty.to_string(), reserved: false }
    }

    fn bits(n: usize) -> Vec<Field> {
        (0..n).map(|i| field(&format!("b{}", i), "bit")).collect()
    }

    #[test]
    fn nine_bits_then_scalar_uses_two_octets() {
        let mut fields = bits(9);
        fields.push(field("x", "octet"));
        let layout = plan_method(&fields);
        assert_eq!(layout.words, 2);
        let placed: Vec<_> = layout.bits().map(|(_, w, b)| (w, b)).collect();
        assert_eq!(placed[7], (0, 7));
        assert_eq!(placed[8], (1, 0));
        assert_eq!(layout.steps[8], LayoutStep::Flush);
        assert_eq!(layout.steps[10], LayoutStep::Flush);
        assert_eq!(layout.steps[11], LayoutStep::Scalar { field: 9, presence: None });
    }

    #[test]
    fn run_is_flushed_before_scalar() {
        let fields = vec![field("a", "bit"), field("s", "shortstr"), field("b", "bit")];
        let layout = plan_method(&fields);
        assert_eq!(
            layout.steps,
            vec![
                LayoutStep::Bit { field: 0, word: 0, bit: 0 },
                LayoutStep::Flush,
                LayoutStep::Scalar { field: 1, presence: None },
                LayoutStep::Bit { field: 2, word: 1, bit: 0 },
                LayoutStep::Flush,
            ]
        );
        assert_eq!(layout.words, 2);
    }

    #[test]
    fn no_bits_no_words() {
        let layout = plan_method(&[field("a", "short"), field("b", "long")]);
        assert_eq!(layout.words, 0);
        assert!(!layout.steps.contains(&LayoutStep::Flush));
    }

    #[test]
    fn reserved_bit_keeps_its_position() {
        let mut fields = bits(3);
        fields[1].reserved = true;
        let layout = plan_method(&fields);
        let placed: Vec<_> = layout.bits().collect();
        assert_eq!(placed, vec![(0, 0, 0), (1, 0, 1), (2, 0, 2)]);
    }

    #[test]
    fn properties_are_msb_first() {
        let class = Class {
            index: 60,
            name: "basic".to_string(),
            fields: vec![field("a", "shortstr"), field("flag", "bit"), field("c", "octet")],
            methods: Vec::new(),
        };
        let layout = plan_properties(&class).expect("plan");
        assert_eq!(
            layout.steps,
            vec![
                LayoutStep::Scalar { field: 0, presence: Some(15) },
                LayoutStep::Bit { field: 1, word: 0, bit: 14 },
                LayoutStep::Scalar { field: 2, presence: Some(13) },
            ]
        );
    }

    #[test]
    fn fifteen_properties_end_at_bit_one() {
        let class = Class {
            index: 1,
            name: "wide".to_string(),
            fields: (0..15).map(|i| field(&format!("f{}", i), "octet")).collect(),
            methods: Vec::new(),
        };
        let layout = plan_properties(&class).expect("plan");
        assert_eq!(layout.steps.last(), Some(&LayoutStep::Scalar { field: 14, presence: Some(1) }));
    }

    #[test]
    fn sixteen_properties_rejected() {
        let class = Class {
            index: 1,
            name: "too-wide".to_string(),
            fields: (0..16).map(|i| field(&format!("f{}", i), "octet")).collect(),
            methods: Vec::new(),
        };
        assert!(matches!(
            plan_properties(&class),
            Err(SchemaError::TooManyProperties { count: 16, .. })
        ));
    }
}
