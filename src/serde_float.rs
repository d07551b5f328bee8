//! Serde adapters for float fields of trace types.
//!
//! JSON has no literal for NaN or infinity (serde_json writes `null` and
//! refuses to read it back), yet diverging runs put exactly those values in
//! the trace. Finite values are written as plain numbers; non-finite ones as
//! the strings `"NaN"`, `"inf"` and `"-inf"`.
//!
//! Used through `#[serde(with = "crate::serde_float::<shape>")]`, one module
//! per field shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::float::Float;

const NAN: &str = "NaN";
const INF: &str = "inf";
const NEG_INF: &str = "-inf";

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Encoded {
    Finite(f64),
    Special(String),
}

fn encode<F: Float>(v: F) -> Encoded {
    let x = v.to_f64().unwrap_or(f64::NAN);
    if x.is_finite() {
        Encoded::Finite(x)
    } else if x.is_nan() {
        Encoded::Special(NAN.to_owned())
    } else if x > 0.0 {
        Encoded::Special(INF.to_owned())
    } else {
        Encoded::Special(NEG_INF.to_owned())
    }
}

fn decode<F: Float, E: serde::de::Error>(e: Encoded) -> Result<F, E> {
    match e {
        Encoded::Finite(x) => {
            F::from_f64(x).ok_or_else(|| E::custom(format!("{x} is not representable")))
        }
        Encoded::Special(s) => match s.as_str() {
            NAN => Ok(F::nan()),
            INF => Ok(F::infinity()),
            NEG_INF => Ok(F::neg_infinity()),
            other => Err(E::custom(format!(
                "expected a number, \"NaN\", \"inf\" or \"-inf\", found \"{other}\""
            ))),
        },
    }
}

/// `F`.
pub(crate) mod scalar {
    use super::*;

    pub(crate) fn serialize<F: Float, S: Serializer>(v: &F, s: S) -> Result<S::Ok, S::Error> {
        encode(*v).serialize(s)
    }

    pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(d: D) -> Result<F, D::Error> {
        decode(Encoded::deserialize(d)?)
    }
}

/// `Vec<F>`.
pub(crate) mod vector {
    use super::*;

    pub(crate) fn serialize<F: Float, S: Serializer>(v: &[F], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(|&x| encode(x)))
    }

    pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<F>, D::Error> {
        Vec::<Encoded>::deserialize(d)?
            .into_iter()
            .map(decode)
            .collect()
    }
}

/// `Vec<Vec<F>>`.
pub(crate) mod matrix {
    use super::*;

    pub(crate) fn serialize<F: Float, S: Serializer>(
        m: &[Vec<F>],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_seq(
            m.iter()
                .map(|row| row.iter().map(|&x| encode(x)).collect::<Vec<_>>()),
        )
    }

    pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<Vec<F>>, D::Error> {
        Vec::<Vec<Encoded>>::deserialize(d)?
            .into_iter()
            .map(|row| row.into_iter().map(decode).collect())
            .collect()
    }
}

/// `Option<F>`.
pub(crate) mod option {
    use super::*;

    pub(crate) fn serialize<F: Float, S: Serializer>(
        v: &Option<F>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        (*v).map(encode).serialize(s)
    }

    pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<F>, D::Error> {
        Option::<Encoded>::deserialize(d)?.map(decode).transpose()
    }
}

/// `Option<Vec<F>>`.
pub(crate) mod option_vec {
    use super::*;

    pub(crate) fn serialize<F: Float, S: Serializer>(
        v: &Option<Vec<F>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        v.as_ref()
            .map(|v| v.iter().map(|&x| encode(x)).collect::<Vec<_>>())
            .serialize(s)
    }

    pub(crate) fn deserialize<'de, F: Float, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Vec<F>>, D::Error> {
        Option::<Vec<Encoded>>::deserialize(d)?
            .map(|v| v.into_iter().map(decode).collect())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(bound = "F: Float")]
    struct Sample<F> {
        #[serde(with = "scalar")]
        x: F,
        #[serde(with = "vector")]
        v: Vec<F>,
        #[serde(with = "option")]
        o: Option<F>,
    }

    #[test]
    fn non_finite_values_become_strings() {
        let sample = Sample {
            x: f64::INFINITY,
            v: vec![1.5, f64::NEG_INFINITY],
            o: Some(f64::NAN),
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"x":"inf","v":[1.5,"-inf"],"o":"NaN"}"#);

        let back: Sample<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.x, f64::INFINITY);
        assert_eq!(back.v, vec![1.5, f64::NEG_INFINITY]);
        assert!(back.o.is_some_and(f64::is_nan));
    }

    #[test]
    fn plain_numbers_and_null_still_read() {
        let back: Sample<f32> = serde_json::from_str(r#"{"x":2,"v":[],"o":null}"#).unwrap();
        assert_eq!(
            back,
            Sample {
                x: 2.0,
                v: Vec::new(),
                o: None
            }
        );
    }

    #[test]
    fn unknown_literal_is_rejected() {
        let err = serde_json::from_str::<Sample<f64>>(r#"{"x":"infinity","v":[],"o":null}"#)
            .unwrap_err();
        assert!(err.to_string().contains("infinity"));
    }
}
