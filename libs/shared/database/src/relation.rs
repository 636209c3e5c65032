//! Embedded PostgREST relations (`paciente:paciente(nombre, correo)`) come back
//! either as a single object or as an array holding one object, depending on
//! how the foreign key is declared. These helpers collapse both shapes into an
//! `Option<T>` so the rest of the code never branches on shape.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Use with `#[serde(default, deserialize_with = "relation::one_or_many")]`.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<OneOrMany<T>> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(OneOrMany::One(item)) => Some(item),
        Some(OneOrMany::Many(items)) => items.into_iter().next(),
    })
}
