use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, Set};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "place")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub address: String,
    #[sea_orm(column_type = "Decimal(Some((9, 6)))")]
    pub latitude: Decimal,
    #[sea_orm(column_type = "Decimal(Some((9, 6)))")]
    pub longitude: Decimal,
    pub zipcode: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn latitude_f64(&self) -> f64 {
        self.latitude.to_f64().unwrap_or_default()
    }

    pub fn longitude_f64(&self) -> f64 {
        self.longitude.to_f64().unwrap_or_default()
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ModelError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ModelError::Validation("latitude must be within [-90, 90]".into()));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ModelError::Validation("longitude must be within [-180, 180]".into()));
    }
    Ok(())
}

fn to_decimal(v: f64) -> Result<Decimal, ModelError> {
    Decimal::from_f64(v)
        .map(|d| d.round_dp(6))
        .ok_or_else(|| ModelError::Validation(format!("coordinate {v} is not representable")))
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    address: &str,
    latitude: f64,
    longitude: f64,
    zipcode: Option<String>,
) -> Result<Model, ModelError> {
    validate_coordinates(latitude, longitude)?;
    let am = ActiveModel {
        id: NotSet,
        address: Set(address.to_string()),
        latitude: Set(to_decimal(latitude)?),
        longitude: Set(to_decimal(longitude)?),
        zipcode: Set(zipcode),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_ranges() {
        assert!(validate_coordinates(41.38, 2.17).is_ok());
        assert!(validate_coordinates(90.0001, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
    }

    #[test]
    fn decimals_rounded_to_six_places() {
        let d = to_decimal(41.123456789).unwrap();
        assert_eq!(d.to_string(), "41.123457");
    }
}
