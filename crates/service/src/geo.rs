//! Great-circle distance composed as a SQL expression over `place` coordinates.
//!
//! Postgres evaluates the haversine formula so distance filtering and
//! ordering happen in the query instead of in memory.

use models::place;
use sea_orm::sea_query::{Alias, Func, SimpleExpr};
use sea_orm::sea_query::Expr;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn lit(v: f64) -> SimpleExpr {
    SimpleExpr::Value(v.into())
}

fn call(name: &str, args: Vec<SimpleExpr>) -> SimpleExpr {
    Func::cust(Alias::new(name)).args(args).into()
}

fn sin(e: SimpleExpr) -> SimpleExpr { call("sin", vec![e]) }
fn cos(e: SimpleExpr) -> SimpleExpr { call("cos", vec![e]) }
fn sqrt(e: SimpleExpr) -> SimpleExpr { call("sqrt", vec![e]) }
fn squared(e: SimpleExpr) -> SimpleExpr { call("power", vec![e, lit(2.0)]) }

/// `radians(CAST(place.<col> AS float8))`
fn column_radians(col: place::Column) -> SimpleExpr {
    let as_float: SimpleExpr = Func::cast_as(Expr::col((place::Entity, col)), Alias::new("float8")).into();
    call("radians", vec![as_float])
}

/// Distance in km between `(latitude, longitude)` and each joined `place` row.
///
/// With `a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)` and
/// `1 - a = cos²(Δφ/2) - cos φ1 · cos φ2 · sin²(Δλ/2)`,
/// the distance is `2R · atan2(√a, √(1 - a))`. Half-angle differences are
/// written as `x/2 - c` so every operand stays a function call or literal.
pub fn distance_km_expr(latitude: f64, longitude: f64) -> SimpleExpr {
    let lat1 = latitude.to_radians();
    let lon1 = longitude.to_radians();

    let half_dlat = || column_radians(place::Column::Latitude).div(lit(2.0)).sub(lit(lat1 / 2.0));
    let half_dlon = || column_radians(place::Column::Longitude).div(lit(2.0)).sub(lit(lon1 / 2.0));
    let cross = || lit(lat1.cos()).mul(cos(column_radians(place::Column::Latitude))).mul(squared(sin(half_dlon())));

    let a = squared(sin(half_dlat())).add(cross());
    let one_minus_a = squared(cos(half_dlat())).sub(cross());

    lit(2.0 * EARTH_RADIUS_KM).mul(call("atan2", vec![sqrt(a), sqrt(one_minus_a)]))
}
